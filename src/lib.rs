pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod graphql;
pub mod handlers;
pub mod middleware;
pub mod render;
pub mod services;
pub mod session;

#[cfg(test)]
pub mod testing;
