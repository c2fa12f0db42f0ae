// handlers/mod.rs - HTTP endpoints
//
// graphql: the GraphQL endpoint and its explorer
// auth:    session sign-in/sign-out, backed by the strategy registry
// health:  service descriptor and liveness, served without a session

pub mod auth;
pub mod graphql;
pub mod health;
