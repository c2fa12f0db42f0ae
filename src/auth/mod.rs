pub mod identity;
pub mod strategy;

pub use identity::{AuthenticatedUser, Identity, IdentityResolver};
pub use strategy::{AuthError, AuthStrategy, DevelopmentStrategy, StrategyRegistry};
