// graphql/mod.rs - schema types, query guard and gateway

pub mod gateway;
pub mod guard;
pub mod mutation;
pub mod query;
pub mod schema;
pub mod types;

pub use gateway::Gateway;
pub use guard::{CostModel, OperationMeasure, QueryGuard, Rejection, SchemaShape};
pub use mutation::Mutation;
pub use query::Query;
pub use schema::{build_schema, schema_sdl, NoteSchema};
