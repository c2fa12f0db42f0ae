pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use manager::{Backends, DatabaseManager};
pub use memory::MemoryStore;
pub use models::{NewUser, Note, User};
pub use postgres::PgStore;
pub use store::{DataStore, StoreError};
