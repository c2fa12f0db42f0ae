pub mod error;
pub mod notes;

pub use error::ResolverError;
pub use notes::NoteService;
