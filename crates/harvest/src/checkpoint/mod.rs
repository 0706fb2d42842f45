//! Sync checkpoint stores
//!
//! The engine only consumes the two traits; where checkpoints live is up to
//! the embedding application. [`NoCheckpoints`] supports stateless runs.

mod memory;
mod noop;
mod sqlite;
mod traits;

pub use memory::InMemoryCheckpoints;
pub use noop::NoCheckpoints;
pub use sqlite::SqliteCheckpointStore;
pub use traits::{FolderSyncTokenStore, LastSyncStore};
