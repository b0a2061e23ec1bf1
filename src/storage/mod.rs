pub mod sqlite;
pub mod trait_def;

pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult};
