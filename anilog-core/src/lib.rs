pub mod common;
pub mod domain;
pub mod storage;

#[cfg(feature = "db")]
pub mod database;

pub use common::error::{Result, StoreError};
pub use domain::*;
pub use storage::{InMemoryStorage, Storage};

// Re-export database types when db feature is enabled
#[cfg(feature = "db")]
pub use database::DatabaseManager;
#[cfg(feature = "db")]
pub use storage::DatabaseStorage;
