//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Items are stored as text; callers decide how to render their items.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `Running` state
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Records the terminal state of a run
    ///
    /// # Arguments
    ///
    /// * `run_id` - The run to close
    /// * `status` - Final status
    /// * `pages_total` - Page count discovered on page 1, if the run got that far
    /// * `error_message` - Description of the failure, if any
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        pages_total: Option<u64>,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    // ===== Items =====

    /// Stores one extracted item for a run
    fn insert_item(&mut self, run_id: i64, value: &str) -> StorageResult<i64>;

    /// Counts the items stored for a run
    fn count_items(&self, run_id: i64) -> StorageResult<u64>;

    /// Lists the items of a run in arrival order
    fn list_items(&self, run_id: i64) -> StorageResult<Vec<String>>;
}
