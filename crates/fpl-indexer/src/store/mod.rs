//! Durable persistence for execution documents.
//!
//! The engine only ever talks to [`ExecutionStore`]; the backends here are
//! a process-local map and a PostgreSQL table. Saves are full overwrites
//! guarded by the document's `version`.

use async_trait::async_trait;
use thiserror::Error;

use crate::engine::ExecutionDocument;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryExecutionStore;
pub use postgres::PgExecutionStore;

/// Errors raised by an execution store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this id.
    #[error("Execution not found: {0}")]
    NotFound(String),

    /// `create` called with an id that is already taken.
    #[error("Execution already exists: {0}")]
    AlreadyExists(String),

    /// The stored document moved on since it was loaded.
    #[error("Stale write to execution {execution_id}: expected version {expected}, found {found}")]
    Conflict {
        execution_id: String,
        expected: u64,
        found: u64,
    },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Create/get/save persistence keyed by `execution_id`.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Persist a new document.
    async fn create(&self, doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError>;

    /// Load a document, `None` if the id is unknown.
    async fn get(&self, execution_id: &str) -> Result<Option<ExecutionDocument>, StoreError>;

    /// Overwrite a document.
    ///
    /// Fails with [`StoreError::Conflict`] unless `doc.version` matches the
    /// stored version. Returns the document as stored, with its version
    /// bumped.
    async fn save(&self, doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError>;

    /// Whether the backend is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}
