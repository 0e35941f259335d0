//! PostgreSQL execution store.

use async_trait::async_trait;

use super::{ExecutionStore, StoreError};
use crate::db::models::ExecutionRow;
use crate::db::queries::execution as queries;
use crate::db::{pool, DbPool};
use crate::engine::ExecutionDocument;

/// Execution store backed by `fpl_indexer.index_execution`.
#[derive(Clone)]
pub struct PgExecutionStore {
    pool: DbPool,
}

impl PgExecutionStore {
    /// Create a store and make sure its table exists.
    pub async fn connect(pool: DbPool) -> Result<Self, StoreError> {
        queries::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ExecutionStore for PgExecutionStore {
    async fn create(&self, doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError> {
        let row = ExecutionRow::from_document(&doc)?;
        if !queries::insert_execution(&self.pool, &row).await? {
            return Err(StoreError::AlreadyExists(doc.execution_id));
        }
        Ok(doc)
    }

    async fn get(&self, execution_id: &str) -> Result<Option<ExecutionDocument>, StoreError> {
        match queries::get_execution(&self.pool, execution_id).await? {
            Some(row) => Ok(Some(row.into_document()?)),
            None => Ok(None),
        }
    }

    async fn save(&self, mut doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError> {
        let expected = doc.version;
        doc.version += 1;
        let row = ExecutionRow::from_document(&doc)?;

        if queries::update_execution_if_version(&self.pool, &row, expected as i64).await? {
            return Ok(doc);
        }

        match queries::get_execution_version(&self.pool, &doc.execution_id).await? {
            Some(found) => Err(StoreError::Conflict {
                execution_id: doc.execution_id,
                expected,
                found: found as u64,
            }),
            None => Err(StoreError::NotFound(doc.execution_id)),
        }
    }

    async fn health_check(&self) -> bool {
        pool::health_check(&self.pool).await
    }
}
