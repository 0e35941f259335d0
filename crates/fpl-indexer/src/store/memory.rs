//! In-memory execution store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{ExecutionStore, StoreError};
use crate::engine::ExecutionDocument;

/// Execution store backed by a map guarded by a `RwLock`.
///
/// Terminal executions older than the retention window are evicted whenever
/// a new execution is created.
pub struct InMemoryExecutionStore {
    executions: RwLock<HashMap<String, ExecutionDocument>>,
    retention: Duration,
}

impl InMemoryExecutionStore {
    /// Create a store that keeps terminal executions for `retention`.
    pub fn new(retention: std::time::Duration) -> Self {
        Self {
            executions: RwLock::new(HashMap::new()),
            retention: Duration::from_std(retention).unwrap_or(Duration::MAX),
        }
    }

    /// Number of documents currently held.
    pub async fn len(&self) -> usize {
        self.executions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.executions.read().await.is_empty()
    }

    fn prune_expired(&self, executions: &mut HashMap<String, ExecutionDocument>) {
        let Some(cutoff) = Utc::now().checked_sub_signed(self.retention) else {
            return;
        };
        let before = executions.len();
        executions.retain(|_, doc| {
            !(doc.status.is_terminal() && doc.completed_at.is_some_and(|at| at < cutoff))
        });
        let evicted = before - executions.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired terminal executions");
        }
    }
}

impl Default for InMemoryExecutionStore {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(3600))
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn create(&self, doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError> {
        let mut executions = self.executions.write().await;
        self.prune_expired(&mut executions);

        if executions.contains_key(&doc.execution_id) {
            return Err(StoreError::AlreadyExists(doc.execution_id));
        }
        executions.insert(doc.execution_id.clone(), doc.clone());
        Ok(doc)
    }

    async fn get(&self, execution_id: &str) -> Result<Option<ExecutionDocument>, StoreError> {
        Ok(self.executions.read().await.get(execution_id).cloned())
    }

    async fn save(&self, mut doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError> {
        let mut executions = self.executions.write().await;
        let stored = executions
            .get_mut(&doc.execution_id)
            .ok_or_else(|| StoreError::NotFound(doc.execution_id.clone()))?;

        if stored.version != doc.version {
            return Err(StoreError::Conflict {
                execution_id: doc.execution_id,
                expected: doc.version,
                found: stored.version,
            });
        }

        doc.version += 1;
        *stored = doc.clone();
        Ok(doc)
    }
}
