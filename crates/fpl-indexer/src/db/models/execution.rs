//! Index execution database model.
//!
//! One row per execution. The full document lives in a JSONB column;
//! `kind`, `status` and `version` are lifted out for filtering and for the
//! compare-and-swap on save.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::engine::ExecutionDocument;

/// Row of `fpl_indexer.index_execution`.
#[derive(Debug, Clone, FromRow)]
pub struct ExecutionRow {
    pub execution_id: String,
    pub kind: String,
    pub status: String,
    pub version: i64,
    pub document: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExecutionRow {
    /// Build the row for a document.
    pub fn from_document(doc: &ExecutionDocument) -> Result<Self, serde_json::Error> {
        Ok(Self {
            execution_id: doc.execution_id.clone(),
            kind: doc.kind().as_str().to_string(),
            status: doc.status.as_str().to_string(),
            version: doc.version as i64,
            document: serde_json::to_value(doc)?,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        })
    }

    /// Decode the document, trusting the row's `version` column.
    pub fn into_document(self) -> Result<ExecutionDocument, serde_json::Error> {
        let mut doc: ExecutionDocument = serde_json::from_value(self.document)?;
        doc.version = self.version as u64;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExecutionScope, ExecutionStatus, GameweekCounters};

    #[test]
    fn test_row_round_trip_prefers_column_version() {
        let now = Utc::now();
        let doc = ExecutionDocument {
            execution_id: "exec-9".to_string(),
            scope: ExecutionScope::League {
                league_id: 10,
                manager_ids: vec![1, 2, 3],
                current_manager_index: 0,
                managers_processed: 0,
                total_managers: 3,
            },
            status: ExecutionStatus::Running,
            from_gw: 1,
            to_gw: 38,
            current_gw: 4,
            counters: GameweekCounters::default(),
            message: "Indexing league 10".to_string(),
            error: None,
            created_at: now,
            started_at: Some(now),
            updated_at: now,
            completed_at: None,
            version: 3,
        };

        let mut row = ExecutionRow::from_document(&doc).unwrap();
        assert_eq!(row.kind, "league");
        assert_eq!(row.status, "running");

        row.version = 4;
        let decoded = row.into_document().unwrap();
        assert_eq!(decoded.version, 4);
        assert_eq!(decoded.current_gw, 4);
    }
}
