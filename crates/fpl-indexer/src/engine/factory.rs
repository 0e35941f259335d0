//! Execution creation.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::document::{ExecutionDocument, ExecutionScope, ExecutionStatus, GameweekCounters};
use super::MAX_GAMEWEEK;
use crate::error::{AppError, AppResult};
use crate::store::ExecutionStore;

/// Parameters for indexing a single manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerExecutionParams {
    pub manager_id: i64,
    pub from_gw: u32,
    pub to_gw: u32,
}

/// Parameters for indexing every manager of a league.
///
/// `manager_ids` is resolved by the caller and fixed for the job's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueExecutionParams {
    pub league_id: i64,
    pub manager_ids: Vec<i64>,
    pub from_gw: u32,
    pub to_gw: u32,
}

/// Check `1 <= from_gw <= to_gw <= MAX_GAMEWEEK`.
pub fn validate_gameweek_range(from_gw: u32, to_gw: u32) -> AppResult<()> {
    if from_gw < 1 {
        return Err(AppError::Validation("from_gw must be at least 1".to_string()));
    }
    if to_gw > MAX_GAMEWEEK {
        return Err(AppError::Validation(format!(
            "to_gw ({}) must not be after gameweek {}",
            to_gw, MAX_GAMEWEEK
        )));
    }
    if to_gw < from_gw {
        return Err(AppError::Validation(format!(
            "to_gw ({}) must not be before from_gw ({})",
            to_gw, from_gw
        )));
    }
    Ok(())
}

fn validate_id(name: &str, id: i64) -> AppResult<()> {
    if id <= 0 {
        return Err(AppError::Validation(format!("{} must be positive", name)));
    }
    Ok(())
}

/// Builds pending executions and hands them to the store.
#[derive(Clone)]
pub struct ExecutionFactory {
    store: Arc<dyn ExecutionStore>,
}

impl ExecutionFactory {
    pub fn new(store: Arc<dyn ExecutionStore>) -> Self {
        Self { store }
    }

    /// Create a pending execution for one manager.
    pub async fn create_manager_execution(
        &self,
        params: ManagerExecutionParams,
    ) -> AppResult<ExecutionDocument> {
        validate_id("manager_id", params.manager_id)?;
        validate_gameweek_range(params.from_gw, params.to_gw)?;

        let message = format!(
            "Queued indexing of manager {} for gameweeks {}-{}",
            params.manager_id, params.from_gw, params.to_gw
        );
        let doc = new_document(
            ExecutionScope::Manager {
                manager_id: params.manager_id,
            },
            params.from_gw,
            params.to_gw,
            message,
        );

        let doc = self.store.create(doc).await?;
        info!(
            execution_id = %doc.execution_id,
            manager_id = params.manager_id,
            from_gw = params.from_gw,
            to_gw = params.to_gw,
            "Created manager execution"
        );
        Ok(doc)
    }

    /// Create a pending execution for a league.
    pub async fn create_league_execution(
        &self,
        params: LeagueExecutionParams,
    ) -> AppResult<ExecutionDocument> {
        validate_id("league_id", params.league_id)?;
        validate_gameweek_range(params.from_gw, params.to_gw)?;
        if params.manager_ids.is_empty() {
            return Err(AppError::EmptyLeague(params.league_id));
        }

        let total_managers = params.manager_ids.len() as u32;
        let message = format!(
            "Queued indexing of league {} ({} managers) for gameweeks {}-{}",
            params.league_id, total_managers, params.from_gw, params.to_gw
        );
        let doc = new_document(
            ExecutionScope::League {
                league_id: params.league_id,
                manager_ids: params.manager_ids,
                current_manager_index: 0,
                managers_processed: 0,
                total_managers,
            },
            params.from_gw,
            params.to_gw,
            message,
        );

        let doc = self.store.create(doc).await?;
        info!(
            execution_id = %doc.execution_id,
            league_id = params.league_id,
            total_managers,
            from_gw = params.from_gw,
            to_gw = params.to_gw,
            "Created league execution"
        );
        Ok(doc)
    }
}

fn new_document(
    scope: ExecutionScope,
    from_gw: u32,
    to_gw: u32,
    message: String,
) -> ExecutionDocument {
    let now = Utc::now();
    ExecutionDocument {
        execution_id: Uuid::new_v4().to_string(),
        scope,
        status: ExecutionStatus::Pending,
        from_gw,
        to_gw,
        current_gw: from_gw,
        counters: GameweekCounters::default(),
        message,
        error: None,
        created_at: now,
        started_at: None,
        updated_at: now,
        completed_at: None,
        version: 0,
    }
}
