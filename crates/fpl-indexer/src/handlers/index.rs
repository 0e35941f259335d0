//! Indexing API handlers.
//!
//! Orchestrate, run and status endpoints for indexing executions. Fatal
//! execution errors are reported as `status: "failed"` in a 200 response;
//! only validation, unknown ids and store failures are HTTP errors.

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::AppConfig;
use crate::engine::{
    ExecutionDocument, ExecutionKind, ExecutionScope, ExecutionStatus, IndexTarget,
    OrchestrateRequest, MAX_GAMEWEEK, MAX_ITERATIONS, MAX_STEPS_PER_CHUNK, MIN_STEPS_PER_CHUNK,
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Body of `POST /index/orchestrate`.
///
/// Numeric fields accept JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrchestrateBody {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub manager_id: Option<Value>,
    pub league_id: Option<Value>,
    pub from_gw: Option<Value>,
    pub to_gw: Option<Value>,
    pub max_steps: Option<Value>,
    pub max_iterations: Option<Value>,
}

impl OrchestrateBody {
    /// Validate the body, filling step and iteration defaults from config.
    pub fn into_request(self, config: &AppConfig) -> AppResult<OrchestrateRequest> {
        let target = match self.kind.as_deref() {
            Some("manager") => IndexTarget::Manager {
                manager_id: required_id("manager_id", self.manager_id.as_ref())?,
            },
            Some("league") => IndexTarget::League {
                league_id: required_id("league_id", self.league_id.as_ref())?,
            },
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "type must be 'manager' or 'league', got '{}'",
                    other
                )))
            }
            None => return Err(AppError::Validation("type is required".to_string())),
        };

        let from_gw = optional_gameweek("from_gw", self.from_gw.as_ref())?;
        let to_gw = optional_gameweek("to_gw", self.to_gw.as_ref())?;
        if let (Some(from), Some(to)) = (from_gw, to_gw) {
            if from > to {
                return Err(AppError::Validation(format!(
                    "from_gw ({}) must not be after to_gw ({})",
                    from, to
                )));
            }
        }

        let max_steps = optional_in_range(
            "max_steps",
            self.max_steps.as_ref(),
            i64::from(MIN_STEPS_PER_CHUNK),
            i64::from(MAX_STEPS_PER_CHUNK),
        )?
        .unwrap_or(config.default_max_steps);
        let max_iterations = optional_in_range(
            "max_iterations",
            self.max_iterations.as_ref(),
            1,
            i64::from(MAX_ITERATIONS),
        )?
        .unwrap_or(config.default_max_iterations);

        Ok(OrchestrateRequest {
            target,
            from_gw,
            to_gw,
            max_steps,
            max_iterations: max_iterations.clamp(1, i64::from(MAX_ITERATIONS)) as u32,
        })
    }
}

/// Body of `POST /index/run/{execution_id}`; the body itself is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunBody {
    pub max_steps: Option<Value>,
}

/// Decode a JSON body; an empty body yields the default.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> AppResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}

fn parse_integer(field: &str, value: &Value) -> AppResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AppError::Validation(format!("{} must be numeric", field)))
}

fn required_id(field: &str, value: Option<&Value>) -> AppResult<i64> {
    let value =
        value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))?;
    let id = parse_integer(field, value)?;
    if id <= 0 {
        return Err(AppError::Validation(format!("{} must be positive", field)));
    }
    Ok(id)
}

fn optional_in_range(field: &str, value: Option<&Value>, min: i64, max: i64) -> AppResult<Option<i64>> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let n = parse_integer(field, value)?;
    if n < min || n > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(Some(n))
}

fn optional_gameweek(field: &str, value: Option<&Value>) -> AppResult<Option<u32>> {
    Ok(optional_in_range(field, value, 1, i64::from(MAX_GAMEWEEK))?.map(|gw| gw as u32))
}

/// Links for continuing a non-terminal execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NextLinks {
    pub execution_id: String,
    pub run: String,
    pub status: String,
}

impl NextLinks {
    fn for_execution(execution_id: &str) -> Self {
        Self {
            execution_id: execution_id.to_string(),
            run: format!("/index/run/{}", execution_id),
            status: format!("/index/status/{}", execution_id),
        }
    }
}

/// Cursor and counters of an execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub league_id: Option<i64>,
    pub from_gw: u32,
    pub to_gw: u32,
    pub current_gw: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_manager_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managers_processed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_managers: Option<u32>,
    pub gameweeks_processed: u32,
    pub gameweeks_success: u32,
    pub gameweeks_failed: u32,
    pub gameweeks_skipped: u32,
    pub total_gameweeks: u64,
}

impl From<&ExecutionDocument> for Progress {
    fn from(doc: &ExecutionDocument) -> Self {
        let (manager_id, league_id, current_manager_index, managers_processed, total_managers) =
            match &doc.scope {
                ExecutionScope::Manager { manager_id } => (Some(*manager_id), None, None, None, None),
                ExecutionScope::League {
                    league_id,
                    current_manager_index,
                    managers_processed,
                    total_managers,
                    ..
                } => (
                    None,
                    Some(*league_id),
                    Some(*current_manager_index),
                    Some(*managers_processed),
                    Some(*total_managers),
                ),
            };

        Self {
            manager_id,
            league_id,
            from_gw: doc.from_gw,
            to_gw: doc.to_gw,
            current_gw: doc.current_gw,
            current_manager_index,
            managers_processed,
            total_managers,
            gameweeks_processed: doc.counters.gameweeks_processed,
            gameweeks_success: doc.counters.gameweeks_success,
            gameweeks_failed: doc.counters.gameweeks_failed,
            gameweeks_skipped: doc.counters.gameweeks_skipped,
            total_gameweeks: doc.total_units(),
        }
    }
}

/// Response of the orchestrate and run endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub status: ExecutionStatus,
    pub execution_id: String,
    #[serde(rename = "type")]
    pub kind: ExecutionKind,
    pub message: String,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Chunks run by an orchestrate call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<NextLinks>,
}

impl From<&ExecutionDocument> for ExecutionResponse {
    fn from(doc: &ExecutionDocument) -> Self {
        Self {
            status: doc.status,
            execution_id: doc.execution_id.clone(),
            kind: doc.kind(),
            message: doc.message.clone(),
            progress: Progress::from(doc),
            error: doc.error.clone(),
            iterations: None,
            next: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Response of the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStatusResponse {
    #[serde(flatten)]
    pub execution: ExecutionResponse,
    /// `null` for manager jobs.
    pub managers_percentage: Option<u32>,
    pub gameweeks_percentage: u32,
    pub timestamps: Timestamps,
}

impl From<&ExecutionDocument> for ExecutionStatusResponse {
    fn from(doc: &ExecutionDocument) -> Self {
        Self {
            execution: ExecutionResponse::from(doc),
            managers_percentage: doc.managers_percentage(),
            gameweeks_percentage: doc.gameweeks_percentage(),
            timestamps: Timestamps {
                created_at: doc.created_at,
                started_at: doc.started_at,
                updated_at: doc.updated_at,
                completed_at: doc.completed_at,
            },
        }
    }
}

fn not_found(execution_id: &str) -> AppError {
    AppError::NotFound(format!("Execution not found: {}", execution_id))
}

/// Create an execution and drive it for a few chunks.
///
/// POST /index/orchestrate
pub async fn orchestrate(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<ExecutionResponse>> {
    let body: OrchestrateBody = parse_body(&body)?;
    let request = body.into_request(&state.config)?;
    info!(target_job = ?request.target, "Orchestrate request");

    let outcome = state.orchestrator.orchestrate(request).await?;

    let mut response = ExecutionResponse::from(&outcome.execution);
    response.iterations = Some(outcome.iterations);
    if !outcome.is_finished() {
        response.next = Some(NextLinks::for_execution(&outcome.execution.execution_id));
    }
    Ok(Json(response))
}

/// Run one chunk of an execution.
///
/// POST /index/run/{execution_id}
pub async fn run(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ExecutionResponse>> {
    let body: RunBody = parse_body(&body)?;
    let max_steps = optional_in_range(
        "max_steps",
        body.max_steps.as_ref(),
        i64::from(MIN_STEPS_PER_CHUNK),
        i64::from(MAX_STEPS_PER_CHUNK),
    )?
    .unwrap_or(state.config.default_max_steps);

    let doc = state
        .runner
        .run_chunk(&execution_id, max_steps)
        .await?
        .ok_or_else(|| not_found(&execution_id))?;

    Ok(Json(ExecutionResponse::from(&doc)))
}

/// Get the status of an execution.
///
/// GET /index/status/{execution_id}
pub async fn status(
    State(state): State<AppState>,
    Path(execution_id): Path<String>,
) -> AppResult<Json<ExecutionStatusResponse>> {
    let doc = state
        .store
        .get(&execution_id)
        .await?
        .ok_or_else(|| not_found(&execution_id))?;

    Ok(Json(ExecutionStatusResponse::from(&doc)))
}
