//! Execution document: the single durable record of one indexing job.
//!
//! Manager and league jobs share the cursor, counters and timestamps but
//! differ in scope, which is modelled as a tagged enum so a manager job can
//! never carry a manager list. Serialized form stays flat with a `type` tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Created, no chunk has run yet.
    Pending,
    /// At least one chunk has run and the job is not finished.
    Running,
    /// Every unit has been accounted for.
    Completed,
    /// A chunk aborted with a fatal error.
    Failed,
}

impl ExecutionStatus {
    /// Terminal statuses are sticky: no further progress happens.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job shape without its payload, used by requests and responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    Manager,
    League,
}

impl ExecutionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::League => "league",
        }
    }
}

impl std::fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an execution indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionScope {
    /// Every gameweek in range for one manager.
    Manager { manager_id: i64 },
    /// Every gameweek in range for each manager of a league, in order.
    League {
        league_id: i64,
        manager_ids: Vec<i64>,
        current_manager_index: usize,
        managers_processed: u32,
        total_managers: u32,
    },
}

impl ExecutionScope {
    pub fn kind(&self) -> ExecutionKind {
        match self {
            Self::Manager { .. } => ExecutionKind::Manager,
            Self::League { .. } => ExecutionKind::League,
        }
    }

    /// Number of managers whose ranges make up the job.
    pub fn manager_count(&self) -> u32 {
        match self {
            Self::Manager { .. } => 1,
            Self::League { total_managers, .. } => *total_managers,
        }
    }
}

/// Per-gameweek outcome counters.
///
/// `gameweeks_processed` always equals the sum of the other three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameweekCounters {
    pub gameweeks_processed: u32,
    pub gameweeks_success: u32,
    pub gameweeks_failed: u32,
    pub gameweeks_skipped: u32,
}

impl GameweekCounters {
    pub fn record_success(&mut self) {
        self.gameweeks_success += 1;
        self.gameweeks_processed += 1;
    }

    pub fn record_failure(&mut self) {
        self.gameweeks_failed += 1;
        self.gameweeks_processed += 1;
    }

    pub fn record_skip(&mut self) {
        self.gameweeks_skipped += 1;
        self.gameweeks_processed += 1;
    }

    pub fn is_consistent(&self) -> bool {
        self.gameweeks_processed
            == self.gameweeks_success + self.gameweeks_failed + self.gameweeks_skipped
    }
}

/// Durable state of one indexing job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionDocument {
    pub execution_id: String,
    #[serde(flatten)]
    pub scope: ExecutionScope,
    pub status: ExecutionStatus,
    pub from_gw: u32,
    pub to_gw: u32,
    /// Gameweek cursor for the manager currently being indexed.
    pub current_gw: u32,
    #[serde(flatten)]
    pub counters: GameweekCounters,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful save.
    #[serde(default)]
    pub version: u64,
}

impl ExecutionDocument {
    pub fn kind(&self) -> ExecutionKind {
        self.scope.kind()
    }

    /// Inclusive size of the gameweek range.
    pub fn gameweek_span(&self) -> u32 {
        self.to_gw.saturating_sub(self.from_gw).saturating_add(1)
    }

    /// Total (manager, gameweek) units the job will account for.
    pub fn total_units(&self) -> u64 {
        u64::from(self.gameweek_span()) * u64::from(self.scope.manager_count())
    }

    /// Move a pending execution to running; `started_at` is set only once.
    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        if self.status == ExecutionStatus::Pending {
            self.status = ExecutionStatus::Running;
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.updated_at = now;
    }

    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Completed;
        self.completed_at.get_or_insert(now);
        self.updated_at = now;
        self.message = self.completion_message();
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        if self.status.is_terminal() {
            return;
        }
        let error = error.into();
        self.status = ExecutionStatus::Failed;
        self.message = format!("Indexing failed: {}", error);
        self.error = Some(error);
        self.completed_at.get_or_insert(now);
        self.updated_at = now;
    }

    /// Refresh `message` from the cursor and counters.
    pub fn refresh_progress_message(&mut self) {
        self.message = match &self.scope {
            ExecutionScope::Manager { manager_id } => format!(
                "Indexing manager {}: {}/{} gameweeks processed",
                manager_id,
                self.counters.gameweeks_processed,
                self.gameweek_span()
            ),
            ExecutionScope::League {
                league_id,
                managers_processed,
                total_managers,
                ..
            } => format!(
                "Indexing league {}: {}/{} managers, {} gameweeks processed",
                league_id, managers_processed, total_managers, self.counters.gameweeks_processed
            ),
        };
    }

    fn completion_message(&self) -> String {
        let c = &self.counters;
        match &self.scope {
            ExecutionScope::Manager { manager_id } => format!(
                "Completed indexing manager {}: {} gameweeks processed ({} succeeded, {} failed, {} skipped)",
                manager_id, c.gameweeks_processed, c.gameweeks_success, c.gameweeks_failed, c.gameweeks_skipped
            ),
            ExecutionScope::League {
                league_id,
                managers_processed,
                ..
            } => format!(
                "Completed indexing league {}: {} managers, {} gameweeks processed ({} succeeded, {} failed, {} skipped)",
                league_id,
                managers_processed,
                c.gameweeks_processed,
                c.gameweeks_success,
                c.gameweeks_failed,
                c.gameweeks_skipped
            ),
        }
    }

    /// Share of managers finished, for league jobs with at least one manager.
    pub fn managers_percentage(&self) -> Option<u32> {
        match &self.scope {
            ExecutionScope::League {
                managers_processed,
                total_managers,
                ..
            } if *total_managers > 0 => Some(percentage(
                u64::from(*managers_processed),
                u64::from(*total_managers),
            )),
            _ => None,
        }
    }

    /// Share of all (manager, gameweek) units accounted for.
    pub fn gameweeks_percentage(&self) -> u32 {
        percentage(u64::from(self.counters.gameweeks_processed), self.total_units())
    }
}

fn percentage(done: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    (done as f64 / total as f64 * 100.0).round() as u32
}
