//! Single-request orchestration: create an execution and drive it for a
//! bounded number of chunks.
//!
//! Whatever is left after the iteration or time budget is spent is picked
//! up by further runner calls against the returned execution id.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::document::ExecutionDocument;
use super::factory::{
    validate_gameweek_range, ExecutionFactory, LeagueExecutionParams, ManagerExecutionParams,
};
use super::runner::ChunkRunner;
use super::MAX_ITERATIONS;
use crate::error::{AppError, AppResult};
use crate::services::{BootstrapOracle, StandingsLookup};

/// What to index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexTarget {
    Manager { manager_id: i64 },
    League { league_id: i64 },
}

/// A validated orchestrate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrateRequest {
    pub target: IndexTarget,
    /// Defaults to 1.
    pub from_gw: Option<u32>,
    /// Defaults to the current gameweek.
    pub to_gw: Option<u32>,
    pub max_steps: i64,
    pub max_iterations: u32,
}

/// Result of an orchestrate call.
#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    pub execution: ExecutionDocument,
    /// Chunks actually run.
    pub iterations: u32,
}

impl OrchestrationOutcome {
    pub fn is_finished(&self) -> bool {
        self.execution.status.is_terminal()
    }
}

/// Composes factory and runner for one request.
#[derive(Clone)]
pub struct IndexOrchestrator {
    factory: ExecutionFactory,
    runner: ChunkRunner,
    oracle: Arc<dyn BootstrapOracle>,
    standings: Arc<dyn StandingsLookup>,
    budget: Duration,
}

impl IndexOrchestrator {
    pub fn new(
        factory: ExecutionFactory,
        runner: ChunkRunner,
        oracle: Arc<dyn BootstrapOracle>,
        standings: Arc<dyn StandingsLookup>,
        budget: Duration,
    ) -> Self {
        Self {
            factory,
            runner,
            oracle,
            standings,
            budget,
        }
    }

    /// Create an execution for `request` and run up to `max_iterations`
    /// chunks of it, stopping early once it is terminal or the time budget
    /// is spent.
    pub async fn orchestrate(&self, request: OrchestrateRequest) -> AppResult<OrchestrationOutcome> {
        let from_gw = request.from_gw.unwrap_or(1);
        let to_gw = match request.to_gw {
            Some(gw) => gw,
            None => self.default_to_gw().await?,
        };
        validate_gameweek_range(from_gw, to_gw)?;

        let execution = match request.target {
            IndexTarget::Manager { manager_id } => {
                self.factory
                    .create_manager_execution(ManagerExecutionParams {
                        manager_id,
                        from_gw,
                        to_gw,
                    })
                    .await?
            }
            IndexTarget::League { league_id } => {
                let manager_ids = self.standings.manager_ids(league_id).await?;
                if manager_ids.is_empty() {
                    return Err(AppError::EmptyLeague(league_id));
                }
                self.factory
                    .create_league_execution(LeagueExecutionParams {
                        league_id,
                        manager_ids,
                        from_gw,
                        to_gw,
                    })
                    .await?
            }
        };

        let execution_id = execution.execution_id.clone();
        let max_iterations = request.max_iterations.clamp(1, MAX_ITERATIONS);
        let started = Instant::now();

        let mut current = execution;
        let mut iterations = 0;
        while iterations < max_iterations {
            if iterations > 0 && started.elapsed() >= self.budget {
                debug!(execution_id = %execution_id, iterations, "Orchestration time budget spent");
                break;
            }

            current = self
                .runner
                .run_chunk(&execution_id, request.max_steps)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Execution not found: {}", execution_id))
                })?;
            iterations += 1;

            if current.status.is_terminal() {
                break;
            }
        }

        info!(
            execution_id = %execution_id,
            iterations,
            status = %current.status,
            processed = current.counters.gameweeks_processed,
            "Orchestration finished"
        );

        Ok(OrchestrationOutcome {
            execution: current,
            iterations,
        })
    }

    async fn default_to_gw(&self) -> AppResult<u32> {
        let current = self.oracle.current_gameweek().await?;
        if current == 0 {
            return Err(AppError::Validation(
                "No gameweek has started yet; to_gw must be given explicitly".to_string(),
            ));
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ExecutionKind, ExecutionStatus};
    use crate::store::InMemoryExecutionStore;
    use crate::testing::{RecordingIndexer, StaticOracle, StaticStandings};

    fn orchestrator(
        store: Arc<InMemoryExecutionStore>,
        oracle: Arc<StaticOracle>,
        standings: Vec<i64>,
    ) -> (IndexOrchestrator, ChunkRunner) {
        let runner = ChunkRunner::new(store.clone(), oracle.clone(), RecordingIndexer::succeeding());
        let orchestrator = IndexOrchestrator::new(
            ExecutionFactory::new(store),
            runner.clone(),
            oracle,
            Arc::new(StaticStandings(standings)),
            Duration::from_secs(60),
        );
        (orchestrator, runner)
    }

    fn manager_request(max_steps: i64, max_iterations: u32) -> OrchestrateRequest {
        OrchestrateRequest {
            target: IndexTarget::Manager { manager_id: 42 },
            from_gw: None,
            to_gw: None,
            max_steps,
            max_iterations,
        }
    }

    #[tokio::test]
    async fn test_small_job_completes_in_one_call() {
        let store = Arc::new(InMemoryExecutionStore::default());
        let (orchestrator, _) = orchestrator(store, StaticOracle::at(5), vec![]);

        let outcome = orchestrator.orchestrate(manager_request(10, 3)).await.unwrap();

        assert!(outcome.is_finished());
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.execution.to_gw, 5);
        assert_eq!(outcome.execution.counters.gameweeks_success, 5);
    }

    #[tokio::test]
    async fn test_exhausted_iterations_leave_resumable_execution() {
        let store = Arc::new(InMemoryExecutionStore::default());
        let (orchestrator, runner) = orchestrator(store, StaticOracle::at(38), vec![]);

        let outcome = orchestrator.orchestrate(manager_request(2, 2)).await.unwrap();
        assert!(!outcome.is_finished());
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.execution.status, ExecutionStatus::Running);
        assert_eq!(outcome.execution.counters.gameweeks_processed, 4);

        let id = outcome.execution.execution_id.clone();
        let mut last = outcome.execution.counters.gameweeks_processed;
        loop {
            let doc = runner.run_chunk(&id, 50).await.unwrap().unwrap();
            assert!(doc.counters.gameweeks_processed > last || doc.status.is_terminal());
            last = doc.counters.gameweeks_processed;
            if doc.status.is_terminal() {
                assert_eq!(doc.status, ExecutionStatus::Completed);
                assert_eq!(last, 38);
                break;
            }
        }
    }

    #[tokio::test]
    async fn test_league_request_resolves_managers() {
        let store = Arc::new(InMemoryExecutionStore::default());
        let (orchestrator, _) = orchestrator(store, StaticOracle::at(38), vec![7, 8]);

        let outcome = orchestrator
            .orchestrate(OrchestrateRequest {
                target: IndexTarget::League { league_id: 10 },
                from_gw: Some(1),
                to_gw: Some(2),
                max_steps: 50,
                max_iterations: 1,
            })
            .await
            .unwrap();

        assert_eq!(outcome.execution.kind(), ExecutionKind::League);
        assert_eq!(outcome.execution.status, ExecutionStatus::Completed);
        assert_eq!(outcome.execution.counters.gameweeks_processed, 4);
    }

    #[tokio::test]
    async fn test_empty_league_fails_before_creating() {
        let store = Arc::new(InMemoryExecutionStore::default());
        let (orchestrator, _) = orchestrator(store.clone(), StaticOracle::at(38), vec![]);

        let err = orchestrator
            .orchestrate(OrchestrateRequest {
                target: IndexTarget::League { league_id: 10 },
                from_gw: None,
                to_gw: None,
                max_steps: 5,
                max_iterations: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::EmptyLeague(10)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_pre_season_without_to_gw_is_rejected() {
        let store = Arc::new(InMemoryExecutionStore::default());
        let (orchestrator, _) = orchestrator(store.clone(), StaticOracle::at(0), vec![]);

        let err = orchestrator.orchestrate(manager_request(5, 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_range_is_validated_after_defaults() {
        let store = Arc::new(InMemoryExecutionStore::default());
        let (orchestrator, _) = orchestrator(store.clone(), StaticOracle::at(3), vec![]);

        let mut request = manager_request(5, 1);
        request.from_gw = Some(10);
        let err = orchestrator.orchestrate(request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_budget_runs_exactly_one_chunk() {
        let store = Arc::new(InMemoryExecutionStore::default());
        let oracle = StaticOracle::at(38);
        let runner = ChunkRunner::new(store.clone(), oracle.clone(), RecordingIndexer::succeeding());
        let orchestrator = IndexOrchestrator::new(
            ExecutionFactory::new(store),
            runner,
            oracle,
            Arc::new(StaticStandings(vec![])),
            Duration::ZERO,
        );

        let outcome = orchestrator.orchestrate(manager_request(1, 30)).await.unwrap();
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.execution.counters.gameweeks_processed, 1);
    }
}
