//! Chunk runner: advances one execution by a bounded number of steps.
//!
//! A step accounts for exactly one (manager, gameweek) unit, or for one
//! manager boundary in a league job. Steps run strictly in sequence and the
//! document is saved once, after the chunk. If anything fails inside the
//! chunk, the steps taken in it are discarded and the execution is stored
//! as failed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::document::{ExecutionDocument, ExecutionScope};
use crate::client::ClientError;
use crate::error::AppResult;
use crate::result_ext::ResultExt;
use crate::services::{BootstrapOracle, IndexUnit, UnitIndexer};
use crate::store::ExecutionStore;

pub const MIN_STEPS_PER_CHUNK: u32 = 1;
pub const MAX_STEPS_PER_CHUNK: u32 = 50;

/// Normalize a requested step budget into `[1, 50]`.
pub fn clamp_max_steps(requested: i64) -> u32 {
    requested.clamp(
        i64::from(MIN_STEPS_PER_CHUNK),
        i64::from(MAX_STEPS_PER_CHUNK),
    ) as u32
}

/// What the next step of an execution does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Cursor is exhausted.
    Complete,
    /// League job finished its current manager's range.
    NextManager,
    Index(IndexUnit),
}

fn next_step(doc: &ExecutionDocument) -> Step {
    match &doc.scope {
        ExecutionScope::Manager { manager_id } => {
            if doc.current_gw > doc.to_gw {
                return Step::Complete;
            }
            Step::Index(IndexUnit {
                manager_id: *manager_id,
                gameweek: doc.current_gw,
                league_id: None,
            })
        }
        ExecutionScope::League {
            league_id,
            manager_ids,
            current_manager_index,
            ..
        } => {
            let Some(manager_id) = manager_ids.get(*current_manager_index) else {
                return Step::Complete;
            };
            if doc.current_gw > doc.to_gw {
                return Step::NextManager;
            }
            Step::Index(IndexUnit {
                manager_id: *manager_id,
                gameweek: doc.current_gw,
                league_id: Some(*league_id),
            })
        }
    }
}

/// Advances executions chunk by chunk.
#[derive(Clone)]
pub struct ChunkRunner {
    store: Arc<dyn ExecutionStore>,
    oracle: Arc<dyn BootstrapOracle>,
    indexer: Arc<dyn UnitIndexer>,
}

impl ChunkRunner {
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        oracle: Arc<dyn BootstrapOracle>,
        indexer: Arc<dyn UnitIndexer>,
    ) -> Self {
        Self {
            store,
            oracle,
            indexer,
        }
    }

    /// Run one chunk of at most `max_steps` steps (clamped into `[1, 50]`).
    ///
    /// Returns `Ok(None)` if the execution does not exist. Terminal
    /// executions are returned untouched. A fatal error inside the chunk is
    /// recorded on the returned document, not returned as `Err`; `Err` is
    /// reserved for failures to load or save the document.
    pub async fn run_chunk(
        &self,
        execution_id: &str,
        max_steps: i64,
    ) -> AppResult<Option<ExecutionDocument>> {
        let Some(mut doc) = self
            .store
            .get(execution_id)
            .await
            .log(format!("loading execution {}", execution_id))?
        else {
            return Ok(None);
        };

        if doc.status.is_terminal() {
            debug!(execution_id, status = %doc.status, "Execution already terminal");
            return Ok(Some(doc));
        }

        let max_steps = clamp_max_steps(max_steps);
        doc.mark_running(Utc::now());

        let mut working = doc.clone();
        let outcome = match self.advance(&mut working, max_steps).await {
            Ok(steps) => {
                info!(
                    execution_id,
                    steps,
                    status = %working.status,
                    current_gw = working.current_gw,
                    processed = working.counters.gameweeks_processed,
                    "Chunk finished"
                );
                working
            }
            Err(err) => {
                warn!(execution_id, error = %err, "Chunk aborted, marking execution failed");
                doc.mark_failed(err.to_string(), Utc::now());
                doc
            }
        };

        let saved = self
            .store
            .save(outcome)
            .await
            .log(format!("saving execution {}", execution_id))?;
        Ok(Some(saved))
    }

    async fn advance(&self, doc: &mut ExecutionDocument, max_steps: u32) -> Result<u32, ClientError> {
        let current_gameweek = self.oracle.current_gameweek().await?;

        let mut steps = 0;
        while steps < max_steps && !doc.status.is_terminal() {
            self.step(doc, current_gameweek).await?;
            steps += 1;
        }
        Ok(steps)
    }

    async fn step(
        &self,
        doc: &mut ExecutionDocument,
        current_gameweek: u32,
    ) -> Result<(), ClientError> {
        match next_step(doc) {
            Step::Complete => {
                doc.mark_completed(Utc::now());
            }
            Step::NextManager => {
                if let ExecutionScope::League {
                    manager_ids,
                    current_manager_index,
                    managers_processed,
                    ..
                } = &mut doc.scope
                {
                    *current_manager_index += 1;
                    *managers_processed = *current_manager_index as u32;
                    debug!(
                        execution_id = %doc.execution_id,
                        manager_index = *current_manager_index,
                        total = manager_ids.len(),
                        "Advanced to next manager"
                    );
                }
                doc.current_gw = doc.from_gw;
                self.finish_step(doc, matches!(next_step(doc), Step::Complete));
            }
            Step::Index(unit) => {
                if unit.gameweek > current_gameweek {
                    debug!(
                        manager_id = unit.manager_id,
                        gameweek = unit.gameweek,
                        current_gameweek,
                        "Skipping unplayed gameweek"
                    );
                    doc.counters.record_skip();
                } else if self.indexer.index_unit(&unit).await? {
                    doc.counters.record_success();
                } else {
                    warn!(
                        execution_id = %doc.execution_id,
                        manager_id = unit.manager_id,
                        gameweek = unit.gameweek,
                        "Failed to index gameweek"
                    );
                    doc.counters.record_failure();
                }

                doc.current_gw += 1;
                let manager_done = matches!(doc.scope, ExecutionScope::Manager { .. })
                    && doc.current_gw > doc.to_gw;
                self.finish_step(doc, manager_done);
            }
        }
        Ok(())
    }

    fn finish_step(&self, doc: &mut ExecutionDocument, completed: bool) {
        let now = Utc::now();
        if completed {
            doc.mark_completed(now);
        } else {
            doc.refresh_progress_message();
            doc.updated_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        ExecutionFactory, ExecutionStatus, LeagueExecutionParams, ManagerExecutionParams,
    };
    use crate::error::AppError;
    use crate::store::{InMemoryExecutionStore, StoreError};
    use crate::testing::{RecordingIndexer, StaticOracle};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;

    struct Harness {
        store: Arc<InMemoryExecutionStore>,
        factory: ExecutionFactory,
        runner: ChunkRunner,
    }

    fn harness(oracle: Arc<StaticOracle>, indexer: Arc<RecordingIndexer>) -> Harness {
        let store = Arc::new(InMemoryExecutionStore::default());
        Harness {
            factory: ExecutionFactory::new(store.clone()),
            runner: ChunkRunner::new(store.clone(), oracle, indexer),
            store,
        }
    }

    async fn manager_execution(h: &Harness, from_gw: u32, to_gw: u32) -> String {
        h.factory
            .create_manager_execution(ManagerExecutionParams {
                manager_id: 42,
                from_gw,
                to_gw,
            })
            .await
            .unwrap()
            .execution_id
    }

    async fn league_execution(h: &Harness, manager_ids: Vec<i64>, to_gw: u32) -> String {
        h.factory
            .create_league_execution(LeagueExecutionParams {
                league_id: 10,
                manager_ids,
                from_gw: 1,
                to_gw,
            })
            .await
            .unwrap()
            .execution_id
    }

    async fn run(h: &Harness, id: &str, max_steps: i64) -> ExecutionDocument {
        h.runner.run_chunk(id, max_steps).await.unwrap().unwrap()
    }

    #[test]
    fn test_clamp_max_steps() {
        assert_eq!(clamp_max_steps(0), 1);
        assert_eq!(clamp_max_steps(-5), 1);
        assert_eq!(clamp_max_steps(1000), 50);
        assert_eq!(clamp_max_steps(7), 7);
    }

    #[tokio::test]
    async fn test_unknown_execution_is_none() {
        let h = harness(StaticOracle::at(38), RecordingIndexer::succeeding());
        assert!(h.runner.run_chunk("nope", 5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_manager_scenario_completes_with_skip() {
        let indexer = RecordingIndexer::succeeding();
        let h = harness(StaticOracle::at(2), indexer.clone());
        let id = manager_execution(&h, 1, 3).await;

        let doc = run(&h, &id, 5).await;

        assert_eq!(doc.status, ExecutionStatus::Completed);
        assert_eq!(doc.counters.gameweeks_processed, 3);
        assert_eq!(doc.counters.gameweeks_success, 2);
        assert_eq!(doc.counters.gameweeks_skipped, 1);
        assert_eq!(doc.counters.gameweeks_failed, 0);
        assert_eq!(doc.current_gw, 4);
        assert!(doc.started_at.is_some());
        assert!(doc.completed_at.is_some());
        assert_eq!(indexer.indexed(), vec![(42, 1), (42, 2)]);
    }

    #[tokio::test]
    async fn test_manager_completes_across_chunks_in_order() {
        let indexer = RecordingIndexer::succeeding();
        let h = harness(StaticOracle::at(38), indexer.clone());
        let id = manager_execution(&h, 3, 9).await;

        let mut chunks = 0;
        loop {
            let doc = run(&h, &id, 2).await;
            chunks += 1;
            assert!(doc.counters.is_consistent());
            if doc.status.is_terminal() {
                assert_eq!(doc.status, ExecutionStatus::Completed);
                assert_eq!(doc.current_gw, 10);
                assert_eq!(doc.counters.gameweeks_processed, 7);
                break;
            }
            assert_eq!(doc.status, ExecutionStatus::Running);
        }

        assert_eq!(chunks, 4);
        let gameweeks: Vec<u32> = indexer.indexed().iter().map(|(_, gw)| *gw).collect();
        assert_eq!(gameweeks, (3..=9).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failed_unit_is_counted_and_job_continues() {
        let h = harness(StaticOracle::at(38), RecordingIndexer::failing_on(&[(42, 2)]));
        let id = manager_execution(&h, 1, 3).await;

        let doc = run(&h, &id, 10).await;

        assert_eq!(doc.status, ExecutionStatus::Completed);
        assert_eq!(doc.counters.gameweeks_success, 2);
        assert_eq!(doc.counters.gameweeks_failed, 1);
        assert!(doc.error.is_none());
    }

    #[tokio::test]
    async fn test_future_gameweeks_always_skipped() {
        let indexer = RecordingIndexer::failing_on(&[(42, 5), (42, 6)]);
        let h = harness(StaticOracle::at(4), indexer.clone());
        let id = manager_execution(&h, 3, 6).await;

        let doc = run(&h, &id, 50).await;

        assert_eq!(doc.counters.gameweeks_skipped, 2);
        assert_eq!(doc.counters.gameweeks_success, 2);
        assert_eq!(doc.counters.gameweeks_failed, 0);
        assert_eq!(indexer.indexed(), vec![(42, 3), (42, 4)]);
    }

    #[tokio::test]
    async fn test_terminal_execution_is_returned_unchanged() {
        let oracle = StaticOracle::at(38);
        let h = harness(oracle.clone(), RecordingIndexer::succeeding());
        let id = manager_execution(&h, 1, 2).await;

        let done = run(&h, &id, 10).await;
        assert_eq!(done.status, ExecutionStatus::Completed);
        let oracle_calls = oracle.calls.load(Ordering::SeqCst);

        let again = run(&h, &id, 10).await;
        assert_eq!(again, done);
        assert_eq!(oracle.calls.load(Ordering::SeqCst), oracle_calls);
    }

    #[tokio::test]
    async fn test_league_scenario_boundary_takes_a_step() {
        let indexer = RecordingIndexer::succeeding();
        let h = harness(StaticOracle::at(38), indexer.clone());
        let id = league_execution(&h, vec![1, 2], 1).await;

        let first = run(&h, &id, 1).await;
        assert_eq!(first.status, ExecutionStatus::Running);
        assert_eq!(first.counters.gameweeks_processed, 1);
        assert_eq!(indexer.indexed(), vec![(1, 1)]);

        let second = run(&h, &id, 1).await;
        assert_eq!(second.status, ExecutionStatus::Running);
        assert_eq!(second.counters.gameweeks_processed, 1);
        assert_eq!(second.current_gw, 1);
        match &second.scope {
            ExecutionScope::League {
                current_manager_index,
                managers_processed,
                ..
            } => {
                assert_eq!(*current_manager_index, 1);
                assert_eq!(*managers_processed, 1);
            }
            other => panic!("unexpected scope {:?}", other),
        }
        assert_eq!(indexer.indexed().len(), 1);
    }

    #[tokio::test]
    async fn test_league_completion_accounts_every_unit() {
        let indexer = RecordingIndexer::failing_on(&[(2, 2)]);
        let h = harness(StaticOracle::at(2), indexer.clone());
        let id = league_execution(&h, vec![1, 2, 3], 3).await;

        let mut doc = run(&h, &id, 4).await;
        while !doc.status.is_terminal() {
            assert!(doc.counters.is_consistent());
            doc = run(&h, &id, 4).await;
        }

        assert_eq!(doc.status, ExecutionStatus::Completed);
        let c = doc.counters;
        assert_eq!(c.gameweeks_processed, 9);
        assert_eq!(c.gameweeks_success + c.gameweeks_failed + c.gameweeks_skipped, 9);
        assert_eq!(c.gameweeks_skipped, 3);
        assert_eq!(c.gameweeks_failed, 1);
        assert_eq!(doc.managers_percentage(), Some(100));
        assert_eq!(doc.gameweeks_percentage(), 100);
        assert_eq!(
            indexer.indexed(),
            vec![(1, 1), (1, 2), (2, 1), (2, 2), (3, 1), (3, 2)]
        );
    }

    #[tokio::test]
    async fn test_oracle_failure_fails_execution() {
        let h = harness(StaticOracle::failing(), RecordingIndexer::succeeding());
        let id = manager_execution(&h, 1, 3).await;

        let doc = run(&h, &id, 5).await;

        assert_eq!(doc.status, ExecutionStatus::Failed);
        assert!(doc.error.as_deref().unwrap().contains("bootstrap unavailable"));
        assert!(doc.completed_at.is_some());
        assert_eq!(doc.counters.gameweeks_processed, 0);
    }

    #[tokio::test]
    async fn test_fatal_error_discards_the_whole_chunk() {
        let indexer = RecordingIndexer::erroring_on(&[(42, 4)]);
        let h = harness(StaticOracle::at(38), indexer.clone());
        let id = manager_execution(&h, 1, 6).await;

        let first = run(&h, &id, 2).await;
        assert_eq!(first.counters.gameweeks_processed, 2);

        // gw3 succeeds in memory, gw4 errors: the stored document keeps the
        // first chunk's progress only.
        let failed = run(&h, &id, 3).await;
        assert_eq!(failed.status, ExecutionStatus::Failed);
        assert_eq!(failed.counters.gameweeks_processed, 2);
        assert_eq!(failed.current_gw, 3);
        assert!(failed.counters.is_consistent());
        assert_eq!(indexer.indexed(), vec![(42, 1), (42, 2), (42, 3), (42, 4)]);

        let stored = h.store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored, failed);
    }

    /// Store whose documents are rewritten by another writer between load
    /// and save.
    struct RacingStore(InMemoryExecutionStore);

    #[async_trait]
    impl ExecutionStore for RacingStore {
        async fn create(&self, doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError> {
            self.0.create(doc).await
        }

        async fn get(&self, id: &str) -> Result<Option<ExecutionDocument>, StoreError> {
            let doc = self.0.get(id).await?;
            if let Some(doc) = doc.clone() {
                self.0.save(doc).await?;
            }
            Ok(doc)
        }

        async fn save(&self, doc: ExecutionDocument) -> Result<ExecutionDocument, StoreError> {
            self.0.save(doc).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_writer_surfaces_conflict() {
        let store = Arc::new(RacingStore(InMemoryExecutionStore::default()));
        let factory = ExecutionFactory::new(store.clone());
        let runner = ChunkRunner::new(
            store.clone(),
            StaticOracle::at(38),
            RecordingIndexer::succeeding(),
        );
        let id = factory
            .create_manager_execution(ManagerExecutionParams {
                manager_id: 42,
                from_gw: 1,
                to_gw: 3,
            })
            .await
            .unwrap()
            .execution_id;

        let err = runner.run_chunk(&id, 5).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = store.0.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, ExecutionStatus::Pending);
        assert_eq!(stored.counters.gameweeks_processed, 0);
    }
}
