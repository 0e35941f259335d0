//! Application state for the FPL indexer server.
//!
//! This module defines the shared application state that is
//! passed to all handlers via Axum's state management.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::engine::{ChunkRunner, ExecutionFactory, IndexOrchestrator};
use crate::services::{BootstrapOracle, StandingsLookup, UnitIndexer};
use crate::store::ExecutionStore;

/// Shared application state.
///
/// Cloned into every handler; all members are cheap `Arc` handles.
#[derive(Clone)]
pub struct AppState {
    /// Execution store
    pub store: Arc<dyn ExecutionStore>,

    /// Chunk runner over the store
    pub runner: ChunkRunner,

    /// Orchestrator over the store
    pub orchestrator: IndexOrchestrator,

    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire the engine from its collaborators.
    pub fn new(
        store: Arc<dyn ExecutionStore>,
        oracle: Arc<dyn BootstrapOracle>,
        standings: Arc<dyn StandingsLookup>,
        indexer: Arc<dyn UnitIndexer>,
        config: AppConfig,
    ) -> Self {
        let runner = ChunkRunner::new(store.clone(), oracle.clone(), indexer);
        let orchestrator = IndexOrchestrator::new(
            ExecutionFactory::new(store.clone()),
            runner.clone(),
            oracle,
            standings,
            Duration::from_secs(config.orchestrate_budget_secs),
        );

        Self {
            store,
            runner,
            orchestrator,
            config: Arc::new(config),
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the server uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
