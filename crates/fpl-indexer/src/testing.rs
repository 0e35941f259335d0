//! In-crate fakes for the engine's collaborators.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::ClientError;
use crate::services::{BootstrapOracle, IndexUnit, StandingsLookup, UnitIndexer};

/// Oracle pinned to one gameweek, or failing every call.
pub struct StaticOracle {
    gameweek: Option<u32>,
    pub calls: AtomicUsize,
}

impl StaticOracle {
    pub fn at(gameweek: u32) -> Arc<Self> {
        Arc::new(Self {
            gameweek: Some(gameweek),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            gameweek: None,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl BootstrapOracle for StaticOracle {
    async fn current_gameweek(&self) -> Result<u32, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gameweek
            .ok_or_else(|| ClientError::InvalidResponse("bootstrap unavailable".to_string()))
    }
}

/// Indexer that records every unit and answers from a script.
#[derive(Default)]
pub struct RecordingIndexer {
    /// Units answered with `Ok(false)`.
    failing: HashSet<(i64, u32)>,
    /// Units answered with `Err`.
    erroring: HashSet<(i64, u32)>,
    pub units: Mutex<Vec<IndexUnit>>,
}

impl RecordingIndexer {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(units: &[(i64, u32)]) -> Arc<Self> {
        Arc::new(Self {
            failing: units.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn erroring_on(units: &[(i64, u32)]) -> Arc<Self> {
        Arc::new(Self {
            erroring: units.iter().copied().collect(),
            ..Self::default()
        })
    }

    pub fn indexed(&self) -> Vec<(i64, u32)> {
        self.units
            .lock()
            .unwrap()
            .iter()
            .map(|u| (u.manager_id, u.gameweek))
            .collect()
    }
}

#[async_trait]
impl UnitIndexer for RecordingIndexer {
    async fn index_unit(&self, unit: &IndexUnit) -> Result<bool, ClientError> {
        self.units.lock().unwrap().push(*unit);
        let key = (unit.manager_id, unit.gameweek);
        if self.erroring.contains(&key) {
            return Err(ClientError::InvalidResponse(format!(
                "search store unreachable for {}",
                unit.document_id()
            )));
        }
        Ok(!self.failing.contains(&key))
    }
}

/// Standings lookup with a fixed answer.
pub struct StaticStandings(pub Vec<i64>);

#[async_trait]
impl StandingsLookup for StaticStandings {
    async fn manager_ids(&self, _league_id: i64) -> Result<Vec<i64>, ClientError> {
        Ok(self.0.clone())
    }
}
