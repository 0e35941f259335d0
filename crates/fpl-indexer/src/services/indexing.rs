//! Per-(manager, gameweek) indexing operation.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::fpl::GameweekPicks;
use crate::client::{ClientError, FplClient, SearchClient};

/// One unit of indexing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUnit {
    pub manager_id: i64,
    pub gameweek: u32,
    /// League the unit is indexed on behalf of, if any.
    pub league_id: Option<i64>,
}

impl IndexUnit {
    /// Search document id; the same unit always maps to the same document.
    pub fn document_id(&self) -> String {
        format!("{}-{}", self.manager_id, self.gameweek)
    }
}

/// Indexes one unit.
///
/// `Ok(false)` is an ordinary per-unit failure; `Err` is an infrastructure
/// failure the caller is not expected to absorb.
#[async_trait]
pub trait UnitIndexer: Send + Sync {
    async fn index_unit(&self, unit: &IndexUnit) -> Result<bool, ClientError>;
}

/// Fetches a manager's gameweek picks from FPL and writes them to the
/// search store.
pub struct GameweekIndexer {
    fpl: FplClient,
    search: SearchClient,
}

impl GameweekIndexer {
    pub fn new(fpl: FplClient, search: SearchClient) -> Self {
        Self { fpl, search }
    }
}

/// Flatten a picks response into the search document for `unit`.
pub fn build_gameweek_document(unit: &IndexUnit, picks: &GameweekPicks) -> serde_json::Value {
    let history = &picks.entry_history;
    let captain = picks.picks.iter().find(|p| p.is_captain).map(|p| p.element);
    let vice_captain = picks
        .picks
        .iter()
        .find(|p| p.is_vice_captain)
        .map(|p| p.element);

    json!({
        "manager_id": unit.manager_id,
        "league_id": unit.league_id,
        "gameweek": unit.gameweek,
        "points": history.points,
        "total_points": history.total_points,
        "gameweek_rank": history.rank,
        "overall_rank": history.overall_rank,
        "bank": history.bank,
        "team_value": history.value,
        "transfers": history.event_transfers,
        "transfers_cost": history.event_transfers_cost,
        "points_on_bench": history.points_on_bench,
        "chip": picks.active_chip,
        "captain": captain,
        "vice_captain": vice_captain,
        "picks": picks.picks,
        "indexed_at": Utc::now(),
    })
}

#[async_trait]
impl UnitIndexer for GameweekIndexer {
    async fn index_unit(&self, unit: &IndexUnit) -> Result<bool, ClientError> {
        let Some(picks) = self.fpl.gameweek_picks(unit.manager_id, unit.gameweek).await? else {
            debug!(
                manager_id = unit.manager_id,
                gameweek = unit.gameweek,
                "No picks upstream for gameweek"
            );
            return Ok(false);
        };

        let document = build_gameweek_document(unit, &picks);
        self.search
            .index_document(&unit.document_id(), &document)
            .await
    }
}
