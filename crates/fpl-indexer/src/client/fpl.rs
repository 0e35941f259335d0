//! Fantasy Premier League API client.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_http_client, ClientError};

/// Gameweek entry of `bootstrap-static`.
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub id: u32,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub finished: bool,
}

/// Subset of `bootstrap-static` the indexer needs.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapStatic {
    pub events: Vec<Event>,
}

/// One row of a classic league's standings.
#[derive(Debug, Clone, Deserialize)]
pub struct StandingEntry {
    /// Manager (entry) id.
    pub entry: i64,
    #[serde(default)]
    pub entry_name: Option<String>,
    #[serde(default)]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Standings {
    #[serde(default)]
    pub has_next: bool,
    pub page: u32,
    pub results: Vec<StandingEntry>,
}

/// One page of `leagues-classic/{id}/standings`.
#[derive(Debug, Clone, Deserialize)]
pub struct StandingsPage {
    pub standings: Standings,
}

/// Gameweek summary of a manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryHistory {
    pub event: u32,
    pub points: i32,
    pub total_points: i32,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub overall_rank: Option<u32>,
    #[serde(default)]
    pub bank: i32,
    #[serde(default)]
    pub value: i32,
    #[serde(default)]
    pub event_transfers: u32,
    #[serde(default)]
    pub event_transfers_cost: i32,
    #[serde(default)]
    pub points_on_bench: i32,
}

/// A player slot in a manager's gameweek squad.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub element: u32,
    pub position: u32,
    pub multiplier: u32,
    #[serde(default)]
    pub is_captain: bool,
    #[serde(default)]
    pub is_vice_captain: bool,
}

/// Response of `entry/{id}/event/{gw}/picks`.
#[derive(Debug, Clone, Deserialize)]
pub struct GameweekPicks {
    #[serde(default)]
    pub active_chip: Option<String>,
    pub entry_history: EntryHistory,
    pub picks: Vec<Pick>,
}

/// HTTP client for the FPL API.
#[derive(Clone)]
pub struct FplClient {
    client: reqwest::Client,
    base_url: String,
}

impl FplClient {
    /// Create a new FPL client.
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            client: build_http_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the season overview, including the gameweek calendar.
    pub async fn bootstrap_static(&self) -> Result<BootstrapStatic, ClientError> {
        let url = format!("{}/bootstrap-static/", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch one page (1-based) of a classic league's standings.
    pub async fn league_standings(
        &self,
        league_id: i64,
        page: u32,
    ) -> Result<StandingsPage, ClientError> {
        let url = format!(
            "{}/leagues-classic/{}/standings/?page_standings={}",
            self.base_url, league_id, page
        );
        debug!(league_id, page, "Fetching league standings");
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch a manager's picks for a gameweek.
    ///
    /// Returns `None` when FPL has no data for that pair, e.g. the manager
    /// joined after the gameweek was played.
    pub async fn gameweek_picks(
        &self,
        manager_id: i64,
        gameweek: u32,
    ) -> Result<Option<GameweekPicks>, ClientError> {
        let url = format!(
            "{}/entry/{}/event/{}/picks/",
            self.base_url, manager_id, gameweek
        );
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(ClientError::Status {
                status: status.as_u16(),
                url,
            }),
        }
    }
}
