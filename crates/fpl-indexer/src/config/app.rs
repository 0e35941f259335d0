//! Application configuration for the FPL indexer server.

use serde::Deserialize;

/// Which execution store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local map; progress is lost on restart.
    Memory,
    /// PostgreSQL table keyed by execution id.
    Postgres,
}

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `FPL_INDEXER_`:
/// - `FPL_INDEXER_HOST`: Server bind address (default: "0.0.0.0")
/// - `FPL_INDEXER_PORT`: Server port (default: 8090)
/// - `FPL_INDEXER_STORE`: `memory` or `postgres` (default: memory)
/// - `FPL_INDEXER_FPL_API_URL`: Upstream FPL API base URL
/// - `FPL_INDEXER_SEARCH_URL`: Search store base URL
/// - `FPL_INDEXER_SEARCH_INDEX`: Index receiving gameweek documents
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Execution store backend
    #[serde(default = "default_store")]
    pub store: StoreBackend,

    /// Upstream FPL API base URL
    #[serde(default = "default_fpl_api_url")]
    pub fpl_api_url: String,

    /// Search store base URL
    #[serde(default = "default_search_url")]
    pub search_url: String,

    /// Index receiving gameweek documents
    #[serde(default = "default_search_index")]
    pub search_index: String,

    /// Timeout for each upstream HTTP request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// How long the current gameweek is cached, in seconds
    #[serde(default = "default_bootstrap_ttl")]
    pub bootstrap_ttl_secs: u64,

    /// Maximum standings pages fetched when resolving a league
    #[serde(default = "default_standings_max_pages")]
    pub standings_max_pages: u32,

    /// Steps per chunk when a request does not say
    #[serde(default = "default_max_steps")]
    pub default_max_steps: i64,

    /// Chunks per orchestrate call when a request does not say
    #[serde(default = "default_max_iterations")]
    pub default_max_iterations: i64,

    /// Wall-clock budget for one orchestrate call, in seconds
    #[serde(default = "default_orchestrate_budget")]
    pub orchestrate_budget_secs: u64,

    /// How long terminal executions are kept by the memory store, in seconds
    #[serde(default = "default_retention")]
    pub execution_retention_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_store() -> StoreBackend {
    StoreBackend::Memory
}

fn default_fpl_api_url() -> String {
    "https://fantasy.premierleague.com/api".to_string()
}

fn default_search_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_search_index() -> String {
    "fpl-gameweeks".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_bootstrap_ttl() -> u64 {
    300
}

fn default_standings_max_pages() -> u32 {
    100
}

fn default_max_steps() -> i64 {
    10
}

fn default_max_iterations() -> i64 {
    3
}

fn default_orchestrate_budget() -> u64 {
    25
}

fn default_retention() -> u64 {
    3600
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `FPL_INDEXER_`.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("FPL_INDEXER_").from_env::<AppConfig>()
    }

    /// Get the server bind address as a string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            store: default_store(),
            fpl_api_url: default_fpl_api_url(),
            search_url: default_search_url(),
            search_index: default_search_index(),
            request_timeout_secs: default_request_timeout(),
            bootstrap_ttl_secs: default_bootstrap_ttl(),
            standings_max_pages: default_standings_max_pages(),
            default_max_steps: default_max_steps(),
            default_max_iterations: default_max_iterations(),
            orchestrate_budget_secs: default_orchestrate_budget(),
            execution_retention_secs: default_retention(),
        }
    }
}
