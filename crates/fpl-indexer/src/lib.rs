//! FPL Indexer Library
//!
//! This crate provides a resumable, chunked indexing service for Fantasy
//! Premier League gameweek data:
//!
//! - **Executions**: durable job documents tracking a manager or league job
//! - **Chunk runner**: advances an execution by a bounded number of units
//! - **Orchestration**: creates a job and drives it for a few chunks per call
//! - **Adapters**: FPL API, bootstrap oracle, league standings, search index
//!
//! ## Architecture
//!
//! Every request does a bounded amount of work. Progress lives only in the
//! execution document held by the [`store::ExecutionStore`], so any caller
//! can resume a job by id after a crash or a timeout.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from environment variables
//! - [`engine`]: Execution document, factory, runner and orchestrator
//! - [`store`]: Execution store trait with in-memory and PostgreSQL backends
//! - [`client`]: HTTP clients for the FPL API and the search index
//! - [`services`]: Oracle, standings and unit indexer adapters
//! - [`handlers`]: HTTP route handlers
//! - [`state`]: Shared application state
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fpl_indexer::{config::AppConfig, handlers, state::AppState, store::InMemoryExecutionStore};
//!
//! let config = AppConfig::from_env()?;
//! let state = AppState::new(Arc::new(InMemoryExecutionStore::default()), oracle, standings, indexer, config);
//! let app = handlers::routes(state);
//! ```

pub mod client;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod result_ext;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{AppError, AppResult};
pub use result_ext::ResultExt;
