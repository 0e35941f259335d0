//! Resumable chunked indexing engine.
//!
//! - **Document**: the execution record, its status machine and cursor
//! - **Factory**: validates and creates manager or league executions
//! - **Runner**: advances one execution by a bounded chunk of steps
//! - **Orchestrator**: creates an execution and drives a few chunks of it

pub mod document;
pub mod factory;
pub mod orchestrator;
pub mod runner;

pub use document::{
    ExecutionDocument, ExecutionKind, ExecutionScope, ExecutionStatus, GameweekCounters,
};
pub use factory::{ExecutionFactory, LeagueExecutionParams, ManagerExecutionParams};
pub use orchestrator::{IndexOrchestrator, IndexTarget, OrchestrateRequest, OrchestrationOutcome};
pub use runner::{clamp_max_steps, ChunkRunner, MAX_STEPS_PER_CHUNK, MIN_STEPS_PER_CHUNK};

/// Upper bound on chunks a single orchestrate call may run.
pub const MAX_ITERATIONS: u32 = 30;

/// Last gameweek of a season.
pub const MAX_GAMEWEEK: u32 = 38;
