//! Database models for the FPL indexer.

pub mod execution;

pub use execution::*;
