//! Database queries for the FPL indexer.

pub mod execution;
