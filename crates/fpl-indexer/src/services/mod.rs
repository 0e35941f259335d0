//! Collaborators the indexing engine consumes.
//!
//! Each is a trait so the engine stays independent of FPL and of the
//! search store; the `Fpl*` and `Gameweek*` types are the production
//! implementations.

pub mod indexing;
pub mod oracle;
pub mod standings;

pub use indexing::{GameweekIndexer, IndexUnit, UnitIndexer};
pub use oracle::{BootstrapOracle, FplBootstrapOracle};
pub use standings::{FplStandingsLookup, StandingsLookup};
