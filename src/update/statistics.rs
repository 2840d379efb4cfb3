//! # Statistics
//!
//! Plain counters over everything the engine changes. `nrounds` doubles as the epoch that keeps
//! rows from being queued for activity checks more than once per presolve round.

/// Counters of applied reductions.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Statistics {
    pub nboundchgs: i64,
    pub nsidechgs: i64,
    pub ncoefchgs: i64,
    pub ndeletedcols: i64,
    pub ndeletedrows: i64,
    /// Current presolve round, incremented by the driver.
    pub nrounds: i64,
}
