//! # Options
//!
//! Tunables consumed by the update engine. The small-coefficient cleanup thresholds are
//! empirically tuned values; they are options rather than constants so that exact-arithmetic runs
//! can tighten or disable them.

/// Engine tunables.
#[derive(Clone, Debug)]
pub struct PresolveOptions {
    /// Seed for the deterministic row and column permutations.
    pub randomseed: u32,
    /// Compress storage when the active fraction of rows or columns drops below this; `0.0`
    /// disables compression.
    pub compressfac: f64,
    /// Coefficients with a smaller absolute value are removed unconditionally.
    pub minabscoeff: f64,
    /// Dual reductions: `0` off, `1` only for columns with a nonzero objective, `2` always.
    pub dualreds: i32,
    /// Net fill-in a single substitution may introduce.
    pub maxfillinpersubstitution: i32,
    /// Largest scale magnitude with which a row may take part in a substitution.
    pub maxshiftperrow: f64,
    /// Absolute threshold below which a coefficient is a cleanup candidate.
    pub smallcoeff_abs: f64,
    /// Per-coefficient cleanup budget, as a fraction of the feasibility tolerance.
    pub smallcoeff_rowbudget: f64,
    /// Total per-row cleanup budget, as a fraction of the feasibility tolerance.
    pub smallcoeff_totalbudget: f64,
}

impl Default for PresolveOptions {
    fn default() -> Self {
        Self {
            randomseed: 0,
            compressfac: 0.8,
            minabscoeff: 1e-10,
            dualreds: 2,
            maxfillinpersubstitution: 10,
            maxshiftperrow: 10.0,
            smallcoeff_abs: 1e-3,
            smallcoeff_rowbudget: 1e-2,
            smallcoeff_totalbudget: 0.1,
        }
    }
}
