//! # Engine tests
//!
//! Scenario tests exercise single reductions end to end; property tests check the invariants the
//! engine promises at its observable boundaries (after transactions, after `flush`, after
//! `compress`).
use crate::data::number_types::{Real, Tolerances};
use crate::data::postsolve::Postsolve;
use crate::data::problem::{Problem, ProblemBuilder};
use crate::update::options::PresolveOptions;
use crate::update::statistics::Statistics;

mod properties;

/// The owned state a test sets up around the engine.
pub(super) struct Setup<R: Real> {
    pub problem: Problem<R>,
    pub postsolve: Postsolve<R>,
    pub stats: Statistics,
    pub options: PresolveOptions,
    pub num: Tolerances<R>,
}

impl<R: Real> Setup<R> {
    pub fn new(problem: Problem<R>) -> Self {
        let postsolve = Postsolve::new(problem.n_cols(), problem.n_rows());

        Self {
            problem,
            postsolve,
            stats: Statistics::default(),
            options: PresolveOptions::default(),
            num: Tolerances::default(),
        }
    }
}

/// A single continuous column in `[lower, upper]`, appearing in no row.
pub(super) fn free_standing_column<R: Real>(
    lower: Option<f64>,
    upper: Option<f64>,
    objective: f64,
) -> Problem<R> {
    let mut builder = ProblemBuilder::new();
    builder.set_num_cols(1).set_num_rows(0);
    builder.set_col_lower(0, lower.map(R::from_f64));
    builder.set_col_upper(0, upper.map(R::from_f64));
    builder.set_obj(0, R::from_f64(objective));

    builder.build()
}
