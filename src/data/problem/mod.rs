//! # Problem
//!
//! The canonical problem state presolve operates on: the constraint matrix with its sides, the
//! variable domains with their flag bits, the objective, the lock counters and the cached row
//! activities. Presolve methods read this aggregate; all mutation goes through the update engine.
use itertools::repeat_n;

use crate::data::compress::compress_data_vector;
use crate::data::elements::{ColFlags, RowFlags};
use crate::data::matrix::ConstraintMatrix;
use crate::data::number_types::{Real, Tolerances};
use crate::data::problem::activity::{compute_row_activity, RowActivity};

pub mod activity;

/// Bounds and status flags of all columns.
#[derive(Clone, Debug)]
pub struct VariableDomains<R> {
    /// Lower bounds; the value is meaningless while the corresponding `LB_INF` flag is set.
    pub lower_bounds: Vec<R>,
    /// Upper bounds; the value is meaningless while the corresponding `UB_INF` flag is set.
    pub upper_bounds: Vec<R>,
    pub flags: Vec<ColFlags>,
}

/// Linear objective with a constant offset accumulated by reductions.
#[derive(Clone, Debug)]
pub struct Objective<R> {
    pub coefficients: Vec<R>,
    pub offset: R,
}

/// Number of rows that would be violated when a column's value moves up or down.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Locks {
    pub up: u32,
    pub down: u32,
}

/// Count the locks a single coefficient contributes to its column.
pub(crate) fn count_locks<R: Real>(value: &R, rflags: RowFlags, locks: &mut Locks) {
    debug_assert!(*value != R::zero());

    if *value < R::zero() {
        if !rflags.test(RowFlags::LHS_INF) {
            locks.up += 1;
        }
        if !rflags.test(RowFlags::RHS_INF) {
            locks.down += 1;
        }
    } else {
        if !rflags.test(RowFlags::LHS_INF) {
            locks.down += 1;
        }
        if !rflags.test(RowFlags::RHS_INF) {
            locks.up += 1;
        }
    }
}

/// The full problem state.
#[derive(Clone, Debug)]
pub struct Problem<R> {
    pub(crate) constraint_matrix: ConstraintMatrix<R>,
    pub(crate) variable_domains: VariableDomains<R>,
    pub(crate) objective: Objective<R>,
    pub(crate) locks: Vec<Locks>,
    pub(crate) activities: Vec<RowActivity<R>>,
    pub(crate) num_integral_cols: usize,
    pub(crate) num_continuous_cols: usize,
}

impl<R: Real> Problem<R> {
    pub fn constraint_matrix(&self) -> &ConstraintMatrix<R> {
        &self.constraint_matrix
    }

    pub fn variable_domains(&self) -> &VariableDomains<R> {
        &self.variable_domains
    }

    pub fn objective(&self) -> &Objective<R> {
        &self.objective
    }

    pub fn locks(&self) -> &[Locks] {
        &self.locks
    }

    pub fn activities(&self) -> &[RowActivity<R>] {
        &self.activities
    }

    /// Logical number of rows, including deleted rows not yet compacted away.
    pub fn n_rows(&self) -> usize {
        self.constraint_matrix.n_rows()
    }

    /// Logical number of columns, including deleted columns not yet compacted away.
    pub fn n_cols(&self) -> usize {
        self.constraint_matrix.n_cols()
    }

    pub fn num_integral_cols(&self) -> usize {
        self.num_integral_cols
    }

    pub fn num_continuous_cols(&self) -> usize {
        self.num_continuous_cols
    }

    /// Recompute every row activity from scratch.
    pub fn recompute_all_activities(&mut self) {
        for (row, activity) in self.activities.iter_mut().enumerate() {
            *activity = compute_row_activity(
                self.constraint_matrix.row(row),
                &self.variable_domains,
            );
        }
    }

    /// Recompute the lock counters of all columns from scratch.
    pub fn recompute_locks(&mut self) {
        for locks in &mut self.locks {
            *locks = Locks::default();
        }

        for col in 0..self.n_cols() {
            for (row, value) in self.constraint_matrix.col(col) {
                if self.constraint_matrix.is_row_redundant(*row) {
                    continue;
                }
                count_locks(value, self.constraint_matrix.row_flags()[*row], &mut self.locks[col]);
            }
        }
    }

    /// Eliminate `col` from the objective using the equality `eq_entries . x = eq_rhs`.
    ///
    /// The column's objective weight is distributed over the other columns of the equality and
    /// the constant part moves into the offset.
    pub(crate) fn substitute_var_in_obj(
        &mut self,
        num: &Tolerances<R>,
        col: usize,
        eq_entries: &[(usize, R)],
        eq_rhs: &R,
    ) {
        let col_coefficient = self.objective.coefficients[col].clone();
        if col_coefficient == R::zero() {
            return;
        }

        let eq_coefficient = eq_entries
            .iter()
            .find(|&&(index, _)| index == col)
            .map(|(_, value)| value.clone())
            .expect("the substituted column should appear in the equality");
        let scale = col_coefficient / eq_coefficient;

        for (other, value) in eq_entries {
            if *other == col {
                continue;
            }
            self.objective.coefficients[*other] -= scale.clone() * value.clone();
            if num.is_zero(&self.objective.coefficients[*other]) {
                self.objective.coefficients[*other] = R::zero();
            }
        }
        self.objective.offset += scale * eq_rhs.clone();
        self.objective.coefficients[col] = R::zero();
    }

    /// Compact all storage, dropping deleted rows and columns.
    ///
    /// Returns the (row, column) index mappings; the caller renumbers its own index structures
    /// with them.
    pub(crate) fn compress(
        &mut self,
        full: bool,
    ) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
        let (row_mapping, col_mapping) = self.constraint_matrix.compress(full);

        compress_data_vector(&col_mapping, &mut self.variable_domains.lower_bounds);
        compress_data_vector(&col_mapping, &mut self.variable_domains.upper_bounds);
        compress_data_vector(&col_mapping, &mut self.variable_domains.flags);
        compress_data_vector(&col_mapping, &mut self.objective.coefficients);
        compress_data_vector(&col_mapping, &mut self.locks);
        compress_data_vector(&row_mapping, &mut self.activities);

        if full {
            self.variable_domains.lower_bounds.shrink_to_fit();
            self.variable_domains.upper_bounds.shrink_to_fit();
            self.variable_domains.flags.shrink_to_fit();
            self.objective.coefficients.shrink_to_fit();
            self.locks.shrink_to_fit();
            self.activities.shrink_to_fit();
        }

        (row_mapping, col_mapping)
    }
}

/// Incremental construction of a `Problem`.
///
/// Bounds and sides are optional values, `None` meaning infinite. Columns default to a zero lower
/// bound, no upper bound, zero objective and continuous type; rows default to both sides free.
#[derive(Clone, Debug)]
pub struct ProblemBuilder<R> {
    entries: Vec<(usize, usize, R)>,
    objective: Vec<R>,
    objective_offset: R,
    lower: Vec<Option<R>>,
    upper: Vec<Option<R>>,
    integral: Vec<bool>,
    lhs: Vec<Option<R>>,
    rhs: Vec<Option<R>>,
}

impl<R: Real> Default for ProblemBuilder<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            objective: Vec::new(),
            objective_offset: R::zero(),
            lower: Vec::new(),
            upper: Vec::new(),
            integral: Vec::new(),
            lhs: Vec::new(),
            rhs: Vec::new(),
        }
    }
}

impl<R: Real> ProblemBuilder<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_num_cols(&mut self, ncols: usize) -> &mut Self {
        self.objective.resize(ncols, R::zero());
        self.lower.resize(ncols, Some(R::zero()));
        self.upper.resize(ncols, None);
        self.integral.resize(ncols, false);
        self
    }

    pub fn set_num_rows(&mut self, nrows: usize) -> &mut Self {
        self.lhs.resize(nrows, None);
        self.rhs.resize(nrows, None);
        self
    }

    pub fn set_col_lower(&mut self, col: usize, bound: Option<R>) -> &mut Self {
        self.lower[col] = bound;
        self
    }

    pub fn set_col_upper(&mut self, col: usize, bound: Option<R>) -> &mut Self {
        self.upper[col] = bound;
        self
    }

    pub fn set_col_integral(&mut self, col: usize, integral: bool) -> &mut Self {
        self.integral[col] = integral;
        self
    }

    pub fn set_obj(&mut self, col: usize, value: R) -> &mut Self {
        self.objective[col] = value;
        self
    }

    pub fn set_obj_offset(&mut self, offset: R) -> &mut Self {
        self.objective_offset = offset;
        self
    }

    pub fn set_row_lhs(&mut self, row: usize, side: Option<R>) -> &mut Self {
        self.lhs[row] = side;
        self
    }

    pub fn set_row_rhs(&mut self, row: usize, side: Option<R>) -> &mut Self {
        self.rhs[row] = side;
        self
    }

    /// Stage a coefficient; zeros are dropped.
    pub fn add_entry(&mut self, row: usize, col: usize, value: R) -> &mut Self {
        if value != R::zero() {
            self.entries.push((row, col, value));
        }
        self
    }

    pub fn build(self) -> Problem<R> {
        let ncols = self.objective.len();
        let nrows = self.lhs.len();

        let mut flags: Vec<ColFlags> = repeat_n(ColFlags::NONE, ncols).collect();
        let mut lower_bounds = Vec::with_capacity(ncols);
        let mut upper_bounds = Vec::with_capacity(ncols);
        for col in 0..ncols {
            match &self.lower[col] {
                Some(bound) => lower_bounds.push(bound.clone()),
                None => {
                    flags[col].set(ColFlags::LB_INF);
                    lower_bounds.push(R::zero());
                }
            }
            match &self.upper[col] {
                Some(bound) => upper_bounds.push(bound.clone()),
                None => {
                    flags[col].set(ColFlags::UB_INF);
                    upper_bounds.push(R::zero());
                }
            }
            if self.integral[col] {
                flags[col].set(ColFlags::INTEGRAL);
            }
        }
        let num_integral_cols = self.integral.iter().filter(|&&integral| integral).count();

        let mut row_flags: Vec<RowFlags> = repeat_n(RowFlags::NONE, nrows).collect();
        let mut lhs = Vec::with_capacity(nrows);
        let mut rhs = Vec::with_capacity(nrows);
        for row in 0..nrows {
            match &self.lhs[row] {
                Some(side) => lhs.push(side.clone()),
                None => {
                    row_flags[row].set(RowFlags::LHS_INF);
                    lhs.push(R::zero());
                }
            }
            match &self.rhs[row] {
                Some(side) => rhs.push(side.clone()),
                None => {
                    row_flags[row].set(RowFlags::RHS_INF);
                    rhs.push(R::zero());
                }
            }
            if !row_flags[row].test(RowFlags::LHS_INF | RowFlags::RHS_INF)
                && lhs[row] == rhs[row]
            {
                row_flags[row].set(RowFlags::EQUATION);
            }
        }

        let constraint_matrix =
            ConstraintMatrix::from_triplets(nrows, ncols, self.entries, lhs, rhs, row_flags);

        let mut problem = Problem {
            constraint_matrix,
            variable_domains: VariableDomains {
                lower_bounds,
                upper_bounds,
                flags,
            },
            objective: Objective {
                coefficients: self.objective,
                offset: self.objective_offset,
            },
            locks: repeat_n(Locks::default(), ncols).collect(),
            activities: repeat_n(RowActivity::new(), nrows).collect(),
            num_integral_cols,
            num_continuous_cols: ncols - num_integral_cols,
        };
        problem.recompute_all_activities();

        problem
    }
}

#[cfg(test)]
mod test {
    use crate::data::elements::{ColFlags, RowFlags};
    use crate::data::number_types::Tolerances;
    use crate::data::problem::{Locks, ProblemBuilder};

    fn small_problem() -> super::Problem<f64> {
        // x0 + 2 x1 = 4, -x0 + x1 <= 1 with x0 in [0, 3], x1 in [0, inf), min x0 - x1.
        let mut builder = ProblemBuilder::new();
        builder.set_num_cols(2).set_num_rows(2);
        builder.set_col_upper(0, Some(3.0));
        builder.set_obj(0, 1.0).set_obj(1, -1.0);
        builder.set_row_lhs(0, Some(4.0)).set_row_rhs(0, Some(4.0));
        builder.set_row_rhs(1, Some(1.0));
        builder.add_entry(0, 0, 1.0).add_entry(0, 1, 2.0);
        builder.add_entry(1, 0, -1.0).add_entry(1, 1, 1.0);

        builder.build()
    }

    #[test]
    fn build_flags_and_activities() {
        let problem = small_problem();

        assert!(problem.variable_domains().flags[1].test(ColFlags::UB_INF));
        assert!(problem.constraint_matrix().row_flags()[0].test(RowFlags::EQUATION));
        assert!(problem.constraint_matrix().row_flags()[1].test(RowFlags::LHS_INF));

        let activity = &problem.activities()[0];
        assert_eq!(activity.min, 0.0);
        assert_eq!(activity.ninf_max, 1);

        assert_eq!(problem.num_integral_cols(), 0);
        assert_eq!(problem.num_continuous_cols(), 2);
    }

    #[test]
    fn lock_counting() {
        let mut problem = small_problem();
        problem.recompute_locks();

        // x0: positive in the equation (both locks), negative in the <= row (down lock).
        assert_eq!(problem.locks()[0], Locks { up: 1, down: 2 });
        // x1: positive in both rows.
        assert_eq!(problem.locks()[1], Locks { up: 2, down: 1 });
    }

    #[test]
    fn objective_substitution() {
        let mut problem = small_problem();
        let num = Tolerances::default();

        // Substitute x1 through the equality x0 + 2 x1 = 4.
        let equality = problem.constraint_matrix().row(0).to_vec();
        problem.substitute_var_in_obj(&num, 1, &equality, &4.0);

        assert_eq!(problem.objective().coefficients[1], 0.0);
        // min x0 - x1 = min x0 - (4 - x0) / 2 = min 1.5 x0 - 2.
        assert_eq!(problem.objective().coefficients[0], 1.5);
        assert_eq!(problem.objective().offset, -2.0);
    }
}
