//! # Update engine
//!
//! The state machine that owns the evolving problem during presolve. Presolve methods read the
//! problem and propose transactions of reductions; this module serializes them, executes the
//! trivial reductions itself, keeps activities, locks, queues and the postsolve log consistent,
//! and compacts storage between rounds.
//!
//! The engine is single threaded with respect to one problem: methods may read concurrently, but
//! all mutation happens through one `ProblemUpdate` at a time. Only the index renumbering inside
//! [`ProblemUpdate::compress`] fans out, over disjoint data.
use std::ops::BitOr;

use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::data::compress::{compress_data_vector, compress_index_vector};
use crate::data::elements::{
    ActivityChange, BoundDirection, ColFlags, PresolveStatus, RowFlags, RowStatus,
};
use crate::data::matrix::buffer::MatrixBuffer;
use crate::data::number_types::{Real, Tolerances};
use crate::data::postsolve::Postsolve;
use crate::data::problem::activity::{update_activity_after_coeffchange, RowActivity};
use crate::data::problem::Problem;
use crate::update::options::PresolveOptions;
use crate::update::statistics::Statistics;

mod bounds;
pub mod options;
pub mod reduction;
pub mod statistics;
mod transaction;
mod trivial;

#[cfg(test)]
mod test;

/// Transaction state of a row or column within the current round.
///
/// Only entries recorded in the dirty vectors differ from `Unmodified`, so resetting at a round
/// boundary is proportional to the number of touched rows and columns.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct State(u8);
impl State {
    pub(crate) const LOCKED: Self = Self(1 << 0);
    pub(crate) const MODIFIED: Self = Self(1 << 1);
    pub(crate) const BOUNDS_MODIFIED: Self = Self(1 << 2);

    pub(crate) fn test(self, flags: Self) -> bool {
        self.0 & flags.0 != 0
    }

    pub(crate) fn set(&mut self, flags: Self) {
        self.0 |= flags.0;
    }

    pub(crate) fn is_unmodified(self) -> bool {
        self.0 == 0
    }
}
impl BitOr for State {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Hook for collaborators that persist row or column indices across compressions.
pub trait CompressObserver {
    fn compress(&mut self, row_mapping: &[Option<usize>], col_mapping: &[Option<usize>]);
}

/// Queue a row for the changed-activities checks, at most once per round.
///
/// A row is only queued when the changed activity side has a definite value (at most one infinite
/// contributor) and the row is still alive. Suppressing repeated queueing through the round epoch
/// is what keeps activity propagation from going quadratic.
pub(crate) fn queue_activity_change<R: Real>(
    nrounds: i64,
    redundant: bool,
    change: ActivityChange,
    row: usize,
    activity: &mut RowActivity<R>,
    changed_activities: &mut Vec<usize>,
) {
    if activity.last_change == nrounds {
        return;
    }
    if change == ActivityChange::Min && activity.ninf_min > 1 {
        return;
    }
    if change == ActivityChange::Max && activity.ninf_max > 1 {
        return;
    }
    if redundant {
        return;
    }

    activity.last_change = nrounds;
    changed_activities.push(row);
}

/// Make the activity-change callback used by the bound-change helpers.
pub(crate) fn activity_tracker<'x, R: Real>(
    nrounds: i64,
    row_flags: &'x [RowFlags],
    changed_activities: &'x mut Vec<usize>,
) -> impl FnMut(ActivityChange, usize, &mut RowActivity<R>) + 'x {
    move |change, row, activity| {
        queue_activity_change(
            nrounds,
            row_flags[row].test(RowFlags::REDUNDANT),
            change,
            row,
            activity,
            changed_activities,
        );
    }
}

/// The presolve update engine.
///
/// Owns mutable access to the problem, the postsolve log and the statistics for the duration of
/// presolving, and carries all per-round bookkeeping: dirty transaction states, deletion queues,
/// the changed-activities list, singleton and empty column queues, staged coefficient edits and
/// the deterministic random permutations.
pub struct ProblemUpdate<'a, R: Real> {
    problem: &'a mut Problem<R>,
    postsolve: &'a mut Postsolve<R>,
    stats: &'a mut Statistics,
    options: &'a PresolveOptions,
    num: &'a Tolerances<R>,

    postpone_substitutions: bool,
    dirty_row_states: Vec<usize>,
    dirty_col_states: Vec<usize>,

    deleted_cols: Vec<usize>,
    redundant_rows: Vec<usize>,

    changed_activities: Vec<usize>,
    singleton_rows: Vec<usize>,
    singleton_columns: Vec<usize>,
    empty_columns: Vec<usize>,
    first_new_singleton_col: usize,

    matrix_buffer: MatrixBuffer<R>,

    compress_observers: Vec<Box<dyn CompressObserver + Send + 'a>>,

    random_col_perm: Vec<usize>,
    random_row_perm: Vec<usize>,

    lastcompress_ndelrows: i64,
    lastcompress_ndelcols: i64,

    row_state: Vec<State>,
    col_state: Vec<State>,
}

impl<'a, R: Real> ProblemUpdate<'a, R> {
    /// Create an engine over the given problem.
    ///
    /// The random row and column permutations are Fisher-Yates shuffles seeded deterministically
    /// from `options.randomseed`.
    pub fn new(
        problem: &'a mut Problem<R>,
        postsolve: &'a mut Postsolve<R>,
        stats: &'a mut Statistics,
        options: &'a PresolveOptions,
        num: &'a Tolerances<R>,
    ) -> Self {
        let ncols = problem.n_cols();
        let nrows = problem.n_rows();

        let mut rng = SmallRng::seed_from_u64(options.randomseed as u64);
        let mut random_col_perm: Vec<usize> = (0..ncols).collect();
        random_col_perm.shuffle(&mut rng);
        let mut random_row_perm: Vec<usize> = (0..nrows).collect();
        random_row_perm.shuffle(&mut rng);

        Self {
            problem,
            postsolve,
            stats,
            options,
            num,

            postpone_substitutions: true,
            dirty_row_states: Vec::new(),
            dirty_col_states: Vec::new(),

            deleted_cols: Vec::new(),
            redundant_rows: Vec::new(),

            changed_activities: Vec::new(),
            singleton_rows: Vec::new(),
            singleton_columns: Vec::new(),
            empty_columns: Vec::new(),
            first_new_singleton_col: 0,

            matrix_buffer: MatrixBuffer::default(),

            compress_observers: Vec::new(),

            random_col_perm,
            random_row_perm,

            lastcompress_ndelrows: 0,
            lastcompress_ndelcols: 0,

            row_state: vec![State::default(); nrows],
            col_state: vec![State::default(); ncols],
        }
    }

    /// Defer substitutions and sparsification to a later phase.
    pub fn set_postpone_substitutions(&mut self, postpone: bool) {
        self.postpone_substitutions = postpone;
    }

    pub fn observe_compress(&mut self, observer: Box<dyn CompressObserver + Send + 'a>) {
        self.compress_observers.push(observer);
    }

    pub fn problem(&self) -> &Problem<R> {
        self.problem
    }

    pub fn postsolve(&self) -> &Postsolve<R> {
        self.postsolve
    }

    pub fn statistics(&self) -> &Statistics {
        self.stats
    }

    pub fn presolve_options(&self) -> &PresolveOptions {
        self.options
    }

    pub fn get_changed_activities(&self) -> &[usize] {
        &self.changed_activities
    }

    pub fn get_singleton_cols(&self) -> &[usize] {
        &self.singleton_columns
    }

    /// Boundary between singleton columns discovered in earlier rounds and in the current one.
    pub fn get_first_new_singleton_col(&self) -> usize {
        self.first_new_singleton_col
    }

    pub fn get_random_col_perm(&self) -> &[usize] {
        &self.random_col_perm
    }

    pub fn get_random_row_perm(&self) -> &[usize] {
        &self.random_row_perm
    }

    pub fn get_n_active_rows(&self) -> usize {
        self.problem.n_rows() - (self.stats.ndeletedrows - self.lastcompress_ndelrows) as usize
    }

    pub fn get_n_active_cols(&self) -> usize {
        self.problem.n_cols() - (self.stats.ndeletedcols - self.lastcompress_ndelcols) as usize
    }

    /// Substitution preference between two columns: sparser wins, then a zero objective wins, and
    /// the deterministic random permutation breaks remaining ties.
    pub fn is_col_better_for_substitution(&self, col1: usize, col2: usize) -> bool {
        let size1 = self.problem.constraint_matrix().col_sizes()[col1];
        let size2 = self.problem.constraint_matrix().col_sizes()[col2];
        if size1 != size2 {
            return size1 < size2;
        }

        let obj1_zero = self.problem.objective().coefficients[col1] == R::zero();
        let obj2_zero = self.problem.objective().coefficients[col2] == R::zero();
        if obj1_zero != obj2_zero {
            return obj1_zero;
        }

        self.random_col_perm[col1] < self.random_col_perm[col2]
    }

    /// Forget the activity changes and advance the singleton watermark; called between rounds.
    pub fn clear_change_info(&mut self) {
        self.changed_activities.clear();
        self.first_new_singleton_col = self.singleton_columns.len();
    }

    pub(crate) fn set_col_state(&mut self, col: usize, flags: State) {
        debug_assert!(col < self.problem.n_cols());

        if self.col_state[col].is_unmodified() {
            self.dirty_col_states.push(col);
        }
        self.col_state[col].set(flags);
    }

    pub(crate) fn set_row_state(&mut self, row: usize, flags: State) {
        debug_assert!(row < self.problem.n_rows());
        // The equation flag must be consistent with the sides whenever a row is touched.
        debug_assert!({
            let matrix = self.problem.constraint_matrix();
            let rflags = matrix.row_flags()[row];
            rflags.test(RowFlags::REDUNDANT)
                || (!rflags.test(RowFlags::EQUATION)
                    && (rflags.test(RowFlags::LHS_INF | RowFlags::RHS_INF)
                        || matrix.lhs()[row] != matrix.rhs()[row]))
                || (rflags.test(RowFlags::EQUATION)
                    && !rflags.test(RowFlags::LHS_INF | RowFlags::RHS_INF)
                    && matrix.lhs()[row] == matrix.rhs()[row])
        });

        if self.row_state[row].is_unmodified() {
            self.dirty_row_states.push(row);
        }
        self.row_state[row].set(flags);
    }

    /// Flag a row redundant and queue it for deletion, once.
    pub(crate) fn mark_row_redundant(&mut self, row: usize) {
        let rflags = &mut self.problem.constraint_matrix.row_flags[row];
        if !rflags.test(RowFlags::REDUNDANT) {
            rflags.set(RowFlags::REDUNDANT);
            self.redundant_rows.push(row);
            self.stats.ndeletedrows += 1;
        }
    }

    /// Flag a column fixed and queue it for deletion.
    pub(crate) fn mark_col_fixed(&mut self, col: usize) {
        let cflags = &mut self.problem.variable_domains.flags[col];
        debug_assert!(!cflags.test(ColFlags::INACTIVE));

        cflags.set(ColFlags::FIXED);
        self.deleted_cols.push(col);
        self.stats.ndeletedcols += 1;

        if cflags.test(ColFlags::INTEGRAL) {
            self.problem.num_integral_cols -= 1;
        } else {
            self.problem.num_continuous_cols -= 1;
        }
    }

    /// Replay the staged coefficient edits into the matrix, keeping activities exact.
    pub fn flush_changed_coeffs(&mut self) {
        if self.matrix_buffer.is_empty() {
            return;
        }

        let Problem {
            constraint_matrix,
            variable_domains,
            activities,
            ..
        } = &mut *self.problem;
        let nrounds = self.stats.nrounds;
        let stats = &mut *self.stats;
        let changed_activities = &mut self.changed_activities;

        constraint_matrix.change_coefficients(
            &mut self.matrix_buffer,
            &mut self.singleton_rows,
            &mut self.singleton_columns,
            &mut self.empty_columns,
            activities,
            |row, col, old, new, rflags, activity| {
                update_activity_after_coeffchange(
                    &variable_domains.lower_bounds[col],
                    &variable_domains.upper_bounds[col],
                    variable_domains.flags[col],
                    old,
                    new,
                    activity,
                    |change, activity| {
                        queue_activity_change(
                            nrounds,
                            rflags.test(RowFlags::REDUNDANT),
                            change,
                            row,
                            activity,
                            changed_activities,
                        );
                    },
                );
                stats.ncoefchgs += 1;
            },
        );
    }

    /// Check the queued rows for redundancy or infeasibility against their sides.
    pub fn check_changed_activities(&mut self) -> PresolveStatus {
        let mut status = PresolveStatus::Unchanged;

        for index in 0..self.changed_activities.len() {
            let row = self.changed_activities[index];
            let matrix = self.problem.constraint_matrix();
            if matrix.row_flags()[row].test(RowFlags::REDUNDANT) {
                continue;
            }

            let row_status = self.problem.activities[row].check_status(
                self.num,
                matrix.row_flags()[row],
                &matrix.lhs()[row],
                &matrix.rhs()[row],
            );
            match row_status {
                RowStatus::Redundant => {
                    self.mark_row_redundant(row);
                    status = PresolveStatus::Reduced;
                }
                RowStatus::RedundantLhs => {
                    self.problem.constraint_matrix.clear_lhs(row);
                    status = PresolveStatus::Reduced;
                }
                RowStatus::RedundantRhs => {
                    self.problem.constraint_matrix.clear_rhs(row);
                    status = PresolveStatus::Reduced;
                }
                RowStatus::Infeasible => {
                    debug!("activity check detected infeasible row {}", row);
                    return PresolveStatus::Infeasible;
                }
                RowStatus::Unknown => (),
            }
        }

        status
    }

    /// Translate fixed columns into side and activity constants and notify postsolve.
    ///
    /// Columns fixed at an infinite bound are only logged; their rows are redundant by the time
    /// this runs.
    pub(crate) fn remove_fixed_cols(&mut self) {
        let Problem {
            constraint_matrix,
            variable_domains,
            objective,
            activities,
            ..
        } = &mut *self.problem;

        for &col in &self.deleted_cols {
            let cflags = variable_domains.flags[col];
            if !cflags.test(ColFlags::FIXED) {
                continue;
            }

            if cflags.test(ColFlags::LB_INF) {
                self.postsolve.notify_fixed_inf_col(
                    col,
                    BoundDirection::Lower,
                    variable_domains.upper_bounds[col].clone(),
                    constraint_matrix.col(col),
                );
                continue;
            }
            if cflags.test(ColFlags::UB_INF) {
                self.postsolve.notify_fixed_inf_col(
                    col,
                    BoundDirection::Upper,
                    variable_domains.lower_bounds[col].clone(),
                    constraint_matrix.col(col),
                );
                continue;
            }

            debug_assert!(
                variable_domains.lower_bounds[col] == variable_domains.upper_bounds[col]
            );
            let value = variable_domains.lower_bounds[col].clone();
            self.postsolve.notify_fixed_col(col, value.clone());

            // Fixed to zero contributes nothing to sides or activities.
            if value == R::zero() {
                continue;
            }

            if objective.coefficients[col] != R::zero() {
                objective.offset += value.clone() * objective.coefficients[col].clone();
                objective.coefficients[col] = R::zero();
            }

            let col_entries = constraint_matrix.cols[col].clone();
            for (row, coefficient) in col_entries {
                if constraint_matrix.row_flags[row].test(RowFlags::REDUNDANT) {
                    continue;
                }

                let constant = value.clone() * coefficient;
                activities[row].min -= constant.clone();
                activities[row].max -= constant.clone();

                if !constraint_matrix.row_flags[row].test(RowFlags::LHS_INF) {
                    constraint_matrix.lhs[row] -= constant.clone();
                }
                if !constraint_matrix.row_flags[row].test(RowFlags::RHS_INF) {
                    constraint_matrix.rhs[row] -= constant;
                }
                constraint_matrix.update_equation_flag(row);
            }
        }
    }

    /// Fix queued empty columns to the bound their objective points at.
    ///
    /// Only runs when dual reductions are enabled; an empty column whose objective pushes towards
    /// a missing bound makes the problem unbounded or infeasible.
    pub(crate) fn remove_empty_columns(&mut self) -> PresolveStatus {
        if self.options.dualreds == 0 || self.empty_columns.is_empty() {
            return PresolveStatus::Unchanged;
        }

        for index in 0..self.empty_columns.len() {
            let col = self.empty_columns[index];
            let Problem {
                constraint_matrix,
                variable_domains,
                objective,
                num_integral_cols,
                num_continuous_cols,
                ..
            } = &mut *self.problem;

            if constraint_matrix.col_sizes[col] != 0 {
                continue;
            }
            if self.options.dualreds == 1 && objective.coefficients[col] == R::zero() {
                continue;
            }

            if !variable_domains.flags[col].test(ColFlags::INACTIVE) {
                let flags = variable_domains.flags[col];
                let fix_value;

                if objective.coefficients[col] == R::zero() {
                    // Prefer zero, clipped into the domain.
                    if !flags.test(ColFlags::UB_INF)
                        && variable_domains.upper_bounds[col] < R::zero()
                    {
                        fix_value = variable_domains.upper_bounds[col].clone();
                    } else if !flags.test(ColFlags::LB_INF)
                        && variable_domains.lower_bounds[col] > R::zero()
                    {
                        fix_value = variable_domains.lower_bounds[col].clone();
                    } else {
                        fix_value = R::zero();
                    }
                } else {
                    if objective.coefficients[col] < R::zero() {
                        if flags.test(ColFlags::UB_INF) {
                            debug!("empty column {} is unbounded or infeasible", col);
                            return PresolveStatus::UnboundedOrInfeasible;
                        }
                        fix_value = variable_domains.upper_bounds[col].clone();
                    } else {
                        if flags.test(ColFlags::LB_INF) {
                            debug!("empty column {} is unbounded or infeasible", col);
                            return PresolveStatus::UnboundedOrInfeasible;
                        }
                        fix_value = variable_domains.lower_bounds[col].clone();
                    }

                    objective.offset +=
                        objective.coefficients[col].clone() * fix_value.clone();
                    objective.coefficients[col] = R::zero();
                }

                self.postsolve.notify_fixed_col(col, fix_value);
                variable_domains.flags[col].set(ColFlags::FIXED);
                self.stats.ndeletedcols += 1;

                if variable_domains.flags[col].test(ColFlags::INTEGRAL) {
                    *num_integral_cols -= 1;
                } else {
                    *num_continuous_cols -= 1;
                }
            }

            debug_assert!(self.problem.objective.coefficients[col] == R::zero());
            self.problem.constraint_matrix.col_sizes[col] = -1;
        }

        self.empty_columns.clear();

        PresolveStatus::Reduced
    }

    /// Drop entries from the singleton-column queue whose column is no longer a singleton,
    /// keeping the first-new watermark pointing at the same logical boundary.
    pub(crate) fn prune_singleton_columns(&mut self) {
        if self.singleton_columns.is_empty() {
            return;
        }

        let ProblemUpdate {
            problem,
            singleton_columns,
            first_new_singleton_col,
            ..
        } = self;
        let col_sizes = problem.constraint_matrix.col_sizes();

        debug_assert!(*first_new_singleton_col <= singleton_columns.len());

        let mut dropped = 0;
        let mut index = 0;
        while index != *first_new_singleton_col {
            if col_sizes[singleton_columns[index]] != 1 {
                dropped += 1;
            } else if dropped != 0 {
                singleton_columns[index - dropped] = singleton_columns[index];
            }
            index += 1;
        }
        *first_new_singleton_col -= dropped;

        let total = singleton_columns.len();
        while index != total {
            if col_sizes[singleton_columns[index]] != 1 {
                dropped += 1;
            } else if dropped != 0 {
                singleton_columns[index - dropped] = singleton_columns[index];
            }
            index += 1;
        }
        singleton_columns.truncate(total - dropped);

        debug_assert!(*first_new_singleton_col <= singleton_columns.len());
        debug_assert!(singleton_columns.iter().all(|&col| col_sizes[col] == 1));
    }

    /// Finalize buffered changes: replay coefficients, resolve singleton rows, run the activity
    /// checks, strip fixed columns, delete queued rows and columns from storage, prune the
    /// singleton queue and resolve empty columns.
    pub fn flush(&mut self) -> PresolveStatus {
        self.flush_changed_coeffs();

        if !self.singleton_rows.is_empty() {
            let rows = std::mem::take(&mut self.singleton_rows);
            for row in rows {
                if self.remove_singleton_row(row) == PresolveStatus::Infeasible {
                    debug!("singleton row {} detected infeasible during flush", row);
                    return PresolveStatus::Infeasible;
                }
            }
        }

        if self.check_changed_activities() == PresolveStatus::Infeasible {
            return PresolveStatus::Infeasible;
        }

        let matrix = &self.problem.constraint_matrix;
        self.changed_activities
            .retain(|&row| !matrix.row_flags[row].test(RowFlags::REDUNDANT));

        self.remove_fixed_cols();

        self.problem.constraint_matrix.delete_rows_and_cols(
            &mut self.redundant_rows,
            &mut self.deleted_cols,
            &mut self.singleton_rows,
            &mut self.singleton_columns,
            &mut self.empty_columns,
        );

        self.prune_singleton_columns();

        if self.remove_empty_columns() == PresolveStatus::UnboundedOrInfeasible {
            return PresolveStatus::UnboundedOrInfeasible;
        }

        PresolveStatus::Reduced
    }

    /// Reset the per-transaction row and column states, and compress storage when enough of the
    /// problem has been deleted.
    pub fn clear_states(&mut self) {
        for row in self.dirty_row_states.drain(..) {
            self.row_state[row] = State::default();
        }
        debug_assert!(self.row_state.iter().all(|state| state.is_unmodified()));

        for col in self.dirty_col_states.drain(..) {
            self.col_state[col] = State::default();
        }
        debug_assert!(self.col_state.iter().all(|state| state.is_unmodified()));

        if self.options.compressfac != 0.0 {
            let ncols = self.problem.n_cols();
            let nrows = self.problem.n_rows();
            if (ncols > 100
                && (self.get_n_active_cols() as f64) < ncols as f64 * self.options.compressfac)
                || (nrows > 100
                    && (self.get_n_active_rows() as f64)
                        < nrows as f64 * self.options.compressfac)
            {
                self.compress(false);
            }
        }
    }

    /// Compact storage and renumber every index the engine persists.
    ///
    /// The renumbering of the independent index structures (permutations, queues, postsolve log,
    /// observers) fans out over scoped tasks; they touch disjoint data and join before returning.
    pub fn compress(&mut self, full: bool) {
        if self.problem.n_cols() == self.get_n_active_cols()
            && self.problem.n_rows() == self.get_n_active_rows()
            && !full
        {
            return;
        }

        debug!(
            "compressing problem of size {}x{} to active size {}x{}",
            self.problem.n_rows(),
            self.problem.n_cols(),
            self.get_n_active_rows(),
            self.get_n_active_cols(),
        );

        debug_assert!(self.redundant_rows.is_empty());
        debug_assert!(self.deleted_cols.is_empty());
        debug_assert!(self.dirty_row_states.is_empty());
        debug_assert!(self.dirty_col_states.is_empty());
        debug_assert!(self.matrix_buffer.is_empty());

        let (row_mapping, col_mapping) = self.problem.compress(full);

        // All states are unmodified here, truncating to the new sizes suffices.
        self.row_state.resize(self.problem.n_rows(), State::default());
        self.col_state.resize(self.problem.n_cols(), State::default());

        let ProblemUpdate {
            postsolve,
            changed_activities,
            singleton_rows,
            singleton_columns,
            empty_columns,
            first_new_singleton_col,
            compress_observers,
            random_col_perm,
            random_row_perm,
            ..
        } = self;
        let row_mapping = &row_mapping;
        let col_mapping = &col_mapping;

        rayon::scope(|scope| {
            scope.spawn(move |_| {
                compress_data_vector(row_mapping, random_row_perm);
                if full {
                    random_row_perm.shrink_to_fit();
                }
            });
            scope.spawn(move |_| {
                compress_data_vector(col_mapping, random_col_perm);
                if full {
                    random_col_perm.shrink_to_fit();
                }
            });
            scope.spawn(move |_| {
                postsolve.compress(row_mapping, col_mapping, full);
            });
            scope.spawn(move |_| {
                compress_index_vector(row_mapping, changed_activities);
                if full {
                    changed_activities.shrink_to_fit();
                }
            });
            scope.spawn(move |_| {
                compress_index_vector(row_mapping, singleton_rows);
                if full {
                    singleton_rows.shrink_to_fit();
                }
            });
            scope.spawn(move |_| {
                let num_new = singleton_columns.len() - *first_new_singleton_col;
                compress_index_vector(col_mapping, singleton_columns);
                *first_new_singleton_col = singleton_columns.len().saturating_sub(num_new);
                if full {
                    singleton_columns.shrink_to_fit();
                }
            });
            scope.spawn(move |_| {
                compress_index_vector(col_mapping, empty_columns);
                if full {
                    empty_columns.shrink_to_fit();
                }
            });
            scope.spawn(move |_| {
                for observer in compress_observers.iter_mut() {
                    observer.compress(row_mapping, col_mapping);
                }
            });
        });

        self.lastcompress_ndelrows = self.stats.ndeletedrows;
        self.lastcompress_ndelcols = self.stats.ndeletedcols;
    }
}
