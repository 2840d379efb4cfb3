//! # Trivial presolve
//!
//! The reductions the engine performs itself, without any method proposing them: rounding
//! fractional bounds of integral columns, classifying huge bounds, fixing columns with equal
//! bounds, dual fixing through the lock counters, resolving singleton and empty rows, checking
//! activities against sides and cleaning up negligible coefficients.
use log::debug;

use crate::data::elements::{ColFlags, PresolveStatus, RowFlags, RowStatus};
use crate::data::number_types::Real;
use crate::update::ProblemUpdate;

impl<'a, R: Real> ProblemUpdate<'a, R> {
    /// Run the full trivial presolve: locks, column pass, activities, row pass, then flush.
    pub fn trivial_presolve(&mut self) -> PresolveStatus {
        if self.options.dualreds != 0 {
            self.problem.recompute_locks();
        }

        let mut status = self.trivial_column_presolve();
        match status {
            PresolveStatus::Infeasible | PresolveStatus::UnboundedOrInfeasible => return status,
            _ => (),
        }

        self.problem.recompute_all_activities();

        match self.trivial_row_presolve() {
            PresolveStatus::Infeasible => return PresolveStatus::Infeasible,
            PresolveStatus::UnboundedOrInfeasible => {
                return PresolveStatus::UnboundedOrInfeasible;
            }
            PresolveStatus::Reduced => status = PresolveStatus::Reduced,
            PresolveStatus::Unchanged => (),
        }

        self.remove_fixed_cols();

        self.problem.constraint_matrix.delete_rows_and_cols(
            &mut self.redundant_rows,
            &mut self.deleted_cols,
            &mut self.singleton_rows,
            &mut self.singleton_columns,
            &mut self.empty_columns,
        );

        let singleton_rows = std::mem::take(&mut self.singleton_rows);
        for row in singleton_rows {
            match self.remove_singleton_row(row) {
                PresolveStatus::Infeasible => {
                    debug!("singleton row {} detected infeasible", row);
                    return PresolveStatus::Infeasible;
                }
                PresolveStatus::Reduced => status = PresolveStatus::Reduced,
                _ => (),
            }
        }

        self.prune_singleton_columns();

        match self.check_changed_activities() {
            PresolveStatus::Infeasible => return PresolveStatus::Infeasible,
            PresolveStatus::Reduced => status = PresolveStatus::Reduced,
            _ => (),
        }

        self.changed_activities.clear();

        // Seed the propagation candidates: every row whose activity is definite enough that a
        // bound could be derived from one of its sides.
        let matrix = &self.problem.constraint_matrix;
        for row in 0..matrix.n_rows() {
            if matrix.row_flags[row].test(RowFlags::REDUNDANT) {
                continue;
            }
            let activity = &self.problem.activities[row];
            if activity.ninf_min == 0
                || activity.ninf_max == 0
                || (activity.ninf_max == 1 && !matrix.row_flags[row].test(RowFlags::LHS_INF))
                || (activity.ninf_min == 1 && !matrix.row_flags[row].test(RowFlags::RHS_INF))
            {
                self.changed_activities.push(row);
            }
        }

        match self.flush() {
            PresolveStatus::Infeasible => PresolveStatus::Infeasible,
            PresolveStatus::UnboundedOrInfeasible => PresolveStatus::UnboundedOrInfeasible,
            _ => status,
        }
    }

    /// Scan all active columns for trivial reductions.
    ///
    /// Rounds integral bounds, classifies huge bounds, detects conflicting and equal bounds, and
    /// applies dual fixing when enabled (which requires the locks to be up to date). Columns of
    /// size zero and one are queued. Activities may be stale afterwards; the caller recomputes
    /// them before they are consulted again.
    pub fn trivial_column_presolve(&mut self) -> PresolveStatus {
        let mut status = PresolveStatus::Unchanged;

        for col in 0..self.problem.n_cols() {
            if self.problem.variable_domains.flags[col].test(ColFlags::INACTIVE) {
                continue;
            }

            self.round_integral_bounds(col, &mut status);
            self.mark_huge_bounds(col);

            let domains = self.problem.variable_domains();
            let flags = domains.flags[col];
            if !flags.test(ColFlags::UNBOUNDED) {
                if domains.lower_bounds[col] > domains.upper_bounds[col] {
                    debug!("conflicting bounds of col {}", col);
                    return PresolveStatus::Infeasible;
                }

                if domains.lower_bounds[col] == domains.upper_bounds[col] {
                    self.mark_col_fixed(col);
                    status = PresolveStatus::Reduced;
                    continue;
                }
            }

            match self.apply_dualfix(col) {
                PresolveStatus::UnboundedOrInfeasible => {
                    return PresolveStatus::UnboundedOrInfeasible;
                }
                PresolveStatus::Reduced => {
                    status = PresolveStatus::Reduced;
                    continue;
                }
                _ => (),
            }

            match self.problem.constraint_matrix.col_sizes[col] {
                0 => self.empty_columns.push(col),
                1 => self.singleton_columns.push(col),
                _ => (),
            }
        }

        status
    }

    /// Scan all rows, resolving empty and singleton rows and checking the others against their
    /// activity bounds. Requires the activities to be up to date.
    pub fn trivial_row_presolve(&mut self) -> PresolveStatus {
        debug_assert_eq!(self.problem.activities.len(), self.problem.n_rows());

        let mut status = PresolveStatus::Unchanged;

        for row in 0..self.problem.n_rows() {
            let size = self.problem.constraint_matrix.row_sizes[row];
            if size < 0 || self.problem.constraint_matrix.row_flags[row].test(RowFlags::REDUNDANT)
            {
                continue;
            }

            match size {
                0 => {
                    let matrix = &self.problem.constraint_matrix;
                    if !matrix.row_flags[row].test(RowFlags::LHS_INF)
                        && self.num.is_feas_gt(&matrix.lhs[row], &R::zero())
                    {
                        debug!("empty row {} is infeasible", row);
                        return PresolveStatus::Infeasible;
                    }
                    if !matrix.row_flags[row].test(RowFlags::RHS_INF)
                        && self.num.is_feas_lt(&matrix.rhs[row], &R::zero())
                    {
                        debug!("empty row {} is infeasible", row);
                        return PresolveStatus::Infeasible;
                    }
                    self.mark_row_redundant(row);
                    status = PresolveStatus::Reduced;
                }
                1 => match self.remove_singleton_row(row) {
                    PresolveStatus::Infeasible => {
                        debug!("singleton row {} detected infeasible", row);
                        return PresolveStatus::Infeasible;
                    }
                    PresolveStatus::Reduced => status = PresolveStatus::Reduced,
                    _ => (),
                },
                _ => {
                    let matrix = &self.problem.constraint_matrix;
                    let row_status = self.problem.activities[row].check_status(
                        self.num,
                        matrix.row_flags[row],
                        &matrix.lhs[row],
                        &matrix.rhs[row],
                    );
                    match row_status {
                        RowStatus::Redundant => {
                            self.mark_row_redundant(row);
                            status = PresolveStatus::Reduced;
                        }
                        RowStatus::RedundantLhs => {
                            self.problem.constraint_matrix.clear_lhs(row);
                            status = PresolveStatus::Reduced;
                            self.cleanup_small_coefficients(row);
                        }
                        RowStatus::RedundantRhs => {
                            self.problem.constraint_matrix.clear_rhs(row);
                            status = PresolveStatus::Reduced;
                            self.cleanup_small_coefficients(row);
                        }
                        RowStatus::Infeasible => return PresolveStatus::Infeasible,
                        RowStatus::Unknown => {
                            let matrix = &mut self.problem.constraint_matrix;
                            if !matrix.row_flags[row].test(
                                RowFlags::LHS_INF | RowFlags::RHS_INF | RowFlags::EQUATION,
                            ) && matrix.lhs[row] == matrix.rhs[row]
                            {
                                matrix.row_flags[row].set(RowFlags::EQUATION);
                            }
                            self.cleanup_small_coefficients(row);
                        }
                    }
                }
            }
        }

        self.flush_changed_coeffs();

        status
    }

    /// Turn a singleton row into a column bound (or fix) and mark the row redundant.
    pub fn remove_singleton_row(&mut self, row: usize) -> PresolveStatus {
        let matrix = self.problem.constraint_matrix();
        let mut status = PresolveStatus::Unchanged;

        if matrix.row_sizes()[row] != 1 || matrix.row_flags()[row].test(RowFlags::REDUNDANT) {
            return status;
        }

        debug_assert_eq!(matrix.row(row).len(), 1);

        let (col, value) = matrix.row(row)[0].clone();
        let rflags = matrix.row_flags()[row];
        let lhs = matrix.lhs()[row].clone();
        let rhs = matrix.rhs()[row].clone();

        if rflags.test(RowFlags::EQUATION) {
            status = self.fix_col(col, rhs / value);
        } else if value < R::zero() {
            if !rflags.test(RowFlags::LHS_INF) {
                status = self.change_ub(col, lhs / value.clone());
            }
            if !rflags.test(RowFlags::RHS_INF) && status != PresolveStatus::Infeasible {
                status = self.change_lb(col, rhs / value);
            }
        } else {
            debug_assert!(value > R::zero());

            if !rflags.test(RowFlags::LHS_INF) {
                status = self.change_lb(col, lhs / value.clone());
            }
            if !rflags.test(RowFlags::RHS_INF) && status != PresolveStatus::Infeasible {
                status = self.change_ub(col, rhs / value);
            }
        }

        self.mark_row_redundant(row);

        status
    }

    /// Stage the removal of negligible coefficients of one row into the matrix buffer.
    ///
    /// Coefficients below `minabscoeff` go unconditionally. Coefficients below the small
    /// threshold go while the potential side error, accumulated over the row, stays within the
    /// cleanup budgets; removing one shifts the sides by its contribution at the lower bound.
    pub(crate) fn cleanup_small_coefficients(&mut self, row: usize) {
        let row_entries = self.problem.constraint_matrix.rows[row].clone();
        let len_factor = R::from_f64(row_entries.len() as f64);

        let min_abs = R::from_f64(self.options.minabscoeff);
        let small_abs = R::from_f64(self.options.smallcoeff_abs);
        let per_coeff_budget =
            R::from_f64(self.options.smallcoeff_rowbudget) * self.num.feas_tol().clone();
        let total_budget =
            R::from_f64(self.options.smallcoeff_totalbudget) * self.num.feas_tol().clone();

        let mut total_modification = R::zero();
        for (col, value) in row_entries {
            let domains = self.problem.variable_domains();
            let cflags = domains.flags[col];
            if cflags.test(ColFlags::UNBOUNDED | ColFlags::INACTIVE) {
                continue;
            }

            debug_assert!(domains.upper_bounds[col] > domains.lower_bounds[col]);

            let abs_value = value.abs();

            if abs_value < min_abs {
                self.matrix_buffer.add_entry(row, col, R::zero());
                debug!("removed tiny coefficient {} from row {}", value.to_f64(), row);
                continue;
            }

            let range =
                domains.upper_bounds[col].clone() - domains.lower_bounds[col].clone();
            if abs_value <= small_abs
                && abs_value.clone() * range.clone() * len_factor.clone() <= per_coeff_budget
            {
                let new_total = total_modification.clone() + abs_value * range;
                if new_total <= total_budget {
                    self.matrix_buffer.add_entry(row, col, R::zero());
                    debug!(
                        "removed small coefficient {} from row {}",
                        value.to_f64(),
                        row,
                    );

                    let lower = domains.lower_bounds[col].clone();
                    if lower != R::zero() {
                        let side_change = value * lower;
                        let matrix = &mut self.problem.constraint_matrix;
                        if !matrix.row_flags[row].test(RowFlags::RHS_INF) {
                            matrix.rhs[row] -= side_change.clone();
                            self.stats.nsidechgs += 1;
                        }
                        if !matrix.row_flags[row].test(RowFlags::LHS_INF) {
                            matrix.lhs[row] -= side_change;
                            self.stats.nsidechgs += 1;
                        }
                        matrix.update_equation_flag(row);
                    }

                    total_modification = new_total;
                }
            }
        }
    }

    fn round_integral_bounds(&mut self, col: usize, status: &mut PresolveStatus) {
        let domains = &mut self.problem.variable_domains;
        if !domains.flags[col].test(ColFlags::INTEGRAL) {
            return;
        }

        if !domains.flags[col].test(ColFlags::LB_INF) {
            let rounded = domains.lower_bounds[col].ceil();
            if rounded != domains.lower_bounds[col] {
                self.stats.nboundchgs += 1;
                domains.lower_bounds[col] = rounded;
                *status = PresolveStatus::Reduced;
            }
        }

        if !domains.flags[col].test(ColFlags::UB_INF) {
            let rounded = domains.upper_bounds[col].floor();
            if rounded != domains.upper_bounds[col] {
                self.stats.nboundchgs += 1;
                domains.upper_bounds[col] = rounded;
                *status = PresolveStatus::Reduced;
            }
        }
    }

    fn mark_huge_bounds(&mut self, col: usize) {
        let domains = &mut self.problem.variable_domains;
        if !domains.flags[col].test(ColFlags::LB_INF)
            && self.num.is_huge(&domains.lower_bounds[col])
        {
            domains.flags[col].set(ColFlags::LB_HUGE);
        }
        if !domains.flags[col].test(ColFlags::UB_INF)
            && self.num.is_huge(&domains.upper_bounds[col])
        {
            domains.flags[col].set(ColFlags::UB_HUGE);
        }
    }

    fn is_dualfix_enabled(&self, col: usize) -> bool {
        match self.options.dualreds {
            0 => false,
            1 => self.problem.objective.coefficients[col] != R::zero(),
            _ => true,
        }
    }

    /// Fix a column to a bound when its lock counters prove the objective cannot improve by
    /// moving away from it.
    fn apply_dualfix(&mut self, col: usize) -> PresolveStatus {
        if !self.is_dualfix_enabled(col) {
            return PresolveStatus::Unchanged;
        }

        let locks = self.problem.locks[col];
        let objective = self.problem.objective.coefficients[col].clone();
        let flags = self.problem.variable_domains.flags[col];

        if locks.down == 0 && objective >= R::zero() {
            if flags.test(ColFlags::LB_INF) {
                if objective != R::zero() {
                    debug!("dual fixing detected col {} unbounded or infeasible", col);
                    return PresolveStatus::UnboundedOrInfeasible;
                }
            } else {
                let domains = &mut self.problem.variable_domains;
                domains.upper_bounds[col] = domains.lower_bounds[col].clone();
                domains.flags[col].unset(ColFlags::UB_INF);
                self.stats.nboundchgs += 1;

                self.mark_col_fixed(col);
                return PresolveStatus::Reduced;
            }
        }

        if locks.up == 0 && objective <= R::zero() {
            if flags.test(ColFlags::UB_INF) {
                if objective != R::zero() {
                    debug!("dual fixing detected col {} unbounded or infeasible", col);
                    return PresolveStatus::UnboundedOrInfeasible;
                }
            } else {
                let domains = &mut self.problem.variable_domains;
                domains.lower_bounds[col] = domains.upper_bounds[col].clone();
                domains.flags[col].unset(ColFlags::LB_INF);
                self.stats.nboundchgs += 1;

                self.mark_col_fixed(col);
                return PresolveStatus::Reduced;
            }
        }

        PresolveStatus::Unchanged
    }
}
