//! # Transactional application
//!
//! Reductions arrive in transactions proposed against a snapshot of the problem. Application is
//! two-phase: an optimistic conflict check against the per-round row and column states, then the
//! actual mutations. A transaction whose assumptions were invalidated by an earlier transaction
//! of the same round is rejected and can be re-proposed in the next round; substitutions can be
//! postponed wholesale to a dedicated phase.
use log::debug;

use crate::data::elements::{
    ApplyResult, BoundDirection, ColFlags, ConflictType, PresolveStatus, RowFlags,
};
use crate::data::number_types::Real;
use crate::data::problem::activity::update_activities_after_boundchange;
use crate::data::problem::Problem;
use crate::update::reduction::{ColReduction, Reduction, RowReduction};
use crate::update::{activity_tracker, ProblemUpdate, State};

impl<'a, R: Real> ProblemUpdate<'a, R> {
    /// Whether the transaction conflicts with the reductions applied earlier this round.
    pub fn check_transaction_conflicts(&self, reductions: &[Reduction<R>]) -> ConflictType {
        for reduction in reductions {
            match reduction {
                Reduction::CoefChange { row, col, .. } => {
                    if self.col_state[*col].test(State::LOCKED)
                        || self.row_state[*row].test(State::LOCKED)
                    {
                        return ConflictType::Conflict;
                    }
                }
                Reduction::Col(col_reduction) => match col_reduction {
                    ColReduction::Locked { col } | ColReduction::LockedStrong { col } => {
                        if self.col_state[*col].test(State::MODIFIED) {
                            return ConflictType::Conflict;
                        }
                    }
                    ColReduction::Objective { col, .. } => {
                        if self.col_state[*col].test(State::LOCKED) {
                            return ConflictType::Conflict;
                        }
                    }
                    ColReduction::BoundsLocked { col } => {
                        if self.col_state[*col].test(State::BOUNDS_MODIFIED) {
                            return ConflictType::Conflict;
                        }
                    }
                    ColReduction::Substitute { .. } | ColReduction::Replace { .. } => {
                        if self.postpone_substitutions {
                            return ConflictType::Postpone;
                        }
                    }
                    _ => (),
                },
                Reduction::Row(row_reduction) => match row_reduction {
                    RowReduction::Locked { row } | RowReduction::LockedStrong { row } => {
                        if self.row_state[*row].test(State::MODIFIED | State::BOUNDS_MODIFIED) {
                            return ConflictType::Conflict;
                        }
                    }
                    RowReduction::Lhs { row, .. }
                    | RowReduction::Rhs { row, .. }
                    | RowReduction::LhsInf { row }
                    | RowReduction::RhsInf { row } => {
                        if self.row_state[*row].test(State::LOCKED) {
                            return ConflictType::Conflict;
                        }
                    }
                    RowReduction::Sparsify { .. } => {
                        if self.postpone_substitutions {
                            return ConflictType::Postpone;
                        }
                    }
                    RowReduction::Redundant { .. } => (),
                },
            }
        }

        ConflictType::NoConflict
    }

    /// Apply a transaction of reductions.
    ///
    /// Every applied primitive records the touched rows and columns in the per-round state before
    /// mutating. An infeasibility aborts immediately; mutations applied up to that point remain,
    /// which is fine because the driver terminates presolve on infeasibility.
    pub fn apply_transaction(&mut self, reductions: &[Reduction<R>]) -> ApplyResult {
        match self.check_transaction_conflicts(reductions) {
            ConflictType::Conflict => return ApplyResult::Rejected,
            ConflictType::Postpone => return ApplyResult::Postponed,
            ConflictType::NoConflict => (),
        }

        for reduction in reductions {
            match reduction {
                Reduction::CoefChange { row, col, value } => {
                    self.set_row_state(*row, State::MODIFIED);
                    self.set_col_state(*col, State::MODIFIED);
                    self.matrix_buffer.add_entry(*row, *col, value.clone());
                }
                Reduction::Col(col_reduction) => {
                    if let Some(result) = self.apply_col_reduction(col_reduction) {
                        return result;
                    }
                }
                Reduction::Row(row_reduction) => {
                    if let Some(result) = self.apply_row_reduction(row_reduction) {
                        return result;
                    }
                }
            }
        }

        ApplyResult::Applied
    }

    fn apply_col_reduction(&mut self, reduction: &ColReduction<R>) -> Option<ApplyResult> {
        match reduction {
            ColReduction::Locked { .. } | ColReduction::BoundsLocked { .. } => None,
            ColReduction::LockedStrong { col } => {
                self.set_col_state(*col, State::LOCKED);
                None
            }
            ColReduction::Objective { col, value } => {
                self.set_col_state(*col, State::MODIFIED);
                self.problem.objective.coefficients[*col] = value.clone();
                None
            }
            ColReduction::Fixed { col, value } => {
                match self.fix_col(*col, value.clone()) {
                    PresolveStatus::Infeasible => Some(ApplyResult::Infeasible),
                    _ => None,
                }
            }
            ColReduction::FixedInfinity { col, sign } => {
                match self.fix_col_infinity(*col, sign.clone()) {
                    PresolveStatus::Infeasible => Some(ApplyResult::Infeasible),
                    _ => None,
                }
            }
            ColReduction::LowerBound { col, value } => {
                match self.change_lb(*col, value.clone()) {
                    PresolveStatus::Infeasible => Some(ApplyResult::Infeasible),
                    _ => None,
                }
            }
            ColReduction::UpperBound { col, value } => {
                match self.change_ub(*col, value.clone()) {
                    PresolveStatus::Infeasible => Some(ApplyResult::Infeasible),
                    _ => None,
                }
            }
            ColReduction::ImplInt { col } => self.apply_impl_int(*col),
            ColReduction::Substitute { col, row } => self.apply_substitution(*col, *row),
            ColReduction::SubstituteObj { col, row } => {
                self.apply_substitute_obj(*col, *row);
                None
            }
            ColReduction::Parallel { col, other } => self.apply_parallel_cols(*col, *other),
            ColReduction::Replace {
                col,
                factor,
                other,
                offset,
            } => self.apply_replace(*col, factor.clone(), *other, offset.clone()),
        }
    }

    fn apply_row_reduction(&mut self, reduction: &RowReduction<R>) -> Option<ApplyResult> {
        match reduction {
            RowReduction::Locked { .. } => None,
            RowReduction::LockedStrong { row } => {
                self.set_row_state(*row, State::LOCKED);
                None
            }
            RowReduction::Lhs { row, value } => {
                debug_assert!(
                    self.problem.constraint_matrix.row_flags[*row].test(RowFlags::LHS_INF)
                        || *value != self.problem.constraint_matrix.lhs[*row]
                );
                self.set_row_state(*row, State::BOUNDS_MODIFIED);

                if self.problem.constraint_matrix.row_flags[*row].test(RowFlags::LHS_INF) {
                    // A side appearing changes the lock structure of every column in the row.
                    let row_cols: Vec<usize> = self.problem.constraint_matrix.rows[*row]
                        .iter()
                        .map(|&(col, _)| col)
                        .collect();
                    for col in row_cols {
                        self.set_col_state(col, State::MODIFIED);
                    }
                }

                self.problem.constraint_matrix.set_lhs(*row, value.clone());
                self.stats.nsidechgs += 1;
                None
            }
            RowReduction::Rhs { row, value } => {
                debug_assert!(
                    self.problem.constraint_matrix.row_flags[*row].test(RowFlags::RHS_INF)
                        || *value != self.problem.constraint_matrix.rhs[*row]
                );
                self.set_row_state(*row, State::BOUNDS_MODIFIED);

                if self.problem.constraint_matrix.row_flags[*row].test(RowFlags::RHS_INF) {
                    let row_cols: Vec<usize> = self.problem.constraint_matrix.rows[*row]
                        .iter()
                        .map(|&(col, _)| col)
                        .collect();
                    for col in row_cols {
                        self.set_col_state(col, State::MODIFIED);
                    }
                }

                self.problem.constraint_matrix.set_rhs(*row, value.clone());
                self.stats.nsidechgs += 1;
                None
            }
            RowReduction::LhsInf { row } => {
                if !self.problem.constraint_matrix.row_flags[*row].test(RowFlags::LHS_INF) {
                    self.set_row_state(*row, State::BOUNDS_MODIFIED);
                    self.problem.constraint_matrix.clear_lhs(*row);
                    self.stats.nsidechgs += 1;
                }
                None
            }
            RowReduction::RhsInf { row } => {
                if !self.problem.constraint_matrix.row_flags[*row].test(RowFlags::RHS_INF) {
                    self.set_row_state(*row, State::BOUNDS_MODIFIED);
                    self.problem.constraint_matrix.clear_rhs(*row);
                    self.stats.nsidechgs += 1;
                }
                None
            }
            RowReduction::Redundant { row } => {
                if !self.problem.constraint_matrix.row_flags[*row].test(RowFlags::REDUNDANT) {
                    self.set_row_state(*row, State::BOUNDS_MODIFIED);
                    self.mark_row_redundant(*row);
                }
                None
            }
            RowReduction::Sparsify { row, candidates } => {
                self.apply_sparsify(*row, candidates);
                None
            }
        }
    }

    /// Mark a column implied integral and round its bounds inward.
    fn apply_impl_int(&mut self, col: usize) -> Option<ApplyResult> {
        let cflags = self.problem.variable_domains.flags[col];
        if cflags.test(ColFlags::INACTIVE) {
            return None;
        }

        self.problem.variable_domains.flags[col].set(ColFlags::IMPL_INT);

        if !cflags.test(ColFlags::LB_INF) {
            let bound = self.problem.variable_domains.lower_bounds[col].clone();
            if self.change_lb(col, bound) == PresolveStatus::Infeasible {
                return Some(ApplyResult::Infeasible);
            }
        }
        if !self.problem.variable_domains.flags[col].test(ColFlags::UB_INF) {
            let bound = self.problem.variable_domains.upper_bounds[col].clone();
            if self.change_ub(col, bound) == PresolveStatus::Infeasible {
                return Some(ApplyResult::Infeasible);
            }
        }

        None
    }

    /// Substitute `col` everywhere using the equation `eq_row`.
    fn apply_substitution(&mut self, col: usize, eq_row: usize) -> Option<ApplyResult> {
        let matrix = self.problem.constraint_matrix();

        // A length-one equation degenerates to a fix.
        if matrix.row(eq_row).len() == 1 {
            debug_assert!(
                !matrix.row_flags()[eq_row].test(RowFlags::LHS_INF | RowFlags::RHS_INF)
            );
            debug_assert_eq!(matrix.row(eq_row)[0].0, col);

            let value = matrix.lhs()[eq_row].clone() / matrix.row(eq_row)[0].1.clone();
            return match self.fix_col(col, value) {
                PresolveStatus::Infeasible => Some(ApplyResult::Infeasible),
                _ => None,
            };
        }

        debug_assert!(self.row_state[eq_row].is_unmodified());
        debug_assert!(!self.col_state[col].test(State::BOUNDS_MODIFIED));

        let eq_entries = matrix.row(eq_row).to_vec();
        let eq_rhs = matrix.lhs()[eq_row].clone();

        if !matrix.check_aggregation_sparsity(
            col,
            &eq_entries,
            self.options.maxfillinpersubstitution,
            &R::from_f64(self.options.maxshiftperrow),
        ) {
            return Some(ApplyResult::Rejected);
        }

        let col_rows: Vec<usize> = matrix.col(col).iter().map(|&(row, _)| row).collect();
        let n_relevant_rows = col_rows.len() as i64;

        let cflags = self.problem.variable_domains.flags[col];
        debug_assert!(!cflags.test(ColFlags::INACTIVE));
        self.problem.variable_domains.flags[col].set(ColFlags::SUBSTITUTED);

        self.problem
            .substitute_var_in_obj(self.num, col, &eq_entries, &eq_rhs);

        for &row in &col_rows {
            self.set_row_state(row, State::MODIFIED);
        }
        for (index, _) in &eq_entries {
            self.set_col_state(*index, State::MODIFIED);
        }

        self.postsolve
            .notify_substitution(col, &eq_entries, eq_rhs.clone());

        let redundant_before = self.redundant_rows.len();
        {
            let Problem {
                constraint_matrix,
                variable_domains,
                activities,
                ..
            } = &mut *self.problem;
            constraint_matrix.aggregate(
                self.num,
                col,
                &eq_entries,
                eq_rhs.clone(),
                variable_domains,
                activities,
                &mut self.changed_activities,
                &mut self.redundant_rows,
                &mut self.singleton_rows,
                &mut self.singleton_columns,
                &mut self.empty_columns,
                self.stats.nrounds,
            );
        }
        self.stats.ndeletedrows += (self.redundant_rows.len() - redundant_before) as i64;

        self.stats.ncoefchgs += eq_entries.len() as i64 * n_relevant_rows;
        self.stats.ndeletedcols += 1;
        if cflags.test(ColFlags::INTEGRAL) {
            self.problem.num_integral_cols -= 1;
        } else {
            self.problem.num_continuous_cols -= 1;
        }
        if eq_rhs != R::zero() {
            self.stats.nsidechgs += 2 * n_relevant_rows;
        }

        let matrix = self.problem.constraint_matrix();
        debug_assert_eq!(matrix.row_sizes()[eq_row], -1);
        debug_assert!(matrix.row(eq_row).is_empty());
        debug_assert_eq!(matrix.col_sizes()[col], -1);
        debug_assert!(matrix.col(col).is_empty());
        debug_assert!(self.problem.objective.coefficients[col] == R::zero());

        None
    }

    /// Eliminate `col` from the objective only; the matrix keeps the equation for
    /// reconstruction and the column is treated as fixed to zero for the activities.
    fn apply_substitute_obj(&mut self, col: usize, eq_row: usize) {
        let cflags = self.problem.variable_domains.flags[col];
        debug_assert!(!cflags.test(ColFlags::INACTIVE));
        self.problem.variable_domains.flags[col].set(ColFlags::SUBSTITUTED);

        let eq_entries = self.problem.constraint_matrix.rows[eq_row].clone();
        let eq_rhs = self.problem.constraint_matrix.lhs[eq_row].clone();

        self.problem
            .substitute_var_in_obj(self.num, col, &eq_entries, &eq_rhs);

        {
            let Problem {
                constraint_matrix,
                variable_domains,
                activities,
                ..
            } = &mut *self.problem;
            let nrounds = self.stats.nrounds;

            let lower = variable_domains.lower_bounds[col].clone();
            if cflags.test(ColFlags::LB_USELESS) || lower != R::zero() {
                update_activities_after_boundchange(
                    &constraint_matrix.cols[col],
                    BoundDirection::Lower,
                    &lower,
                    &R::zero(),
                    cflags.test(ColFlags::LB_USELESS),
                    activities,
                    activity_tracker(
                        nrounds,
                        &constraint_matrix.row_flags,
                        &mut self.changed_activities,
                    ),
                );
            }

            let upper = variable_domains.upper_bounds[col].clone();
            if cflags.test(ColFlags::UB_USELESS) || upper != R::zero() {
                update_activities_after_boundchange(
                    &constraint_matrix.cols[col],
                    BoundDirection::Upper,
                    &upper,
                    &R::zero(),
                    cflags.test(ColFlags::UB_USELESS),
                    activities,
                    activity_tracker(
                        nrounds,
                        &constraint_matrix.row_flags,
                        &mut self.changed_activities,
                    ),
                );
            }

            variable_domains.flags[col].unset(ColFlags::LB_USELESS | ColFlags::UB_USELESS);
            variable_domains.lower_bounds[col] = R::zero();
            variable_domains.upper_bounds[col] = R::zero();
        }

        self.deleted_cols.push(col);

        self.postsolve.notify_substitution(col, &eq_entries, eq_rhs);

        for (index, _) in &eq_entries {
            self.set_col_state(*index, State::MODIFIED);
        }

        self.stats.ndeletedcols += 1;
        if cflags.test(ColFlags::INTEGRAL) {
            self.problem.num_integral_cols -= 1;
        } else {
            self.problem.num_continuous_cols -= 1;
        }
    }

    /// Merge `col1` into the pattern-parallel `col2`.
    fn apply_parallel_cols(&mut self, col1: usize, col2: usize) -> Option<ApplyResult> {
        let domains = self.problem.variable_domains();
        let cflags1 = domains.flags[col1];
        let cflags2 = domains.flags[col2];
        if cflags1.test(ColFlags::INACTIVE) || cflags2.test(ColFlags::INACTIVE) {
            return Some(ApplyResult::Rejected);
        }

        self.set_col_state(col1, State::BOUNDS_MODIFIED);
        self.set_col_state(col2, State::BOUNDS_MODIFIED);

        let col1_entries = self.problem.constraint_matrix.cols[col1].clone();
        let col2_entries = self.problem.constraint_matrix.cols[col2].clone();
        debug_assert!(!col1_entries.is_empty());
        debug_assert_eq!(col1_entries.len(), col2_entries.len());
        debug_assert!(col1_entries
            .iter()
            .zip(&col2_entries)
            .all(|((row1, _), (row2, _))| row1 == row2));

        let scale = col1_entries[0].1.clone() / col2_entries[0].1.clone();
        debug_assert!(self.num.is_eq(
            &self.problem.objective.coefficients[col1],
            &(self.problem.objective.coefficients[col2].clone() * scale.clone()),
        ));

        let domains = self.problem.variable_domains();
        let lb1 = domains.lower_bounds[col1].clone();
        let ub1 = domains.upper_bounds[col1].clone();
        let lb2 = domains.lower_bounds[col2].clone();
        let ub2 = domains.upper_bounds[col2].clone();

        self.postsolve.notify_parallel_cols(
            col1,
            cflags1.test(ColFlags::INTEGRAL),
            if cflags1.test(ColFlags::LB_INF) { None } else { Some(lb1.clone()) },
            if cflags1.test(ColFlags::UB_INF) { None } else { Some(ub1.clone()) },
            col2,
            cflags2.test(ColFlags::INTEGRAL),
            if cflags2.test(ColFlags::LB_INF) { None } else { Some(lb2.clone()) },
            if cflags2.test(ColFlags::UB_INF) { None } else { Some(ub2.clone()) },
            scale.clone(),
        );
        self.stats.ndeletedcols += 1;

        // Merged domain of column 2; start unbounded and materialize each side whose
        // contributing bounds are both finite.
        let mut new_lb = R::zero();
        let mut new_ub = R::zero();
        let mut new_flags = ColFlags::LB_INF | ColFlags::UB_INF;

        // The merged column keeps column 1's integrality; the method proposing the merge has
        // verified the compatibility conditions.
        if cflags1.test(ColFlags::INTEGRAL) {
            self.problem.num_integral_cols -= 1;
            new_flags.set(ColFlags::INTEGRAL);
        } else if cflags2.test(ColFlags::INTEGRAL) {
            self.problem.num_integral_cols -= 1;
        } else {
            self.problem.num_continuous_cols -= 1;
        }

        if scale < R::zero() {
            if !cflags2.test(ColFlags::LB_INF) && !cflags1.test(ColFlags::UB_INF) {
                new_lb = lb2.clone() + scale.clone() * ub1.clone();
                new_flags.unset(ColFlags::LB_INF);
                if cflags1.test(ColFlags::UB_HUGE) || cflags2.test(ColFlags::LB_HUGE) {
                    new_flags.set(ColFlags::LB_HUGE);
                }
            }
            if !cflags2.test(ColFlags::UB_INF) && !cflags1.test(ColFlags::LB_INF) {
                new_ub = ub2.clone() + scale.clone() * lb1.clone();
                new_flags.unset(ColFlags::UB_INF);
                if cflags1.test(ColFlags::LB_HUGE) || cflags2.test(ColFlags::UB_HUGE) {
                    new_flags.set(ColFlags::UB_HUGE);
                }
            }
        } else {
            if !cflags2.test(ColFlags::LB_INF) && !cflags1.test(ColFlags::LB_INF) {
                new_lb = lb2.clone() + scale.clone() * lb1.clone();
                new_flags.unset(ColFlags::LB_INF);
                if cflags1.test(ColFlags::LB_HUGE) || cflags2.test(ColFlags::LB_HUGE) {
                    new_flags.set(ColFlags::LB_HUGE);
                }
            }
            if !cflags2.test(ColFlags::UB_INF) && !cflags1.test(ColFlags::UB_INF) {
                new_ub = ub2.clone() + scale.clone() * ub1.clone();
                new_flags.unset(ColFlags::UB_INF);
                if cflags1.test(ColFlags::UB_HUGE) || cflags2.test(ColFlags::UB_HUGE) {
                    new_flags.set(ColFlags::UB_HUGE);
                }
            }
        }

        // Where the merged bound is useless, the stale finite contributions have to leave the
        // activities; an infinite contribution of one of the two columns carries over to the
        // merged column, so the counters transfer without adjustment.
        {
            let Problem {
                constraint_matrix,
                activities,
                ..
            } = &mut *self.problem;
            let nrounds = self.stats.nrounds;

            if new_flags.test(ColFlags::LB_USELESS) {
                if !cflags2.test(ColFlags::LB_USELESS) {
                    if lb2 != R::zero() {
                        update_activities_after_boundchange(
                            &col2_entries,
                            BoundDirection::Lower,
                            &lb2,
                            &R::zero(),
                            false,
                            activities,
                            activity_tracker(
                                nrounds,
                                &constraint_matrix.row_flags,
                                &mut self.changed_activities,
                            ),
                        );
                    }
                } else if scale < R::zero() {
                    if cflags1.test(ColFlags::UB_USELESS) || ub1 != R::zero() {
                        update_activities_after_boundchange(
                            &col1_entries,
                            BoundDirection::Upper,
                            &ub1,
                            &R::zero(),
                            cflags1.test(ColFlags::UB_USELESS),
                            activities,
                            activity_tracker(
                                nrounds,
                                &constraint_matrix.row_flags,
                                &mut self.changed_activities,
                            ),
                        );
                    }
                } else if cflags1.test(ColFlags::LB_USELESS) || lb1 != R::zero() {
                    update_activities_after_boundchange(
                        &col1_entries,
                        BoundDirection::Lower,
                        &lb1,
                        &R::zero(),
                        cflags1.test(ColFlags::LB_USELESS),
                        activities,
                        activity_tracker(
                            nrounds,
                            &constraint_matrix.row_flags,
                            &mut self.changed_activities,
                        ),
                    );
                }
            }

            if new_flags.test(ColFlags::UB_USELESS) {
                if !cflags2.test(ColFlags::UB_USELESS) {
                    if ub2 != R::zero() {
                        update_activities_after_boundchange(
                            &col2_entries,
                            BoundDirection::Upper,
                            &ub2,
                            &R::zero(),
                            false,
                            activities,
                            activity_tracker(
                                nrounds,
                                &constraint_matrix.row_flags,
                                &mut self.changed_activities,
                            ),
                        );
                    }
                } else if scale < R::zero() {
                    if cflags1.test(ColFlags::LB_USELESS) || lb1 != R::zero() {
                        update_activities_after_boundchange(
                            &col1_entries,
                            BoundDirection::Lower,
                            &lb1,
                            &R::zero(),
                            cflags1.test(ColFlags::LB_USELESS),
                            activities,
                            activity_tracker(
                                nrounds,
                                &constraint_matrix.row_flags,
                                &mut self.changed_activities,
                            ),
                        );
                    }
                } else if cflags1.test(ColFlags::UB_USELESS) || ub1 != R::zero() {
                    update_activities_after_boundchange(
                        &col1_entries,
                        BoundDirection::Upper,
                        &ub1,
                        &R::zero(),
                        cflags1.test(ColFlags::UB_USELESS),
                        activities,
                        activity_tracker(
                            nrounds,
                            &constraint_matrix.row_flags,
                            &mut self.changed_activities,
                        ),
                    );
                }
            }
        }

        // Column 1 is now treated as fixed to zero; the flag is `SUBSTITUTED` rather than
        // `FIXED` because postsolve recovers it from the parallel-columns record.
        let domains = &mut self.problem.variable_domains;
        domains.lower_bounds[col1] = R::zero();
        domains.upper_bounds[col1] = R::zero();
        domains.flags[col1].unset(ColFlags::LB_USELESS | ColFlags::UB_USELESS);
        domains.flags[col1].set(ColFlags::SUBSTITUTED);
        self.deleted_cols.push(col1);

        let domains = &mut self.problem.variable_domains;
        domains.lower_bounds[col2] = new_lb;
        domains.upper_bounds[col2] = new_ub;
        domains.flags[col2] = new_flags;

        None
    }

    /// Apply `col1 = factor * col2 + offset`.
    fn apply_replace(
        &mut self,
        col1: usize,
        factor: R,
        col2: usize,
        offset: R,
    ) -> Option<ApplyResult> {
        let domains = self.problem.variable_domains();
        let cflags1 = domains.flags[col1];
        let cflags2 = domains.flags[col2];

        // One of the two fixed: propagate the fix through the linear relation.
        if cflags1.test(ColFlags::FIXED) || cflags2.test(ColFlags::FIXED) {
            if !cflags1.test(ColFlags::INACTIVE) {
                debug_assert!(cflags2.test(ColFlags::FIXED));
                let value = factor * domains.lower_bounds[col2].clone() + offset;
                if self.fix_col(col1, value) == PresolveStatus::Infeasible {
                    return Some(ApplyResult::Infeasible);
                }
            } else if !cflags2.test(ColFlags::INACTIVE) {
                debug_assert!(cflags1.test(ColFlags::FIXED));
                let value = (domains.lower_bounds[col1].clone() - offset) / factor;
                if self.fix_col(col2, value) == PresolveStatus::Infeasible {
                    return Some(ApplyResult::Infeasible);
                }
            }
            return None;
        }

        if cflags1.test(ColFlags::INACTIVE) || cflags2.test(ColFlags::INACTIVE) {
            return None;
        }

        debug_assert!(
            self.problem.constraint_matrix.col_sizes[col1] > 0
                && self.problem.constraint_matrix.col_sizes[col2] > 0
        );

        // Tighten column 2 by the domain implied through column 1's bounds. The bound of
        // column 1 that implies each side depends on the sign of the factor; an infinite source
        // bound implies nothing.
        let (lb_source, lb_source_inf, ub_source, ub_source_inf) = if factor > R::zero() {
            (
                domains.lower_bounds[col1].clone(),
                cflags1.test(ColFlags::LB_INF),
                domains.upper_bounds[col1].clone(),
                cflags1.test(ColFlags::UB_INF),
            )
        } else {
            (
                domains.upper_bounds[col1].clone(),
                cflags1.test(ColFlags::UB_INF),
                domains.lower_bounds[col1].clone(),
                cflags1.test(ColFlags::LB_INF),
            )
        };
        let lb2 = domains.lower_bounds[col2].clone();
        let ub2 = domains.upper_bounds[col2].clone();

        let implied_lb = if lb_source_inf {
            None
        } else {
            Some((lb_source - offset.clone()) / factor.clone())
        };
        let implied_ub = if ub_source_inf {
            None
        } else {
            Some((ub_source - offset.clone()) / factor.clone())
        };

        if let Some(bound) = implied_lb
            .filter(|bound| cflags2.test(ColFlags::LB_INF) || *bound > lb2)
        {
            if self.change_lb(col2, bound) == PresolveStatus::Infeasible {
                return Some(ApplyResult::Infeasible);
            }
        } else if let Some(bound) = implied_ub
            .filter(|bound| cflags2.test(ColFlags::UB_INF) || *bound < ub2)
        {
            if self.change_ub(col2, bound) == PresolveStatus::Infeasible {
                return Some(ApplyResult::Infeasible);
            }
        }

        // The relation as an implicit length-two equality: col1 - factor * col2 = offset.
        let mut equality = vec![(col1, R::one()), (col2, -factor.clone())];
        equality.sort_by_key(|&(index, _)| index);

        let matrix = self.problem.constraint_matrix();
        if !matrix.check_aggregation_sparsity(
            col1,
            &equality,
            self.options.maxfillinpersubstitution,
            &R::from_f64(self.options.maxshiftperrow),
        ) {
            return None;
        }

        let col1_rows: Vec<usize> = matrix.col(col1).iter().map(|&(row, _)| row).collect();
        let col1_len = col1_rows.len() as i64;

        self.problem.variable_domains.flags[col1].set(ColFlags::SUBSTITUTED);
        if cflags1.test(ColFlags::INTEGRAL) {
            self.problem.num_integral_cols -= 1;
        } else {
            self.problem.num_continuous_cols -= 1;
        }

        for &row in &col1_rows {
            self.set_row_state(row, State::MODIFIED);
        }

        self.postsolve
            .notify_substitution(col1, &equality, offset.clone());

        let redundant_before = self.redundant_rows.len();
        {
            let Problem {
                constraint_matrix,
                variable_domains,
                activities,
                ..
            } = &mut *self.problem;
            constraint_matrix.aggregate(
                self.num,
                col1,
                &equality,
                offset.clone(),
                variable_domains,
                activities,
                &mut self.changed_activities,
                &mut self.redundant_rows,
                &mut self.singleton_rows,
                &mut self.singleton_columns,
                &mut self.empty_columns,
                self.stats.nrounds,
            );
        }
        self.stats.ndeletedrows += (self.redundant_rows.len() - redundant_before) as i64;

        self.set_col_state(col1, State::MODIFIED);
        self.set_col_state(col2, State::MODIFIED);

        let objective = &mut self.problem.objective;
        if objective.coefficients[col1] != R::zero() {
            let col1_weight = objective.coefficients[col1].clone();
            objective.coefficients[col2] += col1_weight.clone() * factor;
            if self.num.is_zero(&objective.coefficients[col2]) {
                objective.coefficients[col2] = R::zero();
            }
            objective.offset += col1_weight * offset.clone();
            objective.coefficients[col1] = R::zero();
        }

        if offset != R::zero() {
            self.stats.nsidechgs += 2 * col1_len;
        }
        self.stats.ncoefchgs += 2 * col1_len;
        self.stats.ndeletedcols += 1;

        None
    }

    /// Cancel nonzeros of the candidate rows against the equation `eq_row`.
    fn apply_sparsify(&mut self, eq_row: usize, candidates: &[(usize, R)]) {
        debug_assert!(self.matrix_buffer.is_empty());
        debug_assert!(!self.problem.constraint_matrix.is_row_redundant(eq_row));

        let eq_len = self.problem.constraint_matrix.rows[eq_row].len() as i64;
        let eq_rhs = self.problem.constraint_matrix.rhs[eq_row].clone();

        let mut total_cancelled = 0i64;
        let mut cancelled_rows = 0i64;

        for (candidate, scale) in candidates {
            debug_assert_ne!(*candidate, eq_row);

            let redundant_before = self.redundant_rows.len();
            let cancelled = {
                let Problem {
                    constraint_matrix,
                    variable_domains,
                    activities,
                    ..
                } = &mut *self.problem;
                constraint_matrix.sparsify(
                    self.num,
                    eq_row,
                    scale,
                    *candidate,
                    variable_domains,
                    activities,
                    &mut self.changed_activities,
                    &mut self.redundant_rows,
                    &mut self.singleton_rows,
                    &mut self.singleton_columns,
                    &mut self.empty_columns,
                    self.stats.nrounds,
                )
            };
            self.stats.ndeletedrows += (self.redundant_rows.len() - redundant_before) as i64;

            if cancelled != 0 {
                self.set_row_state(*candidate, State::MODIFIED);
                cancelled_rows += 1;
                total_cancelled += cancelled;

                if eq_rhs != R::zero() {
                    let rflags = self.problem.constraint_matrix.row_flags[*candidate];
                    if !rflags.test(RowFlags::LHS_INF) {
                        self.stats.nsidechgs += 1;
                    }
                    if !rflags.test(RowFlags::RHS_INF) {
                        self.stats.nsidechgs += 1;
                    }
                }
            }
        }

        if total_cancelled != 0 {
            debug!(
                "sparsify cancelled {} nonzeros in {} rows against row {}",
                total_cancelled, cancelled_rows, eq_row,
            );
            self.stats.ncoefchgs += eq_len * cancelled_rows;

            let eq_cols: Vec<usize> = self.problem.constraint_matrix.rows[eq_row]
                .iter()
                .map(|&(col, _)| col)
                .collect();
            for col in eq_cols {
                self.set_col_state(col, State::MODIFIED);
            }
        }
    }
}
