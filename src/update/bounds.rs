//! # Bound and fixing primitives
//!
//! The unified bound-change algorithm every reduction funnels through: validate against the
//! opposite bound and integrality, propagate the delta into the row activities, reclassify huge
//! bounds, detect newly fixed columns and record the transaction state.
use log::debug;

use crate::data::elements::{BoundDirection, ColFlags, PresolveStatus};
use crate::data::number_types::Real;
use crate::data::problem::activity::{
    update_activities_after_bound_becomes_useless, update_activities_after_boundchange,
};
use crate::data::problem::Problem;
use crate::update::{activity_tracker, ProblemUpdate, State};

impl<'a, R: Real> ProblemUpdate<'a, R> {
    /// Fix a column to a finite value.
    ///
    /// Fails infeasible when the value lies feasibly outside the current bounds or is fractional
    /// for an integral column. Fixing an already fixed column to the same value is a no-op.
    pub fn fix_col(&mut self, col: usize, value: R) -> PresolveStatus {
        let cflags = self.problem.variable_domains.flags[col];
        if cflags.test(ColFlags::SUBSTITUTED) {
            return PresolveStatus::Unchanged;
        }

        let lb_changed = cflags.test(ColFlags::LB_INF)
            || value != self.problem.variable_domains.lower_bounds[col];
        let ub_changed = cflags.test(ColFlags::UB_INF)
            || value != self.problem.variable_domains.upper_bounds[col];

        if lb_changed || ub_changed {
            let domains = self.problem.variable_domains();
            if (!cflags.test(ColFlags::LB_INF)
                && self.num.is_feas_lt(&value, &domains.lower_bounds[col]))
                || (!cflags.test(ColFlags::UB_INF)
                    && self.num.is_feas_gt(&value, &domains.upper_bounds[col]))
                || (cflags.test(ColFlags::INTEGRAL) && !self.num.is_feas_integral(&value))
            {
                debug!(
                    "fixing {} col {} to value {} is infeasible",
                    if cflags.test(ColFlags::INTEGRAL) { "integral" } else { "continuous" },
                    col,
                    value.to_f64(),
                );
                return PresolveStatus::Infeasible;
            }

            if cflags.test(ColFlags::FIXED) {
                return PresolveStatus::Unchanged;
            }

            if lb_changed {
                self.stats.nboundchgs += 1;
            }
            if ub_changed {
                self.stats.nboundchgs += 1;
            }

            {
                let Problem {
                    constraint_matrix,
                    variable_domains,
                    activities,
                    ..
                } = &mut *self.problem;
                let nrounds = self.stats.nrounds;

                if lb_changed {
                    let old = variable_domains.lower_bounds[col].clone();
                    update_activities_after_boundchange(
                        &constraint_matrix.cols[col],
                        BoundDirection::Lower,
                        &old,
                        &value,
                        cflags.test(ColFlags::LB_USELESS),
                        activities,
                        activity_tracker(
                            nrounds,
                            &constraint_matrix.row_flags,
                            &mut self.changed_activities,
                        ),
                    );
                    variable_domains.lower_bounds[col] = value.clone();
                    variable_domains.flags[col].unset(ColFlags::LB_USELESS);
                }

                if ub_changed {
                    let old = variable_domains.upper_bounds[col].clone();
                    update_activities_after_boundchange(
                        &constraint_matrix.cols[col],
                        BoundDirection::Upper,
                        &old,
                        &value,
                        cflags.test(ColFlags::UB_USELESS),
                        activities,
                        activity_tracker(
                            nrounds,
                            &constraint_matrix.row_flags,
                            &mut self.changed_activities,
                        ),
                    );
                    variable_domains.upper_bounds[col] = value;
                    variable_domains.flags[col].unset(ColFlags::UB_USELESS);
                }
            }

            self.mark_col_fixed(col);
            self.set_col_state(col, State::BOUNDS_MODIFIED);

            return PresolveStatus::Reduced;
        }

        debug_assert!(cflags.test(ColFlags::FIXED));

        PresolveStatus::Unchanged
    }

    /// Record that an unbounded column is fixed at the infinity whose sign matches `sign`.
    ///
    /// Precondition: the bound in that direction is infinite, i.e. `sign < 0` requires `LB_INF`
    /// and `sign > 0` requires `UB_INF`. Activities are left alone; the caller makes the affected
    /// rows redundant.
    pub fn fix_col_infinity(&mut self, col: usize, sign: R) -> PresolveStatus {
        let cflags = self.problem.variable_domains.flags[col];
        if cflags.test(ColFlags::SUBSTITUTED)
            || cflags.test(ColFlags::FIXED)
            || sign == R::zero()
        {
            return PresolveStatus::Unchanged;
        }

        debug_assert!(
            (sign < R::zero() && cflags.test(ColFlags::LB_INF))
                || (sign > R::zero() && cflags.test(ColFlags::UB_INF))
        );

        self.mark_col_fixed(col);
        self.set_col_state(col, State::BOUNDS_MODIFIED);

        PresolveStatus::Reduced
    }

    /// Tighten a column's lower bound.
    ///
    /// Integral and implied-integral columns round the bound inward first. A bound that feasibly
    /// crosses the upper bound is infeasible; one that exactly touches it clamps and fixes the
    /// column. A huge new bound is stored but flagged useless instead of entering the activities.
    pub fn change_lb(&mut self, col: usize, value: R) -> PresolveStatus {
        self.change_bound(BoundDirection::Lower, col, value)
    }

    /// Tighten a column's upper bound; the mirror image of [`ProblemUpdate::change_lb`].
    pub fn change_ub(&mut self, col: usize, value: R) -> PresolveStatus {
        self.change_bound(BoundDirection::Upper, col, value)
    }

    fn change_bound(&mut self, direction: BoundDirection, col: usize, value: R) -> PresolveStatus {
        let cflags = self.problem.variable_domains.flags[col];
        if cflags.test(ColFlags::SUBSTITUTED) {
            return PresolveStatus::Unchanged;
        }

        let mut new_bound = value;
        if cflags.test(ColFlags::INTEGRAL | ColFlags::IMPL_INT) {
            new_bound = match direction {
                BoundDirection::Lower => self.num.feas_ceil(&new_bound),
                BoundDirection::Upper => self.num.feas_floor(&new_bound),
            };
        }

        let (own_inf, own_useless, opposite_inf) = match direction {
            BoundDirection::Lower => (ColFlags::LB_INF, ColFlags::LB_USELESS, ColFlags::UB_INF),
            BoundDirection::Upper => (ColFlags::UB_INF, ColFlags::UB_USELESS, ColFlags::LB_INF),
        };
        let old_bound = match direction {
            BoundDirection::Lower => self.problem.variable_domains.lower_bounds[col].clone(),
            BoundDirection::Upper => self.problem.variable_domains.upper_bounds[col].clone(),
        };
        let opposite_bound = match direction {
            BoundDirection::Lower => self.problem.variable_domains.upper_bounds[col].clone(),
            BoundDirection::Upper => self.problem.variable_domains.lower_bounds[col].clone(),
        };

        let tightens = cflags.test(own_inf)
            || match direction {
                BoundDirection::Lower => new_bound > old_bound,
                BoundDirection::Upper => new_bound < old_bound,
            };
        if !tightens {
            return PresolveStatus::Unchanged;
        }

        let crosses = !cflags.test(opposite_inf)
            && match direction {
                BoundDirection::Lower => new_bound > opposite_bound,
                BoundDirection::Upper => new_bound < opposite_bound,
            };
        if crosses {
            let infeasible = match direction {
                BoundDirection::Lower => self.num.is_feas_gt(&new_bound, &opposite_bound),
                BoundDirection::Upper => self.num.is_feas_lt(&new_bound, &opposite_bound),
            };
            if infeasible {
                debug!(
                    "changing {:?} bound of col {} to value {} is infeasible",
                    direction,
                    col,
                    new_bound.to_f64(),
                );
                return PresolveStatus::Infeasible;
            }

            if !cflags.test(own_inf) && old_bound == opposite_bound {
                return PresolveStatus::Unchanged;
            }

            new_bound = opposite_bound.clone();
        }

        self.stats.nboundchgs += 1;

        {
            let Problem {
                constraint_matrix,
                variable_domains,
                activities,
                ..
            } = &mut *self.problem;
            let nrounds = self.stats.nrounds;

            if !self.num.is_huge(&new_bound) {
                update_activities_after_boundchange(
                    &constraint_matrix.cols[col],
                    direction,
                    &old_bound,
                    &new_bound,
                    cflags.test(own_useless),
                    activities,
                    activity_tracker(
                        nrounds,
                        &constraint_matrix.row_flags,
                        &mut self.changed_activities,
                    ),
                );
                variable_domains.flags[col].unset(own_useless);
            } else {
                // The bound gets a finite value but stays out of the activities. A previously
                // summed finite bound has to leave them; an infinite or huge one was already
                // only counted and the counters carry over.
                if !cflags.test(own_useless) {
                    update_activities_after_bound_becomes_useless(
                        &constraint_matrix.cols[col],
                        direction,
                        &old_bound,
                        activities,
                        activity_tracker(
                            nrounds,
                            &constraint_matrix.row_flags,
                            &mut self.changed_activities,
                        ),
                    );
                }
                variable_domains.flags[col].unset(own_inf);
                variable_domains.flags[col].set(match direction {
                    BoundDirection::Lower => ColFlags::LB_HUGE,
                    BoundDirection::Upper => ColFlags::UB_HUGE,
                });
            }

            match direction {
                BoundDirection::Lower => {
                    variable_domains.lower_bounds[col] = new_bound.clone();
                }
                BoundDirection::Upper => {
                    variable_domains.upper_bounds[col] = new_bound.clone();
                }
            }
        }

        let domains = self.problem.variable_domains();
        if !domains.flags[col].test(opposite_inf) && new_bound == opposite_bound {
            self.mark_col_fixed(col);
        }

        self.set_col_state(col, State::BOUNDS_MODIFIED);

        PresolveStatus::Reduced
    }
}
