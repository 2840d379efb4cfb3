//! # Row activities
//!
//! For every row a running pair `[min, max]` of attainable row sums is maintained, together with
//! counters of how many columns contribute an infinite or huge bound to each side. Only finite,
//! useful bounds are summed; the counters stand in for the rest. Keeping these incremental is
//! what makes activity-based redundancy and infeasibility detection cheap; the helpers in this
//! module are the only places that touch the sums.
use crate::data::elements::{ActivityChange, BoundDirection, ColFlags, RowFlags, RowStatus};
use crate::data::number_types::{Real, Tolerances};
use crate::data::problem::VariableDomains;

/// Running activity bounds of a single row.
///
/// The invariant, restored at every observable boundary: `min` is the sum of `coef * lb` over
/// positive coefficients plus `coef * ub` over negative ones, restricted to columns whose relevant
/// bound is finite and not huge; `ninf_min` counts the excluded columns. Symmetrically for `max`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RowActivity<R> {
    pub min: R,
    pub max: R,
    pub ninf_min: usize,
    pub ninf_max: usize,
    /// Round in which this row was last put on the changed-activities list, `-1` if never.
    pub last_change: i64,
}

impl<R: Real> RowActivity<R> {
    pub fn new() -> Self {
        Self {
            min: R::zero(),
            max: R::zero(),
            ninf_min: 0,
            ninf_max: 0,
            last_change: -1,
        }
    }

    /// Classify this row against its sides.
    ///
    /// A side is implied when the activity bound that could violate it is finite and feasibly
    /// within it; the row is infeasible when an activity bound feasibly crosses a side.
    pub fn check_status(
        &self,
        num: &Tolerances<R>,
        rflags: RowFlags,
        lhs: &R,
        rhs: &R,
    ) -> RowStatus {
        if !rflags.test(RowFlags::RHS_INF) && self.ninf_min == 0 && num.is_feas_gt(&self.min, rhs)
        {
            return RowStatus::Infeasible;
        }
        if !rflags.test(RowFlags::LHS_INF) && self.ninf_max == 0 && num.is_feas_lt(&self.max, lhs)
        {
            return RowStatus::Infeasible;
        }

        let lhs_redundant = rflags.test(RowFlags::LHS_INF)
            || (self.ninf_min == 0 && num.is_feas_ge(&self.min, lhs));
        let rhs_redundant = rflags.test(RowFlags::RHS_INF)
            || (self.ninf_max == 0 && num.is_feas_le(&self.max, rhs));

        match (lhs_redundant, rhs_redundant) {
            (true, true) => RowStatus::Redundant,
            (true, false) if !rflags.test(RowFlags::LHS_INF) => RowStatus::RedundantLhs,
            (false, true) if !rflags.test(RowFlags::RHS_INF) => RowStatus::RedundantRhs,
            _ => RowStatus::Unknown,
        }
    }
}

/// Compute a row's activity from scratch.
pub fn compute_row_activity<R: Real>(
    entries: &[(usize, R)],
    domains: &VariableDomains<R>,
) -> RowActivity<R> {
    let mut activity = RowActivity::new();

    for (col, value) in entries {
        debug_assert!(*value != R::zero());

        let flags = domains.flags[*col];
        if *value > R::zero() {
            if flags.test(ColFlags::LB_USELESS) {
                activity.ninf_min += 1;
            } else {
                activity.min += value.clone() * domains.lower_bounds[*col].clone();
            }
            if flags.test(ColFlags::UB_USELESS) {
                activity.ninf_max += 1;
            } else {
                activity.max += value.clone() * domains.upper_bounds[*col].clone();
            }
        } else {
            if flags.test(ColFlags::UB_USELESS) {
                activity.ninf_min += 1;
            } else {
                activity.min += value.clone() * domains.upper_bounds[*col].clone();
            }
            if flags.test(ColFlags::LB_USELESS) {
                activity.ninf_max += 1;
            } else {
                activity.max += value.clone() * domains.lower_bounds[*col].clone();
            }
        }
    }

    activity
}

/// Propagate a bound change of one column into the activities of the rows it appears in.
///
/// The new bound must be finite and not huge; a bound that turns useless instead goes through
/// [`update_activities_after_bound_becomes_useless`]. The running sums always hold the full
/// finite-bound contribution of every column, whatever the counters say, so a previously useless
/// bound enters the sum as soon as it resolves. `activity_change` is invoked for every row whose
/// affected activity side changed, so that the caller can queue the row for redundancy and
/// propagation checks; the queue itself filters rows whose side has no definite value yet.
///
/// # Arguments
///
/// * `entries`: The column's nonzeros as `(row, coefficient)` pairs.
/// * `direction`: Which of the column's bounds changed.
/// * `old_bound`: The previous bound value; meaningless when `old_useless` is set.
/// * `new_bound`: The new bound value.
/// * `old_useless`: Whether the previous bound was infinite or huge, i.e. counted instead of
///   summed.
pub(crate) fn update_activities_after_boundchange<R: Real, F>(
    entries: &[(usize, R)],
    direction: BoundDirection,
    old_bound: &R,
    new_bound: &R,
    old_useless: bool,
    activities: &mut [RowActivity<R>],
    mut activity_change: F,
) where
    F: FnMut(ActivityChange, usize, &mut RowActivity<R>),
{
    debug_assert!(old_useless || old_bound != new_bound);

    for (row, value) in entries {
        let activity = &mut activities[*row];

        let feeds_min = match direction {
            BoundDirection::Lower => *value > R::zero(),
            BoundDirection::Upper => *value < R::zero(),
        };

        if feeds_min {
            if old_useless {
                debug_assert!(activity.ninf_min > 0);

                activity.ninf_min -= 1;
                activity.min += new_bound.clone() * value.clone();
            } else {
                activity.min += (new_bound.clone() - old_bound.clone()) * value.clone();
            }
            activity_change(ActivityChange::Min, *row, activity);
        } else {
            if old_useless {
                debug_assert!(activity.ninf_max > 0);

                activity.ninf_max -= 1;
                activity.max += new_bound.clone() * value.clone();
            } else {
                activity.max += (new_bound.clone() - old_bound.clone()) * value.clone();
            }
            activity_change(ActivityChange::Max, *row, activity);
        }
    }
}

/// Take a previously finite, summed bound of one column out of the activities of the rows it
/// appears in, counting the column as an excluded contributor from now on.
///
/// The inverse transition of the `old_useless` path of
/// [`update_activities_after_boundchange`]: used when a bound change leaves a finite value that
/// is too large to constrain the activities, so its old contribution must be retracted and the
/// counters must learn about the new useless bound.
pub(crate) fn update_activities_after_bound_becomes_useless<R: Real, F>(
    entries: &[(usize, R)],
    direction: BoundDirection,
    old_bound: &R,
    activities: &mut [RowActivity<R>],
    mut activity_change: F,
) where
    F: FnMut(ActivityChange, usize, &mut RowActivity<R>),
{
    for (row, value) in entries {
        let activity = &mut activities[*row];

        let feeds_min = match direction {
            BoundDirection::Lower => *value > R::zero(),
            BoundDirection::Upper => *value < R::zero(),
        };

        if feeds_min {
            activity.min -= old_bound.clone() * value.clone();
            activity.ninf_min += 1;
            activity_change(ActivityChange::Min, *row, activity);
        } else {
            activity.max -= old_bound.clone() * value.clone();
            activity.ninf_max += 1;
            activity_change(ActivityChange::Max, *row, activity);
        }
    }
}

/// Adjust one row's activity after a single coefficient changed value.
///
/// Handles removal (new value zero), fill-in (old value zero) and sign changes by exchanging the
/// column's bound contributions between the two activity sides.
pub(crate) fn update_activity_after_coeffchange<R: Real, F>(
    lower_bound: &R,
    upper_bound: &R,
    flags: ColFlags,
    old_value: &R,
    new_value: &R,
    activity: &mut RowActivity<R>,
    mut activity_change: F,
) where
    F: FnMut(ActivityChange, &mut RowActivity<R>),
{
    debug_assert!(old_value != new_value);

    if old_value.clone() * new_value.clone() <= R::zero() {
        // The contribution switches sides (or appears, or vanishes): remove the old one and add
        // the new one.
        if *old_value != R::zero() {
            if *old_value > R::zero() {
                if flags.test(ColFlags::LB_USELESS) {
                    debug_assert!(activity.ninf_min > 0);
                    activity.ninf_min -= 1;
                } else {
                    activity.min -= old_value.clone() * lower_bound.clone();
                }
                if flags.test(ColFlags::UB_USELESS) {
                    debug_assert!(activity.ninf_max > 0);
                    activity.ninf_max -= 1;
                } else {
                    activity.max -= old_value.clone() * upper_bound.clone();
                }
            } else {
                if flags.test(ColFlags::UB_USELESS) {
                    debug_assert!(activity.ninf_min > 0);
                    activity.ninf_min -= 1;
                } else {
                    activity.min -= old_value.clone() * upper_bound.clone();
                }
                if flags.test(ColFlags::LB_USELESS) {
                    debug_assert!(activity.ninf_max > 0);
                    activity.ninf_max -= 1;
                } else {
                    activity.max -= old_value.clone() * lower_bound.clone();
                }
            }
        }

        if *new_value != R::zero() {
            if *new_value > R::zero() {
                if flags.test(ColFlags::LB_USELESS) {
                    activity.ninf_min += 1;
                } else {
                    activity.min += new_value.clone() * lower_bound.clone();
                }
                if flags.test(ColFlags::UB_USELESS) {
                    activity.ninf_max += 1;
                } else {
                    activity.max += new_value.clone() * upper_bound.clone();
                }
            } else {
                if flags.test(ColFlags::UB_USELESS) {
                    activity.ninf_min += 1;
                } else {
                    activity.min += new_value.clone() * upper_bound.clone();
                }
                if flags.test(ColFlags::LB_USELESS) {
                    activity.ninf_max += 1;
                } else {
                    activity.max += new_value.clone() * lower_bound.clone();
                }
            }
        }

        activity_change(ActivityChange::Min, activity);
        activity_change(ActivityChange::Max, activity);
    } else {
        // The sign is unchanged, so each side keeps its bound and only scales.
        let delta = new_value.clone() - old_value.clone();
        if *new_value > R::zero() {
            if !flags.test(ColFlags::LB_USELESS) {
                activity.min += lower_bound.clone() * delta.clone();
            }
            if !flags.test(ColFlags::UB_USELESS) {
                activity.max += upper_bound.clone() * delta;
            }
        } else {
            if !flags.test(ColFlags::UB_USELESS) {
                activity.min += upper_bound.clone() * delta.clone();
            }
            if !flags.test(ColFlags::LB_USELESS) {
                activity.max += lower_bound.clone() * delta;
            }
        }

        activity_change(ActivityChange::Min, activity);
        activity_change(ActivityChange::Max, activity);
    }
}

#[cfg(test)]
mod test {
    use crate::data::elements::{BoundDirection, ColFlags, RowFlags, RowStatus};
    use crate::data::number_types::Tolerances;
    use crate::data::problem::activity::{
        compute_row_activity, update_activities_after_boundchange, RowActivity,
    };
    use crate::data::problem::VariableDomains;

    fn domains() -> VariableDomains<f64> {
        VariableDomains {
            lower_bounds: vec![0.0, -1.0, 0.0],
            upper_bounds: vec![2.0, 1.0, 0.0],
            flags: vec![ColFlags::NONE, ColFlags::NONE, ColFlags::UB_INF],
        }
    }

    #[test]
    fn compute() {
        // 3 x0 - 2 x1 + x2 with x0 in [0, 2], x1 in [-1, 1], x2 in [0, inf).
        let entries = vec![(0, 3.0), (1, -2.0), (2, 1.0)];
        let activity = compute_row_activity(&entries, &domains());

        assert_eq!(activity.min, 3.0 * 0.0 + -2.0 * 1.0 + 1.0 * 0.0);
        assert_eq!(activity.max, 3.0 * 2.0 + -2.0 * -1.0);
        assert_eq!(activity.ninf_min, 0);
        assert_eq!(activity.ninf_max, 1);
    }

    #[test]
    fn status_against_sides() {
        let num = Tolerances::default();
        let activity = RowActivity {
            min: -2.0,
            max: 8.0,
            ninf_min: 0,
            ninf_max: 0,
            last_change: -1,
        };

        let flags = RowFlags::LHS_INF;
        assert_eq!(activity.check_status(&num, flags, &0.0, &10.0), RowStatus::Redundant);
        assert_eq!(activity.check_status(&num, flags, &0.0, &5.0), RowStatus::Unknown);
        assert_eq!(
            activity.check_status(&num, RowFlags::NONE, &-5.0, &5.0),
            RowStatus::RedundantLhs,
        );
        assert_eq!(
            activity.check_status(&num, RowFlags::NONE, &9.0, &12.0),
            RowStatus::Infeasible,
        );
    }

    #[test]
    fn bound_change_resolves_infinite_contribution() {
        let domains = domains();
        let entries = vec![(0, 1.0)];
        let mut activities = vec![compute_row_activity(&entries, &domains)];
        // Pretend column 0's upper bound was infinite before.
        activities[0].max = 0.0;
        activities[0].ninf_max = 1;

        let mut changed = Vec::new();
        update_activities_after_boundchange(
            &entries,
            BoundDirection::Upper,
            &0.0,
            &2.0,
            true,
            &mut activities,
            |change, row, _| changed.push((change, row)),
        );

        assert_eq!(activities[0].ninf_max, 0);
        assert_eq!(activities[0].max, 2.0);
        assert_eq!(changed.len(), 1);
    }
}
