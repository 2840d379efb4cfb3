//! # Property tests
//!
//! Invariants the engine restores at every observable boundary.
use crate::data::elements::{ApplyResult, ColFlags, ConflictType, PresolveStatus, RowFlags};
use crate::data::problem::activity::compute_row_activity;
use crate::data::problem::{Problem, ProblemBuilder};
use crate::update::reduction::{ColReduction, Reduction, RowReduction};
use crate::update::test::Setup;
use crate::update::ProblemUpdate;

/// Recomputing every activity from scratch must reproduce the maintained values exactly.
fn assert_activities_exact(problem: &Problem<f64>) {
    let matrix = problem.constraint_matrix();
    for row in 0..problem.n_rows() {
        if matrix.row_flags()[row].test(RowFlags::REDUNDANT) {
            continue;
        }

        let recomputed = compute_row_activity(matrix.row(row), problem.variable_domains());
        let maintained = &problem.activities()[row];
        assert_eq!(maintained.min, recomputed.min, "min activity of row {}", row);
        assert_eq!(maintained.max, recomputed.max, "max activity of row {}", row);
        assert_eq!(maintained.ninf_min, recomputed.ninf_min, "ninf_min of row {}", row);
        assert_eq!(maintained.ninf_max, recomputed.ninf_max, "ninf_max of row {}", row);
    }
}

fn mixed_problem() -> Problem<f64> {
    // x0 + 2 x1 - x2 in [-2, 8], 3 x1 + x2 <= 6, with x0 in [0, 2], x1 free, x2 in [-1, inf).
    let mut builder = ProblemBuilder::new();
    builder.set_num_cols(3).set_num_rows(2);
    builder.set_col_upper(0, Some(2.0));
    builder.set_col_lower(1, None);
    builder.set_col_lower(2, Some(-1.0));
    builder.set_row_lhs(0, Some(-2.0)).set_row_rhs(0, Some(8.0));
    builder.set_row_rhs(1, Some(6.0));
    builder.add_entry(0, 0, 1.0).add_entry(0, 1, 2.0).add_entry(0, 2, -1.0);
    builder.add_entry(1, 1, 3.0).add_entry(1, 2, 1.0);

    builder.build()
}

#[test]
fn activities_match_recompute_after_transactions() {
    let mut setup = Setup::new(mixed_problem());
    let mut update = ProblemUpdate::new(
        &mut setup.problem,
        &mut setup.postsolve,
        &mut setup.stats,
        &setup.options,
        &setup.num,
    );

    assert_eq!(
        update.apply_transaction(&[Reduction::Col(ColReduction::LowerBound {
            col: 1,
            value: -3.0,
        })]),
        ApplyResult::Applied,
    );
    assert_eq!(
        update.apply_transaction(&[Reduction::coef_change(0, 2, -2.0)]),
        ApplyResult::Applied,
    );
    assert_eq!(
        update.apply_transaction(&[Reduction::Col(ColReduction::UpperBound {
            col: 2,
            value: 4.0,
        })]),
        ApplyResult::Applied,
    );
    assert_ne!(update.flush(), PresolveStatus::Infeasible);
    drop(update);

    assert_activities_exact(&setup.problem);
}

#[test]
fn activities_match_recompute_after_trivial_presolve() {
    let mut setup = Setup::new(mixed_problem());
    let mut update = ProblemUpdate::new(
        &mut setup.problem,
        &mut setup.postsolve,
        &mut setup.stats,
        &setup.options,
        &setup.num,
    );

    assert_ne!(update.trivial_presolve(), PresolveStatus::Infeasible);
    drop(update);

    assert_activities_exact(&setup.problem);
}

#[test]
fn huge_bound_leaves_and_reenters_activities() {
    // x0 + x1 <= 10 where x0 carries a large but finite upper bound. Tightening it past the
    // huge threshold must retract its contribution from the row activity and count the column
    // as an excluded contributor; tightening it back to a normal value reverses that.
    let mut builder = ProblemBuilder::<f64>::new();
    builder.set_num_cols(2).set_num_rows(1);
    builder.set_col_upper(0, Some(5e8));
    builder.set_col_upper(1, Some(1.0));
    builder.set_row_rhs(0, Some(10.0));
    builder.add_entry(0, 0, 1.0).add_entry(0, 1, 1.0);

    let mut setup = Setup::new(builder.build());
    let mut update = ProblemUpdate::new(
        &mut setup.problem,
        &mut setup.postsolve,
        &mut setup.stats,
        &setup.options,
        &setup.num,
    );

    assert_eq!(update.change_ub(0, 2e8), PresolveStatus::Reduced);

    let domains = update.problem().variable_domains();
    assert!(domains.flags[0].test(ColFlags::UB_HUGE));
    assert!(!domains.flags[0].test(ColFlags::UB_INF));
    assert_eq!(domains.upper_bounds[0], 2e8);
    assert_eq!(update.problem().activities()[0].ninf_max, 1);
    assert_eq!(update.problem().activities()[0].max, 1.0);
    assert_activities_exact(update.problem());

    // A later tightening below the threshold resolves the excluded contribution again.
    assert_eq!(update.change_ub(0, 5.0), PresolveStatus::Reduced);

    let domains = update.problem().variable_domains();
    assert!(!domains.flags[0].test(ColFlags::UB_USELESS));
    assert_eq!(update.problem().activities()[0].ninf_max, 0);
    assert_eq!(update.problem().activities()[0].max, 6.0);
    assert_activities_exact(update.problem());
}

#[test]
fn fix_col_is_idempotent() {
    let mut builder = ProblemBuilder::<f64>::new();
    builder.set_num_cols(1).set_num_rows(0);
    builder.set_col_upper(0, Some(10.0));

    let mut setup = Setup::new(builder.build());
    let mut update = ProblemUpdate::new(
        &mut setup.problem,
        &mut setup.postsolve,
        &mut setup.stats,
        &setup.options,
        &setup.num,
    );

    assert_eq!(update.fix_col(0, 3.0), PresolveStatus::Reduced);
    assert_eq!(update.fix_col(0, 3.0), PresolveStatus::Unchanged);
    drop(update);

    assert_eq!(setup.stats.nboundchgs, 2);
    assert_eq!(setup.stats.ndeletedcols, 1);
}

#[test]
fn singleton_queue_is_exact_after_flush() {
    // x0 + x1 <= 4 and x1 + x2 <= 4; dropping x1 from the second row makes it a singleton
    // column and turns the second row into a bound on x2.
    let mut builder = ProblemBuilder::<f64>::new();
    builder.set_num_cols(3).set_num_rows(2);
    builder.set_row_rhs(0, Some(4.0));
    builder.set_row_rhs(1, Some(4.0));
    builder.add_entry(0, 0, 1.0).add_entry(0, 1, 1.0);
    builder.add_entry(1, 1, 1.0).add_entry(1, 2, 1.0);

    let mut setup = Setup::new(builder.build());
    setup.options.dualreds = 0;
    let mut update = ProblemUpdate::new(
        &mut setup.problem,
        &mut setup.postsolve,
        &mut setup.stats,
        &setup.options,
        &setup.num,
    );

    assert_ne!(update.trivial_presolve(), PresolveStatus::Infeasible);
    assert_eq!(
        update.apply_transaction(&[Reduction::coef_change(1, 1, 0.0)]),
        ApplyResult::Applied,
    );
    assert_ne!(update.flush(), PresolveStatus::Infeasible);

    let mut queued = update.get_singleton_cols().to_vec();
    queued.sort_unstable();
    queued.dedup();

    let col_sizes = update.problem().constraint_matrix().col_sizes();
    let singletons: Vec<usize> = (0..update.problem().n_cols())
        .filter(|&col| col_sizes[col] == 1)
        .collect();
    assert_eq!(queued, singletons);

    // No redundant row survives in the changed-activities list after a flush.
    let row_flags = update.problem().constraint_matrix().row_flags();
    assert!(update
        .get_changed_activities()
        .iter()
        .all(|&row| !row_flags[row].test(RowFlags::REDUNDANT)));
}

#[test]
fn conflict_detection_is_sound() {
    let mut setup = Setup::new(mixed_problem());
    let mut update = ProblemUpdate::new(
        &mut setup.problem,
        &mut setup.postsolve,
        &mut setup.stats,
        &setup.options,
        &setup.num,
    );

    assert_eq!(
        update.apply_transaction(&[Reduction::Col(ColReduction::Objective {
            col: 0,
            value: 5.0,
        })]),
        ApplyResult::Applied,
    );

    // A later transaction relying on column 0 being untouched is rejected.
    let lock_modified = [Reduction::Col(ColReduction::Locked { col: 0 })];
    assert_eq!(
        update.check_transaction_conflicts(&lock_modified),
        ConflictType::Conflict,
    );
    assert_eq!(update.apply_transaction(&lock_modified), ApplyResult::Rejected);

    // Untouched columns can still be locked.
    let lock_untouched = [Reduction::Col(ColReduction::Locked { col: 1 })];
    assert_eq!(
        update.check_transaction_conflicts(&lock_untouched),
        ConflictType::NoConflict,
    );
    assert_eq!(update.apply_transaction(&lock_untouched), ApplyResult::Applied);

    assert_eq!(
        update.apply_transaction(&[Reduction::Row(RowReduction::Rhs {
            row: 1,
            value: 5.0,
        })]),
        ApplyResult::Applied,
    );
    let lock_row = [Reduction::Row(RowReduction::LockedStrong { row: 1 })];
    assert_eq!(update.check_transaction_conflicts(&lock_row), ConflictType::Conflict);

    // A round boundary resets the states.
    update.flush_changed_coeffs();
    update.clear_states();
    assert_eq!(update.check_transaction_conflicts(&lock_row), ConflictType::NoConflict);
    assert_eq!(update.check_transaction_conflicts(&lock_modified), ConflictType::NoConflict);
}

#[test]
fn infeasible_transaction_aborts() {
    let mut builder = ProblemBuilder::<f64>::new();
    builder.set_num_cols(1).set_num_rows(0);
    builder.set_col_upper(0, Some(10.0));

    let mut setup = Setup::new(builder.build());
    let mut update = ProblemUpdate::new(
        &mut setup.problem,
        &mut setup.postsolve,
        &mut setup.stats,
        &setup.options,
        &setup.num,
    );

    let transaction = [Reduction::Col(ColReduction::LowerBound { col: 0, value: 20.0 })];
    assert_eq!(update.apply_transaction(&transaction), ApplyResult::Infeasible);
}
