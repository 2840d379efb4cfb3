//! # Constraint matrix tests
//!
//! The dual storage must stay consistent under point edits, bulk replay, aggregation,
//! sparsification, deletion and compaction.
use crate::data::elements::{ColFlags, RowFlags};
use crate::data::matrix::buffer::MatrixBuffer;
use crate::data::matrix::ConstraintMatrix;
use crate::data::number_types::Tolerances;
use crate::data::problem::activity::{compute_row_activity, RowActivity};
use crate::data::problem::VariableDomains;

fn domains(ncols: usize) -> VariableDomains<f64> {
    VariableDomains {
        lower_bounds: vec![0.0; ncols],
        upper_bounds: vec![1.0; ncols],
        flags: vec![ColFlags::NONE; ncols],
    }
}

fn activities(matrix: &ConstraintMatrix<f64>, domains: &VariableDomains<f64>) -> Vec<RowActivity<f64>> {
    (0..matrix.n_rows())
        .map(|row| compute_row_activity(matrix.row(row), domains))
        .collect()
}

/// Every entry of the row major storage appears in the column major storage and vice versa.
fn assert_storage_consistent(matrix: &ConstraintMatrix<f64>) {
    for row in 0..matrix.n_rows() {
        for (col, value) in matrix.row(row) {
            let entry = matrix.col(*col).iter().find(|&&(r, _)| r == row);
            assert_eq!(entry, Some(&(row, *value)));
        }
    }
    for col in 0..matrix.n_cols() {
        for (row, value) in matrix.col(col) {
            let entry = matrix.row(*row).iter().find(|&&(c, _)| c == col);
            assert_eq!(entry, Some(&(col, *value)));
        }
        let size = matrix.col_sizes()[col];
        assert_eq!(matrix.col(col).len(), size.max(0) as usize);
    }
}

#[test]
fn change_coefficients_updates_both_orders() {
    // x0 + x1 <= 10 and x1 + x2 <= 8.
    let mut matrix = ConstraintMatrix::from_triplets(
        2,
        3,
        vec![(0, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0), (1, 2, 1.0)],
        vec![0.0, 0.0],
        vec![10.0, 8.0],
        vec![RowFlags::LHS_INF, RowFlags::LHS_INF],
    );
    let domains = domains(3);
    let mut row_activities = activities(&matrix, &domains);

    let mut buffer = MatrixBuffer::default();
    buffer.add_entry(0, 0, 0.0);
    buffer.add_entry(1, 2, 2.5);

    let mut singleton_rows = Vec::new();
    let mut singleton_cols = Vec::new();
    let mut empty_cols = Vec::new();
    let mut changes = 0;
    matrix.change_coefficients(
        &mut buffer,
        &mut singleton_rows,
        &mut singleton_cols,
        &mut empty_cols,
        &mut row_activities,
        |_, _, _, _, _, _| changes += 1,
    );

    assert_eq!(changes, 2);
    assert_eq!(matrix.row(0), &[(1, 1.0)]);
    assert_eq!(matrix.get_coefficient(1, 2), Some(&2.5));
    assert_eq!(matrix.row_sizes()[0], 1);
    assert_eq!(matrix.col_sizes()[0], 0);
    assert_eq!(singleton_rows, vec![0]);
    assert_eq!(empty_cols, vec![0]);
    assert_storage_consistent(&matrix);
}

#[test]
fn aggregate_substitutes_column() {
    // x0 + x1 = 4 and 2 x0 + x2 <= 10; substituting x0 rewrites the second row as
    // -2 x1 + x2 <= 2 and empties the equation.
    let mut matrix = ConstraintMatrix::from_triplets(
        2,
        3,
        vec![(0, 0, 1.0), (0, 1, 1.0), (1, 0, 2.0), (1, 2, 1.0)],
        vec![4.0, 0.0],
        vec![4.0, 10.0],
        vec![RowFlags::EQUATION, RowFlags::LHS_INF],
    );
    let num = Tolerances::default();
    let domains = domains(3);
    let mut row_activities = activities(&matrix, &domains);

    let eq_entries = matrix.row(0).to_vec();
    let mut changed_activities = Vec::new();
    let mut redundant_rows = Vec::new();
    let mut singleton_rows = Vec::new();
    let mut singleton_cols = Vec::new();
    let mut empty_cols = Vec::new();
    matrix.aggregate(
        &num,
        0,
        &eq_entries,
        4.0,
        &domains,
        &mut row_activities,
        &mut changed_activities,
        &mut redundant_rows,
        &mut singleton_rows,
        &mut singleton_cols,
        &mut empty_cols,
        0,
    );

    assert_eq!(matrix.row_sizes()[0], -1);
    assert!(matrix.row(0).is_empty());
    assert!(matrix.row_flags()[0].test(RowFlags::REDUNDANT));
    assert_eq!(redundant_rows, vec![0]);

    assert_eq!(matrix.row(1), &[(1, -2.0), (2, 1.0)]);
    assert_eq!(matrix.rhs()[1], 10.0 - 2.0 * 4.0);
    assert_eq!(matrix.col_sizes()[0], -1);
    assert!(matrix.col(0).is_empty());
    assert!(changed_activities.contains(&1));

    let recomputed = compute_row_activity(matrix.row(1), &domains);
    assert_eq!(row_activities[1].min, recomputed.min);
    assert_eq!(row_activities[1].max, recomputed.max);
    assert_storage_consistent(&matrix);
}

#[test]
fn sparsify_without_gain_leaves_row_untouched() {
    // x0 + x1 = 2 against x0 + x2 <= 3: one cancellation, one fill-in, no gain.
    let mut matrix = ConstraintMatrix::from_triplets(
        2,
        3,
        vec![(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0)],
        vec![2.0, 0.0],
        vec![2.0, 3.0],
        vec![RowFlags::EQUATION, RowFlags::LHS_INF],
    );
    let num = Tolerances::default();
    let domains = domains(3);
    let mut row_activities = activities(&matrix, &domains);

    let cancelled = matrix.sparsify(
        &num,
        0,
        &-1.0,
        1,
        &domains,
        &mut row_activities,
        &mut Vec::new(),
        &mut Vec::new(),
        &mut Vec::new(),
        &mut Vec::new(),
        &mut Vec::new(),
        0,
    );

    assert_eq!(cancelled, 0);
    assert_eq!(matrix.row(1), &[(0, 1.0), (2, 1.0)]);
    assert_eq!(matrix.rhs()[1], 3.0);
    assert_storage_consistent(&matrix);
}

#[test]
fn aggregation_sparsity_condition() {
    // x0 + x1 + x2 = 1; the other rows share no column with the equation besides x0, so each
    // contributes a net fill-in of one while the equation row itself shrinks by one.
    let matrix = ConstraintMatrix::from_triplets(
        3,
        4,
        vec![
            (0, 0, 1.0),
            (0, 1, 1.0),
            (0, 2, 1.0),
            (1, 0, 20.0),
            (1, 3, 1.0),
            (2, 0, 1.0),
            (2, 3, 1.0),
        ],
        vec![1.0, 0.0, 0.0],
        vec![1.0, 5.0, 5.0],
        vec![RowFlags::EQUATION, RowFlags::LHS_INF, RowFlags::LHS_INF],
    );

    let eq_entries = matrix.row(0).to_vec();
    // Net fill-in over all rewritten rows is one.
    assert!(matrix.check_aggregation_sparsity(0, &eq_entries, 10, &100.0));
    assert!(!matrix.check_aggregation_sparsity(0, &eq_entries, 0, &100.0));
    // The second row's scale magnitude is 20.
    assert!(!matrix.check_aggregation_sparsity(0, &eq_entries, 10, &10.0));
}

#[test]
fn delete_rows_and_cols_maintains_queues() {
    let mut matrix = ConstraintMatrix::from_triplets(
        2,
        3,
        vec![(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0)],
        vec![0.0, 0.0],
        vec![4.0, 5.0],
        vec![RowFlags::LHS_INF, RowFlags::LHS_INF],
    );
    matrix.row_flags[0].set(RowFlags::REDUNDANT);

    let mut redundant_rows = vec![0];
    let mut deleted_cols = vec![0];
    let mut singleton_rows = Vec::new();
    let mut singleton_cols = Vec::new();
    let mut empty_cols = Vec::new();
    matrix.delete_rows_and_cols(
        &mut redundant_rows,
        &mut deleted_cols,
        &mut singleton_rows,
        &mut singleton_cols,
        &mut empty_cols,
    );

    assert!(redundant_rows.is_empty());
    assert!(deleted_cols.is_empty());
    assert_eq!(matrix.row_sizes()[0], -1);
    assert_eq!(matrix.col_sizes()[0], -1);
    assert_eq!(matrix.row(1), &[(2, 1.0)]);
    assert_eq!(singleton_rows, vec![1]);
    assert_eq!(empty_cols, vec![1]);
    assert_storage_consistent(&matrix);
}

#[test]
fn compress_renumbers_storage() {
    let mut matrix = ConstraintMatrix::from_triplets(
        2,
        3,
        vec![(0, 0, 1.0), (0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0)],
        vec![0.0, 0.0],
        vec![4.0, 5.0],
        vec![RowFlags::LHS_INF, RowFlags::LHS_INF],
    );
    matrix.row_flags[0].set(RowFlags::REDUNDANT);
    matrix.delete_rows_and_cols(
        &mut vec![0],
        &mut vec![0],
        &mut Vec::new(),
        &mut Vec::new(),
        &mut Vec::new(),
    );

    let (row_mapping, col_mapping) = matrix.compress(false);

    assert_eq!(row_mapping, vec![None, Some(0)]);
    assert_eq!(col_mapping, vec![None, Some(0), Some(1)]);
    assert_eq!(matrix.n_rows(), 1);
    assert_eq!(matrix.n_cols(), 2);
    assert_eq!(matrix.row(0), &[(1, 1.0)]);
    assert_eq!(matrix.rhs()[0], 5.0);
    assert_storage_consistent(&matrix);
}
