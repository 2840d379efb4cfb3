//! # Constraint matrix
//!
//! Dual sparse storage of the constraint coefficients: the same nonzeros are kept sorted both row
//! major and column major, so that presolve reductions can scan rows and columns equally cheaply.
//! The two orders are kept consistent by every mutation. Sides and per-row flags live here as
//! well; per-column state lives with the variable domains.
//!
//! Row and column sizes mirror the storage; a size of `-1` marks a row or column that has been
//! deleted logically but whose index is still allocated until the next compaction.
use itertools::repeat_n;

use crate::data::compress::compress_data_vector;
use crate::data::elements::RowFlags;
use crate::data::matrix::buffer::MatrixBuffer;
use crate::data::number_types::{Real, Tolerances};
use crate::data::problem::activity::{compute_row_activity, RowActivity};
use crate::data::problem::VariableDomains;

pub mod buffer;

/// Sparse constraint storage with sides and row flags.
#[derive(Clone, Debug)]
pub struct ConstraintMatrix<R> {
    /// Row major storage: per row the `(column, coefficient)` pairs, sorted by column.
    pub(crate) rows: Vec<Vec<(usize, R)>>,
    /// Column major storage: per column the `(row, coefficient)` pairs, sorted by row.
    pub(crate) cols: Vec<Vec<(usize, R)>>,
    pub(crate) lhs: Vec<R>,
    pub(crate) rhs: Vec<R>,
    pub(crate) row_flags: Vec<RowFlags>,
    /// Number of nonzeros per row; `-1` once the row is deleted.
    pub(crate) row_sizes: Vec<i32>,
    /// Number of nonzeros per column; `-1` once the column is deleted.
    pub(crate) col_sizes: Vec<i32>,
}

impl<R: Real> ConstraintMatrix<R> {
    /// Build the dual storage from triplets.
    ///
    /// # Arguments
    ///
    /// * `entries`: `(row, column, coefficient)` triplets, in any order, without duplicates and
    ///   without zeros.
    pub(crate) fn from_triplets(
        nrows: usize,
        ncols: usize,
        entries: Vec<(usize, usize, R)>,
        lhs: Vec<R>,
        rhs: Vec<R>,
        row_flags: Vec<RowFlags>,
    ) -> Self {
        debug_assert_eq!(lhs.len(), nrows);
        debug_assert_eq!(rhs.len(), nrows);
        debug_assert_eq!(row_flags.len(), nrows);
        debug_assert!(entries.iter().all(|&(i, j, _)| i < nrows && j < ncols));
        debug_assert!(entries.iter().all(|(_, _, v)| *v != R::zero()));

        let mut rows: Vec<Vec<(usize, R)>> = repeat_n(Vec::new(), nrows).collect();
        let mut cols: Vec<Vec<(usize, R)>> = repeat_n(Vec::new(), ncols).collect();
        for (row, col, value) in entries {
            rows[row].push((col, value.clone()));
            cols[col].push((row, value));
        }
        for row in &mut rows {
            row.sort_by_key(|&(col, _)| col);
        }
        for col in &mut cols {
            col.sort_by_key(|&(row, _)| row);
        }

        Self {
            row_sizes: rows.iter().map(|row| row.len() as i32).collect(),
            col_sizes: cols.iter().map(|col| col.len() as i32).collect(),
            rows,
            cols,
            lhs,
            rhs,
            row_flags,
        }
    }

    pub fn row(&self, row: usize) -> &[(usize, R)] {
        &self.rows[row]
    }

    pub fn col(&self, col: usize) -> &[(usize, R)] {
        &self.cols[col]
    }

    pub fn lhs(&self) -> &[R] {
        &self.lhs
    }

    pub fn rhs(&self) -> &[R] {
        &self.rhs
    }

    pub fn row_flags(&self) -> &[RowFlags] {
        &self.row_flags
    }

    pub fn row_sizes(&self) -> &[i32] {
        &self.row_sizes
    }

    pub fn col_sizes(&self) -> &[i32] {
        &self.col_sizes
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    pub fn is_row_redundant(&self, row: usize) -> bool {
        self.row_flags[row].test(RowFlags::REDUNDANT)
    }

    pub fn get_coefficient(&self, row: usize, col: usize) -> Option<&R> {
        self.rows[row]
            .binary_search_by_key(&col, |&(index, _)| index)
            .ok()
            .map(|position| &self.rows[row][position].1)
    }

    /// Set a finite left-hand side.
    pub(crate) fn set_lhs(&mut self, row: usize, value: R) {
        self.lhs[row] = value;
        self.row_flags[row].unset(RowFlags::LHS_INF);
        self.update_equation_flag(row);
    }

    /// Relax the left-hand side to minus infinity.
    pub(crate) fn clear_lhs(&mut self, row: usize) {
        self.row_flags[row].set(RowFlags::LHS_INF);
        self.row_flags[row].unset(RowFlags::EQUATION);
        self.lhs[row] = R::zero();
    }

    /// Set a finite right-hand side.
    pub(crate) fn set_rhs(&mut self, row: usize, value: R) {
        self.rhs[row] = value;
        self.row_flags[row].unset(RowFlags::RHS_INF);
        self.update_equation_flag(row);
    }

    /// Relax the right-hand side to plus infinity.
    pub(crate) fn clear_rhs(&mut self, row: usize) {
        self.row_flags[row].set(RowFlags::RHS_INF);
        self.row_flags[row].unset(RowFlags::EQUATION);
        self.rhs[row] = R::zero();
    }

    /// Restore the invariant that a row is an equation iff both sides are finite and equal.
    pub(crate) fn update_equation_flag(&mut self, row: usize) {
        let flags = &mut self.row_flags[row];
        if !flags.test(RowFlags::LHS_INF | RowFlags::RHS_INF) && self.lhs[row] == self.rhs[row] {
            flags.set(RowFlags::EQUATION);
        } else {
            flags.unset(RowFlags::EQUATION);
        }
    }

    /// Replay buffered coefficient edits into both storage orders.
    ///
    /// Rows that drop to one nonzero are queued as singleton rows; columns that drop to one or
    /// zero nonzeros are queued as singleton or empty columns. For every effective change the
    /// callback receives the row flags and the row's activity so that the caller can keep the
    /// activities exact.
    ///
    /// # Arguments
    ///
    /// * `coeff_changed`: Called as `(row, col, old, new, row_flags, activity)` for every entry
    ///   whose value actually changed. Entries of deleted rows or columns are dropped silently.
    pub(crate) fn change_coefficients<F>(
        &mut self,
        buffer: &mut MatrixBuffer<R>,
        singleton_rows: &mut Vec<usize>,
        singleton_cols: &mut Vec<usize>,
        empty_cols: &mut Vec<usize>,
        activities: &mut [RowActivity<R>],
        mut coeff_changed: F,
    ) where
        F: FnMut(usize, usize, &R, &R, RowFlags, &mut RowActivity<R>),
    {
        for entry in buffer.take_sorted() {
            let (row, col) = (entry.row, entry.col);
            if self.row_sizes[row] < 0 || self.col_sizes[col] < 0 {
                continue;
            }

            let position = self.rows[row].binary_search_by_key(&col, |&(index, _)| index);
            match position {
                Ok(position) if entry.value == R::zero() => {
                    let (_, old) = self.rows[row].remove(position);
                    self.remove_col_entry(col, row);

                    self.row_sizes[row] -= 1;
                    if self.row_sizes[row] == 1 {
                        singleton_rows.push(row);
                    }
                    self.col_sizes[col] -= 1;
                    match self.col_sizes[col] {
                        0 => empty_cols.push(col),
                        1 => singleton_cols.push(col),
                        _ => (),
                    }

                    coeff_changed(
                        row,
                        col,
                        &old,
                        &R::zero(),
                        self.row_flags[row],
                        &mut activities[row],
                    );
                }
                Ok(position) => {
                    let old = std::mem::replace(&mut self.rows[row][position].1, entry.value.clone());
                    if old == entry.value {
                        continue;
                    }
                    let col_position = self.cols[col]
                        .binary_search_by_key(&row, |&(index, _)| index)
                        .expect("storage orders should be consistent");
                    self.cols[col][col_position].1 = entry.value.clone();

                    coeff_changed(
                        row,
                        col,
                        &old,
                        &entry.value,
                        self.row_flags[row],
                        &mut activities[row],
                    );
                }
                Err(position) if entry.value != R::zero() => {
                    self.rows[row].insert(position, (col, entry.value.clone()));
                    let col_position = self.cols[col]
                        .binary_search_by_key(&row, |&(index, _)| index)
                        .expect_err("storage orders should be consistent");
                    self.cols[col].insert(col_position, (row, entry.value.clone()));

                    self.row_sizes[row] += 1;
                    self.col_sizes[col] += 1;

                    coeff_changed(
                        row,
                        col,
                        &R::zero(),
                        &entry.value,
                        self.row_flags[row],
                        &mut activities[row],
                    );
                }
                Err(_) => (),
            }
        }
    }

    /// Substitute `col` out of the matrix using an equality `eq_entries . x = eq_rhs`.
    ///
    /// Every row containing `col` is rewritten as `row - (a_rc / e_c) * eq`, which cancels the
    /// column; if the equality is itself a row of the matrix it cancels against itself completely
    /// and is deleted. Sides shift along, activities of rewritten rows are recomputed and queued.
    pub(crate) fn aggregate(
        &mut self,
        num: &Tolerances<R>,
        col: usize,
        eq_entries: &[(usize, R)],
        eq_rhs: R,
        domains: &VariableDomains<R>,
        activities: &mut [RowActivity<R>],
        changed_activities: &mut Vec<usize>,
        redundant_rows: &mut Vec<usize>,
        singleton_rows: &mut Vec<usize>,
        singleton_cols: &mut Vec<usize>,
        empty_cols: &mut Vec<usize>,
        nrounds: i64,
    ) {
        let eq_coef = eq_entries
            .iter()
            .find(|&&(index, _)| index == col)
            .map(|(_, value)| value.clone())
            .expect("the substituted column should appear in the equality");

        let col_rows = self.cols[col].clone();
        for (row, row_coef) in col_rows {
            let scale = -(row_coef / eq_coef.clone());

            if eq_rhs != R::zero() {
                let shift = scale.clone() * eq_rhs.clone();
                if !self.row_flags[row].test(RowFlags::LHS_INF) {
                    self.lhs[row] += shift.clone();
                }
                if !self.row_flags[row].test(RowFlags::RHS_INF) {
                    self.rhs[row] += shift;
                }
            }

            let merged = Self::merge_rows(num, &self.rows[row], eq_entries, &scale, Some(col));
            self.replace_row(
                row,
                merged,
                domains,
                activities,
                changed_activities,
                redundant_rows,
                singleton_rows,
                singleton_cols,
                empty_cols,
                nrounds,
            );
        }

        debug_assert!(self.cols[col].is_empty());
        self.col_sizes[col] = -1;
    }

    /// Add `scale` times the equality row `eq_row` to `target_row` if that cancels nonzeros.
    ///
    /// Returns the net number of cancelled nonzeros; when the combination would not shrink the
    /// target row, nothing is modified and `0` is returned.
    pub(crate) fn sparsify(
        &mut self,
        num: &Tolerances<R>,
        eq_row: usize,
        scale: &R,
        target_row: usize,
        domains: &VariableDomains<R>,
        activities: &mut [RowActivity<R>],
        changed_activities: &mut Vec<usize>,
        redundant_rows: &mut Vec<usize>,
        singleton_rows: &mut Vec<usize>,
        singleton_cols: &mut Vec<usize>,
        empty_cols: &mut Vec<usize>,
        nrounds: i64,
    ) -> i64 {
        debug_assert_ne!(eq_row, target_row);
        debug_assert!(self.row_flags[eq_row].test(RowFlags::EQUATION));

        let merged = {
            let eq_entries = &self.rows[eq_row];
            Self::merge_rows(num, &self.rows[target_row], eq_entries, scale, None)
        };
        let cancelled = self.row_sizes[target_row] as i64 - merged.len() as i64;
        if cancelled <= 0 {
            return 0;
        }

        let eq_rhs = self.rhs[eq_row].clone();
        if eq_rhs != R::zero() {
            let shift = scale.clone() * eq_rhs;
            if !self.row_flags[target_row].test(RowFlags::LHS_INF) {
                self.lhs[target_row] += shift.clone();
            }
            if !self.row_flags[target_row].test(RowFlags::RHS_INF) {
                self.rhs[target_row] += shift;
            }
        }

        self.replace_row(
            target_row,
            merged,
            domains,
            activities,
            changed_activities,
            redundant_rows,
            singleton_rows,
            singleton_cols,
            empty_cols,
            nrounds,
        );

        cancelled
    }

    /// Whether substituting `col` through the given equality stays within the fill-in and
    /// side-shift budgets.
    ///
    /// The net fill-in over all rewritten rows may not exceed `max_fillin`, and no single row may
    /// be combined with a scale whose magnitude exceeds `max_shift` (which bounds how far its
    /// sides can move).
    pub(crate) fn check_aggregation_sparsity(
        &self,
        col: usize,
        eq_entries: &[(usize, R)],
        max_fillin: i32,
        max_shift: &R,
    ) -> bool {
        let eq_coef = match eq_entries.iter().find(|&&(index, _)| index == col) {
            Some((_, value)) => value.clone(),
            None => return false,
        };
        let eq_len = eq_entries.len();

        let mut fillin: i64 = 0;
        for (row, row_coef) in &self.cols[col] {
            let scale = (row_coef.clone() / eq_coef.clone()).abs();
            if scale > *max_shift {
                return false;
            }

            // Entries of the equality not yet present in the row are fill-in; the substituted
            // column itself always cancels.
            let overlap = Self::count_overlap(&self.rows[*row], eq_entries, col);
            fillin += (eq_len - 1 - overlap) as i64 - 1;

            if fillin > max_fillin as i64 {
                return false;
            }
        }

        true
    }

    /// Remove the storage of redundant rows and deleted columns.
    ///
    /// Rows and columns whose size drops to one (or zero, for columns) along the way are queued.
    /// Both input lists are drained.
    pub(crate) fn delete_rows_and_cols(
        &mut self,
        redundant_rows: &mut Vec<usize>,
        deleted_cols: &mut Vec<usize>,
        singleton_rows: &mut Vec<usize>,
        singleton_cols: &mut Vec<usize>,
        empty_cols: &mut Vec<usize>,
    ) {
        for row in redundant_rows.drain(..) {
            debug_assert!(self.row_flags[row].test(RowFlags::REDUNDANT));

            for (col, _) in std::mem::take(&mut self.rows[row]) {
                self.remove_col_entry(col, row);
                self.col_sizes[col] -= 1;
                match self.col_sizes[col] {
                    0 => empty_cols.push(col),
                    1 => singleton_cols.push(col),
                    _ => (),
                }
            }
            self.row_sizes[row] = -1;
            self.lhs[row] = R::zero();
            self.rhs[row] = R::zero();
        }

        for col in deleted_cols.drain(..) {
            if self.col_sizes[col] < 0 {
                continue;
            }

            for (row, _) in std::mem::take(&mut self.cols[col]) {
                if self.row_flags[row].test(RowFlags::REDUNDANT) {
                    continue;
                }

                let position = self.rows[row]
                    .binary_search_by_key(&col, |&(index, _)| index)
                    .expect("storage orders should be consistent");
                self.rows[row].remove(position);
                self.row_sizes[row] -= 1;
                if self.row_sizes[row] == 1 {
                    singleton_rows.push(row);
                }
            }
            self.col_sizes[col] = -1;
        }
    }

    /// Compact the storage, dropping deleted rows and columns.
    ///
    /// Returns the index mappings from old to new indices; deleted entries map to `None`.
    pub(crate) fn compress(
        &mut self,
        full: bool,
    ) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
        let row_mapping = Self::build_mapping(
            self.row_flags.iter().map(|flags| !flags.test(RowFlags::REDUNDANT)),
        );
        let col_mapping = Self::build_mapping(self.col_sizes.iter().map(|&size| size >= 0));

        compress_data_vector(&row_mapping, &mut self.rows);
        compress_data_vector(&row_mapping, &mut self.lhs);
        compress_data_vector(&row_mapping, &mut self.rhs);
        compress_data_vector(&row_mapping, &mut self.row_flags);
        compress_data_vector(&row_mapping, &mut self.row_sizes);
        compress_data_vector(&col_mapping, &mut self.cols);
        compress_data_vector(&col_mapping, &mut self.col_sizes);

        for row in &mut self.rows {
            for (col, _) in row.iter_mut() {
                *col = col_mapping[*col].expect("deleted columns should have no stored entries");
            }
        }
        for col in &mut self.cols {
            for (row, _) in col.iter_mut() {
                *row = row_mapping[*row].expect("redundant rows should have no stored entries");
            }
        }

        if full {
            self.rows.shrink_to_fit();
            self.cols.shrink_to_fit();
            self.lhs.shrink_to_fit();
            self.rhs.shrink_to_fit();
            self.row_flags.shrink_to_fit();
            self.row_sizes.shrink_to_fit();
            self.col_sizes.shrink_to_fit();
        }

        (row_mapping, col_mapping)
    }

    fn build_mapping(survives: impl Iterator<Item = bool>) -> Vec<Option<usize>> {
        let mut next = 0;
        survives
            .map(|keep| {
                if keep {
                    next += 1;
                    Some(next - 1)
                } else {
                    None
                }
            })
            .collect()
    }

    /// Linear combination `base + scale * addition` of two sorted sparse rows.
    ///
    /// `skip_col` is excluded from the result; values that cancel to (numerical) zero are dropped.
    fn merge_rows(
        num: &Tolerances<R>,
        base: &[(usize, R)],
        addition: &[(usize, R)],
        scale: &R,
        skip_col: Option<usize>,
    ) -> Vec<(usize, R)> {
        let mut merged = Vec::with_capacity(base.len() + addition.len());
        let mut base_iter = base.iter().peekable();
        let mut addition_iter = addition.iter().peekable();

        loop {
            let take_base = match (base_iter.peek(), addition_iter.peek()) {
                (None, None) => break,
                (Some(_), None) => Some(true),
                (None, Some(_)) => Some(false),
                (Some(&&(base_col, _)), Some(&&(add_col, _))) => {
                    if base_col < add_col {
                        Some(true)
                    } else if add_col < base_col {
                        Some(false)
                    } else {
                        None
                    }
                }
            };

            // Untouched entries of the base row pass through as they are; only combined and
            // added values can cancel to (numerical) zero and are dropped then.
            let (col, value) = match take_base {
                Some(true) => {
                    let (col, value) = base_iter.next().unwrap();
                    if Some(*col) != skip_col {
                        merged.push((*col, value.clone()));
                    }
                    continue;
                }
                Some(false) => {
                    let (col, value) = addition_iter.next().unwrap();
                    (*col, scale.clone() * value.clone())
                }
                None => {
                    let (col, base_value) = base_iter.next().unwrap();
                    let (_, add_value) = addition_iter.next().unwrap();
                    (*col, base_value.clone() + scale.clone() * add_value.clone())
                }
            };

            if Some(col) == skip_col || num.is_zero(&value) {
                continue;
            }
            merged.push((col, value));
        }

        merged
    }

    /// Install a rewritten row, reconciling the column major storage, the sizes, the queues and
    /// the row's activity. Sides must already have been shifted by the caller.
    #[allow(clippy::too_many_arguments)]
    fn replace_row(
        &mut self,
        row: usize,
        merged: Vec<(usize, R)>,
        domains: &VariableDomains<R>,
        activities: &mut [RowActivity<R>],
        changed_activities: &mut Vec<usize>,
        redundant_rows: &mut Vec<usize>,
        singleton_rows: &mut Vec<usize>,
        singleton_cols: &mut Vec<usize>,
        empty_cols: &mut Vec<usize>,
        nrounds: i64,
    ) {
        let old = std::mem::take(&mut self.rows[row]);

        // Reconcile the column major storage by walking both sorted column lists.
        let mut old_iter = old.iter().peekable();
        let mut new_iter = merged.iter().peekable();
        loop {
            enum Source {
                OldOnly,
                NewOnly,
                Both,
            }
            let source = match (old_iter.peek(), new_iter.peek()) {
                (None, None) => break,
                (Some(_), None) => Source::OldOnly,
                (None, Some(_)) => Source::NewOnly,
                (Some(&&(old_col, _)), Some(&&(new_col, _))) => {
                    if old_col < new_col {
                        Source::OldOnly
                    } else if new_col < old_col {
                        Source::NewOnly
                    } else {
                        Source::Both
                    }
                }
            };

            match source {
                Source::OldOnly => {
                    let (col, _) = old_iter.next().unwrap();
                    self.remove_col_entry(*col, row);
                    self.col_sizes[*col] -= 1;
                    match self.col_sizes[*col] {
                        0 => empty_cols.push(*col),
                        1 => singleton_cols.push(*col),
                        _ => (),
                    }
                }
                Source::NewOnly => {
                    let (col, value) = new_iter.next().unwrap();
                    let position = self.cols[*col]
                        .binary_search_by_key(&row, |&(index, _)| index)
                        .expect_err("storage orders should be consistent");
                    self.cols[*col].insert(position, (row, value.clone()));
                    self.col_sizes[*col] += 1;
                }
                Source::Both => {
                    let (col, value) = new_iter.next().unwrap();
                    old_iter.next();
                    let position = self.cols[*col]
                        .binary_search_by_key(&row, |&(index, _)| index)
                        .expect("storage orders should be consistent");
                    self.cols[*col][position].1 = value.clone();
                }
            }
        }
        self.rows[row] = merged;

        self.row_sizes[row] = self.rows[row].len() as i32;
        match self.row_sizes[row] {
            0 => {
                // The row cancelled away entirely. When its (shifted) sides admit the zero
                // activity it is plain redundant; otherwise it stays, and the activity check will
                // report the infeasibility.
                let lhs_gone = self.row_flags[row].test(RowFlags::LHS_INF)
                    || self.lhs[row] == R::zero();
                let rhs_gone = self.row_flags[row].test(RowFlags::RHS_INF)
                    || self.rhs[row] == R::zero();
                if lhs_gone && rhs_gone {
                    self.row_flags[row].set(RowFlags::REDUNDANT);
                    self.row_flags[row].unset(RowFlags::EQUATION);
                    self.row_sizes[row] = -1;
                    self.lhs[row] = R::zero();
                    self.rhs[row] = R::zero();
                    redundant_rows.push(row);
                }
            }
            1 => singleton_rows.push(row),
            _ => (),
        }

        let previous_round = activities[row].last_change;
        activities[row] = compute_row_activity(&self.rows[row], domains);
        activities[row].last_change = previous_round;
        if !self.row_flags[row].test(RowFlags::REDUNDANT) && previous_round != nrounds {
            activities[row].last_change = nrounds;
            changed_activities.push(row);
        }
    }

    fn remove_col_entry(&mut self, col: usize, row: usize) {
        let position = self.cols[col]
            .binary_search_by_key(&row, |&(index, _)| index)
            .expect("storage orders should be consistent");
        self.cols[col].remove(position);
    }

    fn count_overlap(row: &[(usize, R)], eq_entries: &[(usize, R)], skip_col: usize) -> usize {
        let mut overlap = 0;
        let mut row_iter = row.iter().peekable();
        let mut eq_iter = eq_entries.iter().peekable();
        while let (Some(&&(row_col, _)), Some(&&(eq_col, _))) = (row_iter.peek(), eq_iter.peek()) {
            if row_col < eq_col {
                row_iter.next();
            } else if eq_col < row_col {
                eq_iter.next();
            } else {
                if row_col != skip_col {
                    overlap += 1;
                }
                row_iter.next();
                eq_iter.next();
            }
        }

        overlap
    }
}

#[cfg(test)]
mod test;
