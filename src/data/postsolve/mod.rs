//! # Postsolve log
//!
//! Append-only record of the reductions that remove variables from the problem, written in terms
//! of the *original* index space. Replaying the log backwards reconstructs an original-space
//! solution from a reduced-space one; the replay itself is a separate collaborator, this module
//! only guarantees that the log survives index compaction.
use crate::data::compress::compress_data_vector;
use crate::data::elements::BoundDirection;
use crate::data::number_types::Real;

/// A single reconstruction event.
///
/// All indices stored in events refer to the original problem.
#[derive(Clone, Debug, PartialEq)]
pub enum PostsolveEvent<R> {
    /// The column was fixed to a finite value.
    FixedCol { col: usize, value: R },
    /// The column was fixed at an infinite bound; its value must be recovered from the rows it
    /// appeared in. `direction` names the infinite bound (`Lower` for minus infinity), `bound`
    /// the opposite finite bound if one existed, and `column` the column's nonzeros.
    FixedInfCol {
        col: usize,
        direction: BoundDirection,
        bound: R,
        column: Vec<(usize, R)>,
    },
    /// The column was eliminated through the equality `equality . x = rhs`.
    Substitution {
        col: usize,
        equality: Vec<(usize, R)>,
        rhs: R,
    },
    /// `col` was merged into `other` with the given scale; the original bounds and integrality of
    /// both columns are recorded so the merged value can be split again.
    ParallelCols {
        col: usize,
        col_integral: bool,
        col_lower: Option<R>,
        col_upper: Option<R>,
        other: usize,
        other_integral: bool,
        other_lower: Option<R>,
        other_upper: Option<R>,
        scale: R,
    },
}

/// The postsolve notification log.
///
/// Engine callers notify with indices of the *current* (possibly compacted) problem; the log
/// translates them through its original-index mappings before recording, and the mappings are
/// compacted in lockstep with the problem.
#[derive(Clone, Debug)]
pub struct Postsolve<R> {
    events: Vec<PostsolveEvent<R>>,
    orig_col_mapping: Vec<usize>,
    orig_row_mapping: Vec<usize>,
    orig_ncols: usize,
    orig_nrows: usize,
}

impl<R: Real> Postsolve<R> {
    pub fn new(ncols: usize, nrows: usize) -> Self {
        Self {
            events: Vec::new(),
            orig_col_mapping: (0..ncols).collect(),
            orig_row_mapping: (0..nrows).collect(),
            orig_ncols: ncols,
            orig_nrows: nrows,
        }
    }

    pub fn events(&self) -> &[PostsolveEvent<R>] {
        &self.events
    }

    pub fn orig_ncols(&self) -> usize {
        self.orig_ncols
    }

    pub fn orig_nrows(&self) -> usize {
        self.orig_nrows
    }

    /// Original index of a column of the current problem.
    pub fn orig_col(&self, col: usize) -> usize {
        self.orig_col_mapping[col]
    }

    /// Original index of a row of the current problem.
    pub fn orig_row(&self, row: usize) -> usize {
        self.orig_row_mapping[row]
    }

    pub fn notify_fixed_col(&mut self, col: usize, value: R) {
        let col = self.orig_col_mapping[col];
        self.events.push(PostsolveEvent::FixedCol { col, value });
    }

    pub fn notify_fixed_inf_col(
        &mut self,
        col: usize,
        direction: BoundDirection,
        bound: R,
        column: &[(usize, R)],
    ) {
        let column = column
            .iter()
            .map(|(row, value)| (self.orig_row_mapping[*row], value.clone()))
            .collect();
        let col = self.orig_col_mapping[col];
        self.events.push(PostsolveEvent::FixedInfCol {
            col,
            direction,
            bound,
            column,
        });
    }

    pub fn notify_substitution(&mut self, col: usize, equality: &[(usize, R)], rhs: R) {
        debug_assert!(equality.iter().any(|&(index, _)| index == col));

        let equality = equality
            .iter()
            .map(|(index, value)| (self.orig_col_mapping[*index], value.clone()))
            .collect();
        let col = self.orig_col_mapping[col];
        self.events.push(PostsolveEvent::Substitution { col, equality, rhs });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn notify_parallel_cols(
        &mut self,
        col: usize,
        col_integral: bool,
        col_lower: Option<R>,
        col_upper: Option<R>,
        other: usize,
        other_integral: bool,
        other_lower: Option<R>,
        other_upper: Option<R>,
        scale: R,
    ) {
        self.events.push(PostsolveEvent::ParallelCols {
            col: self.orig_col_mapping[col],
            col_integral,
            col_lower,
            col_upper,
            other: self.orig_col_mapping[other],
            other_integral,
            other_lower,
            other_upper,
            scale,
        });
    }

    /// Renumber the current-index mappings after the problem was compacted.
    pub fn compress(
        &mut self,
        row_mapping: &[Option<usize>],
        col_mapping: &[Option<usize>],
        full: bool,
    ) {
        compress_data_vector(row_mapping, &mut self.orig_row_mapping);
        compress_data_vector(col_mapping, &mut self.orig_col_mapping);

        if full {
            self.orig_row_mapping.shrink_to_fit();
            self.orig_col_mapping.shrink_to_fit();
        }
    }
}

#[cfg(test)]
mod test {
    use crate::data::postsolve::{Postsolve, PostsolveEvent};

    #[test]
    fn notifications_use_original_indices() {
        let mut postsolve = Postsolve::new(5, 3);

        // Compact away column 1 and row 0.
        let col_mapping = vec![Some(0), None, Some(1), Some(2), Some(3)];
        let row_mapping = vec![None, Some(0), Some(1)];
        postsolve.compress(&row_mapping, &col_mapping, false);

        assert_eq!(postsolve.orig_col(1), 2);
        assert_eq!(postsolve.orig_row(0), 1);

        postsolve.notify_fixed_col(1, 7.5);
        assert_eq!(
            postsolve.events(),
            &[PostsolveEvent::FixedCol { col: 2, value: 7.5 }],
        );

        postsolve.notify_substitution(2, &[(0, 1.0), (2, -2.0)], 4.0);
        match &postsolve.events()[1] {
            PostsolveEvent::Substitution { col, equality, rhs } => {
                assert_eq!(*col, 3);
                assert_eq!(equality, &[(0, 1.0), (3, -2.0)]);
                assert_eq!(*rhs, 4.0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
