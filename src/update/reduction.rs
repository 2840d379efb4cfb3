//! # Reductions
//!
//! The primitive mutations a presolve method can propose. A transaction is an ordered slice of
//! these; the engine applies it atomically with respect to conflict checking. The variants form a
//! tagged encoding: each carries exactly the data its application needs, and matching on them is
//! exhaustive.
use crate::data::number_types::Real;

/// Operations on a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColReduction<R> {
    /// Assert that the column is unmodified when the transaction is applied.
    Locked { col: usize },
    /// Like `Locked`, and additionally protect the column from modification for the rest of the
    /// round.
    LockedStrong { col: usize },
    /// Assert that the column's bounds are unmodified when the transaction is applied.
    BoundsLocked { col: usize },
    /// Replace the objective coefficient.
    Objective { col: usize, value: R },
    /// Fix the column to a finite value.
    Fixed { col: usize, value: R },
    /// Fix an unbounded column at the infinite bound whose sign matches `sign`; its contribution
    /// is then zero in every remaining row.
    FixedInfinity { col: usize, sign: R },
    LowerBound { col: usize, value: R },
    UpperBound { col: usize, value: R },
    /// Mark the column implied integral and round its bounds.
    ImplInt { col: usize },
    /// Eliminate the column from the whole matrix through the equation `row`.
    Substitute { col: usize, row: usize },
    /// Eliminate the column from the objective only; the equation `row` is kept for
    /// reconstruction.
    SubstituteObj { col: usize, row: usize },
    /// Merge the column into `other`, which has a parallel nonzero pattern.
    Parallel { col: usize, other: usize },
    /// Replace `col` by `factor * other + offset`.
    Replace {
        col: usize,
        factor: R,
        other: usize,
        offset: R,
    },
}

/// Operations on a single row.
#[derive(Clone, Debug, PartialEq)]
pub enum RowReduction<R> {
    /// Assert that the row is unmodified when the transaction is applied.
    Locked { row: usize },
    /// Like `Locked`, and additionally protect the row from modification for the rest of the
    /// round.
    LockedStrong { row: usize },
    Lhs { row: usize, value: R },
    Rhs { row: usize, value: R },
    /// Relax the left-hand side to minus infinity.
    LhsInf { row: usize },
    /// Relax the right-hand side to plus infinity.
    RhsInf { row: usize },
    Redundant { row: usize },
    /// Add `scale * row` (an equation) to each candidate row to cancel nonzeros.
    Sparsify {
        row: usize,
        candidates: Vec<(usize, R)>,
    },
}

/// A single primitive reduction.
#[derive(Clone, Debug, PartialEq)]
pub enum Reduction<R> {
    /// Change the coefficient at `(row, col)` to `value`.
    CoefChange { row: usize, col: usize, value: R },
    Col(ColReduction<R>),
    Row(RowReduction<R>),
}

impl<R: Real> Reduction<R> {
    pub fn coef_change(row: usize, col: usize, value: R) -> Self {
        Self::CoefChange { row, col, value }
    }
}

impl<R> From<ColReduction<R>> for Reduction<R> {
    fn from(reduction: ColReduction<R>) -> Self {
        Self::Col(reduction)
    }
}

impl<R> From<RowReduction<R>> for Reduction<R> {
    fn from(reduction: RowReduction<R>) -> Self {
        Self::Row(reduction)
    }
}
