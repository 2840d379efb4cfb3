//! # Matrix buffer
//!
//! Coefficient changes proposed by reductions are not applied to the constraint matrix one by
//! one. They are staged in this buffer and replayed in bulk when the engine flushes, so that the
//! two storage orders of the matrix are touched once per flush instead of once per change.
use crate::data::number_types::Real;

/// A single staged coefficient edit.
#[derive(Clone, Debug)]
pub struct BufferEntry<R> {
    pub row: usize,
    pub col: usize,
    pub value: R,
}

/// Pending sparse coefficient edits, in insertion order.
///
/// The same position may be staged more than once within a round; the last staged value wins.
#[derive(Clone, Debug)]
pub struct MatrixBuffer<R> {
    entries: Vec<BufferEntry<R>>,
}

impl<R: Real> Default for MatrixBuffer<R> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<R: Real> MatrixBuffer<R> {
    pub fn add_entry(&mut self, row: usize, col: usize, value: R) {
        self.entries.push(BufferEntry { row, col, value });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drain the staged edits, ordered row major and deduplicated.
    ///
    /// When a position was staged repeatedly, only the latest value is returned.
    pub(crate) fn take_sorted(&mut self) -> Vec<BufferEntry<R>> {
        let mut entries = std::mem::take(&mut self.entries);
        // The sort is stable, so within a (row, col) run the insertion order survives and the
        // last entry of each run is the most recent edit.
        entries.sort_by_key(|entry| (entry.row, entry.col));

        let mut deduplicated: Vec<BufferEntry<R>> = Vec::with_capacity(entries.len());
        for entry in entries {
            match deduplicated.last_mut() {
                Some(last) if last.row == entry.row && last.col == entry.col => *last = entry,
                _ => deduplicated.push(entry),
            }
        }

        deduplicated
    }
}

#[cfg(test)]
mod test {
    use super::MatrixBuffer;

    #[test]
    fn last_staged_value_wins() {
        let mut buffer = MatrixBuffer::default();
        buffer.add_entry(1, 2, 5.0);
        buffer.add_entry(0, 1, 3.0);
        buffer.add_entry(1, 2, 7.0);

        let entries = buffer.take_sorted();
        assert!(buffer.is_empty());
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].row, entries[0].col, entries[0].value), (0, 1, 3.0));
        assert_eq!((entries[1].row, entries[1].col, entries[1].value), (1, 2, 7.0));
    }
}
