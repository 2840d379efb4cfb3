//! # Compression helpers
//!
//! When enough rows or columns have been eliminated, storage is compacted and all surviving
//! indices are renumbered. A mapping assigns each old index its new index, or `None` when the
//! entry was deleted. Two kinds of vectors have to follow such a renumbering: vectors _indexed by_
//! old indices (data vectors, kept position-wise) and vectors _containing_ old indices (index
//! sets, remapped element-wise).

/// Compact a vector that is indexed by the old indices.
///
/// Entries of deleted indices are dropped; surviving entries keep their relative order and end up
/// at their new index.
pub fn compress_data_vector<T>(mapping: &[Option<usize>], vector: &mut Vec<T>) {
    debug_assert_eq!(mapping.len(), vector.len());

    let mut index = 0;
    vector.retain(|_| {
        let keep = mapping[index].is_some();
        index += 1;
        keep
    });
}

/// Remap a vector whose elements are old indices.
///
/// Elements referring to deleted indices are dropped, the others are replaced by their new index.
pub fn compress_index_vector(mapping: &[Option<usize>], vector: &mut Vec<usize>) {
    let mut kept = 0;
    for read in 0..vector.len() {
        debug_assert!(vector[read] < mapping.len());

        if let Some(new_index) = mapping[vector[read]] {
            vector[kept] = new_index;
            kept += 1;
        }
    }
    vector.truncate(kept);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn data_vector() {
        let mapping = vec![Some(0), None, Some(1), None, Some(2)];
        let mut values = vec!["a", "b", "c", "d", "e"];
        compress_data_vector(&mapping, &mut values);
        assert_eq!(values, vec!["a", "c", "e"]);
    }

    #[test]
    fn index_vector() {
        let mapping = vec![Some(0), None, Some(1), None, Some(2)];
        let mut indices = vec![4, 1, 0, 3, 2];
        compress_index_vector(&mapping, &mut indices);
        assert_eq!(indices, vec![2, 0, 1]);
    }
}
