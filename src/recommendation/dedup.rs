//! Order-preserving deduplication shared by the online expander and the blender.

use std::collections::HashSet;
use std::hash::Hash;

/// Keep only the first occurrence of each id, preserving order.
pub fn dedup<T, I>(ids: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let iter = ids.into_iter();
    let mut seen = HashSet::with_capacity(iter.size_hint().0);
    let mut unique = Vec::with_capacity(iter.size_hint().0);

    for id in iter {
        if seen.insert(id.clone()) {
            unique.push(id);
        }
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_first_occurrence() {
        assert_eq!(dedup(vec![3, 1, 3, 2, 1, 4]), vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup(Vec::<i64>::new()).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let inputs: Vec<Vec<i64>> = vec![
            vec![],
            vec![7],
            vec![5, 5, 5],
            vec![1, 2, 3],
            vec![9, 8, 9, 7, 8, 6, 9],
        ];

        for input in inputs {
            let once = dedup(input.clone());
            assert_eq!(dedup(once.clone()), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_first_occurrences_keep_relative_order() {
        let input = vec![4, 2, 4, 9, 2, 1];
        let output = dedup(input.clone());

        let first_positions: Vec<usize> = output
            .iter()
            .map(|id| input.iter().position(|x| x == id).unwrap())
            .collect();
        let mut sorted = first_positions.clone();
        sorted.sort_unstable();
        assert_eq!(first_positions, sorted);
    }

    #[test]
    fn test_works_on_borrowed_iterators() {
        let ids = [10_i64, 20, 10];
        assert_eq!(dedup(ids.iter().copied()), vec![10, 20]);
    }
}
