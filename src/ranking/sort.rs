//! Non-dominated sorting.
//!
//! Partitions items into ranks: rank 0 holds every item no other item
//! dominates, rank 1 the items dominated only by rank 0, and so on.
//!
//! # Algorithm (Deb et al., 2002)
//!
//! 1. For each pair of items, determine dominance once
//! 2. Items with a domination count of zero form the next front
//! 3. Remove that front, decrement the counts it contributed, repeat
//!
//! Fronts keep insertion order. When the relation is not a strict partial
//! order (a cycle leaves no item with a zero count), the items with the
//! smallest remaining count form the next front, so sorting always
//! terminates.
//!
//! # Complexity
//!
//! O(m * n²) where m = number of objectives, n = number of items
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"

use super::dominance::{Dominance, DominanceRelation};

/// Result of non-dominated sorting.
///
/// Each element of `ranks` corresponds to the rank of the item at the same
/// index. Rank 0 is the Pareto front.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NondominatedSortResult {
    /// Rank of each item (0 = front).
    pub ranks: Vec<usize>,

    /// Indices grouped by front, each in ascending index order.
    pub fronts: Vec<Vec<usize>>,
}

/// Sorts `n` items under an arbitrary pairwise relation.
///
/// `compare(i, j)` returns the dominance of item `i` relative to item `j`
/// and is called once per unordered pair with `i < j`.
pub fn sort_by_relation<F>(n: usize, mut compare: F) -> NondominatedSortResult
where
    F: FnMut(usize, usize) -> Dominance,
{
    let mut domination_count = vec![0usize; n];
    let mut dominates: Vec<Vec<usize>> = vec![Vec::new(); n];

    for i in 0..n {
        for j in (i + 1)..n {
            match compare(i, j) {
                Dominance::Dominates => {
                    dominates[i].push(j);
                    domination_count[j] += 1;
                }
                Dominance::Dominated => {
                    dominates[j].push(i);
                    domination_count[i] += 1;
                }
                Dominance::Incomparable => {}
            }
        }
    }

    let mut ranks = vec![0usize; n];
    let mut assigned = vec![false; n];
    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut remaining = n;

    while remaining > 0 {
        let threshold = (0..n)
            .filter(|&i| !assigned[i])
            .map(|i| domination_count[i])
            .min()
            .unwrap_or(0);

        let front: Vec<usize> = (0..n)
            .filter(|&i| !assigned[i] && domination_count[i] == threshold)
            .collect();

        for &i in &front {
            assigned[i] = true;
            ranks[i] = fronts.len();
        }
        for &i in &front {
            for &j in &dominates[i] {
                if !assigned[j] {
                    domination_count[j] = domination_count[j].saturating_sub(1);
                }
            }
        }

        remaining -= front.len();
        fronts.push(front);
    }

    NondominatedSortResult { ranks, fronts }
}

/// Non-dominated sorting of objective vectors under weak dominance.
///
/// All objectives are **minimized**.
///
/// # Example
///
/// ```
/// use u_moea::ranking::non_dominated_sort;
///
/// let objectives = vec![
///     vec![1.0, 5.0],  // Solution A
///     vec![3.0, 3.0],  // Solution B
///     vec![5.0, 1.0],  // Solution C
///     vec![4.0, 4.0],  // Solution D: dominated by B
/// ];
///
/// let result = non_dominated_sort(&objectives);
///
/// assert_eq!(result.ranks, vec![0, 0, 0, 1]);
/// assert_eq!(result.fronts, vec![vec![0, 1, 2], vec![3]]);
/// ```
pub fn non_dominated_sort(objectives: &[Vec<f64>]) -> NondominatedSortResult {
    non_dominated_sort_with(objectives, DominanceRelation::Weak)
}

/// Non-dominated sorting under the chosen relation.
pub fn non_dominated_sort_with(
    objectives: &[Vec<f64>],
    relation: DominanceRelation,
) -> NondominatedSortResult {
    sort_by_relation(objectives.len(), |i, j| {
        relation.compare(&objectives[i], &objectives[j])
    })
}

/// Indices of the items no other item dominates, in index order.
pub fn non_dominated_set(objectives: &[Vec<f64>], relation: DominanceRelation) -> Vec<usize> {
    (0..objectives.len())
        .filter(|&i| {
            objectives
                .iter()
                .enumerate()
                .all(|(j, o)| i == j || relation.compare(o, &objectives[i]) != Dominance::Dominates)
        })
        .collect()
}

/// Number of items that dominate each item.
pub fn dominance_count(objectives: &[Vec<f64>], relation: DominanceRelation) -> Vec<usize> {
    (0..objectives.len())
        .map(|i| {
            objectives
                .iter()
                .enumerate()
                .filter(|(j, o)| *j != i && relation.compare(o, &objectives[i]) == Dominance::Dominates)
                .count()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::dominance::weak_dominance;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        let r = non_dominated_sort(&[]);
        assert!(r.ranks.is_empty());
        assert!(r.fronts.is_empty());
    }

    #[test]
    fn test_single_item() {
        let r = non_dominated_sort(&[vec![1.0, 2.0]]);
        assert_eq!(r.ranks, vec![0]);
        assert_eq!(r.fronts, vec![vec![0]]);
    }

    #[test]
    fn test_three_fronts() {
        let objectives = vec![
            vec![3.0, 3.0],
            vec![1.0, 1.0],
            vec![2.0, 2.0],
            vec![1.5, 0.5],
        ];
        let r = non_dominated_sort(&objectives);
        assert_eq!(r.fronts, vec![vec![1, 3], vec![2], vec![0]]);
        assert_eq!(r.ranks, vec![2, 0, 1, 0]);
    }

    #[test]
    fn test_duplicates_share_a_rank() {
        let objectives = vec![vec![1.0, 1.0], vec![1.0, 1.0], vec![2.0, 2.0]];
        let r = non_dominated_sort(&objectives);
        assert_eq!(r.fronts, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_strong_relation_keeps_ties_together() {
        let objectives = vec![vec![1.0, 2.0], vec![1.0, 3.0]];
        let weak = non_dominated_sort_with(&objectives, DominanceRelation::Weak);
        let strong = non_dominated_sort_with(&objectives, DominanceRelation::Strong);
        assert_eq!(weak.fronts.len(), 2);
        assert_eq!(strong.fronts, vec![vec![0, 1]]);
    }

    #[test]
    fn test_cyclic_relation_terminates() {
        // 0 > 1 > 2 > 0
        let r = sort_by_relation(3, |i, j| match (i, j) {
            (0, 1) | (1, 2) => Dominance::Dominates,
            (0, 2) => Dominance::Dominated,
            _ => Dominance::Incomparable,
        });
        assert_eq!(r.fronts.iter().map(Vec::len).sum::<usize>(), 3);
        assert_eq!(r.fronts[0], vec![0, 1, 2]);
    }

    #[test]
    fn test_non_dominated_set_and_counts() {
        let objectives = vec![vec![1.0, 4.0], vec![2.0, 2.0], vec![3.0, 3.0]];
        assert_eq!(
            non_dominated_set(&objectives, DominanceRelation::Weak),
            vec![0, 1]
        );
        assert_eq!(
            dominance_count(&objectives, DominanceRelation::Weak),
            vec![0, 0, 1]
        );
    }

    fn population() -> impl Strategy<Value = Vec<Vec<f64>>> {
        prop::collection::vec(
            prop::collection::vec((0i32..6).prop_map(f64::from), 2),
            1..25,
        )
    }

    proptest! {
        #[test]
        fn prop_front_invariant(objectives in population()) {
            let r = non_dominated_sort(&objectives);
            for (rank, front) in r.fronts.iter().enumerate() {
                // nothing in a front dominates another member of it
                for &i in front {
                    for &j in front {
                        prop_assert_ne!(
                            weak_dominance(&objectives[i], &objectives[j]),
                            Dominance::Dominates
                        );
                    }
                }
                // every later item is dominated by something in this front or an earlier one
                if rank > 0 {
                    for &j in front {
                        let covered = r.fronts[rank - 1].iter().any(|&i| {
                            weak_dominance(&objectives[i], &objectives[j]) == Dominance::Dominates
                        });
                        prop_assert!(covered);
                    }
                }
            }
        }

        #[test]
        fn prop_every_item_ranked_once(objectives in population()) {
            let r = non_dominated_sort(&objectives);
            let mut all: Vec<usize> = r.fronts.concat();
            all.sort_unstable();
            prop_assert_eq!(all, (0..objectives.len()).collect::<Vec<_>>());
        }

        #[test]
        fn prop_rank_as_cost_reproduces_fronts(objectives in population()) {
            let first = non_dominated_sort(&objectives);
            let costs: Vec<Vec<f64>> = first.ranks.iter().map(|&r| vec![r as f64]).collect();
            let second = non_dominated_sort(&costs);
            prop_assert_eq!(first.fronts, second.fronts);
        }
    }
}
