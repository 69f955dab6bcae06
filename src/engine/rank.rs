//! Dense ranking of raw metric values.
//!
//! Metrics with incompatible scales are only ever combined through their
//! ranks, so every signal in the engine passes through [`dense_ranks`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Which end of a metric's scale is the bad one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDirection {
    /// Larger values are worse (WMC, ATFD, commit count, recency)
    HigherIsWorse,
    /// Smaller values are worse (TCC, rank sums)
    LowerIsWorse,
}

impl RankDirection {
    fn worst_first(self, a: f64, b: f64) -> Ordering {
        match self {
            Self::HigherIsWorse => b.total_cmp(&a),
            Self::LowerIsWorse => a.total_cmp(&b),
        }
    }
}

/// Assign dense ranks: the worst value gets 1, ties share a rank and the next
/// distinct value gets the next integer.
///
/// Entries are ordered by value and then by key, so the result never depends on
/// input order. The key only stabilizes iteration; it never splits a tie.
pub fn dense_ranks<K, I>(entries: I, direction: RankDirection) -> BTreeMap<K, u32>
where
    K: Ord,
    I: IntoIterator<Item = (K, f64)>,
{
    let mut sorted: Vec<(K, f64)> = entries.into_iter().collect();
    sorted.sort_by(|(ka, va), (kb, vb)| direction.worst_first(*va, *vb).then_with(|| ka.cmp(kb)));

    let mut ranks = BTreeMap::new();
    let mut rank = 0u32;
    let mut previous: Option<f64> = None;
    for (key, value) in sorted {
        if previous.is_none_or(|p| p.total_cmp(&value) != Ordering::Equal) {
            rank += 1;
            previous = Some(value);
        }
        ranks.insert(key, rank);
    }
    ranks
}

/// Largest rank in a rank map, or 0 when empty.
pub fn max_rank<K>(ranks: &BTreeMap<K, u32>) -> u32 {
    ranks.values().copied().max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranks_of(values: &[(&'static str, f64)], direction: RankDirection) -> Vec<u32> {
        let ranks = dense_ranks(values.iter().copied(), direction);
        values.iter().map(|(k, _)| ranks[k]).collect()
    }

    #[test]
    fn test_higher_is_worse() {
        let r = ranks_of(&[("a", 10.0), ("b", 50.0), ("c", 30.0)], RankDirection::HigherIsWorse);
        assert_eq!(r, vec![3, 1, 2]);
    }

    #[test]
    fn test_lower_is_worse() {
        let r = ranks_of(&[("a", 0.9), ("b", 0.1), ("c", 0.5)], RankDirection::LowerIsWorse);
        assert_eq!(r, vec![3, 1, 2]);
    }

    #[test]
    fn test_ties_share_rank_without_gaps() {
        let r = ranks_of(
            &[("a", 5.0), ("b", 9.0), ("c", 9.0), ("d", 1.0)],
            RankDirection::HigherIsWorse,
        );
        assert_eq!(r, vec![2, 1, 1, 3]);
    }

    #[test]
    fn test_empty_input() {
        let ranks: BTreeMap<&str, u32> = dense_ranks(Vec::new(), RankDirection::HigherIsWorse);
        assert!(ranks.is_empty());
        assert_eq!(max_rank(&ranks), 0);
    }

    #[test]
    fn test_all_equal_values() {
        let r = ranks_of(&[("x", 2.0), ("y", 2.0), ("z", 2.0)], RankDirection::LowerIsWorse);
        assert_eq!(r, vec![1, 1, 1]);
    }

    proptest! {
        /// Property: ranks never depend on the order entries arrive in.
        #[test]
        fn ranks_are_order_independent(
            values in prop::collection::vec(0u32..20, 0..40),
            rotation in 0usize..40,
        ) {
            let entries: Vec<(usize, f64)> =
                values.iter().enumerate().map(|(i, v)| (i, f64::from(*v))).collect();
            let mut shuffled = entries.clone();
            shuffled.reverse();
            if !shuffled.is_empty() {
                let len = shuffled.len();
                shuffled.rotate_left(rotation % len);
            }

            let a = dense_ranks(entries, RankDirection::HigherIsWorse);
            let b = dense_ranks(shuffled, RankDirection::HigherIsWorse);
            prop_assert_eq!(a, b);
        }

        /// Property: ranks are exactly {1..k} where k is the number of distinct values.
        #[test]
        fn ranks_are_dense(values in prop::collection::vec(0u32..15, 1..50)) {
            let entries: Vec<(usize, f64)> =
                values.iter().enumerate().map(|(i, v)| (i, f64::from(*v))).collect();
            let ranks = dense_ranks(entries, RankDirection::LowerIsWorse);

            let mut distinct = values.clone();
            distinct.sort_unstable();
            distinct.dedup();

            let mut seen: Vec<u32> = ranks.values().copied().collect();
            seen.sort_unstable();
            seen.dedup();
            let expected: Vec<u32> = (1..=distinct.len() as u32).collect();
            prop_assert_eq!(seen, expected);
        }

        /// Property: equal values get equal ranks, and a worse value never gets a larger rank.
        #[test]
        fn ranks_follow_values(values in prop::collection::vec(0u32..10, 2..30)) {
            let entries: Vec<(usize, f64)> =
                values.iter().enumerate().map(|(i, v)| (i, f64::from(*v))).collect();
            let ranks = dense_ranks(entries, RankDirection::HigherIsWorse);
            for i in 0..values.len() {
                for j in 0..values.len() {
                    if values[i] == values[j] {
                        prop_assert_eq!(ranks[&i], ranks[&j]);
                    } else if values[i] > values[j] {
                        prop_assert!(ranks[&i] < ranks[&j]);
                    }
                }
            }
        }
    }
}
