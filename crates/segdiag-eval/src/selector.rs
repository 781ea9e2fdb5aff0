//! Bounded selection of the K lowest-scoring cases.

use std::{cmp::Ordering, collections::BinaryHeap, num::NonZeroUsize};

use crate::error::{EvalError, EvalResult};

/// A scored item together with its position in the original dataset order.
#[derive(Debug, Clone)]
pub struct Ranked<T> {
    pub score: f64,
    pub index: usize,
    pub item: T,
}

impl<T> Ranked<T> {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.index.cmp(&other.index))
    }
}

impl<T> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Ranked<T> {}

impl<T> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_cmp(other)
    }
}

/// Keeps the `capacity` lowest `(score, index)` keys seen so far.
///
/// Memory is O(capacity) no matter how many items are offered. Because the index breaks
/// ties, the retained set depends only on the offered keys, never on offer order, so
/// selectors filled by different workers can be merged into the same result a single
/// pass would produce.
#[derive(Debug, Clone)]
pub struct WorstCaseSelector<T> {
    capacity: usize,
    // Max-heap: the top is the best-scoring retained item, the first to be evicted.
    retained: BinaryHeap<Ranked<T>>,
}

impl<T> WorstCaseSelector<T> {
    pub fn new(capacity: usize) -> EvalResult<Self> {
        NonZeroUsize::new(capacity)
            .map(Self::with_capacity)
            .ok_or_else(|| EvalError::InvalidConfiguration {
                reason: "worst-case count must be at least 1".to_string(),
            })
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            capacity,
            retained: BinaryHeap::with_capacity(capacity + 1),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.retained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retained.is_empty()
    }

    /// Whether an item with this key would currently be retained.
    pub fn accepts(&self, score: f64, index: usize) -> bool {
        if self.retained.len() < self.capacity {
            return true;
        }
        self.retained.peek().is_some_and(|top| {
            score
                .total_cmp(&top.score)
                .then(index.cmp(&top.index))
                .is_lt()
        })
    }

    /// Offers an item; returns whether it was retained.
    pub fn offer(&mut self, score: f64, index: usize, item: T) -> bool {
        if !self.accepts(score, index) {
            return false;
        }
        self.retained.push(Ranked { score, index, item });
        if self.retained.len() > self.capacity {
            self.retained.pop();
        }
        true
    }

    /// Folds another selector's candidates into this one.
    pub fn merge(&mut self, other: Self) {
        for ranked in other.retained {
            self.offer(ranked.score, ranked.index, ranked.item);
        }
    }

    /// The retained items, ascending by score, ties by index.
    pub fn into_sorted(self) -> Vec<Ranked<T>> {
        self.retained.into_sorted_vec()
    }
}

/// Selects the `k` lowest-scoring items of `items`, each paired with its enumeration index.
pub fn select_worst<T>(
    items: impl IntoIterator<Item = (f64, T)>,
    k: usize,
) -> EvalResult<Vec<Ranked<T>>> {
    let mut selector = WorstCaseSelector::new(k)?;
    for (index, (score, item)) in items.into_iter().enumerate() {
        selector.offer(score, index, item);
    }
    Ok(selector.into_sorted())
}
