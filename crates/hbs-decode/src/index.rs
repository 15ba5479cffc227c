//! Interval stabbing index.
//!
//! The boundaries of all indexed intervals split the integer line into
//! elementary segments; each segment records which entries cover it. A
//! lookup is a binary search for the segment holding the point.

use hbs_model::IntervalSet;

#[derive(Debug, Clone, Default)]
pub struct IntervalIndex {
    bounds: Vec<i64>,
    /// `segments[i]` covers `[bounds[i], bounds[i + 1])`.
    segments: Vec<Vec<usize>>,
}

impl IntervalIndex {
    /// Indexes `(entry, set)` pairs; lookups return the entry numbers.
    pub fn build<'a>(entries: impl IntoIterator<Item = (usize, &'a IntervalSet)>) -> Self {
        let entries: Vec<(usize, &IntervalSet)> = entries.into_iter().collect();

        let mut bounds: Vec<i64> = entries
            .iter()
            .flat_map(|(_, set)| set.iter().flat_map(|iv| [iv.start, iv.end]))
            .collect();
        bounds.sort_unstable();
        bounds.dedup();

        let mut segments = vec![Vec::new(); bounds.len().saturating_sub(1)];
        for (entry, set) in entries {
            for interval in set.iter() {
                let first = bounds.partition_point(|b| *b < interval.start);
                let last = bounds.partition_point(|b| *b < interval.end);
                for segment in &mut segments[first..last] {
                    segment.push(entry);
                }
            }
        }
        Self { bounds, segments }
    }

    /// Entries whose set contains `point`, in insertion order.
    pub fn lookup(&self, point: i64) -> &[usize] {
        let idx = self.bounds.partition_point(|b| *b <= point);
        if idx == 0 || idx >= self.bounds.len() {
            return &[];
        }
        &self.segments[idx - 1]
    }

    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(Vec::is_empty)
    }
}
