//! Sorted, coalesced sets of half-open `u64` intervals.
//!
//! [`RangeSet`] is the storage unit of a [`Moc`](crate::Moc): one set per
//! order. Ranges are kept sorted, non-overlapping and non-adjacent, so two
//! sets holding the same values are structurally equal.

use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RangeSet {
    ranges: Vec<Range<u64>>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Builds a set from arbitrary, possibly overlapping ranges. Empty ranges
    /// are ignored.
    pub fn from_ranges<I: IntoIterator<Item = Range<u64>>>(ranges: I) -> Self {
        let mut ranges: Vec<Range<u64>> = ranges.into_iter().filter(|r| r.start < r.end).collect();
        ranges.sort_unstable_by_key(|r| r.start);
        Self {
            ranges: coalesce(ranges),
        }
    }

    /// Wraps ranges that are already sorted and coalesced.
    pub(crate) fn from_sorted_unchecked(ranges: Vec<Range<u64>>) -> Self {
        debug_assert!(ranges.iter().all(|r| r.start < r.end));
        debug_assert!(ranges.windows(2).all(|w| w[0].end < w[1].start));
        Self { ranges }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of stored ranges.
    pub fn n_ranges(&self) -> usize {
        self.ranges.len()
    }

    /// Number of values covered by all ranges.
    pub fn count(&self) -> u64 {
        self.ranges.iter().map(|r| r.end - r.start).sum()
    }

    pub fn as_slice(&self) -> &[Range<u64>] {
        &self.ranges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Range<u64>> {
        self.ranges.iter()
    }

    /// Every covered value in ascending order.
    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.ranges.iter().flat_map(|r| r.clone())
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn insert(&mut self, value: u64) {
        self.insert_range(value..value + 1);
    }

    /// Inserts `range`, merging with overlapping or adjacent neighbours.
    pub fn insert_range(&mut self, range: Range<u64>) {
        if range.start >= range.end {
            return;
        }
        // First range that overlaps or touches `range` on the left.
        let lo = self.ranges.partition_point(|r| r.end < range.start);
        // One past the last range that overlaps or touches it on the right.
        let hi = self.ranges.partition_point(|r| r.start <= range.end);

        if lo == hi {
            self.ranges.insert(lo, range);
            return;
        }
        let start = range.start.min(self.ranges[lo].start);
        let end = range.end.max(self.ranges[hi - 1].end);
        self.ranges.splice(lo..hi, std::iter::once(start..end));
    }

    pub fn remove(&mut self, value: u64) {
        self.remove_range(value..value + 1);
    }

    /// Removes every value of `range`, splitting ranges that straddle it.
    pub fn remove_range(&mut self, range: Range<u64>) {
        if range.start >= range.end {
            return;
        }
        let lo = self.ranges.partition_point(|r| r.end <= range.start);
        let hi = self.ranges.partition_point(|r| r.start < range.end);
        if lo == hi {
            return;
        }

        let mut kept = Vec::with_capacity(2);
        let first = &self.ranges[lo];
        if first.start < range.start {
            kept.push(first.start..range.start);
        }
        let last = &self.ranges[hi - 1];
        if last.end > range.end {
            kept.push(range.end..last.end);
        }
        self.ranges.splice(lo..hi, kept);
    }

    pub fn contains(&self, value: u64) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= value);
        self.ranges.get(idx).is_some_and(|r| r.start <= value)
    }

    /// `true` when every value of `range` is covered.
    pub fn contains_range(&self, range: &Range<u64>) -> bool {
        if range.start >= range.end {
            return true;
        }
        let idx = self.ranges.partition_point(|r| r.end <= range.start);
        self.ranges
            .get(idx)
            .is_some_and(|r| r.start <= range.start && range.end <= r.end)
    }

    /// `true` when at least one value of `range` is covered.
    pub fn intersects_range(&self, range: &Range<u64>) -> bool {
        if range.start >= range.end {
            return false;
        }
        let idx = self.ranges.partition_point(|r| r.end <= range.start);
        self.ranges.get(idx).is_some_and(|r| r.start < range.end)
    }

    pub fn intersects(&self, other: &RangeSet) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a, b) = (&self.ranges[i], &other.ranges[j]);
            if a.start < b.end && b.start < a.end {
                return true;
            }
            if a.end <= b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut merged = Vec::with_capacity(self.ranges.len() + other.ranges.len());
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() || j < other.ranges.len() {
            let take_left = match (self.ranges.get(i), other.ranges.get(j)) {
                (Some(a), Some(b)) => a.start <= b.start,
                (Some(_), None) => true,
                _ => false,
            };
            if take_left {
                merged.push(self.ranges[i].clone());
                i += 1;
            } else {
                merged.push(other.ranges[j].clone());
                j += 1;
            }
        }
        RangeSet::from_sorted_unchecked(coalesce(merged))
    }

    pub fn intersection(&self, other: &RangeSet) -> RangeSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a, b) = (&self.ranges[i], &other.ranges[j]);
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if start < end {
                out.push(start..end);
            }
            if a.end <= b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        RangeSet::from_sorted_unchecked(out)
    }

    /// Values of `self` not in `other`.
    pub fn difference(&self, other: &RangeSet) -> RangeSet {
        let mut out = Vec::new();
        let mut j = 0;
        for a in &self.ranges {
            let mut start = a.start;
            while j < other.ranges.len() && other.ranges[j].end <= start {
                j += 1;
            }
            let mut k = j;
            while start < a.end {
                match other.ranges.get(k) {
                    Some(b) if b.start < a.end => {
                        if b.start > start {
                            out.push(start..b.start);
                        }
                        start = start.max(b.end);
                        k += 1;
                    }
                    _ => {
                        out.push(start..a.end);
                        start = a.end;
                    }
                }
            }
        }
        RangeSet::from_sorted_unchecked(out)
    }

    /// Values in exactly one of the two sets.
    pub fn symmetric_difference(&self, other: &RangeSet) -> RangeSet {
        self.union(other).difference(&self.intersection(other))
    }

    /// Complement within `0..limit`.
    pub fn complement(&self, limit: u64) -> RangeSet {
        RangeSet::from_sorted_unchecked(vec![0..limit]).difference(self)
    }

    /// Multiplies every bound by `4^levels`, i.e. maps cells to their
    /// descendants `levels` orders deeper.
    pub fn deepened(&self, levels: u8) -> RangeSet {
        let shift = 2 * levels as u32;
        RangeSet::from_sorted_unchecked(
            self.ranges
                .iter()
                .map(|r| (r.start << shift)..(r.end << shift))
                .collect(),
        )
    }
}

impl FromIterator<u64> for RangeSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        RangeSet::from_ranges(iter.into_iter().map(|v| v..v + 1))
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = &'a Range<u64>;
    type IntoIter = std::slice::Iter<'a, Range<u64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

/// Merges overlapping or adjacent ranges of a list sorted by start.
fn coalesce(sorted: Vec<Range<u64>>) -> Vec<Range<u64>> {
    let mut out: Vec<Range<u64>> = Vec::with_capacity(sorted.len());
    for r in sorted {
        match out.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => out.push(r),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ranges: &[(u64, u64)]) -> RangeSet {
        RangeSet::from_ranges(ranges.iter().map(|&(s, e)| s..e))
    }

    #[test]
    fn test_from_ranges_coalesces() {
        let s = set(&[(5, 7), (0, 2), (2, 3), (6, 9), (20, 20)]);
        assert_eq!(s.as_slice(), &[0..3, 5..9]);
        assert_eq!(s.count(), 7);
        assert_eq!(s.n_ranges(), 2);
    }

    #[test]
    fn test_insert_merges_adjacent() {
        let mut s = RangeSet::new();
        s.insert(3);
        s.insert(5);
        assert_eq!(s.as_slice(), &[3..4, 5..6]);
        s.insert(4);
        assert_eq!(s.as_slice(), &[3..6]);
        s.insert_range(0..1);
        s.insert_range(10..12);
        s.insert_range(1..11);
        assert_eq!(s.as_slice(), &[0..12]);
    }

    #[test]
    fn test_remove_splits() {
        let mut s = set(&[(0, 10), (20, 30)]);
        s.remove(5);
        assert_eq!(s.as_slice(), &[0..5, 6..10, 20..30]);
        s.remove_range(8..25);
        assert_eq!(s.as_slice(), &[0..5, 6..8, 25..30]);
        s.remove_range(0..100);
        assert!(s.is_empty());
    }

    #[test]
    fn test_contains_and_intersects() {
        let s = set(&[(4, 8), (16, 20)]);
        assert!(s.contains(4));
        assert!(!s.contains(8));
        assert!(s.contains_range(&(16..20)));
        assert!(!s.contains_range(&(7..17)));
        assert!(s.intersects_range(&(7..17)));
        assert!(!s.intersects_range(&(8..16)));
        assert!(!s.intersects_range(&(5..5)));
    }

    #[test]
    fn test_set_operations() {
        let a = set(&[(0, 10), (20, 30)]);
        let b = set(&[(5, 25), (40, 45)]);
        assert_eq!(a.union(&b).as_slice(), &[0..30, 40..45]);
        assert_eq!(a.intersection(&b).as_slice(), &[5..10, 20..25]);
        assert_eq!(a.difference(&b).as_slice(), &[0..5, 25..30]);
        assert_eq!(b.difference(&a).as_slice(), &[10..20, 40..45]);
        assert_eq!(
            a.symmetric_difference(&b).as_slice(),
            &[0..5, 10..20, 25..30, 40..45]
        );
        assert!(a.intersects(&b));
        assert!(!a.intersects(&set(&[(10, 20)])));
    }

    #[test]
    fn test_difference_many_holes() {
        let a = set(&[(0, 100)]);
        let b = set(&[(10, 20), (30, 40), (90, 200)]);
        assert_eq!(a.difference(&b).as_slice(), &[0..10, 20..30, 40..90]);
    }

    #[test]
    fn test_complement_and_deepened() {
        let s = set(&[(1, 2), (5, 12)]);
        assert_eq!(s.complement(12).as_slice(), &[0..1, 2..5]);
        assert_eq!(s.deepened(1).as_slice(), &[4..8, 20..48]);
    }

    #[test]
    fn test_values_and_from_iter() {
        let s: RangeSet = [9u64, 3, 4, 1, 3].into_iter().collect();
        assert_eq!(s.as_slice(), &[1..2, 3..5, 9..10]);
        assert_eq!(s.values().collect::<Vec<_>>(), vec![1, 3, 4, 9]);
    }
}
