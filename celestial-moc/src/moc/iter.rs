use crate::cell::Cell;
use crate::constants::N_ORDERS;
use crate::ranges::RangeSet;
use std::borrow::Cow;
use std::ops::Range;

/// Stored cells in ascending order, then ascending pixel.
#[derive(Debug, Clone)]
pub struct CellIter<'a> {
    levels: Cow<'a, [RangeSet; N_ORDERS]>,
    order: usize,
    range: usize,
    next: Option<Range<u64>>,
}

impl<'a> CellIter<'a> {
    pub(crate) fn new(levels: Cow<'a, [RangeSet; N_ORDERS]>) -> Self {
        Self {
            levels,
            order: 0,
            range: 0,
            next: None,
        }
    }
}

impl Iterator for CellIter<'_> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        loop {
            if let Some(current) = self.next.as_mut() {
                if let Some(npix) = current.next() {
                    return Some(Cell::new_unchecked(self.order as u8, npix));
                }
                self.next = None;
                self.range += 1;
            }
            let level = self.levels.get(self.order)?;
            match level.as_slice().get(self.range) {
                Some(range) => self.next = Some(range.clone()),
                None => {
                    self.order += 1;
                    self.range = 0;
                }
            }
        }
    }
}

/// Pixel indices at a single order, ascending.
#[derive(Debug, Clone)]
pub struct PixelIter {
    ranges: Vec<Range<u64>>,
    index: usize,
}

impl PixelIter {
    pub(crate) fn new(ranges: RangeSet) -> Self {
        Self {
            ranges: ranges.as_slice().to_vec(),
            index: 0,
        }
    }
}

impl Iterator for PixelIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while let Some(range) = self.ranges.get_mut(self.index) {
            if let Some(npix) = range.next() {
                return Some(npix);
            }
            self.index += 1;
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining: u64 = self.ranges[self.index.min(self.ranges.len())..]
            .iter()
            .map(|r| r.end - r.start)
            .sum();
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_iter_skips_empty_orders() {
        let mut levels: [RangeSet; N_ORDERS] = std::array::from_fn(|_| RangeSet::new());
        levels[2] = RangeSet::from_ranges([1..3]);
        levels[7] = RangeSet::from_ranges([5..6, 9..10]);
        let cells: Vec<(u8, u64)> = CellIter::new(Cow::Borrowed(&levels)).map(|c| (c.order, c.npix)).collect();
        assert_eq!(cells, vec![(2, 1), (2, 2), (7, 5), (7, 9)]);
    }

    #[test]
    fn test_cell_iter_empty() {
        let levels: [RangeSet; N_ORDERS] = std::array::from_fn(|_| RangeSet::new());
        assert_eq!(CellIter::new(Cow::Owned(levels)).count(), 0);
    }

    #[test]
    fn test_pixel_iter() {
        let iter = PixelIter::new(RangeSet::from_ranges([0..2, 10..12]));
        assert_eq!(iter.size_hint(), (4, Some(4)));
        assert_eq!(iter.collect::<Vec<_>>(), vec![0, 1, 10, 11]);
    }
}
