//! Normalization: limit-order window, strict insertion and `check_and_fix`.
//!
//! Every normalization goes through the same path: the stored cells are
//! mapped to pixel ranges at [`MAX_ORDER`], merged, and decomposed greedily
//! into the coarsest aligned cells not coarser than `min_limit_order`.

use super::Moc;
use crate::cell::Cell;
use crate::config::validate_limits;
use crate::constants::{MAX_ORDER, N_ORDERS};
use crate::errors::MocResult;
use crate::ranges::RangeSet;
use std::ops::Range;
use tracing::{debug, trace};

impl Moc {
    /// Restores the canonical form: folds buffered insertions, applies the
    /// limit-order window, drops cells covered by a stored ancestor and
    /// compacts complete sibling groups.
    ///
    /// Idempotent.
    pub fn check_and_fix(&mut self) {
        let buffered = self.pending.len();
        self.sort();
        let deep = self.windowed_deep();
        self.rebuild_from_deep(&deep);
        self.dirty = false;
        debug!(
            "check_and_fix: folded {} buffered entries, {} cells in window [{}, {}]",
            buffered,
            self.levels.iter().map(RangeSet::count).sum::<u64>(),
            self.min_limit_order,
            self.max_limit_order
        );
    }

    /// Switches between strict (`true`) and relaxed (`false`) insertion.
    /// Turning strict mode back on normalizes immediately.
    pub fn set_check_consistency(&mut self, check: bool) {
        self.check_consistency = check;
        if check {
            self.check_and_fix();
        }
    }

    pub fn set_min_limit_order(&mut self, order: u8) -> MocResult<()> {
        self.set_limit_order(order, self.max_limit_order)
    }

    pub fn set_max_limit_order(&mut self, order: u8) -> MocResult<()> {
        self.set_limit_order(self.min_limit_order, order)
    }

    /// Sets both window bounds and re-derives the stored cells.
    ///
    /// Cells finer than `max` are replaced by their ancestor at `max`, which
    /// may grow the coverage. Cells coarser than `min` are expanded.
    pub fn set_limit_order(&mut self, min: u8, max: u8) -> MocResult<()> {
        validate_limits(min, max)?;
        debug!(
            "limit orders [{}, {}] -> [{}, {}]",
            self.min_limit_order, self.max_limit_order, min, max
        );
        self.min_limit_order = min;
        self.max_limit_order = max;
        self.check_and_fix();
        Ok(())
    }

    /// Incremental strict insertion of a validated cell.
    pub(crate) fn insert_cell_strict(&mut self, cell: Cell) {
        let (min, max) = (self.min_limit_order, self.max_limit_order);
        let cell = if cell.order > max {
            cell.ancestor(max)
        } else {
            cell
        };
        trace!("strict insert {}", cell);

        if cell.order < min {
            for order in min + 1..=MAX_ORDER {
                self.levels[order as usize].remove_range(cell.range_at(order));
            }
            self.levels[min as usize].insert_range(cell.range_at(min));
            return;
        }

        let covered = (0..=cell.order)
            .any(|order| self.levels[order as usize].contains(cell.ancestor(order).npix));
        if covered {
            return;
        }
        for order in cell.order + 1..=MAX_ORDER {
            self.levels[order as usize].remove_range(cell.range_at(order));
        }

        let mut current = cell;
        while current.order > min {
            let first = current.npix & !3;
            let level = &self.levels[current.order as usize];
            let siblings_present = level.contains_range(&(first..current.npix))
                && level.contains_range(&(current.npix + 1..first + 4));
            if !siblings_present {
                break;
            }
            self.levels[current.order as usize].remove_range(first..first + 4);
            current = Cell::new_unchecked(current.order - 1, current.npix >> 2);
        }
        self.levels[current.order as usize].insert(current.npix);
    }

    /// Bulk strict insertion of validated entries into a canonical MOC.
    pub(crate) fn merge_entries(&mut self, entries: Vec<(u8, Range<u64>)>) {
        let max = self.max_limit_order;
        let incoming = RangeSet::from_ranges(entries.into_iter().map(|(order, range)| {
            let target = order.min(max);
            deepen(&collapse(&range, order, target), target, MAX_ORDER)
        }));
        trace!("merging {} deep ranges", incoming.n_ranges());
        let deep = self.ranges_at(MAX_ORDER).union(&incoming);
        self.rebuild_from_deep(&deep);
    }

    /// Stored cells as pixel ranges at `order`. Cells deeper than `order`
    /// are replaced by their ancestor.
    pub(crate) fn ranges_at(&self, order: u8) -> RangeSet {
        RangeSet::from_ranges(self.levels.iter().enumerate().flat_map(|(o, level)| {
            let o = o as u8;
            level.iter().map(move |range| {
                if o <= order {
                    deepen(range, o, order)
                } else {
                    collapse(range, o, order)
                }
            })
        }))
    }

    /// Coverage at [`MAX_ORDER`] after collapsing cells finer than the
    /// window.
    fn windowed_deep(&self) -> RangeSet {
        let max = self.max_limit_order;
        RangeSet::from_ranges(self.levels.iter().enumerate().flat_map(|(o, level)| {
            let o = o as u8;
            level.iter().map(move |range| {
                let target = o.min(max);
                deepen(&collapse(range, o, target), target, MAX_ORDER)
            })
        }))
    }

    /// Replaces the storage with the canonical decomposition of `deep`.
    pub(crate) fn rebuild_from_deep(&mut self, deep: &RangeSet) {
        self.levels = decompose(deep, self.min_limit_order);
        self.pending.clear();
    }
}

/// Maps a range at `from` to the covering range at coarser `to`.
fn collapse(range: &Range<u64>, from: u8, to: u8) -> Range<u64> {
    let shift = 2 * (from - to) as u32;
    (range.start >> shift)..(((range.end - 1) >> shift) + 1)
}

/// Maps a range at `from` to its descendants at finer `to`.
fn deepen(range: &Range<u64>, from: u8, to: u8) -> Range<u64> {
    let shift = 2 * (to - from) as u32;
    (range.start << shift)..(range.end << shift)
}

/// Greedy decomposition of ranges at [`MAX_ORDER`] into the coarsest aligned
/// cells, none coarser than `min_order`.
pub(crate) fn decompose(deep: &RangeSet, min_order: u8) -> [RangeSet; N_ORDERS] {
    let mut out: [Vec<Range<u64>>; N_ORDERS] = std::array::from_fn(|_| Vec::new());
    for range in deep {
        let (mut start, end) = (range.start, range.end);
        while start < end {
            let mut order = min_order;
            let mut shift = 2 * (MAX_ORDER - order) as u32;
            while start & ((1u64 << shift) - 1) != 0 || end - start < (1u64 << shift) {
                order += 1;
                shift -= 2;
            }
            // Nothing merges below the floor: take the whole aligned run.
            let count = if order == min_order {
                (end - start) >> shift
            } else {
                1
            };
            let first = start >> shift;
            out[order as usize].push(first..first + count);
            start += count << shift;
        }
    }
    out.map(RangeSet::from_ranges)
}
