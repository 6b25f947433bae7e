//! Set algebra and hierarchy queries.
//!
//! Binary operations compare coverages at [`MAX_ORDER`] and rebuild a
//! canonical result. Operands are never modified.

use super::Moc;
use crate::constants::{MAX_ORDER, N_BASE_CELLS};
use crate::errors::{MocError, MocResult};
use crate::healpix::{npix, validate_order};
use crate::ranges::RangeSet;

impl Moc {
    /// Cells covered by either operand.
    pub fn union(&self, other: &Moc) -> MocResult<Moc> {
        let (a, b) = self.operands(other, "union")?;
        Ok(self.derive(other, &a.union(&b)))
    }

    /// Cells covered by both operands.
    pub fn intersection(&self, other: &Moc) -> MocResult<Moc> {
        let (a, b) = self.operands(other, "intersection")?;
        Ok(self.derive(other, &a.intersection(&b)))
    }

    /// Cells of `self` not covered by `other`.
    pub fn subtraction(&self, other: &Moc) -> MocResult<Moc> {
        let (a, b) = self.operands(other, "subtraction")?;
        Ok(self.derive(other, &a.difference(&b)))
    }

    /// Cells covered by exactly one operand: `(a ∪ b) − (a ∩ b)`.
    pub fn difference(&self, other: &Moc) -> MocResult<Moc> {
        let (a, b) = self.operands(other, "difference")?;
        Ok(self.derive(other, &a.symmetric_difference(&b)))
    }

    /// `true` when the two MOCs share any area.
    pub fn overlaps(&self, other: &Moc) -> MocResult<bool> {
        let (a, b) = self.operands(other, "overlaps")?;
        Ok(a.intersects(&b))
    }

    /// The sky not covered by `self`, in the same window and frame.
    pub fn complement(&self) -> MocResult<Moc> {
        self.ensure_consistent("complement")?;
        let deep = self.ranges_at(MAX_ORDER).complement(npix(MAX_ORDER));
        let mut result = self.empty_like();
        result.rebuild_from_deep(&deep);
        Ok(result)
    }

    /// `true` when the cell or one of its ancestors is stored.
    ///
    /// A pixel index beyond the order's range is never stored.
    pub fn is_in(&self, order: u8, npix_value: u64) -> MocResult<bool> {
        if !self.query_cell(order, npix_value, "is_in")? {
            return Ok(false);
        }
        Ok((0..=order).any(|k| self.levels[k as usize].contains(npix_value >> shift(order, k))))
    }

    /// `true` when the cell is a strict ascendant of a stored cell, i.e. some
    /// strict descendant of `(order, npix)` is stored.
    pub fn is_ascendant(&self, order: u8, npix_value: u64) -> MocResult<bool> {
        if !self.query_cell(order, npix_value, "is_ascendant")? {
            return Ok(false);
        }
        Ok((order + 1..=MAX_ORDER).any(|k| {
            let s = shift(k, order);
            let range = (npix_value << s)..((npix_value + 1) << s);
            self.levels[k as usize].intersects_range(&range)
        }))
    }

    /// `true` when the cell is a strict descendant of a stored cell.
    pub fn is_descendant(&self, order: u8, npix_value: u64) -> MocResult<bool> {
        if !self.query_cell(order, npix_value, "is_descendant")? {
            return Ok(false);
        }
        Ok((0..order).any(|k| self.levels[k as usize].contains(npix_value >> shift(order, k))))
    }

    /// `true` when the cell, one of its ancestors or one of its descendants
    /// is stored.
    pub fn is_intersecting(&self, order: u8, npix_value: u64) -> MocResult<bool> {
        Ok(self.is_in(order, npix_value)? || self.is_ascendant(order, npix_value)?)
    }

    /// Checks a hierarchy query. `Ok(false)` means the pixel cannot exist at
    /// `order`.
    fn query_cell(&self, order: u8, npix_value: u64, operation: &str) -> MocResult<bool> {
        validate_order(order)?;
        self.ensure_consistent(operation)?;
        Ok(npix_value < N_BASE_CELLS << (2 * order as u32))
    }

    /// Validates both operands and returns their coverage at [`MAX_ORDER`].
    fn operands(&self, other: &Moc, operation: &str) -> MocResult<(RangeSet, RangeSet)> {
        self.ensure_consistent(operation)?;
        other.ensure_consistent(operation)?;
        if self.frame != other.frame {
            return Err(MocError::FrameMismatch {
                left: self.frame,
                right: other.frame,
            });
        }
        Ok((self.ranges_at(MAX_ORDER), other.ranges_at(MAX_ORDER)))
    }

    /// Result of a binary operation: widest window of the two operands, frame
    /// and mode of `self`.
    fn derive(&self, other: &Moc, deep: &RangeSet) -> Moc {
        let mut result = self.empty_like();
        result.min_limit_order = self.min_limit_order.min(other.min_limit_order);
        result.max_limit_order = self.max_limit_order.max(other.max_limit_order);
        result.rebuild_from_deep(deep);
        result
    }

    pub(super) fn empty_like(&self) -> Moc {
        Moc {
            min_limit_order: self.min_limit_order,
            max_limit_order: self.max_limit_order,
            frame: self.frame,
            check_consistency: self.check_consistency,
            ..Moc::new()
        }
    }
}

#[inline]
fn shift(fine: u8, coarse: u8) -> u32 {
    2 * (fine - coarse) as u32
}
