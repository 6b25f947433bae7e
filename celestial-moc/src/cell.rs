use crate::constants::MAX_ORDER;
use crate::errors::{MocError, MocResult};
use crate::healpix::{descendants_range, validate_pixel};
use std::fmt;
use std::ops::Range;

/// A HEALPix NESTED cell `(order, npix)`.
///
/// Ordering is by order first, then by pixel, which is the iteration order of
/// a [`Moc`](crate::Moc).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub order: u8,
    pub npix: u64,
}

impl Cell {
    /// Validated constructor.
    pub fn new(order: u8, npix: u64) -> MocResult<Self> {
        validate_pixel(order, npix)?;
        Ok(Self { order, npix })
    }

    pub(crate) const fn new_unchecked(order: u8, npix: u64) -> Self {
        Self { order, npix }
    }

    /// NUNIQ packing: `4 · 4^order + npix`.
    pub fn uniq(&self) -> u64 {
        (4u64 << (2 * self.order as u32)) + self.npix
    }

    /// Inverse of [`uniq`](Self::uniq).
    pub fn from_uniq(uniq: u64) -> MocResult<Self> {
        if uniq < 4 {
            return Err(MocError::parse_error(&uniq.to_string(), "not a NUNIQ value"));
        }
        let order = (63 - uniq.leading_zeros()) / 2 - 1;
        if order > MAX_ORDER as u32 {
            return Err(MocError::InvalidOrder { order });
        }
        let order = order as u8;
        Self::new(order, uniq - (4u64 << (2 * order as u32)))
    }

    pub fn parent(&self) -> Option<Cell> {
        (self.order > 0).then(|| Cell::new_unchecked(self.order - 1, self.npix >> 2))
    }

    /// Ancestor at `order <= self.order`.
    pub fn ancestor(&self, order: u8) -> Cell {
        debug_assert!(order <= self.order);
        Cell::new_unchecked(order, self.npix >> (2 * (self.order - order) as u32))
    }

    /// The four children, `None` at the deepest order.
    pub fn children(&self) -> Option<[Cell; 4]> {
        if self.order >= MAX_ORDER {
            return None;
        }
        let first = self.npix << 2;
        let order = self.order + 1;
        Some(std::array::from_fn(|i| {
            Cell::new_unchecked(order, first + i as u64)
        }))
    }

    /// Pixel range covered by this cell at `order >= self.order`.
    pub fn range_at(&self, order: u8) -> Range<u64> {
        descendants_range(self.order, self.npix, order)
    }

    /// `true` when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Cell) -> bool {
        self.order < other.order && other.ancestor(self.order).npix == self.npix
    }

    pub fn is_descendant_of(&self, other: &Cell) -> bool {
        other.is_ancestor_of(self)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.order, self.npix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates() {
        assert!(Cell::new(0, 11).is_ok());
        assert!(matches!(Cell::new(0, 12), Err(MocError::InvalidPixel { .. })));
        assert!(matches!(Cell::new(30, 0), Err(MocError::InvalidOrder { .. })));
    }

    #[test]
    fn test_uniq_round_trip() {
        assert_eq!(Cell::new(0, 0).unwrap().uniq(), 4);
        assert_eq!(Cell::new(0, 11).unwrap().uniq(), 15);
        assert_eq!(Cell::new(1, 0).unwrap().uniq(), 16);
        for cell in [
            Cell::new(3, 521).unwrap(),
            Cell::new(12, 12345678).unwrap(),
            Cell::new(29, 12 * (1u64 << 58) - 1).unwrap(),
        ] {
            assert_eq!(Cell::from_uniq(cell.uniq()).unwrap(), cell);
        }
        assert!(Cell::from_uniq(3).is_err());
    }

    #[test]
    fn test_family() {
        let cell = Cell::new(3, 10).unwrap();
        assert_eq!(cell.parent(), Some(Cell::new_unchecked(2, 2)));
        assert_eq!(cell.ancestor(1), Cell::new_unchecked(1, 0));
        let children = cell.children().unwrap();
        assert_eq!(children[0], Cell::new_unchecked(4, 40));
        assert_eq!(children[3], Cell::new_unchecked(4, 43));
        assert_eq!(cell.range_at(5), 160..176);
        assert!(Cell::new_unchecked(0, 0).parent().is_none());
        assert!(Cell::new_unchecked(29, 0).children().is_none());
    }

    #[test]
    fn test_ancestry() {
        let coarse = Cell::new_unchecked(3, 10);
        assert!(coarse.is_ancestor_of(&Cell::new_unchecked(5, 165)));
        assert!(!coarse.is_ancestor_of(&Cell::new_unchecked(5, 128)));
        assert!(!coarse.is_ancestor_of(&coarse));
        assert!(Cell::new_unchecked(5, 165).is_descendant_of(&coarse));
    }

    #[test]
    fn test_ordering_and_display() {
        let mut cells = vec![
            Cell::new_unchecked(4, 1),
            Cell::new_unchecked(3, 9),
            Cell::new_unchecked(3, 1),
        ];
        cells.sort();
        let text: Vec<String> = cells.iter().map(Cell::to_string).collect();
        assert_eq!(text, vec!["3/1", "3/9", "4/1"]);
    }
}
