//! The [`Moc`] type: a normalized multi-order set of HEALPix NESTED cells.
//!
//! Storage is one [`RangeSet`] of pixel indices per order. In strict mode
//! (the default) every insertion keeps the set canonical:
//!
//! - no cell is stored together with one of its ancestors
//! - four stored siblings are replaced by their parent, down to
//!   `min_limit_order`
//! - every stored cell lies inside `[min_limit_order, max_limit_order]`
//!
//! This form is unique for a given covered area and window. Equality
//! compares the covered area at order 29 plus the frame, so two MOCs with
//! different windows but the same coverage are equal.
//!
//! In relaxed mode insertions are buffered; [`Moc::sort`] folds them into the
//! per-order storage without normalizing, and [`Moc::check_and_fix`] restores
//! the canonical form. Queries and set algebra refuse a MOC with unresolved
//! insertions.
//!
//! ```
//! use celestial_moc::Moc;
//!
//! let mut moc: Moc = "3/10 4/12-15".parse().unwrap();
//! assert_eq!(moc.to_string(), r#"{ "3":[3,10] }"#);
//!
//! moc.add("4/13-18").unwrap();
//! assert_eq!(moc.to_string(), r#"{ "3":[3,10], "4":[16,17,18] }"#);
//! ```

mod algebra;
mod consistency;
mod iter;
mod query;

pub use iter::{CellIter, PixelIter};

use crate::cell::Cell;
use crate::config::{Frame, MocConfig};
use crate::constants::{MAX_ORDER, N_BASE_CELLS, N_ORDERS, N_PIX_MAX_ORDER};
use crate::errors::{MocError, MocResult};
use crate::healpix::validate_pixel;
use crate::io::text;
use crate::ranges::RangeSet;
use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Moc {
    levels: [RangeSet; N_ORDERS],
    /// Relaxed-mode insertions not yet folded into `levels`.
    pending: Vec<(u8, Range<u64>)>,
    min_limit_order: u8,
    max_limit_order: u8,
    frame: Frame,
    check_consistency: bool,
    /// `levels` may break the canonical form.
    dirty: bool,
}

impl Default for Moc {
    fn default() -> Self {
        Self::new()
    }
}

impl Moc {
    /// Empty strict MOC with the full `[0, 29]` window.
    pub fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| RangeSet::new()),
            pending: Vec::new(),
            min_limit_order: 0,
            max_limit_order: MAX_ORDER,
            frame: Frame::default(),
            check_consistency: true,
            dirty: false,
        }
    }

    pub fn with_frame(frame: Frame) -> Self {
        Self {
            frame,
            ..Self::new()
        }
    }

    /// Empty MOC configured from a validated [`MocConfig`].
    pub fn with_config(config: &MocConfig) -> MocResult<Self> {
        config.validate()?;
        Ok(Self {
            min_limit_order: config.min_limit_order,
            max_limit_order: config.max_limit_order,
            frame: config.frame,
            check_consistency: config.check_consistency,
            ..Self::new()
        })
    }

    /// Parses the ASCII (`3/1,3-4 4/30`) or JSON (`{"3":[1,3,4]}`) form.
    pub fn from_text(input: &str) -> MocResult<Self> {
        let mut moc = Self::new();
        moc.add(input)?;
        Ok(moc)
    }

    pub fn from_cells<I: IntoIterator<Item = Cell>>(cells: I) -> MocResult<Self> {
        let mut moc = Self::new();
        moc.add_cells(cells)?;
        Ok(moc)
    }

    /// The whole sphere: the 12 base cells.
    pub fn full_sky() -> Self {
        let mut moc = Self::new();
        moc.levels[0] = RangeSet::from_ranges([0..N_BASE_CELLS]);
        moc
    }

    pub fn config(&self) -> MocConfig {
        MocConfig {
            min_limit_order: self.min_limit_order,
            max_limit_order: self.max_limit_order,
            frame: self.frame,
            check_consistency: self.check_consistency,
        }
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    pub fn min_limit_order(&self) -> u8 {
        self.min_limit_order
    }

    pub fn max_limit_order(&self) -> u8 {
        self.max_limit_order
    }

    /// `true` in strict mode.
    pub fn check_consistency(&self) -> bool {
        self.check_consistency
    }

    /// `false` while relaxed-mode insertions await [`check_and_fix`](Self::check_and_fix).
    pub fn is_consistent(&self) -> bool {
        !self.dirty
    }

    /// Adds every cell described by `input` (ASCII or JSON form).
    ///
    /// Nothing is inserted when any token is invalid.
    pub fn add(&mut self, input: &str) -> MocResult<()> {
        let entries = text::parse_cells(input)?;
        self.insert_entries(entries);
        Ok(())
    }

    /// Adds one cell, applying the limit-order window.
    pub fn add_cell(&mut self, order: u8, npix: u64) -> MocResult<()> {
        validate_pixel(order, npix)?;
        if self.check_consistency {
            self.insert_cell_strict(Cell::new_unchecked(order, npix));
        } else {
            self.pending.push((order, npix..npix + 1));
            self.dirty = true;
        }
        Ok(())
    }

    /// Adds cells in bulk. Validation happens before any insertion.
    pub fn add_cells<I: IntoIterator<Item = Cell>>(&mut self, cells: I) -> MocResult<()> {
        let entries = cells
            .into_iter()
            .map(|cell| {
                validate_pixel(cell.order, cell.npix)?;
                Ok((cell.order, cell.npix..cell.npix + 1))
            })
            .collect::<MocResult<Vec<_>>>()?;
        self.insert_entries(entries);
        Ok(())
    }

    /// Inserts validated `(order, pixel range)` entries.
    pub(crate) fn insert_entries(&mut self, entries: Vec<(u8, Range<u64>)>) {
        if entries.is_empty() {
            return;
        }
        if self.check_consistency && !self.dirty {
            self.merge_entries(entries);
        } else {
            self.pending.extend(entries);
            self.dirty = true;
        }
    }

    /// Folds buffered insertions into the per-order storage, sorted and
    /// merged per order. Does not restore the canonical form.
    pub fn sort(&mut self) {
        for (order, range) in self.pending.drain(..) {
            self.levels[order as usize].insert_range(range);
        }
    }

    /// Pixel ranges stored at `order`.
    ///
    /// # Panics
    /// Panics if `order > 29`.
    pub fn level(&self, order: u8) -> &RangeSet {
        &self.levels[order as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.levels.iter().all(RangeSet::is_empty)
    }

    /// Number of stored cells.
    pub fn n_cells(&self) -> u64 {
        self.normalized().levels.iter().map(RangeSet::count).sum()
    }

    /// Deepest order holding at least one cell.
    pub fn max_order(&self) -> Option<u8> {
        let moc = self.normalized();
        (0..=MAX_ORDER)
            .rev()
            .find(|&order| !moc.levels[order as usize].is_empty())
    }

    /// Number of cells at [`max_order`](Self::max_order) needed to cover the
    /// same area.
    pub fn size(&self) -> u64 {
        let moc = self.normalized();
        match moc.max_order() {
            Some(deepest) => moc.count_at(deepest),
            None => 0,
        }
    }

    /// Covered fraction of the sphere, in `[0, 1]`.
    pub fn coverage(&self) -> f64 {
        self.normalized().count_at(MAX_ORDER) as f64 / N_PIX_MAX_ORDER as f64
    }

    /// Covered area in square degrees.
    pub fn area_deg2(&self) -> f64 {
        self.coverage() * 4.0 * crate::constants::PI * crate::constants::RAD_TO_DEG.powi(2)
    }

    /// Cells at `order` covering the same area, assuming every stored cell
    /// is at most `order` deep.
    fn count_at(&self, order: u8) -> u64 {
        self.levels[..=order as usize]
            .iter()
            .enumerate()
            .map(|(o, level)| level.count() << (2 * (order as usize - o)))
            .sum()
    }

    /// Cells of the canonical form, ascending by order then pixel. A relaxed
    /// MOC with outstanding insertions is iterated as if fixed.
    pub fn iter(&self) -> CellIter<'_> {
        match self.normalized() {
            Cow::Borrowed(moc) => CellIter::new(Cow::Borrowed(&moc.levels)),
            Cow::Owned(moc) => CellIter::new(Cow::Owned(moc.levels)),
        }
    }

    /// Pixels at the deepest stored order, every stored cell expanded.
    pub fn pixels(&self) -> PixelIter {
        let moc = self.normalized();
        match moc.max_order() {
            Some(deepest) => PixelIter::new(moc.ranges_at(deepest)),
            None => PixelIter::new(RangeSet::new()),
        }
    }

    /// The canonical form of `self`, cloned only when relaxed insertions are
    /// outstanding.
    pub(crate) fn normalized(&self) -> Cow<'_, Moc> {
        if self.dirty || !self.pending.is_empty() {
            let mut moc = self.clone();
            moc.check_and_fix();
            Cow::Owned(moc)
        } else {
            Cow::Borrowed(self)
        }
    }

    pub(crate) fn ensure_consistent(&self, operation: &str) -> MocResult<()> {
        if self.dirty || !self.pending.is_empty() {
            return Err(MocError::inconsistent(operation));
        }
        Ok(())
    }

    pub fn to_json(&self) -> String {
        text::to_json(self)
    }

    pub fn to_ascii(&self) -> String {
        text::to_ascii(self)
    }

    pub fn to_debug_string(&self) -> String {
        text::to_debug_string(self)
    }
}

impl PartialEq for Moc {
    fn eq(&self, other: &Self) -> bool {
        if self.frame != other.frame {
            return false;
        }
        let (a, b) = (self.normalized(), other.normalized());
        a.ranges_at(MAX_ORDER) == b.ranges_at(MAX_ORDER)
    }
}

impl Eq for Moc {}

impl fmt::Display for Moc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&text::to_json(self))
    }
}

impl FromStr for Moc {
    type Err = MocError;

    fn from_str(s: &str) -> MocResult<Self> {
        Self::from_text(s)
    }
}

impl<'a> IntoIterator for &'a Moc {
    type Item = Cell;
    type IntoIter = CellIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let moc = Moc::new();
        assert!(moc.is_empty());
        assert_eq!(moc.n_cells(), 0);
        assert_eq!(moc.size(), 0);
        assert_eq!(moc.max_order(), None);
        assert_eq!(moc.coverage(), 0.0);
        assert_eq!(moc.to_string(), "{ }");
    }

    #[test]
    fn test_full_sky() {
        let moc = Moc::full_sky();
        assert_eq!(moc.coverage(), 1.0);
        assert_eq!(moc.size(), 12);
        assert!((moc.area_deg2() - 41_252.96).abs() < 0.01);
    }

    #[test]
    fn test_add_cell_compacts_siblings() {
        let mut moc = Moc::new();
        for npix in 40..44 {
            moc.add_cell(4, npix).unwrap();
        }
        assert_eq!(moc.to_string(), r#"{ "3":[10] }"#);
        assert_eq!(moc.n_cells(), 1);
    }

    #[test]
    fn test_add_cell_drops_covered() {
        let mut moc = Moc::new();
        moc.add_cell(3, 10).unwrap();
        moc.add_cell(5, 165).unwrap();
        assert_eq!(moc.to_string(), r#"{ "3":[10] }"#);
        moc.add_cell(2, 2).unwrap();
        assert_eq!(moc.to_string(), r#"{ "2":[2] }"#);
    }

    #[test]
    fn test_add_cell_validates() {
        let mut moc = Moc::new();
        assert!(matches!(moc.add_cell(30, 0), Err(MocError::InvalidOrder { .. })));
        assert!(matches!(moc.add_cell(1, 48), Err(MocError::InvalidPixel { .. })));
        assert!(moc.is_empty());
    }

    #[test]
    fn test_add_is_all_or_nothing() {
        let mut moc: Moc = "3/1".parse().unwrap();
        assert!(moc.add("3/2 3/x").is_err());
        assert_eq!(moc.to_string(), r#"{ "3":[1] }"#);
    }

    #[test]
    fn test_size_and_coverage() {
        let moc: Moc = "3/1,3-4,9 4/30-31".parse().unwrap();
        assert_eq!(moc.n_cells(), 6);
        assert_eq!(moc.max_order(), Some(4));
        assert_eq!(moc.size(), 4 * 4 + 2);
        let expected = 18.0 / (12.0 * 256.0);
        assert!((moc.coverage() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_pixels_expand_to_deepest_order() {
        let moc: Moc = "1/0 2/8".parse().unwrap();
        let pixels: Vec<u64> = moc.pixels().collect();
        assert_eq!(pixels, vec![0, 1, 2, 3, 8]);
        // restartable
        assert_eq!(moc.pixels().count(), 5);
    }

    #[test]
    fn test_with_config() {
        let config = MocConfig {
            min_limit_order: 2,
            max_limit_order: 5,
            frame: Frame::Galactic,
            check_consistency: true,
        };
        let mut moc = Moc::with_config(&config).unwrap();
        moc.add("1/0 7/1000").unwrap();
        assert_eq!(moc.config(), config);
        assert_eq!(moc.to_string(), r#"{ "2":[0,1,2,3], "5":[62] }"#);

        let bad = MocConfig {
            min_limit_order: 6,
            ..config
        };
        assert!(matches!(
            Moc::with_config(&bad),
            Err(MocError::OrderOutOfRange { .. })
        ));
    }

    #[test]
    fn test_equality_includes_frame() {
        let a: Moc = "3/1".parse().unwrap();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.set_frame(Frame::Galactic);
        assert_ne!(a, b);
    }

    #[test]
    fn test_equality_ignores_window() {
        let mut windowed: Moc = "1/0".parse().unwrap();
        windowed.set_min_limit_order(2).unwrap();
        assert_eq!(windowed.to_json(), r#"{ "2":[0,1,2,3] }"#);

        let back = Moc::from_text(&windowed.to_json()).unwrap();
        assert_eq!(back.to_json(), r#"{ "1":[0] }"#);
        assert_eq!(back, windowed);
        assert_ne!(back, "1/1".parse::<Moc>().unwrap());
    }

    #[test]
    fn test_equality_normalizes_relaxed_operand() {
        let strict: Moc = "3/10".parse().unwrap();
        let mut relaxed = Moc::new();
        relaxed.set_check_consistency(false);
        for npix in 40..44 {
            relaxed.add_cell(4, npix).unwrap();
        }
        assert!(!relaxed.is_consistent());
        assert_eq!(strict, relaxed);
    }

    #[test]
    fn test_iter_order() {
        let moc: Moc = "4/30 3/9 3/1".parse().unwrap();
        let cells: Vec<String> = moc.iter().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["3/1", "3/9", "4/30"]);
        assert_eq!((&moc).into_iter().count(), 3);
    }

    #[test]
    fn test_iter_relaxed_pending() {
        let mut relaxed = Moc::new();
        relaxed.set_check_consistency(false);
        for npix in 40..44 {
            relaxed.add_cell(4, npix).unwrap();
        }
        relaxed.add_cell(5, 161).unwrap();
        let cells: Vec<String> = relaxed.iter().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["3/10"]);
        assert!(!relaxed.is_consistent());
    }
}
