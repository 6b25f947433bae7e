//! Positional queries: point containment and cone coverage.

use super::Moc;
use crate::cell::Cell;
use crate::constants::{CELL_RADIUS_BOUND, N_BASE_CELLS};
use crate::errors::{MocError, MocResult};
use crate::healpix::nested::{ang2pix_nest, center};
use crate::healpix::sphere::{angular_separation_rad, validate_position};
use crate::healpix::{nside, validate_order};
use std::ops::Range;
use tracing::debug;

impl Moc {
    /// Cells up to `order` that may intersect the cone.
    ///
    /// Cells entirely inside the cone are kept at the coarsest possible
    /// order; cells crossing the border are included at `order`. The result
    /// covers the whole cone plus a margin of at most one cell.
    pub fn from_cone(ra_deg: f64, dec_deg: f64, radius_deg: f64, order: u8) -> MocResult<Moc> {
        let mut moc = Moc::new();
        moc.insert_cone(ra_deg, dec_deg, radius_deg, order)?;
        Ok(moc)
    }

    /// `true` when the position falls in a stored cell.
    pub fn contains(&self, ra_deg: f64, dec_deg: f64) -> MocResult<bool> {
        self.ensure_consistent("contains")?;
        let (ra, dec) = validate_position(ra_deg, dec_deg)?;
        let Some(order) = self.max_order() else {
            return Ok(false);
        };
        let npix = ang2pix_nest(order, ra.to_radians(), dec.to_radians());
        self.is_in(order, npix)
    }

    /// Part of `self` inside the cone, resolved at the deepest stored order.
    pub fn query_disc(&self, ra_deg: f64, dec_deg: f64, radius_deg: f64) -> MocResult<Moc> {
        self.ensure_consistent("query_disc")?;
        // Strict even for a relaxed receiver: the cone must be canonical to
        // take part in the intersection.
        let mut cone = self.empty_like();
        cone.check_consistency = true;
        let Some(order) = self.max_order() else {
            validate_position(ra_deg, dec_deg)?;
            validate_radius(radius_deg)?;
            return Ok(cone);
        };
        cone.insert_cone(ra_deg, dec_deg, radius_deg, order)?;
        self.intersection(&cone)
    }

    fn insert_cone(&mut self, ra_deg: f64, dec_deg: f64, radius_deg: f64, order: u8) -> MocResult<()> {
        validate_order(order)?;
        let (ra, dec) = validate_position(ra_deg, dec_deg)?;
        validate_radius(radius_deg)?;

        let cone = Cone {
            ra: ra.to_radians(),
            dec: dec.to_radians(),
            radius: radius_deg.min(180.0).to_radians(),
        };
        let mut entries = Vec::new();
        for base in 0..N_BASE_CELLS {
            cone.collect(Cell::new_unchecked(0, base), order, &mut entries);
        }
        debug!(
            "cone ({}, {}) r={} at order {}: {} cells",
            ra,
            dec,
            radius_deg,
            order,
            entries.len()
        );
        self.insert_entries(entries);
        Ok(())
    }
}

fn validate_radius(radius_deg: f64) -> MocResult<()> {
    if !radius_deg.is_finite() || radius_deg < 0.0 {
        return Err(MocError::invalid_position(&format!(
            "radius {radius_deg} must be finite and non-negative"
        )));
    }
    Ok(())
}

/// Cone in radians.
struct Cone {
    ra: f64,
    dec: f64,
    radius: f64,
}

impl Cone {
    fn collect(&self, cell: Cell, target: u8, out: &mut Vec<(u8, Range<u64>)>) {
        let (ra, dec) = center(cell.order, cell.npix);
        let dist = angular_separation_rad(self.ra, self.dec, ra.to_radians(), dec.to_radians());
        let bound = CELL_RADIUS_BOUND / nside(cell.order) as f64;

        if dist > self.radius + bound {
            return;
        }
        if cell.order >= target || dist + bound <= self.radius {
            out.push((cell.order, cell.npix..cell.npix + 1));
            return;
        }
        if let Some(children) = cell.children() {
            for child in children {
                self.collect(child, target, out);
            }
        }
    }
}
