//! HEALPix indexing: sky position ↔ pixel number at a given order.
//!
//! Both numbering schemes are supported through the [`Scheme`] tag:
//!
//! - [`Scheme::Nested`]: hierarchical numbering. A cell `p` at order `k` has
//!   children `4p..4p+4` at order `k + 1`. MOCs are always stored in NESTED.
//! - [`Scheme::Ring`]: iso-latitude rings, converted through [`nest2ring`] and
//!   [`ring2nest`].
//!
//! Angles are in degrees. RA is wrapped into `[0, 360)`; Dec must lie in
//! `[-90, 90]`.
//!
//! ```
//! use celestial_moc::healpix::{ang2pix, pix2ang, Scheme};
//!
//! let npix = ang2pix(Scheme::Nested, 0, 0.0, 90.0).unwrap();
//! assert!(npix < 4); // north polar cap
//!
//! let (ra, dec) = pix2ang(Scheme::Nested, 0, 4).unwrap();
//! assert_eq!((ra, dec), (0.0, 0.0));
//! ```

pub(crate) mod nested;
pub mod ring;
pub mod sphere;

use crate::constants::{MAX_ORDER, N_BASE_CELLS, PI};
use crate::errors::{MocError, MocResult};
use serde::{Deserialize, Serialize};

pub use ring::{nest2ring, ring2nest};
pub use sphere::angular_separation_deg;

/// HEALPix pixel numbering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Nested,
    Ring,
}

/// Nside for a given order: `2^order`.
pub fn nside(order: u8) -> u64 {
    1u64 << order
}

/// Number of pixels at a given order: `12 · 4^order`.
pub fn npix(order: u8) -> u64 {
    N_BASE_CELLS << (2 * order as u32)
}

/// Solid angle of one pixel at the given order, in steradians.
pub fn pixel_area(order: u8) -> f64 {
    4.0 * PI / npix(order) as f64
}

/// Approximate side length of a pixel at the given order, in degrees.
pub fn pixel_size_deg(order: u8) -> f64 {
    pixel_area(order).sqrt().to_degrees()
}

/// Shallowest order whose pixels are no larger than `resolution_deg`.
///
/// Capped at [`MAX_ORDER`].
pub fn order_for_resolution(resolution_deg: f64) -> u8 {
    (0..=MAX_ORDER)
        .find(|&order| pixel_size_deg(order) <= resolution_deg)
        .unwrap_or(MAX_ORDER)
}

pub fn validate_order(order: u8) -> MocResult<()> {
    if order > MAX_ORDER {
        return Err(MocError::InvalidOrder {
            order: order as u32,
        });
    }
    Ok(())
}

/// Checks `order` and `npix < 12 · 4^order`.
pub fn validate_pixel(order: u8, npix_value: u64) -> MocResult<()> {
    validate_order(order)?;
    let limit = npix(order);
    if npix_value >= limit {
        return Err(MocError::InvalidPixel {
            order,
            npix: npix_value,
            limit,
        });
    }
    Ok(())
}

/// Pixel containing the position `(ra_deg, dec_deg)`.
pub fn ang2pix(scheme: Scheme, order: u8, ra_deg: f64, dec_deg: f64) -> MocResult<u64> {
    validate_order(order)?;
    let (ra, dec) = sphere::validate_position(ra_deg, dec_deg)?;
    let nest = nested::ang2pix_nest(order, ra.to_radians(), dec.to_radians());
    Ok(match scheme {
        Scheme::Nested => nest,
        Scheme::Ring => ring::nest2ring_unchecked(order, nest),
    })
}

/// Center of a pixel as `(ra_deg, dec_deg)`.
pub fn pix2ang(scheme: Scheme, order: u8, npix_value: u64) -> MocResult<(f64, f64)> {
    validate_pixel(order, npix_value)?;
    let nest = match scheme {
        Scheme::Nested => npix_value,
        Scheme::Ring => ring::ring2nest_unchecked(order, npix_value),
    };
    Ok(nested::center(order, nest))
}

/// Pixels sharing an edge or a corner with `npix_value`, in the same scheme.
///
/// Interior pixels have 8 neighbours; pixels touching the corners of base
/// cells have 7 (6 at order 0).
pub fn neighbours(scheme: Scheme, order: u8, npix_value: u64) -> MocResult<Vec<u64>> {
    validate_pixel(order, npix_value)?;
    Ok(match scheme {
        Scheme::Nested => nested::neighbours(order, npix_value),
        Scheme::Ring => {
            let nest = ring::ring2nest_unchecked(order, npix_value);
            nested::neighbours(order, nest)
                .into_iter()
                .map(|n| ring::nest2ring_unchecked(order, n))
                .collect()
        }
    })
}

/// Parent of a NESTED pixel, `None` at order 0.
pub fn parent(order: u8, npix_value: u64) -> Option<(u8, u64)> {
    (order > 0).then(|| (order - 1, npix_value >> 2))
}

/// Range of descendants of `(order, npix)` at `target_order >= order`.
pub fn descendants_range(order: u8, npix_value: u64, target_order: u8) -> std::ops::Range<u64> {
    let shift = 2 * (target_order - order) as u32;
    (npix_value << shift)..((npix_value + 1) << shift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_nside_and_npix() {
        assert_eq!(nside(0), 1);
        assert_eq!(nside(3), 8);
        assert_eq!(npix(0), 12);
        assert_eq!(npix(1), 48);
        assert_eq!(npix(29), 12 * (1u64 << 58));
    }

    #[test]
    fn test_pixel_area_sum() {
        for order in 0..6 {
            let total = pixel_area(order) * npix(order) as f64;
            assert_abs_diff_eq!(total, 4.0 * PI, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_order_for_resolution() {
        // Order 6 pixels are ~0.92 deg wide, order 5 ~1.83 deg.
        assert_eq!(order_for_resolution(1.0), 6);
        assert_eq!(order_for_resolution(100.0), 0);
        assert_eq!(order_for_resolution(0.0), MAX_ORDER);
    }

    #[test]
    fn test_validate_order_and_pixel() {
        assert!(validate_order(29).is_ok());
        assert!(matches!(
            validate_order(30),
            Err(MocError::InvalidOrder { order: 30 })
        ));
        assert!(validate_pixel(0, 11).is_ok());
        assert!(matches!(
            validate_pixel(0, 12),
            Err(MocError::InvalidPixel { limit: 12, .. })
        ));
    }

    #[test]
    fn test_ang2pix_rejects_bad_input() {
        assert!(matches!(
            ang2pix(Scheme::Nested, 30, 0.0, 0.0),
            Err(MocError::InvalidOrder { .. })
        ));
        assert!(matches!(
            ang2pix(Scheme::Nested, 3, 0.0, 91.0),
            Err(MocError::InvalidPosition { .. })
        ));
        assert!(matches!(
            ang2pix(Scheme::Nested, 3, f64::NAN, 0.0),
            Err(MocError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_ang2pix_wraps_ra() {
        let a = ang2pix(Scheme::Nested, 5, 10.0, 20.0).unwrap();
        let b = ang2pix(Scheme::Nested, 5, 370.0, 20.0).unwrap();
        let c = ang2pix(Scheme::Nested, 5, -350.0, 20.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_pix2ang_base_cells() {
        let (ra, dec) = pix2ang(Scheme::Nested, 0, 0).unwrap();
        assert_abs_diff_eq!(ra, 45.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dec, 41.810_314_895_778_6, epsilon = 1e-9);

        let (ra, dec) = pix2ang(Scheme::Nested, 0, 8).unwrap();
        assert_abs_diff_eq!(ra, 45.0, epsilon = 1e-12);
        assert_abs_diff_eq!(dec, -41.810_314_895_778_6, epsilon = 1e-9);
    }

    #[test]
    fn test_center_round_trip_both_schemes() {
        for order in 0..6u8 {
            for pix in 0..npix(order) {
                for scheme in [Scheme::Nested, Scheme::Ring] {
                    let (ra, dec) = pix2ang(scheme, order, pix).unwrap();
                    assert_eq!(
                        ang2pix(scheme, order, ra, dec).unwrap(),
                        pix,
                        "order {order}, pixel {pix}, {scheme:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_neighbours_ring_matches_nested() {
        let order = 3;
        for nest in [0u64, 100, 300, 767] {
            let ring_pix = nest2ring(order, nest).unwrap();
            let mut from_ring: Vec<u64> = neighbours(Scheme::Ring, order, ring_pix)
                .unwrap()
                .into_iter()
                .map(|r| ring2nest(order, r).unwrap())
                .collect();
            let mut from_nest = neighbours(Scheme::Nested, order, nest).unwrap();
            from_ring.sort_unstable();
            from_nest.sort_unstable();
            assert_eq!(from_ring, from_nest);
        }
    }

    #[test]
    fn test_parent_and_descendants() {
        assert_eq!(parent(0, 5), None);
        assert_eq!(parent(5, 128), Some((4, 32)));
        assert_eq!(descendants_range(3, 10, 3), 10..11);
        assert_eq!(descendants_range(3, 10, 4), 40..44);
        assert_eq!(descendants_range(1, 0, 3), 0..16);
    }
}
