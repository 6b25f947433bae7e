//! RING ↔ NESTED conversion.
//!
//! Both directions go through the `(ix, iy, face)` decomposition shared with
//! the NESTED scheme.

use super::nested::{nest2xyf, xyf2nest, JPLL, JRLL};
use super::{nside, npix, validate_pixel};
use crate::errors::MocResult;

/// Converts a NESTED index to the RING scheme.
///
/// ```
/// use celestial_moc::healpix::nest2ring;
///
/// assert_eq!(nest2ring(2, 47).unwrap(), 2);
/// assert!(nest2ring(2, 192).is_err());
/// ```
pub fn nest2ring(order: u8, nest: u64) -> MocResult<u64> {
    validate_pixel(order, nest)?;
    Ok(nest2ring_unchecked(order, nest))
}

/// Converts a RING index to the NESTED scheme.
pub fn ring2nest(order: u8, ring: u64) -> MocResult<u64> {
    validate_pixel(order, ring)?;
    Ok(ring2nest_unchecked(order, ring))
}

pub(crate) fn nest2ring_unchecked(order: u8, nest: u64) -> u64 {
    let (ix, iy, face) = nest2xyf(order, nest);
    xyf2ring(order, ix as i64, iy as i64, face as usize)
}

pub(crate) fn ring2nest_unchecked(order: u8, ring: u64) -> u64 {
    let (ix, iy, face) = ring2xyf(order, ring as i64);
    xyf2nest(order, ix as u64, iy as u64, face as u64)
}

fn xyf2ring(order: u8, ix: i64, iy: i64, face: usize) -> u64 {
    let ns = nside(order) as i64;
    let nl4 = 4 * ns;
    let n_pix = npix(order) as i64;
    let ncap = 2 * ns * (ns - 1);

    let jr = JRLL[face] * ns - ix - iy - 1;
    let (nr, n_before, kshift) = if jr < ns {
        (jr, 2 * jr * (jr - 1), 0)
    } else if jr > 3 * ns {
        let nr = nl4 - jr;
        (nr, n_pix - 2 * (nr + 1) * nr, 0)
    } else {
        (ns, ncap + (jr - ns) * nl4, (jr - ns) & 1)
    };

    let mut jp = (JPLL[face] * nr + ix - iy + 1 + kshift) / 2;
    if jp > nl4 {
        jp -= nl4;
    } else if jp < 1 {
        jp += nl4;
    }
    (n_before + jp - 1) as u64
}

fn ring2xyf(order: u8, pix: i64) -> (i64, i64, usize) {
    let ns = nside(order) as i64;
    let nl2 = 2 * ns;
    let n_pix = npix(order) as i64;
    let ncap = 2 * ns * (ns - 1);

    let (iring, iphi, kshift, nr, face) = if pix < ncap {
        // north polar cap
        let iring = (1 + isqrt(1 + 2 * pix)) >> 1;
        let iphi = pix + 1 - 2 * iring * (iring - 1);
        (iring, iphi, 0, iring, ((iphi - 1) / iring) as usize)
    } else if pix < n_pix - ncap {
        // equatorial belt
        let ip = pix - ncap;
        let tmp = ip >> (order + 2);
        let iring = tmp + ns;
        let iphi = ip - tmp * 4 * ns + 1;
        let kshift = (iring + ns) & 1;
        let ire = tmp + 1;
        let irm = nl2 + 1 - tmp;
        let ifm = (iphi - (ire >> 1) + ns - 1) >> order;
        let ifp = (iphi - (irm >> 1) + ns - 1) >> order;
        let face = if ifp == ifm {
            ifp | 4
        } else if ifp < ifm {
            ifp
        } else {
            ifm + 8
        };
        (iring, iphi, kshift, ns, face as usize)
    } else {
        // south polar cap
        let ip = n_pix - pix;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let face = 8 + ((iphi - 1) / iring) as usize;
        (2 * nl2 - iring, iphi, 0, iring, face)
    };

    let irt = iring - JRLL[face] * ns + 1;
    let mut ipt = 2 * iphi - JPLL[face] * nr - kshift - 1;
    if ipt >= nl2 {
        ipt -= 8 * ns;
    }
    ((ipt - irt) >> 1, (-ipt - irt) >> 1, face)
}

/// Floor of the square root for non-negative `v`.
fn isqrt(v: i64) -> i64 {
    let mut r = (v as f64).sqrt() as i64;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MocError;

    #[test]
    fn test_known_values_order_1() {
        let expected = [
            (0u64, 3u64),
            (1, 7),
            (2, 11),
            (3, 15),
            (4, 2),
            (5, 1),
            (13, 0),
            (19, 12),
            (28, 16),
            (44, 32),
            (47, 44),
        ];
        for (ring, nest) in expected {
            assert_eq!(ring2nest(1, ring).unwrap(), nest, "ring {ring}");
            assert_eq!(nest2ring(1, nest).unwrap(), ring, "nest {nest}");
        }
    }

    #[test]
    fn test_known_values_order_2() {
        let expected = [
            (47u64, 2u64),
            (29, 7),
            (60, 22),
            (51, 54),
            (88, 107),
            (174, 129),
            (177, 187),
            (153, 157),
            (144, 189),
        ];
        for (nest, ring) in expected {
            assert_eq!(nest2ring(2, nest).unwrap(), ring, "nest {nest}");
            assert_eq!(ring2nest(2, ring).unwrap(), nest, "ring {ring}");
        }
    }

    #[test]
    fn test_order_zero_is_identity_on_faces() {
        for pix in 0..12 {
            let ring = nest2ring(0, pix).unwrap();
            assert_eq!(ring2nest(0, ring).unwrap(), pix);
        }
    }

    #[test]
    fn test_bijection() {
        for order in 0..6u8 {
            let mut seen = vec![false; npix(order) as usize];
            for nest in 0..npix(order) {
                let ring = nest2ring(order, nest).unwrap();
                assert!(!seen[ring as usize], "ring {ring} hit twice at order {order}");
                seen[ring as usize] = true;
                assert_eq!(ring2nest(order, ring).unwrap(), nest);
            }
        }
    }

    #[test]
    fn test_deep_order_round_trip() {
        let order = 29;
        for nest in [0u64, 1, npix(order) / 2 + 12345, npix(order) - 1] {
            let ring = nest2ring(order, nest).unwrap();
            assert_eq!(ring2nest(order, ring).unwrap(), nest);
        }
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            nest2ring(1, 48),
            Err(MocError::InvalidPixel { .. })
        ));
        assert!(matches!(
            ring2nest(30, 0),
            Err(MocError::InvalidOrder { .. })
        ));
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        let big = (1i64 << 60) + 7;
        let r = isqrt(big);
        assert!(r * r <= big && (r + 1) * (r + 1) > big);
    }
}
