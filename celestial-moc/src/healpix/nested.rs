//! NESTED scheme internals.
//!
//! A NESTED index is `face · nside² + interleave(ix, iy)`, where `face` is one
//! of the 12 base cells and `(ix, iy)` the position inside it. The 12 base
//! cells are laid out as:
//! - 0–3: north polar cap
//! - 4–7: equatorial belt
//! - 8–11: south polar cap

use super::nside;
use crate::constants::{HALF_PI, PI};

/// Ring number (in units of nside) of the southernmost corner of each face.
pub(crate) const JRLL: [i64; 12] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4];
/// Longitude (in units of π/4) of the southernmost corner of each face.
pub(crate) const JPLL: [i64; 12] = [1, 3, 5, 7, 0, 2, 4, 6, 1, 3, 5, 7];

// Neighbour lookup, directions SW, W, NW, N, NE, E, SE, S.
const NB_X_OFFSET: [i64; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];
const NB_Y_OFFSET: [i64; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
// Face reached when leaving a face towards one of the 9 (x, y) overflow
// combinations; -1 when the corner has no neighbour.
const NB_FACE: [[i8; 12]; 9] = [
    [8, 9, 10, 11, -1, -1, -1, -1, 10, 11, 8, 9],
    [5, 6, 7, 4, 8, 9, 10, 11, 9, 10, 11, 8],
    [-1, -1, -1, -1, 5, 6, 7, 4, -1, -1, -1, -1],
    [4, 5, 6, 7, 11, 8, 9, 10, 11, 8, 9, 10],
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
    [1, 2, 3, 0, 0, 1, 2, 3, 5, 6, 7, 4],
    [-1, -1, -1, -1, 7, 4, 5, 6, -1, -1, -1, -1],
    [3, 0, 1, 2, 3, 0, 1, 2, 4, 5, 6, 7],
    [2, 3, 0, 1, -1, -1, -1, -1, 0, 1, 2, 3],
];
// Coordinate fix-up bits per overflow and face row: 1 = flip x, 2 = flip y,
// 4 = swap x and y.
const NB_SWAP: [[u8; 3]; 9] = [
    [0, 0, 3],
    [0, 0, 6],
    [0, 0, 0],
    [0, 0, 5],
    [0, 0, 0],
    [5, 0, 0],
    [0, 0, 0],
    [6, 0, 0],
    [3, 0, 0],
];

/// Spreads the low 32 bits of `v` onto the even bits of the result.
pub(crate) fn spread_bits(v: u64) -> u64 {
    let mut x = v & 0x0000_0000_FFFF_FFFF;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    (x | (x << 1)) & 0x5555_5555_5555_5555
}

/// Inverse of [`spread_bits`]: gathers the even bits of `v`.
pub(crate) fn compact_bits(v: u64) -> u64 {
    let mut x = v & 0x5555_5555_5555_5555;
    x = (x | (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x | (x >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x >> 4)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x >> 8)) & 0x0000_FFFF_0000_FFFF;
    (x | (x >> 16)) & 0x0000_0000_FFFF_FFFF
}

/// Builds a NESTED index from face and in-face coordinates.
pub(crate) fn xyf2nest(order: u8, ix: u64, iy: u64, face: u64) -> u64 {
    (face << (2 * order as u32)) + spread_bits(ix) + (spread_bits(iy) << 1)
}

/// Splits a NESTED index into `(ix, iy, face)`.
pub(crate) fn nest2xyf(order: u8, pix: u64) -> (u64, u64, u64) {
    let shift = 2 * order as u32;
    let face = pix >> shift;
    let sub = pix & ((1u64 << shift) - 1);
    (compact_bits(sub), compact_bits(sub >> 1), face)
}

/// NESTED pixel for a validated position in radians (`ra` in `[0, 2π)`).
pub(crate) fn ang2pix_nest(order: u8, ra: f64, dec: f64) -> u64 {
    let ns = nside(order);
    let z = libm::sin(dec);
    let za = z.abs();
    let tt = (ra * 2.0 / PI) % 4.0;

    let (face, ix, iy) = if za <= 2.0 / 3.0 {
        equatorial_face(order, tt, z, ns)
    } else {
        polar_face(tt, z, za, ns)
    };
    xyf2nest(order, ix, iy, face)
}

fn equatorial_face(order: u8, tt: f64, z: f64, ns: u64) -> (u64, u64, u64) {
    let temp1 = ns as f64 * (0.5 + tt);
    let temp2 = ns as f64 * z * 0.75;
    let jp = (temp1 - temp2) as u64;
    let jm = (temp1 + temp2) as u64;
    let ifp = jp >> order;
    let ifm = jm >> order;
    let face = if ifp == ifm {
        ifp | 4
    } else if ifp < ifm {
        ifp
    } else {
        ifm + 8
    };
    let ix = jm & (ns - 1);
    let iy = ns - (jp & (ns - 1)) - 1;
    (face, ix, iy)
}

fn polar_face(tt: f64, z: f64, za: f64, ns: u64) -> (u64, u64, u64) {
    let ntt = (tt as u64).min(3);
    let tp = tt - ntt as f64;
    let tmp = ns as f64 * libm::sqrt(3.0 * (1.0 - za));
    let jp = ((tp * tmp) as u64).min(ns - 1);
    let jm = (((1.0 - tp) * tmp) as u64).min(ns - 1);
    if z >= 0.0 {
        (ntt, ns - jm - 1, ns - jp - 1)
    } else {
        (ntt + 8, jp, jm)
    }
}

/// Center of a NESTED pixel as `(ra_deg, dec_deg)`.
pub(crate) fn center(order: u8, pix: u64) -> (f64, f64) {
    let (ix, iy, face) = nest2xyf(order, pix);
    let ns = nside(order) as i64;
    let nl4 = 4 * ns;
    let npix = 12 * ns * ns;
    let (ix, iy, face) = (ix as i64, iy as i64, face as usize);

    let jr = JRLL[face] * ns - ix - iy - 1;
    let fact2 = 4.0 / npix as f64;
    let fact1 = (ns << 1) as f64 * fact2;

    let (nr, z, kshift) = if jr < ns {
        (jr, 1.0 - (jr * jr) as f64 * fact2, 0)
    } else if jr > 3 * ns {
        let nr = nl4 - jr;
        (nr, (nr * nr) as f64 * fact2 - 1.0, 0)
    } else {
        (ns, (2 * ns - jr) as f64 * fact1, (jr - ns) & 1)
    };

    let mut jp = (JPLL[face] * nr + ix - iy + 1 + kshift) / 2;
    if jp > nl4 {
        jp -= nl4;
    }
    if jp < 1 {
        jp += nl4;
    }
    let phi = (jp as f64 - (kshift + 1) as f64 * 0.5) * (HALF_PI / nr as f64);
    (phi.to_degrees(), libm::asin(z).to_degrees())
}

/// Up to 8 distinct neighbours of a NESTED pixel, self excluded.
pub(crate) fn neighbours(order: u8, pix: u64) -> Vec<u64> {
    let ns = nside(order) as i64;
    let (ix, iy, face) = nest2xyf(order, pix);
    let (ix, iy) = (ix as i64, iy as i64);
    let mut result = Vec::with_capacity(8);

    for dir in 0..8 {
        let mut x = ix + NB_X_OFFSET[dir];
        let mut y = iy + NB_Y_OFFSET[dir];

        if x >= 0 && x < ns && y >= 0 && y < ns {
            push_unique(&mut result, pix, xyf2nest(order, x as u64, y as u64, face));
            continue;
        }

        let mut nbnum = 4usize;
        if x < 0 {
            x += ns;
            nbnum -= 1;
        } else if x >= ns {
            x -= ns;
            nbnum += 1;
        }
        if y < 0 {
            y += ns;
            nbnum -= 3;
        } else if y >= ns {
            y -= ns;
            nbnum += 3;
        }

        let target = NB_FACE[nbnum][face as usize];
        if target < 0 {
            continue;
        }
        let bits = NB_SWAP[nbnum][(face >> 2) as usize];
        if bits & 1 != 0 {
            x = ns - x - 1;
        }
        if bits & 2 != 0 {
            y = ns - y - 1;
        }
        if bits & 4 != 0 {
            std::mem::swap(&mut x, &mut y);
        }
        push_unique(
            &mut result,
            pix,
            xyf2nest(order, x as u64, y as u64, target as u64),
        );
    }
    result
}

fn push_unique(result: &mut Vec<u64>, pix: u64, candidate: u64) {
    if candidate != pix && !result.contains(&candidate) {
        result.push(candidate);
    }
}
