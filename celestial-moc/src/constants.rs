//! HEALPix and MOC constants.

/// Deepest HEALPix order representable with 64-bit NESTED indices.
pub const MAX_ORDER: u8 = 29;

/// Number of distinct orders, `0..=MAX_ORDER`.
pub const N_ORDERS: usize = MAX_ORDER as usize + 1;

/// Number of base (order 0) cells.
pub const N_BASE_CELLS: u64 = 12;

/// Number of cells at [`MAX_ORDER`]: `12 · 4^29`.
pub const N_PIX_MAX_ORDER: u64 = N_BASE_CELLS << (2 * MAX_ORDER as u32);

pub const PI: f64 = std::f64::consts::PI;
pub const HALF_PI: f64 = std::f64::consts::FRAC_PI_2;
pub const TWOPI: f64 = std::f64::consts::TAU;
pub const RAD_TO_DEG: f64 = 180.0 / PI;

/// Upper bound, in radians, of `nside ·` the distance from a cell center to
/// any point of the cell, valid at every order. Order 0 peaks near 0.84 and
/// deep orders near 1.03.
pub const CELL_RADIUS_BOUND: f64 = 1.2;
