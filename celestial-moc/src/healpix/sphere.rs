//! Spherical geometry helpers: position validation and angular distance.

use crate::constants::TWOPI;
use crate::errors::{MocError, MocResult};

/// Wraps an RA in degrees into `[0, 360)`.
#[inline]
pub fn normalize_ra(ra_deg: f64) -> f64 {
    let wrapped = libm::fmod(ra_deg, 360.0);
    let wrapped = if wrapped < 0.0 { wrapped + 360.0 } else { wrapped };
    // -1e-20 + 360.0 rounds to 360.0
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Checks a position and returns it as `(ra_deg, dec_deg)` with RA wrapped
/// into `[0, 360)`.
pub fn validate_position(ra_deg: f64, dec_deg: f64) -> MocResult<(f64, f64)> {
    if !ra_deg.is_finite() || !dec_deg.is_finite() {
        return Err(MocError::invalid_position(&format!(
            "non-finite coordinates ({ra_deg}, {dec_deg})"
        )));
    }
    if !(-90.0..=90.0).contains(&dec_deg) {
        return Err(MocError::invalid_position(&format!(
            "declination {dec_deg} outside [-90, 90]"
        )));
    }
    Ok((normalize_ra(ra_deg), dec_deg))
}

#[inline]
fn vincenty_angular_separation(
    sin_lat1: f64,
    cos_lat1: f64,
    sin_lat2: f64,
    cos_lat2: f64,
    delta_lon: f64,
) -> f64 {
    let (sin_delta_lon, cos_delta_lon) = libm::sincos(delta_lon);

    let num = libm::sqrt(
        (cos_lat2 * sin_delta_lon).powi(2)
            + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_delta_lon).powi(2),
    );
    let den = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_delta_lon;

    libm::atan2(num, den)
}

/// Great-circle distance in radians between two positions given in radians.
pub(crate) fn angular_separation_rad(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let (sin_d1, cos_d1) = libm::sincos(dec1);
    let (sin_d2, cos_d2) = libm::sincos(dec2);
    let delta = libm::fmod(ra2 - ra1, TWOPI);
    vincenty_angular_separation(sin_d1, cos_d1, sin_d2, cos_d2, delta)
}

/// Great-circle distance in degrees between two positions in degrees.
pub fn angular_separation_deg(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    angular_separation_rad(
        ra1.to_radians(),
        dec1.to_radians(),
        ra2.to_radians(),
        dec2.to_radians(),
    )
    .to_degrees()
}
