//! MOC configuration: limit-order window, consistency mode and frame tag.
//!
//! A [`MocConfig`] can be built in code or deserialized from JSON:
//!
//! ```
//! use celestial_moc::{Frame, MocConfig};
//!
//! let config = MocConfig::from_json(r#"{ "max_limit_order": 12, "frame": "galactic" }"#).unwrap();
//! assert_eq!(config.min_limit_order, 0);
//! assert_eq!(config.max_limit_order, 12);
//! assert_eq!(config.frame, Frame::Galactic);
//! assert!(config.check_consistency);
//! ```

use crate::constants::MAX_ORDER;
use crate::errors::{MocError, MocResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference frame a MOC is expressed in.
///
/// Metadata only: set algebra works on pixel numbers and requires both
/// operands to carry the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    #[default]
    Equatorial,
    Galactic,
    Ecliptic,
}

impl Frame {
    /// Single-letter `COORDSYS` code used in FITS headers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Equatorial => "C",
            Self::Galactic => "G",
            Self::Ecliptic => "E",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "C" | "ICRS" | "EQ" => Some(Self::Equatorial),
            "G" | "GAL" => Some(Self::Galactic),
            "E" | "ECL" => Some(Self::Ecliptic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equatorial => "equatorial",
            Self::Galactic => "galactic",
            Self::Ecliptic => "ecliptic",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frame {
    type Err = MocError;

    fn from_str(s: &str) -> MocResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equatorial" | "icrs" | "c" => Ok(Self::Equatorial),
            "galactic" | "g" => Ok(Self::Galactic),
            "ecliptic" | "e" => Ok(Self::Ecliptic),
            _ => Err(MocError::parse_error(s, "unknown frame")),
        }
    }
}

/// Construction parameters for a [`Moc`](crate::Moc).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MocConfig {
    /// Cells coarser than this order are expanded into their descendants.
    pub min_limit_order: u8,
    /// Cells finer than this order are replaced by their ancestor.
    pub max_limit_order: u8,
    pub frame: Frame,
    /// Strict mode (`true`) normalizes on every insertion; relaxed mode
    /// buffers insertions until `check_and_fix`.
    pub check_consistency: bool,
}

impl Default for MocConfig {
    fn default() -> Self {
        Self {
            min_limit_order: 0,
            max_limit_order: MAX_ORDER,
            frame: Frame::Equatorial,
            check_consistency: true,
        }
    }
}

impl MocConfig {
    /// Parses and validates a JSON configuration. Missing fields take their
    /// default value.
    pub fn from_json(json: &str) -> MocResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| MocError::parse_error("config", &e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> MocResult<()> {
        validate_limits(self.min_limit_order, self.max_limit_order)
    }
}

pub(crate) fn validate_limits(min: u8, max: u8) -> MocResult<()> {
    if max > MAX_ORDER {
        return Err(MocError::order_out_of_range(&format!(
            "max limit order {max} exceeds {MAX_ORDER}"
        )));
    }
    if min > max {
        return Err(MocError::order_out_of_range(&format!(
            "min limit order {min} is greater than max limit order {max}"
        )));
    }
    Ok(())
}
