//! Error types for MOC construction, algebra and serialization.
//!
//! Everything fallible in this crate returns [`MocResult<T>`], which is
//! `Result<T, MocError>`.
//!
//! # Error Categories
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | [`Parse`](MocError::Parse) | Malformed ASCII or JSON text |
//! | [`InvalidOrder`](MocError::InvalidOrder) | HEALPix order outside `[0, 29]` |
//! | [`InvalidPixel`](MocError::InvalidPixel) | `npix >= 12·4^order` |
//! | [`InvalidPosition`](MocError::InvalidPosition) | Non-finite RA/Dec, Dec outside `[-90, 90]`, bad radius |
//! | [`OrderOutOfRange`](MocError::OrderOutOfRange) | Text order above 29, invalid limit-order window |
//! | [`InconsistentMoc`](MocError::InconsistentMoc) | Query or algebra on a MOC left dirty in relaxed mode |
//! | [`MalformedBinary`](MocError::MalformedBinary) | Corrupt or self-contradictory FITS payload |
//! | [`FrameMismatch`](MocError::FrameMismatch) | Algebra between MOCs tagged with different frames |
//! | [`Io`](MocError::Io) | Underlying reader/writer failure |
//!
//! Strict-mode consistency conflicts are never errors: they are healed on
//! insertion (the coarser cell wins).

use crate::config::Frame;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MocError {
    /// Malformed textual MOC.
    #[error("Parse error at '{token}': {message}")]
    Parse { token: String, message: String },

    /// HEALPix order outside `[0, 29]`.
    #[error("Invalid HEALPix order {order}: must be in [0, 29]")]
    InvalidOrder { order: u32 },

    /// Pixel index not valid at its order.
    #[error("Invalid pixel {npix} at order {order}: must be < {limit}")]
    InvalidPixel { order: u8, npix: u64, limit: u64 },

    /// Sky position or radius that cannot be indexed.
    #[error("Invalid position: {message}")]
    InvalidPosition { message: String },

    /// Order rejected by the limit-order window rules.
    #[error("Order out of range: {message}")]
    OrderOutOfRange { message: String },

    /// The MOC has pending relaxed-mode insertions and must be normalized first.
    #[error("Inconsistent MOC in {operation}: call check_and_fix() first")]
    InconsistentMoc { operation: String },

    /// Binary payload that cannot be decoded.
    #[error("Malformed binary MOC: {0}")]
    MalformedBinary(String),

    /// The two operands of a set operation carry different frame tags.
    #[error("Frame mismatch: {left} vs {right}")]
    FrameMismatch { left: Frame, right: Frame },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, MocError>`.
pub type MocResult<T> = Result<T, MocError>;

impl MocError {
    /// Creates a [`Parse`](Self::Parse) error for the offending token.
    pub fn parse_error(token: &str, reason: &str) -> Self {
        Self::Parse {
            token: token.to_string(),
            message: reason.to_string(),
        }
    }

    /// Creates an [`InvalidPosition`](Self::InvalidPosition) error.
    pub fn invalid_position(reason: &str) -> Self {
        Self::InvalidPosition {
            message: reason.to_string(),
        }
    }

    /// Creates an [`OrderOutOfRange`](Self::OrderOutOfRange) error.
    pub fn order_out_of_range(reason: &str) -> Self {
        Self::OrderOutOfRange {
            message: reason.to_string(),
        }
    }

    /// Creates an [`InconsistentMoc`](Self::InconsistentMoc) error.
    pub fn inconsistent(operation: &str) -> Self {
        Self::InconsistentMoc {
            operation: operation.to_string(),
        }
    }

    /// Creates a [`MalformedBinary`](Self::MalformedBinary) error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedBinary(reason.into())
    }

    /// Returns `true` for errors caused by the caller's input text or
    /// coordinates, as opposed to state or I/O failures.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::InvalidOrder { .. }
                | Self::InvalidPixel { .. }
                | Self::InvalidPosition { .. }
                | Self::OrderOutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_parse_error_display() {
        let err = MocError::parse_error("3/x", "invalid pixel number");
        assert_eq!(err.to_string(), "Parse error at '3/x': invalid pixel number");
    }

    #[test]
    fn test_invalid_order_display() {
        let err = MocError::InvalidOrder { order: 30 };
        assert_eq!(
            err.to_string(),
            "Invalid HEALPix order 30: must be in [0, 29]"
        );
    }

    #[test]
    fn test_invalid_pixel_display() {
        let err = MocError::InvalidPixel {
            order: 0,
            npix: 12,
            limit: 12,
        };
        assert!(err.to_string().contains("pixel 12 at order 0"));
    }

    #[test]
    fn test_inconsistent_display() {
        let err = MocError::inconsistent("union");
        assert!(err.to_string().contains("union"));
        assert!(err.to_string().contains("check_and_fix"));
    }

    #[test]
    fn test_frame_mismatch_display() {
        let err = MocError::FrameMismatch {
            left: Frame::Equatorial,
            right: Frame::Galactic,
        };
        assert_eq!(err.to_string(), "Frame mismatch: equatorial vs galactic");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = Error::new(ErrorKind::UnexpectedEof, "short read");
        let err: MocError = io_error.into();
        assert!(matches!(err, MocError::Io(_)));
        assert!(err.to_string().contains("short read"));
    }

    #[test]
    fn test_input_error_classification() {
        assert!(MocError::parse_error("a", "b").is_input_error());
        assert!(MocError::order_out_of_range("min > max").is_input_error());
        assert!(!MocError::inconsistent("is_in").is_input_error());
        assert!(!MocError::malformed("truncated").is_input_error());
    }

    #[test]
    fn test_send_sync() {
        fn _assert_send<T: Send>() {}
        fn _assert_sync<T: Sync>() {}
        _assert_send::<MocError>();
        _assert_sync::<MocError>();
    }
}
