//! HEALPix Multi-Order Coverage maps.
//!
//! A MOC describes an arbitrary region of the sky as a set of HEALPix NESTED
//! cells of mixed orders (0 to 29). The set is kept in a canonical form: no
//! cell is stored together with one of its ancestors and no four siblings
//! are stored in place of their parent. Two MOCs covering the same area
//! therefore compare equal.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`moc`] | [`Moc`] storage, insertion, normalization, set algebra, hierarchy and cone queries |
//! | [`ranges`] | [`RangeSet`]: sorted disjoint half-open `u64` ranges |
//! | [`cell`] | [`Cell`] `(order, npix)` with parent/child navigation and NUNIQ packing |
//! | [`healpix`] | NESTED/RING indexing, sky position to pixel, pixel centers, neighbours |
//! | [`io`] | ASCII, JSON and FITS (plain or packed) serialization, [`MocFormat`] |
//! | [`config`] | [`MocConfig`] limit-order window, [`Frame`] tag and strict/relaxed mode |
//! | [`errors`] | [`MocError`], [`MocResult`] |
//!
//! # Quick Start
//!
//! ```
//! use celestial_moc::Moc;
//!
//! let a: Moc = "3/1,3-4,9 4/30-31".parse()?;
//! let b: Moc = r#"{ "3":[3,6,10], "4":[23,28,29], "5":[65] }"#.parse()?;
//!
//! let common = a.intersection(&b)?;
//! assert_eq!(common.to_string(), r#"{ "3":[3], "5":[65] }"#);
//! assert!(a.is_in(4, 13)?);
//! # Ok::<(), celestial_moc::MocError>(())
//! ```
//!
//! # Consistency Modes
//!
//! In strict mode (the default) every insertion keeps the MOC canonical. In
//! relaxed mode insertions are buffered and [`Moc::check_and_fix`] must run
//! before queries or algebra, which otherwise fail with
//! [`MocError::InconsistentMoc`].
//!
//! # Features
//!
//! - **`cli`**: enables the `moc` binary for inspecting, converting and
//!   combining MOC files from the command line.

pub mod cell;
pub mod config;
pub mod constants;
pub mod errors;
pub mod healpix;
pub mod io;
pub mod moc;
pub mod ranges;

pub use cell::Cell;
pub use config::{Frame, MocConfig};
pub use errors::{MocError, MocResult};
pub use io::MocFormat;
pub use moc::Moc;
pub use ranges::RangeSet;
