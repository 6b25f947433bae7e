//! MOC serialization: ASCII, JSON and FITS.
//!
//! [`MocFormat`] picks the encoding from a file extension or from the first
//! bytes of a stream. Compressed and uncompressed FITS share one reader; the
//! per-order `COMPRESS` card selects the data layout.

pub mod fits;
pub mod text;

use crate::errors::{MocError, MocResult};
use crate::moc::Moc;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

pub use fits::{read_fits, write_fits, FitsMocReader, FitsMocWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MocFormat {
    Ascii,
    Json,
    Fits,
    /// FITS with delta/varint packed ranges.
    FitsCompressed,
}

impl MocFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "txt" | "ascii" | "moc" => Some(Self::Ascii),
            "json" => Some(Self::Json),
            "fits" | "fit" | "fts" => Some(Self::Fits),
            _ => None,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// FITS for a `SIMPLE` card, JSON for a leading `{`, ASCII otherwise.
    pub fn from_magic_bytes(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"SIMPLE  ") {
            return Self::Fits;
        }
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::Json,
            _ => Self::Ascii,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Ascii => "txt",
            Self::Json => "json",
            Self::Fits | Self::FitsCompressed => "fits",
        }
    }

    pub fn is_fits(&self) -> bool {
        matches!(self, Self::Fits | Self::FitsCompressed)
    }
}

/// Reads a MOC from `reader`. The result is canonical in the default
/// configuration, or in the window stored in a FITS header.
pub fn read<R: Read>(mut reader: R, format: MocFormat) -> MocResult<Moc> {
    if format.is_fits() {
        return read_fits(reader);
    }
    let mut input = String::new();
    reader.read_to_string(&mut input).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            MocError::parse_error("<input>", "text MOC is not valid UTF-8")
        } else {
            MocError::Io(e)
        }
    })?;
    Moc::from_text(&input)
}

pub fn write<W: Write>(moc: &Moc, mut writer: W, format: MocFormat) -> MocResult<()> {
    match format {
        MocFormat::Ascii => writeln!(writer, "{}", moc.to_ascii())?,
        MocFormat::Json => writeln!(writer, "{}", moc.to_json())?,
        MocFormat::Fits => write_fits(moc, &mut writer, false)?,
        MocFormat::FitsCompressed => write_fits(moc, &mut writer, true)?,
    }
    writer.flush()?;
    Ok(())
}

/// Reads a MOC file, detecting the format from its first bytes when `format`
/// is `None`.
pub fn read_file(path: impl AsRef<Path>, format: Option<MocFormat>) -> MocResult<Moc> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let mut head = Vec::with_capacity(8);
    if format.is_none() {
        (&mut reader).take(8).read_to_end(&mut head)?;
    }
    let format = format.unwrap_or_else(|| MocFormat::from_magic_bytes(&head));
    let moc = read(head.as_slice().chain(reader), format)?;
    debug!(path = %path.display(), ?format, cells = moc.n_cells(), "read MOC file");
    Ok(moc)
}

pub fn write_file(moc: &Moc, path: impl AsRef<Path>, format: MocFormat) -> MocResult<()> {
    let path = path.as_ref();
    write(moc, BufWriter::new(File::create(path)?), format)?;
    debug!(path = %path.display(), ?format, cells = moc.n_cells(), "wrote MOC file");
    Ok(())
}
