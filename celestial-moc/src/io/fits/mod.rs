//! Binary MOC serialization in FITS layout.
//!
//! | HDU | Content |
//! |-----|---------|
//! | Primary | `SIMPLE`, `BITPIX = 8`, `NAXIS = 0`, `EXTEND`, `COORDSYS`, `MOCORDER`, `MINORDER`, `MAXORDER`, `NORDERS` |
//! | `BINTABLE` × `NORDERS` | One per non-empty order: `ORDER`, `COMPRESS`, `NRANGES` |
//!
//! Uncompressed tables carry two big-endian `1K` columns `NPIX_START` and
//! `NPIX_END` (exclusive), one row per range. Compressed tables carry one
//! `1B` column `RANGES` holding the varint stream of [`packing`], one row per
//! byte. Headers are padded with spaces and data with zeros to 2880 bytes.

mod header;
mod packing;

use crate::config::{validate_limits, Frame, MocConfig};
use crate::constants::{MAX_ORDER, N_ORDERS};
use crate::errors::{MocError, MocResult};
use crate::healpix::npix;
use crate::moc::Moc;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use header::{pad_block, Header, Keyword, FITS_BLOCK_SIZE};
use std::io::{Read, Write};
use std::ops::Range;
use tracing::debug;

const EXTNAME: &str = "MOC_ORDER";
const RANGE_ROW_BYTES: i64 = 16;

/// Writes MOCs as a primary HDU plus one binary table per order.
pub struct FitsMocWriter<W> {
    writer: W,
    compressed: bool,
}

impl<W: Write> FitsMocWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            compressed: false,
        }
    }

    /// Use the delta/varint packed `RANGES` column.
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    pub fn write(&mut self, moc: &Moc) -> MocResult<()> {
        let moc = moc.normalized();
        let orders: Vec<u8> = (0..=MAX_ORDER)
            .filter(|&order| !moc.level(order).is_empty())
            .collect();

        self.write_primary_header(&moc, orders.len())?;
        for &order in &orders {
            self.write_order(order, moc.level(order).as_slice())?;
        }
        self.writer.flush()?;
        debug!(
            "wrote FITS MOC: {} orders, compressed={}",
            orders.len(),
            self.compressed
        );
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_primary_header(&mut self, moc: &Moc, n_orders: usize) -> MocResult<()> {
        let mut header = Header::new();
        header.add_keyword(Keyword::logical("SIMPLE", true));
        header.add_keyword(Keyword::integer("BITPIX", 8));
        header.add_keyword(Keyword::integer("NAXIS", 0));
        header.add_keyword(Keyword::logical("EXTEND", true));
        header.add_keyword(
            Keyword::string("COORDSYS", moc.frame().code()).with_comment(moc.frame().as_str()),
        );
        header.add_keyword(
            Keyword::integer("MOCORDER", moc.max_order().unwrap_or(0) as i64)
                .with_comment("Deepest stored order"),
        );
        header.add_keyword(Keyword::integer("MINORDER", moc.min_limit_order() as i64));
        header.add_keyword(Keyword::integer("MAXORDER", moc.max_limit_order() as i64));
        header.add_keyword(Keyword::integer("NORDERS", n_orders as i64));
        header.write_to(&mut self.writer)
    }

    fn write_order(&mut self, order: u8, ranges: &[Range<u64>]) -> MocResult<()> {
        let mut header = Header::new();
        header.add_keyword(Keyword::string("XTENSION", "BINTABLE"));
        header.add_keyword(Keyword::integer("BITPIX", 8));
        header.add_keyword(Keyword::integer("NAXIS", 2));

        let mut data = if self.compressed {
            let packed = packing::encode_ranges(ranges);
            header.add_keyword(Keyword::integer("NAXIS1", 1));
            header.add_keyword(Keyword::integer("NAXIS2", packed.len() as i64));
            header.add_keyword(Keyword::integer("PCOUNT", 0));
            header.add_keyword(Keyword::integer("GCOUNT", 1));
            header.add_keyword(Keyword::integer("TFIELDS", 1));
            header.add_keyword(Keyword::string("TTYPE1", "RANGES"));
            header.add_keyword(Keyword::string("TFORM1", "1B"));
            packed
        } else {
            let mut rows = Vec::with_capacity(ranges.len() * RANGE_ROW_BYTES as usize);
            for range in ranges {
                rows.write_i64::<BigEndian>(range.start as i64)?;
                rows.write_i64::<BigEndian>(range.end as i64)?;
            }
            header.add_keyword(Keyword::integer("NAXIS1", RANGE_ROW_BYTES));
            header.add_keyword(Keyword::integer("NAXIS2", ranges.len() as i64));
            header.add_keyword(Keyword::integer("PCOUNT", 0));
            header.add_keyword(Keyword::integer("GCOUNT", 1));
            header.add_keyword(Keyword::integer("TFIELDS", 2));
            header.add_keyword(Keyword::string("TTYPE1", "NPIX_START"));
            header.add_keyword(Keyword::string("TFORM1", "1K"));
            header.add_keyword(Keyword::string("TTYPE2", "NPIX_END"));
            header.add_keyword(Keyword::string("TFORM2", "1K"));
            rows
        };
        header.add_keyword(Keyword::string("EXTNAME", EXTNAME));
        header.add_keyword(Keyword::integer("ORDER", order as i64));
        header.add_keyword(Keyword::logical("COMPRESS", self.compressed));
        header.add_keyword(Keyword::integer("NRANGES", ranges.len() as i64));
        header.write_to(&mut self.writer)?;

        pad_block(&mut data, 0);
        self.writer.write_all(&data)?;
        Ok(())
    }
}

/// Reads MOCs written by [`FitsMocWriter`], compressed or not.
pub struct FitsMocReader<R> {
    reader: R,
}

/// Primary-HDU metadata.
struct PrimaryInfo {
    config: MocConfig,
    n_orders: usize,
}

impl<R: Read> FitsMocReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn read(&mut self) -> MocResult<Moc> {
        let primary = self.read_primary_header()?;
        let mut entries = Vec::new();
        for _ in 0..primary.n_orders {
            let (order, ranges) = self.read_order()?;
            entries.extend(ranges.into_iter().map(|range| (order, range)));
        }
        debug!(
            "read FITS MOC: {} orders, {} ranges",
            primary.n_orders,
            entries.len()
        );

        let mut moc = Moc::with_config(&primary.config)?;
        moc.insert_entries(entries);
        Ok(moc)
    }

    fn read_primary_header(&mut self) -> MocResult<PrimaryInfo> {
        let header = Header::read_from(&mut self.reader)?;
        if header.logical("SIMPLE")? != Some(true) {
            return Err(MocError::malformed("primary HDU must start with SIMPLE = T"));
        }
        if header.require_integer("NAXIS")? != 0 {
            return Err(MocError::malformed("primary HDU must have NAXIS = 0"));
        }

        let frame = match header.string("COORDSYS") {
            None => Frame::default(),
            Some(code) => Frame::from_code(code)
                .ok_or_else(|| MocError::malformed(format!("unknown COORDSYS '{code}'")))?,
        };
        let min = order_keyword(&header, "MINORDER")?.unwrap_or(0);
        let max = order_keyword(&header, "MAXORDER")?.unwrap_or(MAX_ORDER);
        validate_limits(min, max).map_err(|e| MocError::malformed(e.to_string()))?;

        let n_orders = header.require_integer("NORDERS")?;
        if !(0..=N_ORDERS as i64).contains(&n_orders) {
            return Err(MocError::malformed(format!("NORDERS = {n_orders}")));
        }

        Ok(PrimaryInfo {
            config: MocConfig {
                min_limit_order: min,
                max_limit_order: max,
                frame,
                check_consistency: true,
            },
            n_orders: n_orders as usize,
        })
    }

    fn read_order(&mut self) -> MocResult<(u8, Vec<Range<u64>>)> {
        let header = Header::read_from(&mut self.reader)?;
        match header.string("XTENSION") {
            Some("BINTABLE") => {}
            Some(other) => {
                return Err(MocError::malformed(format!("unexpected extension '{other}'")))
            }
            None => return Err(MocError::malformed("missing XTENSION keyword")),
        }
        let order = order_keyword(&header, "ORDER")?
            .ok_or_else(|| MocError::malformed("missing ORDER keyword"))?;
        let compressed = header.logical("COMPRESS")?.unwrap_or(false);
        let n_ranges = header.require_integer("NRANGES")?;
        let row_bytes = header.require_integer("NAXIS1")?;
        let n_rows = header.require_integer("NAXIS2")?;
        let n_fields = header.require_integer("TFIELDS")?;
        if n_ranges < 0 || n_rows < 0 {
            return Err(MocError::malformed("negative table size"));
        }

        let too_large = || MocError::malformed("table size overflows");
        let n_ranges = usize::try_from(n_ranges).map_err(|_| too_large())?;
        let n_rows = usize::try_from(n_rows).map_err(|_| too_large())?;

        let ranges = if compressed {
            expect_layout(&header, n_fields == 1 && row_bytes == 1, &[("TFORM1", "1B")])?;
            let bytes = self.read_data(n_rows)?;
            packing::decode_ranges(&bytes, n_ranges)?
        } else {
            expect_layout(
                &header,
                n_fields == 2 && row_bytes == RANGE_ROW_BYTES && n_rows == n_ranges,
                &[("TFORM1", "1K"), ("TFORM2", "1K")],
            )?;
            let len = n_rows
                .checked_mul(RANGE_ROW_BYTES as usize)
                .ok_or_else(too_large)?;
            let bytes = self.read_data(len)?;
            let mut cursor = bytes.as_slice();
            let mut ranges = Vec::with_capacity(n_rows.min(bytes.len() / RANGE_ROW_BYTES as usize));
            for _ in 0..n_rows {
                let start = cursor.read_i64::<BigEndian>()?;
                let end = cursor.read_i64::<BigEndian>()?;
                if start < 0 || end < 0 {
                    return Err(MocError::malformed("negative pixel index"));
                }
                ranges.push(start as u64..end as u64);
            }
            ranges
        };

        validate_ranges(order, &ranges)?;
        Ok((order, ranges))
    }

    /// Reads `len` data bytes and the zero padding that follows them.
    fn read_data(&mut self, len: usize) -> MocResult<Vec<u8>> {
        let padded = len
            .div_ceil(FITS_BLOCK_SIZE)
            .checked_mul(FITS_BLOCK_SIZE)
            .ok_or_else(|| MocError::malformed("table size overflows"))?;
        let mut bytes = Vec::new();
        (&mut self.reader)
            .take(padded as u64)
            .read_to_end(&mut bytes)?;
        if bytes.len() < padded {
            return Err(MocError::malformed("truncated table data"));
        }
        bytes.truncate(len);
        Ok(bytes)
    }
}

fn order_keyword(header: &Header, name: &str) -> MocResult<Option<u8>> {
    match header.integer(name)? {
        None => Ok(None),
        Some(value) if (0..=MAX_ORDER as i64).contains(&value) => Ok(Some(value as u8)),
        Some(value) => Err(MocError::malformed(format!(
            "{name} = {value} outside [0, {MAX_ORDER}]"
        ))),
    }
}

fn expect_layout(header: &Header, shape_ok: bool, forms: &[(&str, &str)]) -> MocResult<()> {
    let forms_ok = forms
        .iter()
        .all(|(name, form)| header.string(name) == Some(*form));
    if !shape_ok || !forms_ok {
        return Err(MocError::malformed(
            "column layout inconsistent with declared counts",
        ));
    }
    Ok(())
}

/// Ranges must be non-empty, sorted, disjoint and inside the order.
fn validate_ranges(order: u8, ranges: &[Range<u64>]) -> MocResult<()> {
    let limit = npix(order);
    let mut previous_end = 0;
    for (i, range) in ranges.iter().enumerate() {
        if range.start >= range.end {
            return Err(MocError::malformed(format!(
                "empty range {}..{} at order {order}",
                range.start, range.end
            )));
        }
        if i > 0 && range.start < previous_end {
            return Err(MocError::malformed(format!("unsorted ranges at order {order}")));
        }
        if range.end > limit {
            return Err(MocError::malformed(format!(
                "range end {} exceeds {limit} at order {order}",
                range.end
            )));
        }
        previous_end = range.end;
    }
    Ok(())
}

pub fn write_fits<W: Write>(moc: &Moc, writer: W, compressed: bool) -> MocResult<()> {
    FitsMocWriter::new(writer).compressed(compressed).write(moc)
}

pub fn read_fits<R: Read>(reader: R) -> MocResult<Moc> {
    FitsMocReader::new(reader).read()
}
