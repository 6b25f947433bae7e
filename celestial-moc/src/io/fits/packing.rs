//! Delta/varint packing of sorted ranges.
//!
//! Each range is stored as two unsigned LEB128 varints: the gap since the end
//! of the previous range (from 0 for the first one) and the range length.

use crate::errors::{MocError, MocResult};
use std::ops::Range;

const MAX_VARINT_BYTES: usize = 10;

pub(crate) fn encode_ranges(ranges: &[Range<u64>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ranges.len() * 4);
    let mut previous_end = 0;
    for range in ranges {
        write_varint(&mut out, range.start - previous_end);
        write_varint(&mut out, range.end - range.start);
        previous_end = range.end;
    }
    out
}

/// Decodes exactly `n_ranges` ranges spanning all of `bytes`.
pub(crate) fn decode_ranges(bytes: &[u8], n_ranges: usize) -> MocResult<Vec<Range<u64>>> {
    let mut ranges = Vec::with_capacity(n_ranges.min(bytes.len() / 2));
    let mut pos = 0;
    let mut previous_end = 0u64;
    for _ in 0..n_ranges {
        let gap = read_varint(bytes, &mut pos)?;
        let len = read_varint(bytes, &mut pos)?;
        if len == 0 {
            return Err(MocError::malformed("empty range in packed data"));
        }
        let start = previous_end
            .checked_add(gap)
            .ok_or_else(|| MocError::malformed("packed range overflows"))?;
        let end = start
            .checked_add(len)
            .ok_or_else(|| MocError::malformed("packed range overflows"))?;
        ranges.push(start..end);
        previous_end = end;
    }
    if pos != bytes.len() {
        return Err(MocError::malformed(format!(
            "{} trailing bytes after {} packed ranges",
            bytes.len() - pos,
            n_ranges
        )));
    }
    Ok(ranges)
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn read_varint(bytes: &[u8], pos: &mut usize) -> MocResult<u64> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_BYTES {
        let byte = *bytes
            .get(*pos)
            .ok_or_else(|| MocError::malformed("truncated packed ranges"))?;
        *pos += 1;
        let bits = (byte & 0x7f) as u64;
        if i == MAX_VARINT_BYTES - 1 && bits > 1 {
            return Err(MocError::malformed("varint exceeds 64 bits"));
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(MocError::malformed("varint exceeds 64 bits"))
}
