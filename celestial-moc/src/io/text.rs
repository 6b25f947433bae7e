//! Textual MOC forms.
//!
//! - JSON: `{ "3":[1,3,4,9], "4":[30,31] }`, `{ }` when empty
//! - ASCII: `3/1,3-4,9 4/30-31`
//!
//! The ASCII reader accepts whitespace, `,` and `;` as separators. A bare
//! pixel number reuses the last order seen and `3/` alone names an order
//! without cells.

use crate::constants::MAX_ORDER;
use crate::errors::{MocError, MocResult};
use crate::healpix::npix;
use crate::moc::Moc;
use crate::ranges::RangeSet;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::ops::Range;

/// Validated `(order, pixel range)` entries of a textual MOC, in either form.
pub(crate) fn parse_cells(input: &str) -> MocResult<Vec<(u8, Range<u64>)>> {
    if input.trim_start().starts_with('{') {
        parse_json(input)
    } else {
        parse_ascii(input)
    }
}

fn parse_json(input: &str) -> MocResult<Vec<(u8, Range<u64>)>> {
    let map: BTreeMap<String, Vec<u64>> = serde_json::from_str(input)
        .map_err(|e| MocError::parse_error(input.trim(), &e.to_string()))?;

    let mut entries = Vec::new();
    for (key, pixels) in &map {
        let order = parse_order(key.trim(), key)?;
        for &npix_value in pixels {
            check_pixel(order, npix_value)?;
            entries.push((order, npix_value..npix_value + 1));
        }
    }
    Ok(entries)
}

fn parse_ascii(input: &str) -> MocResult<Vec<(u8, Range<u64>)>> {
    let mut entries = Vec::new();
    let mut current: Option<u8> = None;

    let tokens = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|t| !t.is_empty());
    for token in tokens {
        let body = match token.split_once('/') {
            Some((order_text, rest)) => {
                current = Some(parse_order(order_text, token)?);
                if rest.is_empty() {
                    continue;
                }
                rest
            }
            None => token,
        };
        let order = current.ok_or_else(|| MocError::parse_error(token, "pixel before any order"))?;
        entries.push((order, parse_pixels(order, body, token)?));
    }
    Ok(entries)
}

fn parse_order(text: &str, token: &str) -> MocResult<u8> {
    let order: u32 = text
        .parse()
        .map_err(|_| MocError::parse_error(token, "invalid order"))?;
    if order > MAX_ORDER as u32 {
        return Err(MocError::order_out_of_range(&format!(
            "order {order} in '{token}' exceeds {MAX_ORDER}"
        )));
    }
    Ok(order as u8)
}

/// `a` or the inclusive range `a-b`.
fn parse_pixels(order: u8, body: &str, token: &str) -> MocResult<Range<u64>> {
    let parse = |s: &str| {
        s.parse::<u64>()
            .map_err(|_| MocError::parse_error(token, "invalid pixel number"))
    };
    let (first, last) = match body.split_once('-') {
        Some((a, b)) => (parse(a)?, parse(b)?),
        None => {
            let v = parse(body)?;
            (v, v)
        }
    };
    if first > last {
        return Err(MocError::parse_error(token, "descending pixel range"));
    }
    check_pixel(order, last)?;
    Ok(first..last + 1)
}

fn check_pixel(order: u8, npix_value: u64) -> MocResult<()> {
    let limit = npix(order);
    if npix_value >= limit {
        return Err(MocError::InvalidPixel {
            order,
            npix: npix_value,
            limit,
        });
    }
    Ok(())
}

/// JSON form of the canonical cells.
pub(crate) fn to_json(moc: &Moc) -> String {
    let moc = moc.normalized();
    let orders: Vec<String> = (0..=MAX_ORDER)
        .filter(|&order| !moc.level(order).is_empty())
        .map(|order| {
            let pixels: Vec<String> = moc.level(order).values().map(|p| p.to_string()).collect();
            format!("\"{}\":[{}]", order, pixels.join(","))
        })
        .collect();
    if orders.is_empty() {
        "{ }".to_string()
    } else {
        format!("{{ {} }}", orders.join(", "))
    }
}

/// ASCII form of the canonical cells, ranges collapsed to `a-b`.
pub(crate) fn to_ascii(moc: &Moc) -> String {
    let moc = moc.normalized();
    (0..=MAX_ORDER)
        .filter(|&order| !moc.level(order).is_empty())
        .map(|order| format!("{}/{}", order, ascii_ranges(moc.level(order))))
        .collect::<Vec<_>>()
        .join(" ")
}

fn ascii_ranges(level: &RangeSet) -> String {
    level
        .iter()
        .map(|r| {
            if r.end - r.start == 1 {
                r.start.to_string()
            } else {
                format!("{}-{}", r.start, r.end - 1)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Multi-line dump of the stored state, buffered insertions included.
pub(crate) fn to_debug_string(moc: &Moc) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "MOC frame={} window=[{}, {}] strict={} consistent={}",
        moc.frame(),
        moc.min_limit_order(),
        moc.max_limit_order(),
        moc.check_consistency(),
        moc.is_consistent()
    );
    let deepest = moc
        .max_order()
        .map_or_else(|| "-".to_string(), |o| o.to_string());
    let _ = writeln!(
        out,
        "  cells={} deepest={} size={} coverage={:.6e}",
        moc.n_cells(),
        deepest,
        moc.size(),
        moc.coverage()
    );
    for order in 0..=MAX_ORDER {
        let level = moc.level(order);
        if !level.is_empty() {
            let _ = writeln!(
                out,
                "  {:>2}: {} cells in {} ranges: {}",
                order,
                level.count(),
                level.n_ranges(),
                ascii_ranges(level)
            );
        }
    }
    out
}
