//! Compact-size unsigned integers.
//!
//! A byte below `0xFD` is the value itself. `0xFD`, `0xFE` and `0xFF` select
//! a 2, 4 or 8 byte little-endian value that follows.

use crate::error::{Error, Result};

/// Selector for a 2 byte value.
pub const SELECTOR_U16: u8 = 0xFD;
/// Selector for a 4 byte value.
pub const SELECTOR_U32: u8 = 0xFE;
/// Selector for an 8 byte value.
pub const SELECTOR_U64: u8 = 0xFF;

/// Reads one integer at `*offset` and advances the cursor past it.
///
/// The cursor is left untouched on error.
pub fn read(buf: &[u8], offset: &mut usize) -> Result<u64> {
    let mut pos = *offset;

    let selector = *buf
        .get(pos)
        .ok_or_else(|| Error::parse("missing compact-size selector"))?;
    pos += 1;

    let value = if selector < SELECTOR_U16 {
        u64::from(selector)
    } else {
        let width = 1usize << (selector - 0xFC);
        let bytes = pos
            .checked_add(width)
            .and_then(|end| buf.get(pos..end))
            .ok_or_else(|| {
                Error::parse(format!(
                    "compact-size needs {width} bytes, {} left",
                    buf.len().saturating_sub(pos)
                ))
            })?;
        pos += width;

        let mut le = [0u8; 8];
        le[..width].copy_from_slice(bytes);
        u64::from_le_bytes(le)
    };

    *offset = pos;
    Ok(value)
}

/// Appends the shortest encoding of `value`.
pub fn write(value: u64, out: &mut Vec<u8>) {
    if value < u64::from(SELECTOR_U16) {
        out.push(value as u8);
    } else if let Ok(v) = u16::try_from(value) {
        out.push(SELECTOR_U16);
        out.extend_from_slice(&v.to_le_bytes());
    } else if let Ok(v) = u32::try_from(value) {
        out.push(SELECTOR_U32);
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        out.push(SELECTOR_U64);
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Number of bytes [`write`] produces for `value`.
pub fn encoded_len(value: u64) -> usize {
    match value {
        v if v < u64::from(SELECTOR_U16) => 1,
        v if v <= u64::from(u16::MAX) => 3,
        v if v <= u64::from(u32::MAX) => 5,
        _ => 9,
    }
}
