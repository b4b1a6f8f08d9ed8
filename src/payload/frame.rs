//! Binary frame carried by point-of-sale payloads.
//!
//! Variant 1 frame:
//! ```text
//! VARIANT (1) | NONCE_LEN (1) | NONCE (8..=32) | DATA_LEN (1) | DATA | HMAC (>= 8)
//! ```
//! The HMAC covers every byte before it.

use crate::error::{Error, Result};

/// The only implemented variant.
pub const VARIANT_XOR: u8 = 1;
pub const MIN_NONCE_LEN: usize = 8;
pub const MAX_NONCE_LEN: usize = 32;
/// Shortest accepted HMAC tag.
pub const MIN_TAG_LEN: usize = 8;
/// Tag length written by [`crate::payload::encrypt`].
pub const DEFAULT_TAG_LEN: usize = 8;

#[derive(Debug)]
pub struct Frame<'a> {
    variant: u8,
    nonce: &'a [u8],
    data: &'a [u8],
    tag: &'a [u8],
    signed: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Splits a payload into its fields without authenticating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVariant`] for any variant but 1, and
    /// [`Error::Parse`] if the nonce length is outside `8..=32`, the buffer
    /// is truncated, or fewer than 8 tag bytes remain.
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let mut offset = 0;

        let variant = take_byte(payload, &mut offset, "variant")?;
        if variant != VARIANT_XOR {
            return Err(Error::UnsupportedVariant(variant));
        }

        let nonce_len = usize::from(take_byte(payload, &mut offset, "nonce length")?);
        if !(MIN_NONCE_LEN..=MAX_NONCE_LEN).contains(&nonce_len) {
            return Err(Error::parse(format!(
                "nonce length {nonce_len} outside {MIN_NONCE_LEN}..={MAX_NONCE_LEN}"
            )));
        }
        let nonce = take(payload, &mut offset, nonce_len, "nonce")?;

        let data_len = usize::from(take_byte(payload, &mut offset, "data length")?);
        let data = take(payload, &mut offset, data_len, "data")?;

        let tag = &payload[offset..];
        if tag.len() < MIN_TAG_LEN {
            return Err(Error::parse(format!(
                "hmac is too short: {} bytes, need at least {MIN_TAG_LEN}",
                tag.len()
            )));
        }

        Ok(Self {
            variant,
            nonce,
            data,
            tag,
            signed: &payload[..offset],
        })
    }

    pub fn variant(&self) -> u8 {
        self.variant
    }

    pub fn nonce(&self) -> &'a [u8] {
        self.nonce
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn tag(&self) -> &'a [u8] {
        self.tag
    }

    /// Every byte preceding the tag.
    pub fn signed(&self) -> &'a [u8] {
        self.signed
    }
}

/// Writes the unsigned part of a variant 1 frame. The caller appends the tag.
pub fn build(nonce: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if !(MIN_NONCE_LEN..=MAX_NONCE_LEN).contains(&nonce.len()) {
        return Err(Error::validation(format!(
            "nonce must be {MIN_NONCE_LEN}..={MAX_NONCE_LEN} bytes, got {}",
            nonce.len()
        )));
    }
    let data_len = u8::try_from(data.len())
        .map_err(|_| Error::validation(format!("data too long: {} bytes", data.len())))?;

    let mut buf = Vec::with_capacity(3 + nonce.len() + data.len() + DEFAULT_TAG_LEN);
    buf.push(VARIANT_XOR);
    buf.push(nonce.len() as u8);
    buf.extend_from_slice(nonce);
    buf.push(data_len);
    buf.extend_from_slice(data);
    Ok(buf)
}

fn take_byte(buf: &[u8], offset: &mut usize, what: &str) -> Result<u8> {
    let byte = *buf
        .get(*offset)
        .ok_or_else(|| Error::parse(format!("missing {what} byte")))?;
    *offset += 1;
    Ok(byte)
}

fn take<'a>(buf: &'a [u8], offset: &mut usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let bytes = buf.get(*offset..*offset + len).ok_or_else(|| {
        Error::parse(format!(
            "missing {what} bytes: need {len}, {} left",
            buf.len().saturating_sub(*offset)
        ))
    })?;
    *offset += len;
    Ok(bytes)
}
