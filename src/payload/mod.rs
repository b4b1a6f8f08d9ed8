//! Encrypted payloads from point-of-sale terminals.
//!
//! A terminal encodes a PIN and a fiat amount (in cents) into a short frame,
//! encrypts it with a keystream derived from the merchant's API key and a
//! nonce, authenticates it with HMAC-SHA256 and passes it base64url-encoded
//! as the `p` query parameter.
//!
//! [`decrypt`] reports precisely why a payload was rejected. Code answering
//! the terminal's HTTP request must use [`decrypt_param`] instead, which
//! collapses every rejection into [`DecryptionFailed`].

pub mod compact_size;
pub mod frame;
pub mod request;

pub use frame::Frame;
pub use request::RequestSecret;

use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::crypto::{MAC_LEN, ct_eq, hmac_sha256};
use crate::error::{Error, Result};

/// Domain prefix of the authentication tag input.
pub const DATA_PREFIX: &[u8] = b"Data:";
/// Domain prefix of the keystream derivation input.
pub const ROUND_SECRET_PREFIX: &[u8] = b"Round secret:";
/// Longest ciphertext one round secret can cover.
pub const MAX_DATA_LEN: usize = MAC_LEN;

/// What a terminal asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosPayload {
    pub pin: u64,
    /// Fiat amount in cents.
    pub amount: u64,
}

/// Authenticates and decrypts a payload frame.
///
/// `key` is only borrowed for the duration of the call.
///
/// # Errors
///
/// - [`Error::UnsupportedVariant`] if the frame is not variant 1
/// - [`Error::Parse`] for framing problems, data longer than 32 bytes, or a
///   plaintext too short for two integers
/// - [`Error::Integrity`] if the HMAC does not match
pub fn decrypt(key: &[u8], payload: &[u8]) -> Result<PosPayload> {
    let frame = Frame::parse(payload)?;

    let expected = hmac_sha256(key, &[DATA_PREFIX, frame.signed()])?;
    let tag = frame.tag();
    if !ct_eq(&expected[..tag.len().min(MAC_LEN)], tag) {
        return Err(Error::Integrity);
    }

    let data = frame.data();
    if data.len() > MAX_DATA_LEN {
        return Err(Error::parse(format!(
            "payload is too long for this encryption method: {} bytes, max {MAX_DATA_LEN}",
            data.len()
        )));
    }

    let round_secret = Zeroizing::new(hmac_sha256(key, &[ROUND_SECRET_PREFIX, frame.nonce()])?);
    let plaintext = Zeroizing::new(xor(data, &*round_secret));

    let mut offset = 0;
    let pin = compact_size::read(&plaintext, &mut offset)?;
    let amount = compact_size::read(&plaintext, &mut offset)?;

    Ok(PosPayload { pin, amount })
}

/// Builds an authenticated payload frame, as a terminal does.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the nonce is not 8..=32 bytes.
pub fn encrypt(key: &[u8], nonce: &[u8], payload: &PosPayload) -> Result<Vec<u8>> {
    let mut plaintext = Zeroizing::new(Vec::with_capacity(
        compact_size::encoded_len(payload.pin) + compact_size::encoded_len(payload.amount),
    ));
    compact_size::write(payload.pin, &mut plaintext);
    compact_size::write(payload.amount, &mut plaintext);

    let round_secret = Zeroizing::new(hmac_sha256(key, &[ROUND_SECRET_PREFIX, nonce])?);
    let data = xor(&plaintext, &*round_secret);

    let mut buf = frame::build(nonce, &data)?;
    let tag = hmac_sha256(key, &[DATA_PREFIX, &buf])?;
    buf.extend_from_slice(&tag[..frame::DEFAULT_TAG_LEN]);
    Ok(buf)
}

fn xor(data: &[u8], keystream: &[u8]) -> Vec<u8> {
    data.iter().zip(keystream).map(|(d, k)| d ^ k).collect()
}

const PARAM_DECODER: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decodes the `p` query parameter.
///
/// Accepts the URL-safe and the standard base64 alphabet, padded or not,
/// and ignores non-zero trailing bits.
pub fn decode_param(p: &str) -> Result<Vec<u8>> {
    let normalized: String = p
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    PARAM_DECODER
        .decode(normalized)
        .map_err(|e| Error::parse(format!("payload is not valid base64: {e}")))
}

/// Encodes a payload frame for use as the `p` query parameter.
pub fn encode_param(payload: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(payload)
}

/// The only failure a payload sender ever gets to see.
#[derive(Debug, Error)]
#[error("Invalid query parameter (\"p\"): Failed decryption")]
pub struct DecryptionFailed;

/// Decodes and decrypts a `p` query parameter for an HTTP response.
///
/// Why decryption failed is logged at debug level and otherwise discarded,
/// so the sender cannot tell a malformed frame from a bad HMAC.
pub fn decrypt_param(key: &[u8], p: &str) -> std::result::Result<PosPayload, DecryptionFailed> {
    decode_param(p)
        .and_then(|payload| decrypt(key, &payload))
        .map_err(|e| {
            debug!("rejected pos payload ({}): {e}", e.kind());
            DecryptionFailed
        })
}
