//! Cryptographic primitives shared by the credential hasher and the payload
//! codec.
//!
//! Provides secure randomness, HMAC-SHA256 and constant-time comparison.

pub mod kdf;

pub use kdf::{ScryptOptions, derive_key};

use crate::error::{Error, Result};
use getrandom::fill;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Length of an HMAC-SHA256 output (32 bytes).
pub const MAC_LEN: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Fill buffer with cryptographically secure random bytes
pub(crate) fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|e| Error::computation(format!("OS random generator unavailable: {e}")))
}

/// Returns `num_bytes` cryptographically secure random bytes.
pub fn random_bytes(num_bytes: usize) -> Result<Vec<u8>> {
    if num_bytes == 0 {
        return Err(Error::validation("byte count must be a positive integer"));
    }
    let mut buf = vec![0u8; num_bytes];
    secure_random(&mut buf)?;
    Ok(buf)
}

/// HMAC-SHA256 over the concatenation of `parts`.
pub fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; MAC_LEN]> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| Error::validation(format!("unusable hmac key: {e}")))?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// Compares two byte strings without short-circuiting on the first
/// differing byte. Lengths are not treated as secret.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
