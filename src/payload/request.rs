use sha2::{Digest, Sha256};

/// Identifiers for the single-use payment request minted from one payload.
///
/// The same API key id and `p` value always yield the same pair, so a
/// replayed request finds the already-issued invoice instead of a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSecret {
    secret: String,
    hash: String,
}

impl RequestSecret {
    pub fn derive(api_key_id: &str, p: &str) -> Self {
        let secret = Sha256::digest(format!("{api_key_id}-{p}").as_bytes());
        let hash = Sha256::digest(secret);
        Self {
            secret: hex::encode(secret),
            hash: hex::encode(hash),
        }
    }

    /// Hex secret handed to the payer in the callback URL.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Hex lookup key under which the request is stored.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}
