//! Security primitives for an LNURL point-of-sale gateway.
//!
//! - [`hasher`] hashes and verifies the operator password with scrypt,
//!   reading both historical record layouts.
//! - [`payload`] authenticates and decrypts the `p` parameter a
//!   point-of-sale terminal sends to request an invoice.

pub mod amount;
pub mod config;
pub mod crypto;
mod error;
pub mod format;
pub mod hasher;
pub mod payload;

pub use crate::config::{ApiKey, Config, KeyEncoding};
pub use crate::crypto::ScryptOptions;
pub use crate::error::{Error, Result};
pub use crate::format::HashRecord;
pub use crate::hasher::{
    CredentialHasher, compare, compare_sync, generate_salt, hash, hash_sync,
};
pub use crate::payload::{DecryptionFailed, PosPayload, RequestSecret, decrypt, decrypt_param};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_request_end_to_end() {
        let api_key = ApiKey::new("test-key-id", "test-super-secret-key", KeyEncoding::Utf8);
        let key = api_key.secret().unwrap();
        let p = "AQhnxmlzUf9K7AW4Mepe_8ArcfITXgyU";

        let request = decrypt_param(&key, p).unwrap();
        assert_eq!(request, PosPayload { pin: 4206, amount: 21 });

        let rate: amount::ExchangeRate = "40000.00".parse().unwrap();
        assert_eq!(amount::fiat_cents_to_msats(request.amount, &rate).unwrap(), 525_000);

        let secret = RequestSecret::derive(api_key.id(), p);
        assert_eq!(secret, RequestSecret::derive("test-key-id", p));
    }

    #[tokio::test]
    async fn admin_password_rotation() {
        let hasher = CredentialHasher::new(32, 20, ScryptOptions::new(1024).unwrap()).unwrap();

        let old = hasher.create("first").await.unwrap();
        let new = hasher.create("second").await.unwrap();

        assert!(compare("first", &old).await.unwrap());
        assert!(!compare("first", &new).await.unwrap());
        assert!(compare("second", &new).await.unwrap());
    }
}
