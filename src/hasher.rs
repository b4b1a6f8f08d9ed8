//! Password hashing for the operator credential.
//!
//! Hashes are portable text records (see [`crate::format`]). The async
//! variants run the key derivation on tokio's blocking pool so an expensive
//! cost factor never stalls unrelated tasks.

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::task::{JoinError, spawn_blocking};
use zeroize::Zeroizing;

use crate::crypto::{self, ScryptOptions, derive_key};
use crate::error::{Error, Result};
use crate::format::{self, HashRecord};

/// Derived key length used when none is configured.
pub const DEFAULT_KEYLEN: usize = 32;
/// Salt length used when none is configured.
pub const DEFAULT_SALT_BYTES: usize = 20;

/// Returns `num_bytes` cryptographically secure random bytes.
pub fn generate_salt(num_bytes: usize) -> Result<Vec<u8>> {
    crypto::random_bytes(num_bytes)
}

/// Hashes `secret` and serializes the result as a canonical record.
///
/// Blocks the calling thread for the whole derivation.
pub fn hash_sync(
    secret: impl AsRef<[u8]>,
    salt: impl AsRef<[u8]>,
    keylen: usize,
    options: Option<ScryptOptions>,
) -> Result<String> {
    let options = options.unwrap_or_default();
    let salt = salt.as_ref();
    let derived_key = derive_key(secret.as_ref(), salt, keylen, options)?;
    Ok(HashRecord::new(salt.to_vec(), options.cost(), derived_key).to_string())
}

/// Async counterpart of [`hash_sync`].
pub async fn hash(
    secret: impl AsRef<[u8]>,
    salt: impl AsRef<[u8]>,
    keylen: usize,
    options: Option<ScryptOptions>,
) -> Result<String> {
    let secret = Zeroizing::new(secret.as_ref().to_vec());
    let salt = salt.as_ref().to_vec();
    spawn_blocking(move || hash_sync(&*secret, salt, keylen, options))
        .await
        .map_err(join_failed)?
}

/// Checks `secret` against a stored record in either layout.
///
/// The stored record is normalized to the canonical layout and compared to
/// a freshly computed one in constant time.
///
/// # Errors
///
/// Returns an error if the record cannot be parsed or the derivation fails.
/// A wrong secret is `Ok(false)`, not an error.
pub fn compare_sync(secret: impl AsRef<[u8]>, record: &str) -> Result<bool> {
    let parsed = format::parse(record)?;
    debug!(
        "comparing against {:?} record, cost {}",
        parsed.layout(),
        parsed.cost()
    );
    let stored = parsed.to_canonical();
    let fresh = hash_sync(
        secret,
        stored.salt(),
        stored.keylen(),
        Some(stored.options()),
    )?;
    let expected = Zeroizing::new(stored.to_string());
    Ok(crypto::ct_eq(fresh.as_bytes(), expected.as_bytes()))
}

/// Async counterpart of [`compare_sync`].
pub async fn compare(secret: impl AsRef<[u8]>, record: &str) -> Result<bool> {
    let secret = Zeroizing::new(secret.as_ref().to_vec());
    let record = record.to_string();
    spawn_blocking(move || compare_sync(&*secret, &record))
        .await
        .map_err(join_failed)?
}

fn join_failed(e: JoinError) -> Error {
    Error::computation(format!("key derivation task did not complete: {e}"))
}

/// Hashing parameters for new credentials.
///
/// Deserializes from the admin scrypt configuration, e.g.
/// `{"keylen":32,"saltBytes":20,"options":{"cost":16384}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CredentialHasher {
    keylen: usize,
    salt_bytes: usize,
    options: ScryptOptions,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            keylen: DEFAULT_KEYLEN,
            salt_bytes: DEFAULT_SALT_BYTES,
            options: ScryptOptions::default(),
        }
    }
}

impl CredentialHasher {
    pub fn new(keylen: usize, salt_bytes: usize, options: ScryptOptions) -> Result<Self> {
        let hasher = Self {
            keylen,
            salt_bytes,
            options,
        };
        hasher.validate()?;
        Ok(hasher)
    }

    pub fn keylen(&self) -> usize {
        self.keylen
    }

    pub fn salt_bytes(&self) -> usize {
        self.salt_bytes
    }

    pub fn options(&self) -> ScryptOptions {
        self.options
    }

    pub fn validate(&self) -> Result<()> {
        if self.keylen == 0 {
            return Err(Error::validation("keylen must be a positive integer"));
        }
        if self.salt_bytes == 0 {
            return Err(Error::validation("saltBytes must be a positive integer"));
        }
        self.options
            .validate()
            .map_err(|e| Error::validation(format!("invalid options: {e}")))
    }

    /// Hashes `secret` under a freshly generated salt.
    pub async fn create(&self, secret: impl AsRef<[u8]>) -> Result<String> {
        let salt = generate_salt(self.salt_bytes)?;
        hash(secret, salt, self.keylen, Some(self.options)).await
    }

    /// Blocking counterpart of [`CredentialHasher::create`].
    pub fn create_sync(&self, secret: impl AsRef<[u8]>) -> Result<String> {
        let salt = generate_salt(self.salt_bytes)?;
        hash_sync(secret, salt, self.keylen, Some(self.options))
    }

    /// Checks `secret` against `record`. The record carries its own
    /// parameters, so this hasher's configuration does not matter here.
    pub async fn verify(&self, secret: impl AsRef<[u8]>, record: &str) -> Result<bool> {
        compare(secret, record).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT_HEX: &str = "f24b1f138915f4f98664a799de2893b8a28ee754e00830a3624686bbcdb270aa";
    const EXPECTED: &str = "f24b1f138915f4f98664a799de2893b8a28ee754e00830a3624686bbcdb270aa;4096;7c1146d46cec486c4e04b7d287997eaa52e0d19f5ec8cd1935cd913dd972b9c6";
    const LEGACY: &str = "62356789b3e8cb63ffd548335c70b909ca608063;32;4096;219ae2fccb20f3dec76efd63055f207e501a024b5edd4b9c555fe15d4c90f4bc";

    fn cheap() -> Option<ScryptOptions> {
        Some(ScryptOptions::new(1024).unwrap())
    }

    #[test]
    fn generate_salt_returns_requested_bytes() {
        assert_eq!(generate_salt(20).unwrap().len(), 20);
        assert_eq!(generate_salt(32).unwrap().len(), 32);
        assert!(generate_salt(0).is_err());
    }

    #[tokio::test]
    async fn hash_produces_known_record() {
        let salt = hex::decode(SALT_HEX).unwrap();
        let record = hash("test", &salt, 32, Some(ScryptOptions::new(4096).unwrap()))
            .await
            .unwrap();
        assert_eq!(record, EXPECTED);
    }

    #[test]
    fn hash_sync_produces_known_record() {
        let salt = hex::decode(SALT_HEX).unwrap();
        let record = hash_sync("test", &salt, 32, Some(ScryptOptions::new(4096).unwrap())).unwrap();
        assert_eq!(record, EXPECTED);
    }

    #[test]
    fn hash_is_deterministic() {
        let a = hash_sync(b"secret".as_slice(), b"salt", 16, cheap()).unwrap();
        let b = hash_sync("secret", "salt", 16, cheap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn hash_defaults_to_cost_16384() {
        let record = hash_sync("pw", "salt", 16, None).unwrap();
        assert_eq!(record.split(';').nth(1), Some("16384"));
    }

    #[test]
    fn hash_rejects_zero_keylen() {
        assert!(matches!(
            hash_sync("pw", "salt", 0, cheap()),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn compare_roundtrip() {
        let record = hash("correct horse", "pepper", 32, cheap()).await.unwrap();
        assert!(compare("correct horse", &record).await.unwrap());
    }

    #[tokio::test]
    async fn compare_rejects_other_secret() {
        let record = hash("correct horse", "pepper", 32, cheap()).await.unwrap();
        assert!(!compare("battery staple", &record).await.unwrap());
    }

    #[tokio::test]
    async fn compare_known_compact_record() {
        assert!(compare("test", EXPECTED).await.unwrap());
        assert!(!compare("does-not-match", EXPECTED).await.unwrap());
    }

    #[tokio::test]
    async fn compare_known_legacy_record() {
        assert!(compare("test", LEGACY).await.unwrap());
        assert!(!compare("does-not-match", LEGACY).await.unwrap());
    }

    #[test]
    fn equivalent_records_in_both_layouts_verify() {
        let fields: Vec<&str> = EXPECTED.split(';').collect();
        let four = format!("{};32;{};{}", fields[0], fields[1], fields[2]);
        assert!(compare_sync("test", EXPECTED).unwrap());
        assert!(compare_sync("test", &four).unwrap());

        let fields: Vec<&str> = LEGACY.split(';').collect();
        let three = format!("{};{};{}", fields[0], fields[2], fields[3]);
        assert!(compare_sync("test", LEGACY).unwrap());
        assert!(compare_sync("test", &three).unwrap());
    }

    #[tokio::test]
    async fn compare_malformed_record_fails() {
        assert!(matches!(
            compare("test", "not-a-hash").await,
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            compare("test", "$scrypt$ln=12$abc$def").await,
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn compare_record_with_refused_cost_is_computation_error() {
        assert!(matches!(
            compare("test", "aabb;1000;ccdd").await,
            Err(Error::Computation(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_compares_do_not_interfere() {
        let a = hash("alpha", "salt-a", 32, cheap()).await.unwrap();
        let b = hash("bravo", "salt-b", 32, cheap()).await.unwrap();

        let (ra, rb, rx) = tokio::join!(
            compare("alpha", &a),
            compare("bravo", &b),
            compare("alpha", &b),
        );

        assert!(ra.unwrap());
        assert!(rb.unwrap());
        assert!(!rx.unwrap());
    }

    #[test]
    fn hasher_deserializes_admin_config() {
        let hasher: CredentialHasher =
            serde_json::from_str(r#"{"keylen":32,"saltBytes":20,"options":{"cost":16384}}"#)
                .unwrap();
        assert_eq!(hasher, CredentialHasher::default());

        let partial: CredentialHasher = serde_json::from_str(r#"{"keylen":64}"#).unwrap();
        assert_eq!(partial.keylen(), 64);
        assert_eq!(partial.salt_bytes(), DEFAULT_SALT_BYTES);
        assert_eq!(partial.options().cost(), 16384);
    }

    #[test]
    fn hasher_rejects_zero_sizes() {
        let options = ScryptOptions::new(1024).unwrap();
        assert!(CredentialHasher::new(0, 20, options).is_err());
        assert!(CredentialHasher::new(32, 0, options).is_err());
    }

    #[test]
    fn hasher_checks_options_up_front() {
        let empty: CredentialHasher = serde_json::from_str(r#"{"options":{}}"#).unwrap();
        assert_eq!(empty.options().cost(), 16384);
        assert!(empty.validate().is_ok());

        for json in [r#"{"options":{"cost":3000}}"#, r#"{"options":{"cost":32768}}"#] {
            let hasher: CredentialHasher = serde_json::from_str(json).unwrap();
            assert!(matches!(hasher.validate(), Err(Error::Validation(_))));
        }

        let too_big = ScryptOptions::new(65536).unwrap();
        assert!(matches!(
            CredentialHasher::new(32, 20, too_big),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn hasher_create_and_verify() {
        let hasher = CredentialHasher::new(32, 20, ScryptOptions::new(1024).unwrap()).unwrap();

        let record = hasher.create("admin-pw").await.unwrap();
        let parsed: HashRecord = record.parse().unwrap();
        assert_eq!(parsed.salt().len(), 20);
        assert_eq!(parsed.keylen(), 32);
        assert_eq!(parsed.cost(), 1024);

        assert!(hasher.verify("admin-pw", &record).await.unwrap());
        assert!(!hasher.verify("admin-PW", &record).await.unwrap());
    }

    #[test]
    fn hasher_create_uses_fresh_salts() {
        let hasher = CredentialHasher::new(16, 16, ScryptOptions::new(1024).unwrap()).unwrap();
        assert_ne!(
            hasher.create_sync("pw").unwrap(),
            hasher.create_sync("pw").unwrap()
        );
    }
}
