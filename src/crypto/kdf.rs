use log::{debug, warn};
use scrypt::Params;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// scrypt block size `r`. Not stored in hash records.
pub const BLOCK_SIZE: u32 = 8;
/// scrypt parallelization `p`. Not stored in hash records.
pub const PARALLELIZATION: u32 = 1;
/// Working-memory ceiling for one derivation (32 MiB).
pub const MAX_MEMORY: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScryptOptions {
    cost: u32,
}

impl Default for ScryptOptions {
    fn default() -> Self {
        Self {
            // 2^14
            cost: 16384,
        }
    }
}

impl ScryptOptions {
    pub fn new(cost: u32) -> Result<Self> {
        if cost < 2 || !cost.is_power_of_two() {
            return Err(Error::validation(format!(
                "scrypt cost must be a power of two greater than 1, got {cost}"
            )));
        }
        Ok(Self { cost })
    }

    /// Wraps a cost read from stored data. Checked when a key is derived.
    pub(crate) fn unchecked(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Bytes of working memory a derivation with these options needs.
    pub fn memory_required(&self) -> u64 {
        let r = u64::from(BLOCK_SIZE);
        let p = u64::from(PARALLELIZATION);
        128 * r * p + 128 * r * (u64::from(self.cost) + 2)
    }

    /// Checks the options against what the primitive accepts.
    pub fn validate(&self) -> Result<()> {
        if self.cost < 2 || !self.cost.is_power_of_two() {
            return Err(Error::computation(format!(
                "cost {} is not a power of two greater than 1",
                self.cost
            )));
        }
        if self.memory_required() > MAX_MEMORY {
            return Err(Error::computation(format!(
                "cost {} needs {} bytes, above the {MAX_MEMORY} byte limit",
                self.cost,
                self.memory_required()
            )));
        }
        Ok(())
    }
}

/// Runs scrypt over `secret` and `salt`, producing `keylen` bytes.
pub fn derive_key(
    secret: &[u8],
    salt: &[u8],
    keylen: usize,
    options: ScryptOptions,
) -> Result<Zeroizing<Vec<u8>>> {
    if keylen == 0 {
        return Err(Error::validation("keylen must be a positive integer"));
    }
    options.validate().inspect_err(|e| warn!("{e}"))?;

    let log_n = options.cost.trailing_zeros() as u8;
    let params = Params::new(log_n, BLOCK_SIZE, PARALLELIZATION, Params::RECOMMENDED_LEN)
        .map_err(|e| Error::computation(format!("failed to construct scrypt params: {e}")))?;

    debug!("deriving {keylen} byte key with scrypt cost {}", options.cost);

    let mut key = Zeroizing::new(vec![0u8; keylen]);
    scrypt::scrypt(secret, salt, &params, &mut key).map_err(|e| {
        warn!("scrypt derivation failed: {e}");
        Error::computation(format!("scrypt derivation failed: {e}"))
    })?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> ScryptOptions {
        ScryptOptions::new(1024).unwrap()
    }

    #[test]
    fn kdf_is_deterministic() {
        let salt = [42u8; 16];

        let k1 = derive_key(b"password", &salt, 32, cheap()).unwrap();
        let k2 = derive_key(b"password", &salt, 32, cheap()).unwrap();

        assert_eq!(*k1, *k2);
    }

    #[test]
    fn kdf_cost_affects_output() {
        let salt = [7u8; 16];

        let k1 = derive_key(b"pw", &salt, 32, ScryptOptions::new(1024).unwrap()).unwrap();
        let k2 = derive_key(b"pw", &salt, 32, ScryptOptions::new(2048).unwrap()).unwrap();

        assert_ne!(*k1, *k2);
    }

    #[test]
    fn kdf_matches_known_vector() {
        let salt =
            hex::decode("f24b1f138915f4f98664a799de2893b8a28ee754e00830a3624686bbcdb270aa")
                .unwrap();
        let key = derive_key(b"test", &salt, 32, ScryptOptions::new(4096).unwrap()).unwrap();

        assert_eq!(
            hex::encode(&*key),
            "7c1146d46cec486c4e04b7d287997eaa52e0d19f5ec8cd1935cd913dd972b9c6"
        );
    }

    #[test]
    fn kdf_honours_keylen() {
        let key = derive_key(b"pw", b"salt", 64, cheap()).unwrap();
        assert_eq!(key.len(), 64);
    }

    #[test]
    fn kdf_zero_keylen_is_a_validation_error() {
        assert!(matches!(
            derive_key(b"pw", b"salt", 0, cheap()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn options_reject_non_power_of_two() {
        assert!(ScryptOptions::new(0).is_err());
        assert!(ScryptOptions::new(1).is_err());
        assert!(ScryptOptions::new(1000).is_err());
        assert!(ScryptOptions::new(4096).is_ok());
    }

    #[test]
    fn memory_ceiling_is_enforced() {
        assert!(ScryptOptions::default().validate().is_ok());
        let heavy = ScryptOptions { cost: 32768 };
        assert!(matches!(heavy.validate(), Err(Error::Computation(_))));
        assert!(matches!(
            derive_key(b"pw", b"salt", 32, heavy),
            Err(Error::Computation(_))
        ));
    }

    #[test]
    fn missing_cost_deserializes_to_default() {
        let options: ScryptOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ScryptOptions::default());
    }

    #[test]
    fn deserialized_bad_cost_fails_at_derive_time() {
        let options: ScryptOptions = serde_json::from_str(r#"{"cost":3000}"#).unwrap();
        assert!(matches!(
            derive_key(b"pw", b"salt", 32, options),
            Err(Error::Computation(_))
        ));
    }
}
