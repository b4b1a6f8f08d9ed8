//! Configuration loaded from environment variables and an optional `.env` file.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `POSGUARD_ADMIN_PASSWORD` | Stored admin password hash record | (none) |
//! | `POSGUARD_ADMIN_SCRYPT` | JSON hashing parameters for new passwords | `{"keylen":32,"saltBytes":20,"options":{"cost":16384}}` |
//! | `POSGUARD_AUTH_API_KEYS` | JSON array of terminal API keys | `[]` |

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::hasher::CredentialHasher;
use crate::payload;

pub const ENV_ADMIN_PASSWORD: &str = "POSGUARD_ADMIN_PASSWORD";
pub const ENV_ADMIN_SCRYPT: &str = "POSGUARD_ADMIN_SCRYPT";
pub const ENV_AUTH_API_KEYS: &str = "POSGUARD_AUTH_API_KEYS";

#[derive(Debug, Clone, Default)]
pub struct Config {
    admin_password: Option<String>,
    hasher: CredentialHasher,
    api_keys: Vec<ApiKey>,
}

impl Config {
    /// Loads `.env` from the working directory if present, then reads the
    /// process environment.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("failed to read .env file"),
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Reads configuration from one `.env` file only.
    pub fn from_env_file(path: &Path) -> Result<Self> {
        let vars = dotenvy::from_path_iter(path)
            .with_context(|| format!("failed to open {}", path.display()))?
            .collect::<Result<HashMap<String, String>, _>>()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Self::from_vars(|name| vars.get(name).cloned())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let admin_password = get(ENV_ADMIN_PASSWORD).filter(|v| !v.is_empty());

        let hasher = match get(ENV_ADMIN_SCRYPT) {
            Some(json) => serde_json::from_str::<CredentialHasher>(&json)
                .with_context(|| format!("invalid {ENV_ADMIN_SCRYPT}"))?,
            None => CredentialHasher::default(),
        };
        hasher
            .validate()
            .with_context(|| format!("invalid {ENV_ADMIN_SCRYPT}"))?;

        let api_keys = match get(ENV_AUTH_API_KEYS) {
            Some(json) => serde_json::from_str::<Vec<ApiKey>>(&json)
                .with_context(|| format!("invalid {ENV_AUTH_API_KEYS}"))?,
            None => Vec::new(),
        };

        Ok(Self {
            admin_password,
            hasher,
            api_keys,
        })
    }

    /// Stored admin password hash record, if one is configured.
    pub fn admin_password(&self) -> Option<&str> {
        self.admin_password.as_deref()
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    pub fn api_keys(&self) -> &[ApiKey] {
        &self.api_keys
    }

    pub fn api_key(&self, id: &str) -> Option<&ApiKey> {
        self.api_keys.iter().find(|k| k.id == id)
    }
}

/// How an API key's key material is written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyEncoding {
    #[default]
    Hex,
    Utf8,
    Base64,
}

impl KeyEncoding {
    pub fn decode(&self, key: &str) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = match self {
            KeyEncoding::Hex => hex::decode(key).context("key is not valid hex")?,
            KeyEncoding::Utf8 => key.as_bytes().to_vec(),
            KeyEncoding::Base64 => payload::decode_param(key).context("key is not valid base64")?,
        };
        Ok(Zeroizing::new(bytes))
    }
}

/// A terminal's shared secret and its pricing settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    id: String,
    key: String,
    #[serde(default)]
    encoding: KeyEncoding,
    #[serde(default)]
    fiat_currency: Option<String>,
    #[serde(default)]
    exchange_rates_provider: Option<String>,
}

impl ApiKey {
    pub fn new(id: impl Into<String>, key: impl Into<String>, encoding: KeyEncoding) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            encoding,
            fiat_currency: None,
            exchange_rates_provider: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub fn fiat_currency(&self) -> Option<&str> {
        self.fiat_currency.as_deref()
    }

    pub fn exchange_rates_provider(&self) -> Option<&str> {
        self.exchange_rates_provider.as_deref()
    }

    /// Decoded key material, used as the payload HMAC key.
    pub fn secret(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.encoding
            .decode(&self.key)
            .with_context(|| format!("invalid key for API key {:?}", self.id))
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("id", &self.id)
            .field("key", &"[REDACTED]")
            .field("encoding", &self.encoding)
            .field("fiat_currency", &self.fiat_currency)
            .field("exchange_rates_provider", &self.exchange_rates_provider)
            .finish()
    }
}
