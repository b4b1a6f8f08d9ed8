use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
mod auth;
use posguard::amount::{ExchangeRate, fiat_cents_to_msats};
use posguard::payload::{self, PosPayload};
use posguard::{ApiKey, Config, CredentialHasher, KeyEncoding, ScryptOptions, crypto};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Length of the nonce in payloads built by `encrypt`.
const NONCE_LEN: usize = 8;

#[derive(Debug, clap::Args)]
struct ScryptArgs {
    /// scrypt cost, a power of two (default: 16384)
    #[arg(long)]
    cost: Option<u32>,

    /// Derived key length in bytes (default: 32)
    #[arg(long)]
    keylen: Option<usize>,

    /// Salt length in bytes (default: 20)
    #[arg(long = "salt-bytes")]
    salt_bytes: Option<usize>,
}

impl ScryptArgs {
    fn to_hasher(&self, configured: &CredentialHasher) -> Result<CredentialHasher> {
        let options = match self.cost {
            Some(cost) => ScryptOptions::new(cost)?,
            None => configured.options(),
        };

        Ok(CredentialHasher::new(
            self.keylen.unwrap_or(configured.keylen()),
            self.salt_bytes.unwrap_or(configured.salt_bytes()),
            options,
        )?)
    }
}

#[derive(Debug, clap::Args)]
struct KeyArgs {
    /// Shared secret of the terminal
    #[arg(long, required_unless_present = "api_key_id", conflicts_with = "api_key_id")]
    key: Option<String>,

    /// Encoding of --key, as for keys in POSGUARD_AUTH_API_KEYS
    #[arg(long, value_enum, default_value_t = KeyEncoding::Hex)]
    encoding: KeyEncoding,

    /// Look the key up in POSGUARD_AUTH_API_KEYS instead
    #[arg(long, value_name = "ID")]
    api_key_id: Option<String>,
}

impl KeyArgs {
    fn resolve(&self, config: &Config) -> Result<ApiKey> {
        match (&self.key, &self.api_key_id) {
            (Some(key), _) => Ok(ApiKey::new("cli", key.as_str(), self.encoding)),
            (None, Some(id)) => config
                .api_key(id)
                .cloned()
                .ok_or_else(|| anyhow!("Unknown API key ID: {id:?}")),
            (None, None) => bail!("either --key or --api-key-id is required"),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => Config::from_env_file(p),
        None => Config::from_env(),
    }
}

#[derive(Debug, Parser)]
#[command(name = "posguard")]
#[command(
    version,
    about = "Operator credential hashing and point-of-sale payload tools."
)]
struct Cli {
    /// Read configuration from this file instead of .env and the environment
    #[arg(long, global = true, value_name = "PATH", env = "POSGUARD_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Hashes a new admin password
    HashPassword {
        #[command(flatten)]
        scrypt: ScryptArgs,
    },

    /// Checks a password against a stored hash
    VerifyPassword {
        /// Hash record (default: POSGUARD_ADMIN_PASSWORD)
        #[arg(long = "hash", value_name = "RECORD")]
        record: Option<String>,
    },

    /// Decrypts a terminal payload
    #[command(arg_required_else_help = true)]
    Decrypt {
        #[command(flatten)]
        key: KeyArgs,

        /// BTC exchange rate in the terminal's fiat currency; adds msats to the output
        #[arg(long)]
        rate: Option<String>,

        /// The `p` query parameter
        p: String,
    },

    /// Builds a terminal payload
    #[command(arg_required_else_help = true)]
    Encrypt {
        #[command(flatten)]
        key: KeyArgs,

        #[arg(long)]
        pin: u64,

        /// Fiat amount in cents
        #[arg(long)]
        amount: u64,
    },
}

#[derive(Serialize)]
struct DecryptOutput {
    #[serde(flatten)]
    payload: PosPayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    msats: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Cli::parse();
    let config = load_config(args.env_file.as_deref())?;

    match args.command {
        Commands::HashPassword { scrypt } => {
            let hasher = scrypt.to_hasher(config.hasher())?;
            let password = auth::read_new_password_with_confirmation()?;
            let record = hasher.create(password.as_bytes()).await?;
            println!("{record}");
        }
        Commands::VerifyPassword { record } => {
            let record = record
                .or_else(|| config.admin_password().map(str::to_string))
                .context("no hash given; pass --hash or set POSGUARD_ADMIN_PASSWORD")?;
            let password = auth::read_password()?;
            if posguard::compare(password.as_bytes(), &record).await? {
                println!("password is correct");
            } else {
                return Err(anyhow!("password is incorrect").into());
            }
        }
        Commands::Decrypt { key, rate, p } => {
            let api_key = key.resolve(&config)?;
            let secret = api_key.secret()?;
            let bytes = payload::decode_param(&p)?;
            let decrypted = payload::decrypt(&secret, &bytes)
                .map_err(|e| anyhow!("decryption failed: {e}"))?;

            let msats = match rate {
                Some(rate) => {
                    let rate: ExchangeRate = rate.parse()?;
                    Some(fiat_cents_to_msats(decrypted.amount, &rate)?)
                }
                None => None,
            };

            let output = DecryptOutput {
                payload: decrypted,
                msats,
            };
            println!("{}", serde_json::to_string(&output)?);
        }
        Commands::Encrypt { key, pin, amount } => {
            let api_key = key.resolve(&config)?;
            let secret = api_key.secret()?;
            let nonce = crypto::random_bytes(NONCE_LEN)?;
            let frame = payload::encrypt(&secret, &nonce, &PosPayload { pin, amount })?;
            println!("{}", payload::encode_param(&frame));
        }
    }

    Ok(())
}
