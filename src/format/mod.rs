//! Text serialization of credential hash records.
//!
//! Two historical layouts exist and both are accepted on read:
//!
//! ```text
//! compact: <salt-hex>;<cost>;<derived-key-hex>
//! legacy:  <salt-hex>;<keylen>;<cost>;<derived-key-hex>
//! ```
//!
//! New records are always written in the compact layout.

use std::fmt;
use std::str::FromStr;

use zeroize::Zeroizing;

use crate::crypto::ScryptOptions;
use crate::error::{Error, Result};

pub mod compact;
pub mod legacy;

/// Field separator in both layouts.
pub const DELIMITER: char = ';';
/// Prefix of the `$`-delimited scheme, which is recognized but not supported.
pub const DOLLAR_SCHEME_PREFIX: &str = "$scrypt$";

/// Field layout a record was read from (or will be written in).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Compact,
    Legacy,
}

/// A parsed credential hash record.
#[derive(Clone)]
pub struct HashRecord {
    layout: Layout,
    salt: Vec<u8>,
    cost: u32,
    derived_key: Zeroizing<Vec<u8>>,
}

impl HashRecord {
    /// Creates a record in the canonical (compact) layout.
    pub fn new(salt: Vec<u8>, cost: u32, derived_key: Zeroizing<Vec<u8>>) -> Self {
        Self {
            layout: Layout::Compact,
            salt,
            cost,
            derived_key,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Length of the derived key in bytes.
    pub fn keylen(&self) -> usize {
        self.derived_key.len()
    }

    pub fn derived_key(&self) -> &[u8] {
        &self.derived_key
    }

    /// KDF options this record was produced with.
    pub fn options(&self) -> ScryptOptions {
        ScryptOptions::unchecked(self.cost)
    }

    /// The same record re-expressed in the canonical layout.
    pub fn to_canonical(&self) -> HashRecord {
        HashRecord {
            layout: Layout::Compact,
            ..self.clone()
        }
    }
}

impl fmt::Debug for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRecord")
            .field("layout", &self.layout)
            .field("salt", &hex::encode(&self.salt))
            .field("cost", &self.cost)
            .field("keylen", &self.keylen())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize(self))
    }
}

impl FromStr for HashRecord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse(s)
    }
}

/// Parses a hash record, dispatching on its field count.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for `$`-delimited records and
/// [`Error::Parse`] if:
/// - The field count matches neither layout
/// - The salt or derived key is not valid hex
/// - The cost or keylen field is not an integer
pub fn parse(text: &str) -> Result<HashRecord> {
    if text.starts_with('$') {
        let scheme = if text.starts_with(DOLLAR_SCHEME_PREFIX) {
            "$scrypt$ records"
        } else {
            "$-delimited records"
        };
        return Err(Error::UnsupportedFormat(scheme.to_string()));
    }

    let fields: Vec<&str> = text.split(DELIMITER).collect();

    match fields.len() {
        compact::FIELD_COUNT => compact::parse(&fields),
        legacy::FIELD_COUNT => legacy::parse(&fields),
        n => Err(Error::parse(format!(
            "unknown hash format: expected {} or {} fields, found {n}",
            compact::FIELD_COUNT,
            legacy::FIELD_COUNT
        ))),
    }
}

/// Serializes a record in its own layout.
pub fn serialize(record: &HashRecord) -> String {
    match record.layout() {
        Layout::Compact => compact::serialize(record),
        Layout::Legacy => legacy::serialize(record),
    }
}

fn decode_salt(field: &str) -> Result<Vec<u8>> {
    hex::decode(field).map_err(|e| Error::parse(format!("could not derive salt: {e}")))
}

fn decode_cost(field: &str) -> Result<u32> {
    field
        .parse::<u32>()
        .map_err(|_| Error::parse(format!("could not derive cost from {field:?}")))
}

fn decode_derived_key(field: &str) -> Result<Zeroizing<Vec<u8>>> {
    let key = hex::decode(field)
        .map_err(|e| Error::parse(format!("could not derive derived key: {e}")))?;
    if key.is_empty() {
        return Err(Error::parse("derived key is empty"));
    }
    Ok(Zeroizing::new(key))
}
