//! Legacy hash record layout, read for backward compatibility.
//!
//! ```text
//! SALT-HEX ; KEYLEN ; COST ; DERIVED-KEY-HEX
//! ```

use super::{DELIMITER, HashRecord, Layout, decode_cost, decode_derived_key, decode_salt};
use crate::error::{Error, Result};

/// Number of delimiter-separated fields.
pub const FIELD_COUNT: usize = 4;

/// Parses the fields of a legacy record.
///
/// # Errors
///
/// Returns an error if the field count is wrong, any field fails to decode,
/// or the keylen field disagrees with the derived key.
pub fn parse(fields: &[&str]) -> Result<HashRecord> {
    let [salt, keylen, cost, derived_key] = fields else {
        return Err(Error::parse(format!(
            "legacy layout needs {FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    };

    let salt = decode_salt(salt)?;
    let keylen = keylen
        .parse::<usize>()
        .map_err(|_| Error::parse(format!("could not derive keylen from {keylen:?}")))?;
    let cost = decode_cost(cost)?;
    let derived_key = decode_derived_key(derived_key)?;

    if keylen != derived_key.len() {
        return Err(Error::parse(format!(
            "keylen field says {keylen} bytes but derived key has {}",
            derived_key.len()
        )));
    }

    Ok(HashRecord {
        layout: Layout::Legacy,
        salt,
        cost,
        derived_key,
    })
}

pub fn serialize(record: &HashRecord) -> String {
    [
        hex::encode(record.salt()),
        record.keylen().to_string(),
        record.cost().to_string(),
        hex::encode(record.derived_key()),
    ]
    .join(&DELIMITER.to_string())
}
