//! Compact (canonical) hash record layout.
//!
//! ```text
//! SALT-HEX ; COST ; DERIVED-KEY-HEX
//! ```
//!
//! The key length is implied by the decoded derived key.

use super::{DELIMITER, HashRecord, Layout, decode_cost, decode_derived_key, decode_salt};
use crate::error::{Error, Result};

/// Number of delimiter-separated fields.
pub const FIELD_COUNT: usize = 3;

/// Parses the fields of a compact record.
///
/// # Errors
///
/// Returns an error if the field count is wrong or any field fails to decode.
pub fn parse(fields: &[&str]) -> Result<HashRecord> {
    let [salt, cost, derived_key] = fields else {
        return Err(Error::parse(format!(
            "compact layout needs {FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    };

    let salt = decode_salt(salt)?;
    let cost = decode_cost(cost)?;
    let derived_key = decode_derived_key(derived_key)?;

    Ok(HashRecord {
        layout: Layout::Compact,
        salt,
        cost,
        derived_key,
    })
}

/// Serializes a record in the compact layout, whatever layout it was read from.
pub fn serialize(record: &HashRecord) -> String {
    [
        hex::encode(record.salt()),
        record.cost().to_string(),
        hex::encode(record.derived_key()),
    ]
    .join(&DELIMITER.to_string())
}
