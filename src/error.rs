use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The caller broke an argument contract. This is a bug in the calling
    /// code, never something a remote party can trigger.
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("malformed input: {0}")]
    Parse(String),

    #[error("payload variant {0} not implemented")]
    UnsupportedVariant(u8),

    #[error("unsupported hash format: {0}")]
    UnsupportedFormat(String),

    #[error("hmac is invalid")]
    Integrity,

    #[error("key derivation failed: {0}")]
    Computation(String),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub(crate) fn computation(msg: impl Into<String>) -> Self {
        Error::Computation(msg.into())
    }

    /// Returns `true` for the failure kinds a payload sender can provoke.
    ///
    /// These must be reported to that sender as one indistinguishable
    /// failure.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            Error::Parse(_) | Error::UnsupportedVariant(_) | Error::Integrity
        )
    }

    /// Short, stable name of the error kind, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Parse(_) => "parse",
            Error::UnsupportedVariant(_) => "unsupported-variant",
            Error::UnsupportedFormat(_) => "unsupported-format",
            Error::Integrity => "integrity",
            Error::Computation(_) => "computation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decryption_failures_are_classified() {
        assert!(Error::Integrity.is_decryption_failure());
        assert!(Error::UnsupportedVariant(2).is_decryption_failure());
        assert!(Error::parse("short").is_decryption_failure());
        assert!(!Error::validation("keylen").is_decryption_failure());
        assert!(!Error::computation("cost").is_decryption_failure());
    }
}
