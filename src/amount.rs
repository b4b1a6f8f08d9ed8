use std::fmt::Display;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const SATS_PER_BTC: u128 = 100_000_000;
pub const MSATS_PER_SAT: u64 = 1000;
pub const CENTS_PER_UNIT: u128 = 100;

/// Most fractional digits accepted in a rate.
const MAX_SCALE: u32 = 18;

/// Fiat price of one bitcoin, kept as an exact decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate {
    /// The rate with its decimal point removed
    mantissa: u128,
    /// Number of fractional digits in `mantissa`
    scale: u32,
}

impl FromStr for ExchangeRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::parse(format!("invalid exchange rate {s:?}"));

        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let scale = u32::try_from(frac.len()).map_err(|_| invalid())?;
        if scale > MAX_SCALE {
            return Err(invalid());
        }

        let digits = format!("{whole}{frac}");
        let mantissa = digits.parse::<u128>().map_err(|_| invalid())?;
        if mantissa == 0 {
            return Err(Error::parse("exchange rate must be greater than zero"));
        }

        Ok(Self { mantissa, scale })
    }
}

impl Display for ExchangeRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let divisor = 10u128.pow(self.scale);
        let whole = self.mantissa / divisor;
        let frac = self.mantissa % divisor;
        if self.scale == 0 {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{frac:0width$}", width = self.scale as usize)
        }
    }
}

/// Converts a fiat amount in cents to millisatoshis at `rate`.
///
/// Rounds down to a whole satoshi before scaling to millisatoshis.
pub fn fiat_cents_to_msats(cents: u64, rate: &ExchangeRate) -> Result<u64> {
    let too_large = || Error::parse(format!("amount {cents} is too large to convert"));

    // sats = cents / 100 / (mantissa / 10^scale) * 1e8
    let numerator = u128::from(cents)
        .checked_mul(SATS_PER_BTC / CENTS_PER_UNIT)
        .and_then(|n| n.checked_mul(10u128.pow(rate.scale)))
        .ok_or_else(too_large)?;
    let sats = numerator / rate.mantissa;

    u64::try_from(sats)
        .ok()
        .and_then(|sats| sats.checked_mul(MSATS_PER_SAT))
        .ok_or_else(too_large)
}

#[cfg(test)]
mod test {
    use super::*;

    fn rate(s: &str) -> ExchangeRate {
        s.parse().unwrap()
    }

    #[test]
    fn converts_known_amounts() {
        assert_eq!(fiat_cents_to_msats(100, &rate("40000.00")).unwrap(), 2_500_000);
        assert_eq!(fiat_cents_to_msats(202, &rate("39054.12")).unwrap(), 5_172_000);
        assert_eq!(fiat_cents_to_msats(0, &rate("39900.00")).unwrap(), 0);
    }

    #[test]
    fn rounds_down_to_whole_sats() {
        // 1 cent at 30000 is 33.33.. sats
        assert_eq!(fiat_cents_to_msats(1, &rate("30000")).unwrap(), 33_000);
    }

    #[test]
    fn parses_rate_strings() {
        assert_eq!(rate("39502.10245").to_string(), "39502.10245");
        assert_eq!(rate("40000").to_string(), "40000");
        assert_eq!(rate(".5").to_string(), "0.5");
        assert_eq!(rate("1.05").to_string(), "1.05");
    }

    #[test]
    fn rejects_bad_rates() {
        for s in ["", ".", "abc", "1.2.3", "-5", "0", "0.000", "1e5", " 1"] {
            assert!(s.parse::<ExchangeRate>().is_err(), "{s:?}");
        }
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(fiat_cents_to_msats(u64::MAX, &rate("0.000000000000000001")).is_err());
    }
}
