// paygate/src/domain/money.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A non-negative rupee amount held as integer paise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
  #[error("price is empty")]
  Empty,
  #[error("price cannot be negative")]
  Negative,
  #[error("'{0}' is not a number")]
  NotANumber(String),
  #[error("price can have at most two decimal places")]
  TooPrecise,
  #[error("price is too large")]
  TooLarge,
}

impl Amount {
  pub const ZERO: Amount = Amount(0);

  pub fn from_paise(paise: i64) -> Option<Self> {
    (paise >= 0).then_some(Amount(paise))
  }

  pub fn paise(self) -> i64 {
    self.0
  }

  /// Decimal rendering with exactly two fractional digits, e.g. `199.00`.
  pub fn to_decimal_string(self) -> String {
    format!("{}.{:02}", self.0 / 100, self.0 % 100)
  }
}

impl fmt::Display for Amount {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "₹{}", self.to_decimal_string())
  }
}

impl FromStr for Amount {
  type Err = AmountParseError;

  /// Accepts `199`, `199.5` and `199.00`. Anything else (signs, exponents, separators,
  /// a third decimal digit) is rejected rather than rounded.
  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let s = raw.trim();
    if s.is_empty() {
      return Err(AmountParseError::Empty);
    }
    if s.starts_with('-') {
      return Err(AmountParseError::Negative);
    }

    let (whole, frac) = match s.split_once('.') {
      Some((w, f)) => (w, Some(f)),
      None => (s, None),
    };

    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || frac.is_some_and(|f| !all_digits(f)) {
      return Err(AmountParseError::NotANumber(s.to_string()));
    }

    let frac_paise = match frac {
      None => 0,
      Some(f) if f.len() == 1 => i64::from(f.as_bytes()[0] - b'0') * 10,
      Some(f) if f.len() == 2 => f.parse::<i64>().map_err(|_| AmountParseError::NotANumber(s.to_string()))?,
      Some(_) => return Err(AmountParseError::TooPrecise),
    };

    let rupees = whole.parse::<i64>().map_err(|_| AmountParseError::TooLarge)?;
    rupees
      .checked_mul(100)
      .and_then(|p| p.checked_add(frac_paise))
      .map(Amount)
      .ok_or(AmountParseError::TooLarge)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_whole_and_fractional_rupees() {
    assert_eq!("199".parse::<Amount>(), Ok(Amount(19_900)));
    assert_eq!("199.5".parse::<Amount>(), Ok(Amount(19_950)));
    assert_eq!(" 99.99 ".parse::<Amount>(), Ok(Amount(9_999)));
    assert_eq!("0".parse::<Amount>(), Ok(Amount::ZERO));
  }

  #[test]
  fn rejects_rather_than_rounds() {
    assert_eq!("".parse::<Amount>(), Err(AmountParseError::Empty));
    assert_eq!("-5".parse::<Amount>(), Err(AmountParseError::Negative));
    assert_eq!("1.999".parse::<Amount>(), Err(AmountParseError::TooPrecise));
    assert!(matches!("abc".parse::<Amount>(), Err(AmountParseError::NotANumber(_))));
    assert!(matches!("1e3".parse::<Amount>(), Err(AmountParseError::NotANumber(_))));
    assert!(matches!("1,000".parse::<Amount>(), Err(AmountParseError::NotANumber(_))));
    assert!(matches!(".5".parse::<Amount>(), Err(AmountParseError::NotANumber(_))));
    assert_eq!("99999999999999999999".parse::<Amount>(), Err(AmountParseError::TooLarge));
  }

  #[test]
  fn renders_two_decimals() {
    assert_eq!(Amount(19_900).to_decimal_string(), "199.00");
    assert_eq!(Amount(5).to_decimal_string(), "0.05");
    assert_eq!(Amount(9_950).to_string(), "₹99.50");
    assert_eq!(Amount::from_paise(-1), None);
  }
}
