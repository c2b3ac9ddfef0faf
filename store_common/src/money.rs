use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Currencies that have no minor unit, i.e. an amount of 500 means 500 whole units.
const ZERO_DECIMAL_CURRENCIES: [&str; 17] = [
    "bif", "clp", "djf", "gnf", "isk", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv", "xaf", "xof", "xpf",
];

const THREE_DECIMAL_CURRENCIES: [&str; 5] = ["bhd", "jod", "kwd", "omr", "tnd"];

/// The number of decimal places between the major and minor unit of the given (case-insensitive) currency.
pub fn currency_exponent(currency: &str) -> u32 {
    let currency = currency.trim().to_ascii_lowercase();
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        0
    } else if THREE_DECIMAL_CURRENCIES.contains(&currency.as_str()) {
        3
    } else {
        2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("'{0}' is not a valid decimal amount")]
    InvalidAmount(String),
    #[error("'{amount}' has more decimal places than {currency} allows")]
    TooPrecise { amount: String, currency: String },
    #[error("'{0}' is too large to be represented")]
    Overflow(String),
}

//--------------------------------------     MinorUnits       ---------------------------------------------------------
/// An amount of money expressed in the smallest unit of its currency (e.g. cents for USD).
///
/// The currency is not carried by the value itself, and so conversions to and from major units take the currency
/// code as an argument.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct MinorUnits(i64);

op!(binary MinorUnits, Add, add);
op!(binary MinorUnits, Sub, sub);
op!(inplace MinorUnits, AddAssign, add_assign);
op!(unary MinorUnits, Neg, neg);

impl Mul<i64> for MinorUnits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl From<i64> for MinorUnits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MinorUnits {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Parses a decimal amount in major units (e.g. "49.00") into minor units without going through floating point.
    ///
    /// Trailing zeros beyond the currency's precision are accepted ("49.990" USD is 4999), any other extra digits
    /// are an error.
    pub fn from_major_str(amount: &str, currency: &str) -> Result<Self, MoneyError> {
        let exponent = currency_exponent(currency);
        let text = amount.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        let is_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !is_digits(whole) || !is_digits(fraction) {
            return Err(MoneyError::InvalidAmount(amount.to_string()));
        }
        let significant = fraction.trim_end_matches('0');
        if significant.len() > exponent as usize {
            return Err(MoneyError::TooPrecise { amount: amount.to_string(), currency: currency.to_string() });
        }
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<i64>().map_err(|_| MoneyError::Overflow(amount.to_string()))?
        };
        let fraction_units = if significant.is_empty() {
            0
        } else {
            let padded = format!("{significant:0<width$}", width = exponent as usize);
            padded.parse::<i64>().map_err(|_| MoneyError::InvalidAmount(amount.to_string()))?
        };
        let value = 10i64
            .checked_pow(exponent)
            .and_then(|scale| whole_units.checked_mul(scale))
            .and_then(|v| v.checked_add(fraction_units))
            .ok_or_else(|| MoneyError::Overflow(amount.to_string()))?;
        Ok(Self(if negative { -value } else { value }))
    }

    /// The amount in major units. Only use this for display and comparisons in tests, never for arithmetic.
    pub fn to_major(&self, currency: &str) -> f64 {
        self.0 as f64 / 10f64.powi(currency_exponent(currency) as i32)
    }

    /// Formats the amount in major units with the currency's natural precision, e.g. "49.99".
    pub fn format_major(&self, currency: &str) -> String {
        let exponent = currency_exponent(currency);
        if exponent == 0 {
            return self.0.to_string();
        }
        let scale = 10i64.pow(exponent);
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        format!("{sign}{}.{:0width$}", abs / scale as u64, abs % scale as u64, width = exponent as usize)
    }
}
