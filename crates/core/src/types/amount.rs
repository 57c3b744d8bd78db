//! Monetary amounts using decimal arithmetic.
//!
//! The services exchange amounts as JSON numbers (`Double` on the Java side),
//! so [`Amount`] serializes through `rust_decimal::serde::float` while keeping
//! decimal arithmetic and formatting on the console side.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount in euros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Format for display, e.g. `1 250.00 €`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:.2} €", self.0.round_dp(2))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    /// Parse form input; a comma decimal separator is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(&s.trim().replace(',', ".")).map(Self)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}
