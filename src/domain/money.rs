use crate::error::EngineError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Number of decimal places between the major and the minor currency unit.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// A strictly positive monetary amount expressed in minor currency units.
///
/// Fees and payments are stored as integers so that splitting a fee into
/// installments never loses a cent to rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

impl Amount {
    pub fn new(minor_units: i64) -> Result<Self, EngineError> {
        if minor_units > 0 {
            Ok(Self(minor_units))
        } else {
            Err(EngineError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    /// Parses an amount written in major units (`"150.00"`).
    ///
    /// Values with more precision than the minor unit are rejected rather than rounded.
    pub fn from_major(value: Decimal) -> Result<Self, EngineError> {
        let out_of_range =
            || EngineError::ValidationError(format!("Amount {value} is out of range"));
        let minor = value
            .checked_mul(Decimal::from(10_i64.pow(MINOR_UNIT_SCALE)))
            .ok_or_else(out_of_range)?;
        if !minor.fract().is_zero() {
            return Err(EngineError::ValidationError(format!(
                "Amount {value} has more than {MINOR_UNIT_SCALE} decimal places"
            )));
        }
        let minor = minor.to_i64().ok_or_else(out_of_range)?;
        Self::new(minor)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }
}

impl TryFrom<i64> for Amount {
    type Error = EngineError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major())
    }
}

/// An aggregated sum of money in minor units. Unlike [`Amount`] it may be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Total(pub i64);

impl Total {
    pub const ZERO: Self = Self(0);

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn to_major(&self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }
}

impl From<Amount> for Total {
    fn from(amount: Amount) -> Self {
        Self(amount.0)
    }
}

impl Add for Total {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Total {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl AddAssign<Amount> for Total {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 += rhs.0;
    }
}

impl Sum for Total {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Total {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_major())
    }
}
