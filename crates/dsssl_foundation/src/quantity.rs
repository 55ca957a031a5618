//! Numbers, lengths, and dimensioned quantities.
//!
//! DSSSL numbers carry a dimension: plain numbers have dimension 0, lengths
//! have dimension 1, areas 2, and so on. Exact lengths are stored as an
//! integer count of internal units; everything inexact is an `f64`.

use std::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};

/// Internal units per inch unless configured otherwise.
pub const DEFAULT_UNITS_PER_INCH: i64 = 72000;

/// A numeric value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Number {
    /// Exact integer (dimension 0).
    Integer(i64),
    /// Inexact real (dimension 0).
    Real(f64),
    /// Exact length in internal units (dimension 1).
    Length(i64),
    /// Inexact quantity in internal units raised to `dim`.
    Quantity {
        /// Magnitude.
        value: f64,
        /// Dimension (never 0; dimensionless values are `Real`).
        dim: i32,
    },
}

impl Number {
    /// Builds an inexact number, collapsing dimension 0 to `Real`.
    #[must_use]
    pub fn inexact(value: f64, dim: i32) -> Self {
        if dim == 0 {
            Self::Real(value)
        } else {
            Self::Quantity { value, dim }
        }
    }

    /// Dimension of this number.
    #[must_use]
    pub const fn dim(self) -> i32 {
        match self {
            Self::Integer(_) | Self::Real(_) => 0,
            Self::Length(_) => 1,
            Self::Quantity { dim, .. } => dim,
        }
    }

    /// Returns true for exact integers and exact lengths.
    #[must_use]
    pub const fn is_exact(self) -> bool {
        matches!(self, Self::Integer(_) | Self::Length(_))
    }

    /// Magnitude as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Integer(n) | Self::Length(n) => n as f64,
            Self::Real(v) | Self::Quantity { value: v, .. } => v,
        }
    }

    /// Converts to the inexact number of the same dimension.
    #[must_use]
    pub fn to_inexact(self) -> Self {
        Self::inexact(self.to_f64(), self.dim())
    }

    fn same_dim(self, other: Self) -> Result<i32> {
        if self.dim() == other.dim() {
            Ok(self.dim())
        } else {
            Err(Error::dimension_mismatch(self.dim(), other.dim()))
        }
    }

    /// Adds two numbers of the same dimension.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch if the dimensions differ.
    pub fn add(self, other: Self) -> Result<Self> {
        let dim = self.same_dim(other)?;
        Ok(match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a
                .checked_add(b)
                .map_or_else(|| Self::inexact(self.to_f64() + other.to_f64(), 0), Self::Integer),
            (Self::Length(a), Self::Length(b)) => a
                .checked_add(b)
                .map_or_else(|| Self::inexact(self.to_f64() + other.to_f64(), 1), Self::Length),
            _ => Self::inexact(self.to_f64() + other.to_f64(), dim),
        })
    }

    /// Subtracts `other` from `self`.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch if the dimensions differ.
    pub fn sub(self, other: Self) -> Result<Self> {
        self.add(other.negate())
    }

    /// Multiplies two numbers; dimensions add.
    ///
    /// # Errors
    ///
    /// Never fails today; kept fallible to match the other operations.
    pub fn mul(self, other: Self) -> Result<Self> {
        let dim = self.dim() + other.dim();
        let exact = match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a.checked_mul(b).map(Self::Integer),
            (Self::Integer(a), Self::Length(b)) | (Self::Length(a), Self::Integer(b)) => {
                a.checked_mul(b).map(Self::Length)
            }
            _ => None,
        };
        Ok(exact.unwrap_or_else(|| Self::inexact(self.to_f64() * other.to_f64(), dim)))
    }

    /// Divides `self` by `other`; dimensions subtract.
    ///
    /// # Errors
    ///
    /// Returns division by zero if `other` is zero.
    pub fn div(self, other: Self) -> Result<Self> {
        if other.to_f64() == 0.0 {
            return Err(Error::new(ErrorKind::DivisionByZero));
        }
        let dim = self.dim() - other.dim();
        let exact = match (self, other) {
            (Self::Integer(a), Self::Integer(b)) | (Self::Length(a), Self::Length(b))
                if a.checked_rem(b) == Some(0) =>
            {
                a.checked_div(b).map(Self::Integer)
            }
            (Self::Length(a), Self::Integer(b)) if a.checked_rem(b) == Some(0) => {
                a.checked_div(b).map(Self::Length)
            }
            _ => None,
        };
        Ok(exact.unwrap_or_else(|| Self::inexact(self.to_f64() / other.to_f64(), dim)))
    }

    /// Negates this number.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Integer(n) => n
                .checked_neg()
                .map_or_else(|| Self::Real(-self.to_f64()), Self::Integer),
            Self::Length(n) => n
                .checked_neg()
                .map_or_else(|| Self::inexact(-self.to_f64(), 1), Self::Length),
            Self::Real(v) => Self::Real(-v),
            Self::Quantity { value, dim } => Self::Quantity { value: -value, dim },
        }
    }

    /// Compares two numbers of the same dimension.
    ///
    /// # Errors
    ///
    /// Returns a dimension mismatch if the dimensions differ, or an invalid
    /// argument error when a NaN is involved.
    pub fn compare(self, other: Self) -> Result<Ordering> {
        self.same_dim(other)?;
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) | (Self::Length(a), Self::Length(b)) => {
                Ok(a.cmp(&b))
            }
            _ => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .ok_or_else(|| Error::invalid_argument("cannot compare NaN")),
        }
    }

    /// Scales a numeric literal by a unit value.
    ///
    /// The result is exact when the unit is an exact length and the product
    /// is a whole number of internal units.
    #[must_use]
    pub fn scale_literal(literal: Decimal, unit: Self) -> Self {
        if let Self::Length(per_unit) = unit {
            if let Some(units) = literal.mul_exact(per_unit) {
                return Self::Length(units);
            }
        }
        Self::inexact(literal.to_f64() * unit.to_f64(), unit.dim())
    }
}

/// Length of `numer / denom` inches at the given resolution.
///
/// Exact when the ratio is a whole number of internal units.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn unit_length(numer: i64, denom: i64, units_per_inch: i64) -> Number {
    let scaled = units_per_inch * numer;
    if scaled % denom == 0 {
        Number::Length(scaled / denom)
    } else {
        Number::Quantity {
            value: scaled as f64 / denom as f64,
            dim: 1,
        }
    }
}

/// A decimal literal kept exact: `mantissa * 10^exponent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Decimal {
    /// Digits of the literal with the point removed.
    pub mantissa: i64,
    /// Power of ten to apply.
    pub exponent: i32,
}

impl Decimal {
    /// Parses `[-+]digits[.digits]`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (negative, digits) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }
        let mut mantissa: i64 = 0;
        for b in whole.bytes().chain(fraction.bytes()) {
            mantissa = mantissa.checked_mul(10)?.checked_add(i64::from(b - b'0'))?;
        }
        let exponent = -i32::try_from(fraction.len()).ok()?;
        Some(Self {
            mantissa: if negative { -mantissa } else { mantissa },
            exponent,
        })
    }

    /// Returns true if the literal has no fractional digits.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        self.exponent >= 0
    }

    /// Value as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 * 10f64.powi(self.exponent)
    }

    /// `self * factor` if it is a whole number that fits in an `i64`.
    #[must_use]
    pub fn mul_exact(self, factor: i64) -> Option<i64> {
        let product = self.mantissa.checked_mul(factor)?;
        if self.exponent >= 0 {
            let scale = 10i64.checked_pow(self.exponent.unsigned_abs())?;
            return product.checked_mul(scale);
        }
        let divisor = 10i64.checked_pow(self.exponent.unsigned_abs())?;
        (product % divisor == 0).then_some(product / divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn exact_lengths_stay_exact() {
        let inch = unit_length(1, 1, DEFAULT_UNITS_PER_INCH);
        let point = unit_length(1, 72, DEFAULT_UNITS_PER_INCH);
        assert_eq!(inch, Number::Length(72000));
        assert_eq!(point, Number::Length(1000));

        let sum = inch.add(Number::Length(72000)).unwrap();
        assert_eq!(sum, Number::Length(144_000));
    }

    #[test]
    fn metric_units_are_exact_at_default_resolution() {
        assert_eq!(unit_length(5, 127, DEFAULT_UNITS_PER_INCH), Number::Quantity {
            value: 72000.0 * 5.0 / 127.0,
            dim: 1
        });
        assert_eq!(
            unit_length(5000, 127, 127_000),
            Number::Length(5_000_000)
        );
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let err = Number::Length(10).add(Number::Integer(1)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DimensionMismatch { left: 1, right: 0 }));
    }

    #[test]
    fn multiplication_adds_dimensions() {
        let area = Number::Length(2).mul(Number::Length(3)).unwrap();
        assert_eq!(area, Number::Quantity { value: 6.0, dim: 2 });
        assert_eq!(Number::Length(4).mul(Number::Integer(3)).unwrap(), Number::Length(12));
    }

    #[test]
    fn division_cancels_dimensions() {
        assert_eq!(Number::Length(10).div(Number::Length(5)).unwrap(), Number::Integer(2));
        assert_eq!(Number::Integer(1).div(Number::Integer(2)).unwrap(), Number::Real(0.5));
        assert!(matches!(
            Number::Integer(1).div(Number::Integer(0)).unwrap_err().kind,
            ErrorKind::DivisionByZero
        ));
    }

    #[test]
    fn decimal_parse() {
        assert_eq!(Decimal::parse("1.5"), Some(Decimal { mantissa: 15, exponent: -1 }));
        assert_eq!(Decimal::parse("-12"), Some(Decimal { mantissa: -12, exponent: 0 }));
        assert_eq!(Decimal::parse(".25"), Some(Decimal { mantissa: 25, exponent: -2 }));
        assert_eq!(Decimal::parse("."), None);
        assert_eq!(Decimal::parse("1x"), None);
    }

    #[test]
    fn scale_literal_exact_and_inexact() {
        let inch = Number::Length(72000);
        let lit = Decimal::parse("1.5").unwrap();
        assert_eq!(Number::scale_literal(lit, inch), Number::Length(108_000));

        let third = Decimal::parse("0.333").unwrap();
        let odd_unit = Number::Length(7);
        assert!(matches!(
            Number::scale_literal(third, odd_unit),
            Number::Quantity { dim: 1, .. }
        ));
    }

    #[test]
    fn compare_mixed_exactness() {
        assert_eq!(
            Number::Integer(2).compare(Number::Real(2.5)).unwrap(),
            Ordering::Less
        );
        assert!(Number::Length(1).compare(Number::Integer(1)).is_err());
    }

    proptest! {
        #[test]
        fn exact_addition_commutes(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let x = Number::Integer(a).add(Number::Integer(b)).unwrap();
            let y = Number::Integer(b).add(Number::Integer(a)).unwrap();
            prop_assert_eq!(x, y);
        }

        #[test]
        fn length_subtraction_inverts_addition(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let sum = Number::Length(a).add(Number::Length(b)).unwrap();
            prop_assert_eq!(sum.sub(Number::Length(b)).unwrap(), Number::Length(a));
        }
    }
}
