//! Lossless decimal numeric type backed by rust_decimal.
//!
//! All ledger arithmetic runs at full precision; the `round_*` helpers exist
//! for the presentation boundary only.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decimal places used when presenting USD amounts.
pub const USD_DP: u32 = 2;
/// Decimal places used when presenting asset quantities.
pub const QTY_DP: u32 = 8;
/// Decimal places used when presenting unit prices.
pub const PRICE_DP: u32 = 4;
/// Decimal places used when presenting percentages.
pub const PCT_DP: u32 = 2;

/// Lossless decimal numeric type for ledger calculations.
///
/// Backed by rust_decimal to avoid floating-point drift.
/// Serializes to JSON number (not string) by default.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    /// Create a Decimal from a RustDecimal.
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// `num * 10^-scale`, usable in constants.
    pub const fn from_scaled(num: u32, scale: u32) -> Self {
        Decimal(RustDecimal::from_parts(num, 0, 0, false, scale))
    }

    /// Parse a Decimal from a string losslessly.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid decimal number.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s.trim()).map(Decimal)
    }

    /// Format the Decimal as a canonical string (no exponent notation).
    pub fn to_canonical_string(&self) -> String {
        let normalized = self.0.normalize();
        format!("{}", normalized)
    }

    /// Get the underlying RustDecimal.
    pub fn inner(&self) -> RustDecimal {
        self.0
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    /// The multiplicative identity (1).
    pub fn one() -> Self {
        Decimal(RustDecimal::ONE)
    }

    /// Returns the value 100.
    pub fn hundred() -> Self {
        Decimal(RustDecimal::ONE_HUNDRED)
    }

    pub fn from_i64(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the value is > 0.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    /// Returns true if the value is < 0.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Decimal(self.0.abs())
    }

    /// `None` when the sum leaves the representable range.
    pub fn checked_add(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_add(rhs.0).map(Decimal)
    }

    pub fn checked_sub(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_sub(rhs.0).map(Decimal)
    }

    /// `None` when the product leaves the representable range.
    pub fn checked_mul(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_mul(rhs.0).map(Decimal)
    }

    /// Division that yields `None` on a zero divisor or an overflowing quotient.
    pub fn checked_div(&self, rhs: Decimal) -> Option<Decimal> {
        self.0.checked_div(rhs.0).map(Decimal)
    }

    /// Sum that stops with `None` at the first overflow.
    pub fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Option<Decimal> {
        values
            .into_iter()
            .try_fold(Decimal::zero(), |acc, v| acc.checked_add(v))
    }

    /// Round to `dp` decimal places (banker's rounding).
    pub fn round_dp(&self, dp: u32) -> Self {
        Decimal(self.0.round_dp(dp))
    }

    pub fn round_usd(&self) -> Self {
        self.round_dp(USD_DP)
    }

    pub fn round_qty(&self) -> Self {
        self.round_dp(QTY_DP)
    }

    pub fn round_price(&self) -> Self {
        self.round_dp(PRICE_DP)
    }

    pub fn round_pct(&self) -> Self {
        self.round_dp(PCT_DP)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<RustDecimal> for Decimal {
    fn from(value: RustDecimal) -> Self {
        Decimal(value)
    }
}

impl From<Decimal> for RustDecimal {
    fn from(value: Decimal) -> Self {
        value.0
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Decimal) {
        self.0 += rhs.0;
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Decimal) {
        self.0 -= rhs.0;
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        Decimal(-self.0)
    }
}

impl std::iter::Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, d| acc + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_decimal_canonical_strips_trailing_zeros() {
        assert_eq!(d("102.3500").to_canonical_string(), "102.35");
        assert_eq!(d("100").to_canonical_string(), "100");
        assert!(!d("0.00000001").to_canonical_string().contains('e'));
    }

    #[test]
    fn test_decimal_arithmetic() {
        let a = d("10.5");
        let b = d("2.5");
        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }

    #[test]
    fn test_checked_div_by_zero() {
        assert_eq!(d("1").checked_div(Decimal::zero()), None);
        assert_eq!(d("1").checked_div(d("4")), Some(d("0.25")));
    }

    #[test]
    fn test_boundary_rounding() {
        let commission = d("0.358225");
        assert_eq!(commission.round_usd(), d("0.36"));
        assert_eq!(d("1.02406554").round_price(), d("1.0241"));
        assert_eq!(d("0.123456789").round_qty(), d("0.12345679"));
    }

    #[test]
    fn test_from_scaled_constants() {
        assert_eq!(Decimal::from_scaled(35, 2), d("0.35"));
        assert_eq!(Decimal::from_scaled(5, 1), d("0.5"));
        assert_eq!(Decimal::from_scaled(7, 0), d("7"));
    }

    #[test]
    fn test_checked_ops_report_overflow() {
        let huge = d("60000000000000000000000000000");
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(huge.checked_mul(d("2")), None);
        assert_eq!(d("1000").checked_mul(d("1.5")), Some(d("1500")));
        assert_eq!(d("1").checked_sub(d("0.25")), Some(d("0.75")));
        assert_eq!(Decimal::checked_sum(vec![huge, huge]), None);
        assert_eq!(Decimal::checked_sum(vec![d("1"), d("2.5")]), Some(d("3.5")));
    }

    #[test]
    fn test_sum() {
        let total: Decimal = vec![d("1.5"), d("2.25"), d("-0.75")].into_iter().sum();
        assert_eq!(total, d("3"));
    }

    #[test]
    fn test_deserialize_from_json_number() {
        let value: Decimal = serde_json::from_str("102.35").unwrap();
        assert_eq!(value, d("102.35"));
    }

    #[test]
    fn test_sign_predicates() {
        assert!(d("0.01").is_positive());
        assert!(d("-0.01").is_negative());
        assert!(!Decimal::zero().is_positive());
        assert!(!Decimal::zero().is_negative());
    }
}
