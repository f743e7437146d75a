//! Operator settings and the asset catalog.

use serde::{Deserialize, Serialize};

use crate::domain::{AssetSymbol, Decimal};

/// Business parameters read by every pricing and sale operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub default_commission_pct: Decimal,
    pub default_target_profit_pct: Decimal,
    pub min_sales_per_day: i64,
    pub max_sales_per_day: i64,
}

/// Upper bound for a sale commission, in percent.
pub const MAX_COMMISSION_PCT: i64 = 10;
/// Upper bound for a target profit, in percent.
pub const MAX_TARGET_PROFIT_PCT: i64 = 20;
/// Hard ceiling on the configurable sales per day.
pub const MAX_SALES_CEILING: i64 = 20;

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            default_commission_pct: Decimal::from_scaled(35, 2),
            default_target_profit_pct: Decimal::from_i64(2),
            min_sales_per_day: 5,
            max_sales_per_day: 8,
        }
    }
}

impl LedgerConfig {
    /// Check the ranges an operator is allowed to configure.
    ///
    /// # Errors
    /// Returns a human-readable description of the first violated bound.
    pub fn validate(&self) -> Result<(), String> {
        let commission = self.default_commission_pct;
        if commission.is_negative() || commission > Decimal::from_i64(MAX_COMMISSION_PCT) {
            return Err(format!(
                "commission must be between 0 and {}%, got {}",
                MAX_COMMISSION_PCT, commission
            ));
        }

        let target = self.default_target_profit_pct;
        let min_target = Decimal::from_scaled(1, 1);
        if target < min_target || target > Decimal::from_i64(MAX_TARGET_PROFIT_PCT) {
            return Err(format!(
                "target profit must be between 0.1 and {}%, got {}",
                MAX_TARGET_PROFIT_PCT, target
            ));
        }

        if self.min_sales_per_day < 1 {
            return Err("minimum sales per day must be at least 1".to_string());
        }
        if self.max_sales_per_day < self.min_sales_per_day {
            return Err(format!(
                "maximum sales per day ({}) must not be below the minimum ({})",
                self.max_sales_per_day, self.min_sales_per_day
            ));
        }
        if self.max_sales_per_day > MAX_SALES_CEILING {
            return Err(format!(
                "maximum sales per day cannot exceed {}",
                MAX_SALES_CEILING
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stablecoin,
    Crypto,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Stablecoin => "stablecoin",
            AssetKind::Crypto => "crypto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "stablecoin" => Some(AssetKind::Stablecoin),
            "crypto" => Some(AssetKind::Crypto),
            _ => None,
        }
    }
}

/// Catalog entry for a tradable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: AssetSymbol,
    pub name: String,
    pub kind: AssetKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert_eq!(config.default_commission_pct, d("0.35"));
        assert_eq!(config.default_target_profit_pct, d("2"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_commission_bounds() {
        let mut config = LedgerConfig::default();
        config.default_commission_pct = d("10");
        assert!(config.validate().is_ok());
        config.default_commission_pct = d("10.01");
        assert!(config.validate().is_err());
        config.default_commission_pct = d("-0.1");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_target_profit_bounds() {
        let mut config = LedgerConfig::default();
        config.default_target_profit_pct = d("0.05");
        assert!(config.validate().is_err());
        config.default_target_profit_pct = d("20");
        assert!(config.validate().is_ok());
        config.default_target_profit_pct = d("20.5");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sales_limits() {
        let mut config = LedgerConfig::default();
        config.min_sales_per_day = 0;
        assert!(config.validate().is_err());

        config.min_sales_per_day = 6;
        config.max_sales_per_day = 5;
        assert!(config.validate().is_err());

        config.min_sales_per_day = 1;
        config.max_sales_per_day = 21;
        assert!(config.validate().is_err());
    }
}
