use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::{Decimal, LedgerConfig};
use crate::ledger::MAX_PLANNED_DAYS;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Seeds the stored config row on first start; the stored row wins after.
    pub ledger_defaults: LedgerConfig,
    /// Planned length for cycles opened without an explicit one.
    pub default_cycle_days: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let defaults = LedgerConfig::default();
        let ledger_defaults = LedgerConfig {
            default_commission_pct: parse_decimal(
                &env_map,
                "DEFAULT_COMMISSION_PCT",
                defaults.default_commission_pct,
            )?,
            default_target_profit_pct: parse_decimal(
                &env_map,
                "DEFAULT_TARGET_PROFIT_PCT",
                defaults.default_target_profit_pct,
            )?,
            min_sales_per_day: parse_i64(&env_map, "MIN_SALES_PER_DAY", defaults.min_sales_per_day)?,
            max_sales_per_day: parse_i64(&env_map, "MAX_SALES_PER_DAY", defaults.max_sales_per_day)?,
        };
        ledger_defaults
            .validate()
            .map_err(|msg| ConfigError::InvalidValue("ledger defaults".to_string(), msg))?;

        let default_cycle_days = parse_i64(&env_map, "DEFAULT_CYCLE_DAYS", 15)?;
        if !(1..=MAX_PLANNED_DAYS).contains(&default_cycle_days) {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_CYCLE_DAYS".to_string(),
                format!("must be between 1 and {}", MAX_PLANNED_DAYS),
            ));
        }

        Ok(Config {
            port,
            database_path,
            ledger_defaults,
            default_cycle_days,
        })
    }
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: Decimal,
) -> Result<Decimal, ConfigError> {
    match env_map.get(key) {
        Some(raw) => Decimal::from_str(raw).map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a decimal number".to_string())
        }),
        None => Ok(default),
    }
}

fn parse_i64(env_map: &HashMap<String, String>, key: &str, default: i64) -> Result<i64, ConfigError> {
    match env_map.get(key) {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid i64".to_string())
        }),
        None => Ok(default),
    }
}
