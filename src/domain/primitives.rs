//! Domain primitives: TimeMs, CycleId, DayId, AssetSymbol, and the request
//! selectors `CycleSelector` / `QuantitySpec`.

use serde::{Deserialize, Deserializer, Serialize};

use super::Decimal;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    /// Create a TimeMs from milliseconds.
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    /// Get the underlying milliseconds value.
    pub fn as_ms(&self) -> i64 {
        self.0
    }
}

/// Primary key of a cycle row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(pub i64);

impl CycleId {
    pub fn new(id: i64) -> Self {
        CycleId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary key of a day row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayId(pub i64);

impl DayId {
    pub fn new(id: i64) -> Self {
        DayId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for DayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asset ticker (e.g., "USDT", "BTC"). Always stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetSymbol(String);

impl AssetSymbol {
    /// Create an AssetSymbol, trimming and uppercasing the input.
    pub fn new(symbol: impl AsRef<str>) -> Self {
        AssetSymbol(symbol.as_ref().trim().to_uppercase())
    }

    /// Get the symbol as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AssetSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(AssetSymbol::new(raw))
    }
}

impl std::fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which cycle an operation targets: an explicit id or whichever is active.
///
/// Deserializes from an integer id or the string `"active"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleSelector {
    #[default]
    Active,
    Id(CycleId),
}

impl<'de> Deserialize<'de> for CycleSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Id(i64),
            Keyword(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Id(id) => Ok(CycleSelector::Id(CycleId::new(id))),
            Raw::Keyword(k) if k.trim().eq_ignore_ascii_case("active") => {
                Ok(CycleSelector::Active)
            }
            Raw::Keyword(other) => Err(serde::de::Error::custom(format!(
                "cycle must be an id or \"active\", got {:?}",
                other
            ))),
        }
    }
}

/// Requested quantity for withdrawals and transfers.
///
/// Deserializes from a number or the string `"all"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantitySpec {
    All,
    Exact(Decimal),
}

impl<'de> Deserialize<'de> for QuantitySpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Amount(Decimal),
            Keyword(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Amount(q) => Ok(QuantitySpec::Exact(q)),
            Raw::Keyword(k) if k.trim().eq_ignore_ascii_case("all") => Ok(QuantitySpec::All),
            Raw::Keyword(other) => Err(serde::de::Error::custom(format!(
                "quantity must be a number or \"all\", got {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_asset_symbol_normalized() {
        assert_eq!(AssetSymbol::new(" usdt ").as_str(), "USDT");
        let parsed: AssetSymbol = serde_json::from_str("\"btc\"").unwrap();
        assert_eq!(parsed, AssetSymbol::new("BTC"));
    }

    #[test]
    fn test_cycle_selector_parsing() {
        let by_id: CycleSelector = serde_json::from_str("7").unwrap();
        assert_eq!(by_id, CycleSelector::Id(CycleId::new(7)));

        let active: CycleSelector = serde_json::from_str("\"active\"").unwrap();
        assert_eq!(active, CycleSelector::Active);

        assert!(serde_json::from_str::<CycleSelector>("\"latest\"").is_err());
    }

    #[test]
    fn test_quantity_spec_parsing() {
        let all: QuantitySpec = serde_json::from_str("\"ALL\"").unwrap();
        assert_eq!(all, QuantitySpec::All);

        let exact: QuantitySpec = serde_json::from_str("12.5").unwrap();
        assert_eq!(exact, QuantitySpec::Exact(Decimal::from_str("12.5").unwrap()));

        assert!(serde_json::from_str::<QuantitySpec>("\"half\"").is_err());
    }

    #[test]
    fn test_timems_ordering() {
        let t1 = TimeMs::new(1000);
        let t2 = TimeMs::new(2000);
        assert!(t1 < t2);
    }
}
