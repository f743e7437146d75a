use thiserror::Error;

use crate::domain::{AssetSymbol, CycleId, DayId, Decimal};

/// Failures of ledger operations.
///
/// Every variant carries the ids and amounts needed to explain itself.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cycle {0} is already active")]
    ActiveCycleExists(CycleId),

    #[error("{}", no_active_cycle_message(.0))]
    NoActiveCycle(Option<CycleId>),

    #[error("cycle {cycle_id} still has open day {day_id}")]
    OpenDayExists { cycle_id: CycleId, day_id: DayId },

    #[error("cycle {cycle_id} already has open day {day_id}")]
    DayAlreadyOpen { cycle_id: CycleId, day_id: DayId },

    #[error("day {0} is not open")]
    DayNotOpen(DayId),

    #[error("cycle {cycle_id} has operated all {planned_days} planned days; extend or close it")]
    CycleCompleted { cycle_id: CycleId, planned_days: i64 },

    #[error("{}", asset_not_found_message(.asset, .cycle_id))]
    AssetNotFound {
        asset: AssetSymbol,
        cycle_id: Option<CycleId>,
    },

    #[error("insufficient {asset} inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        asset: AssetSymbol,
        requested: Decimal,
        available: Decimal,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("cycle {0} not found")]
    CycleNotFound(CycleId),

    #[error("day {0} not found")]
    DayNotFound(DayId),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Coarse classification of a `LedgerError` for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced cycle, day or asset does not exist.
    NotFound,
    /// The ledger is not in the state the operation requires.
    Conflict,
    Invalid,
    Storage,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::CycleNotFound(_)
            | LedgerError::DayNotFound(_)
            | LedgerError::AssetNotFound { .. } => ErrorKind::NotFound,
            LedgerError::ActiveCycleExists(_)
            | LedgerError::NoActiveCycle(_)
            | LedgerError::OpenDayExists { .. }
            | LedgerError::DayAlreadyOpen { .. }
            | LedgerError::DayNotOpen(_)
            | LedgerError::CycleCompleted { .. }
            | LedgerError::InsufficientInventory { .. } => ErrorKind::Conflict,
            LedgerError::InvalidParameter(_) => ErrorKind::Invalid,
            LedgerError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Only storage failures may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        LedgerError::InvalidParameter(message.into())
    }

    /// An amount derived from `figures` left the supported decimal range.
    pub(crate) fn out_of_range(figures: impl std::fmt::Display) -> Self {
        LedgerError::InvalidParameter(format!(
            "{} exceeds the supported decimal range",
            figures
        ))
    }
}

fn no_active_cycle_message(cycle_id: &Option<CycleId>) -> String {
    match cycle_id {
        Some(id) => format!("cycle {} is not active", id),
        None => "no active cycle".to_string(),
    }
}

fn asset_not_found_message(asset: &AssetSymbol, cycle_id: &Option<CycleId>) -> String {
    match cycle_id {
        Some(id) => format!("cycle {} holds no {} position", id, asset),
        None => format!("unknown asset {}", asset),
    }
}

/// True when SQLite rejected a write on a unique constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_messages_carry_context() {
        let err = LedgerError::InsufficientInventory {
            asset: AssetSymbol::new("USDT"),
            requested: Decimal::from_str("150").unwrap(),
            available: Decimal::from_str("100").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "insufficient USDT inventory: requested 150, available 100"
        );

        assert_eq!(
            LedgerError::NoActiveCycle(None).to_string(),
            "no active cycle"
        );
        assert_eq!(
            LedgerError::NoActiveCycle(Some(CycleId::new(3))).to_string(),
            "cycle 3 is not active"
        );
        assert_eq!(
            LedgerError::AssetNotFound {
                asset: AssetSymbol::new("eth"),
                cycle_id: Some(CycleId::new(2)),
            }
            .to_string(),
            "cycle 2 holds no ETH position"
        );
        assert_eq!(
            LedgerError::CycleCompleted {
                cycle_id: CycleId::new(4),
                planned_days: 15,
            }
            .to_string(),
            "cycle 4 has operated all 15 planned days; extend or close it"
        );
        assert_eq!(
            LedgerError::out_of_range("sale of 1000 at 5").to_string(),
            "invalid parameter: sale of 1000 at 5 exceeds the supported decimal range"
        );
    }

    #[test]
    fn test_kinds_and_retryability() {
        assert_eq!(
            LedgerError::CycleNotFound(CycleId::new(1)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::DayNotOpen(DayId::new(1)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(LedgerError::invalid("x").kind(), ErrorKind::Invalid);
        assert_eq!(LedgerError::out_of_range("x").kind(), ErrorKind::Invalid);
        assert!(!LedgerError::invalid("x").is_retryable());
        assert!(LedgerError::Storage(sqlx::Error::PoolTimedOut).is_retryable());
    }
}
