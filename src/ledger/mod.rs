//! Ledger services: the vault, the cycle and day lifecycles, and sales.
//!
//! Every mutating operation runs in one `LedgerTx`, so writers are
//! serialized and a failed operation leaves no partial state behind.

pub mod cycles;
pub mod days;
pub mod error;
pub mod sales;
pub mod vault;

pub use cycles::{
    CycleCloseSummary, CycleCreated, CycleLifecycle, CycleStats, CycleWarning, DayPerformance,
    MAX_PLANNED_DAYS,
};
pub use days::{DayCloseSummary, DayLifecycle, PricedDay, ReinvestReceipt};
pub use error::{ErrorKind, LedgerError};
pub use sales::{SaleProcessor, SaleReceipt};
pub use vault::{
    positions_value, DepositReceipt, InvestmentPolicy, TransferReceipt, VaultLedger,
    WithdrawalReceipt,
};

use std::sync::Arc;
use tracing::info;

use crate::db::{LedgerTx, Repository};
use crate::domain::{Asset, AssetSymbol, Cycle, CycleSelector, LedgerConfig};
use crate::engine::{price_quote, PriceQuote};

/// Resolve a selector inside a write transaction.
pub(crate) async fn resolve_cycle(
    tx: &mut LedgerTx,
    selector: CycleSelector,
) -> Result<Cycle, LedgerError> {
    match selector {
        CycleSelector::Active => tx.active_cycle().await?.ok_or(LedgerError::NoActiveCycle(None)),
        CycleSelector::Id(id) => tx.cycle(id).await?.ok_or(LedgerError::CycleNotFound(id)),
    }
}

/// Resolve a selector for a read.
pub(crate) async fn load_cycle(
    repo: &Repository,
    selector: CycleSelector,
) -> Result<Cycle, LedgerError> {
    match selector {
        CycleSelector::Active => repo.active_cycle().await?.ok_or(LedgerError::NoActiveCycle(None)),
        CycleSelector::Id(id) => repo.cycle(id).await?.ok_or(LedgerError::CycleNotFound(id)),
    }
}

/// Entry point bundling the ledger services around one repository.
#[derive(Clone)]
pub struct Ledger {
    repo: Arc<Repository>,
    vault: VaultLedger,
    cycles: CycleLifecycle,
    days: DayLifecycle,
    sales: SaleProcessor,
}

impl Ledger {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self {
            vault: VaultLedger::new(Arc::clone(&repo)),
            cycles: CycleLifecycle::new(Arc::clone(&repo)),
            days: DayLifecycle::new(Arc::clone(&repo)),
            sales: SaleProcessor::new(Arc::clone(&repo)),
            repo,
        }
    }

    pub fn repo(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn vault(&self) -> &VaultLedger {
        &self.vault
    }

    pub fn cycles(&self) -> &CycleLifecycle {
        &self.cycles
    }

    pub fn days(&self) -> &DayLifecycle {
        &self.days
    }

    pub fn sales(&self) -> &SaleProcessor {
        &self.sales
    }

    pub async fn config(&self) -> Result<LedgerConfig, LedgerError> {
        Ok(self.repo.config().await?)
    }

    /// Replace the stored config after validating its ranges.
    pub async fn update_config(&self, config: LedgerConfig) -> Result<LedgerConfig, LedgerError> {
        config.validate().map_err(LedgerError::InvalidParameter)?;

        let mut tx = self.repo.begin_write().await?;
        tx.store_config(&config).await?;
        tx.commit().await?;

        info!(
            commission_pct = %config.default_commission_pct,
            target_profit_pct = %config.default_target_profit_pct,
            min_sales_per_day = config.min_sales_per_day,
            max_sales_per_day = config.max_sales_per_day,
            "Config updated"
        );
        Ok(config)
    }

    pub async fn assets(&self) -> Result<Vec<Asset>, LedgerError> {
        Ok(self.repo.assets().await?)
    }

    /// Pricing for a cycle's position under the current config.
    pub async fn quote(
        &self,
        cycle: CycleSelector,
        asset: &AssetSymbol,
    ) -> Result<PriceQuote, LedgerError> {
        let cycle = load_cycle(&self.repo, cycle).await?;
        let position = self
            .repo
            .position(cycle.id, asset)
            .await?
            .ok_or_else(|| LedgerError::AssetNotFound {
                asset: asset.clone(),
                cycle_id: Some(cycle.id),
            })?;
        let config = self.repo.config().await?;
        price_quote(
            position.average_cost,
            config.default_target_profit_pct,
            config.default_commission_pct,
        )
        .ok_or_else(|| {
            LedgerError::out_of_range(format!("quote for average cost {}", position.average_cost))
        })
    }
}
