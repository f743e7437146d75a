//! Vault ledger: inventory movements and valuation per cycle.

use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::{resolve_cycle, LedgerError};
use crate::db::{LedgerTx, NewPurchase, Repository};
use crate::domain::{
    AssetSymbol, Cycle, CycleId, CycleSelector, Decimal, Purchase, PurchaseKind, QuantitySpec,
    TimeMs, VaultPosition,
};
use crate::engine::weighted_average;

/// How a vault movement feeds back into the cycle's `initial_investment`.
///
/// Only active cycles are adjusted; closed cycles keep their figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentPolicy {
    /// Leave the investment untouched.
    Keep,
    /// Add the USD value moved in, subtract the value moved out.
    Accumulate,
    /// Reset the investment to the vault value after the movement.
    #[default]
    Rebase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub purchase: Purchase,
    pub quantity_acquired: Decimal,
    pub new_average_cost: Decimal,
    pub position: VaultPosition,
    pub initial_investment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    pub quantity_withdrawn: Decimal,
    /// Value of the withdrawn units at the position's average cost.
    pub usd_value: Decimal,
    pub position: VaultPosition,
    pub initial_investment: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub usd_value: Decimal,
    pub source: VaultPosition,
    pub destination: VaultPosition,
    pub purchase: Purchase,
}

/// Deposits, withdrawals and transfers of cycle inventory.
#[derive(Clone)]
pub struct VaultLedger {
    repo: Arc<Repository>,
}

impl VaultLedger {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Buy `usd_amount` worth of `asset` at `unit_price` into an active cycle.
    ///
    /// # Errors
    /// - `InvalidParameter` for a non-positive amount or price
    /// - `NoActiveCycle` when the cycle is closed
    /// - `AssetNotFound` for an asset outside the catalog
    pub async fn deposit(
        &self,
        cycle: CycleSelector,
        asset: &AssetSymbol,
        usd_amount: Decimal,
        unit_price: Decimal,
        policy: InvestmentPolicy,
    ) -> Result<DepositReceipt, LedgerError> {
        if !usd_amount.is_positive() {
            return Err(LedgerError::invalid("deposit amount must be positive"));
        }
        if !unit_price.is_positive() {
            return Err(LedgerError::invalid("unit price must be positive"));
        }

        let mut tx = self.repo.begin_write().await?;
        let cycle = resolve_cycle(&mut tx, cycle).await?;
        if !cycle.is_active() {
            return Err(LedgerError::NoActiveCycle(Some(cycle.id)));
        }
        require_asset(&mut tx, asset).await?;

        let receipt = deposit_in_tx(
            &mut tx,
            &cycle,
            asset,
            usd_amount,
            unit_price,
            PurchaseKind::Deposit,
            policy,
        )
        .await?;
        tx.commit().await?;

        info!(
            cycle_id = %cycle.id,
            asset = %asset,
            usd_amount = %usd_amount,
            unit_price = %unit_price,
            quantity = %receipt.quantity_acquired,
            average_cost = %receipt.new_average_cost,
            "Deposit recorded"
        );
        Ok(receipt)
    }

    /// Take inventory out of a cycle. The average cost is left as is.
    ///
    /// # Errors
    /// - `AssetNotFound` when the cycle holds no such position
    /// - `InsufficientInventory` when the request exceeds the holding
    pub async fn withdraw(
        &self,
        cycle: CycleSelector,
        asset: &AssetSymbol,
        quantity: QuantitySpec,
        policy: InvestmentPolicy,
    ) -> Result<WithdrawalReceipt, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let cycle = resolve_cycle(&mut tx, cycle).await?;

        let (position, withdrawn) = remove_inventory(&mut tx, cycle.id, asset, quantity).await?;
        let usd_value = withdrawn.checked_mul(position.average_cost).ok_or_else(|| {
            LedgerError::out_of_range(format!(
                "withdrawal of {} {} at {}",
                withdrawn, asset, position.average_cost
            ))
        })?;
        let initial_investment = apply_investment_policy(&mut tx, &cycle, policy, -usd_value).await?;
        tx.commit().await?;

        info!(
            cycle_id = %cycle.id,
            asset = %asset,
            quantity = %withdrawn,
            remaining = %position.quantity,
            "Withdrawal recorded"
        );
        Ok(WithdrawalReceipt {
            quantity_withdrawn: withdrawn,
            usd_value,
            position,
            initial_investment,
        })
    }

    /// Move inventory between cycles at the source's average cost.
    ///
    /// Runs as a single transaction: either both sides change or neither.
    ///
    /// # Errors
    /// - `InvalidParameter` when source and destination are the same cycle
    /// - `NoActiveCycle` when the destination is closed
    /// - `AssetNotFound` / `InsufficientInventory` for the source position
    pub async fn transfer(
        &self,
        from: CycleSelector,
        to: CycleSelector,
        asset: &AssetSymbol,
        quantity: QuantitySpec,
        policy: InvestmentPolicy,
    ) -> Result<TransferReceipt, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        let source = resolve_cycle(&mut tx, from).await?;
        let destination = resolve_cycle(&mut tx, to).await?;
        if source.id == destination.id {
            return Err(LedgerError::invalid(format!(
                "cannot transfer cycle {} into itself",
                source.id
            )));
        }
        if !destination.is_active() {
            return Err(LedgerError::NoActiveCycle(Some(destination.id)));
        }

        let (source_position, moved) = remove_inventory(&mut tx, source.id, asset, quantity).await?;
        let average_cost = source_position.average_cost;
        let usd_value = moved.checked_mul(average_cost).ok_or_else(|| {
            LedgerError::out_of_range(format!("transfer of {} {} at {}", moved, asset, average_cost))
        })?;

        let (destination_position, purchase) = add_inventory(
            &mut tx,
            destination.id,
            asset,
            moved,
            average_cost,
            usd_value,
            PurchaseKind::Transfer,
        )
        .await?;

        apply_investment_policy(&mut tx, &source, policy, -usd_value).await?;
        apply_investment_policy(&mut tx, &destination, policy, usd_value).await?;
        tx.commit().await?;

        info!(
            from_cycle = %source.id,
            to_cycle = %destination.id,
            asset = %asset,
            quantity = %moved,
            average_cost = %average_cost,
            "Transfer recorded"
        );
        Ok(TransferReceipt {
            quantity: moved,
            average_cost,
            usd_value,
            source: source_position,
            destination: destination_position,
            purchase,
        })
    }

    /// USD value of a cycle's inventory at average cost.
    pub async fn value_of(&self, cycle_id: CycleId) -> Result<Decimal, LedgerError> {
        let positions = self.repo.positions(cycle_id).await?;
        positions_value(&positions)
    }

    pub async fn positions(&self, cycle_id: CycleId) -> Result<Vec<VaultPosition>, LedgerError> {
        Ok(self.repo.positions(cycle_id).await?)
    }

    pub async fn position(
        &self,
        cycle_id: CycleId,
        asset: &AssetSymbol,
    ) -> Result<Option<VaultPosition>, LedgerError> {
        Ok(self.repo.position(cycle_id, asset).await?)
    }

    pub async fn purchases(&self, cycle_id: CycleId) -> Result<Vec<Purchase>, LedgerError> {
        Ok(self.repo.purchases(cycle_id).await?)
    }

    /// Value of the whole vault across every cycle.
    pub async fn total_value(&self) -> Result<Decimal, LedgerError> {
        let positions = self.repo.all_positions().await?;
        positions_value(&positions)
    }
}

// =========================================================================
// In-transaction building blocks shared with the lifecycles
// =========================================================================

pub(crate) async fn require_asset(tx: &mut LedgerTx, asset: &AssetSymbol) -> Result<(), LedgerError> {
    match tx.asset(asset).await? {
        Some(_) => Ok(()),
        None => Err(LedgerError::AssetNotFound {
            asset: asset.clone(),
            cycle_id: None,
        }),
    }
}

pub(crate) async fn value_in_tx(tx: &mut LedgerTx, cycle_id: CycleId) -> Result<Decimal, LedgerError> {
    let positions = tx.positions(cycle_id).await?;
    positions_value(&positions)
}

/// Sum of position values at average cost.
pub fn positions_value(positions: &[VaultPosition]) -> Result<Decimal, LedgerError> {
    positions
        .iter()
        .try_fold(Decimal::zero(), |total, p| total.checked_add(p.value()?))
        .ok_or_else(|| {
            LedgerError::out_of_range(format!("value of {} vault positions", positions.len()))
        })
}

/// Buy into an active cycle and apply the investment policy.
pub(crate) async fn deposit_in_tx(
    tx: &mut LedgerTx,
    cycle: &Cycle,
    asset: &AssetSymbol,
    usd_amount: Decimal,
    unit_price: Decimal,
    kind: PurchaseKind,
    policy: InvestmentPolicy,
) -> Result<DepositReceipt, LedgerError> {
    if !unit_price.is_positive() {
        return Err(LedgerError::invalid("unit price must be positive"));
    }
    let quantity = usd_amount.checked_div(unit_price).ok_or_else(|| {
        LedgerError::out_of_range(format!(
            "quantity for {} USD at unit price {}",
            usd_amount, unit_price
        ))
    })?;

    let (position, purchase) =
        add_inventory(tx, cycle.id, asset, quantity, unit_price, usd_amount, kind).await?;
    let initial_investment = apply_investment_policy(tx, cycle, policy, usd_amount).await?;

    Ok(DepositReceipt {
        purchase,
        quantity_acquired: quantity,
        new_average_cost: position.average_cost,
        position,
        initial_investment,
    })
}

/// Add `quantity` units at `unit_cost`, re-averaging an existing position.
pub(crate) async fn add_inventory(
    tx: &mut LedgerTx,
    cycle_id: CycleId,
    asset: &AssetSymbol,
    quantity: Decimal,
    unit_cost: Decimal,
    usd_amount: Decimal,
    kind: PurchaseKind,
) -> Result<(VaultPosition, Purchase), LedgerError> {
    let position = match tx.position(cycle_id, asset).await? {
        Some(existing) => {
            let average_cost = weighted_average(
                existing.quantity,
                existing.average_cost,
                quantity,
                unit_cost,
            );
            let total = existing.quantity.checked_add(quantity);
            match (average_cost, total) {
                (Some(average_cost), Some(quantity)) => VaultPosition {
                    average_cost,
                    quantity,
                    ..existing
                },
                _ => {
                    return Err(LedgerError::out_of_range(format!(
                        "adding {} {} at {} to a position of {} at {}",
                        quantity, asset, unit_cost, existing.quantity, existing.average_cost
                    )))
                }
            }
        }
        None => VaultPosition {
            cycle_id,
            asset: asset.clone(),
            quantity,
            average_cost: unit_cost,
        },
    };
    if position.value().is_none() {
        return Err(LedgerError::out_of_range(format!(
            "position of {} {} at {}",
            position.quantity, asset, position.average_cost
        )));
    }
    tx.upsert_position(&position).await?;

    let purchase = tx
        .insert_purchase(&NewPurchase {
            cycle_id,
            asset: asset.clone(),
            quantity,
            usd_amount,
            rate: unit_cost,
            kind,
            timestamp: TimeMs::now(),
        })
        .await?;

    Ok((position, purchase))
}

/// Take units out of a position, returning it afterwards and the amount taken.
///
/// An emptied position stays in place with quantity 0.
pub(crate) async fn remove_inventory(
    tx: &mut LedgerTx,
    cycle_id: CycleId,
    asset: &AssetSymbol,
    quantity: QuantitySpec,
) -> Result<(VaultPosition, Decimal), LedgerError> {
    let mut position = tx
        .position(cycle_id, asset)
        .await?
        .ok_or_else(|| LedgerError::AssetNotFound {
            asset: asset.clone(),
            cycle_id: Some(cycle_id),
        })?;

    let requested = match quantity {
        QuantitySpec::All => position.quantity,
        QuantitySpec::Exact(q) => q,
    };
    if !requested.is_positive() {
        return Err(match quantity {
            QuantitySpec::All => LedgerError::invalid(format!(
                "cycle {} has no {} left to move",
                cycle_id, asset
            )),
            QuantitySpec::Exact(_) => LedgerError::invalid("quantity must be positive"),
        });
    }
    if requested > position.quantity {
        return Err(LedgerError::InsufficientInventory {
            asset: asset.clone(),
            requested,
            available: position.quantity,
        });
    }

    position.quantity -= requested;
    tx.upsert_position(&position).await?;
    Ok((position, requested))
}

/// Adjust an active cycle's `initial_investment` after moving `moved_usd`
/// (negative when value left the cycle). Returns the resulting investment.
pub(crate) async fn apply_investment_policy(
    tx: &mut LedgerTx,
    cycle: &Cycle,
    policy: InvestmentPolicy,
    moved_usd: Decimal,
) -> Result<Decimal, LedgerError> {
    if !cycle.is_active() {
        return Ok(cycle.initial_investment);
    }

    let updated = match policy {
        InvestmentPolicy::Keep => return Ok(cycle.initial_investment),
        InvestmentPolicy::Accumulate => {
            let sum = cycle
                .initial_investment
                .checked_add(moved_usd)
                .ok_or_else(|| {
                    LedgerError::out_of_range(format!(
                        "investment of {} plus {}",
                        cycle.initial_investment, moved_usd
                    ))
                })?;
            std::cmp::max(sum, Decimal::zero())
        }
        InvestmentPolicy::Rebase => value_in_tx(tx, cycle.id).await?,
    };

    if updated != cycle.initial_investment {
        tx.set_initial_investment(cycle.id, updated).await?;
    }
    Ok(updated)
}
