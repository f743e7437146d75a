use arbledger::db::open_ledger_db;
use arbledger::domain::{AssetSymbol, CycleId, CycleSelector, Decimal, PurchaseKind, QuantitySpec};
use arbledger::ledger::{InvestmentPolicy, Ledger, LedgerError};
use arbledger::Repository;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

async fn setup() -> (TempDir, Ledger) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = open_ledger_db(&db_path).await.expect("open_ledger_db failed");
    let ledger = Ledger::new(Arc::new(Repository::new(pool)));
    (temp_dir, ledger)
}

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn usdt() -> AssetSymbol {
    AssetSymbol::new("USDT")
}

async fn open_cycle(ledger: &Ledger, investment: &str) -> CycleId {
    ledger
        .cycles()
        .create(15, Some(d(investment)))
        .await
        .expect("create cycle")
        .cycle
        .id
}

#[tokio::test]
async fn test_first_deposit_sets_quantity_and_cost() {
    let (_temp, ledger) = setup().await;
    open_cycle(&ledger, "0").await;

    let receipt = ledger
        .vault()
        .deposit(
            CycleSelector::Active,
            &usdt(),
            d("100"),
            d("1.0"),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();

    assert_eq!(receipt.quantity_acquired, d("100"));
    assert_eq!(receipt.new_average_cost, d("1"));
    assert_eq!(receipt.position.quantity, d("100"));
    assert_eq!(receipt.purchase.kind, PurchaseKind::Deposit);
    assert_eq!(receipt.purchase.usd_amount, d("100"));
    assert_eq!(receipt.initial_investment, d("100"));
}

#[tokio::test]
async fn test_average_cost_tracks_all_deposits_and_ignores_withdrawals() {
    let (_temp, ledger) = setup().await;
    let cycle = open_cycle(&ledger, "0").await;
    let vault = ledger.vault();

    let lots = [("100", "1.00"), ("103", "1.03"), ("99.8", "0.998")];
    let mut total_usd = Decimal::zero();
    for (usd_amount, price) in lots {
        let receipt = vault
            .deposit(
                CycleSelector::Id(cycle),
                &usdt(),
                d(usd_amount),
                d(price),
                InvestmentPolicy::Keep,
            )
            .await
            .unwrap();
        total_usd += d(usd_amount);

        let position = receipt.position;
        assert_eq!(
            (position.quantity * position.average_cost).round_dp(10),
            total_usd,
            "average cost drifted after depositing {} at {}",
            usd_amount,
            price
        );
    }

    let before = vault.position(cycle, &usdt()).await.unwrap().unwrap();
    assert_eq!(before.quantity, d("300"));

    let withdrawal = vault
        .withdraw(
            CycleSelector::Id(cycle),
            &usdt(),
            QuantitySpec::Exact(d("40")),
            InvestmentPolicy::Keep,
        )
        .await
        .unwrap();
    assert_eq!(withdrawal.quantity_withdrawn, d("40"));
    assert_eq!(withdrawal.position.quantity, d("260"));
    assert_eq!(withdrawal.position.average_cost, before.average_cost);
}

#[tokio::test]
async fn test_withdraw_all_keeps_an_empty_position() {
    let (_temp, ledger) = setup().await;
    let cycle = open_cycle(&ledger, "0").await;
    let vault = ledger.vault();
    vault
        .deposit(
            CycleSelector::Id(cycle),
            &usdt(),
            d("50"),
            d("1"),
            InvestmentPolicy::Keep,
        )
        .await
        .unwrap();

    let receipt = vault
        .withdraw(
            CycleSelector::Id(cycle),
            &usdt(),
            QuantitySpec::All,
            InvestmentPolicy::Keep,
        )
        .await
        .unwrap();
    assert_eq!(receipt.quantity_withdrawn, d("50"));

    let position = vault.position(cycle, &usdt()).await.unwrap().unwrap();
    assert!(position.quantity.is_zero());
    assert_eq!(position.average_cost, d("1"));
    assert!(vault.value_of(cycle).await.unwrap().is_zero());
}

#[tokio::test]
async fn test_withdraw_errors() {
    let (_temp, ledger) = setup().await;
    let cycle = open_cycle(&ledger, "0").await;
    let vault = ledger.vault();

    let missing = vault
        .withdraw(
            CycleSelector::Id(cycle),
            &usdt(),
            QuantitySpec::Exact(d("1")),
            InvestmentPolicy::Keep,
        )
        .await;
    assert!(matches!(
        missing,
        Err(LedgerError::AssetNotFound { cycle_id: Some(id), .. }) if id == cycle
    ));

    vault
        .deposit(
            CycleSelector::Id(cycle),
            &usdt(),
            d("10"),
            d("1"),
            InvestmentPolicy::Keep,
        )
        .await
        .unwrap();
    match vault
        .withdraw(
            CycleSelector::Id(cycle),
            &usdt(),
            QuantitySpec::Exact(d("10.5")),
            InvestmentPolicy::Keep,
        )
        .await
    {
        Err(LedgerError::InsufficientInventory {
            requested,
            available,
            ..
        }) => {
            assert_eq!(requested, d("10.5"));
            assert_eq!(available, d("10"));
        }
        other => panic!("expected InsufficientInventory, got {:?}", other),
    }

    let position = vault.position(cycle, &usdt()).await.unwrap().unwrap();
    assert_eq!(position.quantity, d("10"));
}

#[tokio::test]
async fn test_deposit_validation() {
    let (_temp, ledger) = setup().await;
    let vault = ledger.vault();

    let no_cycle = vault
        .deposit(
            CycleSelector::Active,
            &usdt(),
            d("10"),
            d("1"),
            InvestmentPolicy::Keep,
        )
        .await;
    assert!(matches!(no_cycle, Err(LedgerError::NoActiveCycle(None))));

    open_cycle(&ledger, "0").await;
    let zero_price = vault
        .deposit(
            CycleSelector::Active,
            &usdt(),
            d("10"),
            d("0"),
            InvestmentPolicy::Keep,
        )
        .await;
    assert!(matches!(zero_price, Err(LedgerError::InvalidParameter(_))));

    let unknown = vault
        .deposit(
            CycleSelector::Active,
            &AssetSymbol::new("DOGE"),
            d("10"),
            d("1"),
            InvestmentPolicy::Keep,
        )
        .await;
    assert!(matches!(
        unknown,
        Err(LedgerError::AssetNotFound { cycle_id: None, .. })
    ));
}

#[tokio::test]
async fn test_transfer_conserves_total_value() {
    let (_temp, ledger) = setup().await;
    let first = open_cycle(&ledger, "0").await;
    let vault = ledger.vault();
    vault
        .deposit(
            CycleSelector::Id(first),
            &usdt(),
            d("300"),
            d("1.0"),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();
    vault
        .deposit(
            CycleSelector::Id(first),
            &usdt(),
            d("204"),
            d("1.02"),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();
    ledger.cycles().close(CycleSelector::Id(first)).await.unwrap();

    let second = ledger.cycles().create(10, None).await.unwrap();
    assert_eq!(second.seeded_from, Some(first));
    let second = second.cycle.id;

    let total_before = vault.total_value().await.unwrap();
    let receipt = vault
        .transfer(
            CycleSelector::Id(first),
            CycleSelector::Active,
            &usdt(),
            QuantitySpec::Exact(d("250")),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();
    let total_after = vault.total_value().await.unwrap();

    assert_eq!(total_before.round_usd(), total_after.round_usd());
    assert_eq!(receipt.quantity, d("250"));
    assert_eq!(receipt.destination.average_cost, receipt.source.average_cost);
    assert_eq!(receipt.source.quantity, d("250"));
    assert_eq!(receipt.purchase.kind, PurchaseKind::Transfer);

    let destination = ledger.cycles().get(CycleSelector::Id(second)).await.unwrap();
    assert_eq!(destination.initial_investment, receipt.usd_value);
}

#[tokio::test]
async fn test_transfer_rejects_bad_endpoints() {
    let (_temp, ledger) = setup().await;
    let first = open_cycle(&ledger, "0").await;
    let vault = ledger.vault();
    vault
        .deposit(
            CycleSelector::Id(first),
            &usdt(),
            d("100"),
            d("1"),
            InvestmentPolicy::Keep,
        )
        .await
        .unwrap();

    let same = vault
        .transfer(
            CycleSelector::Id(first),
            CycleSelector::Active,
            &usdt(),
            QuantitySpec::All,
            InvestmentPolicy::Keep,
        )
        .await;
    assert!(matches!(same, Err(LedgerError::InvalidParameter(_))));

    ledger.cycles().close(CycleSelector::Id(first)).await.unwrap();
    let second = open_cycle(&ledger, "0").await;
    ledger.cycles().close(CycleSelector::Id(second)).await.unwrap();

    let closed_destination = vault
        .transfer(
            CycleSelector::Id(first),
            CycleSelector::Id(second),
            &usdt(),
            QuantitySpec::All,
            InvestmentPolicy::Keep,
        )
        .await;
    assert!(matches!(
        closed_destination,
        Err(LedgerError::NoActiveCycle(Some(id))) if id == second
    ));

    let position = vault.position(first, &usdt()).await.unwrap().unwrap();
    assert_eq!(position.quantity, d("100"));
}

#[tokio::test]
async fn test_investment_policies() {
    let (_temp, ledger) = setup().await;
    let cycle = open_cycle(&ledger, "0").await;
    let vault = ledger.vault();

    let kept = vault
        .deposit(
            CycleSelector::Id(cycle),
            &usdt(),
            d("100"),
            d("1"),
            InvestmentPolicy::Keep,
        )
        .await
        .unwrap();
    assert!(kept.initial_investment.is_zero());

    let accumulated = vault
        .deposit(
            CycleSelector::Id(cycle),
            &usdt(),
            d("50"),
            d("1"),
            InvestmentPolicy::Accumulate,
        )
        .await
        .unwrap();
    assert_eq!(accumulated.initial_investment, d("50"));

    let withdrawn = vault
        .withdraw(
            CycleSelector::Id(cycle),
            &usdt(),
            QuantitySpec::Exact(d("20")),
            InvestmentPolicy::Accumulate,
        )
        .await
        .unwrap();
    assert_eq!(withdrawn.initial_investment, d("30"));

    let rebased = vault
        .deposit(
            CycleSelector::Id(cycle),
            &AssetSymbol::new("usdc"),
            d("10"),
            d("1"),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();
    assert_eq!(rebased.initial_investment, d("140"));

    let stored = ledger.cycles().get(CycleSelector::Id(cycle)).await.unwrap();
    assert_eq!(stored.initial_investment, d("140"));
    assert_eq!(vault.value_of(cycle).await.unwrap(), d("140"));
    assert_eq!(vault.purchases(cycle).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_deposits_beyond_decimal_range_are_rejected() {
    let (_temp, ledger) = setup().await;
    let cycle_id = open_cycle(&ledger, "0").await;
    let vault = ledger.vault();
    let lot = d("50000000000000000000000000000");

    vault
        .deposit(
            CycleSelector::Active,
            &usdt(),
            lot,
            d("1"),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();

    let second = vault
        .deposit(
            CycleSelector::Active,
            &usdt(),
            lot,
            d("1"),
            InvestmentPolicy::Rebase,
        )
        .await;
    match second {
        Err(LedgerError::InvalidParameter(message)) => {
            assert!(message.contains("exceeds the supported decimal range"));
        }
        other => panic!("expected InvalidParameter, got {:?}", other),
    }

    let position = vault.position(cycle_id, &usdt()).await.unwrap().unwrap();
    assert_eq!(position.quantity, lot);
    assert_eq!(position.average_cost, d("1"));
    assert_eq!(vault.purchases(cycle_id).await.unwrap().len(), 1);
    assert_eq!(vault.value_of(cycle_id).await.unwrap(), lot);
    let cycle = ledger.cycles().get(CycleSelector::Active).await.unwrap();
    assert_eq!(cycle.initial_investment, lot);
}

#[tokio::test]
async fn test_deposit_quantity_overflow_is_not_reported_as_bad_price() {
    let (_temp, ledger) = setup().await;
    open_cycle(&ledger, "0").await;

    let result = ledger
        .vault()
        .deposit(
            CycleSelector::Active,
            &usdt(),
            d("10000000000000000000000000000"),
            d("0.01"),
            InvestmentPolicy::Keep,
        )
        .await;
    match result {
        Err(LedgerError::InvalidParameter(message)) => {
            assert!(message.contains("exceeds the supported decimal range"));
            assert!(!message.contains("must be positive"));
        }
        other => panic!("expected InvalidParameter, got {:?}", other),
    }
}
