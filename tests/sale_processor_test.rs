use arbledger::db::open_ledger_db;
use arbledger::domain::{AssetSymbol, CycleSelector, Day, Decimal, LedgerConfig};
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

/// Active cycle with `usd` worth of USDT at 1.0 and an open USDT day.
async fn open_trading_day(ledger: &Ledger, usd: &str) -> Day {
    ledger.cycles().create(15, None).await.unwrap();
    ledger
        .vault()
        .deposit(
            CycleSelector::Active,
            &usdt(),
            d(usd),
            d("1.0"),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();
    ledger
        .days()
        .open_day(CycleSelector::Active, Some(&usdt()), Some(d("1.0235")))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_reference_sale_breakdown() {
    let (_temp, ledger) = setup().await;
    let day = open_trading_day(&ledger, "100").await;

    let receipt = ledger
        .sales()
        .register_sale(day.id, None, d("100"), d("1.0235"))
        .await
        .unwrap();

    let sale = &receipt.sale;
    assert_eq!(sale.asset, usdt());
    assert_eq!(sale.cost_basis_total, d("100.00"));
    assert_eq!(sale.gross_amount, d("102.35"));
    assert_eq!(sale.commission, d("0.358225"));
    assert_eq!(sale.net_cash, d("101.991775"));
    assert_eq!(sale.gross_profit, d("2.35"));
    assert_eq!(sale.net_profit, d("1.991775"));

    assert!(receipt.position.quantity.is_zero());
    assert_eq!(receipt.position.average_cost, d("1"));
    assert_eq!(receipt.day.commissions_paid, d("0.358225"));
    assert_eq!(receipt.day.net_profit, d("1.991775"));
    assert_eq!(receipt.day.cash_received, d("101.991775"));
    assert_eq!(receipt.sales_count, 1);
    assert!(!receipt.limit_reached);

    let stored = ledger.days().sales_of(day.id).await.unwrap();
    assert_eq!(stored, vec![receipt.sale.clone()]);
}

#[tokio::test]
async fn test_oversell_changes_nothing() {
    let (_temp, ledger) = setup().await;
    let day = open_trading_day(&ledger, "100").await;

    match ledger
        .sales()
        .register_sale(day.id, None, d("150"), d("1.0235"))
        .await
    {
        Err(LedgerError::InsufficientInventory {
            asset,
            requested,
            available,
        }) => {
            assert_eq!(asset, usdt());
            assert_eq!(requested, d("150"));
            assert_eq!(available, d("100"));
        }
        other => panic!("expected InsufficientInventory, got {:?}", other),
    }

    let position = ledger
        .vault()
        .position(day.cycle_id, &usdt())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(position.quantity, d("100"));
    assert_eq!(position.average_cost, d("1"));

    let after = ledger.days().get(day.id).await.unwrap();
    assert!(after.commissions_paid.is_zero());
    assert!(after.gross_profit.is_zero());
    assert!(after.net_profit.is_zero());
    assert!(after.cash_received.is_zero());
    assert!(ledger.days().sales_of(day.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_oversell_lets_exactly_one_through() {
    let (_temp, ledger) = setup().await;
    let day = open_trading_day(&ledger, "100").await;

    let first = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .sales()
                .register_sale(day.id, None, d("60"), d("1.02"))
                .await
        })
    };
    let second = {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            ledger
                .sales()
                .register_sale(day.id, None, d("60"), d("1.02"))
                .await
        })
    };
    let (first, second) = tokio::join!(first, second);
    let results = [first.unwrap(), second.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let oversold = results
        .iter()
        .filter(|r| matches!(r, Err(LedgerError::InsufficientInventory { .. })))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(oversold, 1);

    let position = ledger
        .vault()
        .position(day.cycle_id, &usdt())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(position.quantity, d("40"));
    assert_eq!(ledger.days().sales_of(day.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sales_limit_is_a_warning() {
    let (_temp, ledger) = setup().await;
    ledger
        .update_config(LedgerConfig {
            min_sales_per_day: 1,
            max_sales_per_day: 1,
            ..LedgerConfig::default()
        })
        .await
        .unwrap();
    let day = open_trading_day(&ledger, "100").await;

    let first = ledger
        .sales()
        .register_sale(day.id, None, d("10"), d("1.02"))
        .await
        .unwrap();
    assert!(first.limit_reached);
    assert_eq!(first.max_sales_per_day, 1);

    let second = ledger
        .sales()
        .register_sale(day.id, None, d("10"), d("1.02"))
        .await
        .unwrap();
    assert!(second.limit_reached);
    assert_eq!(second.sales_count, 2);
}

#[tokio::test]
async fn test_commission_follows_current_config() {
    let (_temp, ledger) = setup().await;
    let day = open_trading_day(&ledger, "100").await;
    ledger
        .update_config(LedgerConfig {
            default_commission_pct: d("1"),
            ..LedgerConfig::default()
        })
        .await
        .unwrap();

    let receipt = ledger
        .sales()
        .register_sale(day.id, None, d("10"), d("1.1"))
        .await
        .unwrap();
    assert_eq!(receipt.sale.commission, d("0.11"));
    assert_eq!(receipt.sale.net_profit, d("0.89"));
}

#[tokio::test]
async fn test_sale_preconditions() {
    let (_temp, ledger) = setup().await;
    let day = open_trading_day(&ledger, "100").await;
    let sales = ledger.sales();

    assert!(matches!(
        sales.register_sale(day.id, None, d("0"), d("1.02")).await,
        Err(LedgerError::InvalidParameter(_))
    ));
    assert!(matches!(
        sales.register_sale(day.id, None, d("1"), d("-1")).await,
        Err(LedgerError::InvalidParameter(_))
    ));
    assert!(matches!(
        sales
            .register_sale(day.id, Some(&AssetSymbol::new("ETH")), d("1"), d("3000"))
            .await,
        Err(LedgerError::AssetNotFound { cycle_id: Some(_), .. })
    ));

    ledger.days().close_day(day.id).await.unwrap();
    assert!(matches!(
        sales.register_sale(day.id, None, d("1"), d("1.02")).await,
        Err(LedgerError::DayNotOpen(id)) if id == day.id
    ));
}

#[tokio::test]
async fn test_day_without_asset_needs_one_per_sale() {
    let (_temp, ledger) = setup().await;
    ledger.cycles().create(15, None).await.unwrap();
    ledger
        .vault()
        .deposit(
            CycleSelector::Active,
            &usdt(),
            d("100"),
            d("1"),
            InvestmentPolicy::Rebase,
        )
        .await
        .unwrap();
    let day = ledger
        .days()
        .open_day(CycleSelector::Active, None, None)
        .await
        .unwrap();

    assert!(matches!(
        ledger
            .sales()
            .register_sale(day.id, None, d("1"), d("1.02"))
            .await,
        Err(LedgerError::InvalidParameter(_))
    ));
    let receipt = ledger
        .sales()
        .register_sale(day.id, Some(&usdt()), d("1"), d("1.02"))
        .await
        .unwrap();
    assert_eq!(receipt.sale.asset, usdt());
}

#[tokio::test]
async fn test_sale_beyond_decimal_range_is_rejected() {
    let (_temp, ledger) = setup().await;
    let day = open_trading_day(&ledger, "1000").await;

    let result = ledger
        .sales()
        .register_sale(day.id, None, d("1000"), d("100000000000000000000000000"))
        .await;
    match result {
        Err(LedgerError::InvalidParameter(message)) => {
            assert!(message.contains("exceeds the supported decimal range"));
            assert!(message.contains("1000"));
        }
        other => panic!("expected InvalidParameter, got {:?}", other),
    }

    let position = ledger
        .vault()
        .position(day.cycle_id, &usdt())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(position.quantity, d("1000"));
    let after = ledger.days().get(day.id).await.unwrap();
    assert!(after.is_open());
    assert!(after.net_profit.is_zero());
    assert!(after.cash_received.is_zero());
    assert!(ledger.days().sales_of(day.id).await.unwrap().is_empty());

    // The ledger keeps working after the rejection.
    let receipt = ledger
        .sales()
        .register_sale(day.id, None, d("100"), d("1.0235"))
        .await
        .unwrap();
    assert_eq!(receipt.position.quantity, d("900"));
}
