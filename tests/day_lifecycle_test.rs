use arbledger::db::open_ledger_db;
use arbledger::domain::{AssetSymbol, CycleSelector, DayStatus, Decimal, PurchaseKind};
use arbledger::engine::PriceAssessment;
use arbledger::ledger::{ErrorKind, InvestmentPolicy, Ledger, LedgerError};
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

/// Active cycle holding 1000 USDT at cost 1.0.
async fn funded(ledger: &Ledger) {
    ledger.cycles().create(15, Some(d("1000"))).await.unwrap();
    ledger
        .vault()
        .deposit(
            CycleSelector::Active,
            &usdt(),
            d("1000"),
            d("1.0"),
            InvestmentPolicy::Keep,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_open_day_numbers_and_capital() {
    let (_temp, ledger) = setup().await;
    funded(&ledger).await;
    let days = ledger.days();

    let first = days
        .open_day(CycleSelector::Active, Some(&usdt()), Some(d("1.0241")))
        .await
        .unwrap();
    assert_eq!(first.day_number, 1);
    assert_eq!(first.initial_capital, d("1000"));
    assert_eq!(first.status, DayStatus::Open);
    assert_eq!(first.published_price, Some(d("1.0241")));

    match days.open_day(CycleSelector::Active, None, None).await {
        Err(LedgerError::DayAlreadyOpen { day_id, .. }) => assert_eq!(day_id, first.id),
        other => panic!("expected DayAlreadyOpen, got {:?}", other),
    }

    ledger
        .sales()
        .register_sale(first.id, None, d("100"), d("1.0235"))
        .await
        .unwrap();
    days.close_day(first.id).await.unwrap();

    let second = days
        .open_day(CycleSelector::Active, None, None)
        .await
        .unwrap();
    assert_eq!(second.day_number, 2);
    assert_eq!(second.initial_capital, d("900"));

    let open = days.open_day_of(CycleSelector::Active).await.unwrap().unwrap();
    assert_eq!(open.id, second.id);
    assert_eq!(days.days_of(CycleSelector::Active).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_open_day_preconditions() {
    let (_temp, ledger) = setup().await;
    let days = ledger.days();

    assert!(matches!(
        days.open_day(CycleSelector::Active, None, None).await,
        Err(LedgerError::NoActiveCycle(None))
    ));

    let cycle = ledger.cycles().create(15, None).await.unwrap().cycle;
    assert!(matches!(
        days.open_day(CycleSelector::Active, Some(&AssetSymbol::new("XYZ")), None)
            .await,
        Err(LedgerError::AssetNotFound { .. })
    ));
    assert!(matches!(
        days.open_day(CycleSelector::Active, None, Some(d("1.02"))).await,
        Err(LedgerError::InvalidParameter(_))
    ));

    ledger.cycles().close(CycleSelector::Active).await.unwrap();
    assert!(matches!(
        days.open_day(CycleSelector::Id(cycle.id), None, None).await,
        Err(LedgerError::NoActiveCycle(Some(id))) if id == cycle.id
    ));
}

#[tokio::test]
async fn test_close_day_aggregates_sales() {
    let (_temp, ledger) = setup().await;
    funded(&ledger).await;
    let day = ledger
        .days()
        .open_day(CycleSelector::Active, Some(&usdt()), None)
        .await
        .unwrap();

    let sales = ledger.sales();
    sales
        .register_sale(day.id, None, d("100"), d("1.0235"))
        .await
        .unwrap();
    sales
        .register_sale(day.id, None, d("50"), d("1.01"))
        .await
        .unwrap();

    let summary = ledger.days().close_day(day.id).await.unwrap();
    assert_eq!(summary.sales_count, 2);
    assert_eq!(summary.commissions_paid, d("0.534975"));
    assert_eq!(summary.gross_profit, d("2.85"));
    assert_eq!(summary.net_profit, d("2.315025"));
    assert_eq!(summary.cash_received, d("152.315025"));
    assert_eq!(summary.final_capital, d("1002.315025"));
    assert_eq!(summary.day.status, DayStatus::Closed);
    assert_eq!(summary.day.final_capital, Some(d("1002.315025")));
    assert!(summary.day.close_time.is_some());

    let cycle = ledger.cycles().get(CycleSelector::Active).await.unwrap();
    assert_eq!(cycle.operated_days, 1);
    assert_eq!(cycle.total_profit, d("2.315025"));

    assert!(matches!(
        ledger.days().close_day(day.id).await,
        Err(LedgerError::DayNotOpen(id)) if id == day.id
    ));
}

#[tokio::test]
async fn test_close_day_without_sales() {
    let (_temp, ledger) = setup().await;
    funded(&ledger).await;
    let day = ledger
        .days()
        .open_day(CycleSelector::Active, None, None)
        .await
        .unwrap();

    let summary = ledger.days().close_day(day.id).await.unwrap();
    assert_eq!(summary.sales_count, 0);
    assert!(summary.net_profit.is_zero());
    assert_eq!(summary.final_capital, d("1000"));
    assert!(summary.roi_pct.is_zero());
}

#[tokio::test]
async fn test_set_published_price_assesses_margin() {
    let (_temp, ledger) = setup().await;
    funded(&ledger).await;
    let day = ledger
        .days()
        .open_day(CycleSelector::Active, None, None)
        .await
        .unwrap();

    let priced = ledger
        .days()
        .set_published_price(day.id, &usdt(), d("1.0241"))
        .await
        .unwrap();
    assert!(priced.assessment.is_profitable());
    assert_eq!(priced.quote.suggested_price.round_price(), d("1.0241"));
    assert_eq!(priced.day.asset, Some(usdt()));
    assert_eq!(priced.day.published_price, Some(d("1.0241")));

    let losing = ledger
        .days()
        .set_published_price(day.id, &usdt(), d("1.0"))
        .await
        .unwrap();
    assert!(matches!(losing.assessment, PriceAssessment::Loss { .. }));

    assert!(matches!(
        ledger
            .days()
            .set_published_price(day.id, &AssetSymbol::new("BTC"), d("65000"))
            .await,
        Err(LedgerError::AssetNotFound { cycle_id: Some(_), .. })
    ));

    ledger.days().close_day(day.id).await.unwrap();
    assert!(matches!(
        ledger
            .days()
            .set_published_price(day.id, &usdt(), d("1.03"))
            .await,
        Err(LedgerError::DayNotOpen(_))
    ));
}

#[tokio::test]
async fn test_reinvest_closed_day_cash() {
    let (_temp, ledger) = setup().await;
    funded(&ledger).await;
    let day = ledger
        .days()
        .open_day(CycleSelector::Active, Some(&usdt()), None)
        .await
        .unwrap();
    ledger
        .sales()
        .register_sale(day.id, None, d("100"), d("1.0235"))
        .await
        .unwrap();

    assert!(matches!(
        ledger.days().reinvest_cash(day.id, &usdt(), d("1")).await,
        Err(LedgerError::InvalidParameter(_))
    ));

    ledger.days().close_day(day.id).await.unwrap();
    let receipt = ledger
        .days()
        .reinvest_cash(day.id, &usdt(), d("1"))
        .await
        .unwrap();
    assert!(receipt.day.cash_reinvested);
    assert_eq!(receipt.deposit.quantity_acquired, d("101.991775"));
    assert_eq!(receipt.deposit.position.quantity, d("1001.991775"));
    assert_eq!(receipt.deposit.position.average_cost, d("1"));
    assert_eq!(receipt.deposit.purchase.kind, PurchaseKind::Reinvest);
    assert_eq!(receipt.deposit.initial_investment, d("1000"));

    assert!(matches!(
        ledger.days().reinvest_cash(day.id, &usdt(), d("1")).await,
        Err(LedgerError::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn test_unknown_day() {
    let (_temp, ledger) = setup().await;
    let missing = arbledger::domain::DayId::new(7);
    assert!(matches!(
        ledger.days().get(missing).await,
        Err(LedgerError::DayNotFound(_))
    ));
    assert!(matches!(
        ledger.days().close_day(missing).await,
        Err(LedgerError::DayNotFound(_))
    ));
}

#[tokio::test]
async fn test_completed_cycle_refuses_new_days_until_extended() {
    let (_temp, ledger) = setup().await;
    let cycle = ledger.cycles().create(2, None).await.unwrap().cycle;
    let days = ledger.days();

    for _ in 0..2 {
        let day = days.open_day(CycleSelector::Active, None, None).await.unwrap();
        days.close_day(day.id).await.unwrap();
    }

    let completed = ledger.cycles().get(CycleSelector::Active).await.unwrap();
    assert_eq!(completed.operated_days, 2);
    assert!(completed.is_completed());
    assert_eq!(completed.days_remaining(), 0);

    let refused = days.open_day(CycleSelector::Active, None, None).await;
    match refused {
        Err(err @ LedgerError::CycleCompleted { .. }) => {
            assert_eq!(err.kind(), ErrorKind::Conflict);
            assert!(matches!(
                err,
                LedgerError::CycleCompleted { cycle_id, planned_days: 2 } if cycle_id == cycle.id
            ));
        }
        other => panic!("expected CycleCompleted, got {:?}", other),
    }
    assert!(days.open_day_of(CycleSelector::Active).await.unwrap().is_none());

    let extended = ledger.cycles().extend(CycleSelector::Active, 1).await.unwrap();
    assert!(!extended.is_completed());
    let third = days.open_day(CycleSelector::Active, None, None).await.unwrap();
    assert_eq!(third.day_number, 3);
}
