use std::sync::Arc;

use fintrack_core::date::{from_day, month_ends, to_day};
use fintrack_core::{CoreError, Ledger, TransactionFilter, TransactionRecord};

fn day(y: i32, m: u32, d: u32) -> f64 {
    from_day(chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn record(date: f64, category: &str, item: &str, amount: f64, ext: Option<&str>) -> TransactionRecord {
    TransactionRecord {
        external_id: ext.map(String::from),
        date: Some(date),
        category: Some(category.to_string()),
        item: Some(item.to_string()),
        label: None,
        amount: Some(amount),
    }
}

fn year_of_records() -> Vec<TransactionRecord> {
    vec![
        record(day(2024, 1, 5), "Revenus", "Salary", 2000.0, None),
        record(day(2024, 1, 10), "Charge", "Rent", 800.0, None),
        record(day(2024, 1, 15), "Investissement", "ETF", 1000.0, Some("I-ETF")),
        record(day(2024, 2, 5), "Revenus", "Salary", 2000.0, None),
        record(day(2024, 2, 10), "Charge", "Rent", 800.0, None),
        record(day(2024, 2, 20), "Investissement", "Crypto", 500.0, Some("I-BTC")),
        record(day(2024, 3, 1), "Gain investissement", "Crypto", 200.0, Some("I-BTC")),
        record(day(2024, 3, 5), "Revenus", "Salary", 2000.0, None),
        record(day(2024, 3, 20), "Gain investissement", "ETF", 1150.0, Some("I-ETF")),
    ]
}

#[tokio::test]
async fn test_history_uses_month_ends() {
    let ledger = Ledger::new();
    ledger.import(year_of_records()).await.unwrap();

    let report = ledger.net_worth_report();
    let dates: Vec<f64> = report.points.iter().map(|p| p.date).collect();
    assert_eq!(dates, month_ends(day(2024, 1, 5), day(2024, 3, 20)));
    assert_eq!(to_day(dates[1]), chrono::NaiveDate::from_ymd_opt(2024, 2, 29));

    // January: ETF open at a loss, left out
    assert_eq!(report.points[0].net_worth, 1200.0);
    // February: BTC open at a loss as well
    assert_eq!(report.points[1].net_worth, 2400.0);
    // March: ETF now in profit (+150), BTC still at a loss (-300)
    assert_eq!(report.points[2].net_worth, 4550.0);
    assert_eq!(report.change, 3350.0);
}

#[tokio::test]
async fn test_closing_a_losing_position_counts_the_loss() {
    let ledger = Ledger::new();
    ledger.import(year_of_records()).await.unwrap();
    let date = day(2024, 3, 31);

    let before = ledger.net_worth_breakdown(date);
    assert_eq!(before.excluded_groups, vec![Some("I-BTC".to_string())]);

    let btc = ledger.validate_investment("I-BTC").await.unwrap();
    assert!((btc.profitability - (-60.0)).abs() < 1e-9);
    assert_eq!(btc.annual_profitability, ((200.0_f64 / 500.0).powf(365.0 / 10.0) - 1.0) * 100.0);

    let after = ledger.net_worth_breakdown(date);
    assert!(after.excluded_groups.is_empty());
    assert_eq!(after.total, before.total - 300.0);

    ledger.invalidate_investment("I-BTC").await.unwrap();
    assert_eq!(ledger.net_worth_breakdown(date), before);
}

#[tokio::test]
async fn test_repeated_imports_keep_balances_consistent() {
    let ledger = Ledger::new();
    let records = year_of_records();
    let (first, second) = records.split_at(4);

    // later batch arrives first
    ledger.import(second.to_vec()).await.unwrap();
    ledger.import(first.to_vec()).await.unwrap();

    let txns = ledger.transactions();
    let mut running = 0.0;
    for txn in &txns {
        running += txn.variation;
        assert_eq!(txn.balance, running);
    }
    assert_eq!(ledger.summary().current_balance, running);

    let etf = ledger.investment("I-ETF").unwrap();
    assert_eq!(etf.invested, 1000.0);
    assert_eq!(etf.earned, 1150.0);
    assert_eq!(etf.date_begin, day(2024, 1, 15));
}

#[tokio::test]
async fn test_filters_and_pages() {
    let ledger = Ledger::new();
    ledger.import(year_of_records()).await.unwrap();

    let filter = TransactionFilter {
        item: Some("Salary".to_string()),
        ..Default::default()
    };
    let page = ledger.transaction_page(&filter, 0, 2);
    assert_eq!(page.total_count, 3);
    assert_eq!(page.transactions.len(), 2);
    assert_eq!(page.transactions[0].date, Some(day(2024, 3, 5)));

    let months = ledger.monthly_summaries(2024);
    assert_eq!(months.len(), 3);
    assert_eq!(months[1].net_income, 1200.0);
}

#[tokio::test]
async fn test_live_watch_sees_concurrent_imports() {
    let ledger = Arc::new(Ledger::new());
    let mut watch = ledger.watch_net_worth();
    watch.set_target(Some(day(2024, 12, 31)));

    let writer = Arc::clone(&ledger);
    let handle = tokio::spawn(async move { writer.import(year_of_records()).await });

    let live = watch.changed().await.unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(live.total, ledger.net_worth_at(day(2024, 12, 31)));
    assert_eq!(live.total, 4550.0);
}

#[tokio::test]
async fn test_errors_carry_codes() {
    let ledger = Ledger::new();
    let err = ledger.validate_investment("I-none").await.unwrap_err();
    assert!(matches!(err, CoreError::PositionNotFound { ref external_id } if external_id == "I-none"));
    assert_eq!(err.to_details().code, err.code());
}
