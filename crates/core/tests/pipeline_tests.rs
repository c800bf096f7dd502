//! End-to-end run of the analytics pipeline over a JSON feed.

use chrono::NaiveDate;
use folio_analytics_core::{AnalyticsService, AnalyticsSettings, PortfolioFeed};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const FEED: &str = r#"{
    "fxRates": {
        "CAD": {"2022-01-03": 0.8, "2022-06-01": 0.75}
    },
    "transactions": [
        {"id": "d1", "date": "2022-01-03", "type": "Deposit", "account": "acc-1",
         "currency": "USD", "currencyAmount": 10000},
        {"id": "b1", "date": "2022-01-03T14:30:00Z", "type": "buy", "account": "acc-1",
         "security": {"symbol": "XYZ", "currency": "USD"}, "quantity": 100, "price": 10,
         "currencyAmount": -1000},
        {"id": "b1-fill", "date": "2022-01-03", "type": "buy", "account": "acc-1",
         "security": {"symbol": "XYZ", "currency": "USD"}, "quantity": 100, "price": 20,
         "currencyAmount": -2000},
        {"id": "b-cad", "date": "2022-01-03", "type": "buy", "account": "acc-1",
         "security": {"symbol": "ABC", "currency": "CAD"}, "quantity": 10, "price": 100,
         "currencyAmount": -1000},
        {"id": "jrn", "date": "2022-02-01", "type": "transfer", "account": "acc-1",
         "currency": "USD", "currencyAmount": 500, "originType": "JRN"},
        {"id": "sp-out", "date": "2022-03-01", "type": "split", "account": "acc-1",
         "security": {"symbol": "XYZ", "currency": "USD"}, "quantity": -200,
         "description": "2-for-1 split"},
        {"id": "sp-in", "date": "2022-03-01", "type": "split", "account": "acc-1",
         "security": {"symbol": "XYZ", "currency": "USD"}, "quantity": 400,
         "description": "2-for-1 split"},
        {"id": "div", "date": "2022-04-01", "type": "dividends", "account": "acc-1",
         "security": {"symbol": "XYZ", "currency": "USD"}, "currencyAmount": 40},
        {"id": "fee", "date": "2022-04-01", "type": "fee", "account": "acc-1",
         "currency": "USD", "currencyAmount": -5},
        {"id": "s1", "date": "2022-05-01", "type": "sell", "account": "acc-1",
         "security": {"symbol": "XYZ", "currency": "USD"}, "quantity": -100, "price": 9,
         "currencyAmount": 900},
        {"id": "s-cad", "date": "2022-06-01", "type": "sell", "account": "acc-1",
         "security": {"symbol": "ABC", "currency": "CAD"}, "quantity": -10, "price": 110,
         "currencyAmount": 1100},
        {"id": "gone", "date": "2022-06-02", "type": "buy", "account": "acc-1", "deleted": true},
        {"id": "untyped", "date": "2022-06-03", "account": "acc-1"}
    ],
    "valuations": {"2022-06-30": 11500, "2022-12-31": 12000},
    "positions": [
        {"account": "acc-1", "symbol": "XYZ", "currency": "USD", "quantity": 300, "marketValue": 3000}
    ]
}"#;

fn run() -> folio_analytics_core::PortfolioReport {
    let feed: PortfolioFeed = serde_json::from_str(FEED).unwrap();
    let service = AnalyticsService::new(AnalyticsSettings::default()).unwrap();
    service.run(&feed)
}

#[test]
fn test_normalization_counts() {
    let report = run();
    assert_eq!(report.normalization.received, 13);
    assert_eq!(report.normalization.deleted, 1);
    assert_eq!(report.normalization.untyped, 1);
    assert_eq!(report.normalization.malformed, 0);
    assert_eq!(report.normalization.merged, 1);
}

#[test]
fn test_closed_positions_and_summary() {
    let report = run();

    let symbols: Vec<&str> = report
        .closed_positions
        .iter()
        .map(|p| p.symbol.as_str())
        .collect();
    assert_eq!(symbols, vec!["XYZ", "ABC"]);

    // Merged fill at 15, halved by the split to 7.5
    let xyz = &report.closed_positions[0];
    assert_eq!(xyz.closed_shares, dec!(100));
    assert_eq!(xyz.buy_price, dec!(7.5));
    assert_eq!(xyz.realized_pnl, dec!(150));
    assert_eq!(xyz.contributing_transactions, vec!["b1", "sp-out", "s1"]);

    // Each leg converted at its own date
    let abc = &report.closed_positions[1];
    assert_eq!(abc.buy_cost_base, dec!(800));
    assert_eq!(abc.sell_cost_base, dec!(825));
    assert_eq!(abc.realized_pnl, dec!(25));

    assert_eq!(report.realized_summary.positions, 2);
    assert_eq!(report.realized_summary.realized_pnl, dec!(175));
}

#[test]
fn test_open_positions_and_book_value() {
    let report = run();
    assert_eq!(report.open_positions.len(), 1);
    let open = &report.open_positions[0];
    assert_eq!(open.symbol, "XYZ");
    assert_eq!(open.shares, dec!(300));
    assert_eq!(open.avg_price, dec!(7.5));
    assert_eq!(report.book_value, dec!(2250));
}

#[test]
fn test_daily_cash_flows() {
    let report = run();
    let dates: Vec<NaiveDate> = report.daily_cash_flows.iter().map(|d| d.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
        ]
    );
    assert_eq!(report.daily_cash_flows[0].deposit, dec!(10000));
    assert_eq!(report.daily_cash_flows[1].income, dec!(40));
    assert_eq!(report.daily_cash_flows[1].interest, dec!(5));
}

#[test]
fn test_xirr_and_position_annotation() {
    let report = run();

    let rate = report.xirr.unwrap();
    assert!(rate > dec!(0.20) && rate < dec!(0.21), "xirr was {}", rate);

    let position = &report.positions[0];
    assert_eq!(position.book_value.as_ref().unwrap().base, dec!(2250));
    assert_eq!(position.gain_amount, Some(dec!(750)));
    assert_eq!(position.gain_percent, Some(dec!(33.333333)));
    assert!(position.xirr.is_some());
}

#[test]
fn test_report_serializes_with_host_field_names() {
    let report = run();
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["baseCurrency"], "USD");
    assert!(value["closedPositions"][0]["realizedPnL"].is_number());
    assert!(value["closedPositions"][0]["realizedPnLRatio"].is_number());
    assert!(value["dailyCashFlows"][0]["deposit"].is_number());
    assert!(value["positions"][0]["gainPercent"].is_number());
    assert_eq!(value["normalization"]["merged"], 1);
}

#[test]
fn test_runs_are_repeatable() {
    assert_eq!(run(), run());
    assert_ne!(run().book_value, Decimal::ZERO);
}
