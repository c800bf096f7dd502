//! End-to-end run: normalize the feed, fold the ledger and cash flows, solve XIRR,
//! annotate host positions.

use crate::activities::{normalize_transactions, NormalizationStats, RawTransaction};
use crate::constants::DECIMAL_PRECISION;
use crate::context::AnalyticsContext;
use crate::errors::Result;
use crate::fx::{parse_rate_table, CurrencyConverter, RateTable, SharedCurrencyConverter};
use crate::portfolio::cash_flow::{aggregate_cash_flows, DailyCashFlow};
use crate::portfolio::holdings::{annotate_positions, PositionInput, PositionReport};
use crate::portfolio::ledger::{build_ledger, ClosedPosition, OpenPosition, RealizedSummary};
use crate::portfolio::performance::portfolio_xirr;
use crate::settings::AnalyticsSettings;

use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Everything the host platform supplies for one run.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioFeed {
    pub transactions: Vec<RawTransaction>,
    /// Daily portfolio totals in `valuation_currency`.
    pub valuations: BTreeMap<NaiveDate, Decimal>,
    /// Currency of `valuations`; the base currency when absent.
    pub valuation_currency: Option<String>,
    /// currency -> ("YYYY-MM-DD" -> multiplier into base). When non-empty, used for this run instead of the cached rates.
    pub fx_rates: HashMap<String, HashMap<String, Decimal>>,
    pub positions: Vec<PositionInput>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReport {
    pub base_currency: String,
    /// Closed positions with an economic gain or loss, in processing order.
    pub closed_positions: Vec<ClosedPosition>,
    pub open_positions: Vec<OpenPosition>,
    /// Running book value of all open lots, in base currency.
    pub book_value: Decimal,
    pub realized_summary: RealizedSummary,
    pub daily_cash_flows: Vec<DailyCashFlow>,
    /// Annualized money-weighted return; None when unavailable.
    pub xirr: Option<Decimal>,
    pub positions: Vec<PositionReport>,
    pub normalization: NormalizationStats,
}

/// Runs the analytics pipeline against a refreshable FX cache.
#[derive(Debug)]
pub struct AnalyticsService {
    settings: AnalyticsSettings,
    fx: SharedCurrencyConverter,
}

impl AnalyticsService {
    /// Creates a service with an empty rate table.
    pub fn new(settings: AnalyticsSettings) -> Result<Self> {
        let converter = CurrencyConverter::new(&settings.base_currency, Vec::new());
        Self::with_converter(settings, converter)
    }

    pub fn with_converter(settings: AnalyticsSettings, converter: CurrencyConverter) -> Result<Self> {
        let fx = SharedCurrencyConverter::new(converter);
        // Validates the settings and the converter's base currency
        AnalyticsContext::from_shared(settings.clone(), &fx)?;
        Ok(Self { settings, fx })
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    /// Swaps in a wholesale-rebuilt rate table. Runs already in flight keep their snapshot.
    pub fn refresh_rates(&self, table: RateTable) {
        debug!("Refreshing FX rates for {} currencies", table.len());
        self.fx.replace(table);
    }

    /// Context over the rates currently in effect.
    pub fn context(&self) -> Result<AnalyticsContext> {
        AnalyticsContext::from_shared(self.settings.clone(), &self.fx)
    }

    /// Runs the full pipeline. Never fails: unusable records are dropped and counted,
    /// FX misses fall back, an unavailable XIRR is reported as None.
    ///
    /// Rates carried by the feed apply to this run only; the shared cache changes only
    /// through `refresh_rates`.
    pub fn run(&self, feed: &PortfolioFeed) -> PortfolioReport {
        let fx = match self.feed_converter(feed) {
            Some(converter) => Arc::new(converter),
            None => self.fx.snapshot(),
        };
        let context = AnalyticsContext::from_validated(self.settings.clone(), fx);
        Self::run_with_context(&context, feed)
    }

    fn feed_converter(&self, feed: &PortfolioFeed) -> Option<CurrencyConverter> {
        if feed.fx_rates.is_empty() {
            return None;
        }
        match parse_rate_table(&feed.fx_rates) {
            Ok(table) => Some(CurrencyConverter::from_table(&self.settings.base_currency, table)),
            Err(e) => {
                warn!("Ignoring feed FX rates, using cached rates: {}", e);
                None
            }
        }
    }

    /// Runs the pipeline against a fixed context; the feed's own FX rates are not applied.
    pub fn run_with_context(context: &AnalyticsContext, feed: &PortfolioFeed) -> PortfolioReport {
        let settings = context.settings();
        let fx = context.fx();

        let normalized = normalize_transactions(&feed.transactions, context.base_currency());
        let transactions = &normalized.transactions;

        let ledger = build_ledger(transactions, fx, settings.price_precision);
        let daily_cash_flows = aggregate_cash_flows(transactions, settings, fx);

        let valuation_currency = feed
            .valuation_currency
            .as_deref()
            .unwrap_or_else(|| context.base_currency());
        let xirr = portfolio_xirr(
            &daily_cash_flows,
            &feed.valuations,
            valuation_currency,
            fx,
            &settings.xirr,
        )
        .rate_decimal()
        .map(|rate| rate.round_dp(DECIMAL_PRECISION));

        let valuation_date = feed.valuations.keys().next_back().copied();
        let positions = annotate_positions(
            &feed.positions,
            &ledger,
            transactions,
            valuation_date,
            fx,
            &settings.xirr,
        );

        let book_value: Decimal = ledger
            .open_positions
            .iter()
            .map(|position| fx.convert(&position.currency, position.book_value, valuation_date))
            .sum();

        PortfolioReport {
            base_currency: context.base_currency().to_string(),
            closed_positions: ledger.realized_positions().cloned().collect(),
            open_positions: ledger.open_positions.clone(),
            book_value,
            realized_summary: ledger.realized_summary(),
            daily_cash_flows,
            xirr,
            positions,
            normalization: normalized.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activities::SecurityRef;
    use rust_decimal_macros::dec;

    fn raw(id: &str, kind: &str, date: &str) -> RawTransaction {
        RawTransaction {
            id: id.to_string(),
            date: date.to_string(),
            transaction_type: Some(kind.to_string()),
            account_id: "acc-1".to_string(),
            currency: Some("USD".to_string()),
            ..Default::default()
        }
    }

    fn trade(id: &str, kind: &str, date: &str, quantity: Decimal, price: Decimal) -> RawTransaction {
        RawTransaction {
            security: Some(SecurityRef {
                symbol: "XYZ".to_string(),
                currency: Some("USD".to_string()),
                security_type: None,
            }),
            quantity: Some(quantity),
            price: Some(price),
            currency_amount: Some(-(quantity * price)),
            ..raw(id, kind, date)
        }
    }

    #[test]
    fn test_run_reports_realized_and_cash_flows() {
        let service = AnalyticsService::new(AnalyticsSettings::default()).unwrap();
        let feed = PortfolioFeed {
            transactions: vec![
                RawTransaction {
                    currency_amount: Some(dec!(1000)),
                    ..raw("dep", "deposit", "2022-01-01")
                },
                trade("b1", "buy", "2022-01-01", dec!(10), dec!(100)),
                trade("s1", "sell", "2022-06-01", dec!(-5), dec!(110)),
                raw("junk", "", "2022-06-02"),
            ],
            valuations: BTreeMap::from([(
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                dec!(1100),
            )]),
            ..Default::default()
        };

        let report = service.run(&feed);

        assert_eq!(report.base_currency, "USD");
        assert_eq!(report.closed_positions.len(), 1);
        assert_eq!(report.realized_summary.realized_pnl, dec!(50));
        assert_eq!(report.open_positions.len(), 1);
        assert_eq!(report.book_value, dec!(500));
        assert_eq!(report.daily_cash_flows.len(), 1);
        assert_eq!(report.daily_cash_flows[0].deposit, dec!(1000));
        let rate = report.xirr.unwrap();
        assert!((rate - dec!(0.1)).abs() < dec!(0.000001), "xirr was {}", rate);
        assert_eq!(report.normalization.received, 4);
        assert_eq!(report.normalization.malformed + report.normalization.untyped, 1);
    }

    #[test]
    fn test_feed_rates_apply_to_their_run_only() {
        let service = AnalyticsService::new(AnalyticsSettings::default()).unwrap();
        let deposit = RawTransaction {
            currency: Some("CAD".to_string()),
            currency_amount: Some(dec!(100)),
            ..raw("dep", "deposit", "2023-01-02")
        };
        let with_rates = PortfolioFeed {
            transactions: vec![deposit.clone()],
            fx_rates: HashMap::from([(
                "CAD".to_string(),
                HashMap::from([("2023-01-02".to_string(), dec!(0.74))]),
            )]),
            ..Default::default()
        };
        let without_rates = PortfolioFeed {
            transactions: vec![deposit],
            ..Default::default()
        };

        let first = service.run(&with_rates);
        let second = service.run(&without_rates);

        assert_eq!(first.daily_cash_flows[0].deposit, dec!(74));
        // No rate history left behind: CAD converts at the 1.0 fallback
        assert_eq!(second.daily_cash_flows[0].deposit, dec!(100));
        assert!(!service.context().unwrap().fx().has_currency("CAD"));
    }

    #[test]
    fn test_refreshed_rates_are_shared_across_runs() {
        let service = AnalyticsService::new(AnalyticsSettings::default()).unwrap();
        let table = parse_rate_table(&HashMap::from([(
            "CAD".to_string(),
            HashMap::from([("2023-01-02".to_string(), dec!(0.74))]),
        )]))
        .unwrap();
        service.refresh_rates(table);

        let context = service.context().unwrap();
        assert_eq!(context.fx().latest_rate("CAD"), Some(dec!(0.74)));
    }

    #[test]
    fn test_bad_feed_rates_keep_cached_rates() {
        let service = AnalyticsService::new(AnalyticsSettings::default()).unwrap();
        let feed = PortfolioFeed {
            fx_rates: HashMap::from([(
                "CAD".to_string(),
                HashMap::from([("yesterday".to_string(), dec!(0.74))]),
            )]),
            ..Default::default()
        };

        let report = service.run(&feed);

        assert!(report.closed_positions.is_empty());
        assert_eq!(report.xirr, None);
        assert!(!service.context().unwrap().fx().has_currency("CAD"));
    }
}
