pub mod analytics_service;
pub mod cash_flow;
pub mod holdings;
pub mod ledger;
pub mod performance;

pub use analytics_service::{AnalyticsService, PortfolioFeed, PortfolioReport};
