//! Core domain types and logic.

pub mod asset;
pub mod calendar;
pub mod error;
pub mod forecast;
pub mod performance;
pub mod portfolio;
pub mod rebalance;
pub mod strategy;
pub mod universe;
pub mod weighting;

/// Assumed trading days per year for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
