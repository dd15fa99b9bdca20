//! Forecasters: per-asset outlooks feeding the portfolio optimizer.
//!
//! A forecaster only ever sees data at or before its forecast date, so a
//! strategy built on one cannot peek ahead.

use crate::domain::error::KilnError;
use crate::domain::universe::AssetUniverse;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Expected behavior of one asset over the upcoming period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetOutlook {
    pub cagr: f64,
    pub volatility: f64,
    pub simple_sharpe: f64,
}

/// Outlooks for every asset in the universe on one forecast date.
#[derive(Debug, Clone)]
pub struct Forecast {
    outlooks: HashMap<String, AssetOutlook>,
}

impl Forecast {
    pub fn new(outlooks: HashMap<String, AssetOutlook>) -> Self {
        Forecast { outlooks }
    }

    fn outlook(&self, symbol: &str) -> Result<&AssetOutlook, KilnError> {
        self.outlooks.get(symbol).ok_or_else(|| {
            KilnError::validation(format!("no outlook for {symbol} in forecast"))
        })
    }

    pub fn cagr(&self, symbol: &str) -> Result<f64, KilnError> {
        Ok(self.outlook(symbol)?.cagr)
    }

    pub fn volatility(&self, symbol: &str) -> Result<f64, KilnError> {
        Ok(self.outlook(symbol)?.volatility)
    }

    pub fn simple_sharpe(&self, symbol: &str) -> Result<f64, KilnError> {
        Ok(self.outlook(symbol)?.simple_sharpe)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.outlooks.keys().map(String::as_str)
    }
}

/// Produces a forecast for every asset in the universe as of `date`.
/// `period_length` is the upcoming holding period in trading days.
pub trait Forecaster {
    fn forecast(
        &self,
        universe: &AssetUniverse,
        date: NaiveDate,
        period_length: u32,
    ) -> Result<Forecast, KilnError>;
}

/// Forecasts zero for everything. The right choice when the optimizer
/// ignores forecasts anyway, as the static-target one does.
#[derive(Debug, Default)]
pub struct NullForecaster;

impl Forecaster for NullForecaster {
    fn forecast(
        &self,
        universe: &AssetUniverse,
        _date: NaiveDate,
        _period_length: u32,
    ) -> Result<Forecast, KilnError> {
        let outlooks = universe
            .symbols()
            .map(|symbol| {
                (
                    symbol.to_string(),
                    AssetOutlook {
                        cagr: 0.0,
                        volatility: 0.0,
                        simple_sharpe: 0.0,
                    },
                )
            })
            .collect();
        Ok(Forecast::new(outlooks))
    }
}

/// Projects each asset's entire history up to the forecast date forward
/// unchanged.
#[derive(Debug, Default)]
pub struct HistoricalAverageForecaster;

impl Forecaster for HistoricalAverageForecaster {
    fn forecast(
        &self,
        universe: &AssetUniverse,
        date: NaiveDate,
        _period_length: u32,
    ) -> Result<Forecast, KilnError> {
        let calendar = universe.calendar();
        let mut outlooks = HashMap::new();
        for symbol in universe.symbols() {
            let asset = universe.asset(symbol)?;
            let end = calendar.nth_trading_day_before(0, date)?;
            let begin = asset.begin();
            outlooks.insert(
                symbol.to_string(),
                AssetOutlook {
                    cagr: asset.cagr(begin, end)?,
                    volatility: asset.volatility(begin, end)?,
                    simple_sharpe: asset.simple_sharpe(begin, end)?,
                },
            );
        }
        Ok(Forecast::new(outlooks))
    }
}

/// Like the historical average but over a trailing window of one holding
/// period, so old regimes age out.
#[derive(Debug, Default)]
pub struct TrailingAverageForecaster;

impl Forecaster for TrailingAverageForecaster {
    fn forecast(
        &self,
        universe: &AssetUniverse,
        date: NaiveDate,
        period_length: u32,
    ) -> Result<Forecast, KilnError> {
        let calendar = universe.calendar();
        let mut outlooks = HashMap::new();
        for symbol in universe.symbols() {
            let asset = universe.asset(symbol)?;
            let end = calendar.nth_trading_day_before(0, date)?;
            // Clamp to the asset's own history when the window reaches
            // back before its first record or before the calendar itself.
            let begin = match calendar.nth_trading_day_before(period_length as usize, date) {
                Ok(trailing) => trailing.max(asset.begin()),
                Err(KilnError::Range { .. }) => asset.begin(),
                Err(e) => return Err(e),
            };
            outlooks.insert(
                symbol.to_string(),
                AssetOutlook {
                    cagr: asset.cagr(begin, end)?,
                    volatility: asset.volatility(begin, end)?,
                    simple_sharpe: asset.simple_sharpe(begin, end)?,
                },
            );
        }
        Ok(Forecast::new(outlooks))
    }
}

/// Fits a least-squares line through each asset's adjusted close up to the
/// forecast date and projects it one holding period forward. Volatility is
/// still taken from history; the regression only shapes the growth outlook.
#[derive(Debug, Default)]
pub struct LinearRegressionForecaster;

impl Forecaster for LinearRegressionForecaster {
    fn forecast(
        &self,
        universe: &AssetUniverse,
        date: NaiveDate,
        period_length: u32,
    ) -> Result<Forecast, KilnError> {
        let calendar = universe.calendar();
        let mut outlooks = HashMap::new();
        for symbol in universe.symbols() {
            let asset = universe.asset(symbol)?;
            let end = calendar.nth_trading_day_before(0, date)?;
            let begin = asset.begin();
            let values = asset.adjusted_close_between(begin, end)?;

            let volatility = asset.volatility(begin, end)?;
            let cagr = projected_growth_rate(values, period_length);
            let simple_sharpe = if volatility == 0.0 {
                0.0
            } else {
                cagr / volatility
            };
            outlooks.insert(
                symbol.to_string(),
                AssetOutlook {
                    cagr,
                    volatility,
                    simple_sharpe,
                },
            );
        }
        Ok(Forecast::new(outlooks))
    }
}

/// Annualized growth implied by extending the fitted line `period_length`
/// trading days past the last observation. A single observation carries no
/// slope and forecasts zero.
fn projected_growth_rate(values: &[f64], period_length: u32) -> f64 {
    let n = values.len();
    if n < 2 || period_length == 0 {
        return 0.0;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / nf;
    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        covariance += dx * (y - mean_y);
        variance += dx * dx;
    }
    let slope = covariance / variance;
    let intercept = mean_y - slope * mean_x;

    let last = values[n - 1];
    let projected = intercept + slope * (nf - 1.0 + period_length as f64);
    let growth = (projected - last) / last;
    // A steep downtrend can project through zero; that is a total loss,
    // not a number to exponentiate.
    if 1.0 + growth <= 0.0 {
        return -1.0;
    }
    (1.0 + growth).powf(crate::domain::TRADING_DAYS_PER_YEAR / period_length as f64) - 1.0
}
