//! Performance accounting across rebalancing periods.
//!
//! Each period's combined index yields a daily return series starting at
//! 0% on its own begin date. The overall record chains those daily
//! returns multiplicatively — a rebalance resets the denominator of the
//! real index, so only percentage returns compose cleanly across a
//! boundary; recomputing growth from absolute index levels would drift.

use crate::domain::asset::annualized_volatility;
use crate::domain::error::KilnError;
use crate::domain::rebalance::TradingPeriod;
use crate::domain::weighting::WeightedIndex;
use crate::domain::TRADING_DAYS_PER_YEAR;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// A per-asset weight delta at a rebalance boundary below this threshold
/// is floating-point noise, not a trade.
pub const TRADE_EPSILON: f64 = 1e-6;

/// One period's index anchored on its trading period.
#[derive(Debug, Clone)]
pub struct PeriodPerformance {
    period: TradingPeriod,
    index: WeightedIndex,
}

impl PeriodPerformance {
    pub fn new(period: TradingPeriod, index: WeightedIndex) -> Result<Self, KilnError> {
        if index.begin() != period.begin() || index.end() != period.end() {
            return Err(KilnError::validation(format!(
                "index covers {} to {} but the period runs {} to {}",
                index.begin(),
                index.end(),
                period.begin(),
                period.end()
            )));
        }
        Ok(PeriodPerformance { period, index })
    }

    pub fn begin(&self) -> NaiveDate {
        self.period.begin()
    }

    pub fn end(&self) -> NaiveDate {
        self.period.end()
    }

    pub fn period(&self) -> &TradingPeriod {
        &self.period
    }

    /// Growth factor over the whole period.
    pub fn growth(&self) -> f64 {
        self.index.growth()
    }

    /// Cumulative return within the period, 0.0 at its begin date.
    pub fn growth_by(&self, date: NaiveDate) -> Result<f64, KilnError> {
        self.index.total_return_by(date)
    }

    pub(crate) fn index(&self) -> &WeightedIndex {
        &self.index
    }
}

/// How a strategy did over an entire run: every period's returns stitched
/// into one continuous record. Built once, read-only afterward.
#[derive(Debug, Clone)]
pub struct OverallPerformance {
    periods: Vec<PeriodPerformance>,
    dates: Vec<NaiveDate>,
    daily_returns: Vec<f64>,
    cumulative: Vec<f64>,
}

impl OverallPerformance {
    pub fn new(periods: Vec<PeriodPerformance>) -> Result<Self, KilnError> {
        if periods.is_empty() {
            return Err(KilnError::validation(
                "performance requires at least one period",
            ));
        }
        check_period_invariants(&periods)?;

        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut daily_returns: Vec<f64> = Vec::new();
        for performance in &periods {
            let period_dates = performance.index().dates();
            let returns = performance.index().daily_returns();
            if dates.last() == Some(&period_dates[0]) {
                // Shares its boundary with the previous period; the
                // boundary date's return already belongs to that period.
                dates.extend_from_slice(&period_dates[1..]);
            } else if dates.is_empty() {
                dates.extend_from_slice(period_dates);
            } else {
                // Disjoint but non-overlapping: the buy day carries 0%.
                dates.extend_from_slice(period_dates);
                daily_returns.push(0.0);
            }
            daily_returns.extend(returns);
        }

        let mut cumulative = Vec::with_capacity(dates.len());
        let mut growth = 1.0;
        cumulative.push(growth);
        for r in &daily_returns {
            growth *= 1.0 + r;
            cumulative.push(growth);
        }

        Ok(OverallPerformance {
            periods,
            dates,
            daily_returns,
            cumulative,
        })
    }

    /// Metrics re-validate the backing period list so a corrupted list
    /// fails fast instead of producing wrong numbers.
    fn recheck(&self) -> Result<(), KilnError> {
        check_period_invariants(&self.periods)
    }

    pub fn begin(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Length of the run in trading days (elements of the stitched
    /// series), not calendar days.
    pub fn duration(&self) -> usize {
        self.dates.len()
    }

    /// Cumulative return at `date`; exactly 0.0 at the run's begin date.
    pub fn growth_by(&self, date: NaiveDate) -> Result<f64, KilnError> {
        self.recheck()?;
        if date < self.begin() || date > self.end() {
            return Err(KilnError::range(
                "performance",
                date,
                self.begin(),
                self.end(),
            ));
        }
        let i = self
            .dates
            .binary_search(&date)
            .map_err(|_| KilnError::Lookup {
                symbol: "performance".into(),
                date,
            })?;
        Ok(self.cumulative[i] - 1.0)
    }

    pub fn total_return(&self) -> Result<f64, KilnError> {
        self.growth_by(self.end())
    }

    pub fn cagr(&self) -> Result<f64, KilnError> {
        let total = self.total_return()?;
        Ok((1.0 + total).powf(TRADING_DAYS_PER_YEAR / self.duration() as f64) - 1.0)
    }

    pub fn volatility(&self) -> Result<f64, KilnError> {
        self.recheck()?;
        Ok(annualized_volatility(&self.daily_returns))
    }

    /// CAGR over annualized volatility; no risk-free rate subtracted.
    pub fn simple_sharpe(&self) -> Result<f64, KilnError> {
        let volatility = self.volatility()?;
        if volatility == 0.0 {
            return Ok(0.0);
        }
        Ok(self.cagr()? / volatility)
    }

    /// The full cumulative-return series, for external plotting.
    pub fn growth_series(&self) -> Vec<(NaiveDate, f64)> {
        self.dates
            .iter()
            .zip(&self.cumulative)
            .map(|(&date, &growth)| (date, growth - 1.0))
            .collect()
    }

    /// Turnover estimate: one trade per asset whose effective basis
    /// weight moves at a boundary — the initial buy-in, every rebalance
    /// where the drifted weight differs from the next target by more than
    /// [`TRADE_EPSILON`], and the final liquidation.
    pub fn number_of_trades(&self) -> Result<usize, KilnError> {
        self.recheck()?;
        let mut trades = 0;

        let first = &self.periods[0];
        for symbol in first.index().symbols() {
            if first.index().weight_of(symbol, first.begin())? > TRADE_EPSILON {
                trades += 1;
            }
        }

        for pair in self.periods.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let symbols: BTreeSet<&str> =
                prev.index().symbols().chain(next.index().symbols()).collect();
            for symbol in symbols {
                let drifted = prev.index().weight_of(symbol, prev.end())?;
                let target = next.index().weight_of(symbol, next.begin())?;
                if (target - drifted).abs() > TRADE_EPSILON {
                    trades += 1;
                }
            }
        }

        let last = &self.periods[self.periods.len() - 1];
        for symbol in last.index().symbols() {
            if last.index().weight_of(symbol, last.end())? > TRADE_EPSILON {
                trades += 1;
            }
        }

        Ok(trades)
    }
}

fn check_period_invariants(periods: &[PeriodPerformance]) -> Result<(), KilnError> {
    for pair in periods.windows(2) {
        if pair[0].begin() > pair[1].begin() {
            return Err(KilnError::validation(format!(
                "periods out of order: {} before {}",
                pair[1].begin(),
                pair[0].begin()
            )));
        }
    }
    for (i, a) in periods.iter().enumerate() {
        for b in &periods[i + 1..] {
            if a.period.overlaps_with(&b.period) {
                return Err(KilnError::validation(format!(
                    "periods {} to {} and {} to {} overlap",
                    a.begin(),
                    a.end(),
                    b.begin(),
                    b.end()
                )));
            }
        }
    }
    Ok(())
}
