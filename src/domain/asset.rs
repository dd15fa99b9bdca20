//! Asset time series: raw price/dividend/split records and the derived
//! dividend- and split-adjusted close used by every return computation.
//!
//! The adjustment columns are computed once at construction and never
//! mutated. A dividend multiplies into the basis adjustment from its own
//! record date onward (the inclusive convention); a split multiplies into
//! the split adjustment the same way. Adjusted close therefore equals raw
//! close on the first date of the table.

use crate::domain::calendar::TradingCalendar;
use crate::domain::error::KilnError;
use crate::domain::TRADING_DAYS_PER_YEAR;
use chrono::NaiveDate;
use std::sync::Arc;

/// One row of an asset's raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub dividend: f64,
    pub split_ratio: f64,
}

impl AssetRecord {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        AssetRecord {
            date,
            close,
            dividend: 0.0,
            split_ratio: 1.0,
        }
    }
}

/// A continuous slice of an asset's adjusted close, rescaled so that its
/// first value equals an initial weight. Building block for combined
/// portfolio indices.
#[derive(Debug, Clone)]
pub struct PartialIndex {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PartialIndex {
    pub(crate) fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Self {
        PartialIndex { dates, values }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// A tradable security's full price history, in columnar form, with
/// precomputed adjustment factors. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Asset {
    symbol: String,
    calendar: Arc<TradingCalendar>,
    dates: Vec<NaiveDate>,
    close: Vec<f64>,
    basis_adjustment: Vec<f64>,
    split_adjustment: Vec<f64>,
    adjusted_close: Vec<f64>,
}

impl Asset {
    pub fn from_records(
        symbol: impl Into<String>,
        records: &[AssetRecord],
        calendar: Arc<TradingCalendar>,
    ) -> Result<Self, KilnError> {
        let symbol = symbol.into();
        if records.is_empty() {
            return Err(KilnError::validation(format!("{symbol} has no records")));
        }

        let mut dates = Vec::with_capacity(records.len());
        let mut close = Vec::with_capacity(records.len());
        let mut basis_adjustment = Vec::with_capacity(records.len());
        let mut split_adjustment = Vec::with_capacity(records.len());
        let mut adjusted_close = Vec::with_capacity(records.len());

        let mut basis = 1.0;
        let mut split = 1.0;
        for record in records {
            if let Some(&prev) = dates.last() {
                if record.date <= prev {
                    return Err(KilnError::validation(format!(
                        "{symbol} records are not strictly date-ordered at {}",
                        record.date
                    )));
                }
            }
            if !(record.close > 0.0) {
                return Err(KilnError::validation(format!(
                    "{symbol} close on {} must be positive",
                    record.date
                )));
            }
            if record.dividend < 0.0 {
                return Err(KilnError::validation(format!(
                    "{symbol} dividend on {} must be non-negative",
                    record.date
                )));
            }
            if !(record.split_ratio > 0.0) {
                return Err(KilnError::validation(format!(
                    "{symbol} split ratio on {} must be positive",
                    record.date
                )));
            }

            if record.dividend > 0.0 {
                basis *= 1.0 + record.dividend / record.close;
            }
            if record.split_ratio != 1.0 {
                split *= record.split_ratio;
            }

            dates.push(record.date);
            close.push(record.close);
            basis_adjustment.push(basis);
            split_adjustment.push(split);
            adjusted_close.push(record.close * basis * split);
        }

        Ok(Asset {
            symbol,
            calendar,
            dates,
            close,
            basis_adjustment,
            split_adjustment,
            adjusted_close,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// First date with data.
    pub fn begin(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last date with data.
    pub fn end(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Row index for `date`. A date outside [begin, end] is a range error;
    /// a date inside the range with no record is a lookup error — there is
    /// deliberately no fallback to a neighboring day.
    fn index_of(&self, date: NaiveDate) -> Result<usize, KilnError> {
        if date < self.begin() || date > self.end() {
            return Err(KilnError::range(
                self.symbol.clone(),
                date,
                self.begin(),
                self.end(),
            ));
        }
        self.dates.binary_search(&date).map_err(|_| KilnError::Lookup {
            symbol: self.symbol.clone(),
            date,
        })
    }

    /// Raw close on `date`.
    pub fn price(&self, date: NaiveDate) -> Result<f64, KilnError> {
        Ok(self.close[self.index_of(date)?])
    }

    /// Dividend- and split-adjusted close on `date`.
    pub fn adjusted_close(&self, date: NaiveDate) -> Result<f64, KilnError> {
        Ok(self.adjusted_close[self.index_of(date)?])
    }

    pub fn basis_adjustment(&self, date: NaiveDate) -> Result<f64, KilnError> {
        Ok(self.basis_adjustment[self.index_of(date)?])
    }

    pub fn split_adjustment(&self, date: NaiveDate) -> Result<f64, KilnError> {
        Ok(self.split_adjustment[self.index_of(date)?])
    }

    /// Fractional change of adjusted close from `begin` to `end`.
    pub fn total_return(&self, begin: NaiveDate, end: NaiveDate) -> Result<f64, KilnError> {
        let first = self.adjusted_close[self.index_of(begin)?];
        let last = self.adjusted_close[self.index_of(end)?];
        Ok((last - first) / first)
    }

    /// Compound annual growth rate between `begin` and `end`, annualized
    /// over the trading days held (both endpoints count as held days).
    pub fn cagr(&self, begin: NaiveDate, end: NaiveDate) -> Result<f64, KilnError> {
        let total = self.total_return(begin, end)?;
        let days_held = self.calendar.number_trading_days_between(begin, end)? + 1;
        Ok((1.0 + total).powf(TRADING_DAYS_PER_YEAR / days_held as f64) - 1.0)
    }

    /// Annualized volatility of day-over-day percent changes of adjusted
    /// close within [begin, end]. Population variance, 252-day year.
    pub fn volatility(&self, begin: NaiveDate, end: NaiveDate) -> Result<f64, KilnError> {
        let first = self.index_of(begin)?;
        let last = self.index_of(end)?;
        if first > last {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }
        Ok(annualized_volatility(&daily_returns(
            &self.adjusted_close[first..=last],
        )))
    }

    /// CAGR over annualized volatility. No risk-free rate is subtracted;
    /// this is a deliberately simplified ratio, not a textbook Sharpe.
    pub fn simple_sharpe(&self, begin: NaiveDate, end: NaiveDate) -> Result<f64, KilnError> {
        let volatility = self.volatility(begin, end)?;
        if volatility == 0.0 {
            return Ok(0.0);
        }
        Ok(self.cagr(begin, end)? / volatility)
    }

    /// The adjusted close column over [begin, end], borrowed.
    pub fn adjusted_close_between(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<&[f64], KilnError> {
        let first = self.index_of(begin)?;
        let last = self.index_of(end)?;
        if first > last {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }
        Ok(&self.adjusted_close[first..=last])
    }

    /// Adjusted close over [begin, end] rescaled so the value at `begin`
    /// equals `weight`. O(range length).
    pub fn make_index(
        &self,
        begin: NaiveDate,
        weight: f64,
        end: NaiveDate,
    ) -> Result<PartialIndex, KilnError> {
        let first = self.index_of(begin)?;
        let last = self.index_of(end)?;
        if first > last {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }
        let scale = weight / self.adjusted_close[first];
        let values = self.adjusted_close[first..=last]
            .iter()
            .map(|v| v * scale)
            .collect();
        Ok(PartialIndex::new(self.dates[first..=last].to_vec(), values))
    }
}

/// Day-over-day percent changes of a value series.
pub(crate) fn daily_returns(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
}

/// sqrt(252 × population variance) of a daily return series.
pub(crate) fn annualized_volatility(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    (TRADING_DAYS_PER_YEAR * variance).sqrt()
}
