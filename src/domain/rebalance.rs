//! Rebalancing policies: partitioning a backtest range into trading
//! periods.
//!
//! A produced period sequence is sorted by begin, mutually non-overlapping
//! (adjacent periods share their boundary date), and spans the requested
//! range, truncated at the edges when the range does not divide evenly.

use crate::domain::calendar::TradingCalendar;
use crate::domain::error::KilnError;
use chrono::{Datelike, NaiveDate};
use std::sync::Arc;

/// One holding period: the target weighting chosen at `begin` is held
/// through `end`, where the next rebalance (or liquidation) happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingPeriod {
    begin: NaiveDate,
    end: NaiveDate,
}

impl TradingPeriod {
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Result<Self, KilnError> {
        if begin > end {
            return Err(KilnError::validation(format!(
                "period begin {begin} is after end {end}"
            )));
        }
        Ok(TradingPeriod { begin, end })
    }

    pub fn begin(&self) -> NaiveDate {
        self.begin
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Open-interval overlap: sharing an exact boundary date does not
    /// count.
    pub fn overlaps_with(&self, other: &TradingPeriod) -> bool {
        if self.begin < other.begin {
            self.end > other.begin
        } else {
            other.end > self.begin
        }
    }
}

/// When to re-target the portfolio. Pure range-to-sequence functions; the
/// only state is configuration.
pub trait RebalancingPolicy {
    fn periods_during(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingPeriod>, KilnError>;

    /// Nominal period length in trading days, used by forecasters.
    fn period_length(&self) -> u32;
}

/// Holds the starting portfolio untouched for the whole range. Single
/// shot: the range is fixed at construction and `periods_during` must be
/// called with exactly that range.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    begin: NaiveDate,
    end: NaiveDate,
    length: u32,
}

impl BuyAndHold {
    pub fn new(
        calendar: &TradingCalendar,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, KilnError> {
        if begin > end {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }
        let length = calendar.number_trading_days_between(begin, end)? as u32;
        Ok(BuyAndHold { begin, end, length })
    }
}

impl RebalancingPolicy for BuyAndHold {
    fn periods_during(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingPeriod>, KilnError> {
        if begin != self.begin || end != self.end {
            return Err(KilnError::validation(format!(
                "buy-and-hold was constructed for {} to {}, asked for {begin} to {end}",
                self.begin, self.end
            )));
        }
        Ok(vec![TradingPeriod::new(begin, end)?])
    }

    fn period_length(&self) -> u32 {
        self.length
    }
}

/// Rebalances yearly on the anniversary of the range's begin date, each
/// anchor snapped forward to an actual trading day.
#[derive(Debug, Clone)]
pub struct AnnualRebalance {
    calendar: Arc<TradingCalendar>,
}

impl AnnualRebalance {
    pub fn new(calendar: Arc<TradingCalendar>) -> Self {
        AnnualRebalance { calendar }
    }
}

impl RebalancingPolicy for AnnualRebalance {
    fn periods_during(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingPeriod>, KilnError> {
        if begin > end {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }

        let mut anchors = Vec::new();
        let mut year = begin.year();
        loop {
            let Some(candidate) = yearly_anchor(year, begin) else {
                break;
            };
            if candidate > end {
                break;
            }
            let anchor = self.calendar.nth_trading_day_after(0, candidate)?;
            if anchor > end {
                break;
            }
            anchors.push(anchor);
            year += 1;
        }

        consecutive_periods(&anchors)
    }

    fn period_length(&self) -> u32 {
        252
    }
}

/// The begin date's month/day in `year`; Feb 29 falls over to Mar 1 in
/// non-leap years.
fn yearly_anchor(year: i32, begin: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, begin.month(), begin.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

/// Rebalances every `ndays` trading days from the range's begin date.
#[derive(Debug, Clone)]
pub struct NDayRebalance {
    calendar: Arc<TradingCalendar>,
    ndays: usize,
}

impl NDayRebalance {
    pub fn new(calendar: Arc<TradingCalendar>, ndays: usize) -> Result<Self, KilnError> {
        if ndays == 0 {
            return Err(KilnError::validation(
                "rebalance interval must be at least 1 trading day",
            ));
        }
        Ok(NDayRebalance { calendar, ndays })
    }
}

impl RebalancingPolicy for NDayRebalance {
    fn periods_during(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingPeriod>, KilnError> {
        if begin > end {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }

        let anchors: Vec<NaiveDate> = self
            .calendar
            .every_nth_trading_day_between(begin, end, self.ndays)?
            .into_iter()
            .filter(|&anchor| anchor <= end)
            .collect();

        consecutive_periods(&anchors)
    }

    fn period_length(&self) -> u32 {
        self.ndays as u32
    }
}

/// Pairs consecutive anchors into periods; fewer than two anchors means
/// the range cannot hold a full period.
fn consecutive_periods(anchors: &[NaiveDate]) -> Result<Vec<TradingPeriod>, KilnError> {
    anchors
        .windows(2)
        .map(|pair| TradingPeriod::new(pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> Arc<TradingCalendar> {
        Arc::new(TradingCalendar::with_end(date(2000, 1, 1), date(2013, 12, 31)).unwrap())
    }

    fn assert_period_invariants(periods: &[TradingPeriod]) {
        for pair in periods.windows(2) {
            assert!(pair[0].begin() < pair[1].begin());
            assert!(!pair[0].overlaps_with(&pair[1]));
            assert_eq!(pair[0].end(), pair[1].begin());
        }
    }

    #[test]
    fn buy_and_hold_yields_one_period() {
        let cal = calendar();
        let begin = date(2003, 1, 2);
        let end = date(2012, 12, 31);
        let rule = BuyAndHold::new(&cal, begin, end).unwrap();

        let periods = rule.periods_during(begin, end).unwrap();
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].begin(), begin);
        assert_eq!(periods[0].end(), end);
        assert_eq!(
            rule.period_length() as usize,
            cal.number_trading_days_between(begin, end).unwrap()
        );
    }

    #[test]
    fn buy_and_hold_rejects_a_different_range() {
        let cal = calendar();
        let rule = BuyAndHold::new(&cal, date(2003, 1, 2), date(2012, 12, 31)).unwrap();
        assert!(matches!(
            rule.periods_during(date(2003, 1, 2), date(2011, 12, 30)),
            Err(KilnError::Validation { .. })
        ));
    }

    #[test]
    fn annual_includes_begin_and_end_when_valid() {
        let rule = AnnualRebalance::new(calendar());
        let periods = rule
            .periods_during(date(2001, 1, 3), date(2013, 1, 3))
            .unwrap();
        assert_eq!(periods.len(), 12);
        assert_eq!(periods[0].begin(), date(2001, 1, 3));
        assert_eq!(periods[periods.len() - 1].end(), date(2013, 1, 3));
        assert_period_invariants(&periods);
    }

    #[test]
    fn annual_snaps_anchors_to_trading_days() {
        let rule = AnnualRebalance::new(calendar());
        let periods = rule
            .periods_during(date(2003, 1, 2), date(2012, 12, 31))
            .unwrap();
        // The 2005 anniversary fell on a Sunday; it snaps to Monday Jan 3.
        assert_eq!(periods[0].end(), date(2004, 1, 2));
        assert_eq!(periods[1].begin(), date(2004, 1, 2));
        assert_eq!(periods[1].end(), date(2005, 1, 3));
        assert_eq!(periods[2].begin(), date(2005, 1, 3));
        assert_period_invariants(&periods);
    }

    #[test]
    fn annual_periods_are_roughly_a_trading_year() {
        let cal = calendar();
        let rule = AnnualRebalance::new(cal.clone());
        let periods = rule
            .periods_during(date(2003, 1, 3), date(2012, 12, 31))
            .unwrap();
        assert!(!periods.is_empty());
        for period in &periods {
            let days = cal
                .number_trading_days_between(period.begin(), period.end())
                .unwrap() as i64;
            assert!((days - 252).abs() < 3, "period held {days} trading days");
        }
    }

    #[test]
    fn annual_range_shorter_than_a_year_is_empty() {
        let rule = AnnualRebalance::new(calendar());
        assert!(
            rule.periods_during(date(2001, 1, 3), date(2001, 1, 4))
                .unwrap()
                .is_empty()
        );
        assert!(
            rule.periods_during(date(2001, 1, 3), date(2001, 1, 3))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn nday_first_period_ends_n_trading_days_in() {
        let rule = NDayRebalance::new(calendar(), 2).unwrap();
        let periods = rule
            .periods_during(date(2012, 1, 3), date(2012, 1, 31))
            .unwrap();
        assert_eq!(periods[0].begin(), date(2012, 1, 3));
        assert_eq!(periods[0].end(), date(2012, 1, 5));
    }

    #[test]
    fn nday_periods_hold_exactly_n_days() {
        let cal = calendar();
        let rule = NDayRebalance::new(cal.clone(), 5).unwrap();
        let periods = rule
            .periods_during(date(2012, 1, 3), date(2012, 1, 31))
            .unwrap();
        assert!(!periods.is_empty());
        for period in &periods {
            assert_eq!(
                cal.number_trading_days_between(period.begin(), period.end())
                    .unwrap(),
                5
            );
        }
        assert_period_invariants(&periods);
    }

    #[test]
    fn nday_strides_over_weekends() {
        let rule = NDayRebalance::new(calendar(), 5).unwrap();
        let periods = rule
            .periods_during(date(2012, 1, 6), date(2012, 1, 31))
            .unwrap();
        assert_eq!(periods[0].begin(), date(2012, 1, 6));
        assert_eq!(periods[0].end(), date(2012, 1, 13));
    }

    #[test]
    fn nday_strides_over_holidays() {
        // New Year's observed Monday Jan 2 2012.
        let rule = NDayRebalance::new(calendar(), 5).unwrap();
        let periods = rule
            .periods_during(date(2011, 12, 30), date(2012, 1, 31))
            .unwrap();
        assert_eq!(periods[0].begin(), date(2011, 12, 30));
        assert_eq!(periods[0].end(), date(2012, 1, 9));
    }

    #[test]
    fn nday_keeps_a_period_ending_exactly_on_end() {
        let rule = NDayRebalance::new(calendar(), 5).unwrap();
        let periods = rule
            .periods_during(date(2012, 1, 3), date(2012, 2, 1))
            .unwrap();
        assert_eq!(periods[0].begin(), date(2012, 1, 3));
        assert_eq!(periods[periods.len() - 1].end(), date(2012, 2, 1));
    }

    #[test]
    fn nday_range_shorter_than_one_period_is_empty() {
        let rule = NDayRebalance::new(calendar(), 5).unwrap();
        assert!(
            rule.periods_during(date(2001, 1, 3), date(2001, 1, 4))
                .unwrap()
                .is_empty()
        );
        assert!(
            rule.periods_during(date(2001, 1, 3), date(2001, 1, 3))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn inverted_range_fails() {
        let rule = NDayRebalance::new(calendar(), 5).unwrap();
        assert!(matches!(
            rule.periods_during(date(2012, 1, 31), date(2012, 1, 3)),
            Err(KilnError::Validation { .. })
        ));
    }

    #[test]
    fn zero_day_interval_rejected() {
        assert!(matches!(
            NDayRebalance::new(calendar(), 0),
            Err(KilnError::Validation { .. })
        ));
    }

    proptest! {
        #[test]
        fn nday_invariants_hold(
            start_offset in 0i64..2000,
            span in 1i64..400,
            ndays in 1usize..30,
        ) {
            let cal = calendar();
            let begin = date(2001, 1, 3) + chrono::Duration::days(start_offset);
            let end = begin + chrono::Duration::days(span);
            let rule = NDayRebalance::new(cal.clone(), ndays).unwrap();
            let periods = rule.periods_during(begin, end).unwrap();
            for pair in periods.windows(2) {
                prop_assert!(pair[0].begin() < pair[1].begin());
                prop_assert!(!pair[0].overlaps_with(&pair[1]));
                prop_assert_eq!(pair[0].end(), pair[1].begin());
            }
            for period in &periods {
                prop_assert_eq!(
                    cal.number_trading_days_between(period.begin(), period.end()).unwrap(),
                    ndays
                );
            }
        }
    }
}
