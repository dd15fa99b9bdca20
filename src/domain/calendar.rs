//! Trading calendar: which calendar days the market was actually open.
//!
//! Weekdays minus a table of recurring holiday rules and one-off closures
//! (presidential funerals, severe weather, the 1968 paper crisis, the
//! September 2001 closure, Hurricane Sandy). Construction expands every
//! rule over the requested range and is therefore expensive; build the
//! calendar once, wrap it in an `Arc`, and share it read-only.

use crate::domain::error::KilnError;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use std::collections::HashSet;

/// An immutable, ordered sequence of valid trading days over a fixed range.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    begin: NaiveDate,
    end: NaiveDate,
    days: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Builds a calendar from `begin` through today.
    pub fn new(begin: NaiveDate) -> Result<Self, KilnError> {
        Self::with_end(begin, Utc::now().date_naive())
    }

    /// Builds a calendar covering `begin` through `end` inclusive.
    pub fn with_end(begin: NaiveDate, end: NaiveDate) -> Result<Self, KilnError> {
        if begin > end {
            return Err(KilnError::validation(format!(
                "calendar begin {begin} is after end {end}"
            )));
        }

        let closed = closure_set(begin, end);
        let mut days = Vec::new();
        let mut date = begin;
        while date <= end {
            let weekday = date.weekday();
            let weekend = weekday == Weekday::Sat || weekday == Weekday::Sun;
            if !weekend && !closed.contains(&date) {
                days.push(date);
            }
            date += Duration::days(1);
        }

        Ok(TradingCalendar { begin, end, days })
    }

    /// First calendar date covered (not necessarily a trading day).
    pub fn begin(&self) -> NaiveDate {
        self.begin
    }

    /// Last calendar date covered (not necessarily a trading day).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// All trading days in order.
    pub fn trading_days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.days.binary_search(&date).is_ok()
    }

    fn ensure_in_range(&self, date: NaiveDate) -> Result<(), KilnError> {
        if date < self.begin || date > self.end {
            return Err(KilnError::range("calendar", date, self.begin, self.end));
        }
        Ok(())
    }

    /// Index of the first trading day at or after `date`.
    fn index_at_or_after(&self, date: NaiveDate) -> usize {
        self.days.partition_point(|&d| d < date)
    }

    /// Count of trading days at or before `date`.
    fn count_at_or_before(&self, date: NaiveDate) -> usize {
        self.days.partition_point(|&d| d <= date)
    }

    /// The `nth` trading day after `date`. Offset 0 resolves to `date`
    /// itself when it is a trading day, otherwise to the next trading day.
    pub fn nth_trading_day_after(
        &self,
        nth: usize,
        date: NaiveDate,
    ) -> Result<NaiveDate, KilnError> {
        self.ensure_in_range(date)?;
        let target = self.index_at_or_after(date) + nth;
        self.days
            .get(target)
            .copied()
            .ok_or_else(|| KilnError::range("calendar", date, self.begin, self.end))
    }

    /// The `nth` trading day before `date`. Offset 0 resolves to `date`
    /// itself when it is a trading day, otherwise to the closest preceding
    /// trading day.
    pub fn nth_trading_day_before(
        &self,
        nth: usize,
        date: NaiveDate,
    ) -> Result<NaiveDate, KilnError> {
        self.ensure_in_range(date)?;
        let at_or_before = self.count_at_or_before(date);
        if at_or_before == 0 || nth >= at_or_before {
            return Err(KilnError::range("calendar", date, self.begin, self.end));
        }
        Ok(self.days[at_or_before - 1 - nth])
    }

    /// Count of trading days strictly after `begin`, up to and including
    /// `end` — "days elapsed since buying".
    pub fn number_trading_days_between(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<usize, KilnError> {
        self.ensure_in_range(begin)?;
        self.ensure_in_range(end)?;
        if begin > end {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }
        Ok(self.count_at_or_before(end) - self.count_at_or_before(begin))
    }

    /// Trading days at stride `n`, anchored at `nth_trading_day_after(0,
    /// begin)` and extending through at least `nth_trading_day_after(0,
    /// end)` where the calendar allows.
    pub fn every_nth_trading_day_between(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
        n: usize,
    ) -> Result<Vec<NaiveDate>, KilnError> {
        if n == 0 {
            return Err(KilnError::validation("stride must be at least 1"));
        }
        self.ensure_in_range(begin)?;
        self.ensure_in_range(end)?;
        if begin > end {
            return Err(KilnError::validation(format!(
                "begin {begin} is after end {end}"
            )));
        }

        let start = self.index_at_or_after(begin);
        let anchor = self.index_at_or_after(end);
        if start >= self.days.len() || anchor >= self.days.len() {
            return Err(KilnError::range("calendar", end, self.begin, self.end));
        }

        let mut result = Vec::new();
        let mut i = start;
        loop {
            result.push(self.days[i]);
            if i >= anchor {
                break;
            }
            i += n;
            if i >= self.days.len() {
                break;
            }
        }
        Ok(result)
    }
}

/// All closed weekdays in range: recurring holiday observances plus the
/// one-off closure table.
fn closure_set(begin: NaiveDate, end: NaiveDate) -> HashSet<NaiveDate> {
    let mut closed = HashSet::new();

    for year in begin.year()..=end.year() {
        // Fixed-date holidays observed on the nearest weekday. New Year's
        // has no Saturday observance: a Jan 1 Saturday moves nowhere.
        insert_opt(&mut closed, observed_fixed(year, 1, 1, false));
        insert_opt(&mut closed, observed_fixed(year, 7, 4, true));
        insert_opt(&mut closed, observed_fixed(year, 12, 25, true));

        insert_opt(&mut closed, good_friday(year));
        insert_opt(&mut closed, nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
        insert_opt(&mut closed, nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving

        if year >= 1998 {
            insert_opt(&mut closed, nth_weekday(year, 1, Weekday::Mon, 3)); // MLK Day
        }

        if year >= 1971 {
            insert_opt(&mut closed, nth_weekday(year, 2, Weekday::Mon, 3)); // Presidents Day
            insert_opt(&mut closed, last_weekday(year, 5, Weekday::Mon)); // Memorial Day
        } else {
            insert_opt(&mut closed, observed_fixed(year, 2, 22, true)); // Washington's Birthday
            if year <= 1969 {
                // Old-style Memorial Day; 1970 had no Memorial Day holiday.
                insert_opt(&mut closed, observed_fixed(year, 5, 30, true));
            }
        }

        let presidential = (1972..=1980).step_by(4).any(|y| y == year);
        if year <= 1968 || presidential {
            insert_opt(&mut closed, election_day(year));
        }
    }

    paper_crisis_wednesdays(&mut closed);

    for (y, m, d) in ONE_OFF_CLOSURES {
        insert_opt(&mut closed, NaiveDate::from_ymd_opt(*y, *m, *d));
    }

    closed
}

/// One-off historical closures: presidential mourning days, weather, the
/// September 2001 closure, the moon landing, and the extra 1968 paper
/// crisis days.
const ONE_OFF_CLOSURES: &[(i32, u32, u32)] = &[
    (1963, 11, 25), // JFK funeral
    (1968, 4, 9),   // Martin Luther King funeral
    (1969, 3, 31),  // Eisenhower funeral
    (1972, 12, 28), // Truman funeral
    (1973, 1, 25),  // LBJ funeral
    (1994, 4, 27),  // Nixon funeral
    (2004, 6, 11),  // Reagan funeral
    (2007, 1, 2),   // Ford funeral
    (1969, 2, 10),  // snow day
    (1977, 7, 14),  // New York City blackout
    (1985, 9, 27),  // Hurricane Gloria
    (2012, 10, 29), // Hurricane Sandy
    (2012, 10, 30), // Hurricane Sandy
    (2001, 9, 11),  // World Trade Center
    (2001, 9, 12),
    (2001, 9, 13),
    (2001, 9, 14),
    (1969, 7, 21),  // moon landing
    (1968, 2, 12),  // Lincoln's Birthday (paper crisis)
    (1968, 7, 5),   // day after Independence Day (paper crisis)
    (1968, 11, 11), // Veterans Day (paper crisis)
];

/// During the back-office paper crisis the exchange closed every Wednesday
/// from 1968-06-06 through year end, with a handful of Wednesdays reopened.
fn paper_crisis_wednesdays(closed: &mut HashSet<NaiveDate>) {
    let reopened: [Option<NaiveDate>; 5] = [
        NaiveDate::from_ymd_opt(1968, 7, 3),
        NaiveDate::from_ymd_opt(1968, 9, 4),
        NaiveDate::from_ymd_opt(1968, 11, 6),
        NaiveDate::from_ymd_opt(1968, 11, 13),
        NaiveDate::from_ymd_opt(1968, 11, 27),
    ];
    let Some(mut date) = NaiveDate::from_ymd_opt(1968, 6, 6) else {
        return;
    };
    let until = NaiveDate::from_ymd_opt(1969, 1, 1);
    while Some(date) < until {
        if date.weekday() == Weekday::Wed && !reopened.contains(&Some(date)) {
            closed.insert(date);
        }
        date += Duration::days(1);
    }
}

fn insert_opt(closed: &mut HashSet<NaiveDate>, date: Option<NaiveDate>) {
    if let Some(date) = date {
        closed.insert(date);
    }
}

/// A fixed-date holiday observed on the nearest weekday: Sunday observes
/// on the following Monday; Saturday observes on the preceding Friday only
/// when `saturday_observed` is set.
fn observed_fixed(
    year: i32,
    month: u32,
    day: u32,
    saturday_observed: bool,
) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    match date.weekday() {
        Weekday::Sat => saturday_observed.then(|| date - Duration::days(1)),
        Weekday::Sun => Some(date + Duration::days(1)),
        _ => Some(date),
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, nth: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, nth)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
        .or_else(|| NaiveDate::from_weekday_of_month_opt(year, month, weekday, 4))
}

/// First Tuesday falling on Nov 2 through Nov 8.
fn election_day(year: i32) -> Option<NaiveDate> {
    (2..=8)
        .filter_map(|day| NaiveDate::from_ymd_opt(year, 11, day))
        .find(|date| date.weekday() == Weekday::Tue)
}

/// Easter Sunday by the anonymous Gregorian computus.
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    // The computus always lands in March or April.
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn good_friday(year: i32) -> Option<NaiveDate> {
    easter_sunday(year).map(|easter| easter - Duration::days(2))
}
