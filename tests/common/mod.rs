#![allow(dead_code)]

use chrono::NaiveDate;
use kiln::domain::asset::AssetRecord;
use kiln::domain::calendar::TradingCalendar;
use kiln::domain::error::KilnError;
use kiln::ports::data_port::AssetDataPort;
use std::collections::HashMap;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<AssetRecord>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_records(mut self, symbol: &str, records: Vec<AssetRecord>) -> Self {
        self.data.insert(symbol.to_string(), records);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl AssetDataPort for MockDataPort {
    fn fetch_records(&self, symbol: &str) -> Result<Vec<AssetRecord>, KilnError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(KilnError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, KilnError> {
        Ok(self.data.keys().cloned().collect())
    }
}

/// Records over every trading day in [begin, end], growing by `daily`
/// each trading day from `start_close`.
pub fn constant_growth_records(
    calendar: &TradingCalendar,
    begin: NaiveDate,
    end: NaiveDate,
    start_close: f64,
    daily: f64,
) -> Vec<AssetRecord> {
    let mut records = Vec::new();
    let mut close = start_close;
    let mut day = calendar.nth_trading_day_after(0, begin).unwrap();
    loop {
        records.push(AssetRecord::new(day, close));
        match calendar.nth_trading_day_after(1, day) {
            Ok(next) if next <= end => {
                day = next;
                close *= 1.0 + daily;
            }
            _ => break,
        }
    }
    records
}

/// Flat series at `close` over every trading day in [begin, end].
pub fn flat_records(
    calendar: &TradingCalendar,
    begin: NaiveDate,
    end: NaiveDate,
    close: f64,
) -> Vec<AssetRecord> {
    constant_growth_records(calendar, begin, end, close, 0.0)
}
