//! Asset universe: the set of tradable assets available to one strategy.

use crate::domain::asset::Asset;
use crate::domain::calendar::TradingCalendar;
use crate::domain::error::KilnError;
use crate::ports::data_port::AssetDataPort;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

/// All tradable assets for a particular run, each with its adjustment
/// columns precomputed, plus the shared trading calendar.
#[derive(Debug, Clone)]
pub struct AssetUniverse {
    assets: BTreeMap<String, Asset>,
    calendar: Arc<TradingCalendar>,
}

impl AssetUniverse {
    pub fn new(assets: Vec<Asset>, calendar: Arc<TradingCalendar>) -> Result<Self, KilnError> {
        let mut map = BTreeMap::new();
        for asset in assets {
            let symbol = asset.symbol().to_string();
            if map.insert(symbol.clone(), asset).is_some() {
                return Err(KilnError::validation(format!(
                    "duplicate symbol {symbol} in universe"
                )));
            }
        }
        Ok(AssetUniverse {
            assets: map,
            calendar,
        })
    }

    /// Loads every requested symbol's table through the data port and
    /// builds the universe.
    pub fn from_port(
        port: &dyn AssetDataPort,
        symbols: &[&str],
        calendar: Arc<TradingCalendar>,
    ) -> Result<Self, KilnError> {
        let mut assets = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let records = port.fetch_records(symbol)?;
            assets.push(Asset::from_records(*symbol, &records, calendar.clone())?);
        }
        Self::new(assets, calendar)
    }

    pub fn calendar(&self) -> &Arc<TradingCalendar> {
        &self.calendar
    }

    pub fn supports_symbol(&self, symbol: &str) -> bool {
        self.assets.contains_key(symbol)
    }

    pub fn supports_date(&self, date: NaiveDate) -> bool {
        self.calendar.is_trading_day(date)
    }

    pub fn asset(&self, symbol: &str) -> Result<&Asset, KilnError> {
        self.assets.get(symbol).ok_or_else(|| {
            KilnError::validation(format!("{symbol} is not in the asset universe"))
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    pub fn cardinality(&self) -> usize {
        self.assets.len()
    }

    /// A new universe holding only the named symbols.
    pub fn restricted_to(&self, symbols: &[&str]) -> Result<AssetUniverse, KilnError> {
        let mut assets = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            assets.push(self.asset(symbol)?.clone());
        }
        Self::new(assets, self.calendar.clone())
    }
}

/// Parses a comma-separated symbol list, uppercased, rejecting empty
/// tokens and duplicates.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, KilnError> {
    let mut symbols = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(KilnError::validation("empty token in symbol list"));
        }
        let symbol = trimmed.to_uppercase();
        if symbols.contains(&symbol) {
            return Err(KilnError::validation(format!("duplicate symbol {symbol}")));
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::AssetRecord;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> Arc<TradingCalendar> {
        Arc::new(TradingCalendar::with_end(date(2004, 1, 1), date(2004, 12, 31)).unwrap())
    }

    fn make_asset(symbol: &str, calendar: Arc<TradingCalendar>) -> Asset {
        let records: Vec<AssetRecord> = (17..=21)
            .map(|day| AssetRecord::new(date(2004, 5, day), 100.0))
            .collect();
        Asset::from_records(symbol, &records, calendar).unwrap()
    }

    fn universe() -> AssetUniverse {
        let cal = calendar();
        AssetUniverse::new(
            vec![make_asset("SPY", cal.clone()), make_asset("LQD", cal.clone())],
            cal,
        )
        .unwrap()
    }

    #[test]
    fn supports_known_symbols() {
        let universe = universe();
        assert!(universe.supports_symbol("SPY"));
        assert!(universe.supports_symbol("LQD"));
        assert!(!universe.supports_symbol("IYR"));
        assert_eq!(universe.cardinality(), 2);
    }

    #[test]
    fn supports_trading_dates_only() {
        let universe = universe();
        assert!(universe.supports_date(date(2004, 5, 17)));
        assert!(!universe.supports_date(date(2004, 5, 16))); // Sunday
        assert!(!universe.supports_date(date(2004, 5, 31))); // Memorial Day
    }

    #[test]
    fn restriction_narrows_the_universe() {
        let universe = universe();
        let restricted = universe.restricted_to(&["SPY"]).unwrap();
        assert_eq!(restricted.cardinality(), 1);
        assert!(restricted.supports_symbol("SPY"));
        assert!(!restricted.supports_symbol("LQD"));
    }

    #[test]
    fn restriction_to_unknown_symbol_fails() {
        let universe = universe();
        assert!(matches!(
            universe.restricted_to(&["IYR"]),
            Err(KilnError::Validation { .. })
        ));
    }

    #[test]
    fn duplicate_symbols_rejected() {
        let cal = calendar();
        let result = AssetUniverse::new(
            vec![make_asset("SPY", cal.clone()), make_asset("SPY", cal.clone())],
            cal,
        );
        assert!(matches!(result, Err(KilnError::Validation { .. })));
    }

    #[test]
    fn parse_symbols_basic() {
        assert_eq!(parse_symbols("SPY,LQD").unwrap(), vec!["SPY", "LQD"]);
        assert_eq!(parse_symbols(" spy , lqd ").unwrap(), vec!["SPY", "LQD"]);
    }

    #[test]
    fn parse_symbols_rejects_empty_and_duplicate() {
        assert!(matches!(
            parse_symbols("SPY,,LQD"),
            Err(KilnError::Validation { .. })
        ));
        assert!(matches!(
            parse_symbols("SPY,spy"),
            Err(KilnError::Validation { .. })
        ));
    }
}
