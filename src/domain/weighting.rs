//! Target weightings and the combined portfolio index for one holding
//! period.

use crate::domain::asset::daily_returns;
use crate::domain::error::KilnError;
use crate::domain::universe::AssetUniverse;
use chrono::NaiveDate;

/// Tolerance for the sum-to-one check on a weighting set.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One asset's target share of the portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct Weighting {
    pub symbol: String,
    pub weight: f64,
}

impl Weighting {
    pub fn new(symbol: impl Into<String>, weight: f64) -> Self {
        Weighting {
            symbol: symbol.into(),
            weight,
        }
    }
}

/// A validated set of weightings summing to 1.0.
#[derive(Debug, Clone)]
pub struct Weightings(Vec<Weighting>);

impl Weightings {
    pub fn new(weightings: Vec<Weighting>) -> Result<Self, KilnError> {
        if weightings.is_empty() {
            return Err(KilnError::validation("weighting set is empty"));
        }
        for weighting in &weightings {
            if !(0.0..=1.0).contains(&weighting.weight) {
                return Err(KilnError::validation(format!(
                    "weight {} for {} is outside [0, 1]",
                    weighting.weight, weighting.symbol
                )));
            }
        }
        for (i, weighting) in weightings.iter().enumerate() {
            if weightings[..i].iter().any(|w| w.symbol == weighting.symbol) {
                return Err(KilnError::validation(format!(
                    "duplicate symbol {} in weightings",
                    weighting.symbol
                )));
            }
        }
        let sum: f64 = weightings.iter().map(|w| w.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(KilnError::validation(format!(
                "weights sum to {sum}, expected 1.0"
            )));
        }
        Ok(Weightings(weightings))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Weighting> {
        self.0.iter()
    }

    /// Always at least 1; the constructor rejects empty sets.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// The combined index for one holding period: each asset's partial index
/// (adjusted close rescaled to its initial weight) summed element-wise by
/// date. The per-asset columns are kept for turnover accounting.
#[derive(Debug, Clone)]
pub struct WeightedIndex {
    dates: Vec<NaiveDate>,
    combined: Vec<f64>,
    partials: Vec<(String, Vec<f64>)>,
}

impl WeightedIndex {
    pub fn new(
        universe: &AssetUniverse,
        weightings: &Weightings,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, KilnError> {
        if begin > end {
            return Err(KilnError::validation(format!(
                "index begin {begin} is after end {end}"
            )));
        }

        let mut dates: Option<Vec<NaiveDate>> = None;
        let mut partials = Vec::with_capacity(weightings.len());
        for weighting in weightings.iter() {
            let asset = universe.asset(&weighting.symbol)?;
            let partial = asset.make_index(begin, weighting.weight, end)?;
            match &dates {
                None => dates = Some(partial.dates().to_vec()),
                Some(existing) => {
                    if existing != partial.dates() {
                        return Err(KilnError::validation(format!(
                            "{} disagrees on trading dates between {begin} and {end}",
                            weighting.symbol
                        )));
                    }
                }
            }
            partials.push((weighting.symbol.clone(), partial.values().to_vec()));
        }

        // Weightings can never be empty, so dates is always set here.
        let dates = dates.ok_or_else(|| KilnError::validation("weighting set is empty"))?;
        let mut combined = vec![0.0; dates.len()];
        for (_, values) in &partials {
            for (total, value) in combined.iter_mut().zip(values) {
                *total += value;
            }
        }

        Ok(WeightedIndex {
            dates,
            combined,
            partials,
        })
    }

    pub fn begin(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn end(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    fn index_of(&self, date: NaiveDate) -> Result<usize, KilnError> {
        if date < self.begin() || date > self.end() {
            return Err(KilnError::range(
                "weighted index",
                date,
                self.begin(),
                self.end(),
            ));
        }
        self.dates.binary_search(&date).map_err(|_| KilnError::Lookup {
            symbol: "weighted index".into(),
            date,
        })
    }

    /// Value at `date` relative to the index's own starting value.
    pub fn total_return_by(&self, date: NaiveDate) -> Result<f64, KilnError> {
        let i = self.index_of(date)?;
        Ok(self.combined[i] / self.combined[0] - 1.0)
    }

    /// Growth factor over the whole period.
    pub fn growth(&self) -> f64 {
        self.combined[self.combined.len() - 1] / self.combined[0]
    }

    /// Day-over-day percent changes of the combined index; the begin date
    /// itself carries no entry (it is the buy day).
    pub fn daily_returns(&self) -> Vec<f64> {
        daily_returns(&self.combined)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.partials.iter().map(|(symbol, _)| symbol.as_str())
    }

    /// The asset's effective share of the combined index value on `date`;
    /// 0.0 for a symbol this index does not hold.
    pub fn weight_of(&self, symbol: &str, date: NaiveDate) -> Result<f64, KilnError> {
        let i = self.index_of(date)?;
        let Some((_, values)) = self.partials.iter().find(|(s, _)| s == symbol) else {
            return Ok(0.0);
        };
        Ok(values[i] / self.combined[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::{Asset, AssetRecord};
    use crate::domain::calendar::TradingCalendar;
    use std::sync::Arc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn calendar() -> Arc<TradingCalendar> {
        Arc::new(TradingCalendar::with_end(date(2004, 1, 1), date(2004, 12, 31)).unwrap())
    }

    /// SPY doubles over the week; LQD stays flat.
    fn universe() -> AssetUniverse {
        let cal = calendar();
        let spy: Vec<AssetRecord> = [100.0, 120.0, 140.0, 170.0, 200.0]
            .iter()
            .zip(17..)
            .map(|(&close, day)| AssetRecord::new(date(2004, 5, day), close))
            .collect();
        let lqd: Vec<AssetRecord> = (17..=21)
            .map(|day| AssetRecord::new(date(2004, 5, day), 50.0))
            .collect();
        AssetUniverse::new(
            vec![
                Asset::from_records("SPY", &spy, cal.clone()).unwrap(),
                Asset::from_records("LQD", &lqd, cal.clone()).unwrap(),
            ],
            cal,
        )
        .unwrap()
    }

    fn eighty_twenty() -> Weightings {
        Weightings::new(vec![
            Weighting::new("SPY", 0.8),
            Weighting::new("LQD", 0.2),
        ])
        .unwrap()
    }

    #[test]
    fn weights_must_sum_to_one() {
        assert!(matches!(
            Weightings::new(vec![
                Weighting::new("SPY", 0.8),
                Weighting::new("LQD", 0.1),
            ]),
            Err(KilnError::Validation { .. })
        ));
        // Within tolerance is fine.
        assert!(
            Weightings::new(vec![
                Weighting::new("SPY", 0.8),
                Weighting::new("LQD", 0.2 + 1e-9),
            ])
            .is_ok()
        );
    }

    #[test]
    fn weights_outside_unit_interval_rejected() {
        assert!(matches!(
            Weightings::new(vec![
                Weighting::new("SPY", 1.5),
                Weighting::new("LQD", -0.5),
            ]),
            Err(KilnError::Validation { .. })
        ));
    }

    #[test]
    fn duplicate_weighting_symbols_rejected() {
        assert!(matches!(
            Weightings::new(vec![
                Weighting::new("SPY", 0.5),
                Weighting::new("SPY", 0.5),
            ]),
            Err(KilnError::Validation { .. })
        ));
    }

    #[test]
    fn combined_index_starts_at_one() {
        let index = WeightedIndex::new(
            &universe(),
            &eighty_twenty(),
            date(2004, 5, 17),
            date(2004, 5, 21),
        )
        .unwrap();
        assert!((index.total_return_by(date(2004, 5, 17)).unwrap()).abs() < 1e-12);
        assert_eq!(index.begin(), date(2004, 5, 17));
        assert_eq!(index.end(), date(2004, 5, 21));
        assert_eq!(index.dates().len(), 5);
    }

    #[test]
    fn total_return_blends_the_assets() {
        let index = WeightedIndex::new(
            &universe(),
            &eighty_twenty(),
            date(2004, 5, 17),
            date(2004, 5, 21),
        )
        .unwrap();
        // SPY returns 100%, LQD 0%: the 80/20 blend returns 80%.
        let total = index.total_return_by(date(2004, 5, 21)).unwrap();
        assert!((total - 0.8).abs() < 1e-9);
    }

    #[test]
    fn weight_drifts_toward_the_faster_asset() {
        let index = WeightedIndex::new(
            &universe(),
            &eighty_twenty(),
            date(2004, 5, 17),
            date(2004, 5, 21),
        )
        .unwrap();
        let begin = date(2004, 5, 17);
        let end = date(2004, 5, 21);
        assert!((index.weight_of("SPY", begin).unwrap() - 0.8).abs() < 1e-9);
        assert!((index.weight_of("LQD", begin).unwrap() - 0.2).abs() < 1e-9);
        // SPY doubled while LQD sat still: 1.6 of 1.8 total.
        assert!((index.weight_of("SPY", end).unwrap() - 1.6 / 1.8).abs() < 1e-9);
        assert!((index.weight_of("IYR", end).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn queries_outside_the_period_fail() {
        let index = WeightedIndex::new(
            &universe(),
            &eighty_twenty(),
            date(2004, 5, 17),
            date(2004, 5, 19),
        )
        .unwrap();
        assert!(matches!(
            index.total_return_by(date(2004, 5, 21)),
            Err(KilnError::Range { .. })
        ));
        assert!(matches!(
            index.total_return_by(date(2004, 5, 14)),
            Err(KilnError::Range { .. })
        ));
    }

    #[test]
    fn daily_returns_track_the_combined_index() {
        let index = WeightedIndex::new(
            &universe(),
            &eighty_twenty(),
            date(2004, 5, 17),
            date(2004, 5, 21),
        )
        .unwrap();
        let returns = index.daily_returns();
        assert_eq!(returns.len(), 4);
        // Day one: SPY +20% at weight 0.8 → combined 1.0 → 1.16.
        assert!((returns[0] - 0.16).abs() < 1e-9);
    }

    #[test]
    fn unknown_symbol_fails_construction() {
        let weightings = Weightings::new(vec![Weighting::new("IYR", 1.0)]).unwrap();
        assert!(matches!(
            WeightedIndex::new(&universe(), &weightings, date(2004, 5, 17), date(2004, 5, 21)),
            Err(KilnError::Validation { .. })
        ));
    }
}
