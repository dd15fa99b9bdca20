//! Strategies: a universe, a rebalancing policy, a forecaster, and an
//! optimizer wired together, plus ready-made family constructors for the
//! common buy-and-hold and periodic-rebalance shapes.

use crate::domain::error::KilnError;
use crate::domain::forecast::{Forecast, Forecaster, NullForecaster};
use crate::domain::performance::{OverallPerformance, PeriodPerformance};
use crate::domain::portfolio::{PortfolioOptimizer, SingleAssetOptimizer, StaticTargetOptimizer};
use crate::domain::rebalance::{
    AnnualRebalance, BuyAndHold, NDayRebalance, RebalancingPolicy, TradingPeriod,
};
use crate::domain::universe::AssetUniverse;
use crate::domain::weighting::{WeightedIndex, Weighting, Weightings};
use chrono::NaiveDate;

pub struct Strategy {
    universe: AssetUniverse,
    policy: Box<dyn RebalancingPolicy>,
    forecaster: Box<dyn Forecaster>,
    optimizer: Box<dyn PortfolioOptimizer>,
}

impl Strategy {
    pub fn new(
        universe: AssetUniverse,
        policy: Box<dyn RebalancingPolicy>,
        forecaster: Box<dyn Forecaster>,
        optimizer: Box<dyn PortfolioOptimizer>,
    ) -> Self {
        Strategy {
            universe,
            policy,
            forecaster,
            optimizer,
        }
    }

    pub fn universe(&self) -> &AssetUniverse {
        &self.universe
    }

    pub fn forecast_on(&self, date: NaiveDate) -> Result<Forecast, KilnError> {
        self.forecaster
            .forecast(&self.universe, date, self.policy.period_length())
    }

    /// The target mix the strategy would buy on `date`.
    pub fn target_weighting_on(&self, date: NaiveDate) -> Result<Weightings, KilnError> {
        let forecast = self.forecast_on(date)?;
        self.optimizer.optimize(&forecast, &self.universe)
    }

    pub fn periods_during(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingPeriod>, KilnError> {
        self.policy.periods_during(begin, end)
    }

    /// Runs the strategy over [begin, end]: one weighted index per
    /// rebalancing period, stitched into an overall record.
    pub fn performance_during(
        &self,
        begin: NaiveDate,
        end: NaiveDate,
    ) -> Result<OverallPerformance, KilnError> {
        if !self.universe.supports_date(begin) {
            return Err(KilnError::validation(format!(
                "{begin} is not a trading day"
            )));
        }
        if !self.universe.supports_date(end) {
            return Err(KilnError::validation(format!("{end} is not a trading day")));
        }

        let periods = self.periods_during(begin, end)?;
        if periods.is_empty() {
            return Err(KilnError::validation(format!(
                "no complete rebalancing period fits between {begin} and {end}"
            )));
        }

        let mut performances = Vec::with_capacity(periods.len());
        for period in periods {
            let weightings = self.target_weighting_on(period.begin())?;
            let index =
                WeightedIndex::new(&self.universe, &weightings, period.begin(), period.end())?;
            performances.push(PeriodPerformance::new(period, index)?);
        }
        OverallPerformance::new(performances)
    }
}

fn multi_asset_target(symbols: &[&str], weights: &[f64]) -> Result<Weightings, KilnError> {
    if symbols.len() != weights.len() {
        return Err(KilnError::validation(format!(
            "{} symbols but {} weights",
            symbols.len(),
            weights.len()
        )));
    }
    Weightings::new(
        symbols
            .iter()
            .zip(weights)
            .map(|(&symbol, &weight)| Weighting::new(symbol, weight))
            .collect(),
    )
}

/// Buy one asset on `begin`, sell it on `end`.
pub fn buy_and_hold_single_asset(
    universe: &AssetUniverse,
    begin: NaiveDate,
    end: NaiveDate,
    symbol: &str,
) -> Result<Strategy, KilnError> {
    let restricted = universe.restricted_to(&[symbol])?;
    let policy = BuyAndHold::new(restricted.calendar(), begin, end)?;
    Ok(Strategy::new(
        restricted,
        Box::new(policy),
        Box::new(NullForecaster),
        Box::new(SingleAssetOptimizer),
    ))
}

/// Buy a fixed mix on `begin`, let it drift untouched until `end`.
pub fn buy_and_hold_multi_asset(
    universe: &AssetUniverse,
    begin: NaiveDate,
    end: NaiveDate,
    symbols: &[&str],
    weights: &[f64],
) -> Result<Strategy, KilnError> {
    let target = multi_asset_target(symbols, weights)?;
    let restricted = universe.restricted_to(symbols)?;
    let policy = BuyAndHold::new(restricted.calendar(), begin, end)?;
    Ok(Strategy::new(
        restricted,
        Box::new(policy),
        Box::new(NullForecaster),
        Box::new(StaticTargetOptimizer::new(target)),
    ))
}

/// Hold one asset, re-anchoring each year on the begin date's anniversary.
/// Equivalent in value to buy-and-hold but the yearly boundaries show up
/// in the period structure.
pub fn yearly_rebalance_single_asset(
    universe: &AssetUniverse,
    symbol: &str,
) -> Result<Strategy, KilnError> {
    let restricted = universe.restricted_to(&[symbol])?;
    let policy = AnnualRebalance::new(restricted.calendar().clone());
    Ok(Strategy::new(
        restricted,
        Box::new(policy),
        Box::new(NullForecaster),
        Box::new(SingleAssetOptimizer),
    ))
}

/// Restore a fixed mix every year on the begin date's anniversary.
pub fn yearly_rebalance_multi_asset(
    universe: &AssetUniverse,
    symbols: &[&str],
    weights: &[f64],
) -> Result<Strategy, KilnError> {
    let target = multi_asset_target(symbols, weights)?;
    let restricted = universe.restricted_to(symbols)?;
    let policy = AnnualRebalance::new(restricted.calendar().clone());
    Ok(Strategy::new(
        restricted,
        Box::new(policy),
        Box::new(NullForecaster),
        Box::new(StaticTargetOptimizer::new(target)),
    ))
}

/// Hold one asset, re-anchoring every `ndays` trading days.
pub fn ndays_rebalance_single_asset(
    universe: &AssetUniverse,
    symbol: &str,
    ndays: usize,
) -> Result<Strategy, KilnError> {
    let restricted = universe.restricted_to(&[symbol])?;
    let policy = NDayRebalance::new(restricted.calendar().clone(), ndays)?;
    Ok(Strategy::new(
        restricted,
        Box::new(policy),
        Box::new(NullForecaster),
        Box::new(SingleAssetOptimizer),
    ))
}

/// Restore a fixed mix every `ndays` trading days.
pub fn ndays_rebalance_multi_asset(
    universe: &AssetUniverse,
    symbols: &[&str],
    weights: &[f64],
    ndays: usize,
) -> Result<Strategy, KilnError> {
    let target = multi_asset_target(symbols, weights)?;
    let restricted = universe.restricted_to(symbols)?;
    let policy = NDayRebalance::new(restricted.calendar().clone(), ndays)?;
    Ok(Strategy::new(
        restricted,
        Box::new(policy),
        Box::new(NullForecaster),
        Box::new(StaticTargetOptimizer::new(target)),
    ))
}
