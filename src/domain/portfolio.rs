//! Portfolio optimizers: turn a forecast into target weightings.
//!
//! The ones here are deliberately forecast-blind. They exist so richer
//! optimizers slot in behind the same trait without touching the
//! strategy machinery.

use crate::domain::error::KilnError;
use crate::domain::forecast::Forecast;
use crate::domain::universe::AssetUniverse;
use crate::domain::weighting::{Weighting, Weightings};

/// Chooses target weightings for the upcoming period.
pub trait PortfolioOptimizer {
    fn optimize(
        &self,
        forecast: &Forecast,
        universe: &AssetUniverse,
    ) -> Result<Weightings, KilnError>;
}

/// Puts everything in the universe's one asset. Construction of the
/// weighting fails if the universe holds anything else.
#[derive(Debug, Default)]
pub struct SingleAssetOptimizer;

impl PortfolioOptimizer for SingleAssetOptimizer {
    fn optimize(
        &self,
        _forecast: &Forecast,
        universe: &AssetUniverse,
    ) -> Result<Weightings, KilnError> {
        if universe.cardinality() != 1 {
            return Err(KilnError::validation(format!(
                "single-asset optimizer needs exactly one asset, universe has {}",
                universe.cardinality()
            )));
        }
        let weightings = universe
            .symbols()
            .map(|symbol| Weighting::new(symbol, 1.0))
            .collect();
        Weightings::new(weightings)
    }
}

/// Always returns the same fixed target mix.
#[derive(Debug)]
pub struct StaticTargetOptimizer {
    target: Weightings,
}

impl StaticTargetOptimizer {
    pub fn new(target: Weightings) -> Self {
        StaticTargetOptimizer { target }
    }
}

impl PortfolioOptimizer for StaticTargetOptimizer {
    fn optimize(
        &self,
        _forecast: &Forecast,
        universe: &AssetUniverse,
    ) -> Result<Weightings, KilnError> {
        for weighting in self.target.iter() {
            if !universe.supports_symbol(&weighting.symbol) {
                return Err(KilnError::validation(format!(
                    "target weighting names {}, which is not in the universe",
                    weighting.symbol
                )));
            }
        }
        Ok(self.target.clone())
    }
}
