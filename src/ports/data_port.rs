//! Asset table provider port.

use crate::domain::asset::AssetRecord;
use crate::domain::error::KilnError;

/// Supplies raw asset tables: per symbol, a date-ordered sequence of
/// records with unique dates. The domain never fills gaps — an incomplete
/// table surfaces later as a lookup error on the missing date.
pub trait AssetDataPort {
    fn fetch_records(&self, symbol: &str) -> Result<Vec<AssetRecord>, KilnError>;

    fn list_symbols(&self) -> Result<Vec<String>, KilnError>;
}
