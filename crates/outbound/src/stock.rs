//! Available stock batches, as returned by the stock lookup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockroom_core::{ItemId, Price, StockLineId, StoreId};

/// One stock batch of an item held in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub id: StockLineId,
    pub item_id: ItemId,
    #[serde(default)]
    pub store_id: StoreId,
    #[serde(default)]
    pub batch: Option<String>,
    pub pack_size: u32,
    pub available_number_of_packs: u32,
    #[serde(default)]
    pub total_number_of_packs: u32,
    #[serde(default)]
    pub cost_price_per_pack: Price,
    #[serde(default)]
    pub sell_price_per_pack: Price,
    #[serde(default)]
    pub on_hold: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl StockLine {
    /// Units that can still be issued from this batch.
    #[must_use]
    pub fn available_units(&self) -> u64 {
        u64::from(self.available_number_of_packs) * u64::from(self.pack_size)
    }
}

/// Total issuable units of an item across its batches; on-hold batches count
/// as zero.
#[must_use]
pub fn available_quantity(stock_lines: &[StockLine]) -> u64 {
    stock_lines
        .iter()
        .filter(|line| !line.on_hold)
        .map(StockLine::available_units)
        .sum()
}
