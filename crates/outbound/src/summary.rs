//! Per-item aggregation of batch lines.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockroom_core::{ItemId, LineId, Price, SortValue, Sortable};

use crate::line::Line;

/// Shown in the batch column when an item's lines come from different batches.
pub const MULTIPLE_BATCHES: &str = "[multiple]";

/// Aggregate quantities of a summary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub unit_quantity: u64,
    pub number_of_packs: u64,
}

/// Recompute the totals of `summary` from its lines.
///
/// Deleted lines are included: the totals describe what will be persisted,
/// and a line deleted through a zero-quantity upsert already carries zero
/// packs.
#[must_use]
pub fn recalculate(summary: &SummaryItem) -> Totals {
    summary.lines.values().fold(Totals::default(), |totals, line| Totals {
        unit_quantity: totals.unit_quantity + line.unit_quantity(),
        number_of_packs: totals.number_of_packs + u64::from(line.number_of_packs),
    })
}

/// One logical item of a shipment, aggregated across its batch lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryItem {
    pub item_id: ItemId,
    pub item_name: String,
    pub item_code: String,
    pub lines: BTreeMap<LineId, Line>,
    pub unit_quantity: u64,
    pub number_of_packs: u64,
    /// Batch name shared by all lines, or [`MULTIPLE_BATCHES`].
    pub batch: Option<String>,
    pub pack_size: Option<u32>,
    pub sell_price_per_pack: Option<Price>,
    pub expiry_date: Option<NaiveDate>,
    pub location_name: Option<String>,
    /// Display-only: every line is pending deletion.
    #[serde(default)]
    pub is_deleted: bool,
}

impl SummaryItem {
    /// An item with no lines yet, e.g. when the user picks a new item to add.
    #[must_use]
    pub fn empty(item_id: ItemId, item_name: impl Into<String>, item_code: impl Into<String>) -> Self {
        Self {
            item_id,
            item_name: item_name.into(),
            item_code: item_code.into(),
            lines: BTreeMap::new(),
            unit_quantity: 0,
            number_of_packs: 0,
            batch: None,
            pack_size: None,
            sell_price_per_pack: None,
            expiry_date: None,
            location_name: None,
            is_deleted: false,
        }
    }

    /// Group `lines` under `item_id`, taking display names from the lines
    /// when they agree.
    #[must_use]
    pub fn new(item_id: ItemId, lines: impl IntoIterator<Item = Line>) -> Self {
        let lines: BTreeMap<LineId, Line> = lines
            .into_iter()
            .map(|line| (line.id.clone(), line))
            .collect();
        let item_name = same_or_none(lines.values().map(|l| &l.item_name)).cloned().unwrap_or_default();
        let item_code = same_or_none(lines.values().map(|l| &l.item_code)).cloned().unwrap_or_default();

        let mut summary = Self {
            lines,
            ..Self::empty(item_id, item_name, item_code)
        };
        summary.refresh();
        summary
    }

    /// Recompute totals and shared display fields from the lines.
    pub fn refresh(&mut self) {
        let totals = recalculate(self);
        self.unit_quantity = totals.unit_quantity;
        self.number_of_packs = totals.number_of_packs;

        let lines = &self.lines;
        let batch = if lines.is_empty() {
            None
        } else {
            Some(
                same_or_none(lines.values().map(|l| l.batch.clone().unwrap_or_default()))
                    .unwrap_or_else(|| MULTIPLE_BATCHES.to_string()),
            )
        };
        let pack_size = same_or_none(lines.values().map(|l| l.pack_size));
        let sell_price_per_pack = same_or_none(lines.values().map(|l| l.sell_price_per_pack));
        let expiry_date = same_or_none(lines.values().map(|l| l.expiry_date)).flatten();
        let location_name = same_or_none(lines.values().map(|l| l.location_name.clone())).flatten();

        self.batch = batch;
        self.pack_size = pack_size;
        self.sell_price_per_pack = sell_price_per_pack;
        self.expiry_date = expiry_date;
        self.location_name = location_name;
    }

    /// Current totals.
    #[must_use]
    pub const fn totals(&self) -> Totals {
        Totals {
            unit_quantity: self.unit_quantity,
            number_of_packs: self.number_of_packs,
        }
    }

    /// Key of the line matching `line`: by id first, then by stock batch.
    #[must_use]
    pub fn find_line(&self, line: &Line) -> Option<LineId> {
        if self.lines.contains_key(&line.id) {
            return Some(line.id.clone());
        }
        self.lines
            .values()
            .find(|existing| existing.same_stock_line(line))
            .map(|existing| existing.id.clone())
    }

    /// Whether every line is pending deletion.
    #[must_use]
    pub fn all_deleted(&self) -> bool {
        !self.lines.is_empty() && self.lines.values().all(|line| line.is_deleted)
    }

    /// Whether the item has no lines left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The value shared by every element, or `None` when they differ or there
/// are none.
fn same_or_none<T: PartialEq>(mut values: impl Iterator<Item = T>) -> Option<T> {
    let first = values.next()?;
    for value in values {
        if value != first {
            return None;
        }
    }
    Some(first)
}

/// Sortable columns of the summary item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummaryColumn {
    ItemCode,
    ItemName,
    Batch,
    ExpiryDate,
    LocationName,
    SellPricePerPack,
    PackSize,
    UnitQuantity,
    NumberOfPacks,
}

impl Sortable for SummaryItem {
    type Key = SummaryColumn;

    fn sort_value(&self, key: SummaryColumn) -> SortValue<'_> {
        match key {
            SummaryColumn::ItemCode => SortValue::text(&self.item_code),
            SummaryColumn::ItemName => SortValue::text(&self.item_name),
            SummaryColumn::Batch => self.batch.as_deref().map_or(SortValue::Missing, SortValue::text),
            SummaryColumn::ExpiryDate => self.expiry_date.into(),
            SummaryColumn::LocationName => self
                .location_name
                .as_deref()
                .map_or(SortValue::Missing, SortValue::text),
            SummaryColumn::SellPricePerPack => self.sell_price_per_pack.map(|p| p.amount()).into(),
            SummaryColumn::PackSize => self.pack_size.map_or(SortValue::Missing, SortValue::from),
            SummaryColumn::UnitQuantity => self.unit_quantity.into(),
            SummaryColumn::NumberOfPacks => self.number_of_packs.into(),
        }
    }
}
