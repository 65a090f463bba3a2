//! Batch-level draft lines and their lifecycle flags.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockroom_core::{InvoiceId, ItemId, LineId, Price, StockLineId};

use crate::invoice::InvoiceLine;

/// One stock-batch allocation within a draft shipment.
///
/// The lifecycle flags describe the line relative to the server:
/// - `is_created`: exists only locally; removing it discards it outright.
/// - `is_updated`: persisted, with a local quantity change.
/// - `is_deleted`: persisted, pending deletion; stays in the draft until the
///   next merge.
///
/// At most one of `is_created`/`is_updated` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub id: LineId,
    #[serde(default)]
    pub invoice_id: InvoiceId,
    pub item_id: ItemId,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_code: String,
    #[serde(default)]
    pub stock_line_id: Option<StockLineId>,
    #[serde(default)]
    pub batch: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub pack_size: u32,
    pub number_of_packs: u32,
    #[serde(default)]
    pub cost_price_per_pack: Price,
    #[serde(default)]
    pub sell_price_per_pack: Price,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_created: bool,
    #[serde(default)]
    pub is_updated: bool,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Line {
    /// A clean line built from server data.
    #[must_use]
    pub fn from_server(line: &InvoiceLine, invoice_id: &InvoiceId) -> Self {
        Self {
            id: line.id.clone(),
            invoice_id: invoice_id.clone(),
            item_id: line.item_id.clone(),
            item_name: line.item_name.clone(),
            item_code: line.item_code.clone(),
            stock_line_id: line.stock_line_id.clone(),
            batch: line.batch.clone(),
            location_name: line.location_name.clone(),
            note: line.note.clone(),
            pack_size: line.pack_size,
            number_of_packs: line.number_of_packs,
            cost_price_per_pack: line.cost_price_per_pack,
            sell_price_per_pack: line.sell_price_per_pack,
            expiry_date: line.expiry_date,
            is_created: false,
            is_updated: false,
            is_deleted: false,
        }
    }

    /// Overlay server data on this line.
    ///
    /// Server values win for every field, including the identity: a line
    /// created locally under a temporary id takes the server's id here.
    /// Lifecycle flags reset to clean.
    #[must_use]
    pub fn merged_with(&self, line: &InvoiceLine, invoice_id: &InvoiceId) -> Self {
        let mut merged = Self::from_server(line, invoice_id);
        if merged.item_name.is_empty() {
            merged.item_name.clone_from(&self.item_name);
        }
        if merged.item_code.is_empty() {
            merged.item_code.clone_from(&self.item_code);
        }
        merged
    }

    /// This line, flagged as newly created on `invoice_id`.
    #[must_use]
    pub fn into_created(self, invoice_id: &InvoiceId) -> Self {
        Self {
            invoice_id: invoice_id.clone(),
            is_created: true,
            is_updated: false,
            is_deleted: false,
            ..self
        }
    }

    /// Quantity in base units.
    #[must_use]
    pub fn unit_quantity(&self) -> u64 {
        u64::from(self.number_of_packs) * u64::from(self.pack_size)
    }

    /// Whether the line absorbs backordered quantity rather than real stock.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.stock_line_id.is_none()
    }

    /// Whether the line differs from what the server holds.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.is_created || self.is_updated || self.is_deleted
    }

    /// Whether `other` draws from the same stock batch as this line.
    ///
    /// Placeholder lines of the same item match each other: an item has at
    /// most one placeholder line.
    #[must_use]
    pub fn same_stock_line(&self, other: &Self) -> bool {
        match (&self.stock_line_id, &other.stock_line_id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.item_id == other.item_id,
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn server_line() -> InvoiceLine {
        InvoiceLine {
            id: LineId::new("server-1"),
            item_id: ItemId::new("item-1"),
            item_name: "Paracetamol".to_string(),
            item_code: "PCM".to_string(),
            batch: Some("B-17".to_string()),
            pack_size: 12,
            number_of_packs: 4,
            cost_price_per_pack: Price::from_minor(100),
            sell_price_per_pack: Price::from_minor(150),
            expiry_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            location_name: None,
            note: None,
            stock_line_id: Some(StockLineId::new("stock-1")),
        }
    }

    #[test]
    fn test_from_server_is_clean() {
        let line = Line::from_server(&server_line(), &InvoiceId::new("inv-1"));
        assert!(!line.is_dirty());
        assert_eq!(line.unit_quantity(), 48);
        assert_eq!(line.invoice_id.as_str(), "inv-1");
    }

    #[test]
    fn test_merged_with_takes_server_identity_and_resets_flags() {
        let local = Line {
            id: LineId::new("temp-1"),
            number_of_packs: 9,
            is_created: true,
            ..Line::from_server(&server_line(), &InvoiceId::new("inv-1"))
        };

        let merged = local.merged_with(&server_line(), &InvoiceId::new("inv-1"));
        assert_eq!(merged.id.as_str(), "server-1");
        assert_eq!(merged.number_of_packs, 4);
        assert!(!merged.is_dirty());
    }

    #[test]
    fn test_same_stock_line() {
        let mut a = Line::from_server(&server_line(), &InvoiceId::default());
        let mut b = a.clone();
        assert!(a.same_stock_line(&b));

        b.stock_line_id = None;
        assert!(!a.same_stock_line(&b));

        a.stock_line_id = None;
        assert!(a.is_placeholder());
        assert!(a.same_stock_line(&b));

        b.item_id = ItemId::new("other");
        assert!(!a.same_stock_line(&b));
    }

    #[test]
    fn test_into_created() {
        let line = Line::from_server(&server_line(), &InvoiceId::default())
            .into_created(&InvoiceId::new("inv-9"));
        assert!(line.is_created);
        assert!(!line.is_updated);
        assert_eq!(line.invoice_id.as_str(), "inv-9");
    }
}
