//! Server-side shipment documents as delivered by the API.
//!
//! These are the inbound shapes the reducer merges into a draft. They carry
//! no lifecycle flags: everything the server returns is, by definition,
//! persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use stockroom_core::{Colour, InvoiceId, InvoiceStatus, ItemId, LineId, Price, StockLineId};

/// Top-level fields of an outbound shipment, shared by the server document
/// and the local draft.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    pub id: InvoiceId,
    #[serde(default)]
    pub invoice_number: i64,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub other_party_name: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub colour: Colour,
    #[serde(default)]
    pub their_reference: Option<String>,
    #[serde(default)]
    pub on_hold: bool,
    #[serde(default)]
    pub created_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub allocated_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub picked_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub shipped_datetime: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_datetime: Option<DateTime<Utc>>,
}

/// An outbound shipment as fetched from the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(flatten)]
    pub header: InvoiceHeader,
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
}

/// One persisted batch-level line of a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id: LineId,
    pub item_id: ItemId,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_code: String,
    #[serde(default)]
    pub batch: Option<String>,
    pub pack_size: u32,
    pub number_of_packs: u32,
    #[serde(default)]
    pub cost_price_per_pack: Price,
    #[serde(default)]
    pub sell_price_per_pack: Price,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Source stock batch; `None` for placeholder (backorder) lines.
    #[serde(default)]
    pub stock_line_id: Option<StockLineId>,
}

/// Fields of the draft a user may edit directly.
///
/// Status, numbering and timestamps are deliberately absent: they only ever
/// change on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum DraftField {
    Comment(Option<String>),
    Colour(Colour),
    TheirReference(Option<String>),
    OnHold(bool),
}

impl InvoiceHeader {
    /// Header of the empty document shown before the first fetch completes.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Apply a single field edit.
    pub fn apply(&mut self, field: DraftField) {
        match field {
            DraftField::Comment(comment) => self.comment = comment,
            DraftField::Colour(colour) => self.colour = colour,
            DraftField::TheirReference(reference) => self.their_reference = reference,
            DraftField::OnHold(on_hold) => self.on_hold = on_hold,
        }
    }

    /// The field edits that turn `earlier` into `self`.
    #[must_use]
    pub fn edits_since(&self, earlier: &Self) -> Vec<DraftField> {
        let mut edits = Vec::new();
        if self.comment != earlier.comment {
            edits.push(DraftField::Comment(self.comment.clone()));
        }
        if self.colour != earlier.colour {
            edits.push(DraftField::Colour(self.colour.clone()));
        }
        if self.their_reference != earlier.their_reference {
            edits.push(DraftField::TheirReference(self.their_reference.clone()));
        }
        if self.on_hold != earlier.on_hold {
            edits.push(DraftField::OnHold(self.on_hold));
        }
        edits
    }
}

/// The editable subset of the header, sent to the server on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePatch {
    pub id: InvoiceId,
    pub comment: Option<String>,
    pub colour: Colour,
    pub their_reference: Option<String>,
    pub on_hold: bool,
}

impl From<&InvoiceHeader> for InvoicePatch {
    fn from(header: &InvoiceHeader) -> Self {
        Self {
            id: header.id.clone(),
            comment: header.comment.clone(),
            colour: header.colour.clone(),
            their_reference: header.their_reference.clone(),
            on_hold: header.on_hold,
        }
    }
}
