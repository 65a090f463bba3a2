//! The editable draft of one outbound shipment.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stockroom_core::{InvoiceId, InvoiceStatus, ItemId};

use crate::error::DraftError;
use crate::invoice::{DraftField, InvoiceHeader, InvoicePatch};
use crate::line::Line;
use crate::reducer::OutboundAction;
use crate::summary::SummaryItem;

/// Delivers an action to whatever owns the draft state.
pub type Dispatcher = Arc<dyn Fn(OutboundAction) -> Result<(), DraftError> + Send + Sync>;

/// Delegation points handed to the UI along with the draft.
///
/// Not part of the persisted state; the reducer re-binds them on every merge.
#[derive(Clone, Default)]
pub struct Callbacks {
    dispatch: Option<Dispatcher>,
}

impl Callbacks {
    /// Callbacks forwarding to `dispatch`.
    #[must_use]
    pub fn bound(dispatch: Dispatcher) -> Self {
        Self {
            dispatch: Some(dispatch),
        }
    }

    /// Whether a dispatcher is attached.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.dispatch.is_some()
    }

    fn send(&self, callback: &'static str, action: OutboundAction) -> Result<(), DraftError> {
        let dispatch = self.dispatch.as_ref().ok_or(DraftError::Unbound(callback))?;
        dispatch(action)
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// In-memory shipment: server truth merged with unsaved local edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(flatten)]
    pub header: InvoiceHeader,
    pub items: Vec<SummaryItem>,
    /// Header fields were edited since the last merge.
    #[serde(default)]
    pub is_header_dirty: bool,
    #[serde(skip)]
    pub(crate) callbacks: Callbacks,
}

/// Where a line sits in the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineLocation {
    /// Index of the owning summary item.
    pub item: usize,
    /// Key of the matching line within it, if any.
    pub line: Option<stockroom_core::LineId>,
}

impl Draft {
    /// The empty document shown before the first merge. Its callbacks are
    /// unbound.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Document identity (empty for the placeholder).
    #[must_use]
    pub const fn id(&self) -> &InvoiceId {
        &self.header.id
    }

    #[must_use]
    pub const fn status(&self) -> InvoiceStatus {
        self.header.status
    }

    /// Whether lines may still be edited.
    #[must_use]
    pub const fn is_editable(&self) -> bool {
        self.header.status.is_editable()
    }

    /// Whether this is still the placeholder, i.e. nothing was merged yet.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.header.id.is_empty()
    }

    /// Request a header field change.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Unbound` before the first merge, or whatever the
    /// dispatcher reports.
    pub fn update(&self, field: DraftField) -> Result<(), DraftError> {
        self.callbacks
            .send("update", OutboundAction::UpdateInvoice(field))
    }

    /// Request an insert-or-update of a line.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Unbound` before the first merge, or whatever the
    /// dispatcher reports.
    pub fn upsert_line(&self, line: Line) -> Result<(), DraftError> {
        self.callbacks
            .send("upsertLine", OutboundAction::UpsertLine(line))
    }

    /// Request removal of a line.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::Unbound` before the first merge, or whatever the
    /// dispatcher reports.
    pub fn delete_line(&self, line: Line) -> Result<(), DraftError> {
        self.callbacks
            .send("deleteLine", OutboundAction::DeleteLine(line))
    }

    /// Whether the callbacks are bound to a dispatcher.
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.callbacks.is_bound()
    }

    /// All lines across all summary items.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.items.iter().flat_map(|item| item.lines.values())
    }

    /// The summary item for `item_id`.
    #[must_use]
    pub fn summary_item(&self, item_id: &ItemId) -> Option<&SummaryItem> {
        self.items.iter().find(|item| &item.item_id == item_id)
    }

    /// The item after `item_id` in list order, wrapping around to the first.
    ///
    /// Used to step through items one after another while editing. Returns
    /// the first item if `item_id` is not in the list.
    #[must_use]
    pub fn next_item(&self, item_id: &ItemId) -> Option<&SummaryItem> {
        if self.items.is_empty() {
            return None;
        }
        let next = self
            .items
            .iter()
            .position(|item| &item.item_id == item_id)
            .map_or(0, |index| (index + 1) % self.items.len());
        self.items.get(next)
    }

    /// Editable header fields, for persisting header edits.
    #[must_use]
    pub fn patch(&self) -> InvoicePatch {
        InvoicePatch::from(&self.header)
    }

    /// Locate the summary item and line matching `line`.
    ///
    /// The summary item matches when its item id equals the line's, or when
    /// it already holds a line keyed by the incoming id (a merge may reuse a
    /// temporary id before the identity swap completes). Within the item the
    /// line matches by id, then by stock batch.
    pub(crate) fn locate(&self, line: &Line) -> Option<LineLocation> {
        let item = self
            .items
            .iter()
            .position(|item| item.lines.contains_key(&line.id) || item.item_id == line.item_id)?;
        let found = self.items.get(item)?.find_line(line);
        Some(LineLocation { item, line: found })
    }
}
