//! Owner of the live draft state and the save cycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;
use stockroom_core::{InvoiceId, ItemId};
use tracing::{info, instrument, warn};

use crate::allocation::BatchRows;
use crate::api::ShipmentApi;
use crate::changes::LineChanges;
use crate::draft::{Dispatcher, Draft};
use crate::error::{DraftError, StoreError};
use crate::invoice::Invoice;
use crate::reducer::{DraftState, OutboundAction, Reducer};
use crate::summary::SummaryItem;

/// What a save sent to the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub header_updated: bool,
}

impl SaveOutcome {
    /// Whether anything was sent.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.inserted == 0 && self.updated == 0 && self.deleted == 0 && !self.header_updated
    }
}

/// Holds the current [`DraftState`] and applies actions to it in dispatch
/// order.
///
/// Drafts handed out by the store carry callbacks that dispatch back into
/// it. The callbacks hold only a weak reference, so they stop working once
/// the store is dropped.
#[derive(Clone)]
pub struct DraftStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    state: Mutex<DraftState>,
    reducer: Reducer,
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, DraftState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, action: OutboundAction) -> Result<(), DraftError> {
        let mut state = self.lock();
        let next = self.reducer.reduce(&state, action)?;
        *state = next;
        Ok(())
    }

    /// Merge the shipment as saved from `submitted`, then replay edits made
    /// after `submitted` was taken. Returns how many edits were replayed.
    fn merge_saved(&self, invoice: Invoice, submitted: &Draft) -> Result<usize, DraftError> {
        let mut state = self.lock();
        let pending = unsubmitted_edits(submitted, &state.draft);
        let mut next = self.reducer.reduce(&state, OutboundAction::Merge(invoice))?;
        for action in &pending {
            next = self.reducer.reduce(&next, action.clone())?;
        }
        *state = next;
        Ok(pending.len())
    }
}

/// Actions reproducing the local edits in `current` that `submitted` did not
/// carry.
fn unsubmitted_edits(submitted: &Draft, current: &Draft) -> Vec<OutboundAction> {
    let mut edits: Vec<OutboundAction> = current
        .lines()
        .filter(|line| line.is_dirty())
        .filter(|line| !submitted.lines().any(|sent| sent == *line))
        .map(|line| {
            if line.is_deleted {
                OutboundAction::DeleteLine(line.clone())
            } else {
                OutboundAction::UpsertLine(line.clone())
            }
        })
        .collect();
    if current.is_header_dirty {
        edits.extend(
            current
                .header
                .edits_since(&submitted.header)
                .into_iter()
                .map(OutboundAction::UpdateInvoice),
        );
    }
    edits
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore")
            .field("state", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl DraftStore {
    /// A store holding the placeholder draft.
    #[must_use]
    pub fn new() -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner>| {
            let weak = weak.clone();
            let dispatch: Dispatcher = Arc::new(move |action: OutboundAction| match weak.upgrade() {
                Some(inner) => inner.dispatch(action),
                None => Err(DraftError::Unbound("dispatch")),
            });
            StoreInner {
                state: Mutex::new(DraftState::default()),
                reducer: Reducer::with_dispatcher(dispatch),
            }
        });
        Self { inner }
    }

    /// Apply `action` to the current state.
    ///
    /// # Errors
    ///
    /// Returns the reducer's `DraftError`; the state is unchanged then.
    pub fn dispatch(&self, action: OutboundAction) -> Result<(), DraftError> {
        self.inner.dispatch(action)
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> DraftState {
        self.inner.lock().clone()
    }

    /// Snapshot of the current draft.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.inner.lock().draft.clone()
    }

    /// Line changes a save would submit right now.
    #[must_use]
    pub fn changes(&self) -> LineChanges {
        LineChanges::from_draft(&self.inner.lock().draft)
    }

    /// The summary item following `item_id`, wrapping around.
    #[must_use]
    pub fn next_item(&self, item_id: &ItemId) -> Option<SummaryItem> {
        self.inner.lock().draft.next_item(item_id).cloned()
    }

    /// Fetch shipment `id` and merge it into the draft.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` if the fetch fails, or `StoreError::Draft`
    /// if the store already holds another shipment.
    #[instrument(skip(self, api), fields(invoice_id = %id))]
    pub async fn load<A: ShipmentApi>(&self, api: &A, id: &InvoiceId) -> Result<(), StoreError> {
        let invoice = api.outbound_shipment(id).await?;
        self.dispatch(OutboundAction::Merge(invoice))?;
        Ok(())
    }

    /// Build the allocation table for `item_id` from its current stock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` if the stock lookup fails.
    #[instrument(skip(self, api), fields(item_id = %item_id))]
    pub async fn batch_rows<A: ShipmentApi>(
        &self,
        api: &A,
        item_id: &ItemId,
    ) -> Result<BatchRows, StoreError> {
        let stock_lines = api.stock_lines(item_id).await?;
        let summary = self
            .inner
            .lock()
            .draft
            .summary_item(item_id)
            .cloned()
            .unwrap_or_else(|| SummaryItem::empty(item_id.clone(), "", ""));
        Ok(BatchRows::for_summary_item(&summary, &stock_lines))
    }

    /// Persist local edits, then re-fetch and merge the shipment.
    ///
    /// The draft is only touched by the final merge; if any request fails
    /// the local edits stay as they are and the error is returned. Edits
    /// dispatched while the requests are in flight are replayed on top of
    /// the merged shipment and stay dirty for the next save.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotLoaded` before the first load,
    /// `StoreError::NotEditable` when line changes are pending on a shipment
    /// past picking, or `StoreError::Api` if a request fails.
    #[instrument(skip(self, api))]
    pub async fn save<A: ShipmentApi>(&self, api: &A) -> Result<SaveOutcome, StoreError> {
        let draft = self.draft();
        if draft.is_placeholder() {
            return Err(StoreError::NotLoaded);
        }
        let invoice_id = draft.id().clone();
        let changes = LineChanges::from_draft(&draft);
        if !changes.is_empty() && !draft.is_editable() {
            return Err(StoreError::NotEditable(invoice_id));
        }

        let outcome = SaveOutcome {
            inserted: changes.inserts.len(),
            updated: changes.updates.len(),
            deleted: changes.deletes.len(),
            header_updated: draft.is_header_dirty,
        };
        if outcome.is_noop() {
            return Ok(outcome);
        }

        if !changes.is_empty() {
            api.save_lines(&invoice_id, &changes).await.inspect_err(|e| {
                warn!(invoice_id = %invoice_id, error = %e, "Failed to save shipment lines");
            })?;
        }
        if outcome.header_updated {
            api.update_invoice(&draft.patch()).await?;
        }

        let invoice = api.outbound_shipment(&invoice_id).await?;
        let replayed = self.inner.merge_saved(invoice, &draft)?;

        info!(
            invoice_id = %invoice_id,
            inserted = outcome.inserted,
            updated = outcome.updated,
            deleted = outcome.deleted,
            header_updated = outcome.header_updated,
            replayed,
            "Saved shipment"
        );
        Ok(outcome)
    }
}
