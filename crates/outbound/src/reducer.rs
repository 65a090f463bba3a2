//! Draft reconciliation reducer.
//!
//! Folds server documents and local edits into a [`Draft`]. Every transition
//! takes the previous [`DraftState`] by reference and returns a new one; the
//! input is never touched.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use stockroom_core::{LineId, SortBy, sort_records};
use tracing::{debug, info};

use crate::draft::{Callbacks, Dispatcher, Draft, LineLocation};
use crate::error::DraftError;
use crate::invoice::{DraftField, Invoice};
use crate::line::Line;
use crate::summary::{SummaryColumn, SummaryItem};

/// Actions accepted by the reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum OutboundAction {
    /// Leaves the state unchanged.
    Init,
    /// Fresh server data arrived.
    Merge(Invoice),
    /// Insert or update one line; zero packs removes it.
    UpsertLine(Line),
    /// Remove a local line, or flag a persisted one for deletion.
    DeleteLine(Line),
    /// Edit one header field.
    UpdateInvoice(DraftField),
    /// Sort the summary items by a column, flipping the direction when it is
    /// already the active one.
    SortBy(SummaryColumn),
}

/// Everything the reducer owns: the draft and how its items are sorted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftState {
    pub draft: Draft,
    pub sort_by: SortBy<SummaryColumn>,
}

impl Default for DraftState {
    fn default() -> Self {
        Self {
            draft: Draft::placeholder(),
            sort_by: SortBy::new(SummaryColumn::NumberOfPacks, true),
        }
    }
}

/// Applies [`OutboundAction`]s to a [`DraftState`].
///
/// The dispatcher, if any, is bound into the draft's callbacks on every
/// merge so the UI can route edits back through the same reducer.
#[derive(Clone, Default)]
pub struct Reducer {
    dispatch: Option<Dispatcher>,
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer")
            .field("dispatch", &self.dispatch.is_some())
            .finish()
    }
}

impl Reducer {
    /// A reducer that leaves draft callbacks unbound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A reducer that binds draft callbacks to `dispatch`.
    #[must_use]
    pub fn with_dispatcher(dispatch: Dispatcher) -> Self {
        Self {
            dispatch: Some(dispatch),
        }
    }

    /// Apply `action` to `state`, returning the next state.
    ///
    /// # Errors
    ///
    /// Returns `DraftError::DocumentMismatch` when merging a shipment other
    /// than the one the draft holds.
    pub fn reduce(
        &self,
        state: &DraftState,
        action: OutboundAction,
    ) -> Result<DraftState, DraftError> {
        let mut next = state.clone();
        match action {
            OutboundAction::Init => {}
            OutboundAction::Merge(invoice) => {
                self.merge(&mut next.draft, invoice)?;
                sort_records(&mut next.draft.items, &next.sort_by);
            }
            OutboundAction::UpsertLine(line) => upsert_line(&mut next.draft, line),
            OutboundAction::DeleteLine(line) => delete_line(&mut next.draft, &line),
            OutboundAction::UpdateInvoice(field) => {
                next.draft.header.apply(field);
                next.draft.is_header_dirty = true;
            }
            OutboundAction::SortBy(column) => {
                next.sort_by = next.sort_by.toggled(column);
                sort_records(&mut next.draft.items, &next.sort_by);
            }
        }
        Ok(next)
    }

    fn merge(&self, draft: &mut Draft, invoice: Invoice) -> Result<(), DraftError> {
        if !draft.is_placeholder() && draft.header.id != invoice.header.id {
            return Err(DraftError::DocumentMismatch {
                expected: draft.header.id.clone(),
                found: invoice.header.id,
            });
        }

        let Invoice { header, lines } = invoice;
        let invoice_id = header.id.clone();
        let mut confirmed: HashSet<LineId> = HashSet::with_capacity(lines.len());

        for server_line in &lines {
            let incoming = Line::from_server(server_line, &invoice_id);
            let location = draft.locate(&incoming).map(|mut location| {
                // Two server lines on the same batch must not collapse into one.
                if location
                    .line
                    .as_ref()
                    .is_some_and(|key| key != &incoming.id && confirmed.contains(key))
                {
                    location.line = None;
                }
                location
            });

            match location {
                Some(LineLocation { item, line }) => {
                    let Some(summary) = draft.items.get_mut(item) else {
                        continue;
                    };
                    let merged = match line.and_then(|key| summary.lines.remove(&key)) {
                        Some(existing) => existing.merged_with(server_line, &invoice_id),
                        None => incoming,
                    };
                    if summary.item_name.is_empty() {
                        summary.item_name.clone_from(&merged.item_name);
                    }
                    if summary.item_code.is_empty() {
                        summary.item_code.clone_from(&merged.item_code);
                    }
                    confirmed.insert(merged.id.clone());
                    summary.lines.insert(merged.id.clone(), merged);
                }
                None => {
                    confirmed.insert(incoming.id.clone());
                    draft
                        .items
                        .push(SummaryItem::new(incoming.item_id.clone(), [incoming]));
                }
            }
        }

        // Unsaved local lines survive; persisted lines the server no longer
        // returns are gone.
        for summary in &mut draft.items {
            summary
                .lines
                .retain(|id, line| confirmed.contains(id) || line.is_created);
            summary.refresh();
            summary.is_deleted = summary.all_deleted();
        }
        draft.items.retain(|summary| !summary.is_empty());

        draft.header = header;
        draft.is_header_dirty = false;
        if let Some(dispatch) = &self.dispatch {
            draft.callbacks = Callbacks::bound(dispatch.clone());
        }

        info!(
            invoice_id = %invoice_id,
            lines = lines.len(),
            items = draft.items.len(),
            "Merged shipment into draft"
        );
        Ok(())
    }
}

fn upsert_line(draft: &mut Draft, line: Line) {
    let invoice_id = draft.header.id.clone();
    let Some(LineLocation { item, line: found }) = draft.locate(&line) else {
        if line.number_of_packs == 0 {
            debug!(line_id = %line.id, "Ignoring zero-quantity line for unknown item");
            return;
        }
        let created = line.into_created(&invoice_id);
        draft
            .items
            .push(SummaryItem::new(created.item_id.clone(), [created]));
        return;
    };
    let Some(summary) = draft.items.get_mut(item) else {
        return;
    };

    let existing = match found {
        Some(key) => summary.lines.get_mut(&key),
        None => None,
    };
    match existing {
        None if line.number_of_packs == 0 => {
            debug!(line_id = %line.id, "Ignoring zero-quantity line with no match");
            return;
        }
        None => {
            let created = line.into_created(&invoice_id);
            summary.lines.insert(created.id.clone(), created);
        }
        Some(existing) if line.number_of_packs == 0 => {
            if existing.is_created {
                let key = existing.id.clone();
                summary.lines.remove(&key);
            } else {
                existing.number_of_packs = 0;
                existing.is_deleted = true;
                existing.is_updated = false;
                existing.is_created = false;
            }
        }
        Some(existing) => {
            let is_created = existing.is_created;
            *existing = Line {
                id: existing.id.clone(),
                invoice_id,
                is_created,
                is_updated: !is_created,
                is_deleted: false,
                ..line
            };
        }
    }
    settle(draft, item);
}

fn delete_line(draft: &mut Draft, line: &Line) {
    let Some(LineLocation {
        item,
        line: Some(key),
    }) = draft.locate(line)
    else {
        debug!(line_id = %line.id, "Ignoring delete of unknown line");
        return;
    };
    let Some(summary) = draft.items.get_mut(item) else {
        return;
    };
    let Some(existing) = summary.lines.get_mut(&key) else {
        return;
    };

    if existing.is_created {
        summary.lines.remove(&key);
    } else {
        existing.is_deleted = true;
        existing.is_updated = false;
    }
    settle(draft, item);
}

/// Recompute the summary item at `index` after a line edit, dropping it once
/// it has no lines left.
fn settle(draft: &mut Draft, index: usize) {
    let Some(summary) = draft.items.get_mut(index) else {
        return;
    };
    if summary.is_empty() {
        draft.items.remove(index);
        return;
    }
    summary.refresh();
    summary.is_deleted = summary.all_deleted();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::invoice::{InvoiceHeader, InvoiceLine};
    use stockroom_core::{Colour, Direction, InvoiceId, InvoiceStatus, ItemId, Price, StockLineId};

    fn server_line(id: &str, item: &str, stock: &str, packs: u32) -> InvoiceLine {
        InvoiceLine {
            id: LineId::new(id),
            item_id: ItemId::new(item),
            item_name: format!("Item {item}"),
            item_code: item.to_uppercase(),
            batch: Some(format!("batch-{stock}")),
            pack_size: 10,
            number_of_packs: packs,
            cost_price_per_pack: Price::from_minor(100),
            sell_price_per_pack: Price::from_minor(200),
            expiry_date: None,
            location_name: None,
            note: None,
            stock_line_id: Some(StockLineId::new(stock)),
        }
    }

    fn invoice(lines: Vec<InvoiceLine>) -> Invoice {
        Invoice {
            header: InvoiceHeader {
                id: InvoiceId::new("inv-1"),
                invoice_number: 7,
                status: InvoiceStatus::Allocated,
                other_party_name: "Central Pharmacy".to_string(),
                ..InvoiceHeader::default()
            },
            lines,
        }
    }

    fn local_line(id: &str, item: &str, stock: &str, packs: u32) -> Line {
        Line::from_server(&server_line(id, item, stock, packs), &InvoiceId::new("inv-1"))
    }

    fn reduce(state: &DraftState, action: OutboundAction) -> DraftState {
        Reducer::new().reduce(state, action).unwrap()
    }

    fn merged(lines: Vec<InvoiceLine>) -> DraftState {
        reduce(&DraftState::default(), OutboundAction::Merge(invoice(lines)))
    }

    fn line_of<'a>(state: &'a DraftState, id: &str) -> Option<&'a Line> {
        state.draft.lines().find(|line| line.id.as_str() == id)
    }

    #[test]
    fn test_default_sort_is_packs_descending() {
        let state = DraftState::default();
        assert_eq!(state.sort_by.key, SummaryColumn::NumberOfPacks);
        assert_eq!(state.sort_by.direction, Direction::Desc);
        assert!(state.draft.is_placeholder());
    }

    #[test]
    fn test_init_is_noop() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let next = reduce(&state, OutboundAction::Init);
        assert_eq!(next.draft.items, state.draft.items);
    }

    #[test]
    fn test_merge_builds_summary_items() {
        let state = merged(vec![
            server_line("l1", "i1", "s1", 2),
            server_line("l2", "i1", "s2", 3),
            server_line("l3", "i2", "s3", 1),
        ]);

        assert_eq!(state.draft.header.invoice_number, 7);
        assert_eq!(state.draft.items.len(), 2);
        // Sorted by number of packs, descending.
        assert_eq!(state.draft.items[0].item_id, ItemId::new("i1"));
        assert_eq!(state.draft.items[0].number_of_packs, 5);
        assert_eq!(state.draft.items[0].unit_quantity, 50);
        assert_eq!(state.draft.items[0].item_name, "Item i1");
        assert!(state.draft.lines().all(|line| !line.is_dirty()));
    }

    #[test]
    fn test_merge_does_not_mutate_input() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let before = state.draft.items.clone();
        let _next = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("l1", "i1", "s1", 9)),
        );
        assert_eq!(state.draft.items, before);
    }

    #[test]
    fn test_merge_twice_is_stable() {
        let lines = vec![server_line("l1", "i1", "s1", 2), server_line("l2", "i2", "s2", 4)];
        let once = merged(lines.clone());
        let twice = reduce(&once, OutboundAction::Merge(invoice(lines)));

        assert_eq!(twice.draft.items, once.draft.items);
        assert!(twice.draft.lines().all(|line| !line.is_dirty()));
    }

    #[test]
    fn test_merge_swaps_temporary_id_by_stock_line() {
        let state = merged(vec![]);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("temp-uuid", "i1", "s1", 3)),
        );
        assert!(line_of(&state, "temp-uuid").unwrap().is_created);

        let state = reduce(
            &state,
            OutboundAction::Merge(invoice(vec![server_line("server-id", "i1", "s1", 3)])),
        );
        assert!(line_of(&state, "temp-uuid").is_none());
        let line = line_of(&state, "server-id").unwrap();
        assert!(!line.is_dirty());
        assert_eq!(state.draft.items.len(), 1);
        assert_eq!(state.draft.items[0].lines.len(), 1);
    }

    #[test]
    fn test_merge_matches_item_holding_line_id() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        // Same line id reported under another item id stays in place.
        let state = reduce(
            &state,
            OutboundAction::Merge(invoice(vec![server_line("l1", "i9", "s1", 4)])),
        );
        assert_eq!(state.draft.items.len(), 1);
        assert_eq!(state.draft.items[0].item_id, ItemId::new("i1"));
        assert_eq!(state.draft.items[0].number_of_packs, 4);
    }

    #[test]
    fn test_merge_keeps_unsaved_created_lines() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("new", "i2", "s2", 1)),
        );
        let state = reduce(
            &state,
            OutboundAction::Merge(invoice(vec![server_line("l1", "i1", "s1", 2)])),
        );
        assert!(line_of(&state, "new").unwrap().is_created);
        assert_eq!(state.draft.items.len(), 2);
    }

    #[test]
    fn test_merge_drops_persisted_lines_missing_on_server() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2), server_line("l2", "i2", "s2", 1)]);
        let state = reduce(&state, OutboundAction::DeleteLine(local_line("l2", "i2", "s2", 1)));
        assert!(line_of(&state, "l2").unwrap().is_deleted);

        let state = reduce(
            &state,
            OutboundAction::Merge(invoice(vec![server_line("l1", "i1", "s1", 2)])),
        );
        assert!(line_of(&state, "l2").is_none());
        assert_eq!(state.draft.items.len(), 1);
    }

    #[test]
    fn test_merge_keeps_distinct_server_lines_on_same_batch() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2), server_line("l2", "i1", "s1", 3)]);
        assert_eq!(state.draft.items[0].lines.len(), 2);
        assert_eq!(state.draft.items[0].number_of_packs, 5);
    }

    #[test]
    fn test_merge_rejects_other_shipment() {
        let state = merged(vec![]);
        let mut other = invoice(vec![]);
        other.header.id = InvoiceId::new("inv-2");
        let err = Reducer::new()
            .reduce(&state, OutboundAction::Merge(other))
            .unwrap_err();
        assert!(matches!(err, DraftError::DocumentMismatch { .. }));
    }

    #[test]
    fn test_merge_binds_callbacks() {
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let reducer = Reducer::with_dispatcher(Arc::new(move |_: OutboundAction| -> Result<(), DraftError> {
            *counter.lock().unwrap() += 1;
            Ok(())
        }));

        let state = DraftState::default();
        assert!(!state.draft.is_bound());
        let state = reducer
            .reduce(&state, OutboundAction::Merge(invoice(vec![])))
            .unwrap();
        assert!(state.draft.is_bound());

        state.draft.update(DraftField::OnHold(true)).unwrap();
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_upsert_zero_on_empty_draft_is_noop() {
        let state = DraftState::default();
        let mut line = local_line("x", "i1", "s1", 0);
        line.stock_line_id = None;
        let next = reduce(&state, OutboundAction::UpsertLine(line));
        assert!(next.draft.items.is_empty());
    }

    #[test]
    fn test_upsert_zero_for_unmatched_line_is_noop() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let next = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("x", "i1", "s9", 0)),
        );
        assert_eq!(next.draft.items, state.draft.items);
    }

    #[test]
    fn test_upsert_creates_line_in_existing_item() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("x", "i1", "s2", 3)),
        );
        let summary = state.draft.summary_item(&ItemId::new("i1")).unwrap();
        assert_eq!(summary.lines.len(), 2);
        assert_eq!(summary.number_of_packs, 5);
        assert!(line_of(&state, "x").unwrap().is_created);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let line = local_line("x", "i1", "s2", 3);
        let once = reduce(&state, OutboundAction::UpsertLine(line.clone()));
        let twice = reduce(&once, OutboundAction::UpsertLine(line));

        let item = ItemId::new("i1");
        assert_eq!(
            once.draft.summary_item(&item).unwrap().totals(),
            twice.draft.summary_item(&item).unwrap().totals()
        );
        assert!(line_of(&twice, "x").unwrap().is_created);
        assert!(!line_of(&twice, "x").unwrap().is_updated);
    }

    #[test]
    fn test_upsert_updates_persisted_line() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        // Matched by stock line even though the id is fresh.
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("fresh", "i1", "s1", 6)),
        );
        let line = line_of(&state, "l1").unwrap();
        assert!(line.is_updated);
        assert!(!line.is_created);
        assert_eq!(line.number_of_packs, 6);
        assert!(line_of(&state, "fresh").is_none());
        assert_eq!(state.draft.items[0].unit_quantity, 60);
    }

    #[test]
    fn test_upsert_zero_marks_persisted_line_deleted() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("l1", "i1", "s1", 0)),
        );
        let line = line_of(&state, "l1").unwrap();
        assert!(line.is_deleted);
        assert!(!line.is_updated);
        assert_eq!(line.number_of_packs, 0);
        assert!(state.draft.items[0].is_deleted);
        assert_eq!(state.draft.items[0].number_of_packs, 0);
    }

    #[test]
    fn test_upsert_restores_deleted_line() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("l1", "i1", "s1", 0)),
        );
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("l1", "i1", "s1", 1)),
        );
        let line = line_of(&state, "l1").unwrap();
        assert!(!line.is_deleted);
        assert!(line.is_updated);
        assert!(!state.draft.items[0].is_deleted);
    }

    #[test]
    fn test_upsert_zero_removes_created_line_and_item() {
        let state = merged(vec![]);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("x", "i1", "s1", 2)),
        );
        assert_eq!(state.draft.items.len(), 1);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("x", "i1", "s1", 0)),
        );
        assert!(state.draft.items.is_empty());
    }

    #[test]
    fn test_delete_created_line_removes_it() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let state = reduce(
            &state,
            OutboundAction::UpsertLine(local_line("x", "i1", "s2", 1)),
        );
        let state = reduce(&state, OutboundAction::DeleteLine(local_line("x", "i1", "s2", 1)));
        assert!(line_of(&state, "x").is_none());
        assert_eq!(state.draft.items[0].lines.len(), 1);
        assert!(!state.draft.items[0].is_deleted);
    }

    #[test]
    fn test_delete_persisted_line_keeps_it_flagged() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2), server_line("l2", "i1", "s2", 1)]);
        let state = reduce(&state, OutboundAction::DeleteLine(local_line("l1", "i1", "s1", 2)));
        assert!(line_of(&state, "l1").unwrap().is_deleted);
        assert!(!state.draft.items[0].is_deleted);

        let state = reduce(&state, OutboundAction::DeleteLine(local_line("l2", "i1", "s2", 1)));
        assert!(state.draft.items[0].is_deleted);
        assert_eq!(state.draft.items[0].lines.len(), 2);
    }

    #[test]
    fn test_delete_unknown_line_is_noop() {
        let state = merged(vec![server_line("l1", "i1", "s1", 2)]);
        let next = reduce(&state, OutboundAction::DeleteLine(local_line("zz", "i1", "s9", 1)));
        assert_eq!(next.draft.items, state.draft.items);
    }

    #[test]
    fn test_update_invoice_sets_field() {
        let state = merged(vec![]);
        let colour: Colour = "#00ff00".parse().unwrap();
        let state = reduce(&state, OutboundAction::UpdateInvoice(DraftField::Colour(colour.clone())));
        assert_eq!(state.draft.header.colour, colour);
        assert!(state.draft.is_header_dirty);
        assert_eq!(state.draft.status(), InvoiceStatus::Allocated);

        let state = reduce(&state, OutboundAction::Merge(invoice(vec![])));
        assert!(!state.draft.is_header_dirty);
    }

    #[test]
    fn test_sort_toggle_sequence() {
        let state = merged(vec![
            server_line("l1", "b", "s1", 1),
            server_line("l2", "a", "s2", 3),
            server_line("l3", "c", "s3", 2),
        ]);
        let codes = |state: &DraftState| -> Vec<String> {
            state.draft.items.iter().map(|item| item.item_code.clone()).collect()
        };

        let state = reduce(&state, OutboundAction::SortBy(SummaryColumn::ItemCode));
        assert_eq!(state.sort_by.direction, Direction::Desc);
        assert_eq!(codes(&state), ["C", "B", "A"]);

        let state = reduce(&state, OutboundAction::SortBy(SummaryColumn::ItemCode));
        assert_eq!(state.sort_by.direction, Direction::Asc);
        assert_eq!(codes(&state), ["A", "B", "C"]);

        let state = reduce(&state, OutboundAction::SortBy(SummaryColumn::NumberOfPacks));
        assert_eq!(state.sort_by.direction, Direction::Desc);
        assert_eq!(codes(&state), ["A", "C", "B"]);
    }

    #[test]
    fn test_action_wire_format() {
        let json = serde_json::to_string(&OutboundAction::SortBy(SummaryColumn::ExpiryDate)).unwrap();
        assert_eq!(json, r#"{"type":"sortBy","payload":"expiryDate"}"#);

        let action: OutboundAction = serde_json::from_str(r#"{"type":"init"}"#).unwrap();
        assert_eq!(action, OutboundAction::Init);
    }
}
