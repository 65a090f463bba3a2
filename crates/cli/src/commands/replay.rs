//! Offline draft replay.
//!
//! Merges a shipment document into an empty draft, dispatches the given
//! actions in order, and prints the resulting state together with the line
//! changes a save would submit.

use std::path::Path;

use serde::Serialize;
use stockroom_outbound::{DraftState, DraftStore, Invoice, LineChanges, OutboundAction};
use tracing::info;

use super::{CommandError, read_json, write_json};

/// Final state of a replay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayReport {
    pub state: DraftState,
    pub changes: LineChanges,
}

/// Run `stockroom replay`.
pub fn run(invoice: &Path, actions: Option<&Path>) -> Result<(), CommandError> {
    let invoice: Invoice = read_json(invoice)?;
    let actions: Vec<OutboundAction> = match actions {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    write_json(&replay(invoice, actions)?)
}

/// Merge `invoice`, then dispatch `actions` in order.
pub fn replay(
    invoice: Invoice,
    actions: Vec<OutboundAction>,
) -> Result<ReplayReport, CommandError> {
    let store = DraftStore::new();
    store.dispatch(OutboundAction::Merge(invoice))?;

    let count = actions.len();
    for action in actions {
        store.dispatch(action)?;
    }
    info!(actions = count, "Replayed actions");

    Ok(ReplayReport {
        state: store.state(),
        changes: store.changes(),
    })
}
