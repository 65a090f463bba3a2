//! Commands that talk to the shipment API.
//!
//! # Environment Variables
//!
//! - `STOCKROOM_API_URL` - GraphQL endpoint
//! - `STOCKROOM_STORE_ID` - Store the shipment belongs to
//! - `STOCKROOM_TIMEOUT_SECS` - Request timeout (default 30)

use std::path::Path;

use serde::Serialize;
use stockroom_core::{InvoiceId, ItemId};
use stockroom_outbound::{
    ApiConfig, Draft, DraftStore, OutboundAction, SaveOutcome, ShipmentApi, ShipmentClient,
};
use tracing::info;

use super::{CommandError, read_json, write_json};

/// Result of `stockroom sync`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub outcome: SaveOutcome,
    pub draft: Draft,
}

fn client() -> Result<ShipmentClient, CommandError> {
    let config = ApiConfig::from_env()?;
    info!(api_url = %config.api_url, store_id = %config.store_id, "Connecting to shipment API");
    Ok(ShipmentClient::new(&config)?)
}

/// Run `stockroom fetch`.
pub async fn fetch(id: &str, stock: Option<&str>) -> Result<(), CommandError> {
    let client = client()?;
    let store = DraftStore::new();
    store.load(&client, &InvoiceId::new(id)).await?;

    match stock {
        Some(item_id) => write_json(&store.batch_rows(&client, &ItemId::new(item_id)).await?),
        None => write_json(&store.draft()),
    }
}

/// Run `stockroom sync`.
pub async fn sync(id: &str, actions: &Path, dry_run: bool) -> Result<(), CommandError> {
    let actions: Vec<OutboundAction> = read_json(actions)?;
    let client = client()?;

    let store = DraftStore::new();
    let outcome = apply_and_save(&store, &client, &InvoiceId::new(id), actions, dry_run).await?;
    match outcome {
        Some(outcome) => write_json(&SyncReport {
            outcome,
            draft: store.draft(),
        }),
        None => write_json(&store.changes()),
    }
}

/// Load shipment `id` into `store`, dispatch `actions`, then save unless
/// `dry_run` is set.
pub async fn apply_and_save<A: ShipmentApi>(
    store: &DraftStore,
    api: &A,
    id: &InvoiceId,
    actions: Vec<OutboundAction>,
    dry_run: bool,
) -> Result<Option<SaveOutcome>, CommandError> {
    store.load(api, id).await?;
    for action in actions {
        store.dispatch(action)?;
    }

    if dry_run {
        info!(changes = store.changes().len(), "Dry run, nothing saved");
        return Ok(None);
    }
    Ok(Some(store.save(api).await?))
}
