//! Stockroom Outbound - draft engine for outbound shipments.
//!
//! Holds an editable copy of a shipment while it is being picked, keeps it
//! reconciled with what the server returns, and spreads requested
//! quantities over the available stock batches.
//!
//! # Architecture
//!
//! - [`reducer`] - Pure `(state, action) -> state` transitions for the draft
//! - [`allocation`] - First-expiry-first-out allocation over stock batches
//! - [`store`] - Owns the live state and runs the load and save cycle
//! - [`api`] - GraphQL client for shipments and stock
//!
//! # Modules
//!
//! - [`invoice`] - Server documents and editable header fields
//! - [`line`] - Draft lines with their lifecycle flags
//! - [`summary`] - Per-item aggregation of lines
//! - [`draft`] - The draft document and its bound callbacks
//! - [`pack_size`] - Issue pack-size selection
//! - [`changes`] - Line changes pending a save
//! - [`config`] - Environment configuration

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod allocation;
pub mod api;
pub mod changes;
pub mod config;
pub mod draft;
pub mod error;
pub mod invoice;
pub mod line;
pub mod pack_size;
pub mod reducer;
pub mod stock;
pub mod store;
pub mod summary;

pub use allocation::{BatchRow, BatchRows, PLACEHOLDER_ID, allocate};
pub use api::{ApiError, ShipmentApi, ShipmentClient};
pub use changes::LineChanges;
pub use config::{ApiConfig, ConfigError, LogFormat};
pub use draft::{Callbacks, Dispatcher, Draft};
pub use error::{AllocationError, DraftError, StoreError};
pub use invoice::{DraftField, Invoice, InvoiceHeader, InvoiceLine, InvoicePatch};
pub use line::Line;
pub use pack_size::{PackSizeSelector, PackSizeSource, distinct_pack_sizes};
pub use reducer::{DraftState, OutboundAction, Reducer};
pub use stock::StockLine;
pub use store::{DraftStore, SaveOutcome};
pub use summary::{SummaryColumn, SummaryItem};
