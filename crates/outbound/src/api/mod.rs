//! Shipment GraphQL API client.
//!
//! Fetches outbound shipments and stock, and persists draft changes.
//!
//! # Architecture
//!
//! - One GraphQL endpoint, scoped to a store by the `storeId` variable
//! - Operations are `graphql_client` query types declared in [`queries`]
//! - [`ShipmentApi`] is the seam the draft store depends on, so the save
//!   cycle runs against any implementation

pub mod client;
pub mod queries;

pub use client::ShipmentClient;

use std::future::Future;

use stockroom_core::{InvoiceId, ItemId};
use thiserror::Error;

use crate::changes::LineChanges;
use crate::invoice::{Invoice, InvoicePatch};
use crate::stock::StockLine;

/// Errors that can occur when talking to the shipment API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server refused one or more changes.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Rate limited by the server.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// A GraphQL error returned by the API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Operations the draft store needs from the backend.
pub trait ShipmentApi: Send + Sync {
    /// Fetch one outbound shipment with its lines.
    fn outbound_shipment(
        &self,
        id: &InvoiceId,
    ) -> impl Future<Output = Result<Invoice, ApiError>> + Send;

    /// Fetch the stock batches of an item in the current store.
    fn stock_lines(
        &self,
        item_id: &ItemId,
    ) -> impl Future<Output = Result<Vec<StockLine>, ApiError>> + Send;

    /// Persist line inserts, updates and deletes in one batch.
    fn save_lines(
        &self,
        invoice_id: &InvoiceId,
        changes: &LineChanges,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Persist the editable header fields.
    fn update_invoice(
        &self,
        patch: &InvoicePatch,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("inv-123".to_string());
        assert_eq!(err.to_string(), "Not found: inv-123");
    }

    #[test]
    fn test_graphql_error_formatting() {
        let errors = vec![
            GraphQLError {
                message: "Field not found".to_string(),
                locations: vec![],
                path: vec![],
            },
            GraphQLError {
                message: "Invalid ID".to_string(),
                locations: vec![GraphQLErrorLocation { line: 2, column: 5 }],
                path: vec![],
            },
        ];
        let err = ApiError::GraphQL(errors);
        assert_eq!(err.to_string(), "GraphQL errors: Field not found; Invalid ID");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
