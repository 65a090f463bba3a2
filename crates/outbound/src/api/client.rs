//! Shipment GraphQL API client.
//!
//! Provides type-safe access to outbound shipments and stock lines of one
//! store.

use std::sync::Arc;

use graphql_client::GraphQLQuery;
use serde::Deserialize;
use stockroom_core::{InvoiceId, ItemId, StoreId};
use tracing::{info, instrument};
use url::Url;

use super::queries::{
    GetOutboundShipment, GetStockLines, Rejection, SaveOutboundShipmentLines,
    UpdateOutboundShipment, get_outbound_shipment, get_stock_lines, save_outbound_shipment_lines,
    update_outbound_shipment,
};
use super::{ApiError, GraphQLError, GraphQLErrorLocation, ShipmentApi};
use crate::changes::LineChanges;
use crate::config::ApiConfig;
use crate::invoice::{Invoice, InvoicePatch};
use crate::stock::StockLine;

/// Shipment GraphQL API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct ShipmentClient {
    inner: Arc<ShipmentClientInner>,
}

struct ShipmentClientInner {
    client: reqwest::Client,
    endpoint: Url,
    store_id: StoreId,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    locations: Vec<GraphQLErrorLocationResponse>,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorLocationResponse {
    line: i64,
    column: i64,
}

impl ShipmentClient {
    /// Create a client for the API and store in `config`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ShipmentClientInner {
                client,
                endpoint: config.api_url.clone(),
                store_id: config.store_id.clone(),
            }),
        })
    }

    /// The store all requests are scoped to.
    #[must_use]
    pub fn store_id(&self) -> &StoreId {
        &self.inner.store_id
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RateLimited` if we're being rate limited.
    /// Returns `ApiError::GraphQL` if the query returns errors.
    /// Returns `ApiError::Http` on network failures.
    #[instrument(skip(self, variables), fields(endpoint = %self.inner.endpoint))]
    pub async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ApiError> {
        let body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(self.inner.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ApiError::RateLimited(retry_after));
        }

        let response = response.error_for_status()?;
        let text = response.text().await?;
        let graphql_response: GraphQLResponse<Q::ResponseData> = serde_json::from_str(&text)?;

        // Check for GraphQL errors
        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            let converted_errors: Vec<GraphQLError> = errors
                .into_iter()
                .map(|e| GraphQLError {
                    message: e.message,
                    locations: e
                        .locations
                        .into_iter()
                        .map(|l| GraphQLErrorLocation {
                            line: l.line,
                            column: l.column,
                        })
                        .collect(),
                    path: e.path,
                })
                .collect();
            return Err(ApiError::GraphQL(converted_errors));
        }

        graphql_response.data.ok_or_else(|| {
            ApiError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                locations: vec![],
                path: vec![],
            }])
        })
    }
}

impl ShipmentApi for ShipmentClient {
    #[instrument(skip(self), fields(invoice_id = %id))]
    async fn outbound_shipment(&self, id: &InvoiceId) -> Result<Invoice, ApiError> {
        let response = self
            .execute::<GetOutboundShipment>(get_outbound_shipment::Variables {
                id: id.to_string(),
                store_id: self.inner.store_id.to_string(),
            })
            .await?;

        use get_outbound_shipment::GetOutboundShipmentInvoice as InvoiceResponse;
        match response.invoice {
            InvoiceResponse::InvoiceNode(node) => Ok(node.into()),
            InvoiceResponse::NodeError(error) => Err(ApiError::NotFound(format!(
                "{id}: {}",
                error.error.description
            ))),
        }
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn stock_lines(&self, item_id: &ItemId) -> Result<Vec<StockLine>, ApiError> {
        let response = self
            .execute::<GetStockLines>(get_stock_lines::Variables {
                store_id: self.inner.store_id.to_string(),
                item_id: item_id.to_string(),
            })
            .await?;

        Ok(response.into_stock_lines())
    }

    #[instrument(skip(self, changes), fields(invoice_id = %invoice_id, lines = changes.len()))]
    async fn save_lines(&self, invoice_id: &InvoiceId, changes: &LineChanges) -> Result<(), ApiError> {
        if changes.is_empty() {
            return Ok(());
        }

        let response = self
            .execute::<SaveOutboundShipmentLines>(save_outbound_shipment_lines::Variables {
                store_id: self.inner.store_id.to_string(),
                input: save_outbound_shipment_lines::BatchOutboundShipmentInput::from_changes(
                    invoice_id, changes,
                ),
            })
            .await?;

        let failures = response.failures();
        if !failures.is_empty() {
            return Err(ApiError::Rejected(failures.join("; ")));
        }

        info!(
            inserts = changes.inserts.len(),
            updates = changes.updates.len(),
            deletes = changes.deletes.len(),
            "Saved shipment lines"
        );
        Ok(())
    }

    #[instrument(skip(self, patch), fields(invoice_id = %patch.id))]
    async fn update_invoice(&self, patch: &InvoicePatch) -> Result<(), ApiError> {
        let response = self
            .execute::<UpdateOutboundShipment>(update_outbound_shipment::Variables {
                input: update_outbound_shipment::UpdateOutboundShipmentInput::from(patch),
                store_id: self.inner.store_id.to_string(),
            })
            .await?;

        match response.update_outbound_shipment.failure() {
            Some(failure) => Err(ApiError::Rejected(failure)),
            None => Ok(()),
        }
    }
}
