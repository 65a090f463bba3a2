//! GraphQL operation definitions for the shipment API.
//!
//! Uses `graphql_client` to generate type-safe Rust code from the operations
//! in `graphql/queries/`. The conversions below turn the generated response
//! types into the crate's own documents, and line changes into the batch
//! mutation input.

use graphql_client::GraphQLQuery;
use stockroom_core::{
    Colour, InvoiceId, InvoiceStatus, ItemId, LineId, Price, StockLineId, StoreId,
};

use crate::changes::LineChanges;
use crate::invoice::{Invoice, InvoiceHeader, InvoiceLine, InvoicePatch};
use crate::stock::StockLine;

// =============================================================================
// Custom scalar type aliases (used by graphql_client)
// =============================================================================

/// RFC 3339 date-time.
type DateTime = chrono::DateTime<chrono::Utc>;

/// Date without time zone (YYYY-MM-DD).
type NaiveDate = chrono::NaiveDate;

// =============================================================================
// Shipment queries
// =============================================================================

/// Get one outbound shipment with its lines.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/shipments.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetOutboundShipment;

// =============================================================================
// Stock queries
// =============================================================================

/// Get the stock batches of one item.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/stock.graphql",
    response_derives = "Debug, Clone"
)]
pub struct GetStockLines;

// =============================================================================
// Mutations
// =============================================================================

/// Insert, update and delete shipment lines in one request.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/shipments.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct SaveOutboundShipmentLines;

/// Update the editable header fields of a shipment.
#[derive(GraphQLQuery)]
#[graphql(
    schema_path = "graphql/schema.graphql",
    query_path = "graphql/queries/shipments.graphql",
    response_derives = "Debug, Clone",
    variables_derives = "Debug, Clone"
)]
pub struct UpdateOutboundShipment;

// =============================================================================
// Response conversions
// =============================================================================

/// Pack counts arrive as GraphQL `Int`; negative values count as zero.
fn packs(value: i64) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

fn price(value: f64) -> Price {
    Price::from_f64(value).unwrap_or_default()
}

const fn convert_status(status: &get_outbound_shipment::InvoiceNodeStatus) -> InvoiceStatus {
    use get_outbound_shipment::InvoiceNodeStatus as Status;
    match status {
        Status::NEW => InvoiceStatus::New,
        Status::ALLOCATED => InvoiceStatus::Allocated,
        Status::PICKED => InvoiceStatus::Picked,
        Status::SHIPPED => InvoiceStatus::Shipped,
        Status::DELIVERED => InvoiceStatus::Delivered,
        // Unknown statuses are treated as final, so the draft is read-only.
        Status::VERIFIED | Status::Other(_) => InvoiceStatus::Verified,
    }
}

impl From<get_outbound_shipment::GetOutboundShipmentInvoiceOnInvoiceNode> for Invoice {
    fn from(node: get_outbound_shipment::GetOutboundShipmentInvoiceOnInvoiceNode) -> Self {
        let id = InvoiceId::new(node.id);
        let lines = node
            .lines
            .nodes
            .into_iter()
            .map(|line| InvoiceLine {
                id: LineId::new(line.id),
                item_id: ItemId::new(line.item_id),
                item_name: line.item_name,
                item_code: line.item_code,
                batch: line.batch,
                pack_size: packs(line.pack_size),
                number_of_packs: packs(line.number_of_packs),
                cost_price_per_pack: price(line.cost_price_per_pack),
                sell_price_per_pack: price(line.sell_price_per_pack),
                expiry_date: line.expiry_date,
                location_name: line.location_name,
                note: line.note,
                stock_line_id: line.stock_line.map(|stock_line| StockLineId::new(stock_line.id)),
            })
            .collect();

        Self {
            header: InvoiceHeader {
                id,
                invoice_number: node.invoice_number,
                status: convert_status(&node.status),
                other_party_name: node.other_party_name,
                comment: node.comment,
                colour: node
                    .colour
                    .as_deref()
                    .and_then(|colour| colour.parse::<Colour>().ok())
                    .unwrap_or_default(),
                their_reference: node.their_reference,
                on_hold: node.on_hold,
                created_datetime: Some(node.created_datetime),
                allocated_datetime: node.allocated_datetime,
                picked_datetime: node.picked_datetime,
                shipped_datetime: node.shipped_datetime,
                delivered_datetime: node.delivered_datetime,
            },
            lines,
        }
    }
}

impl get_stock_lines::ResponseData {
    /// The returned batches as [`StockLine`]s.
    #[must_use]
    pub fn into_stock_lines(self) -> Vec<StockLine> {
        self.stock_lines
            .nodes
            .into_iter()
            .map(|node| StockLine {
                id: StockLineId::new(node.id),
                item_id: ItemId::new(node.item_id),
                store_id: StoreId::new(node.store_id),
                batch: node.batch,
                pack_size: packs(node.pack_size),
                available_number_of_packs: packs(node.available_number_of_packs),
                total_number_of_packs: packs(node.total_number_of_packs),
                cost_price_per_pack: price(node.cost_price_per_pack),
                sell_price_per_pack: price(node.sell_price_per_pack),
                on_hold: node.on_hold,
                expiry_date: node.expiry_date,
                location_name: node.location_name,
                note: node.note,
            })
            .collect()
    }
}

/// A mutation result that may carry a rejection.
pub trait Rejection {
    /// `ErrorType: description` when the server rejected the change.
    fn failure(&self) -> Option<String>;
}

/// Implement [`Rejection`] for a generated result union, listing its error
/// members.
macro_rules! rejection {
    ($response:ty { $($error:ident),+ $(,)? }) => {
        impl Rejection for $response {
            fn failure(&self) -> Option<String> {
                match self {
                    $(Self::$error(rejected) => Some(format!(
                        "{}: {}",
                        stringify!($error),
                        rejected.error.description
                    )),)+
                    _ => None,
                }
            }
        }
    };
}

rejection!(save_outbound_shipment_lines::SaveOutboundShipmentLinesBatchOutboundShipmentInsertOutboundShipmentLinesResponse {
    InsertOutboundShipmentLineError,
    NodeError,
});
rejection!(save_outbound_shipment_lines::SaveOutboundShipmentLinesBatchOutboundShipmentUpdateOutboundShipmentLinesResponse {
    UpdateOutboundShipmentLineError,
    NodeError,
});
rejection!(save_outbound_shipment_lines::SaveOutboundShipmentLinesBatchOutboundShipmentDeleteOutboundShipmentLinesResponse {
    DeleteOutboundShipmentLineError,
});
rejection!(save_outbound_shipment_lines::SaveOutboundShipmentLinesBatchOutboundShipmentInsertOutboundShipmentUnallocatedLinesResponse {
    InsertOutboundShipmentUnallocatedLineError,
});
rejection!(save_outbound_shipment_lines::SaveOutboundShipmentLinesBatchOutboundShipmentUpdateOutboundShipmentUnallocatedLinesResponse {
    UpdateOutboundShipmentUnallocatedLineError,
});
rejection!(save_outbound_shipment_lines::SaveOutboundShipmentLinesBatchOutboundShipmentDeleteOutboundShipmentUnallocatedLinesResponse {
    DeleteOutboundShipmentUnallocatedLineError,
});
rejection!(update_outbound_shipment::UpdateOutboundShipmentUpdateOutboundShipment {
    NodeError,
    UpdateOutboundShipmentError,
});

impl save_outbound_shipment_lines::ResponseData {
    /// `line id: error` for every rejected line.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        let batch = &self.batch_outbound_shipment;
        let mut failures = Vec::new();
        macro_rules! collect {
            ($($results:ident),+) => {
                $(
                    for result in batch.$results.iter().flatten() {
                        if let Some(failure) = result.response.failure() {
                            failures.push(format!("{}: {failure}", result.id));
                        }
                    }
                )+
            };
        }
        collect!(
            insert_outbound_shipment_lines,
            update_outbound_shipment_lines,
            delete_outbound_shipment_lines,
            insert_outbound_shipment_unallocated_lines,
            update_outbound_shipment_unallocated_lines,
            delete_outbound_shipment_unallocated_lines
        );
        failures
    }
}

// =============================================================================
// Input conversions
// =============================================================================

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}

fn quantity(units: u64) -> i64 {
    i64::try_from(units).unwrap_or(i64::MAX)
}

impl save_outbound_shipment_lines::BatchOutboundShipmentInput {
    /// Build the batch for `changes` on `invoice_id`, splitting stock-backed
    /// lines from unallocated (placeholder) ones.
    #[must_use]
    pub fn from_changes(invoice_id: &InvoiceId, changes: &LineChanges) -> Self {
        use save_outbound_shipment_lines as batch;

        let mut inserts = Vec::new();
        let mut unallocated_inserts = Vec::new();
        for line in &changes.inserts {
            match &line.stock_line_id {
                Some(stock_line_id) => inserts.push(batch::InsertOutboundShipmentLineInput {
                    id: line.id.to_string(),
                    invoice_id: invoice_id.to_string(),
                    stock_line_id: stock_line_id.to_string(),
                    number_of_packs: i64::from(line.number_of_packs),
                }),
                None => unallocated_inserts.push(batch::InsertOutboundShipmentUnallocatedLineInput {
                    id: line.id.to_string(),
                    invoice_id: invoice_id.to_string(),
                    item_id: line.item_id.to_string(),
                    quantity: quantity(line.unit_quantity()),
                }),
            }
        }

        let mut updates = Vec::new();
        let mut unallocated_updates = Vec::new();
        for line in &changes.updates {
            match &line.stock_line_id {
                Some(stock_line_id) => updates.push(batch::UpdateOutboundShipmentLineInput {
                    id: line.id.to_string(),
                    stock_line_id: Some(stock_line_id.to_string()),
                    number_of_packs: Some(i64::from(line.number_of_packs)),
                }),
                None => unallocated_updates.push(batch::UpdateOutboundShipmentUnallocatedLineInput {
                    id: line.id.to_string(),
                    quantity: quantity(line.unit_quantity()),
                }),
            }
        }

        let (unallocated_deletes, deletes): (Vec<_>, Vec<_>) =
            changes.deletes.iter().partition(|line| line.is_placeholder());

        Self {
            insert_outbound_shipment_lines: non_empty(inserts),
            update_outbound_shipment_lines: non_empty(updates),
            delete_outbound_shipment_lines: non_empty(
                deletes
                    .into_iter()
                    .map(|line| batch::DeleteOutboundShipmentLineInput {
                        id: line.id.to_string(),
                    })
                    .collect(),
            ),
            insert_outbound_shipment_unallocated_lines: non_empty(unallocated_inserts),
            update_outbound_shipment_unallocated_lines: non_empty(unallocated_updates),
            delete_outbound_shipment_unallocated_lines: non_empty(
                unallocated_deletes
                    .into_iter()
                    .map(|line| batch::DeleteOutboundShipmentUnallocatedLineInput {
                        id: line.id.to_string(),
                    })
                    .collect(),
            ),
            continue_on_error: None,
        }
    }
}

impl From<&InvoicePatch> for update_outbound_shipment::UpdateOutboundShipmentInput {
    fn from(patch: &InvoicePatch) -> Self {
        Self {
            id: patch.id.to_string(),
            comment: patch.comment.clone(),
            colour: Some(patch.colour.as_str().to_owned()),
            their_reference: patch.their_reference.clone(),
            on_hold: Some(patch.on_hold),
        }
    }
}
