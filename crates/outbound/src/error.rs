//! Error types for draft reconciliation and the save cycle.

use stockroom_core::InvoiceId;
use thiserror::Error;

use crate::api::ApiError;

/// Invariant violations raised while reducing draft actions.
#[derive(Debug, Error)]
pub enum DraftError {
    /// A merge delivered a different shipment than the one being edited.
    #[error("Merge of shipment {found} into draft of shipment {expected}")]
    DocumentMismatch {
        /// Id of the draft being edited.
        expected: InvoiceId,
        /// Id of the incoming server document.
        found: InvoiceId,
    },

    /// A draft callback was invoked before the first merge bound it.
    #[error("Draft callback `{0}` is not bound to a dispatcher")]
    Unbound(&'static str),
}

/// Invariant violations raised by the allocation calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The batch rows have no placeholder row to take the shortfall.
    #[error("Batch rows have no placeholder row")]
    MissingPlaceholder,
}

/// Errors of the draft store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Draft(#[from] DraftError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// `save` was called before any shipment was loaded.
    #[error("No shipment loaded")]
    NotLoaded,

    /// The shipment's status no longer allows line edits.
    #[error("Shipment {0} is not editable")]
    NotEditable(InvoiceId),
}
