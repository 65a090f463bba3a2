//! Status enums for shipment documents.

use serde::{Deserialize, Serialize};

/// Outbound invoice (shipment) status.
///
/// Maps to the server's invoice status values. Statuses only ever move
/// forward, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[default]
    New,
    Allocated,
    Picked,
    Shipped,
    Delivered,
    Verified,
}

impl InvoiceStatus {
    /// All statuses in progression order.
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Allocated,
        Self::Picked,
        Self::Shipped,
        Self::Delivered,
        Self::Verified,
    ];

    /// Whether lines on a document in this status may still be edited.
    ///
    /// Once stock has left the building the document is read-only.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::New | Self::Allocated | Self::Picked)
    }

    /// The status that follows this one, or `None` for the final status.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::Allocated),
            Self::Allocated => Some(Self::Picked),
            Self::Picked => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered => Some(Self::Verified),
            Self::Verified => None,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::Allocated => write!(f, "ALLOCATED"),
            Self::Picked => write!(f, "PICKED"),
            Self::Shipped => write!(f, "SHIPPED"),
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Verified => write!(f, "VERIFIED"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "ALLOCATED" => Ok(Self::Allocated),
            "PICKED" => Ok(Self::Picked),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "VERIFIED" => Ok(Self::Verified),
            _ => Err(format!("invalid invoice status: {s}")),
        }
    }
}
