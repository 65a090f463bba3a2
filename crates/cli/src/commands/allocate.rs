//! Offline stock allocation.

use std::path::Path;

use serde::Serialize;
use stockroom_core::ItemId;
use stockroom_outbound::{BatchRows, PackSizeSelector, StockLine, SummaryItem};
use tracing::info;

use super::{CommandError, read_json, write_json};

/// Outcome of one allocation run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    pub requested: f64,
    pub issue_pack_size: Option<u32>,
    pub pack_sizes: PackSizeSelector,
    /// Units available across the batches.
    pub available_quantity: u64,
    /// Units issued from real stock.
    pub allocated_quantity: u64,
    /// Units left on the placeholder line.
    pub backordered_quantity: u64,
    pub batches: BatchRows,
}

/// Run `stockroom allocate`.
pub fn run(
    stock: &Path,
    item: Option<&str>,
    quantity: f64,
    pack_size: Option<u32>,
) -> Result<(), CommandError> {
    let stock_lines: Vec<StockLine> = read_json(stock)?;
    let report = allocate_stock(&stock_lines, item.map(ItemId::new), quantity, pack_size)?;
    write_json(&report)
}

/// Allocate `quantity` of `item` (the first stock line's item by default)
/// over `stock_lines`.
pub fn allocate_stock(
    stock_lines: &[StockLine],
    item: Option<ItemId>,
    quantity: f64,
    pack_size: Option<u32>,
) -> Result<AllocationReport, CommandError> {
    let item_id = match item {
        Some(item_id) => item_id,
        None => stock_lines
            .first()
            .map(|line| line.item_id.clone())
            .ok_or(CommandError::NoStock)?,
    };

    let mut batches = BatchRows::for_summary_item(&SummaryItem::empty(item_id, "", ""), stock_lines);
    let mut pack_sizes = PackSizeSelector::new(batches.rows());
    if let Some(size) = pack_size
        && !pack_sizes.select(size)
    {
        return Err(CommandError::PackSize(size, pack_sizes.options().to_vec()));
    }

    batches.allocate(quantity, pack_size)?;

    let allocated_quantity = batches.allocated_quantity();
    let backordered_quantity = batches
        .rows()
        .iter()
        .filter(|row| row.is_placeholder())
        .map(stockroom_outbound::BatchRow::allocated_units)
        .sum();
    info!(
        item_id = %batches.item_id,
        allocated_quantity,
        backordered_quantity,
        "Allocated stock"
    );

    Ok(AllocationReport {
        requested: quantity,
        issue_pack_size: pack_size,
        pack_sizes,
        available_quantity: batches.available_quantity(),
        allocated_quantity,
        backordered_quantity,
        batches,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn stock() -> Vec<StockLine> {
        serde_json::from_str(
            r#"[
                {"id": "a", "itemId": "i1", "storeId": "st", "packSize": 1,
                 "availableNumberOfPacks": 5, "totalNumberOfPacks": 5,
                 "expiryDate": "2025-01-01"},
                {"id": "b", "itemId": "i1", "storeId": "st", "packSize": 1,
                 "availableNumberOfPacks": 10, "totalNumberOfPacks": 10,
                 "expiryDate": "2025-06-01"},
                {"id": "c", "itemId": "i1", "storeId": "st", "packSize": 10,
                 "availableNumberOfPacks": 3, "totalNumberOfPacks": 3,
                 "expiryDate": "2024-12-01"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_allocates_units_first_expiry_first() {
        let report = allocate_stock(&stock(), None, 27.0, None).unwrap();
        assert_eq!(report.available_quantity, 45);
        assert_eq!(report.allocated_quantity, 27);
        assert_eq!(report.backordered_quantity, 0);
        assert_eq!(report.pack_sizes.options(), &[1, 10]);

        let packs: Vec<(&str, u32)> = report
            .batches
            .rows()
            .iter()
            .map(|row| (row.id.as_str(), row.number_of_packs))
            .collect();
        assert_eq!(packs, vec![("c", 2), ("a", 5), ("b", 2), ("placeholder", 0)]);
    }

    #[test]
    fn test_allocates_in_packs() {
        let report = allocate_stock(&stock(), None, 5.0, Some(10)).unwrap();
        assert_eq!(report.allocated_quantity, 30);
        assert_eq!(report.backordered_quantity, 20);
        assert_eq!(report.pack_sizes.selected(), Some(10));
    }

    #[test]
    fn test_rejects_unknown_pack_size() {
        let err = allocate_stock(&stock(), None, 1.0, Some(25)).unwrap_err();
        assert!(matches!(err, CommandError::PackSize(25, ref options) if options == &[1, 10]));
    }

    #[test]
    fn test_requires_an_item() {
        assert!(matches!(
            allocate_stock(&[], None, 1.0, None),
            Err(CommandError::NoStock)
        ));

        let report = allocate_stock(&[], Some(ItemId::new("i9")), 3.0, None).unwrap();
        assert_eq!(report.backordered_quantity, 3);
        assert_eq!(report.allocated_quantity, 0);
    }
}
