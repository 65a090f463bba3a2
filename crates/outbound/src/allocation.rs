//! Allocation of a requested quantity across stock batches.
//!
//! Quantities are spread first-expiry-first-out over the batches that can
//! supply them. Whatever cannot be covered by real stock lands on a
//! placeholder row, which becomes a backorder line.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stockroom_core::{InvoiceId, ItemId, LineId, Price, StockLineId};
use tracing::debug;

use crate::error::AllocationError;
use crate::line::Line;
use crate::stock::StockLine;
use crate::summary::SummaryItem;

/// Row id of the synthetic backorder row.
pub const PLACEHOLDER_ID: &str = "placeholder";

/// A stock batch as offered in the allocation table, with the packs issued
/// from it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRow {
    pub id: StockLineId,
    #[serde(default)]
    pub batch: Option<String>,
    pub pack_size: u32,
    pub available_number_of_packs: u32,
    #[serde(default)]
    pub total_number_of_packs: u32,
    /// Packs issued from this batch.
    #[serde(default)]
    pub number_of_packs: u32,
    #[serde(default)]
    pub cost_price_per_pack: Price,
    #[serde(default)]
    pub sell_price_per_pack: Price,
    #[serde(default)]
    pub on_hold: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    /// Draft line already issuing from this batch, if any.
    #[serde(default)]
    pub line_id: Option<LineId>,
}

impl BatchRow {
    /// The backorder row: no stock behind it, pack size 1.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: StockLineId::new(PLACEHOLDER_ID),
            batch: Some("Placeholder".to_string()),
            pack_size: 1,
            available_number_of_packs: 0,
            total_number_of_packs: 0,
            number_of_packs: 0,
            cost_price_per_pack: Price::ZERO,
            sell_price_per_pack: Price::ZERO,
            on_hold: false,
            expiry_date: None,
            location_name: None,
            note: None,
            line_id: None,
        }
    }

    /// A row for `stock_line` with nothing issued yet.
    #[must_use]
    pub fn from_stock_line(stock_line: &StockLine) -> Self {
        Self {
            id: stock_line.id.clone(),
            batch: stock_line.batch.clone(),
            pack_size: stock_line.pack_size,
            available_number_of_packs: stock_line.available_number_of_packs,
            total_number_of_packs: stock_line.total_number_of_packs,
            number_of_packs: 0,
            cost_price_per_pack: stock_line.cost_price_per_pack,
            sell_price_per_pack: stock_line.sell_price_per_pack,
            on_hold: stock_line.on_hold,
            expiry_date: stock_line.expiry_date,
            location_name: stock_line.location_name.clone(),
            note: stock_line.note.clone(),
            line_id: None,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.id.as_str() == PLACEHOLDER_ID
    }

    /// Units issued from this row.
    #[must_use]
    pub fn allocated_units(&self) -> u64 {
        u64::from(self.number_of_packs) * u64::from(self.pack_size)
    }

    /// Units this row could supply in total.
    #[must_use]
    pub fn available_units(&self) -> u64 {
        u64::from(self.available_number_of_packs) * u64::from(self.pack_size)
    }

    fn is_candidate(&self, issue_pack_size: Option<u32>) -> bool {
        !self.is_placeholder()
            && self.pack_size > 0
            && self.available_number_of_packs > 0
            && !self.on_hold
            && issue_pack_size.is_none_or(|size| size == self.pack_size)
    }
}

/// Sort rows by ascending expiry, rows without an expiry last.
pub fn sort_by_expiry(rows: &mut [BatchRow]) {
    rows.sort_by_key(|row| (row.expiry_date.is_none(), row.expiry_date));
}

/// Spread `requested` packs of `issue_pack_size` (units when `None`) over
/// `rows`, returning the updated rows.
///
/// Requests below one, or not finite, leave the rows unchanged. Fractional
/// requests are truncated to whole packs.
///
/// # Errors
///
/// Returns `AllocationError::MissingPlaceholder` if `rows` has no
/// placeholder row.
pub fn allocate(
    requested: f64,
    issue_pack_size: Option<u32>,
    rows: &[BatchRow],
) -> Result<Vec<BatchRow>, AllocationError> {
    if !requested.is_finite() || requested < 1.0 {
        debug!(requested, "Ignoring allocation request");
        return Ok(rows.to_vec());
    }

    let mut rows = rows.to_vec();
    let placeholder = rows
        .iter()
        .position(BatchRow::is_placeholder)
        .ok_or(AllocationError::MissingPlaceholder)?;

    // Finite and >= 1 here; saturates at u64::MAX.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let requested = requested.trunc() as u64;
    let mut to_allocate = requested.saturating_mul(u64::from(issue_pack_size.unwrap_or(1)));

    if rows.len() == 1 {
        if let Some(row) = rows.get_mut(placeholder) {
            row.number_of_packs = clamp_packs(to_allocate);
        }
        return Ok(rows);
    }

    let mut candidates: Vec<(usize, Option<NaiveDate>)> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.is_candidate(issue_pack_size))
        .map(|(index, row)| (index, row.expiry_date))
        .collect();
    candidates.sort_by_key(|&(_, expiry)| (expiry.is_none(), expiry));

    for (index, _) in candidates {
        if to_allocate == 0 {
            break;
        }
        let Some(row) = rows.get_mut(index) else {
            continue;
        };
        let pack_size = u64::from(row.pack_size);
        let available = row.available_units().saturating_sub(row.allocated_units());
        let packs = to_allocate.min(available) / pack_size;
        row.number_of_packs = row.number_of_packs.saturating_add(clamp_packs(packs));
        to_allocate -= packs * pack_size;
    }

    if let Some(row) = rows.get_mut(placeholder) {
        row.number_of_packs = row.number_of_packs.saturating_add(clamp_packs(to_allocate));
    }
    debug!(requested, backordered = to_allocate, "Allocated quantity");
    Ok(rows)
}

fn clamp_packs(packs: u64) -> u32 {
    u32::try_from(packs).unwrap_or(u32::MAX)
}

/// The allocation table for one item: its stock batches plus the
/// placeholder row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRows {
    pub item_id: ItemId,
    pub item_name: String,
    pub item_code: String,
    pub rows: Vec<BatchRow>,
}

impl BatchRows {
    /// Rows for `summary`'s item built from its current `stock_lines`.
    ///
    /// Packs the draft already issues from a batch are added back to that
    /// batch's availability, so re-allocating does not double count them.
    #[must_use]
    pub fn for_summary_item(summary: &SummaryItem, stock_lines: &[StockLine]) -> Self {
        let issued = |line: &Line| if line.is_deleted { 0 } else { line.number_of_packs };

        let mut rows: Vec<BatchRow> = stock_lines
            .iter()
            .filter(|stock_line| stock_line.item_id == summary.item_id)
            .map(|stock_line| {
                let mut row = BatchRow::from_stock_line(stock_line);
                let existing = summary
                    .lines
                    .values()
                    .find(|line| line.stock_line_id.as_ref() == Some(&stock_line.id));
                if let Some(line) = existing {
                    let packs = issued(line);
                    row.number_of_packs = packs;
                    row.available_number_of_packs = row.available_number_of_packs.saturating_add(packs);
                    row.line_id = Some(line.id.clone());
                }
                row
            })
            .collect();
        sort_by_expiry(&mut rows);

        let mut placeholder = BatchRow::placeholder();
        if let Some(line) = summary.lines.values().find(|line| line.is_placeholder()) {
            placeholder.number_of_packs = issued(line);
            placeholder.line_id = Some(line.id.clone());
        }
        rows.push(placeholder);

        Self {
            item_id: summary.item_id.clone(),
            item_name: summary.item_name.clone(),
            item_code: summary.item_code.clone(),
            rows,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[BatchRow] {
        &self.rows
    }

    /// Allocate `requested` packs of `issue_pack_size` across the rows.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::MissingPlaceholder` if the placeholder row
    /// was removed.
    pub fn allocate(
        &mut self,
        requested: f64,
        issue_pack_size: Option<u32>,
    ) -> Result<(), AllocationError> {
        self.rows = allocate(requested, issue_pack_size, &self.rows)?;
        Ok(())
    }

    /// Set the packs issued from one row. Returns `false` if no row has
    /// `row_id`.
    pub fn issue(&mut self, row_id: &StockLineId, number_of_packs: u32) -> bool {
        match self.rows.iter_mut().find(|row| &row.id == row_id) {
            Some(row) => {
                row.number_of_packs = number_of_packs;
                true
            }
            None => false,
        }
    }

    /// Units available across all rows.
    #[must_use]
    pub fn available_quantity(&self) -> u64 {
        self.rows.iter().map(BatchRow::available_units).sum()
    }

    /// Units issued from real stock; the placeholder is excluded.
    #[must_use]
    pub fn allocated_quantity(&self) -> u64 {
        self.rows
            .iter()
            .filter(|row| !row.is_placeholder())
            .map(BatchRow::allocated_units)
            .sum()
    }

    /// Draft lines for the rows, ready to be upserted.
    ///
    /// Rows already backed by a draft line keep that line's id, so a zero
    /// quantity marks it for deletion. Rows with nothing issued and no line
    /// are skipped.
    #[must_use]
    pub fn to_lines(&self, invoice_id: &InvoiceId) -> Vec<Line> {
        self.rows
            .iter()
            .filter(|row| row.number_of_packs > 0 || row.line_id.is_some())
            .map(|row| Line {
                id: row.line_id.clone().unwrap_or_else(LineId::generate),
                invoice_id: invoice_id.clone(),
                item_id: self.item_id.clone(),
                item_name: self.item_name.clone(),
                item_code: self.item_code.clone(),
                stock_line_id: (!row.is_placeholder()).then(|| row.id.clone()),
                batch: row.batch.clone(),
                location_name: row.location_name.clone(),
                note: row.note.clone(),
                pack_size: row.pack_size,
                number_of_packs: row.number_of_packs,
                cost_price_per_pack: row.cost_price_per_pack,
                sell_price_per_pack: row.sell_price_per_pack,
                expiry_date: row.expiry_date,
                is_created: false,
                is_updated: false,
                is_deleted: false,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(id: &str, pack_size: u32, available: u32, expiry: Option<(i32, u32, u32)>) -> BatchRow {
        BatchRow {
            id: StockLineId::new(id),
            batch: Some(format!("batch-{id}")),
            pack_size,
            available_number_of_packs: available,
            total_number_of_packs: available,
            number_of_packs: 0,
            cost_price_per_pack: Price::ZERO,
            sell_price_per_pack: Price::from_minor(500),
            on_hold: false,
            expiry_date: expiry.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            location_name: None,
            note: None,
            line_id: None,
        }
    }

    fn packs(rows: &[BatchRow], id: &str) -> u32 {
        rows.iter().find(|row| row.id.as_str() == id).unwrap().number_of_packs
    }

    fn total_units(rows: &[BatchRow]) -> u64 {
        rows.iter().map(BatchRow::allocated_units).sum()
    }

    #[test]
    fn test_fefo_fills_earliest_batch_first() {
        let rows = vec![
            row("B", 10, 5, Some((2025, 6, 1))),
            row("A", 10, 5, Some((2025, 1, 1))),
            BatchRow::placeholder(),
        ];
        let rows = allocate(7.0, Some(10), &rows).unwrap();
        assert_eq!(packs(&rows, "A"), 5);
        assert_eq!(packs(&rows, "B"), 2);
        assert_eq!(packs(&rows, PLACEHOLDER_ID), 0);
    }

    #[test]
    fn test_shortfall_goes_to_placeholder_in_units() {
        let rows = vec![row("A", 10, 2, None), BatchRow::placeholder()];
        let rows = allocate(3.0, Some(10), &rows).unwrap();
        assert_eq!(packs(&rows, "A"), 2);
        assert_eq!(packs(&rows, PLACEHOLDER_ID), 10);
        assert_eq!(total_units(&rows), 30);
    }

    #[test]
    fn test_floored_remainder_flows_to_next_batch() {
        let rows = vec![
            row("A", 4, 10, Some((2025, 1, 1))),
            row("B", 1, 10, Some((2025, 2, 1))),
            BatchRow::placeholder(),
        ];
        // 7 units: A takes one pack of 4, the remaining 3 units come from B.
        let rows = allocate(7.0, None, &rows).unwrap();
        assert_eq!(packs(&rows, "A"), 1);
        assert_eq!(packs(&rows, "B"), 3);
        assert_eq!(packs(&rows, PLACEHOLDER_ID), 0);
    }

    #[test]
    fn test_conservation_over_requests() {
        let rows = vec![
            row("A", 6, 3, Some((2025, 3, 1))),
            row("B", 1, 7, None),
            row("C", 12, 1, Some((2024, 12, 1))),
            BatchRow::placeholder(),
        ];
        for requested in 1..60_u32 {
            let allocated = allocate(f64::from(requested), None, &rows).unwrap();
            assert_eq!(total_units(&allocated), u64::from(requested), "requested {requested}");
        }
    }

    #[test]
    fn test_issue_pack_size_filters_candidates() {
        let rows = vec![
            row("A", 1, 100, Some((2024, 1, 1))),
            row("B", 10, 5, Some((2025, 1, 1))),
            BatchRow::placeholder(),
        ];
        let rows = allocate(2.0, Some(10), &rows).unwrap();
        assert_eq!(packs(&rows, "A"), 0);
        assert_eq!(packs(&rows, "B"), 2);
    }

    #[test]
    fn test_on_hold_and_empty_batches_are_skipped() {
        let mut held = row("A", 1, 10, Some((2024, 1, 1)));
        held.on_hold = true;
        let rows = vec![held, row("B", 1, 0, None), BatchRow::placeholder()];
        let rows = allocate(4.0, None, &rows).unwrap();
        assert_eq!(packs(&rows, "A"), 0);
        assert_eq!(packs(&rows, "B"), 0);
        assert_eq!(packs(&rows, PLACEHOLDER_ID), 4);
    }

    #[test]
    fn test_allocation_adds_to_existing_packs() {
        let mut a = row("A", 1, 10, None);
        a.number_of_packs = 4;
        let rows = allocate(8.0, None, &[a, BatchRow::placeholder()]).unwrap();
        // Six more units were still free in A.
        assert_eq!(packs(&rows, "A"), 10);
        assert_eq!(packs(&rows, PLACEHOLDER_ID), 2);
    }

    #[test]
    fn test_placeholder_only_takes_everything() {
        let rows = allocate(3.0, Some(5), &[BatchRow::placeholder()]).unwrap();
        assert_eq!(packs(&rows, PLACEHOLDER_ID), 15);
    }

    #[test]
    fn test_invalid_requests_are_noops() {
        let rows = vec![row("A", 1, 10, None), BatchRow::placeholder()];
        for requested in [0.0, 0.5, -3.0, f64::NAN, f64::INFINITY] {
            assert_eq!(allocate(requested, None, &rows).unwrap(), rows);
        }
    }

    #[test]
    fn test_missing_placeholder_is_an_error() {
        let rows = vec![row("A", 1, 10, None)];
        assert_eq!(
            allocate(2.0, None, &rows).unwrap_err(),
            AllocationError::MissingPlaceholder
        );
    }

    #[test]
    fn test_sort_by_expiry_puts_missing_last() {
        let mut rows = vec![
            row("none", 1, 1, None),
            row("late", 1, 1, Some((2026, 1, 1))),
            row("early", 1, 1, Some((2024, 1, 1))),
        ];
        sort_by_expiry(&mut rows);
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["early", "late", "none"]);
    }

    fn stock_line(id: &str, available: u32) -> StockLine {
        StockLine {
            id: StockLineId::new(id),
            item_id: ItemId::new("item-1"),
            store_id: stockroom_core::StoreId::new("store-1"),
            batch: None,
            pack_size: 1,
            available_number_of_packs: available,
            total_number_of_packs: available,
            cost_price_per_pack: Price::ZERO,
            sell_price_per_pack: Price::ZERO,
            on_hold: false,
            expiry_date: None,
            location_name: None,
            note: None,
        }
    }

    fn draft_line(id: &str, stock: Option<&str>, packs: u32) -> Line {
        Line {
            id: LineId::new(id),
            invoice_id: InvoiceId::new("inv-1"),
            item_id: ItemId::new("item-1"),
            item_name: "Gauze".to_string(),
            item_code: "GZ".to_string(),
            stock_line_id: stock.map(StockLineId::new),
            batch: None,
            location_name: None,
            note: None,
            pack_size: 1,
            number_of_packs: packs,
            cost_price_per_pack: Price::ZERO,
            sell_price_per_pack: Price::ZERO,
            expiry_date: None,
            is_created: false,
            is_updated: false,
            is_deleted: false,
        }
    }

    #[test]
    fn test_batch_rows_add_back_issued_packs() {
        let summary = SummaryItem::new(
            ItemId::new("item-1"),
            [draft_line("l1", Some("s1"), 3), draft_line("l2", None, 2)],
        );
        let rows = BatchRows::for_summary_item(&summary, &[stock_line("s1", 5), stock_line("s2", 4)]);

        assert_eq!(rows.rows().len(), 3);
        let s1 = &rows.rows()[0];
        assert_eq!(s1.available_number_of_packs, 8);
        assert_eq!(s1.number_of_packs, 3);
        assert_eq!(s1.line_id, Some(LineId::new("l1")));

        let placeholder = rows.rows().last().unwrap();
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.number_of_packs, 2);

        assert_eq!(rows.available_quantity(), 12);
        assert_eq!(rows.allocated_quantity(), 3);
    }

    #[test]
    fn test_to_lines_reuses_existing_ids() {
        let summary = SummaryItem::new(ItemId::new("item-1"), [draft_line("l1", Some("s1"), 3)]);
        let mut rows = BatchRows::for_summary_item(&summary, &[stock_line("s1", 5), stock_line("s2", 4)]);
        assert!(rows.issue(&StockLineId::new("s1"), 0));
        assert!(rows.issue(&StockLineId::new("s2"), 2));
        assert!(!rows.issue(&StockLineId::new("missing"), 2));

        let lines = rows.to_lines(&InvoiceId::new("inv-1"));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].id, LineId::new("l1"));
        assert_eq!(lines[0].number_of_packs, 0);
        assert_ne!(lines[1].id, LineId::new("l1"));
        assert!(!lines[1].id.is_empty());
        assert_eq!(lines[1].stock_line_id, Some(StockLineId::new("s2")));
        assert_eq!(lines[1].item_name, "Gauze");
    }

    #[test]
    fn test_to_lines_emits_placeholder_without_stock_line() {
        let summary = SummaryItem::empty(ItemId::new("item-1"), "Gauze", "GZ");
        let mut rows = BatchRows::for_summary_item(&summary, &[]);
        rows.allocate(4.0, None).unwrap();

        let lines = rows.to_lines(&InvoiceId::new("inv-1"));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_placeholder());
        assert_eq!(lines[0].unit_quantity(), 4);
    }
}
