//! Integration tests for Stockroom.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stockroom-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `draft_workflow` - Load, edit, allocate and save cycles through the
//!   draft store
//! - `allocation` - Allocation over realistic stock across pack sizes
//!
//! Everything runs against [`InMemoryShipmentApi`], a backend that keeps
//! shipments and stock in memory and applies saves the way the server does:
//! new lines get server ids and issued packs leave the stock.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::NaiveDate;
use stockroom_core::{InvoiceId, InvoiceStatus, ItemId, LineId, Price, StockLineId, StoreId};
use stockroom_outbound::{
    ApiError, Invoice, InvoiceHeader, InvoiceLine, InvoicePatch, Line, LineChanges, ShipmentApi,
    StockLine,
};

/// Store every fixture belongs to.
pub const STORE_ID: &str = "store-1";

/// Build a server shipment.
#[derive(Debug, Clone)]
pub struct ShipmentBuilder {
    invoice: Invoice,
}

impl ShipmentBuilder {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            invoice: Invoice {
                header: InvoiceHeader {
                    id: InvoiceId::new(id),
                    invoice_number: 1,
                    other_party_name: "Central Pharmacy".to_string(),
                    ..InvoiceHeader::default()
                },
                lines: Vec::new(),
            },
        }
    }

    #[must_use]
    pub const fn status(mut self, status: InvoiceStatus) -> Self {
        self.invoice.header.status = status;
        self
    }

    /// Add a line issuing `packs` from `stock`.
    #[must_use]
    pub fn line(mut self, id: &str, stock: &StockLine, packs: u32) -> Self {
        self.invoice.lines.push(InvoiceLine {
            id: LineId::new(id),
            item_id: stock.item_id.clone(),
            item_name: item_name(&stock.item_id),
            item_code: stock.item_id.as_str().to_uppercase(),
            batch: stock.batch.clone(),
            pack_size: stock.pack_size,
            number_of_packs: packs,
            cost_price_per_pack: stock.cost_price_per_pack,
            sell_price_per_pack: stock.sell_price_per_pack,
            expiry_date: stock.expiry_date,
            location_name: stock.location_name.clone(),
            note: None,
            stock_line_id: Some(stock.id.clone()),
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Invoice {
        self.invoice
    }
}

/// A stock batch of `item` with `available` packs of `pack_size`.
#[must_use]
pub fn stock_line(
    id: &str,
    item: &str,
    pack_size: u32,
    available: u32,
    expiry: Option<(i32, u32, u32)>,
) -> StockLine {
    StockLine {
        id: StockLineId::new(id),
        item_id: ItemId::new(item),
        store_id: StoreId::new(STORE_ID),
        batch: Some(format!("B-{id}")),
        pack_size,
        available_number_of_packs: available,
        total_number_of_packs: available,
        cost_price_per_pack: Price::from_minor(100),
        sell_price_per_pack: Price::from_minor(150),
        on_hold: false,
        expiry_date: expiry.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        location_name: Some("Shelf 1".to_string()),
        note: None,
    }
}

fn item_name(item_id: &ItemId) -> String {
    format!("Item {item_id}")
}

/// In-memory shipment backend.
#[derive(Debug, Default)]
pub struct InMemoryShipmentApi {
    invoices: Mutex<HashMap<InvoiceId, Invoice>>,
    stock: Mutex<Vec<StockLine>>,
    next_line: AtomicUsize,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryShipmentApi {
    #[must_use]
    pub fn new(invoices: Vec<Invoice>, stock: Vec<StockLine>) -> Self {
        Self {
            invoices: Mutex::new(
                invoices
                    .into_iter()
                    .map(|invoice| (invoice.header.id.clone(), invoice))
                    .collect(),
            ),
            stock: Mutex::new(stock),
            ..Self::default()
        }
    }

    /// Make subsequent line saves fail (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful line saves.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The stored shipment `id`.
    #[must_use]
    pub fn invoice(&self, id: &str) -> Option<Invoice> {
        lock(&self.invoices).get(&InvoiceId::new(id)).cloned()
    }

    /// The stored stock batch `id`.
    #[must_use]
    pub fn stock_line(&self, id: &str) -> Option<StockLine> {
        lock(&self.stock)
            .iter()
            .find(|line| line.id.as_str() == id)
            .cloned()
    }

    fn adjust_stock(&self, stock_line_id: Option<&StockLineId>, issued: i64) {
        let Some(stock_line_id) = stock_line_id else {
            return;
        };
        let mut stock = lock(&self.stock);
        if let Some(line) = stock.iter_mut().find(|line| &line.id == stock_line_id) {
            let available = i64::from(line.available_number_of_packs) - issued;
            line.available_number_of_packs = u32::try_from(available.max(0)).unwrap_or(u32::MAX);
        }
    }

    fn to_server(&self, line: &Line) -> InvoiceLine {
        let number = self.next_line.fetch_add(1, Ordering::SeqCst) + 1;
        InvoiceLine {
            id: LineId::new(format!("{}-line-{number}", line.invoice_id)),
            item_id: line.item_id.clone(),
            item_name: line.item_name.clone(),
            item_code: line.item_code.clone(),
            batch: line.batch.clone(),
            pack_size: line.pack_size,
            number_of_packs: line.number_of_packs,
            cost_price_per_pack: line.cost_price_per_pack,
            sell_price_per_pack: line.sell_price_per_pack,
            expiry_date: line.expiry_date,
            location_name: line.location_name.clone(),
            note: line.note.clone(),
            stock_line_id: line.stock_line_id.clone(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl ShipmentApi for InMemoryShipmentApi {
    async fn outbound_shipment(&self, id: &InvoiceId) -> Result<Invoice, ApiError> {
        lock(&self.invoices)
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn stock_lines(&self, item_id: &ItemId) -> Result<Vec<StockLine>, ApiError> {
        Ok(lock(&self.stock)
            .iter()
            .filter(|line| &line.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn save_lines(&self, invoice_id: &InvoiceId, changes: &LineChanges) -> Result<(), ApiError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ApiError::Rejected("service unavailable".to_string()));
        }

        let mut invoices = lock(&self.invoices);
        let invoice = invoices
            .get_mut(invoice_id)
            .ok_or_else(|| ApiError::NotFound(invoice_id.to_string()))?;

        for line in &changes.inserts {
            self.adjust_stock(line.stock_line_id.as_ref(), i64::from(line.number_of_packs));
            invoice.lines.push(self.to_server(line));
        }
        for line in &changes.updates {
            let server = invoice
                .lines
                .iter_mut()
                .find(|server| server.id == line.id)
                .ok_or_else(|| ApiError::NotFound(line.id.to_string()))?;
            let delta = i64::from(line.number_of_packs) - i64::from(server.number_of_packs);
            self.adjust_stock(server.stock_line_id.as_ref(), delta);
            server.number_of_packs = line.number_of_packs;
        }
        for line in &changes.deletes {
            if let Some(index) = invoice.lines.iter().position(|server| server.id == line.id) {
                let removed = invoice.lines.remove(index);
                self.adjust_stock(
                    removed.stock_line_id.as_ref(),
                    -i64::from(removed.number_of_packs),
                );
            }
        }

        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_invoice(&self, patch: &InvoicePatch) -> Result<(), ApiError> {
        let mut invoices = lock(&self.invoices);
        let invoice = invoices
            .get_mut(&patch.id)
            .ok_or_else(|| ApiError::NotFound(patch.id.to_string()))?;
        invoice.header.comment.clone_from(&patch.comment);
        invoice.header.colour = patch.colour.clone();
        invoice.header.their_reference.clone_from(&patch.their_reference);
        invoice.header.on_hold = patch.on_hold;
        Ok(())
    }
}
