// SPDX-License-Identifier: GPL-3.0-only

//! Inventory collaborators consumed by scan consumers
//!
//! The scanner only produces barcode text. Turning that text into stock
//! happens here, behind [`InventoryLookup`] and [`StockLedger`]. Production
//! deployments put a database behind these traits; [`MemoryInventory`] is
//! the in-process implementation used by the CLI and tests.

use crate::errors::InventoryError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Store (pharmacy, ward, warehouse) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(pub String);

impl StoreId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One batch of a product held by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockBatch {
    pub id: String,
    pub barcode: String,
    pub product_name: String,
    pub batch_number: String,
    pub quantity: u32,
    pub expiry: NaiveDate,
    pub store_id: StoreId,
}

impl StockBatch {
    /// Expired once `today` is past the expiry date
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        today > self.expiry
    }

    /// Days left until expiry (negative once expired)
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry - today).num_days()
    }
}

/// Quantity taken from one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub batch_id: String,
    pub quantity: u32,
}

/// Stock used up at a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionRecord {
    pub store_id: StoreId,
    pub lines: Vec<StockLine>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Stock moved between two stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub from_store: StoreId,
    pub to_store: StoreId,
    pub lines: Vec<StockLine>,
}

/// Barcode to stock resolution
pub trait InventoryLookup: Send + Sync {
    /// Batch for a scanned barcode at a store
    ///
    /// `None` is a normal outcome (product not stocked there).
    fn find_by_barcode(&self, barcode: &str, store: &StoreId) -> Option<StockBatch>;
}

/// Stock movements
///
/// Both operations are atomic: every line applies or none does.
pub trait StockLedger: Send + Sync {
    fn record_consumption(&self, record: &ConsumptionRecord) -> Result<(), InventoryError>;
    fn transfer(&self, request: &TransferRequest) -> Result<(), InventoryError>;
}

/// In-memory inventory
#[derive(Debug, Default)]
pub struct MemoryInventory {
    batches: Mutex<Vec<StockBatch>>,
}

impl MemoryInventory {
    pub fn new(batches: Vec<StockBatch>) -> Self {
        Self {
            batches: Mutex::new(batches),
        }
    }

    /// Load batches from a JSON array
    pub fn load_from(path: &Path) -> Result<Self, InventoryError> {
        let contents = std::fs::read_to_string(path)?;
        let batches: Vec<StockBatch> = serde_json::from_str(&contents)?;
        info!(path = %path.display(), batches = batches.len(), "Loaded inventory");
        Ok(Self::new(batches))
    }

    /// Copy of every batch
    pub fn batches(&self) -> Vec<StockBatch> {
        self.lock().clone()
    }

    /// Batch by id
    pub fn batch(&self, id: &str) -> Option<StockBatch> {
        self.lock().iter().find(|b| b.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StockBatch>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Check every line against the store and sum quantities per batch
///
/// Returns batch index and total requested, without touching stock.
fn validate_lines(
    batches: &[StockBatch],
    store: &StoreId,
    lines: &[StockLine],
) -> Result<Vec<(usize, u32)>, InventoryError> {
    if lines.is_empty() {
        return Err(InventoryError::InvalidQuantity("no stock lines".to_string()));
    }

    let mut totals: HashMap<usize, u32> = HashMap::new();
    for line in lines {
        if line.quantity == 0 {
            return Err(InventoryError::InvalidQuantity(format!(
                "zero quantity for batch {}",
                line.batch_id
            )));
        }
        let index = batches
            .iter()
            .position(|b| b.id == line.batch_id)
            .ok_or_else(|| InventoryError::UnknownBatch(line.batch_id.clone()))?;
        if batches[index].store_id != *store {
            return Err(InventoryError::WrongStore {
                batch_id: line.batch_id.clone(),
                store_id: store.to_string(),
            });
        }
        let total = totals.entry(index).or_insert(0);
        *total = total.saturating_add(line.quantity);
    }

    let mut checked = Vec::with_capacity(totals.len());
    for (index, requested) in totals {
        let batch = &batches[index];
        if requested > batch.quantity {
            return Err(InventoryError::InsufficientStock {
                batch_id: batch.id.clone(),
                requested,
                available: batch.quantity,
            });
        }
        checked.push((index, requested));
    }
    Ok(checked)
}

/// Stock landing in one destination batch
struct Arrival {
    /// Source batch the destination is modeled on
    source: usize,
    /// Existing destination batch, or `None` to create one
    destination: Option<usize>,
    new_quantity: u32,
}

/// Resolve destination batches and their final quantities for a transfer
///
/// Source lines with the same barcode and batch number land in the same
/// destination batch. Fails before any stock moves if a total overflows.
fn plan_arrivals(
    batches: &[StockBatch],
    to_store: &StoreId,
    checked: &[(usize, u32)],
) -> Result<Vec<Arrival>, InventoryError> {
    let mut arrivals: Vec<Arrival> = Vec::new();
    for &(index, quantity) in checked {
        let source = &batches[index];
        let same_product = |b: &StockBatch| {
            b.barcode == source.barcode && b.batch_number == source.batch_number
        };

        let existing = arrivals
            .iter()
            .position(|a| same_product(&batches[a.source]));
        let arrival = match existing {
            Some(pos) => &mut arrivals[pos],
            None => {
                let destination = batches
                    .iter()
                    .position(|b| b.store_id == *to_store && same_product(b));
                arrivals.push(Arrival {
                    source: index,
                    destination,
                    new_quantity: destination.map_or(0, |d| batches[d].quantity),
                });
                let last = arrivals.len() - 1;
                &mut arrivals[last]
            }
        };

        arrival.new_quantity = arrival.new_quantity.checked_add(quantity).ok_or_else(|| {
            InventoryError::QuantityOverflow {
                batch_id: arrival
                    .destination
                    .map_or_else(|| source.id.clone(), |d| batches[d].id.clone()),
            }
        })?;
    }
    Ok(arrivals)
}

impl InventoryLookup for MemoryInventory {
    fn find_by_barcode(&self, barcode: &str, store: &StoreId) -> Option<StockBatch> {
        // First expiry first out, preferring batches that still have stock
        self.lock()
            .iter()
            .filter(|b| b.barcode == barcode && b.store_id == *store)
            .min_by_key(|b| (b.quantity == 0, b.expiry))
            .cloned()
    }
}

impl StockLedger for MemoryInventory {
    fn record_consumption(&self, record: &ConsumptionRecord) -> Result<(), InventoryError> {
        let mut batches = self.lock();
        let checked = validate_lines(&batches, &record.store_id, &record.lines)?;
        for (index, quantity) in checked {
            batches[index].quantity -= quantity;
        }
        debug!(store = %record.store_id, lines = record.lines.len(), "Consumption recorded");
        Ok(())
    }

    fn transfer(&self, request: &TransferRequest) -> Result<(), InventoryError> {
        if request.from_store == request.to_store {
            return Err(InventoryError::InvalidQuantity(format!(
                "transfer from store {} to itself",
                request.from_store
            )));
        }

        let mut batches = self.lock();
        let checked = validate_lines(&batches, &request.from_store, &request.lines)?;
        let arrivals = plan_arrivals(&batches, &request.to_store, &checked)?;

        for &(index, quantity) in &checked {
            batches[index].quantity -= quantity;
        }
        for arrival in arrivals {
            match arrival.destination {
                Some(index) => batches[index].quantity = arrival.new_quantity,
                None => {
                    let source = batches[arrival.source].clone();
                    batches.push(StockBatch {
                        id: Uuid::new_v4().to_string(),
                        quantity: arrival.new_quantity,
                        store_id: request.to_store.clone(),
                        ..source
                    });
                }
            }
        }

        info!(
            from = %request.from_store,
            to = %request.to_store,
            lines = request.lines.len(),
            "Stock transferred"
        );
        Ok(())
    }
}
