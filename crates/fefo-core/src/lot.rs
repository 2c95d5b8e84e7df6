//! Lot ledger records: physical batches and the consumption log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, catalog::non_negative};

// ─── Lot ─────────────────────────────────────────────────────────────────────

/// A batch of one product with its own quantity and expiry date.
///
/// A lot at quantity zero is inert but kept; only the expired-lot deletion
/// path removes lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
  pub lot_id:      Uuid,
  pub product_id:  Uuid,
  pub quantity:    u32,
  pub entry_date:  NaiveDate,
  pub expiry_date: NaiveDate,
}

impl Lot {
  /// Whole days from `today` until expiry; negative once expired.
  pub fn days_left(&self, today: NaiveDate) -> i64 {
    (self.expiry_date - today).num_days()
  }

  pub fn is_expired(&self, today: NaiveDate) -> bool { self.expiry_date < today }

  /// Whether the allocator may draw from this lot.
  pub fn is_allocatable(&self, today: NaiveDate) -> bool {
    self.quantity > 0 && !self.is_expired(today)
  }
}

/// The earliest-expiring lot that still holds stock, expired or not.
pub fn next_lot(lots: &[Lot]) -> Option<&Lot> {
  lots
    .iter()
    .filter(|l| l.quantity > 0)
    .min_by_key(|l| l.expiry_date)
}

/// Raw input for recording a new lot.
#[derive(Debug, Clone)]
pub struct NewLot {
  pub product_id:  Uuid,
  pub quantity:    i64,
  /// Defaults to the submission date when absent.
  pub entry_date:  Option<NaiveDate>,
  pub expiry_date: NaiveDate,
}

impl NewLot {
  pub fn new(product_id: Uuid, quantity: i64, expiry_date: NaiveDate) -> Self {
    Self { product_id, quantity, entry_date: None, expiry_date }
  }

  pub fn entered_on(mut self, entry_date: NaiveDate) -> Self {
    self.entry_date = Some(entry_date);
    self
  }

  pub fn validate(self, today: NaiveDate) -> Result<LotDraft> {
    Ok(LotDraft {
      product_id:  self.product_id,
      quantity:    non_negative("quantity", self.quantity)?,
      entry_date:  self.entry_date.unwrap_or(today),
      expiry_date: self.expiry_date,
    })
  }
}

/// A validated [`NewLot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotDraft {
  pub product_id:  Uuid,
  pub quantity:    u32,
  pub entry_date:  NaiveDate,
  pub expiry_date: NaiveDate,
}

impl LotDraft {
  pub fn into_lot(self, lot_id: Uuid) -> Lot {
    Lot {
      lot_id,
      product_id: self.product_id,
      quantity: self.quantity,
      entry_date: self.entry_date,
      expiry_date: self.expiry_date,
    }
  }
}

// ─── Sortie ──────────────────────────────────────────────────────────────────

/// An outgoing consumption event. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sortie {
  pub sortie_id:   Uuid,
  pub product_id:  Uuid,
  pub quantity:    u32,
  pub sortie_date: NaiveDate,
}

/// Validate a requested movement quantity.
pub fn positive_quantity(quantity: i64) -> Result<u32> {
  match u32::try_from(quantity) {
    Ok(q) if q > 0 => Ok(q),
    _ => Err(Error::InvalidInput(format!(
      "quantity must be a positive integer, got {quantity}"
    ))),
  }
}
