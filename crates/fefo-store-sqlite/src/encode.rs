//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are stored as ISO 8601 calendar dates. UUIDs are stored as
//! hyphenated lowercase strings. Counts are stored as INTEGER and narrowed
//! back to `u32` on read.

use chrono::NaiveDate;
use fefo_core::{
  catalog::{Family, Product},
  lot::{Lot, Sortie},
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Counts ──────────────────────────────────────────────────────────────────

pub fn decode_count(column: &'static str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| Error::Corrupt { column, value })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const FAMILY_COLUMNS: &str = "family_id, name";

/// Raw values read directly from a `families` row.
pub struct RawFamily {
  pub family_id: String,
  pub name:      String,
}

impl RawFamily {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { family_id: row.get(0)?, name: row.get(1)? })
  }

  pub fn into_family(self) -> Result<Family> {
    Ok(Family { family_id: decode_uuid(&self.family_id)?, name: self.name })
  }
}

pub const PRODUCT_COLUMNS: &str = "product_id, reference, name, barcode, family_id, \
                                   stock_alert_threshold, expiry_alert_days";

/// Raw values read directly from a `products` row.
pub struct RawProduct {
  pub product_id:            String,
  pub reference:             String,
  pub name:                  Option<String>,
  pub barcode:               String,
  pub family_id:             String,
  pub stock_alert_threshold: i64,
  pub expiry_alert_days:     i64,
}

impl RawProduct {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      product_id:            row.get(0)?,
      reference:             row.get(1)?,
      name:                  row.get(2)?,
      barcode:               row.get(3)?,
      family_id:             row.get(4)?,
      stock_alert_threshold: row.get(5)?,
      expiry_alert_days:     row.get(6)?,
    })
  }

  pub fn into_product(self) -> Result<Product> {
    Ok(Product {
      product_id:            decode_uuid(&self.product_id)?,
      reference:             self.reference,
      name:                  self.name,
      barcode:               self.barcode,
      family_id:             decode_uuid(&self.family_id)?,
      stock_alert_threshold: decode_count(
        "stock_alert_threshold",
        self.stock_alert_threshold,
      )?,
      expiry_alert_days:     decode_count("expiry_alert_days", self.expiry_alert_days)?,
    })
  }
}

pub const LOT_COLUMNS: &str = "lot_id, product_id, quantity, entry_date, expiry_date";

/// Raw values read directly from a `lots` row.
pub struct RawLot {
  pub lot_id:      String,
  pub product_id:  String,
  pub quantity:    i64,
  pub entry_date:  String,
  pub expiry_date: String,
}

impl RawLot {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      lot_id:      row.get(0)?,
      product_id:  row.get(1)?,
      quantity:    row.get(2)?,
      entry_date:  row.get(3)?,
      expiry_date: row.get(4)?,
    })
  }

  pub fn into_lot(self) -> Result<Lot> {
    Ok(Lot {
      lot_id:      decode_uuid(&self.lot_id)?,
      product_id:  decode_uuid(&self.product_id)?,
      quantity:    decode_count("quantity", self.quantity)?,
      entry_date:  decode_date(&self.entry_date)?,
      expiry_date: decode_date(&self.expiry_date)?,
    })
  }
}

pub const SORTIE_COLUMNS: &str = "sortie_id, product_id, quantity, sortie_date";

/// Raw values read directly from a `sorties` row.
pub struct RawSortie {
  pub sortie_id:   String,
  pub product_id:  String,
  pub quantity:    i64,
  pub sortie_date: String,
}

impl RawSortie {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sortie_id:   row.get(0)?,
      product_id:  row.get(1)?,
      quantity:    row.get(2)?,
      sortie_date: row.get(3)?,
    })
  }

  pub fn into_sortie(self) -> Result<Sortie> {
    Ok(Sortie {
      sortie_id:   decode_uuid(&self.sortie_id)?,
      product_id:  decode_uuid(&self.product_id)?,
      quantity:    decode_count("quantity", self.quantity)?,
      sortie_date: decode_date(&self.sortie_date)?,
    })
  }
}
