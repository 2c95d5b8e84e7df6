//! Catalog reference data: families and products.
//!
//! Input types (`NewFamily`, `NewProduct`) carry raw caller input. They are
//! normalised and checked by `validate` before a store touches anything, so
//! backends only ever see well-formed drafts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Name of the sentinel family that absorbs products of deleted families.
pub const FALLBACK_FAMILY_NAME: &str = "-";

/// Fixed id of the fallback family; created with the schema.
pub const FALLBACK_FAMILY_ID: Uuid = Uuid::nil();

pub const DEFAULT_STOCK_ALERT_THRESHOLD: i64 = 1;
pub const DEFAULT_EXPIRY_ALERT_DAYS: i64 = 30;

// ─── Family ──────────────────────────────────────────────────────────────────

/// A grouping category for products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
  pub family_id: Uuid,
  pub name:      String,
}

impl Family {
  pub fn fallback() -> Self {
    Self {
      family_id: FALLBACK_FAMILY_ID,
      name:      FALLBACK_FAMILY_NAME.to_owned(),
    }
  }
}

/// Input for creating or renaming a family.
#[derive(Debug, Clone)]
pub struct NewFamily {
  pub name: String,
}

impl NewFamily {
  pub fn new(name: impl Into<String>) -> Self { Self { name: name.into() } }

  /// Trim the name and reject blanks.
  pub fn validate(self) -> Result<String> {
    let name = self.name.trim();
    if name.is_empty() {
      return Err(Error::InvalidInput("family name is required".into()));
    }
    Ok(name.to_owned())
  }
}

/// What happens to the products of a family being deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyDeletion {
  /// Move the products to the fallback family `-`.
  #[default]
  Reassign,
  /// Delete the products, along with their lots and sorties.
  Cascade,
}

/// Outcome of a family deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyRemoval {
  pub family:            Family,
  pub mode:              FamilyDeletion,
  /// Products moved to `-` or deleted, depending on `mode`.
  pub affected_products: u64,
}

// ─── Product ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub product_id:            Uuid,
  pub reference:             String,
  pub name:                  Option<String>,
  pub barcode:               String,
  pub family_id:             Uuid,
  pub stock_alert_threshold: u32,
  pub expiry_alert_days:     u32,
}

impl Product {
  /// Display name, falling back to `-` like the listing pages do.
  pub fn display_name(&self) -> &str { self.name.as_deref().unwrap_or("-") }

  /// Case-insensitive substring match over name, reference and barcode.
  pub fn matches_text(&self, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    self
      .name
      .as_deref()
      .is_some_and(|n| n.to_lowercase().contains(&needle))
      || self.reference.to_lowercase().contains(&needle)
      || self.barcode.to_lowercase().contains(&needle)
  }
}

/// Raw input for creating or updating a product.
///
/// Thresholds are signed so that negative input can be reported as
/// [`Error::InvalidInput`] instead of failing deserialisation.
#[derive(Debug, Clone)]
pub struct NewProduct {
  pub reference:             String,
  pub name:                  Option<String>,
  pub barcode:               String,
  pub family_id:             Uuid,
  pub stock_alert_threshold: i64,
  pub expiry_alert_days:     i64,
}

impl NewProduct {
  pub fn new(
    reference: impl Into<String>,
    barcode: impl Into<String>,
    family_id: Uuid,
  ) -> Self {
    Self {
      reference: reference.into(),
      name: None,
      barcode: barcode.into(),
      family_id,
      stock_alert_threshold: DEFAULT_STOCK_ALERT_THRESHOLD,
      expiry_alert_days: DEFAULT_EXPIRY_ALERT_DAYS,
    }
  }

  pub fn with_name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn with_thresholds(mut self, stock: i64, days: i64) -> Self {
    self.stock_alert_threshold = stock;
    self.expiry_alert_days = days;
    self
  }

  pub fn validate(self) -> Result<ProductDraft> {
    let reference = self.reference.trim();
    if reference.is_empty() {
      return Err(Error::InvalidInput("product reference is required".into()));
    }
    let barcode = self.barcode.trim();
    if barcode.is_empty() {
      return Err(Error::InvalidInput("product barcode is required".into()));
    }
    let name = self
      .name
      .map(|n| n.trim().to_owned())
      .filter(|n| !n.is_empty());

    Ok(ProductDraft {
      reference: reference.to_owned(),
      name,
      barcode: barcode.to_owned(),
      family_id: self.family_id,
      stock_alert_threshold: non_negative(
        "stock_alert_threshold",
        self.stock_alert_threshold,
      )?,
      expiry_alert_days: non_negative("expiry_alert_days", self.expiry_alert_days)?,
    })
  }
}

/// A validated [`NewProduct`], ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
  pub reference:             String,
  pub name:                  Option<String>,
  pub barcode:               String,
  pub family_id:             Uuid,
  pub stock_alert_threshold: u32,
  pub expiry_alert_days:     u32,
}

impl ProductDraft {
  pub fn into_product(self, product_id: Uuid) -> Product {
    Product {
      product_id,
      reference: self.reference,
      name: self.name,
      barcode: self.barcode,
      family_id: self.family_id,
      stock_alert_threshold: self.stock_alert_threshold,
      expiry_alert_days: self.expiry_alert_days,
    }
  }
}

/// Outcome of a product deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRemoval {
  pub product:      Product,
  pub lots_removed: u64,
}

/// Convert a signed count into a `u32`, rejecting negatives.
pub fn non_negative(field: &str, value: i64) -> Result<u32> {
  u32::try_from(value).map_err(|_| {
    Error::InvalidInput(format!("{field} must be a non-negative integer, got {value}"))
  })
}
