//! Stock-level and expiry-level classification.
//!
//! Everything here is computed on demand from a [`ProductStock`] snapshot and
//! never stored. Note the deliberate asymmetry with the allocator: the stock
//! total counts leftover quantity in expired lots, and the "next lot" may be
//! an expired one, while allocation never touches expired lots.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  catalog::{Family, Product},
  lot::{self, Lot},
};

// ─── Levels ──────────────────────────────────────────────────────────────────

/// Severity of a classification, ordered from harmless to critical.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
  Ok,
  Warning,
  Critical,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A product with its family and every one of its lots, as read at one point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStock {
  pub product: Product,
  pub family:  Family,
  /// All lots of the product, in FEFO order.
  pub lots:    Vec<Lot>,
}

impl ProductStock {
  /// Sum of every lot quantity, expired lots included.
  pub fn total(&self) -> u64 {
    self.lots.iter().map(|l| u64::from(l.quantity)).sum()
  }

  pub fn next_lot(&self) -> Option<&Lot> { lot::next_lot(&self.lots) }
}

// ─── Stock level ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
  OutOfStock,
  ThresholdReached,
  Normal,
}

impl StockState {
  pub fn classify(total: u64, threshold: u32) -> Self {
    if total == 0 {
      Self::OutOfStock
    } else if total <= u64::from(threshold) {
      Self::ThresholdReached
    } else {
      Self::Normal
    }
  }

  pub fn level(self) -> Level {
    match self {
      Self::OutOfStock => Level::Critical,
      Self::ThresholdReached => Level::Warning,
      Self::Normal => Level::Ok,
    }
  }

  pub fn label(self) -> String {
    match self {
      Self::OutOfStock => "out of stock",
      Self::ThresholdReached => "stock threshold reached",
      Self::Normal => "stock normal",
    }
    .to_owned()
  }
}

// ─── Expiry level ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryState {
  /// The product has no stock, so expiry is moot.
  NoStock,
  NoExpiryDate,
  Expired(i64),
  ExpiresToday,
  /// Still in date; whether it warns depends on the product's alert window.
  ExpiresIn { days_left: i64, alert_days: u32 },
}

impl ExpiryState {
  /// Classify a single expiry date against an alert window.
  pub fn for_date(expiry: NaiveDate, alert_days: u32, today: NaiveDate) -> Self {
    let days_left = (expiry - today).num_days();
    match days_left {
      d if d < 0 => Self::Expired(d),
      0 => Self::ExpiresToday,
      d => Self::ExpiresIn { days_left: d, alert_days },
    }
  }

  pub fn level(self) -> Level {
    match self {
      Self::NoStock | Self::NoExpiryDate => Level::Ok,
      Self::Expired(_) | Self::ExpiresToday => Level::Critical,
      Self::ExpiresIn { days_left, alert_days } => {
        if days_left <= i64::from(alert_days) {
          Level::Warning
        } else {
          Level::Ok
        }
      }
    }
  }

  pub fn days_left(self) -> Option<i64> {
    match self {
      Self::NoStock | Self::NoExpiryDate => None,
      Self::Expired(d) => Some(d),
      Self::ExpiresToday => Some(0),
      Self::ExpiresIn { days_left, .. } => Some(days_left),
    }
  }

  pub fn label(self) -> String {
    match self {
      Self::NoStock => "no stock".to_owned(),
      Self::NoExpiryDate => "no expiry date".to_owned(),
      Self::Expired(_) => "expired".to_owned(),
      Self::ExpiresToday => "expires today".to_owned(),
      Self::ExpiresIn { days_left, .. } => format!("expires in {days_left} day(s)"),
    }
  }
}

/// Stock level of a product.
pub fn stock_state(stock: &ProductStock) -> StockState {
  StockState::classify(stock.total(), stock.product.stock_alert_threshold)
}

/// Expiry level of a product, judged on its next lot.
pub fn expiry_state(stock: &ProductStock, today: NaiveDate) -> ExpiryState {
  if stock.total() == 0 {
    return ExpiryState::NoStock;
  }
  match stock.next_lot() {
    None => ExpiryState::NoExpiryDate,
    Some(next) => {
      ExpiryState::for_date(next.expiry_date, stock.product.expiry_alert_days, today)
    }
  }
}

/// Expiry level of one lot, using its product's alert window.
pub fn lot_expiry(lot: &Lot, product: &Product, today: NaiveDate) -> ExpiryState {
  ExpiryState::for_date(lot.expiry_date, product.expiry_alert_days, today)
}

// ─── Combined views ──────────────────────────────────────────────────────────

/// Both classifications of a product, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStatus {
  pub stock_total:  u64,
  pub stock_level:  Level,
  pub stock_label:  String,
  pub expiry_level: Level,
  pub expiry_label: String,
  pub days_left:    Option<i64>,
}

impl ProductStatus {
  pub fn of(stock: &ProductStock, today: NaiveDate) -> Self {
    let stock_state = stock_state(stock);
    let expiry = expiry_state(stock, today);
    Self {
      stock_total:  stock.total(),
      stock_level:  stock_state.level(),
      stock_label:  stock_state.label(),
      expiry_level: expiry.level(),
      expiry_label: expiry.label(),
      days_left:    expiry.days_left(),
    }
  }

  /// Critical for dashboard counting if either level is critical.
  pub fn is_critical(&self) -> bool {
    self.stock_level == Level::Critical || self.expiry_level == Level::Critical
  }
}

/// Product listing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOverview {
  pub product:     Product,
  pub family_name: String,
  pub status:      ProductStatus,
}

impl ProductOverview {
  pub fn of(stock: &ProductStock, today: NaiveDate) -> Self {
    Self {
      product:     stock.product.clone(),
      family_name: stock.family.name.clone(),
      status:      ProductStatus::of(stock, today),
    }
  }
}

/// Lot listing row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotOverview {
  pub lot:          Lot,
  pub product_id:   Uuid,
  pub reference:    String,
  pub product_name: Option<String>,
  pub level:        Level,
  pub label:        String,
  pub days_left:    i64,
}

impl LotOverview {
  pub fn of(lot: &Lot, product: &Product, today: NaiveDate) -> Self {
    let state = lot_expiry(lot, product, today);
    Self {
      lot:          lot.clone(),
      product_id:   product.product_id,
      reference:    product.reference.clone(),
      product_name: product.name.clone(),
      level:        state.level(),
      label:        state.label(),
      days_left:    lot.days_left(today),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::NewProduct;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn today() -> NaiveDate { date(2024, 6, 10) }

  fn snapshot(threshold: i64, alert_days: i64, lots: &[(u32, NaiveDate)]) -> ProductStock {
    let product = NewProduct::new("REF", "000", Uuid::nil())
      .with_thresholds(threshold, alert_days)
      .validate()
      .unwrap()
      .into_product(Uuid::new_v4());
    let lots = lots
      .iter()
      .map(|&(quantity, expiry_date)| Lot {
        lot_id: Uuid::new_v4(),
        product_id: product.product_id,
        quantity,
        entry_date: date(2024, 1, 1),
        expiry_date,
      })
      .collect();
    ProductStock { product, family: Family::fallback(), lots }
  }

  #[test]
  fn stock_levels_follow_threshold() {
    let far = date(2025, 1, 1);
    assert_eq!(stock_state(&snapshot(5, 7, &[])).level(), Level::Critical);
    assert_eq!(stock_state(&snapshot(5, 7, &[(0, far)])).level(), Level::Critical);
    assert_eq!(
      stock_state(&snapshot(5, 7, &[(2, far), (1, far)])),
      StockState::ThresholdReached
    );
    assert_eq!(stock_state(&snapshot(5, 7, &[(5, far)])).level(), Level::Warning);
    assert_eq!(stock_state(&snapshot(5, 7, &[(6, far)])).level(), Level::Ok);
  }

  #[test]
  fn expired_leftovers_count_towards_total() {
    let stock = snapshot(1, 7, &[(4, date(2024, 5, 1))]);
    assert_eq!(stock.total(), 4);
    assert_eq!(stock_state(&stock), StockState::Normal);
    assert_eq!(expiry_state(&stock, today()), ExpiryState::Expired(-40));
  }

  #[test]
  fn expiry_warning_inside_alert_window() {
    let stock = snapshot(1, 7, &[(10, date(2024, 6, 15))]);
    let state = expiry_state(&stock, today());
    assert_eq!(state.level(), Level::Warning);
    assert_eq!(state.label(), "expires in 5 day(s)");
    assert_eq!(state.days_left(), Some(5));
  }

  #[test]
  fn expiry_ok_outside_window_and_critical_on_the_day() {
    let ok = snapshot(1, 7, &[(10, date(2024, 6, 18))]);
    assert_eq!(expiry_state(&ok, today()).level(), Level::Ok);
    assert_eq!(expiry_state(&ok, today()).label(), "expires in 8 day(s)");

    let today_lot = snapshot(1, 7, &[(10, today())]);
    assert_eq!(expiry_state(&today_lot, today()), ExpiryState::ExpiresToday);
    assert_eq!(expiry_state(&today_lot, today()).level(), Level::Critical);
  }

  #[test]
  fn no_stock_means_expiry_is_moot() {
    let stock = snapshot(1, 7, &[(0, date(2024, 1, 1))]);
    assert_eq!(expiry_state(&stock, today()), ExpiryState::NoStock);
    assert_eq!(expiry_state(&stock, today()).level(), Level::Ok);
  }

  #[test]
  fn next_lot_ignores_empty_lots() {
    let stock = snapshot(1, 30, &[(0, date(2024, 6, 1)), (3, date(2024, 6, 20))]);
    assert_eq!(expiry_state(&stock, today()).days_left(), Some(10));
  }

  #[test]
  fn critical_when_either_level_is_critical() {
    let expired = ProductStatus::of(&snapshot(1, 7, &[(9, date(2024, 6, 9))]), today());
    assert!(expired.is_critical());
    let empty = ProductStatus::of(&snapshot(1, 7, &[]), today());
    assert!(empty.is_critical());
    let fine = ProductStatus::of(&snapshot(1, 7, &[(9, date(2024, 9, 9))]), today());
    assert!(!fine.is_critical());
  }

  #[test]
  fn lot_expiry_uses_the_lot_date() {
    let stock = snapshot(1, 7, &[(1, date(2024, 6, 12)), (1, date(2024, 12, 1))]);
    let late = &stock.lots[1];
    assert_eq!(lot_expiry(late, &stock.product, today()).level(), Level::Ok);
    let row = LotOverview::of(&stock.lots[0], &stock.product, today());
    assert_eq!(row.level, Level::Warning);
    assert_eq!(row.days_left, 2);
  }

  #[test]
  fn level_parses_from_lowercase() {
    assert_eq!("critical".parse::<Level>().unwrap(), Level::Critical);
    assert_eq!(Level::Warning.to_string(), "warning");
  }
}
