//! Alert listings and the dashboard summary.
//!
//! Both are derived from [`ProductStock`] snapshots through the classifier in
//! [`crate::status`]; neither is ever persisted.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::status::{self, Level, ProductStatus, ProductStock, StockState};

// ─── Query ───────────────────────────────────────────────────────────────────

/// Which alert families to include.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertKind {
  #[default]
  All,
  Stock,
  Expiry,
}

impl AlertKind {
  fn includes_stock(self) -> bool { matches!(self, Self::All | Self::Stock) }

  fn includes_expiry(self) -> bool { matches!(self, Self::All | Self::Expiry) }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AlertSort {
  Name,
  Barcode,
  Date,
  Days,
}

/// Filters for [`alert_report`].
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
  /// Case-insensitive substring over name, reference and barcode.
  pub text:   Option<String>,
  pub family: Option<Uuid>,
  pub kind:   AlertKind,
  pub sort:   Option<AlertSort>,
}

impl AlertQuery {
  /// Build a query from loosely-typed request parameters. Unknown kind or
  /// sort values fall back to "all" and "unsorted".
  pub fn from_params(
    text: Option<&str>,
    family: Option<Uuid>,
    kind: Option<&str>,
    sort: Option<&str>,
  ) -> Self {
    Self {
      text: text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_owned),
      family,
      kind: kind.and_then(|k| k.trim().parse().ok()).unwrap_or_default(),
      sort: sort.and_then(|s| s.trim().parse().ok()),
    }
  }

  fn admits(&self, stock: &ProductStock) -> bool {
    if let Some(text) = &self.text
      && !stock.product.matches_text(text)
    {
      return false;
    }
    self.family.is_none_or(|f| f == stock.product.family_id)
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
  Stock,
  Expiry,
}

/// One line of the alert listing.
///
/// Stock alerts describe the product's next lot when one exists; expiry
/// alerts always describe a specific lot (`lot_id` is set).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRow {
  pub alert_type:            AlertType,
  pub level:                 Level,
  pub label:                 String,
  pub lot_id:                Option<Uuid>,
  pub product_id:            Uuid,
  pub product_name:          Option<String>,
  pub reference:             String,
  pub barcode:               String,
  pub family:                String,
  pub stock_total:           u64,
  pub lot_quantity:          Option<u32>,
  pub entry_date:            Option<NaiveDate>,
  pub expiry_date:           Option<NaiveDate>,
  pub days_left:             Option<i64>,
  pub stock_alert_threshold: u32,
  pub expiry_alert_days:     u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertReport {
  pub critical: Vec<AlertRow>,
  pub warning:  Vec<AlertRow>,
}

impl AlertReport {
  fn push(&mut self, row: AlertRow) {
    match row.level {
      Level::Critical => self.critical.push(row),
      Level::Warning => self.warning.push(row),
      Level::Ok => {}
    }
  }

  pub fn len(&self) -> usize { self.critical.len() + self.warning.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

fn stock_alert(stock: &ProductStock, state: StockState, today: NaiveDate) -> AlertRow {
  let product = &stock.product;
  let next = stock.next_lot();
  AlertRow {
    alert_type:            AlertType::Stock,
    level:                 state.level(),
    label:                 state.label(),
    lot_id:                None,
    product_id:            product.product_id,
    product_name:          product.name.clone(),
    reference:             product.reference.clone(),
    barcode:               product.barcode.clone(),
    family:                stock.family.name.clone(),
    stock_total:           stock.total(),
    lot_quantity:          next.map(|l| l.quantity),
    entry_date:            next.map(|l| l.entry_date),
    expiry_date:           next.map(|l| l.expiry_date),
    days_left:             next.map(|l| l.days_left(today)),
    stock_alert_threshold: product.stock_alert_threshold,
    expiry_alert_days:     product.expiry_alert_days,
  }
}

/// Build the alert listing for `stocks` as of `today`.
pub fn alert_report(
  stocks: &[ProductStock],
  query: &AlertQuery,
  today: NaiveDate,
) -> AlertReport {
  let mut report = AlertReport::default();

  for stock in stocks.iter().filter(|s| query.admits(s)) {
    let total = stock.total();
    let product = &stock.product;

    if query.kind.includes_stock() {
      let state = status::stock_state(stock);
      if state.level() != Level::Ok {
        report.push(stock_alert(stock, state, today));
      }
    }

    if query.kind.includes_expiry() && total > 0 {
      let mut lots: Vec<_> = stock.lots.iter().filter(|l| l.quantity > 0).collect();
      lots.sort_by_key(|l| l.expiry_date);
      for lot in lots {
        let state = status::lot_expiry(lot, product, today);
        if state.level() == Level::Ok {
          continue;
        }
        report.push(AlertRow {
          alert_type:            AlertType::Expiry,
          level:                 state.level(),
          label:                 state.label(),
          lot_id:                Some(lot.lot_id),
          product_id:            product.product_id,
          product_name:          product.name.clone(),
          reference:             product.reference.clone(),
          barcode:               product.barcode.clone(),
          family:                stock.family.name.clone(),
          stock_total:           total,
          lot_quantity:          Some(lot.quantity),
          entry_date:            Some(lot.entry_date),
          expiry_date:           Some(lot.expiry_date),
          days_left:             Some(lot.days_left(today)),
          stock_alert_threshold: product.stock_alert_threshold,
          expiry_alert_days:     product.expiry_alert_days,
        });
      }
    }
  }

  if let Some(sort) = query.sort {
    sort_rows(&mut report.critical, sort);
    sort_rows(&mut report.warning, sort);
  }
  report
}

/// Missing values always sort after present ones.
fn missing_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
  match (a, b) {
    (Some(a), Some(b)) => a.cmp(&b),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  }
}

fn sort_rows(rows: &mut [AlertRow], sort: AlertSort) {
  match sort {
    AlertSort::Name => rows.sort_by_cached_key(|r| {
      r.product_name.as_deref().unwrap_or_default().to_lowercase()
    }),
    AlertSort::Barcode => rows.sort_by_cached_key(|r| r.barcode.to_lowercase()),
    AlertSort::Date => rows.sort_by(|a, b| missing_last(a.expiry_date, b.expiry_date)),
    AlertSort::Days => rows.sort_by(|a, b| missing_last(a.days_left, b.days_left)),
  }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// One product line of the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductState {
  pub product_id: Uuid,
  pub name:       String,
  pub reference:  String,
  pub barcode:    String,
  pub status:     ProductStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dashboard {
  pub total_alerts:            u64,
  pub stock_alert_count:       u64,
  pub expiry_alert_count:      u64,
  pub critical_products_count: u64,
  pub products:                Vec<ProductState>,
}

/// Aggregate the classification of every product.
pub fn dashboard(stocks: &[ProductStock], today: NaiveDate) -> Dashboard {
  let mut summary = Dashboard::default();

  for stock in stocks {
    let status = ProductStatus::of(stock, today);
    if status.stock_level != Level::Ok {
      summary.stock_alert_count += 1;
    }
    if status.expiry_level != Level::Ok {
      summary.expiry_alert_count += 1;
    }
    if status.is_critical() {
      summary.critical_products_count += 1;
    }
    summary.products.push(ProductState {
      product_id: stock.product.product_id,
      name:       stock.product.display_name().to_owned(),
      reference:  stock.product.reference.clone(),
      barcode:    stock.product.barcode.clone(),
      status,
    });
  }

  summary.total_alerts = summary.stock_alert_count + summary.expiry_alert_count;
  summary
}
