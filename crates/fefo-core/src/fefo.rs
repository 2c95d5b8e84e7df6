//! First-Expiry-First-Out allocation planning.
//!
//! The planner is pure: it takes the product's lots as read inside the
//! caller's transaction and returns the per-lot decrements to write. Storage
//! backends are responsible for holding the product lock across read, plan
//! and write.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  lot::{Lot, Sortie},
};

/// The amount drawn from one lot by an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotConsumption {
  pub lot_id:      Uuid,
  pub expiry_date: NaiveDate,
  pub taken:       u32,
  /// Lot quantity after the decrement.
  pub remaining:   u32,
}

/// Decrements computed for a satisfiable request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
  pub requested:   u32,
  pub available:   u64,
  pub consumption: Vec<LotConsumption>,
}

/// Result of a committed allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
  pub product_id: Uuid,
  pub reference:  String,
  pub quantity:   u32,
  pub sortie:     Sortie,
  pub consumed:   Vec<LotConsumption>,
}

/// Lots eligible for allocation, earliest expiry first.
///
/// Empty lots and lots whose expiry date is before `today` are excluded even
/// if the caller passed them in.
pub fn candidates(lots: &[Lot], today: NaiveDate) -> Vec<&Lot> {
  let mut eligible: Vec<&Lot> =
    lots.iter().filter(|l| l.is_allocatable(today)).collect();
  eligible.sort_by_key(|l| l.expiry_date);
  eligible
}

/// Total quantity the allocator could hand out today.
pub fn available(lots: &[Lot], today: NaiveDate) -> u64 {
  candidates(lots, today)
    .iter()
    .map(|l| u64::from(l.quantity))
    .sum()
}

/// Plan the consumption of `requested` units from `lots`.
///
/// Fails with [`Error::InsufficientStock`] when the eligible lots cannot
/// cover the request; no partial plan is ever returned.
pub fn plan(
  reference: &str,
  lots: &[Lot],
  requested: u32,
  today: NaiveDate,
) -> Result<AllocationPlan> {
  if requested == 0 {
    return Err(Error::InvalidInput("quantity must be a positive integer, got 0".into()));
  }

  let eligible = candidates(lots, today);
  let available: u64 = eligible.iter().map(|l| u64::from(l.quantity)).sum();
  if available < u64::from(requested) {
    return Err(Error::InsufficientStock {
      reference: reference.to_owned(),
      requested: u64::from(requested),
      available,
    });
  }

  let mut remaining_need = requested;
  let mut consumption = Vec::new();
  for lot in eligible {
    if remaining_need == 0 {
      break;
    }
    let taken = lot.quantity.min(remaining_need);
    remaining_need -= taken;
    consumption.push(LotConsumption {
      lot_id: lot.lot_id,
      expiry_date: lot.expiry_date,
      taken,
      remaining: lot.quantity - taken,
    });
  }

  Ok(AllocationPlan { requested, available, consumption })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  fn lot(quantity: u32, expiry: NaiveDate) -> Lot {
    Lot {
      lot_id: Uuid::new_v4(),
      product_id: Uuid::nil(),
      quantity,
      entry_date: date(2024, 1, 1),
      expiry_date: expiry,
    }
  }

  fn today() -> NaiveDate { date(2024, 6, 10) }

  #[test]
  fn consumes_earliest_expiry_first() {
    let late = lot(10, date(2024, 9, 1));
    let early = lot(3, date(2024, 6, 20));
    let mid = lot(5, date(2024, 7, 1));
    let lots = vec![late.clone(), early.clone(), mid.clone()];

    let plan = plan("REF", &lots, 6, today()).unwrap();

    assert_eq!(plan.consumption.len(), 2);
    assert_eq!(plan.consumption[0].lot_id, early.lot_id);
    assert_eq!(plan.consumption[0].taken, 3);
    assert_eq!(plan.consumption[0].remaining, 0);
    assert_eq!(plan.consumption[1].lot_id, mid.lot_id);
    assert_eq!(plan.consumption[1].taken, 3);
    assert_eq!(plan.consumption[1].remaining, 2);
    assert!(plan.consumption.iter().all(|c| c.lot_id != late.lot_id));
  }

  #[test]
  fn consumed_total_equals_request() {
    let lots = vec![
      lot(4, date(2024, 6, 11)),
      lot(4, date(2024, 6, 12)),
      lot(4, date(2024, 6, 13)),
    ];
    for requested in 1..=12 {
      let plan = plan("REF", &lots, requested, today()).unwrap();
      let taken: u32 = plan.consumption.iter().map(|c| c.taken).sum();
      assert_eq!(taken, requested);
    }
  }

  #[test]
  fn expired_and_empty_lots_are_never_selected() {
    let expired = lot(50, date(2024, 6, 9));
    let empty = lot(0, date(2024, 6, 15));
    let good = lot(5, date(2024, 6, 30));
    let lots = vec![expired.clone(), empty.clone(), good.clone()];

    let plan = plan("REF", &lots, 5, today()).unwrap();
    assert_eq!(plan.available, 5);
    assert_eq!(plan.consumption.len(), 1);
    assert_eq!(plan.consumption[0].lot_id, good.lot_id);
  }

  #[test]
  fn lot_expiring_today_is_eligible() {
    let lots = vec![lot(2, today())];
    let plan = plan("REF", &lots, 2, today()).unwrap();
    assert_eq!(plan.consumption[0].remaining, 0);
  }

  #[test]
  fn insufficient_stock_is_rejected_with_availability() {
    let lots = vec![lot(2, date(2024, 6, 20)), lot(100, date(2024, 1, 1))];
    let err = plan("MILK-1", &lots, 3, today()).unwrap_err();
    assert_eq!(err, Error::InsufficientStock {
      reference: "MILK-1".into(),
      requested: 3,
      available: 2,
    });
  }

  #[test]
  fn zero_request_is_invalid() {
    let lots = vec![lot(2, date(2024, 6, 20))];
    assert!(matches!(
      plan("REF", &lots, 0, today()),
      Err(Error::InvalidInput(_))
    ));
  }

  #[test]
  fn available_ignores_expired_stock() {
    let lots = vec![lot(7, date(2024, 6, 1)), lot(3, date(2024, 6, 10))];
    assert_eq!(available(&lots, today()), 3);
  }
}
