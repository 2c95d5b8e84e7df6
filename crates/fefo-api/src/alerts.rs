//! Handlers for the derived views: `/alerts` and `/dashboard`.
//!
//! Both are computed from a fresh stock snapshot on every request.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use fefo_core::{
  alerts::{self, AlertQuery, AlertReport, Dashboard},
  store::InventoryStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, today};

#[derive(Debug, Default, Deserialize)]
pub struct AlertParams {
  /// Free-text filter over name, reference and barcode.
  pub q:      Option<String>,
  pub family: Option<Uuid>,
  /// `all`, `stock` or `expiry`.
  pub kind:   Option<String>,
  /// `name`, `barcode`, `date` or `days`.
  pub sort:   Option<String>,
}

/// `GET /alerts[?q=&family=&kind=&sort=]`
pub async fn report<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<AlertParams>,
) -> Result<Json<AlertReport>, ApiError> {
  let query = AlertQuery::from_params(
    params.q.as_deref(),
    params.family,
    params.kind.as_deref(),
    params.sort.as_deref(),
  );
  // The family filter is applied by the classifier, so snapshot everything.
  let stocks = store.stock_snapshot(None).await.map_err(ApiError::from_store)?;
  Ok(Json(alerts::alert_report(&stocks, &query, today())))
}

/// `GET /dashboard`
pub async fn dashboard<S: InventoryStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Dashboard>, ApiError> {
  let stocks = store.stock_snapshot(None).await.map_err(ApiError::from_store)?;
  Ok(Json(alerts::dashboard(&stocks, today())))
}
