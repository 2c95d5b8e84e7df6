//! Handlers for `/movements` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/movements` | Most recent sorties first, `?limit=` (default 50) |
//! | `POST` | `/movements` | Body: `{"code":"<reference or barcode>","quantity":3}` |
//! | `GET`  | `/movements/queue` | Next lots in FEFO order, `?limit=` (default 10) |

use std::{collections::HashMap, sync::Arc};

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fefo_core::{
  lot::Sortie,
  status::LotOverview,
  store::InventoryStore,
};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, lots::overviews, today};

#[derive(Debug, Deserialize)]
pub struct LimitParams {
  pub limit: Option<usize>,
}

// ─── Allocate ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AllocateBody {
  /// Product reference or barcode.
  pub code:     String,
  pub quantity: i64,
}

/// `POST /movements`
pub async fn allocate<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<AllocateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let allocation = store
    .allocate(&body.code, body.quantity, today())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(allocation)))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// A sortie with the product it consumed.
#[derive(Debug, Serialize)]
pub struct MovementRow {
  #[serde(flatten)]
  pub sortie:       Sortie,
  pub reference:    String,
  pub product_name: Option<String>,
}

/// `GET /movements[?limit=<n>]`
pub async fn history<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<MovementRow>>, ApiError> {
  let sorties = store
    .list_sorties(params.limit.unwrap_or(50))
    .await
    .map_err(ApiError::from_store)?;
  let products: HashMap<_, _> = store
    .list_products(None)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|p| (p.product_id, p))
    .collect();

  let rows = sorties
    .into_iter()
    .filter_map(|sortie| {
      let product = products.get(&sortie.product_id)?;
      Some(MovementRow {
        reference: product.reference.clone(),
        product_name: product.name.clone(),
        sortie,
      })
    })
    .collect();
  Ok(Json(rows))
}

// ─── Queue ────────────────────────────────────────────────────────────────────

/// `GET /movements/queue[?limit=<n>]`
pub async fn queue<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<LimitParams>,
) -> Result<Json<Vec<LotOverview>>, ApiError> {
  let lots = store
    .fefo_queue(today(), params.limit.unwrap_or(10))
    .await
    .map_err(ApiError::from_store)?;
  overviews(store.as_ref(), &lots).await.map(Json)
}
