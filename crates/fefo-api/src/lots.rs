//! Handlers for `/lots` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/lots` | Optional `?product=<uuid>`; FEFO order with expiry level |
//! | `POST`   | `/lots` | `entry_date` defaults to today |
//! | `GET`    | `/lots/:id` | 404 if not found |
//! | `DELETE` | `/lots/:id` | Only lots whose expiry date has passed |

use std::{collections::HashMap, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use fefo_core::{
  lot::{Lot, NewLot},
  status::LotOverview,
  store::InventoryStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, today};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub product: Option<Uuid>,
}

/// `GET /lots[?product=<uuid>]`
pub async fn list<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<LotOverview>>, ApiError> {
  let lots = store
    .list_lots(params.product)
    .await
    .map_err(ApiError::from_store)?;
  overviews(store.as_ref(), &lots).await.map(Json)
}

/// Attach product details and expiry level to each lot, keeping order.
pub(crate) async fn overviews<S: InventoryStore>(
  store: &S,
  lots: &[Lot],
) -> Result<Vec<LotOverview>, ApiError> {
  let today = today();
  let products: HashMap<_, _> = store
    .list_products(None)
    .await
    .map_err(ApiError::from_store)?
    .into_iter()
    .map(|p| (p.product_id, p))
    .collect();

  Ok(
    lots
      .iter()
      .filter_map(|lot| {
        let product = products.get(&lot.product_id)?;
        Some(LotOverview::of(lot, product, today))
      })
      .collect(),
  )
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub product_id:  Uuid,
  pub quantity:    i64,
  #[serde(default)]
  pub entry_date:  Option<NaiveDate>,
  pub expiry_date: NaiveDate,
}

/// `POST /lots`
pub async fn create<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let input = NewLot {
    product_id:  body.product_id,
    quantity:    body.quantity,
    entry_date:  body.entry_date,
    expiry_date: body.expiry_date,
  };
  let lot = store
    .add_lot(input, today())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(lot)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /lots/:id`
pub async fn get_one<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<LotOverview>, ApiError> {
  let lot = store
    .get_lot(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("lot {id}")))?;
  let product = store
    .get_product(lot.product_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("product {}", lot.product_id)))?;
  Ok(Json(LotOverview::of(&lot, &product, today())))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /lots/:id`: refused unless the lot has expired.
pub async fn remove<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Lot>, ApiError> {
  let lot = store
    .delete_expired_lot(id, today())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(lot))
}
