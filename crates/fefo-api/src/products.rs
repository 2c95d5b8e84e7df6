//! Handlers for `/products` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/products` | Optional `?family=<uuid>`; each row carries its status |
//! | `POST`   | `/products` | Family defaults to the fallback family |
//! | `GET`    | `/products/:id` | Status plus every lot, in FEFO order |
//! | `PUT`    | `/products/:id` | Full replacement of the editable fields |
//! | `DELETE` | `/products/:id` | Removes the product's lots as well |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fefo_core::{
  catalog::{
    DEFAULT_EXPIRY_ALERT_DAYS, DEFAULT_STOCK_ALERT_THRESHOLD, FALLBACK_FAMILY_ID, NewProduct,
    Product, ProductRemoval,
  },
  status::{LotOverview, ProductOverview, ProductStock},
  store::InventoryStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, today};

fn default_stock_alert_threshold() -> i64 { DEFAULT_STOCK_ALERT_THRESHOLD }

fn default_expiry_alert_days() -> i64 { DEFAULT_EXPIRY_ALERT_DAYS }

/// Request body for creating or replacing a product.
#[derive(Debug, Deserialize)]
pub struct ProductBody {
  pub reference:             String,
  #[serde(default)]
  pub name:                  Option<String>,
  pub barcode:               String,
  #[serde(default)]
  pub family_id:             Option<Uuid>,
  #[serde(default = "default_stock_alert_threshold")]
  pub stock_alert_threshold: i64,
  #[serde(default = "default_expiry_alert_days")]
  pub expiry_alert_days:     i64,
}

impl From<ProductBody> for NewProduct {
  fn from(body: ProductBody) -> Self {
    NewProduct {
      reference:             body.reference,
      name:                  body.name,
      barcode:               body.barcode,
      family_id:             body.family_id.unwrap_or(FALLBACK_FAMILY_ID),
      stock_alert_threshold: body.stock_alert_threshold,
      expiry_alert_days:     body.expiry_alert_days,
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub family: Option<Uuid>,
}

/// `GET /products[?family=<uuid>]`
pub async fn list<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ProductOverview>>, ApiError> {
  let today = today();
  let stocks = store
    .stock_snapshot(params.family)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(stocks.iter().map(|s| ProductOverview::of(s, today)).collect()))
}

// ─── Create / update ──────────────────────────────────────────────────────────

/// `POST /products`
pub async fn create<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<ProductBody>,
) -> Result<impl IntoResponse, ApiError> {
  let product = store
    .add_product(body.into())
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /products/:id`
pub async fn update<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ProductBody>,
) -> Result<Json<Product>, ApiError> {
  let product = store
    .update_product(id, body.into())
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(product))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ProductDetail {
  #[serde(flatten)]
  pub overview: ProductOverview,
  pub lots:     Vec<LotOverview>,
}

/// `GET /products/:id`
pub async fn get_one<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>, ApiError> {
  let today = today();
  let product = store
    .get_product(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("product {id}")))?;
  let family = store
    .get_family(product.family_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("family {}", product.family_id)))?;
  let lots = store
    .list_lots(Some(id))
    .await
    .map_err(ApiError::from_store)?;

  let stock = ProductStock { product, family, lots };
  let lots = stock
    .lots
    .iter()
    .map(|lot| LotOverview::of(lot, &stock.product, today))
    .collect();
  Ok(Json(ProductDetail { overview: ProductOverview::of(&stock, today), lots }))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /products/:id`
pub async fn remove<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ProductRemoval>, ApiError> {
  let removal = store
    .delete_product(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(removal))
}
