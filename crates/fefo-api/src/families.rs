//! Handlers for `/families` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/families` | Alphabetical, fallback family included |
//! | `POST`   | `/families` | Body: `{"name":"Dairy"}` |
//! | `PUT`    | `/families/:id` | Rename; the fallback family is fixed |
//! | `DELETE` | `/families/:id` | `?with_products=true` deletes the products too |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use fefo_core::{
  catalog::{Family, FamilyDeletion, FamilyRemoval, NewFamily},
  store::InventoryStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct FamilyBody {
  pub name: String,
}

/// `GET /families`
pub async fn list<S: InventoryStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Family>>, ApiError> {
  let families = store.list_families().await.map_err(ApiError::from_store)?;
  Ok(Json(families))
}

/// `POST /families`
pub async fn create<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<FamilyBody>,
) -> Result<impl IntoResponse, ApiError> {
  let family = store
    .add_family(NewFamily::new(body.name))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(family)))
}

/// `PUT /families/:id`
pub async fn rename<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<FamilyBody>,
) -> Result<Json<Family>, ApiError> {
  let family = store
    .rename_family(id, NewFamily::new(body.name))
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(family))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
  #[serde(default)]
  pub with_products: bool,
}

/// `DELETE /families/:id[?with_products=true]`
pub async fn remove<S: InventoryStore>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<DeleteParams>,
) -> Result<Json<FamilyRemoval>, ApiError> {
  let mode = if params.with_products {
    FamilyDeletion::Cascade
  } else {
    FamilyDeletion::Reassign
  };
  let removal = store
    .delete_family(id, mode)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(removal))
}
