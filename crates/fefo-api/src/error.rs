//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fefo_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  /// A request the store rejected for a domain reason.
  #[error(transparent)]
  Domain(fefo_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a backend error: domain rejections keep their kind, anything
  /// else becomes an opaque store failure.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.domain() {
      Some(domain) => Self::Domain(domain.clone()),
      None => Self::Store(Box::new(err)),
    }
  }

  pub fn status(&self) -> StatusCode {
    use fefo_core::Error as D;
    match self {
      ApiError::NotFound(_) | ApiError::Domain(D::NotFound(_)) => StatusCode::NOT_FOUND,
      ApiError::Domain(D::InvalidInput(_)) => StatusCode::BAD_REQUEST,
      ApiError::Domain(D::InsufficientStock { .. } | D::Conflict(_)) => StatusCode::CONFLICT,
      ApiError::Domain(D::IllegalDeletion(_)) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn domain_kinds_map_to_statuses() {
    let cases = [
      (fefo_core::Error::NotFound("x".into()), StatusCode::NOT_FOUND),
      (fefo_core::Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
      (fefo_core::Error::Conflict("x".into()), StatusCode::CONFLICT),
      (
        fefo_core::Error::InsufficientStock {
          reference: "MILK".into(),
          requested: 3,
          available: 1,
        },
        StatusCode::CONFLICT,
      ),
      (fefo_core::Error::IllegalDeletion("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
    ];
    for (err, status) in cases {
      assert_eq!(ApiError::Domain(err).status(), status);
    }
  }
}
