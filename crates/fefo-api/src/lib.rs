//! JSON REST API for the FEFO stock tracker.
//!
//! Exposes an axum [`Router`] backed by any [`fefo_core::store::InventoryStore`],
//! plus the server-sent-events stream that announces data changes.
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! Router::new()
//!   .nest("/api", fefo_api::api_router(store.clone()))
//!   .nest("/updates", fefo_api::updates_router(version, interval))
//! ```

pub mod alerts;
pub mod error;
pub mod families;
pub mod lots;
pub mod movements;
pub mod products;
pub mod updates;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, put},
};
use chrono::NaiveDate;
use fefo_core::{store::InventoryStore, version::DataVersion};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: InventoryStore + 'static,
{
  Router::new()
    // Families
    .route("/families", get(families::list::<S>).post(families::create::<S>))
    .route(
      "/families/{id}",
      put(families::rename::<S>).delete(families::remove::<S>),
    )
    // Products
    .route("/products", get(products::list::<S>).post(products::create::<S>))
    .route(
      "/products/{id}",
      get(products::get_one::<S>)
        .put(products::update::<S>)
        .delete(products::remove::<S>),
    )
    // Lots
    .route("/lots", get(lots::list::<S>).post(lots::create::<S>))
    .route("/lots/{id}", get(lots::get_one::<S>).delete(lots::remove::<S>))
    // Movements
    .route(
      "/movements",
      get(movements::history::<S>).post(movements::allocate::<S>),
    )
    .route("/movements/queue", get(movements::queue::<S>))
    // Derived views
    .route("/alerts", get(alerts::report::<S>))
    .route("/dashboard", get(alerts::dashboard::<S>))
    .route("/version", get(updates::version::<S>))
    .with_state(store)
}

/// Router serving `GET /stream`, the change-notification event stream.
pub fn updates_router(version: DataVersion, interval: Duration) -> Router<()> {
  Router::new()
    .route("/stream", get(updates::subscribe))
    .with_state(updates::Notifier { version, interval })
}

/// The calendar day a request belongs to.
pub(crate) fn today() -> NaiveDate { chrono::Local::now().date_naive() }

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use fefo_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  async fn make_router() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  fn in_days(days: i64) -> String { (today() + chrono::Days::new(days as u64)).to_string() }

  async fn seed_product(app: &Router, reference: &str, barcode: &str) -> String {
    let (status, product) = send(
      app,
      "POST",
      "/products",
      Some(json!({ "reference": reference, "barcode": barcode, "stock_alert_threshold": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    product["product_id"].as_str().unwrap().to_owned()
  }

  // ── Families ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn family_lifecycle() {
    let app = make_router().await;

    let (status, fam) = send(&app, "POST", "/families", Some(json!({ "name": "Dairy" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = fam["family_id"].as_str().unwrap().to_owned();

    let (status, body) = send(&app, "POST", "/families", Some(json!({ "name": "DAIRY" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let (status, fam) =
      send(&app, "PUT", &format!("/families/{id}"), Some(json!({ "name": "Milk" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fam["name"], "Milk");

    let (status, removal) = send(&app, "DELETE", &format!("/families/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removal["mode"], "reassign");

    let (_, families) = send(&app, "GET", "/families", None).await;
    assert_eq!(families.as_array().unwrap().len(), 1);
    assert_eq!(families[0]["name"], "-");
  }

  #[tokio::test]
  async fn fallback_family_delete_is_unprocessable() {
    let app = make_router().await;
    let uri = format!("/families/{}?with_products=true", uuid::Uuid::nil());
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  }

  // ── Products & lots ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn product_defaults_to_fallback_family_and_reports_status() {
    let app = make_router().await;
    let id = seed_product(&app, "MILK", "111").await;

    let (status, detail) = send(&app, "GET", &format!("/products/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["family_name"], "-");
    assert_eq!(detail["status"]["stock_level"], "critical");
    assert_eq!(detail["status"]["stock_label"], "out of stock");
    assert_eq!(detail["lots"].as_array().unwrap().len(), 0);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, "GET", &format!("/products/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("not found: product {missing}"));
  }

  #[tokio::test]
  async fn invalid_product_input_is_a_bad_request() {
    let app = make_router().await;
    let (status, _) = send(
      &app,
      "POST",
      "/products",
      Some(json!({ "reference": "MILK", "barcode": "1", "expiry_alert_days": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unexpired_lot_cannot_be_deleted() {
    let app = make_router().await;
    let product = seed_product(&app, "MILK", "111").await;

    let (status, lot) = send(
      &app,
      "POST",
      "/lots",
      Some(json!({ "product_id": product, "quantity": 4, "expiry_date": in_days(3) })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(lot["entry_date"], today().to_string());
    let lot_id = lot["lot_id"].as_str().unwrap().to_owned();

    let (status, overview) = send(&app, "GET", &format!("/lots/{lot_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["label"], "expires in 3 day(s)");

    let (status, _) = send(&app, "DELETE", &format!("/lots/{lot_id}"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, "GET", &format!("/lots/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], format!("not found: lot {missing}"));
  }

  // ── Movements ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn allocation_round_trip() {
    let app = make_router().await;
    let product = seed_product(&app, "MILK", "111").await;
    for (qty, days) in [(3, 10), (5, 2)] {
      send(
        &app,
        "POST",
        "/lots",
        Some(json!({ "product_id": product, "quantity": qty, "expiry_date": in_days(days) })),
      )
      .await;
    }

    let (status, allocation) = send(
      &app,
      "POST",
      "/movements",
      Some(json!({ "code": "111", "quantity": 6 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(allocation["consumed"][0]["taken"], 5);
    assert_eq!(allocation["consumed"][1]["taken"], 1);

    let (status, body) = send(
      &app,
      "POST",
      "/movements",
      Some(json!({ "code": "MILK", "quantity": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("insufficient stock"));

    let (_, history) = send(&app, "GET", "/movements?limit=5", None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["reference"], "MILK");

    let (_, queue) = send(&app, "GET", "/movements/queue", None).await;
    assert_eq!(queue[0]["lot"]["quantity"], 2);

    let (_, version) = send(&app, "GET", "/version", None).await;
    assert_eq!(version["version"], 5);
  }

  #[tokio::test]
  async fn unknown_code_is_not_found() {
    let app = make_router().await;
    let (status, body) = send(
      &app,
      "POST",
      "/movements",
      Some(json!({ "code": "NOPE", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], r#"not found: product with reference or barcode "NOPE""#);
  }

  // ── Derived views ───────────────────────────────────────────────────────────

  #[tokio::test]
  async fn alerts_and_dashboard_reflect_stock() {
    let app = make_router().await;
    let product = seed_product(&app, "MILK", "111").await;
    seed_product(&app, "BREAD", "222").await;
    send(
      &app,
      "POST",
      "/lots",
      Some(json!({ "product_id": product, "quantity": 1, "expiry_date": in_days(0) })),
    )
    .await;

    let (status, report) = send(&app, "GET", "/alerts?kind=stock&sort=bogus", None).await;
    assert_eq!(status, StatusCode::OK);
    // BREAD is out of stock, MILK is under its threshold.
    assert_eq!(report["critical"].as_array().unwrap().len(), 1);
    assert_eq!(report["warning"].as_array().unwrap().len(), 1);

    let (_, report) = send(&app, "GET", "/alerts?kind=expiry&q=mil", None).await;
    assert_eq!(report["critical"][0]["label"], "expires today");

    let (_, dash) = send(&app, "GET", "/dashboard", None).await;
    assert_eq!(dash["stock_alert_count"], 2);
    assert_eq!(dash["expiry_alert_count"], 1);
    assert_eq!(dash["critical_products_count"], 2);
    assert_eq!(dash["total_alerts"], 3);
  }
}
