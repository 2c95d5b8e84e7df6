//! HTTP server assembly for the FEFO stock tracker.
//!
//! Combines the JSON API and the change-notification stream into one axum
//! [`Router`] over any [`InventoryStore`], and defines the runtime
//! configuration the `server` binary reads.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use fefo_core::store::InventoryStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `FEFO_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  /// How often the update stream samples the data version.
  pub notify_interval_ms: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "127.0.0.1".to_string(),
      port:               8000,
      store_path:         PathBuf::from("fefo.db"),
      notify_interval_ms: 1000,
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `FEFO_*` environment
  /// variables, on top of the defaults.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("FEFO"))
      .build()?
      .try_deserialize()
  }

  /// Sampling period of the update stream; never zero.
  pub fn notify_interval(&self) -> Duration {
    Duration::from_millis(self.notify_interval_ms.max(1))
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router: the JSON API under `/api` and the event
/// stream at `/updates/stream`.
pub fn router<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: InventoryStore + 'static,
{
  let version = store.data_version().clone();
  Router::new()
    .nest("/api", fefo_api::api_router(store))
    .nest(
      "/updates",
      fefo_api::updates_router(version, config.notify_interval()),
    )
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use fefo_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  async fn make_app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let config = ServerConfig { notify_interval_ms: 10, ..ServerConfig::default() };
    router(Arc::new(store), &config)
  }

  async fn oneshot_raw(app: Router, method: &str, uri: &str, body: &str) -> Response {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap();
    app.oneshot(req).await.unwrap()
  }

  async fn json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  // ── Configuration ───────────────────────────────────────────────────────────

  #[test]
  fn missing_config_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/fefo-config.toml")).unwrap();
    assert_eq!(cfg.port, 8000);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.store_path, PathBuf::from("fefo.db"));
    assert_eq!(cfg.notify_interval(), Duration::from_millis(1000));
  }

  #[test]
  fn partial_toml_keeps_remaining_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        "port = 9100\nnotify_interval_ms = 250",
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.notify_interval_ms, 250);
    assert_eq!(cfg.address(), "127.0.0.1:9100");
  }

  #[test]
  fn zero_interval_is_clamped() {
    let cfg = ServerConfig { notify_interval_ms: 0, ..ServerConfig::default() };
    assert_eq!(cfg.notify_interval(), Duration::from_millis(1));
  }

  // ── Routing ─────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn api_is_nested_under_prefix() {
    let app = make_app().await;
    let resp = oneshot_raw(app.clone(), "GET", "/api/version", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp).await["version"], 1);

    let resp = oneshot_raw(app, "GET", "/version", "").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn mutations_through_api_move_the_version() {
    let app = make_app().await;
    let resp = oneshot_raw(app.clone(), "POST", "/api/families", r#"{"name":"Dairy"}"#).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = oneshot_raw(app, "GET", "/api/version", "").await;
    assert_eq!(json(resp).await["version"], 2);
  }

  #[tokio::test]
  async fn update_stream_is_mounted() {
    let app = make_app().await;
    let resp = oneshot_raw(app, "GET", "/updates/stream", "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));
  }
}
