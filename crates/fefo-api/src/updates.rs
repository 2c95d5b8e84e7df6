//! Change notification.
//!
//! Clients poll `GET /version` or subscribe to the server-sent-events stream,
//! which sends `init` with the current data version on connect and then
//! `data-update` each time the version is seen to have moved. The version is
//! sampled on a timer, so several mutations between two ticks produce a
//! single event. The timer lives inside the stream and is dropped with it
//! when the client goes away.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
  Json,
  extract::State,
  response::sse::{Event, KeepAlive, Sse},
};
use fefo_core::{store::InventoryStore, version::DataVersion};
use futures::{Stream, StreamExt as _, stream};
use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};

// ─── Version ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct VersionBody {
  pub version: u64,
}

/// `GET /version`
pub async fn version<S: InventoryStore>(State(store): State<Arc<S>>) -> Json<VersionBody> {
  Json(VersionBody { version: store.data_version().current() })
}

// ─── Stream ───────────────────────────────────────────────────────────────────

/// State of the updates router.
#[derive(Debug, Clone)]
pub struct Notifier {
  pub version:  DataVersion,
  pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionEvent {
  Init(u64),
  Update(u64),
}

impl VersionEvent {
  fn into_sse(self) -> Event {
    match self {
      Self::Init(v) => Event::default().event("init").data(v.to_string()),
      Self::Update(v) => Event::default().event("data-update").data(v.to_string()),
    }
  }
}

/// Endless stream of version changes, sampled every `period` (at least 1 ms).
pub fn version_events(version: DataVersion, period: Duration) -> impl Stream<Item = VersionEvent> {
  let start = version.current();
  let mut ticker = time::interval(period.max(Duration::from_millis(1)));
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  let changes = stream::unfold((ticker, version, start), |(mut ticker, version, mut last)| async move {
    loop {
      ticker.tick().await;
      let current = version.current();
      if current != last {
        last = current;
        return Some((VersionEvent::Update(current), (ticker, version, last)));
      }
    }
  });

  stream::once(async move { VersionEvent::Init(start) }).chain(changes)
}

/// `GET /stream`
pub async fn subscribe(
  State(notifier): State<Notifier>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
  tracing::debug!("update stream opened");
  let events = version_events(notifier.version, notifier.interval)
    .map(|event| Ok(event.into_sse()));
  Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use tower::ServiceExt as _;

  use super::*;

  const TICK: Duration = Duration::from_millis(5);

  async fn next(events: &mut (impl Stream<Item = VersionEvent> + Unpin)) -> VersionEvent {
    time::timeout(Duration::from_secs(2), events.next())
      .await
      .expect("event within timeout")
      .expect("stream never ends")
  }

  #[tokio::test]
  async fn starts_with_current_version() {
    let version = DataVersion::new();
    version.bump();
    let mut events = Box::pin(version_events(version, TICK));
    assert_eq!(next(&mut events).await, VersionEvent::Init(2));
  }

  #[tokio::test]
  async fn announces_each_observed_change() {
    let version = DataVersion::new();
    let mut events = Box::pin(version_events(version.clone(), TICK));
    assert_eq!(next(&mut events).await, VersionEvent::Init(1));

    version.bump();
    assert_eq!(next(&mut events).await, VersionEvent::Update(2));
    version.bump();
    assert_eq!(next(&mut events).await, VersionEvent::Update(3));
  }

  #[tokio::test]
  async fn changes_between_ticks_coalesce() {
    let version = DataVersion::new();
    let mut events = Box::pin(version_events(version.clone(), TICK));
    assert_eq!(next(&mut events).await, VersionEvent::Init(1));

    version.bump();
    version.bump();
    version.bump();
    assert_eq!(next(&mut events).await, VersionEvent::Update(4));
  }

  #[tokio::test]
  async fn quiet_version_sends_nothing() {
    let version = DataVersion::new();
    let mut events = Box::pin(version_events(version, TICK));
    next(&mut events).await;
    let pending = time::timeout(TICK * 10, events.next()).await;
    assert!(pending.is_err());
  }

  #[tokio::test]
  async fn sse_endpoint_sends_init_frame() {
    let version = DataVersion::new();
    let app = crate::updates_router(version, TICK);
    let resp = app
      .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let mut body = resp.into_body().into_data_stream();
    let frame = time::timeout(Duration::from_secs(2), body.next())
      .await
      .unwrap()
      .unwrap()
      .unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(text.contains("event: init"), "{text}");
    assert!(text.contains("data: 1"), "{text}");
  }

  #[tokio::test]
  async fn zero_period_still_samples() {
    let version = DataVersion::new();
    let mut events = Box::pin(version_events(version.clone(), Duration::ZERO));
    assert_eq!(next(&mut events).await, VersionEvent::Init(1));

    version.bump();
    assert_eq!(next(&mut events).await, VersionEvent::Update(2));
  }

  #[tokio::test]
  async fn zero_period_endpoint_sends_init_frame() {
    let app = crate::updates_router(DataVersion::new(), Duration::ZERO);
    let resp = app
      .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let mut body = resp.into_body().into_data_stream();
    let frame = time::timeout(Duration::from_secs(2), body.next())
      .await
      .unwrap()
      .unwrap()
      .unwrap();
    let text = String::from_utf8(frame.to_vec()).unwrap();
    assert!(text.contains("event: init"), "{text}");
  }
}
