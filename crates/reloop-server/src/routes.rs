//! HTTP surface: subscription, stats, test broadcast, health, metrics.
//!
//! The subscription endpoint speaks Server-Sent Events. A subscription
//! ends on client disconnect, transport error, or idle timeout; all
//! three paths funnel through a drop guard that removes the connection
//! from the registry exactly once.

use std::convert::Infallible;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc::Receiver;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use reloop_core::events::{kind, OutboundEvent};
use reloop_core::roles::Role;

use crate::registry::{Connection, ConnectionRegistry};
use crate::state::AppState;

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/events/subscribe", get(subscribe))
        .route("/events/stats", get(stats))
        .route("/events/test", post(test_broadcast))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscription
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeQuery {
    client_id: Option<String>,
    role: Option<String>,
}

async fn subscribe(
    State(state): State<AppState>,
    Query(query): Query<SubscribeQuery>,
) -> Response {
    let Some(client_id) = query.client_id.filter(|id| !id.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "clientId is required").into_response();
    };

    let role_tag = query
        .role
        .unwrap_or_else(|| state.settings.events.default_role.clone());
    let role = match Role::from_str(&role_tag) {
        Ok(role) => role,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    info!(%client_id, %role, "subscription requested");
    let Some((conn, rx)) = state.registry.register(&client_id, role) else {
        // Registration was abandoned (ack push failed); hand back an
        // already-finished stream rather than an error.
        let empty = futures::stream::empty::<Result<SseEvent, Infallible>>();
        return Sse::new(empty).into_response();
    };

    let stream = subscription_stream(
        Arc::clone(&state.registry),
        conn,
        rx,
        state.idle_timeout(),
    );
    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

/// Removes the connection when the stream is dropped, whatever the
/// reason: client disconnect, transport error, or idle timeout.
struct SubscriptionGuard {
    registry: Arc<ConnectionRegistry>,
    conn: Arc<Connection>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.conn);
    }
}

fn subscription_stream(
    registry: Arc<ConnectionRegistry>,
    conn: Arc<Connection>,
    mut rx: Receiver<OutboundEvent>,
    idle_timeout: std::time::Duration,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    async_stream::stream! {
        let client_id = conn.client_id.clone();
        let _guard = SubscriptionGuard { registry, conn };
        loop {
            match tokio::time::timeout(idle_timeout, rx.recv()).await {
                Err(_elapsed) => {
                    debug!(%client_id, "subscription idle timeout");
                    break;
                }
                // Channel closed: superseded by a newer connection,
                // pruned by the dispatcher, or server shutdown.
                Ok(None) => break,
                Ok(Some(event)) => {
                    match SseEvent::default().event(event.kind.clone()).json_data(&event) {
                        Ok(sse_event) => yield Ok(sse_event),
                        Err(err) => {
                            warn!(%client_id, %err, "event serialization failed, closing subscription");
                            break;
                        }
                    }
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stats and test broadcast
// ─────────────────────────────────────────────────────────────────────────────

async fn stats(State(state): State<AppState>) -> Response {
    Json(state.registry.stats()).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestBroadcastRequest {
    message: String,
    #[serde(default = "default_audience")]
    target_audience: String,
}

fn default_audience() -> String {
    "All".to_owned()
}

/// Manual verification hook: publish a synthetic alert through the
/// normal dispatch path. Responds before delivery completes.
async fn test_broadcast(
    State(state): State<AppState>,
    Json(request): Json<TestBroadcastRequest>,
) -> Response {
    let event = OutboundEvent::new(kind::SYSTEM_ALERT, json!({ "message": request.message }));
    let delivered = state.dispatcher.publish(&event, &request.target_audience);
    debug!(audience = %request.target_audience, delivered, "test broadcast");
    (StatusCode::ACCEPTED, Json(json!({ "accepted": true }))).into_response()
}

// ─────────────────────────────────────────────────────────────────────────────
// Health and metrics
// ─────────────────────────────────────────────────────────────────────────────

async fn health() -> Response {
    Json(json!({ "status": "ok" })).into_response()
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
