//! HTTP endpoint tests driven through the router without a socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower::ServiceExt;

use reloop_core::events::kind;
use reloop_core::roles::Role;
use reloop_server::{routes, AppState};
use reloop_settings::ReloopSettings;

fn app_state() -> AppState {
    let handle = PrometheusBuilder::new().build_recorder().handle();
    AppState::new(ReloopSettings::default(), handle)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = routes::router(app_state());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn subscribe_requires_client_id() {
    let app = routes::router(app_state());
    let response = app
        .oneshot(
            Request::get("/events/subscribe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscribe_rejects_unknown_role() {
    let app = routes::router(app_state());
    let response = app
        .oneshot(
            Request::get("/events/subscribe?clientId=7&role=Visitor")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscribe_opens_event_stream_and_registers() {
    let state = app_state();
    let app = routes::router(state.clone());
    let response = app
        .oneshot(
            Request::get("/events/subscribe?clientId=42&role=Citizen")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
    assert_eq!(state.registry.len(), 1);
    assert!(state.registry.lookup("42").is_some());
}

#[tokio::test]
async fn subscribe_without_role_uses_default() {
    let state = app_state();
    let app = routes::router(state.clone());
    let response = app
        .oneshot(
            Request::get("/events/subscribe?clientId=9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(state.registry.lookup("9").unwrap().role, Role::Citizen);
}

#[tokio::test]
async fn stats_reports_occupancy() {
    let state = app_state();
    let (_c1, _rx1) = state.registry.register("1", Role::Citizen).unwrap();
    let (_c2, _rx2) = state.registry.register("2", Role::Collector).unwrap();

    let app = routes::router(state.clone());
    let response = app
        .oneshot(Request::get("/events/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["totalConnections"], 2);
    assert_eq!(json["connectionsByRole"]["All"], 2);
    assert_eq!(json["connectionsByRole"]["Citizen"], 1);
    assert_eq!(json["connectionsByRole"]["Collector"], 1);
    assert_eq!(json["connectionsByRole"]["Admin"], 0);
}

#[tokio::test]
async fn test_broadcast_is_accepted_and_delivered() {
    let state = app_state();
    let (_conn, mut rx) = state.registry.register("5", Role::Citizen).unwrap();
    let ack = rx.try_recv().unwrap();
    assert_eq!(ack.kind, kind::CONNECTED);

    let app = routes::router(state.clone());
    let request = Request::post("/events/test")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"message": "hello everyone"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.kind, kind::SYSTEM_ALERT);
    assert_eq!(event.payload["message"], "hello everyone");
}

#[tokio::test]
async fn test_broadcast_honors_target_audience() {
    let state = app_state();
    let (_c1, mut rx1) = state.registry.register("1", Role::Citizen).unwrap();
    let (_c2, mut rx2) = state.registry.register("2", Role::Collector).unwrap();
    let _ = rx1.try_recv().unwrap();
    let _ = rx2.try_recv().unwrap();

    let app = routes::router(state.clone());
    let request = Request::post("/events/test")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            r#"{"message": "collectors only", "targetAudience": "Collector"}"#,
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    assert!(rx1.try_recv().is_err());
    assert_eq!(rx2.try_recv().unwrap().kind, kind::SYSTEM_ALERT);
}

#[tokio::test]
async fn metrics_endpoint_renders_text() {
    let app = routes::router(app_state());
    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
