//! Prometheus metrics recorder and metric name constants.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

// Metric name constants to avoid typos across modules.

/// Subscriptions opened total (counter).
pub const SSE_CONNECTIONS_TOTAL: &str = "sse_connections_total";
/// Subscriptions removed total (counter, labels: reason).
pub const SSE_DISCONNECTIONS_TOTAL: &str = "sse_disconnections_total";
/// Active subscriptions (gauge).
pub const SSE_CONNECTIONS_ACTIVE: &str = "sse_connections_active";
/// Events handed to the dispatcher (counter).
pub const EVENTS_PUBLISHED_TOTAL: &str = "events_published_total";
/// Per-connection deliveries attempted and accepted (counter).
pub const EVENT_DELIVERIES_TOTAL: &str = "event_deliveries_total";
/// Per-connection delivery failures (counter, labels: reason).
pub const EVENT_DELIVERY_FAILURES_TOTAL: &str = "event_delivery_failures_total";
/// Liveness pulses emitted (counter).
pub const HEARTBEATS_TOTAL: &str = "heartbeats_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_render() {
        // Build a recorder + handle (no global install to avoid test conflicts).
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            SSE_CONNECTIONS_TOTAL,
            SSE_DISCONNECTIONS_TOTAL,
            SSE_CONNECTIONS_ACTIVE,
            EVENTS_PUBLISHED_TOTAL,
            EVENT_DELIVERIES_TOTAL,
            EVENT_DELIVERY_FAILURES_TOTAL,
            HEARTBEATS_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
