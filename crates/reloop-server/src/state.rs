//! Shared application state handed to every request handler.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use reloop_settings::ReloopSettings;

use crate::dispatcher::EventDispatcher;
use crate::registry::ConnectionRegistry;

/// Handler state: registry, dispatcher, settings and the metrics handle.
#[derive(Clone)]
pub struct AppState {
    /// Live subscription registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Event fan-out over the registry.
    pub dispatcher: Arc<EventDispatcher>,
    /// Loaded service settings.
    pub settings: Arc<ReloopSettings>,
    /// Renders `/metrics`.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Build the state graph from loaded settings.
    #[must_use]
    pub fn new(settings: ReloopSettings, metrics: PrometheusHandle) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(settings.events.channel_capacity));
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&registry)));
        Self {
            registry,
            dispatcher,
            settings: Arc::new(settings),
            metrics,
        }
    }

    /// Subscription idle timeout from settings.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.events.idle_timeout_secs)
    }

    /// Heartbeat period from settings.
    #[must_use]
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.settings.events.heartbeat_interval_secs)
    }
}
