//! Event dispatcher: audience resolution and fan-out.
//!
//! Delivery is fire-and-forget, at-most-once: the dispatcher resolves
//! the audience string against the registry once, pushes the event to
//! each resolved connection without blocking, and prunes any connection
//! whose push fails. One dead subscriber never delays or aborts
//! delivery to the others, and there is no queueing or retry for
//! clients that are offline at publish time.

use std::str::FromStr;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use reloop_core::events::OutboundEvent;
use reloop_core::roles::{Role, RoleGroup, TargetAudience};

use crate::metrics::{
    EVENTS_PUBLISHED_TOTAL, EVENT_DELIVERIES_TOTAL, EVENT_DELIVERY_FAILURES_TOTAL,
};
use crate::registry::{Connection, ConnectionRegistry};

/// Fans events out to the connections an audience string resolves to.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl EventDispatcher {
    /// Create a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Publish `event` to every connection `audience` resolves to.
    ///
    /// Returns the number of connections the event was accepted by.
    /// Connections whose push fails are removed from the registry after
    /// the fan-out loop completes.
    pub fn publish(&self, event: &OutboundEvent, audience: &str) -> usize {
        counter!(EVENTS_PUBLISHED_TOTAL, "kind" => event.kind.clone()).increment(1);

        let targets = self.resolve(audience);
        if targets.is_empty() {
            debug!(kind = %event.kind, %audience, "no connections for audience");
            return 0;
        }

        let mut delivered = 0usize;
        let mut failed: Vec<Arc<Connection>> = Vec::new();
        for conn in targets {
            match conn.push(event.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    warn!(client_id = %conn.client_id, %err, "push failed, pruning connection");
                    counter!(EVENT_DELIVERY_FAILURES_TOTAL, "reason" => err.code()).increment(1);
                    failed.push(conn);
                }
            }
        }
        for conn in &failed {
            self.registry.remove(conn);
        }

        counter!(EVENT_DELIVERIES_TOTAL).increment(delivered as u64);
        debug!(
            kind = %event.kind,
            %audience,
            delivered,
            pruned = failed.len(),
            "event dispatched"
        );
        delivered
    }

    /// Publish to a single client (audience pre-filled with the client id).
    pub fn notify_client(&self, client_id: &str, event: &OutboundEvent) -> usize {
        self.publish(event, client_id)
    }

    /// Publish to every connection in one role bucket.
    pub fn notify_role(&self, role: Role, event: &OutboundEvent) -> usize {
        self.publish(event, role.as_str())
    }

    /// Publish to every registered connection.
    pub fn broadcast(&self, event: &OutboundEvent) -> usize {
        self.publish(event, "All")
    }

    /// Resolve an audience string into a connection snapshot.
    ///
    /// An unknown role tag resolves to the empty set rather than an
    /// error: publishing is best-effort and the producer does not care
    /// whether anyone was listening.
    fn resolve(&self, audience: &str) -> Vec<Arc<Connection>> {
        match TargetAudience::parse(audience) {
            TargetAudience::Everyone => self.registry.lookup_group(RoleGroup::All),
            TargetAudience::Client(client_id) => {
                self.registry.lookup(&client_id).into_iter().collect()
            }
            TargetAudience::RoleTag(tag) => match Role::from_str(&tag) {
                Ok(role) => self.registry.lookup_group(RoleGroup::from(role)),
                Err(err) => {
                    debug!(%err, "audience resolved to no connections");
                    Vec::new()
                }
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use reloop_core::events::kind;
    use serde_json::json;
    use tokio::sync::mpsc::Receiver;

    fn setup() -> (Arc<ConnectionRegistry>, EventDispatcher) {
        let registry = Arc::new(ConnectionRegistry::new(8));
        let dispatcher = EventDispatcher::new(Arc::clone(&registry));
        (registry, dispatcher)
    }

    /// Register and discard the "connected" ack so tests see only
    /// dispatched events.
    fn subscribe(
        registry: &ConnectionRegistry,
        client_id: &str,
        role: Role,
    ) -> (Arc<Connection>, Receiver<OutboundEvent>) {
        let (conn, mut rx) = registry.register(client_id, role).unwrap();
        let ack = rx.try_recv().unwrap();
        assert_eq!(ack.kind, kind::CONNECTED);
        (conn, rx)
    }

    #[test]
    fn role_audience_reaches_only_that_role() {
        let (registry, dispatcher) = setup();
        let (_u1, mut rx1) = subscribe(&registry, "1", Role::Citizen);
        let (_u2, mut rx2) = subscribe(&registry, "2", Role::Collector);

        let event = OutboundEvent::notification(json!({"text": "pickup scheduled"}));
        let delivered = dispatcher.publish(&event, "Citizen");

        assert_eq!(delivered, 1);
        assert_eq!(rx1.try_recv().unwrap().kind, kind::NOTIFICATION);
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn all_audience_reaches_everyone() {
        let (registry, dispatcher) = setup();
        let (_u1, mut rx1) = subscribe(&registry, "1", Role::Citizen);
        let (_u2, mut rx2) = subscribe(&registry, "2", Role::Collector);

        let event = OutboundEvent::new(kind::SYSTEM_ALERT, json!({"message": "maintenance"}));
        let delivered = dispatcher.publish(&event, "all");

        assert_eq!(delivered, 2);
        assert_eq!(rx1.try_recv().unwrap().kind, kind::SYSTEM_ALERT);
        assert_eq!(rx2.try_recv().unwrap().kind, kind::SYSTEM_ALERT);
    }

    #[test]
    fn numeric_audience_reaches_exactly_one_client() {
        let (registry, dispatcher) = setup();
        let (_u1, mut rx1) = subscribe(&registry, "42", Role::Citizen);
        let (_u2, mut rx2) = subscribe(&registry, "43", Role::Citizen);

        let event = OutboundEvent::notification(json!({"text": "for you"}));
        assert_eq!(dispatcher.publish(&event, "42"), 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn unknown_role_audience_delivers_nothing() {
        let (registry, dispatcher) = setup();
        let (_u1, mut rx1) = subscribe(&registry, "1", Role::Citizen);

        let event = OutboundEvent::notification(json!({}));
        assert_eq!(dispatcher.publish(&event, "Visitor"), 0);
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn offline_client_audience_delivers_nothing() {
        let (_registry, dispatcher) = setup();
        let event = OutboundEvent::notification(json!({}));
        assert_eq!(dispatcher.publish(&event, "42"), 0);
    }

    #[test]
    fn failed_push_prunes_only_the_dead_connection() {
        let (registry, dispatcher) = setup();
        let (_u1, mut rx1) = subscribe(&registry, "1", Role::Citizen);
        let (_u2, rx2) = subscribe(&registry, "2", Role::Citizen);
        drop(rx2); // subscriber 2 went away
        // Registered after the dead one, so delivery must continue past
        // the failure to reach it.
        let (_u3, mut rx3) = subscribe(&registry, "3", Role::Citizen);

        let event = OutboundEvent::notification(json!({"text": "hi"}));
        let delivered = dispatcher.publish(&event, "Citizen");

        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx3.try_recv().is_ok());
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("2").is_none());
        let stats = registry.stats();
        assert_eq!(stats.connections_by_role["Citizen"], 2);
        assert_eq!(stats.connections_by_role["All"], 2);
    }

    #[test]
    fn notify_helpers_share_the_publish_path() {
        let (registry, dispatcher) = setup();
        let (_u1, mut rx1) = subscribe(&registry, "7", Role::Collector);

        let event = OutboundEvent::notification(json!({}));
        assert_eq!(dispatcher.notify_client("7", &event), 1);
        assert_eq!(dispatcher.notify_role(Role::Collector, &event), 1);
        assert_eq!(dispatcher.broadcast(&event), 1);
        for _ in 0..3 {
            assert!(rx1.try_recv().is_ok());
        }
    }

    #[test]
    fn end_to_end_fanout_and_stats() {
        let (registry, dispatcher) = setup();
        let (u1, mut rx1) = subscribe(&registry, "1", Role::Citizen);
        let (_u2, mut rx2) = subscribe(&registry, "2", Role::Collector);

        // Role-scoped event reaches only the citizen.
        let note = OutboundEvent::notification(json!({"text": "bin emptied"}));
        assert_eq!(dispatcher.publish(&note, "Citizen"), 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());

        // Broadcast reaches both.
        let alert = OutboundEvent::new(kind::SYSTEM_ALERT, json!({"message": "notice"}));
        assert_eq!(dispatcher.publish(&alert, "All"), 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());

        // After one client leaves, stats reflect the survivor.
        registry.remove(&u1);
        let stats = registry.stats();
        assert_eq!(stats.total_connections, 1);
        assert_eq!(stats.connections_by_role["All"], 1);
        assert_eq!(stats.connections_by_role["Citizen"], 0);
        assert_eq!(stats.connections_by_role["Collector"], 1);
    }
}
