//! Connection registry: the authoritative map of live subscriptions.
//!
//! Connections are indexed two ways: by client id (at most one live
//! connection per client) and by role bucket. Role buckets include a
//! synthetic [`RoleGroup::All`] bucket holding every connection, so
//! broadcasts never have to walk the per-role buckets.
//!
//! The registry is fully synchronous: pushes use `try_send` on a bounded
//! channel and never await, so event producers are never blocked by a
//! slow subscriber. A push that fails marks the connection dead and the
//! caller is expected to remove it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use reloop_core::errors::DeliveryError;
use reloop_core::events::OutboundEvent;
use reloop_core::roles::{Role, RoleGroup};

use crate::metrics::{SSE_CONNECTIONS_ACTIVE, SSE_CONNECTIONS_TOTAL, SSE_DISCONNECTIONS_TOTAL};

// ─────────────────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────────────────

/// A single live subscription.
///
/// The sender half of the subscription channel lives behind a mutex so
/// the registry can close it proactively (superseded connection,
/// server shutdown) without waiting for the subscriber task to notice.
#[derive(Debug)]
pub struct Connection {
    /// Unique id for this connection instance. Guards against a stale
    /// removal tearing down a newer connection for the same client.
    pub id: Uuid,
    /// Client this connection belongs to.
    pub client_id: String,
    /// Role the client subscribed under.
    pub role: Role,
    /// When the subscription was opened.
    pub connected_at: DateTime<Utc>,
    sender: Mutex<Option<mpsc::Sender<OutboundEvent>>>,
}

impl Connection {
    fn new(client_id: &str, role: Role, sender: mpsc::Sender<OutboundEvent>) -> Self {
        Self {
            id: Uuid::now_v7(),
            client_id: client_id.to_owned(),
            role,
            connected_at: Utc::now(),
            sender: Mutex::new(Some(sender)),
        }
    }

    /// Push an event to this connection without blocking.
    ///
    /// Fails if the subscriber has gone away or its channel is full; in
    /// either case the connection is considered dead.
    pub fn push(&self, event: OutboundEvent) -> Result<(), DeliveryError> {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(DeliveryError::Closed {
                client_id: self.client_id.clone(),
            });
        };
        sender.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Backlogged {
                client_id: self.client_id.clone(),
            },
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed {
                client_id: self.client_id.clone(),
            },
        })
    }

    /// Drop the sender half, which ends the subscriber's receive loop.
    pub fn close(&self) {
        let _ = self.sender.lock().take();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Stats
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of registry occupancy for the stats endpoint.
///
/// `connections_by_role` includes the synthetic `All` bucket, so the
/// bucket values intentionally sum to more than `total_connections`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    /// Number of live connections (one per client).
    pub total_connections: usize,
    /// Per-bucket connection counts, `All` bucket included.
    pub connections_by_role: BTreeMap<String, usize>,
}

// ─────────────────────────────────────────────────────────────────────────────
// ConnectionRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// Concurrent registry of live subscriptions.
#[derive(Debug)]
pub struct ConnectionRegistry {
    by_client: DashMap<String, Arc<Connection>>,
    by_role: DashMap<RoleGroup, Vec<Arc<Connection>>>,
    channel_capacity: usize,
}

impl ConnectionRegistry {
    /// Create a registry whose subscription channels hold `channel_capacity`
    /// undelivered events before a push fails.
    #[must_use]
    pub fn new(channel_capacity: usize) -> Self {
        let by_role = DashMap::new();
        let _ = by_role.insert(RoleGroup::All, Vec::new());
        for role in Role::ALL {
            let _ = by_role.insert(RoleGroup::from(role), Vec::new());
        }
        Self {
            by_client: DashMap::new(),
            by_role,
            channel_capacity,
        }
    }

    /// Register a new connection for `client_id` under `role`.
    ///
    /// A "connected" acknowledgement is pushed before the connection is
    /// published to the indexes; if that push fails the registration is
    /// abandoned and `None` is returned. A prior connection for the same
    /// client is superseded: detached from every bucket and closed.
    pub fn register(
        &self,
        client_id: &str,
        role: Role,
    ) -> Option<(Arc<Connection>, mpsc::Receiver<OutboundEvent>)> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let conn = Arc::new(Connection::new(client_id, role, tx));

        if let Err(err) = conn.push(OutboundEvent::connected_ack(client_id)) {
            warn!(%client_id, %err, "connected ack failed, abandoning registration");
            conn.close();
            return None;
        }

        if let Some(prior) = self
            .by_client
            .insert(client_id.to_owned(), Arc::clone(&conn))
        {
            self.detach_from_buckets(&prior);
            prior.close();
            counter!(SSE_DISCONNECTIONS_TOTAL, "reason" => "superseded").increment(1);
            debug!(%client_id, prior_id = %prior.id, "superseded existing connection");
        }

        self.attach_to_buckets(&conn);
        counter!(SSE_CONNECTIONS_TOTAL).increment(1);
        self.record_active();
        debug!(%client_id, %role, conn_id = %conn.id, "connection registered");
        Some((conn, rx))
    }

    /// Remove a connection from both indexes and close its channel.
    ///
    /// Guarded by the connection's unique id: removing a connection that
    /// has already been superseded or removed is a no-op, so double
    /// removal (dispatcher prune racing subscriber teardown) is safe.
    pub fn remove(&self, conn: &Connection) {
        let removed = self
            .by_client
            .remove_if(&conn.client_id, |_, stored| stored.id == conn.id)
            .is_some();
        self.detach_from_buckets(conn);
        conn.close();
        if removed {
            counter!(SSE_DISCONNECTIONS_TOTAL, "reason" => "removed").increment(1);
            self.record_active();
            let connected_secs = Utc::now()
                .signed_duration_since(conn.connected_at)
                .num_seconds();
            debug!(
                client_id = %conn.client_id,
                conn_id = %conn.id,
                connected_secs,
                "connection removed"
            );
        }
    }

    /// Look up the live connection for a client, if any.
    #[must_use]
    pub fn lookup(&self, client_id: &str) -> Option<Arc<Connection>> {
        self.by_client.get(client_id).map(|entry| Arc::clone(&entry))
    }

    /// Snapshot the connections in a role bucket.
    ///
    /// Returns a cloned `Vec` so fan-out iterates without holding any
    /// registry lock.
    #[must_use]
    pub fn lookup_group(&self, group: RoleGroup) -> Vec<Arc<Connection>> {
        self.by_role
            .get(&group)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_client.len()
    }

    /// Whether no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }

    /// Occupancy snapshot for the stats endpoint.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let connections_by_role = self
            .by_role
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().len()))
            .collect();
        RegistryStats {
            total_connections: self.by_client.len(),
            connections_by_role,
        }
    }

    /// Close every connection and clear both indexes (server shutdown).
    pub fn close_all(&self) {
        for entry in &self.by_client {
            entry.value().close();
        }
        self.by_client.clear();
        for mut bucket in self.by_role.iter_mut() {
            bucket.clear();
        }
        self.record_active();
        debug!("all connections closed");
    }

    fn attach_to_buckets(&self, conn: &Arc<Connection>) {
        self.by_role
            .entry(RoleGroup::from(conn.role))
            .or_default()
            .push(Arc::clone(conn));
        self.by_role
            .entry(RoleGroup::All)
            .or_default()
            .push(Arc::clone(conn));
    }

    fn detach_from_buckets(&self, conn: &Connection) {
        for group in [RoleGroup::from(conn.role), RoleGroup::All] {
            if let Some(mut bucket) = self.by_role.get_mut(&group) {
                bucket.retain(|c| c.id != conn.id);
            }
        }
    }

    fn record_active(&self) {
        #[allow(clippy::cast_precision_loss)]
        gauge!(SSE_CONNECTIONS_ACTIVE).set(self.by_client.len() as f64);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
