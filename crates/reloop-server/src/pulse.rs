//! Liveness pulse: periodic heartbeat broadcast.
//!
//! The pulse serves two purposes: it keeps intermediaries (proxies,
//! load balancers) from idling out quiet subscriptions, and it doubles
//! as garbage collection — a heartbeat push to a dead connection fails
//! and the dispatcher prunes it, so the registry converges on live
//! connections within one period even when disconnects go unnoticed.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use reloop_core::events::OutboundEvent;

use crate::dispatcher::EventDispatcher;
use crate::metrics::HEARTBEATS_TOTAL;

/// Spawn the heartbeat task, broadcasting every `period`.
///
/// The returned handle is aborted at shutdown; the task itself never
/// exits on its own.
pub fn spawn_pulse(dispatcher: Arc<EventDispatcher>, period: Duration) -> JoinHandle<()> {
    info!(period_secs = period.as_secs(), "starting liveness pulse");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so the first
        // heartbeat lands one full period after startup.
        let _ = ticker.tick().await;
        loop {
            let _ = ticker.tick().await;
            let delivered = dispatcher.broadcast(&OutboundEvent::heartbeat());
            counter!(HEARTBEATS_TOTAL).increment(1);
            debug!(delivered, "heartbeat broadcast");
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
