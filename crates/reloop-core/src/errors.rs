//! Error types for the fan-out core.
//!
//! Nothing in the fan-out path is fatal: every failure degrades to "this
//! one connection is now considered gone" and is handled by pruning the
//! connection from the registry. [`DeliveryError`] exists so the registry
//! and dispatcher can distinguish the two push failure modes in logs and
//! metrics; it never propagates to a publisher.

use thiserror::Error;

/// Why a push to a single connection failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The peer is gone — the receiving side of the channel was dropped.
    #[error("connection closed for client {client_id}")]
    Closed {
        /// Client whose connection was closed.
        client_id: String,
    },

    /// The per-connection buffer is saturated. A peer that cannot drain
    /// its channel is treated the same as a dead one: delivery is
    /// at-most-once, so dropping the connection is safe.
    #[error("connection backlogged for client {client_id}")]
    Backlogged {
        /// Client whose connection was backlogged.
        client_id: String,
    },
}

impl DeliveryError {
    /// Machine-readable code, used as a metrics label.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::Backlogged { .. } => "backlogged",
        }
    }

    /// Client id the failed push was addressed to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        match self {
            Self::Closed { client_id } | Self::Backlogged { client_id } => client_id,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
