//! # reloop-server
//!
//! Real-time event fan-out service for the reloop platform: clients
//! subscribe over Server-Sent Events and backend producers push
//! notifications to a single client, a role group, or everyone.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`registry`] | Live subscription indexes (by client, by role bucket) |
//! | [`dispatcher`] | Audience resolution and fire-and-forget fan-out |
//! | [`pulse`] | Periodic heartbeat broadcast and dead-connection sweep |
//! | [`routes`] | HTTP surface: subscribe, stats, test, health, metrics |
//! | [`state`] | Shared handler state |
//! | [`metrics`] | Prometheus recorder and metric names |

#![deny(unsafe_code)]

pub mod dispatcher;
pub mod metrics;
pub mod pulse;
pub mod registry;
pub mod routes;
pub mod state;

pub use dispatcher::EventDispatcher;
pub use registry::{Connection, ConnectionRegistry, RegistryStats};
pub use routes::router;
pub use state::AppState;
