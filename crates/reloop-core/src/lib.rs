//! # reloop-core
//!
//! Foundation types for the reloop real-time fan-out service.
//!
//! This crate provides the shared vocabulary the settings and server
//! crates depend on:
//!
//! - **Roles**: [`roles::Role`] subscriber categories and the
//!   [`roles::RoleGroup`] delivery buckets (each role plus the synthetic
//!   `All` group)
//! - **Audiences**: [`roles::TargetAudience`] — the single-string
//!   discriminator selecting everyone, one client, or one role group
//! - **Events**: [`events::OutboundEvent`] with kind, payload, and
//!   creation timestamp; well-known kinds in [`events::kind`]
//! - **Errors**: [`errors::DeliveryError`] for per-connection push
//!   failures
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` setup
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other reloop crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod logging;
pub mod roles;
