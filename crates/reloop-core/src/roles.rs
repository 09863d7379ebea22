//! Subscriber roles and target-audience resolution.
//!
//! A subscriber connects under exactly one [`Role`] and implicitly joins
//! the synthetic `All` group, so every connection lives in two delivery
//! buckets ([`RoleGroup`]). Outbound events carry a single untyped
//! audience string; [`TargetAudience::parse`] turns it into a typed
//! selector with a fixed precedence:
//!
//! 1. `"all"` (any casing) → everyone
//! 2. one or more decimal digits → a single client id
//! 3. anything else → a role tag
//!
//! The ordering matters: role tags are fixed alphabetic words, so a
//! purely numeric string can only ever be a client id, but the audience
//! arrives as one shared string and must be disambiguated in this order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Subscriber category used for group delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A resident reporting waste and receiving pickup updates.
    Citizen,
    /// A collector fulfilling pickup tasks.
    Collector,
    /// An enterprise processing collected waste.
    Enterprise,
    /// A platform moderator.
    Admin,
}

impl Role {
    /// All role variants, in declaration order.
    pub const ALL: [Role; 4] = [Role::Citizen, Role::Collector, Role::Enterprise, Role::Admin];

    /// Canonical tag string for this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "Citizen",
            Self::Collector => "Collector",
            Self::Enterprise => "Enterprise",
            Self::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known role tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role tag: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Case-insensitive role tag parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownRole(s.to_owned()))
    }
}

/// A delivery bucket in the connection registry.
///
/// Every connection is inserted into exactly two buckets at registration
/// time: its declared role and [`RoleGroup::All`]. `All` is an ordinary
/// bucket on purpose — broadcast and stats share the same structure as
/// role-scoped delivery, at the cost of per-bucket counts summing to
/// more than the total connection count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleGroup {
    /// The synthetic group every connection belongs to.
    All,
    /// A single role's bucket.
    Role(Role),
}

impl RoleGroup {
    /// Canonical tag string for this bucket.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Role(role) => role.as_str(),
        }
    }
}

impl fmt::Display for RoleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Role> for RoleGroup {
    fn from(role: Role) -> Self {
        Self::Role(role)
    }
}

/// Typed target-audience selector, resolved from the wire string once
/// per dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetAudience {
    /// Every registered connection.
    Everyone,
    /// One specific client id.
    Client(String),
    /// One role group, kept as the raw tag — an unknown tag resolves to
    /// an empty connection set downstream, not an error.
    RoleTag(String),
}

impl TargetAudience {
    /// Parse an audience string with the fixed precedence described in
    /// the module docs.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("all") {
            Self::Everyone
        } else if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Self::Client(raw.to_owned())
        } else {
            Self::RoleTag(raw.to_owned())
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
