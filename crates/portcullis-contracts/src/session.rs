//! Session identity, lifecycle phase and inspection snapshot.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for one authorization session instance.
///
/// Appears on every log event the session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Create a new, unique session ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Where a session sits in its login/authorization lifecycle.
///
/// ```text
/// Unauthenticated --login--> AuthenticatedUnloaded --load_authz--> AuthenticatedLoaded
///        ^                                                              |
///        +--------------------- logout / failed load -------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unauthenticated,
    AuthenticatedUnloaded,
    AuthenticatedLoaded,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::AuthenticatedUnloaded => "authenticated (authorization not loaded)",
            SessionPhase::AuthenticatedLoaded => "authenticated",
        };
        f.write_str(label)
    }
}

/// What a call to `load_authz` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A fresh authorization payload was applied and persisted.
    Applied,
    /// There was no credential; the cache was cleared instead.
    NoCredential,
    /// The response arrived after the session moved on (logout, a new
    /// login, or a newer fetch already applied) and was dropped.
    Discarded,
}

/// A read-only copy of the authorization cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzSnapshot {
    pub is_super: bool,
    pub roles: BTreeSet<String>,
    pub permission_keys: BTreeSet<String>,
    pub loaded: bool,
    /// When the current payload was applied. `None` for hydrated or empty state.
    pub loaded_at: Option<DateTime<Utc>>,
}
