//! Collaborator traits for the authorization session.
//!
//! - `IdentitySource` — the remote authority that issues tokens and answers
//!   "what may this admin do". Untrusted transport; every failure propagates.
//! - `DurableStore` — a small synchronous key-value store that mirrors the
//!   session across restarts. Secondary to in-memory state.

use async_trait::async_trait;

use portcullis_contracts::{
    error::PortcullisResult,
    identity::{LoginRequest, LoginResponse},
    policy::AuthzInfo,
};

/// The remote identity and authorization authority.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, request: &LoginRequest) -> PortcullisResult<LoginResponse>;

    /// Fetch the roles, superuser flag and policies of the admin owning `token`.
    ///
    /// This is the only data source for the permission cache.
    async fn authorization_info(&self, token: &str) -> PortcullisResult<AuthzInfo>;
}

/// A durable string key-value store (the browser-local-storage analogue).
///
/// Each key is independent; no transactional guarantee is required.
pub trait DurableStore: Send + Sync {
    /// Read `key`. A missing key is `Ok(None)`.
    fn get(&self, key: &str) -> PortcullisResult<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> PortcullisResult<()>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> PortcullisResult<()>;
}
