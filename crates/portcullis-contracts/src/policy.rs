//! Policy grants and the authorization payload.
//!
//! The identity source answers "what may the current admin do" with an
//! `AuthzInfo`. Decoding is lenient: absent members default to empty rather
//! than failing the whole payload.

use serde::{Deserialize, Serialize};

/// A single grant: `role` may perform `action` on `object`.
///
/// `object` is a resource path and may carry `*` wildcards or `:name` path
/// parameters. `action` is an HTTP method or `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Policy {
    /// The role (policy subject) holding the grant. The admin API calls this
    /// field `subject`.
    #[serde(default, alias = "subject")]
    pub role: String,
    /// The resource path the grant covers.
    #[serde(default)]
    pub object: String,
    /// The permitted action.
    #[serde(default)]
    pub action: String,
}

impl Policy {
    /// Construct a policy from any string-like values.
    pub fn new(
        role: impl Into<String>,
        object: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            object: object.into(),
            action: action.into(),
        }
    }
}

/// The "my authorization info" payload returned for an authenticated admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthzInfo {
    /// Numeric admin id, when the source reports one.
    #[serde(default)]
    pub admin_id: Option<i64>,
    /// Superuser bypass: every permission check succeeds.
    #[serde(default)]
    pub is_super: bool,
    /// Role names held by the admin.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Every grant reachable through the admin's roles. May contain duplicates.
    #[serde(default)]
    pub policies: Vec<Policy>,
}
