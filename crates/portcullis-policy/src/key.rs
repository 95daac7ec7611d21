//! Permission key normalization.
//!
//! A permission key is the canonical string `ACTION:OBJECT`:
//!
//! - `ACTION` is trimmed and upper-cased.
//! - `OBJECT` is an absolute path with the API version prefix removed.
//!
//! Parsing never fails. A key without a colon, or with the colon in first
//! position, becomes the sentinel `*:/`, which only an equally degenerate
//! grant can satisfy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The versioned API prefix stripped from every object path.
pub const API_PREFIX: &str = "/api/v1";

/// Action value that matches every action when it appears in a grant.
pub const ANY_ACTION: &str = "*";

/// Canonicalize a resource path.
///
/// ```rust
/// use portcullis_policy::key::normalize_object_path;
///
/// assert_eq!(normalize_object_path(""), "/");
/// assert_eq!(normalize_object_path("/api/v1"), "/");
/// assert_eq!(normalize_object_path("/api/v1/admin/x"), "/admin/x");
/// assert_eq!(normalize_object_path("admin/x"), "/admin/x");
/// ```
pub fn normalize_object_path(path: &str) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() || trimmed == API_PREFIX {
        return "/".to_string();
    }
    if let Some(rest) = trimmed.strip_prefix(API_PREFIX) {
        if rest.starts_with('/') {
            return rest.to_string();
        }
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

/// Canonicalize an action: trimmed, upper-cased.
pub fn normalize_action(action: &str) -> String {
    action.trim().to_uppercase()
}

/// Build the canonical key for an `(action, object)` pair.
///
/// An empty action is kept empty here; such a key parses back to the
/// sentinel.
pub fn build_key(action: &str, object: &str) -> String {
    format!("{}:{}", normalize_action(action), normalize_object_path(object))
}

/// The two halves of a permission key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionKey {
    pub action: String,
    pub object: String,
}

impl PermissionKey {
    /// Build a key from its halves, normalizing both.
    pub fn new(action: &str, object: &str) -> Self {
        Self {
            action: normalize_action(action),
            object: normalize_object_path(object),
        }
    }

    /// The sentinel produced for malformed input.
    pub fn sentinel() -> Self {
        Self {
            action: ANY_ACTION.to_string(),
            object: "/".to_string(),
        }
    }

    /// Split `key` on its first colon. Malformed keys yield [`PermissionKey::sentinel`].
    ///
    /// Only the first colon separates action from object, so path templates
    /// such as `GET:/admin/users/:id` keep their parameter markers.
    pub fn parse(key: &str) -> Self {
        match key.find(':') {
            Some(idx) if idx > 0 => Self::new(&key[..idx], &key[idx + 1..]),
            _ => Self::sentinel(),
        }
    }

    /// True when this key grants every action.
    pub fn is_any_action(&self) -> bool {
        self.action == ANY_ACTION
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.action, self.object)
    }
}

/// Free-function form of [`PermissionKey::parse`].
pub fn parse_key(key: &str) -> PermissionKey {
    PermissionKey::parse(key)
}
