//! # portcullis-policy
//!
//! Permission key normalization and grant matching for the portcullis
//! runtime.
//!
//! ## Overview
//!
//! Grants arrive as `(role, object, action)` policies. Each one is reduced
//! to a canonical `ACTION:OBJECT` key ([`key::build_key`]) and collected in
//! a [`PermissionSet`]. A required key is permitted when some grant has the
//! same action (or `*`) and an object pattern that covers the required path.
//!
//! ## Object patterns
//!
//! - `*` or `/*` grants every path.
//! - `*` inside a pattern matches any run of characters, across segments.
//! - `:name` matches exactly one non-empty path segment.
//!
//! ```rust,ignore
//! use portcullis_policy::PermissionSet;
//!
//! let set = PermissionSet::from_keys(["GET:/admin/users/:id"]);
//! assert!(set.permits("GET:/admin/users/42"));
//! assert!(!set.permits("GET:/admin/users/42/orders"));
//! ```

pub mod grants;
pub mod key;
pub mod pattern;

pub use grants::PermissionSet;
pub use key::{build_key, normalize_object_path, parse_key, PermissionKey};
pub use pattern::{match_object, ObjectPattern};

// ── Tests ─────────────────────────────────────────────────────────────────────
