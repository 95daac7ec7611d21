//! # portcullis-client
//!
//! [`HttpIdentitySource`] implements
//! [`IdentitySource`](portcullis_core::traits::IdentitySource) against the
//! admin REST API:
//!
//! | Operation            | Request                      |
//! |----------------------|------------------------------|
//! | `login`              | `POST {prefix}/admin/login`  |
//! | `authorization_info` | `GET {prefix}/admin/authz/me` with `Authorization: Bearer` |
//!
//! Both responses arrive in the `{status_code, msg, data}` envelope decoded
//! by [`envelope::ApiResponse`].

pub mod envelope;
pub mod http;

pub use envelope::ApiResponse;
pub use http::HttpIdentitySource;

// ── Tests ─────────────────────────────────────────────────────────────────────
