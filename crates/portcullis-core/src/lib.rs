//! # portcullis-core
//!
//! The client-side authorization session for an admin console.
//!
//! This crate provides:
//! - The two collaborator traits (`IdentitySource`, `DurableStore`)
//! - The durable storage schema shared by every store implementation
//! - `AuthzSession`, which owns the token and permission cache and answers
//!   `has_permission` queries
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portcullis_core::{AuthzSession, traits::{IdentitySource, DurableStore}};
//!
//! let session = AuthzSession::new(source, store);
//! session.hydrate();
//! session.login(&request).await?;
//! assert!(session.has_permission(Some("GET:/admin/orders")));
//! ```

pub mod session;
pub mod storage;
pub mod traits;

pub use session::AuthzSession;
