//! # portcullis-console
//!
//! Reference runtime for a shop admin console built on portcullis.
//!
//! - [`config::ConsoleConfig`] — TOML configuration, and assembly of an
//!   `AuthzSession` over the configured identity source and file store.
//! - [`routes::RouteTable`] — the console's views and their permissions.
//! - [`guard::NavigationGuard`] — the per-navigation check that loads
//!   authorization lazily and fails closed.
//! - [`fixture::FixtureIdentitySource`] — offline admins and roles from TOML.

pub mod config;
pub mod fixture;
pub mod guard;
pub mod routes;

pub use config::ConsoleConfig;
pub use fixture::FixtureIdentitySource;
pub use guard::{Navigation, NavigationGuard};
pub use routes::{Route, RouteTable};

// ── Tests ─────────────────────────────────────────────────────────────────────
