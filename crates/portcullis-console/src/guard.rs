//! The navigation guard run before every view change.
//!
//! Decision order for a navigation to `to`:
//!
//! 1. Unknown path → `NotFound`.
//! 2. Route needs auth and there is no token → redirect to `/login`.
//! 3. `/login` while holding a token → redirect to `/`.
//! 4. Route needs auth and authorization is not loaded yet → `load_authz`.
//!    A failed load is fatal to the session: logout, redirect to `/login`.
//! 5. Route names a permission the session lacks → redirect to
//!    `/forbidden?from=<to>` (unless already going to `/forbidden`).
//! 6. Otherwise proceed.

use std::fmt;

use tracing::{debug, info, warn};

use portcullis_core::AuthzSession;

use crate::routes::{RouteTable, FORBIDDEN_PATH, HOME_PATH, LOGIN_PATH};

/// What the router should do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Render the named route.
    Proceed { route: String },
    /// Go somewhere else instead. `from` records the blocked target.
    Redirect { path: String, from: Option<String> },
    NotFound,
}

impl Navigation {
    fn redirect(path: &str) -> Self {
        Navigation::Redirect {
            path: path.to_string(),
            from: None,
        }
    }
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Navigation::Proceed { route } => write!(f, "proceed to '{}'", route),
            Navigation::Redirect { path, from: None } => write!(f, "redirect to {}", path),
            Navigation::Redirect {
                path,
                from: Some(from),
            } => write!(f, "redirect to {}?from={}", path, from),
            Navigation::NotFound => f.write_str("not found"),
        }
    }
}

pub struct NavigationGuard<'a> {
    session: &'a AuthzSession,
    routes: &'a RouteTable,
}

impl<'a> NavigationGuard<'a> {
    pub fn new(session: &'a AuthzSession, routes: &'a RouteTable) -> Self {
        Self { session, routes }
    }

    pub async fn before_each(&self, to: &str) -> Navigation {
        let Some(route) = self.routes.resolve(to) else {
            debug!(to, "no route matches navigation target");
            return Navigation::NotFound;
        };

        let authenticated = self.session.is_authenticated();
        if route.requires_auth && !authenticated {
            info!(to, "navigation requires login");
            return Navigation::redirect(LOGIN_PATH);
        }
        if route.path == LOGIN_PATH && authenticated {
            return Navigation::redirect(HOME_PATH);
        }

        if route.requires_auth && !self.session.is_loaded() {
            if let Err(err) = self.session.load_authz().await {
                warn!(to, error = %err, "authorization load failed; logging out");
                self.session.logout();
                return Navigation::redirect(LOGIN_PATH);
            }
            if !self.session.is_authenticated() {
                // Logged out while the load was in flight.
                return Navigation::redirect(LOGIN_PATH);
            }
        }

        if let Some(permission) = route.permission.as_deref() {
            if !self.session.has_permission(Some(permission)) && route.path != FORBIDDEN_PATH {
                info!(to, permission, "navigation forbidden");
                return Navigation::Redirect {
                    path: FORBIDDEN_PATH.to_string(),
                    from: Some(to.to_string()),
                };
            }
        }

        Navigation::Proceed {
            route: route.name.clone(),
        }
    }
}
