//! The admin console route table.
//!
//! Every view under `/` requires a logged-in admin, and most also require
//! the `GET` permission on the API collection they display.

use portcullis_core::AuthzSession;
use portcullis_policy::ObjectPattern;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";
pub const FORBIDDEN_PATH: &str = "/forbidden";

/// One navigable view.
#[derive(Debug, Clone)]
pub struct Route {
    pub path: String,
    pub name: String,
    pub requires_auth: bool,
    /// Permission key required to enter, e.g. `GET:/admin/orders`.
    pub permission: Option<String>,
    pattern: ObjectPattern,
}

impl Route {
    /// A route anyone may visit.
    pub fn public(path: &str, name: &str) -> Self {
        Self {
            path: path.to_string(),
            name: name.to_string(),
            requires_auth: false,
            permission: None,
            pattern: ObjectPattern::compile_route(path),
        }
    }

    /// A route that needs a logged-in admin and, optionally, a permission.
    pub fn authenticated(path: &str, name: &str, permission: Option<&str>) -> Self {
        Self {
            requires_auth: true,
            permission: permission.map(str::to_string),
            ..Self::public(path, name)
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The views of the shop admin console.
    pub fn admin_console() -> Self {
        // (path, name, permission)
        const VIEWS: &[(&str, &str, Option<&str>)] = &[
            ("/", "dashboard-home", None),
            ("/forbidden", "forbidden", None),
            ("/products", "products", Some("GET:/admin/products")),
            ("/categories", "categories", Some("GET:/admin/categories")),
            ("/card-secrets", "card-secrets", Some("GET:/admin/card-secrets")),
            ("/orders", "orders", Some("GET:/admin/orders")),
            ("/payments", "payments", Some("GET:/admin/payments")),
            ("/payment-channels", "payment-channels", Some("GET:/admin/payment-channels")),
            ("/users", "users", Some("GET:/admin/users")),
            ("/user-login-logs", "user-login-logs", Some("GET:/admin/user-login-logs")),
            ("/users/:id", "user-detail", Some("GET:/admin/users/:id")),
            ("/posts", "posts", Some("GET:/admin/posts")),
            ("/banners", "banners", Some("GET:/admin/banners")),
            ("/coupons", "coupons", Some("GET:/admin/coupons")),
            ("/promotions", "promotions", Some("GET:/admin/promotions")),
            ("/settings", "settings", Some("GET:/admin/settings")),
            ("/authz", "authz", Some("GET:/admin/authz/roles")),
            ("/authz-audit-logs", "authz-audit-logs", Some("GET:/admin/authz/audit-logs")),
        ];

        let mut routes = vec![Route::public(LOGIN_PATH, "login")];
        routes.extend(
            VIEWS
                .iter()
                .map(|(path, name, permission)| Route::authenticated(path, name, *permission)),
        );
        Self::new(routes)
    }

    /// Find the route for a concrete path. Query string, fragment and a
    /// trailing slash are ignored.
    pub fn resolve(&self, target: &str) -> Option<&Route> {
        let path = route_path(target);
        self.routes.iter().find(|r| r.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Authenticated routes the session may enter, for building menus.
    pub fn accessible<'a>(&'a self, session: &'a AuthzSession) -> impl Iterator<Item = &'a Route> {
        self.routes
            .iter()
            .filter(|r| r.requires_auth)
            .filter(move |r| session.has_permission(r.permission.as_deref()))
    }
}

/// Strip query string, fragment and trailing slash from a navigation target.
pub(crate) fn route_path(target: &str) -> &str {
    let end = target.find(|c: char| c == '?' || c == '#').unwrap_or(target.len());
    let path = &target[..end];
    match path.trim_end_matches('/') {
        "" => HOME_PATH,
        trimmed => trimmed,
    }
}
