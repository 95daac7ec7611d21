//! Offline identity source backed by a TOML fixture.
//!
//! Lets the console run against a fixed set of admins and roles without a
//! backend. Tokens are opaque strings of the form `fixture.<admin id>.<nonce>`
//! and are accepted for as long as the admin exists in the fixture.
//!
//! ```toml
//! [[roles]]
//! name = "operator"
//! policies = [
//!     { object = "/admin/orders", action = "GET" },
//!     { object = "/admin/users/:id", action = "GET" },
//! ]
//!
//! [[admins]]
//! id = 2
//! username = "ops"
//! password = "ops-pass"
//! roles = ["operator"]
//! ```

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use portcullis_contracts::{
    error::{PortcullisError, PortcullisResult},
    identity::{AdminUser, LoginRequest, LoginResponse},
    policy::{AuthzInfo, Policy},
};
use portcullis_core::traits::IdentitySource;

const TOKEN_PREFIX: &str = "fixture";

/// Hours a fixture token is reported valid for.
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureGrant {
    pub object: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureRole {
    pub name: String,
    #[serde(default)]
    pub policies: Vec<FixtureGrant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureAdmin {
    pub id: i64,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_super: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    roles: Vec<FixtureRole>,
    #[serde(default)]
    admins: Vec<FixtureAdmin>,
}

#[derive(Debug)]
pub struct FixtureIdentitySource {
    roles: HashMap<String, FixtureRole>,
    admins: Vec<FixtureAdmin>,
}

impl FixtureIdentitySource {
    pub fn from_toml_str(s: &str) -> PortcullisResult<Self> {
        let file: FixtureFile = toml::from_str(s).map_err(|e| PortcullisError::ConfigError {
            reason: format!("failed to parse fixture TOML: {}", e),
        })?;
        Ok(Self {
            roles: file
                .roles
                .into_iter()
                .map(|role| (role.name.clone(), role))
                .collect(),
            admins: file.admins,
        })
    }

    pub fn from_file(path: &Path) -> PortcullisResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PortcullisError::ConfigError {
            reason: format!("failed to read fixture file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn admin_for_token(&self, token: &str) -> Option<&FixtureAdmin> {
        let mut parts = token.splitn(3, '.');
        if parts.next() != Some(TOKEN_PREFIX) {
            return None;
        }
        let id: i64 = parts.next()?.parse().ok()?;
        parts.next().filter(|nonce| !nonce.is_empty())?;
        self.admins.iter().find(|a| a.id == id)
    }

    fn policies_for(&self, admin: &FixtureAdmin) -> Vec<Policy> {
        let mut policies = Vec::new();
        for role_name in &admin.roles {
            let Some(role) = self.roles.get(role_name) else {
                warn!(username = %admin.username, role = %role_name, "fixture admin references unknown role");
                continue;
            };
            policies.extend(
                role.policies
                    .iter()
                    .map(|g| Policy::new(role_name.as_str(), g.object.as_str(), g.action.as_str())),
            );
        }
        policies
    }
}

#[async_trait]
impl IdentitySource for FixtureIdentitySource {
    async fn login(&self, request: &LoginRequest) -> PortcullisResult<LoginResponse> {
        let admin = self
            .admins
            .iter()
            .find(|a| a.username == request.username && a.password == request.password)
            .ok_or_else(|| PortcullisError::InvalidCredentials {
                reason: format!("unknown user or wrong password for '{}'", request.username),
            })?;

        let token = format!("{}.{}.{}", TOKEN_PREFIX, admin.id, uuid::Uuid::new_v4().simple());
        let expires_at = (Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).to_rfc3339();
        debug!(username = %admin.username, "fixture login accepted");

        Ok(LoginResponse {
            token,
            user: AdminUser {
                id: admin.id,
                username: admin.username.clone(),
            },
            expires_at,
        })
    }

    async fn authorization_info(&self, token: &str) -> PortcullisResult<AuthzInfo> {
        let admin = self
            .admin_for_token(token)
            .ok_or_else(|| PortcullisError::Unauthorized {
                reason: "token not recognized".to_string(),
            })?;

        Ok(AuthzInfo {
            admin_id: Some(admin.id),
            is_super: admin.is_super,
            roles: admin.roles.clone(),
            policies: self.policies_for(admin),
        })
    }
}
