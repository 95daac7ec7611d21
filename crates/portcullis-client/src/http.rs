//! `IdentitySource` over the admin REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use portcullis_contracts::{
    error::{PortcullisError, PortcullisResult},
    identity::{LoginRequest, LoginResponse},
    policy::AuthzInfo,
};
use portcullis_core::traits::IdentitySource;

use crate::envelope::{status_error, ApiResponse};

pub const LOGIN_PATH: &str = "/admin/login";
pub const AUTHZ_ME_PATH: &str = "/admin/authz/me";

/// Talks to `{base_url}{prefix}/admin/...` with bearer-token auth.
#[derive(Debug, Clone)]
pub struct HttpIdentitySource {
    client: reqwest::Client,
    base: String,
}

impl HttpIdentitySource {
    /// Build a client for `base_url` + `prefix` with a per-request `timeout`.
    pub fn new(base_url: &str, prefix: &str, timeout: Duration) -> PortcullisResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortcullisError::ConfigError {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base: join_base(base_url, prefix),
        })
    }

    /// The URL every endpoint path is appended to.
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> PortcullisResult<T> {
        let response = request.send().await.map_err(|e| {
            warn!(endpoint, error = %e, "request did not complete");
            PortcullisError::Transport {
                reason: format!("{} request failed: {}", endpoint, e),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint, status = status.as_u16(), "request returned error status");
            return Err(status_error(status.as_u16(), status.canonical_reason()));
        }

        let envelope: ApiResponse<T> =
            response.json().await.map_err(|e| PortcullisError::Transport {
                reason: format!("{} body could not be decoded: {}", endpoint, e),
            })?;
        envelope.into_data(endpoint)
    }
}

/// Join the server origin and API prefix without doubling slashes.
fn join_base(base_url: &str, prefix: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, prefix)
    }
}

#[async_trait]
impl IdentitySource for HttpIdentitySource {
    async fn login(&self, request: &LoginRequest) -> PortcullisResult<LoginResponse> {
        debug!(username = %request.username, "sending login request");
        let builder = self.client.post(self.url(LOGIN_PATH)).json(request);
        self.send(builder, LOGIN_PATH).await
    }

    async fn authorization_info(&self, token: &str) -> PortcullisResult<AuthzInfo> {
        debug!("fetching authorization info");
        let builder = self.client.get(self.url(AUTHZ_ME_PATH)).bearer_auth(token);
        self.send(builder, AUTHZ_ME_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_base_handles_slashes() {
        assert_eq!(join_base("http://h:8080/", "/api/v1"), "http://h:8080/api/v1");
        assert_eq!(join_base("http://h:8080", "api/v1/"), "http://h:8080/api/v1");
        assert_eq!(join_base("http://h:8080", ""), "http://h:8080");
    }

    #[test]
    fn endpoint_urls() {
        let source =
            HttpIdentitySource::new("http://h:8080", "/api/v1", Duration::from_secs(10)).unwrap();
        assert_eq!(source.url(LOGIN_PATH), "http://h:8080/api/v1/admin/login");
        assert_eq!(source.url(AUTHZ_ME_PATH), "http://h:8080/api/v1/admin/authz/me");
    }
}
