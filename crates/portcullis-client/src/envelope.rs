//! The admin API response envelope.
//!
//! Every endpoint wraps its payload as
//! `{ "status_code": 0, "msg": "...", "data": ... }`. List endpoints add a
//! `pagination` object, which nothing here reads and decoding ignores.
//! A missing `status_code` counts as success; `401` means the token is no
//! longer valid; any other non-zero code is a rejection.

use serde::Deserialize;

use portcullis_contracts::error::{PortcullisError, PortcullisResult};

/// Fallback message when the server rejects a request without saying why.
const REQUEST_FAILED: &str = "request failed";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status_code: Option<i64>,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload of `endpoint`, mapping envelope-level failures to errors.
    pub fn into_data(self, endpoint: &str) -> PortcullisResult<T> {
        match self.status_code {
            None | Some(0) => {}
            Some(401) => {
                return Err(PortcullisError::Unauthorized {
                    reason: message_or_default(self.msg),
                })
            }
            Some(code) => {
                return Err(PortcullisError::Rejected {
                    status_code: code,
                    reason: message_or_default(self.msg),
                })
            }
        }

        self.data.ok_or_else(|| PortcullisError::MissingPayload {
            endpoint: endpoint.to_string(),
        })
    }
}

fn message_or_default(msg: String) -> String {
    if msg.trim().is_empty() {
        REQUEST_FAILED.to_string()
    } else {
        msg
    }
}

/// Map a non-success HTTP status to an error.
pub fn status_error(status: u16, reason: Option<&str>) -> PortcullisError {
    let reason = reason.unwrap_or(REQUEST_FAILED).to_string();
    if status == 401 {
        PortcullisError::Unauthorized { reason }
    } else {
        PortcullisError::Http { status, reason }
    }
}
