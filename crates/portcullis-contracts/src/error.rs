//! Runtime error types for the portcullis authorization session.
//!
//! Only remote and I/O failures become errors. Permission-key parsing and
//! storage decoding never fail; they degrade to safe defaults instead.
//!
//! Every variant carries owned strings so the error is `Clone`: a single
//! in-flight authorization fetch is shared by all of its waiters, and each
//! of them receives its own copy of the outcome.

use thiserror::Error;

/// The unified error type for the portcullis crates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortcullisError {
    /// The credential is missing, expired or rejected by the identity source.
    ///
    /// Callers treat this as the end of the session and force a logout.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// The identity source answered with a non-success HTTP status.
    #[error("request failed with status {status}: {reason}")]
    Http { status: u16, reason: String },

    /// The response envelope carried a non-zero `status_code`.
    #[error("request rejected (status_code {status_code}): {reason}")]
    Rejected { status_code: i64, reason: String },

    /// The response envelope had no `data` member.
    #[error("response from '{endpoint}' is missing its payload")]
    MissingPayload { endpoint: String },

    /// The request never produced a usable response (network, timeout, decode).
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The username/password pair was not accepted.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// The durable key-value store could not be read or written.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl PortcullisError {
    /// True when the failure means the credential itself is no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, PortcullisError::Unauthorized { .. })
    }
}

/// Convenience alias used throughout the portcullis crates.
pub type PortcullisResult<T> = Result<T, PortcullisError>;
