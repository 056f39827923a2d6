//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. The variants deliberately separate
//! "credential invalid, user must re-authenticate" from "transport failed,
//! try again later" from "peer answered with garbage" so callers can degrade
//! to the right least-privileged outcome.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the toolgate pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential is missing, structurally invalid, or unrefreshable.
    /// Callers treat this as "unauthenticated", never as fatal.
    #[error("credential invalid: {0}")]
    CredentialInvalid(String),

    /// Network-level failure talking to an external endpoint.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Peer responded, but the body did not match the expected contract.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Input validation errors (empty tool name, bad configuration).
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors (credential file access).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn credential_invalid(msg: impl Into<String>) -> Self {
        Self::CredentialInvalid(msg.into())
    }

    pub fn malformed_response(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl Error {
    /// True for failures worth retrying later (the peer may recover),
    /// false for failures that require the user to re-authenticate or
    /// correct their input.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::MalformedResponse(_))
    }
}
