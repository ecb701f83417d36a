//! Error types for the vault adapter and its backends
//!
//! "Not found" is deliberately absent from both enums: a missing entry is a
//! normal answer and travels as `Option::None`.

use thiserror::Error;

/// Failures reported by a secret store backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Secret rejected as too long: {0}")]
    TooLong(String),

    #[error("Stored entry is corrupt: {0}")]
    Corrupt(String),

    #[error("Enumeration is not supported by this backend")]
    Unsupported,

    #[error("Platform failure: {0}")]
    Platform(String),
}

/// Vault adapter errors
#[derive(Error, Debug)]
pub enum VaultError {
    /// The configured backend could not be set up
    #[error("Failed to open {backend} backend")]
    Open {
        backend: &'static str,
        source: BackendError,
    },

    /// Store or remove was rejected by the backend
    #[error("Failed to write passphrase for {resource}")]
    Write {
        resource: String,
        source: BackendError,
    },

    /// Read failed for a reason other than absence
    #[error("Failed to read passphrase for {resource}")]
    Read {
        resource: String,
        source: BackendError,
    },

    /// The backend's listing primitive itself failed
    #[error("Failed to enumerate namespace {namespace}")]
    Enumeration {
        namespace: String,
        source: BackendError,
    },

    #[error("Backend '{0}' cannot enumerate stored entries")]
    EnumerationUnsupported(&'static str),

    #[error("Invalid resource identifier: {0}")]
    InvalidIdentifier(String),
}

impl VaultError {
    /// The backend error underneath, if any
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            VaultError::Open { source, .. }
            | VaultError::Write { source, .. }
            | VaultError::Read { source, .. }
            | VaultError::Enumeration { source, .. } => Some(source),
            VaultError::EnumerationUnsupported(_) | VaultError::InvalidIdentifier(_) => None,
        }
    }

    /// Whether retrying later could plausibly succeed.
    ///
    /// The adapter never retries on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self.backend_error(), Some(BackendError::Unavailable(_)))
    }
}
