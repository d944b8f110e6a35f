use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a client or retrieving a secret
#[derive(Debug, Error)]
pub enum SecretError {
    /// Invalid client configuration (raised before any I/O)
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Mapping template could not be compiled or rendered
    #[error("Invalid mapping '{template}': {reason}")]
    Mapping { template: String, reason: String },

    /// Backend feature not compiled in
    #[error("Secret backend '{backend}' not available (feature not enabled)")]
    BackendDisabled { backend: String },

    /// Every authentication attempt failed
    #[error("Authentication failed after {attempts} attempt(s): {message}")]
    Authentication { attempts: u32, message: String },

    /// Backend request failed
    #[error("{backend} error: {message}")]
    Fetch { backend: String, message: String },

    /// Secret not found at the resolved location
    #[error("Secret not found: {0}")]
    NotFound(String),

    /// Permission/access denied
    #[error("Access denied to secret: {0}")]
    AccessDenied(String),

    /// Local secret store is malformed
    #[error("Failed to parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// File IO error
    #[error("Failed to read file '{path}': {message}")]
    File { path: PathBuf, message: String },
}

impl SecretError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a mapping error
    pub fn mapping(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Mapping {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create a backend fetch error
    pub fn fetch(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a backend disabled error
    pub fn disabled(backend: impl Into<String>) -> Self {
        Self::BackendDisabled {
            backend: backend.into(),
        }
    }

    /// Create a file error from an IO failure
    pub fn file(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// True if the secret has no value at its resolved location
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
