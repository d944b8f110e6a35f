//! Secret retrieval from a single configured backend
//!
//! A [`SecretsClient`] maps a symbolic secret ID to a backend location with a
//! mapping template, then fetches the raw value from exactly one backend:
//!
//! - **Vault**: authenticates once at construction (token, App-ID, App-ID with
//!   a User-ID file, or AppRole), with configurable retries, then reads secrets
//!   with the session token
//! - **Environment variables**: the location is a variable name
//! - **JSON file**: the location is a key in one flat JSON object
//!
//! # Example
//!
//! ```rust,ignore
//! use pvc::{SecretsClient, VaultAuth};
//!
//! let client = SecretsClient::builder()
//!     .mapping("secret/myapp/{{ .ID }}")
//!     .vault_backend()
//!     .vault_host("https://vault.example.com:8200")
//!     .vault_authentication(VaultAuth::app_role("5c2b7f0e"))
//!     .vault_auth_retries(3)
//!     .vault_auth_retry_delay_secs(2)
//!     .build()?;
//!
//! let password = client.get("db_password")?;
//! ```
//!
//! # Features
//!
//! - `vault` (default): Enable the Vault backend
//! - `env` (default): Enable the environment variable backend
//! - `json-file` (default): Enable the JSON file backend

mod backends;
mod builder;
mod client;
mod config;
mod definition;
mod error;
mod mapper;

pub use backends::SecretBackend;
pub use builder::SecretsClientBuilder;
pub use client::SecretsClient;
pub use config::{
    BackendConfig, BackendKind, ClientConfig, JsonFileConfig, VaultAuth, VaultConfig,
    DEFAULT_TIMEOUT_SECS, DEFAULT_VALUE_FIELD,
};
pub use definition::SecretDefinition;
pub use error::SecretError;
pub use mapper::SecretMapper;

// Backend types for callers wiring their own transport or tests
#[cfg(feature = "env")]
pub use backends::env::EnvVarBackend;
#[cfg(feature = "json-file")]
pub use backends::json_file::JsonFileBackend;

#[cfg(feature = "vault")]
pub mod vault {
    pub use crate::backends::vault::{RetryPolicy, VaultBackend};
    pub use crate::backends::vault_api::{HttpVaultApi, VaultApi};
}
