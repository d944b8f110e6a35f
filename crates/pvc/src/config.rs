//! Typed client configuration
//!
//! A [`ClientConfig`] can be built programmatically through
//! [`SecretsClientBuilder`](crate::SecretsClientBuilder) or loaded from TOML:
//!
//! ```toml
//! mapping = "secret/myapp/{{ .ID }}"
//!
//! [backend]
//! type = "vault"
//! host = "https://vault.example.com:8200"
//! auth_retries = 3
//! auth_retry_delay_secs = 2
//!
//! [backend.auth]
//! method = "app_role"
//! role_id = "5c2b7f0e-..."
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::SecretError;
use crate::mapper::SecretMapper;

/// Default Vault field holding the secret value
pub const DEFAULT_VALUE_FIELD: &str = "value";

/// Default timeout for a single Vault HTTP request
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The kinds of backend a client can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Vault,
    EnvVar,
    JsonFile,
}

impl BackendKind {
    /// Get the backend name for logging/errors
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Vault => "vault",
            BackendKind::EnvVar => "env",
            BackendKind::JsonFile => "json-file",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vault authentication method, carrying only the credentials it needs
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VaultAuth {
    /// Use a pre-issued token directly as the session credential
    Token { token: SecretString },

    /// App-ID login with a static User-ID
    AppId {
        app_id: String,
        user_id: SecretString,
    },

    /// App-ID login with the User-ID read from a file at authentication time
    AppIdFile { app_id: String, user_id_path: PathBuf },

    /// AppRole login
    AppRole {
        role_id: String,
        #[serde(default)]
        secret_id: Option<SecretString>,
    },
}

impl VaultAuth {
    pub fn token(token: impl Into<String>) -> Self {
        Self::Token {
            token: SecretString::from(token.into()),
        }
    }

    pub fn app_id(app_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self::AppId {
            app_id: app_id.into(),
            user_id: SecretString::from(user_id.into()),
        }
    }

    pub fn app_id_file(app_id: impl Into<String>, user_id_path: impl Into<PathBuf>) -> Self {
        Self::AppIdFile {
            app_id: app_id.into(),
            user_id_path: user_id_path.into(),
        }
    }

    pub fn app_role(role_id: impl Into<String>) -> Self {
        Self::AppRole {
            role_id: role_id.into(),
            secret_id: None,
        }
    }

    pub fn app_role_with_secret_id(
        role_id: impl Into<String>,
        secret_id: impl Into<String>,
    ) -> Self {
        Self::AppRole {
            role_id: role_id.into(),
            secret_id: Some(SecretString::from(secret_id.into())),
        }
    }

    /// Method name for logging/errors
    pub fn method_name(&self) -> &'static str {
        match self {
            VaultAuth::Token { .. } => "token",
            VaultAuth::AppId { .. } => "app-id",
            VaultAuth::AppIdFile { .. } => "app-id (user-id file)",
            VaultAuth::AppRole { .. } => "approle",
        }
    }

    /// Reject empty credential material
    fn validate(&self) -> Result<(), SecretError> {
        let empty = |field: &str| {
            SecretError::config(format!(
                "vault {} authentication requires a non-empty {}",
                self.method_name(),
                field
            ))
        };

        match self {
            VaultAuth::Token { token } if token.expose_secret().is_empty() => Err(empty("token")),
            VaultAuth::AppId { app_id, .. } if app_id.is_empty() => Err(empty("app_id")),
            VaultAuth::AppId { user_id, .. } if user_id.expose_secret().is_empty() => {
                Err(empty("user_id"))
            }
            VaultAuth::AppIdFile { app_id, .. } if app_id.is_empty() => Err(empty("app_id")),
            VaultAuth::AppIdFile { user_id_path, .. } if user_id_path.as_os_str().is_empty() => {
                Err(empty("user_id_path"))
            }
            VaultAuth::AppRole { role_id, .. } if role_id.is_empty() => Err(empty("role_id")),
            VaultAuth::AppRole {
                secret_id: Some(secret_id),
                ..
            } if secret_id.expose_secret().is_empty() => Err(empty("secret_id")),
            _ => Ok(()),
        }
    }
}

/// Vault backend settings
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://my.vault.com:8200")
    pub host: String,

    pub auth: VaultAuth,

    /// Number of retries if authentication fails
    #[serde(default)]
    pub auth_retries: u32,

    /// Delay in seconds between authentication attempts
    #[serde(default)]
    pub auth_retry_delay_secs: u64,

    /// Enterprise namespace sent as `X-Vault-Namespace`
    #[serde(default)]
    pub namespace: Option<String>,

    /// Field of the secret's data holding the value
    #[serde(default = "default_value_field")]
    pub value_field: String,

    /// Timeout for a single HTTP request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_value_field() -> String {
    DEFAULT_VALUE_FIELD.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl VaultConfig {
    /// Settings with every optional field at its default
    pub fn new(host: impl Into<String>, auth: VaultAuth) -> Self {
        Self {
            host: host.into(),
            auth,
            auth_retries: 0,
            auth_retry_delay_secs: 0,
            namespace: None,
            value_field: default_value_field(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn auth_retry_delay(&self) -> Duration {
        Duration::from_secs(self.auth_retry_delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), SecretError> {
        if self.host.trim().is_empty() {
            return Err(SecretError::config("vault backend requires a host"));
        }
        if !self.host.starts_with("http://") && !self.host.starts_with("https://") {
            return Err(SecretError::config(format!(
                "vault host '{}' must start with http:// or https://",
                self.host
            )));
        }
        if self.value_field.is_empty() {
            return Err(SecretError::config("vault value field must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(SecretError::config("vault timeout must be at least one second"));
        }
        self.auth.validate()
    }
}

/// JSON file backend settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JsonFileConfig {
    /// Path to a file holding one JSON object of name to value
    pub path: PathBuf,
}

impl JsonFileConfig {
    fn validate(&self) -> Result<(), SecretError> {
        if self.path.as_os_str().is_empty() {
            return Err(SecretError::config("json file backend requires a file location"));
        }
        Ok(())
    }
}

/// The single backend a client talks to
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    Vault(VaultConfig),
    EnvVar,
    JsonFile(JsonFileConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::Vault(_) => BackendKind::Vault,
            BackendConfig::EnvVar => BackendKind::EnvVar,
            BackendConfig::JsonFile(_) => BackendKind::JsonFile,
        }
    }

    fn validate(&self) -> Result<(), SecretError> {
        match self {
            BackendConfig::Vault(vault) => vault.validate(),
            BackendConfig::EnvVar => Ok(()),
            BackendConfig::JsonFile(file) => file.validate(),
        }
    }
}

/// Client configuration as written in a TOML file
#[derive(Deserialize)]
struct RawClientConfig {
    mapping: String,
    backend: BackendConfig,
}

/// Complete client configuration: one mapping and one backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub mapping: SecretMapper,
    pub backend: BackendConfig,
}

impl ClientConfig {
    pub fn new(mapping: SecretMapper, backend: BackendConfig) -> Self {
        Self { mapping, backend }
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, SecretError> {
        let raw: RawClientConfig = toml::from_str(content)
            .map_err(|e| SecretError::config(format!("invalid client config: {}", e)))?;
        let config = Self::new(SecretMapper::compile(&raw.mapping)?, raw.backend);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SecretError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SecretError::file(path, &e))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            backend = %config.backend.kind(),
            "Loaded client config"
        );
        Ok(config)
    }

    /// Check every backend-specific constraint; performs no I/O
    pub fn validate(&self) -> Result<(), SecretError> {
        self.backend.validate()
    }
}
