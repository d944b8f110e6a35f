//! Client builder
//!
//! Options may be applied in any order; a later call for the same field
//! overrides an earlier one. Everything is validated in [`build`], before any
//! network or file I/O happens.
//!
//! [`build`]: SecretsClientBuilder::build

use std::path::PathBuf;

use crate::client::SecretsClient;
use crate::config::{
    BackendConfig, BackendKind, ClientConfig, JsonFileConfig, VaultAuth, VaultConfig,
};
use crate::error::SecretError;
use crate::mapper::SecretMapper;

#[derive(Debug, Default)]
struct VaultOptions {
    host: Option<String>,
    auth: Option<VaultAuth>,
    auth_retries: Option<u32>,
    auth_retry_delay_secs: Option<u64>,
    namespace: Option<String>,
    value_field: Option<String>,
    timeout_secs: Option<u64>,
}

impl VaultOptions {
    fn is_set(&self) -> bool {
        self.host.is_some()
            || self.auth.is_some()
            || self.auth_retries.is_some()
            || self.auth_retry_delay_secs.is_some()
            || self.namespace.is_some()
            || self.value_field.is_some()
            || self.timeout_secs.is_some()
    }

    fn into_config(self) -> Result<VaultConfig, SecretError> {
        let host = self
            .host
            .ok_or_else(|| SecretError::config("vault backend requires a host"))?;
        let auth = self
            .auth
            .ok_or_else(|| SecretError::config("vault backend requires an authentication method"))?;

        let mut config = VaultConfig::new(host, auth);
        if let Some(retries) = self.auth_retries {
            config.auth_retries = retries;
        }
        if let Some(delay) = self.auth_retry_delay_secs {
            config.auth_retry_delay_secs = delay;
        }
        if let Some(value_field) = self.value_field {
            config.value_field = value_field;
        }
        if let Some(timeout) = self.timeout_secs {
            config.timeout_secs = timeout;
        }
        config.namespace = self.namespace;
        Ok(config)
    }
}

/// Accumulates client options, then validates them once in [`build`](Self::build)
#[derive(Debug, Default)]
pub struct SecretsClientBuilder {
    mapping: Option<String>,
    enabled: Vec<BackendKind>,
    vault: VaultOptions,
    json_file_location: Option<PathBuf>,
}

impl SecretsClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Template mapping each secret ID to a backend location; the ID is
    /// interpolated as `{{ .ID }}`.
    ///
    /// - Vault: `"secret/foo/bar/{{ .ID }}"`
    /// - Environment: `"MYAPP_SECRET_{{ .ID }}"`
    /// - JSON file: `"{{ .ID }}"`
    pub fn mapping(mut self, mapping: impl Into<String>) -> Self {
        self.mapping = Some(mapping.into());
        self
    }

    /// Enable the Vault backend
    pub fn vault_backend(mut self) -> Self {
        self.enabled.push(BackendKind::Vault);
        self
    }

    /// Vault server address (e.g., "https://my.vault.com:8200")
    pub fn vault_host(mut self, host: impl Into<String>) -> Self {
        self.vault.host = Some(host.into());
        self
    }

    pub fn vault_authentication(mut self, auth: VaultAuth) -> Self {
        self.vault.auth = Some(auth);
        self
    }

    /// Number of retries if authentication fails (default: 0)
    pub fn vault_auth_retries(mut self, retries: u32) -> Self {
        self.vault.auth_retries = Some(retries);
        self
    }

    /// Delay in seconds between authentication attempts (default: 0)
    pub fn vault_auth_retry_delay_secs(mut self, secs: u64) -> Self {
        self.vault.auth_retry_delay_secs = Some(secs);
        self
    }

    pub fn vault_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.vault.namespace = Some(namespace.into());
        self
    }

    /// Field of the secret's data holding the value (default: "value")
    pub fn vault_value_field(mut self, field: impl Into<String>) -> Self {
        self.vault.value_field = Some(field.into());
        self
    }

    /// Timeout for each Vault request (default: 30)
    pub fn vault_timeout_secs(mut self, secs: u64) -> Self {
        self.vault.timeout_secs = Some(secs);
        self
    }

    /// Enable the environment variable backend
    pub fn env_var_backend(mut self) -> Self {
        self.enabled.push(BackendKind::EnvVar);
        self
    }

    /// Enable the JSON file backend. The file should contain a single JSON
    /// object associating a name with a value: `{ "mysecret": "pa55w0rd" }`.
    pub fn json_file_backend(mut self) -> Self {
        self.enabled.push(BackendKind::JsonFile);
        self
    }

    pub fn json_file_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.json_file_location = Some(path.into());
        self
    }

    /// Validate the options into a typed configuration without connecting
    pub fn build_config(self) -> Result<ClientConfig, SecretError> {
        let &[kind] = self.enabled.as_slice() else {
            return Err(SecretError::config(format!(
                "exactly one backend must be enabled ({} enabled)",
                self.enabled.len()
            )));
        };

        if kind != BackendKind::Vault && self.vault.is_set() {
            return Err(SecretError::config(format!(
                "vault options given but the {} backend is enabled",
                kind
            )));
        }
        if kind != BackendKind::JsonFile && self.json_file_location.is_some() {
            return Err(SecretError::config(format!(
                "json file location given but the {} backend is enabled",
                kind
            )));
        }

        let mapping = self
            .mapping
            .ok_or_else(|| SecretError::config("a mapping is required"))?;
        let mapping = SecretMapper::compile(&mapping)?;

        let backend = match kind {
            BackendKind::Vault => BackendConfig::Vault(self.vault.into_config()?),
            BackendKind::EnvVar => BackendConfig::EnvVar,
            BackendKind::JsonFile => BackendConfig::JsonFile(JsonFileConfig {
                path: self.json_file_location.ok_or_else(|| {
                    SecretError::config("json file backend requires a file location")
                })?,
            }),
        };

        let config = ClientConfig::new(mapping, backend);
        config.validate()?;
        Ok(config)
    }

    /// Validate the options and construct the client, authenticating to
    /// Vault if that is the selected backend
    pub fn build(self) -> Result<SecretsClient, SecretError> {
        SecretsClient::from_config(self.build_config()?)
    }
}
