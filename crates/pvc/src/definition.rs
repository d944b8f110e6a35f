use serde::Deserialize;

use crate::config::BackendKind;

/// A secret and how it can be reached on each backend.
///
/// Overrides are optional; when a backend has none, the client's mapping
/// template is applied to `id` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SecretDefinition {
    /// Arbitrary identifier for this secret
    pub id: String,

    /// Path in Vault (no leading slash, e.g. "secret/foo/bar")
    #[serde(default)]
    pub vault_path: Option<String>,

    /// Environment variable name
    #[serde(default)]
    pub env_var_name: Option<String>,

    /// Key in the JSON object
    #[serde(default)]
    pub json_key: Option<String>,
}

impl SecretDefinition {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_vault_path(mut self, path: impl Into<String>) -> Self {
        self.vault_path = Some(path.into());
        self
    }

    pub fn with_env_var_name(mut self, name: impl Into<String>) -> Self {
        self.env_var_name = Some(name.into());
        self
    }

    pub fn with_json_key(mut self, key: impl Into<String>) -> Self {
        self.json_key = Some(key.into());
        self
    }

    /// Explicit location for a backend, if one was given
    pub fn location_for(&self, kind: BackendKind) -> Option<&str> {
        match kind {
            BackendKind::Vault => self.vault_path.as_deref(),
            BackendKind::EnvVar => self.env_var_name.as_deref(),
            BackendKind::JsonFile => self.json_key.as_deref(),
        }
        .filter(|location| !location.is_empty())
    }
}
