//! Secrets client facade

use crate::backends::SecretBackend;
use crate::builder::SecretsClientBuilder;
use crate::config::{BackendConfig, BackendKind, ClientConfig};
use crate::definition::SecretDefinition;
use crate::error::SecretError;

#[cfg(feature = "env")]
use crate::backends::env::EnvVarBackend;
#[cfg(feature = "json-file")]
use crate::backends::json_file::JsonFileBackend;
#[cfg(feature = "vault")]
use crate::backends::vault::VaultBackend;

/// The one live backend of a client
#[derive(Debug)]
enum Backend {
    #[cfg(feature = "vault")]
    Vault(VaultBackend),

    #[cfg(feature = "env")]
    EnvVar(EnvVarBackend),

    #[cfg(feature = "json-file")]
    JsonFile(JsonFileBackend),
}

impl Backend {
    /// Construct the configured backend, authenticating if it needs to
    #[cfg_attr(
        not(any(feature = "vault", feature = "env", feature = "json-file")),
        allow(unused_variables)
    )]
    fn connect(config: ClientConfig) -> Result<Self, SecretError> {
        let ClientConfig { mapping, backend } = config;

        match backend {
            #[cfg(feature = "vault")]
            BackendConfig::Vault(vault) => {
                Ok(Backend::Vault(VaultBackend::connect(mapping, &vault)?))
            }

            #[cfg(not(feature = "vault"))]
            BackendConfig::Vault(_) => Err(SecretError::disabled("vault")),

            #[cfg(feature = "env")]
            BackendConfig::EnvVar => Ok(Backend::EnvVar(EnvVarBackend::new(mapping))),

            #[cfg(not(feature = "env"))]
            BackendConfig::EnvVar => Err(SecretError::disabled("env")),

            #[cfg(feature = "json-file")]
            BackendConfig::JsonFile(file) => {
                Ok(Backend::JsonFile(JsonFileBackend::new(mapping, file.path)))
            }

            #[cfg(not(feature = "json-file"))]
            BackendConfig::JsonFile(_) => Err(SecretError::disabled("json-file")),
        }
    }

    #[cfg(any(feature = "vault", feature = "env", feature = "json-file"))]
    fn inner(&self) -> &dyn SecretBackend {
        match self {
            #[cfg(feature = "vault")]
            Backend::Vault(backend) => backend,

            #[cfg(feature = "env")]
            Backend::EnvVar(backend) => backend,

            #[cfg(feature = "json-file")]
            Backend::JsonFile(backend) => backend,
        }
    }

    /// With every backend compiled out no client can be constructed
    #[cfg(not(any(feature = "vault", feature = "env", feature = "json-file")))]
    fn inner(&self) -> &dyn SecretBackend {
        match *self {}
    }
}

/// Retrieves secret values from exactly one configured backend
#[derive(Debug)]
pub struct SecretsClient {
    backend: Backend,
}

impl SecretsClient {
    /// Start configuring a client
    pub fn builder() -> SecretsClientBuilder {
        SecretsClientBuilder::new()
    }

    /// Validate a configuration and construct its backend
    pub fn from_config(config: ClientConfig) -> Result<Self, SecretError> {
        config.validate()?;
        tracing::debug!(
            backend = %config.backend.kind(),
            mapping = %config.mapping,
            "Creating secrets client"
        );
        let backend = Backend::connect(config)?;
        Ok(Self { backend })
    }

    /// Get the value of a secret
    pub fn get(&self, id: &str) -> Result<Vec<u8>, SecretError> {
        self.backend.inner().get(id)
    }

    /// Get the value of a secret as UTF-8 text
    pub fn get_string(&self, id: &str) -> Result<String, SecretError> {
        let bytes = self.get(id)?;
        String::from_utf8(bytes).map_err(|e| {
            SecretError::fetch(
                self.backend_kind().name(),
                format!("secret '{}' is not valid UTF-8: {}", id, e.utf8_error()),
            )
        })
    }

    /// Get a secret through its definition's override for this backend,
    /// falling back to the mapping for its ID
    pub fn get_definition(&self, definition: &SecretDefinition) -> Result<Vec<u8>, SecretError> {
        let backend = self.backend.inner();
        match definition.location_for(backend.kind()) {
            Some(location) => {
                tracing::debug!(
                    backend = backend.kind().name(),
                    %location,
                    "Resolving secret by definition"
                );
                backend.fetch(location)
            }
            None => backend.get(&definition.id),
        }
    }

    /// The kind of backend this client talks to
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.inner().kind()
    }
}
