//! Secret backend implementations

use crate::config::BackendKind;
use crate::error::SecretError;
use crate::mapper::SecretMapper;

#[cfg(feature = "env")]
pub mod env;

#[cfg(feature = "json-file")]
pub mod json_file;

#[cfg(feature = "vault")]
pub mod vault;

#[cfg(feature = "vault")]
pub mod vault_api;

/// A concrete source of secret values
pub trait SecretBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Mapper turning secret IDs into locations on this backend
    fn mapper(&self) -> &SecretMapper;

    /// Fetch the raw value stored at a backend location
    fn fetch(&self, location: &str) -> Result<Vec<u8>, SecretError>;

    /// Map a secret ID to its location and fetch it
    fn get(&self, id: &str) -> Result<Vec<u8>, SecretError> {
        let location = self.mapper().render(id);
        tracing::debug!(backend = self.kind().name(), %location, "Resolving secret");
        self.fetch(&location)
    }
}
