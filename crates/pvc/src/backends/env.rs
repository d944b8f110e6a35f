//! Environment variable backend

use std::env::VarError;

use crate::config::BackendKind;
use crate::error::SecretError;
use crate::mapper::SecretMapper;

use super::SecretBackend;

/// Reads secrets from the process environment; locations are variable names
#[derive(Debug, Clone)]
pub struct EnvVarBackend {
    mapper: SecretMapper,
}

impl EnvVarBackend {
    pub fn new(mapper: SecretMapper) -> Self {
        Self { mapper }
    }
}

impl SecretBackend for EnvVarBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::EnvVar
    }

    fn mapper(&self) -> &SecretMapper {
        &self.mapper
    }

    fn fetch(&self, var_name: &str) -> Result<Vec<u8>, SecretError> {
        match std::env::var(var_name) {
            Ok(value) => Ok(value.into_bytes()),
            Err(VarError::NotPresent) => Err(SecretError::NotFound(format!(
                "Environment variable '{}' not set",
                var_name
            ))),
            Err(VarError::NotUnicode(_)) => Err(SecretError::fetch(
                "env",
                format!("Environment variable '{}' is not valid unicode", var_name),
            )),
        }
    }
}
