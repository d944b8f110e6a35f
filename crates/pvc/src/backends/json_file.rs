//! JSON file backend
//!
//! The file holds a single JSON object associating a name with a value:
//! `{ "mysecret": "pa55w0rd" }`. It is parsed on first use and the parsed
//! map is kept for the lifetime of the backend; a failed load is retried on
//! the next call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::BackendKind;
use crate::error::SecretError;
use crate::mapper::SecretMapper;

use super::SecretBackend;

type SecretMap = HashMap<String, String>;

/// Reads secrets from a flat JSON object on disk; locations are keys
#[derive(Debug)]
pub struct JsonFileBackend {
    mapper: SecretMapper,
    path: PathBuf,
    secrets: Mutex<Option<Arc<SecretMap>>>,
}

impl JsonFileBackend {
    pub fn new(mapper: SecretMapper, path: impl Into<PathBuf>) -> Self {
        Self {
            mapper,
            path: path.into(),
            secrets: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed file contents, loading them on first call
    fn secrets(&self) -> Result<Arc<SecretMap>, SecretError> {
        let mut guard = self.secrets.lock();
        if let Some(secrets) = guard.as_ref() {
            return Ok(Arc::clone(secrets));
        }

        let secrets = Arc::new(load(&self.path)?);
        tracing::debug!(path = %self.path.display(), count = secrets.len(), "Loaded secrets file");
        *guard = Some(Arc::clone(&secrets));
        Ok(secrets)
    }
}

fn load(path: &Path) -> Result<SecretMap, SecretError> {
    let content = std::fs::read_to_string(path).map_err(|e| SecretError::file(path, &e))?;
    serde_json::from_str(&content).map_err(|e| SecretError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

impl SecretBackend for JsonFileBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::JsonFile
    }

    fn mapper(&self) -> &SecretMapper {
        &self.mapper
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>, SecretError> {
        self.secrets()?
            .get(key)
            .map(|value| value.clone().into_bytes())
            .ok_or_else(|| {
                SecretError::NotFound(format!(
                    "Key '{}' not in '{}'",
                    key,
                    self.path.display()
                ))
            })
    }
}
