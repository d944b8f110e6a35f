//! HashiCorp Vault backend
//!
//! Construction runs the authentication handshake, retrying a fixed number
//! of times with a fixed delay between attempts. The resulting session token
//! is held for the lifetime of the backend and sent with every read; it is
//! never refreshed.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use crate::config::{BackendKind, VaultAuth, VaultConfig};
use crate::error::SecretError;
use crate::mapper::SecretMapper;

use super::vault_api::{HttpVaultApi, VaultApi};
use super::SecretBackend;

/// Fixed-count, fixed-delay retry schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Total number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Run `attempt` until it succeeds or attempts are exhausted.
    ///
    /// `sleep` is called with the delay strictly between a failure and the
    /// next attempt. Exhaustion yields [`SecretError::Authentication`].
    pub fn run<T>(
        &self,
        mut sleep: impl FnMut(Duration),
        mut attempt: impl FnMut(u32) -> Result<T, SecretError>,
    ) -> Result<T, SecretError> {
        let max_attempts = self.max_attempts();
        let mut current = 1;

        loop {
            match attempt(current) {
                Ok(value) => return Ok(value),
                Err(e) if current < max_attempts => {
                    tracing::warn!(
                        attempt = current,
                        max_attempts,
                        delay_secs = self.delay.as_secs(),
                        error = %e,
                        "Vault authentication failed, retrying"
                    );
                    sleep(self.delay);
                    current += 1;
                }
                Err(e) => {
                    return Err(SecretError::Authentication {
                        attempts: current,
                        message: e.to_string(),
                    })
                }
            }
        }
    }
}

/// An authenticated Vault session; locations are secret paths
pub struct VaultBackend {
    mapper: SecretMapper,
    api: Box<dyn VaultApi>,
    token: SecretString,
    value_field: String,
}

impl VaultBackend {
    /// Authenticate against the configured Vault server
    pub fn connect(mapper: SecretMapper, config: &VaultConfig) -> Result<Self, SecretError> {
        let api = HttpVaultApi::new(config);
        Self::connect_with(mapper, config, Box::new(api), std::thread::sleep)
    }

    /// Authenticate through a custom API client and sleep function
    pub fn connect_with(
        mapper: SecretMapper,
        config: &VaultConfig,
        api: Box<dyn VaultApi>,
        sleep: impl FnMut(Duration),
    ) -> Result<Self, SecretError> {
        let policy = RetryPolicy::new(config.auth_retries, config.auth_retry_delay());

        let token = policy.run(sleep, |attempt| {
            tracing::debug!(
                host = %config.host,
                method = config.auth.method_name(),
                attempt,
                "Authenticating to vault"
            );
            authenticate(api.as_ref(), &config.auth)
        })?;

        tracing::info!(
            host = %config.host,
            method = config.auth.method_name(),
            "Authenticated to vault"
        );

        Ok(Self {
            mapper,
            api,
            token,
            value_field: config.value_field.clone(),
        })
    }
}

impl fmt::Debug for VaultBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultBackend")
            .field("mapper", &self.mapper)
            .field("token", &self.token)
            .field("value_field", &self.value_field)
            .finish_non_exhaustive()
    }
}

/// One authentication attempt, returning the session token
fn authenticate(api: &dyn VaultApi, auth: &VaultAuth) -> Result<SecretString, SecretError> {
    match auth {
        VaultAuth::Token { token } => Ok(token.clone()),
        VaultAuth::AppId { app_id, user_id } => api.login(
            "app-id",
            &json!({ "app_id": app_id, "user_id": user_id.expose_secret() }),
        ),
        VaultAuth::AppIdFile {
            app_id,
            user_id_path,
        } => {
            let user_id = read_user_id(user_id_path)?;
            api.login(
                "app-id",
                &json!({ "app_id": app_id, "user_id": user_id.expose_secret() }),
            )
        }
        VaultAuth::AppRole { role_id, secret_id } => {
            let mut body = json!({ "role_id": role_id });
            if let Some(secret_id) = secret_id {
                body["secret_id"] = json!(secret_id.expose_secret());
            }
            api.login("approle", &body)
        }
    }
}

/// The User-ID file is read on every attempt so it can be rotated
fn read_user_id(path: &Path) -> Result<SecretString, SecretError> {
    let content = std::fs::read_to_string(path).map_err(|e| SecretError::file(path, &e))?;
    let user_id = content.trim();
    if user_id.is_empty() {
        return Err(SecretError::File {
            path: path.to_path_buf(),
            message: "user id file is empty".to_string(),
        });
    }
    Ok(SecretString::from(user_id.to_string()))
}

/// Pull the value field out of a secret's data, unwrapping KV v2 responses
fn extract_value(data: &Value, field: &str, path: &str) -> Result<Vec<u8>, SecretError> {
    let data = match (data.get("data"), data.get("metadata")) {
        (Some(inner @ Value::Object(_)), Some(_)) => inner,
        _ => data,
    };

    match data.get(field) {
        Some(Value::String(value)) => Ok(value.as_bytes().to_vec()),
        Some(_) => Err(SecretError::fetch(
            "vault",
            format!("field '{}' at '{}' is not a string", field, path),
        )),
        None => Err(SecretError::NotFound(format!(
            "No field '{}' at vault path '{}'",
            field, path
        ))),
    }
}

impl SecretBackend for VaultBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Vault
    }

    fn mapper(&self) -> &SecretMapper {
        &self.mapper
    }

    fn fetch(&self, path: &str) -> Result<Vec<u8>, SecretError> {
        let data = self.api.read(path, self.token.expose_secret())?;
        extract_value(&data, &self.value_field, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    const SESSION_TOKEN: &str = "s.session";

    /// In-memory Vault that fails the first `failures` logins
    #[derive(Default)]
    struct StubApi {
        failures: u32,
        logins: Arc<AtomicU32>,
        bodies: Arc<Mutex<Vec<(String, Value)>>>,
        secrets: HashMap<String, Value>,
    }

    impl StubApi {
        fn failing(failures: u32) -> Self {
            Self {
                failures,
                ..Default::default()
            }
        }

        fn with_secret(mut self, path: &str, data: Value) -> Self {
            self.secrets.insert(path.to_string(), data);
            self
        }
    }

    impl VaultApi for StubApi {
        fn login(&self, mount: &str, body: &Value) -> Result<SecretString, SecretError> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            self.bodies.lock().push((mount.to_string(), body.clone()));
            if n <= self.failures {
                return Err(SecretError::fetch("vault", format!("login {} refused", n)));
            }
            Ok(SecretString::from(SESSION_TOKEN.to_string()))
        }

        fn read(&self, path: &str, token: &str) -> Result<Value, SecretError> {
            if token != SESSION_TOKEN && token != "s.static" {
                return Err(SecretError::AccessDenied(path.to_string()));
            }
            self.secrets
                .get(path)
                .cloned()
                .ok_or_else(|| SecretError::NotFound(path.to_string()))
        }
    }

    fn mapper() -> SecretMapper {
        SecretMapper::compile("secret/app/{{ .ID }}").unwrap()
    }

    fn approle_config(retries: u32, delay_secs: u64) -> VaultConfig {
        let mut config = VaultConfig::new("https://vault.test", VaultAuth::app_role("role-1"));
        config.auth_retries = retries;
        config.auth_retry_delay_secs = delay_secs;
        config
    }

    #[test]
    fn test_default_policy_is_single_attempt() {
        let config = approle_config(0, 0);
        let api = StubApi::failing(1);
        let logins = api.logins.clone();
        let mut sleeps = Vec::new();

        let result =
            VaultBackend::connect_with(mapper(), &config, Box::new(api), |d| sleeps.push(d));

        assert!(matches!(
            result,
            Err(SecretError::Authentication { attempts: 1, .. })
        ));
        assert_eq!(logins.load(Ordering::SeqCst), 1);
        assert!(sleeps.is_empty());
    }

    #[test]
    fn test_succeeds_on_last_allowed_attempt() {
        let config = approle_config(3, 5);
        let api = StubApi::failing(3);
        let logins = api.logins.clone();
        let mut sleeps = Vec::new();

        let backend =
            VaultBackend::connect_with(mapper(), &config, Box::new(api), |d| sleeps.push(d));

        assert!(backend.is_ok());
        assert_eq!(logins.load(Ordering::SeqCst), 4);
        assert_eq!(sleeps, vec![Duration::from_secs(5); 3]);
    }

    #[test]
    fn test_exhausted_retries() {
        let config = approle_config(2, 1);
        let api = StubApi::failing(u32::MAX);
        let logins = api.logins.clone();
        let mut sleeps = Vec::new();

        let result =
            VaultBackend::connect_with(mapper(), &config, Box::new(api), |d| sleeps.push(d));

        match result {
            Err(SecretError::Authentication { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("login 3 refused"));
            }
            other => panic!("expected authentication error, got {:?}", other),
        }
        assert_eq!(logins.load(Ordering::SeqCst), 3);
        assert_eq!(sleeps.len(), 2);
    }

    #[test]
    fn test_token_auth_skips_login() {
        let config = VaultConfig::new("https://vault.test", VaultAuth::token("s.static"));
        let api = StubApi::default().with_secret("secret/app/db", json!({ "value": "hunter2" }));
        let logins = api.logins.clone();

        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();

        assert_eq!(logins.load(Ordering::SeqCst), 0);
        assert_eq!(backend.get("db").unwrap(), b"hunter2");
    }

    #[test]
    fn test_approle_login_body() {
        let config = VaultConfig::new(
            "https://vault.test",
            VaultAuth::app_role_with_secret_id("role-1", "secret-1"),
        );
        let api = StubApi::default();
        let bodies = api.bodies.clone();

        VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();

        let bodies = bodies.lock();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].0, "approle");
        assert_eq!(bodies[0].1, json!({ "role_id": "role-1", "secret_id": "secret-1" }));
    }

    #[test]
    fn test_app_id_login_body() {
        let config = VaultConfig::new("https://vault.test", VaultAuth::app_id("app-1", "user-1"));
        let api = StubApi::default();
        let bodies = api.bodies.clone();

        VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();

        let bodies = bodies.lock();
        assert_eq!(bodies[0].0, "app-id");
        assert_eq!(bodies[0].1, json!({ "app_id": "app-1", "user_id": "user-1" }));
    }

    #[test]
    fn test_user_id_file_read_per_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("user-id");
        let auth = VaultAuth::app_id_file("app-1", &path);
        let mut config = VaultConfig::new("https://vault.test", auth);
        config.auth_retries = 1;

        let api = StubApi::default();
        let bodies = api.bodies.clone();
        let sleep_path = path.clone();

        // The file appears during the retry delay
        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), move |_| {
            let mut file = std::fs::File::create(&sleep_path).unwrap();
            writeln!(file, "user-from-file").unwrap();
        });

        assert!(backend.is_ok());
        let bodies = bodies.lock();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].1, json!({ "app_id": "app-1", "user_id": "user-from-file" }));
    }

    #[test]
    fn test_get_kv2_payload() {
        let config = approle_config(0, 0);
        let api = StubApi::default().with_secret(
            "secret/app/db",
            json!({ "data": { "value": "kv2-secret" }, "metadata": { "version": 3 } }),
        );

        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();
        assert_eq!(backend.get("db").unwrap(), b"kv2-secret");
    }

    #[test]
    fn test_get_missing_secret() {
        let config = approle_config(0, 0);
        let backend =
            VaultBackend::connect_with(mapper(), &config, Box::new(StubApi::default()), |_| {})
                .unwrap();
        assert!(backend.get("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_missing_field() {
        let config = approle_config(0, 0);
        let api = StubApi::default().with_secret("secret/app/db", json!({ "password": "x" }));
        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();
        assert!(backend.get("db").unwrap_err().is_not_found());
    }

    #[test]
    fn test_get_non_string_field() {
        let config = approle_config(0, 0);
        let api = StubApi::default().with_secret("secret/app/db", json!({ "value": 42 }));
        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();
        assert!(matches!(backend.get("db"), Err(SecretError::Fetch { .. })));
    }

    #[test]
    fn test_custom_value_field() {
        let mut config = approle_config(0, 0);
        config.value_field = "password".to_string();
        let api = StubApi::default().with_secret("secret/app/db", json!({ "password": "pw" }));
        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();
        assert_eq!(backend.get("db").unwrap(), b"pw");
    }

    #[test]
    fn test_rejected_token_is_not_reauthenticated() {
        let config = VaultConfig::new("https://vault.test", VaultAuth::token("s.revoked"));
        let api = StubApi::default().with_secret("secret/app/db", json!({ "value": "x" }));
        let logins = api.logins.clone();
        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();

        assert!(matches!(backend.get("db"), Err(SecretError::AccessDenied(_))));
        assert_eq!(logins.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_repeated_gets_are_identical() {
        let config = approle_config(0, 0);
        let api = StubApi::default().with_secret("secret/app/db", json!({ "value": "same" }));
        let backend = VaultBackend::connect_with(mapper(), &config, Box::new(api), |_| {}).unwrap();
        assert_eq!(backend.get("db").unwrap(), backend.get("db").unwrap());
    }

    #[test]
    fn test_debug_hides_token() {
        let config = VaultConfig::new("https://vault.test", VaultAuth::token("s.static"));
        let backend =
            VaultBackend::connect_with(mapper(), &config, Box::new(StubApi::default()), |_| {})
                .unwrap();
        assert!(!format!("{:?}", backend).contains("s.static"));
    }
}
