//! Minimal HashiCorp Vault HTTP API: login and read

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::config::VaultConfig;
use crate::error::SecretError;

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// The two Vault operations the backend needs
pub trait VaultApi: Send + Sync {
    /// Log in through `auth/{mount}/login`, returning the client token
    fn login(&self, mount: &str, body: &Value) -> Result<SecretString, SecretError>;

    /// Read the `data` object stored at `path`
    fn read(&self, path: &str, token: &str) -> Result<Value, SecretError>;
}

#[derive(Deserialize)]
struct LoginResponse {
    auth: Option<AuthInfo>,
}

#[derive(Deserialize)]
struct AuthInfo {
    client_token: SecretString,
}

#[derive(Deserialize)]
struct ReadResponse {
    data: Option<Value>,
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<String>,
}

/// Blocking HTTP implementation of [`VaultApi`]
pub struct HttpVaultApi {
    agent: ureq::Agent,
    host: String,
    namespace: Option<String>,
}

impl HttpVaultApi {
    pub fn new(config: &VaultConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout()))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            host: config.host.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.host, path.trim_start_matches('/'))
    }
}

fn transport_error(e: ureq::Error) -> SecretError {
    SecretError::fetch("vault", format!("request failed: {}", e))
}

/// Vault reports failures as `{"errors": [...]}`
fn error_detail(body: &mut ureq::Body) -> String {
    let errors = body
        .read_json::<ErrorResponse>()
        .unwrap_or_default()
        .errors;
    if errors.is_empty() {
        "no details".to_string()
    } else {
        errors.join("; ")
    }
}

impl VaultApi for HttpVaultApi {
    fn login(&self, mount: &str, body: &Value) -> Result<SecretString, SecretError> {
        let url = self.url(&format!("auth/{}/login", mount));

        let mut request = self.agent.post(&url);
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace.as_str());
        }
        let mut response = request.send_json(body).map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(response.body_mut());
            return Err(SecretError::fetch(
                "vault",
                format!("login via auth/{} rejected ({}): {}", mount, status.as_u16(), detail),
            ));
        }

        let login: LoginResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| SecretError::fetch("vault", format!("invalid login response: {}", e)))?;

        match login.auth {
            Some(auth) if !auth.client_token.expose_secret().is_empty() => Ok(auth.client_token),
            _ => Err(SecretError::fetch(
                "vault",
                format!("login via auth/{} returned no client token", mount),
            )),
        }
    }

    fn read(&self, path: &str, token: &str) -> Result<Value, SecretError> {
        let url = self.url(path);

        let mut request = self.agent.get(&url).header(TOKEN_HEADER, token);
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace.as_str());
        }
        let mut response = request.call().map_err(transport_error)?;

        let status = response.status();
        match status.as_u16() {
            404 => {
                return Err(SecretError::NotFound(format!(
                    "No secret at vault path '{}'",
                    path
                )))
            }
            403 => {
                let detail = error_detail(response.body_mut());
                return Err(SecretError::AccessDenied(format!(
                    "vault path '{}': {}",
                    path, detail
                )));
            }
            _ if !status.is_success() => {
                let detail = error_detail(response.body_mut());
                return Err(SecretError::fetch(
                    "vault",
                    format!("read of '{}' failed ({}): {}", path, status.as_u16(), detail),
                ));
            }
            _ => {}
        }

        let read: ReadResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| SecretError::fetch("vault", format!("invalid read response: {}", e)))?;

        read.data
            .ok_or_else(|| SecretError::NotFound(format!("No data at vault path '{}'", path)))
    }
}
