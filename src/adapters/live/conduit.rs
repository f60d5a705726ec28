//! Live adapter for the tracker ports using Phabricator's Conduit API.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha1::{Digest, Sha1};
use tracing::debug;
use url::Url;

use crate::config::{Auth, ProjectConfig};
use crate::error::TrackerError;
use crate::ports::{CreatedTask, Identity, NewTask, TrackerClient, TrackerConnector};

const CLIENT_NAME: &str = "maniphest-link";
const CLIENT_VERSION: u32 = 1;

/// Builds [`ConduitClient`]s with a fixed request timeout.
pub struct ConduitConnector {
    timeout: Duration,
}

impl ConduitConnector {
    /// Creates a connector whose clients give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl TrackerConnector for ConduitConnector {
    fn connect(&self, config: &ProjectConfig) -> Result<Box<dyn TrackerClient>, TrackerError> {
        Ok(Box::new(ConduitClient::new(config, self.timeout)?))
    }
}

/// Conduit client bound to one host and one set of credentials.
///
/// Certificate auth performs the `conduit.connect` handshake on first use
/// and reuses the session for later calls on the same client.
pub struct ConduitClient {
    http: Client,
    api_base: Url,
    auth: Auth,
    session: Mutex<Option<Value>>,
}

/// Conduit response envelope.
#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error_code: Option<String>,
    error_info: Option<String>,
}

/// Result of `conduit.connect`.
#[derive(Deserialize)]
struct Session {
    #[serde(rename = "sessionKey")]
    session_key: String,
    #[serde(rename = "connectionID")]
    connection_id: Value,
}

impl ConduitClient {
    /// Creates a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the HTTP client cannot be built.
    pub fn new(config: &ProjectConfig, timeout: Duration) -> Result<Self, TrackerError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: config.api_base(),
            auth: config.auth.clone(),
            session: Mutex::new(None),
        })
    }

    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        mut params: Map<String, Value>,
    ) -> Result<T, TrackerError> {
        params.insert("__conduit__".to_string(), self.conduit_auth()?);
        self.post(method, &Value::Object(params))
    }

    fn conduit_auth(&self) -> Result<Value, TrackerError> {
        match &self.auth {
            Auth::Token { token } => Ok(json!({ "token": token })),
            Auth::UsernameCertificate { username, certificate } => {
                let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(existing) = session.as_ref() {
                    return Ok(existing.clone());
                }
                let fresh = self.open_session(username, certificate)?;
                *session = Some(fresh.clone());
                Ok(fresh)
            }
        }
    }

    fn open_session(&self, username: &str, certificate: &str) -> Result<Value, TrackerError> {
        let auth_token = Utc::now().timestamp();
        let params = json!({
            "client": CLIENT_NAME,
            "clientVersion": CLIENT_VERSION,
            "user": username,
            "host": self.api_base.as_str(),
            "authToken": auth_token,
            "authSignature": auth_signature(auth_token, certificate),
        });
        let session: Session = self.post("conduit.connect", &params)?;
        Ok(json!({
            "sessionKey": session.session_key,
            "connectionID": session.connection_id,
        }))
    }

    fn post<T: DeserializeOwned>(&self, method: &str, params: &Value) -> Result<T, TrackerError> {
        let url = self
            .api_base
            .join(method)
            .map_err(|e| TrackerError::transport(format!("invalid endpoint for {method}: {e}")))?;
        debug!(method, host = %self.api_base, "conduit call");

        // JSON text is UTF-8; the form body percent-encodes those bytes.
        let form = [
            ("params", params.to_string()),
            ("output", "json".to_string()),
            ("__conduit__", "1".to_string()),
        ];
        let response =
            self.http.post(url).form(&form).send().map_err(|e| transport_error(&e))?;

        let status = response.status();
        let body = response.text().map_err(|e| transport_error(&e))?;
        if !status.is_success() {
            return Err(TrackerError::transport(format!("HTTP status {}", status.as_u16())));
        }
        parse_response(&body)
    }
}

impl TrackerClient for ConduitClient {
    fn whoami(&self) -> Result<Identity, TrackerError> {
        self.call("user.whoami", Map::new())
    }

    fn create_task(&self, task: &NewTask) -> Result<CreatedTask, TrackerError> {
        let params = match serde_json::to_value(task) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                return Err(TrackerError::transport("task could not be encoded"));
            }
        };
        self.call("maniphest.createtask", params)
    }
}

/// `hex(sha1(authToken ++ certificate))`, the legacy handshake signature.
fn auth_signature(auth_token: i64, certificate: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(auth_token.to_string().as_bytes());
    hasher.update(certificate.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, TrackerError> {
    let body = body.trim_start();
    let body = body.strip_prefix("for(;;);").unwrap_or(body);
    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|_| TrackerError::transport("malformed response from tracker"))?;
    if let Some(code) = envelope.error_code {
        return Err(TrackerError::api(code, envelope.error_info.unwrap_or_default()));
    }
    envelope.result.ok_or_else(|| TrackerError::transport("response carried no result"))
}

fn transport_error(err: &reqwest::Error) -> TrackerError {
    let cause = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else if err.is_decode() || err.is_body() {
        "malformed response from tracker".to_string()
    } else {
        format!("request failed: {err}")
    };
    TrackerError::transport(cause)
}
