//! Project configuration: schema, invariant check, and persistence.
//!
//! Submitted forms and stored options go through the same
//! [`ProjectConfig::from_form`] check, so the auth invariant lives in one
//! place.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;
use url::Url;

use crate::error::{ConfigError, ConfigField, StoreError};
use crate::ports::ConfigStore;

pub(crate) const HOST_KEY: &str = "phabricator:host";
pub(crate) const TOKEN_KEY: &str = "phabricator:token";
pub(crate) const USERNAME_KEY: &str = "phabricator:username";
pub(crate) const CERTIFICATE_KEY: &str = "phabricator:certificate";
pub(crate) const PROJECT_REFS_KEY: &str = "phabricator:projectPHIDs";

/// How the plugin authenticates against the tracker.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Conduit API token.
    Token {
        /// The token itself.
        token: String,
    },
    /// Legacy username + certificate handshake.
    UsernameCertificate {
        /// Tracker login name.
        username: String,
        /// Conduit certificate text.
        certificate: String,
    },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { .. } => f.debug_struct("Token").field("token", &"<redacted>").finish(),
            Self::UsernameCertificate { username, .. } => f
                .debug_struct("UsernameCertificate")
                .field("username", username)
                .field("certificate", &"<redacted>")
                .finish(),
        }
    }
}

/// A project's validated tracker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Tracker base URL.
    pub host: Url,
    /// Credentials.
    pub auth: Auth,
    /// Tracker projects every new task is tagged with.
    pub project_refs: Option<Vec<String>>,
}

/// Raw configuration fields as submitted by an administrator or read
/// back from the store. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigForm {
    /// Tracker base URL.
    pub host: Option<String>,
    /// Conduit API token.
    pub token: Option<String>,
    /// Username for certificate auth.
    pub username: Option<String>,
    /// Certificate for certificate auth.
    pub certificate: Option<String>,
    /// JSON array of project references.
    pub project_refs: Option<String>,
}

impl ConfigForm {
    /// Builds a form from a host submission keyed by field name.
    #[must_use]
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let get = |name: &str| fields.get(name).cloned();
        Self {
            host: get("host"),
            token: get("token"),
            username: get("username"),
            certificate: get("certificate"),
            project_refs: get("projectRefs"),
        }
    }

    fn load(store: &dyn ConfigStore, project: &str) -> Result<Self, StoreError> {
        Ok(Self {
            host: store.get_option(project, HOST_KEY)?,
            token: store.get_option(project, TOKEN_KEY)?,
            username: store.get_option(project, USERNAME_KEY)?,
            certificate: store.get_option(project, CERTIFICATE_KEY)?,
            project_refs: store.get_option(project, PROJECT_REFS_KEY)?,
        })
    }

    fn is_empty(&self) -> bool {
        [&self.host, &self.token, &self.username, &self.certificate, &self.project_refs]
            .iter()
            .all(|v| present(v).is_none())
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ProjectConfig {
    /// Checks a form against the configuration schema without any
    /// network access.
    ///
    /// A token wins when both a token and a username/certificate pair are
    /// supplied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated rule.
    pub fn from_form(form: &ConfigForm) -> Result<Self, ConfigError> {
        let host = present(&form.host).ok_or_else(|| {
            ConfigError::invalid(
                Some(ConfigField::Host),
                "Missing required host configuration value",
            )
        })?;
        let host = parse_host(host)?;

        let auth = match (present(&form.token), present(&form.username), present(&form.certificate))
        {
            (Some(token), _, _) => Auth::Token { token: token.to_string() },
            (None, Some(username), Some(certificate)) => Auth::UsernameCertificate {
                username: username.to_string(),
                certificate: certificate.to_string(),
            },
            _ => {
                return Err(ConfigError::invalid(
                    None,
                    "Missing required authentication configuration value",
                ));
            }
        };

        let project_refs = present(&form.project_refs).map(parse_project_refs).transpose()?.flatten();

        Ok(Self { host, auth, project_refs })
    }

    /// Loads the stored configuration for a project.
    ///
    /// Returns `None` when nothing is stored or the stored options do not
    /// satisfy the schema.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself fails.
    pub fn load(store: &dyn ConfigStore, project: &str) -> Result<Option<Self>, StoreError> {
        let form = ConfigForm::load(store, project)?;
        if form.is_empty() {
            return Ok(None);
        }
        match Self::from_form(&form) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                debug!(project, error = %err, "stored tracker configuration is incomplete");
                Ok(None)
            }
        }
    }

    /// Persists this configuration, clearing options of the unused auth mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub fn save(&self, store: &dyn ConfigStore, project: &str) -> Result<(), StoreError> {
        store.set_option(project, HOST_KEY, Some(self.host.as_str()))?;
        match &self.auth {
            Auth::Token { token } => {
                store.set_option(project, TOKEN_KEY, Some(token))?;
                store.set_option(project, USERNAME_KEY, None)?;
                store.set_option(project, CERTIFICATE_KEY, None)?;
            }
            Auth::UsernameCertificate { username, certificate } => {
                store.set_option(project, TOKEN_KEY, None)?;
                store.set_option(project, USERNAME_KEY, Some(username))?;
                store.set_option(project, CERTIFICATE_KEY, Some(certificate))?;
            }
        }
        let refs = self
            .project_refs
            .as_ref()
            .map(|refs| serde_json::Value::from(refs.clone()).to_string());
        store.set_option(project, PROJECT_REFS_KEY, refs.as_deref())
    }

    /// Conduit endpoint base, `<host>/api/` resolved like a relative link.
    #[must_use]
    pub fn api_base(&self) -> Url {
        api_base(&self.host)
    }
}

/// Reads only the tracker host of a project, which is all link rendering
/// needs.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn configured_host(store: &dyn ConfigStore, project: &str) -> Result<Option<Url>, StoreError> {
    let host = store.get_option(project, HOST_KEY)?;
    Ok(present(&host).and_then(|h| parse_host(h).ok()))
}

pub(crate) fn api_base(host: &Url) -> Url {
    host.join("api/").unwrap_or_else(|_| host.clone())
}

fn parse_host(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::invalid(Some(ConfigField::Host), format!("Enter a valid URL ({e})"))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::invalid(
            Some(ConfigField::Host),
            "Enter a valid http or https URL",
        ));
    }
    Ok(url)
}

fn parse_project_refs(raw: &str) -> Result<Option<Vec<String>>, ConfigError> {
    let invalid = || {
        ConfigError::invalid(
            Some(ConfigField::ProjectRefs),
            "projectRefs field must be a valid JSON list of strings if present",
        )
    };
    let refs: Vec<String> = serde_json::from_str(raw).map_err(|_| invalid())?;
    if refs.iter().any(|r| r.trim().is_empty()) {
        return Err(invalid());
    }
    Ok((!refs.is_empty()).then_some(refs))
}
