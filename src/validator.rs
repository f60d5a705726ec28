//! Project configuration validation.
//!
//! Local schema checks run first and never touch the network. A form that
//! passes them is probed with exactly one `whoami` call using the
//! submitted credentials. Nothing is persisted here; the caller saves the
//! returned config.

use tracing::{debug, info};

use crate::config::{Auth, ConfigForm, ProjectConfig};
use crate::context::ServiceContext;
use crate::error::{ConfigError, ConfigField, TrackerError};

/// Validates submitted tracker configuration.
pub struct ConfigValidator<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ConfigValidator<'a> {
    /// Creates a validator over the given context.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Checks the form and the credentials it carries.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Invalid`] for missing or malformed fields (no
    ///   network call is made).
    /// - [`ConfigError::Rejected`] when the tracker refuses the credentials.
    /// - [`ConfigError::Unreachable`] when the tracker cannot be reached.
    pub fn validate(&self, form: &ConfigForm) -> Result<ProjectConfig, ConfigError> {
        let config = ProjectConfig::from_form(form).inspect_err(|e| {
            debug!(error = %e, "configuration rejected before probing tracker");
        })?;

        let host = config.host.to_string();
        let identity = self
            .ctx
            .tracker
            .connect(&config)
            .and_then(|client| client.whoami())
            .map_err(|e| match e {
                TrackerError::Api { code, message } => ConfigError::Rejected {
                    field: field_for_code(&code, &config.auth),
                    code,
                    message,
                },
                TrackerError::Transport { cause } => ConfigError::Unreachable { host, cause },
            })?;

        info!(host = %config.host, user = %identity.user_name, "tracker credentials verified");
        Ok(config)
    }
}

/// Maps Conduit authentication error codes onto the field that caused
/// them. Anything else is a form-level error.
fn field_for_code(code: &str, auth: &Auth) -> Option<ConfigField> {
    match (code, auth) {
        ("ERR-INVALID-AUTH", Auth::Token { .. }) => Some(ConfigField::Token),
        ("ERR-INVALID-CERTIFICATE" | "ERR-NO-CERTIFICATE", Auth::UsernameCertificate { .. }) => {
            Some(ConfigField::Certificate)
        }
        ("ERR-INVALID-USER", Auth::UsernameCertificate { .. }) => Some(ConfigField::Username),
        _ => None,
    }
}
