//! Error taxonomy shared by the validator, the workflow, and the adapters.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A field of the project configuration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigField {
    /// Tracker base URL.
    Host,
    /// Conduit API token.
    Token,
    /// Username for certificate authentication.
    Username,
    /// Conduit certificate.
    Certificate,
    /// JSON list of project references.
    ProjectRefs,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Host => "host",
            Self::Token => "token",
            Self::Username => "username",
            Self::Certificate => "certificate",
            Self::ProjectRefs => "projectRefs",
        };
        f.write_str(name)
    }
}

/// A field of the task creation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    /// Task title.
    Title,
    /// Task description.
    Description,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Title => "title",
            Self::Description => "description",
        })
    }
}

/// Failure reading or writing the option/metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("store I/O error at {path}: {message}")]
    Io {
        /// Location of the backing store.
        path: String,
        /// Underlying error text.
        message: String,
    },

    /// The backing file exists but is not a valid store document.
    #[error("store at {path} is malformed: {message}")]
    Malformed {
        /// Location of the backing store.
        path: String,
        /// Parser error text.
        message: String,
    },
}

/// Failure reported by a tracker client.
///
/// Serializable so that cassettes can record and replay failures exactly.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrackerError {
    /// The tracker understood the request and rejected it.
    #[error("{code} {message}")]
    Api {
        /// Tracker error code, e.g. `ERR-INVALID-AUTH`.
        code: String,
        /// Human-readable explanation from the tracker.
        message: String,
    },

    /// The tracker could not be reached or answered with garbage.
    #[error("{cause}")]
    Transport {
        /// Short human-readable cause.
        cause: String,
    },
}

impl TrackerError {
    /// Builds an API error.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api { code: code.into(), message: message.into() }
    }

    /// Builds a transport error.
    pub fn transport(cause: impl Into<String>) -> Self {
        Self::Transport { cause: cause.into() }
    }
}

/// Rejection of a submitted project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Missing or malformed input, detected without contacting the tracker.
    #[error("{message}")]
    Invalid {
        /// Offending field, or `None` for a form-level error.
        field: Option<ConfigField>,
        /// Explanation shown to the administrator.
        message: String,
    },

    /// The tracker rejected the identity probe.
    #[error("{code} {message}")]
    Rejected {
        /// Field the tracker code maps to, if any.
        field: Option<ConfigField>,
        /// Tracker error code.
        code: String,
        /// Tracker error message.
        message: String,
    },

    /// The tracker host could not be reached.
    #[error("Unable to reach Phabricator host {host}: {cause}")]
    Unreachable {
        /// Host that was probed.
        host: String,
        /// Short human-readable cause.
        cause: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: Option<ConfigField>, message: impl Into<String>) -> Self {
        Self::Invalid { field, message: message.into() }
    }

    /// The form field this error belongs to; `None` means the whole form.
    #[must_use]
    pub fn field(&self) -> Option<ConfigField> {
        match self {
            Self::Invalid { field, .. } | Self::Rejected { field, .. } => *field,
            Self::Unreachable { .. } => None,
        }
    }

    /// Whether the error was found without any network call.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Invalid { .. })
    }
}

/// Failure of the task creation workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The project has no valid tracker configuration.
    #[error("Phabricator is not configured for this project")]
    NotConfigured,

    /// The group belongs to a different project than the one submitting.
    #[error("group {group} belongs to project {project}")]
    ForeignGroup {
        /// Group identifier.
        group: String,
        /// Project the group belongs to.
        project: String,
    },

    /// The edited draft violates a field constraint.
    #[error("{field}: {message}")]
    InvalidDraft {
        /// Offending draft field.
        field: DraftField,
        /// Explanation shown next to the field.
        message: String,
    },

    /// The tracker rejected the task.
    #[error("{code} {message}")]
    RemoteRejected {
        /// Tracker error code.
        code: String,
        /// Tracker error message.
        message: String,
    },

    /// The tracker host could not be reached.
    #[error("Unable to reach Phabricator host: {0}")]
    HostUnreachable(String),

    /// The task was created but the link could not be stored.
    #[error("failed to store task link: {0}")]
    Storage(#[from] StoreError),
}

impl WorkflowError {
    /// Whether the error should be shown as a blocking page instead of a
    /// form error. Every other kind keeps the form and its input.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}

impl From<TrackerError> for WorkflowError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::Api { code, message } => Self::RemoteRejected { code, message },
            TrackerError::Transport { cause } => Self::HostUnreachable(cause),
        }
    }
}
