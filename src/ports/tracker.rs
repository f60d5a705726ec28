//! Tracker port: the remote issue tracker's RPC surface.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ProjectConfig;
use crate::error::TrackerError;

/// Tracker-assigned task identifier, kept as an opaque string.
///
/// The tracker may answer with either a JSON string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as stored and displayed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

/// The account the tracker authenticated us as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login name.
    #[serde(rename = "userName")]
    pub user_name: String,
    /// Tracker object identifier of the user.
    #[serde(default)]
    pub phid: Option<String>,
}

/// A task to create in the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Task title.
    pub title: String,
    /// Task body.
    pub description: String,
    /// Tracker projects to tag the task with.
    #[serde(rename = "projectPHIDs", skip_serializing_if = "Option::is_none")]
    pub project_refs: Option<Vec<String>>,
}

/// The tracker's answer to a successful task creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTask {
    /// Task identifier (`T<id>` in the tracker UI).
    pub id: TaskId,
    /// Tracker object identifier of the task.
    #[serde(default)]
    pub phid: Option<String>,
    /// Canonical task URL, when the tracker reports one.
    #[serde(default)]
    pub uri: Option<String>,
}

/// A client bound to one tracker host and one set of credentials.
pub trait TrackerClient: Send + Sync {
    /// Checks that the credentials are accepted by the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Api`] when the tracker rejects the call and
    /// [`TrackerError::Transport`] when it cannot be reached.
    fn whoami(&self) -> Result<Identity, TrackerError>;

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Api`] when the tracker rejects the task and
    /// [`TrackerError::Transport`] when it cannot be reached.
    fn create_task(&self, task: &NewTask) -> Result<CreatedTask, TrackerError>;
}

/// Builds tracker clients from a project configuration.
///
/// The validator needs a client for credentials that are not stored yet,
/// so clients are created per call rather than held by the context.
pub trait TrackerConnector: Send + Sync {
    /// Creates a client for the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Transport`] if the underlying transport
    /// cannot be set up.
    fn connect(&self, config: &ProjectConfig) -> Result<Box<dyn TrackerClient>, TrackerError>;
}
