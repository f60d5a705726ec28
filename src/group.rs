//! Error-group view data supplied by the host.

use serde::{Deserialize, Serialize};

/// A deduplicated cluster of error occurrences, as the host shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Opaque group identifier.
    pub id: String,
    /// Identifier of the owning project.
    pub project: String,
    /// Absolute URL of the group in the host application.
    pub permalink: String,
    /// Latest recorded occurrence.
    pub event: Event,
}

/// One recorded occurrence within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Short human-readable error summary.
    pub summary: String,
    /// Rendered stack trace, when the event carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
}
