//! Command dispatch and handlers.
//!
//! Each handler takes a [`ServiceContext`] and returns the text to print,
//! so handlers can be driven against in-memory adapters in tests.

pub mod configure;
pub mod create;
pub mod draft;
pub mod links;
pub mod status;

use std::path::Path;

use crate::cli::Command;
use crate::context::ServiceContext;
use crate::group::Group;
use crate::settings::Settings;

/// Dispatch a parsed command against live adapters and print its output.
///
/// When `settings.record_path` is set, tracker interactions are recorded to
/// that cassette once the command finishes.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command, settings: &Settings) -> Result<(), String> {
    let ctx = ServiceContext::live(settings);
    let output = dispatch_with_context(command, &ctx)?;
    print!("{output}");
    Ok(())
}

/// Dispatch a command with the given service context.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch_with_context(command: &Command, ctx: &ServiceContext) -> Result<String, String> {
    match command {
        Command::Configure { project, host, token, username, certificate_file, project_refs } => {
            let args = configure::ConfigureArgs {
                project,
                host,
                token: token.as_deref(),
                username: username.as_deref(),
                certificate_file: certificate_file.as_deref(),
                project_refs: project_refs.as_deref(),
            };
            configure::run(ctx, &args)
        }
        Command::Status { project, group } => Ok(status::run(ctx, project, group.as_deref())),
        Command::Draft { group_file } => Ok(draft::run(ctx, &load_group(group_file)?)),
        Command::Create { project, group_file, title, description } => create::run(
            ctx,
            project,
            &load_group(group_file)?,
            title.as_deref(),
            description.as_deref(),
        ),
        Command::Links { project, groups } => links::run(ctx, project, groups),
    }
}

/// Reads a group description from a JSON file.
///
/// # Errors
///
/// Returns an error string if the file cannot be read or parsed.
pub fn load_group(path: &Path) -> Result<Group, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read group file {}: {e}", path.display()))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse group file {}: {e}", path.display()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use crate::adapters::memory::MemoryStore;
    use crate::adapters::replaying::tracker::ReplayingConnector;
    use crate::cassette::{Cassette, CassetteReplayer, Interaction};
    use crate::context::ServiceContext;
    use crate::group::{Event, Group};

    /// A context whose tracker replays `(method, output)` pairs.
    pub fn context(outputs: &[(&str, serde_json::Value)]) -> ServiceContext {
        let interactions = outputs
            .iter()
            .enumerate()
            .map(|(seq, (method, output))| Interaction {
                seq: seq as u64,
                port: "tracker".into(),
                method: (*method).into(),
                input: serde_json::json!({}),
                output: output.clone(),
            })
            .collect();
        let cassette = Cassette { name: "cmd".into(), recorded_at: Utc::now(), interactions };
        ServiceContext::new(
            Box::new(MemoryStore::new()),
            Box::new(ReplayingConnector::new(Arc::new(Mutex::new(CassetteReplayer::new(
                &cassette,
            ))))),
        )
    }

    pub fn group() -> Group {
        Group {
            id: "g1".into(),
            project: "p1".into(),
            permalink: "http://errors.example/p1/issues/g1/".into(),
            event: Event { summary: "ZeroDivisionError: division by zero".into(), stacktrace: None },
        }
    }
}
