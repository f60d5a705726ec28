//! `maniphest-link status` command.

use std::fmt::Write as _;

use crate::context::ServiceContext;
use crate::workflow::IssueWorkflow;

/// Execute the `status` command.
#[must_use]
pub fn run(ctx: &ServiceContext, project: &str, group: Option<&str>) -> String {
    let workflow = IssueWorkflow::new(ctx);
    let mut out = String::new();

    if !workflow.is_configured(project) {
        let _ = writeln!(out, "Project {project}: Phabricator is not configured");
        return out;
    }
    let _ = writeln!(out, "Project {project}: configured");

    if let Some(group_id) = group {
        match workflow.offer_create_action(project, group_id) {
            Some(action) => {
                let _ = writeln!(out, "Group {group_id}: {} -> {}", action.label, action.target);
            }
            None => match workflow.linked_task(group_id) {
                Ok(Some(task)) => {
                    let _ = writeln!(out, "Group {group_id}: linked to T{task}");
                }
                Ok(None) => {
                    let _ = writeln!(out, "Group {group_id}: no action available");
                }
                Err(e) => {
                    let _ = writeln!(out, "Group {group_id}: cannot read link ({e})");
                }
            },
        }
    }
    out
}
