//! `maniphest-link create` command.

use crate::context::ServiceContext;
use crate::error::WorkflowError;
use crate::group::Group;
use crate::workflow::IssueWorkflow;

/// Execute the `create` command: prefill, apply edits, submit.
///
/// # Errors
///
/// Returns an error string describing the workflow failure.
pub fn run(
    ctx: &ServiceContext,
    project: &str,
    group: &Group,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<String, String> {
    let workflow = IssueWorkflow::new(ctx);
    let mut draft = workflow.prepare_draft(group);
    if let Some(title) = title {
        draft.title = title.to_string();
    }
    if let Some(description) = description {
        draft.description = description.to_string();
    }

    match workflow.submit(project, group, &draft) {
        Ok(task) => Ok(format!("Created T{task}\nRedirect: {}\n", group.permalink)),
        Err(e @ (WorkflowError::NotConfigured | WorkflowError::ForeignGroup { .. })) => {
            Err(e.to_string())
        }
        Err(e) => Err(format!("Task not created: {e}\nDraft title: {}", draft.title)),
    }
}
