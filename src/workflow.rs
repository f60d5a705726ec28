//! Task creation workflow for one error group.
//!
//! A group is either unlinked (no stored task id) or linked. The only
//! transition is unlinked to linked, taken when the tracker accepts a new
//! task. There is no unlink.

use tracing::{debug, info, warn};

use crate::config::ProjectConfig;
use crate::context::ServiceContext;
use crate::error::{DraftField, StoreError, WorkflowError};
use crate::group::Group;
use crate::ports::{NewTask, TaskId};

/// Group metadata key holding the linked task id.
pub const TASK_LINK_KEY: &str = "phabricator:tid";

/// Maximum title length accepted by the creation form.
pub const TITLE_MAX_CHARS: usize = 200;

/// Label of the action that opens the creation form.
pub const CREATE_ACTION_LABEL: &str = "Create Maniphest Task";

/// The creation form's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Task title, at most [`TITLE_MAX_CHARS`] characters.
    pub title: String,
    /// Task body.
    pub description: String,
}

impl TaskDraft {
    /// Prefills a draft from the group's latest event.
    ///
    /// The title is the event summary cut at [`TITLE_MAX_CHARS`]
    /// characters. The description is the group permalink, followed by
    /// the stack trace in a fenced block when the event has one.
    #[must_use]
    pub fn for_group(group: &Group) -> Self {
        let title = group.event.summary.chars().take(TITLE_MAX_CHARS).collect();

        let mut description = group.permalink.clone();
        if let Some(trace) = group.event.stacktrace.as_deref().filter(|t| !t.is_empty()) {
            let fence = fence_for(trace);
            description.push_str("\n\n");
            description.push_str(&fence);
            description.push('\n');
            description.push_str(trace);
            if !trace.ends_with('\n') {
                description.push('\n');
            }
            description.push_str(&fence);
        }

        Self { title, description }
    }

    /// Checks the draft against the form's field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidDraft`] for the first offending field.
    pub fn check(&self) -> Result<(), WorkflowError> {
        if self.title.trim().is_empty() {
            return Err(required(DraftField::Title));
        }
        let len = self.title.chars().count();
        if len > TITLE_MAX_CHARS {
            return Err(WorkflowError::InvalidDraft {
                field: DraftField::Title,
                message: format!(
                    "Ensure this value has at most {TITLE_MAX_CHARS} characters (it has {len})."
                ),
            });
        }
        if self.description.trim().is_empty() {
            return Err(required(DraftField::Description));
        }
        Ok(())
    }
}

fn required(field: DraftField) -> WorkflowError {
    WorkflowError::InvalidDraft { field, message: "This field is required.".to_string() }
}

/// A backtick fence longer than any backtick run inside `payload`, so the
/// payload cannot close the block early.
fn fence_for(payload: &str) -> String {
    let longest = payload
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat((longest + 1).max(3))
}

/// An action the host shows on the group page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    /// Button text.
    pub label: String,
    /// Host-relative URL of the creation form.
    pub target: String,
}

/// Drives configuration checks, draft preparation, and task creation.
pub struct IssueWorkflow<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> IssueWorkflow<'a> {
    /// Creates a workflow over the given context.
    #[must_use]
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Whether the project has a usable tracker configuration. Never fails;
    /// store errors count as "not configured".
    #[must_use]
    pub fn is_configured(&self, project: &str) -> bool {
        self.load_config(project).is_some()
    }

    /// The "create task" action for an unlinked group of a configured
    /// project, otherwise `None`.
    #[must_use]
    pub fn offer_create_action(&self, project: &str, group_id: &str) -> Option<ActionDescriptor> {
        if !self.is_configured(project) {
            return None;
        }
        match self.ctx.store.get_group_value(group_id, TASK_LINK_KEY) {
            Ok(Some(_)) => None,
            Ok(None) => Some(ActionDescriptor {
                label: CREATE_ACTION_LABEL.to_string(),
                target: format!("/{project}/issues/{group_id}/actions/phabricator/create/"),
            }),
            Err(e) => {
                warn!(group = group_id, error = %e, "cannot read task link");
                None
            }
        }
    }

    /// Prefills the creation form for `group`.
    #[must_use]
    pub fn prepare_draft(&self, group: &Group) -> TaskDraft {
        TaskDraft::for_group(group)
    }

    /// Creates the task and links it to the group.
    ///
    /// A group that is already linked keeps its task: the stored id is
    /// returned and the tracker is not called.
    ///
    /// The draft is borrowed so the caller still holds the user's input
    /// when this fails and can show the form again.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::ForeignGroup`] if `group` belongs to another project.
    /// - [`WorkflowError::NotConfigured`] if the project lost its configuration.
    /// - [`WorkflowError::InvalidDraft`] if the draft violates a field rule.
    /// - [`WorkflowError::RemoteRejected`] / [`WorkflowError::HostUnreachable`]
    ///   for tracker failures; nothing is stored.
    /// - [`WorkflowError::Storage`] if the link cannot be written.
    pub fn submit(
        &self,
        project: &str,
        group: &Group,
        draft: &TaskDraft,
    ) -> Result<TaskId, WorkflowError> {
        if group.project != project {
            return Err(WorkflowError::ForeignGroup {
                group: group.id.clone(),
                project: group.project.clone(),
            });
        }
        let config = self.load_config(project).ok_or(WorkflowError::NotConfigured)?;
        draft.check()?;

        // A linked group never gets a second task.
        if let Some(existing) = self.linked_task(&group.id)? {
            info!(project, group = %group.id, task = %existing, "group already linked");
            return Ok(existing);
        }

        let client = self.ctx.tracker.connect(&config)?;
        let task = NewTask {
            title: draft.title.clone(),
            description: draft.description.clone(),
            project_refs: config.project_refs.clone(),
        };
        let created = client.create_task(&task).inspect_err(|e| {
            debug!(project, group = %group.id, error = %e, "task creation failed");
        })?;

        // Concurrent submissions for one group race here; the later write
        // wins and the earlier task is left unlinked.
        self.ctx.store.set_group_value(&group.id, TASK_LINK_KEY, created.id.as_str())?;
        info!(project, group = %group.id, task = %created.id, "linked group to tracker task");
        Ok(created.id)
    }

    /// The task linked to `group_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn linked_task(&self, group_id: &str) -> Result<Option<TaskId>, StoreError> {
        Ok(self.ctx.store.get_group_value(group_id, TASK_LINK_KEY)?.map(TaskId::new))
    }

    fn load_config(&self, project: &str) -> Option<ProjectConfig> {
        match ProjectConfig::load(self.ctx.store.as_ref(), project) {
            Ok(config) => config,
            Err(e) => {
                warn!(project, error = %e, "cannot read tracker configuration");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::adapters::replaying::tracker::ReplayingConnector;
    use crate::cassette::{Cassette, CassetteReplayer, Interaction};
    use crate::config::ConfigForm;
    use crate::group::Event;

    fn replayer(outputs: &[serde_json::Value]) -> Arc<Mutex<CassetteReplayer>> {
        let interactions = outputs
            .iter()
            .enumerate()
            .map(|(seq, output)| Interaction {
                seq: seq as u64,
                port: "tracker".into(),
                method: "create_task".into(),
                input: json!({}),
                output: output.clone(),
            })
            .collect();
        let cassette = Cassette { name: "t".into(), recorded_at: Utc::now(), interactions };
        Arc::new(Mutex::new(CassetteReplayer::new(&cassette)))
    }

    fn context(outputs: &[serde_json::Value]) -> (ServiceContext, Arc<Mutex<CassetteReplayer>>) {
        let replayer = replayer(outputs);
        let ctx = ServiceContext::new(
            Box::new(MemoryStore::new()),
            Box::new(ReplayingConnector::new(Arc::clone(&replayer))),
        );
        (ctx, replayer)
    }

    fn configure(ctx: &ServiceContext, project: &str) {
        ProjectConfig::from_form(&ConfigForm {
            host: Some("http://tracker.example/".into()),
            token: Some("abc".into()),
            ..ConfigForm::default()
        })
        .unwrap()
        .save(ctx.store.as_ref(), project)
        .unwrap();
    }

    fn group(summary: &str, stacktrace: Option<&str>) -> Group {
        Group {
            id: "g1".into(),
            project: "p1".into(),
            permalink: "http://errors.example/p1/issues/g1/".into(),
            event: Event { summary: summary.into(), stacktrace: stacktrace.map(String::from) },
        }
    }

    #[test]
    fn unconfigured_project_offers_nothing() {
        let (ctx, _) = context(&[]);
        let workflow = IssueWorkflow::new(&ctx);
        assert!(!workflow.is_configured("p1"));
        assert_eq!(workflow.offer_create_action("p1", "g1"), None);
    }

    #[test]
    fn partial_configuration_is_not_configured() {
        let (ctx, _) = context(&[]);
        ctx.store.set_option("p1", "phabricator:host", Some("http://t/")).unwrap();
        ctx.store.set_option("p1", "phabricator:username", Some("bot")).unwrap();
        assert!(!IssueWorkflow::new(&ctx).is_configured("p1"));
    }

    #[test]
    fn offer_is_stable_until_submit() {
        let (ctx, _) = context(&[]);
        configure(&ctx, "p1");
        let workflow = IssueWorkflow::new(&ctx);

        let first = workflow.offer_create_action("p1", "g1");
        let second = workflow.offer_create_action("p1", "g1");
        assert_eq!(first, second);
        let action = first.unwrap();
        assert_eq!(action.label, "Create Maniphest Task");
        assert_eq!(action.target, "/p1/issues/g1/actions/phabricator/create/");
    }

    #[test]
    fn title_is_cut_at_two_hundred_chars() {
        let summary = "x".repeat(250);
        let draft = TaskDraft::for_group(&group(&summary, None));
        assert_eq!(draft.title, "x".repeat(200));
    }

    #[test]
    fn title_cut_counts_characters_not_bytes() {
        let summary = "é".repeat(201);
        let draft = TaskDraft::for_group(&group(&summary, None));
        assert_eq!(draft.title.chars().count(), 200);
    }

    #[test]
    fn description_without_trace_has_no_fence() {
        let draft = TaskDraft::for_group(&group("boom", None));
        assert_eq!(draft.description, "http://errors.example/p1/issues/g1/");
        assert!(!draft.description.contains("```"));

        let empty = TaskDraft::for_group(&group("boom", Some("")));
        assert!(!empty.description.contains("```"));
    }

    #[test]
    fn description_wraps_trace_in_one_fence() {
        let trace = "Traceback (most recent call last):\n  File \"app.py\", line 1\nValueError: bad";
        let draft = TaskDraft::for_group(&group("boom", Some(trace)));
        assert_eq!(
            draft.description,
            format!("http://errors.example/p1/issues/g1/\n\n```\n{trace}\n```")
        );
        assert_eq!(draft.description.matches("```").count(), 2);
    }

    #[test]
    fn fence_outgrows_backticks_in_trace() {
        let trace = "line with ``` inside";
        let draft = TaskDraft::for_group(&group("boom", Some(trace)));
        assert!(draft.description.ends_with("\n````"));
        assert!(draft.description.contains(&format!("````\n{trace}\n````")));
    }

    #[test]
    fn draft_check_enforces_field_rules() {
        let ok = TaskDraft { title: "t".into(), description: "d".into() };
        assert!(ok.check().is_ok());

        let blank = TaskDraft { title: "  ".into(), description: "d".into() };
        assert!(matches!(
            blank.check(),
            Err(WorkflowError::InvalidDraft { field: DraftField::Title, .. })
        ));

        let long = TaskDraft { title: "x".repeat(201), description: "d".into() };
        assert!(matches!(
            long.check(),
            Err(WorkflowError::InvalidDraft { field: DraftField::Title, ref message }) if message.contains("201")
        ));

        let no_body = TaskDraft { title: "t".into(), description: String::new() };
        assert!(matches!(
            no_body.check(),
            Err(WorkflowError::InvalidDraft { field: DraftField::Description, .. })
        ));
    }

    #[test]
    fn submit_links_group_and_withdraws_offer() {
        let (ctx, replayer) = context(&[json!({"Ok": {"id": "42"}})]);
        configure(&ctx, "p1");
        let workflow = IssueWorkflow::new(&ctx);
        let g = group("boom", None);

        let id = workflow.submit("p1", &g, &workflow.prepare_draft(&g)).unwrap();
        assert_eq!(id, TaskId::new("42"));
        assert_eq!(workflow.linked_task("g1").unwrap(), Some(TaskId::new("42")));
        assert_eq!(workflow.offer_create_action("p1", "g1"), None);
        assert_eq!(replayer.lock().unwrap().remaining("tracker", "create_task"), 0);
    }

    #[test]
    fn submit_on_unconfigured_project_is_blocking() {
        let (ctx, _) = context(&[]);
        let g = group("boom", None);
        let err = IssueWorkflow::new(&ctx).submit("p1", &g, &TaskDraft::for_group(&g)).unwrap_err();
        assert!(matches!(err, WorkflowError::NotConfigured));
        assert!(err.is_blocking());
    }

    #[test]
    fn invalid_draft_never_reaches_tracker() {
        let (ctx, replayer) = context(&[json!({"Ok": {"id": "1"}})]);
        configure(&ctx, "p1");
        let draft = TaskDraft { title: String::new(), description: "d".into() };

        let err = IssueWorkflow::new(&ctx).submit("p1", &group("b", None), &draft).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidDraft { .. }));
        assert_eq!(replayer.lock().unwrap().remaining("tracker", "create_task"), 1);
    }

    #[test]
    fn timeout_leaves_group_unlinked() {
        let (ctx, _) = context(&[json!({"Err": {"kind": "transport", "cause": "request timed out"}})]);
        configure(&ctx, "p1");
        let workflow = IssueWorkflow::new(&ctx);
        let g = group("boom", None);
        let draft = workflow.prepare_draft(&g);

        let err = workflow.submit("p1", &g, &draft).unwrap_err();
        assert!(matches!(err, WorkflowError::HostUnreachable(ref cause) if cause == "request timed out"));
        assert!(!err.is_blocking());
        assert_eq!(workflow.linked_task("g1").unwrap(), None);
        assert!(workflow.offer_create_action("p1", "g1").is_some());
    }

    #[test]
    fn rejection_carries_tracker_code_and_message() {
        let (ctx, _) = context(&[json!({"Err": {"kind": "api", "code": "ERR-CONDUIT-CORE", "message": "Invalid project"}})]);
        configure(&ctx, "p1");
        let g = group("boom", None);

        let err = IssueWorkflow::new(&ctx).submit("p1", &g, &TaskDraft::for_group(&g)).unwrap_err();
        assert_eq!(err.to_string(), "ERR-CONDUIT-CORE Invalid project");
        assert_eq!(ctx.store.get_group_value("g1", TASK_LINK_KEY).unwrap(), None);
    }

    #[test]
    fn resubmission_after_failure_succeeds() {
        let (ctx, _) = context(&[
            json!({"Err": {"kind": "transport", "cause": "connection failed"}}),
            json!({"Ok": {"id": 99}}),
        ]);
        configure(&ctx, "p1");
        let workflow = IssueWorkflow::new(&ctx);
        let g = group("boom", None);
        let edited = TaskDraft { title: "Edited title".into(), description: "Edited body".into() };

        assert!(workflow.submit("p1", &g, &edited).is_err());
        assert_eq!(workflow.submit("p1", &g, &edited).unwrap(), TaskId::new("99"));
        assert_eq!(edited.title, "Edited title");
    }

    #[test]
    fn linked_group_keeps_its_task() {
        let (ctx, replayer) = context(&[json!({"Ok": {"id": "42"}}), json!({"Ok": {"id": "43"}})]);
        configure(&ctx, "p1");
        let workflow = IssueWorkflow::new(&ctx);
        let g = group("boom", None);
        let draft = workflow.prepare_draft(&g);

        assert_eq!(workflow.submit("p1", &g, &draft).unwrap(), TaskId::new("42"));
        assert_eq!(workflow.submit("p1", &g, &draft).unwrap(), TaskId::new("42"));
        assert_eq!(workflow.linked_task("g1").unwrap(), Some(TaskId::new("42")));
        assert_eq!(replayer.lock().unwrap().remaining("tracker", "create_task"), 1);
    }

    #[test]
    fn group_of_another_project_is_refused() {
        let (ctx, replayer) = context(&[json!({"Ok": {"id": "1"}})]);
        configure(&ctx, "p2");
        let g = group("boom", None);

        let err = IssueWorkflow::new(&ctx).submit("p2", &g, &TaskDraft::for_group(&g)).unwrap_err();
        assert!(matches!(err, WorkflowError::ForeignGroup { ref project, .. } if project == "p1"));
        assert!(!err.is_blocking());
        assert_eq!(replayer.lock().unwrap().remaining("tracker", "create_task"), 1);
        assert_eq!(IssueWorkflow::new(&ctx).linked_task("g1").unwrap(), None);
    }
}
