//! `maniphest-link draft` command.

use crate::context::ServiceContext;
use crate::group::Group;
use crate::workflow::IssueWorkflow;

/// Execute the `draft` command.
#[must_use]
pub fn run(ctx: &ServiceContext, group: &Group) -> String {
    let draft = IssueWorkflow::new(ctx).prepare_draft(group);
    format!("Title: {}\n\n{}\n", draft.title, draft.description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{context, group};

    #[test]
    fn prints_title_and_description() {
        let out = run(&context(&[]), &group());
        assert_eq!(
            out,
            "Title: ZeroDivisionError: division by zero\n\nhttp://errors.example/p1/issues/g1/\n"
        );
    }
}
