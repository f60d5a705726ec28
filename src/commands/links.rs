//! `maniphest-link links` command.

use std::fmt::Write as _;

use crate::context::ServiceContext;
use crate::links::LinkRenderer;

/// Execute the `links` command: one prefetch, one line per linked group.
///
/// # Errors
///
/// Returns an error string if the store cannot be read.
pub fn run(ctx: &ServiceContext, project: &str, groups: &[String]) -> Result<String, String> {
    let renderer = LinkRenderer::new(ctx);
    let ids: Vec<&str> = groups.iter().map(String::as_str).collect();
    let mut prefetched =
        renderer.prefetch(&ids).map_err(|e| format!("Failed to read task links: {e}"))?;

    let mut out = String::new();
    for id in &ids {
        if let Some(link) = renderer.render(project, id, &mut prefetched) {
            let _ = writeln!(out, "{id}\t{}\t{}", link.label, link.href);
        }
    }
    Ok(out)
}
