//! `maniphest-link configure` command.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::config::ConfigForm;
use crate::context::ServiceContext;
use crate::error::ConfigError;
use crate::validator::ConfigValidator;

/// Arguments of the `configure` command.
#[derive(Debug)]
pub struct ConfigureArgs<'a> {
    /// Project identifier.
    pub project: &'a str,
    /// Tracker base URL.
    pub host: &'a str,
    /// Conduit API token.
    pub token: Option<&'a str>,
    /// Username for certificate authentication.
    pub username: Option<&'a str>,
    /// File holding the certificate.
    pub certificate_file: Option<&'a Path>,
    /// JSON array of project references.
    pub project_refs: Option<&'a str>,
}

/// Execute the `configure` command: validate, then persist on success.
///
/// # Errors
///
/// Returns an error string if the certificate file cannot be read, the
/// configuration is rejected, or it cannot be stored.
pub fn run(ctx: &ServiceContext, args: &ConfigureArgs<'_>) -> Result<String, String> {
    let certificate = args
        .certificate_file
        .map(|path| {
            std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read certificate file {}: {e}", path.display()))
        })
        .transpose()?;

    let submitted = [
        ("host", Some(args.host)),
        ("token", args.token),
        ("username", args.username),
        ("certificate", certificate.as_deref()),
        ("projectRefs", args.project_refs),
    ];
    let fields: HashMap<String, String> = submitted
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v.to_string())))
        .collect();
    let form = ConfigForm::from_fields(&fields);

    let config = ConfigValidator::new(ctx).validate(&form).map_err(|e| describe(&e))?;
    config
        .save(ctx.store.as_ref(), args.project)
        .map_err(|e| format!("Failed to save configuration: {e}"))?;

    let mut out = String::new();
    let _ = writeln!(out, "Saved Phabricator configuration for project {}", args.project);
    let _ = writeln!(out, "  host: {}", config.host);
    if let Some(refs) = &config.project_refs {
        let _ = writeln!(out, "  projects: {}", refs.join(", "));
    }
    Ok(out)
}

fn describe(err: &ConfigError) -> String {
    match err.field() {
        Some(field) => format!("{field}: {err}"),
        None => err.to_string(),
    }
}
