//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `maniphest-link`.
#[derive(Debug, Parser)]
#[command(
    name = "maniphest-link",
    version,
    about = "Create Phabricator Maniphest tasks from error groups"
)]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify tracker credentials for a project and store them.
    Configure {
        /// Project identifier.
        #[arg(long)]
        project: String,
        /// Tracker base URL, e.g. `https://phabricator.example.com/`.
        #[arg(long)]
        host: String,
        /// Conduit API token.
        #[arg(long)]
        token: Option<String>,
        /// Username for certificate authentication.
        #[arg(long)]
        username: Option<String>,
        /// File containing the Conduit certificate.
        #[arg(long)]
        certificate_file: Option<PathBuf>,
        /// JSON array of tracker project references.
        #[arg(long)]
        project_refs: Option<String>,
    },
    /// Show whether a project is configured and what a group offers.
    Status {
        /// Project identifier.
        #[arg(long)]
        project: String,
        /// Group identifier to check.
        #[arg(long)]
        group: Option<String>,
    },
    /// Print the prefilled task draft for a group.
    Draft {
        /// JSON file describing the group and its latest event.
        #[arg(long)]
        group_file: PathBuf,
    },
    /// Create a task for a group and link it.
    Create {
        /// Project identifier.
        #[arg(long)]
        project: String,
        /// JSON file describing the group and its latest event.
        #[arg(long)]
        group_file: PathBuf,
        /// Replacement title.
        #[arg(long)]
        title: Option<String>,
        /// Replacement description.
        #[arg(long)]
        description: Option<String>,
    },
    /// Print task links for groups.
    Links {
        /// Project identifier.
        #[arg(long)]
        project: String,
        /// Group identifiers.
        #[arg(required = true)]
        groups: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_configure_with_token() {
        let cli = Cli::parse_from([
            "maniphest-link",
            "configure",
            "--project",
            "p1",
            "--host",
            "http://t/",
            "--token",
            "abc",
        ]);
        assert!(matches!(
            cli.command,
            Command::Configure { ref token, ref username, .. } if token.as_deref() == Some("abc") && username.is_none()
        ));
    }

    #[test]
    fn links_requires_group_ids() {
        assert!(Cli::try_parse_from(["maniphest-link", "links", "--project", "p1"]).is_err());
        let cli = Cli::parse_from(["maniphest-link", "links", "--project", "p1", "g1", "g2"]);
        assert!(matches!(cli.command, Command::Links { ref groups, .. } if groups.len() == 2));
    }
}
