//! Create Phabricator Maniphest tasks from error groups and link back to
//! them.
//!
//! The host application supplies a [`ports::ConfigStore`] and the group
//! being viewed; this crate validates tracker configuration
//! ([`validator`]), creates tasks ([`workflow`]), and renders links
//! ([`links`]). The `maniphest-link` binary plays the host's part from a
//! shell.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod links;
pub mod logging;
pub mod ports;
pub mod settings;
pub mod validator;
pub mod workflow;

use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing, settings, or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = cli::Cli::try_parse_from(args).map_err(|err| err.to_string())?;
    let settings = settings::Settings::from_env()?;
    logging::init(settings.log_json);
    commands::dispatch(&cli.command, &settings)
}
