//! Process-level settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default tracker request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const STORE_VAR: &str = "MANIPHEST_LINK_STORE";
const TIMEOUT_VAR: &str = "MANIPHEST_LINK_TIMEOUT_SECS";
const RECORD_VAR: &str = "MANIPHEST_LINK_RECORD";
const LOG_JSON_VAR: &str = "MANIPHEST_LINK_LOG_JSON";

/// Settings for the host harness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// YAML file holding project options and group metadata.
    pub store_path: PathBuf,
    /// Upper bound on every tracker call.
    pub timeout: Duration,
    /// When set, tracker interactions are recorded to this cassette.
    pub record_path: Option<PathBuf>,
    /// Emit JSON log lines instead of plain text.
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(".maniphest-link/store.yaml"),
            timeout: DEFAULT_TIMEOUT,
            record_path: None,
            log_json: false,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment, after loading a
    /// `.env` file if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut settings = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(STORE_VAR) {
            settings.store_path = PathBuf::from(path);
        }
        if let Some(raw) = get(TIMEOUT_VAR) {
            let secs: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| format!("{TIMEOUT_VAR} must be a positive number of seconds, got {raw:?}"))?;
            settings.timeout = Duration::from_secs(secs);
        }
        settings.record_path = get(RECORD_VAR).map(PathBuf::from);
        settings.log_json =
            get(LOG_JSON_VAR).is_some_and(|v| matches!(v.trim(), "1" | "true" | "yes"));

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.timeout, Duration::from_secs(5));
    }

    #[test]
    fn variables_override_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            (STORE_VAR, "/tmp/store.yaml"),
            (TIMEOUT_VAR, "3"),
            (RECORD_VAR, "/tmp/tracker.cassette.yaml"),
            (LOG_JSON_VAR, "true"),
        ]))
        .unwrap();
        assert_eq!(settings.store_path, PathBuf::from("/tmp/store.yaml"));
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.record_path, Some(PathBuf::from("/tmp/tracker.cassette.yaml")));
        assert!(settings.log_json);
    }

    #[test]
    fn zero_or_garbage_timeout_is_rejected() {
        for bad in ["0", "-1", "soon"] {
            let err = Settings::from_lookup(lookup(&[(TIMEOUT_VAR, bad)])).unwrap_err();
            assert!(err.contains(TIMEOUT_VAR), "value {bad}");
        }
    }
}
