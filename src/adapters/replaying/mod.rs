//! Replaying adapters that serve recorded interactions.

pub mod tracker;

use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::cassette::CassetteReplayer;
use crate::error::TrackerError;

/// Pull the next recorded output for `port`/`method` and decode it using
/// the `{"Ok": value}` / `{"Err": error}` convention written by
/// `recording::record_result`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    port: &str,
    method: &str,
) -> Result<T, TrackerError> {
    let output = {
        let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
        guard.next_interaction(port, method).output.clone()
    };
    let malformed = || TrackerError::transport(format!("malformed cassette entry for {port}::{method}"));

    match output {
        Value::Object(mut map) => {
            if let Some(ok) = map.remove("Ok") {
                serde_json::from_value(ok).map_err(|_| malformed())
            } else if let Some(err) = map.remove("Err") {
                Err(serde_json::from_value(err).map_err(|_| malformed())?)
            } else {
                Err(malformed())
            }
        }
        _ => Err(malformed()),
    }
}
