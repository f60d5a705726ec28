//! Recording adapters that capture interactions to cassettes.

pub mod tracker;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};

use crate::cassette::CassetteRecorder;

/// Record a `Result` interaction.
///
/// Mirror of `replaying::replay_result`:
/// - `Ok(v)` is stored as `{"Ok": v}`
/// - `Err(e)` is stored as `{"Err": e}`
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: Serialize,
    I: Serialize,
{
    let input_json = serde_json::to_value(input).unwrap_or(Value::Null);
    let output_json = match result {
        Ok(v) => json!({ "Ok": serde_json::to_value(v).unwrap_or(Value::Null) }),
        Err(e) => json!({ "Err": serde_json::to_value(e).unwrap_or(Value::Null) }),
    };

    let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
    guard.record(port, method, input_json, output_json);
}
