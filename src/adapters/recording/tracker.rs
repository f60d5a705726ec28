//! Recording adapter for the tracker ports.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::record_result;
use crate::adapters::replaying::tracker::PORT;
use crate::cassette::CassetteRecorder;
use crate::config::ProjectConfig;
use crate::error::TrackerError;
use crate::ports::{CreatedTask, Identity, NewTask, TrackerClient, TrackerConnector};

/// Wraps another connector and records every tracker call it serves.
pub struct RecordingConnector {
    inner: Box<dyn TrackerConnector>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingConnector {
    /// Creates a recording connector delegating to `inner`.
    pub fn new(inner: Box<dyn TrackerConnector>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl TrackerConnector for RecordingConnector {
    fn connect(&self, config: &ProjectConfig) -> Result<Box<dyn TrackerClient>, TrackerError> {
        let inner = self.inner.connect(config)?;
        Ok(Box::new(RecordingTracker {
            inner,
            host: config.host.to_string(),
            recorder: Arc::clone(&self.recorder),
        }))
    }
}

struct RecordingTracker {
    inner: Box<dyn TrackerClient>,
    host: String,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

#[derive(Serialize)]
struct WhoamiInput<'a> {
    host: &'a str,
}

#[derive(Serialize)]
struct CreateTaskInput<'a> {
    host: &'a str,
    task: &'a NewTask,
}

impl TrackerClient for RecordingTracker {
    fn whoami(&self) -> Result<Identity, TrackerError> {
        let result = self.inner.whoami();
        let input = WhoamiInput { host: &self.host };
        record_result(&self.recorder, PORT, "whoami", &input, &result);
        result
    }

    fn create_task(&self, task: &NewTask) -> Result<CreatedTask, TrackerError> {
        let result = self.inner.create_task(task);
        let input = CreateTaskInput { host: &self.host, task };
        record_result(&self.recorder, PORT, "create_task", &input, &result);
        result
    }
}
