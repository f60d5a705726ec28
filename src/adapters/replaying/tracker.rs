//! Replaying adapter for the tracker ports.

use std::sync::{Arc, Mutex, PoisonError};

use super::replay_result;
use crate::cassette::{Cassette, CassetteReplayer};
use crate::config::ProjectConfig;
use crate::error::TrackerError;
use crate::ports::{CreatedTask, Identity, NewTask, TrackerClient, TrackerConnector};

pub(crate) const PORT: &str = "tracker";

/// Serves tracker results from a cassette instead of the network.
///
/// Every client handed out shares one replayer, so interactions are
/// consumed in order across clients.
pub struct ReplayingConnector {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingConnector {
    /// Creates a connector backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }

    /// Creates a connector over a loaded cassette.
    #[must_use]
    pub fn from_cassette(cassette: &Cassette) -> Self {
        Self::new(Arc::new(Mutex::new(CassetteReplayer::new(cassette))))
    }

    /// Recorded calls to `method` that have not been replayed yet.
    #[must_use]
    pub fn remaining(&self, method: &str) -> usize {
        self.replayer.lock().unwrap_or_else(PoisonError::into_inner).remaining(PORT, method)
    }
}

impl TrackerConnector for ReplayingConnector {
    fn connect(&self, _config: &ProjectConfig) -> Result<Box<dyn TrackerClient>, TrackerError> {
        Ok(Box::new(ReplayingTracker { replayer: Arc::clone(&self.replayer) }))
    }
}

struct ReplayingTracker {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl TrackerClient for ReplayingTracker {
    fn whoami(&self) -> Result<Identity, TrackerError> {
        replay_result(&self.replayer, PORT, "whoami")
    }

    fn create_task(&self, _task: &NewTask) -> Result<CreatedTask, TrackerError> {
        replay_result(&self.replayer, PORT, "create_task")
    }
}
