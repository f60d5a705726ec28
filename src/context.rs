//! Service context bundling the port trait objects.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::adapters::live::{ConduitConnector, YamlFileStore};
use crate::adapters::memory::MemoryStore;
use crate::adapters::recording::tracker::RecordingConnector;
use crate::adapters::replaying::tracker::ReplayingConnector;
use crate::cassette::{Cassette, CassetteRecorder};
use crate::ports::{ConfigStore, TrackerConnector};
use crate::settings::Settings;

/// Bundles the store and the tracker connector.
///
/// Constructors wire up different adapter sets (live, recording,
/// replaying). Components borrow the context for one request.
pub struct ServiceContext {
    /// Project options and group metadata.
    pub store: Box<dyn ConfigStore>,
    /// Factory for tracker clients.
    pub tracker: Box<dyn TrackerConnector>,
    /// Written to disk on drop when recording.
    recorder: Option<Arc<Mutex<CassetteRecorder>>>,
}

impl ServiceContext {
    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(store: Box<dyn ConfigStore>, tracker: Box<dyn TrackerConnector>) -> Self {
        Self { store, tracker, recorder: None }
    }

    /// Creates a live context: YAML file store and Conduit over HTTP.
    ///
    /// When `settings.record_path` is set, tracker calls are also recorded
    /// and the cassette is written when the context is dropped.
    #[must_use]
    pub fn live(settings: &Settings) -> Self {
        let store = Box::new(YamlFileStore::new(&settings.store_path));
        let conduit = Box::new(ConduitConnector::new(settings.timeout));

        match &settings.record_path {
            Some(path) => {
                let recorder = Arc::new(Mutex::new(CassetteRecorder::new(path, "maniphest-link")));
                Self {
                    store,
                    tracker: Box::new(RecordingConnector::new(conduit, Arc::clone(&recorder))),
                    recorder: Some(recorder),
                }
            }
            None => Self::new(store, conduit),
        }
    }

    /// Creates a replaying context: in-memory store, tracker results served
    /// from the cassette at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be read or parsed.
    pub fn replaying(path: &Path) -> Result<Self, String> {
        let cassette = Cassette::load(path)?;
        Ok(Self::new(
            Box::new(MemoryStore::new()),
            Box::new(ReplayingConnector::from_cassette(&cassette)),
        ))
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            let guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            match guard.save() {
                Ok(path) => info!(path = %path.display(), "tracker cassette written"),
                Err(e) => warn!(error = %e, "failed to write tracker cassette"),
            }
        }
    }
}
