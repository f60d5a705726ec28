//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the plugin core and a system
//! owned by someone else: the host's option/metadata store and the remote
//! tracker. Implementations live in `src/adapters/`.

pub mod store;
pub mod tracker;

pub use store::ConfigStore;
pub use tracker::{CreatedTask, Identity, NewTask, TaskId, TrackerClient, TrackerConnector};
