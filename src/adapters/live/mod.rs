//! Live adapters for real external interactions.

pub mod conduit;
pub mod store;

pub use conduit::{ConduitClient, ConduitConnector};
pub use store::YamlFileStore;
