//! Adapter implementations of the port traits.
//!
//! - `live`: real tracker over HTTP and a YAML file store.
//! - `memory`: in-process store for tests and replay.
//! - `recording` / `replaying`: cassette capture and playback of tracker
//!   interactions.

pub mod live;
pub mod memory;
pub mod recording;
pub mod replaying;
