//! Receiver-side playback controls

pub mod volume;

pub use volume::{MUTE_DB, VOLUME_CONTENT_TYPE, Volume};
