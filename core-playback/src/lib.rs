//! # Playback Session Module
//!
//! Drives a single native media player and reports its status.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback state machine (`idle → preparing → ready → playing ⇄ paused → stopped/ended`)
//! - Transport commands (play, pause, stop, seek, speed)
//! - Native player callbacks, applied in arrival order
//! - Periodic progress reporting while playing
//! - The ordered status queue consumed by the status relay
//!
//! Decoding, buffering and audio focus stay in the native player behind
//! [`bridge_traits::MediaPlayer`].

pub mod error;
pub mod session;
pub mod status;
pub mod types;

pub use error::{PlaybackError, Result};
pub use session::PlaybackSession;
pub use status::{StatusReceiver, StatusSink, StatusUpdate};
pub use types::{MediaInfo, PlaybackSessionId, PlaybackState};
