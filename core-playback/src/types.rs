//! # Playback Types
//!
//! Media description, session state and identifiers shared by the session
//! and the status relay.

use bridge_traits::MediaSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Media Info
// ============================================================================

/// Media handed to a playback session by `start`.
///
/// Immutable once the session owns it (it is shared as `Arc<MediaInfo>`); the
/// next `start` supersedes it with a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    /// Local path or remote URI, already resolved for bundled assets.
    pub url: String,
    pub description: String,
    /// Cover art reference (path or URL).
    pub cover: Option<String>,
    /// `url` was a bundled asset name.
    pub is_local_asset: bool,
    /// `cover` was a bundled asset name or data-directory file.
    pub is_local_cover: bool,
    /// Start playing as soon as the media is ready.
    pub auto_play: bool,
}

impl MediaInfo {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: String::new(),
            cover: None,
            is_local_asset: false,
            is_local_cover: false,
            auto_play: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    pub fn with_local_asset(mut self, is_local: bool) -> Self {
        self.is_local_asset = is_local;
        self
    }

    pub fn with_local_cover(mut self, is_local: bool) -> Self {
        self.is_local_cover = is_local;
        self
    }

    pub fn with_auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    /// Where the native player loads this media from.
    pub fn source(&self) -> MediaSource {
        MediaSource::from_url(&self.url)
    }
}

// ============================================================================
// Playback State
// ============================================================================

/// State of a playback session.
///
/// A session has exactly one primary state. `Buffering` and `Seeking` are
/// transient: they are tracked beside the primary state (see
/// [`PlaybackSession::transient`](crate::PlaybackSession::transient)) and
/// never replace it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    Idle,
    Preparing,
    Ready,
    Playing,
    Paused,
    /// Network buffering in progress (fill percent).
    Buffering(u8),
    /// A seek is in flight.
    Seeking,
    Error(String),
    Ended,
    Stopped,
}

impl PlaybackState {
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackState::Buffering(_) | PlaybackState::Seeking)
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// Media is loaded and the player accepts transport commands.
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            PlaybackState::Ready
                | PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Ended
        )
    }

    /// Nothing more will happen without a new command.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlaybackState::Idle | PlaybackState::Stopped | PlaybackState::Error(_)
        )
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Preparing => write!(f, "preparing"),
            PlaybackState::Ready => write!(f, "ready"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Buffering(percent) => write!(f, "buffering({}%)", percent),
            PlaybackState::Seeking => write!(f, "seeking"),
            PlaybackState::Error(message) => write!(f, "error({})", message),
            PlaybackState::Ended => write!(f, "ended"),
            PlaybackState::Stopped => write!(f, "stopped"),
        }
    }
}

// ============================================================================
// Session Id
// ============================================================================

/// Identifies one playback session in logs and lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_info_builder() {
        let media = MediaInfo::new("Song", "https://example.com/a.mp3")
            .with_description("Artist")
            .with_cover("covers/a.jpg")
            .with_local_cover(true)
            .with_auto_play(true);

        assert_eq!(media.title, "Song");
        assert_eq!(media.description, "Artist");
        assert_eq!(media.cover.as_deref(), Some("covers/a.jpg"));
        assert!(!media.is_local_asset);
        assert!(media.is_local_cover);
        assert!(media.auto_play);
        assert!(media.source().is_remote());
    }

    #[test]
    fn test_state_classification() {
        assert!(PlaybackState::Buffering(40).is_transient());
        assert!(PlaybackState::Seeking.is_transient());
        assert!(!PlaybackState::Paused.is_transient());

        assert!(PlaybackState::Ended.is_loaded());
        assert!(!PlaybackState::Preparing.is_loaded());
        assert!(PlaybackState::Error("x".into()).is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PlaybackState::Buffering(42).to_string(), "buffering(42%)");
        assert_eq!(PlaybackState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(PlaybackSessionId::new(), PlaybackSessionId::new());
    }
}
