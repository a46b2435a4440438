//! Foreground Notification Abstraction
//!
//! Background playback on mobile platforms requires a persistent notification
//! owned by a foreground service. The core decides *what* the notification
//! shows; the host decides *how* it is rendered.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Button shown on the playback notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationAction {
    Previous,
    PlayOrPause,
    Next,
    Stop,
}

impl NotificationAction {
    /// All actions in display order (the compact view shows the first three).
    pub const ALL: [NotificationAction; 4] = [
        NotificationAction::Previous,
        NotificationAction::PlayOrPause,
        NotificationAction::Next,
        NotificationAction::Stop,
    ];

    /// Stable identifier used for the broadcast intent behind the button.
    pub fn id(&self) -> &'static str {
        match self {
            NotificationAction::Previous => "MediaPlayerService_previous",
            NotificationAction::PlayOrPause => "MediaPlayerService_playOrPause",
            NotificationAction::Next => "MediaPlayerService_next",
            NotificationAction::Stop => "MediaPlayerService_stop",
        }
    }

    /// Parse a broadcast intent identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.id() == id)
    }
}

/// Content pushed to the host whenever the notification must be redrawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub description: String,
    pub is_playing: bool,
}

impl NotificationContent {
    /// Label of the play/pause button for the current state.
    pub fn play_pause_label(&self) -> &'static str {
        if self.is_playing {
            "Pause"
        } else {
            "Play"
        }
    }

    /// Buttons in the order they are laid out.
    pub fn actions(&self) -> [NotificationAction; 3] {
        [
            NotificationAction::Previous,
            NotificationAction::PlayOrPause,
            NotificationAction::Next,
        ]
    }
}

/// Cover art reference handed to the host, which loads the bitmap itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverArt {
    /// Resolved local path or remote URL.
    pub reference: String,
    /// Whether `reference` is a local file path.
    pub is_local: bool,
}

/// Notification host trait
///
/// # Platform Support
///
/// - **Android**: `NotificationCompat.MediaStyle` on a foreground `Service`
/// - **iOS**: `MPNowPlayingInfoCenter` + remote command center
/// - **Desktop**: MPRIS / SMTC, or a logging stand-in
#[async_trait::async_trait]
pub trait NotificationHost: Send + Sync {
    /// Redraw the notification with new title, description and play/pause icon.
    async fn update(&self, content: &NotificationContent) -> Result<()>;

    /// Replace the large icon with the given cover art.
    async fn update_cover(&self, cover: &CoverArt) -> Result<()>;

    /// Remove the notification.
    async fn cancel(&self) -> Result<()>;

    /// Subscribe to button presses.
    async fn subscribe_actions(&self) -> Result<Box<dyn NotificationActionStream>>;
}

/// Stream of notification button presses.
#[async_trait::async_trait]
pub trait NotificationActionStream: Send {
    /// Next pressed button. Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<NotificationAction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_ids_round_trip() {
        for action in NotificationAction::ALL {
            assert_eq!(NotificationAction::from_id(action.id()), Some(action));
        }
        assert_eq!(NotificationAction::from_id("unknown"), None);
    }

    #[test]
    fn play_pause_label_follows_state() {
        let mut content = NotificationContent {
            title: "Song".to_string(),
            description: "Artist".to_string(),
            is_playing: false,
        };
        assert_eq!(content.play_pause_label(), "Play");

        content.is_playing = true;
        assert_eq!(content.play_pause_label(), "Pause");
        assert_eq!(content.actions()[1], NotificationAction::PlayOrPause);
    }
}
