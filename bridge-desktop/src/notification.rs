//! Logging Notification Host
//!
//! Desktop stand-in for the Android foreground notification: content updates
//! are logged and kept in memory, and button presses can be injected with
//! [`LoggingNotificationHost::press`].

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    notification::{
        CoverArt, NotificationAction, NotificationActionStream, NotificationContent,
        NotificationHost,
    },
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const ACTION_BUFFER: usize = 16;

#[derive(Default)]
struct Shown {
    content: Option<NotificationContent>,
    cover: Option<CoverArt>,
}

pub struct LoggingNotificationHost {
    shown: Mutex<Shown>,
    actions: broadcast::Sender<NotificationAction>,
}

impl LoggingNotificationHost {
    pub fn new() -> Self {
        let (actions, _) = broadcast::channel(ACTION_BUFFER);
        Self {
            shown: Mutex::new(Shown::default()),
            actions,
        }
    }

    /// Content currently displayed, `None` before the first update or after cancel.
    pub fn content(&self) -> Option<NotificationContent> {
        self.shown.lock().content.clone()
    }

    /// Cover art currently displayed.
    pub fn cover(&self) -> Option<CoverArt> {
        self.shown.lock().cover.clone()
    }

    /// Simulate a button press. Returns `false` when nobody listens.
    pub fn press(&self, action: NotificationAction) -> bool {
        debug!(action = action.id(), "Notification button pressed");
        self.actions.send(action).is_ok()
    }
}

impl Default for LoggingNotificationHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationHost for LoggingNotificationHost {
    async fn update(&self, content: &NotificationContent) -> Result<()> {
        info!(
            title = %content.title,
            description = %content.description,
            button = content.play_pause_label(),
            "Notification updated"
        );
        self.shown.lock().content = Some(content.clone());
        Ok(())
    }

    async fn update_cover(&self, cover: &CoverArt) -> Result<()> {
        debug!(local = cover.is_local, "Notification cover updated");
        self.shown.lock().cover = Some(cover.clone());
        Ok(())
    }

    async fn cancel(&self) -> Result<()> {
        info!("Notification cancelled");
        *self.shown.lock() = Shown::default();
        Ok(())
    }

    async fn subscribe_actions(&self) -> Result<Box<dyn NotificationActionStream>> {
        Ok(Box::new(BroadcastActionStream {
            receiver: self.actions.subscribe(),
        }))
    }
}

struct BroadcastActionStream {
    receiver: broadcast::Receiver<NotificationAction>,
}

#[async_trait]
impl NotificationActionStream for BroadcastActionStream {
    async fn next(&mut self) -> Option<NotificationAction> {
        loop {
            match self.receiver.recv().await {
                Ok(action) => return Some(action),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Dropped notification button presses");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(is_playing: bool) -> NotificationContent {
        NotificationContent {
            title: "Song".to_string(),
            description: "Artist".to_string(),
            is_playing,
        }
    }

    #[tokio::test]
    async fn test_update_keeps_latest_content() {
        let host = LoggingNotificationHost::new();
        assert!(host.content().is_none());

        host.update(&content(false)).await.unwrap();
        host.update(&content(true)).await.unwrap();

        assert_eq!(host.content(), Some(content(true)));
    }

    #[tokio::test]
    async fn test_cancel_clears_state() {
        let host = LoggingNotificationHost::new();
        host.update(&content(true)).await.unwrap();
        host.update_cover(&CoverArt {
            reference: "https://example.com/cover.jpg".to_string(),
            is_local: false,
        })
        .await
        .unwrap();
        assert!(host.cover().is_some());

        host.cancel().await.unwrap();
        assert!(host.content().is_none());
        assert!(host.cover().is_none());
    }

    #[tokio::test]
    async fn test_pressed_actions_reach_subscribers() {
        let host = LoggingNotificationHost::new();
        assert!(!host.press(NotificationAction::Next));

        let mut actions = host.subscribe_actions().await.unwrap();
        assert!(host.press(NotificationAction::PlayOrPause));
        assert!(host.press(NotificationAction::Stop));

        assert_eq!(actions.next().await, Some(NotificationAction::PlayOrPause));
        assert_eq!(actions.next().await, Some(NotificationAction::Stop));
    }

    #[tokio::test]
    async fn test_stream_ends_with_host() {
        let host = LoggingNotificationHost::new();
        let mut actions = host.subscribe_actions().await.unwrap();

        drop(host);
        assert_eq!(actions.next().await, None);
    }
}
