//! # Status Relay
//!
//! Drains the ordered status queue and forwards each update to the
//! application layer as an outbound method-channel message. The relay also
//! keeps the foreground notification in sync and republishes everything on
//! the in-process [`EventBus`].
//!
//! One relay task owns the channel, so outbound messages leave in exactly the
//! order the playback session produced them. Channel and notification
//! failures are logged; they never stop the relay.

use bridge_traits::{
    CoverArt, MethodChannel, NotificationContent, NotificationHost, VolumeChangeStream,
};
use core_playback::{MediaInfo, StatusReceiver, StatusUpdate};
use core_runtime::events::{CoreEvent, EventBus, NotificationEvent, PlaybackEvent, VolumeEvent};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

// ============================================================================
// Outbound Messages
// ============================================================================

/// One message for the application layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    pub method: &'static str,
    pub arguments: Value,
}

impl OutboundMessage {
    pub fn from_event(event: &PlaybackEvent) -> Self {
        let (method, arguments) = match event {
            PlaybackEvent::Ready { duration_ms } => ("ready", json!(duration_ms)),
            PlaybackEvent::SeekComplete { position_ms } => ("seekComplete", json!(position_ms)),
            PlaybackEvent::Buffering { buffering, percent } => (
                "buffering",
                json!({ "buffering": buffering, "buffer": percent }),
            ),
            PlaybackEvent::PlayStatus { is_playing } => ("playstatus", json!(is_playing)),
            PlaybackEvent::Progress {
                position_ms,
                duration_ms,
            } => (
                "timeupdate",
                json!({ "position": position_ms, "duration": duration_ms }),
            ),
            PlaybackEvent::Error { message } => ("error", json!(message)),
            PlaybackEvent::Ended => ("ended", Value::Null),
            PlaybackEvent::Next => ("next", Value::Null),
            PlaybackEvent::Previous => ("previous", Value::Null),
            PlaybackEvent::Stop => ("stop", Value::Null),
        };
        Self { method, arguments }
    }

    pub fn volume_change(volume: f64) -> Self {
        Self {
            method: "volumeChange",
            arguments: json!(volume),
        }
    }
}

// ============================================================================
// Relay
// ============================================================================

pub struct StatusRelay {
    channel: Arc<dyn MethodChannel>,
    notification: Option<Arc<dyn NotificationHost>>,
    events: EventBus,
    /// Content currently shown by the notification host.
    shown: Option<NotificationContent>,
    /// Media whose cover art has already been pushed.
    cover_sent_for: Option<Arc<MediaInfo>>,
}

impl StatusRelay {
    pub fn new(
        channel: Arc<dyn MethodChannel>,
        notification: Option<Arc<dyn NotificationHost>>,
        events: EventBus,
    ) -> Self {
        Self {
            channel,
            notification,
            events,
            shown: None,
            cover_sent_for: None,
        }
    }

    /// Run until cancelled or until every status producer is gone.
    ///
    /// On cancellation, updates already queued are still delivered.
    pub async fn run(
        mut self,
        mut status: StatusReceiver,
        mut volume: Option<Box<dyn VolumeChangeStream>>,
        cancel: CancellationToken,
    ) {
        info!(channel = self.channel.name(), "Status relay started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    while let Ok(update) = status.try_recv() {
                        self.forward(update).await;
                    }
                    break;
                }
                update = status.recv() => match update {
                    Some(update) => self.forward(update).await,
                    None => break,
                },
                change = next_volume(&mut volume) => match change {
                    Some(level) => self.forward_volume(level).await,
                    None => {
                        debug!("Volume stream ended");
                        volume = None;
                    }
                },
            }
        }

        info!("Status relay stopped");
    }

    /// Forward one playback update.
    pub async fn forward(&mut self, update: StatusUpdate) {
        self.send(OutboundMessage::from_event(&update.event)).await;
        let _ = self.events.emit(CoreEvent::Playback(update.event.clone()));

        let Some(media) = update.media else {
            return;
        };
        match update.event {
            PlaybackEvent::Ready { .. } => {
                self.refresh_notification(&media, false).await;
                self.push_cover(&media).await;
            }
            PlaybackEvent::PlayStatus { is_playing } => {
                self.refresh_notification(&media, is_playing).await;
            }
            _ => {}
        }
    }

    /// Forward a system volume change. The notification is left alone.
    pub async fn forward_volume(&mut self, volume: f64) {
        self.send(OutboundMessage::volume_change(volume)).await;
        let _ = self
            .events
            .emit(CoreEvent::Volume(VolumeEvent::Changed { volume }));
    }

    /// Content currently shown by the notification, if any.
    pub fn notification_state(&self) -> Option<&NotificationContent> {
        self.shown.as_ref()
    }

    async fn send(&self, message: OutboundMessage) {
        trace!(method = message.method, "Sending outbound message");
        if let Err(err) = self
            .channel
            .invoke_method(message.method, message.arguments)
            .await
        {
            warn!(method = message.method, error = %err, "Failed to deliver outbound message");
        }
    }

    async fn refresh_notification(&mut self, media: &MediaInfo, is_playing: bool) {
        let Some(host) = &self.notification else {
            return;
        };

        let content = NotificationContent {
            title: media.title.clone(),
            description: media.description.clone(),
            is_playing,
        };
        if self.shown.as_ref() == Some(&content) {
            return;
        }

        match host.update(&content).await {
            Ok(()) => {
                let _ = self
                    .events
                    .emit(CoreEvent::Notification(NotificationEvent::Updated {
                        title: content.title.clone(),
                        is_playing,
                    }));
                self.shown = Some(content);
            }
            Err(err) => {
                warn!(error = %err, "Notification update failed");
                let _ = self
                    .events
                    .emit(CoreEvent::Notification(NotificationEvent::UpdateFailed {
                        message: err.to_string(),
                    }));
            }
        }
    }

    async fn push_cover(&mut self, media: &Arc<MediaInfo>) {
        let Some(host) = &self.notification else {
            return;
        };
        let Some(reference) = &media.cover else {
            return;
        };
        if self
            .cover_sent_for
            .as_ref()
            .is_some_and(|sent| Arc::ptr_eq(sent, media))
        {
            return;
        }

        let cover = CoverArt {
            reference: reference.clone(),
            is_local: media.is_local_cover,
        };
        if let Err(err) = host.update_cover(&cover).await {
            warn!(error = %err, "Cover art update failed");
        }
        self.cover_sent_for = Some(Arc::clone(media));
    }
}

async fn next_volume(stream: &mut Option<Box<dyn VolumeChangeStream>>) -> Option<f64> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
