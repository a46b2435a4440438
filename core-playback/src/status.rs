//! # Status Queue
//!
//! The single ordered path from playback sessions (and the dispatcher) to the
//! status relay. Native callbacks, command results and the progress ticker
//! all enqueue here; the relay drains the queue on one task, so the
//! application layer observes events in the order they were produced.

use crate::types::MediaInfo;
use core_runtime::events::PlaybackEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::trace;

/// One event plus the media it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Media of the emitting session; `None` before any `start`.
    pub media: Option<Arc<MediaInfo>>,
    pub event: PlaybackEvent,
}

/// Receiving half drained by the status relay.
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusUpdate>;

/// Producer handle for the status queue.
///
/// Cloneable; sends never block. Sends after the relay is gone are dropped.
#[derive(Debug, Clone)]
pub struct StatusSink {
    sender: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusSink {
    /// Create a connected sink/receiver pair.
    pub fn channel() -> (Self, StatusReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn emit(&self, media: Option<Arc<MediaInfo>>, event: PlaybackEvent) {
        trace!(?event, "Queueing status update");
        if self.sender.send(StatusUpdate { media, event }).is_err() {
            trace!("Status relay gone, dropping update");
        }
    }

    /// Report a failure that happened before or instead of a transition:
    /// `error` followed by `stop`.
    pub fn fail(&self, media: Option<Arc<MediaInfo>>, message: impl Into<String>) {
        self.emit(
            media.clone(),
            PlaybackEvent::Error {
                message: message.into(),
            },
        );
        self.emit(media, PlaybackEvent::Stop);
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
