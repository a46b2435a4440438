//! # Event Bus System
//!
//! Provides an in-process event bus for the audio manager core using
//! `tokio::sync::broadcast`. Playback sessions, the status relay and the volume
//! observer publish typed events here so Rust-side observers can follow what
//! the application layer is told over the method channel.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enums per domain (playback, volume, notification, session)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    emit     ┌───────────┐
//! │ Status Relay ├────────────>│           │
//! └──────────────┘             │ EventBus  │    subscribe    ┌────────────┐
//!                              │ (broadcast├────────────────>│ Subscriber │
//! ┌──────────────┐    emit     │  channel) │                 └────────────┘
//! │ Service      ├────────────>│           │
//! └──────────────┘             └───────────┘
//! ```
//!
//! The bus is a side channel. Ordered delivery to the application layer goes
//! through the relay queue, not through this bus; a lagging subscriber here
//! never affects what the host receives.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Playback(PlaybackEvent::Ready { duration_ms: 180_000 }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Media ready");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Status reported by the active playback session
    Playback(PlaybackEvent),
    /// System volume changes
    Volume(VolumeEvent),
    /// Foreground notification updates and button presses
    Notification(NotificationEvent),
    /// Session lifecycle
    Session(SessionEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Volume(e) => e.description(),
            CoreEvent::Notification(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Notification(NotificationEvent::UpdateFailed { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Playback(PlaybackEvent::Ready { .. })
            | CoreEvent::Playback(PlaybackEvent::Ended)
            | CoreEvent::Session(_) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Status events emitted by a playback session.
///
/// Each variant maps one-to-one onto an outbound method-channel message
/// (`ready`, `seekComplete`, `buffering`, `playstatus`, `timeupdate`, `error`,
/// `ended`, `next`, `previous`, `stop`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Preparation finished.
    Ready {
        /// Media duration (milliseconds).
        duration_ms: u64,
    },
    /// A seek request completed.
    SeekComplete {
        /// Position reached (milliseconds).
        position_ms: u64,
    },
    /// Network buffering progress.
    Buffering {
        /// Whether playback is stalled waiting for data.
        buffering: bool,
        /// Buffer fill level in percent.
        percent: u8,
    },
    /// Playback started or paused.
    PlayStatus { is_playing: bool },
    /// Periodic position report while playing.
    Progress { position_ms: u64, duration_ms: u64 },
    /// The native player failed.
    Error { message: String },
    /// Media played to the end.
    Ended,
    /// Skip forward requested from the notification.
    Next,
    /// Skip back requested from the notification.
    Previous,
    /// Playback stopped.
    Stop,
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Ready { .. } => "Media ready",
            PlaybackEvent::SeekComplete { .. } => "Seek completed",
            PlaybackEvent::Buffering { .. } => "Buffering progress",
            PlaybackEvent::PlayStatus { is_playing: true } => "Playback started",
            PlaybackEvent::PlayStatus { is_playing: false } => "Playback paused",
            PlaybackEvent::Progress { .. } => "Playback position changed",
            PlaybackEvent::Error { .. } => "Playback error",
            PlaybackEvent::Ended => "Media completed",
            PlaybackEvent::Next => "Next requested",
            PlaybackEvent::Previous => "Previous requested",
            PlaybackEvent::Stop => "Playback stopped",
        }
    }
}

// ============================================================================
// Volume Events
// ============================================================================

/// Events from the system volume observer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum VolumeEvent {
    /// Media-stream volume changed.
    Changed {
        /// New volume fraction (0.0 - 1.0).
        volume: f64,
    },
}

impl VolumeEvent {
    fn description(&self) -> &str {
        match self {
            VolumeEvent::Changed { .. } => "Volume changed",
        }
    }
}

// ============================================================================
// Notification Events
// ============================================================================

/// Events related to the foreground playback notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NotificationEvent {
    /// Notification content was redrawn.
    Updated { title: String, is_playing: bool },
    /// The host rejected an update.
    UpdateFailed { message: String },
    /// A notification button was pressed.
    ActionPressed {
        /// Stable action identifier (e.g., `MediaPlayerService_next`).
        action: String,
    },
}

impl NotificationEvent {
    fn description(&self) -> &str {
        match self {
            NotificationEvent::Updated { .. } => "Notification updated",
            NotificationEvent::UpdateFailed { .. } => "Notification update failed",
            NotificationEvent::ActionPressed { .. } => "Notification action pressed",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Lifecycle of playback sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A new session was created for `start`.
    Started {
        session_id: String,
        /// Media title.
        title: String,
    },
    /// A session released its native player.
    Released { session_id: String },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::Started { .. } => "Playback session started",
            SessionEvent::Released { .. } => "Playback session released",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let playback_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Playback(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
