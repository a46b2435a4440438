//! Native media player bridge traits.
//!
//! These abstractions let the core playback session drive a platform media
//! player (Android `MediaPlayer`, AVPlayer, a desktop engine) without knowing
//! anything about decoding, buffering or audio focus. One [`MediaPlayer`] backs
//! exactly one playback session and is released when the session ends.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::error::Result;

/// Where the native player should load media from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// File accessible to the host runtime (resolved asset or data-dir file).
    LocalFile { path: PathBuf },
    /// Remote URI fetched by the native player (`http`, `https`, `content`, ...).
    Remote { url: String },
}

impl MediaSource {
    /// Classify a resolved URL or path.
    ///
    /// `file://` URLs and scheme-less strings are local files; anything else
    /// with a `scheme://` prefix is handed to the player as a remote URI.
    pub fn from_url(url: &str) -> Self {
        if let Some(path) = url.strip_prefix("file://") {
            return MediaSource::LocalFile {
                path: PathBuf::from(path),
            };
        }

        if url.contains("://") {
            MediaSource::Remote {
                url: url.to_string(),
            }
        } else {
            MediaSource::LocalFile {
                path: PathBuf::from(url),
            }
        }
    }

    /// Returns `true` if the player needs network access for this source.
    pub fn is_remote(&self) -> bool {
        matches!(self, MediaSource::Remote { .. })
    }
}

/// Status reported by a native player from its callback thread(s).
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCallback {
    /// Asynchronous preparation finished; media is ready to start.
    Prepared { duration_ms: u64 },
    /// Network buffering progress in percent (0-100).
    BufferingUpdate { percent: u8 },
    /// A seek request finished.
    SeekComplete { position_ms: u64 },
    /// Playback reached the end of the media.
    Completion,
    /// The player failed; the message is surfaced to the application layer.
    Error { message: String },
}

/// Sending half handed to a native player.
///
/// Cloneable and usable from any thread; sends never block. Sends after the
/// session has been released are silently dropped.
#[derive(Debug, Clone)]
pub struct PlayerCallbackSender {
    inner: mpsc::UnboundedSender<PlayerCallback>,
}

/// Receiving half drained by the playback session driver.
pub type PlayerCallbackReceiver = mpsc::UnboundedReceiver<PlayerCallback>;

impl PlayerCallbackSender {
    /// Create a connected sender/receiver pair.
    pub fn channel() -> (Self, PlayerCallbackReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { inner: tx }, rx)
    }

    /// Report a callback. Returns `false` if the session is gone.
    pub fn send(&self, callback: PlayerCallback) -> bool {
        self.inner.send(callback).is_ok()
    }

    /// Returns `true` once the receiving session has been dropped.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Creates native players.
///
/// A fresh player is requested for every `start` so the previous one can be
/// fully released before the new media begins preparing.
#[async_trait::async_trait]
pub trait MediaPlayerFactory: Send + Sync {
    async fn create_player(&self) -> Result<Box<dyn MediaPlayer>>;
}

/// Transport control over a single native player.
///
/// `load` must return as soon as asynchronous preparation has been initiated;
/// completion is reported with [`PlayerCallback::Prepared`] (or
/// [`PlayerCallback::Error`]) through the provided sender.
#[async_trait::async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Begin asynchronous preparation of `source`.
    async fn load(&self, source: MediaSource, callbacks: PlayerCallbackSender) -> Result<()>;

    /// Start or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the current position.
    async fn pause(&self) -> Result<()>;

    /// Stop playback.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position; completion is reported via callback.
    async fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Set the playback speed multiplier (1.0 = normal).
    async fn set_speed(&self, rate: f32) -> Result<()>;

    /// Current playback position.
    async fn position_ms(&self) -> Result<u64>;

    /// Media duration, `0` when unknown.
    async fn duration_ms(&self) -> Result<u64>;

    /// Whether the native player is currently producing audio.
    async fn is_playing(&self) -> Result<bool>;

    /// Free native resources. Must be safe to call in any state.
    async fn release(&self) -> Result<()>;
}
