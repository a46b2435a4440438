//! System Volume Abstraction
//!
//! The media-stream volume belongs to the OS; the core only reads it, writes
//! it on request and observes changes made elsewhere (hardware keys, other
//! apps). Volumes are fractions in `0.0..=1.0`.

use crate::error::Result;

/// Volume controller trait
///
/// # Platform Support
///
/// - **Android**: `AudioManager.STREAM_MUSIC` + `VOLUME_CHANGED_ACTION` receiver
/// - **iOS**: `AVAudioSession.outputVolume` KVO
/// - **Desktop**: software master volume
#[async_trait::async_trait]
pub trait VolumeController: Send + Sync {
    /// Current media-stream volume as a fraction.
    async fn current_volume(&self) -> Result<f64>;

    /// Set the media-stream volume. Callers pass a value already clamped to
    /// `0.0..=1.0`.
    async fn set_volume(&self, volume: f64) -> Result<()>;

    /// Subscribe to volume changes.
    ///
    /// Implementations should emit whenever the system volume changes,
    /// including changes caused by [`set_volume`](Self::set_volume).
    async fn subscribe_changes(&self) -> Result<Box<dyn VolumeChangeStream>>;
}

/// Stream of volume changes.
#[async_trait::async_trait]
pub trait VolumeChangeStream: Send {
    /// Next volume fraction. Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<f64>;
}
