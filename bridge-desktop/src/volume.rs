//! Software Volume Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    volume::{VolumeChangeStream, VolumeController},
};
use tokio::sync::watch;
use tracing::debug;

/// In-process master volume for desktop hosts.
///
/// Holds a single volume fraction; every change (including those made through
/// [`set_volume`](VolumeController::set_volume)) is observable through
/// [`subscribe_changes`](VolumeController::subscribe_changes). Observers see
/// the latest value; intermediate values may be coalesced.
pub struct SoftwareVolumeController {
    volume: watch::Sender<f64>,
}

impl SoftwareVolumeController {
    /// Create a controller starting at `initial` (clamped to `0.0..=1.0`).
    pub fn new(initial: f64) -> Self {
        let (volume, _) = watch::channel(clamp_volume(initial));
        Self { volume }
    }
}

impl Default for SoftwareVolumeController {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn clamp_volume(volume: f64) -> f64 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl VolumeController for SoftwareVolumeController {
    async fn current_volume(&self) -> Result<f64> {
        Ok(*self.volume.borrow())
    }

    async fn set_volume(&self, volume: f64) -> Result<()> {
        let volume = clamp_volume(volume);
        let changed = self.volume.send_if_modified(|current| {
            if *current == volume {
                return false;
            }
            *current = volume;
            true
        });

        if changed {
            debug!(volume, "Software volume changed");
        }
        Ok(())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn VolumeChangeStream>> {
        Ok(Box::new(WatchVolumeStream {
            receiver: self.volume.subscribe(),
        }))
    }
}

struct WatchVolumeStream {
    receiver: watch::Receiver<f64>,
}

#[async_trait]
impl VolumeChangeStream for WatchVolumeStream {
    async fn next(&mut self) -> Option<f64> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }
}
