//! # Core Configuration Module
//!
//! Provides configuration management for the audio manager core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all host bridges and settings for the core. It enforces
//! fail-fast validation so a missing capability is reported at startup rather
//! than on the first `start` call.
//!
//! ## Required Dependencies
//!
//! - `MediaPlayerFactory` - Creates the native player behind each session
//! - `MethodChannel` - Outbound messages to the application layer
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `AssetResolver` - Bundled asset lookup (desktop default: directory resolver)
//! - `NotificationHost` - Foreground notification (desktop default: logging host)
//! - `VolumeController` - System volume (desktop default: software volume)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults for the
//! optional bridges are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .player_factory(Arc::new(MyPlayerFactory))
//!     .method_channel(Arc::new(MyChannel))
//!     .progress_interval(Duration::from_millis(500))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Fails: no MediaPlayerFactory or MethodChannel
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AssetResolver, MediaPlayerFactory, MethodChannel, NotificationHost, VolumeController,
};
use std::sync::Arc;
use std::time::Duration;

/// Interval between `timeupdate` messages while playing.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(1000);
const MIN_PROGRESS_INTERVAL: Duration = Duration::from_millis(50);
const MAX_PROGRESS_INTERVAL: Duration = Duration::from_secs(60);

/// Name of the method channel shared with the application layer.
pub const DEFAULT_CHANNEL_NAME: &str = "audio_manager";

/// Core configuration for the audio manager.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Creates native players (required)
    pub player_factory: Arc<dyn MediaPlayerFactory>,

    /// Outbound channel to the application layer (required)
    pub method_channel: Arc<dyn MethodChannel>,

    /// Bundled asset lookup (optional with desktop default)
    pub asset_resolver: Option<Arc<dyn AssetResolver>>,

    /// Foreground notification host (optional with desktop default)
    pub notification_host: Option<Arc<dyn NotificationHost>>,

    /// System volume (optional with desktop default)
    pub volume_controller: Option<Arc<dyn VolumeController>>,

    /// Features flags
    pub features: FeatureFlags,

    /// Period of the progress ticker
    pub progress_interval: Duration,

    /// Buffer size of the in-process event bus
    pub event_buffer_size: usize,

    /// Value returned by `getPlatformVersion`
    pub platform_version: String,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("player_factory", &"MediaPlayerFactory { ... }")
            .field("method_channel", &self.method_channel.name())
            .field(
                "asset_resolver",
                &self
                    .asset_resolver
                    .as_ref()
                    .map(|_| "AssetResolver { ... }"),
            )
            .field(
                "notification_host",
                &self
                    .notification_host
                    .as_ref()
                    .map(|_| "NotificationHost { ... }"),
            )
            .field(
                "volume_controller",
                &self
                    .volume_controller
                    .as_ref()
                    .map(|_| "VolumeController { ... }"),
            )
            .field("features", &self.features)
            .field("progress_interval", &self.progress_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("platform_version", &self.platform_version)
            .finish()
    }
}

/// Feature flags control optional functionality.
///
/// Enabled features require the corresponding bridge; [`CoreConfig::validate`]
/// rejects a flag whose bridge is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Keep the foreground notification in sync and listen for its buttons
    /// (requires NotificationHost)
    pub enable_notification: bool,

    /// Forward system volume changes as `volumeChange` (requires VolumeController)
    pub enable_volume_observer: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_notification: true,
            enable_volume_observer: true,
        }
    }
}

impl FeatureFlags {
    /// All optional features off.
    pub fn none() -> Self {
        Self {
            enable_notification: false,
            enable_volume_observer: false,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Progress interval is between 50 ms and 60 s
    /// - Event buffer size is > 0
    /// - Platform version is not empty
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval < MIN_PROGRESS_INTERVAL
            || self.progress_interval > MAX_PROGRESS_INTERVAL
        {
            return Err(Error::Config(format!(
                "Progress interval must be between {:?} and {:?}, got {:?}",
                MIN_PROGRESS_INTERVAL, MAX_PROGRESS_INTERVAL, self.progress_interval
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.platform_version.trim().is_empty() {
            return Err(Error::Config(
                "Platform version cannot be empty".to_string(),
            ));
        }

        if self.features.enable_notification && self.notification_host.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "NotificationHost".to_string(),
                message: "Notification enabled but no NotificationHost provided. \
                          Disable the feature or inject a NotificationHost implementation."
                    .to_string(),
            });
        }

        if self.features.enable_volume_observer && self.volume_controller.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "VolumeController".to_string(),
                message: "Volume observer enabled but no VolumeController provided. \
                          Disable the feature or inject a VolumeController implementation."
                    .to_string(),
            });
        }

        Ok(())
    }
}

fn player_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaPlayerFactory".to_string(),
        message: "MediaPlayerFactory implementation is required to create native players. \
                 Android: wrap android.media.MediaPlayer. \
                 iOS: wrap AVPlayer. \
                 Desktop/tests: inject an in-process player."
            .to_string(),
    }
}

fn method_channel_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MethodChannel".to_string(),
        message: "MethodChannel implementation is required to deliver status events \
                 to the application layer. Flutter: wrap the 'audio_manager' MethodChannel."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_asset_resolver() -> Result<Option<Arc<dyn AssetResolver>>> {
    use bridge_desktop::DirectoryAssetResolver;

    let resolver = DirectoryAssetResolver::from_default_dirs().map_err(|e| {
        Error::Internal(format!("Failed to initialize default AssetResolver: {}", e))
    })?;
    Ok(Some(Arc::new(resolver)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_asset_resolver() -> Result<Option<Arc<dyn AssetResolver>>> {
    // Remote-only hosts work without a resolver; local starts report the gap.
    Ok(None)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_notification_host() -> Option<Arc<dyn NotificationHost>> {
    Some(Arc::new(bridge_desktop::LoggingNotificationHost::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_notification_host() -> Option<Arc<dyn NotificationHost>> {
    None
}

#[cfg(feature = "desktop-shims")]
fn provide_default_volume_controller() -> Option<Arc<dyn VolumeController>> {
    Some(Arc::new(bridge_desktop::SoftwareVolumeController::default()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_volume_controller() -> Option<Arc<dyn VolumeController>> {
    None
}

fn default_platform_version() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) to validate and create the
/// final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    player_factory: Option<Arc<dyn MediaPlayerFactory>>,
    method_channel: Option<Arc<dyn MethodChannel>>,
    asset_resolver: Option<Arc<dyn AssetResolver>>,
    notification_host: Option<Arc<dyn NotificationHost>>,
    volume_controller: Option<Arc<dyn VolumeController>>,
    features: Option<FeatureFlags>,
    progress_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    platform_version: Option<String>,
}

impl CoreConfigBuilder {
    /// Sets the native player factory (required).
    pub fn player_factory(mut self, factory: Arc<dyn MediaPlayerFactory>) -> Self {
        self.player_factory = Some(factory);
        self
    }

    /// Sets the outbound method channel (required).
    pub fn method_channel(mut self, channel: Arc<dyn MethodChannel>) -> Self {
        self.method_channel = Some(channel);
        self
    }

    /// Sets the asset resolver used for `isLocal`/`isLocalCover` media.
    pub fn asset_resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.asset_resolver = Some(resolver);
        self
    }

    /// Sets the notification host.
    pub fn notification_host(mut self, host: Arc<dyn NotificationHost>) -> Self {
        self.notification_host = Some(host);
        self
    }

    /// Sets the system volume controller.
    pub fn volume_controller(mut self, controller: Arc<dyn VolumeController>) -> Self {
        self.volume_controller = Some(controller);
        self
    }

    pub fn enable_notification(mut self, enabled: bool) -> Self {
        self.features
            .get_or_insert_with(FeatureFlags::default)
            .enable_notification = enabled;
        self
    }

    pub fn enable_volume_observer(mut self, enabled: bool) -> Self {
        self.features
            .get_or_insert_with(FeatureFlags::default)
            .enable_volume_observer = enabled;
        self
    }

    /// Replaces all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }

    /// Sets the period of `timeupdate` messages (default 1 s).
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = Some(interval);
        self
    }

    /// Sets the event bus buffer size (default 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the string returned by `getPlatformVersion`.
    pub fn platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = Some(version.into());
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Optional bridges that were not provided are filled with desktop
    /// defaults when the `desktop-shims` feature is enabled.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] if a required bridge is absent, or a
    ///   feature flag is enabled without its bridge
    /// - [`Error::Config`] if a setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let player_factory = self.player_factory.ok_or_else(player_factory_missing_error)?;
        let method_channel = self.method_channel.ok_or_else(method_channel_missing_error)?;

        let asset_resolver = match self.asset_resolver {
            Some(resolver) => Some(resolver),
            None => provide_default_asset_resolver()?,
        };

        let notification_host = self
            .notification_host
            .or_else(provide_default_notification_host);
        let volume_controller = self
            .volume_controller
            .or_else(provide_default_volume_controller);

        let config = CoreConfig {
            player_factory,
            method_channel,
            asset_resolver,
            notification_host,
            volume_controller,
            features: self.features.unwrap_or_default(),
            progress_interval: self.progress_interval.unwrap_or(DEFAULT_PROGRESS_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            platform_version: self
                .platform_version
                .unwrap_or_else(default_platform_version),
        };

        config.validate()?;

        Ok(config)
    }
}
