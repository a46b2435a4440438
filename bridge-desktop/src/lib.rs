//! # Desktop Bridge Implementations
//!
//! Default implementations of the optional bridge traits for desktop
//! platforms (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! Desktop hosts have no foreground-service notification and no media-stream
//! volume owned by the OS in the Android sense, so this crate provides
//! stand-ins that behave consistently for development and tests:
//! - `AssetResolver` backed by a directory of bundled files
//! - `VolumeController` as an in-process software master volume
//! - `NotificationHost` that logs updates and lets callers simulate button presses
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DirectoryAssetResolver, LoggingNotificationHost, SoftwareVolumeController};
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .player_factory(Arc::new(MyPlayerFactory))
//!     .method_channel(Arc::new(MyChannel))
//!     .asset_resolver(Arc::new(DirectoryAssetResolver::new("./assets", "./data")))
//!     .notification_host(Arc::new(LoggingNotificationHost::new()))
//!     .volume_controller(Arc::new(SoftwareVolumeController::default()))
//!     .build()?;
//! ```

mod assets;
mod notification;
mod volume;

pub use assets::DirectoryAssetResolver;
pub use notification::LoggingNotificationHost;
pub use volume::SoftwareVolumeController;
