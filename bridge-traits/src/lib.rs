//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the audio manager core and the
//! platform-specific code that owns the real media stack. Each trait represents
//! a capability the core requires but that must be implemented differently per
//! platform (Android `MediaPlayer`, a desktop audio engine, a test double).
//!
//! ## Traits
//!
//! ### Playback
//! - [`MediaPlayerFactory`](player::MediaPlayerFactory) - Creates one native player per session
//! - [`MediaPlayer`](player::MediaPlayer) - Transport control over a single native player
//!
//! ### Application Channel
//! - [`MethodChannel`](channel::MethodChannel) - Outbound messages to the application layer
//!
//! ### Platform Integration
//! - [`AssetResolver`](assets::AssetResolver) - Maps bundled asset names to loadable paths
//! - [`NotificationHost`](notification::NotificationHost) - Foreground playback notification
//! - [`VolumeController`](volume::VolumeController) - System media-stream volume
//!
//! ### Utilities
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Callbacks
//!
//! Native players report status from their own threads. Implementations push
//! [`PlayerCallback`](player::PlayerCallback) values through the
//! [`PlayerCallbackSender`](player::PlayerCallbackSender) handed to
//! [`MediaPlayer::load`](player::MediaPlayer::load); sending never blocks and is
//! safe from any thread. The core drains those callbacks on a single task so
//! status transitions are applied in arrival order.
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and keep the message actionable (file path, player error code, ...).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across async tasks behind `Arc`.

pub mod assets;
pub mod channel;
pub mod error;
pub mod notification;
pub mod player;
pub mod time;
pub mod volume;

pub use error::BridgeError;

// Re-export commonly used types
pub use assets::AssetResolver;
pub use channel::{MethodCall, MethodChannel};
pub use notification::{
    CoverArt, NotificationAction, NotificationActionStream, NotificationContent, NotificationHost,
};
pub use player::{
    MediaPlayer, MediaPlayerFactory, MediaSource, PlayerCallback, PlayerCallbackReceiver,
    PlayerCallbackSender,
};
pub use time::{LogEntry, LogLevel, LoggerSink};
pub use volume::{VolumeChangeStream, VolumeController};
