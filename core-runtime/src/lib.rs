//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audio manager core:
//! - Logging and tracing infrastructure
//! - Configuration management and bridge validation
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the playback and service crates
//! depend on. It establishes the logging conventions, the fail-fast
//! configuration builder and the in-process event broadcasting used
//! throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
