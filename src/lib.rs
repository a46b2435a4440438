//! Audio manager workspace crate.
//!
//! Re-exports the service façade so host applications can depend on
//! `audio-manager-workspace`, enable `desktop-shims`, and reach
//! [`core_service::AudioManagerService`] together with the desktop bridges
//! without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service;
