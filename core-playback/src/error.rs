//! # Playback Error Types
//!
//! Error types for playback session operations.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// A transport argument is out of range (e.g., non-positive speed).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Attempted operation when no session exists.
    #[error("No active playback session")]
    NoActiveSession,

    /// The session has already released its native player.
    #[error("Playback session released")]
    Released,

    /// The operation is not valid in the session's current state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Bundled asset or cover could not be resolved.
    #[error("Failed to resolve media source: {0}")]
    SourceUnavailable(String),

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// The native player or another bridge failed.
    #[error("Player error: {0}")]
    Bridge(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if the caller supplied a bad value; state is unchanged.
    pub fn is_argument_error(&self) -> bool {
        matches!(self, PlaybackError::InvalidArgument(_))
    }

    /// Returns `true` if the native player reported the failure.
    pub fn is_player_error(&self) -> bool {
        matches!(self, PlaybackError::Bridge(_))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(PlaybackError::InvalidArgument("rate".into()).is_argument_error());
        assert!(!PlaybackError::NoActiveSession.is_argument_error());

        let err: PlaybackError = BridgeError::Player("MEDIA_ERROR_IO".into()).into();
        assert!(err.is_player_error());
        assert!(err.to_string().contains("MEDIA_ERROR_IO"));
    }

    #[test]
    fn test_invalid_state_message() {
        let err = PlaybackError::InvalidState {
            operation: "seek",
            state: "preparing".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot seek while preparing");
    }
}
