//! Method Channel Abstraction
//!
//! The outbound half of the message boundary between the application layer
//! and native code. Inbound calls arrive as [`MethodCall`] values handed to the
//! core's dispatcher; outbound status updates leave through [`MethodChannel`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A named call received from the application layer.
///
/// `arguments` is normally a JSON object; a missing argument map is
/// represented as `Value::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Call without arguments.
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Raw argument value, if present and not `null`.
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key).filter(|value| !value.is_null())
    }

    /// Whether the argument map carries `key` with a non-null value.
    pub fn has_argument(&self, key: &str) -> bool {
        self.argument(key).is_some()
    }

    /// String argument; non-string scalars are rendered through their JSON form.
    pub fn string_argument(&self, key: &str) -> Option<String> {
        self.argument(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Boolean argument, `default` when absent or not a boolean.
    pub fn bool_argument(&self, key: &str, default: bool) -> bool {
        self.argument(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }
}

/// Outbound channel to the application layer.
///
/// # Platform Support
///
/// - **Flutter**: `MethodChannel.invokeMethod` on the platform thread
/// - **Desktop / tests**: any in-process sink (e.g., a `tokio::sync::mpsc` sender)
///
/// Implementations must deliver calls in the order `invoke_method` is awaited.
#[async_trait::async_trait]
pub trait MethodChannel: Send + Sync {
    /// Channel name used for logging (e.g., `"audio_manager"`).
    fn name(&self) -> &str;

    /// Send `method` with `arguments` to the application layer.
    async fn invoke_method(&self, method: &str, arguments: Value) -> Result<()>;
}
