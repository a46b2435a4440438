//! Asset Resolution Abstraction
//!
//! Maps logical names of bundled resources (audio files, cover art) to paths
//! the native player or notification host can load.

use crate::error::Result;

/// Asset resolver trait
///
/// # Platform Support
///
/// - **Android (Flutter)**: `FlutterAssets.getAssetFilePathByName`
/// - **iOS**: `FlutterPluginRegistrar.lookupKeyForAsset`
/// - **Desktop**: a directory of bundled files
///
/// # Example
///
/// ```ignore
/// use bridge_traits::assets::AssetResolver;
///
/// async fn resolve_cover(resolver: &dyn AssetResolver, cover: &str) -> String {
///     if resolver.is_data_dir_file(cover) {
///         return cover.to_string();
///     }
///     resolver.lookup_asset(cover).await.unwrap_or_default()
/// }
/// ```
#[async_trait::async_trait]
pub trait AssetResolver: Send + Sync {
    /// Resolve a bundled asset name to a loadable path.
    ///
    /// Returns [`BridgeError::AssetNotFound`](crate::error::BridgeError::AssetNotFound)
    /// when the asset does not exist.
    async fn lookup_asset(&self, name: &str) -> Result<String>;

    /// Whether `path` already points into the application's data directory
    /// (e.g., a downloaded cover) and needs no lookup.
    fn is_data_dir_file(&self, path: &str) -> bool;
}
