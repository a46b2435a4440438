//! Asset Resolution from a Bundle Directory

use async_trait::async_trait;
use bridge_traits::{
    assets::AssetResolver,
    error::{BridgeError, Result},
};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

const APP_DIR_NAME: &str = "audio-manager";

/// Resolves bundled asset names against a directory on disk.
///
/// Asset names are relative paths such as `assets/audio/intro.mp3`, the same
/// keys the application layer uses for its bundle. Files under `data_dir`
/// (downloaded covers, cached media) are recognized as data-directory files
/// and need no lookup.
pub struct DirectoryAssetResolver {
    assets_dir: PathBuf,
    data_dir: PathBuf,
}

impl DirectoryAssetResolver {
    /// Create a resolver with explicit directories
    pub fn new(assets_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Create a resolver rooted in the platform data directory.
    ///
    /// Bundled assets are expected in `<data_dir>/audio-manager/assets`; the
    /// directory is created if missing.
    pub fn from_default_dirs() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(APP_DIR_NAME);
        let assets_dir = data_dir.join("assets");

        std::fs::create_dir_all(&assets_dir)?;
        debug!(path = %assets_dir.display(), "Using default asset directory");

        Ok(Self::new(assets_dir, data_dir))
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Join `name` onto the asset directory, refusing names that escape it.
    fn candidate_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if name.is_empty() || escapes {
            return Err(BridgeError::AssetNotFound(format!(
                "Invalid asset name: {}",
                name
            )));
        }

        Ok(self.assets_dir.join(relative))
    }
}

#[async_trait]
impl AssetResolver for DirectoryAssetResolver {
    async fn lookup_asset(&self, name: &str) -> Result<String> {
        let path = self.candidate_path(name)?;

        if !fs::try_exists(&path).await? {
            return Err(BridgeError::AssetNotFound(name.to_string()));
        }

        debug!(asset = name, "Resolved bundled asset");
        Ok(path.to_string_lossy().into_owned())
    }

    fn is_data_dir_file(&self, path: &str) -> bool {
        Path::new(path).starts_with(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dirs() -> (PathBuf, PathBuf) {
        let base = std::env::temp_dir().join(format!("asset-resolver-{}", uuid::Uuid::new_v4()));
        let assets = base.join("assets");
        std::fs::create_dir_all(assets.join("audio")).unwrap();
        (base, assets)
    }

    #[tokio::test]
    async fn test_lookup_existing_asset() {
        let (base, assets) = scratch_dirs();
        std::fs::write(assets.join("audio").join("a.mp3"), b"ID3").unwrap();
        let resolver = DirectoryAssetResolver::new(&assets, base.join("data"));

        let resolved = resolver.lookup_asset("audio/a.mp3").await.unwrap();
        assert_eq!(PathBuf::from(resolved), assets.join("audio").join("a.mp3"));

        let _ = std::fs::remove_dir_all(&base);
    }

    #[tokio::test]
    async fn test_lookup_missing_asset() {
        let (base, assets) = scratch_dirs();
        let resolver = DirectoryAssetResolver::new(&assets, base.join("data"));

        let err = resolver.lookup_asset("audio/missing.mp3").await.unwrap_err();
        assert!(matches!(err, BridgeError::AssetNotFound(name) if name == "audio/missing.mp3"));

        let _ = std::fs::remove_dir_all(&base);
    }

    #[tokio::test]
    async fn test_lookup_rejects_escaping_names() {
        let resolver = DirectoryAssetResolver::new("/srv/assets", "/srv/data");

        assert!(resolver.lookup_asset("../secret.mp3").await.is_err());
        assert!(resolver.lookup_asset("/etc/passwd").await.is_err());
        assert!(resolver.lookup_asset("").await.is_err());
    }

    #[test]
    fn test_is_data_dir_file() {
        let resolver = DirectoryAssetResolver::new("/srv/assets", "/srv/data");

        assert!(resolver.is_data_dir_file("/srv/data/covers/1.jpg"));
        assert!(!resolver.is_data_dir_file("/srv/database/1.jpg"));
        assert!(!resolver.is_data_dir_file("covers/1.jpg"));
    }
}
