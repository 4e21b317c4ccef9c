// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Sources of bundled audio assets, addressed by logical key ("c", "csharp", ...).

use std::collections::HashMap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use symphonia::core::io::MediaSource;
use tracing::debug;

/// Error types for opening assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("No asset found for key '{0}'")]
    NotFound(String),

    #[error("IO error opening {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// An opened, seekable asset ready to be decoded.
pub struct Asset {
    /// The key this asset was opened by.
    pub key: String,
    /// The raw media stream.
    pub source: Box<dyn MediaSource>,
    /// File extension used to hint the container format, if known.
    pub extension: Option<String>,
}

/// Provides audio assets by key.
pub trait AssetSource: Send + Sync {
    /// Opens the asset with the given key.
    fn open(&self, key: &str) -> Result<Asset, AssetError>;
}

/// Reads assets from `<root>/<key>.<extension>`, with optional per-key file overrides.
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    root: PathBuf,
    extension: String,
    overrides: HashMap<String, PathBuf>,
}

impl DirectoryAssets {
    /// Creates a directory asset source.
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
            overrides: HashMap::new(),
        }
    }

    /// Maps a key to a specific file. Relative paths are resolved against the root.
    pub fn with_override(mut self, key: &str, file: impl AsRef<Path>) -> Self {
        self.overrides
            .insert(key.to_string(), file.as_ref().to_path_buf());
        self
    }

    /// Returns the path that will be opened for the given key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        match self.overrides.get(key) {
            Some(file) if file.is_absolute() => file.clone(),
            Some(file) => self.root.join(file),
            None => self.root.join(format!("{}.{}", key, self.extension)),
        }
    }
}

impl AssetSource for DirectoryAssets {
    fn open(&self, key: &str) -> Result<Asset, AssetError> {
        let path = self.path_for(key);
        debug!(key, path = ?path, "Opening asset");
        let file = File::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(key.to_string()),
            _ => AssetError::Io {
                path: path.clone(),
                source: e,
            },
        })?;

        Ok(Asset {
            key: key.to_string(),
            source: Box::new(file),
            extension: path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_string),
        })
    }
}

/// Serves assets from in-memory buffers.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    assets: HashMap<String, (Arc<[u8]>, Option<String>)>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset under the given key.
    pub fn insert(&mut self, key: &str, bytes: Vec<u8>, extension: Option<&str>) {
        self.assets.insert(
            key.to_string(),
            (Arc::from(bytes), extension.map(str::to_string)),
        );
    }

    /// Removes the asset with the given key, if present.
    pub fn remove(&mut self, key: &str) {
        self.assets.remove(key);
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, key: &str) -> Result<Asset, AssetError> {
        let (bytes, extension) = self
            .assets
            .get(key)
            .ok_or_else(|| AssetError::NotFound(key.to_string()))?;

        Ok(Asset {
            key: key.to_string(),
            source: Box::new(Cursor::new(bytes.clone())),
            extension: extension.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn test_directory_paths() {
        let assets = DirectoryAssets::new("/samples", ".wav")
            .with_override("fsharp", "alt/fsharp_low.flac")
            .with_override("b", "/abs/b.wav");

        assert_eq!(PathBuf::from("/samples/c.wav"), assets.path_for("c"));
        assert_eq!(
            PathBuf::from("/samples/alt/fsharp_low.flac"),
            assets.path_for("fsharp")
        );
        assert_eq!(PathBuf::from("/abs/b.wav"), assets.path_for("b"));
    }

    #[test]
    fn test_directory_open() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        std::fs::write(dir.path().join("c.wav"), b"data")?;

        let assets = DirectoryAssets::new(dir.path(), "wav");
        let mut asset = assets.open("c")?;
        assert_eq!("c", asset.key);
        assert_eq!(Some("wav".to_string()), asset.extension);

        let mut contents = Vec::new();
        asset.source.read_to_end(&mut contents)?;
        assert_eq!(b"data".to_vec(), contents);

        assert!(matches!(assets.open("d"), Err(AssetError::NotFound(key)) if key == "d"));
        Ok(())
    }

    #[test]
    fn test_memory_assets() -> Result<(), Box<dyn std::error::Error>> {
        let mut assets = MemoryAssets::new();
        assets.insert("c", vec![1, 2, 3], Some("wav"));

        // Every open reads the same shared buffer from the start.
        for _ in 0..2 {
            let mut asset = assets.open("c")?;
            let mut contents = Vec::new();
            asset.source.read_to_end(&mut contents)?;
            assert_eq!(vec![1, 2, 3], contents);
        }
        assert_eq!(
            1,
            assets
                .assets
                .get("c")
                .map(|(bytes, _)| Arc::strong_count(bytes))
                .unwrap_or_default()
        );

        assets.remove("c");
        assert!(matches!(assets.open("c"), Err(AssetError::NotFound(_))));
        Ok(())
    }
}
