//! Asset access for heightmaps, textures and terrain definitions.
//!
//! Assets are addressed by forward-slash relative paths and can come from a
//! directory, a ZIP archive, or an in-memory table.

pub mod cache;
pub mod texture;

pub use cache::{TextureCache, TextureLoader};
pub use texture::{Texture, TextureData};

use crate::error::{Result, TerrainError};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Where asset bytes are read from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Files below a root directory.
    Directory(PathBuf),
    /// Entries of a ZIP archive held in memory.
    Archive(Vec<u8>),
    /// Explicit path-to-bytes table.
    Memory(HashMap<String, Vec<u8>>),
}

impl AssetSource {
    /// Open a directory or ZIP file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.is_dir() {
            Ok(Self::Directory(path.to_path_buf()))
        } else {
            let data = std::fs::read(path)?;
            Self::from_archive_bytes(data)
        }
    }

    /// Wrap ZIP data, validating that it parses as an archive.
    pub fn from_archive_bytes(data: Vec<u8>) -> Result<Self> {
        zip::ZipArchive::new(std::io::Cursor::new(data.as_slice()))?;
        Ok(Self::Archive(data))
    }

    /// An empty in-memory source.
    pub fn memory() -> Self {
        Self::Memory(HashMap::new())
    }

    /// Add an entry to an in-memory source. Other variants are left unchanged.
    pub fn with_entry(mut self, path: impl Into<String>, data: Vec<u8>) -> Self {
        if let Self::Memory(entries) = &mut self {
            entries.insert(normalize_path(&path.into()), data);
        }
        self
    }

    /// Read the full contents of an asset.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize_path(path);

        match self {
            Self::Directory(root) => {
                let full = root.join(&path);
                if !full.is_file() {
                    return Err(TerrainError::AssetNotFound(path));
                }
                Ok(std::fs::read(full)?)
            }
            Self::Archive(data) => {
                let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data.as_slice()))?;
                let mut file = match archive.by_name(&path) {
                    Ok(file) => file,
                    Err(zip::result::ZipError::FileNotFound) => {
                        return Err(TerrainError::AssetNotFound(path));
                    }
                    Err(e) => return Err(e.into()),
                };
                let mut contents = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut contents)?;
                Ok(contents)
            }
            Self::Memory(entries) => entries
                .get(&path)
                .cloned()
                .ok_or(TerrainError::AssetNotFound(path)),
        }
    }

    /// Read an asset as UTF-8 text.
    pub fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| TerrainError::InvalidConfig(format!("{} is not UTF-8: {}", path, e)))
    }

    /// Check whether an asset exists.
    pub fn exists(&self, path: &str) -> bool {
        let path = normalize_path(path);

        match self {
            Self::Directory(root) => root.join(&path).is_file(),
            Self::Archive(data) => zip::ZipArchive::new(std::io::Cursor::new(data.as_slice()))
                .map(|mut archive| archive.by_name(&path).is_ok())
                .unwrap_or(false),
            Self::Memory(entries) => entries.contains_key(&path),
        }
    }
}

/// Convert backslashes and strip a leading "./" or "/".
fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = path.trim_start_matches("./").trim_start_matches('/');
    path.to_string()
}

/// Uppercase extension of a path without the dot, e.g. "PNG".
pub(crate) fn extension_upper(path: &str) -> Option<String> {
    Path::new(path)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("./textures/grass.png"), "textures/grass.png");
        assert_eq!(normalize_path("textures\\rock.png"), "textures/rock.png");
        assert_eq!(normalize_path("/heightmap.raw"), "heightmap.raw");
    }

    #[test]
    fn test_extension_upper() {
        assert_eq!(extension_upper("a/b/height.png").as_deref(), Some("PNG"));
        assert_eq!(extension_upper("height.r16").as_deref(), Some("R16"));
        assert_eq!(extension_upper("noext"), None);
    }

    #[test]
    fn test_memory_source() {
        let source = AssetSource::memory().with_entry("a/b.bin", vec![1, 2, 3]);
        assert_eq!(source.read("./a/b.bin").unwrap(), vec![1, 2, 3]);
        assert!(source.exists("a/b.bin"));
        assert!(matches!(source.read("missing"), Err(TerrainError::AssetNotFound(_))));
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("textures")).unwrap();
        std::fs::write(dir.path().join("textures/dirt.bin"), b"dirt").unwrap();

        let source = AssetSource::open(dir.path()).unwrap();
        assert_eq!(source.read("textures/dirt.bin").unwrap(), b"dirt");
        assert!(!source.exists("textures/none.bin"));
        assert!(matches!(
            source.read("textures/none.bin"),
            Err(TerrainError::AssetNotFound(_))
        ));
    }

    #[test]
    fn test_archive_source() {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("terrain/heights.raw", options).unwrap();
            writer.write_all(&[0, 255, 0, 255]).unwrap();
            writer.finish().unwrap();
        }

        let source = AssetSource::from_archive_bytes(buffer.into_inner()).unwrap();
        assert_eq!(source.read("terrain/heights.raw").unwrap(), vec![0, 255, 0, 255]);
        assert!(source.exists("terrain/heights.raw"));
        assert!(matches!(
            source.read("terrain/other.raw"),
            Err(TerrainError::AssetNotFound(_))
        ));
    }
}
