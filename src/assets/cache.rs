//! Reference-counted texture cache.
//!
//! Loading a path that is already resident returns the same [`Texture`] and
//! bumps its reference count; the texture is dropped from the cache when the
//! last reference is released. The cache is single-threaded and is normally
//! shared between terrains as `Rc<RefCell<TextureCache>>`.

use super::texture::{load_texture_from_bytes, Texture, TextureData};
use super::AssetSource;
use crate::error::{Result, TerrainError};
use std::collections::HashMap;
use std::rc::Rc;

/// Produces texture pixels for a path.
pub trait TextureLoader {
    fn load(&self, path: &str) -> Result<TextureData>;
}

impl TextureLoader for AssetSource {
    fn load(&self, path: &str) -> Result<TextureData> {
        let bytes = self.read(path)?;
        load_texture_from_bytes(&bytes)
            .map_err(|e| TerrainError::TextureLoad(format!("{}: {}", path, e)))
    }
}

impl<F> TextureLoader for F
where
    F: Fn(&str) -> Result<TextureData>,
{
    fn load(&self, path: &str) -> Result<TextureData> {
        self(path)
    }
}

struct CacheEntry {
    texture: Rc<Texture>,
    ref_count: usize,
}

/// Path-keyed texture cache with explicit acquire/release counting.
pub struct TextureCache {
    loader: Box<dyn TextureLoader>,
    entries: HashMap<String, CacheEntry>,
}

impl std::fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCache")
            .field("textures", &self.entries.len())
            .finish()
    }
}

impl TextureCache {
    pub fn new(loader: impl TextureLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            entries: HashMap::new(),
        }
    }

    /// Acquire a texture, loading it on first use.
    pub fn acquire(&mut self, path: &str) -> Result<Rc<Texture>> {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.ref_count += 1;
            return Ok(Rc::clone(&entry.texture));
        }

        let data = self.loader.load(path)?;
        let texture = Rc::new(Texture::new(path, data));
        self.entries.insert(
            path.to_string(),
            CacheEntry {
                texture: Rc::clone(&texture),
                ref_count: 1,
            },
        );
        log::debug!("Loaded texture {}", path);
        Ok(texture)
    }

    /// Release one reference. Returns true if the texture was unloaded.
    pub fn release(&mut self, path: &str) -> bool {
        let Some(entry) = self.entries.get_mut(path) else {
            log::warn!("Released texture {} that is not loaded", path);
            return false;
        };

        entry.ref_count -= 1;
        if entry.ref_count == 0 {
            self.entries.remove(path);
            log::debug!("Unloaded texture {}", path);
            true
        } else {
            false
        }
    }

    /// Current reference count for a path (0 if not loaded).
    pub fn ref_count(&self, path: &str) -> usize {
        self.entries.get(path).map(|e| e.ref_count).unwrap_or(0)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of distinct loaded textures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> TextureCache {
        TextureCache::new(|path: &str| -> Result<TextureData> {
            if path.starts_with("missing") {
                Err(TerrainError::AssetNotFound(path.to_string()))
            } else {
                Ok(TextureData::solid(1, 1, [255; 4]))
            }
        })
    }

    #[test]
    fn test_acquire_shares_texture() {
        let mut cache = cache();
        let a = cache.acquire("grass.png").unwrap();
        let b = cache.acquire("grass.png").unwrap();

        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.ref_count("grass.png"), 2);
    }

    #[test]
    fn test_release_unloads_on_last_reference() {
        let mut cache = cache();
        cache.acquire("rock.png").unwrap();
        cache.acquire("rock.png").unwrap();

        assert!(!cache.release("rock.png"));
        assert!(cache.contains("rock.png"));
        assert!(cache.release("rock.png"));
        assert!(cache.is_empty());
        assert!(!cache.release("rock.png"));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let mut cache = cache();
        assert!(cache.acquire("missing.png").is_err());
        assert_eq!(cache.ref_count("missing.png"), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_asset_source_loader() {
        let mut png = Vec::new();
        image::RgbaImage::from_raw(2, 1, vec![0, 0, 0, 255, 255, 255, 255, 255])
            .unwrap()
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let source = AssetSource::memory()
            .with_entry("tex/a.png", png)
            .with_entry("tex/bad.png", b"junk".to_vec());

        let mut cache = TextureCache::new(source);
        let tex = cache.acquire("tex/a.png").unwrap();
        assert_eq!(tex.data.width, 2);
        assert!(matches!(cache.acquire("tex/bad.png"), Err(TerrainError::TextureLoad(_))));
        assert!(matches!(cache.acquire("tex/none.png"), Err(TerrainError::AssetNotFound(_))));
    }
}
