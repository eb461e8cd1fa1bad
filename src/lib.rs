//! # Terrain Mesher
//!
//! Multi-resolution terrain meshes built from heightfields.
//!
//! ## Overview
//!
//! A heightfield is split into a grid of square patches. Every patch holds a
//! chain of triangle-strip meshes at doubling sample steps, optionally ringed
//! by a skirt that hides cracks between neighbours drawn at different levels.
//! At draw time each patch is frustum culled, picks a level from its
//! projected screen area, and submits its mesh through a [`RenderBackend`].
//! Patches can carry up to several blended surface layers whose textures are
//! shared through a reference-counted cache.
//!
//! ## Quick Start
//!
//! ```ignore
//! use terrain_mesher::{open_terrain, export_glb, ExportLevel};
//!
//! // Load a terrain definition (or a bare PNG heightmap) from a directory
//! let terrain = open_terrain("assets/", "terrain/hills.json")?;
//!
//! // Export the finest level of every patch
//! let glb_bytes = export_glb(&terrain, ExportLevel::Finest)?;
//! ```
//!
//! ## Drawing
//!
//! ```ignore
//! use terrain_mesher::{CountingBackend, Scene, Viewport, Camera};
//!
//! let scene = Scene::new(Viewport::sized(1280.0, 720.0)).with_camera(camera);
//! let mut backend = CountingBackend::default();
//! let triangles = terrain.draw(&scene, &mut backend, false);
//! ```

pub mod assets;
pub mod error;
pub mod export;
pub mod heightfield;
pub mod material;
pub mod mesher;
pub mod render;
pub mod scene;
pub mod terrain;
pub mod types;

// Re-export main types for convenience
pub use assets::{AssetSource, TextureCache, TextureData, TextureLoader};
pub use error::{Result, TerrainError};
pub use export::{export_glb, export_obj, export_raw, ExportLevel, RawPatchData};
pub use heightfield::HeightField;
pub use material::{Material, MaterialSource};
pub use mesher::{Mesh, PatchMeshBuilder, PatchRegion, Vertex};
pub use render::{CountingBackend, DrawCall, RenderBackend};
pub use scene::{Camera, DirectionalLight, Scene, Viewport};
pub use terrain::{
    BlendChannel, PatchId, Terrain, TerrainConfig, TerrainFlags, TerrainListener, TerrainPatch,
};
pub use types::{BoundingBox, BoundingSphere};

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Open a terrain from an asset root (directory or ZIP) and a path inside it.
///
/// `path` may name a PNG heightmap or a JSON terrain definition. Textures are
/// loaded from the same root through a fresh cache.
pub fn open_terrain<P: AsRef<Path>>(root: P, path: &str) -> Result<Terrain> {
    let source = AssetSource::open(root)?;
    let textures = Rc::new(RefCell::new(TextureCache::new(source.clone())));
    Terrain::open(&source, path, textures)
}
