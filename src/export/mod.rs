//! Mesh export formats.
//!
//! Each exporter walks the terrain's patches and writes one level of detail
//! per patch, chosen by [`ExportLevel`].

pub mod gltf;
pub mod obj;
pub mod raw;

pub use gltf::export_glb;
pub use obj::export_obj;
pub use raw::{export_raw, RawPatchData};

use crate::terrain::{Level, TerrainPatch};

/// Which level of detail each patch contributes to an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportLevel {
    /// Full resolution (level 0).
    #[default]
    Finest,
    /// A fixed level, clamped to each patch's coarsest.
    Index(usize),
    /// Whatever the last draw selected.
    Current,
}

impl ExportLevel {
    pub(crate) fn select<'a>(&self, patch: &'a TerrainPatch) -> &'a Level {
        let levels = patch.levels();
        let index = match self {
            Self::Finest => 0,
            Self::Index(index) => *index,
            Self::Current => patch.current_level(),
        };
        &levels[index.min(levels.len() - 1)]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::assets::{TextureCache, TextureData};
    use crate::error::Result;
    use crate::heightfield::HeightField;
    use crate::terrain::Terrain;
    use glam::Vec3;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A 9x9 sloped terrain split into 2x2 patches with three levels each.
    pub fn sloped_terrain(normal_map: bool) -> Terrain {
        let heights = (0..81).map(|i| (i % 9) as f32 * 0.25).collect();
        let field = HeightField::from_heights(9, 9, heights).unwrap();
        let textures = Rc::new(RefCell::new(TextureCache::new(|_: &str| -> Result<TextureData> {
            Ok(TextureData::solid(2, 2, [128, 128, 255, 255]))
        })));
        let normal_map = normal_map.then_some("normals.png");
        Terrain::create(Rc::new(field), Vec3::ONE, 4, 3, 0.0, normal_map, textures).unwrap()
    }
}
