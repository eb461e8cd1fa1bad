//! Heightfield terrain split into independently culled, multi-resolution patches.
//!
//! A [`Terrain`] partitions its heightfield into a grid of [`TerrainPatch`]es
//! once at construction. Each patch owns one mesh per level of detail and its
//! own texture layers. Drawing walks every patch, which frustum-culls itself,
//! picks a level from its projected screen area and submits one draw call.

pub mod config;
pub mod layer;
pub mod lod;
pub mod patch;

pub use config::TerrainConfig;
pub use layer::{BlendChannel, Layer, SamplerId, SamplerTable};
pub use lod::{compute_lod, LOD_SCREEN_AREA_DIVISOR};
pub use patch::{DrawContext, Level, MaterialContext, TerrainPatch};

use crate::assets::texture::{FilterMode, WrapMode};
use crate::assets::{AssetSource, TextureCache};
use crate::error::{Result, TerrainError};
use crate::heightfield::{load_heightfield, HeightField, HeightmapFormat};
use crate::material::{Material, MaterialSource, SamplerBinding};
use crate::mesher::{PatchMeshBuilder, PatchRegion};
use crate::render::RenderBackend;
use crate::scene::{Camera, Scene};
use crate::types::{BoundingBox, MatrixCache};
use config::LayerSettings;
use glam::{Mat4, Vec2, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

bitflags::bitflags! {
    /// Draw-time switches for a terrain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TerrainFlags: u32 {
        /// Tint each patch so patch boundaries are visible.
        const DEBUG_PATCHES = 1;
        /// Skip patches outside the camera frustum.
        const FRUSTUM_CULLING = 2;
        /// Pick coarser levels for patches that are small on screen.
        const LEVEL_OF_DETAIL = 8;
    }
}

impl Default for TerrainFlags {
    fn default() -> Self {
        Self::FRUSTUM_CULLING | Self::LEVEL_OF_DETAIL
    }
}

/// Grid position of a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId {
    pub row: usize,
    pub column: usize,
}

/// Observer for generated patch materials.
pub trait TerrainListener {
    /// Called for every level material a patch rebuilds. The material may be
    /// modified before it is first used.
    fn material_updated(&mut self, patch: PatchId, level: usize, material: &mut Material);
}

/// Handle returned by [`Terrain::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// A patch-based, level-of-detail heightfield terrain.
pub struct Terrain {
    heightfield: Rc<HeightField>,
    local_scale: Vec3,
    patches: Vec<TerrainPatch>,
    rows: usize,
    columns: usize,
    flags: TerrainFlags,
    textures: Rc<RefCell<TextureCache>>,
    normal_map: Option<SamplerBinding>,
    material_source: MaterialSource,
    bounds: BoundingBox,
    listeners: Vec<Box<dyn TerrainListener>>,
    listener_ids: Vec<ListenerId>,
    next_listener: usize,
    node_transform: Mat4,
    world_matrix: MatrixCache,
    normal_matrix: MatrixCache,
}

impl std::fmt::Debug for Terrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terrain")
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .field("local_scale", &self.local_scale)
            .field("flags", &self.flags)
            .field("normal_map", &self.normal_map.as_ref().map(|s| s.path()))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Terrain {
    /// Build a terrain from a heightfield.
    ///
    /// `scale` is applied to every vertex (X/Z per sample, Y per unit of
    /// height). Each patch covers `patch_size` quads per side; the last row
    /// and column may be smaller. `detail_levels` levels are built with steps
    /// 1, 2, 4, ... `skirt_scale` is the skirt depth in unscaled height
    /// units; zero disables skirts. With a normal map no vertex normals are
    /// stored.
    pub fn create(
        heightfield: Rc<HeightField>,
        scale: Vec3,
        patch_size: usize,
        detail_levels: usize,
        skirt_scale: f32,
        normal_map: Option<&str>,
        textures: Rc<RefCell<TextureCache>>,
    ) -> Result<Self> {
        let width = heightfield.columns();
        let height = heightfield.rows();
        if width < 2 || height < 2 {
            return Err(TerrainError::InvalidHeightField(format!(
                "terrain needs at least 2x2 samples, got {}x{}",
                width, height
            )));
        }

        let normal_map = normal_map.and_then(|path| match textures.borrow_mut().acquire(path) {
            Ok(texture) => Some(SamplerBinding {
                texture,
                wrap: WrapMode::Clamp,
                min_filter: FilterMode::LinearMipmapLinear,
                mag_filter: FilterMode::Linear,
            }),
            Err(e) => {
                log::warn!("Failed to load terrain normal map {}: {}", path, e);
                None
            }
        });

        let patch_size = patch_size.max(1);
        let detail_levels = detail_levels.clamp(1, usize::BITS as usize - 1);
        let max_step = 1usize << (detail_levels - 1);

        let builder = PatchMeshBuilder::new(&heightfield)
            .with_scale(scale)
            .with_skirt(skirt_scale)
            .with_normals(normal_map.is_none());

        let grid = match build_patches(&builder, patch_size, max_step) {
            Ok(grid) => grid,
            Err(e) => {
                if let Some(normal_map) = &normal_map {
                    textures.borrow_mut().release(normal_map.path());
                }
                return Err(e);
            }
        };
        let PatchGrid {
            patches,
            rows,
            columns,
            bounds,
        } = grid;

        log::debug!(
            "Created terrain from {}x{} heightfield: {}x{} patches, {} detail levels",
            width,
            height,
            rows,
            columns,
            detail_levels
        );

        Ok(Self {
            heightfield,
            local_scale: scale,
            patches,
            rows,
            columns,
            flags: TerrainFlags::default(),
            textures,
            normal_map,
            material_source: MaterialSource::default(),
            bounds,
            listeners: Vec::new(),
            listener_ids: Vec::new(),
            next_listener: 0,
            node_transform: Mat4::IDENTITY,
            world_matrix: MatrixCache::new(),
            normal_matrix: MatrixCache::new(),
        })
    }

    /// Build a terrain from a definition, reading files from `source`.
    ///
    /// Layers that fail to load are skipped with a warning.
    pub fn from_config(
        config: &TerrainConfig,
        source: &AssetSource,
        textures: Rc<RefCell<TextureCache>>,
    ) -> Result<Self> {
        let (height_min, height_max) = config.heightmap.height_range();
        let heightfield = load_heightfield(
            source,
            config.heightmap.path(),
            config.heightmap.raw_size(),
            height_min,
            height_max,
        )?;

        let scale = config.scale(&heightfield)?;
        let patch_size = config.resolved_patch_size(&heightfield);

        let mut terrain = Self::create(
            Rc::new(heightfield),
            scale,
            patch_size,
            config.resolved_detail_levels(),
            config.resolved_skirt_scale(),
            config.normal_map.as_deref(),
            textures,
        )?;
        terrain.material_source = config.material_source();

        for layer in config.resolved_layers() {
            if !terrain.apply_layer(&layer) {
                log::warn!("Failed to load terrain layer: {}", layer.texture);
            }
        }

        Ok(terrain)
    }

    /// Load a terrain from a heightmap image or a JSON definition.
    pub fn open(
        source: &AssetSource,
        path: &str,
        textures: Rc<RefCell<TextureCache>>,
    ) -> Result<Self> {
        let config = match HeightmapFormat::from_path(path) {
            Some(HeightmapFormat::Png) => TerrainConfig::from_heightmap(path),
            Some(HeightmapFormat::Raw) => {
                return Err(TerrainError::InvalidConfig(format!(
                    "RAW heightmap {} must be referenced from a definition with its size",
                    path
                )));
            }
            None => TerrainConfig::from_json(&source.read_to_string(path)?)?,
        };
        Self::from_config(&config, source, textures)
    }

    pub fn heightfield(&self) -> &HeightField {
        &self.heightfield
    }

    pub fn local_scale(&self) -> Vec3 {
        self.local_scale
    }

    /// Number of patch rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of patch columns.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn patches(&self) -> &[TerrainPatch] {
        &self.patches
    }

    pub fn patch(&self, row: usize, column: usize) -> Option<&TerrainPatch> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.patches.get(row * self.columns + column)
    }

    pub fn normal_map(&self) -> Option<&SamplerBinding> {
        self.normal_map.as_ref()
    }

    pub fn textures(&self) -> &Rc<RefCell<TextureCache>> {
        &self.textures
    }

    pub fn material_source(&self) -> &MaterialSource {
        &self.material_source
    }

    /// Change the shaders patch materials are built from.
    pub fn set_material_source(&mut self, source: MaterialSource) {
        self.material_source = source;
        self.set_materials_dirty();
    }

    /// Local-space bounds of every patch.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    pub fn is_flag_set(&self, flag: TerrainFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn flags(&self) -> TerrainFlags {
        self.flags
    }

    /// Turn a flag on or off. Takes effect on the next draw.
    pub fn set_flag(&mut self, flag: TerrainFlags, on: bool) {
        let before = self.flags;
        self.flags.set(flag, on);

        if flag.contains(TerrainFlags::DEBUG_PATCHES)
            && before.contains(TerrainFlags::DEBUG_PATCHES) != on
        {
            self.set_materials_dirty();
        }
    }

    fn set_materials_dirty(&mut self) {
        for patch in &mut self.patches {
            patch.set_material_dirty();
        }
    }

    /// Set a layer on every patch, or only on the patches in `row` and/or
    /// `column`.
    ///
    /// Returns false if any affected patch failed to load the texture; other
    /// patches keep the new layer.
    #[allow(clippy::too_many_arguments)]
    pub fn set_layer(
        &mut self,
        index: usize,
        texture_path: &str,
        texture_repeat: Vec2,
        blend_path: Option<&str>,
        blend_channel: BlendChannel,
        row: Option<usize>,
        column: Option<usize>,
    ) -> bool {
        let mut cache = self.textures.borrow_mut();
        let mut result = true;
        for patch in &mut self.patches {
            if row.is_some_and(|r| r != patch.row()) || column.is_some_and(|c| c != patch.column())
            {
                continue;
            }
            if !patch.set_layer(
                &mut cache,
                index,
                texture_path,
                texture_repeat,
                blend_path,
                blend_channel,
            ) {
                result = false;
            }
        }
        result
    }

    /// [`Terrain::set_layer`] from a resolved definition entry.
    pub fn apply_layer(&mut self, layer: &LayerSettings<'_>) -> bool {
        self.set_layer(
            layer.index,
            layer.texture,
            layer.repeat,
            layer.blend,
            layer.channel,
            layer.row,
            layer.column,
        )
    }

    /// Remove a layer from every patch that has it.
    pub fn delete_layer(&mut self, index: usize) -> bool {
        let mut cache = self.textures.borrow_mut();
        let mut removed = false;
        for patch in &mut self.patches {
            removed |= patch.delete_layer(&mut cache, index);
        }
        removed
    }

    /// Register a listener; it is called after listeners added earlier.
    pub fn add_listener(&mut self, listener: Box<dyn TerrainListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(listener);
        self.listener_ids.push(id);
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn TerrainListener>> {
        let position = self.listener_ids.iter().position(|&l| l == id)?;
        self.listener_ids.remove(position);
        Some(self.listeners.remove(position))
    }

    /// Rebuild every dirty patch material now instead of at the next draw.
    pub fn update_materials(&mut self) {
        let ctx = MaterialContext {
            source: &self.material_source,
            flags: self.flags,
            normal_map: self.normal_map.is_some(),
        };
        for patch in &mut self.patches {
            patch.update_material(&ctx, &mut self.listeners);
        }
    }

    /// Set the transform of the node the terrain is attached to.
    pub fn set_node_transform(&mut self, transform: Mat4) {
        self.node_transform = transform;
        self.transform_changed();
    }

    pub fn node_transform(&self) -> Mat4 {
        self.node_transform
    }

    /// Invalidate cached matrices and world bounds.
    pub fn transform_changed(&self) {
        self.world_matrix.invalidate();
        self.normal_matrix.invalidate();
        for patch in &self.patches {
            patch.invalidate_world_bounds();
        }
    }

    /// The node transform. The local scale is already in the vertices.
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix.get_or_update(|| self.node_transform)
    }

    /// Inverse transpose of the world matrix.
    pub fn normal_matrix(&self) -> Mat4 {
        self.normal_matrix
            .get_or_update(|| self.world_matrix().inverse().transpose())
    }

    /// World matrix premultiplied by the camera's view-projection, or the
    /// world matrix alone without a camera.
    pub fn world_view_projection_matrix(&self, camera: Option<&Camera>) -> Mat4 {
        match camera {
            Some(camera) => camera.view_projection_matrix() * self.world_matrix(),
            None => self.world_matrix(),
        }
    }

    /// Terrain height below a world-space point.
    ///
    /// Points outside the terrain are clamped to its edge.
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        let world = self.world_matrix();
        let local = world.inverse().transform_point3(Vec3::new(x, 0.0, z));

        let column = local.x / self.local_scale.x;
        let row = local.z / self.local_scale.z;
        let height = self.heightfield.height(column, row) * self.local_scale.y;

        world
            .transform_point3(Vec3::new(local.x, height, local.z))
            .y
    }

    /// Draw every patch. Returns the number of triangles submitted.
    ///
    /// Nothing is drawn without an active camera.
    pub fn draw(
        &mut self,
        scene: &Scene,
        backend: &mut dyn RenderBackend,
        wireframe: bool,
    ) -> usize {
        let Some(camera) = scene.active_camera.as_ref() else {
            return 0;
        };

        let ctx = DrawContext {
            camera,
            viewport: &scene.viewport,
            flags: self.flags,
            world_matrix: self.world_matrix(),
            world_view_projection: self.world_view_projection_matrix(Some(camera)),
            normal_matrix: self.normal_matrix(),
            normal_map: self.normal_map.as_ref(),
            ambient_color: scene.ambient_color,
            light: scene.light,
            wireframe,
        };
        let materials = MaterialContext {
            source: &self.material_source,
            flags: self.flags,
            normal_map: self.normal_map.is_some(),
        };

        let mut triangles = 0;
        for patch in &mut self.patches {
            triangles += patch.draw(&ctx, &materials, &mut self.listeners, backend);
        }
        triangles
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Patches submitted by the last draw.
    pub fn visible_patch_count(&self) -> usize {
        self.patches.iter().filter(|p| p.is_visible()).count()
    }

    /// Triangles across all patches at their current levels.
    pub fn triangle_count(&self) -> usize {
        self.patches.iter().map(|p| p.triangle_count()).sum()
    }

    /// Triangles submitted by the last draw.
    pub fn visible_triangle_count(&self) -> usize {
        self.patches.iter().map(|p| p.visible_triangle_count()).sum()
    }
}

struct PatchGrid {
    patches: Vec<TerrainPatch>,
    rows: usize,
    columns: usize,
    bounds: BoundingBox,
}

/// Partition the builder's heightfield into patches of `patch_size` quads.
fn build_patches(
    builder: &PatchMeshBuilder<'_>,
    patch_size: usize,
    max_step: usize,
) -> Result<PatchGrid> {
    let (width, height) = (builder.columns(), builder.rows());
    let mut grid = PatchGrid {
        patches: Vec::new(),
        rows: 0,
        columns: 0,
        bounds: BoundingBox::empty(),
    };

    let mut z1 = 0;
    while z1 < height - 1 {
        let z2 = (z1 + patch_size).min(height - 1);
        let mut column = 0;
        let mut x1 = 0;
        while x1 < width - 1 {
            let x2 = (x1 + patch_size).min(width - 1);
            let region = PatchRegion::new(x1, z1, x2, z2);
            let patch = TerrainPatch::create(builder, grid.rows, column, region, max_step)?;
            grid.bounds.merge(&patch.bounding_box());
            grid.patches.push(patch);
            column += 1;
            x1 = x2;
        }
        grid.columns = column;
        grid.rows += 1;
        z1 = z2;
    }
    Ok(grid)
}

impl Drop for Terrain {
    fn drop(&mut self) {
        let Ok(mut cache) = self.textures.try_borrow_mut() else {
            log::warn!("Texture cache busy while dropping terrain; layer textures leak");
            return;
        };
        for patch in &mut self.patches {
            patch.clear_layers(&mut cache);
        }
        if let Some(normal_map) = self.normal_map.take() {
            cache.release(normal_map.path());
        }
    }
}
