//! One grid cell of a terrain: its LOD meshes, layers and materials.

use super::layer::{BlendChannel, Layer, SamplerTable};
use super::lod::compute_lod;
use super::{PatchId, TerrainFlags, TerrainListener};
use crate::assets::TextureCache;
use crate::error::{Result, TerrainError};
use crate::material::{
    BindingContext, Material, MaterialSource, ParameterBinding, SamplerBinding, ShaderDefines,
};
use crate::mesher::{Mesh, PatchMeshBuilder, PatchRegion};
use crate::render::{DrawCall, RenderBackend};
use crate::scene::{Camera, DirectionalLight, Viewport};
use crate::types::BoundingBox;
use glam::{Mat4, Vec2, Vec3};
use std::cell::Cell;
use std::collections::BTreeMap;

/// One resolution of a patch.
#[derive(Debug)]
pub struct Level {
    step: usize,
    mesh: Mesh,
    material: Option<Material>,
}

impl Level {
    /// Sampling stride in grid units.
    pub fn step(&self) -> usize {
        self.step
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// `None` until the first material update.
    pub fn material(&self) -> Option<&Material> {
        self.material.as_ref()
    }
}

/// Terrain-wide inputs for rebuilding patch materials.
#[derive(Debug, Clone, Copy)]
pub struct MaterialContext<'a> {
    pub source: &'a MaterialSource,
    pub flags: TerrainFlags,
    pub normal_map: bool,
}

/// Per-frame state shared by every patch draw.
#[derive(Debug, Clone)]
pub struct DrawContext<'a> {
    pub camera: &'a Camera,
    pub viewport: &'a Viewport,
    pub flags: TerrainFlags,
    pub world_matrix: Mat4,
    pub world_view_projection: Mat4,
    pub normal_matrix: Mat4,
    pub normal_map: Option<&'a SamplerBinding>,
    pub ambient_color: Vec3,
    pub light: DirectionalLight,
    pub wireframe: bool,
}

/// A patch of terrain with one mesh per level of detail.
#[derive(Debug)]
pub struct TerrainPatch {
    row: usize,
    column: usize,
    levels: Vec<Level>,
    bounds: BoundingBox,
    world_bounds: Cell<Option<BoundingBox>>,
    layers: BTreeMap<usize, Layer>,
    samplers: SamplerTable,
    material_dirty: bool,
    current_level: usize,
    visible: bool,
}

impl TerrainPatch {
    /// Build every level for `region`, doubling the step up to `max_step`.
    ///
    /// Coarse levels that would have fewer than 2x2 samples are skipped.
    /// Fails if the base level itself is degenerate or any level overflows
    /// 16-bit indices.
    pub fn create(
        builder: &PatchMeshBuilder<'_>,
        row: usize,
        column: usize,
        region: PatchRegion,
        max_step: usize,
    ) -> Result<Self> {
        let mut levels = Vec::new();
        let mut step = 1;
        while step <= max_step.max(1) {
            match builder.build(region, step)? {
                Some(mesh) => levels.push(Level {
                    step,
                    mesh,
                    material: None,
                }),
                None => log::debug!(
                    "Patch ({}, {}) has no geometry at step {}",
                    row,
                    column,
                    step
                ),
            }
            step *= 2;
        }

        let bounds = match levels.first() {
            Some(level) if level.step == 1 => level.mesh.bounds,
            _ => return Err(TerrainError::DegeneratePatch { row, column }),
        };

        log::debug!(
            "Created patch ({}, {}) with {} levels, {} vertices at base",
            row,
            column,
            levels.len(),
            levels[0].mesh.vertex_count()
        );

        Ok(Self {
            row,
            column,
            levels,
            bounds,
            world_bounds: Cell::new(None),
            layers: BTreeMap::new(),
            samplers: SamplerTable::new(),
            material_dirty: true,
            current_level: 0,
            visible: false,
        })
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn id(&self) -> PatchId {
        PatchId {
            row: self.row,
            column: self.column,
        }
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Local-space bounds of the base level, skirts excluded.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    /// Bounds transformed by `world_matrix`, cached until invalidated.
    pub fn world_bounding_box(&self, world_matrix: &Mat4) -> BoundingBox {
        if let Some(bounds) = self.world_bounds.get() {
            return bounds;
        }
        let bounds = self.bounds.transformed(world_matrix);
        self.world_bounds.set(Some(bounds));
        bounds
    }

    pub(crate) fn invalidate_world_bounds(&self) {
        self.world_bounds.set(None);
    }

    /// Layers in blend order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(&index)
    }

    pub fn samplers(&self) -> &SamplerTable {
        &self.samplers
    }

    pub fn is_material_dirty(&self) -> bool {
        self.material_dirty
    }

    pub fn set_material_dirty(&mut self) {
        self.material_dirty = true;
    }

    /// Add or replace the layer at `index`.
    ///
    /// Returns false, leaving the patch unchanged, if the texture cannot be
    /// loaded. A blend texture that fails to load is dropped with a warning.
    pub fn set_layer(
        &mut self,
        cache: &mut TextureCache,
        index: usize,
        texture_path: &str,
        texture_repeat: Vec2,
        blend_path: Option<&str>,
        blend_channel: BlendChannel,
    ) -> bool {
        let texture = match self.samplers.acquire(cache, texture_path) {
            Ok(id) => id,
            Err(e) => {
                log::warn!(
                    "Failed to load layer {} texture {} for patch ({}, {}): {}",
                    index,
                    texture_path,
                    self.row,
                    self.column,
                    e
                );
                return false;
            }
        };

        let blend = blend_path.and_then(|path| match self.samplers.acquire(cache, path) {
            Ok(id) => Some(id),
            Err(e) => {
                log::warn!("Failed to load blend map {}: {}", path, e);
                None
            }
        });

        // Acquire before releasing so a replaced layer sharing the texture
        // keeps it loaded.
        self.delete_layer(cache, index);

        self.layers.insert(
            index,
            Layer {
                index,
                texture,
                blend,
                texture_repeat,
                blend_channel,
            },
        );
        self.material_dirty = true;
        true
    }

    /// Remove the layer at `index`, releasing its samplers.
    pub fn delete_layer(&mut self, cache: &mut TextureCache, index: usize) -> bool {
        let Some(layer) = self.layers.remove(&index) else {
            return false;
        };
        self.samplers.release(cache, layer.texture);
        if let Some(blend) = layer.blend {
            self.samplers.release(cache, blend);
        }
        self.material_dirty = true;
        true
    }

    /// Remove every layer.
    pub fn clear_layers(&mut self, cache: &mut TextureCache) {
        let indices: Vec<usize> = self.layers.keys().copied().collect();
        for index in indices {
            self.delete_layer(cache, index);
        }
    }

    /// Preprocessor definitions for the current layers and flags.
    ///
    /// Sampler indices are emitted as constants because sampler arrays can
    /// only be indexed with constant expressions on older GLSL versions.
    pub fn shader_defines(&self, flags: TerrainFlags, normal_map: bool) -> ShaderDefines {
        let mut defines = ShaderDefines::new();
        defines
            .define_value("LAYER_COUNT", self.layers.len())
            .define_value("SAMPLER_COUNT", self.samplers.len());

        if flags.contains(TerrainFlags::DEBUG_PATCHES) {
            defines.define("DEBUG_PATCHES");
        }
        if normal_map {
            defines.define("NORMAL_MAP");
        }

        for (i, layer) in self.layers.values().enumerate() {
            defines
                .define_value(&format!("TEXTURE_INDEX_{}", i), layer.texture.index())
                .define_value(
                    &format!("TEXTURE_REPEAT_{}", i),
                    format!("vec2({},{})", layer.texture_repeat.x, layer.texture_repeat.y),
                );

            if i > 0 {
                let blend_index = layer.blend.map_or(-1, |b| b.index() as i64);
                defines
                    .define_value(&format!("BLEND_INDEX_{}", i), blend_index)
                    .define_value(&format!("BLEND_CHANNEL_{}", i), layer.blend_channel.index());
            }
        }

        defines
    }

    fn create_material(&self, ctx: &MaterialContext<'_>) -> Material {
        let defines = self.shader_defines(ctx.flags, ctx.normal_map);
        let mut material = Material::new(ctx.source.clone(), defines.to_string());

        material.bind(
            "u_worldViewProjectionMatrix",
            ParameterBinding::WorldViewProjectionMatrix,
        );
        if ctx.normal_map {
            material.bind("u_normalMap", ParameterBinding::NormalMap);
        } else {
            material.bind("u_normalMatrix", ParameterBinding::NormalMatrix);
        }
        material.bind("u_ambientColor", ParameterBinding::AmbientColor);
        material.bind("u_lightColor", ParameterBinding::LightColor);
        material.bind("u_lightDirection", ParameterBinding::LightDirection);
        if !self.layers.is_empty() {
            material.bind("u_surfaceLayerMaps", ParameterBinding::LayerSamplers);
        }
        if ctx.flags.contains(TerrainFlags::DEBUG_PATCHES) {
            material.bind("u_row", ParameterBinding::PatchRow);
            material.bind("u_column", ParameterBinding::PatchColumn);
        }
        material
    }

    /// Rebuild level materials if layers or flags changed since the last call.
    ///
    /// Every listener sees each rebuilt material once, in registration order.
    /// Returns true if a rebuild happened.
    pub fn update_material(
        &mut self,
        ctx: &MaterialContext<'_>,
        listeners: &mut [Box<dyn TerrainListener>],
    ) -> bool {
        if !self.material_dirty {
            return false;
        }
        self.material_dirty = false;

        let id = self.id();
        for level in 0..self.levels.len() {
            let mut material = self.create_material(ctx);
            for listener in listeners.iter_mut() {
                listener.material_updated(id, level, &mut material);
            }
            self.levels[level].material = Some(material);
        }
        true
    }

    /// Level to draw for the given world bounds.
    pub fn compute_lod(&self, ctx: &DrawContext<'_>, world_bounds: &BoundingBox) -> usize {
        if !ctx.flags.contains(TerrainFlags::LEVEL_OF_DETAIL) {
            return 0;
        }
        compute_lod(ctx.camera, ctx.viewport, world_bounds, self.levels.len())
    }

    /// Cull, pick a level and submit it. Returns the triangles drawn.
    pub fn draw(
        &mut self,
        ctx: &DrawContext<'_>,
        materials: &MaterialContext<'_>,
        listeners: &mut [Box<dyn TerrainListener>],
        backend: &mut dyn RenderBackend,
    ) -> usize {
        self.visible = false;

        let bounds = self.world_bounding_box(&ctx.world_matrix);
        if ctx.flags.contains(TerrainFlags::FRUSTUM_CULLING) && !ctx.camera.frustum().intersects(&bounds) {
            return 0;
        }

        self.update_material(materials, listeners);
        self.current_level = self.compute_lod(ctx, &bounds);

        let level = &self.levels[self.current_level];
        let Some(material) = level.material.as_ref() else {
            return 0;
        };

        let binding_ctx = BindingContext {
            world_view_projection: ctx.world_view_projection,
            normal_matrix: ctx.normal_matrix,
            normal_map: ctx.normal_map,
            ambient_color: ctx.ambient_color,
            light: ctx.light,
            layer_samplers: if self.layers.is_empty() {
                Vec::new()
            } else {
                self.samplers.bindings()
            },
            row: self.row,
            column: self.column,
        };

        self.visible = true;
        backend.draw(DrawCall {
            mesh: &level.mesh,
            material,
            parameters: material.resolve(&binding_ctx),
            row: self.row,
            column: self.column,
            level: self.current_level,
            wireframe: ctx.wireframe,
        })
    }

    /// Whether the last draw submitted this patch.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Level chosen by the last draw.
    pub fn current_level(&self) -> usize {
        self.current_level
    }

    /// Triangles in the current level.
    pub fn triangle_count(&self) -> usize {
        self.levels[self.current_level].mesh.triangle_count()
    }

    /// Triangles submitted by the last draw.
    pub fn visible_triangle_count(&self) -> usize {
        if self.visible {
            self.triangle_count()
        } else {
            0
        }
    }
}
