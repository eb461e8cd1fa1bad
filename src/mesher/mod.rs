//! Patch mesh generation from heightfield samples.
//!
//! [`PatchMeshBuilder`] turns one rectangular region of a heightfield into a
//! single triangle-strip mesh at a given sampling step. Optional vertical
//! skirts add a lowered border ring that hides cracks between neighbouring
//! patches drawn at different resolutions.

pub mod geometry;
pub mod strip;

pub use geometry::{Mesh, PrimitiveType, Vertex, VertexFormat};

use crate::error::Result;
use crate::heightfield::HeightField;
use crate::types::{BoundingBox, BoundingSphere};
use glam::{Vec2, Vec3};

/// Inclusive grid-coordinate rectangle covered by one patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRegion {
    pub x1: usize,
    pub z1: usize,
    pub x2: usize,
    pub z2: usize,
}

impl PatchRegion {
    pub fn new(x1: usize, z1: usize, x2: usize, z2: usize) -> Self {
        Self { x1, z1, x2, z2 }
    }

    /// Number of samples along X at `step`, without skirts.
    pub fn sample_width(&self, step: usize) -> usize {
        (self.x2 - self.x1).div_ceil(step) + 1
    }

    /// Number of samples along Z at `step`, without skirts.
    pub fn sample_height(&self, step: usize) -> usize {
        (self.z2 - self.z1).div_ceil(step) + 1
    }
}

/// Builds LOD meshes for regions of a borrowed heightfield.
#[derive(Debug, Clone)]
pub struct PatchMeshBuilder<'a> {
    heights: &'a [f32],
    width: usize,
    height: usize,
    local_scale: Vec3,
    offset: Vec2,
    vertical_skirt_size: f32,
    normals: bool,
}

impl<'a> PatchMeshBuilder<'a> {
    /// Create a builder with unit scale, no offset, no skirt and vertex normals.
    pub fn new(field: &'a HeightField) -> Self {
        Self {
            heights: field.heights(),
            width: field.columns(),
            height: field.rows(),
            local_scale: Vec3::ONE,
            offset: Vec2::ZERO,
            vertical_skirt_size: 0.0,
            normals: true,
        }
    }

    /// Scale applied to every generated position.
    pub fn with_scale(mut self, local_scale: Vec3) -> Self {
        self.local_scale = local_scale;
        self
    }

    /// Grid-space offset added to X and Z before scaling.
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Depth of the vertical skirt in unscaled height units; zero disables
    /// skirts. Only the vertical drop is multiplied by the Y scale.
    pub fn with_skirt(mut self, vertical_skirt_size: f32) -> Self {
        self.vertical_skirt_size = vertical_skirt_size.max(0.0);
        self
    }

    /// Whether to store per-vertex normals.
    pub fn with_normals(mut self, normals: bool) -> Self {
        self.normals = normals;
        self
    }

    /// Heightfield columns.
    pub fn columns(&self) -> usize {
        self.width
    }

    /// Heightfield rows.
    pub fn rows(&self) -> usize {
        self.height
    }

    fn format(&self) -> VertexFormat {
        if self.normals {
            VertexFormat::PositionNormalTexcoord
        } else {
            VertexFormat::PositionTexcoord
        }
    }

    /// Scaled height of a grid sample.
    fn compute_height(&self, x: usize, z: usize) -> f32 {
        self.heights[z * self.width + x] * self.local_scale.y
    }

    fn grid_position(&self, x: usize, z: usize) -> Vec3 {
        Vec3::new(
            (x as f32 + self.offset.x) * self.local_scale.x,
            self.compute_height(x, z),
            (z as f32 + self.offset.y) * self.local_scale.z,
        )
    }

    /// Normal from the four neighbours at distance `step`, clamped at the grid edge.
    fn compute_normal(&self, x: usize, z: usize, step: usize) -> Vec3 {
        let p = self.grid_position(x, z);
        let west = if x >= step { x - step } else { x };
        let east = if x + step < self.width { x + step } else { x };
        let south = if z >= step { z - step } else { z };
        let north = if z + step < self.height { z + step } else { z };

        let w = p - self.grid_position(west, z);
        let e = p - self.grid_position(east, z);
        let s = p - self.grid_position(x, south);
        let n = p - self.grid_position(x, north);

        let sum = n.cross(w) + w.cross(s) + e.cross(n) + s.cross(e);
        (-sum).normalize_or_zero()
    }

    /// Sample coordinates along one axis, flagging skirt entries.
    ///
    /// The last sample is clamped to `end` so uneven remainders keep the edge.
    fn axis_samples(start: usize, end: usize, step: usize, skirt: bool) -> Vec<(usize, bool)> {
        let mut samples = Vec::new();
        if skirt {
            samples.push((start, true));
        }
        let mut a = start;
        loop {
            samples.push((a, false));
            if a == end {
                break;
            }
            a = (a + step).min(end);
        }
        if skirt {
            samples.push((end, true));
        }
        samples
    }

    /// Build the mesh for `region` at `step`.
    ///
    /// Returns `Ok(None)` when the step leaves fewer than 2x2 samples, and an
    /// error when the strip would need more than 65535 indices.
    pub fn build(&self, region: PatchRegion, step: usize) -> Result<Option<Mesh>> {
        let step = step.max(1);
        let mut patch_width = region.sample_width(step);
        let mut patch_height = region.sample_height(step);

        if patch_width < 2 || patch_height < 2 {
            return Ok(None);
        }

        let skirt = self.vertical_skirt_size > 0.0;
        if skirt {
            patch_width += 2;
            patch_height += 2;
        }

        let indices = strip::build_strip_indices(patch_width, patch_height)?;

        let xs = Self::axis_samples(region.x1, region.x2, step, skirt);
        let zs = Self::axis_samples(region.z1, region.z2, step, skirt);
        debug_assert_eq!(xs.len(), patch_width);
        debug_assert_eq!(zs.len(), patch_height);

        let mut mesh = Mesh::new(self.format(), PrimitiveType::TriangleStrip);
        mesh.vertices.reserve(patch_width * patch_height);
        let mut bounds = BoundingBox::empty();

        for &(z, z_skirt) in &zs {
            for &(x, x_skirt) in &xs {
                let is_skirt = x_skirt || z_skirt;

                let mut position = self.grid_position(x, z);
                if is_skirt {
                    position.y -= self.vertical_skirt_size * self.local_scale.y;
                } else {
                    bounds.expand(position);
                }

                let normal = if self.normals {
                    Some(self.compute_normal(x, z, step).to_array())
                } else {
                    None
                };

                let mut u = x as f32 / (self.width - 1) as f32;
                let mut v = 1.0 - z as f32 / (self.height - 1) as f32;
                if x_skirt {
                    let offset = self.vertical_skirt_size / self.width as f32;
                    u = if x == region.x1 { u - offset } else { u + offset };
                } else if z_skirt {
                    let offset = self.vertical_skirt_size / self.height as f32;
                    v = if z == region.z1 { v - offset } else { v + offset };
                }

                mesh.vertices.push(Vertex::new(position.to_array(), normal, [u, v]));
            }
        }

        mesh.indices = indices;
        mesh.bounds = bounds;
        mesh.bounding_sphere = BoundingSphere::from_box(&bounds);
        Ok(Some(mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TerrainError;

    fn field(columns: usize, rows: usize, f: impl Fn(usize, usize) -> f32) -> HeightField {
        let mut heights = Vec::with_capacity(columns * rows);
        for z in 0..rows {
            for x in 0..columns {
                heights.push(f(x, z));
            }
        }
        HeightField::from_heights(columns, rows, heights).unwrap()
    }

    #[test]
    fn test_flat_patch_step_one() {
        let hf = field(5, 5, |_, _| 0.0);
        let mesh = PatchMeshBuilder::new(&hf)
            .build(PatchRegion::new(0, 0, 4, 4), 1)
            .unwrap()
            .unwrap();

        assert_eq!(mesh.vertex_count(), 25);
        assert_eq!(mesh.index_count(), strip::strip_index_count(5, 5));
        assert_eq!(mesh.bounds.min, Vec3::ZERO);
        assert_eq!(mesh.bounds.max, Vec3::new(4.0, 0.0, 4.0));
        assert_eq!(mesh.triangle_count(), 4 * 4 * 2);
        for v in &mesh.vertices {
            let n = v.normal.unwrap();
            assert!((n[1] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_coarser_steps() {
        let hf = field(5, 5, |_, _| 0.0);
        let builder = PatchMeshBuilder::new(&hf);
        let region = PatchRegion::new(0, 0, 4, 4);

        assert_eq!(builder.build(region, 2).unwrap().unwrap().vertex_count(), 9);
        assert_eq!(builder.build(region, 4).unwrap().unwrap().vertex_count(), 4);
    }

    #[test]
    fn test_degenerate_step_skipped() {
        let hf = field(5, 5, |_, _| 0.0);
        let builder = PatchMeshBuilder::new(&hf);
        // A one-quad-wide strip collapses only when the region has no extent.
        assert!(builder.build(PatchRegion::new(2, 0, 2, 4), 1).unwrap().is_none());
        assert!(builder.build(PatchRegion::new(0, 0, 1, 1), 8).unwrap().is_some());
    }

    #[test]
    fn test_uneven_step_keeps_far_edge() {
        let hf = field(6, 6, |x, _| x as f32);
        let mesh = PatchMeshBuilder::new(&hf)
            .build(PatchRegion::new(0, 0, 5, 5), 2)
            .unwrap()
            .unwrap();

        // Samples at 0, 2, 4, 5 along each axis.
        assert_eq!(mesh.vertex_count(), 16);
        let xs: Vec<f32> = mesh.vertices[..4].iter().map(|v| v.position[0]).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0, 5.0]);
        assert_eq!(mesh.bounds.max.x, 5.0);
    }

    #[test]
    fn test_skirt_border_lowered_and_excluded() {
        let hf = field(5, 5, |x, z| (x + z) as f32);
        let skirt = 3.0;
        let mesh = PatchMeshBuilder::new(&hf)
            .with_skirt(skirt)
            .build(PatchRegion::new(0, 0, 4, 4), 1)
            .unwrap()
            .unwrap();

        let w = 7;
        assert_eq!(mesh.vertex_count(), w * w);
        for (i, v) in mesh.vertices.iter().enumerate() {
            let (col, row) = (i % w, i / w);
            let x = v.position[0] as usize;
            let z = v.position[2] as usize;
            let border = col == 0 || row == 0 || col == w - 1 || row == w - 1;
            let expected = hf.sample(x, z) - if border { skirt } else { 0.0 };
            assert_eq!(v.position[1], expected);
        }

        // Lowest visible height is 0, skirts reach -3.
        assert_eq!(mesh.bounds.min.y, 0.0);
        assert_eq!(mesh.bounds.max.y, 8.0);
    }

    #[test]
    fn test_skirt_texcoord_nudge() {
        let hf = field(5, 5, |_, _| 0.0);
        let mesh = PatchMeshBuilder::new(&hf)
            .with_skirt(1.0)
            .build(PatchRegion::new(0, 0, 4, 4), 1)
            .unwrap()
            .unwrap();

        // Row 1 is the first visible row; its first vertex is an X skirt at x1.
        let w = 7;
        let left_skirt = mesh.vertices[w];
        assert!((left_skirt.uv[0] - (0.0 - 1.0 / 5.0)).abs() < 1e-6);
        let right_skirt = mesh.vertices[2 * w - 1];
        assert!((right_skirt.uv[0] - (1.0 + 1.0 / 5.0)).abs() < 1e-6);

        // Row 0 is a Z skirt at z1; interior columns nudge V.
        let top_skirt = mesh.vertices[1];
        assert!((top_skirt.uv[1] - (1.0 - 1.0 / 5.0)).abs() < 1e-6);
    }

    #[test]
    fn test_skirt_height_scale_only_moves_y() {
        let hf = field(5, 5, |_, _| 0.0);
        let mesh = PatchMeshBuilder::new(&hf)
            .with_scale(Vec3::new(1.0, 10.0, 1.0))
            .with_skirt(0.5)
            .build(PatchRegion::new(0, 0, 4, 4), 1)
            .unwrap()
            .unwrap();

        let w = 7;
        let left_skirt = mesh.vertices[w];
        assert!((left_skirt.position[1] - -5.0).abs() < 1e-6);
        assert!((left_skirt.uv[0] - -0.1).abs() < 1e-6);
        let top_skirt = mesh.vertices[1];
        assert!((top_skirt.uv[1] - (1.0 - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_scale_and_offset() {
        let hf = field(3, 3, |_, _| 1.0);
        let mesh = PatchMeshBuilder::new(&hf)
            .with_scale(Vec3::new(2.0, 5.0, 3.0))
            .with_offset(Vec2::new(-1.0, -1.0))
            .with_normals(false)
            .build(PatchRegion::new(0, 0, 2, 2), 1)
            .unwrap()
            .unwrap();

        assert_eq!(mesh.format, VertexFormat::PositionTexcoord);
        assert!(mesh.vertices.iter().all(|v| v.normal.is_none()));
        assert_eq!(mesh.bounds.min, Vec3::new(-2.0, 5.0, -3.0));
        assert_eq!(mesh.bounds.max, Vec3::new(2.0, 5.0, 3.0));
    }

    #[test]
    fn test_sloped_normal_tilts() {
        // Height rises along +X, so the normal leans toward -X.
        let hf = field(5, 5, |x, _| x as f32);
        let mesh = PatchMeshBuilder::new(&hf)
            .build(PatchRegion::new(0, 0, 4, 4), 1)
            .unwrap()
            .unwrap();
        let n = mesh.vertices[12].normal.unwrap();
        let expected = Vec3::new(-1.0, 1.0, 0.0).normalize();
        assert!((Vec3::from(n) - expected).length() < 1e-5);
    }

    #[test]
    fn test_index_overflow_is_fatal() {
        let hf = field(300, 300, |_, _| 0.0);
        let result = PatchMeshBuilder::new(&hf).build(PatchRegion::new(0, 0, 299, 299), 1);
        assert!(matches!(result, Err(TerrainError::IndexOverflow { .. })));
    }
}
