//! Raw mesh data export for custom rendering.

use super::ExportLevel;
use crate::terrain::Terrain;

/// Raw mesh data for one patch, in local terrain space.
#[derive(Debug)]
pub struct RawPatchData {
    pub row: usize,
    pub column: usize,
    /// Step of the exported level.
    pub step: usize,
    /// Vertex positions (3 floats per vertex).
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals; empty when the terrain lights from a normal map.
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates (2 floats per vertex).
    pub uvs: Vec<[f32; 2]>,
    /// Triangle strip indices, rows joined by degenerate triangles.
    pub indices: Vec<u16>,
}

/// Export every patch's chosen level as raw arrays.
pub fn export_raw(terrain: &Terrain, level: ExportLevel) -> Vec<RawPatchData> {
    terrain
        .patches()
        .iter()
        .map(|patch| {
            let level = level.select(patch);
            let mesh = level.mesh();
            RawPatchData {
                row: patch.row(),
                column: patch.column(),
                step: level.step(),
                positions: mesh.vertices.iter().map(|v| v.position).collect(),
                normals: mesh.vertices.iter().filter_map(|v| v.normal).collect(),
                uvs: mesh.vertices.iter().map(|v| v.uv).collect(),
                indices: mesh.indices.clone(),
            }
        })
        .collect()
}

impl RawPatchData {
    /// Get positions as a flat array.
    pub fn positions_flat(&self) -> Vec<f32> {
        self.positions.iter().flat_map(|p| p.iter().copied()).collect()
    }

    /// Get normals as a flat array.
    pub fn normals_flat(&self) -> Vec<f32> {
        self.normals.iter().flat_map(|n| n.iter().copied()).collect()
    }

    /// Get UVs as a flat array.
    pub fn uvs_flat(&self) -> Vec<f32> {
        self.uvs.iter().flat_map(|uv| uv.iter().copied()).collect()
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of visible triangles in the strip.
    pub fn triangle_count(&self) -> usize {
        self.indices
            .windows(3)
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sloped_terrain;

    #[test]
    fn test_export_raw() {
        let raw = export_raw(&sloped_terrain(false), ExportLevel::Finest);

        assert_eq!(raw.len(), 4);
        let first = &raw[0];
        assert_eq!((first.row, first.column, first.step), (0, 0, 1));
        assert_eq!(first.vertex_count(), 25);
        assert_eq!(first.normals.len(), 25);
        assert_eq!(first.indices.len(), 46);
        assert_eq!(first.triangle_count(), 32);
        assert_eq!(first.positions_flat().len(), 75);
        assert_eq!(first.uvs_flat().len(), 50);
    }

    #[test]
    fn test_export_raw_coarse_without_normals() {
        let raw = export_raw(&sloped_terrain(true), ExportLevel::Index(1));

        assert!(raw.iter().all(|p| p.step == 2));
        assert!(raw.iter().all(|p| p.vertex_count() == 9));
        assert!(raw.iter().all(|p| p.normals_flat().is_empty()));
    }
}
