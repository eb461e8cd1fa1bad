//! Wavefront OBJ export.
//!
//! OBJ has no node hierarchy, so positions and normals are written in world
//! space. Strips are expanded to triangles and each patch gets its own group.

use super::ExportLevel;
use crate::error::{Result, TerrainError};
use crate::mesher::geometry::Mesh;
use crate::terrain::{Terrain, TerrainPatch};
use glam::{Mat4, Vec3};
use std::fmt::Write;

/// Export the terrain to OBJ text.
pub fn export_obj(terrain: &Terrain, level: ExportLevel, name: &str) -> Result<String> {
    let meshes: Vec<(&TerrainPatch, &Mesh)> = terrain
        .patches()
        .iter()
        .map(|patch| (patch, level.select(patch).mesh()))
        .filter(|(_, mesh)| !mesh.is_empty())
        .collect();
    if meshes.is_empty() {
        return Err(TerrainError::Export("Cannot export empty terrain".to_string()));
    }

    let total_verts: usize = meshes.iter().map(|(_, m)| m.vertex_count()).sum();
    let total_tris: usize = meshes.iter().map(|(_, m)| m.triangle_count()).sum();

    // ~60 bytes per vertex line (v/vt/vn) x 3 + ~40 per face
    let mut obj = String::with_capacity(256 + total_verts * 180 + total_tris * 40);
    let world = terrain.world_matrix();
    let normal_matrix = terrain.normal_matrix();

    write_patches(&mut obj, &meshes, name, world, normal_matrix, total_verts, total_tris)
        .map_err(|e| TerrainError::Export(format!("Failed to write OBJ: {}", e)))?;
    Ok(obj)
}

fn write_patches(
    obj: &mut String,
    meshes: &[(&TerrainPatch, &Mesh)],
    name: &str,
    world: Mat4,
    normal_matrix: Mat4,
    total_verts: usize,
    total_tris: usize,
) -> std::fmt::Result {
    writeln!(obj, "# Terrain OBJ Export")?;
    writeln!(obj, "# Vertices: {}", total_verts)?;
    writeln!(obj, "# Triangles: {}", total_tris)?;
    writeln!(obj)?;
    writeln!(obj, "o {}", name)?;

    let mut vertex_offset = 0usize;
    for (patch, mesh) in meshes {
        writeln!(obj)?;
        writeln!(obj, "g patch_{}_{}", patch.row(), patch.column())?;

        for vertex in &mesh.vertices {
            let p = world.transform_point3(Vec3::from(vertex.position));
            writeln!(obj, "v {} {} {}", p.x, p.y, p.z)?;
        }
        for vertex in &mesh.vertices {
            writeln!(obj, "vt {} {}", vertex.uv[0], vertex.uv[1])?;
        }
        let has_normals = mesh.format.has_normals();
        for normal in mesh.vertices.iter().filter_map(|v| v.normal) {
            let n = normal_matrix
                .transform_vector3(Vec3::from(normal))
                .normalize_or_zero();
            writeln!(obj, "vn {} {} {}", n.x, n.y, n.z)?;
        }

        for [a, b, c] in mesh.triangles() {
            let [a, b, c] = [a, b, c].map(|i| i as usize + vertex_offset + 1);
            if has_normals {
                writeln!(obj, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
            } else {
                writeln!(obj, "f {a}/{a} {b}/{b} {c}/{c}")?;
            }
        }
        vertex_offset += mesh.vertex_count();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sloped_terrain;

    fn count(obj: &str, prefix: &str) -> usize {
        obj.lines().filter(|l| l.starts_with(prefix)).count()
    }

    #[test]
    fn test_export_groups_and_faces() {
        let terrain = sloped_terrain(false);
        let obj = export_obj(&terrain, ExportLevel::Finest, "hills").unwrap();

        assert!(obj.contains("o hills"));
        assert!(obj.contains("g patch_0_0"));
        assert!(obj.contains("g patch_1_1"));
        assert_eq!(count(&obj, "g "), 4);
        // 4 patches of 5x5 vertices, 32 triangles each
        assert_eq!(count(&obj, "v "), 100);
        assert_eq!(count(&obj, "vn "), 100);
        assert_eq!(count(&obj, "f "), 128);
        assert!(obj.contains("f 1/1/1"));
    }

    #[test]
    fn test_indices_offset_per_patch() {
        let terrain = sloped_terrain(false);
        let obj = export_obj(&terrain, ExportLevel::Finest, "hills").unwrap();

        let max_index = obj
            .lines()
            .filter(|l| l.starts_with("f "))
            .flat_map(|l| l[2..].split(' ').map(|v| v.split('/').next().unwrap().to_string()))
            .map(|v| v.parse::<usize>().unwrap())
            .max()
            .unwrap();
        assert_eq!(max_index, 100);
    }

    #[test]
    fn test_world_transform_applied_without_normals() {
        let mut terrain = sloped_terrain(true);
        terrain.set_node_transform(Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0)));
        let obj = export_obj(&terrain, ExportLevel::Index(2), "moved").unwrap();

        assert_eq!(count(&obj, "vn "), 0);
        assert!(obj.contains("f 1/1 "));
        let first = obj.lines().find(|l| l.starts_with("v ")).unwrap();
        let x: f32 = first.split(' ').nth(1).unwrap().parse().unwrap();
        assert!(x >= 100.0);
    }
}
