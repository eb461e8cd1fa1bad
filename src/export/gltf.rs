//! glTF/GLB export.
//!
//! Every patch becomes one mesh and one node holding a single
//! `TRIANGLE_STRIP` primitive with 16-bit indices. Patch nodes hang off a
//! root node carrying the terrain's world matrix.

use super::ExportLevel;
use crate::error::{Result, TerrainError};
use crate::mesher::geometry::{Mesh, PrimitiveType};
use crate::terrain::Terrain;
use glam::Mat4;
use gltf_json as json;
use json::validation::Checked::Valid;
use json::validation::USize64;
use std::collections::BTreeMap;

/// Export the terrain to GLB format (binary glTF).
pub fn export_glb(terrain: &Terrain, level: ExportLevel) -> Result<Vec<u8>> {
    if terrain.patches().iter().all(|p| level.select(p).mesh().is_empty()) {
        return Err(TerrainError::Export("Cannot export empty terrain".to_string()));
    }

    let mut buffer_data: Vec<u8> = Vec::new();
    let mut buffer_views = Vec::new();
    let mut accessors = Vec::new();
    let mut meshes = Vec::new();
    let mut nodes = Vec::new();
    let mut children = Vec::new();

    for patch in terrain.patches() {
        let mesh = level.select(patch).mesh();
        if mesh.is_empty() {
            continue;
        }

        let primitive = append_mesh(&mut buffer_data, &mut buffer_views, &mut accessors, mesh);
        meshes.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            primitives: vec![primitive],
            weights: None,
        });

        children.push(json::Index::new(nodes.len() as u32));
        nodes.push(create_node(Some(meshes.len() as u32 - 1), None, None));
    }

    let world = terrain.world_matrix();
    let matrix = (world != Mat4::IDENTITY).then(|| world.to_cols_array());
    let root_node = nodes.len() as u32;
    nodes.push(create_node(None, Some(children), matrix));

    // Pad buffer to 4-byte alignment
    pad_to_four(&mut buffer_data);

    let root = json::Root {
        accessors,
        buffers: vec![json::Buffer {
            byte_length: USize64(buffer_data.len() as u64),
            extensions: Default::default(),
            extras: Default::default(),
            uri: None,
        }],
        buffer_views,
        meshes,
        nodes,
        scenes: vec![json::Scene {
            extensions: Default::default(),
            extras: Default::default(),
            nodes: vec![json::Index::new(root_node)],
        }],
        scene: Some(json::Index::new(0)),
        ..Default::default()
    };

    let json_string = json::serialize::to_string(&root)
        .map_err(|e| TerrainError::Export(format!("Failed to serialize glTF JSON: {}", e)))?;

    log::debug!(
        "Exported {} patches to GLB ({} bytes of geometry)",
        root.meshes.len(),
        buffer_data.len()
    );

    Ok(write_glb(json_string.as_bytes(), &buffer_data))
}

/// Append one mesh's attributes and indices, returning its primitive.
fn append_mesh(
    buffer: &mut Vec<u8>,
    buffer_views: &mut Vec<json::buffer::View>,
    accessors: &mut Vec<json::Accessor>,
    mesh: &Mesh,
) -> json::mesh::Primitive {
    let vertex_count = mesh.vertex_count();
    let (min, max) = position_bounds(mesh);
    let mut attributes = BTreeMap::new();

    let positions = mesh.positions_flat();
    let accessor = push_attribute(buffer, buffer_views, accessors, &positions, vertex_count,
        json::accessor::Type::Vec3, Some((min, max)));
    attributes.insert(Valid(json::mesh::Semantic::Positions), json::Index::new(accessor));

    if mesh.format.has_normals() {
        let normals = mesh.normals_flat();
        let accessor = push_attribute(buffer, buffer_views, accessors, &normals, vertex_count,
            json::accessor::Type::Vec3, None);
        attributes.insert(Valid(json::mesh::Semantic::Normals), json::Index::new(accessor));
    }

    let uvs = mesh.uvs_flat();
    let accessor = push_attribute(buffer, buffer_views, accessors, &uvs, vertex_count,
        json::accessor::Type::Vec2, None);
    attributes.insert(Valid(json::mesh::Semantic::TexCoords(0)), json::Index::new(accessor));

    let offset = buffer.len();
    buffer.extend_from_slice(bytemuck_cast_slice(&mesh.indices));
    buffer_views.push(create_buffer_view(offset, buffer.len() - offset,
        Some(json::buffer::Target::ElementArrayBuffer)));
    accessors.push(create_accessor(buffer_views.len() as u32 - 1, mesh.index_count(),
        json::accessor::Type::Scalar, json::accessor::ComponentType::U16, None, None));
    let indices = accessors.len() as u32 - 1;

    let mode = match mesh.primitive {
        PrimitiveType::TriangleStrip => json::mesh::Mode::TriangleStrip,
        PrimitiveType::Triangles => json::mesh::Mode::Triangles,
    };

    json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: Some(json::Index::new(indices)),
        material: None,
        mode: Valid(mode),
        targets: None,
    }
}

/// Append a float attribute with its own view and accessor.
fn push_attribute(
    buffer: &mut Vec<u8>,
    buffer_views: &mut Vec<json::buffer::View>,
    accessors: &mut Vec<json::Accessor>,
    data: &[f32],
    count: usize,
    type_: json::accessor::Type,
    bounds: Option<([f32; 3], [f32; 3])>,
) -> u32 {
    // 16-bit index data may have left the buffer misaligned for floats
    pad_to_four(buffer);
    let offset = buffer.len();
    buffer.extend_from_slice(bytemuck_cast_slice(data));
    buffer_views.push(create_buffer_view(offset, buffer.len() - offset,
        Some(json::buffer::Target::ArrayBuffer)));
    accessors.push(create_accessor(buffer_views.len() as u32 - 1, count, type_,
        json::accessor::ComponentType::F32, bounds.map(|b| b.0), bounds.map(|b| b.1)));
    accessors.len() as u32 - 1
}

/// Position bounds including skirt vertices.
fn position_bounds(mesh: &Mesh) -> ([f32; 3], [f32; 3]) {
    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for vertex in &mesh.vertices {
        for i in 0..3 {
            min[i] = min[i].min(vertex.position[i]);
            max[i] = max[i].max(vertex.position[i]);
        }
    }
    (min, max)
}

fn pad_to_four(buffer: &mut Vec<u8>) {
    let padding = (4 - (buffer.len() % 4)) % 4;
    buffer.extend(std::iter::repeat(0u8).take(padding));
}

/// Assemble the GLB container from a JSON document and a 4-byte aligned
/// binary buffer.
fn write_glb(json_bytes: &[u8], buffer_data: &[u8]) -> Vec<u8> {
    // Pad JSON to 4-byte alignment
    let json_padding = (4 - (json_bytes.len() % 4)) % 4;
    let padded_json_len = json_bytes.len() + json_padding;

    let total_size = 12 + // GLB header
        8 + padded_json_len + // JSON chunk
        8 + buffer_data.len(); // BIN chunk

    let mut glb = Vec::with_capacity(total_size);

    // GLB Header
    glb.extend_from_slice(b"glTF"); // magic
    glb.extend_from_slice(&2u32.to_le_bytes()); // version
    glb.extend_from_slice(&(total_size as u32).to_le_bytes()); // length

    // JSON Chunk
    glb.extend_from_slice(&(padded_json_len as u32).to_le_bytes()); // chunk length
    glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // chunk type: JSON
    glb.extend_from_slice(json_bytes);
    glb.extend_from_slice(&vec![0x20u8; json_padding]); // padding (spaces)

    // BIN Chunk
    glb.extend_from_slice(&(buffer_data.len() as u32).to_le_bytes()); // chunk length
    glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // chunk type: BIN
    glb.extend_from_slice(buffer_data);

    glb
}

fn create_node(
    mesh: Option<u32>,
    children: Option<Vec<json::Index<json::Node>>>,
    matrix: Option<[f32; 16]>,
) -> json::Node {
    json::Node {
        camera: None,
        children,
        extensions: Default::default(),
        extras: Default::default(),
        matrix,
        mesh: mesh.map(json::Index::new),
        rotation: None,
        scale: None,
        translation: None,
        skin: None,
        weights: None,
    }
}

/// Create a buffer view.
fn create_buffer_view(
    offset: usize,
    size: usize,
    target: Option<json::buffer::Target>,
) -> json::buffer::View {
    json::buffer::View {
        buffer: json::Index::new(0),
        byte_length: USize64(size as u64),
        byte_offset: Some(USize64(offset as u64)),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        target: target.map(Valid),
    }
}

/// Create an accessor.
fn create_accessor(
    buffer_view: u32,
    count: usize,
    type_: json::accessor::Type,
    component_type: json::accessor::ComponentType,
    min: Option<[f32; 3]>,
    max: Option<[f32; 3]>,
) -> json::Accessor {
    json::Accessor {
        buffer_view: Some(json::Index::new(buffer_view)),
        byte_offset: Some(USize64(0)),
        count: USize64(count as u64),
        component_type: Valid(json::accessor::GenericComponentType(component_type)),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(type_),
        min: min.map(|m| json::Value::from(m.to_vec())),
        max: max.map(|m| json::Value::from(m.to_vec())),
        normalized: false,
        sparse: None,
    }
}

/// Cast a slice of T to a slice of bytes.
fn bytemuck_cast_slice<T: Copy>(slice: &[T]) -> &[u8] {
    let ptr = slice.as_ptr() as *const u8;
    let len = std::mem::size_of_val(slice);
    unsafe { std::slice::from_raw_parts(ptr, len) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sloped_terrain;

    fn json_chunk(glb: &[u8]) -> serde_json::Value {
        let len = u32::from_le_bytes([glb[12], glb[13], glb[14], glb[15]]) as usize;
        assert_eq!(&glb[16..20], &0x4E4F534Au32.to_le_bytes());
        serde_json::from_slice(&glb[20..20 + len]).unwrap()
    }

    #[test]
    fn test_export_header() {
        let glb = export_glb(&sloped_terrain(false), ExportLevel::Finest).unwrap();

        assert_eq!(&glb[0..4], b"glTF");
        assert_eq!(u32::from_le_bytes([glb[4], glb[5], glb[6], glb[7]]), 2); // version
        let length = u32::from_le_bytes([glb[8], glb[9], glb[10], glb[11]]) as usize;
        assert_eq!(length, glb.len());
        assert_eq!(glb.len() % 4, 0);
    }

    #[test]
    fn test_one_strip_mesh_per_patch() {
        let glb = export_glb(&sloped_terrain(false), ExportLevel::Finest).unwrap();
        let doc = json_chunk(&glb);

        let meshes = doc["meshes"].as_array().unwrap();
        assert_eq!(meshes.len(), 4);
        for mesh in meshes {
            let primitive = &mesh["primitives"][0];
            assert_eq!(primitive["mode"], 5);
            assert!(primitive["attributes"].get("NORMAL").is_some());
            let indices = primitive["indices"].as_u64().unwrap() as usize;
            assert_eq!(doc["accessors"][indices]["componentType"], 5123);
        }
        // Four patch nodes plus the root
        assert_eq!(doc["nodes"].as_array().unwrap().len(), 5);
        assert_eq!(doc["scenes"][0]["nodes"][0], 4);
    }

    #[test]
    fn test_level_choice_and_normal_map() {
        let terrain = sloped_terrain(true);
        let fine = export_glb(&terrain, ExportLevel::Finest).unwrap();
        let coarse = export_glb(&terrain, ExportLevel::Index(99)).unwrap();
        assert!(coarse.len() < fine.len());

        let doc = json_chunk(&coarse);
        let position = doc["meshes"][0]["primitives"][0]["attributes"]["POSITION"]
            .as_u64()
            .unwrap() as usize;
        // Coarsest level of a 4-quad patch is its four corners
        assert_eq!(doc["accessors"][position]["count"], 4);
        assert!(doc["meshes"][0]["primitives"][0]["attributes"].get("NORMAL").is_none());
    }

    #[test]
    fn test_float_views_are_aligned() {
        let glb = export_glb(&sloped_terrain(false), ExportLevel::Finest).unwrap();
        let doc = json_chunk(&glb);
        for view in doc["bufferViews"].as_array().unwrap() {
            if view["target"] == 34962 {
                assert_eq!(view["byteOffset"].as_u64().unwrap() % 4, 0);
            }
        }
    }
}
