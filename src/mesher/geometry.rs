//! Mesh geometry types.

use crate::types::{BoundingBox, BoundingSphere};

/// Vertex attribute layout of a terrain mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// Position, normal, texcoord (8 floats).
    PositionNormalTexcoord,
    /// Position, texcoord (5 floats); lighting comes from a normal map.
    PositionTexcoord,
}

impl VertexFormat {
    /// Number of floats per vertex.
    pub fn stride(&self) -> usize {
        match self {
            Self::PositionNormalTexcoord => 8,
            Self::PositionTexcoord => 5,
        }
    }

    pub fn has_normals(&self) -> bool {
        matches!(self, Self::PositionNormalTexcoord)
    }
}

/// How the index buffer is assembled into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Triangles,
    TriangleStrip,
}

/// A vertex in a terrain mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in local terrain space (terrain scale applied).
    pub position: [f32; 3],
    /// Normal vector, absent when a normal map supplies lighting.
    pub normal: Option<[f32; 3]>,
    /// Texture coordinates across the whole terrain.
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: Option<[f32; 3]>, uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// An indexed mesh with 16-bit indices.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex layout.
    pub format: VertexFormat,
    /// Index interpretation.
    pub primitive: PrimitiveType,
    /// Vertex data.
    pub vertices: Vec<Vertex>,
    /// Index data.
    pub indices: Vec<u16>,
    /// Bounds of the visible (non-skirt) vertices.
    pub bounds: BoundingBox,
    /// Sphere enclosing `bounds`.
    pub bounding_sphere: BoundingSphere,
}

impl Mesh {
    pub fn new(format: VertexFormat, primitive: PrimitiveType) -> Self {
        Self {
            format,
            primitive,
            vertices: Vec::new(),
            indices: Vec::new(),
            bounds: BoundingBox::empty(),
            bounding_sphere: BoundingSphere::new(glam::Vec3::ZERO, 0.0),
        }
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Check if the mesh is empty.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Non-degenerate triangles with consistent winding.
    ///
    /// Strips alternate winding per triangle; odd triangles are flipped back.
    pub fn triangles(&self) -> Vec<[u16; 3]> {
        match self.primitive {
            PrimitiveType::Triangles => self
                .indices
                .chunks_exact(3)
                .map(|t| [t[0], t[1], t[2]])
                .filter(|t| !is_degenerate(t))
                .collect(),
            PrimitiveType::TriangleStrip => self
                .indices
                .windows(3)
                .enumerate()
                .map(|(i, w)| {
                    if i % 2 == 0 {
                        [w[0], w[1], w[2]]
                    } else {
                        [w[1], w[0], w[2]]
                    }
                })
                .filter(|t| !is_degenerate(t))
                .collect(),
        }
    }

    /// Get the number of visible triangles.
    pub fn triangle_count(&self) -> usize {
        let window = |t: &[u16]| !is_degenerate(&[t[0], t[1], t[2]]);
        match self.primitive {
            PrimitiveType::Triangles => self.indices.chunks_exact(3).filter(|t| window(t)).count(),
            PrimitiveType::TriangleStrip => self.indices.windows(3).filter(|t| window(t)).count(),
        }
    }

    /// Get positions as a flat array.
    pub fn positions_flat(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.position).collect()
    }

    /// Get normals as a flat array (empty when the format has none).
    pub fn normals_flat(&self) -> Vec<f32> {
        self.vertices
            .iter()
            .filter_map(|v| v.normal)
            .flatten()
            .collect()
    }

    /// Get UVs as a flat array.
    pub fn uvs_flat(&self) -> Vec<f32> {
        self.vertices.iter().flat_map(|v| v.uv).collect()
    }

    /// Interleaved vertex data in `format` order, ready for a vertex buffer.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.vertices.len() * self.format.stride());
        for v in &self.vertices {
            data.extend_from_slice(&v.position);
            if self.format.has_normals() {
                data.extend_from_slice(&v.normal.unwrap_or([0.0, 1.0, 0.0]));
            }
            data.extend_from_slice(&v.uv);
        }
        data
    }
}

fn is_degenerate(t: &[u16; 3]) -> bool {
    t[0] == t[1] || t[1] == t[2] || t[0] == t[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_strip() -> Mesh {
        let mut mesh = Mesh::new(VertexFormat::PositionNormalTexcoord, PrimitiveType::TriangleStrip);
        for (x, z) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            mesh.vertices.push(Vertex::new([x, 0.0, z], Some([0.0, 1.0, 0.0]), [x, 1.0 - z]));
        }
        mesh.indices = vec![0, 1, 2, 3];
        mesh
    }

    #[test]
    fn test_strip_triangles() {
        let mesh = quad_strip();
        // Odd strip triangles are flipped back to the even winding.
        assert_eq!(mesh.triangles(), vec![[0, 1, 2], [2, 1, 3]]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_strip_skips_degenerates() {
        let mut mesh = quad_strip();
        mesh.indices = vec![0, 1, 2, 3, 3, 2, 2, 3];
        // Windows: (0,1,2) (1,2,3) then four degenerate windows containing a repeat.
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_triangle_list() {
        let mut mesh = quad_strip();
        mesh.primitive = PrimitiveType::Triangles;
        mesh.indices = vec![0, 1, 2, 2, 1, 3, 1, 1, 3];
        assert_eq!(mesh.triangles(), vec![[0, 1, 2], [2, 1, 3]]);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_triangle_count_matches_expanded_strip() {
        let mut mesh = quad_strip();
        mesh.indices = crate::mesher::strip::build_strip_indices(4, 5).unwrap();
        assert_eq!(mesh.triangle_count(), mesh.triangles().len());
        assert_eq!(mesh.triangle_count(), 3 * 4 * 2);
    }

    #[test]
    fn test_interleaved_layout() {
        let mut mesh = quad_strip();
        assert_eq!(mesh.interleaved().len(), 4 * 8);

        mesh.format = VertexFormat::PositionTexcoord;
        for v in &mut mesh.vertices {
            v.normal = None;
        }
        let data = mesh.interleaved();
        assert_eq!(data.len(), 4 * 5);
        assert_eq!(&data[5..10], &[0.0, 0.0, 1.0, 0.0, 0.0]);
        assert!(mesh.normals_flat().is_empty());
    }
}
