//! Draw submission boundary.
//!
//! The terrain decides what to draw and with which parameters; a
//! [`RenderBackend`] turns that into GPU work.

use crate::material::{Material, ParameterValue};
use crate::mesher::Mesh;

/// One patch draw at one level of detail.
#[derive(Debug)]
pub struct DrawCall<'a> {
    pub mesh: &'a Mesh,
    pub material: &'a Material,
    /// Parameters resolved for this draw.
    pub parameters: Vec<(String, ParameterValue)>,
    pub row: usize,
    pub column: usize,
    pub level: usize,
    pub wireframe: bool,
}

/// Receives draw calls. Returns the number of triangles submitted.
pub trait RenderBackend {
    fn draw(&mut self, call: DrawCall<'_>) -> usize;
}

/// Backend that only counts triangles.
#[derive(Debug, Default)]
pub struct CountingBackend {
    pub draw_calls: usize,
    pub triangles: usize,
}

impl RenderBackend for CountingBackend {
    fn draw(&mut self, call: DrawCall<'_>) -> usize {
        let triangles = call.mesh.triangle_count();
        self.draw_calls += 1;
        self.triangles += triangles;
        triangles
    }
}
