//! The slice of scene state a terrain reads while drawing.

pub mod camera;
pub mod frustum;

pub use camera::{Camera, Viewport};
pub use frustum::{Frustum, Plane};

use glam::Vec3;

/// A single directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    /// Direction the light travels, normalized.
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            direction: Vec3::new(0.0, -1.0, 0.0),
        }
    }
}

/// Camera, viewport and lighting for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// The active camera; drawing is skipped without one.
    pub active_camera: Option<Camera>,
    pub viewport: Viewport,
    pub ambient_color: Vec3,
    pub light: DirectionalLight,
}

impl Scene {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            active_camera: None,
            viewport,
            ambient_color: Vec3::splat(0.2),
            light: DirectionalLight::default(),
        }
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.active_camera = Some(camera);
        self
    }

    pub fn with_light(mut self, light: DirectionalLight) -> Self {
        self.light = light;
        self
    }

    pub fn with_ambient(mut self, ambient_color: Vec3) -> Self {
        self.ambient_color = ambient_color;
        self
    }
}
