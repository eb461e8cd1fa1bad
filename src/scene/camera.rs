//! Camera matrices and screen projection.

use super::frustum::Frustum;
use glam::{Mat4, Vec2, Vec3};

/// A screen rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A viewport anchored at the origin.
    pub fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Width over height, 1.0 for an empty viewport.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// A view + projection pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    view: Mat4,
    projection: Mat4,
}

impl Camera {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Right-handed perspective camera at `eye` looking at `target`.
    pub fn perspective(
        eye: Vec3,
        target: Vec3,
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh_gl(fov_y_degrees.to_radians(), aspect, near, far),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view
    }

    /// World-space eye position.
    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection_matrix())
    }

    /// Project a world point to viewport pixels (y grows downward).
    pub fn project(&self, viewport: &Viewport, point: Vec3) -> Vec2 {
        let clip = self.view_projection_matrix() * point.extend(1.0);
        let ndc = if clip.w != 0.0 {
            clip.truncate() / clip.w
        } else {
            clip.truncate()
        };

        Vec2::new(
            viewport.x + (ndc.x + 1.0) * 0.5 * viewport.width,
            viewport.y + (1.0 - ndc.y) * 0.5 * viewport.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 60.0, 1.0, 0.1, 100.0);
        let viewport = Viewport::sized(800.0, 600.0);
        let p = camera.project(&viewport, Vec3::ZERO);
        assert!((p.x - 400.0).abs() < 1e-3);
        assert!((p.y - 300.0).abs() < 1e-3);

        // Points above the target land in the upper half of the screen.
        let up = camera.project(&viewport, Vec3::new(0.0, 1.0, 0.0));
        assert!(up.y < 300.0);
    }

    #[test]
    fn test_position() {
        let eye = Vec3::new(3.0, 4.0, 5.0);
        let camera = Camera::perspective(eye, Vec3::ZERO, 45.0, 1.5, 0.1, 100.0);
        assert!((camera.position() - eye).length() < 1e-4);
    }
}
