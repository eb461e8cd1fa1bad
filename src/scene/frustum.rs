//! View frustum extracted from a view-projection matrix.

use crate::types::BoundingBox;
use glam::{Mat4, Vec3, Vec4};

/// A plane `normal . p + distance = 0`, normal pointing into the frustum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    fn from_vec4(v: Vec4) -> Self {
        let normal = v.truncate();
        let length = normal.length();
        if length > 0.0 {
            Self {
                normal: normal / length,
                distance: v.w / length,
            }
        } else {
            Self {
                normal,
                distance: v.w,
            }
        }
    }

    /// Signed distance of `point` from the plane.
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// Six clip planes: left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes from a view-projection matrix (OpenGL depth range -1..1).
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let r0 = view_projection.row(0);
        let r1 = view_projection.row(1);
        let r2 = view_projection.row(2);
        let r3 = view_projection.row(3);

        Self {
            planes: [
                Plane::from_vec4(r3 + r0),
                Plane::from_vec4(r3 - r0),
                Plane::from_vec4(r3 + r1),
                Plane::from_vec4(r3 - r1),
                Plane::from_vec4(r3 + r2),
                Plane::from_vec4(r3 - r2),
            ],
        }
    }

    /// Conservative box test: false only if the box is fully outside a plane.
    pub fn intersects(&self, bounds: &BoundingBox) -> bool {
        if bounds.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            // Corner furthest along the plane normal.
            let positive = Vec3::new(
                if plane.normal.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if plane.normal.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if plane.normal.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );
            plane.distance_to(positive) >= 0.0
        })
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frustum() -> Frustum {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn test_contains_point() {
        let f = frustum();
        assert!(f.contains_point(Vec3::ZERO));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, 20.0)));
        assert!(!f.contains_point(Vec3::new(0.0, 0.0, -200.0)));
        assert!(!f.contains_point(Vec3::new(100.0, 0.0, 0.0)));
    }

    #[test]
    fn test_box_intersection() {
        let f = frustum();
        let inside = BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(f.intersects(&inside));

        let behind = BoundingBox::new(Vec3::new(-1.0, -1.0, 15.0), Vec3::new(1.0, 1.0, 20.0));
        assert!(!f.intersects(&behind));

        let straddling = BoundingBox::new(Vec3::new(-100.0, -1.0, -1.0), Vec3::new(0.0, 1.0, 1.0));
        assert!(f.intersects(&straddling));

        assert!(!f.intersects(&BoundingBox::empty()));
    }
}
