//! Shared types used throughout the library.

mod transform;

pub use transform::MatrixCache;

use glam::{Mat4, Vec3};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any merged point or box replaces.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    pub fn from_points(points: impl Iterator<Item = Vec3>) -> Option<Self> {
        let mut bounds = Self::empty();
        let mut has_points = false;

        for p in points {
            has_points = true;
            bounds.expand(p);
        }

        if has_points {
            Some(bounds)
        } else {
            None
        }
    }

    /// Check if no point has been added to this box.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain `point`.
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to contain `other`.
    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> Vec3 {
        self.min + (self.max - self.min) * 0.5
    }

    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners, near face (max z) first.
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min, self.max);
        [
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
        ]
    }

    /// Transform all corners by `matrix` and return the box enclosing them.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut bounds = Self::empty();
        for corner in self.corners() {
            bounds.expand(matrix.transform_point3(corner));
        }
        bounds
    }
}

/// A bounding sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The sphere centered on `bounds` that touches its max corner.
    pub fn from_box(bounds: &BoundingBox) -> Self {
        let center = bounds.center();
        Self {
            center,
            radius: center.distance(bounds.max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bounds = BoundingBox::from_points(
            [Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 4.0, 0.0)].into_iter(),
        )
        .unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 4.0, 3.0));

        assert!(BoundingBox::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_merge_ignores_empty() {
        let mut bounds = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        bounds.merge(&BoundingBox::empty());
        assert_eq!(bounds, BoundingBox::new(Vec3::ZERO, Vec3::ONE));

        let mut empty = BoundingBox::empty();
        empty.merge(&bounds);
        assert_eq!(empty, bounds);
    }

    #[test]
    fn test_transformed_translation() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(4.0, 1.0, 4.0));
        let moved = bounds.transformed(&Mat4::from_translation(Vec3::new(10.0, 0.0, -2.0)));
        assert_eq!(moved.min, Vec3::new(10.0, 0.0, -2.0));
        assert_eq!(moved.max, Vec3::new(14.0, 1.0, 2.0));
    }

    #[test]
    fn test_sphere_from_box() {
        let bounds = BoundingBox::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        let sphere = BoundingSphere::from_box(&bounds);
        assert_eq!(sphere.center, Vec3::new(1.0, 0.0, 0.0));
        assert!((sphere.radius - 1.0).abs() < 1e-6);
    }
}
