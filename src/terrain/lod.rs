//! Screen-space level-of-detail selection.

use crate::scene::{Camera, Viewport};
use crate::types::BoundingBox;
use glam::Vec2;

/// Fraction of the viewport a patch must cover to be drawn at full detail.
///
/// The selected level is `(viewport_area / LOD_SCREEN_AREA_DIVISOR) /
/// projected_area`, truncated. Tuned by eye; changing it shifts every LOD
/// transition distance.
pub const LOD_SCREEN_AREA_DIVISOR: f32 = 10.0;

/// Pick a level for a patch whose world-space bounds are `world_bounds`.
///
/// Projects the eight corners of the box to the viewport and compares the
/// area of their screen rectangle with a fixed share of the viewport. Bigger
/// on screen means a finer (lower) level. The result is clamped to
/// `[0, level_count - 1]`.
pub fn compute_lod(
    camera: &Camera,
    viewport: &Viewport,
    world_bounds: &BoundingBox,
    level_count: usize,
) -> usize {
    if level_count <= 1 {
        return 0;
    }

    let mut min = Vec2::splat(f32::MAX);
    let mut max = Vec2::splat(f32::MIN);
    for corner in world_bounds.corners() {
        let p = camera.project(viewport, corner);
        min = min.min(p);
        max = max.max(p);
    }

    let area = (max.x - min.x) * (max.y - min.y);
    let error = (viewport.area() / LOD_SCREEN_AREA_DIVISOR) / area;

    // NaN (zero viewport and zero area) falls through `max` as 0.
    error.max(0.0).min((level_count - 1) as f32) as usize
}
