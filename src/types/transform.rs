//! Lazily recomputed matrices.

use glam::Mat4;
use std::cell::Cell;

/// A memoized matrix guarded by a dirty flag.
///
/// Reads go through [`MatrixCache::get_or_update`], which only runs the
/// compute closure after [`MatrixCache::invalidate`] has been called.
#[derive(Debug, Default)]
pub struct MatrixCache {
    value: Cell<Option<Mat4>>,
}

impl MatrixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the cached value stale.
    pub fn invalidate(&self) {
        self.value.set(None);
    }

    pub fn is_dirty(&self) -> bool {
        self.value.get().is_none()
    }

    /// Return the cached matrix, recomputing it first if stale.
    pub fn get_or_update(&self, compute: impl FnOnce() -> Mat4) -> Mat4 {
        match self.value.get() {
            Some(matrix) => matrix,
            None => {
                let matrix = compute();
                self.value.set(Some(matrix));
                matrix
            }
        }
    }
}
