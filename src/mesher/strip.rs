//! Serpentine triangle-strip indexing for regular vertex grids.
//!
//! Even rows run left to right and odd rows right to left. Consecutive rows
//! are joined by repeating the last index and the first index of the next row,
//! which produces zero-area triangles instead of a second draw call.

use crate::error::{Result, TerrainError};

/// Largest index count addressable with 16-bit indices.
pub const MAX_INDEX_COUNT: usize = u16::MAX as usize;

/// Index count for a `width` x `height` vertex grid.
pub fn strip_index_count(width: usize, height: usize) -> usize {
    if width < 2 || height < 2 {
        return 0;
    }
    (width * 2) * (height - 1) + (height - 2) * 2
}

/// Number of row-joining indices for a grid with `height` rows.
pub fn degenerate_index_count(height: usize) -> usize {
    height.saturating_sub(2) * 2
}

/// Build strip indices for a row-major `width` x `height` vertex grid.
pub fn build_strip_indices(width: usize, height: usize) -> Result<Vec<u16>> {
    let index_count = strip_index_count(width, height);
    if index_count > MAX_INDEX_COUNT {
        log::warn!(
            "Index count of {} for terrain patch exceeds the limit of {}",
            index_count,
            MAX_INDEX_COUNT
        );
        return Err(TerrainError::IndexOverflow { count: index_count });
    }

    let mut indices: Vec<u16> = Vec::with_capacity(index_count);
    for z in 0..height.saturating_sub(1) {
        let i1 = z * width;
        let i2 = (z + 1) * width;

        if z % 2 == 0 {
            if z > 0 {
                if let Some(&last) = indices.last() {
                    indices.push(last);
                }
                indices.push(i1 as u16);
            }
            for x in 0..width {
                indices.push((i1 + x) as u16);
                indices.push((i2 + x) as u16);
            }
        } else {
            if let Some(&last) = indices.last() {
                indices.push(last);
            }
            indices.push((i2 + width - 1) as u16);
            for x in (0..width).rev() {
                indices.push((i2 + x) as u16);
                indices.push((i1 + x) as u16);
            }
        }
    }

    debug_assert_eq!(indices.len(), index_count);
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_counts() {
        assert_eq!(strip_index_count(2, 2), 4);
        assert_eq!(strip_index_count(3, 3), 14);
        assert_eq!(strip_index_count(5, 5), 46);
        assert_eq!(strip_index_count(1, 5), 0);
        assert_eq!(degenerate_index_count(5), 6);
        assert_eq!(degenerate_index_count(2), 0);
    }

    #[test]
    fn test_three_by_three() {
        let indices = build_strip_indices(3, 3).unwrap();
        assert_eq!(
            indices,
            vec![0, 3, 1, 4, 2, 5, 5, 8, 8, 5, 7, 4, 6, 3]
        );
    }

    #[test]
    fn test_every_vertex_referenced() {
        for (w, h) in [(2, 2), (4, 3), (5, 5), (7, 2), (3, 8)] {
            let indices = build_strip_indices(w, h).unwrap();
            assert_eq!(indices.len(), strip_index_count(w, h));
            for v in 0..(w * h) as u16 {
                assert!(indices.contains(&v), "vertex {} missing in {}x{}", v, w, h);
            }
        }
    }

    #[test]
    fn test_degenerate_count() {
        for (w, h) in [(3, 3), (5, 5), (4, 6)] {
            let indices = build_strip_indices(w, h).unwrap();
            let row_indices = 2 * w * (h - 1);
            assert_eq!(indices.len() - row_indices, degenerate_index_count(h));
        }
    }

    #[test]
    fn test_overflow_rejected() {
        // 256 x 129 needs 2*256*128 + 127*2 = 65790 indices.
        let result = build_strip_indices(256, 129);
        assert!(matches!(result, Err(TerrainError::IndexOverflow { count: 65790 })));
        assert!(build_strip_indices(129, 129).is_ok());
    }
}
