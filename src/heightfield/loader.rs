//! Heightmap decoding from PNG images and headerless RAW files.

use super::HeightField;
use crate::assets::{extension_upper, AssetSource};
use crate::error::{Result, TerrainError};

/// Supported heightmap encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeightmapFormat {
    /// RGB(A) image with 24-bit packed heights (plain grayscale also works).
    Png,
    /// Headerless 8 or 16-bit samples; dimensions must be supplied.
    Raw,
}

impl HeightmapFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &str) -> Option<Self> {
        match extension_upper(path)?.as_str() {
            "PNG" => Some(Self::Png),
            "RAW" | "R16" => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Normalized height from a 24-bit packed RGB pixel.
///
/// Grayscale images decode with an error under 0.4% (2^-8 + 2^-16).
fn normalized_height_packed(r: f32, g: f32, b: f32) -> f32 {
    (256.0 * r + g + 0.00390625 * b) / 65536.0
}

/// Decode PNG bytes into heights in `[height_min, height_max]`.
///
/// Image rows are flipped so the bottom image row becomes grid row 0.
pub fn heightfield_from_png(data: &[u8], height_min: f32, height_max: f32) -> Result<HeightField> {
    let img = image::load_from_memory(data)?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let (width, height) = (width as usize, height as usize);
    let height_scale = height_max - height_min;

    let mut heights = Vec::with_capacity(width * height);
    for y in (0..height).rev() {
        for x in 0..width {
            let pixel = rgb.get_pixel(x as u32, y as u32);
            let normalized =
                normalized_height_packed(pixel[0] as f32, pixel[1] as f32, pixel[2] as f32);
            heights.push(height_min + normalized * height_scale);
        }
    }

    HeightField::from_heights(width, height, heights)
}

/// Decode headerless RAW bytes into heights in `[height_min, height_max]`.
///
/// Sample depth (8 or 16-bit little-endian) is inferred from the byte count.
/// Rows are flipped like PNG heightmaps.
pub fn heightfield_from_raw(
    data: &[u8],
    width: usize,
    height: usize,
    height_min: f32,
    height_max: f32,
) -> Result<HeightField> {
    if width < 2 || height < 2 || height_max < 0.0 {
        return Err(TerrainError::InvalidHeightField(format!(
            "invalid RAW parameters: {}x{}, max height {}",
            width, height, height_max
        )));
    }

    let count = width.checked_mul(height).ok_or_else(|| {
        TerrainError::InvalidHeightField(format!("RAW size {}x{} is too large", width, height))
    })?;
    let bits = (data.len() / count) * 8;
    let height_scale = height_max - height_min;

    let sample = |i: usize| -> f32 {
        match bits {
            16 => {
                let value = u16::from_le_bytes([data[i * 2], data[i * 2 + 1]]);
                height_min + (value as f32 / 65535.0) * height_scale
            }
            _ => height_min + (data[i] as f32 / 255.0) * height_scale,
        }
    };

    if bits != 8 && bits != 16 {
        return Err(TerrainError::InvalidHeightField(format!(
            "RAW data must be 8-bit or 16-bit, found {} bytes for {}x{}",
            data.len(),
            width,
            height
        )));
    }

    // RAW files start at the bottom-left corner.
    let mut heights = Vec::with_capacity(count);
    for y in (0..height).rev() {
        for x in 0..width {
            heights.push(sample(y * width + x));
        }
    }

    HeightField::from_heights(width, height, heights)
}

/// Load a heightfield from an asset, choosing the decoder by extension.
///
/// `raw_size` is required for RAW files and ignored for PNG.
pub fn load_heightfield(
    source: &AssetSource,
    path: &str,
    raw_size: Option<(usize, usize)>,
    height_min: f32,
    height_max: f32,
) -> Result<HeightField> {
    let format = HeightmapFormat::from_path(path)
        .ok_or_else(|| TerrainError::UnsupportedHeightmap(path.to_string()))?;

    let data = source.read(path)?;
    match format {
        HeightmapFormat::Png => heightfield_from_png(&data, height_min, height_max),
        HeightmapFormat::Raw => {
            let (width, height) = raw_size.ok_or_else(|| {
                TerrainError::InvalidConfig(format!(
                    "RAW heightmap {} needs an explicit size",
                    path
                ))
            })?;
            heightfield_from_raw(&data, width, height, height_min, height_max)
        }
    }
}
