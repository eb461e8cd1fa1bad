//! Texture loading and handling.

/// Raw texture data decoded to RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    /// Texture width in pixels.
    pub width: u32,
    /// Texture height in pixels.
    pub height: u32,
    /// RGBA8 pixel data (4 bytes per pixel).
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Create a new texture from RGBA data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a single-color texture.
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect();
        Self::new(width, height, pixels)
    }

    /// Get a pixel at (x, y).
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }
}

/// How a sampler addresses texels outside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    Clamp,
}

/// Texture filtering applied by a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// A loaded texture identified by the path it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Asset path used as the cache key.
    pub path: String,
    /// Decoded pixels.
    pub data: TextureData,
    /// Whether the backend should generate mipmaps.
    pub generate_mipmaps: bool,
}

impl Texture {
    pub fn new(path: impl Into<String>, data: TextureData) -> Self {
        Self {
            path: path.into(),
            data,
            generate_mipmaps: true,
        }
    }
}

/// Load a texture from encoded image bytes.
pub fn load_texture_from_bytes(data: &[u8]) -> Result<TextureData, image::ImageError> {
    let img = image::load_from_memory(data)?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(TextureData {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_pixel() {
        let tex = TextureData::new(2, 2, vec![255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255]);

        assert_eq!(tex.get_pixel(0, 0), [255, 0, 0, 255]); // Red
        assert_eq!(tex.get_pixel(1, 0), [0, 255, 0, 255]); // Green
        assert_eq!(tex.get_pixel(0, 1), [0, 0, 255, 255]); // Blue
        assert_eq!(tex.get_pixel(1, 1), [255, 255, 255, 255]); // White
    }

    #[test]
    fn test_solid() {
        let tex = TextureData::solid(3, 2, [1, 2, 3, 4]);
        assert_eq!(tex.pixels.len(), 3 * 2 * 4);
        assert_eq!(tex.get_pixel(2, 1), [1, 2, 3, 4]);
    }

    #[test]
    fn test_load_png_bytes() {
        let mut png = Vec::new();
        let img = image::RgbaImage::from_raw(1, 1, vec![10, 20, 30, 255]).unwrap();
        img.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let tex = load_texture_from_bytes(&png).unwrap();
        assert_eq!((tex.width, tex.height), (1, 1));
        assert_eq!(tex.get_pixel(0, 0), [10, 20, 30, 255]);
    }

    #[test]
    fn test_load_garbage_fails() {
        assert!(load_texture_from_bytes(b"not an image").is_err());
    }
}
