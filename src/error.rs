//! Error types for terrain construction and export.

use thiserror::Error;

/// Result type alias using TerrainError.
pub type Result<T> = std::result::Result<T, TerrainError>;

/// Main error type for terrain operations.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// Failed to read or parse a ZIP archive.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read or process an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Asset not found in the asset source.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Heightfield dimensions or data are unusable.
    #[error("Invalid heightfield: {0}")]
    InvalidHeightField(String),

    /// Heightmap file format is not recognized.
    #[error("Unsupported heightmap format: {0}")]
    UnsupportedHeightmap(String),

    /// The base level of a patch has fewer than 2x2 samples.
    #[error("Terrain patch at row {row}, column {column} has no geometry")]
    DegeneratePatch { row: usize, column: usize },

    /// A patch level needs more indices than a 16-bit index buffer can address.
    #[error("Index count of {count} for terrain patch exceeds the limit of 65535; use a smaller patch size")]
    IndexOverflow { count: usize },

    /// A texture could not be loaded.
    #[error("Texture load error: {0}")]
    TextureLoad(String),

    /// Terrain configuration is malformed.
    #[error("Invalid terrain configuration: {0}")]
    InvalidConfig(String),

    /// Failed to export mesh.
    #[error("Export error: {0}")]
    Export(String),
}
