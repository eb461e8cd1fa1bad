//! Declarative terrain definition files.
//!
//! A definition is a JSON document such as:
//!
//! ```json
//! {
//!     "heightmap": { "path": "heightmap.raw", "size": [257, 257] },
//!     "size": [512, 96, 512],
//!     "patchSize": 32,
//!     "detailLevels": 3,
//!     "skirtScale": 0.5,
//!     "layers": [
//!         { "texture": { "path": "dirt.png", "repeat": [30, 30] } },
//!         { "texture": { "path": "grass.png" }, "blend": { "path": "mask.png", "channel": "g" } }
//!     ]
//! }
//! ```

use super::layer::BlendChannel;
use crate::error::{Result, TerrainError};
use crate::heightfield::HeightField;
use crate::material::MaterialSource;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Patch size used when none (or an unusable one) is given.
pub const DEFAULT_PATCH_SIZE: usize = 32;

/// Default terrain height as a fraction of the mean heightfield dimension.
pub const DEFAULT_HEIGHT_RATIO: f32 = 0.3;

/// A terrain definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainConfig {
    pub heightmap: HeightmapConfig,
    /// World extent `[x, y, z]`; `y` is the height of a normalized sample of 1.
    #[serde(default)]
    pub size: Option<[f32; 3]>,
    #[serde(default)]
    pub patch_size: Option<usize>,
    #[serde(default)]
    pub detail_levels: Option<usize>,
    #[serde(default)]
    pub skirt_scale: Option<f32>,
    #[serde(default)]
    pub normal_map: Option<String>,
    #[serde(default)]
    pub material: Option<MaterialConfig>,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

/// Either a bare path or a block with RAW dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeightmapConfig {
    Path(String),
    Detailed(HeightmapSource),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeightmapSource {
    pub path: String,
    /// `[columns, rows]`, required for RAW files.
    #[serde(default)]
    pub size: Option<[usize; 2]>,
    /// Heights a sample of 0 and of full scale map to. Defaults to `[0, 1]`.
    #[serde(default)]
    pub height_range: Option<[f32; 2]>,
}

impl HeightmapConfig {
    pub fn path(&self) -> &str {
        match self {
            HeightmapConfig::Path(path) => path,
            HeightmapConfig::Detailed(source) => &source.path,
        }
    }

    pub fn raw_size(&self) -> Option<(usize, usize)> {
        match self {
            HeightmapConfig::Path(_) => None,
            HeightmapConfig::Detailed(source) => source.size.map(|[w, h]| (w, h)),
        }
    }

    pub fn height_range(&self) -> (f32, f32) {
        match self {
            HeightmapConfig::Detailed(HeightmapSource {
                height_range: Some([min, max]),
                ..
            }) => (*min, *max),
            _ => (0.0, 1.0),
        }
    }
}

/// Shader overrides for patch materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialConfig {
    #[serde(default)]
    pub vertex_shader: Option<String>,
    #[serde(default)]
    pub fragment_shader: Option<String>,
}

impl MaterialConfig {
    pub fn source(&self) -> MaterialSource {
        let defaults = MaterialSource::default();
        MaterialSource {
            vertex_shader: self.vertex_shader.clone().unwrap_or(defaults.vertex_shader),
            fragment_shader: self
                .fragment_shader
                .clone()
                .unwrap_or(defaults.fragment_shader),
        }
    }
}

/// One `layers` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Blend order; defaults to one more than the previous entry.
    #[serde(default)]
    pub index: Option<usize>,
    pub texture: LayerTexture,
    #[serde(default)]
    pub blend: Option<LayerBlend>,
    /// Restrict the layer to one patch row.
    #[serde(default)]
    pub row: Option<usize>,
    /// Restrict the layer to one patch column.
    #[serde(default)]
    pub column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerTexture {
    pub path: String,
    #[serde(default = "default_repeat")]
    pub repeat: [f32; 2],
}

fn default_repeat() -> [f32; 2] {
    [1.0, 1.0]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerBlend {
    pub path: String,
    #[serde(default)]
    pub channel: Option<ChannelValue>,
}

/// A blend channel written as a number or a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelValue {
    Index(u8),
    Name(String),
}

impl ChannelValue {
    /// Unrecognized values fall back to red.
    pub fn channel(&self) -> BlendChannel {
        let parsed = match self {
            ChannelValue::Index(i) => BlendChannel::from_index(*i),
            ChannelValue::Name(name) => BlendChannel::parse(name),
        };
        parsed.unwrap_or_else(|| {
            log::warn!("Unknown blend channel {:?}, using red", self);
            BlendChannel::Red
        })
    }
}

/// A layer with its index resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings<'a> {
    pub index: usize,
    pub texture: &'a str,
    pub repeat: Vec2,
    pub blend: Option<&'a str>,
    pub channel: BlendChannel,
    pub row: Option<usize>,
    pub column: Option<usize>,
}

impl TerrainConfig {
    /// Parse a JSON definition.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Definition for a bare heightmap with every option at its default.
    pub fn from_heightmap(path: impl Into<String>) -> Self {
        Self {
            heightmap: HeightmapConfig::Path(path.into()),
            size: None,
            patch_size: None,
            detail_levels: None,
            skirt_scale: None,
            normal_map: None,
            material: None,
            layers: Vec::new(),
        }
    }

    /// World extent, defaulting to one unit per sample and a height of
    /// [`DEFAULT_HEIGHT_RATIO`] times the mean dimension.
    pub fn resolved_size(&self, field: &HeightField) -> Vec3 {
        match self.size {
            Some(size) if size != [0.0; 3] => Vec3::from_array(size),
            _ => {
                let (columns, rows) = (field.columns() as f32, field.rows() as f32);
                Vec3::new(columns, (columns + rows) * 0.5 * DEFAULT_HEIGHT_RATIO, rows)
            }
        }
    }

    /// Per-sample scale: world units between samples on X/Z, and height on Y.
    pub fn scale(&self, field: &HeightField) -> Result<Vec3> {
        if field.columns() < 2 || field.rows() < 2 {
            return Err(TerrainError::InvalidHeightField(format!(
                "heightfield must be at least 2x2, got {}x{}",
                field.columns(),
                field.rows()
            )));
        }
        let size = self.resolved_size(field);
        Ok(Vec3::new(
            size.x / (field.columns() - 1) as f32,
            size.y,
            size.z / (field.rows() - 1) as f32,
        ))
    }

    /// Patch size, replaced by the default when missing, zero or larger than
    /// the heightfield.
    pub fn resolved_patch_size(&self, field: &HeightField) -> usize {
        match self.patch_size {
            Some(size) if size > 0 && size <= field.columns() && size <= field.rows() => size,
            _ => field.rows().min(field.columns()).min(DEFAULT_PATCH_SIZE),
        }
    }

    pub fn resolved_detail_levels(&self) -> usize {
        self.detail_levels.unwrap_or(1).max(1)
    }

    pub fn resolved_skirt_scale(&self) -> f32 {
        self.skirt_scale.unwrap_or(0.0).max(0.0)
    }

    pub fn material_source(&self) -> MaterialSource {
        self.material
            .as_ref()
            .map(MaterialConfig::source)
            .unwrap_or_default()
    }

    /// Layers with missing indices filled in as previous + 1, starting at 0.
    pub fn resolved_layers(&self) -> Vec<LayerSettings<'_>> {
        let mut next = 0;
        self.layers
            .iter()
            .map(|layer| {
                let index = layer.index.unwrap_or(next);
                next = index + 1;
                LayerSettings {
                    index,
                    texture: &layer.texture.path,
                    repeat: Vec2::from_array(layer.texture.repeat),
                    blend: layer.blend.as_ref().map(|b| b.path.as_str()),
                    channel: layer
                        .blend
                        .as_ref()
                        .and_then(|b| b.channel.as_ref())
                        .map(ChannelValue::channel)
                        .unwrap_or_default(),
                    row: layer.row,
                    column: layer.column,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_definition() {
        let json = r#"{
            "heightmap": { "path": "h.raw", "size": [129, 65], "heightRange": [0, 2] },
            "size": [256, 40, 128],
            "patchSize": 16,
            "detailLevels": 4,
            "skirtScale": 1.5,
            "normalMap": "normals.png",
            "material": { "fragmentShader": "custom.frag" },
            "layers": [
                { "texture": { "path": "dirt.png", "repeat": [20, 20] } },
                { "index": 5, "texture": { "path": "grass.png" },
                  "blend": { "path": "mask.png", "channel": "a" }, "row": 1 },
                { "texture": { "path": "rock.png" }, "blend": { "path": "mask.png", "channel": 2 } }
            ]
        }"#;
        let config = TerrainConfig::from_json(json).unwrap();

        assert_eq!(config.heightmap.path(), "h.raw");
        assert_eq!(config.heightmap.raw_size(), Some((129, 65)));
        assert_eq!(config.heightmap.height_range(), (0.0, 2.0));
        assert_eq!(config.resolved_detail_levels(), 4);
        assert_eq!(config.resolved_skirt_scale(), 1.5);
        assert_eq!(config.normal_map.as_deref(), Some("normals.png"));

        let source = config.material_source();
        assert_eq!(source.fragment_shader, "custom.frag");
        assert_eq!(source.vertex_shader, MaterialSource::default().vertex_shader);

        let layers = config.resolved_layers();
        let indices: Vec<usize> = layers.iter().map(|l| l.index).collect();
        assert_eq!(indices, vec![0, 5, 6]);
        assert_eq!(layers[0].repeat, Vec2::new(20.0, 20.0));
        assert_eq!(layers[0].blend, None);
        assert_eq!(layers[1].channel, BlendChannel::Alpha);
        assert_eq!(layers[1].row, Some(1));
        assert_eq!(layers[1].repeat, Vec2::ONE);
        assert_eq!(layers[2].channel, BlendChannel::Blue);
    }

    #[test]
    fn test_defaults_from_heightfield() {
        let config = TerrainConfig::from_json(r#"{ "heightmap": "h.png" }"#).unwrap();
        let field = HeightField::new(21, 11);

        assert_eq!(config.heightmap.raw_size(), None);
        assert_eq!(config.heightmap.height_range(), (0.0, 1.0));
        assert_eq!(config.resolved_size(&field), Vec3::new(21.0, 4.8, 11.0));
        assert_eq!(config.scale(&field).unwrap(), Vec3::new(21.0 / 20.0, 4.8, 11.0 / 10.0));
        assert_eq!(config.resolved_patch_size(&field), 11);
        assert_eq!(config.resolved_detail_levels(), 1);
        assert_eq!(config.resolved_skirt_scale(), 0.0);
    }

    #[test]
    fn test_out_of_range_values_are_replaced() {
        let config = TerrainConfig::from_json(
            r#"{ "heightmap": "h.png", "patchSize": 500, "detailLevels": 0, "skirtScale": -2 }"#,
        )
        .unwrap();
        let field = HeightField::new(100, 100);
        assert_eq!(config.resolved_patch_size(&field), DEFAULT_PATCH_SIZE);
        assert_eq!(config.resolved_detail_levels(), 1);
        assert_eq!(config.resolved_skirt_scale(), 0.0);
    }

    #[test]
    fn test_unknown_channel_falls_back_to_red() {
        assert_eq!(ChannelValue::Name("purple".into()).channel(), BlendChannel::Red);
        assert_eq!(ChannelValue::Index(9).channel(), BlendChannel::Red);
        assert_eq!(ChannelValue::Index(1).channel(), BlendChannel::Green);
    }

    #[test]
    fn test_scale_rejects_tiny_fields() {
        let config = TerrainConfig::from_heightmap("h.png");
        assert!(config.scale(&HeightField::new(1, 5)).is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            TerrainConfig::from_json("{ \"size\": [1, 2, 3] }"),
            Err(TerrainError::Json(_))
        ));
    }
}
