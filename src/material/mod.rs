//! Terrain materials: shader preprocessor definitions and parameter bindings.
//!
//! A [`Material`] does not snapshot scene state. Each parameter is bound to a
//! [`ParameterBinding`] that is resolved against a [`BindingContext`] at draw
//! time, so camera and light changes show up without rebuilding the material.
//! Explicit values set through [`Material::set_value`] take precedence over
//! bindings of the same name.

use crate::assets::texture::{FilterMode, Texture, WrapMode};
use crate::scene::DirectionalLight;
use glam::{Mat4, Vec2, Vec3};
use std::rc::Rc;

/// Default terrain vertex shader path.
pub const DEFAULT_VERTEX_SHADER: &str = "res/shaders/terrain.vert";
/// Default terrain fragment shader path.
pub const DEFAULT_FRAGMENT_SHADER: &str = "res/shaders/terrain.frag";

/// Shader sources a material is compiled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialSource {
    pub vertex_shader: String,
    pub fragment_shader: String,
}

impl Default for MaterialSource {
    fn default() -> Self {
        Self {
            vertex_shader: DEFAULT_VERTEX_SHADER.to_string(),
            fragment_shader: DEFAULT_FRAGMENT_SHADER.to_string(),
        }
    }
}

/// Semicolon-separated preprocessor definitions, e.g. `LAYER_COUNT 2;NORMAL_MAP`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    entries: Vec<String>,
}

impl ShaderDefines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bare flag definition.
    pub fn define(&mut self, name: &str) -> &mut Self {
        self.entries.push(name.to_string());
        self
    }

    /// Add a definition with a value.
    pub fn define_value(&mut self, name: &str, value: impl std::fmt::Display) -> &mut Self {
        self.entries.push(format!("{} {}", name, value));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e == name || e.split_once(' ').map(|(n, _)| n == name).unwrap_or(false))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Display for ShaderDefines {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.entries.join(";"))
    }
}

/// A texture plus sampling state.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerBinding {
    pub texture: Rc<Texture>,
    pub wrap: WrapMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
}

impl SamplerBinding {
    /// Repeat-wrapped, trilinear-filtered sampler used for terrain layers.
    pub fn repeat(texture: Rc<Texture>) -> Self {
        Self {
            texture,
            wrap: WrapMode::Repeat,
            min_filter: FilterMode::LinearMipmapLinear,
            mag_filter: FilterMode::Linear,
        }
    }

    pub fn path(&self) -> &str {
        &self.texture.path
    }
}

/// Resolved value of a material parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Mat4(Mat4),
    Sampler(SamplerBinding),
    /// One entry per sampler slot; freed slots are `None`.
    SamplerArray(Vec<Option<SamplerBinding>>),
}

/// Scene or terrain state a parameter is read from at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterBinding {
    WorldViewProjectionMatrix,
    NormalMatrix,
    NormalMap,
    AmbientColor,
    LightColor,
    LightDirection,
    LayerSamplers,
    PatchRow,
    PatchColumn,
}

/// Everything a binding may be resolved against.
#[derive(Debug, Clone)]
pub struct BindingContext<'a> {
    pub world_view_projection: Mat4,
    pub normal_matrix: Mat4,
    pub normal_map: Option<&'a SamplerBinding>,
    pub ambient_color: Vec3,
    pub light: DirectionalLight,
    pub layer_samplers: Vec<Option<SamplerBinding>>,
    pub row: usize,
    pub column: usize,
}

impl ParameterBinding {
    /// Read the bound value, or `None` if the context has nothing to offer.
    pub fn resolve(&self, ctx: &BindingContext<'_>) -> Option<ParameterValue> {
        match self {
            Self::WorldViewProjectionMatrix => Some(ParameterValue::Mat4(ctx.world_view_projection)),
            Self::NormalMatrix => Some(ParameterValue::Mat4(ctx.normal_matrix)),
            Self::NormalMap => ctx.normal_map.cloned().map(ParameterValue::Sampler),
            Self::AmbientColor => Some(ParameterValue::Vec3(ctx.ambient_color)),
            Self::LightColor => Some(ParameterValue::Vec3(ctx.light.color)),
            Self::LightDirection => Some(ParameterValue::Vec3(ctx.light.direction)),
            Self::LayerSamplers => {
                if ctx.layer_samplers.is_empty() {
                    None
                } else {
                    Some(ParameterValue::SamplerArray(ctx.layer_samplers.clone()))
                }
            }
            Self::PatchRow => Some(ParameterValue::Float(ctx.row as f32)),
            Self::PatchColumn => Some(ParameterValue::Float(ctx.column as f32)),
        }
    }
}

/// A compiled-on-demand terrain material description.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub source: MaterialSource,
    /// Preprocessor definition string passed to the shader compiler.
    pub defines: String,
    bindings: Vec<(String, ParameterBinding)>,
    values: Vec<(String, ParameterValue)>,
}

impl Material {
    pub fn new(source: MaterialSource, defines: impl Into<String>) -> Self {
        Self {
            source,
            defines: defines.into(),
            bindings: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Bind a parameter name to draw-time state, replacing any previous binding.
    pub fn bind(&mut self, name: &str, binding: ParameterBinding) {
        match self.bindings.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = binding,
            None => self.bindings.push((name.to_string(), binding)),
        }
    }

    /// Set a fixed value that overrides any binding of the same name.
    pub fn set_value(&mut self, name: &str, value: ParameterValue) {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    pub fn binding(&self, name: &str) -> Option<ParameterBinding> {
        self.bindings.iter().find(|(n, _)| n == name).map(|(_, b)| *b)
    }

    pub fn value(&self, name: &str) -> Option<&ParameterValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&str, ParameterBinding)> {
        self.bindings.iter().map(|(n, b)| (n.as_str(), *b))
    }

    /// Resolve all parameters for a draw. Fixed values come first, then
    /// bindings whose name has no fixed value.
    pub fn resolve(&self, ctx: &BindingContext<'_>) -> Vec<(String, ParameterValue)> {
        let mut resolved: Vec<(String, ParameterValue)> = self.values.clone();
        for (name, binding) in &self.bindings {
            if self.values.iter().any(|(n, _)| n == name) {
                continue;
            }
            if let Some(value) = binding.resolve(ctx) {
                resolved.push((name.clone(), value));
            }
        }
        resolved
    }
}
