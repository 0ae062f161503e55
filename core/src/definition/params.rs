//! Shader parameter ids and the parameter block shading target.
//!
//! Parameter ids are the xxh3 hash of the parameter name, computed at compile
//! time, so every property group resolves its handles exactly once.

use decalforge_shared::TextureHandle;
use glam::Vec4;
use hashbrown::HashMap;

/// Handle to a named shader parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u64);

impl ParamId {
    pub const fn new(name: &str) -> Self {
        ParamId(xxhash_rust::const_xxh3::xxh3_64(name.as_bytes()))
    }
}

// =============================================================================
// Parameter names
// =============================================================================

pub const ALBEDO_MAP: ParamId = ParamId::new("decal_albedo_map");
pub const ALBEDO_COLOR: ParamId = ParamId::new("decal_albedo_color");
pub const GLOSS_MAP: ParamId = ParamId::new("decal_gloss_map");
pub const GLOSSINESS: ParamId = ParamId::new("decal_glossiness");
pub const METALLIC_MAP: ParamId = ParamId::new("decal_metallic_map");
pub const METALLICITY: ParamId = ParamId::new("decal_metallicity");
pub const SPECULAR_MAP: ParamId = ParamId::new("decal_specular_map");
pub const SPECULAR_COLOR: ParamId = ParamId::new("decal_specular_color");
pub const NORMAL_MAP: ParamId = ParamId::new("decal_normal_map");
pub const NORMAL_STRENGTH: ParamId = ParamId::new("decal_normal_strength");
pub const EMISSION_MAP: ParamId = ParamId::new("decal_emission_map");
pub const EMISSION_COLOR: ParamId = ParamId::new("decal_emission_color");
pub const EMISSION_INTENSITY: ParamId = ParamId::new("decal_emission_intensity");
pub const OPACITY: ParamId = ParamId::new("decal_opacity");

/// Instanced: xy = tiling, zw = offset
pub const TILING_OFFSET: ParamId = ParamId::new("decal_tiling_offset");
/// Instanced: which masking layers the projection draws onto (1.0 = yes)
pub const PROJECTION_MASK: ParamId = ParamId::new("decal_projection_mask");

/// Instanced tint, shares the slot of the albedo color
pub const TINT: ParamId = ALBEDO_COLOR;
/// Instanced strength, shares the slot of the normal strength
pub const STRENGTH: ParamId = NORMAL_STRENGTH;

/// Replacement pass input: mask-layer vector of the current sub-draw
pub const MASK_LAYERS: ParamId = ParamId::new("decal_mask_layers");

// =============================================================================
// Shading target
// =============================================================================

/// A value stored in a parameter block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Texture(TextureHandle),
    Color(Vec4),
    Float(f32),
    Vector(Vec4),
}

/// Anything shader parameters can be pushed into (a material, a property
/// block, a uniform staging area).
pub trait ShadingTarget {
    fn set_texture(&mut self, id: ParamId, texture: TextureHandle);
    fn set_color(&mut self, id: ParamId, color: Vec4);
    fn set_float(&mut self, id: ParamId, value: f32);
    fn set_vector(&mut self, id: ParamId, value: Vec4);
}

/// CPU-side parameter store. Used as the shared material of a definition and
/// as the per-instance block merged at draw time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBlock {
    values: HashMap<ParamId, ParamValue>,
}

impl ParameterBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ParamId) -> Option<ParamValue> {
        self.values.get(&id).copied()
    }

    pub fn texture(&self, id: ParamId) -> Option<TextureHandle> {
        match self.values.get(&id) {
            Some(ParamValue::Texture(t)) => Some(*t),
            _ => None,
        }
    }

    pub fn color(&self, id: ParamId) -> Option<Vec4> {
        match self.values.get(&id) {
            Some(ParamValue::Color(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn float(&self, id: ParamId) -> Option<f32> {
        match self.values.get(&id) {
            Some(ParamValue::Float(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn vector(&self, id: ParamId) -> Option<Vec4> {
        match self.values.get(&id) {
            Some(ParamValue::Vector(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Copy every value of this block into another target.
    pub fn apply_to(&self, target: &mut dyn ShadingTarget) {
        for (&id, value) in &self.values {
            match *value {
                ParamValue::Texture(t) => target.set_texture(id, t),
                ParamValue::Color(c) => target.set_color(id, c),
                ParamValue::Float(v) => target.set_float(id, v),
                ParamValue::Vector(v) => target.set_vector(id, v),
            }
        }
    }
}

impl ShadingTarget for ParameterBlock {
    fn set_texture(&mut self, id: ParamId, texture: TextureHandle) {
        self.values.insert(id, ParamValue::Texture(texture));
    }

    fn set_color(&mut self, id: ParamId, color: Vec4) {
        self.values.insert(id, ParamValue::Color(color));
    }

    fn set_float(&mut self, id: ParamId, value: f32) {
        self.values.insert(id, ParamValue::Float(value));
    }

    fn set_vector(&mut self, id: ParamId, value: Vec4) {
        self.values.insert(id, ParamValue::Vector(value));
    }
}
