//! Property groups, one per material channel.
//!
//! Groups are plain values. Setters report whether anything changed and
//! leave dirty tracking to the owning definition.

use decalforge_shared::TextureHandle;
use glam::Vec4;

use super::params::{self, ShadingTarget};

/// Replace `field` with `value`, returning true if it differed.
#[inline]
fn replace<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        false
    } else {
        *field = value;
        true
    }
}

/// Albedo (base color) channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbedoProperty {
    pub texture: TextureHandle,
    pub color: Vec4,
}

impl Default for AlbedoProperty {
    fn default() -> Self {
        Self {
            texture: TextureHandle::INVALID,
            color: Vec4::ONE,
        }
    }
}

impl AlbedoProperty {
    pub fn set_texture(&mut self, texture: TextureHandle) -> bool {
        replace(&mut self.texture, texture)
    }

    pub fn set_color(&mut self, color: Vec4) -> bool {
        replace(&mut self.color, color)
    }

    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        target.set_texture(params::ALBEDO_MAP, self.texture);
        target.set_color(params::ALBEDO_COLOR, self.color);
    }
}

/// Smoothness-only channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlossProperty {
    pub texture: TextureHandle,
    pub glossiness: f32,
}

impl Default for GlossProperty {
    fn default() -> Self {
        Self {
            texture: TextureHandle::INVALID,
            glossiness: 0.5,
        }
    }
}

impl GlossProperty {
    pub fn set_texture(&mut self, texture: TextureHandle) -> bool {
        replace(&mut self.texture, texture)
    }

    pub fn set_glossiness(&mut self, glossiness: f32) -> bool {
        replace(&mut self.glossiness, glossiness.clamp(0.0, 1.0))
    }

    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        target.set_texture(params::GLOSS_MAP, self.texture);
        target.set_float(params::GLOSSINESS, self.glossiness);
    }
}

/// Metallic workflow channel (metallicity + smoothness)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetallicProperty {
    pub texture: TextureHandle,
    pub metallicity: f32,
    pub glossiness: f32,
}

impl Default for MetallicProperty {
    fn default() -> Self {
        Self {
            texture: TextureHandle::INVALID,
            metallicity: 0.0,
            glossiness: 0.5,
        }
    }
}

impl MetallicProperty {
    pub fn set_texture(&mut self, texture: TextureHandle) -> bool {
        replace(&mut self.texture, texture)
    }

    pub fn set_metallicity(&mut self, metallicity: f32) -> bool {
        replace(&mut self.metallicity, metallicity.clamp(0.0, 1.0))
    }

    pub fn set_glossiness(&mut self, glossiness: f32) -> bool {
        replace(&mut self.glossiness, glossiness.clamp(0.0, 1.0))
    }

    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        target.set_texture(params::METALLIC_MAP, self.texture);
        target.set_float(params::METALLICITY, self.metallicity);
        target.set_float(params::GLOSSINESS, self.glossiness);
    }
}

/// Specular workflow channel (specular color + smoothness)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecularProperty {
    pub texture: TextureHandle,
    pub color: Vec4,
    pub glossiness: f32,
}

impl Default for SpecularProperty {
    fn default() -> Self {
        Self {
            texture: TextureHandle::INVALID,
            color: Vec4::new(0.2, 0.2, 0.2, 1.0),
            glossiness: 0.5,
        }
    }
}

impl SpecularProperty {
    pub fn set_texture(&mut self, texture: TextureHandle) -> bool {
        replace(&mut self.texture, texture)
    }

    pub fn set_color(&mut self, color: Vec4) -> bool {
        replace(&mut self.color, color)
    }

    pub fn set_glossiness(&mut self, glossiness: f32) -> bool {
        replace(&mut self.glossiness, glossiness.clamp(0.0, 1.0))
    }

    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        target.set_texture(params::SPECULAR_MAP, self.texture);
        target.set_color(params::SPECULAR_COLOR, self.color);
        target.set_float(params::GLOSSINESS, self.glossiness);
    }
}

/// Normal map channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalProperty {
    pub texture: TextureHandle,
    pub strength: f32,
}

impl Default for NormalProperty {
    fn default() -> Self {
        Self {
            texture: TextureHandle::INVALID,
            strength: 1.0,
        }
    }
}

impl NormalProperty {
    pub fn set_texture(&mut self, texture: TextureHandle) -> bool {
        replace(&mut self.texture, texture)
    }

    pub fn set_strength(&mut self, strength: f32) -> bool {
        replace(&mut self.strength, strength.max(0.0))
    }

    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        target.set_texture(params::NORMAL_MAP, self.texture);
        target.set_float(params::NORMAL_STRENGTH, self.strength);
    }
}

/// Emission channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissiveProperty {
    pub texture: TextureHandle,
    pub color: Vec4,
    pub intensity: f32,
}

impl Default for EmissiveProperty {
    fn default() -> Self {
        Self {
            texture: TextureHandle::INVALID,
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            intensity: 1.0,
        }
    }
}

impl EmissiveProperty {
    pub fn set_texture(&mut self, texture: TextureHandle) -> bool {
        replace(&mut self.texture, texture)
    }

    pub fn set_color(&mut self, color: Vec4) -> bool {
        replace(&mut self.color, color)
    }

    pub fn set_intensity(&mut self, intensity: f32) -> bool {
        replace(&mut self.intensity, intensity.max(0.0))
    }

    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        target.set_texture(params::EMISSION_MAP, self.texture);
        target.set_color(params::EMISSION_COLOR, self.color);
        target.set_float(params::EMISSION_INTENSITY, self.intensity);
    }
}
