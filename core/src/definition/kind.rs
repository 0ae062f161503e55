//! Projection kinds
//!
//! Each kind is a closed variant carrying exactly the property groups it
//! renders with. All kind-specific behaviour (which channels exist, which
//! decal program draws it) is a single match here.

use crate::camera::RenderingPath;

use super::Channels;
use super::params::ShadingTarget;
use super::properties::{
    AlbedoProperty, EmissiveProperty, GlossProperty, MetallicProperty, NormalProperty,
    SpecularProperty,
};

/// Visual kind of a projection definition
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionKind {
    /// Flat color, ignores lighting
    Unlit { albedo: AlbedoProperty },
    /// Adds onto the lit surface
    Additive { albedo: AlbedoProperty },
    /// Multiplies the lit surface
    Multiplicative { albedo: AlbedoProperty },
    /// Full PBR metallic workflow
    Metallic {
        albedo: AlbedoProperty,
        metallic: MetallicProperty,
        normal: NormalProperty,
        emissive: EmissiveProperty,
    },
    /// Full PBR specular workflow
    Specular {
        albedo: AlbedoProperty,
        specular: SpecularProperty,
        normal: NormalProperty,
        emissive: EmissiveProperty,
    },
    /// Modifies smoothness only (wet patches)
    Gloss { gloss: GlossProperty },
    /// Modifies normals only (dents, scratches)
    Normal { normal: NormalProperty },
}

/// Lighting path a decal program variant is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderPath {
    Forward,
    Deferred,
}

impl ShaderPath {
    /// Map a camera rendering path. Unsupported paths have no decal program.
    pub fn from_rendering_path(path: RenderingPath) -> Option<Self> {
        match path {
            RenderingPath::Forward => Some(ShaderPath::Forward),
            RenderingPath::Deferred => Some(ShaderPath::Deferred),
            RenderingPath::LegacyDeferred | RenderingPath::VertexLit => None,
        }
    }
}

/// Decal material program selected for a kind on a given path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionShader {
    Unlit,
    Additive,
    Multiplicative,
    Metallic(ShaderPath),
    Specular(ShaderPath),
    Gloss(ShaderPath),
    Normal(ShaderPath),
}

impl ProjectionKind {
    pub fn unlit() -> Self {
        ProjectionKind::Unlit {
            albedo: AlbedoProperty::default(),
        }
    }

    pub fn additive() -> Self {
        ProjectionKind::Additive {
            albedo: AlbedoProperty::default(),
        }
    }

    pub fn multiplicative() -> Self {
        ProjectionKind::Multiplicative {
            albedo: AlbedoProperty::default(),
        }
    }

    pub fn metallic() -> Self {
        ProjectionKind::Metallic {
            albedo: AlbedoProperty::default(),
            metallic: MetallicProperty::default(),
            normal: NormalProperty::default(),
            emissive: EmissiveProperty::default(),
        }
    }

    pub fn specular() -> Self {
        ProjectionKind::Specular {
            albedo: AlbedoProperty::default(),
            specular: SpecularProperty::default(),
            normal: NormalProperty::default(),
            emissive: EmissiveProperty::default(),
        }
    }

    pub fn gloss() -> Self {
        ProjectionKind::Gloss {
            gloss: GlossProperty::default(),
        }
    }

    pub fn normal() -> Self {
        ProjectionKind::Normal {
            normal: NormalProperty::default(),
        }
    }

    /// Channels this kind owns property groups for
    pub fn channels(&self) -> Channels {
        match self {
            ProjectionKind::Unlit { .. }
            | ProjectionKind::Additive { .. }
            | ProjectionKind::Multiplicative { .. } => Channels::ALBEDO,
            ProjectionKind::Metallic { .. } => {
                Channels::ALBEDO | Channels::METALLIC | Channels::NORMAL | Channels::EMISSIVE
            }
            ProjectionKind::Specular { .. } => {
                Channels::ALBEDO | Channels::SPECULAR | Channels::NORMAL | Channels::EMISSIVE
            }
            ProjectionKind::Gloss { .. } => Channels::GLOSS,
            ProjectionKind::Normal { .. } => Channels::NORMAL,
        }
    }

    /// Decal program for this kind on the given path
    pub fn shader(&self, path: ShaderPath) -> ProjectionShader {
        match self {
            ProjectionKind::Unlit { .. } => ProjectionShader::Unlit,
            ProjectionKind::Additive { .. } => ProjectionShader::Additive,
            ProjectionKind::Multiplicative { .. } => ProjectionShader::Multiplicative,
            ProjectionKind::Metallic { .. } => ProjectionShader::Metallic(path),
            ProjectionKind::Specular { .. } => ProjectionShader::Specular(path),
            ProjectionKind::Gloss { .. } => ProjectionShader::Gloss(path),
            ProjectionKind::Normal { .. } => ProjectionShader::Normal(path),
        }
    }

    /// Push the groups selected by `channels` into `target`.
    pub fn apply_channels(&self, channels: Channels, target: &mut dyn ShadingTarget) {
        match self {
            ProjectionKind::Unlit { albedo }
            | ProjectionKind::Additive { albedo }
            | ProjectionKind::Multiplicative { albedo } => {
                if channels.contains(Channels::ALBEDO) {
                    albedo.apply(target);
                }
            }
            ProjectionKind::Metallic {
                albedo,
                metallic,
                normal,
                emissive,
            } => {
                if channels.contains(Channels::ALBEDO) {
                    albedo.apply(target);
                }
                if channels.contains(Channels::METALLIC) {
                    metallic.apply(target);
                }
                if channels.contains(Channels::NORMAL) {
                    normal.apply(target);
                }
                if channels.contains(Channels::EMISSIVE) {
                    emissive.apply(target);
                }
            }
            ProjectionKind::Specular {
                albedo,
                specular,
                normal,
                emissive,
            } => {
                if channels.contains(Channels::ALBEDO) {
                    albedo.apply(target);
                }
                if channels.contains(Channels::SPECULAR) {
                    specular.apply(target);
                }
                if channels.contains(Channels::NORMAL) {
                    normal.apply(target);
                }
                if channels.contains(Channels::EMISSIVE) {
                    emissive.apply(target);
                }
            }
            ProjectionKind::Gloss { gloss } => {
                if channels.contains(Channels::GLOSS) {
                    gloss.apply(target);
                }
            }
            ProjectionKind::Normal { normal } => {
                if channels.contains(Channels::NORMAL) {
                    normal.apply(target);
                }
            }
        }
    }

    pub fn albedo_mut(&mut self) -> Option<&mut AlbedoProperty> {
        match self {
            ProjectionKind::Unlit { albedo }
            | ProjectionKind::Additive { albedo }
            | ProjectionKind::Multiplicative { albedo }
            | ProjectionKind::Metallic { albedo, .. }
            | ProjectionKind::Specular { albedo, .. } => Some(albedo),
            ProjectionKind::Gloss { .. } | ProjectionKind::Normal { .. } => None,
        }
    }

    pub fn albedo(&self) -> Option<&AlbedoProperty> {
        match self {
            ProjectionKind::Unlit { albedo }
            | ProjectionKind::Additive { albedo }
            | ProjectionKind::Multiplicative { albedo }
            | ProjectionKind::Metallic { albedo, .. }
            | ProjectionKind::Specular { albedo, .. } => Some(albedo),
            ProjectionKind::Gloss { .. } | ProjectionKind::Normal { .. } => None,
        }
    }

    pub fn normal_mut(&mut self) -> Option<&mut NormalProperty> {
        match self {
            ProjectionKind::Metallic { normal, .. }
            | ProjectionKind::Specular { normal, .. }
            | ProjectionKind::Normal { normal } => Some(normal),
            _ => None,
        }
    }

    pub fn normal_property(&self) -> Option<&NormalProperty> {
        match self {
            ProjectionKind::Metallic { normal, .. }
            | ProjectionKind::Specular { normal, .. }
            | ProjectionKind::Normal { normal } => Some(normal),
            _ => None,
        }
    }

    pub fn emissive_mut(&mut self) -> Option<&mut EmissiveProperty> {
        match self {
            ProjectionKind::Metallic { emissive, .. }
            | ProjectionKind::Specular { emissive, .. } => Some(emissive),
            _ => None,
        }
    }

    pub fn metallic_mut(&mut self) -> Option<&mut MetallicProperty> {
        match self {
            ProjectionKind::Metallic { metallic, .. } => Some(metallic),
            _ => None,
        }
    }

    pub fn specular_mut(&mut self) -> Option<&mut SpecularProperty> {
        match self {
            ProjectionKind::Specular { specular, .. } => Some(specular),
            _ => None,
        }
    }

    pub fn gloss_mut(&mut self) -> Option<&mut GlossProperty> {
        match self {
            ProjectionKind::Gloss { gloss } => Some(gloss),
            _ => None,
        }
    }
}
