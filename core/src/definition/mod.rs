//! Projection definitions: shared visual parameters for one decal kind.
//!
//! A definition owns its property groups and a shared material
//! ([`ParameterBlock`]). Edits only set dirty bits; the registry applies all
//! dirty definitions once per frame via [`ProjectionDefinition::update`], so
//! any number of edits within a frame cost one apply.

mod kind;
pub mod params;
mod properties;


use bitflags::bitflags;
use decalforge_shared::DefinitionId;
use hashbrown::HashMap;

use crate::camera::RenderingPath;

pub use kind::{ProjectionKind, ProjectionShader, ShaderPath};
pub use params::{ParamId, ParamValue, ParameterBlock, ShadingTarget};
pub use properties::{
    AlbedoProperty, EmissiveProperty, GlossProperty, MetallicProperty, NormalProperty,
    SpecularProperty,
};

bitflags! {
    /// Material channels, also used as the definition's dirty set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Channels: u8 {
        const ALBEDO = 1 << 0;
        const GLOSS = 1 << 1;
        const METALLIC = 1 << 2;
        const SPECULAR = 1 << 3;
        const NORMAL = 1 << 4;
        const EMISSIVE = 1 << 5;
        /// Definition-level values (opacity)
        const BASE = 1 << 6;
    }
}

/// Which rendering paths a definition may draw on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathSupport {
    ForwardOnly,
    DeferredOnly,
    #[default]
    Both,
}

impl PathSupport {
    pub fn supports(self, path: ShaderPath) -> bool {
        matches!(
            (self, path),
            (PathSupport::Both, _)
                | (PathSupport::ForwardOnly, ShaderPath::Forward)
                | (PathSupport::DeferredOnly, ShaderPath::Deferred)
        )
    }
}

/// Shared configuration for one decal kind
#[derive(Debug, Clone)]
pub struct ProjectionDefinition {
    id: DefinitionId,
    name: String,
    kind: ProjectionKind,
    priority: i32,
    path_support: PathSupport,
    instanced: bool,
    opacity: f32,
    dirty: Channels,
    material: ParameterBlock,
}

impl ProjectionDefinition {
    /// New definition. Everything starts dirty so the first update fills the
    /// shared material.
    pub fn new(id: DefinitionId, name: impl Into<String>, kind: ProjectionKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            priority: 0,
            path_support: PathSupport::Both,
            instanced: false,
            opacity: 1.0,
            dirty: Channels::all(),
            material: ParameterBlock::new(),
        }
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ProjectionKind {
        &self.kind
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn path_support(&self) -> PathSupport {
        self.path_support
    }

    pub fn is_instanced(&self) -> bool {
        self.instanced
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_channels(&self) -> Channels {
        self.dirty
    }

    /// Shared material as of the last [`update`](Self::update)
    pub fn material(&self) -> &ParameterBlock {
        &self.material
    }

    /// Change the draw priority. Returns true if it changed; the caller must
    /// then reorder the definition's group in the registry.
    pub fn set_priority(&mut self, priority: i32) -> bool {
        if self.priority == priority {
            return false;
        }
        self.priority = priority;
        true
    }

    pub fn set_instanced(&mut self, instanced: bool) -> bool {
        if self.instanced == instanced {
            return false;
        }
        self.instanced = instanced;
        true
    }

    pub fn set_path_support(&mut self, support: PathSupport) -> bool {
        if self.path_support == support {
            return false;
        }
        self.path_support = support;
        true
    }

    /// Replace the kind. The shared material is rebuilt from scratch.
    pub fn set_kind(&mut self, kind: ProjectionKind) {
        self.kind = kind;
        self.material.clear();
        self.dirty = Channels::all();
    }

    pub fn set_opacity(&mut self, opacity: f32) -> bool {
        let opacity = opacity.clamp(0.0, 1.0);
        if self.opacity == opacity {
            return false;
        }
        self.opacity = opacity;
        self.mark_dirty(Channels::BASE);
        true
    }

    pub fn mark_dirty(&mut self, channels: Channels) {
        self.dirty |= channels;
    }

    fn mark_if(&mut self, changed: bool, channel: Channels) -> bool {
        if changed {
            self.mark_dirty(channel);
        }
        changed
    }

    /// Edit the albedo group. Returns false if the kind has no albedo or the
    /// edit changed nothing.
    pub fn edit_albedo(&mut self, edit: impl FnOnce(&mut AlbedoProperty) -> bool) -> bool {
        let changed = self.kind.albedo_mut().is_some_and(edit);
        self.mark_if(changed, Channels::ALBEDO)
    }

    pub fn edit_gloss(&mut self, edit: impl FnOnce(&mut GlossProperty) -> bool) -> bool {
        let changed = self.kind.gloss_mut().is_some_and(edit);
        self.mark_if(changed, Channels::GLOSS)
    }

    pub fn edit_metallic(&mut self, edit: impl FnOnce(&mut MetallicProperty) -> bool) -> bool {
        let changed = self.kind.metallic_mut().is_some_and(edit);
        self.mark_if(changed, Channels::METALLIC)
    }

    pub fn edit_specular(&mut self, edit: impl FnOnce(&mut SpecularProperty) -> bool) -> bool {
        let changed = self.kind.specular_mut().is_some_and(edit);
        self.mark_if(changed, Channels::SPECULAR)
    }

    pub fn edit_normal(&mut self, edit: impl FnOnce(&mut NormalProperty) -> bool) -> bool {
        let changed = self.kind.normal_mut().is_some_and(edit);
        self.mark_if(changed, Channels::NORMAL)
    }

    pub fn edit_emissive(&mut self, edit: impl FnOnce(&mut EmissiveProperty) -> bool) -> bool {
        let changed = self.kind.emissive_mut().is_some_and(edit);
        self.mark_if(changed, Channels::EMISSIVE)
    }

    /// Push every group's current values into `target`.
    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        self.kind.apply_channels(Channels::all(), target);
        target.set_float(params::OPACITY, self.opacity);
    }

    /// Re-apply dirty groups to the shared material and clear the dirty set.
    ///
    /// Returns true if anything was applied.
    pub fn update(&mut self) -> bool {
        if self.dirty.is_empty() {
            return false;
        }
        let dirty = std::mem::replace(&mut self.dirty, Channels::empty());
        self.kind.apply_channels(dirty, &mut self.material);
        if dirty.contains(Channels::BASE) {
            self.material.set_float(params::OPACITY, self.opacity);
        }
        true
    }

    /// Decal program for a camera path, or `None` if this definition does not
    /// draw on that path.
    pub fn shader(&self, path: RenderingPath) -> Option<ProjectionShader> {
        let path = ShaderPath::from_rendering_path(path)?;
        self.path_support
            .supports(path)
            .then(|| self.kind.shader(path))
    }
}

/// Owner of all definitions, keyed by id.
#[derive(Debug, Default)]
pub struct DefinitionStore {
    definitions: HashMap<DefinitionId, ProjectionDefinition>,
    next_id: u32,
}

impl DefinitionStore {
    pub fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            next_id: 1, // 0 is never handed out
        }
    }

    pub fn create(&mut self, name: impl Into<String>, kind: ProjectionKind) -> DefinitionId {
        let id = DefinitionId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.definitions.insert(id, ProjectionDefinition::new(id, name, kind));
        id
    }

    pub fn get(&self, id: DefinitionId) -> Option<&ProjectionDefinition> {
        self.definitions.get(&id)
    }

    pub fn get_mut(&mut self, id: DefinitionId) -> Option<&mut ProjectionDefinition> {
        self.definitions.get_mut(&id)
    }

    pub fn remove(&mut self, id: DefinitionId) -> Option<ProjectionDefinition> {
        self.definitions.remove(&id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&ProjectionDefinition> {
        self.definitions.values().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectionDefinition> {
        self.definitions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ProjectionDefinition> {
        self.definitions.values_mut()
    }
}
