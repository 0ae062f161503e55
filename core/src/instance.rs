//! Projection instances: scene-attached occurrences of a definition.
//!
//! Instances live in an [`InstanceArena`] owned by the system. Pool slots and
//! registry groups refer to them by [`InstanceId`].

use decalforge_shared::{BehaviorHandle, DefinitionId, InstanceId};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::definition::{ProjectionDefinition, ShadingTarget, params};

/// World transform of the projection volume (a unit cube centred on the
/// origin before scaling).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Whether `point` lies inside the projection box with its half-extents
    /// multiplied by `threshold`.
    pub fn contains_point(&self, point: Vec3, threshold: f32) -> bool {
        // Degenerate volumes contain nothing
        if self.scale.cmpeq(Vec3::ZERO).any() {
            return false;
        }
        let local = self.rotation.inverse() * (point - self.translation) / self.scale;
        let half = 0.5 * threshold.max(0.0);
        local.abs().cmple(Vec3::splat(half)).all()
    }
}

/// Set of masking layers (4 bits) an instance projects onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskLayers(u8);

impl MaskLayers {
    pub const NONE: MaskLayers = MaskLayers(0);
    pub const ALL: MaskLayers = MaskLayers(0b1111);

    pub fn from_bits(bits: u8) -> Self {
        MaskLayers(bits & Self::ALL.0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, layer: usize) -> bool {
        layer < 4 && self.0 & (1 << layer) != 0
    }

    pub fn with(self, layer: usize, enabled: bool) -> Self {
        if layer >= 4 {
            return self;
        }
        if enabled {
            MaskLayers(self.0 | (1 << layer))
        } else {
            MaskLayers(self.0 & !(1 << layer))
        }
    }

    /// One component per masking layer, 1.0 when set.
    pub fn as_vector(self) -> Vec4 {
        let c = |i| if self.contains(i) { 1.0 } else { 0.0 };
        Vec4::new(c(0), c(1), c(2), c(3))
    }
}

/// Per-instance overlay over the definition's instanced parameters.
/// `None` falls through to the definition value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InstanceOverrides {
    pub tint: Option<Vec4>,
    pub opacity: Option<f32>,
    pub strength: Option<f32>,
}

impl InstanceOverrides {
    pub fn is_empty(&self) -> bool {
        self.tint.is_none() && self.opacity.is_none() && self.strength.is_none()
    }

    pub fn apply(&self, target: &mut dyn ShadingTarget) {
        if let Some(tint) = self.tint {
            target.set_color(params::TINT, tint);
        }
        if let Some(opacity) = self.opacity {
            target.set_float(params::OPACITY, opacity);
        }
        if let Some(strength) = self.strength {
            target.set_float(params::STRENGTH, strength);
        }
    }
}

/// Everything needed to (re)initialize an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionTemplate {
    pub definition: Option<DefinitionId>,
    pub transform: Transform,
    pub tiling: Vec2,
    pub offset: Vec2,
    pub mask_layers: Option<MaskLayers>,
    pub overrides: InstanceOverrides,
}

impl Default for ProjectionTemplate {
    fn default() -> Self {
        Self {
            definition: None,
            transform: Transform::IDENTITY,
            tiling: Vec2::ONE,
            offset: Vec2::ZERO,
            mask_layers: None,
            overrides: InstanceOverrides::default(),
        }
    }
}

impl ProjectionTemplate {
    pub fn new(definition: DefinitionId) -> Self {
        Self {
            definition: Some(definition),
            ..Self::default()
        }
    }

    pub fn at(mut self, translation: Vec3) -> Self {
        self.transform.translation = translation;
        self
    }
}

/// A projection attached to one scene node
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionInstance {
    id: InstanceId,
    pub definition: Option<DefinitionId>,
    pub transform: Transform,
    pub tiling: Vec2,
    pub offset: Vec2,
    /// Masking layers to project onto; `None` projects onto all
    pub mask_layers: Option<MaskLayers>,
    pub overrides: InstanceOverrides,
    active: bool,
    behaviors: SmallVec<[BehaviorHandle; 2]>,
}

impl ProjectionInstance {
    pub fn new(id: InstanceId, template: &ProjectionTemplate) -> Self {
        let mut instance = Self {
            id,
            definition: None,
            transform: Transform::IDENTITY,
            tiling: Vec2::ONE,
            offset: Vec2::ZERO,
            mask_layers: None,
            overrides: InstanceOverrides::default(),
            active: false,
            behaviors: SmallVec::new(),
        };
        instance.reinitialize(template);
        instance
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Overwrite all template-driven state. Attached behaviours are kept.
    pub fn reinitialize(&mut self, template: &ProjectionTemplate) {
        self.definition = template.definition;
        self.transform = template.transform;
        self.tiling = template.tiling;
        self.offset = template.offset;
        self.mask_layers = template.mask_layers;
        self.overrides = template.overrides;
    }

    pub fn attach_behavior(&mut self, behavior: BehaviorHandle) {
        if !self.behaviors.contains(&behavior) {
            self.behaviors.push(behavior);
        }
    }

    pub fn behaviors(&self) -> &[BehaviorHandle] {
        &self.behaviors
    }

    /// Remove and return every attached behaviour.
    pub fn strip_behaviors(&mut self) -> Vec<BehaviorHandle> {
        self.behaviors.drain(..).collect()
    }

    /// Apply the definition's shared values, then this instance's instanced
    /// parameters and overlay (overlay wins).
    pub fn apply(&self, definition: &ProjectionDefinition, target: &mut dyn ShadingTarget) {
        definition.apply(target);
        self.apply_instanced(target);
    }

    /// Instanced parameters and overlay only, for merging over a shared
    /// material at draw time.
    pub fn apply_instanced(&self, target: &mut dyn ShadingTarget) {
        target.set_vector(
            params::TILING_OFFSET,
            Vec4::new(self.tiling.x, self.tiling.y, self.offset.x, self.offset.y),
        );
        target.set_vector(
            params::PROJECTION_MASK,
            self.mask_layers.unwrap_or(MaskLayers::ALL).as_vector(),
        );
        self.overrides.apply(target);
    }
}

/// Owner of all live instances
#[derive(Debug, Default)]
pub struct InstanceArena {
    instances: HashMap<InstanceId, ProjectionInstance>,
    next_id: u32,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, template: &ProjectionTemplate) -> InstanceId {
        self.next_id += 1;
        let id = InstanceId(self.next_id);
        self.instances.insert(id, ProjectionInstance::new(id, template));
        id
    }

    pub fn get(&self, id: InstanceId) -> Option<&ProjectionInstance> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut ProjectionInstance> {
        self.instances.get_mut(&id)
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<ProjectionInstance> {
        self.instances.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
