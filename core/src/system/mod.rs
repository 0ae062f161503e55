//! Decal system context
//!
//! [`DecalSystem`] owns every piece of process-wide state: settings,
//! definitions, instances, the registry, the pools, per-camera render states
//! and the mask-pass plan. The host creates one and drives it from its frame
//! callbacks:
//!
//! 1. [`begin_frame`](DecalSystem::begin_frame) once, after the frame's
//!    registration changes and before any camera renders.
//! 2. Per camera, [`before_cull`](DecalSystem::before_cull) then
//!    [`before_render`](DecalSystem::before_render), or both at once with
//!    [`render_camera`](DecalSystem::render_camera).
//!
//! Everything runs on the render thread; nothing here blocks.

#[cfg(test)]
mod tests;

use decalforge_shared::{
    CameraId, ConfigError, DefinitionId, InstanceId, MaskMethod, MaskingLayerConfig, PoolId,
    ProjectorConfig, ReplacementOverride, SlotId,
};
use glam::Vec3;
use hashbrown::HashMap;

use crate::backend::GpuBackend;
use crate::camera::{CameraRenderState, Evaluation, RenderingPath, SceneCamera};
use crate::definition::{DefinitionStore, ProjectionDefinition, ProjectionKind, ProjectionShader};
use crate::instance::{InstanceArena, ProjectionInstance, ProjectionTemplate};
use crate::pipeline::{self, Execution, MaskPassPlan};
use crate::pool::{InstancePool, PoolRequest, PoolSet, ReturnedSlot, SlotReuse};
use crate::registry::{ProjectionRegistry, RegistryUpdate};
use crate::stats::FrameStats;

/// One instance to draw with a camera, in draw order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawItem {
    pub instance: InstanceId,
    pub definition: DefinitionId,
    pub shader: ProjectionShader,
    pub order: u32,
    /// Drawn in one instanced batch with the rest of its group
    pub instanced: bool,
}

#[derive(Debug)]
struct TrackedCamera {
    state: CameraRenderState,
    /// Frame in which the last evaluation came back ready
    ready_frame: Option<u64>,
    /// Work done by this camera's last replacement run
    stats: FrameStats,
}

/// Explicitly owned decal rendering context
#[derive(Debug)]
pub struct DecalSystem {
    config: ProjectorConfig,
    definitions: DefinitionStore,
    instances: InstanceArena,
    registry: ProjectionRegistry,
    pools: PoolSet,
    /// Pool slot owning each pooled instance
    pooled: HashMap<InstanceId, (PoolId, SlotId)>,
    cameras: HashMap<CameraId, TrackedCamera>,
    mask_plan: MaskPassPlan,
    frame: u64,
    stats: FrameStats,
}

impl DecalSystem {
    /// Create a system from a validated configuration at quality tier 0.
    pub fn new(config: ProjectorConfig) -> Result<Self, ConfigError> {
        Self::with_quality_tier(config, 0)
    }

    pub fn with_quality_tier(config: ProjectorConfig, tier: usize) -> Result<Self, ConfigError> {
        config.validate()?;
        let mask_plan = MaskPassPlan::build(config.mask_method, &config.masking_layers);
        let pools = PoolSet::new(&config.pools, tier);
        tracing::info!(
            pools = pools.len(),
            masking_layers = config.masking_layers.len(),
            sub_draws = mask_plan.sub_draws().len(),
            replacement_override = ?config.replacement_override,
            tier,
            "decal system created"
        );
        Ok(Self {
            config,
            definitions: DefinitionStore::new(),
            instances: InstanceArena::new(),
            registry: ProjectionRegistry::new(),
            pools,
            pooled: HashMap::new(),
            cameras: HashMap::new(),
            mask_plan,
            frame: 0,
            stats: FrameStats::default(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn quality_tier(&self) -> usize {
        self.pools.tier()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Counters for the current frame, summed over every camera
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn mask_plan(&self) -> &MaskPassPlan {
        &self.mask_plan
    }

    pub fn registry(&self) -> &ProjectionRegistry {
        &self.registry
    }

    pub fn definitions(&self) -> &DefinitionStore {
        &self.definitions
    }

    pub fn definition(&self, id: DefinitionId) -> Option<&ProjectionDefinition> {
        self.definitions.get(id)
    }

    /// Mutable access for property edits. Edits mark the definition dirty
    /// and are applied at the next [`begin_frame`](Self::begin_frame).
    ///
    /// Priority and instancing edits made here move the definition's group
    /// at the next frame; [`set_priority`](Self::set_priority) and
    /// [`set_instanced`](Self::set_instanced) move it immediately.
    pub fn definition_mut(&mut self, id: DefinitionId) -> Option<&mut ProjectionDefinition> {
        self.definitions.get_mut(id)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&ProjectionInstance> {
        self.instances.get(id)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut ProjectionInstance> {
        self.instances.get_mut(id)
    }

    pub fn pools(&self) -> &PoolSet {
        &self.pools
    }

    pub fn pool(&self, id: PoolId) -> Option<&InstancePool> {
        self.pools.get(id)
    }

    pub fn pool_id(&self, name: &str) -> Option<PoolId> {
        self.pools.id_of(name)
    }

    pub fn camera_state(&self, camera: CameraId) -> Option<&CameraRenderState> {
        self.cameras.get(&camera).map(|t| &t.state)
    }

    /// Work done by a camera's last replacement run
    pub fn camera_stats(&self, camera: CameraId) -> Option<&FrameStats> {
        self.cameras.get(&camera).map(|t| &t.stats)
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    pub fn create_definition(
        &mut self,
        name: impl Into<String>,
        kind: ProjectionKind,
    ) -> DefinitionId {
        self.definitions.create(name, kind)
    }

    /// Destroy a definition. Its instances stay alive without a definition
    /// and are returned.
    pub fn remove_definition(&mut self, id: DefinitionId) -> Vec<InstanceId> {
        if self.definitions.remove(id).is_none() {
            return Vec::new();
        }
        let orphans = self.registry.remove_definition(id);
        for &instance in &orphans {
            if let Some(instance) = self.instances.get_mut(instance) {
                instance.definition = None;
            }
        }
        orphans
    }

    /// Change a definition's priority and move its group.
    pub fn set_priority(&mut self, id: DefinitionId, priority: i32) -> bool {
        let changed = self
            .definitions
            .get_mut(id)
            .is_some_and(|d| d.set_priority(priority));
        if changed {
            self.registry.reorder(id, &self.definitions);
        }
        changed
    }

    /// Change whether a definition's group draws as one instanced batch.
    pub fn set_instanced(&mut self, id: DefinitionId, instanced: bool) -> bool {
        let changed = self
            .definitions
            .get_mut(id)
            .is_some_and(|d| d.set_instanced(instanced));
        if changed {
            self.registry.reorder(id, &self.definitions);
        }
        changed
    }

    // ========================================================================
    // Scene-driven instances
    // ========================================================================

    /// Create an inactive instance for a scene node.
    pub fn spawn(&mut self, template: &ProjectionTemplate) -> InstanceId {
        self.instances.spawn(template)
    }

    /// Scene node enabled: activate and register.
    ///
    /// Returns false if the instance is unknown or cannot be registered.
    pub fn activate(&mut self, id: InstanceId) -> bool {
        let Some(instance) = self.instances.get_mut(id) else {
            return false;
        };
        instance.set_active(true);
        self.registry.register(instance, &self.definitions)
    }

    /// Scene node disabled: deactivate and deregister.
    pub fn deactivate(&mut self, id: InstanceId) -> bool {
        let Some(instance) = self.instances.get_mut(id) else {
            return false;
        };
        instance.set_active(false);
        self.registry.deregister(id);
        true
    }

    /// Register an instance again after changing its definition.
    pub fn refresh(&mut self, id: InstanceId) -> bool {
        match self.instances.get(id) {
            Some(instance) if instance.is_active() => {
                self.registry.register(instance, &self.definitions)
            }
            _ => false,
        }
    }

    /// Scene node destroyed. Pooled instances belong to their pool and are
    /// not removed.
    pub fn despawn(&mut self, id: InstanceId) -> Option<ProjectionInstance> {
        if self.pooled.contains_key(&id) {
            return None;
        }
        self.registry.deregister(id);
        self.instances.remove(id)
    }

    // ========================================================================
    // Pools
    // ========================================================================

    /// Take an instance from a pool and register it.
    pub fn request(
        &mut self,
        pool: PoolId,
        template: Option<&ProjectionTemplate>,
    ) -> Option<PoolRequest> {
        let request = self
            .pools
            .get_mut(pool)?
            .request(template, &mut self.instances)?;
        if request.reuse == SlotReuse::Evicted {
            self.registry.deregister(request.instance);
        }
        self.pooled.insert(request.instance, (request.pool, request.slot));
        if let Some(instance) = self.instances.get(request.instance) {
            self.registry.register(instance, &self.definitions);
        }
        Some(request)
    }

    /// [`request`](Self::request) by pool name. Unknown names yield `None`.
    pub fn request_from(
        &mut self,
        pool: &str,
        template: Option<&ProjectionTemplate>,
    ) -> Option<PoolRequest> {
        let id = self.pools.id_of(pool)?;
        self.request(id, template)
    }

    /// Give a slot back to its pool and deregister its instance.
    pub fn return_slot(&mut self, pool: PoolId, slot: SlotId) -> Option<ReturnedSlot> {
        let returned = self
            .pools
            .get_mut(pool)?
            .return_slot(slot, &mut self.instances)?;
        self.registry.deregister(returned.instance);
        Some(returned)
    }

    /// Return the pool slot owning `instance`.
    pub fn return_instance(&mut self, instance: InstanceId) -> Option<ReturnedSlot> {
        let &(pool, slot) = self.pooled.get(&instance)?;
        self.return_slot(pool, slot)
    }

    pub fn check_intersecting(&self, pool: PoolId, point: Vec3, threshold: f32) -> bool {
        self.pools
            .get(pool)
            .is_some_and(|p| p.check_intersecting(point, threshold, &self.instances))
    }

    /// Switch quality tier; pools over their new capacity are trimmed
    /// oldest-first and the trimmed instances deregistered.
    pub fn set_quality_tier(&mut self, tier: usize) -> Vec<(PoolId, ReturnedSlot)> {
        let trimmed = self.pools.set_quality_tier(tier, &mut self.instances);
        for (_, returned) in &trimmed {
            self.registry.deregister(returned.instance);
        }
        tracing::debug!(tier, trimmed = trimmed.len(), "quality tier changed");
        trimmed
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Replace the masking layers and rebuild the mask-pass plan.
    pub fn set_masking(&mut self, layers: Vec<MaskingLayerConfig>) -> Result<(), ConfigError> {
        let previous = std::mem::replace(&mut self.config.masking_layers, layers);
        if let Err(e) = self.config.validate() {
            self.config.masking_layers = previous;
            return Err(e);
        }
        self.rebuild_mask_plan();
        Ok(())
    }

    pub fn set_mask_method(&mut self, method: MaskMethod) {
        if self.config.mask_method != method {
            self.config.mask_method = method;
            self.rebuild_mask_plan();
        }
    }

    /// Takes effect at each camera's next evaluation.
    pub fn set_replacement_override(&mut self, replacement_override: ReplacementOverride) {
        self.config.replacement_override = replacement_override;
    }

    fn rebuild_mask_plan(&mut self) {
        self.mask_plan = MaskPassPlan::build(self.config.mask_method, &self.config.masking_layers);
        tracing::debug!(
            method = ?self.config.mask_method,
            sub_draws = self.mask_plan.sub_draws().len(),
            "mask pass plan rebuilt"
        );
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Once per frame before any camera: apply dirty definitions and fix the
    /// draw order every camera will see this frame.
    pub fn begin_frame(&mut self) -> RegistryUpdate {
        self.frame += 1;
        self.stats = FrameStats::default();
        self.registry.update(&mut self.definitions)
    }

    /// Instances to draw for a camera on `path`, in draw order. Definitions
    /// that do not support the path are left out.
    pub fn draw_items(&self, path: RenderingPath) -> Vec<DrawItem> {
        let mut items = Vec::new();
        for group in self.registry.groups() {
            let Some(shader) = self
                .definitions
                .get(group.definition())
                .and_then(|d| d.shader(path))
            else {
                continue;
            };
            for &instance in group.instances() {
                let Some(order) = self.registry.draw_order(instance) else {
                    continue;
                };
                items.push(DrawItem {
                    instance,
                    definition: group.definition(),
                    shader,
                    order,
                    instanced: group.is_instanced(),
                });
            }
        }
        items
    }

    /// Per-camera hook before culling: discover the camera and bring its
    /// render state in line with its current capabilities.
    pub fn before_cull(
        &mut self,
        camera: &mut dyn SceneCamera,
        backend: &mut dyn GpuBackend,
    ) -> Evaluation {
        let id = camera.id();
        let frame = self.frame;
        let tracked = self.cameras.entry(id).or_insert_with(|| {
            tracing::debug!(camera = ?id, "camera discovered");
            TrackedCamera {
                state: CameraRenderState::new(id),
                ready_frame: None,
                stats: FrameStats::default(),
            }
        });

        match tracked
            .state
            .evaluate(camera, self.config.replacement_override, backend)
        {
            Ok(evaluation) => {
                match evaluation {
                    Evaluation::Ready { reallocated, .. } => {
                        tracked.ready_frame = Some(frame);
                        if reallocated {
                            self.stats.reallocations += 1;
                        }
                    }
                    Evaluation::UnsupportedPath(path) => {
                        tracing::warn!(
                            camera = ?id,
                            ?path,
                            "rendering path not supported, skipping replacement this frame"
                        );
                        backend.unpublish(id);
                    }
                    Evaluation::ZeroSize => {
                        tracing::debug!(camera = ?id, "camera has no pixels, skipping this frame");
                        backend.unpublish(id);
                    }
                    Evaluation::Blocked | Evaluation::Terminated => {}
                }
                evaluation
            }
            Err(e) => {
                tracing::warn!(camera = ?id, error = %e, "camera render state terminated");
                Evaluation::Terminated
            }
        }
    }

    /// Per-camera hook before the main render: record replacement passes and
    /// publish the buffers. Returns true if shading inputs were published.
    pub fn before_render(
        &mut self,
        camera: &dyn SceneCamera,
        backend: &mut dyn GpuBackend,
    ) -> bool {
        let id = camera.id();
        let Some(tracked) = self.cameras.get(&id) else {
            self.stats.cameras_skipped += 1;
            return false;
        };
        if tracked.ready_frame != Some(self.frame) {
            self.stats.cameras_skipped += 1;
            return false;
        }

        let mut camera_stats = FrameStats::default();
        let result =
            pipeline::execute(&tracked.state, camera, &self.mask_plan, backend, &mut camera_stats);
        let published = match result {
            Ok(Execution::Published) => {
                camera_stats.cameras_rendered = 1;
                true
            }
            Ok(Execution::NotReady) => {
                camera_stats.cameras_skipped = 1;
                false
            }
            Err(e) => {
                tracing::warn!(camera = ?id, error = %e, "replacement passes failed");
                backend.unpublish(id);
                camera_stats.cameras_skipped = 1;
                false
            }
        };

        self.stats.merge(&camera_stats);
        if let Some(tracked) = self.cameras.get_mut(&id) {
            tracked.stats = camera_stats;
        }
        published
    }

    /// Both per-camera hooks back to back.
    pub fn render_camera(
        &mut self,
        camera: &mut dyn SceneCamera,
        backend: &mut dyn GpuBackend,
    ) -> bool {
        self.before_cull(camera, backend);
        self.before_render(camera, backend)
    }

    /// The camera is being removed: restore its flags, release its buffers
    /// and stop tracking it.
    pub fn terminate_camera(
        &mut self,
        camera: &mut dyn SceneCamera,
        backend: &mut dyn GpuBackend,
    ) {
        if let Some(mut tracked) = self.cameras.remove(&camera.id()) {
            tracked.state.terminate(Some(camera), backend);
        }
    }

    /// The camera was already destroyed by the host.
    pub fn forget_camera(&mut self, camera: CameraId, backend: &mut dyn GpuBackend) {
        if let Some(mut tracked) = self.cameras.remove(&camera) {
            tracked.state.terminate(None, backend);
        }
    }

    /// Terminate every camera. Cameras in `alive` get their flags restored;
    /// the rest are treated as destroyed.
    pub fn shutdown(&mut self, alive: &mut [&mut dyn SceneCamera], backend: &mut dyn GpuBackend) {
        for camera in alive.iter_mut() {
            self.terminate_camera(&mut **camera, backend);
        }
        for (_, mut tracked) in self.cameras.drain() {
            tracked.state.terminate(None, backend);
        }
        tracing::info!(frames = self.frame, "decal system shut down");
    }
}
