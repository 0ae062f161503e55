//! Per-camera render state
//!
//! Tracks the replacement mode a camera currently runs, the targets allocated
//! for it, and the camera's original depth-capture flags so they can be put
//! back verbatim.
//!
//! Targets are only reallocated when the layout (mode or depth-pass need),
//! the resolution, or the initialization state changes.

use decalforge_shared::{CameraId, ReplacementOverride};

use super::mode::{ModeInputs, ReplacementMode, TargetLayout, select_mode};
use super::{DepthCapture, RenderingPath, SceneCamera, StereoMode};
use crate::backend::{
    BackendError, GpuBackend, ShadingInputs, TargetDesc, TargetHandle, TargetKind, TargetRole,
};

/// Macro state of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPhase {
    Uninitialized,
    Initialized,
    Terminated,
}

/// Result of a per-frame evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Ready to run replacement passes in `mode`
    Ready {
        mode: ReplacementMode,
        reallocated: bool,
    },
    /// Camera carries the blocking marker
    Blocked,
    /// Camera renders with a path the pipeline cannot reconstruct
    UnsupportedPath(RenderingPath),
    /// Camera currently has no pixels (e.g. a minimized window)
    ZeroSize,
    /// State was terminated and will not run again
    Terminated,
}

/// Per-camera failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderStateError {
    #[error("failed to allocate {kind:?} target for camera {camera:?}: {source}")]
    Allocation {
        camera: CameraId,
        kind: TargetKind,
        #[source]
        source: BackendError,
    },
}

/// One optional handle per target kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TargetSet {
    pub depth: Option<TargetHandle>,
    pub normal: Option<TargetHandle>,
    pub mask: Option<TargetHandle>,
    pub packed: Option<TargetHandle>,
}

impl TargetSet {
    pub fn get(&self, kind: TargetKind) -> Option<TargetHandle> {
        match kind {
            TargetKind::Depth => self.depth,
            TargetKind::Normal => self.normal,
            TargetKind::Mask => self.mask,
            TargetKind::Packed => self.packed,
        }
    }

    fn slot_mut(&mut self, kind: TargetKind) -> &mut Option<TargetHandle> {
        match kind {
            TargetKind::Depth => &mut self.depth,
            TargetKind::Normal => &mut self.normal,
            TargetKind::Mask => &mut self.mask,
            TargetKind::Packed => &mut self.packed,
        }
    }

    pub fn is_empty(&self) -> bool {
        TargetKind::ALL.iter().all(|&k| self.get(k).is_none())
    }

    /// Allocated handles with their kinds
    pub fn iter(&self) -> impl Iterator<Item = (TargetKind, TargetHandle)> + '_ {
        TargetKind::ALL
            .into_iter()
            .filter_map(|k| self.get(k).map(|h| (k, h)))
    }

    /// Release every handle exactly once.
    fn release_all(&mut self, backend: &mut dyn GpuBackend) {
        for kind in TargetKind::ALL {
            if let Some(handle) = self.slot_mut(kind).take() {
                backend.release_target(handle);
            }
        }
    }
}

/// Allocate every target of `layout` into `set`. On failure the targets
/// allocated so far stay in `set` for the caller to release.
fn allocate_into(
    set: &mut TargetSet,
    backend: &mut dyn GpuBackend,
    camera: CameraId,
    layout: &TargetLayout,
    role: TargetRole,
    (width, height): (u32, u32),
) -> Result<(), RenderStateError> {
    for kind in layout_kinds(layout) {
        let desc = TargetDesc {
            camera,
            kind,
            role,
            width,
            height,
        };
        let handle = backend
            .allocate_target(&desc)
            .map_err(|source| RenderStateError::Allocation {
                camera,
                kind,
                source,
            })?;
        *set.slot_mut(kind) = Some(handle);
    }
    Ok(())
}

fn layout_kinds(layout: &TargetLayout) -> impl Iterator<Item = TargetKind> {
    let wanted = [layout.depth, layout.normal, layout.mask, layout.packed];
    TargetKind::ALL
        .into_iter()
        .zip(wanted)
        .filter_map(|(kind, on)| on.then_some(kind))
}

/// Replacement rendering state of one camera
#[derive(Debug)]
pub struct CameraRenderState {
    camera: CameraId,
    phase: RenderPhase,
    layout: Option<TargetLayout>,
    targets: TargetSet,
    /// Eye-sized scratch targets, single-pass stereo only
    eye_targets: Option<TargetSet>,
    resolution: (u32, u32),
    eye_resolution: Option<(u32, u32)>,
    /// Camera flags before the first change made here
    original_capture: Option<DepthCapture>,
}

impl CameraRenderState {
    pub fn new(camera: CameraId) -> Self {
        Self {
            camera,
            phase: RenderPhase::Uninitialized,
            layout: None,
            targets: TargetSet::default(),
            eye_targets: None,
            resolution: (0, 0),
            eye_resolution: None,
            original_capture: None,
        }
    }

    pub fn camera(&self) -> CameraId {
        self.camera
    }

    pub fn phase(&self) -> RenderPhase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == RenderPhase::Initialized
    }

    pub fn mode(&self) -> Option<ReplacementMode> {
        self.layout.map(|l| l.mode)
    }

    pub fn layout(&self) -> Option<&TargetLayout> {
        self.layout.as_ref()
    }

    pub fn targets(&self) -> &TargetSet {
        &self.targets
    }

    pub fn eye_targets(&self) -> Option<&TargetSet> {
        self.eye_targets.as_ref()
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    pub fn eye_resolution(&self) -> Option<(u32, u32)> {
        self.eye_resolution
    }

    pub fn original_capture(&self) -> Option<DepthCapture> {
        self.original_capture
    }

    /// Buffers and mode for decal materials, if initialized
    pub fn shading_inputs(&self) -> Option<ShadingInputs> {
        let layout = self.layout.filter(|_| self.is_initialized())?;
        Some(ShadingInputs {
            mode: layout.mode,
            depth: self.targets.depth,
            normal: self.targets.normal,
            mask: self.targets.mask,
            packed: self.targets.packed,
            native_capture: layout.native_capture,
            width: self.resolution.0,
            height: self.resolution.1,
        })
    }

    /// Re-evaluate the required mode and bring targets in line with it.
    ///
    /// Runs once per camera per frame before culling.
    pub fn evaluate(
        &mut self,
        camera: &mut dyn SceneCamera,
        replacement_override: ReplacementOverride,
        backend: &mut dyn GpuBackend,
    ) -> Result<Evaluation, RenderStateError> {
        if self.phase == RenderPhase::Terminated {
            return Ok(Evaluation::Terminated);
        }

        if camera.has_blocking_marker() {
            if self.phase == RenderPhase::Initialized {
                tracing::debug!(camera = ?self.camera, "blocking marker added, tearing down");
                self.teardown(camera, backend);
            }
            return Ok(Evaluation::Blocked);
        }

        let path = camera.rendering_path();
        if !path.is_supported() {
            return Ok(Evaluation::UnsupportedPath(path));
        }

        let stereo = camera.stereo_mode();
        let mode = select_mode(&ModeInputs {
            replacement_override,
            stereo: stereo.is_active(),
            path,
            max_render_targets: camera.max_render_targets(),
        });
        let layout = TargetLayout::new(mode, path);

        let (resolution, eye_resolution) = match stereo {
            StereoMode::SinglePass => {
                let (w, h) = camera.eye_size();
                ((w * 2, h), Some((w, h)))
            }
            StereoMode::MultiPass => (camera.eye_size(), None),
            StereoMode::Off => (camera.pixel_size(), None),
        };
        if resolution.0 == 0 || resolution.1 == 0 {
            return Ok(Evaluation::ZeroSize);
        }

        let layout_changed = self.layout != Some(layout);
        let resized = self.resolution != resolution || self.eye_resolution != eye_resolution;
        let first = self.phase == RenderPhase::Uninitialized;

        if !(layout_changed || resized || first) {
            return Ok(Evaluation::Ready {
                mode,
                reallocated: false,
            });
        }

        if layout_changed && !first {
            tracing::debug!(
                camera = ?self.camera,
                from = ?self.layout.map(|l| l.mode),
                to = ?mode,
                "replacement mode changed"
            );
        }

        self.release_targets(backend);
        if layout_changed || first {
            self.configure_capture(camera, &layout);
        }
        self.layout = Some(layout);
        self.resolution = resolution;
        self.eye_resolution = eye_resolution;

        if let Err(e) = self.allocate(backend) {
            self.release_targets(backend);
            self.restore_capture(camera);
            self.layout = None;
            self.phase = RenderPhase::Terminated;
            return Err(e);
        }

        self.phase = RenderPhase::Initialized;
        tracing::debug!(
            camera = ?self.camera,
            ?mode,
            width = resolution.0,
            height = resolution.1,
            "replacement targets allocated"
        );
        Ok(Evaluation::Ready {
            mode,
            reallocated: true,
        })
    }

    /// Restore the camera's original flags, release every target and stop.
    ///
    /// The camera may already be destroyed; its flags are only touched if
    /// it is still alive.
    pub fn terminate(
        &mut self,
        camera: Option<&mut dyn SceneCamera>,
        backend: &mut dyn GpuBackend,
    ) {
        if self.phase == RenderPhase::Terminated {
            return;
        }
        match camera {
            Some(camera) => self.restore_capture(camera),
            None => self.original_capture = None,
        }
        self.release_targets(backend);
        backend.unpublish(self.camera);
        self.layout = None;
        self.phase = RenderPhase::Terminated;
        tracing::debug!(camera = ?self.camera, "camera render state terminated");
    }

    /// Back to uninitialized (blocking marker added later).
    fn teardown(&mut self, camera: &mut dyn SceneCamera, backend: &mut dyn GpuBackend) {
        self.restore_capture(camera);
        self.release_targets(backend);
        backend.unpublish(self.camera);
        self.layout = None;
        self.resolution = (0, 0);
        self.eye_resolution = None;
        self.phase = RenderPhase::Uninitialized;
    }

    fn release_targets(&mut self, backend: &mut dyn GpuBackend) {
        self.targets.release_all(backend);
        if let Some(mut eye) = self.eye_targets.take() {
            eye.release_all(backend);
        }
    }

    fn allocate(&mut self, backend: &mut dyn GpuBackend) -> Result<(), RenderStateError> {
        let Some(layout) = self.layout else {
            return Ok(());
        };
        allocate_into(
            &mut self.targets,
            backend,
            self.camera,
            &layout,
            TargetRole::Combined,
            self.resolution,
        )?;
        if let Some(size) = self.eye_resolution {
            let eye = self.eye_targets.insert(TargetSet::default());
            allocate_into(eye, backend, self.camera, &layout, TargetRole::EyeScratch, size)?;
        }
        Ok(())
    }

    /// Set the camera's capture flags to its original flags plus what the
    /// layout needs, remembering the original on first change.
    fn configure_capture(&mut self, camera: &mut dyn SceneCamera, layout: &TargetLayout) {
        let current = camera.depth_capture();
        let base = self.original_capture.unwrap_or(current);
        let desired = base | layout.native_capture;
        if desired != current {
            if self.original_capture.is_none() {
                self.original_capture = Some(current);
            }
            camera.set_depth_capture(desired);
        }
    }

    fn restore_capture(&mut self, camera: &mut dyn SceneCamera) {
        if let Some(original) = self.original_capture.take() {
            if camera.is_alive() {
                camera.set_depth_capture(original);
            }
        }
    }
}
