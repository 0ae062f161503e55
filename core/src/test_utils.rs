//! Shared test utilities for unit tests

use decalforge_shared::{CameraId, LayerMask};
use glam::{Mat4, Vec3};
use hashbrown::HashMap;

use crate::backend::{
    BackendError, Composite, GpuBackend, ReplacementCommand, ReplacementDraw, ShadingInputs,
    TargetDesc, TargetHandle,
};
use crate::camera::{
    DepthCapture, Eye, EyeView, RenderingPath, SceneCamera, StereoMode, ViewParams,
};

// ============================================================================
// Recording Backend
// ============================================================================

/// Backend that records everything instead of touching a GPU
#[derive(Debug, Default)]
pub struct RecordingBackend {
    next_handle: u32,
    /// Every allocation, in order
    pub allocations: Vec<(TargetHandle, TargetDesc)>,
    pub live: HashMap<TargetHandle, TargetDesc>,
    /// Release calls per handle, including unknown ones
    pub releases: HashMap<TargetHandle, u32>,
    pub commands: Vec<ReplacementCommand>,
    pub published: HashMap<CameraId, ShadingInputs>,
    /// Allocations for this camera fail
    pub fail_camera: Option<CameraId>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release_count(&self, handle: TargetHandle) -> u32 {
        self.releases.get(&handle).copied().unwrap_or(0)
    }

    pub fn live_for(&self, camera: CameraId) -> Vec<TargetDesc> {
        self.live
            .values()
            .filter(|d| d.camera == camera)
            .copied()
            .collect()
    }

    pub fn draws(&self) -> Vec<&ReplacementDraw> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                ReplacementCommand::Draw(d) => Some(d),
                ReplacementCommand::Composite(_) => None,
            })
            .collect()
    }

    pub fn composites(&self) -> Vec<&Composite> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                ReplacementCommand::Composite(c) => Some(c),
                ReplacementCommand::Draw(_) => None,
            })
            .collect()
    }
}

impl GpuBackend for RecordingBackend {
    fn allocate_target(&mut self, desc: &TargetDesc) -> Result<TargetHandle, BackendError> {
        if self.fail_camera == Some(desc.camera) {
            return Err(BackendError::Device("injected failure".into()));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(BackendError::InvalidSize {
                width: desc.width,
                height: desc.height,
            });
        }
        self.next_handle += 1;
        let handle = TargetHandle(self.next_handle);
        self.allocations.push((handle, *desc));
        self.live.insert(handle, *desc);
        Ok(handle)
    }

    fn release_target(&mut self, handle: TargetHandle) {
        *self.releases.entry(handle).or_insert(0) += 1;
        self.live.remove(&handle);
    }

    fn draw_replacement(&mut self, draw: ReplacementDraw) -> Result<(), BackendError> {
        for handle in &draw.targets {
            if !self.live.contains_key(handle) {
                return Err(BackendError::UnknownTarget(*handle));
            }
        }
        self.commands.push(ReplacementCommand::Draw(draw));
        Ok(())
    }

    fn composite(&mut self, composite: Composite) -> Result<(), BackendError> {
        self.commands.push(ReplacementCommand::Composite(composite));
        Ok(())
    }

    fn publish(&mut self, camera: CameraId, inputs: &ShadingInputs) {
        self.published.insert(camera, *inputs);
    }

    fn unpublish(&mut self, camera: CameraId) {
        self.published.remove(&camera);
    }
}

// ============================================================================
// Test Camera
// ============================================================================

/// Scriptable camera; tests flip fields between frames
#[derive(Debug, Clone)]
pub struct TestCamera {
    pub id: CameraId,
    pub alive: bool,
    pub size: (u32, u32),
    pub eye_size: (u32, u32),
    pub path: RenderingPath,
    pub stereo: StereoMode,
    pub max_targets: u32,
    pub capture: DepthCapture,
    /// Number of times the capture flags were written
    pub capture_writes: u32,
    pub blocked: bool,
    pub position: Vec3,
    pub culling: LayerMask,
}

impl TestCamera {
    pub fn new(id: u64) -> Self {
        Self {
            id: CameraId(id),
            alive: true,
            size: (1280, 720),
            eye_size: (640, 720),
            path: RenderingPath::Forward,
            stereo: StereoMode::Off,
            max_targets: 8,
            capture: DepthCapture::empty(),
            capture_writes: 0,
            blocked: false,
            position: Vec3::ZERO,
            culling: LayerMask::ALL,
        }
    }
}

impl SceneCamera for TestCamera {
    fn id(&self) -> CameraId {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn pixel_size(&self) -> (u32, u32) {
        self.size
    }

    fn eye_size(&self) -> (u32, u32) {
        self.eye_size
    }

    fn rendering_path(&self) -> RenderingPath {
        self.path
    }

    fn stereo_mode(&self) -> StereoMode {
        self.stereo
    }

    fn max_render_targets(&self) -> u32 {
        self.max_targets
    }

    fn depth_capture(&self) -> DepthCapture {
        self.capture
    }

    fn set_depth_capture(&mut self, capture: DepthCapture) {
        self.capture = capture;
        self.capture_writes += 1;
    }

    fn has_blocking_marker(&self) -> bool {
        self.blocked
    }

    fn view(&self) -> ViewParams {
        ViewParams {
            view: Mat4::from_translation(-self.position),
            projection: Mat4::IDENTITY,
            position: self.position,
        }
    }

    fn culling_mask(&self) -> LayerMask {
        self.culling
    }

    fn eye_view(&self, eye: Eye) -> EyeView {
        let offset = match eye {
            Eye::Left => Vec3::new(-0.032, 0.0, 0.0),
            Eye::Right => Vec3::new(0.032, 0.0, 0.0),
        };
        EyeView {
            view: Mat4::from_translation(-(self.position + offset)),
            projection: Mat4::IDENTITY,
            offset,
        }
    }
}
