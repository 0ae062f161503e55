//! Cameras as seen by the replacement renderer.
//!
//! The host implements [`SceneCamera`] for each camera it renders. The core
//! only queries capabilities and toggles the native depth-capture flag; it
//! never owns the camera.

mod mode;
mod state;

#[cfg(test)]
mod tests;

use bitflags::bitflags;
use decalforge_shared::{CameraId, LayerMask};
use glam::{Mat4, Vec3};

pub use mode::{ModeInputs, ReplacementMode, TargetLayout, select_mode};
pub use state::{CameraRenderState, Evaluation, RenderPhase, RenderStateError, TargetSet};

/// Lighting path the camera renders the main scene with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderingPath {
    Forward,
    Deferred,
    /// Old light-prepass deferred; not supported
    LegacyDeferred,
    /// Per-vertex lighting; not supported
    VertexLit,
}

impl RenderingPath {
    pub fn is_supported(self) -> bool {
        matches!(self, RenderingPath::Forward | RenderingPath::Deferred)
    }
}

/// Stereo rendering state of a camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StereoMode {
    #[default]
    Off,
    /// Each eye is a separate camera render at per-eye resolution
    MultiPass,
    /// Both eyes share one double-width target
    SinglePass,
}

impl StereoMode {
    pub fn is_active(self) -> bool {
        self != StereoMode::Off
    }
}

bitflags! {
    /// The camera's built-in depth/normal capture flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DepthCapture: u8 {
        const DEPTH = 1 << 0;
        const NORMALS = 1 << 1;
        const DEPTH_NORMALS = Self::DEPTH.bits() | Self::NORMALS.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub const BOTH: [Eye; 2] = [Eye::Left, Eye::Right];

    pub fn index(self) -> u32 {
        match self {
            Eye::Left => 0,
            Eye::Right => 1,
        }
    }
}

/// View a replacement draw is rendered from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space position of the eye
    pub position: Vec3,
}

impl Default for ViewParams {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// Per-eye matrices under stereo rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeView {
    pub view: Mat4,
    pub projection: Mat4,
    /// World-space interocular offset from the camera position
    pub offset: Vec3,
}

/// Host camera capabilities and controls
pub trait SceneCamera {
    fn id(&self) -> CameraId;

    /// False once the host has destroyed the camera
    fn is_alive(&self) -> bool;

    /// Output size in pixels
    fn pixel_size(&self) -> (u32, u32);

    /// Per-eye size in pixels under stereo rendering
    fn eye_size(&self) -> (u32, u32) {
        self.pixel_size()
    }

    fn rendering_path(&self) -> RenderingPath;

    fn stereo_mode(&self) -> StereoMode;

    /// Maximum simultaneously bound render targets the hardware supports
    fn max_render_targets(&self) -> u32;

    fn depth_capture(&self) -> DepthCapture;

    fn set_depth_capture(&mut self, capture: DepthCapture);

    /// Cameras carrying the blocking marker never run replacement passes
    fn has_blocking_marker(&self) -> bool;

    fn view(&self) -> ViewParams;

    fn culling_mask(&self) -> LayerMask;

    fn eye_view(&self, eye: Eye) -> EyeView;
}
