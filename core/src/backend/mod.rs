//! GPU backend seam
//!
//! The core never talks to a graphics API directly. Everything it needs from
//! the GPU goes through [`GpuBackend`]: allocate and release off-screen
//! targets, record replacement draws and eye composites, and publish the
//! resulting buffers as shading inputs.
//!
//! [`WgpuBackend`] implements it on top of `wgpu`.

mod wgpu_backend;

use decalforge_shared::{CameraId, LayerMask};
use glam::Vec4;
use smallvec::SmallVec;

use crate::camera::{DepthCapture, ReplacementMode, ViewParams};
use crate::definition::{ShadingTarget, params};
use crate::pipeline::SurfaceFilter;

pub use wgpu_backend::{ShadingBindings, WgpuBackend};

/// Handle to an off-screen render target owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetHandle(pub u32);

/// What a target stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Depth,
    Normal,
    Mask,
    /// Depth, normal and mask packed together
    Packed,
}

impl TargetKind {
    pub const ALL: [TargetKind; 4] = [
        TargetKind::Depth,
        TargetKind::Normal,
        TargetKind::Mask,
        TargetKind::Packed,
    ];

    pub fn format(self) -> TargetFormat {
        match self {
            TargetKind::Depth => TargetFormat::R32Float,
            TargetKind::Normal => TargetFormat::Rgba16Float,
            TargetKind::Mask => TargetFormat::Rgba8Unorm,
            TargetKind::Packed => TargetFormat::Rgba32Float,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Depth => "Decal Depth",
            TargetKind::Normal => "Decal Normal",
            TargetKind::Mask => "Decal Mask",
            TargetKind::Packed => "Decal Packed",
        }
    }
}

/// Pixel format of a replacement target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    R32Float,
    Rgba16Float,
    Rgba8Unorm,
    Rgba32Float,
}

impl TargetFormat {
    pub fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TargetFormat::R32Float => wgpu::TextureFormat::R32Float,
            TargetFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
            TargetFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            TargetFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// Whether a target is sampled by decals or only used as eye scratch space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    Combined,
    EyeScratch,
}

/// Allocation request for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetDesc {
    pub camera: CameraId,
    pub kind: TargetKind,
    pub role: TargetRole,
    pub width: u32,
    pub height: u32,
}

impl TargetDesc {
    pub fn format(&self) -> TargetFormat {
        self.kind.format()
    }
}

/// Substitute program used instead of each object's material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplacementShader {
    Depth,
    Normal,
    Mask,
    /// Normal and mask into two bound targets
    NormalMask,
    /// Depth, normal and mask into three bound targets
    DepthNormalMask,
    /// Everything into the packed target
    Packed,
}

/// One replacement render of the scene.
///
/// Bound `targets` are in the order the program writes them. Only the first
/// sub-draw of a logical pass has `clear` set; later ones accumulate.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementDraw {
    pub camera: CameraId,
    pub shader: ReplacementShader,
    pub targets: SmallVec<[TargetHandle; 3]>,
    pub clear: bool,
    pub view: ViewParams,
    /// Camera culling mask restricted to the sub-draw's layers
    pub culling_mask: LayerMask,
    /// Exact set of surfaces this sub-draw covers
    pub filter: SurfaceFilter,
    /// Mask-layer vector written by the program for these surfaces
    pub mask_layers: Vec4,
}

impl ReplacementDraw {
    /// Push the sub-draw's program inputs into `target`.
    pub fn apply_inputs(&self, target: &mut dyn ShadingTarget) {
        target.set_vector(params::MASK_LAYERS, self.mask_layers);
    }
}

/// Copy of an eye scratch target into its half of a combined target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Composite {
    pub source: TargetHandle,
    pub destination: TargetHandle,
    /// Destination x origin in pixels
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

/// Ordered replacement work, as recorded by a backend
#[derive(Debug, Clone, PartialEq)]
pub enum ReplacementCommand {
    Draw(ReplacementDraw),
    Composite(Composite),
}

/// Buffers and mode decal materials read during the camera's main render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadingInputs {
    pub mode: ReplacementMode,
    pub depth: Option<TargetHandle>,
    pub normal: Option<TargetHandle>,
    pub mask: Option<TargetHandle>,
    pub packed: Option<TargetHandle>,
    /// Built-in capture decals should fall back to where a buffer is absent
    pub native_capture: DepthCapture,
    pub width: u32,
    pub height: u32,
}

impl ShadingInputs {
    pub fn target(&self, kind: TargetKind) -> Option<TargetHandle> {
        match kind {
            TargetKind::Depth => self.depth,
            TargetKind::Normal => self.normal,
            TargetKind::Mask => self.mask,
            TargetKind::Packed => self.packed,
        }
    }

    /// Uniform form of the inputs
    pub fn globals(&self) -> ShadingGlobals {
        let flag = |b: bool| b as u32;
        ShadingGlobals {
            mode: self.mode.as_u32(),
            present: flag(self.depth.is_some())
                | flag(self.normal.is_some()) << 1
                | flag(self.mask.is_some()) << 2
                | flag(self.packed.is_some()) << 3,
            native_capture: self.native_capture.bits() as u32,
            _pad: 0,
            resolution: [self.width as f32, self.height as f32],
            inv_resolution: [
                1.0 / self.width.max(1) as f32,
                1.0 / self.height.max(1) as f32,
            ],
        }
    }
}

/// GPU layout of the published shading inputs (32 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadingGlobals {
    pub mode: u32,
    /// Bit per buffer: depth, normal, mask, packed
    pub present: u32,
    pub native_capture: u32,
    pub _pad: u32,
    pub resolution: [f32; 2],
    pub inv_resolution: [f32; 2],
}

/// Backend failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("target size {width}x{height} exceeds device limit {max}")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("unknown target {0:?}")]
    UnknownTarget(TargetHandle),

    #[error("device error: {0}")]
    Device(String),
}

/// GPU operations the replacement renderer depends on
pub trait GpuBackend {
    fn allocate_target(&mut self, desc: &TargetDesc) -> Result<TargetHandle, BackendError>;

    /// Release a target. Releasing an unknown handle is ignored.
    fn release_target(&mut self, handle: TargetHandle);

    fn draw_replacement(&mut self, draw: ReplacementDraw) -> Result<(), BackendError>;

    fn composite(&mut self, composite: Composite) -> Result<(), BackendError>;

    /// Make a camera's buffers and mode visible to decal materials
    fn publish(&mut self, camera: CameraId, inputs: &ShadingInputs);

    /// Drop anything published for a camera
    fn unpublish(&mut self, camera: CameraId);
}
