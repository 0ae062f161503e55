//! Replacement mode selection
//!
//! Mode selection is a pure function of the override setting and the
//! camera's capabilities; the target layout then follows from the mode and
//! the rendering path.

use decalforge_shared::ReplacementOverride;

use super::{DepthCapture, RenderingPath};

/// How surface data is reconstructed for decals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ReplacementMode {
    /// Mask buffer only, depth/normals from the camera's built-in capture
    Classic = 0,
    /// Depth pass (deferred only) plus one normal+mask pass
    DoublePass = 1,
    /// Separate depth (deferred only), normal and mask passes
    TriplePass = 2,
    /// Depth, normal and mask in one pass with three bound targets
    SinglePass = 3,
    /// One packed depth+normal+mask target
    SingleTarget = 4,
}

impl ReplacementMode {
    /// Value published to decal materials
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Inputs to [`select_mode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModeInputs {
    pub replacement_override: ReplacementOverride,
    pub stereo: bool,
    pub path: RenderingPath,
    pub max_render_targets: u32,
}

/// Pick the replacement mode for a camera.
///
/// | override | stereo | max targets | mode         |
/// |----------|--------|-------------|--------------|
/// | Mobile   | any    | any         | Classic      |
/// | VR       | any    | any         | SingleTarget |
/// | Standard | yes    | any         | TriplePass   |
/// | Standard | no     | < 3         | DoublePass   |
/// | Standard | no     | >= 3        | SinglePass   |
pub fn select_mode(inputs: &ModeInputs) -> ReplacementMode {
    match inputs.replacement_override {
        ReplacementOverride::Mobile => ReplacementMode::Classic,
        ReplacementOverride::Vr => ReplacementMode::SingleTarget,
        ReplacementOverride::Standard => {
            if inputs.stereo {
                // Multi-buffer for VR compatibility even when MRT is available
                ReplacementMode::TriplePass
            } else if inputs.max_render_targets < 3 {
                ReplacementMode::DoublePass
            } else {
                ReplacementMode::SinglePass
            }
        }
    }
}

/// Buffers a camera needs for one mode on one rendering path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetLayout {
    pub mode: ReplacementMode,
    pub depth: bool,
    pub normal: bool,
    pub mask: bool,
    pub packed: bool,
    /// A dedicated depth pass renders into the depth buffer
    pub depth_pass: bool,
    /// Built-in capture the camera must provide on top of its own flags
    pub native_capture: DepthCapture,
}

impl TargetLayout {
    pub fn new(mode: ReplacementMode, path: RenderingPath) -> Self {
        let deferred = path == RenderingPath::Deferred;
        match mode {
            ReplacementMode::Classic => Self {
                mode,
                depth: false,
                normal: false,
                mask: true,
                packed: false,
                depth_pass: false,
                native_capture: DepthCapture::DEPTH_NORMALS,
            },
            ReplacementMode::DoublePass | ReplacementMode::TriplePass => Self {
                mode,
                depth: deferred,
                normal: true,
                mask: true,
                packed: false,
                depth_pass: deferred,
                // Forward cameras take depth from their own capture
                native_capture: if deferred {
                    DepthCapture::empty()
                } else {
                    DepthCapture::DEPTH
                },
            },
            ReplacementMode::SinglePass => Self {
                mode,
                depth: true,
                normal: true,
                mask: true,
                packed: false,
                depth_pass: false,
                native_capture: DepthCapture::empty(),
            },
            ReplacementMode::SingleTarget => Self {
                mode,
                depth: false,
                normal: false,
                mask: false,
                packed: true,
                depth_pass: false,
                native_capture: DepthCapture::empty(),
            },
        }
    }

    /// Number of buffers in the layout
    pub fn target_count(&self) -> usize {
        [self.depth, self.normal, self.mask, self.packed]
            .iter()
            .filter(|&&b| b)
            .count()
    }
}
