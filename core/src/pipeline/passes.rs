//! Logical replacement passes per mode

use smallvec::SmallVec;

use crate::backend::{ReplacementShader, TargetKind};
use crate::camera::{ReplacementMode, TargetLayout};

/// One logical replacement render. A split pass is issued as one sub-draw per
/// masking-layer combination; an unsplit pass as a single catch-all draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalPass {
    pub shader: ReplacementShader,
    /// Bound targets, in the order the program writes them
    pub outputs: SmallVec<[TargetKind; 3]>,
    pub split: bool,
}

impl LogicalPass {
    fn new(shader: ReplacementShader, outputs: &[TargetKind], split: bool) -> Self {
        Self {
            shader,
            outputs: outputs.iter().copied().collect(),
            split,
        }
    }
}

/// Passes required to fill `layout`, in execution order
pub fn logical_passes(layout: &TargetLayout) -> SmallVec<[LogicalPass; 3]> {
    use ReplacementShader as S;
    use TargetKind as K;

    let mut passes = SmallVec::new();
    match layout.mode {
        ReplacementMode::Classic => {
            passes.push(LogicalPass::new(S::Mask, &[K::Mask], true));
        }
        ReplacementMode::DoublePass => {
            if layout.depth_pass {
                passes.push(LogicalPass::new(S::Depth, &[K::Depth], false));
            }
            passes.push(LogicalPass::new(S::NormalMask, &[K::Normal, K::Mask], true));
        }
        ReplacementMode::TriplePass => {
            if layout.depth_pass {
                passes.push(LogicalPass::new(S::Depth, &[K::Depth], false));
            }
            passes.push(LogicalPass::new(S::Normal, &[K::Normal], true));
            passes.push(LogicalPass::new(S::Mask, &[K::Mask], true));
        }
        ReplacementMode::SinglePass => {
            passes.push(LogicalPass::new(
                S::DepthNormalMask,
                &[K::Depth, K::Normal, K::Mask],
                true,
            ));
        }
        ReplacementMode::SingleTarget => {
            passes.push(LogicalPass::new(S::Packed, &[K::Packed], true));
        }
    }
    passes
}
