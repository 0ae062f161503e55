//! Replacement pipeline
//!
//! Turns an initialized [`CameraRenderState`] into replacement draws: the
//! scene is re-rendered from the camera's view with substitute programs that
//! write depth, normals and masking-layer membership into the camera's
//! targets. Once every pass for the camera is recorded, the targets and mode
//! are published as shading inputs for decal materials.
//!
//! The pipeline never draws decals itself.

mod mask_plan;
mod passes;


use smallvec::SmallVec;

use crate::backend::{BackendError, Composite, GpuBackend, ReplacementDraw, TargetHandle};
use crate::camera::{CameraRenderState, Eye, SceneCamera, TargetLayout, TargetSet, ViewParams};
use crate::stats::FrameStats;

pub use mask_plan::{FilterClause, MaskPassPlan, SubDraw, SurfaceFilter, TagMatch};
pub use passes::{LogicalPass, logical_passes};

/// Outcome of [`execute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Passes recorded and shading inputs published
    Published,
    /// State is not initialized; nothing was recorded
    NotReady,
}

/// Record every replacement pass for one camera, then publish its buffers.
///
/// `state` must have been evaluated for this frame.
pub fn execute(
    state: &CameraRenderState,
    camera: &dyn SceneCamera,
    plan: &MaskPassPlan,
    backend: &mut dyn GpuBackend,
    stats: &mut FrameStats,
) -> Result<Execution, BackendError> {
    let (Some(layout), Some(inputs)) = (state.layout(), state.shading_inputs()) else {
        return Ok(Execution::NotReady);
    };

    match (state.eye_targets(), state.eye_resolution()) {
        (Some(eye_targets), Some((eye_width, eye_height))) => {
            let base = camera.view();
            for eye in Eye::BOTH {
                let eye_view = camera.eye_view(eye);
                let view = ViewParams {
                    view: eye_view.view,
                    projection: eye_view.projection,
                    position: base.position + eye_view.offset,
                };
                record_passes(state, camera, layout, eye_targets, view, plan, backend, stats)?;

                // Scratch is reused by the next eye, so composite before it draws
                for (kind, source) in eye_targets.iter() {
                    let Some(destination) = state.targets().get(kind) else {
                        continue;
                    };
                    backend.composite(Composite {
                        source,
                        destination,
                        x: eye.index() * eye_width,
                        width: eye_width,
                        height: eye_height,
                    })?;
                    stats.composites += 1;
                }
            }
        }
        _ => {
            let view = camera.view();
            let targets = state.targets();
            record_passes(state, camera, layout, targets, view, plan, backend, stats)?;
        }
    }

    backend.publish(state.camera(), &inputs);
    Ok(Execution::Published)
}

#[allow(clippy::too_many_arguments)]
fn record_passes(
    state: &CameraRenderState,
    camera: &dyn SceneCamera,
    layout: &TargetLayout,
    targets: &TargetSet,
    view: ViewParams,
    plan: &MaskPassPlan,
    backend: &mut dyn GpuBackend,
    stats: &mut FrameStats,
) -> Result<(), BackendError> {
    let catch_all = [SubDraw::catch_all()];
    let culling = camera.culling_mask();

    for pass in logical_passes(layout) {
        let bound: SmallVec<[TargetHandle; 3]> = pass
            .outputs
            .iter()
            .filter_map(|&kind| targets.get(kind))
            .collect();
        if bound.len() != pass.outputs.len() {
            tracing::error!(
                camera = ?state.camera(),
                shader = ?pass.shader,
                "replacement pass is missing targets, skipping"
            );
            continue;
        }

        let sub_draws: &[SubDraw] = if pass.split {
            plan.sub_draws()
        } else {
            &catch_all
        };
        for (i, sub) in sub_draws.iter().enumerate() {
            backend.draw_replacement(ReplacementDraw {
                camera: state.camera(),
                shader: pass.shader,
                targets: bound.clone(),
                clear: i == 0,
                view,
                culling_mask: culling.intersection(sub.filter.layers()),
                filter: sub.filter.clone(),
                mask_layers: sub.mask_layers,
            })?;
            stats.replacement_draws += 1;
        }
    }
    Ok(())
}
