//! Decalforge Core - Projected decal rendering
//!
//! This crate tracks projected decals and renders the screen-space buffers
//! their shaders sample: depth, normals and masking layers reconstructed by
//! replacement passes over the scene.
//!
//! # Architecture
//!
//! - [`DecalSystem`] - Owns all state; the host drives it from frame callbacks
//! - [`ProjectionDefinition`] - Shared material configuration of one decal kind
//! - [`ProjectionInstance`] - One placed decal
//! - [`ProjectionRegistry`] - Active instances grouped and ordered by priority
//! - [`InstancePool`] - Bounded, tiered pools for transient decals
//! - [`CameraRenderState`] - Per-camera replacement mode and render targets
//! - [`GpuBackend`] - Seam to the GPU, implemented by [`WgpuBackend`]

pub mod backend;
pub mod camera;
pub mod definition;
pub mod instance;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod stats;
mod system;
#[cfg(test)]
pub mod test_utils;

pub use decalforge_shared as shared;

pub use backend::{
    BackendError, GpuBackend, ReplacementCommand, ShadingInputs, TargetHandle, WgpuBackend,
};
pub use camera::{
    CameraRenderState, Evaluation, RenderingPath, ReplacementMode, SceneCamera, StereoMode,
};
pub use definition::{ProjectionDefinition, ProjectionKind, ProjectionShader};
pub use instance::{ProjectionInstance, ProjectionTemplate};
pub use pipeline::MaskPassPlan;
pub use pool::{InstancePool, PoolRequest, ReturnedSlot, SlotReuse};
pub use registry::ProjectionRegistry;
pub use stats::FrameStats;
pub use system::{DecalSystem, DrawItem};
