//! Shared types for the decalforge projection renderer.
//!
//! Everything in here is plain data: handles that cross the boundary between
//! the renderer core and its host, scene layer masks, and the configuration
//! the host hands to the core at startup.

pub mod config;
pub mod ids;
pub mod layer_mask;

pub use config::{
    ConfigError, DEFAULT_POOL_NAME, MAX_MASKING_LAYERS, MaskMethod, MaskingLayerConfig,
    PoolConfig, ProjectorConfig, ReplacementOverride,
};
pub use ids::{BehaviorHandle, CameraId, DefinitionId, InstanceId, PoolId, SlotId, TextureHandle};
pub use layer_mask::LayerMask;
