//! Opaque handles shared between the renderer core and its host.
//!
//! All handles are plain `u32`/`u64` newtypes. Zero is never handed out for
//! handles the core allocates itself, so a zeroed handle is always invalid.

use serde::{Deserialize, Serialize};

/// Identity of a projection definition (one decal "kind" asset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DefinitionId(pub u32);

/// Identity of a projection instance attached to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

/// Index of a pool partition, in configuration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(pub u32);

/// Slot inside one pool partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

/// Host-assigned camera identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CameraId(pub u64);

/// Handle to a host-owned texture asset (albedo maps, normal maps, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// Invalid/null texture handle
    pub const INVALID: TextureHandle = TextureHandle(0);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Handle to an auxiliary behaviour (fade, cull, ...) a host attached to an
/// instance at runtime. The core only tracks and strips these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BehaviorHandle(pub u32);
