//! Scene layer bitmask (32 layers, one bit each).

use serde::{Deserialize, Serialize};

/// Bitmask over the host's 32 scene layers.
///
/// Used for camera culling masks and for the layer half of masking-layer
/// membership.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    bytemuck::Pod,
    bytemuck::Zeroable,
)]
#[repr(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Number of scene layers a mask can address
    pub const LAYER_COUNT: u32 = 32;

    /// Mask containing a single layer. Layers past 31 yield an empty mask.
    #[inline]
    pub fn layer(index: u32) -> Self {
        if index < Self::LAYER_COUNT {
            LayerMask(1 << index)
        } else {
            LayerMask::NONE
        }
    }

    /// Mask containing every listed layer.
    pub fn from_layers(layers: &[u32]) -> Self {
        layers
            .iter()
            .fold(LayerMask::NONE, |mask, &l| mask.union(LayerMask::layer(l)))
    }

    #[inline]
    pub fn contains(self, index: u32) -> bool {
        index < Self::LAYER_COUNT && self.0 & (1 << index) != 0
    }

    #[inline]
    pub fn union(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 | other.0)
    }

    #[inline]
    pub fn intersection(self, other: LayerMask) -> LayerMask {
        LayerMask(self.0 & other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the indices of all set layers, lowest first.
    pub fn iter(self) -> impl Iterator<Item = u32> {
        (0..Self::LAYER_COUNT).filter(move |&i| self.contains(i))
    }
}
