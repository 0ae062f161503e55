//! Projector configuration (decalforge.toml)
//!
//! The host owns persistence; this module only defines the shape of the
//! configuration, its defaults, and TOML parsing/validation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::layer_mask::LayerMask;

/// Maximum number of masking layers a configuration may define.
///
/// The mask buffer stores one channel per masking layer.
pub const MAX_MASKING_LAYERS: usize = 4;

/// Top-level projector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// How surfaces are classified into masking layers (default: Layer)
    #[serde(default)]
    pub mask_method: MaskMethod,
    /// Replacement rendering override (default: Standard)
    #[serde(default)]
    pub replacement_override: ReplacementOverride,
    /// Masking layers, at most [`MAX_MASKING_LAYERS`]
    #[serde(default)]
    pub masking_layers: Vec<MaskingLayerConfig>,
    /// Instance pool partitions
    #[serde(default = "default_pools")]
    pub pools: Vec<PoolConfig>,
}

/// How surfaces are assigned to masking layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MaskMethod {
    /// By the surface's scene layer
    #[default]
    Layer,
    /// By the surface's tag
    Tag,
    /// A surface is in a masking layer if either its layer or its tag matches
    Both,
}

impl MaskMethod {
    #[inline]
    pub fn uses_layers(self) -> bool {
        matches!(self, MaskMethod::Layer | MaskMethod::Both)
    }

    #[inline]
    pub fn uses_tags(self) -> bool {
        matches!(self, MaskMethod::Tag | MaskMethod::Both)
    }
}

/// User override for replacement mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ReplacementOverride {
    /// Pick the best mode from platform capabilities
    #[default]
    Standard,
    /// Always use the single packed target (VR friendly)
    #[serde(rename = "VR")]
    Vr,
    /// Reuse the platform's built-in low precision depth/normals
    Mobile,
}

/// One masking layer: the set of surfaces decals can be restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingLayerConfig {
    /// Display name
    pub name: String,
    /// Scene layer indices (0-31) that belong to this masking layer
    #[serde(default)]
    pub layers: Vec<u32>,
    /// Surface tags that belong to this masking layer
    #[serde(default)]
    pub tags: Vec<String>,
}

impl MaskingLayerConfig {
    pub fn layer_mask(&self) -> LayerMask {
        LayerMask::from_layers(&self.layers)
    }
}

/// One named pool partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Name the host looks the pool up by
    pub name: String,
    /// Capacity for each quality tier, lowest tier first
    pub capacities: Vec<u32>,
}

impl PoolConfig {
    /// Capacity at a quality tier. Tiers past the end clamp to the last entry.
    pub fn capacity(&self, tier: usize) -> usize {
        self.capacities
            .get(tier)
            .or_else(|| self.capacities.last())
            .copied()
            .unwrap_or(0) as usize
    }
}

/// Configuration loading/validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{0} masking layers configured (maximum is {MAX_MASKING_LAYERS})")]
    TooManyMaskingLayers(usize),

    #[error("masking layer '{name}' references scene layer {layer} (must be 0-31)")]
    InvalidSceneLayer { name: String, layer: u32 },

    #[error("pool name must not be empty")]
    EmptyPoolName,

    #[error("pool '{0}' is defined more than once")]
    DuplicatePool(String),

    #[error("pool '{0}' has no quality tier capacities")]
    NoCapacities(String),
}

fn default_pools() -> Vec<PoolConfig> {
    vec![PoolConfig {
        name: DEFAULT_POOL_NAME.to_string(),
        capacities: vec![100, 250, 500],
    }]
}

/// Name of the pool created when none are configured
pub const DEFAULT_POOL_NAME: &str = "Default";

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            mask_method: MaskMethod::default(),
            replacement_override: ReplacementOverride::default(),
            masking_layers: Vec::new(),
            pools: default_pools(),
        }
    }
}

impl ProjectorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let mut config: ProjectorConfig = toml::from_str(source)?;
        if config.pools.is_empty() {
            config.pools = default_pools();
        }
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check structural limits the renderer relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.masking_layers.len() > MAX_MASKING_LAYERS {
            return Err(ConfigError::TooManyMaskingLayers(self.masking_layers.len()));
        }
        for masking in &self.masking_layers {
            if let Some(&layer) = masking
                .layers
                .iter()
                .find(|&&l| l >= LayerMask::LAYER_COUNT)
            {
                return Err(ConfigError::InvalidSceneLayer {
                    name: masking.name.clone(),
                    layer,
                });
            }
        }
        for (i, pool) in self.pools.iter().enumerate() {
            if pool.name.is_empty() {
                return Err(ConfigError::EmptyPoolName);
            }
            if pool.capacities.is_empty() {
                return Err(ConfigError::NoCapacities(pool.name.clone()));
            }
            if self.pools[..i].iter().any(|p| p.name == pool.name) {
                return Err(ConfigError::DuplicatePool(pool.name.clone()));
            }
        }
        Ok(())
    }
}
