//! Top-level runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PilotLightError, PilotLightResult};

/// How the CDLOD chunker treats a diamond whose mate falls outside the
/// current quadtree node (a boundary triangle with no partner to merge
/// against).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryPolicy {
    /// Merge the mateless parent unconditionally, discarding its children.
    /// Matches the behaviour observed in the reference preprocessor.
    ForceMerge,
    /// Never merge a mateless parent; its children stay split so chunk
    /// edges never extend past the sampled grid.
    KeepSplit,
}

impl Default for BoundaryPolicy {
    fn default() -> Self {
        BoundaryPolicy::ForceMerge
    }
}

/// Tunables for the CDLOD preprocessor (§4.G).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Quadtree depth `D`; output holds `(4^(D+1) - 1)/3` chunks.
    pub tree_depth: u32,
    /// Lindstrom-Koller base error threshold in world units.
    pub max_base_error: f32,
    /// World-space distance between adjacent heightmap samples.
    pub meters_per_pixel: f32,
    /// Height range the sampled (normalized) heightmap is scaled into.
    pub min_height: f32,
    pub max_height: f32,
    /// When set, samples are projected onto a sphere instead of a plane.
    pub ellipsoid: Option<EllipsoidConfig>,
    pub boundary_policy: BoundaryPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EllipsoidConfig {
    pub radius: f64,
    pub center: [f64; 3],
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            tree_depth: 4,
            max_base_error: 1.0,
            meters_per_pixel: 1.0,
            min_height: 0.0,
            max_height: 255.0,
            ellipsoid: None,
            boundary_policy: BoundaryPolicy::default(),
        }
    }
}

impl TerrainConfig {
    pub fn validate(&self) -> PilotLightResult<()> {
        if self.tree_depth > 16 {
            return Err(PilotLightError::InvalidConfig {
                field: "tree_depth".to_string(),
                reason: format!("{} exceeds maximum of 16", self.tree_depth),
            });
        }
        if self.meters_per_pixel <= 0.0 {
            return Err(PilotLightError::InvalidConfig {
                field: "meters_per_pixel".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_base_error <= 0.0 {
            return Err(PilotLightError::InvalidConfig {
                field: "max_base_error".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.max_height < self.min_height {
            return Err(PilotLightError::InvalidConfig {
                field: "max_height".to_string(),
                reason: "must be >= min_height".to_string(),
            });
        }
        Ok(())
    }
}

/// Tunables for ECS pool pre-allocation. Pools grow past these hints
/// rather than failing (§4.F).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EcsConfig {
    pub initial_entity_capacity: usize,
    pub initial_component_capacity: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            initial_entity_capacity: 1024,
            initial_component_capacity: 1024,
        }
    }
}

/// Tunables for the extension registry (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Directories searched for shared libraries, in order.
    pub search_paths: Vec<String>,
    /// How often `poll()` is expected to be driven, in milliseconds. This
    /// is advisory for embedders driving their own frame loop; the
    /// registry itself performs no internal scheduling.
    pub reload_poll_interval_ms: u64,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            reload_poll_interval_ms: 500,
        }
    }
}

/// Top-level configuration for an embedding application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PilotLightConfig {
    pub extensions: ExtensionConfig,
    pub ecs: EcsConfig,
    pub terrain: TerrainConfig,
}

impl PilotLightConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// absent fields.
    pub fn load(path: &std::path::Path) -> PilotLightResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PilotLightError::IoError {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| PilotLightError::InvalidConfig {
            field: "<file>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PilotLightResult<()> {
        if self.ecs.initial_entity_capacity == 0 {
            return Err(PilotLightError::InvalidConfig {
                field: "ecs.initial_entity_capacity".to_string(),
                reason: "cannot be 0".to_string(),
            });
        }
        self.terrain.validate()?;
        log::info!(
            "[PilotLightConfig] validated: tree_depth={}, initial_entity_capacity={}, extension_search_paths={}",
            self.terrain.tree_depth,
            self.ecs.initial_entity_capacity,
            self.extensions.search_paths.len(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = PilotLightConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_tree_depth_rejected() {
        let mut config = PilotLightConfig::default();
        config.terrain.tree_depth = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_entity_capacity_rejected() {
        let mut config = PilotLightConfig::default();
        config.ecs.initial_entity_capacity = 0;
        assert!(config.validate().is_err());
    }
}
