//! Tree configuration, loadable from TOML

use crate::core::Aabb;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Deepest level whose integer positions still fit an `i32` grid
pub const DEPTH_CEILING: u32 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root bounds and limits shared by every tree of a world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Minimum corner of the root cell
    pub min: Vec3,
    /// Edge length of the root cell
    pub size: f32,
    /// Deepest level paths and queries may address
    pub max_depth: u32,
    /// Vertex limit of one published sub-mesh
    pub max_vertices_per_mesh: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            min: Vec3::ZERO,
            size: 1.0,
            max_depth: 16,
            max_vertices_per_mesh: 65_000,
        }
    }
}

impl OctreeConfig {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.min, self.size)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize for saving; configs that [`Self::validate`] rejects are refused
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        self.validate()?;
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.size.is_finite() && self.size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "size must be positive, got {}",
                self.size
            )));
        }
        if !self.min.is_finite() {
            return Err(ConfigError::Invalid("min must be finite".into()));
        }
        if self.max_depth > DEPTH_CEILING {
            return Err(ConfigError::Invalid(format!(
                "max_depth {} exceeds {DEPTH_CEILING}",
                self.max_depth
            )));
        }
        if self.max_vertices_per_mesh < 4 {
            return Err(ConfigError::Invalid(
                "max_vertices_per_mesh must hold at least one face".into(),
            ));
        }
        Ok(())
    }
}
