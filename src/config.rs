// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Configuration for tree construction, queries and welding

use crate::geometry::WeldOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up by [`MeshBvhConfig::load`].
pub const CONFIG_FILE: &str = "meshbvh.toml";

/// Tree construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Sort large ranges with rayon
    pub parallel: bool,
    /// Smallest range that is sorted in parallel
    pub parallel_threshold: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 4096,
        }
    }
}

impl BuildConfig {
    /// Single-threaded build.
    pub fn serial() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub(crate) fn sorts_in_parallel(&self, len: usize) -> bool {
        self.parallel && len >= self.parallel_threshold.max(2)
    }
}

/// Query defaults used by the command line tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Radius used when a radius query does not give one
    pub default_radius: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_radius: 1e-3,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshBvhConfig {
    pub build: BuildConfig,
    pub query: QueryConfig,
    pub weld: WeldOptions,
}

impl MeshBvhConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: MeshBvhConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `meshbvh.toml` if present, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `MESHBVH_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(parallel) = std::env::var("MESHBVH_PARALLEL") {
            self.build.parallel = parallel.parse().unwrap_or(self.build.parallel);
        }

        if let Ok(threshold) = std::env::var("MESHBVH_PARALLEL_THRESHOLD") {
            if let Ok(threshold) = threshold.parse() {
                self.build.parallel_threshold = threshold;
            }
        }

        if let Ok(radius) = std::env::var("MESHBVH_WELD_RADIUS") {
            if let Ok(radius) = radius.parse() {
                self.weld.radius = radius;
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("meshbvh.toml");
        std::fs::write(&path, "[build]\nparallel = false\n\n[weld]\nradius = 0.5\n")?;

        let config = MeshBvhConfig::from_file(&path)?;
        assert!(!config.build.parallel);
        assert_eq!(config.build.parallel_threshold, 4096);
        assert_eq!(config.weld.radius, 0.5);
        assert!(!config.weld.boundary_only);
        assert_eq!(config.query, QueryConfig::default());
        Ok(())
    }

    #[test]
    fn test_save_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.toml");

        let mut config = MeshBvhConfig::default();
        config.build.parallel_threshold = 128;
        config.weld.boundary_only = true;
        config.save(&path)?;

        assert_eq!(MeshBvhConfig::from_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_parallel_threshold() {
        let config = BuildConfig {
            parallel: true,
            parallel_threshold: 100,
        };
        assert!(!config.sorts_in_parallel(99));
        assert!(config.sorts_in_parallel(100));
        assert!(!BuildConfig::serial().sorts_in_parallel(1_000_000));
    }
}
