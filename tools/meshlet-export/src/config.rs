//! Export settings (`meshlets.toml`)
//!
//! ```toml
//! max_vertices = 64
//! max_triangles = 124
//! cone_weight = 0.0
//! clusterizer = "meshopt"   # or "greedy"
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cluster::{Clusterizer, GreedyClusterizer, MeshoptClusterizer};
use meshlet_common::{MeshletLimits, DEFAULT_MAX_TRIANGLES, DEFAULT_MAX_VERTICES};

/// Local indices are stored in one byte.
pub const MAX_VERTICES_LIMIT: u32 = u8::MAX as u32;
/// Largest meshlet the clustering backends accept.
pub const MAX_TRIANGLES_LIMIT: u32 = 512;

/// Which clustering backend partitions the triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterizerKind {
    #[default]
    Meshopt,
    Greedy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub max_vertices: u32,
    pub max_triangles: u32,
    /// Reserved for cone culling; 0 disables it.
    pub cone_weight: f32,
    pub clusterizer: ClusterizerKind,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            max_vertices: DEFAULT_MAX_VERTICES,
            max_triangles: DEFAULT_MAX_TRIANGLES,
            cone_weight: 0.0,
            clusterizer: ClusterizerKind::default(),
        }
    }
}

impl ExportConfig {
    /// Load and validate a TOML settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(3..=MAX_VERTICES_LIMIT).contains(&self.max_vertices) {
            bail!(
                "max_vertices must be between 3 and {}, got {}",
                MAX_VERTICES_LIMIT,
                self.max_vertices
            );
        }
        if !(1..=MAX_TRIANGLES_LIMIT).contains(&self.max_triangles)
            || self.max_triangles % 4 != 0
        {
            bail!(
                "max_triangles must be a multiple of 4 between 4 and {}, got {}",
                MAX_TRIANGLES_LIMIT,
                self.max_triangles
            );
        }
        if !self.cone_weight.is_finite() || !(0.0..=1.0).contains(&self.cone_weight) {
            bail!("cone_weight must be within [0, 1], got {}", self.cone_weight);
        }
        Ok(())
    }

    pub fn limits(&self) -> MeshletLimits {
        MeshletLimits {
            max_vertices: self.max_vertices,
            max_triangles: self.max_triangles,
        }
    }

    pub fn clusterizer(&self) -> Box<dyn Clusterizer> {
        match self.clusterizer {
            ClusterizerKind::Meshopt => Box::new(MeshoptClusterizer),
            ClusterizerKind::Greedy => Box::new(GreedyClusterizer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExportConfig::default();
        config.validate().unwrap();
        assert_eq!(config.limits(), MeshletLimits::default());
        assert_eq!(config.clusterizer().name(), "meshopt");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ExportConfig = toml::from_str("clusterizer = \"greedy\"\nmax_triangles = 64\n")
            .unwrap();
        assert_eq!(config.max_vertices, DEFAULT_MAX_VERTICES);
        assert_eq!(config.max_triangles, 64);
        assert_eq!(config.clusterizer, ClusterizerKind::Greedy);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<ExportConfig>("max_verts = 64\n").is_err());
    }

    #[test]
    fn test_validation() {
        let too_many_vertices = ExportConfig {
            max_vertices: 256,
            ..Default::default()
        };
        assert!(too_many_vertices.validate().is_err());

        let unaligned_triangles = ExportConfig {
            max_triangles: 126,
            ..Default::default()
        };
        assert!(unaligned_triangles.validate().is_err());

        let bad_cone = ExportConfig {
            cone_weight: f32::NAN,
            ..Default::default()
        };
        assert!(bad_cone.validate().is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meshlets.toml");
        std::fs::write(&path, "max_vertices = 32\nmax_triangles = 32\n").unwrap();
        let config = ExportConfig::load(&path).unwrap();
        assert_eq!(config.max_vertices, 32);
        assert_eq!(config.max_triangles, 32);

        std::fs::write(&path, "max_vertices = 300\n").unwrap();
        assert!(ExportConfig::load(&path).is_err());
    }
}
