//! Analysis configuration.
//!
//! [`SearchlightConfig`] replaces the process-wide configuration mapping of
//! the surrounding pipeline: it carries the data root plus every searchlight
//! parameter, and is passed explicitly into [`crate::pipeline::run_subject`].
//! It is serializable via [`serde`] so a run can be pinned in a JSON file.
//!
//! # Example
//!
//! ```rust
//! use recall_searchlight::config::{SearchlightConfig, SearchlightShape};
//!
//! let cfg = SearchlightConfig::default();
//! cfg.validate().expect("default config is valid");
//!
//! assert_eq!(cfg.radius, 5);
//! assert_eq!(cfg.shape, SearchlightShape::Cube);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// SearchlightShape
// ---------------------------------------------------------------------------

/// Shape of the neighborhood around each searchlight center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchlightShape {
    /// Every voxel of the `(2r+1)^3` cube.
    #[default]
    Cube,
    /// Voxels within Euclidean distance `r` of the center.
    Ball,
    /// Voxels within Manhattan distance `r` of the center.
    Diamond,
}

impl SearchlightShape {
    /// Whether the offset `(dx, dy, dz)` from the center belongs to a
    /// neighborhood of radius `radius`.
    pub fn contains(self, dx: isize, dy: isize, dz: isize, radius: usize) -> bool {
        let r = radius as isize;
        match self {
            SearchlightShape::Cube => dx.abs() <= r && dy.abs() <= r && dz.abs() <= r,
            SearchlightShape::Ball => dx * dx + dy * dy + dz * dz <= r * r,
            SearchlightShape::Diamond => dx.abs() + dy.abs() + dz.abs() <= r,
        }
    }
}

// ---------------------------------------------------------------------------
// SearchlightConfig
// ---------------------------------------------------------------------------

/// Complete configuration for a recall searchlight run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchlightConfig {
    /// Root of the data tree holding `inputs/` and `outputs/`.
    pub datadir: PathBuf,

    /// Searchlight radius in voxels. Default: **5**.
    pub radius: usize,

    /// Neighborhood shape. Default: **cube**.
    pub shape: SearchlightShape,

    /// Value marking out-of-brain voxels in the first scan frame.
    ///
    /// The scans are exported with background filled by this constant.
    /// Default: **10000.0**.
    pub sentinel: f64,

    /// Edge length (in centers) of the blocks handed to each worker.
    /// Default: **10**.
    pub max_blk_edge: usize,

    /// Minimum fraction of active voxels in a neighborhood.
    ///
    /// When non-zero, a center is evaluated only if the fraction of in-mask
    /// voxels within its neighborhood is strictly greater. Default: **0.0**.
    pub min_active_voxels_proportion: f64,

    /// Worker threads for the searchlight pool; `0` lets rayon decide.
    /// Default: **0**.
    pub num_threads: usize,
}

impl Default for SearchlightConfig {
    fn default() -> Self {
        SearchlightConfig {
            datadir: PathBuf::from("data"),
            radius: 5,
            shape: SearchlightShape::Cube,
            sentinel: 10000.0,
            max_blk_edge: 10,
            min_active_voxels_proportion: 0.0,
            num_threads: 0,
        }
    }
}

impl SearchlightConfig {
    /// Default configuration rooted at `datadir`.
    pub fn with_datadir(datadir: impl Into<PathBuf>) -> Self {
        SearchlightConfig { datadir: datadir.into(), ..Default::default() }
    }

    /// Load a [`SearchlightConfig`] from a JSON file at `path`.
    ///
    /// Missing fields take their defaults. The loaded config is validated.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened,
    /// [`ConfigError::ParseError`] if the JSON is malformed, and
    /// [`ConfigError::InvalidValue`] if a field fails validation.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: SearchlightConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this configuration to pretty-printed JSON and write it to
    /// `path`, creating parent directories if necessary.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Validate all fields and return the first problem found.
    ///
    /// # Validated invariants
    ///
    /// - `datadir` must not be empty.
    /// - `radius` and `max_blk_edge` must be at least 1.
    /// - `sentinel` must be finite.
    /// - `min_active_voxels_proportion` must lie in `[0.0, 1.0)`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datadir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("datadir", "must not be empty"));
        }
        if self.radius == 0 {
            return Err(ConfigError::invalid_value("radius", "must be > 0"));
        }
        if self.max_blk_edge == 0 {
            return Err(ConfigError::invalid_value("max_blk_edge", "must be > 0"));
        }
        if !self.sentinel.is_finite() {
            return Err(ConfigError::invalid_value("sentinel", "must be finite"));
        }
        if !(0.0..1.0).contains(&self.min_active_voxels_proportion) {
            return Err(ConfigError::invalid_value(
                "min_active_voxels_proportion",
                "must be in [0.0, 1.0)",
            ));
        }
        Ok(())
    }

    /// Number of voxels along one edge of the bounding cube of a searchlight.
    pub fn diameter(&self) -> usize {
        2 * self.radius + 1
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
