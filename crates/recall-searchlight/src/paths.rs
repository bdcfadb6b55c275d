//! Input/output path construction and run-mode resolution.
//!
//! # Directory layout
//!
//! ```text
//! <datadir>/
//!   inputs/
//!     warped/sub{subid}_dtw.npy                       # recall trajectory [T, F]
//!     fMRI/sherlock_movie_s{subid}_10000.nii.gz       # scan [X, Y, Z, T]
//!   outputs/
//!     searchlight_recall/
//!       sub{subid}.npy                                # observed map
//!       perms/sub{subid}_perm{perm}_shift{shift}.npy  # null maps
//! ```
//!
//! Nothing here touches the filesystem. Output directories are provisioned by
//! whatever schedules the runs.

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::config::SearchlightConfig;
use crate::shift::{permutation_seed, permutation_shift};

/// Paths of the two per-subject inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    /// Time-warped recall model.
    pub trajectory: PathBuf,
    /// Movie-viewing fMRI run.
    pub scan: PathBuf,
}

impl InputPaths {
    /// Inputs of subject `subid` under `config.datadir`.
    pub fn for_subject(config: &SearchlightConfig, subid: u32) -> Self {
        let input_dir = config.datadir.join("inputs");
        InputPaths {
            trajectory: input_dir.join("warped").join(format!("sub{subid}_dtw.npy")),
            scan: input_dir
                .join("fMRI")
                .join(format!("sherlock_movie_s{subid}_10000.nii.gz")),
        }
    }
}

/// Directory holding the observed maps; permutation maps go in `perms/`.
pub fn results_dir(config: &SearchlightConfig) -> PathBuf {
    config.datadir.join("outputs").join("searchlight_recall")
}

/// Whether a run produces the observed map or one null map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Unshifted model, written to `sub{subid}.npy`.
    Observed,
    /// Model circularly shifted by `shift`, drawn from permutation `index`.
    Permutation {
        /// Permutation index (also the generator seed).
        index: u32,
        /// Circular shift in timepoints, in `[1, T-2]`.
        shift: usize,
    },
}

impl RunMode {
    /// Resolve the raw permutation argument for a trajectory of
    /// `n_timepoints` rows.
    ///
    /// Negative `perm` is the observed-mode sentinel. An index outside the
    /// seed domain, or a trajectory too short to shift, also falls back to
    /// observed mode with a warning.
    pub fn resolve(perm: i64, n_timepoints: usize) -> Self {
        if perm < 0 {
            return RunMode::Observed;
        }
        let Some(index) = permutation_seed(perm) else {
            warn!(perm, "permutation index outside the seed domain, running unshifted");
            return RunMode::Observed;
        };
        match permutation_shift(index, n_timepoints) {
            Some(shift) => RunMode::Permutation { index, shift },
            None => {
                warn!(perm, n_timepoints, "trajectory too short to shift, running unshifted");
                RunMode::Observed
            }
        }
    }

    /// Circular shift applied to the model; `0` in observed mode.
    pub fn shift(&self) -> usize {
        match self {
            RunMode::Observed => 0,
            RunMode::Permutation { shift, .. } => *shift,
        }
    }

    /// Whether this run contributes to the null distribution.
    pub fn is_permutation(&self) -> bool {
        matches!(self, RunMode::Permutation { .. })
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Observed => write!(f, "observed"),
            RunMode::Permutation { index, shift } => write!(f, "permutation {index} (shift {shift})"),
        }
    }
}

/// Destination of the statistic map for `subid` under `mode`.
pub fn result_path(config: &SearchlightConfig, subid: u32, mode: &RunMode) -> PathBuf {
    let dir = results_dir(config);
    match mode {
        RunMode::Observed => dir.join(format!("sub{subid}.npy")),
        RunMode::Permutation { index, shift } => dir
            .join("perms")
            .join(format!("sub{subid}_perm{index}_shift{shift}.npy")),
    }
}
