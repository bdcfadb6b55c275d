//! One subject, one permutation: the end-to-end recall searchlight.
//!
//! [`run_subject`] resolves paths, loads the trajectory and scan, picks the
//! run mode, builds the shifted model correlation matrix, runs the
//! searchlight through any [`SearchlightEngine`], and writes the map. Either
//! exactly one `.npy` file is written or the run fails before writing.
//!
//! The compute half is exposed separately as [`evaluate_statistic_map`] so it
//! can be exercised on in-memory arrays.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array2, Array3, Array4, ArrayView4, Axis};
use tracing::info;

use crate::config::SearchlightConfig;
use crate::correlation::{correlation_matrix, pearson_r, shifted_model_correlation};
use crate::error::{SearchlightError, SearchlightResult};
use crate::paths::{result_path, InputPaths, RunMode};
use crate::searchlight::{Neighborhood, SearchlightEngine};
use crate::volume::{brain_mask, load_scan, load_trajectory, save_result};

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Subject analysed.
    pub subid: u32,
    /// Observed or permutation mode.
    pub mode: RunMode,
    /// Where the map was written.
    pub result_path: PathBuf,
    /// Searchlight centers that produced a value (finite or not).
    pub n_centers: usize,
    /// Evaluated centers whose statistic is not finite.
    pub n_nan: usize,
}

impl RunReport {
    /// Circular shift applied to the model.
    pub fn shift(&self) -> usize {
        self.mode.shift()
    }
}

// ---------------------------------------------------------------------------
// Voxel function
// ---------------------------------------------------------------------------

/// Gather the active voxels of a neighborhood into a `[T, V]` matrix.
///
/// Columns follow the mask's logical (x, y, z) order.
pub fn neighborhood_timeseries(data: &ArrayView4<'_, f32>, mask: &Array3<bool>) -> Array2<f64> {
    let n_t = data.len_of(Axis(3));
    let active: Vec<(usize, usize, usize)> = mask
        .indexed_iter()
        .filter_map(|(idx, &m)| m.then_some(idx))
        .collect();

    let mut out = Array2::<f64>::zeros((n_t, active.len()));
    for (col, &(x, y, z)) in active.iter().enumerate() {
        for t in 0..n_t {
            out[[t, col]] = f64::from(data[[x, y, z, t]]);
        }
    }
    out
}

/// Searchlight statistic for one neighborhood.
///
/// Correlates the neighborhood's time-by-time correlation matrix with the
/// broadcast model matrix, both flattened. Degenerate neighborhoods (a single
/// voxel, flat signal) give `NaN`.
pub fn recall_voxel_fn(nbhd: &Neighborhood<'_>, model: &Array2<f64>) -> f64 {
    let Some(data) = nbhd.data.first() else {
        return f64::NAN;
    };
    let local = neighborhood_timeseries(data, &nbhd.mask);
    let local_corr = correlation_matrix(&local.view());
    if local_corr.len() != model.len() {
        return f64::NAN;
    }
    pearson_r(local_corr.iter(), model.iter())
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Statistic volume plus evaluation counts.
#[derive(Debug, Clone)]
pub struct StatisticMap {
    /// One value per searchlight center, `NaN` elsewhere.
    pub values: Array3<f64>,
    /// Centers the voxel function was evaluated at.
    pub n_centers: usize,
    /// Evaluated centers whose statistic is not finite.
    pub n_nan: usize,
}

/// Run the searchlight over `scan` against `model_corr`.
///
/// `model_corr` must be `T x T` where `T` is the scan's time length.
pub fn evaluate_statistic_map<E>(
    engine: &mut E,
    scan: Array4<f32>,
    mask: Array3<bool>,
    model_corr: Array2<f64>,
) -> SearchlightResult<StatisticMap>
where
    E: SearchlightEngine<Broadcast = Array2<f64>>,
{
    let n_t = scan.len_of(Axis(3));
    if model_corr.dim() != (n_t, n_t) {
        return Err(SearchlightError::shape_mismatch(
            vec![n_t, n_t],
            model_corr.shape().to_vec(),
        ));
    }

    engine.distribute(vec![scan], mask)?;
    engine.broadcast(model_corr);

    let evaluated = AtomicUsize::new(0);
    let non_finite = AtomicUsize::new(0);
    let values = engine.run_searchlight(|nbhd, model| {
        let r = recall_voxel_fn(nbhd, model);
        evaluated.fetch_add(1, Ordering::Relaxed);
        if !r.is_finite() {
            non_finite.fetch_add(1, Ordering::Relaxed);
        }
        r
    })?;

    Ok(StatisticMap {
        values,
        n_centers: evaluated.into_inner(),
        n_nan: non_finite.into_inner(),
    })
}

/// Analyse subject `subid` under raw permutation argument `perm`.
///
/// # Errors
///
/// Any load failure, a trajectory/scan length mismatch, an engine failure or
/// a write failure. Nothing is written on error.
pub fn run_subject<E>(
    config: &SearchlightConfig,
    subid: u32,
    perm: i64,
    engine: &mut E,
) -> SearchlightResult<RunReport>
where
    E: SearchlightEngine<Broadcast = Array2<f64>>,
{
    let inputs = InputPaths::for_subject(config, subid);

    info!("Loading recall model from {}", inputs.trajectory.display());
    let trajectory = load_trajectory(&inputs.trajectory)?;

    info!("Loading scan from {}", inputs.scan.display());
    let scan = load_scan(&inputs.scan)?;
    let mask = brain_mask(&scan, config.sentinel);

    let n_t = trajectory.nrows();
    let scan_t = scan.len_of(Axis(3));
    if scan_t != n_t {
        return Err(SearchlightError::shape_mismatch(vec![n_t], vec![scan_t]));
    }

    let mode = RunMode::resolve(perm, n_t);
    let out_path = result_path(config, subid, &mode);
    info!(
        subid,
        %mode,
        timepoints = n_t,
        brain_voxels = mask.iter().filter(|&&m| m).count(),
        "resolved run"
    );

    let model_corr = shifted_model_correlation(&trajectory.view(), mode.shift());
    let map = evaluate_statistic_map(engine, scan, mask, model_corr)?;

    save_result(&out_path, &map.values)?;
    info!("Saved statistic map to {}", out_path.display());

    Ok(RunReport {
        subid,
        mode,
        result_path: out_path,
        n_centers: map.n_centers,
        n_nan: map.n_nan,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
