//! End-to-end tests for [`recall_searchlight::pipeline::run_subject`].
//!
//! Every test builds its own data tree in a [`tempfile::TempDir`] from the
//! deterministic fixtures in `common`.

mod common;

use ndarray::{Array2, Array3};
use ndarray_npy::read_npy;
use recall_searchlight::config::SearchlightConfig;
use recall_searchlight::correlation::correlation_matrix;
use recall_searchlight::error::{DataError, SearchlightError};
use recall_searchlight::paths::{results_dir, RunMode};
use recall_searchlight::pipeline::{evaluate_statistic_map, run_subject};
use recall_searchlight::searchlight::{Searchlight, SearchlightParams};
use recall_searchlight::volume::brain_mask;
use tempfile::TempDir;

const SENTINEL: f32 = 10000.0;

fn small_config(tmp: &TempDir) -> SearchlightConfig {
    SearchlightConfig {
        radius: 1,
        num_threads: 2,
        max_blk_edge: 2,
        ..SearchlightConfig::with_datadir(tmp.path())
    }
}

fn engine(config: &SearchlightConfig) -> Searchlight<Array2<f64>> {
    Searchlight::new(SearchlightParams::from(config))
}

/// Element-wise equality treating `NaN == NaN`.
fn assert_maps_equal(a: &Array3<f64>, b: &Array3<f64>) {
    assert_eq!(a.shape(), b.shape());
    for (idx, (x, y)) in a.indexed_iter().map(|(i, x)| (i, (x, b[i]))) {
        assert!(
            (x.is_nan() && y.is_nan()) || (x - y).abs() < 1e-12,
            "maps differ at {idx:?}: {x} vs {y}"
        );
    }
}

// ---------------------------------------------------------------------------
// Permutation mode
// ---------------------------------------------------------------------------

#[test]
fn permutation_run_writes_pinned_shift_path() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);
    common::write_subject(&config, 1, &common::trajectory(20, 5), &common::scan(6, 6, 6, 20, SENTINEL));

    let report = run_subject(&config, 1, 3, &mut engine(&config)).expect("run must succeed");

    assert_eq!(report.mode, RunMode::Permutation { index: 3, shift: 12 });
    assert_eq!(report.shift(), 12);
    let expected = results_dir(&config).join("perms").join("sub1_perm3_shift12.npy");
    assert_eq!(report.result_path, expected);
    assert!(expected.exists());

    let map: Array3<f64> = read_npy(&expected).unwrap();
    assert_eq!(map.shape(), &[6, 6, 6]);
    // Interior 4x4x4 voxels are in the brain and far enough from the faces.
    assert_eq!(report.n_centers, 64);
    assert!(map[[0, 0, 0]].is_nan());
    assert!(map[[2, 2, 2]].is_finite());
    assert!(map.iter().filter(|v| v.is_finite()).all(|v| (-1.0..=1.0).contains(v)));
}

#[test]
fn subjects_share_shift_for_same_permutation() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);
    let traj = common::trajectory(20, 5);
    common::write_subject(&config, 1, &traj, &common::scan(6, 6, 6, 20, SENTINEL));
    common::write_subject(&config, 2, &traj, &common::scan(6, 6, 6, 20, SENTINEL));

    let r1 = run_subject(&config, 1, 5, &mut engine(&config)).unwrap();
    let r2 = run_subject(&config, 2, 5, &mut engine(&config)).unwrap();

    assert_eq!(r1.shift(), r2.shift());
    let name = |subid: u32| format!("sub{subid}_perm5_shift{}.npy", r1.shift());
    assert!(r1.result_path.ends_with(name(1)));
    assert!(r2.result_path.ends_with(name(2)));
}

// ---------------------------------------------------------------------------
// Observed mode
// ---------------------------------------------------------------------------

#[test]
fn observed_run_matches_unshifted_searchlight() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);
    let traj = common::trajectory(20, 5);
    let scan = common::scan(6, 6, 6, 20, SENTINEL);
    common::write_subject(&config, 1, &traj, &scan);

    let report = run_subject(&config, 1, -1, &mut engine(&config)).unwrap();
    assert_eq!(report.mode, RunMode::Observed);
    assert_eq!(report.shift(), 0);
    assert_eq!(report.result_path, results_dir(&config).join("sub1.npy"));

    let written: Array3<f64> = read_npy(&report.result_path).unwrap();

    let mask = brain_mask(&scan, config.sentinel);
    let reference = evaluate_statistic_map(
        &mut engine(&config),
        scan,
        mask,
        correlation_matrix(&traj.view()),
    )
    .unwrap();
    assert_maps_equal(&written, &reference.values);
}

#[test]
fn index_outside_seed_domain_runs_observed() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);
    common::write_subject(&config, 4, &common::trajectory(12, 3), &common::scan(5, 5, 5, 12, SENTINEL));

    let report = run_subject(&config, 4, i64::from(u32::MAX) + 7, &mut engine(&config)).unwrap();
    assert_eq!(report.mode, RunMode::Observed);
    assert!(results_dir(&config).join("sub4.npy").exists());
}

// ---------------------------------------------------------------------------
// Degenerate inputs
// ---------------------------------------------------------------------------

#[test]
fn all_sentinel_scan_gives_all_nan_map() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);
    let scan = ndarray::Array4::<f32>::from_elem((5, 5, 5, 10), SENTINEL);
    common::write_subject(&config, 1, &common::trajectory(10, 4), &scan);

    let report = run_subject(&config, 1, -1, &mut engine(&config)).unwrap();
    assert_eq!(report.n_centers, 0);

    let map: Array3<f64> = read_npy(&report.result_path).unwrap();
    assert!(map.iter().all(|v| v.is_nan()));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[test]
fn missing_inputs_fail_without_output() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);

    let err = run_subject(&config, 9, -1, &mut engine(&config)).unwrap_err();
    assert!(
        matches!(err, SearchlightError::Data(DataError::DataNotFound { .. })),
        "got {err:?}"
    );
    assert!(!results_dir(&config).join("sub9.npy").exists());
}

#[test]
fn missing_output_directory_is_io_error() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);
    common::write_subject(&config, 1, &common::trajectory(10, 4), &common::scan(5, 5, 5, 10, SENTINEL));
    std::fs::remove_dir_all(results_dir(&config).join("perms")).unwrap();

    let err = run_subject(&config, 1, 2, &mut engine(&config)).unwrap_err();
    assert!(
        matches!(err, SearchlightError::Data(DataError::IoError { .. })),
        "got {err:?}"
    );
}

#[test]
fn trajectory_and_scan_lengths_must_agree() {
    let tmp = TempDir::new().unwrap();
    let config = small_config(&tmp);
    common::write_subject(&config, 1, &common::trajectory(12, 4), &common::scan(5, 5, 5, 10, SENTINEL));

    let err = run_subject(&config, 1, -1, &mut engine(&config)).unwrap_err();
    assert!(matches!(err, SearchlightError::ShapeMismatch { .. }), "got {err:?}");
}
