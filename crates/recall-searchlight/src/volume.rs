//! Loading the analysis inputs and persisting the statistic map.
//!
//! - [`load_trajectory`]: the time-warped recall model, a 2-D `.npy` array
//!   `[T, F]`.
//! - [`load_scan`]: the 4-D fMRI run `[X, Y, Z, T]` stored as NIfTI-1, plain
//!   or gzip-compressed (detected from the magic bytes, not the extension).
//! - [`brain_mask`]: in-brain voxels of the first frame.
//! - [`save_result`]: write the statistic volume as `.npy`.
//!
//! Failures are never recovered here; they surface as [`DataError`]s that
//! carry the offending path.

use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::{Array2, Array3, Array4, ArrayD, Axis, Ix2, Ix4};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiObject};
use tracing::debug;

use crate::error::DataError;

// ---------------------------------------------------------------------------
// Trajectory
// ---------------------------------------------------------------------------

/// Load the recall-model trajectory from a 2-D `.npy` file.
///
/// `float64` is the native format; `float32` files are accepted and widened.
///
/// # Errors
///
/// [`DataError::DataNotFound`] if the file is missing,
/// [`DataError::NpyReadError`] if it is not a float `.npy`, and
/// [`DataError::InvalidFormat`] if it is not 2-D.
pub fn load_trajectory(path: &Path) -> Result<Array2<f64>, DataError> {
    let bytes = read_bytes(path)?;

    let arr: ArrayD<f64> = match ArrayD::<f64>::read_npy(Cursor::new(&bytes)) {
        Ok(arr) => arr,
        Err(f64_err) => ArrayD::<f32>::read_npy(Cursor::new(&bytes))
            .map(|a| a.mapv(f64::from))
            .map_err(|_| DataError::npy_read(path, f64_err.to_string()))?,
    };

    let shape = arr.shape().to_vec();
    let traj = arr.into_dimensionality::<Ix2>().map_err(|_| {
        DataError::invalid_format(path, format!("expected a 2-D [T, F] array, got shape {shape:?}"))
    })?;

    debug!(path = %path.display(), shape = ?traj.shape(), "loaded trajectory");
    Ok(traj)
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Load a 4-D fMRI run from a NIfTI-1 file.
///
/// The header's `scl_slope` / `scl_inter` are applied. The returned array is
/// indexed `[x, y, z, t]`.
///
/// # Errors
///
/// [`DataError::DataNotFound`] if the file is missing,
/// [`DataError::NiftiReadError`] if it cannot be decoded, and
/// [`DataError::InvalidFormat`] if it is not 4-D or has no frames.
pub fn load_scan(path: &Path) -> Result<Array4<f32>, DataError> {
    let bytes = read_bytes(path)?;

    let parsed = if is_gzip(&bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(&bytes)))
    } else {
        InMemNiftiObject::from_reader(Cursor::new(&bytes))
    };
    let obj = parsed.map_err(|e| DataError::nifti_read(path, e.to_string()))?;

    let ndim = obj.header().dim[0];
    if ndim != 4 {
        return Err(DataError::invalid_format(
            path,
            format!("expected a 4-D volume, header declares {ndim} dimensions"),
        ));
    }

    let arr: ArrayD<f32> = obj
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(|e| DataError::nifti_read(path, e.to_string()))?;

    let shape = arr.shape().to_vec();
    let scan = arr.into_dimensionality::<Ix4>().map_err(|_| {
        DataError::invalid_format(path, format!("expected [X, Y, Z, T], got shape {shape:?}"))
    })?;
    if scan.len_of(Axis(3)) == 0 {
        return Err(DataError::invalid_format(path, "scan has no time frames"));
    }

    debug!(path = %path.display(), shape = ?scan.shape(), "loaded scan");
    Ok(scan)
}

/// Derive the brain mask from the first frame of `scan`.
///
/// A voxel is in the brain unless its first-frame value equals `sentinel`.
/// A scan without frames has no brain voxels.
///
/// # Example
///
/// ```rust
/// use ndarray::Array4;
/// use recall_searchlight::volume::brain_mask;
///
/// let mut scan = Array4::<f32>::from_elem((2, 2, 2, 3), 10000.0);
/// scan[[1, 0, 1, 0]] = 42.0;
/// let mask = brain_mask(&scan, 10000.0);
/// assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
/// assert!(mask[[1, 0, 1]]);
/// ```
pub fn brain_mask(scan: &Array4<f32>, sentinel: f64) -> Array3<bool> {
    let (nx, ny, nz, nt) = scan.dim();
    if nt == 0 {
        return Array3::from_elem((nx, ny, nz), false);
    }
    let sentinel = sentinel as f32;
    scan.index_axis(Axis(3), 0).mapv(|v| v != sentinel)
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Write the statistic volume to `path` as a `float64` `.npy` file.
///
/// The parent directory must already exist; it is provisioned by the caller
/// of the analysis, not here.
///
/// # Errors
///
/// [`DataError::IoError`] if the file cannot be created and
/// [`DataError::NpyWriteError`] if serialization fails.
pub fn save_result(path: &Path, result: &Array3<f64>) -> Result<(), DataError> {
    let file = File::create(path).map_err(|e| DataError::io_error(path, e))?;
    let mut writer = BufWriter::new(file);
    result
        .write_npy(&mut writer)
        .map_err(|e| DataError::npy_write(path, e.to_string()))?;
    writer.flush().map_err(|e| DataError::io_error(path, e))?;
    debug!(path = %path.display(), "wrote result volume");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_bytes(path: &Path) -> Result<Vec<u8>, DataError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::not_found(path, "input file does not exist"),
        _ => DataError::io_error(path, e),
    })
}

/// Gzip streams start with `1f 8b`.
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_npy::write_npy;
    use tempfile::tempdir;

    #[test]
    fn trajectory_round_trip_f64() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("sub1_dtw.npy");
        let traj = array![[0.1, 0.2, 0.3], [1.0, 2.0, 3.0]];
        write_npy(&path, &traj).unwrap();

        let loaded = load_trajectory(&path).unwrap();
        assert_eq!(loaded, traj);
    }

    #[test]
    fn trajectory_f32_is_widened() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("sub1_dtw.npy");
        let traj = array![[0.5f32, 1.5], [2.5, 3.5]];
        write_npy(&path, &traj).unwrap();

        let loaded = load_trajectory(&path).unwrap();
        assert_eq!(loaded, array![[0.5, 1.5], [2.5, 3.5]]);
    }

    #[test]
    fn trajectory_wrong_rank_is_invalid_format() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("flat.npy");
        write_npy(&path, &array![1.0, 2.0, 3.0]).unwrap();

        let err = load_trajectory(&path).unwrap_err();
        assert!(matches!(err, DataError::InvalidFormat { .. }), "got {err:?}");
    }

    #[test]
    fn trajectory_missing_is_not_found() {
        let tmp = tempdir().unwrap();
        let err = load_trajectory(&tmp.path().join("absent.npy")).unwrap_err();
        assert!(matches!(err, DataError::DataNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn trajectory_garbage_is_npy_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("garbage.npy");
        std::fs::write(&path, b"not a numpy file").unwrap();
        let err = load_trajectory(&path).unwrap_err();
        assert!(matches!(err, DataError::NpyReadError { .. }), "got {err:?}");
    }

    #[test]
    fn scan_garbage_is_nifti_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("scan.nii");
        std::fs::write(&path, vec![0u8; 400]).unwrap();
        let err = load_scan(&path).unwrap_err();
        assert!(matches!(err, DataError::NiftiReadError { .. }), "got {err:?}");
    }

    #[test]
    fn mask_all_sentinel_is_empty() {
        let scan = Array4::<f32>::from_elem((3, 4, 5, 2), 10000.0);
        let mask = brain_mask(&scan, 10000.0);
        assert_eq!(mask.shape(), &[3, 4, 5]);
        assert!(mask.iter().all(|&m| !m));
    }

    #[test]
    fn mask_only_reads_first_frame() {
        let mut scan = Array4::<f32>::from_elem((2, 2, 1, 3), 10000.0);
        // Later frames differing from the sentinel do not matter.
        scan[[0, 0, 0, 1]] = 5.0;
        scan[[1, 1, 0, 0]] = 5.0;
        let mask = brain_mask(&scan, 10000.0);
        assert!(!mask[[0, 0, 0]]);
        assert!(mask[[1, 1, 0]]);
    }

    #[test]
    fn save_result_requires_existing_directory() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("perms").join("sub1.npy");
        let err = save_result(&path, &Array3::zeros((2, 2, 2))).unwrap_err();
        assert!(matches!(err, DataError::IoError { .. }), "got {err:?}");
        assert!(!path.exists());
    }

    #[test]
    fn save_result_preserves_nan() {
        use ndarray_npy::read_npy;

        let tmp = tempdir().unwrap();
        let path = tmp.path().join("sub1.npy");
        let mut result = Array3::from_elem((2, 3, 4), f64::NAN);
        result[[1, 2, 3]] = 0.25;
        save_result(&path, &result).unwrap();

        let loaded: Array3<f64> = read_npy(&path).unwrap();
        assert_eq!(loaded.shape(), &[2, 3, 4]);
        assert_eq!(loaded[[1, 2, 3]], 0.25);
        assert_eq!(loaded.iter().filter(|v| v.is_nan()).count(), 23);
    }

    #[test]
    fn gzip_magic_detection() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x5c, 0x01]));
        assert!(!is_gzip(&[0x1f]));
    }
}
