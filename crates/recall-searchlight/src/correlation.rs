//! Correlation primitives for the recall model and the searchlight statistic.
//!
//! - [`circular_shift`]: rotate a trajectory along its time axis.
//! - [`correlation_matrix`]: pairwise Pearson correlation between rows.
//! - [`shifted_model_correlation`]: the two composed, producing the `T x T`
//!   matrix broadcast to every searchlight.
//! - [`pearson_r`]: correlation between two flattened matrices.
//!
//! Degenerate inputs (zero-variance rows, fewer than two samples) produce
//! `NaN` rather than an error. A searchlight that lands on flat signal must
//! not abort the whole map.

use ndarray::{Array2, ArrayView2, Axis};

// ---------------------------------------------------------------------------
// circular_shift
// ---------------------------------------------------------------------------

/// Rotate the rows of `traj` forward by `shift` positions.
///
/// Row `i` of the input becomes row `(i + shift) mod T` of the output, with
/// rows falling off the end wrapping round to the start. Shifting by any
/// multiple of `T` returns the input unchanged.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use recall_searchlight::correlation::circular_shift;
///
/// let traj = array![[0.0, 0.5], [1.0, 1.5], [2.0, 2.5]];
/// let shifted = circular_shift(&traj.view(), 1);
/// assert_eq!(shifted, array![[2.0, 2.5], [0.0, 0.5], [1.0, 1.5]]);
/// ```
pub fn circular_shift(traj: &ArrayView2<'_, f64>, shift: usize) -> Array2<f64> {
    let n_t = traj.nrows();
    if n_t == 0 {
        return traj.to_owned();
    }
    let shift = shift % n_t;
    let mut out = Array2::<f64>::zeros(traj.raw_dim());
    for (i, row) in traj.axis_iter(Axis(0)).enumerate() {
        out.row_mut((i + shift) % n_t).assign(&row);
    }
    out
}

// ---------------------------------------------------------------------------
// correlation_matrix
// ---------------------------------------------------------------------------

/// Pairwise Pearson correlation between the rows of `m`.
///
/// Each row is a variable and each column an observation, so an `R x C`
/// input yields an `R x R` symmetric matrix. Entries are clamped to
/// `[-1, 1]`. Any pair involving a constant row is `NaN`.
pub fn correlation_matrix(m: &ArrayView2<'_, f64>) -> Array2<f64> {
    let n_rows = m.nrows();
    let n_cols = m.ncols();
    if n_cols == 0 {
        return Array2::from_elem((n_rows, n_rows), f64::NAN);
    }

    let means = m.mean_axis(Axis(1)).unwrap_or_else(|| ndarray::Array1::zeros(n_rows));
    let mut centered = m.to_owned();
    for (mut row, &mean) in centered.axis_iter_mut(Axis(0)).zip(means.iter()) {
        row.mapv_inplace(|v| v - mean);
    }

    let cov = centered.dot(&centered.t());
    let scale: Vec<f64> = cov.diag().iter().map(|v| v.sqrt()).collect();

    let mut corr = cov;
    for ((i, j), v) in corr.indexed_iter_mut() {
        // 0/0 for constant rows stays NaN through clamp.
        *v = (*v / (scale[i] * scale[j])).clamp(-1.0, 1.0);
    }
    corr
}

/// Circularly shift `traj` by `shift` and return the correlation matrix of
/// its timepoints.
pub fn shifted_model_correlation(traj: &ArrayView2<'_, f64>, shift: usize) -> Array2<f64> {
    let shifted = circular_shift(traj, shift);
    correlation_matrix(&shifted.view())
}

// ---------------------------------------------------------------------------
// pearson_r
// ---------------------------------------------------------------------------

/// Pearson correlation coefficient between two equal-length sequences.
///
/// Returns `NaN` when fewer than two samples are given, when either side has
/// zero variance, or when any sample is `NaN`.
///
/// # Panics
///
/// Panics if the sequences have different lengths.
pub fn pearson_r<'a, X, Y>(x: X, y: Y) -> f64
where
    X: IntoIterator<Item = &'a f64>,
    X::IntoIter: Clone + ExactSizeIterator,
    Y: IntoIterator<Item = &'a f64>,
    Y::IntoIter: Clone + ExactSizeIterator,
{
    let x = x.into_iter();
    let y = y.into_iter();
    assert_eq!(x.len(), y.len(), "pearson_r requires equal-length inputs");

    let n = x.len();
    if n < 2 {
        return f64::NAN;
    }
    let n_f = n as f64;
    let mean_x = x.clone().sum::<f64>() / n_f;
    let mean_y = y.clone().sum::<f64>() / n_f;

    let mut cov = 0.0f64;
    let mut var_x = 0.0f64;
    let mut var_y = 0.0f64;
    for (&a, &b) in x.zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
