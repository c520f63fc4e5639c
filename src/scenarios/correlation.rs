//! # Correlation
//!
//! $$
//! \rho_{ij}=\frac{\Sigma_{ij}}{\sigma_i\sigma_j},\qquad \rho = LL^\top
//! $$
//!
//! Correlation matrix of the calibrated covariance and its lower Cholesky factor.

use nalgebra::DMatrix;
use ndarray::Array1;
use ndarray::Array2;

use crate::error::RecourseError;
use crate::error::Result;

/// Smallest pivot accepted on the Cholesky diagonal.
const PIVOT_TOL: f64 = 1e-12;

/// Normalize a covariance matrix by asset standard deviations.
///
/// Entries are not clamped: an inconsistent covariance shows up as a correlation outside
/// `[-1, 1]` and is rejected by [`cholesky_lower`].
pub fn correlation_from_covariance(cov: &Array2<f64>) -> Result<Array2<f64>> {
  let n = cov.nrows();
  if cov.ncols() != n {
    return Err(RecourseError::configuration(format!(
      "covariance must be square, got {}x{}",
      cov.nrows(),
      cov.ncols()
    )));
  }

  let sd: Array1<f64> = cov.diag().to_owned();
  if let Some((i, v)) = sd.iter().enumerate().find(|(_, v)| !(v.is_finite() && **v > 0.0)) {
    return Err(RecourseError::degenerate(format!(
      "asset {i} has non-positive variance {v}"
    )));
  }
  let sd = sd.mapv(f64::sqrt);

  Ok(Array2::from_shape_fn((n, n), |(i, j)| {
    if i == j {
      1.0
    } else {
      cov[[i, j]] / (sd[i] * sd[j])
    }
  }))
}

/// Lower Cholesky factor `L` with `corr = L L^T`.
///
/// Fails with [`RecourseError::DegenerateCovariance`] when `corr` is not symmetric positive
/// definite; no regularization is attempted.
pub fn cholesky_lower(corr: &Array2<f64>) -> Result<Array2<f64>> {
  let n = corr.nrows();
  if corr.ncols() != n {
    return Err(RecourseError::configuration(format!(
      "correlation must be square, got {}x{}",
      corr.nrows(),
      corr.ncols()
    )));
  }

  for i in 0..n {
    for j in (i + 1)..n {
      if (corr[[i, j]] - corr[[j, i]]).abs() > 1e-10 {
        return Err(RecourseError::degenerate(format!(
          "correlation is not symmetric at ({i}, {j})"
        )));
      }
    }
  }

  let m = DMatrix::from_fn(n, n, |i, j| corr[[i, j]]);
  let chol = m.cholesky().ok_or_else(|| {
    RecourseError::degenerate("correlation matrix is not positive definite")
  })?;
  let l = chol.l();

  // nalgebra accepts zero pivots, so a semi-definite input can still slip through.
  for i in 0..n {
    if !(l[(i, i)] > PIVOT_TOL) {
      return Err(RecourseError::degenerate(format!(
        "cholesky pivot {i} is {}",
        l[(i, i)]
      )));
    }
  }
  if l.iter().any(|v| !v.is_finite()) {
    return Err(RecourseError::degenerate("cholesky factor is not finite"));
  }

  Ok(Array2::from_shape_fn((n, n), |(i, j)| l[(i, j)]))
}
