//! # Calibration
//!
//! $$
//! \mu_i = a\left(\Big(\prod_{t}(1+r_{t,i})\Big)^{1/T} - 1\right),\qquad
//! \Sigma = a\,\widehat{\operatorname{Cov}}(r)
//! $$
//!
//! Annualized return statistics from a historical price window.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;
use ndarray_stats::SummaryStatisticsExt;
use tracing::debug;
use tracing::info;

use crate::data::AssetPanel;
use crate::data::Window;
use crate::error::RecourseError;
use crate::error::Result;

/// Weekly observations per year.
pub const WEEKLY: f64 = 52.0;

/// Annualized mean returns and covariance over a calibration window.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStatistics {
  /// Annualized geometric mean return per asset.
  pub mu: Array1<f64>,
  /// Annualized sample covariance (`n x n`).
  pub sigma: Array2<f64>,
  /// Number of return observations used.
  pub observations: usize,
}

impl ReturnStatistics {
  pub fn n_assets(&self) -> usize {
    self.mu.len()
  }

  /// Annualized volatility per asset.
  pub fn volatilities(&self) -> Array1<f64> {
    self.sigma.diag().mapv(|v| v.max(0.0).sqrt())
  }
}

/// Calibrate return statistics from `panel` over `window`.
///
/// The window needs at least two return observations.
pub fn calibrate(
  panel: &AssetPanel,
  window: &Window,
  annualization_factor: f64,
) -> Result<ReturnStatistics> {
  if !(annualization_factor.is_finite() && annualization_factor > 0.0) {
    return Err(RecourseError::configuration(format!(
      "annualization factor must be positive, got {annualization_factor}"
    )));
  }

  let returns = panel.simple_returns().restrict(window);
  debug!(
    observations = returns.len(),
    start = %window.start,
    end = %window.end,
    "restricted returns to calibration window"
  );

  if returns.len() < 2 {
    return Err(RecourseError::configuration(format!(
      "calibration window {}..={} holds {} return observations, need at least 2",
      window.start,
      window.end,
      returns.len()
    )));
  }

  let stats = statistics_from_returns(&returns.returns, annualization_factor)?;
  info!(
    assets = stats.n_assets(),
    observations = stats.observations,
    "calibrated return statistics"
  );
  Ok(stats)
}

/// Statistics from a `T x n` matrix of simple returns.
pub fn statistics_from_returns(
  returns: &Array2<f64>,
  annualization_factor: f64,
) -> Result<ReturnStatistics> {
  let observations = returns.nrows();
  if observations < 2 {
    return Err(RecourseError::configuration(format!(
      "need at least 2 return observations, got {observations}"
    )));
  }

  let gross = returns.mapv(|r| 1.0 + r);
  if gross.iter().any(|g| *g <= 0.0) {
    return Err(RecourseError::configuration(
      "gross returns must be positive for a geometric mean",
    ));
  }

  let mut mu = Array1::zeros(returns.ncols());
  for (i, column) in gross.axis_iter(Axis(1)).enumerate() {
    let g = column
      .geometric_mean()
      .map_err(|e| RecourseError::configuration(e.to_string()))?;
    mu[i] = annualization_factor * (g - 1.0);
  }

  let cov = returns
    .t()
    .cov(1.0)
    .map_err(|e| RecourseError::configuration(e.to_string()))?;

  Ok(ReturnStatistics {
    mu,
    sigma: cov * annualization_factor,
    observations,
  })
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;
  use crate::data::tests::date;
  use crate::data::tests::weekly_dates;

  #[test]
  fn geometric_mean_and_sample_covariance() {
    let returns = array![[0.10, 0.02], [-0.05, 0.04], [0.02, -0.01]];
    let stats = statistics_from_returns(&returns, WEEKLY).unwrap();

    let g0 = (1.10_f64 * 0.95 * 1.02).powf(1.0 / 3.0);
    assert_abs_diff_eq!(stats.mu[0], WEEKLY * (g0 - 1.0), epsilon = 1e-12);

    let m1 = (0.02 + 0.04 - 0.01) / 3.0;
    let var1 = ((0.02_f64 - m1).powi(2) + (0.04_f64 - m1).powi(2) + (-0.01_f64 - m1).powi(2)) / 2.0;
    assert_abs_diff_eq!(stats.sigma[[1, 1]], WEEKLY * var1, epsilon = 1e-12);
    assert_abs_diff_eq!(stats.sigma[[0, 1]], stats.sigma[[1, 0]], epsilon = 1e-15);
    assert_eq!(stats.observations, 3);
  }

  #[test]
  fn window_with_single_observation_is_a_configuration_error() {
    let dates = weekly_dates(date(2021, 1, 1), 5);
    let prices = Array2::from_shape_fn((5, 2), |(t, i)| 100.0 + (t * (i + 1)) as f64);
    let panel = AssetPanel::new(vec!["A".into(), "B".into()], dates.clone(), prices).unwrap();

    let window = Window::new(dates[1], dates[1]).unwrap();
    let err = calibrate(&panel, &window, WEEKLY).unwrap_err();
    assert!(matches!(err, RecourseError::Configuration { .. }));

    let full = Window::new(dates[0], dates[4]).unwrap();
    let stats = calibrate(&panel, &full, WEEKLY).unwrap();
    assert_eq!(stats.observations, 4);
    assert!(stats.mu.iter().all(|m| *m > 0.0));
  }

  #[test]
  fn rejects_non_positive_annualization() {
    let dates = weekly_dates(date(2021, 1, 1), 4);
    let prices = Array2::from_shape_fn((4, 1), |(t, _)| 10.0 + t as f64);
    let panel = AssetPanel::new(vec!["A".into()], dates.clone(), prices).unwrap();
    let window = Window::new(dates[0], dates[3]).unwrap();
    assert!(calibrate(&panel, &window, 0.0).is_err());
  }
}
