//! # Configuration
//!
//! Every recognized option of the recourse pipeline, passed explicitly between stages.
//!
//! The number of scenarios is a plain parameter: no statistical convergence check is made, and
//! the default of five scenarios is only a starting point for small experiments.

use serde::Deserialize;
use serde::Serialize;

use crate::calibration::WEEKLY;
use crate::data::Window;
use crate::error::RecourseError;
use crate::error::Result;
use crate::model::RecourseCosts;
use crate::scenarios::LiabilityModel;

/// Options for calibration, scenario generation, model building and tracking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecourseConfig {
  /// Calibration window; the whole panel when absent.
  pub calibration_window: Option<Window>,
  /// Observations per year, 52 for weekly prices.
  pub annualization_factor: f64,
  pub n_scenarios: usize,
  pub seed: u64,
  /// Horizon of the single GBM step, in years.
  pub dt: f64,
  pub budget: f64,
  pub costs: RecourseCosts,
  pub liability: LiabilityModel,
  /// Out-of-sample tracking window for the backtest.
  pub tracking_window: Option<Window>,
  /// Run the stochastic solve concurrently with the deterministic chain.
  pub parallel_solves: bool,
  /// Relative tolerance when checking the sign of the VSS.
  pub vss_tolerance: f64,
}

impl Default for RecourseConfig {
  fn default() -> Self {
    Self {
      calibration_window: None,
      annualization_factor: WEEKLY,
      n_scenarios: 5,
      seed: 42,
      dt: 1.0,
      budget: 100.0,
      costs: RecourseCosts::default(),
      liability: LiabilityModel::default(),
      tracking_window: None,
      parallel_solves: true,
      vss_tolerance: 1e-6,
    }
  }
}

impl RecourseConfig {
  /// Parse a JSON document; missing fields take their defaults.
  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: Self = serde_json::from_str(json)
      .map_err(|e| RecourseError::configuration(format!("invalid config: {e}")))?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    if self.n_scenarios == 0 {
      return Err(RecourseError::configuration("n_scenarios must be at least 1"));
    }
    if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
      return Err(RecourseError::configuration(
        "annualization_factor must be positive",
      ));
    }
    if !(self.dt.is_finite() && self.dt > 0.0) {
      return Err(RecourseError::configuration("dt must be positive"));
    }
    if !(self.budget.is_finite() && self.budget >= 0.0) {
      return Err(RecourseError::configuration("budget must be non-negative"));
    }
    if !(self.liability.noise_std.is_finite() && self.liability.noise_std >= 0.0) {
      return Err(RecourseError::configuration(
        "liability noise_std must be non-negative",
      ));
    }
    if !(self.liability.baseline.is_finite() && self.liability.noise_mean.is_finite()) {
      return Err(RecourseError::configuration("liability parameters must be finite"));
    }
    if !(self.vss_tolerance.is_finite() && self.vss_tolerance >= 0.0) {
      return Err(RecourseError::configuration("vss_tolerance must be non-negative"));
    }
    for w in [self.calibration_window, self.tracking_window].iter().flatten() {
      Window::new(w.start, w.end)?;
    }
    self.costs.validate()
  }
}
