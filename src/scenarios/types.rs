//! # Scenario Types
//!
//! $$
//! \sum_{s=1}^{S} p_s = 1,\qquad p_s = \tfrac1S
//! $$
//!
//! Scenario containers shared by the generator and the model builder.

use ndarray::Array1;
use ndarray::Array2;
use statrs::statistics::Statistics;

use crate::calibration::ReturnStatistics;
use crate::error::RecourseError;
use crate::error::Result;

/// One joint realization of asset returns and the liability.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
  /// Simple return per asset over the horizon.
  pub returns: Array1<f64>,
  /// Liability due at the horizon.
  pub liability: f64,
  /// Simulated terminal price per asset.
  pub prices: Array1<f64>,
}

impl Scenario {
  /// Scenario built from returns alone; terminal prices are reported relative to a unit start.
  pub fn from_returns(returns: Array1<f64>, liability: f64) -> Self {
    let prices = returns.mapv(|r| 1.0 + r);
    Self {
      returns,
      liability,
      prices,
    }
  }

  /// Gross payoff `(1 + r)` per unit invested in each asset.
  pub fn gross_returns(&self) -> Array1<f64> {
    self.returns.mapv(|r| 1.0 + r)
  }
}

/// Equally weighted, ordered scenarios.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioSet {
  scenarios: Vec<Scenario>,
  initial_prices: Array1<f64>,
}

impl ScenarioSet {
  /// Build a set; every scenario must cover the same number of assets.
  pub fn new(scenarios: Vec<Scenario>, initial_prices: Array1<f64>) -> Result<Self> {
    if scenarios.is_empty() {
      return Err(RecourseError::configuration("scenario set is empty"));
    }
    let n = initial_prices.len();
    if let Some((s, _)) = scenarios
      .iter()
      .enumerate()
      .find(|(_, sc)| sc.returns.len() != n || sc.prices.len() != n)
    {
      return Err(RecourseError::configuration(format!(
        "scenario {s} does not cover {n} assets"
      )));
    }
    if scenarios
      .iter()
      .any(|sc| !sc.liability.is_finite() || sc.returns.iter().any(|r| !r.is_finite()))
    {
      return Err(RecourseError::configuration("scenario values must be finite"));
    }

    Ok(Self {
      scenarios,
      initial_prices,
    })
  }

  /// Set of scenarios given only as return vectors and liabilities.
  pub fn from_returns(returns: Vec<Array1<f64>>, liabilities: Vec<f64>) -> Result<Self> {
    if returns.len() != liabilities.len() {
      return Err(RecourseError::configuration(format!(
        "{} return vectors but {} liabilities",
        returns.len(),
        liabilities.len()
      )));
    }
    let n = returns.first().map(|r| r.len()).unwrap_or(0);
    let scenarios = returns
      .into_iter()
      .zip(liabilities)
      .map(|(r, l)| Scenario::from_returns(r, l))
      .collect();

    Self::new(scenarios, Array1::ones(n))
  }

  pub fn len(&self) -> usize {
    self.scenarios.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scenarios.is_empty()
  }

  pub fn n_assets(&self) -> usize {
    self.initial_prices.len()
  }

  pub fn scenarios(&self) -> &[Scenario] {
    &self.scenarios
  }

  pub fn initial_prices(&self) -> &Array1<f64> {
    &self.initial_prices
  }

  pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
    self.scenarios.iter()
  }

  /// Uniform weight of each scenario.
  pub fn probability(&self) -> f64 {
    1.0 / self.scenarios.len() as f64
  }

  pub fn probabilities(&self) -> Vec<f64> {
    vec![self.probability(); self.scenarios.len()]
  }

  /// Simulated terminal prices as an `n x S` grid.
  pub fn price_grid(&self) -> Array2<f64> {
    Array2::from_shape_fn((self.n_assets(), self.len()), |(i, s)| {
      self.scenarios[s].prices[i]
    })
  }

  pub fn liabilities(&self) -> Vec<f64> {
    self.scenarios.iter().map(|s| s.liability).collect()
  }

  /// Sample mean and standard deviation of the liabilities.
  pub fn liability_summary(&self) -> (f64, f64) {
    let liabilities = self.liabilities();
    let mean = liabilities.iter().mean();
    let sd = if liabilities.len() > 1 {
      liabilities.iter().std_dev()
    } else {
      0.0
    };
    (mean, sd)
  }
}

/// Single expected-value scenario used by the deterministic program.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpectedOutcome {
  pub returns: Array1<f64>,
  pub liability: f64,
}

impl ExpectedOutcome {
  /// Expected horizon return `mu * dt` and the expected liability.
  pub fn from_statistics(stats: &ReturnStatistics, dt: f64, expected_liability: f64) -> Self {
    Self {
      returns: &stats.mu * dt,
      liability: expected_liability,
    }
  }

  /// Probability-weighted mean of a scenario set.
  pub fn from_scenarios(set: &ScenarioSet) -> Self {
    let p = set.probability();
    let mut returns = Array1::zeros(set.n_assets());
    let mut liability = 0.0;
    for s in set.iter() {
      returns.scaled_add(p, &s.returns);
      liability += p * s.liability;
    }
    Self { returns, liability }
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  #[test]
  fn probabilities_sum_to_one() {
    for n in [1usize, 2, 3, 5, 7, 10, 101] {
      let set = ScenarioSet::from_returns(vec![array![0.01, 0.02]; n], vec![100.0; n]).unwrap();
      let total: f64 = set.probabilities().iter().sum();
      assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }
  }

  #[test]
  fn price_grid_is_assets_by_scenarios() {
    let set = ScenarioSet::from_returns(
      vec![array![0.10, 0.08], array![-0.05, -0.02], array![0.0, 0.01]],
      vec![120.0, 90.0, 100.0],
    )
    .unwrap();
    let grid = set.price_grid();
    assert_eq!(grid.dim(), (2, 3));
    assert_abs_diff_eq!(grid[[1, 1]], 0.98, epsilon = 1e-12);
  }

  #[test]
  fn expected_outcome_from_scenarios_is_weighted_mean() {
    let set = ScenarioSet::from_returns(
      vec![array![0.10, 0.08], array![-0.05, -0.02]],
      vec![120.0, 90.0],
    )
    .unwrap();
    let ev = ExpectedOutcome::from_scenarios(&set);
    assert_abs_diff_eq!(ev.returns[0], 0.025, epsilon = 1e-12);
    assert_abs_diff_eq!(ev.returns[1], 0.03, epsilon = 1e-12);
    assert_abs_diff_eq!(ev.liability, 105.0, epsilon = 1e-12);

    let (mean, sd) = set.liability_summary();
    assert_abs_diff_eq!(mean, 105.0, epsilon = 1e-12);
    assert!(sd > 0.0);
  }

  #[test]
  fn mismatched_scenarios_are_rejected() {
    let err = ScenarioSet::from_returns(vec![array![0.1, 0.2], array![0.1]], vec![1.0, 2.0]);
    assert!(err.is_err());
    assert!(ScenarioSet::from_returns(vec![], vec![]).is_err());
  }
}
