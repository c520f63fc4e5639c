use ndarray::Array1;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rand_distr::Distribution;
use rand_distr::Normal;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use super::correlation::cholesky_lower;
use super::correlation::correlation_from_covariance;
use super::types::Scenario;
use super::types::ScenarioSet;
use crate::calibration::ReturnStatistics;
use crate::error::RecourseError;
use crate::error::Result;

/// Liability `L = baseline + N(noise_mean, noise_std^2)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LiabilityModel {
  pub baseline: f64,
  pub noise_mean: f64,
  pub noise_std: f64,
}

impl LiabilityModel {
  pub fn expected(&self) -> f64 {
    self.baseline + self.noise_mean
  }

  fn distribution(&self) -> Result<Normal<f64>> {
    if !(self.baseline.is_finite() && self.noise_mean.is_finite()) {
      return Err(RecourseError::configuration(format!(
        "liability baseline and noise mean must be finite, got {} and {}",
        self.baseline, self.noise_mean
      )));
    }
    // rand_distr only rejects a non-finite std
    if !(self.noise_std.is_finite() && self.noise_std >= 0.0) {
      return Err(RecourseError::configuration(format!(
        "liability noise_std must be non-negative, got {}",
        self.noise_std
      )));
    }
    Normal::new(self.noise_mean, self.noise_std).map_err(|e| {
      RecourseError::configuration(format!(
        "liability noise N({}, {}): {e}",
        self.noise_mean, self.noise_std
      ))
    })
  }
}

impl Default for LiabilityModel {
  fn default() -> Self {
    Self {
      baseline: 100.0,
      noise_mean: 0.0,
      noise_std: 10.0,
    }
  }
}

/// Seed of the independent random stream assigned to `scenario`.
///
/// SplitMix64 finalizer over the base seed and the scenario index, so every scenario draws
/// the same numbers regardless of which thread generates it.
pub fn substream_seed(seed: u64, scenario: usize) -> u64 {
  let mut z = seed ^ (scenario as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
  z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
  z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
  z ^ (z >> 31)
}

/// Single-step correlated GBM sampler over a horizon `dt`.
#[derive(Clone, Debug)]
pub struct ScenarioGenerator {
  initial_prices: Array1<f64>,
  /// `(mu - sigma^2 / 2) dt` per asset.
  drift: Array1<f64>,
  /// `sigma sqrt(dt)` per asset.
  diffusion: Array1<f64>,
  cholesky: Array2<f64>,
  dt: f64,
}

impl ScenarioGenerator {
  /// Prepare the sampler; fails with `DegenerateCovariance` if the correlation has no Cholesky factor.
  pub fn new(stats: &ReturnStatistics, initial_prices: Array1<f64>, dt: f64) -> Result<Self> {
    let n = stats.n_assets();
    if initial_prices.len() != n || stats.sigma.dim() != (n, n) {
      return Err(RecourseError::configuration(format!(
        "statistics cover {n} assets but {} initial prices were given",
        initial_prices.len()
      )));
    }
    if initial_prices.iter().any(|p| !(p.is_finite() && *p > 0.0)) {
      return Err(RecourseError::configuration(
        "initial prices must be finite and strictly positive",
      ));
    }
    if !(dt.is_finite() && dt > 0.0) {
      return Err(RecourseError::configuration(format!(
        "time step must be positive, got {dt}"
      )));
    }

    let corr = correlation_from_covariance(&stats.sigma)?;
    let cholesky = cholesky_lower(&corr)?;
    let var = stats.sigma.diag().to_owned();

    let drift = (&stats.mu - &(&var * 0.5)) * dt;
    let diffusion = var.mapv(|v| v.sqrt() * dt.sqrt());
    debug!(assets = n, dt, "prepared correlated GBM sampler");

    Ok(Self {
      initial_prices,
      drift,
      diffusion,
      cholesky,
      dt,
    })
  }

  pub fn n_assets(&self) -> usize {
    self.initial_prices.len()
  }

  pub fn dt(&self) -> f64 {
    self.dt
  }

  pub fn cholesky(&self) -> &Array2<f64> {
    &self.cholesky
  }

  /// Correlated standard normal shocks `L z`.
  pub fn correlated_shocks<R: Rng + ?Sized>(&self, rng: &mut R) -> Array1<f64> {
    let z = Array1::from_shape_fn(self.n_assets(), |_| -> f64 { StandardNormal.sample(rng) });
    self.cholesky.dot(&z)
  }

  /// Advance `prices` by one GBM step of length `dt`.
  pub fn step<R: Rng + ?Sized>(&self, prices: &Array1<f64>, rng: &mut R) -> Array1<f64> {
    let eps = self.correlated_shocks(rng);
    let log_growth = &self.drift + &(&self.diffusion * &eps);
    prices * &log_growth.mapv(f64::exp)
  }

  fn draw(&self, liability: &Normal<f64>, baseline: f64, seed: u64, s: usize) -> Scenario {
    let mut rng = StdRng::seed_from_u64(substream_seed(seed, s));
    let prices = self.step(&self.initial_prices, &mut rng);
    let returns = (&prices - &self.initial_prices) / &self.initial_prices;
    let liability = baseline + liability.sample(&mut rng);

    Scenario {
      returns,
      liability,
      prices,
    }
  }

  /// Draw `n_scenarios` equally weighted scenarios.
  ///
  /// Scenarios are generated in parallel, each from its own seeded substream.
  pub fn generate(
    &self,
    n_scenarios: usize,
    liability: &LiabilityModel,
    seed: u64,
  ) -> Result<ScenarioSet> {
    if n_scenarios == 0 {
      return Err(RecourseError::configuration(
        "number of scenarios must be at least 1",
      ));
    }
    let noise = liability.distribution()?;

    let scenarios: Vec<Scenario> = (0..n_scenarios)
      .into_par_iter()
      .map(|s| self.draw(&noise, liability.baseline, seed, s))
      .collect();

    let set = ScenarioSet::new(scenarios, self.initial_prices.clone())?;
    info!(scenarios = set.len(), seed, "generated scenario set");
    Ok(set)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn stats() -> ReturnStatistics {
    ReturnStatistics {
      mu: array![0.08, 0.04, 0.10],
      sigma: array![
        [0.04, 0.012, 0.006],
        [0.012, 0.09, 0.0],
        [0.006, 0.0, 0.0625]
      ],
      observations: 104,
    }
  }

  #[test]
  fn identical_seed_gives_identical_scenarios() {
    let gen = ScenarioGenerator::new(&stats(), array![100.0, 50.0, 20.0], 1.0).unwrap();
    let liab = LiabilityModel::default();
    let a = gen.generate(64, &liab, 42).unwrap();
    let b = gen.generate(64, &liab, 42).unwrap();
    assert_eq!(a, b);

    let c = gen.generate(64, &liab, 43).unwrap();
    assert_ne!(a, c);
  }

  #[test]
  fn scenario_draws_do_not_depend_on_set_size() {
    let gen = ScenarioGenerator::new(&stats(), array![100.0, 50.0, 20.0], 1.0).unwrap();
    let liab = LiabilityModel::default();
    let small = gen.generate(5, &liab, 7).unwrap();
    let large = gen.generate(50, &liab, 7).unwrap();
    assert_eq!(small.scenarios(), &large.scenarios()[..5]);
  }

  #[test]
  fn returns_are_consistent_with_prices() {
    let p0 = array![100.0, 50.0, 20.0];
    let gen = ScenarioGenerator::new(&stats(), p0.clone(), 0.5).unwrap();
    let set = gen.generate(10, &LiabilityModel::default(), 1).unwrap();
    for s in set.iter() {
      for i in 0..3 {
        assert_abs_diff_eq!(s.returns[i], s.prices[i] / p0[i] - 1.0, epsilon = 1e-12);
        assert!(s.prices[i] > 0.0);
      }
    }
  }

  #[test]
  fn sample_moments_match_gbm() {
    let p0 = array![100.0, 50.0, 20.0];
    let gen = ScenarioGenerator::new(&stats(), p0, 1.0).unwrap();
    let liab = LiabilityModel {
      baseline: 1000.0,
      noise_mean: 5.0,
      noise_std: 2.0,
    };
    let set = gen.generate(20_000, &liab, 2024).unwrap();

    // E[S_T / S_0] = exp(mu dt)
    let mean_gross: f64 = set.iter().map(|s| 1.0 + s.returns[0]).sum::<f64>() / set.len() as f64;
    assert_abs_diff_eq!(mean_gross, 0.08_f64.exp(), epsilon = 0.01);

    let (mean, sd) = set.liability_summary();
    assert_abs_diff_eq!(mean, 1005.0, epsilon = 0.1);
    assert_abs_diff_eq!(sd, 2.0, epsilon = 0.1);

    // log-return correlation between asset 0 and 1 is 0.012 / (0.2 * 0.3) = 0.2
    let log0: Vec<f64> = set.iter().map(|s| (1.0 + s.returns[0]).ln()).collect();
    let log1: Vec<f64> = set.iter().map(|s| (1.0 + s.returns[1]).ln()).collect();
    let m0 = log0.iter().sum::<f64>() / log0.len() as f64;
    let m1 = log1.iter().sum::<f64>() / log1.len() as f64;
    let (mut c, mut v0, mut v1) = (0.0, 0.0, 0.0);
    for (a, b) in log0.iter().zip(log1.iter()) {
      c += (a - m0) * (b - m1);
      v0 += (a - m0).powi(2);
      v1 += (b - m1).powi(2);
    }
    assert_abs_diff_eq!(c / (v0 * v1).sqrt(), 0.2, epsilon = 0.03);
  }

  #[test]
  fn degenerate_covariance_is_surfaced() {
    let mut s = stats();
    s.sigma = array![
      [0.04, 0.06, 0.0],
      [0.06, 0.04, 0.0],
      [0.0, 0.0, 0.0625]
    ];
    let err = ScenarioGenerator::new(&s, array![1.0, 1.0, 1.0], 1.0).unwrap_err();
    assert!(matches!(err, RecourseError::DegenerateCovariance { .. }));
  }

  #[test]
  fn invalid_inputs_are_configuration_errors() {
    let gen = ScenarioGenerator::new(&stats(), array![1.0, 1.0, 1.0], 1.0).unwrap();
    assert!(gen.generate(0, &LiabilityModel::default(), 1).is_err());
    let bad = LiabilityModel {
      noise_std: -1.0,
      ..LiabilityModel::default()
    };
    assert!(matches!(
      gen.generate(3, &bad, 1),
      Err(RecourseError::Configuration { .. })
    ));
    let bad_mean = LiabilityModel {
      noise_mean: f64::NAN,
      ..LiabilityModel::default()
    };
    assert!(matches!(
      gen.generate(3, &bad_mean, 1),
      Err(RecourseError::Configuration { .. })
    ));
    assert!(ScenarioGenerator::new(&stats(), array![1.0, 1.0], 1.0).is_err());
    assert!(ScenarioGenerator::new(&stats(), array![1.0, 1.0, 1.0], 0.0).is_err());
  }

  #[test]
  fn zero_noise_liability_is_constant() {
    let gen = ScenarioGenerator::new(&stats(), array![1.0, 1.0, 1.0], 1.0).unwrap();
    let flat = LiabilityModel {
      baseline: 80.0,
      noise_mean: 5.0,
      noise_std: 0.0,
    };
    let set = gen.generate(4, &flat, 3).unwrap();
    for l in set.liabilities() {
      assert_abs_diff_eq!(l, 85.0, epsilon = 1e-12);
    }
  }

  #[test]
  fn substreams_differ_per_scenario() {
    assert_ne!(substream_seed(1, 0), substream_seed(1, 1));
    assert_ne!(substream_seed(1, 0), substream_seed(2, 0));
    assert_eq!(substream_seed(9, 3), substream_seed(9, 3));
  }
}
