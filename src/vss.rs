//! # Value of the Stochastic Solution
//!
//! $$
//! \mathrm{VSS} = \mathrm{EEV} - \mathrm{RP},\qquad
//! \mathrm{EEV} = c\,\mathbf 1^\top \bar x + Q(\bar x)
//! $$
//!
//! `RP` is the optimum of the full stochastic program, `EEV` the expected cost of the
//! deterministic allocation `x̄` once its recourse is optimized scenario by scenario.

use ndarray::Array1;
use tracing::info;

/// Decomposition of the VSS into its three solves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueOfStochasticSolution {
  /// Optimal objective of the stochastic program (RP).
  pub recourse_problem: f64,
  /// Optimal objective of the deterministic program (EV).
  pub expected_value: f64,
  /// First-stage cost of the deterministic allocation.
  pub deterministic_first_stage_cost: f64,
  /// Optimal objective of the recourse-only program.
  pub recourse_only: f64,
  /// `deterministic_first_stage_cost + recourse_only` (EEV).
  pub expected_result_of_ev: f64,
  /// `EEV - RP`.
  pub vss: f64,
}

impl ValueOfStochasticSolution {
  /// Combine the three solves.
  ///
  /// `first_stage_cost` is the cost per unit of allocated capital used in every program, so the
  /// deterministic first-stage cost is `first_stage_cost * sum(x_det)`.
  pub fn compute(
    deterministic_x: &Array1<f64>,
    first_stage_cost: f64,
    expected_value: f64,
    recourse_only: f64,
    recourse_problem: f64,
  ) -> Self {
    let deterministic_first_stage_cost = first_stage_cost * deterministic_x.sum();
    let expected_result_of_ev = recourse_only + deterministic_first_stage_cost;
    let vss = expected_result_of_ev - recourse_problem;
    info!(vss, eev = expected_result_of_ev, rp = recourse_problem, "computed VSS");

    Self {
      recourse_problem,
      expected_value,
      deterministic_first_stage_cost,
      recourse_only,
      expected_result_of_ev,
      vss,
    }
  }

  /// `false` when the VSS is negative beyond `tol`, which convex recourse rules out.
  pub fn is_consistent(&self, tol: f64) -> bool {
    self.vss >= -tol * (1.0 + self.recourse_problem.abs())
  }
}
