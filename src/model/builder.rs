//! # Model Builder
//!
//! $$
//! (1+r_s)^\top x - y^{+}_s + y^{-}_s = L_s \quad \forall s
//! $$
//!
//! Assembles the stochastic, deterministic and recourse-only programs from scenario data.

use impl_new_derive::ImplNew;
use ndarray::Array1;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::problem::Bound;
use super::problem::LinearRow;
use super::problem::LpProblem;
use super::problem::VariableLayout;
use crate::error::RecourseError;
use crate::error::Result;
use crate::scenarios::ExpectedOutcome;
use crate::scenarios::ScenarioSet;

/// Objective coefficients of the recourse model.
#[derive(ImplNew, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecourseCosts {
  /// Cost per unit of capital allocated today.
  pub first_stage: f64,
  /// Reward per unit of payoff above the liability.
  pub surplus_benefit: f64,
  /// Penalty per unit of liability left uncovered.
  pub shortfall_penalty: f64,
}

impl Default for RecourseCosts {
  fn default() -> Self {
    Self {
      first_stage: 1.0,
      surplus_benefit: 0.5,
      shortfall_penalty: 4.0,
    }
  }
}

impl RecourseCosts {
  /// Coefficients must be finite and non-negative, and the shortfall penalty must exceed the
  /// surplus reward, otherwise raising both recourse columns together lowers the objective
  /// without bound.
  pub fn validate(&self) -> Result<()> {
    if ![self.first_stage, self.surplus_benefit, self.shortfall_penalty]
      .iter()
      .all(|c| c.is_finite() && *c >= 0.0)
    {
      return Err(RecourseError::configuration(format!(
        "cost coefficients must be finite and non-negative, got {self:?}"
      )));
    }
    if self.shortfall_penalty <= self.surplus_benefit {
      return Err(RecourseError::configuration(format!(
        "shortfall penalty {} must exceed surplus benefit {}",
        self.shortfall_penalty, self.surplus_benefit
      )));
    }
    Ok(())
  }

  fn surplus_cost(&self) -> f64 {
    -self.surplus_benefit
  }

  fn shortfall_cost(&self) -> f64 {
    self.shortfall_penalty
  }
}

/// Builds the three LP instances sharing the first-stage block.
#[derive(Clone, Copy, Debug)]
pub struct ModelBuilder {
  budget: f64,
  costs: RecourseCosts,
}

impl ModelBuilder {
  pub fn new(budget: f64, costs: RecourseCosts) -> Result<Self> {
    if !(budget.is_finite() && budget >= 0.0) {
      return Err(RecourseError::configuration(format!(
        "budget must be finite and non-negative, got {budget}"
      )));
    }
    costs.validate()?;
    Ok(Self { budget, costs })
  }

  pub fn budget(&self) -> f64 {
    self.budget
  }

  pub fn costs(&self) -> &RecourseCosts {
    &self.costs
  }

  fn budget_row(&self, layout: &VariableLayout) -> LinearRow {
    LinearRow::new(layout.first_stage.clone().map(|j| (j, 1.0)).collect(), self.budget)
  }

  /// Full two-stage program over every scenario in `set`.
  pub fn stochastic(&self, set: &ScenarioSet) -> Result<LpProblem> {
    let n = set.n_assets();
    let layout = VariableLayout::two_stage(n, set.len());
    let p = set.probability();

    let mut objective = Array1::zeros(layout.n_vars());
    for j in layout.first_stage.clone() {
      objective[j] = self.costs.first_stage;
    }

    let mut equalities = Vec::with_capacity(set.len());
    for (block, scenario) in layout.recourse.iter().zip(set.iter()) {
      objective[block.surplus] = p * self.costs.surplus_cost();
      objective[block.shortfall] = p * self.costs.shortfall_cost();

      let mut coeffs: Vec<(usize, f64)> = scenario
        .gross_returns()
        .iter()
        .enumerate()
        .map(|(i, g)| (layout.first_stage.start + i, *g))
        .collect();
      coeffs.push((block.surplus, -1.0));
      coeffs.push((block.shortfall, 1.0));
      equalities.push(LinearRow::new(coeffs, scenario.liability));
    }

    let inequalities = vec![self.budget_row(&layout)];
    let bounds = vec![Bound::NON_NEGATIVE; layout.n_vars()];
    debug!(
      vars = layout.n_vars(),
      equalities = equalities.len(),
      "built stochastic program"
    );

    LpProblem::new(objective, inequalities, equalities, bounds, layout)
  }

  /// Expected-value program: one scenario with the expected returns and liability.
  pub fn deterministic(&self, expected: &ExpectedOutcome) -> Result<LpProblem> {
    let n = expected.returns.len();
    if n == 0 {
      return Err(RecourseError::configuration("expected outcome has no assets"));
    }
    let layout = VariableLayout::two_stage(n, 1);
    let block = layout.recourse[0];

    let mut objective = Array1::from_elem(layout.n_vars(), self.costs.first_stage);
    objective[block.surplus] = self.costs.surplus_cost();
    objective[block.shortfall] = self.costs.shortfall_cost();

    let mut coeffs: Vec<(usize, f64)> = expected
      .returns
      .iter()
      .enumerate()
      .map(|(i, r)| (i, 1.0 + r))
      .collect();
    coeffs.push((block.surplus, -1.0));
    coeffs.push((block.shortfall, 1.0));

    let equalities = vec![LinearRow::new(coeffs, expected.liability)];
    let inequalities = vec![self.budget_row(&layout)];
    let bounds = vec![Bound::NON_NEGATIVE; layout.n_vars()];
    debug!(vars = layout.n_vars(), "built deterministic program");

    LpProblem::new(objective, inequalities, equalities, bounds, layout)
  }

  /// Scenario recourse with the first stage fixed to `first_stage`.
  ///
  /// The fixed allocation moves to the right-hand side, `L_s - (1+r_s)'x`; only the expected
  /// recourse cost is minimized.
  pub fn recourse_only(&self, set: &ScenarioSet, first_stage: &Array1<f64>) -> Result<LpProblem> {
    if first_stage.len() != set.n_assets() {
      return Err(RecourseError::configuration(format!(
        "fixed first stage has {} assets, scenarios have {}",
        first_stage.len(),
        set.n_assets()
      )));
    }
    let layout = VariableLayout::recourse_only(set.len());
    let p = set.probability();

    let mut objective = Array1::zeros(layout.n_vars());
    let mut equalities = Vec::with_capacity(set.len());
    for (block, scenario) in layout.recourse.iter().zip(set.iter()) {
      objective[block.surplus] = p * self.costs.surplus_cost();
      objective[block.shortfall] = p * self.costs.shortfall_cost();

      let payoff = scenario.gross_returns().dot(first_stage);
      equalities.push(LinearRow::new(
        vec![(block.surplus, -1.0), (block.shortfall, 1.0)],
        scenario.liability - payoff,
      ));
    }

    let bounds = vec![Bound::NON_NEGATIVE; layout.n_vars()];
    debug!(vars = layout.n_vars(), "built recourse-only program");

    LpProblem::new(objective, Vec::new(), equalities, bounds, layout)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  fn two_scenarios() -> ScenarioSet {
    ScenarioSet::from_returns(
      vec![array![0.10, 0.08], array![-0.05, -0.02]],
      vec![120.0, 90.0],
    )
    .unwrap()
  }

  #[test]
  fn stochastic_program_shares_first_stage_across_scenarios() {
    let builder = ModelBuilder::new(100.0, RecourseCosts::default()).unwrap();
    let lp = builder.stochastic(&two_scenarios()).unwrap();

    assert_eq!(lp.n_vars(), 6);
    assert_eq!(lp.inequalities().len(), 1);
    assert_eq!(lp.inequalities()[0].rhs, 100.0);
    assert_eq!(lp.equalities().len(), 2);

    let row1 = &lp.equalities()[1];
    assert_eq!(row1.rhs, 90.0);
    assert_abs_diff_eq!(row1.coeffs[0].1, 0.95, epsilon = 1e-12);
    assert_abs_diff_eq!(row1.coeffs[1].1, 0.98, epsilon = 1e-12);
    assert_eq!(row1.coeffs[2..].to_vec(), vec![(4usize, -1.0), (5usize, 1.0)]);

    let f = lp.objective();
    assert_eq!(f[0], 1.0);
    assert_abs_diff_eq!(f[2], -0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(f[3], 2.0, epsilon = 1e-12);
  }

  #[test]
  fn recourse_only_moves_fixed_payoff_to_rhs() {
    let builder = ModelBuilder::new(100.0, RecourseCosts::default()).unwrap();
    let x = array![50.0, 30.0];
    let lp = builder.recourse_only(&two_scenarios(), &x).unwrap();

    assert_eq!(lp.n_vars(), 4);
    assert!(lp.inequalities().is_empty());
    assert_abs_diff_eq!(lp.equalities()[0].rhs, 120.0 - (55.0 + 32.4), epsilon = 1e-9);
    assert_abs_diff_eq!(lp.equalities()[1].rhs, 90.0 - (47.5 + 29.4), epsilon = 1e-9);
    assert_abs_diff_eq!(lp.objective()[0], -0.25, epsilon = 1e-12);
  }

  #[test]
  fn deterministic_program_has_single_recourse_pair() {
    let builder = ModelBuilder::new(100.0, RecourseCosts::default()).unwrap();
    let ev = ExpectedOutcome {
      returns: array![0.025, 0.03],
      liability: 105.0,
    };
    let lp = builder.deterministic(&ev).unwrap();
    assert_eq!(lp.n_vars(), 4);
    assert_eq!(lp.objective(), &array![1.0, 1.0, -0.5, 4.0]);
    assert_eq!(lp.equalities()[0].rhs, 105.0);
  }

  #[test]
  fn rejects_unbounded_cost_structure() {
    let costs = RecourseCosts::new(1.0, 2.0, 1.0);
    assert!(ModelBuilder::new(100.0, costs).is_err());
    assert!(ModelBuilder::new(-1.0, RecourseCosts::default()).is_err());
  }

  #[test]
  fn rejects_negative_cost_coefficients() {
    for costs in [
      RecourseCosts::new(-1.0, 0.5, 4.0),
      RecourseCosts::new(1.0, -0.5, 4.0),
      RecourseCosts::new(1.0, 0.5, f64::INFINITY),
    ] {
      assert!(matches!(
        costs.validate(),
        Err(RecourseError::Configuration { .. })
      ));
    }
    RecourseCosts::new(0.0, 0.0, 1.0).validate().unwrap();
  }
}
