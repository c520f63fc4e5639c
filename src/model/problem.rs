use std::ops::Range;

use ndarray::Array1;

use crate::error::RecourseError;
use crate::error::Result;

/// Sparse linear row `sum(coeff * z[index]) (<=|=) rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearRow {
  pub coeffs: Vec<(usize, f64)>,
  pub rhs: f64,
}

impl LinearRow {
  pub fn new(coeffs: Vec<(usize, f64)>, rhs: f64) -> Self {
    Self { coeffs, rhs }
  }

  pub fn eval(&self, z: &Array1<f64>) -> f64 {
    self.coeffs.iter().map(|&(j, a)| a * z[j]).sum()
  }
}

/// Box bound on one decision variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound {
  pub lower: f64,
  pub upper: Option<f64>,
}

impl Bound {
  pub const NON_NEGATIVE: Bound = Bound {
    lower: 0.0,
    upper: None,
  };
}

/// Surplus and shortfall columns owned by one scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecourseBlock {
  pub scenario: usize,
  pub surplus: usize,
  pub shortfall: usize,
}

/// Column layout: a shared first-stage block followed by scenario-local recourse blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariableLayout {
  /// Columns of the first-stage allocation. Empty when the first stage is fixed.
  pub first_stage: Range<usize>,
  /// Recourse columns indexed by scenario.
  pub recourse: Vec<RecourseBlock>,
}

impl VariableLayout {
  /// Layout with `n_assets` first-stage columns and `n_scenarios` recourse pairs.
  pub fn two_stage(n_assets: usize, n_scenarios: usize) -> Self {
    let recourse = (0..n_scenarios)
      .map(|s| RecourseBlock {
        scenario: s,
        surplus: n_assets + 2 * s,
        shortfall: n_assets + 2 * s + 1,
      })
      .collect();

    Self {
      first_stage: 0..n_assets,
      recourse,
    }
  }

  /// Layout with no free first stage, only recourse pairs.
  pub fn recourse_only(n_scenarios: usize) -> Self {
    Self::two_stage(0, n_scenarios)
  }

  pub fn n_vars(&self) -> usize {
    self.first_stage.len() + 2 * self.recourse.len()
  }

  pub fn first_stage_values(&self, z: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(self.first_stage.clone().map(|j| z[j]))
  }

  /// `(surplus, shortfall)` chosen for `scenario`.
  pub fn recourse_values(&self, z: &Array1<f64>, scenario: usize) -> Option<(f64, f64)> {
    self
      .recourse
      .get(scenario)
      .map(|b| (z[b.surplus], z[b.shortfall]))
  }
}

/// Linear program `min f'z` over inequality rows, equality rows and box bounds.
///
/// Built once per solve and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct LpProblem {
  objective: Array1<f64>,
  inequalities: Vec<LinearRow>,
  equalities: Vec<LinearRow>,
  bounds: Vec<Bound>,
  layout: VariableLayout,
}

impl LpProblem {
  pub fn new(
    objective: Array1<f64>,
    inequalities: Vec<LinearRow>,
    equalities: Vec<LinearRow>,
    bounds: Vec<Bound>,
    layout: VariableLayout,
  ) -> Result<Self> {
    let problem = Self {
      objective,
      inequalities,
      equalities,
      bounds,
      layout,
    };
    problem.validate()?;
    Ok(problem)
  }

  /// Check dimensions, column indices and finiteness.
  pub fn validate(&self) -> Result<()> {
    let n = self.objective.len();
    if self.bounds.len() != n || self.layout.n_vars() != n {
      return Err(RecourseError::configuration(format!(
        "objective has {n} columns, bounds {}, layout {}",
        self.bounds.len(),
        self.layout.n_vars()
      )));
    }
    if self.objective.iter().any(|c| !c.is_finite()) {
      return Err(RecourseError::configuration("objective must be finite"));
    }
    for row in self.inequalities.iter().chain(self.equalities.iter()) {
      if !row.rhs.is_finite() {
        return Err(RecourseError::configuration("constraint rhs must be finite"));
      }
      if let Some(&(j, a)) = row
        .coeffs
        .iter()
        .find(|(j, a)| *j >= n || !a.is_finite())
      {
        return Err(RecourseError::configuration(format!(
          "invalid coefficient {a} on column {j} of {n}"
        )));
      }
    }
    for b in &self.bounds {
      if !b.lower.is_finite() || b.upper.is_some_and(|u| !(u >= b.lower)) {
        return Err(RecourseError::configuration(format!(
          "invalid bound [{}, {:?}]",
          b.lower, b.upper
        )));
      }
    }
    Ok(())
  }

  pub fn n_vars(&self) -> usize {
    self.objective.len()
  }

  pub fn objective(&self) -> &Array1<f64> {
    &self.objective
  }

  pub fn inequalities(&self) -> &[LinearRow] {
    &self.inequalities
  }

  pub fn equalities(&self) -> &[LinearRow] {
    &self.equalities
  }

  pub fn bounds(&self) -> &[Bound] {
    &self.bounds
  }

  pub fn layout(&self) -> &VariableLayout {
    &self.layout
  }

  pub fn evaluate(&self, z: &Array1<f64>) -> f64 {
    self.objective.dot(z)
  }

  /// `lhs - rhs` per equality row.
  pub fn equality_residuals(&self, z: &Array1<f64>) -> Vec<f64> {
    self.equalities.iter().map(|r| r.eval(z) - r.rhs).collect()
  }

  /// `rhs - lhs` per inequality row; negative means violated.
  pub fn inequality_slacks(&self, z: &Array1<f64>) -> Vec<f64> {
    self.inequalities.iter().map(|r| r.rhs - r.eval(z)).collect()
  }

  /// Whether `z` satisfies every row and bound within `tol`.
  pub fn is_feasible(&self, z: &Array1<f64>, tol: f64) -> bool {
    z.len() == self.n_vars()
      && self.equality_residuals(z).iter().all(|r| r.abs() <= tol)
      && self.inequality_slacks(z).iter().all(|s| *s >= -tol)
      && self
        .bounds
        .iter()
        .zip(z.iter())
        .all(|(b, v)| *v >= b.lower - tol && b.upper.map_or(true, |u| *v <= u + tol))
  }
}
