//! # LP Solver Adapter
//!
//! $$
//! z^\* = \arg\min_{z}\ f^\top z
//! $$
//!
//! The solver is an oracle: it receives a fully built [`LpProblem`] and returns the optimal
//! decision vector and objective value, or the kind of failure.

use std::panic;
use std::panic::AssertUnwindSafe;

use minilp::ComparisonOp;
use minilp::LinearExpr;
use minilp::OptimizationDirection;
use minilp::Problem;
use ndarray::Array1;
use tracing::debug;

use crate::error::SolveFailure;
use crate::model::LinearRow;
use crate::model::LpProblem;

/// Optimal decision vector and objective value.
#[derive(Clone, Debug, PartialEq)]
pub struct LpSolution {
  pub x: Array1<f64>,
  pub objective: f64,
}

/// Minimizes a linear objective subject to linear rows and box bounds.
pub trait LpSolver: Send + Sync {
  fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveFailure>;
}

/// Dense simplex solver backed by `minilp`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimplexSolver;

fn linear_expr(vars: &[minilp::Variable], row: &LinearRow) -> LinearExpr {
  let mut expr = LinearExpr::empty();
  for &(j, a) in &row.coeffs {
    expr.add(vars[j], a);
  }
  expr
}

impl LpSolver for SimplexSolver {
  fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveFailure> {
    problem
      .validate()
      .map_err(|e| SolveFailure::NumericalFailure(e.to_string()))?;

    let mut lp = Problem::new(OptimizationDirection::Minimize);
    let vars: Vec<minilp::Variable> = problem
      .objective()
      .iter()
      .zip(problem.bounds())
      .map(|(&c, b)| lp.add_var(c, (b.lower, b.upper.unwrap_or(f64::INFINITY))))
      .collect();

    for row in problem.inequalities() {
      lp.add_constraint(linear_expr(&vars, row), ComparisonOp::Le, row.rhs);
    }
    for row in problem.equalities() {
      lp.add_constraint(linear_expr(&vars, row), ComparisonOp::Eq, row.rhs);
    }

    let solution = panic::catch_unwind(AssertUnwindSafe(|| lp.solve()))
      .map_err(|_| SolveFailure::NumericalFailure("simplex solver panicked".to_string()))?
      .map_err(|e| match e {
        minilp::Error::Infeasible => SolveFailure::Infeasible,
        minilp::Error::Unbounded => SolveFailure::Unbounded,
      })?;

    let x = Array1::from_iter(vars.iter().map(|&v| solution[v]));
    let objective = solution.objective();
    if !objective.is_finite() || x.iter().any(|v| !v.is_finite()) {
      return Err(SolveFailure::NumericalFailure(
        "solver returned non-finite values".to_string(),
      ));
    }
    debug!(vars = x.len(), objective, "simplex solve finished");

    Ok(LpSolution { x, objective })
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;
  use crate::model::Bound;
  use crate::model::VariableLayout;

  fn single_asset(objective: Array1<f64>, ineq: Vec<LinearRow>, eq: Vec<LinearRow>) -> LpProblem {
    LpProblem::new(
      objective,
      ineq,
      eq,
      vec![Bound::NON_NEGATIVE; 3],
      VariableLayout::two_stage(1, 1),
    )
    .unwrap()
  }

  #[test]
  fn solves_small_recourse_problem() {
    // 1.1 x - s + f = 50, x <= 100, min x - 0.5 s + 4 f
    let lp = single_asset(
      array![1.0, -0.5, 4.0],
      vec![LinearRow::new(vec![(0, 1.0)], 100.0)],
      vec![LinearRow::new(vec![(0, 1.1), (1, -1.0), (2, 1.0)], 50.0)],
    );
    let sol = SimplexSolver.solve(&lp).unwrap();

    assert_abs_diff_eq!(sol.x[0], 50.0 / 1.1, epsilon = 1e-6);
    assert_abs_diff_eq!(sol.x[1], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(sol.x[2], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(sol.objective, 50.0 / 1.1, epsilon = 1e-6);
    assert!(lp.is_feasible(&sol.x, 1e-6));
  }

  #[test]
  fn reports_infeasible() {
    let lp = single_asset(
      array![1.0, 0.0, 0.0],
      vec![LinearRow::new(vec![(0, 1.0)], -1.0)],
      vec![],
    );
    assert_eq!(SimplexSolver.solve(&lp), Err(SolveFailure::Infeasible));
  }

  #[test]
  fn reports_unbounded() {
    let lp = single_asset(
      array![0.0, -1.0, 0.0],
      vec![LinearRow::new(vec![(0, 1.0)], 100.0)],
      vec![],
    );
    assert_eq!(SimplexSolver.solve(&lp), Err(SolveFailure::Unbounded));
  }
}
