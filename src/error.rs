//! # Errors
//!
//! Failure taxonomy shared by every stage of the recourse pipeline.

use std::fmt;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RecourseError>;

/// One of the three linear programs solved by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Program {
  /// Full two-stage program over every scenario.
  Stochastic,
  /// Expected-value program collapsed to a single scenario.
  Deterministic,
  /// Scenario recourse with the first stage fixed to the deterministic allocation.
  RecourseOnly,
}

impl Program {
  /// Programs whose solutions must be available before this one can be built.
  pub fn dependencies(&self) -> &'static [Program] {
    match self {
      Program::Stochastic | Program::Deterministic => &[],
      Program::RecourseOnly => &[Program::Deterministic],
    }
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Program::Stochastic => write!(f, "stochastic"),
      Program::Deterministic => write!(f, "deterministic"),
      Program::RecourseOnly => write!(f, "recourse-only"),
    }
  }
}

/// Failure reported by an LP solver.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum SolveFailure {
  #[error("problem is infeasible")]
  Infeasible,
  #[error("problem is unbounded")]
  Unbounded,
  #[error("numerical failure: {0}")]
  NumericalFailure(String),
}

/// Errors raised by calibration, scenario generation, model building and solving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecourseError {
  /// Bad window, insufficient data or inconsistent inputs.
  #[error("configuration error: {message}")]
  Configuration { message: String },

  /// The correlation matrix does not admit a Cholesky factorization.
  #[error("degenerate covariance: {message}")]
  DegenerateCovariance { message: String },

  /// One of the three LP solves failed.
  #[error("{program} program failed: {kind}")]
  Solve { program: Program, kind: SolveFailure },
}

impl RecourseError {
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration {
      message: message.into(),
    }
  }

  pub fn degenerate(message: impl Into<String>) -> Self {
    Self::DegenerateCovariance {
      message: message.into(),
    }
  }

  pub fn solve(program: Program, kind: SolveFailure) -> Self {
    Self::Solve { program, kind }
  }
}
