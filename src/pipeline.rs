//! # Recourse Pipeline
//!
//! $$
//! \text{calibrate}\to\text{scenarios}\to
//! \begin{cases}\text{stochastic}\\ \text{deterministic}\to\text{recourse-only}\end{cases}
//! \to \mathrm{VSS}
//! $$
//!
//! High-level orchestration of the three solves. The stochastic program is independent of the
//! deterministic chain and runs on the rayon pool next to it when `parallel_solves` is set.

use ndarray::Array1;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backtest::BacktestTracker;
use crate::calibration::calibrate;
use crate::calibration::ReturnStatistics;
use crate::config::RecourseConfig;
use crate::data::AssetPanel;
use crate::data::Window;
use crate::error::Program;
use crate::error::RecourseError;
use crate::error::Result;
use crate::model::LpProblem;
use crate::model::ModelBuilder;
use crate::scenarios::ExpectedOutcome;
use crate::scenarios::ScenarioGenerator;
use crate::scenarios::ScenarioSet;
use crate::solver::LpSolution;
use crate::solver::LpSolver;
use crate::solver::SimplexSolver;
use crate::vss::ValueOfStochasticSolution;

/// A built program together with its optimal solution.
#[derive(Clone, Debug)]
pub struct SolvedProgram {
  pub program: Program,
  pub problem: LpProblem,
  pub solution: LpSolution,
}

impl SolvedProgram {
  pub fn objective(&self) -> f64 {
    self.solution.objective
  }

  /// First-stage allocation; empty for the recourse-only program.
  pub fn first_stage(&self) -> Array1<f64> {
    self.problem.layout().first_stage_values(&self.solution.x)
  }

  /// `(surplus, shortfall)` chosen in `scenario`.
  pub fn recourse(&self, scenario: usize) -> Option<(f64, f64)> {
    self
      .problem
      .layout()
      .recourse_values(&self.solution.x, scenario)
  }
}

/// Results of the three solves and the VSS built from them.
#[derive(Clone, Debug)]
pub struct SolveResults {
  pub stochastic: SolvedProgram,
  pub deterministic: SolvedProgram,
  pub recourse_only: SolvedProgram,
  pub vss: ValueOfStochasticSolution,
}

/// Everything produced by one pipeline run.
#[derive(Clone, Debug)]
pub struct PipelineReport {
  pub statistics: ReturnStatistics,
  pub scenarios: ScenarioSet,
  pub expected: ExpectedOutcome,
  pub solves: SolveResults,
  /// Whether the VSS sign is within solver tolerance.
  pub vss_consistent: bool,
}

impl PipelineReport {
  /// First-stage allocation of the stochastic program.
  pub fn allocation(&self) -> Array1<f64> {
    self.solves.stochastic.first_stage()
  }

  pub fn vss(&self) -> f64 {
    self.solves.vss.vss
  }
}

/// Calibration, scenario generation, the three solves and VSS, with explicit configuration.
#[derive(Clone, Debug)]
pub struct RecoursePipeline<S: LpSolver = SimplexSolver> {
  config: RecourseConfig,
  solver: S,
}

impl RecoursePipeline<SimplexSolver> {
  pub fn new(config: RecourseConfig) -> Result<Self> {
    Self::with_solver(config, SimplexSolver)
  }
}

impl<S: LpSolver> RecoursePipeline<S> {
  pub fn with_solver(config: RecourseConfig, solver: S) -> Result<Self> {
    config.validate()?;
    Ok(Self { config, solver })
  }

  pub fn config(&self) -> &RecourseConfig {
    &self.config
  }

  fn builder(&self) -> Result<ModelBuilder> {
    ModelBuilder::new(self.config.budget, self.config.costs)
  }

  /// Calibration window, defaulting to the whole panel.
  pub fn calibration_window(&self, panel: &AssetPanel) -> Result<Window> {
    match self.config.calibration_window {
      Some(w) => Ok(w),
      None => match (panel.dates().first(), panel.dates().last()) {
        (Some(&start), Some(&end)) => Window::new(start, end),
        _ => Err(RecourseError::configuration("asset panel is empty")),
      },
    }
  }

  pub fn calibrate(&self, panel: &AssetPanel) -> Result<ReturnStatistics> {
    let window = self.calibration_window(panel)?;
    calibrate(panel, &window, self.config.annualization_factor)
  }

  /// Scenarios starting from `initial_prices`.
  pub fn generate(
    &self,
    stats: &ReturnStatistics,
    initial_prices: Array1<f64>,
  ) -> Result<ScenarioSet> {
    ScenarioGenerator::new(stats, initial_prices, self.config.dt)?.generate(
      self.config.n_scenarios,
      &self.config.liability,
      self.config.seed,
    )
  }

  /// Deterministic inputs implied by the calibrated statistics.
  pub fn expected_outcome(&self, stats: &ReturnStatistics) -> ExpectedOutcome {
    ExpectedOutcome::from_statistics(stats, self.config.dt, self.config.liability.expected())
  }

  fn solve_program(&self, program: Program, problem: LpProblem) -> Result<SolvedProgram> {
    debug!(%program, depends_on = ?program.dependencies(), vars = problem.n_vars(), "solving");
    let solution = self
      .solver
      .solve(&problem)
      .map_err(|kind| RecourseError::solve(program, kind))?;
    info!(%program, objective = solution.objective, "solved");

    Ok(SolvedProgram {
      program,
      problem,
      solution,
    })
  }

  /// Run the solve graph: stochastic alongside deterministic → recourse-only, then VSS.
  pub fn solve(&self, set: &ScenarioSet, expected: &ExpectedOutcome) -> Result<SolveResults> {
    let builder = self.builder()?;

    let stochastic = || -> Result<SolvedProgram> {
      self.solve_program(Program::Stochastic, builder.stochastic(set)?)
    };
    let deterministic_chain = || -> Result<(SolvedProgram, SolvedProgram)> {
      let deterministic = self.solve_program(Program::Deterministic, builder.deterministic(expected)?)?;
      let fixed = deterministic.first_stage();
      let recourse_only =
        self.solve_program(Program::RecourseOnly, builder.recourse_only(set, &fixed)?)?;
      Ok((deterministic, recourse_only))
    };

    let (stochastic, chain) = if self.config.parallel_solves {
      rayon::join(stochastic, deterministic_chain)
    } else {
      (stochastic(), deterministic_chain())
    };
    let stochastic = stochastic?;
    let (deterministic, recourse_only) = chain?;

    let vss = ValueOfStochasticSolution::compute(
      &deterministic.first_stage(),
      builder.costs().first_stage,
      deterministic.objective(),
      recourse_only.objective(),
      stochastic.objective(),
    );

    Ok(SolveResults {
      stochastic,
      deterministic,
      recourse_only,
      vss,
    })
  }

  /// Calibrate on `panel`, generate scenarios from the prices at the end of the calibration
  /// window, solve and compute the VSS.
  pub fn run(&self, panel: &AssetPanel) -> Result<PipelineReport> {
    let window = self.calibration_window(panel)?;
    let statistics = calibrate(panel, &window, self.config.annualization_factor)?;
    let (as_of, initial_prices) = panel.prices_on_or_before(window.end).ok_or_else(|| {
      RecourseError::configuration(format!("no prices on or before {}", window.end))
    })?;
    debug!(%as_of, "scenario start prices");

    let scenarios = self.generate(&statistics, initial_prices)?;
    let expected = self.expected_outcome(&statistics);
    let solves = self.solve(&scenarios, &expected)?;
    let vss_consistent = vss_sign_check(&solves.vss, self.config.vss_tolerance);

    Ok(PipelineReport {
      statistics,
      scenarios,
      expected,
      solves,
      vss_consistent,
    })
  }

  /// Tracker over the configured tracking window for the stochastic allocation.
  pub fn track<'a>(
    &self,
    panel: &'a AssetPanel,
    report: &PipelineReport,
  ) -> Result<Option<BacktestTracker<'a>>> {
    self
      .config
      .tracking_window
      .map(|w| BacktestTracker::new(panel, &report.allocation(), &w))
      .transpose()
  }
}

/// Sign check of the VSS, logged once per run.
fn vss_sign_check(vss: &ValueOfStochasticSolution, tol: f64) -> bool {
  let consistent = vss.is_consistent(tol);
  if !consistent {
    warn!(vss = vss.vss, tol, "negative VSS beyond solver tolerance");
  }
  consistent
}
