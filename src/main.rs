use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use chrono::Duration;
use chrono::NaiveDate;
use clap::Parser;
use liability_recourse::calibration::ReturnStatistics;
use liability_recourse::data::AssetPanel;
use liability_recourse::data::Window;
use liability_recourse::scenarios::ScenarioGenerator;
use liability_recourse::RecourseConfig;
use liability_recourse::RecoursePipeline;
use ndarray::array;
use ndarray::Array2;
use prettytable::row;
use prettytable::Table;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Demo weeks of synthetic history.
const HISTORY_WEEKS: usize = 260;
const CALIBRATION_WEEKS: usize = 208;

#[derive(Parser)]
#[command(name = "liability-recourse")]
#[command(about = "Two-stage stochastic allocation against an uncertain liability")]
struct Cli {
  /// JSON configuration file
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the random seed
  #[arg(long)]
  seed: Option<u64>,

  /// Override the number of scenarios
  #[arg(long)]
  scenarios: Option<usize>,

  /// Seed of the synthetic price history
  #[arg(long, default_value_t = 2015)]
  history_seed: u64,
}

/// Weekly prices for three assets stepped with the crate's own correlated GBM sampler.
fn synthetic_panel(seed: u64) -> Result<AssetPanel> {
  let stats = ReturnStatistics {
    mu: array![0.08, 0.05, 0.02],
    sigma: array![
      [0.0400, 0.0120, 0.0010],
      [0.0120, 0.0225, 0.0015],
      [0.0010, 0.0015, 0.0025]
    ],
    observations: 0,
  };
  let p0 = array![100.0, 60.0, 25.0];
  let sampler = ScenarioGenerator::new(&stats, p0.clone(), 1.0 / 52.0)?;
  let mut rng = StdRng::seed_from_u64(seed);

  let start = NaiveDate::from_ymd_opt(2015, 1, 2).context("invalid start date")?;
  let dates = (0..HISTORY_WEEKS)
    .map(|w| start + Duration::weeks(w as i64))
    .collect();

  let mut prices = Array2::zeros((HISTORY_WEEKS, 3));
  let mut p = p0;
  for t in 0..HISTORY_WEEKS {
    prices.row_mut(t).assign(&p);
    p = sampler.step(&p, &mut rng);
  }

  Ok(AssetPanel::new(
    vec!["EQUITY".into(), "CREDIT".into(), "CASH".into()],
    dates,
    prices,
  )?)
}

fn main() -> Result<()> {
  tracing_subscriber::registry()
    .with(tracing_subscriber::fmt::layer())
    .with(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();

  let mut config = match &cli.config {
    Some(path) => {
      let json = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
      RecourseConfig::from_json_str(&json)?
    }
    None => RecourseConfig::default(),
  };
  if let Some(seed) = cli.seed {
    config.seed = seed;
  }
  if let Some(n) = cli.scenarios {
    config.n_scenarios = n;
  }

  let panel = synthetic_panel(cli.history_seed)?;
  let dates = panel.dates().to_vec();
  if config.calibration_window.is_none() {
    config.calibration_window = Some(Window::new(dates[0], dates[CALIBRATION_WEEKS - 1])?);
  }
  if config.tracking_window.is_none() {
    config.tracking_window = Some(Window::new(
      dates[CALIBRATION_WEEKS - 1],
      dates[HISTORY_WEEKS - 1],
    )?);
  }

  let pipeline = RecoursePipeline::new(config)?;
  let report = pipeline.run(&panel)?;
  info!(vss = report.vss(), "pipeline finished");

  let allocation = report.allocation();
  let deterministic = report.solves.deterministic.first_stage();
  let mut table = Table::new();
  table.add_row(row!["Asset", "mu", "vol", "Stochastic x", "Deterministic x"]);
  let vols = report.statistics.volatilities();
  for (i, ticker) in panel.tickers().iter().enumerate() {
    table.add_row(row![
      ticker,
      format!("{:.4}", report.statistics.mu[i]),
      format!("{:.4}", vols[i]),
      format!("{:.2}", allocation[i]),
      format!("{:.2}", deterministic[i])
    ]);
  }
  table.printstd();

  let vss = &report.solves.vss;
  let mut summary = Table::new();
  summary.add_row(row!["Measure", "Value"]);
  summary.add_row(row!["Scenarios", report.scenarios.len()]);
  summary.add_row(row!["RP (stochastic objective)", format!("{:.4}", vss.recourse_problem)]);
  summary.add_row(row!["EV (deterministic objective)", format!("{:.4}", vss.expected_value)]);
  summary.add_row(row!["EEV", format!("{:.4}", vss.expected_result_of_ev)]);
  summary.add_row(row!["VSS", format!("{:.4}", vss.vss)]);
  summary.add_row(row!["VSS sign consistent", report.vss_consistent]);
  summary.printstd();

  if let Some(tracker) = pipeline.track(&panel, &report)? {
    let mut tracked = Table::new();
    tracked.add_row(row!["Date", "Portfolio value"]);
    for (date, value) in tracker.track().step_by(4) {
      tracked.add_row(row![date, format!("{value:.2}")]);
    }
    tracked.printstd();
  }

  Ok(())
}
