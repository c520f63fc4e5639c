//! # Backtest
//!
//! $$
//! V_t = \sum_i P_{t,i}\,\frac{x_i}{P_{t_0,i}}
//! $$
//!
//! Out-of-sample tracking of a first-stage allocation held as fixed share counts.

use std::ops::Range;

use chrono::NaiveDate;
use ndarray::Array1;
use tracing::debug;

use crate::data::AssetPanel;
use crate::data::Window;
use crate::error::RecourseError;
use crate::error::Result;

/// Buy-and-hold tracker over a window of the panel.
#[derive(Clone, Debug)]
pub struct BacktestTracker<'a> {
  panel: &'a AssetPanel,
  shares: Array1<f64>,
  rows: Range<usize>,
}

impl<'a> BacktestTracker<'a> {
  /// Convert `allocation` (currency per asset) into shares at the first price on or after
  /// `window.start`.
  pub fn new(panel: &'a AssetPanel, allocation: &Array1<f64>, window: &Window) -> Result<Self> {
    if allocation.len() != panel.n_assets() {
      return Err(RecourseError::configuration(format!(
        "allocation covers {} assets, panel has {}",
        allocation.len(),
        panel.n_assets()
      )));
    }

    let start = panel
      .index_on_or_after(window.start)
      .filter(|&i| panel.dates()[i] <= window.end)
      .ok_or_else(|| {
        RecourseError::configuration(format!(
          "no prices inside tracking window {}..={}",
          window.start, window.end
        ))
      })?;
    let end = panel.dates().partition_point(|d| *d <= window.end);

    let shares = allocation / &panel.price_row(start);
    debug!(start = %panel.dates()[start], observations = end - start, "tracking allocation");

    Ok(Self {
      panel,
      shares,
      rows: start..end,
    })
  }

  pub fn shares(&self) -> &Array1<f64> {
    &self.shares
  }

  /// `(date, value)` pairs from the start of the window, restartable by calling again.
  pub fn track(&self) -> TrackedValues<'_> {
    TrackedValues {
      panel: self.panel,
      shares: &self.shares,
      rows: self.rows.clone(),
    }
  }
}

/// Lazy sequence of realized portfolio values.
#[derive(Clone, Debug)]
pub struct TrackedValues<'a> {
  panel: &'a AssetPanel,
  shares: &'a Array1<f64>,
  rows: Range<usize>,
}

impl Iterator for TrackedValues<'_> {
  type Item = (NaiveDate, f64);

  fn next(&mut self) -> Option<Self::Item> {
    let t = self.rows.next()?;
    Some((self.panel.dates()[t], self.panel.price_row(t).dot(self.shares)))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    self.rows.size_hint()
  }
}

impl ExactSizeIterator for TrackedValues<'_> {}
