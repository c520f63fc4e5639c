//! # Asset Panel
//!
//! $$
//! r_{t,i} = \frac{P_{t,i}}{P_{t-1,i}} - 1
//! $$
//!
//! Dated price panel over a fixed asset universe and the return series derived from it.

use chrono::NaiveDate;
use ndarray::s;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use serde::Deserialize;
use serde::Serialize;

use crate::error::RecourseError;
use crate::error::Result;

/// Inclusive date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
  pub start: NaiveDate,
  pub end: NaiveDate,
}

impl Window {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start > end {
      return Err(RecourseError::configuration(format!(
        "window start {start} is after end {end}"
      )));
    }
    Ok(Self { start, end })
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date <= self.end
  }
}

/// Ordered `(date, price-vector)` observations for `n` assets.
///
/// Rows of `prices` are dates, columns are assets.
#[derive(Clone, Debug)]
pub struct AssetPanel {
  tickers: Vec<String>,
  dates: Vec<NaiveDate>,
  prices: Array2<f64>,
}

/// Simple returns dated at the later of the two observations.
#[derive(Clone, Debug)]
pub struct ReturnPanel {
  pub dates: Vec<NaiveDate>,
  pub returns: Array2<f64>,
}

impl AssetPanel {
  /// Build a panel, checking that dates strictly increase and every price is positive.
  pub fn new(tickers: Vec<String>, dates: Vec<NaiveDate>, prices: Array2<f64>) -> Result<Self> {
    if tickers.is_empty() {
      return Err(RecourseError::configuration("panel has no assets"));
    }
    if prices.nrows() != dates.len() || prices.ncols() != tickers.len() {
      return Err(RecourseError::configuration(format!(
        "price matrix is {}x{}, expected {}x{}",
        prices.nrows(),
        prices.ncols(),
        dates.len(),
        tickers.len()
      )));
    }
    if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
      return Err(RecourseError::configuration(format!(
        "dates must be strictly increasing, found {} then {}",
        w[0], w[1]
      )));
    }
    if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
      return Err(RecourseError::configuration(
        "prices must be finite and strictly positive",
      ));
    }

    Ok(Self {
      tickers,
      dates,
      prices,
    })
  }

  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }

  pub fn tickers(&self) -> &[String] {
    &self.tickers
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn prices(&self) -> &Array2<f64> {
    &self.prices
  }

  pub fn price_row(&self, index: usize) -> ArrayView1<'_, f64> {
    self.prices.row(index)
  }

  /// Index of the first observation dated on or after `date`.
  pub fn index_on_or_after(&self, date: NaiveDate) -> Option<usize> {
    let idx = self.dates.partition_point(|d| *d < date);
    (idx < self.dates.len()).then_some(idx)
  }

  /// Prices of the first observation dated on or after `date`.
  pub fn prices_on_or_after(&self, date: NaiveDate) -> Option<(NaiveDate, Array1<f64>)> {
    self
      .index_on_or_after(date)
      .map(|i| (self.dates[i], self.prices.row(i).to_owned()))
  }

  /// Last observation, used as the current price vector for scenario generation.
  pub fn last_prices(&self) -> Option<Array1<f64>> {
    self
      .prices
      .nrows()
      .checked_sub(1)
      .map(|i| self.prices.row(i).to_owned())
  }

  /// Last observation dated on or before `date`.
  pub fn prices_on_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, Array1<f64>)> {
    let idx = self.dates.partition_point(|d| *d <= date);
    idx
      .checked_sub(1)
      .map(|i| (self.dates[i], self.prices.row(i).to_owned()))
  }

  /// Per-period simple returns for every asset.
  pub fn simple_returns(&self) -> ReturnPanel {
    let t = self.prices.nrows();
    if t < 2 {
      return ReturnPanel {
        dates: Vec::new(),
        returns: Array2::zeros((0, self.n_assets())),
      };
    }

    let prev = self.prices.slice(s![..t - 1, ..]);
    let next = self.prices.slice(s![1.., ..]);
    let returns = &next / &prev - 1.0;

    ReturnPanel {
      dates: self.dates[1..].to_vec(),
      returns,
    }
  }
}

impl ReturnPanel {
  /// Rows whose dates fall inside `window`.
  pub fn restrict(&self, window: &Window) -> ReturnPanel {
    let lo = self.dates.partition_point(|d| *d < window.start);
    let hi = self.dates.partition_point(|d| *d <= window.end);
    let hi = hi.max(lo);

    ReturnPanel {
      dates: self.dates[lo..hi].to_vec(),
      returns: self.returns.slice(s![lo..hi, ..]).to_owned(),
    }
  }

  pub fn len(&self) -> usize {
    self.dates.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty()
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use approx::assert_abs_diff_eq;
  use chrono::Duration;
  use ndarray::array;

  use super::*;

  pub(crate) fn weekly_dates(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n).map(|i| start + Duration::weeks(i as i64)).collect()
  }

  pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn simple_returns_are_dated_at_later_observation() {
    let dates = weekly_dates(date(2020, 1, 3), 3);
    let prices = array![[100.0, 50.0], [110.0, 45.0], [99.0, 54.0]];
    let panel = AssetPanel::new(vec!["A".into(), "B".into()], dates.clone(), prices).unwrap();

    let rets = panel.simple_returns();
    assert_eq!(rets.dates, dates[1..].to_vec());
    assert_abs_diff_eq!(rets.returns[[0, 0]], 0.10, epsilon = 1e-12);
    assert_abs_diff_eq!(rets.returns[[0, 1]], -0.10, epsilon = 1e-12);
    assert_abs_diff_eq!(rets.returns[[1, 0]], -0.10, epsilon = 1e-12);
    assert_abs_diff_eq!(rets.returns[[1, 1]], 0.20, epsilon = 1e-12);
  }

  #[test]
  fn panel_rejects_unordered_dates_and_bad_prices() {
    let d = date(2020, 1, 3);
    let unordered = AssetPanel::new(vec!["A".into()], vec![d, d], array![[1.0], [2.0]]);
    assert!(matches!(
      unordered,
      Err(RecourseError::Configuration { .. })
    ));

    let negative = AssetPanel::new(
      vec!["A".into()],
      weekly_dates(d, 2),
      array![[1.0], [-2.0]],
    );
    assert!(negative.is_err());

    let shape = AssetPanel::new(vec!["A".into(), "B".into()], weekly_dates(d, 2), array![[1.0], [2.0]]);
    assert!(shape.is_err());
  }

  #[test]
  fn restrict_keeps_inclusive_window() {
    let dates = weekly_dates(date(2020, 1, 3), 6);
    let prices = Array2::from_shape_fn((6, 1), |(t, _)| 100.0 + t as f64);
    let panel = AssetPanel::new(vec!["A".into()], dates.clone(), prices).unwrap();

    let window = Window::new(dates[2], dates[4]).unwrap();
    let rets = panel.simple_returns().restrict(&window);
    assert_eq!(rets.dates, vec![dates[2], dates[3], dates[4]]);
    assert_eq!(rets.returns.nrows(), 3);
  }

  #[test]
  fn lookups_by_date() {
    let dates = weekly_dates(date(2020, 1, 3), 3);
    let prices = array![[1.0], [2.0], [3.0]];
    let panel = AssetPanel::new(vec!["A".into()], dates.clone(), prices).unwrap();

    let (d, p) = panel.prices_on_or_after(date(2020, 1, 4)).unwrap();
    assert_eq!(d, dates[1]);
    assert_eq!(p[0], 2.0);
    let (d, p) = panel.prices_on_or_before(date(2020, 1, 16)).unwrap();
    assert_eq!(d, dates[1]);
    assert_eq!(p[0], 2.0);
    assert!(panel.prices_on_or_after(date(2021, 1, 1)).is_none());
    assert!(Window::new(dates[2], dates[0]).is_err());
  }
}
