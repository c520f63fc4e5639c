//! # liability-recourse
//!
//! $$
//! \min_{x\ge 0}\ c^\top x + \sum_{s=1}^{S} p_s\left(-q^{+} y_s^{+} + q^{-} y_s^{-}\right)
//! \quad\text{s.t.}\quad \mathbf 1^\top x \le B,\ (1+r_s)^\top x - y_s^{+} + y_s^{-} = L_s
//! $$
//!
//! Two-stage stochastic linear programming for matching a portfolio to an uncertain liability.
//!
//! ## Modules
//!
//! | Module          | Description                                                                 |
//! |-----------------|-----------------------------------------------------------------------------|
//! | [`data`]        | Dated asset price panel and return extraction.                              |
//! | [`calibration`] | Annualized geometric mean returns and sample covariance over a window.      |
//! | [`scenarios`]   | Correlated single-step GBM asset scenarios and Gaussian liabilities.        |
//! | [`model`]       | LP instances for the stochastic, deterministic and recourse-only programs.  |
//! | [`solver`]      | Black-box LP solver adapter.                                                |
//! | [`vss`]         | Value of the Stochastic Solution.                                           |
//! | [`pipeline`]    | Calibration → scenarios → solves → VSS, with an explicit solve graph.       |
//! | [`backtest`]    | Out-of-sample value tracking of the chosen allocation.                      |
//! | [`config`]      | Recognized configuration options.                                           |

pub mod backtest;
pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod scenarios;
pub mod solver;
pub mod vss;

pub use config::RecourseConfig;
pub use error::RecourseError;
pub use error::Result;
pub use pipeline::PipelineReport;
pub use pipeline::RecoursePipeline;
