//! # Scenarios
//!
//! $$
//! S_{s,i} = S_{0,i}\exp\!\Big((\mu_i-\tfrac12\Sigma_{ii})\Delta t + \sqrt{\Delta t}\sqrt{\Sigma_{ii}}\,(Lz_s)_i\Big)
//! $$
//!
//! Correlated single-step GBM asset scenarios and independent Gaussian liabilities.

pub mod correlation;
pub mod generator;
pub mod types;

pub use correlation::cholesky_lower;
pub use correlation::correlation_from_covariance;
pub use generator::substream_seed;
pub use generator::LiabilityModel;
pub use generator::ScenarioGenerator;
pub use types::ExpectedOutcome;
pub use types::Scenario;
pub use types::ScenarioSet;
