//! # Stochastic LP Model
//!
//! $$
//! \min_{z}\ f^\top z \quad\text{s.t.}\quad Az\le b,\ A_{eq}z=b_{eq},\ \ell\le z\le u
//! $$
//!
//! Flat LP instances for the two-stage recourse program, its expected-value approximation and
//! the recourse-only evaluation of a fixed first stage.

pub mod builder;
pub mod problem;

pub use builder::ModelBuilder;
pub use builder::RecourseCosts;
pub use problem::Bound;
pub use problem::LinearRow;
pub use problem::LpProblem;
pub use problem::RecourseBlock;
pub use problem::VariableLayout;
