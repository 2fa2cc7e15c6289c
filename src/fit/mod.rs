//! Model fitting.
//!
//! - `fitter`: one specification, OLS plus inference
//! - `inference`: t and F tails
//! - `suite`: every specification, singular designs skipped

pub mod fitter;
pub mod inference;
pub mod suite;

pub use fitter::*;
pub use suite::*;
