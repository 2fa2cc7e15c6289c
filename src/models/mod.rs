//! Regression model specifications and their design-matrix encoding.

pub mod design;
pub mod spec;

pub use design::*;
pub use spec::*;
