//! Numerical building blocks.

pub mod ols;

pub use ols::*;
