//! Fitted values over explicit covariate grids.

pub mod grid;

pub use grid::*;
