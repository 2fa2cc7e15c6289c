//! `pisa-did` library crate.
//!
//! The binary (`did`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - each stage (load, harmonize, clean, features, fit, predict) is reusable on its own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod predict;
pub mod report;
