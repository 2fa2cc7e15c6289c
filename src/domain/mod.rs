//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - survey labels (`SurveyYear`, `Gender`, `OecdStatus`, `PerformanceGroup`)
//! - harmonized rows (`StudentRecord`) and feature rows (`AnalysisRow`)
//! - run configuration (`AnalysisConfig`, `SimulateConfig`)

pub mod types;

pub use types::*;
