//! Data preparation stages.
//!
//! raw table -> harmonized records -> cleaned records -> feature rows,
//! plus descriptive summaries and the synthetic extract generator.

pub mod clean;
pub mod describe;
pub mod features;
pub mod harmonize;
pub mod sample;

pub use clean::{clean, missing_report, MissingReport};
pub use features::derive_features;
pub use harmonize::{concat, harmonize, HarmonizedTable};
