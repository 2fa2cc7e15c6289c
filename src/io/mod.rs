//! Input/output helpers.
//!
//! - delimited-text ingest (`ingest`)
//! - CSV/text report exports (`export`)
//! - fitted-model JSON (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
