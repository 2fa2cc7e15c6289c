//! Reporting: formatted text for the terminal and `.txt` outputs.

pub mod format;

pub use format::*;
