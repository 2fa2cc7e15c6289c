//! Command-line parsing for the PISA difference-in-differences tool.
//!
//! Argument parsing and command dispatch stay separate from the data and
//! modeling code; `app` turns these structs into plain config values.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "did",
    version,
    about = "PISA 2018 -> 2022 difference-in-differences analysis of reading scores"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load both survey extracts, clean, fit the four models and write all reports.
    Analyze(AnalyzeArgs),
    /// Write two synthetic PISA-shaped extracts with a known DiD effect.
    Simulate(SimulateArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct AnalyzeArgs {
    /// PISA 2018 student extract.
    #[arg(long = "pisa-2018", value_name = "CSV", env = "PISA_2018_CSV")]
    pub pisa_2018: PathBuf,

    /// PISA 2022 student extract.
    #[arg(long = "pisa-2022", value_name = "CSV", env = "PISA_2022_CSV")]
    pub pisa_2022: PathBuf,

    /// Directory for reports, charts and model outputs.
    #[arg(long, value_name = "DIR", env = "PISA_OUT_DIR", default_value = "output")]
    pub out_dir: PathBuf,

    /// Field delimiter of both input files.
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Reference country for the per-country model (default: first country code).
    #[arg(long, value_name = "CODE")]
    pub reference_country: Option<String>,

    /// Skip SVG chart rendering.
    #[arg(long)]
    pub no_charts: bool,

    /// Also write the cleaned, feature-augmented dataset to this CSV.
    #[arg(long, value_name = "CSV")]
    pub export_dataset: Option<PathBuf>,

    /// Do not print reports to stdout (files are still written).
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Directory receiving `pisa_2018.csv` and `pisa_2022.csv`.
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Students per country per survey year.
    #[arg(short = 'n', long, default_value_t = 400)]
    pub students_per_country: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Probability that a questionnaire cell is blank.
    #[arg(long, default_value_t = 0.02)]
    pub missing_rate: f64,

    /// True OECD x 2022 interaction effect in score points.
    #[arg(long, default_value_t = -8.0, allow_hyphen_values = true)]
    pub did_effect: f64,

    /// Student-level noise standard deviation.
    #[arg(long, default_value_t = 60.0)]
    pub noise_sd: f64,
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    let s = if s == "\\t" || s.eq_ignore_ascii_case("tab") { "\t" } else { s };
    match s.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(format!("delimiter must be a single ASCII character, got '{s}'")),
    }
}
