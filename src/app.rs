//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments
//! - runs the analysis pipeline or the simulator
//! - prints reports and writes every output file

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Parser;
use env_logger::Env;

use crate::app::pipeline::{ModelResults, PreparedData};
use crate::cli::{AnalyzeArgs, Command, SimulateArgs};
use crate::domain::{AnalysisConfig, SimulateConfig, SurveyYear};
use crate::error::AppError;
use crate::io::{
    ensure_dir, write_did_cells_csv, write_missing_report_csv, write_models_json, write_predictions_csv,
    write_raw_table, write_records_csv, write_text, ModelsFile,
};
use crate::plot::DidChart;
use crate::predict::chart_slice;
use crate::report;

pub mod pipeline;

/// Entry point for the `did` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Analyze(args) => analyze(&analysis_config_from_args(&args)).map(|_| ()),
        Command::Simulate(args) => simulate(&simulate_config_from_args(&args)).map(|_| ()),
    }
}

/// What an `analyze` run computed and wrote.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub prepared: PreparedData,
    pub results: ModelResults,
    pub written: Vec<PathBuf>,
}

/// Run the full analysis and write every report under `config.out_dir`.
pub fn analyze(config: &AnalysisConfig) -> Result<AnalysisOutcome, AppError> {
    ensure_dir(&config.out_dir)?;
    let generated_at = Utc::now();

    let (raw_2018, raw_2022) = pipeline::load_inputs(config)?;
    let prepared = pipeline::prepare(&raw_2018, &raw_2022)?;
    let mut written = write_data_reports(&config.out_dir, &prepared)?;

    if let Some(path) = &config.export_dataset {
        crate::io::write_dataset_csv(path, &prepared.dataset)?;
        written.push(path.clone());
    }

    if config.print_reports {
        println!("{}", report::format_run_header(&prepared.dataset, generated_at));
        for ((year, column), n) in &prepared.coercion_failures {
            println!("Coercion failures {year} {column}: {n}");
        }
        println!("{}", report::format_missing_report(&prepared.missing));
        println!("Rows dropped by listwise deletion: {}\n", prepared.rows_dropped());
        println!("{}", report::format_descriptives(&prepared.descriptives));
        println!("{}", report::format_categorical(&prepared.categorical));
        println!("{}", report::format_did_cells(&prepared.did_cells));
    }

    // Data reports are already on disk when no model can be fitted.
    let results = pipeline::fit_models(&prepared.dataset, config.reference_country.as_deref())?;
    written.extend(write_model_reports(config, &prepared, &results, generated_at)?);

    if config.print_reports {
        for out in &results.outputs {
            println!("{}", report::format_model_summary(&out.fit));
        }
        println!("{}", report::format_suite_overview(&results.suite()));
    }

    log::info!("Wrote {} files to {}", written.len(), config.out_dir.display());
    Ok(AnalysisOutcome {
        prepared,
        results,
        written,
    })
}

fn write_data_reports(dir: &Path, prepared: &PreparedData) -> Result<Vec<PathBuf>, AppError> {
    let missing = dir.join("missing_report.csv");
    write_missing_report_csv(&missing, &prepared.missing)?;
    let descriptives = dir.join("descriptives.csv");
    write_records_csv(&descriptives, &prepared.descriptives)?;
    let categorical = dir.join("categorical.csv");
    write_records_csv(&categorical, &prepared.categorical)?;
    let cells = dir.join("did_cell_means.csv");
    write_did_cells_csv(&cells, &prepared.did_cells)?;
    Ok(vec![missing, descriptives, categorical, cells])
}

fn write_model_reports(
    config: &AnalysisConfig,
    prepared: &PreparedData,
    results: &ModelResults,
    generated_at: chrono::DateTime<Utc>,
) -> Result<Vec<PathBuf>, AppError> {
    let dir = &config.out_dir;
    let mut written = Vec::new();

    for out in &results.outputs {
        let slug = &out.fit.spec.slug;

        let summary = dir.join(format!("model_{slug}.txt"));
        write_text(&summary, &report::format_model_summary(&out.fit))?;
        written.push(summary);

        let predictions = dir.join(format!("predictions_{slug}.csv"));
        write_predictions_csv(&predictions, &out.predictions)?;
        written.push(predictions);

        if config.charts {
            let chart = dir.join(format!("chart_{slug}.svg"));
            DidChart::from_predictions(&out.fit.spec.title, &chart_slice(&out.fit, &out.predictions))?
                .render_svg(&chart)?;
            written.push(chart);
        }
    }

    let json = dir.join("models.json");
    write_models_json(&json, &ModelsFile::new(&results.suite(), &prepared.dataset, generated_at))?;
    written.push(json);

    Ok(written)
}

/// Generate and write both synthetic extracts; returns their paths.
pub fn simulate(config: &SimulateConfig) -> Result<Vec<PathBuf>, AppError> {
    ensure_dir(&config.out_dir)?;
    let extracts = crate::data::sample::simulate(config)?;

    let mut written = Vec::new();
    for (year, table) in [(SurveyYear::Y2018, &extracts.pisa_2018), (SurveyYear::Y2022, &extracts.pisa_2022)] {
        let path = config.out_dir.join(crate::data::sample::file_name(year));
        write_raw_table(&path, table, b',')?;
        log::info!("Wrote {} rows to {}", table.len(), path.display());
        written.push(path);
    }
    Ok(written)
}

pub fn analysis_config_from_args(args: &AnalyzeArgs) -> AnalysisConfig {
    AnalysisConfig {
        pisa_2018: args.pisa_2018.clone(),
        pisa_2022: args.pisa_2022.clone(),
        out_dir: args.out_dir.clone(),
        delimiter: args.delimiter,
        reference_country: args
            .reference_country
            .as_ref()
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty()),
        charts: !args.no_charts,
        export_dataset: args.export_dataset.clone(),
        print_reports: !args.quiet,
    }
}

pub fn simulate_config_from_args(args: &SimulateArgs) -> SimulateConfig {
    SimulateConfig {
        out_dir: args.out_dir.clone(),
        students_per_country: args.students_per_country,
        seed: args.seed,
        missing_rate: args.missing_rate,
        did_effect: args.did_effect,
        noise_sd: args.noise_sd,
    }
}
