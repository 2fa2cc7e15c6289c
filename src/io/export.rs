//! CSV and text exports.
//!
//! Report tables are meant to be easy to consume in spreadsheets or downstream
//! scripts; every writer creates (or truncates) its target file.

use std::fs;
use std::path::Path;

use csv::{Writer, WriterBuilder};
use serde::Serialize;

use crate::data::clean::MissingReport;
use crate::data::describe::DidCells;
use crate::domain::CombinedDataset;
use crate::error::AppError;
use crate::io::ingest::RawTable;
use crate::predict::Prediction;

fn create(path: &Path) -> Result<Writer<fs::File>, AppError> {
    Writer::from_path(path)
        .map_err(|e| AppError::Output(format!("Failed to create '{}': {e}", path.display())))
}

fn write_err(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::Output(format!("Failed to write '{}': {e}", path.display()))
}

/// Write any serializable row type, one record per item, header from field names.
pub fn write_records_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut w = create(path)?;
    for r in rows {
        w.serialize(r).map_err(|e| write_err(path, e))?;
    }
    w.flush().map_err(|e| write_err(path, e))?;
    log::debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// One row per column: combined count/percent plus one pair per survey year.
pub fn write_missing_report_csv(path: &Path, report: &MissingReport) -> Result<(), AppError> {
    let mut w = create(path)?;
    let mut header = vec!["column".to_string(), "missing".to_string(), "percent".to_string()];
    for (year, _) in &report.rows_per_year {
        header.push(format!("missing_{year}"));
        header.push(format!("percent_{year}"));
    }
    w.write_record(&header).map_err(|e| write_err(path, e))?;

    for e in &report.entries {
        let mut rec = vec![
            e.column.name().to_string(),
            e.overall.count.to_string(),
            format!("{:.4}", e.overall.percent),
        ];
        for (_, c) in &e.by_year {
            rec.push(c.count.to_string());
            rec.push(format!("{:.4}", c.percent));
        }
        w.write_record(&rec).map_err(|e| write_err(path, e))?;
    }
    w.flush().map_err(|e| write_err(path, e))?;
    Ok(())
}

#[derive(Serialize)]
struct DidCellRow<'a> {
    split: &'a str,
    group: &'a str,
    mean_2018: f64,
    mean_2022: f64,
    n_2018: usize,
    n_2022: usize,
    change: f64,
    did: f64,
}

pub fn write_did_cells_csv(path: &Path, cells: &[DidCells]) -> Result<(), AppError> {
    let mut rows = Vec::with_capacity(cells.len() * 2);
    for c in cells {
        let did = c.did();
        rows.push(DidCellRow {
            split: &c.split,
            group: &c.treated_label,
            mean_2018: c.treated_2018,
            mean_2022: c.treated_2022,
            n_2018: c.n_treated_2018,
            n_2022: c.n_treated_2022,
            change: c.treated_2022 - c.treated_2018,
            did,
        });
        rows.push(DidCellRow {
            split: &c.split,
            group: &c.control_label,
            mean_2018: c.control_2018,
            mean_2022: c.control_2022,
            n_2018: c.n_control_2018,
            n_2022: c.n_control_2022,
            change: c.control_2022 - c.control_2018,
            did,
        });
    }
    write_records_csv(path, &rows)
}

/// Grid predictions: year, every grid covariate, series label, predicted value.
pub fn write_predictions_csv(path: &Path, predictions: &[Prediction]) -> Result<(), AppError> {
    let mut w = create(path)?;
    let Some(first) = predictions.first() else {
        w.write_record(["year", "series", "predicted"]).map_err(|e| write_err(path, e))?;
        w.flush().map_err(|e| write_err(path, e))?;
        return Ok(());
    };

    let vars: Vec<_> = first.point.numeric.keys().copied().collect();
    let factors: Vec<_> = first.point.levels.keys().copied().collect();

    let mut header = vec!["year".to_string()];
    header.extend(vars.iter().map(|v| v.name().to_string()));
    header.extend(factors.iter().map(|f| f.name().to_string()));
    header.push("series".into());
    header.push("predicted".into());
    w.write_record(&header).map_err(|e| write_err(path, e))?;

    for p in predictions {
        let mut rec = vec![p.point.year.to_string()];
        for v in &vars {
            rec.push(p.point.numeric.get(v).map(|x| format!("{x}")).unwrap_or_default());
        }
        for f in &factors {
            rec.push(p.point.levels.get(f).cloned().unwrap_or_default());
        }
        rec.push(p.point.series.clone());
        rec.push(format!("{:.6}", p.predicted));
        w.write_record(&rec).map_err(|e| write_err(path, e))?;
    }
    w.flush().map_err(|e| write_err(path, e))?;
    Ok(())
}

/// The cleaned, feature-augmented dataset.
pub fn write_dataset_csv(path: &Path, data: &CombinedDataset) -> Result<(), AppError> {
    write_records_csv(path, &data.rows)?;
    log::info!("Exported {} analysis rows to {}", data.len(), path.display());
    Ok(())
}

/// A raw table with its original headers.
pub fn write_raw_table(path: &Path, table: &RawTable, delimiter: u8) -> Result<(), AppError> {
    let mut w = WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| AppError::Output(format!("Failed to create '{}': {e}", path.display())))?;
    w.write_record(&table.headers).map_err(|e| write_err(path, e))?;
    for r in &table.records {
        w.write_record(r).map_err(|e| write_err(path, e))?;
    }
    w.flush().map_err(|e| write_err(path, e))?;
    Ok(())
}

pub fn write_text(path: &Path, text: &str) -> Result<(), AppError> {
    fs::write(path, text).map_err(|e| write_err(path, e))
}

/// Create the output directory (and parents) if needed.
pub fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::Output(format!("Failed to create output directory '{}': {e}", dir.display())))
}
