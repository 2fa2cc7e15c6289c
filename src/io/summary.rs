//! `models.json`: the portable record of every fitted model.
//!
//! Per model: specification (formula, reference levels, design columns),
//! coefficients with inference, and fit statistics. Skipped models are listed
//! with their reason. Non-finite statistics serialize as `null`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::CombinedDataset;
use crate::error::AppError;
use crate::fit::{Coefficient, FitStatistics, ModelSuite};

#[derive(Debug, Clone, Serialize)]
pub struct ModelsFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub n_rows: usize,
    pub countries: Vec<String>,
    pub models: Vec<ModelEntry>,
    pub skipped: Vec<SkippedModel>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelEntry {
    pub slug: String,
    pub title: String,
    pub formula: String,
    pub reference_levels: BTreeMap<String, String>,
    pub columns: Vec<String>,
    pub coefficients: Vec<Coefficient>,
    pub stats: FitStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedModel {
    pub slug: String,
    pub reason: String,
}

impl ModelsFile {
    pub fn new(suite: &ModelSuite, data: &CombinedDataset, generated_at: DateTime<Utc>) -> Self {
        let models = suite
            .fits
            .iter()
            .map(|fit| {
                let reference_levels = fit
                    .spec
                    .factors()
                    .into_iter()
                    .filter_map(|f| fit.encoder.levels(f).map(|l| (f.name().to_string(), l.reference.clone())))
                    .collect();
                ModelEntry {
                    slug: fit.spec.slug.clone(),
                    title: fit.spec.title.clone(),
                    formula: fit.spec.formula(),
                    reference_levels,
                    columns: fit.encoder.columns().to_vec(),
                    coefficients: fit.coefficients.clone(),
                    stats: fit.stats.clone(),
                }
            })
            .collect();

        Self {
            tool: "did".to_string(),
            generated_at,
            n_rows: data.len(),
            countries: data.countries(),
            models,
            skipped: suite
                .skipped
                .iter()
                .map(|(slug, reason)| SkippedModel {
                    slug: slug.clone(),
                    reason: reason.clone(),
                })
                .collect(),
        }
    }
}

pub fn write_models_json(path: &Path, file: &ModelsFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::Output(format!("Failed to create models JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::Output(format!("Failed to write models JSON: {e}")))?;
    Ok(())
}
