//! Shared analysis pipeline.
//!
//! load -> harmonize -> concat -> missing report -> clean -> features
//! -> descriptives -> fit models -> prediction grids
//!
//! Every stage takes and returns explicit values; presentation and file output
//! live in `app`.

use std::collections::BTreeMap;

use crate::data::clean::{clean, missing_report, MissingReport};
use crate::data::describe::{categorical_distribution, describe_numeric, did_cell_means, DidCells, LevelCount, NumericSummary};
use crate::data::{concat, derive_features, harmonize};
use crate::domain::{AnalysisConfig, Column, CombinedDataset, SurveyYear};
use crate::error::AppError;
use crate::fit::{fit_suite, FittedModel, ModelSuite};
use crate::io::ingest::{load_table, RawTable};
use crate::models::standard_models;
use crate::predict::{grid_for, predict_grid, GridMeans, Prediction};

/// Everything computed before model fitting.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub missing: MissingReport,
    pub coercion_failures: BTreeMap<(SurveyYear, Column), usize>,
    pub rows_before_cleaning: usize,
    pub dataset: CombinedDataset,
    pub descriptives: Vec<NumericSummary>,
    pub categorical: Vec<LevelCount>,
    pub did_cells: Vec<DidCells>,
}

impl PreparedData {
    pub fn rows_dropped(&self) -> usize {
        self.rows_before_cleaning - self.dataset.len()
    }
}

/// One fitted model with its grid predictions.
#[derive(Debug, Clone)]
pub struct ModelOutput {
    pub fit: FittedModel,
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone)]
pub struct ModelResults {
    pub outputs: Vec<ModelOutput>,
    pub skipped: Vec<(String, String)>,
}

impl ModelResults {
    pub fn suite(&self) -> ModelSuite {
        ModelSuite {
            fits: self.outputs.iter().map(|o| o.fit.clone()).collect(),
            skipped: self.skipped.clone(),
        }
    }
}

/// Read both extracts from disk.
pub fn load_inputs(config: &AnalysisConfig) -> Result<(RawTable, RawTable), AppError> {
    let raw_2018 = load_table(&config.pisa_2018, config.delimiter)?;
    let raw_2022 = load_table(&config.pisa_2022, config.delimiter)?;
    Ok((raw_2018, raw_2022))
}

/// Harmonize, combine, clean and derive features from the two raw tables.
pub fn prepare(raw_2018: &RawTable, raw_2022: &RawTable) -> Result<PreparedData, AppError> {
    let t2018 = harmonize(raw_2018, SurveyYear::Y2018)?;
    let t2022 = harmonize(raw_2022, SurveyYear::Y2022)?;

    let mut coercion_failures = BTreeMap::new();
    for t in [&t2018, &t2022] {
        for (column, n) in &t.coercion_failures {
            coercion_failures.insert((t.year, *column), *n);
        }
    }

    let combined = concat(t2018, t2022)?;
    let missing = missing_report(&combined);
    let cleaned = clean(&combined);

    let dataset = derive_features(&cleaned)?;
    let descriptives = describe_numeric(&dataset);
    let categorical = categorical_distribution(&dataset);
    let did_cells = did_cell_means(&dataset);

    Ok(PreparedData {
        missing,
        coercion_failures,
        rows_before_cleaning: combined.len(),
        dataset,
        descriptives,
        categorical,
        did_cells,
    })
}

/// Fit the four models and evaluate their prediction grids.
pub fn fit_models(data: &CombinedDataset, reference_country: Option<&str>) -> Result<ModelResults, AppError> {
    if let Some(code) = reference_country {
        if !data.countries().iter().any(|c| c == code) {
            return Err(AppError::InvalidInput(format!(
                "Reference country '{code}' does not occur in the cleaned data."
            )));
        }
    }

    let specs = standard_models(reference_country);
    let suite = fit_suite(&specs, &data.rows)?;
    let means = GridMeans::from_rows(&data.rows);

    let mut outputs = Vec::with_capacity(suite.fits.len());
    for fit in suite.fits {
        let predictions = predict_grid(&fit, grid_for(&fit, means)?)?;
        outputs.push(ModelOutput { fit, predictions });
    }

    Ok(ModelResults {
        outputs,
        skipped: suite.skipped,
    })
}
