//! Prediction grids: explicit covariate combinations evaluated with a fitted model.
//!
//! Every grid varies the survey year plus the model's group axes. Continuous
//! covariates outside the grid axes are held at their sample mean over the
//! combined dataset; categorical ones at a stated level.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{AnalysisRow, Gender, OecdStatus, PerformanceGroup, SurveyYear};
use crate::error::AppError;
use crate::fit::FittedModel;
use crate::models::{
    Covariates, Factor, NumericVar, COUNTRY_INTERACTIONS, GENDER_DID_CONTROLS, OECD_DID, PERFORMANCE_DID,
};

/// SES levels (in within-year standard deviations) used by the per-country grid.
pub const SES_LEVELS: [f64; 3] = [-1.0, 0.0, 1.0];

/// One covariate combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridPoint {
    pub year: SurveyYear,
    pub numeric: BTreeMap<NumericVar, f64>,
    pub levels: BTreeMap<Factor, String>,
    /// Label of the non-year, non-SES axes; one chart line per label.
    pub series: String,
}

impl GridPoint {
    fn new(year: SurveyYear, series: impl Into<String>) -> Self {
        let mut numeric = BTreeMap::new();
        numeric.insert(NumericVar::YearBinary, f64::from(year.binary()));
        Self {
            year,
            numeric,
            levels: BTreeMap::new(),
            series: series.into(),
        }
    }

    fn with(mut self, var: NumericVar, value: f64) -> Self {
        self.numeric.insert(var, value);
        self
    }

    fn with_level(mut self, factor: Factor, level: impl Into<String>) -> Self {
        self.levels.insert(factor, level.into());
        self
    }
}

impl Covariates for GridPoint {
    /// Covariates not set on the point evaluate to NaN, which propagates into
    /// the prediction instead of silently acting as zero.
    fn numeric(&self, var: NumericVar) -> f64 {
        self.numeric.get(&var).copied().unwrap_or(f64::NAN)
    }

    fn level(&self, factor: Factor) -> &str {
        self.levels.get(&factor).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub point: GridPoint,
    pub predicted: f64,
}

/// Sample means of the continuous covariates held fixed in the grids.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMeans {
    pub ses_standardized: f64,
    pub paredint: f64,
}

impl GridMeans {
    pub fn from_rows(rows: &[AnalysisRow]) -> Self {
        let n = rows.len() as f64;
        let mean = |f: fn(&AnalysisRow) -> f64| {
            if rows.is_empty() {
                f64::NAN
            } else {
                rows.iter().map(f).sum::<f64>() / n
            }
        };
        Self {
            ses_standardized: mean(|r| r.ses_standardized),
            paredint: mean(|r| r.paredint),
        }
    }
}

/// Model 1: year × OECD status.
pub fn oecd_grid() -> Vec<GridPoint> {
    let mut out = Vec::new();
    for status in [OecdStatus::NonOecd, OecdStatus::Oecd] {
        for year in SurveyYear::ALL {
            out.push(GridPoint::new(year, status.label()).with(NumericVar::OecdNumeric, f64::from(status.numeric())));
        }
    }
    out
}

/// Model 2: year × performance group.
pub fn performance_grid() -> Vec<GridPoint> {
    let mut out = Vec::new();
    for group in [PerformanceGroup::Bottom, PerformanceGroup::Top] {
        for year in SurveyYear::ALL {
            out.push(
                GridPoint::new(year, group.label())
                    .with(NumericVar::PerformanceGroupNumeric, f64::from(group.numeric())),
            );
        }
    }
    out
}

/// Model 3: year × gender for OECD students at mean SES and parental education.
pub fn gender_grid(means: GridMeans) -> Vec<GridPoint> {
    let mut out = Vec::new();
    for gender in [Gender::Male, Gender::Female] {
        for year in SurveyYear::ALL {
            out.push(
                GridPoint::new(year, gender.label())
                    .with(NumericVar::GenderNumeric, f64::from(gender.numeric()))
                    .with(NumericVar::OecdNumeric, f64::from(OecdStatus::Oecd.numeric()))
                    .with(NumericVar::SesStandardized, means.ses_standardized)
                    .with(NumericVar::Paredint, means.paredint),
            );
        }
    }
    out
}

/// Model 4: year × country × gender × SES level at mean parental education.
pub fn country_grid(countries: &[String], means: GridMeans) -> Vec<GridPoint> {
    let mut out = Vec::new();
    for country in countries {
        for gender in [Gender::Male, Gender::Female] {
            for ses in SES_LEVELS {
                for year in SurveyYear::ALL {
                    out.push(
                        GridPoint::new(year, format!("{country} {}", gender.label()))
                            .with(NumericVar::GenderNumeric, f64::from(gender.numeric()))
                            .with(NumericVar::SesStandardized, ses)
                            .with(NumericVar::Paredint, means.paredint)
                            .with_level(Factor::Country, country.clone()),
                    );
                }
            }
        }
    }
    out
}

/// The grid that belongs to a fitted standard model.
pub fn grid_for(fit: &FittedModel, means: GridMeans) -> Result<Vec<GridPoint>, AppError> {
    match fit.spec.slug.as_str() {
        OECD_DID => Ok(oecd_grid()),
        PERFORMANCE_DID => Ok(performance_grid()),
        GENDER_DID_CONTROLS => Ok(gender_grid(means)),
        COUNTRY_INTERACTIONS => {
            let levels = fit.encoder.levels(Factor::Country).ok_or_else(|| {
                AppError::InvalidInput("Per-country model has no country levels.".into())
            })?;
            let mut countries = vec![levels.reference.clone()];
            countries.extend(levels.others.iter().cloned());
            countries.sort();
            Ok(country_grid(&countries, means))
        }
        other => Err(AppError::InvalidInput(format!("No prediction grid defined for model '{other}'."))),
    }
}

/// Evaluate `fit` on every grid point.
pub fn predict_grid(fit: &FittedModel, points: Vec<GridPoint>) -> Result<Vec<Prediction>, AppError> {
    let beta = fit.beta();
    points
        .into_iter()
        .map(|point| {
            let predicted = fit.encoder.predict(&point, &beta)?;
            Ok(Prediction { point, predicted })
        })
        .collect()
}

/// Predictions drawn in the chart: the SES = 0 slice where SES is a grid axis.
pub fn chart_slice(fit: &FittedModel, predictions: &[Prediction]) -> Vec<Prediction> {
    if fit.spec.slug != COUNTRY_INTERACTIONS {
        return predictions.to_vec();
    }
    predictions
        .iter()
        .filter(|p| p.point.numeric(NumericVar::SesStandardized) == 0.0)
        .cloned()
        .collect()
}
