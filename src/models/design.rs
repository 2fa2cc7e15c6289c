//! Design-matrix encoding shared by fitting and prediction.
//!
//! The encoder is built once per model from the fitting data. It fixes the
//! column order and the factor levels, so a prediction grid row is encoded
//! exactly like an observed row:
//!
//! - intercept first
//! - numeric main effect: one column
//! - categorical main effect: one dummy per non-reference level, named `country[T.KOR]`
//! - interaction: the product of every column of each side, named `a:b`

use std::collections::{BTreeMap, BTreeSet};

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::domain::AnalysisRow;
use crate::error::AppError;
use crate::models::spec::{Covariate, Factor, ModelSpec, NumericVar, Term};

pub const INTERCEPT: &str = "Intercept";

/// Anything that can supply covariate values: observed rows and grid points.
pub trait Covariates {
    fn numeric(&self, var: NumericVar) -> f64;
    fn level(&self, factor: Factor) -> &str;
}

impl Covariates for AnalysisRow {
    fn numeric(&self, var: NumericVar) -> f64 {
        match var {
            NumericVar::ReadingScore => self.reading_score,
            NumericVar::YearBinary => f64::from(self.year_binary),
            NumericVar::OecdNumeric => f64::from(self.oecd_numeric),
            NumericVar::PerformanceGroupNumeric => f64::from(self.performance_group_numeric),
            NumericVar::GenderNumeric => f64::from(self.gender_numeric),
            NumericVar::SesStandardized => self.ses_standardized,
            NumericVar::Paredint => self.paredint,
            NumericVar::Homepos => self.homepos,
            NumericVar::Grade => self.grade,
        }
    }

    fn level(&self, factor: Factor) -> &str {
        match factor {
            Factor::Country => &self.country_code,
        }
    }
}

/// Levels of one factor: the reference plus the dummy-coded others, sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorLevels {
    pub reference: String,
    pub others: Vec<String>,
}

impl FactorLevels {
    fn from_observed(factor: Factor, observed: BTreeSet<String>, stated: Option<&str>) -> Result<Self, AppError> {
        let reference = match stated {
            Some(level) if observed.contains(level) => level.to_string(),
            Some(level) => {
                return Err(AppError::InvalidInput(format!(
                    "Reference level '{level}' for {} is not present in the data.",
                    factor.name()
                )));
            }
            None => observed
                .iter()
                .next()
                .cloned()
                .ok_or_else(|| AppError::InvalidInput(format!("No levels observed for {}.", factor.name())))?,
        };
        let others = observed.into_iter().filter(|l| *l != reference).collect();
        Ok(Self { reference, others })
    }

    fn contains(&self, level: &str) -> bool {
        self.reference == level || self.others.iter().any(|l| l == level)
    }
}

#[derive(Debug, Clone)]
pub struct DesignEncoder {
    terms: Vec<Term>,
    levels: BTreeMap<Factor, FactorLevels>,
    columns: Vec<String>,
}

impl DesignEncoder {
    /// Fix the column layout of `spec` from the levels present in `rows`.
    pub fn from_data<R: Covariates>(spec: &ModelSpec, rows: &[R]) -> Result<Self, AppError> {
        let mut levels = BTreeMap::new();
        for factor in spec.factors() {
            let observed: BTreeSet<String> = rows.iter().map(|r| r.level(factor).to_string()).collect();
            let stated = spec.references.get(&factor).map(String::as_str);
            levels.insert(factor, FactorLevels::from_observed(factor, observed, stated)?);
        }

        let terms = spec.terms();
        let mut encoder = Self {
            terms,
            levels,
            columns: Vec::new(),
        };
        let mut columns = vec![INTERCEPT.to_string()];
        for term in &encoder.terms {
            match term {
                Term::Main(c) => columns.extend(encoder.covariate_columns(*c)),
                Term::Interaction(a, b) => {
                    let right = encoder.covariate_columns(*b);
                    for l in encoder.covariate_columns(*a) {
                        for r in &right {
                            columns.push(format!("{l}:{r}"));
                        }
                    }
                }
            }
        }
        encoder.columns = columns;
        Ok(encoder)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn levels(&self, factor: Factor) -> Option<&FactorLevels> {
        self.levels.get(&factor)
    }

    fn covariate_columns(&self, c: Covariate) -> Vec<String> {
        match c {
            Covariate::Numeric(v) => vec![v.name().to_string()],
            Covariate::Categorical(f) => match self.levels.get(&f) {
                Some(levels) => levels
                    .others
                    .iter()
                    .map(|l| format!("{}[T.{l}]", f.name()))
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    fn covariate_values<R: Covariates + ?Sized>(&self, c: Covariate, row: &R) -> Result<Vec<f64>, AppError> {
        match c {
            Covariate::Numeric(v) => Ok(vec![row.numeric(v)]),
            Covariate::Categorical(f) => {
                let Some(levels) = self.levels.get(&f) else {
                    return Ok(Vec::new());
                };
                let level = row.level(f);
                if !levels.contains(level) {
                    return Err(AppError::InvalidInput(format!(
                        "Unknown {} level '{level}' (not seen when fitting).",
                        f.name()
                    )));
                }
                Ok(levels
                    .others
                    .iter()
                    .map(|l| if l == level { 1.0 } else { 0.0 })
                    .collect())
            }
        }
    }

    /// Fill one design row; `out` must have length `self.width()`.
    pub fn fill_design_row<R: Covariates + ?Sized>(&self, row: &R, out: &mut [f64]) -> Result<(), AppError> {
        if out.len() != self.width() {
            return Err(AppError::InvalidInput(format!(
                "Design row has {} slots, expected {}.",
                out.len(),
                self.width()
            )));
        }
        out[0] = 1.0;
        let mut k = 1;
        for term in &self.terms {
            match term {
                Term::Main(c) => {
                    for v in self.covariate_values(*c, row)? {
                        out[k] = v;
                        k += 1;
                    }
                }
                Term::Interaction(a, b) => {
                    let right = self.covariate_values(*b, row)?;
                    for l in self.covariate_values(*a, row)? {
                        for r in &right {
                            out[k] = l * r;
                            k += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn design_matrix<R: Covariates>(&self, rows: &[R]) -> Result<DMatrix<f64>, AppError> {
        let p = self.width();
        let mut x = DMatrix::zeros(rows.len(), p);
        let mut buf = vec![0.0; p];
        for (i, row) in rows.iter().enumerate() {
            self.fill_design_row(row, &mut buf)?;
            for (j, v) in buf.iter().enumerate() {
                x[(i, j)] = *v;
            }
        }
        Ok(x)
    }

    /// Predict `x^T β` for one row.
    pub fn predict<R: Covariates + ?Sized>(&self, row: &R, beta: &[f64]) -> Result<f64, AppError> {
        if beta.len() != self.width() {
            return Err(AppError::InvalidInput(format!(
                "Got {} coefficients for a {}-column design.",
                beta.len(),
                self.width()
            )));
        }
        let mut buf = vec![0.0; self.width()];
        self.fill_design_row(row, &mut buf)?;
        Ok(buf.iter().zip(beta).map(|(x, b)| x * b).sum())
    }
}

/// Response vector for `spec`.
pub fn response_vector<R: Covariates>(spec: &ModelSpec, rows: &[R]) -> DVector<f64> {
    DVector::from_iterator(rows.len(), rows.iter().map(|r| r.numeric(spec.response)))
}
