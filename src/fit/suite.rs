//! Fitting the full set of model specifications.
//!
//! A singular design fails only its own model: it is logged, recorded in
//! `skipped` and the remaining models are still fitted. Any other error aborts.

use crate::error::AppError;
use crate::fit::fitter::{fit_model, FittedModel};
use crate::models::{Covariates, ModelSpec};

/// Output of fitting every specification.
#[derive(Debug, Clone)]
pub struct ModelSuite {
    pub fits: Vec<FittedModel>,
    /// Models that could not be estimated, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl ModelSuite {
    pub fn get(&self, slug: &str) -> Option<&FittedModel> {
        self.fits.iter().find(|f| f.spec.slug == slug)
    }
}

pub fn fit_suite<R: Covariates>(specs: &[ModelSpec], rows: &[R]) -> Result<ModelSuite, AppError> {
    let mut fits = Vec::new();
    let mut skipped = Vec::new();

    for spec in specs {
        match fit_model(spec, rows) {
            Ok(fit) => {
                log::info!(
                    "Model {} fitted: {} coefficients, R² = {:.4}",
                    spec.slug,
                    fit.coefficients.len(),
                    fit.stats.r_squared
                );
                fits.push(fit);
            }
            Err(AppError::SingularDesign { model, reason }) => {
                log::warn!("Model {model} skipped: {reason}");
                skipped.push((model, reason));
            }
            Err(e) => return Err(e),
        }
    }

    if fits.is_empty() {
        return Err(AppError::NoModels(format!(
            "None of the {} models could be estimated.",
            specs.len()
        )));
    }

    Ok(ModelSuite { fits, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{oecd_did, Factor, NumericVar};

    struct Obs {
        year: f64,
        oecd: f64,
        score: f64,
    }

    impl Covariates for Obs {
        fn numeric(&self, var: NumericVar) -> f64 {
            match var {
                NumericVar::YearBinary => self.year,
                NumericVar::OecdNumeric => self.oecd,
                NumericVar::ReadingScore => self.score,
                _ => 0.0,
            }
        }
        fn level(&self, _: Factor) -> &str {
            "AAA"
        }
    }

    fn obs() -> Vec<Obs> {
        (0..16)
            .map(|i| Obs {
                year: (i % 2) as f64,
                oecd: ((i / 2) % 2) as f64,
                score: 400.0 + (i * 13 % 7) as f64,
            })
            .collect()
    }

    #[test]
    fn singular_model_is_skipped_not_fatal() {
        // performance_group_numeric is constant zero for Obs: singular design.
        let specs = vec![oecd_did(), crate::models::performance_did()];
        let suite = fit_suite(&specs, &obs()).unwrap();
        assert_eq!(suite.fits.len(), 1);
        assert!(suite.get("oecd_did").is_some());
        assert_eq!(suite.skipped.len(), 1);
        assert_eq!(suite.skipped[0].0, "performance_did");
        assert!(suite.skipped[0].1.contains("performance_group_numeric"));
    }

    #[test]
    fn all_singular_is_no_models() {
        let specs = vec![crate::models::performance_did()];
        let err = fit_suite(&specs, &obs()).unwrap_err();
        assert!(matches!(err, AppError::NoModels(_)));
        assert_eq!(err.exit_code(), 3);
    }
}
