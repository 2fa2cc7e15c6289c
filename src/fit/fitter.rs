//! Fitting a single model specification by OLS.
//!
//! Given a specification and the combined dataset we:
//! - fix the design layout (`DesignEncoder`) from the data
//! - solve the least-squares problem
//! - derive classical inference: standard errors, t statistics, two-sided
//!   p-values, 95% intervals, R², the overall F test and likelihood criteria
//!
//! The formulas are the usual homoskedastic ones:
//!
//! ```text
//! σ² = SSR / (n - p)
//! se(β_j) = sqrt(σ² [(X^T X)^-1]_jj)
//! llf = -n/2 · (ln(2π) + ln(SSR/n) + 1)
//! AIC = -2 llf + 2p,  BIC = -2 llf + p ln n
//! ```

use std::f64::consts::PI;

use serde::Serialize;

use crate::error::AppError;
use crate::fit::inference::{f_upper_tail, t_critical, t_two_sided_p};
use crate::math::{solve_ols, OlsError};
use crate::models::{response_vector, Covariates, DesignEncoder, ModelSpec};

/// Confidence level of the reported coefficient intervals.
pub const CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitStatistics {
    pub n_obs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub residual_std_error: f64,
    pub sse: f64,
}

#[derive(Debug, Clone)]
pub struct FittedModel {
    pub spec: ModelSpec,
    pub encoder: DesignEncoder,
    pub coefficients: Vec<Coefficient>,
    pub stats: FitStatistics,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
}

impl FittedModel {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    pub fn beta(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.estimate).collect()
    }

    /// Predicted response for any covariate source (observed row or grid point).
    pub fn predict<R: Covariates + ?Sized>(&self, row: &R) -> Result<f64, AppError> {
        self.encoder.predict(row, &self.beta())
    }
}

/// Fit `spec` on `rows`.
///
/// Returns `AppError::SingularDesign` when the design cannot be estimated; the
/// caller decides whether that is fatal.
pub fn fit_model<R: Covariates>(spec: &ModelSpec, rows: &[R]) -> Result<FittedModel, AppError> {
    if rows.is_empty() {
        return Err(AppError::singular(&spec.slug, "no observations"));
    }

    let encoder = DesignEncoder::from_data(spec, rows)?;
    let x = encoder.design_matrix(rows)?;
    let y = response_vector(spec, rows);
    let (n, p) = x.shape();

    let solution = match solve_ols(&x, &y) {
        Ok(s) => s,
        Err(OlsError::RankDeficient { rank, p }) => {
            let constant = constant_columns(&x, encoder.columns());
            let mut reason = format!("design matrix has rank {rank} < {p} columns");
            if !constant.is_empty() {
                reason.push_str(&format!("; constant columns: {}", constant.join(", ")));
            }
            return Err(AppError::singular(&spec.slug, reason));
        }
        Err(e) => return Err(AppError::singular(&spec.slug, e.to_string())),
    };

    let df_resid = n - p;
    let df_model = p - 1;
    let nf = n as f64;

    let sse: f64 = solution.residuals.iter().map(|r| r * r).sum();
    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();
    let sigma2 = sse / df_resid as f64;

    let r_squared = if tss > 0.0 { 1.0 - sse / tss } else { f64::NAN };
    let adj_r_squared = 1.0 - (nf - 1.0) / df_resid as f64 * (1.0 - r_squared);
    let (f_statistic, f_p_value) = if df_model > 0 {
        let f = ((tss - sse) / df_model as f64) / sigma2;
        (f, f_upper_tail(f, df_model as f64, df_resid as f64))
    } else {
        (f64::NAN, f64::NAN)
    };

    let log_likelihood = -0.5 * nf * ((2.0 * PI).ln() + (sse / nf).ln() + 1.0);
    let k = p as f64;
    let aic = -2.0 * log_likelihood + 2.0 * k;
    let bic = -2.0 * log_likelihood + k * nf.ln();

    let q = t_critical(CONFIDENCE, df_resid as f64);
    let coefficients = encoder
        .columns()
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let estimate = solution.beta[j];
            let std_error = (sigma2 * solution.xtx_inv[(j, j)]).max(0.0).sqrt();
            let t_value = estimate / std_error;
            Coefficient {
                name: name.clone(),
                estimate,
                std_error,
                t_value,
                p_value: t_two_sided_p(t_value, df_resid as f64),
                ci_lower: estimate - q * std_error,
                ci_upper: estimate + q * std_error,
            }
        })
        .collect();

    log::debug!(
        "Fitted {}: n={n}, p={p}, R²={r_squared:.4}, SSE={sse:.3}",
        spec.slug
    );

    Ok(FittedModel {
        spec: spec.clone(),
        encoder,
        coefficients,
        stats: FitStatistics {
            n_obs: n,
            df_model,
            df_resid,
            r_squared,
            adj_r_squared,
            f_statistic,
            f_p_value,
            log_likelihood,
            aic,
            bic,
            residual_std_error: sigma2.sqrt(),
            sse,
        },
        fitted: solution.fitted.iter().copied().collect(),
        residuals: solution.residuals.iter().copied().collect(),
    })
}

/// Non-intercept columns that take a single value across all rows.
fn constant_columns(x: &nalgebra::DMatrix<f64>, names: &[String]) -> Vec<String> {
    (1..x.ncols())
        .filter(|&j| {
            let col = x.column(j);
            let first = col[0];
            col.iter().all(|v| *v == first)
        })
        .map(|j| names[j].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisRow, Gender, OecdStatus, PerformanceGroup, SurveyYear};
    use crate::models::{country_interactions, oecd_did};

    fn row(country: &str, year: SurveyYear, oecd: bool, female: bool, ses: f64, score: f64) -> AnalysisRow {
        let perf = PerformanceGroup::classify(country);
        let oecd_status = if oecd { OecdStatus::Oecd } else { OecdStatus::NonOecd };
        let gender = if female { Gender::Female } else { Gender::Male };
        AnalysisRow {
            country_id: 1,
            country_code: country.into(),
            school_id: 1,
            student_id: 1,
            oecd: oecd_status,
            grade: 10.0,
            student_gender: gender,
            homepos: ses,
            paredint: 12.0 + ses,
            reading_score: score,
            year,
            year_binary: year.binary(),
            gender_numeric: gender.numeric(),
            oecd_numeric: oecd_status.numeric(),
            performance_group: perf,
            performance_group_numeric: perf.numeric(),
            ses_standardized: ses,
        }
    }

    #[test]
    fn did_design_with_noise_free_cells() {
        // score = 500 - 10 y + 20 oecd + 5 y·oecd, two noisy replicates per cell
        let mut rows = Vec::new();
        for (year, yb) in [(SurveyYear::Y2018, 0.0), (SurveyYear::Y2022, 1.0)] {
            for oecd in [false, true] {
                let o = if oecd { 1.0 } else { 0.0 };
                let mean = 500.0 - 10.0 * yb + 20.0 * o + 5.0 * yb * o;
                rows.push(row("AAA", year, oecd, true, 0.0, mean + 1.0));
                rows.push(row("AAA", year, oecd, true, 0.0, mean - 1.0));
            }
        }
        let fit = fit_model(&oecd_did(), &rows).unwrap();
        let b = fit.beta();
        assert!((b[0] - 500.0).abs() < 1e-9);
        assert!((b[1] + 10.0).abs() < 1e-9);
        assert!((b[2] - 20.0).abs() < 1e-9);
        assert!((b[3] - 5.0).abs() < 1e-9);

        // SSE = 8, df_resid = 4, σ² = 2; interaction se = sqrt(2 · (1/2 · 4)) = 2
        let s = &fit.stats;
        assert_eq!((s.n_obs, s.df_model, s.df_resid), (8, 3, 4));
        assert!((s.sse - 8.0).abs() < 1e-9);
        let inter = fit.coefficient("year_binary:oecd_numeric").unwrap();
        assert!((inter.std_error - 2.0).abs() < 1e-9);
        assert!((inter.t_value - 2.5).abs() < 1e-9);
        // Two-sided p and 95% interval with 4 residual df
        assert!((inter.p_value - 0.066_766_544_812).abs() < 1e-8);
        assert!((inter.ci_upper - (5.0 + 2.0 * 2.776_445_105_198)).abs() < 1e-5);
        assert!((inter.ci_lower - (5.0 - 2.0 * 2.776_445_105_198)).abs() < 1e-5);
        assert!(s.r_squared > 0.9 && s.r_squared <= 1.0);
        assert!(s.f_p_value < 0.01);
    }

    #[test]
    fn information_criteria_are_consistent() {
        let rows: Vec<AnalysisRow> = (0..20)
            .map(|i| {
                let year = if i % 2 == 0 { SurveyYear::Y2018 } else { SurveyYear::Y2022 };
                let oecd = i % 4 < 2;
                row("AAA", year, oecd, true, 0.0, 480.0 + (i as f64 * 7.3) % 11.0)
            })
            .collect();
        let fit = fit_model(&oecd_did(), &rows).unwrap();
        let s = &fit.stats;
        let n = 20.0_f64;
        assert!((s.aic - (-2.0 * s.log_likelihood + 8.0)).abs() < 1e-9);
        assert!((s.bic - (-2.0 * s.log_likelihood + 4.0 * n.ln())).abs() < 1e-9);
        assert!(s.adj_r_squared <= s.r_squared);
    }

    #[test]
    fn country_without_variation_is_singular() {
        // KOR has only female students, so gender:country[T.KOR] equals country[T.KOR].
        let mut rows = Vec::new();
        for (i, year) in [SurveyYear::Y2018, SurveyYear::Y2022].into_iter().cycle().take(24).enumerate() {
            let female = i % 3 == 0;
            rows.push(row("DEU", year, true, female, i as f64 * 0.1, 480.0 + i as f64));
            rows.push(row("KOR", year, true, true, i as f64 * 0.2, 520.0 + (i % 5) as f64));
        }
        let err = fit_model(&country_interactions(None), &rows).unwrap_err();
        match err {
            AppError::SingularDesign { model, .. } => assert_eq!(model, "country_interactions"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_rows_are_singular() {
        let rows: Vec<AnalysisRow> = Vec::new();
        assert!(matches!(fit_model(&oecd_did(), &rows), Err(AppError::SingularDesign { .. })));
    }

    #[test]
    fn predict_reproduces_fitted_values() {
        let rows: Vec<AnalysisRow> = (0..12)
            .map(|i| {
                let year = if i % 2 == 0 { SurveyYear::Y2018 } else { SurveyYear::Y2022 };
                row("AAA", year, i % 3 == 0, true, 0.0, 450.0 + i as f64 * 3.0)
            })
            .collect();
        let fit = fit_model(&oecd_did(), &rows).unwrap();
        for (r, f) in rows.iter().zip(&fit.fitted) {
            assert!((fit.predict(r).unwrap() - f).abs() < 1e-9);
        }
    }
}
