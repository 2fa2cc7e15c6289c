//! Formatted terminal/text output.
//!
//! All report text is built here so the data and fitting code stays free of
//! presentation concerns. The same strings are printed to stdout and written
//! to `model_<slug>.txt`.

use chrono::{DateTime, Utc};

use crate::data::clean::MissingReport;
use crate::data::describe::{DidCells, LevelCount, NumericSummary};
use crate::domain::CombinedDataset;
use crate::fit::{FittedModel, ModelSuite, CONFIDENCE};

const RULE_WIDTH: usize = 78;

/// Header with the run timestamp and dataset shape.
pub fn format_run_header(data: &CombinedDataset, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str("=== did - PISA 2018 -> 2022 Difference-in-Differences ===\n");
    out.push_str(&format!("Generated: {}\n", generated_at.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!(
        "Analysis rows: {} | countries: {}\n",
        data.len(),
        data.countries().len()
    ));
    for p in &data.ses_partitions {
        out.push_str(&format!(
            "homepos {}: n={} mean={:.4} sd={:.4}\n",
            p.year, p.n, p.mean, p.sd
        ));
    }
    out
}

pub fn format_missing_report(report: &MissingReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Missing values (before cleaning, n={}):\n", report.total_rows));

    let mut header = format!("{:<16} {:>8} {:>8}", "column", "missing", "pct");
    let mut rule = format!("{:-<16} {:-<8} {:-<8}", "", "", "");
    for (year, n) in &report.rows_per_year {
        header.push_str(&format!(" {:>14}", format!("{year} (n={n})")));
        rule.push_str(&format!(" {:-<14}", ""));
    }
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');

    for e in &report.entries {
        let mut line = format!(
            "{:<16} {:>8} {:>7.2}%",
            e.column.name(),
            e.overall.count,
            e.overall.percent
        );
        for (_, c) in &e.by_year {
            line.push_str(&format!(" {:>14}", format!("{} ({:.2}%)", c.count, c.percent)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn format_descriptives(rows: &[NumericSummary]) -> String {
    let mut out = String::new();
    out.push_str("Descriptive statistics:\n");
    out.push_str(&format!(
        "{:<18} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8} {:>8}\n",
        "variable", "n", "mean", "median", "sd", "min", "max", "skew", "kurt"
    ));
    out.push_str(&format!(
        "{:-<18} {:-<7} {:-<10} {:-<10} {:-<10} {:-<10} {:-<10} {:-<8} {:-<8}\n",
        "", "", "", "", "", "", "", "", ""
    ));
    for s in rows {
        out.push_str(&format!(
            "{:<18} {:>7} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>8.3} {:>8.3}\n",
            truncate(&s.variable, 18),
            s.n,
            s.mean,
            s.median,
            s.sd,
            s.min,
            s.max,
            s.skew,
            s.kurtosis
        ));
    }
    out
}

pub fn format_categorical(levels: &[LevelCount]) -> String {
    let mut out = String::new();
    out.push_str("Categorical distributions:\n");
    let mut current: Option<&str> = None;
    for l in levels {
        if current != Some(l.variable.as_str()) {
            out.push_str(&format!("  {}:\n", l.variable));
            current = Some(l.variable.as_str());
        }
        out.push_str(&format!("    {:<12} {:>8} {:>7.2}%\n", truncate(&l.level, 12), l.count, l.percent));
    }
    out
}

pub fn format_did_cells(cells: &[DidCells]) -> String {
    let mut out = String::new();
    out.push_str("Raw DiD cell means (reading_score):\n");
    out.push_str(&format!(
        "{:<18} {:<10} {:>10} {:>10} {:>10}\n",
        "split", "group", "2018", "2022", "change"
    ));
    out.push_str(&format!("{:-<18} {:-<10} {:-<10} {:-<10} {:-<10}\n", "", "", "", "", ""));
    for c in cells {
        out.push_str(&format!(
            "{:<18} {:<10} {:>10.3} {:>10.3} {:>10.3}\n",
            c.split,
            truncate(&c.treated_label, 10),
            c.treated_2018,
            c.treated_2022,
            c.treated_2022 - c.treated_2018
        ));
        out.push_str(&format!(
            "{:<18} {:<10} {:>10.3} {:>10.3} {:>10.3}\n",
            "",
            truncate(&c.control_label, 10),
            c.control_2018,
            c.control_2022,
            c.control_2022 - c.control_2018
        ));
        out.push_str(&format!("{:<18} {:<10} {:>32.3}\n", "", "DiD", c.did()));
    }
    out
}

/// Regression summary in the familiar OLS table layout.
pub fn format_model_summary(fit: &FittedModel) -> String {
    let s = &fit.stats;
    let mut out = String::new();
    out.push_str(&format!("{:=<RULE_WIDTH$}\n", ""));
    out.push_str(&format!("{} ({})\n", fit.spec.title, fit.spec.slug));
    out.push_str(&format!("Formula: {}\n", fit.spec.formula()));
    for (factor, level) in fit.spec.references.iter() {
        out.push_str(&format!("Reference {}: {level}\n", factor.name()));
    }
    if let Some(levels) = fit.encoder.levels(crate::models::Factor::Country) {
        if fit.spec.references.is_empty() {
            out.push_str(&format!("Reference country: {}\n", levels.reference));
        }
    }
    out.push_str(&format!("{:=<RULE_WIDTH$}\n", ""));
    out.push_str(&format!(
        "{:<22} {:>14}   {:<22} {:>14}\n",
        "No. Observations:", s.n_obs, "R-squared:", fmt_stat(s.r_squared)
    ));
    out.push_str(&format!(
        "{:<22} {:>14}   {:<22} {:>14}\n",
        "Df Residuals:", s.df_resid, "Adj. R-squared:", fmt_stat(s.adj_r_squared)
    ));
    out.push_str(&format!(
        "{:<22} {:>14}   {:<22} {:>14}\n",
        "Df Model:", s.df_model, "F-statistic:", fmt_stat(s.f_statistic)
    ));
    out.push_str(&format!(
        "{:<22} {:>14}   {:<22} {:>14}\n",
        "Residual Std. Error:",
        fmt_stat(s.residual_std_error),
        "Prob (F-statistic):",
        fmt_p(s.f_p_value)
    ));
    out.push_str(&format!(
        "{:<22} {:>14}   {:<22} {:>14}\n",
        "Log-Likelihood:",
        fmt_stat(s.log_likelihood),
        "AIC / BIC:",
        format!("{:.1} / {:.1}", s.aic, s.bic)
    ));
    out.push_str(&format!("{:-<RULE_WIDTH$}\n", ""));

    // Widest coefficient name sets the first column.
    let width = fit.coefficients.iter().map(|c| c.name.chars().count()).max().unwrap_or(0).max(20);
    let lo = format!("[{:.3}", (1.0 - CONFIDENCE) / 2.0);
    let hi = format!("{:.3}]", 0.5 + CONFIDENCE / 2.0);
    out.push_str(&format!(
        "{:<width$} {:>10} {:>9} {:>8} {:>7} {:>9} {:>9}\n",
        "", "coef", "std err", "t", "P>|t|", lo, hi
    ));
    out.push_str(&format!("{:-<RULE_WIDTH$}\n", ""));
    for c in &fit.coefficients {
        out.push_str(&format!(
            "{:<width$} {:>10.4} {:>9.4} {:>8.3} {:>7} {:>9.3} {:>9.3}\n",
            c.name,
            c.estimate,
            c.std_error,
            c.t_value,
            fmt_p(c.p_value),
            c.ci_lower,
            c.ci_upper
        ));
    }
    out.push_str(&format!("{:=<RULE_WIDTH$}\n", ""));
    out
}

/// One line per model plus any skipped ones.
pub fn format_suite_overview(suite: &ModelSuite) -> String {
    let mut out = String::new();
    out.push_str("Models:\n");
    for fit in &suite.fits {
        out.push_str(&format!(
            "  {:<22} n={:<7} k={:<4} R2={:.4} AIC={:.1} BIC={:.1}\n",
            fit.spec.slug,
            fit.stats.n_obs,
            fit.coefficients.len(),
            fit.stats.r_squared,
            fit.stats.aic,
            fit.stats.bic
        ));
    }
    for (slug, reason) in &suite.skipped {
        out.push_str(&format!("  (skipped {slug}) {reason}\n"));
    }
    out
}

fn fmt_stat(v: f64) -> String {
    if v.is_finite() { format!("{v:.4}") } else { "nan".to_string() }
}

fn fmt_p(p: f64) -> String {
    if !p.is_finite() {
        "nan".to_string()
    } else if p < 0.001 {
        "0.000".to_string()
    } else {
        format!("{p:.3}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}
