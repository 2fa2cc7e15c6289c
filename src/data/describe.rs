//! Descriptive statistics over the combined dataset.
//!
//! Three tables:
//! - moments of the continuous variables
//! - level counts of the categorical variables
//! - raw 2x2 reading-score means behind the difference-in-differences models

use serde::Serialize;

use crate::domain::{AnalysisRow, CombinedDataset, SurveyYear};

/// Continuous variables summarized by `describe_numeric`.
pub const NUMERIC_VARIABLES: [(&str, fn(&AnalysisRow) -> f64); 5] = [
    ("grade", |r| r.grade),
    ("homepos", |r| r.homepos),
    ("paredint", |r| r.paredint),
    ("reading_score", |r| r.reading_score),
    ("SES_standardized", |r| r.ses_standardized),
];

#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub variable: String,
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub sd: f64,
    pub min: f64,
    pub max: f64,
    /// Adjusted Fisher-Pearson skewness (G1).
    pub skew: f64,
    /// Bias-corrected excess kurtosis (G2).
    pub kurtosis: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelCount {
    pub variable: String,
    pub level: String,
    pub count: usize,
    pub percent: f64,
}

/// Mean reading score per year for a treated/control split.
#[derive(Debug, Clone, Serialize)]
pub struct DidCells {
    pub split: String,
    pub treated_label: String,
    pub control_label: String,
    pub treated_2018: f64,
    pub treated_2022: f64,
    pub control_2018: f64,
    pub control_2022: f64,
    pub n_treated_2018: usize,
    pub n_treated_2022: usize,
    pub n_control_2018: usize,
    pub n_control_2022: usize,
}

impl DidCells {
    /// `(treated_2022 - treated_2018) - (control_2022 - control_2018)`.
    pub fn did(&self) -> f64 {
        (self.treated_2022 - self.treated_2018) - (self.control_2022 - self.control_2018)
    }
}

pub fn describe_numeric(data: &CombinedDataset) -> Vec<NumericSummary> {
    NUMERIC_VARIABLES
        .iter()
        .map(|(name, get)| {
            let values: Vec<f64> = data.rows.iter().map(|r| get(r)).collect();
            summarize(name, &values)
        })
        .collect()
}

pub fn summarize(name: &str, values: &[f64]) -> NumericSummary {
    let n = values.len();
    let nan = f64::NAN;
    if n == 0 {
        return NumericSummary {
            variable: name.to_string(),
            n,
            mean: nan,
            median: nan,
            sd: nan,
            min: nan,
            max: nan,
            skew: nan,
            kurtosis: nan,
        };
    }

    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= nf;
    m3 /= nf;
    m4 /= nf;

    let sd = if n > 1 { (m2 * nf / (nf - 1.0)).sqrt() } else { nan };

    let skew = if n > 2 && m2 > 0.0 {
        let g1 = m3 / m2.powf(1.5);
        g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0)
    } else {
        nan
    };
    let kurtosis = if n > 3 && m2 > 0.0 {
        let g2 = m4 / (m2 * m2) - 3.0;
        ((nf + 1.0) * g2 + 6.0) * (nf - 1.0) / ((nf - 2.0) * (nf - 3.0))
    } else {
        nan
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = n / 2;
    let median = if n % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    };

    NumericSummary {
        variable: name.to_string(),
        n,
        mean,
        median,
        sd,
        min: sorted[0],
        max: sorted[n - 1],
        skew,
        kurtosis,
    }
}

/// Level counts for country, OECD status, gender and year.
pub fn categorical_distribution(data: &CombinedDataset) -> Vec<LevelCount> {
    let mut out = Vec::new();
    let total = data.len();
    push_levels(&mut out, "country_code", data.rows.iter().map(|r| r.country_code.clone()), total);
    push_levels(&mut out, "oecd", data.rows.iter().map(|r| r.oecd.label().to_string()), total);
    push_levels(
        &mut out,
        "student_gender",
        data.rows.iter().map(|r| r.student_gender.label().to_string()),
        total,
    );
    push_levels(&mut out, "year", data.rows.iter().map(|r| r.year.to_string()), total);
    out
}

fn push_levels(out: &mut Vec<LevelCount>, variable: &str, values: impl Iterator<Item = String>, total: usize) {
    let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut levels: Vec<(String, usize)> = counts.into_iter().collect();
    // Most frequent first; equal counts stay alphabetical.
    levels.sort_by(|a, b| b.1.cmp(&a.1));
    for (level, count) in levels {
        out.push(LevelCount {
            variable: variable.to_string(),
            level,
            count,
            percent: if total == 0 { 0.0 } else { count as f64 / total as f64 * 100.0 },
        });
    }
}

/// Raw DiD cell means for the OECD and performance-group splits.
pub fn did_cell_means(data: &CombinedDataset) -> Vec<DidCells> {
    vec![
        cells(data, "oecd", "OECD", "Non_OECD", |r| r.oecd_numeric == 1),
        cells(data, "performance_group", "Top", "Bottom", |r| r.performance_group_numeric == 1),
    ]
}

fn cells(
    data: &CombinedDataset,
    split: &str,
    treated_label: &str,
    control_label: &str,
    treated: impl Fn(&AnalysisRow) -> bool,
) -> DidCells {
    let mean = |is_treated: bool, year: SurveyYear| -> (f64, usize) {
        let (sum, n) = data
            .rows
            .iter()
            .filter(|r| treated(r) == is_treated && r.year == year)
            .fold((0.0, 0usize), |(s, n), r| (s + r.reading_score, n + 1));
        if n == 0 { (f64::NAN, 0) } else { (sum / n as f64, n) }
    };

    let (treated_2018, n_treated_2018) = mean(true, SurveyYear::Y2018);
    let (treated_2022, n_treated_2022) = mean(true, SurveyYear::Y2022);
    let (control_2018, n_control_2018) = mean(false, SurveyYear::Y2018);
    let (control_2022, n_control_2022) = mean(false, SurveyYear::Y2022);

    DidCells {
        split: split.to_string(),
        treated_label: treated_label.to_string(),
        control_label: control_label.to_string(),
        treated_2018,
        treated_2022,
        control_2018,
        control_2022,
        n_treated_2018,
        n_treated_2022,
        n_control_2018,
        n_control_2022,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moments_of_a_known_sample() {
        let s = summarize("x", &[1.0, 2.0, 3.0, 4.0, 10.0]);
        assert_eq!(s.n, 5);
        assert!((s.mean - 4.0).abs() < 1e-12);
        assert!((s.median - 3.0).abs() < 1e-12);
        assert!((s.sd - 12.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 10.0);
        // Reference values from the adjusted sample estimators.
        assert!((s.skew - 1.697_056_274_8).abs() < 1e-9, "skew {}", s.skew);
        assert!((s.kurtosis - 3.152).abs() < 1e-9, "kurt {}", s.kurtosis);
    }

    #[test]
    fn degenerate_samples_yield_nan_moments() {
        let s = summarize("x", &[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(s.sd, 0.0);
        assert!(s.skew.is_nan());
        assert!(s.kurtosis.is_nan());
        assert!(summarize("x", &[]).mean.is_nan());
    }
}
