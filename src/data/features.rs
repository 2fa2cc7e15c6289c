//! Derived indicators and per-year SES standardization.

use crate::domain::{AnalysisRow, CombinedDataset, PerformanceGroup, SesPartition, StudentRecord, SurveyYear};
use crate::error::AppError;

/// Attach every derived column to cleaned rows.
///
/// `SES_standardized` is a z-score of `homepos` computed within each survey year,
/// so the 2018→2022 level shift of the index does not leak into the within-year
/// position of a student.
pub fn derive_features(rows: &[StudentRecord]) -> Result<CombinedDataset, AppError> {
    let ses_partitions: Vec<SesPartition> = SurveyYear::ALL
        .iter()
        .map(|&year| partition_moments(rows, year))
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    for (idx, r) in rows.iter().enumerate() {
        let row = to_analysis_row(r, &ses_partitions).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "row {idx} ({}) has missing values; features require cleaned input",
                r.year
            ))
        })?;
        out.push(row);
    }

    Ok(CombinedDataset {
        rows: out,
        ses_partitions,
    })
}

fn to_analysis_row(r: &StudentRecord, partitions: &[SesPartition]) -> Option<AnalysisRow> {
    let country_code = r.country_code.clone()?;
    let oecd = r.oecd?;
    let student_gender = r.student_gender?;
    let homepos = r.homepos?;
    let performance_group = PerformanceGroup::classify(&country_code);

    let ses_standardized = partitions
        .iter()
        .find(|p| p.year == r.year)
        .map(|p| standardize(homepos, p))
        .unwrap_or(0.0);

    Some(AnalysisRow {
        country_id: r.country_id?,
        country_code,
        school_id: r.school_id?,
        student_id: r.student_id?,
        oecd,
        grade: r.grade?,
        student_gender,
        homepos,
        paredint: r.paredint?,
        reading_score: r.reading_score?,
        year: r.year,
        year_binary: r.year.binary(),
        gender_numeric: student_gender.numeric(),
        oecd_numeric: oecd.numeric(),
        performance_group,
        performance_group_numeric: performance_group.numeric(),
        ses_standardized,
    })
}

fn standardize(x: f64, p: &SesPartition) -> f64 {
    if p.sd.is_finite() && p.sd > 0.0 {
        (x - p.mean) / p.sd
    } else {
        0.0
    }
}

/// Mean and sample (n-1) standard deviation of `homepos` within one year.
fn partition_moments(rows: &[StudentRecord], year: SurveyYear) -> SesPartition {
    let values: Vec<f64> = rows
        .iter()
        .filter(|r| r.year == year)
        .filter_map(|r| r.homepos)
        .collect();
    let n = values.len();

    if n == 0 {
        return SesPartition { year, n, mean: f64::NAN, sd: f64::NAN };
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let sd = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ss / (n as f64 - 1.0)).sqrt()
    } else {
        f64::NAN
    };

    if !(sd.is_finite() && sd > 0.0) {
        log::warn!("{year}: homepos has no dispersion (n={n}); SES_standardized set to 0");
    } else {
        log::debug!("{year}: homepos mean={mean:.4} sd={sd:.4} n={n}");
    }

    SesPartition { year, n, mean, sd }
}
