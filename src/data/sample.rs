//! Synthetic PISA-shaped extracts.
//!
//! The generated tables use the raw survey headers and codes, so they run through
//! exactly the same load → harmonize → clean → fit path as the real files. The
//! generating process has a known difference-in-differences effect for OECD
//! countries, which makes the output useful for checking the pipeline end to end.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use csv::StringRecord;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{SimulateConfig, SurveyYear};
use crate::error::AppError;
use crate::io::ingest::RawTable;

/// Raw headers in source order.
pub const RAW_HEADERS: [&str; 10] = [
    "CNTRYID", "CNT", "CNTSCHID", "CNTSTUID", "OECD", "GRADE", "ST004D01T", "HOMEPOS", "PAREDINT",
    "reading_score",
];

/// Baseline reading score before country, year and student effects.
pub const BASE_SCORE: f64 = 450.0;
/// Common 2018 → 2022 shift for every country.
pub const YEAR_SHIFT: f64 = -12.0;
pub const FEMALE_EFFECT: f64 = 15.0;
/// Effect of one within-year standard deviation of `homepos`.
pub const SES_EFFECT: f64 = 25.0;
pub const PAREDINT_EFFECT: f64 = 2.0;
/// Mean of `homepos` per survey year (the index drifts between cycles).
const HOMEPOS_MEAN: [(SurveyYear, f64); 2] = [(SurveyYear::Y2018, 0.0), (SurveyYear::Y2022, 0.3)];
const SCHOOLS_PER_COUNTRY: i64 = 20;

/// A simulated participating country.
#[derive(Debug, Clone, Copy)]
pub struct SimCountry {
    pub id: i64,
    pub code: &'static str,
    pub oecd: bool,
    /// Level shift relative to `BASE_SCORE`.
    pub effect: f64,
}

pub const COUNTRIES: [SimCountry; 12] = [
    SimCountry { id: 344, code: "HKG", oecd: false, effect: 55.0 },
    SimCountry { id: 410, code: "KOR", oecd: true, effect: 50.0 },
    SimCountry { id: 158, code: "TAP", oecd: false, effect: 45.0 },
    SimCountry { id: 446, code: "MAC", oecd: false, effect: 50.0 },
    SimCountry { id: 826, code: "GBR", oecd: true, effect: 40.0 },
    SimCountry { id: 840, code: "USA", oecd: true, effect: 45.0 },
    SimCountry { id: 276, code: "DEU", oecd: true, effect: 30.0 },
    SimCountry { id: 484, code: "MEX", oecd: true, effect: -30.0 },
    SimCountry { id: 76, code: "BRA", oecd: false, effect: -40.0 },
    SimCountry { id: 360, code: "IDN", oecd: false, effect: -75.0 },
    SimCountry { id: 504, code: "MAR", oecd: false, effect: -90.0 },
    SimCountry { id: 608, code: "PHL", oecd: false, effect: -110.0 },
];

/// Both simulated survey years.
#[derive(Debug, Clone)]
pub struct SimulatedExtracts {
    pub pisa_2018: RawTable,
    pub pisa_2022: RawTable,
}

pub fn simulate(config: &SimulateConfig) -> Result<SimulatedExtracts, AppError> {
    if config.students_per_country == 0 {
        return Err(AppError::InvalidInput("Students per country must be > 0.".into()));
    }
    if !(0.0..1.0).contains(&config.missing_rate) {
        return Err(AppError::InvalidInput(format!(
            "Missing rate must be in [0, 1), got {}.",
            config.missing_rate
        )));
    }
    if !(config.noise_sd.is_finite() && config.noise_sd >= 0.0) {
        return Err(AppError::InvalidInput("Noise sd must be finite and >= 0.".into()));
    }

    Ok(SimulatedExtracts {
        pisa_2018: simulate_year(config, SurveyYear::Y2018)?,
        pisa_2022: simulate_year(config, SurveyYear::Y2022)?,
    })
}

fn simulate_year(config: &SimulateConfig, year: SurveyYear) -> Result<RawTable, AppError> {
    let mut rng = StdRng::seed_from_u64(year_seed(config.seed, year));
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::InvalidInput(format!("Noise distribution error: {e}")))?;

    let homepos_mean = HOMEPOS_MEAN
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, m)| *m)
        .unwrap_or(0.0);
    let yb = f64::from(year.binary());

    let mut records = Vec::with_capacity(COUNTRIES.len() * config.students_per_country);
    for country in COUNTRIES {
        let oecd = if country.oecd { 1.0 } else { 0.0 };
        for i in 0..config.students_per_country {
            let school = country.id * 1000 + (i as i64 % SCHOOLS_PER_COUNTRY) + 1;
            let student = country.id * 100_000 + i as i64 + 1;

            let grade_roll: f64 = rng.r#gen();
            let grade = if grade_roll < 0.15 {
                9
            } else if grade_roll < 0.85 {
                10
            } else {
                11
            };
            let female = rng.gen_bool(0.5);
            let ses_z: f64 = normal.sample(&mut rng);
            let homepos = homepos_mean + ses_z;
            let paredint = (13.0 + 2.5 * normal.sample(&mut rng)).clamp(3.0, 18.0);

            let score = BASE_SCORE
                + country.effect
                + YEAR_SHIFT * yb
                + config.did_effect * yb * oecd
                + FEMALE_EFFECT * if female { 1.0 } else { 0.0 }
                + SES_EFFECT * ses_z
                + PAREDINT_EFFECT * paredint
                + config.noise_sd * normal.sample(&mut rng);

            let mut cells: Vec<String> = vec![
                country.id.to_string(),
                country.code.to_string(),
                school.to_string(),
                student.to_string(),
                format!("{}", oecd as i64),
                grade.to_string(),
                if female { "1".into() } else { "2".into() },
                format!("{homepos:.4}"),
                format!("{paredint:.1}"),
                format!("{score:.3}"),
            ];

            // Only the questionnaire-derived fields go missing in real extracts.
            for cell in cells.iter_mut().skip(5) {
                if config.missing_rate > 0.0 && rng.gen_bool(config.missing_rate) {
                    cell.clear();
                }
            }
            records.push(StringRecord::from(cells));
        }
    }

    log::info!("Simulated {} students for {year}", records.len());

    Ok(RawTable {
        source: PathBuf::from(file_name(year)),
        headers: RAW_HEADERS.iter().map(|h| h.to_string()).collect(),
        records,
    })
}

/// File name written for a simulated survey year.
pub fn file_name(year: SurveyYear) -> String {
    format!("pisa_{year}.csv")
}

fn year_seed(seed: u64, year: SurveyYear) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    year.value().hash(&mut hasher);
    hasher.finish()
}
