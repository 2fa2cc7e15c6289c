//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - used in-memory by every pipeline stage
//! - exported to CSV/JSON
//! - rebuilt in tests without touching the filesystem

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Country codes counted as the "Top" performance group.
///
/// Every other country, including the low performers, falls into `Bottom`.
pub const TOP_PERFORMERS: [&str; 6] = ["HKG", "KOR", "TAP", "MAC", "GBR", "USA"];

/// PISA survey cycle a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SurveyYear {
    #[serde(rename = "2018")]
    Y2018,
    #[serde(rename = "2022")]
    Y2022,
}

impl SurveyYear {
    pub const ALL: [SurveyYear; 2] = [SurveyYear::Y2018, SurveyYear::Y2022];

    pub fn value(self) -> u16 {
        match self {
            SurveyYear::Y2018 => 2018,
            SurveyYear::Y2022 => 2022,
        }
    }

    /// DiD time indicator: 0 before the pandemic, 1 after.
    pub fn binary(self) -> u8 {
        match self {
            SurveyYear::Y2018 => 0,
            SurveyYear::Y2022 => 1,
        }
    }
}

impl fmt::Display for SurveyYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Student gender as labelled from the `ST004D01T` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// `{1 → Female, 2 → Male}`; any other code is unlabelled.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Gender::Female),
            2 => Some(Gender::Male),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }

    pub fn numeric(self) -> u8 {
        match self {
            Gender::Female => 1,
            Gender::Male => 0,
        }
    }
}

/// OECD membership of the student's country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OecdStatus {
    #[serde(rename = "Non_OECD")]
    NonOecd,
    #[serde(rename = "OECD")]
    Oecd,
}

impl OecdStatus {
    /// `{0 → Non_OECD, 1 → OECD}`; any other code is unlabelled.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(OecdStatus::NonOecd),
            1 => Some(OecdStatus::Oecd),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OecdStatus::NonOecd => "Non_OECD",
            OecdStatus::Oecd => "OECD",
        }
    }

    pub fn numeric(self) -> u8 {
        match self {
            OecdStatus::NonOecd => 0,
            OecdStatus::Oecd => 1,
        }
    }
}

/// Binary performance partition of all countries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PerformanceGroup {
    Top,
    Bottom,
}

impl PerformanceGroup {
    pub fn classify(country_code: &str) -> Self {
        if TOP_PERFORMERS.contains(&country_code) {
            PerformanceGroup::Top
        } else {
            PerformanceGroup::Bottom
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PerformanceGroup::Top => "Top",
            PerformanceGroup::Bottom => "Bottom",
        }
    }

    pub fn numeric(self) -> u8 {
        match self {
            PerformanceGroup::Top => 1,
            PerformanceGroup::Bottom => 0,
        }
    }
}

/// Harmonized column identifiers, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    CountryId,
    CountryCode,
    SchoolId,
    StudentId,
    Oecd,
    Grade,
    StudentGender,
    Homepos,
    Paredint,
    ReadingScore,
    Year,
}

impl Column {
    /// Canonical (harmonized) columns; `year` is attached afterwards.
    pub const CANONICAL: [Column; 10] = [
        Column::CountryId,
        Column::CountryCode,
        Column::SchoolId,
        Column::StudentId,
        Column::Oecd,
        Column::Grade,
        Column::StudentGender,
        Column::Homepos,
        Column::Paredint,
        Column::ReadingScore,
    ];

    pub const ALL: [Column; 11] = [
        Column::CountryId,
        Column::CountryCode,
        Column::SchoolId,
        Column::StudentId,
        Column::Oecd,
        Column::Grade,
        Column::StudentGender,
        Column::Homepos,
        Column::Paredint,
        Column::ReadingScore,
        Column::Year,
    ];

    /// Lowercase harmonized name.
    pub fn name(self) -> &'static str {
        match self {
            Column::CountryId => "country_id",
            Column::CountryCode => "country_code",
            Column::SchoolId => "school_id",
            Column::StudentId => "student_id",
            Column::Oecd => "oecd",
            Column::Grade => "grade",
            Column::StudentGender => "student_gender",
            Column::Homepos => "homepos",
            Column::Paredint => "paredint",
            Column::ReadingScore => "reading_score",
            Column::Year => "year",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One harmonized student assessment row. Every field but the year may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub country_id: Option<i64>,
    pub country_code: Option<String>,
    pub school_id: Option<i64>,
    pub student_id: Option<i64>,
    pub oecd: Option<OecdStatus>,
    pub grade: Option<f64>,
    pub student_gender: Option<Gender>,
    pub homepos: Option<f64>,
    pub paredint: Option<f64>,
    pub reading_score: Option<f64>,
    pub year: SurveyYear,
}

impl StudentRecord {
    /// A record with every canonical field missing.
    pub fn empty(year: SurveyYear) -> Self {
        Self {
            country_id: None,
            country_code: None,
            school_id: None,
            student_id: None,
            oecd: None,
            grade: None,
            student_gender: None,
            homepos: None,
            paredint: None,
            reading_score: None,
            year,
        }
    }

    pub fn is_missing(&self, column: Column) -> bool {
        match column {
            Column::CountryId => self.country_id.is_none(),
            Column::CountryCode => self.country_code.is_none(),
            Column::SchoolId => self.school_id.is_none(),
            Column::StudentId => self.student_id.is_none(),
            Column::Oecd => self.oecd.is_none(),
            Column::Grade => self.grade.is_none(),
            Column::StudentGender => self.student_gender.is_none(),
            Column::Homepos => self.homepos.is_none(),
            Column::Paredint => self.paredint.is_none(),
            Column::ReadingScore => self.reading_score.is_none(),
            Column::Year => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        Column::CANONICAL.iter().all(|&c| !self.is_missing(c))
    }
}

/// A cleaned row with every derived indicator attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRow {
    pub country_id: i64,
    pub country_code: String,
    pub school_id: i64,
    pub student_id: i64,
    pub oecd: OecdStatus,
    pub grade: f64,
    pub student_gender: Gender,
    pub homepos: f64,
    pub paredint: f64,
    pub reading_score: f64,
    pub year: SurveyYear,

    pub year_binary: u8,
    pub gender_numeric: u8,
    pub oecd_numeric: u8,
    pub performance_group: PerformanceGroup,
    pub performance_group_numeric: u8,
    #[serde(rename = "SES_standardized")]
    pub ses_standardized: f64,
}

/// Within-year moments of `homepos` used for SES standardization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SesPartition {
    pub year: SurveyYear,
    pub n: usize,
    pub mean: f64,
    pub sd: f64,
}

/// The cleaned, feature-enriched union of both survey years.
#[derive(Debug, Clone)]
pub struct CombinedDataset {
    pub rows: Vec<AnalysisRow>,
    pub ses_partitions: Vec<SesPartition>,
}

impl CombinedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted, de-duplicated country codes present in the data.
    pub fn countries(&self) -> Vec<String> {
        let mut out: Vec<String> = self.rows.iter().map(|r| r.country_code.clone()).collect();
        out.sort();
        out.dedup();
        out
    }
}

/// A full `did analyze` run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags and environment (plus defaults).
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub pisa_2018: PathBuf,
    pub pisa_2022: PathBuf,
    pub out_dir: PathBuf,
    pub delimiter: u8,
    /// Reference level for the country factor; `None` picks the first code.
    pub reference_country: Option<String>,
    pub charts: bool,
    pub export_dataset: Option<PathBuf>,
    pub print_reports: bool,
}

/// Settings for generating synthetic PISA-shaped extracts.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub out_dir: PathBuf,
    pub students_per_country: usize,
    pub seed: u64,
    /// Probability that any single predictor cell is blanked.
    pub missing_rate: f64,
    /// Change in the OECD gap between 2018 and 2022 (the true DiD effect).
    pub did_effect: f64,
    pub noise_sd: f64,
}
