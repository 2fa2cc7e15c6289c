//! Schema harmonization.
//!
//! A raw survey extract is mapped onto the canonical schema through one explicit
//! policy table: which source column feeds which harmonized column, what type it
//! is coerced to, and what happens when coercion fails (always: the cell becomes
//! missing and is counted).

use std::collections::BTreeMap;

use crate::domain::{Column, Gender, OecdStatus, StudentRecord, SurveyYear};
use crate::error::AppError;
use crate::io::ingest::RawTable;

/// Target type of a harmonized column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Opaque label, kept as written.
    Token,
    /// 64-bit integer; integral decimals such as `800001.0` are accepted.
    Integer,
    Float,
    /// `{1 → Female, 2 → Male}`.
    GenderCode,
    /// `{0 → Non_OECD, 1 → OECD}`.
    OecdCode,
}

#[derive(Debug, Clone, Copy)]
pub struct CoercionRule {
    pub column: Column,
    /// Source header as it appears in the PISA extracts (matched case-insensitively).
    pub source: &'static str,
    pub target: Coercion,
}

pub const COERCION_POLICY: [CoercionRule; 10] = [
    CoercionRule { column: Column::CountryId, source: "CNTRYID", target: Coercion::Integer },
    CoercionRule { column: Column::CountryCode, source: "CNT", target: Coercion::Token },
    CoercionRule { column: Column::SchoolId, source: "CNTSCHID", target: Coercion::Integer },
    CoercionRule { column: Column::StudentId, source: "CNTSTUID", target: Coercion::Integer },
    CoercionRule { column: Column::Oecd, source: "OECD", target: Coercion::OecdCode },
    CoercionRule { column: Column::Grade, source: "GRADE", target: Coercion::Float },
    CoercionRule { column: Column::StudentGender, source: "ST004D01T", target: Coercion::GenderCode },
    CoercionRule { column: Column::Homepos, source: "HOMEPOS", target: Coercion::Float },
    CoercionRule { column: Column::Paredint, source: "PAREDINT", target: Coercion::Float },
    CoercionRule { column: Column::ReadingScore, source: "reading_score", target: Coercion::Float },
];

/// Cell spellings treated as "no value" rather than as a failed coercion.
const MISSING_TOKENS: [&str; 5] = ["NA", "N/A", "NAN", "NULL", "."];

/// One harmonized survey year.
#[derive(Debug, Clone)]
pub struct HarmonizedTable {
    pub year: SurveyYear,
    pub records: Vec<StudentRecord>,
    /// Non-empty cells that could not be coerced (or carried an unmapped code).
    pub coercion_failures: BTreeMap<Column, usize>,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Token(String),
    Integer(i64),
    Float(f64),
    Gender(Gender),
    Oecd(OecdStatus),
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Missing,
    Failed,
    Value(Value),
}

/// Harmonize one raw table and tag every row with `year`.
pub fn harmonize(raw: &RawTable, year: SurveyYear) -> Result<HarmonizedTable, AppError> {
    let index = raw.header_index();

    let absent: Vec<&str> = COERCION_POLICY
        .iter()
        .filter(|rule| !index.contains_key(&rule.source.to_ascii_lowercase()))
        .map(|rule| rule.source)
        .collect();
    if !absent.is_empty() {
        return Err(AppError::Schema(format!(
            "'{}' ({year}) is missing required column(s): {}",
            raw.source.display(),
            absent.join(", ")
        )));
    }

    let positions: Vec<(CoercionRule, usize)> = COERCION_POLICY
        .iter()
        .map(|rule| (*rule, index[&rule.source.to_ascii_lowercase()]))
        .collect();

    let mut coercion_failures = BTreeMap::new();
    let mut records = Vec::with_capacity(raw.len());

    for raw_record in &raw.records {
        let mut record = StudentRecord::empty(year);
        for (rule, idx) in &positions {
            let cell = coerce(raw_record.get(*idx).unwrap_or(""), rule.target);
            let stored = match cell {
                Cell::Missing => true,
                Cell::Failed => false,
                Cell::Value(value) => assign(&mut record, rule.column, value),
            };
            if !stored {
                *coercion_failures.entry(rule.column).or_insert(0usize) += 1;
            }
        }
        records.push(record);
    }

    for (column, count) in &coercion_failures {
        log::warn!("{year}: {count} value(s) in `{column}` could not be coerced; treated as missing");
    }
    log::info!("Harmonized {} rows for {year}", records.len());

    Ok(HarmonizedTable {
        year,
        records,
        coercion_failures,
    })
}

/// Append two harmonized survey years into one table (first table's rows first).
pub fn concat(first: HarmonizedTable, second: HarmonizedTable) -> Result<Vec<StudentRecord>, AppError> {
    if first.year == second.year {
        return Err(AppError::Schema(format!(
            "Both input tables are tagged {}; expected one table per survey year.",
            first.year
        )));
    }
    let mut rows = first.records;
    rows.extend(second.records);
    Ok(rows)
}

fn coerce(raw: &str, target: Coercion) -> Cell {
    let s = raw.trim();
    if s.is_empty() || MISSING_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        return Cell::Missing;
    }

    let value = match target {
        Coercion::Token => Some(Value::Token(s.to_string())),
        Coercion::Integer => parse_integer(s).map(Value::Integer),
        Coercion::Float => parse_float(s).map(Value::Float),
        Coercion::GenderCode => parse_integer(s).and_then(Gender::from_code).map(Value::Gender),
        Coercion::OecdCode => parse_integer(s).and_then(OecdStatus::from_code).map(Value::Oecd),
    };

    match value {
        Some(v) => Cell::Value(v),
        None => Cell::Failed,
    }
}

/// Store `value` into `column`; returns `false` if the pair does not match the schema.
fn assign(record: &mut StudentRecord, column: Column, value: Value) -> bool {
    match (column, value) {
        (Column::CountryId, Value::Integer(v)) => record.country_id = Some(v),
        (Column::CountryCode, Value::Token(v)) => record.country_code = Some(v),
        (Column::SchoolId, Value::Integer(v)) => record.school_id = Some(v),
        (Column::StudentId, Value::Integer(v)) => record.student_id = Some(v),
        (Column::Oecd, Value::Oecd(v)) => record.oecd = Some(v),
        (Column::Grade, Value::Float(v)) => record.grade = Some(v),
        (Column::StudentGender, Value::Gender(v)) => record.student_gender = Some(v),
        (Column::Homepos, Value::Float(v)) => record.homepos = Some(v),
        (Column::Paredint, Value::Float(v)) => record.paredint = Some(v),
        (Column::ReadingScore, Value::Float(v)) => record.reading_score = Some(v),
        _ => return false,
    }
    true
}

fn parse_float(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn parse_integer(s: &str) -> Option<i64> {
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    // Extracts written by statistical packages often store ids as `800001.0`.
    // Only accept values that are exactly representable integers.
    let v = parse_float(s)?;
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0; // 2^53
    if v.fract() == 0.0 && v.abs() <= MAX_EXACT {
        Some(v as i64)
    } else {
        None
    }
}
