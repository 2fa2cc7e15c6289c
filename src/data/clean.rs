//! Missing-data reporting and listwise deletion.

use crate::domain::{Column, StudentRecord, SurveyYear};

/// Missing-value tally for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingCount {
    pub count: usize,
    pub percent: f64,
}

impl MissingCount {
    fn new(count: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            count as f64 / total as f64 * 100.0
        };
        Self { count, percent }
    }
}

/// Missing-value report row: overall plus per survey year.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingEntry {
    pub column: Column,
    pub overall: MissingCount,
    pub by_year: Vec<(SurveyYear, MissingCount)>,
}

/// Missing-value report over a (pre-cleaning) table.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingReport {
    pub total_rows: usize,
    pub rows_per_year: Vec<(SurveyYear, usize)>,
    /// Sorted by descending overall count; ties keep schema order.
    pub entries: Vec<MissingEntry>,
}

impl MissingReport {
    pub fn get(&self, column: Column) -> Option<&MissingEntry> {
        self.entries.iter().find(|e| e.column == column)
    }
}

/// Count missing values per column. Informational only; nothing is dropped.
pub fn missing_report(rows: &[StudentRecord]) -> MissingReport {
    let rows_per_year: Vec<(SurveyYear, usize)> = SurveyYear::ALL
        .iter()
        .map(|&y| (y, rows.iter().filter(|r| r.year == y).count()))
        .collect();

    let mut entries: Vec<MissingEntry> = Column::ALL
        .iter()
        .map(|&column| {
            let count = rows.iter().filter(|r| r.is_missing(column)).count();
            let by_year = rows_per_year
                .iter()
                .map(|&(year, n)| {
                    let c = rows
                        .iter()
                        .filter(|r| r.year == year && r.is_missing(column))
                        .count();
                    (year, MissingCount::new(c, n))
                })
                .collect();
            MissingEntry {
                column,
                overall: MissingCount::new(count, rows.len()),
                by_year,
            }
        })
        .collect();

    // Stable sort keeps schema order among equal counts.
    entries.sort_by(|a, b| b.overall.count.cmp(&a.overall.count));

    MissingReport {
        total_rows: rows.len(),
        rows_per_year,
        entries,
    }
}

/// Drop every row with a missing canonical value. Kept rows are not altered.
pub fn clean(rows: &[StudentRecord]) -> Vec<StudentRecord> {
    let kept: Vec<StudentRecord> = rows.iter().filter(|r| r.is_complete()).cloned().collect();

    let dropped = rows.len() - kept.len();
    if !rows.is_empty() && kept.is_empty() {
        log::warn!("Cleaning dropped all {} rows; no complete cases remain", rows.len());
    } else {
        log::info!(
            "Cleaning kept {} of {} rows ({dropped} dropped)",
            kept.len(),
            rows.len()
        );
    }
    kept
}
