//! Delimited file loading.
//!
//! This module only turns a file into a `RawTable`: header names exactly as
//! written in the source (minus a BOM) and every cell as a string. Type
//! coercion and column selection belong to `data::harmonize`.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::error::AppError;

/// A loaded file: source headers plus raw string records.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: PathBuf,
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

impl RawTable {
    /// Map lowercased header names to their column index.
    ///
    /// The first occurrence wins when a header is repeated.
    pub fn header_index(&self) -> HashMap<String, usize> {
        let mut map = HashMap::with_capacity(self.headers.len());
        for (idx, name) in self.headers.iter().enumerate() {
            map.entry(name.to_ascii_lowercase()).or_insert(idx);
        }
        map
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load a delimited file into a `RawTable`.
///
/// Any parse failure (including a row whose field count differs from the header)
/// fails the whole load: a partially read survey extract is not usable.
pub fn load_table(path: &Path, delimiter: u8) -> Result<RawTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::DataLoad(format!("Failed to open '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| {
            AppError::DataLoad(format!("Failed to read headers of '{}': {e}", path.display()))
        })?
        .iter()
        .map(normalize_header_name)
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(AppError::DataLoad(format!(
            "'{}' has no header row.",
            path.display()
        )));
    }

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::DataLoad(format!(
                "'{}' is not valid delimited data (line {line}): {e}",
                path.display()
            ))
        })?;
        records.push(record);
    }

    log::info!(
        "Loaded {} rows x {} columns from {}",
        records.len(),
        headers.len(),
        path.display()
    );

    Ok(RawTable {
        source: path.to_path_buf(),
        headers,
        records,
    })
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    // Left in place it would make the first column look absent.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn loads_headers_verbatim_and_strips_bom() {
        let f = write_tmp("\u{feff}CNT,reading_score\nUSA,512.3\nKOR,530\n");
        let table = load_table(f.path(), b',').unwrap();
        assert_eq!(table.headers, vec!["CNT", "reading_score"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.header_index().get("cnt"), Some(&0));
    }

    #[test]
    fn semicolon_delimiter() {
        let f = write_tmp("CNT;OECD\nUSA;1\n");
        let table = load_table(f.path(), b';').unwrap();
        assert_eq!(table.headers.len(), 2);
        assert_eq!(&table.records[0][1], "1");
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_table(Path::new("/definitely/not/here.csv"), b',').unwrap_err();
        assert!(matches!(err, AppError::DataLoad(_)));
    }

    #[test]
    fn ragged_rows_are_a_load_error() {
        let f = write_tmp("A,B\n1,2\n3\n");
        let err = load_table(f.path(), b',').unwrap_err();
        assert!(matches!(err, AppError::DataLoad(ref m) if m.contains("line 3")));
    }

    #[test]
    fn empty_file_is_a_load_error() {
        let f = write_tmp("");
        assert!(matches!(load_table(f.path(), b','), Err(AppError::DataLoad(_))));
    }
}
