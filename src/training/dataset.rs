//! Training dataset loading and cleaning

use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use super::TrainingError;
use crate::types::telemetry::{Telemetry, TelemetryRow, TELEMETRY_COLUMNS};

/// A row-level problem. The row is dropped; training continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataValidationError {
    #[error("row {row}: column '{column}' is not numeric: {value:?}")]
    NotNumeric {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: empty label")]
    MissingLabel { row: usize },

    #[error("row {row}: unreadable record: {message}")]
    Malformed { row: usize, message: String },
}

/// Parsed CSV records, each either a raw row or the reason it is unusable
pub type RawRows = Vec<Result<TelemetryRow, DataValidationError>>;

/// A cleaned training example
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTelemetry {
    pub telemetry: Telemetry,
    pub label: String,
}

/// Output of the CLEAN stage
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    pub records: Vec<LabeledTelemetry>,
    pub dropped: Vec<DataValidationError>,
}

/// Read a telemetry CSV file (header row required).
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<RawRows, TrainingError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        TrainingError::DatasetLoad(format!("cannot open {}: {}", path.display(), e))
    })?;
    let rows = load_from_reader(file)?;
    info!(path = %path.display(), rows = rows.len(), "Dataset loaded");
    Ok(rows)
}

/// Read telemetry CSV from any reader.
///
/// Fails if the header lacks a required column or the table has no rows.
/// Records that cannot be parsed are returned as row-level errors.
pub fn load_from_reader<R: Read>(reader: R) -> Result<RawRows, TrainingError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| TrainingError::DatasetLoad(format!("cannot read header: {e}")))?
        .clone();

    let missing: Vec<&str> = TELEMETRY_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(TrainingError::DatasetLoad(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let rows: RawRows = csv_reader
        .deserialize::<TelemetryRow>()
        .enumerate()
        .map(|(idx, record)| {
            record.map_err(|e| DataValidationError::Malformed {
                row: idx + 1,
                message: e.to_string(),
            })
        })
        .collect();

    if rows.is_empty() {
        return Err(TrainingError::DatasetLoad("dataset has no rows".to_string()));
    }
    Ok(rows)
}

/// Coerce numeric columns and drop rows that fail. Row numbers are 1-based
/// and count data rows only.
pub fn clean(rows: RawRows) -> CleanedDataset {
    let mut cleaned = CleanedDataset::default();

    for (idx, row) in rows.into_iter().enumerate() {
        let result = row.and_then(|row| coerce_row(idx + 1, row));
        match result {
            Ok(record) => cleaned.records.push(record),
            Err(issue) => {
                warn!(error = %issue, "Dropping training row");
                cleaned.dropped.push(issue);
            }
        }
    }

    cleaned
}

fn coerce_row(
    row_number: usize,
    row: TelemetryRow,
) -> Result<LabeledTelemetry, DataValidationError> {
    let number = |column: &'static str, value: &str| -> Result<f64, DataValidationError> {
        value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DataValidationError::NotNumeric {
                row: row_number,
                column,
                value: value.to_string(),
            })
    };

    let time_on_page = number("timeOnPage", &row.time_on_page)?;
    let telemetry = Telemetry {
        mouse_movement: number("mouseMovements", &row.mouse_movements)?,
        screen_width: number("screenWidth", &row.screen_width)?,
        screen_height: number("screenHeight", &row.screen_height)?,
        clicks: number("clicks", &row.clicks)?,
        time_on_page,
        key_presses: number("keyPresses", &row.key_presses)?,
        language: row.language,
        browser_name: row.browser_name,
        user_agent: row.user_agent,
        referrer: row.referrer,
    };

    let label = row.label.trim().to_string();
    if label.is_empty() {
        return Err(DataValidationError::MissingLabel { row: row_number });
    }

    Ok(LabeledTelemetry { telemetry, label })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "mouseMovements,screenWidth,screenHeight,clicks,timeOnPage,keyPresses,language,browserName,userAgent,referrer,label\n";

    fn parse(body: &str) -> Result<RawRows, TrainingError> {
        load_from_reader(format!("{HEADER}{body}").as_bytes())
    }

    #[test]
    fn test_load_and_clean() {
        let rows = parse(
            "200,1920,1080,7,30,40,en-GB,Chrome,\"Mozilla/5.0 (X11, Linux)\",direct,human\n\
             3,800,600,0,1.5,0,en-US,HeadlessChrome,bot-agent,,bot\n",
        )
        .unwrap();
        let cleaned = clean(rows);

        assert!(cleaned.dropped.is_empty());
        assert_eq!(cleaned.records.len(), 2);

        let first = &cleaned.records[0];
        assert_eq!(first.label, "human");
        assert_eq!(first.telemetry.mouse_movement, 200.0);
        assert_eq!(first.telemetry.user_agent, "Mozilla/5.0 (X11, Linux)");

        let second = &cleaned.records[1];
        assert_eq!(second.telemetry.time_on_page, 1.5);
        assert_eq!(second.telemetry.referrer, "");
    }

    #[test]
    fn test_non_numeric_time_on_page_is_dropped() {
        let rows = parse(
            "200,1920,1080,7,abc,40,en-GB,Chrome,UA,direct,human\n\
             200,1920,1080,7,,40,en-GB,Chrome,UA,direct,human\n\
             200,1920,1080,7,14,40,en-GB,Chrome,UA,direct,human\n",
        )
        .unwrap();
        let cleaned = clean(rows);

        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.dropped.len(), 2);
        assert_eq!(
            cleaned.dropped[0],
            DataValidationError::NotNumeric {
                row: 1,
                column: "timeOnPage",
                value: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_missing_label_is_dropped() {
        let rows = parse("200,1920,1080,7,14,40,en-GB,Chrome,UA,direct,\n").unwrap();
        let cleaned = clean(rows);

        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.dropped, vec![DataValidationError::MissingLabel { row: 1 }]);
    }

    #[test]
    fn test_short_record_is_dropped() {
        let rows = parse("200,1920\n200,1920,1080,7,14,40,en-GB,Chrome,UA,direct,human\n").unwrap();
        let cleaned = clean(rows);

        assert_eq!(cleaned.records.len(), 1);
        assert!(matches!(
            cleaned.dropped[0],
            DataValidationError::Malformed { row: 1, .. }
        ));
    }

    #[test]
    fn test_missing_column_fails() {
        let err = load_from_reader("mouseMovements,label\n1,bot\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TrainingError::DatasetLoad(msg) if msg.contains("screenWidth")));
    }

    #[test]
    fn test_empty_dataset_fails() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, TrainingError::DatasetLoad(_)));
    }

    #[test]
    fn test_missing_file_fails() {
        let err = load_dataset("/nonexistent/data.csv").unwrap_err();
        assert!(matches!(err, TrainingError::DatasetLoad(_)));
    }
}
