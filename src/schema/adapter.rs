//! Adapter for parsing usage.raw_record.v1 input
//!
//! Handles NDJSON and JSON-array input, batch validation, and conversion of
//! raw records into the engine's in-memory `UsageRecord` form.

use crate::error::EngineError;
use crate::schema::raw_record::{RawUsageRecord, ValidationError};
use crate::types::UsageRecord;

/// Adapter for parsing and validating raw usage records
pub struct RawRecordAdapter;

impl RawRecordAdapter {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<RawUsageRecord>, EngineError> {
        let records: Vec<RawUsageRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) containing records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawUsageRecord>, EngineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawUsageRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(EngineError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Validate a batch of records, reporting only the failures
    pub fn validate_records(records: &[RawUsageRecord]) -> Vec<RecordIssue> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                record.validate().err().map(|error| RecordIssue {
                    index,
                    app: record.app.clone(),
                    error,
                })
            })
            .collect()
    }

    /// Validate and convert a batch into engine records.
    ///
    /// Any invalid record fails the whole batch; callers wanting partial
    /// acceptance should filter with `validate_records` first.
    pub fn to_usage(records: Vec<RawUsageRecord>) -> Result<Vec<UsageRecord>, EngineError> {
        let mut usage = Vec::with_capacity(records.len());
        for record in records {
            record
                .validate()
                .map_err(|e| EngineError::InvalidRecord(e.to_string()))?;
            usage.push(record.into_usage_record());
        }
        Ok(usage)
    }
}

/// One failed record from a batch validation
#[derive(Debug)]
pub struct RecordIssue {
    pub index: usize,
    pub app: String,
    pub error: ValidationError,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID_LINE: &str = r#"{"app":"com.apple.Safari","url":"https://www.youtube.com/watch","domain":"www.youtube.com","duration_seconds":300.0,"start_time":"2024-03-10T09:00:00Z","end_time":"2024-03-10T09:05:00Z","stream":"/app/webUsage"}"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let input = format!("{}\n\n{}\n", VALID_LINE, VALID_LINE);
        let records = RawRecordAdapter::parse_ndjson(&input).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].app, "com.apple.Safari");
    }

    #[test]
    fn test_parse_ndjson_reports_line_number() {
        let input = format!("{}\nnot json\n", VALID_LINE);
        let err = RawRecordAdapter::parse_ndjson(&input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_array() {
        let input = format!("[{}]", VALID_LINE);
        let records = RawRecordAdapter::parse_array(&input).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].domain.as_deref(), Some("www.youtube.com"));
    }

    #[test]
    fn test_validate_records_reports_only_failures() {
        let bad = r#"{"app":"","duration_seconds":60.0,"start_time":"2024-03-10T09:00:00Z","end_time":"2024-03-10T09:01:00Z"}"#;
        let input = format!("{}\n{}\n", VALID_LINE, bad);
        let records = RawRecordAdapter::parse_ndjson(&input).unwrap();

        let issues = RawRecordAdapter::validate_records(&records);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].index, 1);
    }

    #[test]
    fn test_to_usage_converts_valid_batch() {
        let records = RawRecordAdapter::parse_ndjson(VALID_LINE).unwrap();
        let usage = RawRecordAdapter::to_usage(records).unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].duration_seconds, 300.0);
        assert_eq!(usage[0].domain.as_deref(), Some("www.youtube.com"));
    }

    #[test]
    fn test_to_usage_rejects_invalid_record() {
        let bad = r#"{"app":"Safari","duration_seconds":-5.0,"start_time":"2024-03-10T09:00:00Z","end_time":"2024-03-10T09:01:00Z"}"#;
        let records = RawRecordAdapter::parse_ndjson(bad).unwrap();
        assert!(RawRecordAdapter::to_usage(records).is_err());
    }
}
