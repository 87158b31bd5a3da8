//! Event-log source interface
//!
//! The real event-log storage is a black box behind the `UsageSource` trait:
//! the engine only asks for an ordered batch of records matching a filter.
//! A source that cannot be read answers `SourceError::Unavailable`, which the
//! pipeline treats as "no data this run", never as a crash.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::schema::RawRecordAdapter;
use crate::types::UsageRecord;

/// Errors a usage source can report
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source cannot be read (missing, permission denied). Callers run
    /// with empty usage.
    #[error("Usage source unavailable: {0}")]
    Unavailable(String),

    /// The source was readable but its content could not be understood
    #[error("Usage source returned malformed data: {0}")]
    Malformed(String),
}

/// Filter for a source query.
///
/// The app filter is a case-insensitive substring match on the raw app
/// identifier; the date filter keeps records whose start falls on that local
/// calendar day; `include_web` controls whether url/domain survive into the
/// result.
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    /// Maximum number of records to return
    pub limit: Option<usize>,
    /// Substring filter on the raw app identifier
    pub app_filter: Option<String>,
    /// Keep only records starting on this date
    pub date: Option<NaiveDate>,
    /// Keep web fields (url, domain) on matching records
    pub include_web: bool,
}

impl QueryFilter {
    /// App-only configuration: web fields are stripped from every record
    pub fn apps_only(date: Option<NaiveDate>) -> Self {
        Self {
            date,
            include_web: false,
            ..Self::default()
        }
    }

    /// App + web configuration: records keep their url/domain fields
    pub fn with_web(date: Option<NaiveDate>) -> Self {
        Self {
            date,
            include_web: true,
            ..Self::default()
        }
    }
}

/// A queryable source of usage records
pub trait UsageSource {
    /// Query records matching the filter, ordered newest first
    fn query(&self, filter: &QueryFilter) -> Result<Vec<UsageRecord>, SourceError>;
}

/// File-backed source reading usage.raw_record.v1 NDJSON.
///
/// A missing or unreadable file degrades to `Unavailable`; malformed lines
/// or invalid records are `Malformed`.
pub struct NdjsonLogSource {
    path: PathBuf,
}

impl NdjsonLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UsageSource for NdjsonLogSource {
    fn query(&self, filter: &QueryFilter) -> Result<Vec<UsageRecord>, SourceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "usage log not readable");
                return Err(SourceError::Unavailable(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let raw = RawRecordAdapter::parse_ndjson(&content)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;
        let records = RawRecordAdapter::to_usage(raw)
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(apply_filter(records, filter))
    }
}

/// Apply filter semantics to an in-memory batch: app substring and date
/// predicates first, then newest-first ordering, then the result limit.
pub fn apply_filter(records: Vec<UsageRecord>, filter: &QueryFilter) -> Vec<UsageRecord> {
    let mut records: Vec<UsageRecord> = records
        .into_iter()
        .filter(|r| match &filter.app_filter {
            Some(needle) => r.app.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        })
        .filter(|r| match filter.date {
            // Daily runs mean the user's calendar day, so the UTC timestamp
            // is shifted into the local timezone before comparing
            Some(date) => r.start_time.with_timezone(&chrono::Local).date_naive() == date,
            None => true,
        })
        .map(|mut r| {
            if !filter.include_web {
                r.url = None;
                r.domain = None;
            }
            r
        })
        .collect();

    records.sort_by(|a, b| b.start_time.cmp(&a.start_time));

    if let Some(limit) = filter.limit {
        records.truncate(limit);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn record(app: &str, domain: Option<&str>, day: u32, hour: u32) -> UsageRecord {
        let start = Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap();
        UsageRecord {
            app: app.to_string(),
            url: domain.map(|d| format!("https://{}/", d)),
            domain: domain.map(|d| d.to_string()),
            duration_seconds: 60.0,
            start_time: start,
            end_time: start + chrono::Duration::seconds(60),
        }
    }

    #[test]
    fn test_app_filter_is_case_insensitive_substring() {
        let records = vec![
            record("com.apple.Safari", None, 10, 9),
            record("com.spotify.client", None, 10, 10),
        ];

        let filter = QueryFilter {
            app_filter: Some("SAFARI".to_string()),
            include_web: true,
            ..Default::default()
        };
        let out = apply_filter(records, &filter);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].app, "com.apple.Safari");
    }

    #[test]
    fn test_date_filter_keeps_local_day() {
        let records = vec![record("Safari", None, 10, 9), record("Safari", None, 11, 9)];
        let wanted = records[1]
            .start_time
            .with_timezone(&chrono::Local)
            .date_naive();

        let out = apply_filter(records, &QueryFilter::with_web(Some(wanted)));

        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].start_time,
            Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_date_filter_follows_timezone_shift() {
        // A session late in the UTC evening belongs to whatever calendar day
        // it falls on locally, which differs from the UTC day in any
        // positive-offset timezone
        let late = record("Safari", None, 10, 23);
        let local_day = late.start_time.with_timezone(&chrono::Local).date_naive();

        let kept = apply_filter(vec![late.clone()], &QueryFilter::with_web(Some(local_day)));
        assert_eq!(kept.len(), 1);

        let off_day = local_day + chrono::Duration::days(2);
        let dropped = apply_filter(vec![late], &QueryFilter::with_web(Some(off_day)));
        assert_eq!(dropped.len(), 0);
    }

    #[test]
    fn test_apps_only_strips_web_fields() {
        let records = vec![record("Safari", Some("youtube.com"), 10, 9)];

        let out = apply_filter(records, &QueryFilter::apps_only(None));

        assert_eq!(out[0].url, None);
        assert_eq!(out[0].domain, None);
    }

    #[test]
    fn test_newest_first_and_limit() {
        let records = vec![
            record("A", None, 10, 9),
            record("B", None, 10, 11),
            record("C", None, 10, 10),
        ];

        let filter = QueryFilter {
            limit: Some(2),
            include_web: true,
            ..Default::default()
        };
        let out = apply_filter(records, &filter);

        let apps: Vec<&str> = out.iter().map(|r| r.app.as_str()).collect();
        assert_eq!(apps, vec!["B", "C"]);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let source = NdjsonLogSource::new("/nonexistent/usage.ndjson");
        let err = source.query(&QueryFilter::default()).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[test]
    fn test_file_backed_query() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"app":"com.apple.Safari","domain":"www.youtube.com","url":"https://www.youtube.com/","duration_seconds":300.0,"start_time":"2024-03-10T09:00:00Z","end_time":"2024-03-10T09:05:00Z"}}"#
        )
        .unwrap();

        let source = NdjsonLogSource::new(file.path());
        let out = source.query(&QueryFilter::with_web(None)).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].domain.as_deref(), Some("www.youtube.com"));
    }

    #[test]
    fn test_malformed_file_is_malformed_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json at all").unwrap();

        let source = NdjsonLogSource::new(file.path());
        let err = source.query(&QueryFilter::default()).unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
