//! usage.raw_record.v1 schema definition
//!
//! The wire form of one device-activity interval as emitted by an event-log
//! exporter. App-usage records carry only the application identifier;
//! web-usage records additionally carry the page URL and domain. Optional
//! provenance fields identify the device that produced the interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::UsageRecord;

/// Current schema version
pub const SCHEMA_VERSION: &str = "usage.raw_record.v1";

/// Event-log stream a record originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stream {
    #[serde(rename = "/app/usage")]
    AppUsage,
    #[serde(rename = "/app/webUsage")]
    WebUsage,
}

impl Stream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::AppUsage => "/app/usage",
            Stream::WebUsage => "/app/webUsage",
        }
    }
}

/// The main usage.raw_record.v1 schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawUsageRecord {
    /// Schema version identifier
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Raw application identifier (required, non-empty)
    pub app: String,
    /// Page URL, web-usage records only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Web domain, web-usage records only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Interval length in seconds
    pub duration_seconds: f64,
    /// Interval start (UTC)
    pub start_time: DateTime<Utc>,
    /// Interval end (UTC)
    pub end_time: DateTime<Utc>,
    /// When the event log recorded the interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Identifier of the originating device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Model of the originating device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    /// Event-log stream the record came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<Stream>,
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl RawUsageRecord {
    /// Create an app-usage record
    pub fn app_usage(
        app: impl Into<String>,
        duration_seconds: f64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            app: app.into(),
            url: None,
            domain: None,
            duration_seconds,
            start_time,
            end_time,
            created_at: None,
            device_id: None,
            device_model: None,
            stream: Some(Stream::AppUsage),
        }
    }

    /// Create a web-usage record
    pub fn web_usage(
        app: impl Into<String>,
        url: impl Into<String>,
        domain: impl Into<String>,
        duration_seconds: f64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            app: app.into(),
            url: Some(url.into()),
            domain: Some(domain.into()),
            duration_seconds,
            start_time,
            end_time,
            created_at: None,
            device_id: None,
            device_model: None,
            stream: Some(Stream::WebUsage),
        }
    }

    /// Attach device provenance
    pub fn with_device(
        mut self,
        device_id: impl Into<String>,
        device_model: impl Into<String>,
    ) -> Self {
        self.device_id = Some(device_id.into());
        self.device_model = Some(device_model.into());
        self
    }

    /// Validate the record schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.app.is_empty() {
            return Err(ValidationError::EmptyApp);
        }

        // NaN compares false against everything, so a plain `< 0.0` check
        // would let it through and taint every total downstream
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(ValidationError::InvalidDuration {
                duration_seconds: self.duration_seconds,
            });
        }

        if self.end_time < self.start_time {
            return Err(ValidationError::InvertedInterval {
                start: self.start_time.to_rfc3339(),
                end: self.end_time.to_rfc3339(),
            });
        }

        Ok(())
    }

    /// Convert into the engine's in-memory record form
    pub fn into_usage_record(self) -> UsageRecord {
        UsageRecord {
            app: self.app,
            url: self.url,
            domain: self.domain,
            duration_seconds: self.duration_seconds,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Validation errors for raw usage records
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("App identifier is empty")]
    EmptyApp,

    #[error("Invalid duration: {duration_seconds} (must be finite and non-negative)")]
    InvalidDuration { duration_seconds: f64 },

    #[error("End time {end} precedes start time {start}")]
    InvertedInterval { start: String, end: String },
}
