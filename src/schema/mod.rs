//! Unified usage.raw_record.v1 schema
//!
//! This module defines the input schema for device-activity records and the
//! adapter that parses NDJSON/JSON input into engine records.

mod adapter;
mod raw_record;

pub use adapter::*;
pub use raw_record::*;
