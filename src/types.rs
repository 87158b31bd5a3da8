//! Core types for the timeledger pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw usage records, aggregated totals, goals, violations, and the
//! persisted running score.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One observed usage interval, as handed to the engine by a usage source.
///
/// Records are immutable once produced and live only for the duration of a
/// single aggregation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Raw application identifier (e.g. a bundle id like "com.apple.Safari")
    pub app: String,
    /// Full page URL, present only for web-usage records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Raw web domain, present only for web-usage records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Interval length in seconds (non-negative)
    pub duration_seconds: f64,
    /// Interval start (UTC)
    pub start_time: DateTime<Utc>,
    /// Interval end (UTC), never before `start_time`
    pub end_time: DateTime<Utc>,
}

/// Accumulated minutes per canonical key, split into two disjoint namespaces.
///
/// The same canonical string can coincidentally appear as both an app key and
/// a domain key; the namespaces are kept apart so those totals never merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Minutes per canonical app key
    pub apps: HashMap<String, f64>,
    /// Minutes per canonical domain key
    pub domains: HashMap<String, f64>,
}

impl UsageTotals {
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty() && self.domains.is_empty()
    }
}

/// User goals: target canonical key mapped to a free-form limit expression
/// (e.g. "Youtube" -> "1 hour").
///
/// A `BTreeMap` gives a stable iteration order across runs and JSON round
/// trips; violations are reported in this order.
pub type GoalSet = BTreeMap<String, String>;

/// Persisted running score.
///
/// Unbounded below: violations subtract from it and negative values are kept
/// exactly. Only the scorer mutates it, once per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    #[serde(rename = "Points")]
    pub points: f64,
}

impl Default for ScoreState {
    fn default() -> Self {
        Self { points: 0.0 }
    }
}

impl ScoreState {
    pub fn new(points: f64) -> Self {
        Self { points }
    }
}

/// One goal whose actual usage exceeded its parsed limit this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Goal target (canonical app or domain key)
    pub target: String,
    /// Parsed limit in minutes
    pub limit_minutes: f64,
    /// Aggregated usage in minutes
    pub actual_minutes: f64,
    /// Minutes over the limit
    pub overage_minutes: f64,
    /// Points subtracted from the running score
    pub points_lost: f64,
}

/// Outcome of checking a single goal against aggregated usage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCheck {
    pub target: String,
    /// Limit expression as stored, before parsing
    pub limit_expr: String,
    pub status: GoalStatus,
}

/// Per-goal check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalStatus {
    /// Usage stayed at or under the limit
    WithinLimit {
        actual_minutes: f64,
        limit_minutes: f64,
    },
    /// Usage exceeded the limit and points were deducted
    Violated {
        actual_minutes: f64,
        limit_minutes: f64,
        overage_minutes: f64,
        points_lost: f64,
    },
    /// Target matched neither namespace; scored as zero usage
    NoUsage,
    /// Limit expression could not be parsed; goal skipped
    BadLimit,
}

/// Kind of non-fatal condition surfaced during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    SourceUnavailable,
    MalformedGoalStore,
    MalformedScoreStore,
    UnparsableLimit,
}

/// Non-fatal condition surfaced during a run, kept in the outcome so
/// reporting layers can show it alongside the results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl RunWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Everything one scoring run produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Aggregated per-entity totals for the run
    pub totals: UsageTotals,
    /// One check per goal, in goal iteration order
    pub checks: Vec<GoalCheck>,
    /// Goals exceeded this run, in goal iteration order
    pub violations: Vec<Violation>,
    /// Score before the run
    pub score_before: f64,
    /// Score after all violations were applied
    pub score_after: f64,
    /// Non-fatal conditions encountered
    pub warnings: Vec<RunWarning>,
}

impl RunOutcome {
    /// Sum of points lost across all violations this run
    pub fn total_points_lost(&self) -> f64 {
        self.violations.iter().map(|v| v.points_lost).sum()
    }
}
