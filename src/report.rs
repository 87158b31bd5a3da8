//! Run-report encoding
//!
//! Encodes a run outcome into a versioned report payload for downstream
//! consumers, and renders the same data as human-readable text. The engine
//! never depends on reporting succeeding; this is an output boundary only.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::types::{GoalCheck, GoalStatus, RunOutcome, RunWarning, Violation};
use crate::{LEDGER_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "usage.run_report.v1";

/// How many entities the text rendering lists per namespace
const TEXT_TOP_N: usize = 10;

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub run_id: String,
}

/// One entity's total, for sorted display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalEntry {
    pub name: String,
    pub minutes: f64,
}

/// Score movement over the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSummary {
    pub before: f64,
    pub after: f64,
    pub lost: f64,
}

/// Complete run report payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// App totals, minutes descending
    pub app_totals: Vec<TotalEntry>,
    /// Domain totals, minutes descending
    pub domain_totals: Vec<TotalEntry>,
    pub checks: Vec<GoalCheck>,
    pub violations: Vec<Violation>,
    pub points: PointsSummary,
    pub warnings: Vec<RunWarning>,
}

/// Encoder producing run reports
pub struct ReportEncoder {
    run_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique run ID
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific run ID
    pub fn with_run_id(run_id: String) -> Self {
        Self { run_id }
    }

    /// Encode a run outcome into a report payload
    pub fn encode(&self, outcome: &RunOutcome, date: Option<NaiveDate>) -> RunReport {
        RunReport {
            report_version: REPORT_VERSION.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: LEDGER_VERSION.to_string(),
                run_id: self.run_id.clone(),
            },
            generated_at: Utc::now().to_rfc3339(),
            date: date.map(|d| d.format("%Y-%m-%d").to_string()),
            app_totals: sorted_totals(&outcome.totals.apps),
            domain_totals: sorted_totals(&outcome.totals.domains),
            checks: outcome.checks.clone(),
            violations: outcome.violations.clone(),
            points: PointsSummary {
                before: outcome.score_before,
                after: outcome.score_after,
                lost: outcome.total_points_lost(),
            },
            warnings: outcome.warnings.clone(),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        outcome: &RunOutcome,
        date: Option<NaiveDate>,
    ) -> Result<String, EngineError> {
        let report = self.encode(outcome, date);
        serde_json::to_string_pretty(&report).map_err(EngineError::JsonError)
    }
}

/// Render a report as console-style text
pub fn render_text(report: &RunReport) -> String {
    let mut out = String::new();

    if let Some(date) = &report.date {
        out.push_str(&format!("Usage report for {}\n\n", date));
    }

    out.push_str(&format!("Top {} apps by usage\n", TEXT_TOP_N));
    render_totals(&mut out, &report.app_totals);

    out.push_str(&format!("\nTop {} domains by usage\n", TEXT_TOP_N));
    render_totals(&mut out, &report.domain_totals);

    if !report.checks.is_empty() {
        out.push_str("\nGoal check\n");
        for check in &report.checks {
            out.push_str(&render_check(check));
        }
    }

    out.push_str("\nPoints summary\n");
    if report.violations.is_empty() {
        out.push_str("  No violations\n");
    } else {
        out.push_str(&format!("  Violations:  {}\n", report.violations.len()));
        out.push_str(&format!("  Points lost: {:.2}\n", report.points.lost));
    }
    let marker = if report.points.after < 0.0 {
        " (NEGATIVE)"
    } else {
        ""
    };
    out.push_str(&format!(
        "  Current points: {:.2}{}\n",
        report.points.after, marker
    ));

    if !report.warnings.is_empty() {
        out.push_str("\nWarnings\n");
        for warning in &report.warnings {
            out.push_str(&format!("  - {}\n", warning.message));
        }
    }

    out
}

fn render_totals(out: &mut String, totals: &[TotalEntry]) {
    if totals.is_empty() {
        out.push_str("  (no usage)\n");
        return;
    }
    for entry in totals.iter().take(TEXT_TOP_N) {
        out.push_str(&format!("  {:<30} {:>8.1} min\n", entry.name, entry.minutes));
    }
}

fn render_check(check: &GoalCheck) -> String {
    match &check.status {
        GoalStatus::WithinLimit {
            actual_minutes,
            limit_minutes,
        } => format!(
            "  [OK]       {}: {:.1} min (limit {:.1} min)\n",
            check.target, actual_minutes, limit_minutes
        ),
        GoalStatus::Violated {
            actual_minutes,
            limit_minutes,
            overage_minutes,
            points_lost,
        } => format!(
            "  [VIOLATED] {}: {:.1} min (limit {:.1} min), over by {:.1} min, lost {:.2} points\n",
            check.target, actual_minutes, limit_minutes, overage_minutes, points_lost
        ),
        GoalStatus::NoUsage => format!(
            "  [OK]       {}: no usage (limit {})\n",
            check.target, check.limit_expr
        ),
        GoalStatus::BadLimit => format!(
            "  [SKIPPED]  {}: cannot parse limit {:?}\n",
            check.target, check.limit_expr
        ),
    }
}

/// Sort a totals map into minutes-descending entries; equal totals fall back
/// to name order so output is stable
fn sorted_totals(totals: &std::collections::HashMap<String, f64>) -> Vec<TotalEntry> {
    let mut entries: Vec<TotalEntry> = totals
        .iter()
        .map(|(name, minutes)| TotalEntry {
            name: name.clone(),
            minutes: *minutes,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.minutes
            .partial_cmp(&a.minutes)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScoreState, UsageTotals, WarningKind};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn sample_outcome() -> RunOutcome {
        let mut apps = HashMap::new();
        apps.insert("Safari".to_string(), 45.0);
        apps.insert("Notes".to_string(), 90.0);
        let mut domains = HashMap::new();
        domains.insert("Youtube".to_string(), 90.0);

        let goals: crate::types::GoalSet = [("Youtube".to_string(), "1 hour".to_string())]
            .into_iter()
            .collect();
        let totals = UsageTotals { apps, domains };
        let scored = crate::scorer::Scorer::new(0.5).score(&goals, &totals, ScoreState::new(100.0));

        RunOutcome {
            totals,
            checks: scored.checks,
            violations: scored.violations,
            score_before: 100.0,
            score_after: scored.state.points,
            warnings: vec![RunWarning::new(WarningKind::SourceUnavailable, "log offline")],
        }
    }

    #[test]
    fn test_encode_sorts_totals_descending() {
        let report = ReportEncoder::with_run_id("run-1".to_string()).encode(&sample_outcome(), None);

        let names: Vec<&str> = report.app_totals.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Notes", "Safari"]);
    }

    #[test]
    fn test_encode_points_summary() {
        let report = ReportEncoder::new().encode(&sample_outcome(), None);

        assert_eq!(report.points.before, 100.0);
        assert_eq!(report.points.after, 85.0);
        assert_eq!(report.points.lost, 15.0);
    }

    #[test]
    fn test_encode_to_json_carries_version_and_producer() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let json = ReportEncoder::with_run_id("run-1".to_string())
            .encode_to_json(&sample_outcome(), Some(date))
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["report_version"], REPORT_VERSION);
        assert_eq!(value["producer"]["name"], PRODUCER_NAME);
        assert_eq!(value["producer"]["run_id"], "run-1");
        assert_eq!(value["date"], "2024-03-10");
        assert_eq!(value["violations"][0]["target"], "Youtube");
    }

    #[test]
    fn test_render_text_mentions_violation_and_warning() {
        let report = ReportEncoder::new().encode(&sample_outcome(), None);
        let text = render_text(&report);

        assert!(text.contains("[VIOLATED] Youtube"));
        assert!(text.contains("Points lost: 15.00"));
        assert!(text.contains("log offline"));
    }

    #[test]
    fn test_render_text_negative_score_marker() {
        let mut outcome = sample_outcome();
        outcome.score_after = -5.0;
        let report = ReportEncoder::new().encode(&outcome, None);

        assert!(render_text(&report).contains("(NEGATIVE)"));
    }
}
