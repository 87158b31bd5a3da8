//! Goal-violation scoring
//!
//! Walks the goal set in iteration order, resolves each goal's limit and
//! actual usage, and converts overages into points subtracted from the
//! running score. Each run applies its penalty independently: running the
//! scorer twice over the same usage deducts twice.

use tracing::warn;

use crate::limit::parse_limit;
use crate::matcher::resolve_usage;
use crate::types::{
    GoalCheck, GoalSet, GoalStatus, RunWarning, ScoreState, UsageTotals, Violation, WarningKind,
};

/// Default penalty rate in points per minute of overage
pub const DEFAULT_RATE_PER_MINUTE: f64 = 0.5;

/// What scoring a run produced
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// Score state after all violations were applied
    pub state: ScoreState,
    /// One check per goal, in goal iteration order
    pub checks: Vec<GoalCheck>,
    /// Goals exceeded this run
    pub violations: Vec<Violation>,
    /// Per-goal warnings (unparseable limits)
    pub warnings: Vec<RunWarning>,
}

/// Scorer applying a penalty rate to goal violations
#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    rate_per_minute: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_PER_MINUTE)
    }
}

impl Scorer {
    pub fn new(rate_per_minute: f64) -> Self {
        Self { rate_per_minute }
    }

    pub fn rate_per_minute(&self) -> f64 {
        self.rate_per_minute
    }

    /// Score aggregated usage against the goal set.
    ///
    /// Per goal: an unparseable limit skips the goal with a warning; a target
    /// with no usage in either namespace is treated as zero and never
    /// violates; usage strictly above the limit deducts
    /// `overage * rate_per_minute` points. The returned state may be
    /// negative; no floor is applied.
    pub fn score(&self, goals: &GoalSet, totals: &UsageTotals, state: ScoreState) -> ScoreOutcome {
        let mut points = state.points;
        let mut checks = Vec::with_capacity(goals.len());
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        for (target, limit_expr) in goals {
            let limit_minutes = match parse_limit(limit_expr) {
                Ok(minutes) => minutes,
                Err(err) => {
                    warn!(target = %target, limit = %limit_expr, "skipping goal with unparseable limit");
                    warnings.push(RunWarning::new(
                        WarningKind::UnparsableLimit,
                        format!("{} (goal {:?})", err, target),
                    ));
                    checks.push(GoalCheck {
                        target: target.clone(),
                        limit_expr: limit_expr.clone(),
                        status: GoalStatus::BadLimit,
                    });
                    continue;
                }
            };

            let status = match resolve_usage(target, totals) {
                None => GoalStatus::NoUsage,
                Some(actual_minutes) if actual_minutes > limit_minutes => {
                    let overage_minutes = actual_minutes - limit_minutes;
                    let points_lost = overage_minutes * self.rate_per_minute;
                    points -= points_lost;
                    violations.push(Violation {
                        target: target.clone(),
                        limit_minutes,
                        actual_minutes,
                        overage_minutes,
                        points_lost,
                    });
                    GoalStatus::Violated {
                        actual_minutes,
                        limit_minutes,
                        overage_minutes,
                        points_lost,
                    }
                }
                Some(actual_minutes) => GoalStatus::WithinLimit {
                    actual_minutes,
                    limit_minutes,
                },
            };

            checks.push(GoalCheck {
                target: target.clone(),
                limit_expr: limit_expr.clone(),
                status,
            });
        }

        ScoreOutcome {
            state: ScoreState::new(points),
            checks,
            violations,
            warnings,
        }
    }
}
