//! Limit expression parsing
//!
//! Goals store their limits as free-form duration strings ("2 hours",
//! "30 minutes", "45"). This module resolves such an expression to a minute
//! count. Parsing is recomputed every run; a failure here never touches the
//! goal store, callers skip the goal and keep going.

use thiserror::Error;

/// A limit expression that could not be resolved to minutes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot parse time limit: {expr:?}")]
pub struct LimitParseError {
    pub expr: String,
}

/// Parse a free-form duration expression into minutes.
///
/// Matching is case-insensitive on the whole expression:
/// - contains "hour": 60 x leading numeric token
/// - contains "minute": leading numeric token, unscaled
/// - otherwise the whole trimmed string must parse as a bare minute count
pub fn parse_limit(expr: &str) -> Result<f64, LimitParseError> {
    let lowered = expr.trim().to_lowercase();
    let fail = || LimitParseError {
        expr: expr.to_string(),
    };

    if lowered.contains("hour") {
        let token = lowered.split_whitespace().next().ok_or_else(fail)?;
        let hours: f64 = token.parse().map_err(|_| fail())?;
        Ok(hours * 60.0)
    } else if lowered.contains("minute") {
        let token = lowered.split_whitespace().next().ok_or_else(fail)?;
        token.parse().map_err(|_| fail())
    } else {
        lowered.parse().map_err(|_| fail())
    }
}
