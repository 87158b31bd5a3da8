//! Goal target resolution
//!
//! Resolves a goal target against the aggregated totals. Targets are stored
//! in canonical form at edit time, so lookup is an exact, case-sensitive key
//! match with no re-normalization.

use crate::types::UsageTotals;

/// Resolve a goal target to its aggregated minutes.
///
/// The app namespace is checked first; a key present in both namespaces
/// resolves to the app total. A target absent from both yields `None`, which
/// callers score as zero usage rather than an error.
pub fn resolve_usage(target: &str, totals: &UsageTotals) -> Option<f64> {
    totals
        .apps
        .get(target)
        .or_else(|| totals.domains.get(target))
        .copied()
}
