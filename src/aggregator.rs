//! Usage aggregation
//!
//! Groups usage records by canonical key and sums duration into minutes,
//! producing one total per entity. App and domain namespaces are accumulated
//! independently; a single web-usage record contributes to both.
//!
//! Sums are exact. Rounding is left to reporting layers.

use crate::normalizer::Normalizer;
use crate::types::{UsageRecord, UsageTotals};

/// Aggregator for turning raw records into per-entity totals
pub struct Aggregator;

impl Aggregator {
    /// Aggregate records into app and domain totals.
    ///
    /// An empty input yields two empty totals.
    pub fn aggregate(records: &[UsageRecord]) -> UsageTotals {
        let mut totals = UsageTotals::default();

        for record in records {
            let minutes = record.duration_seconds / 60.0;

            let app_key = Normalizer::normalize_app(&record.app);
            *totals.apps.entry(app_key).or_insert(0.0) += minutes;

            if let Some(domain) = &record.domain {
                let domain_key = Normalizer::normalize_domain(domain);
                *totals.domains.entry(domain_key).or_insert(0.0) += minutes;
            }
        }

        totals
    }
}
