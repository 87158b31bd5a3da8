//! Timeledger - on-device engine for daily screen-time aggregation and
//! goal-violation scoring
//!
//! Timeledger turns raw device-activity records into canonical per-entity
//! usage totals, checks them against user-defined limits, and converts
//! overages into a persistent penalty score through a deterministic pipeline:
//! source query → name normalization → aggregation → goal matching → scoring
//! → report encoding.
//!
//! ## Modules
//!
//! - **Engine core**: normalizer, aggregator, limit parser, matcher, scorer
//! - **Pipeline**: one-shot scoring and the stateful [`LedgerProcessor`]
//! - **Boundaries**: the [`source::UsageSource`] trait, persisted goal/score
//!   stores, and the run-report encoder

pub mod aggregator;
pub mod error;
pub mod limit;
pub mod matcher;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod scorer;
pub mod source;
pub mod store;
pub mod types;

pub use aggregator::Aggregator;
pub use error::EngineError;
pub use limit::{parse_limit, LimitParseError};
pub use normalizer::Normalizer;
pub use pipeline::{score_daily_usage, LedgerProcessor};
pub use scorer::{Scorer, DEFAULT_RATE_PER_MINUTE};
pub use source::{NdjsonLogSource, QueryFilter, SourceError, UsageSource};
pub use store::{GoalEdit, GoalStore, ScoreEdit, ScoreStore};
pub use types::{GoalSet, RunOutcome, ScoreState, UsageRecord, UsageTotals, Violation};

// Schema exports
pub use schema::{RawRecordAdapter, RawUsageRecord, SCHEMA_VERSION};

/// Engine version embedded in all report payloads
pub const LEDGER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "timeledger";
