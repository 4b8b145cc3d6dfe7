//! Aggregated outputs: per-kin-type summaries and death accumulation

mod aggregate;
mod deaths;

pub use aggregate::{summarize, verify_consistency, SummaryResultTable, SummaryRow};
pub use deaths::{DeathLedger, DeathSeries};
