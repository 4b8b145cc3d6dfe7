//! Kinship Engine - Matrix kinship computation from survival and fertility schedules
//!
//! This library provides:
//! - Expected living and deceased relatives of a Focal individual, by Focal
//!   age and kin age, for 14 kinship categories
//! - Stable (time-invariant) and time-varying (age x calendar-year) regimes
//! - Period and cohort output perspectives
//! - Full disaggregated tables plus per-kin-type summaries (count, mean kin
//!   age, sd of kin age, death burdens)

pub mod error;
pub mod kin;
pub mod rates;
pub mod recursion;
pub mod runner;
pub mod summary;

// Re-export commonly used types
pub use error::KinshipError;
pub use kin::KinType;
pub use rates::{AgeRateSchedule, RateSet};
pub use recursion::{compute_kinship, FullResultTable, KinshipConfig, KinshipEngine, KinshipResult};
pub use runner::KinshipRunner;
pub use summary::{SummaryResultTable, SummaryRow};
