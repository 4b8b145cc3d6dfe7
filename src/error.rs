//! Error taxonomy for the kinship engine
//!
//! All errors are raised synchronously at the point of detection; validation
//! runs before any recursion so a failed call produces no partial output.

use thiserror::Error;

/// Errors produced by rate validation and kinship computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinshipError {
    /// Malformed or mismatched rate schedules, or an inconsistent configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A requested year or cohort falls outside the rate schedule coverage
    #[error("year {year} outside rate schedule coverage {first}..={last}")]
    OutOfRangeYear { year: i32, first: i32, last: i32 },

    /// An unrecognized kin selector code
    #[error("unrecognized kin code '{0}'")]
    InvalidKinCode(String),
}

impl KinshipError {
    /// Shorthand for a configuration error with a formatted message
    pub fn config(msg: impl Into<String>) -> Self {
        KinshipError::Configuration(msg.into())
    }
}
