//! Batch runner for repeated kinship queries
//!
//! Validates the rate set once, then serves many computations with different
//! configurations without re-reading or re-checking the schedules.

use std::error::Error;
use std::path::Path;

use crate::error::KinshipError;
use crate::rates::{loader::LoadedRates, RateSet};
use crate::recursion::{compute_kinship, KinshipConfig, KinshipResult};

/// Pre-validated runner for repeated queries against one rate set
///
/// # Example
/// ```ignore
/// let runner = KinshipRunner::new(rates)?;
/// for year in [1960, 1980, 2000] {
///     let config = KinshipConfig { focal_years: vec![year], ..Default::default() };
///     let result = runner.run(&config)?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct KinshipRunner {
    rates: RateSet,
}

impl KinshipRunner {
    /// Create a runner over an already-assembled rate set
    pub fn new(rates: RateSet) -> Result<Self, KinshipError> {
        rates.validate()?;
        Ok(Self { rates })
    }

    /// Create a runner by loading schedules from a directory
    pub fn from_csv_path(path: &Path) -> Result<Self, Box<dyn Error>> {
        let rates = LoadedRates::load_from(path)?.into_rate_set()?;
        Ok(Self { rates })
    }

    /// Run a single computation
    pub fn run(&self, config: &KinshipConfig) -> Result<KinshipResult, KinshipError> {
        compute_kinship(&self.rates, config)
    }

    /// Run several configurations against the same rates, failing on the first error
    pub fn run_batch(
        &self,
        configs: &[KinshipConfig],
    ) -> Result<Vec<KinshipResult>, KinshipError> {
        configs.iter().map(|c| self.run(c)).collect()
    }

    /// The underlying rate set
    pub fn rates(&self) -> &RateSet {
        &self.rates
    }
}
