//! Age-by-year rate schedules
//!
//! An `AgeRateSchedule` is a dense matrix of rates: ages 0..omega as rows,
//! calendar years as labelled columns. The final age row represents the
//! open-ended terminal interval. Survival schedules can be derived from raw
//! life-table person-years columns (`Lx`); the terminal row then carries the
//! self-transition ratio for the open interval.

use serde::{Deserialize, Serialize};

use crate::error::KinshipError;

/// Dense age x year rate matrix with calendar-year column labels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeRateSchedule {
    /// Calendar-year labels, strictly increasing, one per column
    years: Vec<i32>,

    /// One column per year, each of length n_ages (index = age)
    columns: Vec<Vec<f64>>,
}

impl AgeRateSchedule {
    /// Build a schedule from year labels and per-year age columns
    pub fn new(years: Vec<i32>, columns: Vec<Vec<f64>>) -> Result<Self, KinshipError> {
        if years.is_empty() {
            return Err(KinshipError::config("rate schedule has no year columns"));
        }
        if years.len() != columns.len() {
            return Err(KinshipError::config(format!(
                "{} year labels but {} columns",
                years.len(),
                columns.len()
            )));
        }
        if years.windows(2).any(|w| w[0] >= w[1]) {
            return Err(KinshipError::config(
                "year labels must be strictly increasing",
            ));
        }
        let n_ages = columns[0].len();
        if n_ages == 0 {
            return Err(KinshipError::config("rate schedule has no age rows"));
        }
        for (year, col) in years.iter().zip(&columns) {
            if col.len() != n_ages {
                return Err(KinshipError::config(format!(
                    "column for year {} has {} ages, expected {}",
                    year,
                    col.len(),
                    n_ages
                )));
            }
            if let Some(v) = col.iter().find(|v| !v.is_finite() || **v < 0.0) {
                return Err(KinshipError::config(format!(
                    "column for year {} contains invalid rate {}",
                    year, v
                )));
            }
        }
        Ok(Self { years, columns })
    }

    /// Schedule with the same age column replicated across a span of years
    pub fn constant(years: Vec<i32>, column: Vec<f64>) -> Result<Self, KinshipError> {
        let columns = vec![column; years.len()];
        Self::new(years, columns)
    }

    /// Number of age classes (terminal open interval included)
    pub fn n_ages(&self) -> usize {
        self.columns[0].len()
    }

    /// Year labels
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// First labelled year
    pub fn first_year(&self) -> i32 {
        self.years[0]
    }

    /// Last labelled year
    pub fn last_year(&self) -> i32 {
        *self.years.last().unwrap()
    }

    /// Whether a year is one of the column labels
    pub fn contains_year(&self, year: i32) -> bool {
        self.years.binary_search(&year).is_ok()
    }

    /// Age column for a labelled year
    pub fn column(&self, year: i32) -> Result<&[f64], KinshipError> {
        match self.years.binary_search(&year) {
            Ok(idx) => Ok(&self.columns[idx]),
            Err(_) => Err(KinshipError::OutOfRangeYear {
                year,
                first: self.first_year(),
                last: self.last_year(),
            }),
        }
    }

    /// Checked single-rate lookup
    pub fn value(&self, age: usize, year: i32) -> Result<f64, KinshipError> {
        let col = self.column(year)?;
        col.get(age).copied().ok_or_else(|| {
            KinshipError::config(format!("age {} outside 0..{}", age, self.n_ages()))
        })
    }

    /// Verify every rate lies in [0, 1]; used for survival schedules.
    /// Zero survival is valid (it propagates zeros through the recursion).
    pub fn check_probability_bounds(&self, name: &str) -> Result<(), KinshipError> {
        for (year, col) in self.years.iter().zip(&self.columns) {
            if let Some(v) = col.iter().find(|v| **v > 1.0) {
                return Err(KinshipError::config(format!(
                    "{} rate {} for year {} exceeds 1.0",
                    name, v, year
                )));
            }
        }
        Ok(())
    }

    /// Derive survival ratios from life-table person-years columns (`Lx`)
    ///
    /// Non-terminal ages: `U[a] = Lx[a+1] / Lx[a]`.
    /// Terminal open interval: `U[omega] = Lx[omega] / (Lx[omega-1] + Lx[omega])`,
    /// the self-transition rate of survivors who remain in the open age class.
    /// Undefined ratios (zero denominators) are set to 0.
    pub fn from_lifetable_lx(
        years: Vec<i32>,
        lx_columns: Vec<Vec<f64>>,
    ) -> Result<Self, KinshipError> {
        if lx_columns.iter().any(|c| c.len() < 2) {
            return Err(KinshipError::config(
                "life table needs at least two age rows",
            ));
        }
        let survival = lx_columns
            .iter()
            .map(|lx| {
                let n = lx.len();
                let mut u = vec![0.0; n];
                for a in 0..n - 1 {
                    let ratio = lx[a + 1] / lx[a];
                    u[a] = if ratio.is_finite() { ratio } else { 0.0 };
                }
                let terminal = lx[n - 1] / (lx[n - 2] + lx[n - 1]);
                u[n - 1] = if terminal.is_finite() { terminal } else { 0.0 };
                u
            })
            .collect();
        Self::new(years, survival)
    }
}

/// Number of age classes in the built-in demo schedules (ages 0..=100)
pub const DEMO_AGES: usize = 101;

/// Synthetic female survival column for the demo CLI and tests
///
/// Gompertz-style force of mortality with an infant-mortality bump; the
/// terminal age keeps a small self-transition rate for the open interval.
pub fn demo_survival_column() -> Vec<f64> {
    (0..DEMO_AGES)
        .map(|age| {
            let a = age as f64;
            let infant = if age == 0 { 0.004 } else { 0.0 };
            let mu = infant + 0.0002 + 3.0e-5 * (0.095 * a).exp();
            (-mu).exp()
        })
        .collect()
}

/// Synthetic fertility column: bell-shaped over reproductive ages 15..=49,
/// total fertility around 1.8 births per woman (both sexes)
pub fn demo_fertility_column() -> Vec<f64> {
    (0..DEMO_AGES)
        .map(|age| {
            if (15..=49).contains(&age) {
                let a = age as f64;
                0.12 * (-((a - 28.0).powi(2)) / (2.0 * 36.0)).exp()
            } else {
                0.0
            }
        })
        .collect()
}
