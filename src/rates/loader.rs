//! CSV loaders for age-by-year rate schedules
//!
//! Wide format: first column `age`, remaining columns labelled with calendar
//! years. Ages must start at 0 and be contiguous; rows may appear in any
//! order. Files live in a schedules directory:
//!
//! - `survival.csv` (required)
//! - `fertility.csv` (required)
//! - `population.csv` (optional)
//! - `birth_distribution.csv` (optional)

use std::error::Error;
use std::fs::File;
use std::path::Path;

use super::{AgeRateSchedule, RateSet};

/// Default path to the schedules directory
pub const DEFAULT_SCHEDULES_PATH: &str = "data/schedules";

/// Load one wide-format age x year schedule from a CSV file
pub fn load_schedule(path: &Path) -> Result<AgeRateSchedule, Box<dyn Error>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let years: Vec<i32> = reader
        .headers()?
        .iter()
        .skip(1)
        .map(|h| h.trim().parse::<i32>())
        .collect::<Result<_, _>>()?;

    let mut rows: Vec<(usize, Vec<f64>)> = Vec::new();
    for result in reader.records() {
        let record = result?;
        let age: usize = record[0].trim().parse()?;
        let values: Vec<f64> = record
            .iter()
            .skip(1)
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()?;
        if values.len() != years.len() {
            return Err(format!(
                "row for age {} has {} values, expected {}",
                age,
                values.len(),
                years.len()
            )
            .into());
        }
        rows.push((age, values));
    }

    rows.sort_by_key(|(age, _)| *age);
    for (expected, (age, _)) in rows.iter().enumerate() {
        if *age != expected {
            return Err(format!("ages not contiguous from 0: found {}", age).into());
        }
    }

    // Transpose rows into per-year columns
    let columns: Vec<Vec<f64>> = (0..years.len())
        .map(|y| rows.iter().map(|(_, values)| values[y]).collect())
        .collect();

    Ok(AgeRateSchedule::new(years, columns)?)
}

/// Load survival ratios from raw life-table person-years (`Lx`) columns
pub fn load_survival_from_lx(path: &Path) -> Result<AgeRateSchedule, Box<dyn Error>> {
    let lx = load_schedule(path)?;
    let years = lx.years().to_vec();
    let columns: Vec<Vec<f64>> = years
        .iter()
        .map(|y| lx.column(*y).map(|c| c.to_vec()))
        .collect::<Result<_, _>>()?;
    Ok(AgeRateSchedule::from_lifetable_lx(years, columns)?)
}

/// All schedules loaded from a directory
#[derive(Debug, Clone)]
pub struct LoadedRates {
    pub survival: AgeRateSchedule,
    pub fertility: AgeRateSchedule,
    pub population: Option<AgeRateSchedule>,
    pub birth_distribution: Option<AgeRateSchedule>,
}

impl LoadedRates {
    /// Load schedules from the default directory
    pub fn load_default() -> Result<Self, Box<dyn Error>> {
        Self::load_from(Path::new(DEFAULT_SCHEDULES_PATH))
    }

    /// Load schedules from a specific directory
    pub fn load_from(dir: &Path) -> Result<Self, Box<dyn Error>> {
        let survival = load_schedule(&dir.join("survival.csv"))?;
        let fertility = load_schedule(&dir.join("fertility.csv"))?;

        let population_path = dir.join("population.csv");
        let population = if population_path.exists() {
            Some(load_schedule(&population_path)?)
        } else {
            None
        };

        let pi_path = dir.join("birth_distribution.csv");
        let birth_distribution = if pi_path.exists() {
            Some(load_schedule(&pi_path)?)
        } else {
            None
        };

        Ok(Self {
            survival,
            fertility,
            population,
            birth_distribution,
        })
    }

    /// Assemble a validated rate set
    pub fn into_rate_set(self) -> Result<RateSet, Box<dyn Error>> {
        let mut rates = RateSet::new(self.survival, self.fertility)?;
        if let Some(pop) = self.population {
            rates = rates.with_population(pop)?;
        }
        if let Some(pi) = self.birth_distribution {
            rates = rates.with_birth_distribution(pi)?;
        }
        Ok(rates)
    }
}
