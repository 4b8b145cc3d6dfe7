//! Rate schedules feeding the kinship recursion
//!
//! A `RateSet` bundles the survival and fertility schedules with the optional
//! population and birth-distribution schedules, validates that they agree on
//! ages and years, and derives the mothers'-age-at-birth distribution (pi)
//! used by boundary conditions of ascendant and collateral kin.

pub mod loader;
mod schedule;

pub use schedule::{
    demo_fertility_column, demo_survival_column, AgeRateSchedule, DEMO_AGES,
};

use log::debug;

use crate::error::KinshipError;

/// Validated bundle of input rate schedules
#[derive(Debug, Clone)]
pub struct RateSet {
    pub survival: AgeRateSchedule,
    pub fertility: AgeRateSchedule,
    pub population: Option<AgeRateSchedule>,
    pub birth_distribution: Option<AgeRateSchedule>,
}

impl RateSet {
    /// Build and validate a rate set from survival and fertility schedules
    pub fn new(
        survival: AgeRateSchedule,
        fertility: AgeRateSchedule,
    ) -> Result<Self, KinshipError> {
        let rates = Self {
            survival,
            fertility,
            population: None,
            birth_distribution: None,
        };
        rates.validate()?;
        Ok(rates)
    }

    /// Attach population counts (enables pi derivation in time-varying mode)
    pub fn with_population(mut self, population: AgeRateSchedule) -> Result<Self, KinshipError> {
        self.population = Some(population);
        self.validate()?;
        Ok(self)
    }

    /// Attach an explicit birth distribution
    pub fn with_birth_distribution(
        mut self,
        birth_distribution: AgeRateSchedule,
    ) -> Result<Self, KinshipError> {
        self.birth_distribution = Some(birth_distribution);
        self.validate()?;
        Ok(self)
    }

    /// Cross-schedule validation: every supplied schedule must share the
    /// survival schedule's age range and year labels, and survival rates must
    /// be probabilities.
    pub fn validate(&self) -> Result<(), KinshipError> {
        self.survival.check_probability_bounds("survival")?;

        let n_ages = self.survival.n_ages();
        let years = self.survival.years();

        let named: [(&str, Option<&AgeRateSchedule>); 3] = [
            ("fertility", Some(&self.fertility)),
            ("population", self.population.as_ref()),
            ("birth distribution", self.birth_distribution.as_ref()),
        ];
        for (name, sched) in named {
            let Some(sched) = sched else { continue };
            if sched.n_ages() != n_ages {
                return Err(KinshipError::config(format!(
                    "{} schedule has {} ages, survival has {}",
                    name,
                    sched.n_ages(),
                    n_ages
                )));
            }
            if sched.years() != years {
                return Err(KinshipError::config(format!(
                    "{} schedule year labels differ from survival",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Number of age classes shared by all schedules
    pub fn n_ages(&self) -> usize {
        self.survival.n_ages()
    }

    /// Year labels shared by all schedules
    pub fn years(&self) -> &[i32] {
        self.survival.years()
    }

    /// Mothers'-age-at-childbirth distribution for one year
    ///
    /// Sources, in order of preference: an explicit birth-distribution column,
    /// population counts weighted by fertility, or (stable mode only) the
    /// stable age structure implied by the year's survival and fertility. A
    /// zero-sum column yields an all-zero pi, which is degenerate but valid.
    pub fn pi_column(
        &self,
        year: i32,
        birth_female_fraction: f64,
        stable: bool,
    ) -> Result<Vec<f64>, KinshipError> {
        if let Some(pi) = &self.birth_distribution {
            debug!("pi for {}: supplied birth distribution", year);
            return Ok(normalized(pi.column(year)?));
        }
        if let Some(pop) = &self.population {
            debug!("pi for {}: population-weighted fertility", year);
            let n = pop.column(year)?;
            let f = self.fertility.column(year)?;
            let weighted: Vec<f64> = n.iter().zip(f).map(|(n, f)| n * f).collect();
            return Ok(normalized(&weighted));
        }
        if !stable {
            return Err(KinshipError::config(
                "time-varying mode requires a population or birth-distribution schedule to derive pi",
            ));
        }

        debug!("pi for {}: stable age structure", year);
        let u = self.survival.column(year)?;
        let f = self.fertility.column(year)?;
        let w = stable_age_distribution(u, f, birth_female_fraction);
        let weighted: Vec<f64> = w.iter().zip(f).map(|(w, f)| w * f).collect();
        Ok(normalized(&weighted))
    }
}

/// Stable age structure: dominant eigenvector of the one-sex projection
/// matrix (survival subdiagonal with terminal self-loop, plus a first row of
/// daughter births), found by power iteration.
pub fn stable_age_distribution(
    survival: &[f64],
    fertility: &[f64],
    birth_female_fraction: f64,
) -> Vec<f64> {
    let n = survival.len();
    let mut w = vec![1.0 / n as f64; n];

    for _ in 0..2000 {
        let mut next = vec![0.0; n];
        next[0] = w
            .iter()
            .zip(fertility)
            .map(|(w, f)| w * f * birth_female_fraction)
            .sum();
        for a in 0..n - 1 {
            next[a + 1] += survival[a] * w[a];
        }
        next[n - 1] += survival[n - 1] * w[n - 1];

        let total: f64 = next.iter().sum();
        if total <= 0.0 {
            return vec![0.0; n];
        }
        for v in &mut next {
            *v /= total;
        }

        let diff: f64 = next.iter().zip(&w).map(|(a, b)| (a - b).abs()).sum();
        w = next;
        if diff < 1e-12 {
            break;
        }
    }
    w
}

/// Normalize to a probability distribution; zero-sum input stays all zero
fn normalized(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total <= 0.0 {
        vec![0.0; values.len()]
    } else {
        values.iter().map(|v| v / total).collect()
    }
}

/// Built-in demo rate set over a span of years
///
/// The synthetic schedules drift mildly over time (falling fertility, slowly
/// improving survival) so the time-varying mode has something to show.
pub fn demo_rate_set(first_year: i32, last_year: i32) -> RateSet {
    let years: Vec<i32> = (first_year..=last_year).collect();
    let base_u = demo_survival_column();
    let base_f = demo_fertility_column();

    let u_cols: Vec<Vec<f64>> = years
        .iter()
        .map(|y| {
            let improvement = 0.998_f64.powi(y - first_year);
            base_u.iter().map(|u| u.powf(improvement)).collect()
        })
        .collect();
    let f_cols: Vec<Vec<f64>> = years
        .iter()
        .map(|y| {
            let decline = (1.0 - 0.003 * (y - first_year) as f64).max(0.7);
            base_f.iter().map(|f| f * decline).collect()
        })
        .collect();

    // Population proportional to the first year's stable structure, so pi is
    // derivable in time-varying mode.
    let w = stable_age_distribution(&base_u, &base_f, 0.5);
    let pop_cols: Vec<Vec<f64>> = years
        .iter()
        .map(|_| w.iter().map(|w| w * 100_000.0).collect())
        .collect();

    let survival = AgeRateSchedule::new(years.clone(), u_cols).unwrap();
    let fertility = AgeRateSchedule::new(years.clone(), f_cols).unwrap();
    let population = AgeRateSchedule::new(years, pop_cols).unwrap();

    RateSet::new(survival, fertility)
        .and_then(|r| r.with_population(population))
        .unwrap()
}
