//! Mortality/loss accumulation
//!
//! Collapses the per-step exits recorded in the full table into, for each
//! (time label, kin type), the expected kin deaths Focal experiences at each
//! exact age and the running cumulative burden over Focal's life.

use std::collections::BTreeMap;

use crate::kin::KinType;
use crate::recursion::FullResultTable;

/// Grouping key: (period year, cohort, kin type)
pub type DeathKey = (Option<i32>, Option<i32>, KinType);

/// Death counts for one (time label, kin type) over Focal's ages
#[derive(Debug, Clone)]
pub struct DeathSeries {
    /// Focal ages present, ascending
    pub ages: Vec<u32>,

    /// Expected deaths experienced at each exact Focal age
    pub non_cumulative: Vec<f64>,

    /// Running sum of the non-cumulative series
    pub cumulative: Vec<f64>,
}

impl DeathSeries {
    /// (non-cumulative, cumulative) at one Focal age
    pub fn at_age(&self, age: u32) -> Option<(f64, f64)> {
        self.ages
            .binary_search(&age)
            .ok()
            .map(|i| (self.non_cumulative[i], self.cumulative[i]))
    }
}

/// All death series derived from one full table
#[derive(Debug, Clone, Default)]
pub struct DeathLedger {
    series: BTreeMap<DeathKey, DeathSeries>,
}

impl DeathLedger {
    /// Sum the full table's death entries over kin age and accumulate over
    /// Focal age, per (time label, kin type) group.
    pub fn from_full(full: &FullResultTable) -> Self {
        let mut grouped: BTreeMap<DeathKey, BTreeMap<u32, f64>> = BTreeMap::new();
        for row in full.rows() {
            *grouped
                .entry((row.year, row.cohort, row.kin))
                .or_default()
                .entry(row.age_focal)
                .or_insert(0.0) += row.dead;
        }

        let series = grouped
            .into_iter()
            .map(|(key, by_age)| {
                let ages: Vec<u32> = by_age.keys().copied().collect();
                let non_cumulative: Vec<f64> = by_age.values().copied().collect();
                let mut cumulative = Vec::with_capacity(non_cumulative.len());
                let mut running = 0.0;
                for v in &non_cumulative {
                    running += v;
                    cumulative.push(running);
                }
                (
                    key,
                    DeathSeries {
                        ages,
                        non_cumulative,
                        cumulative,
                    },
                )
            })
            .collect();

        Self { series }
    }

    /// Series for one (time label, kin type)
    pub fn series(&self, year: Option<i32>, cohort: Option<i32>, kin: KinType) -> Option<&DeathSeries> {
        self.series.get(&(year, cohort, kin))
    }

    /// Iterate all groups in key order
    pub fn iter(&self) -> impl Iterator<Item = (&DeathKey, &DeathSeries)> {
        self.series.iter()
    }

    /// Total expected lifetime kin-death burden for one time label: the
    /// terminal cumulative value summed over kin types
    pub fn lifetime_burden(&self, year: Option<i32>, cohort: Option<i32>) -> f64 {
        self.series
            .iter()
            .filter(|((y, c, _), _)| *y == year && *c == cohort)
            .filter_map(|(_, s)| s.cumulative.last())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::rates::demo_rate_set;
    use crate::recursion::{compute_kinship, KinshipConfig};

    fn full_table() -> FullResultTable {
        let rates = demo_rate_set(2000, 2000);
        let config = KinshipConfig {
            focal_years: vec![2000],
            living_only: false,
            ..Default::default()
        };
        compute_kinship(&rates, &config).unwrap().full
    }

    #[test]
    fn test_cumulative_is_running_sum_and_monotone() {
        let ledger = DeathLedger::from_full(&full_table());
        let mut groups = 0;
        for (_, series) in ledger.iter() {
            groups += 1;
            let mut running = 0.0;
            for (i, v) in series.non_cumulative.iter().enumerate() {
                assert!(*v >= 0.0);
                running += v;
                // Bit-for-bit: same additions in the same order
                assert_eq!(running, series.cumulative[i]);
                if i > 0 {
                    assert!(series.cumulative[i] >= series.cumulative[i - 1]);
                }
            }
        }
        assert_eq!(groups, 14);
    }

    #[test]
    fn test_lifetime_burden_matches_total_dead() {
        let full = full_table();
        let ledger = DeathLedger::from_full(&full);
        let total: f64 = full.rows().iter().map(|r| r.dead).sum();
        let burden = ledger.lifetime_burden(Some(2000), None);
        assert_abs_diff_eq!(total, burden, epsilon = 1e-9);
        assert!(burden > 0.0);
    }

    #[test]
    fn test_mother_death_burden_approaches_one() {
        // Focal's single mother must eventually die; by the terminal Focal
        // age nearly all of that expectation has been realized.
        let ledger = DeathLedger::from_full(&full_table());
        let series = ledger.series(Some(2000), None, KinType::Mother).unwrap();
        let terminal = *series.cumulative.last().unwrap();
        assert!(terminal > 0.95 && terminal <= 1.0 + 1e-9, "terminal = {}", terminal);
    }
}
