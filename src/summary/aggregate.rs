//! Aggregation of the full table into per-kin-type summaries
//!
//! Collapses the (Focal age x kin age x kin type x time) table over kin age
//! into total count, count-weighted mean kin age, and count-weighted standard
//! deviation of kin age, separately for living kin and for the deaths
//! experienced at each Focal age. Zero-count cells report mean and sd as
//! undefined (`None`), never as an error or NaN.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::KinshipError;
use crate::kin::KinType;
use crate::recursion::FullResultTable;

use super::deaths::DeathLedger;

/// One summary cell: a (time label, kin type, Focal age) aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub kin: KinType,
    pub age_focal: u32,
    pub year: Option<i32>,
    pub cohort: Option<i32>,

    /// Expected living kin of this type, summed over kin age
    pub count_living: f64,

    /// Count-weighted mean kin age; None when the count is zero
    pub mean_age: Option<f64>,

    /// Count-weighted standard deviation of kin age; None when the count is zero
    pub sd_age: Option<f64>,

    /// Expected kin deaths experienced at this exact Focal age
    pub count_dead: f64,

    /// Cumulative kin deaths up to and including this Focal age
    pub count_dead_cum: f64,

    /// Count-weighted mean age at death of this Focal age's kin deaths;
    /// None when no deaths occur
    pub mean_age_dead: Option<f64>,

    /// Count-weighted standard deviation of age at death; None when no
    /// deaths occur
    pub sd_age_dead: Option<f64>,
}

/// Summary table derived from one full table; always re-derivable from it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryResultTable {
    rows: Vec<SummaryRow>,
}

impl SummaryResultTable {
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: f64,
    sum_age: f64,
    sum_age_sq: f64,
    count_dead: f64,
    sum_age_dead: f64,
    sum_age_dead_sq: f64,
}

type CellKey = (Option<i32>, Option<i32>, KinType, u32);

fn accumulate(full: &FullResultTable) -> BTreeMap<CellKey, Accumulator> {
    let mut cells: BTreeMap<CellKey, Accumulator> = BTreeMap::new();
    for row in full.rows() {
        let acc = cells
            .entry((row.year, row.cohort, row.kin, row.age_focal))
            .or_default();
        let age = row.age_kin as f64;
        acc.count += row.living;
        acc.sum_age += age * row.living;
        acc.sum_age_sq += age * age * row.living;
        acc.count_dead += row.dead;
        acc.sum_age_dead += age * row.dead;
        acc.sum_age_dead_sq += age * age * row.dead;
    }
    cells
}

/// Count-weighted (mean, sd) from raw sums; undefined on a zero count
fn weighted_moments(count: f64, sum: f64, sum_sq: f64) -> (Option<f64>, Option<f64>) {
    if count > 0.0 {
        let mean = sum / count;
        let variance = (sum_sq / count - mean * mean).max(0.0);
        (Some(mean), Some(variance.sqrt()))
    } else {
        (None, None)
    }
}

/// Collapse a full table into its summary
pub fn summarize(full: &FullResultTable) -> SummaryResultTable {
    let cells = accumulate(full);
    let deaths = DeathLedger::from_full(full);

    let rows = cells
        .into_iter()
        .map(|((year, cohort, kin, age_focal), acc)| {
            let (mean_age, sd_age) = weighted_moments(acc.count, acc.sum_age, acc.sum_age_sq);
            let (mean_age_dead, sd_age_dead) =
                weighted_moments(acc.count_dead, acc.sum_age_dead, acc.sum_age_dead_sq);
            let (count_dead, count_dead_cum) = deaths
                .series(year, cohort, kin)
                .and_then(|s| s.at_age(age_focal))
                .unwrap_or((0.0, 0.0));

            SummaryRow {
                kin,
                age_focal,
                year,
                cohort,
                count_living: acc.count,
                mean_age,
                sd_age,
                count_dead,
                count_dead_cum,
                mean_age_dead,
                sd_age_dead,
            }
        })
        .collect();

    SummaryResultTable { rows }
}

/// Regression invariant: re-derive the summary counts by independently
/// grouping the full table and require exact agreement. The accumulation adds
/// the same values in the same row order, so the sums must match bit-for-bit.
pub fn verify_consistency(
    full: &FullResultTable,
    summary: &SummaryResultTable,
) -> Result<(), KinshipError> {
    let rederived = accumulate(full);
    if rederived.len() != summary.len() {
        return Err(KinshipError::config(format!(
            "summary has {} cells, re-derivation has {}",
            summary.len(),
            rederived.len()
        )));
    }
    for row in summary.rows() {
        let key = (row.year, row.cohort, row.kin, row.age_focal);
        let acc = rederived
            .get(&key)
            .ok_or_else(|| KinshipError::config(format!("missing summary cell {:?}", key)))?;
        if acc.count != row.count_living {
            return Err(KinshipError::config(format!(
                "count mismatch at {:?}: {} vs {}",
                key, acc.count, row.count_living
            )));
        }
        if acc.count_dead != row.count_dead {
            return Err(KinshipError::config(format!(
                "death count mismatch at {:?}: {} vs {}",
                key, acc.count_dead, row.count_dead
            )));
        }
        let (mean_age_dead, sd_age_dead) =
            weighted_moments(acc.count_dead, acc.sum_age_dead, acc.sum_age_dead_sq);
        if mean_age_dead != row.mean_age_dead || sd_age_dead != row.sd_age_dead {
            return Err(KinshipError::config(format!(
                "death age moments mismatch at {:?}",
                key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::rates::demo_rate_set;
    use crate::recursion::{compute_kinship, KinshipConfig};

    fn demo_result() -> (FullResultTable, SummaryResultTable) {
        let rates = demo_rate_set(2000, 2000);
        let config = KinshipConfig {
            focal_years: vec![2000],
            living_only: false,
            ..Default::default()
        };
        let result = compute_kinship(&rates, &config).unwrap();
        (result.full, result.summary)
    }

    #[test]
    fn test_summary_counts_match_full_table() {
        let (full, summary) = demo_result();
        verify_consistency(&full, &summary).unwrap();

        // Spot check one cell against a direct filter
        let cell = summary
            .rows()
            .iter()
            .find(|r| r.kin == KinType::Daughter && r.age_focal == 40)
            .unwrap();
        let direct: f64 = full
            .rows()
            .iter()
            .filter(|r| r.kin == KinType::Daughter && r.age_focal == 40)
            .map(|r| r.living)
            .sum();
        assert_eq!(cell.count_living, direct);
        assert!(cell.count_living > 0.0);
    }

    #[test]
    fn test_zero_count_reports_undefined_moments() {
        let (_, summary) = demo_result();
        let at_birth = summary
            .rows()
            .iter()
            .find(|r| r.kin == KinType::Daughter && r.age_focal == 0)
            .unwrap();
        assert_eq!(at_birth.count_living, 0.0);
        assert!(at_birth.mean_age.is_none());
        assert!(at_birth.sd_age.is_none());
    }

    #[test]
    fn test_mean_age_of_mother_exceeds_focal_age_gap() {
        let (_, summary) = demo_result();
        // Mothers are older than Focal by the mean age at childbirth, which
        // for the demo fertility schedule sits in the late twenties.
        let at_birth = summary
            .rows()
            .iter()
            .find(|r| r.kin == KinType::Mother && r.age_focal == 0)
            .unwrap();
        let mean = at_birth.mean_age.unwrap();
        assert!(mean > 20.0 && mean < 40.0, "mean mother age {}", mean);
        assert!(at_birth.sd_age.unwrap() > 0.0);
    }

    #[test]
    fn test_death_age_moments_follow_the_dead_column() {
        let (full, summary) = demo_result();
        let cell = summary
            .rows()
            .iter()
            .find(|r| r.kin == KinType::Mother && r.age_focal == 60)
            .unwrap();

        let mut count = 0.0;
        let mut sum_age = 0.0;
        for row in full
            .rows()
            .iter()
            .filter(|r| r.kin == KinType::Mother && r.age_focal == 60)
        {
            count += row.dead;
            sum_age += row.age_kin as f64 * row.dead;
        }
        assert!(count > 0.0);
        assert_abs_diff_eq!(cell.mean_age_dead.unwrap(), sum_age / count, epsilon = 1e-12);
        // Mothers dying while Focal is 60 are older than Focal
        assert!(cell.mean_age_dead.unwrap() > 60.0);
        assert!(cell.sd_age_dead.unwrap() >= 0.0);
    }

    #[test]
    fn test_no_deaths_reports_undefined_death_moments() {
        let (_, summary) = demo_result();
        // No transition has happened yet at Focal age 0
        for row in summary.rows().iter().filter(|r| r.age_focal == 0) {
            assert_eq!(row.count_dead, 0.0);
            assert!(row.mean_age_dead.is_none());
            assert!(row.sd_age_dead.is_none());
        }

        // living_only skips death accounting entirely
        let rates = demo_rate_set(2000, 2000);
        let config = KinshipConfig {
            focal_years: vec![2000],
            ..Default::default()
        };
        let living_only = compute_kinship(&rates, &config).unwrap().summary;
        assert!(living_only
            .rows()
            .iter()
            .all(|r| r.mean_age_dead.is_none() && r.sd_age_dead.is_none()));
    }

    #[test]
    fn test_cumulative_deaths_non_decreasing() {
        let (_, summary) = demo_result();
        for kin in KinType::ALL {
            let mut prev = 0.0;
            for row in summary.rows().iter().filter(|r| r.kin == kin) {
                assert!(
                    row.count_dead_cum >= prev,
                    "cumulative deaths decreased for {}",
                    kin.code()
                );
                prev = row.count_dead_cum;
            }
        }
    }

    #[test]
    fn test_noncumulative_sums_reproduce_cumulative() {
        let (_, summary) = demo_result();
        for kin in KinType::ALL {
            let mut running = 0.0;
            for row in summary.rows().iter().filter(|r| r.kin == kin) {
                running += row.count_dead;
                assert_eq!(running, row.count_dead_cum);
            }
        }
    }
}
