//! Time-varying mode: the diagonal age x calendar-year sweep
//!
//! Focal's age and the calendar year advance together: age x in year t
//! implies age x+1 in year t+1. The sweep keeps a rolling window of one
//! year's trajectories; year t is derived from year t-1 using year t-1 rates
//! (origin-year convention), with the age-0 boundary rebuilt from year t's
//! birth distribution and same-year prerequisite trajectories. The first
//! supplied year is seeded with the stable solution at its own rates, so
//! cohorts born before the observation window are well-defined.
//!
//! The sweep stops at the last year any requested period or cohort output
//! touches, so cost tracks the query rather than the full schedule span.

use log::debug;

use crate::error::KinshipError;
use crate::kin::KinType;
use crate::rates::RateSet;

use super::engine::{
    birth_term, empty_store, expect_trajectory, initial_living, stable_trajectories,
    KinStore, KinshipConfig,
};
use super::result::{FullResultTable, KinCountRow};
use super::state::{project_step, KinTrajectory, KinVector};

pub(crate) fn run(
    rates: &RateSet,
    config: &KinshipConfig,
    order: &[KinType],
    selected: &[KinType],
) -> Result<FullResultTable, KinshipError> {
    let years = rates.years();
    if years.windows(2).any(|w| w[1] != w[0] + 1) {
        return Err(KinshipError::config(
            "time-varying mode requires contiguous year columns",
        ));
    }
    if rates.population.is_none() && rates.birth_distribution.is_none() {
        return Err(KinshipError::config(
            "time-varying mode requires a population or birth-distribution schedule to derive pi",
        ));
    }

    let first = years[0];
    let last = *years.last().unwrap();
    for y in config.focal_years.iter().chain(&config.focal_cohorts) {
        if *y < first || *y > last {
            return Err(KinshipError::OutOfRangeYear {
                year: *y,
                first,
                last,
            });
        }
    }

    let n = rates.n_ages();
    let ff = config.birth_female_fraction;

    // Last year any requested output touches; cohort diagonals are truncated
    // at the schedule edge rather than extrapolated.
    let mut max_needed = first;
    for y in &config.focal_years {
        max_needed = max_needed.max(*y);
    }
    for c in &config.focal_cohorts {
        max_needed = max_needed.max((*c + n as i32 - 1).min(last));
    }

    let mut period_buffers: Vec<(i32, Vec<KinCountRow>)> = config
        .focal_years
        .iter()
        .map(|y| (*y, Vec::new()))
        .collect();
    let mut cohort_buffers: Vec<(i32, Vec<KinCountRow>)> = config
        .focal_cohorts
        .iter()
        .map(|c| (*c, Vec::new()))
        .collect();

    // Stable seed at the first supplied year
    let mut store = stable_trajectories(rates, first, ff, order)?;
    collect_outputs(
        first,
        &store,
        order,
        selected,
        config.living_only,
        n,
        &mut period_buffers,
        &mut cohort_buffers,
    );

    for t in (first + 1)..=max_needed {
        let survival_prev = rates.survival.column(t - 1)?;
        let fertility_prev: Vec<f64> = rates
            .fertility
            .column(t - 1)?
            .iter()
            .map(|f| f * ff)
            .collect();
        let pi = rates.pi_column(t, ff, false)?;

        let mut next: KinStore = empty_store();
        for kin in order {
            let prev = expect_trajectory(&store, *kin);
            let init = initial_living(*kin, &pi, &next, n);
            let mut traj = KinTrajectory::with_initial(KinVector::from_living(init));
            for focal_age in 0..n - 1 {
                let birth = birth_term(*kin, focal_age, &fertility_prev, &store);
                traj.push(project_step(prev.living(focal_age), survival_prev, birth));
            }
            next[kin.index()] = Some(traj);
        }
        store = next;
        debug!("sweep advanced to year {}", t);

        collect_outputs(
            t,
            &store,
            order,
            selected,
            config.living_only,
            n,
            &mut period_buffers,
            &mut cohort_buffers,
        );
    }

    let capacity = (period_buffers.iter().map(|(_, b)| b.len()).sum::<usize>())
        + cohort_buffers.iter().map(|(_, b)| b.len()).sum::<usize>();
    let mut full = FullResultTable::with_capacity(capacity);
    for (_, buffer) in period_buffers {
        for row in buffer {
            full.push(row);
        }
    }
    for (_, buffer) in cohort_buffers {
        for row in buffer {
            full.push(row);
        }
    }
    Ok(full)
}

/// Append rows for every requested output the sweep year intersects:
/// whole-age-range rows for a requested period year, and the single diagonal
/// cell (focal age = year - cohort) for each requested cohort.
#[allow(clippy::too_many_arguments)]
fn collect_outputs(
    year: i32,
    store: &KinStore,
    order: &[KinType],
    selected: &[KinType],
    living_only: bool,
    n_ages: usize,
    period_buffers: &mut [(i32, Vec<KinCountRow>)],
    cohort_buffers: &mut [(i32, Vec<KinCountRow>)],
) {
    let emit = |buffer: &mut Vec<KinCountRow>,
                kin: KinType,
                focal_age: usize,
                label_year: Option<i32>,
                label_cohort: Option<i32>| {
        let traj = expect_trajectory(store, kin);
        let living = traj.living(focal_age);
        let dead = traj.dead(focal_age);
        for age_kin in 0..n_ages {
            buffer.push(KinCountRow {
                kin,
                age_focal: focal_age as u32,
                age_kin: age_kin as u32,
                year: label_year,
                cohort: label_cohort,
                living: living[age_kin],
                dead: if living_only { 0.0 } else { dead[age_kin] },
            });
        }
    };

    for (period, buffer) in period_buffers.iter_mut() {
        if *period != year {
            continue;
        }
        for kin in order.iter().filter(|k| selected.contains(*k)) {
            for focal_age in 0..n_ages {
                emit(buffer, *kin, focal_age, Some(year), None);
            }
        }
    }

    for (cohort, buffer) in cohort_buffers.iter_mut() {
        let focal_age = year - *cohort;
        if focal_age < 0 || focal_age as usize >= n_ages {
            continue;
        }
        for kin in order.iter().filter(|k| selected.contains(*k)) {
            emit(buffer, *kin, focal_age as usize, None, Some(*cohort));
        }
    }
}
