//! Projection kernel and per-kin trajectory storage
//!
//! One step of the kinship recursion advances a kin-age distribution through
//! one year of Focal's life: survivors shift up one age class, survivors at
//! the open terminal age stay there, exits are recorded by age at death, and
//! newly born kin enter at kin age 0.

/// Living and dead kin-age distributions for a fixed Focal age
#[derive(Debug, Clone)]
pub struct KinVector {
    /// Expected living kin by kin age
    pub living: Vec<f64>,

    /// Expected deaths during the transition into this Focal age, by age at death
    pub dead: Vec<f64>,
}

impl KinVector {
    /// All-zero distributions
    pub fn zeros(n_ages: usize) -> Self {
        Self {
            living: vec![0.0; n_ages],
            dead: vec![0.0; n_ages],
        }
    }

    /// Start from a known living distribution with no recorded deaths
    pub fn from_living(living: Vec<f64>) -> Self {
        let dead = vec![0.0; living.len()];
        Self { living, dead }
    }
}

/// Trajectory of one kin type over Focal ages 0..n_ages-1
#[derive(Debug, Clone)]
pub struct KinTrajectory {
    steps: Vec<KinVector>,
}

impl KinTrajectory {
    /// Trajectory seeded with the Focal-age-0 boundary condition
    pub fn with_initial(initial: KinVector) -> Self {
        Self {
            steps: vec![initial],
        }
    }

    /// Number of Focal ages recorded so far
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Living distribution at a Focal age
    pub fn living(&self, focal_age: usize) -> &[f64] {
        &self.steps[focal_age].living
    }

    /// Deaths experienced at a Focal age, by age at death
    pub fn dead(&self, focal_age: usize) -> &[f64] {
        &self.steps[focal_age].dead
    }

    /// Append the next Focal age's distributions
    pub fn push(&mut self, step: KinVector) {
        self.steps.push(step);
    }

    /// Last recorded step
    pub fn last(&self) -> &KinVector {
        self.steps.last().expect("trajectory is never empty")
    }
}

/// One recursion step: survival-thin and age-shift a living distribution,
/// capture exits, and inject births at kin age 0.
///
/// The final age class is an open interval: its survivors remain in place via
/// a self-transition at the terminal survival rate rather than leaving the
/// table.
pub fn project_step(living: &[f64], survival: &[f64], birth: f64) -> KinVector {
    let n = living.len();
    debug_assert_eq!(survival.len(), n);

    let mut next = vec![0.0; n];
    let mut dead = vec![0.0; n];

    next[0] = birth;
    for a in 0..n - 1 {
        next[a + 1] = survival[a] * living[a];
    }
    next[n - 1] += survival[n - 1] * living[n - 1];

    for a in 0..n {
        dead[a] = (1.0 - survival[a]) * living[a];
    }

    KinVector { living: next, dead }
}

/// Expected births at one step: fertility dotted with the driving relative's
/// living distribution
pub fn birth_rate(fertility: &[f64], living: &[f64]) -> f64 {
    fertility.iter().zip(living).map(|(f, l)| f * l).sum()
}

/// Mix a prerequisite trajectory over the mothers'-age distribution:
/// `sum_a pi[a] * trajectory.living(a)`. Used for boundary conditions at
/// Focal's birth (e.g. grandmothers are the mother's mothers, averaged over
/// the mother's age when Focal was born).
pub fn pi_mix(pi: &[f64], trajectory: &KinTrajectory) -> Vec<f64> {
    let n = pi.len();
    let mut mixed = vec![0.0; n];
    for (a, weight) in pi.iter().enumerate() {
        if *weight == 0.0 || a >= trajectory.len() {
            continue;
        }
        for (m, v) in mixed.iter_mut().zip(trajectory.living(a)) {
            *m += weight * v;
        }
    }
    mixed
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_step_shifts_and_thins() {
        let living = vec![1.0, 2.0, 0.5];
        let survival = vec![0.9, 0.5, 0.1];
        let step = project_step(&living, &survival, 0.25);

        assert_eq!(step.living[0], 0.25);
        assert_abs_diff_eq!(step.living[1], 0.9, epsilon = 1e-12);
        // Age 1 survivors shift to terminal, terminal survivors stay
        assert_abs_diff_eq!(step.living[2], 2.0 * 0.5 + 0.5 * 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_step_records_exits() {
        let living = vec![1.0, 2.0, 0.5];
        let survival = vec![0.9, 0.5, 0.1];
        let step = project_step(&living, &survival, 0.0);

        assert_abs_diff_eq!(step.dead[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(step.dead[1], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(step.dead[2], 0.45, epsilon = 1e-12);

        // Mass balance: living in = living out + deaths - births
        let total_in: f64 = living.iter().sum();
        let total_out: f64 = step.living.iter().sum::<f64>() + step.dead.iter().sum::<f64>();
        assert_abs_diff_eq!(total_in, total_out, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_survival_propagates_zeros() {
        let living = vec![1.0, 1.0];
        let survival = vec![0.0, 0.0];
        let step = project_step(&living, &survival, 0.0);
        assert!(step.living.iter().all(|v| *v == 0.0));
        assert_abs_diff_eq!(step.dead.iter().sum::<f64>(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pi_mix_weights_trajectory() {
        let mut traj = KinTrajectory::with_initial(KinVector::from_living(vec![1.0, 0.0]));
        traj.push(KinVector::from_living(vec![0.0, 1.0]));

        let mixed = pi_mix(&[0.25, 0.75], &traj);
        assert_abs_diff_eq!(mixed[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(mixed[1], 0.75, epsilon = 1e-12);
    }
}
