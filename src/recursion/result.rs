//! Full disaggregated output table

use serde::{Deserialize, Serialize};

use crate::kin::KinType;

/// One cell of the full result table: expected kin counts for a fixed
/// (Focal age, kin age, kin type, time label)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinCountRow {
    /// Kin category
    pub kin: KinType,

    /// Focal's age
    pub age_focal: u32,

    /// Kin age class
    pub age_kin: u32,

    /// Calendar year of the observation (None in stable mode when only a
    /// cohort label was requested)
    pub year: Option<i32>,

    /// Focal's birth cohort (None when only a period label was requested)
    pub cohort: Option<i32>,

    /// Expected living kin of this age
    pub living: f64,

    /// Expected kin deaths of this age experienced at this Focal age
    pub dead: f64,
}

/// Complete (Focal age x kin age x kin type x time) table for one run.
/// Immutable once the computation returns; rows are ordered by time label,
/// kin type (evaluation order), Focal age, kin age.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FullResultTable {
    rows: Vec<KinCountRow>,
}

impl FullResultTable {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, row: KinCountRow) {
        self.rows.push(row);
    }

    /// All rows in deterministic order
    pub fn rows(&self) -> &[KinCountRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct kin types present, in first-appearance order
    pub fn kin_types(&self) -> Vec<KinType> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.kin) {
                seen.push(row.kin);
            }
        }
        seen
    }

    /// Total expected living kin at one Focal age under one time label,
    /// summed over kin types and kin ages
    pub fn total_living_at(&self, age_focal: u32, year: Option<i32>, cohort: Option<i32>) -> f64 {
        self.rows
            .iter()
            .filter(|r| r.age_focal == age_focal && r.year == year && r.cohort == cohort)
            .map(|r| r.living)
            .sum()
    }
}
