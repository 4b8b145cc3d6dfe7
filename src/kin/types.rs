//! The 14 kin categories and their evaluation order
//!
//! Each kin type carries a canonical short code and a fixed set of
//! prerequisite kin types: the types whose already-computed trajectories feed
//! either its birth term (e.g. nieces are born from a sister's fertility) or
//! its boundary condition at Focal's birth (e.g. older sisters at birth are
//! the mother's daughters mixed over the mothers'-age distribution).
//!
//! The prerequisites form a fixed acyclic graph; `evaluation_order` turns it
//! into an explicit topological ordering once per run rather than relying on
//! incidental iteration order.

use serde::{Deserialize, Serialize};

use crate::error::KinshipError;

/// One of the 14 kinship categories relative to Focal
///
/// Serializes as the canonical short code, matching `code()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KinType {
    #[serde(rename = "d")]
    Daughter,
    #[serde(rename = "gd")]
    GrandDaughter,
    #[serde(rename = "ggd")]
    GreatGrandDaughter,
    #[serde(rename = "m")]
    Mother,
    #[serde(rename = "gm")]
    GrandMother,
    #[serde(rename = "ggm")]
    GreatGrandMother,
    #[serde(rename = "os")]
    OlderSister,
    #[serde(rename = "ys")]
    YoungerSister,
    #[serde(rename = "nos")]
    NieceFromOlderSister,
    #[serde(rename = "nys")]
    NieceFromYoungerSister,
    #[serde(rename = "oa")]
    AuntOlderThanMother,
    #[serde(rename = "ya")]
    AuntYoungerThanMother,
    #[serde(rename = "coa")]
    CousinFromOlderAunt,
    #[serde(rename = "cya")]
    CousinFromYoungerAunt,
}

use KinType::*;

impl KinType {
    /// All 14 categories in canonical (output) order
    pub const ALL: [KinType; 14] = [
        Daughter,
        GrandDaughter,
        GreatGrandDaughter,
        Mother,
        GrandMother,
        GreatGrandMother,
        OlderSister,
        YoungerSister,
        NieceFromOlderSister,
        NieceFromYoungerSister,
        AuntOlderThanMother,
        AuntYoungerThanMother,
        CousinFromOlderAunt,
        CousinFromYoungerAunt,
    ];

    /// Canonical short code used in tabular output and selectors
    pub fn code(&self) -> &'static str {
        match self {
            Daughter => "d",
            GrandDaughter => "gd",
            GreatGrandDaughter => "ggd",
            Mother => "m",
            GrandMother => "gm",
            GreatGrandMother => "ggm",
            OlderSister => "os",
            YoungerSister => "ys",
            NieceFromOlderSister => "nos",
            NieceFromYoungerSister => "nys",
            AuntOlderThanMother => "oa",
            AuntYoungerThanMother => "ya",
            CousinFromOlderAunt => "coa",
            CousinFromYoungerAunt => "cya",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Daughter => "daughter",
            GrandDaughter => "grand-daughter",
            GreatGrandDaughter => "great-grand-daughter",
            Mother => "mother",
            GrandMother => "grandmother",
            GreatGrandMother => "great-grandmother",
            OlderSister => "older sister",
            YoungerSister => "younger sister",
            NieceFromOlderSister => "niece from older sister",
            NieceFromYoungerSister => "niece from younger sister",
            AuntOlderThanMother => "aunt older than mother",
            AuntYoungerThanMother => "aunt younger than mother",
            CousinFromOlderAunt => "cousin from older aunt",
            CousinFromYoungerAunt => "cousin from younger aunt",
        }
    }

    /// Parse a canonical short code
    pub fn from_code(code: &str) -> Result<Self, KinshipError> {
        match code {
            "d" => Ok(Daughter),
            "gd" => Ok(GrandDaughter),
            "ggd" => Ok(GreatGrandDaughter),
            "m" => Ok(Mother),
            "gm" => Ok(GrandMother),
            "ggm" => Ok(GreatGrandMother),
            "os" => Ok(OlderSister),
            "ys" => Ok(YoungerSister),
            "nos" => Ok(NieceFromOlderSister),
            "nys" => Ok(NieceFromYoungerSister),
            "oa" => Ok(AuntOlderThanMother),
            "ya" => Ok(AuntYoungerThanMother),
            "coa" => Ok(CousinFromOlderAunt),
            "cya" => Ok(CousinFromYoungerAunt),
            other => Err(KinshipError::InvalidKinCode(other.to_string())),
        }
    }

    /// Prerequisite kin types: trajectories that must already exist when this
    /// type's recursion runs (birth-term drivers and boundary-condition mixes)
    pub fn dependencies(&self) -> &'static [KinType] {
        match self {
            Daughter => &[],
            Mother => &[],
            GrandDaughter => &[Daughter],
            GreatGrandDaughter => &[GrandDaughter],
            GrandMother => &[Mother],
            GreatGrandMother => &[GrandMother],
            OlderSister => &[Daughter],
            YoungerSister => &[Mother],
            NieceFromOlderSister => &[OlderSister, GrandDaughter],
            NieceFromYoungerSister => &[YoungerSister],
            AuntOlderThanMother => &[OlderSister],
            AuntYoungerThanMother => &[YoungerSister, GrandMother],
            CousinFromOlderAunt => &[AuntOlderThanMother, NieceFromOlderSister],
            CousinFromYoungerAunt => &[AuntYoungerThanMother, NieceFromYoungerSister],
        }
    }

    /// Where a kin type's birth-injection term comes from at each step of
    /// Focal's aging
    pub fn birth_source(&self) -> BirthSource {
        match self {
            // Focal's own childbearing
            Daughter => BirthSource::Focal,
            // Childbearing of an already-computed relative
            GrandDaughter => BirthSource::Kin(Daughter),
            GreatGrandDaughter => BirthSource::Kin(GrandDaughter),
            YoungerSister => BirthSource::Kin(Mother),
            NieceFromOlderSister => BirthSource::Kin(OlderSister),
            NieceFromYoungerSister => BirthSource::Kin(YoungerSister),
            AuntYoungerThanMother => BirthSource::Kin(GrandMother),
            CousinFromOlderAunt => BirthSource::Kin(AuntOlderThanMother),
            CousinFromYoungerAunt => BirthSource::Kin(AuntYoungerThanMother),
            // No new kin of these types can be born after Focal's birth
            Mother | GrandMother | GreatGrandMother | OlderSister | AuntOlderThanMother => {
                BirthSource::None
            }
        }
    }

    /// Starting condition of the recursion at Focal age 0
    pub fn boundary_condition(&self) -> BoundaryCondition {
        match self {
            // Not yet born when Focal is born
            Daughter | GrandDaughter | GreatGrandDaughter | YoungerSister
            | NieceFromYoungerSister => BoundaryCondition::Zero,
            // Exactly one mother, aged per the mothers'-age distribution
            Mother => BoundaryCondition::MotherAgeDistribution,
            // A prerequisite's trajectory mixed over the mother's age at
            // Focal's birth (e.g. grandmothers are the mother's mothers)
            GrandMother => BoundaryCondition::PiMix(Mother),
            GreatGrandMother => BoundaryCondition::PiMix(GrandMother),
            OlderSister => BoundaryCondition::PiMix(Daughter),
            NieceFromOlderSister => BoundaryCondition::PiMix(GrandDaughter),
            AuntOlderThanMother => BoundaryCondition::PiMix(OlderSister),
            AuntYoungerThanMother => BoundaryCondition::PiMix(YoungerSister),
            CousinFromOlderAunt => BoundaryCondition::PiMix(NieceFromOlderSister),
            CousinFromYoungerAunt => BoundaryCondition::PiMix(NieceFromYoungerSister),
        }
    }

    /// Index into fixed-size per-kin arrays
    pub(crate) fn index(&self) -> usize {
        Self::ALL.iter().position(|k| k == self).unwrap()
    }
}

/// Origin of a kin type's birth-injection term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BirthSource {
    /// No new kin of this type after Focal's birth
    None,
    /// Focal's own fertility
    Focal,
    /// Fertility of an already-computed relative's distribution
    Kin(KinType),
}

/// Recursion starting condition at Focal age 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCondition {
    Zero,
    /// The mothers'-age-at-birth distribution pi itself
    MotherAgeDistribution,
    /// A prerequisite trajectory mixed over pi
    PiMix(KinType),
}

/// Expand a selection to its transitive dependency closure and return a
/// topological evaluation order over it (Kahn's algorithm).
///
/// The returned order always contains every prerequisite of every selected
/// type, so a restricted selection still computes the trajectories its
/// recursions consume. Output filtering back down to the selection happens in
/// the engine, not here.
pub fn evaluation_order(selected: &[KinType]) -> Vec<KinType> {
    // Transitive closure of the selection
    let mut needed = [false; 14];
    let mut stack: Vec<KinType> = selected.to_vec();
    while let Some(kin) = stack.pop() {
        if !needed[kin.index()] {
            needed[kin.index()] = true;
            stack.extend_from_slice(kin.dependencies());
        }
    }

    // Kahn over the closed set
    let mut in_degree = [0usize; 14];
    for kin in KinType::ALL {
        if !needed[kin.index()] {
            continue;
        }
        in_degree[kin.index()] = kin
            .dependencies()
            .iter()
            .filter(|d| needed[d.index()])
            .count();
    }

    let mut order = Vec::with_capacity(14);
    let mut ready: Vec<KinType> = KinType::ALL
        .into_iter()
        .filter(|k| needed[k.index()] && in_degree[k.index()] == 0)
        .collect();

    while let Some(kin) = ready.pop() {
        order.push(kin);
        for other in KinType::ALL {
            if needed[other.index()] && other.dependencies().contains(&kin) {
                in_degree[other.index()] -= 1;
                if in_degree[other.index()] == 0 {
                    ready.push(other);
                }
            }
        }
    }

    debug_assert_eq!(order.len(), needed.iter().filter(|n| **n).count());
    order
}

/// Resolve a list of selector codes into kin types
pub fn parse_kin_codes(codes: &[&str]) -> Result<Vec<KinType>, KinshipError> {
    codes.iter().map(|c| KinType::from_code(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        for kin in KinType::ALL {
            assert_eq!(KinType::from_code(kin.code()).unwrap(), kin);
        }
    }

    #[test]
    fn test_serde_uses_short_codes() {
        for kin in KinType::ALL {
            let json = serde_json::to_string(&kin).unwrap();
            assert_eq!(json, format!("\"{}\"", kin.code()));
            let back: KinType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kin);
        }
    }

    #[test]
    fn test_invalid_code() {
        let err = KinType::from_code("zz").unwrap_err();
        assert_eq!(err, KinshipError::InvalidKinCode("zz".to_string()));
    }

    #[test]
    fn test_full_order_respects_dependencies() {
        let order = evaluation_order(&KinType::ALL);
        assert_eq!(order.len(), 14);

        for (pos, kin) in order.iter().enumerate() {
            for dep in kin.dependencies() {
                let dep_pos = order.iter().position(|k| k == dep).unwrap();
                assert!(
                    dep_pos < pos,
                    "{} evaluated before its prerequisite {}",
                    kin.code(),
                    dep.code()
                );
            }
        }
    }

    #[test]
    fn test_selection_pulls_in_prerequisites() {
        // Cousins via older aunts need aunts, nieces, sisters, grand-daughters,
        // daughters... the whole maternal-side chain.
        let order = evaluation_order(&[CousinFromOlderAunt]);
        assert!(order.contains(&AuntOlderThanMother));
        assert!(order.contains(&NieceFromOlderSister));
        assert!(order.contains(&OlderSister));
        assert!(order.contains(&Daughter));
        assert!(order.contains(&GrandDaughter));
        assert!(!order.contains(&YoungerSister));
        assert!(!order.contains(&GreatGrandMother));
    }

    #[test]
    fn test_mother_only_selection() {
        let order = evaluation_order(&[Mother]);
        assert_eq!(order, vec![Mother]);
    }

    #[test]
    fn test_dependencies_cover_birth_and_boundary_sources() {
        for kin in KinType::ALL {
            let deps = kin.dependencies();
            if let BirthSource::Kin(driver) = kin.birth_source() {
                assert!(
                    deps.contains(&driver),
                    "{} birth driver {} missing from dependencies",
                    kin.code(),
                    driver.code()
                );
            }
            if let BoundaryCondition::PiMix(source) = kin.boundary_condition() {
                assert!(
                    deps.contains(&source),
                    "{} boundary source {} missing from dependencies",
                    kin.code(),
                    source.code()
                );
            }
        }
    }
}
