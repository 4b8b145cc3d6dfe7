//! Kin categories and their dependency structure

mod types;

pub use types::{
    evaluation_order, parse_kin_codes, BirthSource, BoundaryCondition, KinType,
};
