//! The kin recursion engine: state kernel, stable and time-varying drivers,
//! and the full result table

mod engine;
mod result;
mod state;
mod varying;

pub use engine::{compute_kinship, KinshipConfig, KinshipEngine, KinshipResult};
pub use result::{FullResultTable, KinCountRow};
pub use state::{KinTrajectory, KinVector};
