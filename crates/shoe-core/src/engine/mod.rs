pub mod arrange;
pub mod harvest;
pub mod permutations;
pub mod segment;
pub mod simulator;

pub use arrange::{ArrangeConfig, ArrangeWarning, Arrangement, arrange};
pub use harvest::{CandidateFilter, HarvestParams};
pub use simulator::{SwapProbe, simulate};
