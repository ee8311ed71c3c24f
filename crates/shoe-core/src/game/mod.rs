pub mod cut;
pub mod serialization;
