pub mod color;
pub mod config;
pub mod forcing;
pub mod pairing;

pub use color::{ColorPattern, ColorReport};
pub use config::{SignalConfig, SignalPredicate, SignalRule};
