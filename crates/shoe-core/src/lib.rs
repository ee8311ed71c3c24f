pub mod analysis;
pub mod engine;
pub mod game;
pub mod model;
pub mod signal;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "shoe-arranger"
    }

    pub const fn codename() -> &'static str {
        "Signal Shoe"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
