pub mod config;
pub mod detectors;
pub mod io;
pub mod metrics;
pub mod screening;
pub mod signal;

pub use config::*;
pub use screening::*;
pub use signal::*;
