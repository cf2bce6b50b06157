//! Logging, metrics and audit output for the out-of-order scanner.

pub mod metrics;
pub mod logging;
pub mod audit;

pub use metrics::Metrics;
pub use logging::{init_logging, LogFormat};
