//! # Observability Infrastructure
//!
//! Structured logging for trust store operations.

pub mod logging;

pub use logging::{init_logging, log_config_info};
