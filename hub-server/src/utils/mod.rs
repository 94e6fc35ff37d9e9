//! Utility module
//!
//! - logger setup (stdout or daily-rolling file)

pub mod logger;

pub use logger::{init_logger, init_logger_with_file};
