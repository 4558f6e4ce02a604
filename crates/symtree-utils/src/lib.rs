//! # symtree Utilities
//!
//! Shared utilities and logging for symtree.
//!
//! This crate provides common functionality used across the symtree workspace,
//! chiefly the `tracing` subscriber setup shared by the command-line tools.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{
    LogFile,
    LogFormat,
    LogLevel,
    LoggingConfig,
    LoggingError,
    LoggingGuard,
    init_logging,
    init_logging_with,
    init_logging_with_level,
};
pub use tracing::{debug, error, info, trace, warn};
