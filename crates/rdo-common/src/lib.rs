//! RDO Common Library
//!
//! Shared infrastructure for the TCRD ontology loaders.
//!
//! - **Logging**: file-first `tracing` setup with an optional console echo
//!
//! # Example
//!
//! ```no_run
//! use rdo_common::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::builder()
//!     .level(LogLevel::Info)
//!     .log_file("logs/rdo-loader.log")
//!     .build();
//! let _guard = init_logging(&config).unwrap();
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod logging;

pub use logging::{init_logging, LogConfig, LogGuard, LogLevel, LogOutput};
