//! RDO Loader Library
//!
//! Loads the RGD Disease Ontology (`RDO.obo`) into the `rdo` and `rdo_xref`
//! tables of a TCRD database, registering a dataset and its provenance.
//!
//! # Example
//!
//! ```no_run
//! use rdo_loader::config::LoaderConfig;
//! use rdo_loader::rdo::RdoPipeline;
//!
//! # async fn example() -> rdo_loader::rdo::Result<()> {
//! let mut pipeline = RdoPipeline::new(LoaderConfig::from_env());
//! let report = pipeline.run().await?;
//! println!("{} terms processed", report.summary.processed);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod rdo;

pub use config::LoaderConfig;
pub use rdo::{RdoError, RdoPipeline, Result};
