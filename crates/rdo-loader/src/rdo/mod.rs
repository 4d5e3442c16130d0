// RGD Disease Ontology (RDO) Ingestion Module
//
// Loads the Rat Genome Database's disease ontology into a TCRD database.
// RDO is a superset of the Disease Ontology (DOID) plus RGD-specific terms,
// published as a single OBO file on the RGD FTP server.
//
// Stages:
// - Download: FTP retrieval of RDO.obo to a local path
// - Parse: OBO stanza reader + term extraction into DOID-keyed records
// - Store: dataset/provenance registration and per-term inserts
// - Pipeline: linear orchestration with a run summary
//
// Data source:
// - ftp://ftp.rgd.mcw.edu/pub/ontology/disease/RDO.obo

pub mod downloader;
pub mod models;
pub mod obo;
pub mod parser;
pub mod pipeline;
pub mod storage;

// Re-export main types
pub use downloader::{FtpLocation, RdoDownloader};
pub use models::{Dataset, DbInfo, DiseaseTerm, Provenance, Xref, RDO_TABLE, RDO_XREF_TABLE};
pub use obo::{OboReader, Stanza, TagValue};
pub use parser::{split_xref, ExtractStats, Extraction, RdoParser};
pub use pipeline::{
    load_terms, InsertOutcome, LoadPhase, LoadSummary, RdoPipeline, RunReport, TermFailure,
};
pub use storage::{OntologyStore, RdoStorage};

/// Result type for RDO operations
pub type Result<T> = std::result::Result<T, RdoError>;

/// Error types for RDO ingestion
#[derive(Debug, thiserror::Error)]
pub enum RdoError {
    #[error("Download error: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to connect to database {database}: {source}")]
    Connection {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<suppaftp::FtpError> for RdoError {
    fn from(err: suppaftp::FtpError) -> Self {
        RdoError::Download(err.to_string())
    }
}

impl From<url::ParseError> for RdoError {
    fn from(err: url::ParseError) -> Self {
        RdoError::Config(format!("Invalid source URL: {}", err))
    }
}

impl From<regex::Error> for RdoError {
    fn from(err: regex::Error) -> Self {
        RdoError::Validation(err.to_string())
    }
}
