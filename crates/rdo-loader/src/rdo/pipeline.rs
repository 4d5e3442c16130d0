// RDO Pipeline Orchestration
//
// One linear run: fetch the OBO file, extract disease terms, connect, register
// the dataset and its provenance, then insert every term. Per-term failures
// are collected; anything else aborts the run.

use crate::config::LoaderConfig;
use crate::rdo::parser::read_data_version;
use crate::rdo::{
    Dataset, DbInfo, DiseaseTerm, ExtractStats, Extraction, OntologyStore, Provenance,
    RdoDownloader, RdoParser, RdoStorage, Result, RDO_TABLE, RDO_XREF_TABLE,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Recorded in the dataset source when the file carries no `data-version`
pub const UNKNOWN_DATA_VERSION: &str = "unknown";

// ============================================================================
// Load results
// ============================================================================

/// Stage a run has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Init,
    Downloaded,
    Parsed,
    Loaded,
    Done,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadPhase::Init => "init",
            LoadPhase::Downloaded => "downloaded",
            LoadPhase::Parsed => "parsed",
            LoadPhase::Loaded => "loaded",
            LoadPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of inserting a single term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Failed(String),
}

/// A term the database rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFailure {
    pub doid: String,
    pub reason: String,
}

/// Counts for the term insertion loop
///
/// `inserted + errors() == processed` holds after every [`record`](Self::record).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub processed: usize,
    pub inserted: usize,
    pub failures: Vec<TermFailure>,
}

impl LoadSummary {
    pub fn record(&mut self, doid: &str, outcome: InsertOutcome) {
        self.processed += 1;
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::Failed(reason) => self.failures.push(TermFailure {
                doid: doid.to_string(),
                reason,
            }),
        }
    }

    /// Number of terms that failed to insert
    pub fn errors(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything a finished run reports back to the caller
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: LoadSummary,
    pub extract_stats: ExtractStats,
    /// Terms kept by extraction
    pub term_count: usize,
    pub data_version: String,
    pub dataset_id: i64,
    pub obo_path: PathBuf,
    pub db_info: Option<DbInfo>,
    pub elapsed: Duration,
}

// ============================================================================
// Loading
// ============================================================================

/// Register `dataset` and insert every term in key order
///
/// The dataset row and both provenance rows must succeed or the load is
/// aborted. A failing term is logged and recorded, and the loop continues.
/// Returns the new dataset id with the summary.
pub async fn load_terms<S: OntologyStore + ?Sized>(
    store: &S,
    terms: &BTreeMap<String, DiseaseTerm>,
    dataset: &Dataset,
) -> Result<(i64, LoadSummary)> {
    let dataset_id = store.insert_dataset(dataset).await?;

    for table in [RDO_TABLE, RDO_XREF_TABLE] {
        store.insert_provenance(&Provenance::new(dataset_id, table)).await?;
    }

    info!("Loading {} RGD Disease Ontology terms", terms.len());

    let mut summary = LoadSummary::default();
    for (doid, term) in terms {
        let outcome = match store.insert_term(term).await {
            Ok(()) => InsertOutcome::Inserted,
            Err(e) => {
                error!(doid = %doid, error = %e, "Failed to insert rdo term");
                InsertOutcome::Failed(e.to_string())
            },
        };
        summary.record(doid, outcome);
    }

    info!(
        "{} terms processed, {} inserted, {} errors",
        summary.processed,
        summary.inserted,
        summary.errors()
    );

    Ok((dataset_id, summary))
}

// ============================================================================
// Pipeline
// ============================================================================

/// RGD Disease Ontology load pipeline
pub struct RdoPipeline {
    config: LoaderConfig,
    phase: LoadPhase,
}

impl RdoPipeline {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            phase: LoadPhase::Init,
        }
    }

    /// Stage reached so far; a failed run stays at the last completed stage
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Run against the configured Postgres database
    pub async fn run(&mut self) -> Result<RunReport> {
        let started = Instant::now();

        let (obo_path, extraction, data_version) = self.prepare().await?;

        info!("Step 3/4: Connecting to database");
        let storage = RdoStorage::connect(&self.config.database).await?;

        self.finish(&storage, obo_path, extraction, data_version, started)
            .await
    }

    /// Run against an already-open store
    pub async fn run_with<S: OntologyStore + ?Sized>(&mut self, store: &S) -> Result<RunReport> {
        let started = Instant::now();

        let (obo_path, extraction, data_version) = self.prepare().await?;

        self.finish(store, obo_path, extraction, data_version, started)
            .await
    }

    /// Fetch and parse
    async fn prepare(&mut self) -> Result<(PathBuf, Extraction, String)> {
        info!("Starting RGD Disease Ontology load");
        self.config.validate()?;

        info!("Step 1/4: Fetching {}", self.config.source.url);
        let obo_path = RdoDownloader::new(self.config.source.clone()).fetch().await?;
        self.advance(LoadPhase::Downloaded);

        info!("Step 2/4: Parsing {}", obo_path.display());
        let extraction = RdoParser::new()?.extract_file(&obo_path)?;
        let data_version = resolve_data_version(&obo_path)?;
        self.advance(LoadPhase::Parsed);

        Ok((obo_path, extraction, data_version))
    }

    async fn finish<S: OntologyStore + ?Sized>(
        &mut self,
        store: &S,
        obo_path: PathBuf,
        extraction: Extraction,
        data_version: String,
        started: Instant,
    ) -> Result<RunReport> {
        let db_info = match store.db_info().await {
            Ok(info) => {
                info!(
                    "Connected to TCRD database {} (schema ver {}; data ver {})",
                    self.config.database.name, info.schema_ver, info.data_ver
                );
                Some(info)
            },
            Err(e) => {
                warn!("Could not read dbinfo from {}: {}", self.config.database.name, e);
                None
            },
        };

        info!("Step 4/4: Loading terms...");
        let dataset = Dataset::for_file(
            &self.config.dataset.name,
            &self.config.source.url,
            &data_version,
            &self.config.dataset.app,
            &self.config.dataset.app_version,
        );
        let (dataset_id, summary) = load_terms(store, &extraction.terms, &dataset).await?;
        self.advance(LoadPhase::Loaded);

        let elapsed = started.elapsed();
        self.advance(LoadPhase::Done);

        info!(
            "RGD Disease Ontology load complete: dataset {}, {} inserted, {} errors in {}",
            dataset_id,
            summary.inserted,
            summary.errors(),
            format_elapsed(elapsed)
        );

        Ok(RunReport {
            term_count: extraction.len(),
            summary,
            extract_stats: extraction.stats,
            data_version,
            dataset_id,
            obo_path,
            db_info,
            elapsed,
        })
    }

    fn advance(&mut self, next: LoadPhase) {
        debug!("Phase {} -> {}", self.phase, next);
        self.phase = next;
    }
}

fn resolve_data_version(path: &Path) -> Result<String> {
    match read_data_version(path)? {
        Some(version) if !version.is_empty() => Ok(version),
        _ => {
            warn!(
                "No data-version header in {}, recording version as {}",
                path.display(),
                UNKNOWN_DATA_VERSION
            );
            Ok(UNKNOWN_DATA_VERSION.to_string())
        },
    }
}

/// Format a duration as `H:MM:SS.sss`
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rdo::{RdoError, Xref};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        datasets: Mutex<Vec<Dataset>>,
        provenance: Mutex<Vec<Provenance>>,
        terms: Mutex<Vec<DiseaseTerm>>,
        failing_doids: HashSet<String>,
        fail_dataset: bool,
        fail_provenance: bool,
    }

    impl MemoryStore {
        fn failing(doids: &[&str]) -> Self {
            Self {
                failing_doids: doids.iter().map(|d| d.to_string()).collect(),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl OntologyStore for MemoryStore {
        async fn db_info(&self) -> Result<DbInfo> {
            Ok(DbInfo {
                schema_ver: "6.12.0".to_string(),
                data_ver: "6.13.4".to_string(),
            })
        }

        async fn insert_dataset(&self, dataset: &Dataset) -> Result<i64> {
            if self.fail_dataset {
                return Err(RdoError::Validation("dataset rejected".to_string()));
            }
            let mut datasets = self.datasets.lock().unwrap();
            datasets.push(dataset.clone());
            Ok(datasets.len() as i64)
        }

        async fn insert_provenance(&self, provenance: &Provenance) -> Result<()> {
            if self.fail_provenance {
                return Err(RdoError::Validation("provenance rejected".to_string()));
            }
            self.provenance.lock().unwrap().push(provenance.clone());
            Ok(())
        }

        async fn insert_term(&self, term: &DiseaseTerm) -> Result<()> {
            if self.failing_doids.contains(&term.doid) {
                return Err(RdoError::Validation(format!("duplicate key {}", term.doid)));
            }
            self.terms.lock().unwrap().push(term.clone());
            Ok(())
        }
    }

    fn sample_terms() -> BTreeMap<String, DiseaseTerm> {
        [
            DiseaseTerm::new("DOID:0001816", "angiosarcoma")
                .with_xref(Xref::new("SNOMEDCT_US_2018_03_01", "33176006")),
            DiseaseTerm::new("DOID:4", "disease"),
            DiseaseTerm::new("DOID:162", "cancer"),
        ]
        .into_iter()
        .map(|t| (t.doid.clone(), t))
        .collect()
    }

    fn sample_dataset() -> Dataset {
        Dataset::for_file(
            "RGD Disease Ontology",
            "ftp://ftp.rgd.mcw.edu/pub/ontology/disease/RDO.obo",
            "1.28",
            "rdo-loader",
            "1.0.0",
        )
    }

    #[test]
    fn test_summary_record() {
        let mut summary = LoadSummary::default();
        summary.record("DOID:1", InsertOutcome::Inserted);
        summary.record("DOID:2", InsertOutcome::Failed("boom".to_string()));

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.errors(), 1);
        assert!(!summary.is_clean());
        assert_eq!(summary.failures[0].doid, "DOID:2");
    }

    #[tokio::test]
    async fn test_load_all_terms() {
        let store = MemoryStore::default();
        let (dataset_id, summary) = load_terms(&store, &sample_terms(), &sample_dataset())
            .await
            .unwrap();

        assert_eq!(dataset_id, 1);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.inserted, 3);
        assert!(summary.is_clean());

        let provenance = store.provenance.lock().unwrap();
        let tables: Vec<&str> = provenance.iter().map(|p| p.table_name.as_str()).collect();
        assert_eq!(tables, vec!["rdo", "rdo_xref"]);
        assert!(provenance.iter().all(|p| p.dataset_id == 1));

        // BTreeMap key order
        let doids: Vec<String> = store.terms.lock().unwrap().iter().map(|t| t.doid.clone()).collect();
        assert_eq!(doids, vec!["DOID:0001816", "DOID:162", "DOID:4"]);
    }

    #[tokio::test]
    async fn test_term_failures_are_collected() {
        let store = MemoryStore::failing(&["DOID:162"]);
        let (_, summary) = load_terms(&store, &sample_terms(), &sample_dataset())
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.errors(), 1);
        assert_eq!(summary.inserted + summary.errors(), summary.processed);
        assert_eq!(summary.failures[0].doid, "DOID:162");
        assert!(summary.failures[0].reason.contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_dataset_failure_aborts() {
        let store = MemoryStore {
            fail_dataset: true,
            ..MemoryStore::default()
        };
        let result = load_terms(&store, &sample_terms(), &sample_dataset()).await;

        assert!(result.is_err());
        assert!(store.terms.lock().unwrap().is_empty());
        assert!(store.provenance.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provenance_failure_aborts() {
        let store = MemoryStore {
            fail_provenance: true,
            ..MemoryStore::default()
        };
        let result = load_terms(&store, &sample_terms(), &sample_dataset()).await;

        assert!(result.is_err());
        assert!(store.terms.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_terms() {
        let store = MemoryStore::default();
        let (_, summary) = load_terms(&store, &BTreeMap::new(), &sample_dataset())
            .await
            .unwrap();

        assert_eq!(summary, LoadSummary::default());
        assert_eq!(store.provenance.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_run_with_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RDO.obo");
        std::fs::write(
            &path,
            "format-version: 1.2\ndata-version: 1.28\n\n[Term]\nid: DOID:4\nname: disease\n",
        )
        .unwrap();

        let mut config = LoaderConfig::default();
        config.source.local_obo_path = Some(path.clone());

        let store = MemoryStore::default();
        let mut pipeline = RdoPipeline::new(config);
        assert_eq!(pipeline.phase(), LoadPhase::Init);

        let report = pipeline.run_with(&store).await.unwrap();

        assert_eq!(pipeline.phase(), LoadPhase::Done);
        assert_eq!(report.term_count, 1);
        assert_eq!(report.summary.inserted, 1);
        assert_eq!(report.data_version, "1.28");
        assert_eq!(report.obo_path, path);
        assert_eq!(report.db_info.unwrap().schema_ver, "6.12.0");

        let datasets = store.datasets.lock().unwrap();
        assert_eq!(
            datasets[0].source,
            "File ftp://ftp.rgd.mcw.edu/pub/ontology/disease/RDO.obo, version 1.28"
        );
    }

    #[tokio::test]
    async fn test_run_without_data_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RDO.obo");
        std::fs::write(&path, "format-version: 1.2\n\n[Term]\nid: DOID:4\nname: disease\n").unwrap();

        let mut config = LoaderConfig::default();
        config.source.local_obo_path = Some(path);

        let report = RdoPipeline::new(config)
            .run_with(&MemoryStore::default())
            .await
            .unwrap();
        assert_eq!(report.data_version, UNKNOWN_DATA_VERSION);
    }

    #[tokio::test]
    async fn test_run_stops_at_failed_phase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RDO.obo");
        std::fs::write(&path, "[Term]\nid: DOID:4\nname: disease\n").unwrap();

        let mut config = LoaderConfig::default();
        config.source.local_obo_path = Some(path);

        let store = MemoryStore {
            fail_dataset: true,
            ..MemoryStore::default()
        };
        let mut pipeline = RdoPipeline::new(config);

        assert!(pipeline.run_with(&store).await.is_err());
        assert_eq!(pipeline.phase(), LoadPhase::Parsed);
    }

    #[tokio::test]
    async fn test_run_parse_error_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RDO.obo");
        std::fs::write(&path, "[Term]\nid: DOID:4\nthis line has no separator\n").unwrap();

        let mut config = LoaderConfig::default();
        config.source.local_obo_path = Some(path);

        let mut pipeline = RdoPipeline::new(config);
        let result = pipeline.run_with(&MemoryStore::default()).await;

        assert!(matches!(result, Err(RdoError::Parse { line: 3, .. })));
        assert_eq!(pipeline.phase(), LoadPhase::Downloaded);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(0)), "0:00:00.000");
        assert_eq!(format_elapsed(Duration::from_millis(5_123)), "0:00:05.123");
        assert_eq!(format_elapsed(Duration::from_millis(3_723_045)), "1:02:03.045");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(LoadPhase::Init.to_string(), "init");
        assert_eq!(LoadPhase::Done.to_string(), "done");
    }
}
