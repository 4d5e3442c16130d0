// RDO Storage Layer

use crate::config::DatabaseConfig;
use crate::rdo::{Dataset, DbInfo, DiseaseTerm, Provenance, RdoError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{debug, error, info};

/// Persistence operations the loader needs from a TCRD database
///
/// Each call is its own unit of work; nothing wraps the whole load.
#[async_trait]
pub trait OntologyStore: Send + Sync {
    /// Schema and data versions of the target database
    async fn db_info(&self) -> Result<DbInfo>;

    /// Register a load run, returning the new dataset id
    async fn insert_dataset(&self, dataset: &Dataset) -> Result<i64>;

    /// Record that a dataset populated a table
    async fn insert_provenance(&self, provenance: &Provenance) -> Result<()>;

    /// Insert one disease term together with its cross-references
    async fn insert_term(&self, term: &DiseaseTerm) -> Result<()>;
}

/// Postgres-backed [`OntologyStore`]
pub struct RdoStorage {
    db: PgPool,
}

impl RdoStorage {
    /// Connect to the configured database over a single connection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name);

        if let Some(user) = &config.user {
            options = options.username(user);
        }
        if let Some(password) = &config.password {
            options = options.password(password);
        }

        let db = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|source| RdoError::Connection {
                database: format!("{}@{}:{}", config.name, config.host, config.port),
                source,
            })?;

        info!("Connected to database {} on {}", config.name, config.host);

        Ok(Self { db })
    }

    /// Wrap an existing pool
    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    /// Create the loader's tables if they do not exist yet
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .map_err(|e| RdoError::Database(e.into()))?;
        Ok(())
    }

    /// Get database connection pool
    pub fn db(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl OntologyStore for RdoStorage {
    async fn db_info(&self) -> Result<DbInfo> {
        let info: DbInfo = sqlx::query_as(
            r#"
            SELECT schema_ver, data_ver
            FROM dbinfo
            LIMIT 1
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        Ok(info)
    }

    async fn insert_dataset(&self, dataset: &Dataset) -> Result<i64> {
        let result: std::result::Result<i64, sqlx::Error> = sqlx::query_scalar(
            r#"
            INSERT INTO dataset (name, source, app, app_version, url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&dataset.name)
        .bind(&dataset.source)
        .bind(&dataset.app)
        .bind(&dataset.app_version)
        .bind(&dataset.url)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(id) => {
                info!(dataset_id = id, name = %dataset.name, "Inserted dataset");
                Ok(id)
            },
            Err(e) => {
                error!(error = %e, name = %dataset.name, "Failed to insert dataset");
                Err(e.into())
            },
        }
    }

    async fn insert_provenance(&self, provenance: &Provenance) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO provenance (dataset_id, table_name)
            VALUES ($1, $2)
            "#,
        )
        .bind(provenance.dataset_id)
        .bind(&provenance.table_name)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => {
                info!(
                    dataset_id = provenance.dataset_id,
                    table = %provenance.table_name,
                    "Inserted provenance"
                );
                Ok(())
            },
            Err(e) => {
                error!(error = %e, table = %provenance.table_name, "Failed to insert provenance");
                Err(e.into())
            },
        }
    }

    async fn insert_term(&self, term: &DiseaseTerm) -> Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO rdo (doid, name, def)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&term.doid)
        .bind(&term.name)
        .bind(&term.definition)
        .execute(&mut *tx)
        .await?;

        if !term.xrefs.is_empty() {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO rdo_xref (doid, db, value) ");

            query_builder.push_values(&term.xrefs, |mut b, xref| {
                b.push_bind(&term.doid)
                    .push_bind(&xref.db)
                    .push_bind(&xref.value);
            });

            query_builder.push(" ON CONFLICT (doid, db, value) DO NOTHING");
            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        debug!(doid = %term.doid, xrefs = term.xrefs.len(), "Inserted rdo term");

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
