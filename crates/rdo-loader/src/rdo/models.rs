// RDO Data Models

use serde::{Deserialize, Serialize};

/// Target table for disease terms
pub const RDO_TABLE: &str = "rdo";

/// Target table for disease term cross-references
pub const RDO_XREF_TABLE: &str = "rdo_xref";

// ============================================================================
// Disease Terms
// ============================================================================

/// Cross-reference from a disease term to another vocabulary
///
/// Built from `alt_id` and `xref` values of the form `DB:VALUE`,
/// e.g. `OMIM:154700` -> `{ db: "OMIM", value: "154700" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xref {
    pub db: String,
    pub value: String,
}

impl Xref {
    pub fn new(db: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Xref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.db, self.value)
    }
}

/// A non-obsolete disease term ready for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseTerm {
    /// Term identifier, always `DOID:<digits>`
    pub doid: String,
    pub name: String,
    pub definition: Option<String>,
    /// `alt_id` entries first, then `xref` entries, in file order
    pub xrefs: Vec<Xref>,
}

impl DiseaseTerm {
    pub fn new(doid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            doid: doid.into(),
            name: name.into(),
            definition: None,
            xrefs: Vec::new(),
        }
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_xref(mut self, xref: Xref) -> Self {
        self.xrefs.push(xref);
        self
    }
}

// ============================================================================
// Provenance
// ============================================================================

/// Dataset registry row describing one load run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    /// e.g. "File ftp://.../RDO.obo, version 1.28"
    pub source: String,
    pub app: String,
    pub app_version: String,
    pub url: Option<String>,
}

impl Dataset {
    /// Describe a load of `source_url` at ontology release `data_version`
    pub fn for_file(
        name: impl Into<String>,
        source_url: &str,
        data_version: &str,
        app: impl Into<String>,
        app_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: format!("File {}, version {}", source_url, data_version),
            app: app.into(),
            app_version: app_version.into(),
            url: Some(source_url.to_string()),
        }
    }
}

/// Links a dataset to a table it populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub dataset_id: i64,
    pub table_name: String,
}

impl Provenance {
    pub fn new(dataset_id: i64, table_name: impl Into<String>) -> Self {
        Self {
            dataset_id,
            table_name: table_name.into(),
        }
    }
}

/// Version information reported by the target database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DbInfo {
    pub schema_ver: String,
    pub data_ver: String,
}

// ============================================================================
// Tests
// ============================================================================
