// RDO Term Extraction
//
// Reduces OBO stanzas to the disease terms TCRD stores: non-obsolete `Term`
// stanzas with a DOID identifier, keyed by that identifier.

use crate::rdo::obo::{OboReader, Stanza};
use crate::rdo::{DiseaseTerm, Result, Xref};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info, warn};

/// Number of leading lines searched for the `data-version:` header
pub const DATA_VERSION_SCAN_LINES: usize = 10;

/// Tags whose values become cross-references, in insertion order
const XREF_TAGS: [&str; 2] = ["alt_id", "xref"];

/// Counters describing what extraction kept and dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// All stanzas read, of any type
    pub stanzas: usize,
    /// Stanzas that were not `[Term]`
    pub non_term: usize,
    /// Term stanzas without an `id` tag
    pub missing_id: usize,
    /// Term stanzas replaced by a later stanza with the same id
    pub duplicate_ids: usize,
    /// Ids that are not `DOID:<digits>`
    pub non_doid: usize,
    /// Terms carrying `is_obsolete`
    pub obsolete: usize,
    /// DOID terms without a `name` tag
    pub missing_name: usize,
    /// `alt_id`/`xref` values that are not `DB:VALUE`
    pub malformed_xrefs: usize,
}

/// Result of extracting disease terms from an OBO document
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Kept terms keyed by DOID
    pub terms: BTreeMap<String, DiseaseTerm>,
    pub stats: ExtractStats,
}

impl Extraction {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

pub struct RdoParser {
    doid_pattern: Regex,
}

impl RdoParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            doid_pattern: Regex::new(r"^DOID:\d+$")?,
        })
    }

    /// Extract disease terms from an OBO file on disk
    pub fn extract_file(&self, path: &Path) -> Result<Extraction> {
        info!("Parsing RGD Disease Ontology file {}", path.display());
        let file = File::open(path)?;
        self.extract(BufReader::new(file))
    }

    /// Extract disease terms from an OBO stream
    ///
    /// Later stanzas with an already-seen id replace earlier ones.
    pub fn extract<R: BufRead>(&self, reader: R) -> Result<Extraction> {
        let mut stats = ExtractStats::default();
        let mut index: HashMap<String, Stanza> = HashMap::new();

        for stanza in OboReader::new(reader) {
            let stanza = stanza?;
            stats.stanzas += 1;

            if stanza.name != "Term" {
                stats.non_term += 1;
                continue;
            }

            let Some(id) = stanza.first("id").map(str::to_string) else {
                warn!("Skipping [Term] stanza without an id");
                stats.missing_id += 1;
                continue;
            };

            if index.insert(id.clone(), stanza).is_some() {
                debug!("Duplicate term id {}, keeping the later stanza", id);
                stats.duplicate_ids += 1;
            }
        }

        let mut terms = BTreeMap::new();
        for (id, stanza) in index {
            if let Some(term) = self.build_term(&id, &stanza, &mut stats) {
                terms.insert(id, term);
            }
        }

        info!(
            "Got {} RGD Disease Ontology terms ({} stanzas, {} obsolete, {} non-DOID, {} malformed xrefs dropped)",
            terms.len(),
            stats.stanzas,
            stats.obsolete,
            stats.non_doid,
            stats.malformed_xrefs
        );

        Ok(Extraction { terms, stats })
    }

    /// Whether `id` is a well-formed DOID identifier
    pub fn is_doid(&self, id: &str) -> bool {
        self.doid_pattern.is_match(id)
    }

    fn build_term(&self, id: &str, stanza: &Stanza, stats: &mut ExtractStats) -> Option<DiseaseTerm> {
        if !self.is_doid(id) {
            stats.non_doid += 1;
            return None;
        }

        if stanza.has_tag("is_obsolete") {
            stats.obsolete += 1;
            return None;
        }

        let Some(name) = stanza.first("name").filter(|n| !n.is_empty()) else {
            warn!("Skipping {}: no name", id);
            stats.missing_name += 1;
            return None;
        };

        let mut term = DiseaseTerm::new(id, name);
        term.definition = stanza.first("def").map(extract_quoted_text);

        for tag in XREF_TAGS {
            for value in stanza.values(tag) {
                if value.value.starts_with("http") {
                    continue;
                }
                match split_xref(&value.value) {
                    Some(xref) => term.xrefs.push(xref),
                    None => stats.malformed_xrefs += 1,
                }
            }
        }

        Some(term)
    }
}

/// Split a `DB:VALUE` reference into an [`Xref`]
///
/// Returns `None` unless the value has exactly one `:`; callers drop such
/// values. Either side may be empty (`OMIM:` gives an empty value).
pub fn split_xref(value: &str) -> Option<Xref> {
    let mut parts = value.split(':');
    let db = parts.next()?;
    let val = parts.next()?;

    if parts.next().is_some() {
        return None;
    }

    Some(Xref::new(db, val))
}

/// Extract the quoted text of an OBO definition
///
/// Example: `"A vascular cancer." [url:...]` -> `A vascular cancer.`
/// Backslash escapes inside the quotes are resolved. Text without an opening
/// quote is returned unchanged.
pub fn extract_quoted_text(text: &str) -> String {
    let Some(start) = text.find('"') else {
        return text.to_string();
    };

    let mut out = String::new();
    let mut escaped = false;
    for ch in text[start + 1..].chars() {
        if escaped {
            out.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => return out,
            c => out.push(c),
        }
    }

    // Unterminated quote: keep everything after it
    out
}

/// Read the ontology release from the `data-version:` header of an OBO file
pub fn read_data_version(path: &Path) -> Result<Option<String>> {
    let file = File::open(path)?;
    data_version_from_reader(BufReader::new(file))
}

/// Scan the first [`DATA_VERSION_SCAN_LINES`] lines for `data-version:`
pub fn data_version_from_reader<R: BufRead>(reader: R) -> Result<Option<String>> {
    for line in reader.lines().take(DATA_VERSION_SCAN_LINES) {
        let line = line?;
        if let Some(version) = line.strip_prefix("data-version:") {
            return Ok(Some(version.trim().to_string()));
        }
    }
    Ok(None)
}

// ============================================================================
// Tests
// ============================================================================
