//! Ontology label lookup.
//!
//! Lookup decorates records with human-readable labels; it never drives a
//! structural decision. The trait boundary keeps the interpreter testable
//! without a network, and [`link_labels`] treats every failure as a warning:
//! a record that cannot be labeled is still a correct record.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::record::{EntityRecord, ModelRecord};

/// What a catalog knows about one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermInfo {
    pub label: String,
    pub definition: Option<String>,
    pub synonyms: Vec<String>,
}

/// A remote (or fake) ontology catalog.
pub trait OntologyLookup {
    fn lookup(&self, curie: &str) -> Result<TermInfo, LookupError>;
}

/// Normalize a term id to CURIE form: `OPB_00425` becomes `OPB:00425`;
/// ids already carrying a `:` pass through.
pub fn normalize_curie(term: &str) -> String {
    if term.contains(':') {
        return term.to_string();
    }
    match term.split_once('_') {
        Some((prefix, id)) => format!("{prefix}:{id}"),
        None => term.to_string(),
    }
}

const BIOPORTAL_URL: &str = "https://data.bioontology.org/search";
const UNIPROT_URL: &str = "https://rest.uniprot.org/uniprotkb";

/// Request timeout. Lookups are decoration; they must never stall a run.
const TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct BioPortalResponse {
    #[serde(default)]
    collection: Vec<BioPortalEntry>,
}

#[derive(Debug, Deserialize)]
struct BioPortalEntry {
    #[serde(rename = "prefLabel")]
    pref_label: Option<String>,
    #[serde(default)]
    definition: Vec<String>,
    #[serde(default)]
    synonym: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniProtResponse {
    protein_description: Option<UniProtDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniProtDescription {
    recommended_name: Option<UniProtName>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UniProtName {
    full_name: Option<UniProtValue>,
}

#[derive(Debug, Deserialize)]
struct UniProtValue {
    value: String,
}

fn parse_bioportal(curie: &str, response: BioPortalResponse) -> Result<TermInfo, LookupError> {
    let entry = response
        .collection
        .into_iter()
        .find(|e| e.pref_label.is_some())
        .ok_or_else(|| LookupError::NoMatch {
            curie: curie.to_string(),
        })?;
    Ok(TermInfo {
        label: entry.pref_label.unwrap_or_default(),
        definition: entry.definition.into_iter().next(),
        synonyms: entry.synonym,
    })
}

fn parse_uniprot(curie: &str, response: UniProtResponse) -> Result<TermInfo, LookupError> {
    let label = response
        .protein_description
        .and_then(|d| d.recommended_name)
        .and_then(|n| n.full_name)
        .map(|v| v.value)
        .ok_or_else(|| LookupError::NoMatch {
            curie: curie.to_string(),
        })?;
    Ok(TermInfo {
        label,
        definition: None,
        synonyms: Vec::new(),
    })
}

/// BioPortal-backed catalog, with a UniProt REST special case for protein
/// accessions (UniProt is not a BioPortal ontology).
pub struct BioPortalClient {
    agent: ureq::Agent,
    api_key: String,
}

impl BioPortalClient {
    pub fn new(api_key: &str) -> Self {
        BioPortalClient {
            agent: ureq::AgentBuilder::new()
                .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
                .build(),
            api_key: api_key.to_string(),
        }
    }

    fn request<T: serde::de::DeserializeOwned>(
        &self,
        curie: &str,
        request: ureq::Request,
    ) -> Result<T, LookupError> {
        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(status, _) => LookupError::Status {
                curie: curie.to_string(),
                status,
            },
            other => LookupError::Transport {
                curie: curie.to_string(),
                message: other.to_string(),
            },
        })?;
        response.into_json().map_err(|e| LookupError::Malformed {
            curie: curie.to_string(),
            message: e.to_string(),
        })
    }
}

impl OntologyLookup for BioPortalClient {
    fn lookup(&self, term: &str) -> Result<TermInfo, LookupError> {
        let curie = normalize_curie(term);
        debug!(%curie, "ontology lookup");

        if let Some((prefix, accession)) = curie.split_once(':') {
            if prefix.eq_ignore_ascii_case("uniprot") {
                let request = self
                    .agent
                    .get(&format!("{UNIPROT_URL}/{accession}.json"))
                    .set("Accept", "application/json");
                return parse_uniprot(&curie, self.request(&curie, request)?);
            }
        }

        let request = self
            .agent
            .get(BIOPORTAL_URL)
            .set("Authorization", &format!("apikey token={}", self.api_key))
            .query("q", &curie)
            .query("require_exact_match", "true");
        parse_bioportal(&curie, self.request(&curie, request)?)
    }
}

/// A memoizing wrapper over one run's lookups.
struct LabelCache<'a> {
    lookup: &'a dyn OntologyLookup,
    seen: BTreeMap<String, Option<String>>,
}

impl<'a> LabelCache<'a> {
    fn label(&mut self, term: &str) -> Option<String> {
        if let Some(cached) = self.seen.get(term) {
            return cached.clone();
        }
        let label = match self.lookup.lookup(term) {
            Ok(info) => Some(info.label),
            Err(err) => {
                warn!(%term, error = %err, "label lookup failed; term kept unlabeled");
                None
            }
        };
        self.seen.insert(term.to_string(), label.clone());
        label
    }

    fn decorate_entity(&mut self, entity: &mut EntityRecord) {
        if entity.label.is_none() {
            if let Some(term) = entity.term.clone() {
                entity.label = self.label(&term);
            }
        }
        for property in entity.properties.values_mut() {
            if property.label.is_none() {
                if let Some(term) = property.term.clone() {
                    property.label = self.label(&term);
                }
            }
        }
        let part_terms: Vec<String> = entity.anatomical_parts.keys().cloned().collect();
        for term in part_terms {
            let part = entity.anatomical_parts.get_mut(&term).expect("known key");
            if part.label.is_none() {
                part.label = self.label(&term);
            }
        }
    }
}

/// Fill in `label` on every record that has a term. Lookup failures are
/// logged and skipped; structural data is never touched.
pub fn link_labels(record: &mut ModelRecord, lookup: &dyn OntologyLookup) {
    let mut cache = LabelCache {
        lookup,
        seen: BTreeMap::new(),
    };
    for process in record.physical_processes.values_mut() {
        cache.decorate_entity(&mut process.entity);
        for entity in process
            .source
            .values_mut()
            .chain(process.sink.values_mut())
            .chain(process.mediator.values_mut())
        {
            cache.decorate_entity(entity);
        }
    }
    for entity in record.local_entities.values_mut() {
        cache.decorate_entity(entity);
    }
}
