//! Cross-model alignment: tracing a composed model's records back to the
//! module models they came from.
//!
//! Alignment is hierarchical. A composed process is first anchored to the
//! best-matching process across all module records; only then are its
//! participants matched, and only against the anchored process's same-role
//! participants; properties in turn match only within the already-matched
//! participant. A process that fails to anchor is abandoned whole (reported,
//! never guessed) while its siblings continue.

use std::collections::BTreeMap;
use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::error::AlignError;
use crate::oracle::{Embedding, SimilarityOracle, best_matches};
use crate::record::{EntityRecord, ModelRecord, ProcessRecord, PropertyRecord};

/// Default similarity threshold for anchoring and matching.
pub const DEFAULT_ALIGN_THRESHOLD: f32 = 0.55;

/// What alignment achieved, and what it refused to guess.
#[derive(Debug, Default)]
pub struct AlignReport {
    /// Composed process key → module process key, for every anchored process.
    pub anchored: Vec<(String, String)>,
    /// One entry per composed process that no module process explains.
    pub missing: Vec<AlignError>,
}

fn label_or_key(key: &str, label: Option<&str>, term: Option<&str>) -> String {
    label
        .or(term)
        .map(str::to_string)
        .unwrap_or_else(|| key.to_string())
}

/// Text identity of one property, for embedding.
pub fn property_text(key: &str, property: &PropertyRecord) -> String {
    label_or_key(key, property.label.as_deref(), property.term.as_deref())
}

/// Text identity of one participant: its role, its label or term, and its
/// properties.
pub fn entity_text(key: &str, entity: &EntityRecord, role: &str) -> String {
    let mut parts = vec![
        role.to_string(),
        label_or_key(key, entity.label.as_deref(), entity.term.as_deref()),
    ];
    parts.extend(entity.properties.iter().map(|(k, p)| property_text(k, p)));
    parts.extend(entity.anatomical_parts.keys().cloned());
    parts.join(" ")
}

/// Text identity of a whole process subtree.
pub fn process_text(key: &str, process: &ProcessRecord) -> String {
    let mut parts = vec![
        "process".to_string(),
        label_or_key(
            key,
            process.entity.label.as_deref(),
            process.entity.term.as_deref(),
        ),
    ];
    for (role, map) in [
        ("source", &process.source),
        ("sink", &process.sink),
        ("mediator", &process.mediator),
    ] {
        for (k, entity) in map {
            parts.push(entity_text(k, entity, role));
        }
    }
    parts.extend(
        process
            .entity
            .properties
            .iter()
            .map(|(k, p)| property_text(k, p)),
    );
    parts.join(" ")
}

/// Module-side prefix for process keys: the module's base IRI, or a
/// positional fallback when the module record carries none.
fn module_prefix(module: &ModelRecord, index: usize) -> String {
    module
        .model_base
        .clone()
        .unwrap_or_else(|| format!("module{index}#"))
}

/// Align `composed` against `modules`, writing matched keys in place:
/// `aligned_to` on processes and participants, `variable` on properties
/// whose module counterpart knows its variable. Unmatched records keep
/// `None` and are never discarded.
pub fn align(
    composed: &mut ModelRecord,
    modules: &[ModelRecord],
    oracle: &dyn SimilarityOracle,
    threshold: f32,
) -> AlignReport {
    let mut report = AlignReport::default();

    // Embed every module process once, across all modules. Candidates carry
    // (module index, bare process key, prefixed key).
    let mut candidates: Vec<((usize, String, String), Embedding)> = Vec::new();
    for (index, module) in modules.iter().enumerate() {
        let prefix = module_prefix(module, index);
        for (key, process) in &module.physical_processes {
            candidates.push((
                (index, key.clone(), format!("{prefix}{key}")),
                oracle.encode(&process_text(key, process)),
            ));
        }
    }

    for (key, process) in composed.physical_processes.iter_mut() {
        let target = oracle.encode(&process_text(key, process));
        let anchor = best_matches(oracle, &target, &candidates, threshold, 1)
            .map(|mut keys| keys.remove(0));

        let Some((module_index, bare_key, module_key)) = anchor else {
            let err = AlignError::AnchorMissing {
                process: key.clone(),
                threshold,
            };
            warn!(error = %err, "process subtree abandoned");
            report.missing.push(err);
            continue;
        };

        let module_process = &modules[module_index].physical_processes[&bare_key];

        process.entity.aligned_to = Some(module_key.clone());
        align_properties(
            &mut process.entity.properties,
            &module_process.entity.properties,
            oracle,
            threshold,
        );
        for (role, map, module_map) in [
            ("source", &mut process.source, &module_process.source),
            ("sink", &mut process.sink, &module_process.sink),
            ("mediator", &mut process.mediator, &module_process.mediator),
        ] {
            align_participants(role, map, module_map, oracle, threshold);
        }

        info!(composed = %key, module = %module_key, "process anchored");
        report.anchored.push((key.clone(), module_key));
    }

    report
}

/// Match composed participants against the anchored process's same-role
/// participants. Each module participant is consumed by its first match.
fn align_participants(
    role: &str,
    composed: &mut BTreeMap<String, EntityRecord>,
    module: &BTreeMap<String, EntityRecord>,
    oracle: &dyn SimilarityOracle,
    threshold: f32,
) {
    let mut taken: HashSet<&String> = HashSet::new();
    for (key, entity) in composed.iter_mut() {
        let target = oracle.encode(&entity_text(key, entity, role));
        let candidates: Vec<(&String, Embedding)> = module
            .iter()
            .filter(|(k, _)| !taken.contains(k))
            .map(|(k, e)| (k, oracle.encode(&entity_text(k, e, role))))
            .collect();

        let Some(matched) = best_matches(oracle, &target, &candidates, threshold, 1)
            .map(|mut keys| keys.remove(0))
        else {
            debug!(role, participant = %key, "no counterpart; left unaligned");
            continue;
        };

        taken.insert(matched);
        entity.aligned_to = Some(matched.clone());
        align_properties(
            &mut entity.properties,
            &module[matched].properties,
            oracle,
            threshold,
        );
    }
}

/// Match properties within an already-matched parent, recovering the module
/// variable binding the composed record lost.
fn align_properties(
    composed: &mut BTreeMap<String, PropertyRecord>,
    module: &BTreeMap<String, PropertyRecord>,
    oracle: &dyn SimilarityOracle,
    threshold: f32,
) {
    let mut taken: HashSet<&String> = HashSet::new();
    for (key, property) in composed.iter_mut() {
        let target = oracle.encode(&property_text(key, property));
        let candidates: Vec<(&String, Embedding)> = module
            .iter()
            .filter(|(k, _)| !taken.contains(k))
            .map(|(k, p)| (k, oracle.encode(&property_text(k, p))))
            .collect();

        let Some(matched) = best_matches(oracle, &target, &candidates, threshold, 1)
            .map(|mut keys| keys.remove(0))
        else {
            continue;
        };

        taken.insert(matched);
        if let Some(variable) = &module[matched].variable {
            property.variable = Some(variable.clone());
        }
    }
}
