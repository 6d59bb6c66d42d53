//! Whole-model extraction: from an annotation graph to a [`ModelRecord`].
//!
//! A process is any node with at least one participant-role edge. The
//! process node and each participant are dereferenced through their
//! wrappers, interpreted, and filed; annotated entities left over after all
//! processes are consumed surface as `local_entities`, unless they carry
//! properties of their own. An ambiguous annotation costs only
//! the affected node's record (logged, siblings unaffected); malformed data
//! like a non-numeric coefficient aborts the run.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::error::SemResult;
use crate::graph::traverse::extract_subgraph;
use crate::graph::{ModelGraph, NodeId};
use crate::interpret::fuzzy::interpret_entity_fuzzy;
use crate::interpret::{
    find_stoichiometry, interpret_entity, node_label, resolve_entity,
};
use crate::node::NodeKind;
use crate::record::{EntityRecord, ModelRecord, ProcessRecord};
use crate::roles::{ParticipantRole, PropertyRole, RoleMatcher};

/// One participant edge of a process: its role, the wrapper node the edge
/// points at, and the physical entity behind the wrapper.
#[derive(Debug, Clone, Copy)]
pub struct Participant {
    pub role: ParticipantRole,
    pub wrapper: NodeId,
    pub entity: NodeId,
}

/// Nodes incident to at least one participant-role edge, as subject.
pub fn find_process_nodes(graph: &ModelGraph, matcher: &RoleMatcher) -> Vec<NodeId> {
    let mut processes: Vec<NodeId> = graph
        .nodes()
        .into_iter()
        .filter(|&n| {
            graph
                .triples_from(n)
                .iter()
                .any(|t| matcher.match_role::<ParticipantRole>(&t.predicate).is_some())
        })
        .collect();
    processes.sort();
    processes
}

/// The participants of one process, wrappers dereferenced.
pub fn find_participants(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    process: NodeId,
) -> Vec<Participant> {
    let mut participants = Vec::new();
    for triple in graph.triples_from(process) {
        if graph.is_literal(triple.object) {
            continue;
        }
        if let Some(role) = matcher.match_role::<ParticipantRole>(&triple.predicate) {
            participants.push(Participant {
                role,
                wrapper: triple.object,
                entity: resolve_entity(graph, matcher, triple.object),
            });
        }
    }
    participants
}

/// Common IRI head of the model's variables (trailing `#` included), from
/// the lexicographically smallest variable or composed-model identifier.
pub fn derive_model_base(graph: &ModelGraph) -> Option<String> {
    graph
        .nodes()
        .into_iter()
        .filter(|&n| {
            matches!(
                graph.kind(n),
                NodeKind::ModelVariable | NodeKind::ComposedModelRef
            )
        })
        .filter_map(|n| graph.iri(n))
        .min()
        .and_then(|iri| {
            iri.split_once('#')
                .map(|(head, _)| format!("{head}#"))
        })
}

/// A node carrying its own properties is assumed to be represented inside
/// some process or participant record already, not free-standing.
fn carries_properties(graph: &ModelGraph, matcher: &RoleMatcher, node: NodeId) -> bool {
    graph.triples_to(node).iter().any(|t| {
        matcher.match_role::<PropertyRole>(&t.predicate) == Some(PropertyRole::IsPropertyOf)
    }) || graph.triples_from(node).iter().any(|t| {
        matcher.match_role::<PropertyRole>(&t.predicate) == Some(PropertyRole::HasProperty)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Strict,
    Fuzzy,
}

/// Interpret an annotation graph with the strict role-matching pipeline.
pub fn extract_model(graph: &ModelGraph, matcher: &RoleMatcher) -> SemResult<ModelRecord> {
    extract(graph, matcher, Mode::Strict)
}

/// Interpret with the fuzzy pipeline: every node is interpreted inside its
/// own extracted subgraph, with the other processes and participants
/// excluded so candidates cannot leak between entities.
pub fn extract_model_fuzzy(graph: &ModelGraph, matcher: &RoleMatcher) -> SemResult<ModelRecord> {
    extract(graph, matcher, Mode::Fuzzy)
}

fn extract(graph: &ModelGraph, matcher: &RoleMatcher, mode: Mode) -> SemResult<ModelRecord> {
    // A process node may itself be a wrapper around the real entity; the
    // record is keyed and interpreted at the dereferenced node.
    let process_nodes = find_process_nodes(graph, matcher);
    let processes: Vec<(NodeId, Vec<Participant>)> = process_nodes
        .iter()
        .map(|&p| {
            (
                resolve_entity(graph, matcher, p),
                find_participants(graph, matcher, p),
            )
        })
        .collect();

    // Everything claimed by some process; also the exclusion pool for fuzzy
    // subgraph scoping.
    let mut consumed: HashSet<NodeId> = process_nodes.into_iter().collect();
    for (process, parts) in &processes {
        consumed.insert(*process);
        for p in parts {
            consumed.insert(p.wrapper);
            consumed.insert(p.entity);
        }
    }

    let mut record = ModelRecord {
        model_base: derive_model_base(graph),
        ..Default::default()
    };

    for (process, parts) in &processes {
        let entity = match interpret_node(graph, matcher, mode, *process, &consumed) {
            Some(entity) => entity,
            None => continue,
        };
        let mut process_record = ProcessRecord {
            entity,
            ..Default::default()
        };

        for participant in parts {
            let Some(mut entity) =
                interpret_node(graph, matcher, mode, participant.entity, &consumed)
            else {
                continue;
            };
            entity.stoichiometry = Some(find_stoichiometry(
                graph,
                matcher,
                participant.entity,
                participant.wrapper,
            )?);

            let key = node_label(graph, participant.entity);
            let slot = match participant.role {
                ParticipantRole::Source => &mut process_record.source,
                ParticipantRole::Sink => &mut process_record.sink,
                ParticipantRole::Mediator => &mut process_record.mediator,
            };
            slot.insert(key, entity);
        }

        record
            .physical_processes
            .insert(node_label(graph, *process), process_record);
    }

    // Annotated entities no process claimed.
    for node in graph.nodes() {
        if consumed.contains(&node)
            || !graph.kind(node).is_annotation_scoped()
            || carries_properties(graph, matcher, node)
        {
            continue;
        }
        let Some(entity) = interpret_node(graph, matcher, mode, node, &consumed) else {
            continue;
        };
        if entity.is_empty() {
            continue;
        }
        record.local_entities.insert(node_label(graph, node), entity);
    }

    info!(
        processes = record.physical_processes.len(),
        local_entities = record.local_entities.len(),
        fuzzy = mode == Mode::Fuzzy,
        "extracted model record"
    );
    Ok(record)
}

/// Interpret one node, in the selected mode. Returns `None` when the node's
/// record must be dropped (ambiguous annotation); the caller carries on.
fn interpret_node(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    mode: Mode,
    node: NodeId,
    consumed: &HashSet<NodeId>,
) -> Option<EntityRecord> {
    match mode {
        Mode::Strict => match interpret_entity(graph, matcher, node) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(node = %node_label(graph, node), error = %err, "record dropped");
                None
            }
        },
        Mode::Fuzzy => {
            let mut exclude = consumed.clone();
            exclude.remove(&node);
            let sub = extract_subgraph(graph, node, &exclude);
            Some(interpret_entity_fuzzy(&sub, matcher, node))
        }
    }
}
