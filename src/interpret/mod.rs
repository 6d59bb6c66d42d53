//! Structural interpretation of annotation subgraphs.
//!
//! Given a node in the annotation graph, the functions here recover what the
//! node denotes: its ontology term, the model variable computing it, the
//! properties it carries, its anatomical context, and its stoichiometric
//! coefficient. Every resolver distinguishes three outcomes via
//! [`Resolution`]: found, not found (normal, field omitted), and ambiguous
//! (fatal for the node being interpreted, never for its siblings).

pub mod fuzzy;

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::error::{GraphError, InterpretError};
use crate::graph::{ModelGraph, NodeId, Term};
use crate::node::{NodeKind, fragment_id, last_segment};
use crate::record::{EntityRecord, PartRecord, PropertyRecord};
use crate::roles::{CoefficientRole, EntityRefRole, IdentityRole, PartRole, PropertyRole, RoleMatcher};

/// Outcome of resolving one fact about one node.
///
/// `NotFound` is not an error: annotation graphs are routinely partial, and
/// callers omit the field. `Ambiguous` means the graph offers two or more
/// conflicting candidates, which the interpreter refuses to pick between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<T> {
    Found(T),
    NotFound,
    Ambiguous,
}

impl<T> Resolution<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Resolution::Ambiguous)
    }
}

/// Collapse candidate nodes: zero, one distinct, or conflict.
fn distinct(mut candidates: Vec<NodeId>) -> Resolution<NodeId> {
    candidates.sort();
    candidates.dedup();
    match candidates.len() {
        0 => Resolution::NotFound,
        1 => Resolution::Found(candidates[0]),
        _ => Resolution::Ambiguous,
    }
}

/// Short display name for a node, for logs and error messages.
pub(crate) fn node_label(graph: &ModelGraph, id: NodeId) -> String {
    match graph.term(id) {
        Term::Iri(iri) => last_segment(&iri),
        Term::Literal(value) => value,
    }
}

fn resolve_identity(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    node: NodeId,
    target: NodeKind,
    forward: &[IdentityRole],
    backward: &[IdentityRole],
) -> Resolution<NodeId> {
    let mut candidates = Vec::new();
    for triple in graph.triples_from(node) {
        if graph.kind(triple.object) != target {
            continue;
        }
        if let Some(role) = matcher.match_role::<IdentityRole>(&triple.predicate) {
            if forward.contains(&role) {
                candidates.push(triple.object);
            }
        }
    }
    for triple in graph.triples_to(node) {
        if graph.kind(triple.subject) != target {
            continue;
        }
        if let Some(role) = matcher.match_role::<IdentityRole>(&triple.predicate) {
            if backward.contains(&role) {
                candidates.push(triple.subject);
            }
        }
    }
    distinct(candidates)
}

/// Resolve the ontology term identifying `node`, looking one hop in both
/// directions. Forward, the node may say it *is* (a version of) the term;
/// backward, the term may claim the node as a version of itself.
pub fn resolve_ontology_term(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    node: NodeId,
) -> Resolution<NodeId> {
    resolve_identity(
        graph,
        matcher,
        node,
        NodeKind::OntologyTerm,
        &[
            IdentityRole::Is,
            IdentityRole::IsVersionOf,
            IdentityRole::HasPhysicalDefinition,
        ],
        &[IdentityRole::Is, IdentityRole::HasVersion],
    )
}

/// Resolve the source-model variable bound to `node`. The role sets are the
/// mirror image of [`resolve_ontology_term`]: a variable claims the node via
/// `isVersionOf` or `isComputationalComponentFor`, and a node claims its
/// variable via `hasVersion`.
pub fn resolve_model_variable(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    node: NodeId,
) -> Resolution<NodeId> {
    resolve_identity(
        graph,
        matcher,
        node,
        NodeKind::ModelVariable,
        &[IdentityRole::Is, IdentityRole::HasVersion],
        &[
            IdentityRole::Is,
            IdentityRole::IsVersionOf,
            IdentityRole::IsComputationalComponentFor,
        ],
    )
}

/// Dereference a participant wrapper to the physical entity it points at.
///
/// Exactly one hop: a wrapper whose referent is itself a wrapper stays at the
/// intermediate node. Returns the input node when no reference edge matches.
pub fn resolve_entity(graph: &ModelGraph, matcher: &RoleMatcher, node: NodeId) -> NodeId {
    for triple in graph.triples_from(node) {
        if graph.is_literal(triple.object) {
            continue;
        }
        if matcher.match_role::<EntityRefRole>(&triple.predicate).is_some() {
            return triple.object;
        }
    }
    node
}

/// Resolve a property node into (variable fragment, term id) strings.
fn property_parts(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    prop: NodeId,
) -> Result<(Option<String>, Option<String>), InterpretError> {
    match graph.kind(prop) {
        NodeKind::ModelVariable => {
            let variable = graph.iri(prop).map(|iri| fragment_id(&iri));
            let term = match resolve_ontology_term(graph, matcher, prop) {
                Resolution::Found(t) => Some(node_label(graph, t)),
                Resolution::NotFound => None,
                Resolution::Ambiguous => {
                    return Err(InterpretError::AmbiguousAnnotation {
                        node: node_label(graph, prop),
                        what: "property term",
                    });
                }
            };
            Ok((variable, term))
        }
        NodeKind::OntologyTerm => {
            // A variable may still claim the term from the other side.
            let variable = match resolve_model_variable(graph, matcher, prop) {
                Resolution::Found(v) => graph.iri(v).map(|iri| fragment_id(&iri)),
                Resolution::NotFound => None,
                Resolution::Ambiguous => {
                    return Err(InterpretError::AmbiguousAnnotation {
                        node: node_label(graph, prop),
                        what: "property variable",
                    });
                }
            };
            Ok((variable, Some(node_label(graph, prop))))
        }
        _ => {
            // An intermediate property node: resolve its variable and term.
            let variable = match resolve_model_variable(graph, matcher, prop) {
                Resolution::Found(v) => graph.iri(v).map(|iri| fragment_id(&iri)),
                Resolution::NotFound => None,
                Resolution::Ambiguous => {
                    return Err(InterpretError::AmbiguousAnnotation {
                        node: node_label(graph, prop),
                        what: "property variable",
                    });
                }
            };
            let term = match resolve_ontology_term(graph, matcher, prop) {
                Resolution::Found(t) => Some(node_label(graph, t)),
                Resolution::NotFound => None,
                Resolution::Ambiguous => {
                    return Err(InterpretError::AmbiguousAnnotation {
                        node: node_label(graph, prop),
                        what: "property term",
                    });
                }
            };
            Ok((variable, term))
        }
    }
}

/// Collect the properties carried by `entity`: incoming `isPropertyOf` edges
/// and outgoing `hasProperty` edges. Keys are variable fragments when a
/// variable is known, the term id otherwise.
pub fn find_properties(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    entity: NodeId,
) -> Result<BTreeMap<String, PropertyRecord>, InterpretError> {
    let mut property_nodes = Vec::new();
    for triple in graph.triples_to(entity) {
        if matcher.match_role::<PropertyRole>(&triple.predicate) == Some(PropertyRole::IsPropertyOf)
        {
            property_nodes.push(triple.subject);
        }
    }
    for triple in graph.triples_from(entity) {
        if matcher.match_role::<PropertyRole>(&triple.predicate) == Some(PropertyRole::HasProperty)
        {
            property_nodes.push(triple.object);
        }
    }

    let mut properties = BTreeMap::new();
    for prop in property_nodes {
        let (variable, term) = property_parts(graph, matcher, prop)?;
        let key = match (&variable, &term) {
            (Some(v), _) => v.clone(),
            (None, Some(t)) => t.clone(),
            (None, None) => {
                warn!(
                    property = %node_label(graph, prop),
                    entity = %node_label(graph, entity),
                    "property resolves to neither a variable nor a term; skipped"
                );
                continue;
            }
        };
        properties.insert(
            key,
            PropertyRecord {
                term,
                label: None,
                variable,
            },
        );
    }
    Ok(properties)
}

/// Collect the anatomical locations of `entity`: outgoing `isPartOf` edges
/// and incoming `hasPart` edges. Containers that are local entities rather
/// than ontology terms are resolved, or recursed through when unresolvable.
pub fn find_anatomical_parts(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    entity: NodeId,
) -> Result<BTreeMap<String, PartRecord>, InterpretError> {
    let mut parts = BTreeMap::new();
    let mut visited = HashSet::new();
    visited.insert(entity);
    collect_parts(graph, matcher, entity, &mut visited, &mut parts)?;
    Ok(parts)
}

fn collect_parts(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    node: NodeId,
    visited: &mut HashSet<NodeId>,
    parts: &mut BTreeMap<String, PartRecord>,
) -> Result<(), InterpretError> {
    let mut containers = Vec::new();
    for triple in graph.triples_from(node) {
        if matcher.match_role::<PartRole>(&triple.predicate) == Some(PartRole::IsPartOf) {
            containers.push(triple.object);
        }
    }
    for triple in graph.triples_to(node) {
        if matcher.match_role::<PartRole>(&triple.predicate) == Some(PartRole::HasPart) {
            containers.push(triple.subject);
        }
    }

    for container in containers {
        if !visited.insert(container) {
            continue;
        }
        match graph.kind(container) {
            NodeKind::OntologyTerm => {
                parts.insert(node_label(graph, container), PartRecord::default());
            }
            kind if kind.is_annotation_scoped() => {
                match resolve_ontology_term(graph, matcher, container) {
                    Resolution::Found(term) => {
                        parts.insert(node_label(graph, term), PartRecord::default());
                    }
                    Resolution::NotFound => {
                        collect_parts(graph, matcher, container, visited, parts)?;
                    }
                    Resolution::Ambiguous => {
                        return Err(InterpretError::AmbiguousAnnotation {
                            node: node_label(graph, container),
                            what: "anatomical part term",
                        });
                    }
                }
            }
            _ => {
                debug!(
                    container = %node_label(graph, container),
                    "part container is neither a term nor a local entity; skipped"
                );
            }
        }
    }
    Ok(())
}

/// Stoichiometric coefficient for a participant: a coefficient-role edge on
/// the wrapper node (checked first) or on the resolved entity itself.
/// Defaults to 1.0 when no coefficient edge exists.
pub fn find_stoichiometry(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    entity: NodeId,
    wrapper: NodeId,
) -> Result<f64, GraphError> {
    for node in [wrapper, entity] {
        for triple in graph.triples_from(node) {
            if !graph.is_literal(triple.object) {
                continue;
            }
            if matcher.match_role::<CoefficientRole>(&triple.predicate).is_none() {
                continue;
            }
            let literal = node_label(graph, triple.object);
            return literal
                .trim()
                .parse::<f64>()
                .map_err(|_| GraphError::BadCoefficient {
                    node: node_label(graph, node),
                    literal,
                });
        }
    }
    Ok(1.0)
}

/// Interpret one entity node into a record: term, properties, and anatomical
/// parts. Missing facts are omitted (and logged); conflicting facts raise.
pub fn interpret_entity(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    node: NodeId,
) -> Result<EntityRecord, InterpretError> {
    let term = match resolve_ontology_term(graph, matcher, node) {
        Resolution::Found(t) => Some(node_label(graph, t)),
        Resolution::NotFound => {
            debug!(node = %node_label(graph, node), "no ontology term resolved");
            None
        }
        Resolution::Ambiguous => {
            return Err(InterpretError::AmbiguousAnnotation {
                node: node_label(graph, node),
                what: "ontology term",
            });
        }
    };

    Ok(EntityRecord {
        term,
        label: None,
        properties: find_properties(graph, matcher, node)?,
        anatomical_parts: find_anatomical_parts(graph, matcher, node)?,
        stoichiometry: None,
        aligned_to: None,
    })
}
