//! Fuzzy interpretation for graphs with uncooperative predicates.
//!
//! When the strict interpreter recovers nothing (predicates too far from any
//! canonical phrase, or structure the role matcher cannot see through), the
//! fuzzy path works at the level of whole subgraphs: every triple in the
//! extracted subgraph becomes a plain-text sentence, and candidate ontology
//! terms, properties, and anatomical parts are ranked by how well a
//! synthesized guess sentence ("X is version of TERM", "V is property of X")
//! matches one of those sentences.
//!
//! Two rules keep the guessing honest. Property-ontology (OPB) terms are
//! reserved for properties and never considered as entity identities or
//! anatomical parts; and a candidate consumed by one role is withdrawn from
//! the others, so a single term cannot both identify an entity and locate it.

use std::collections::BTreeMap;

use tracing::debug;

use crate::graph::traverse::triple_sentence;
use crate::graph::{ModelGraph, NodeId};
use crate::interpret::node_label;
use crate::node::{NodeKind, fragment_id};
use crate::oracle::{Embedding, SimilarityOracle};
use crate::record::{EntityRecord, PartRecord, PropertyRecord};
use crate::roles::RoleMatcher;

/// Every model-variable node in the graph, sorted by display label.
pub fn find_model_variables(graph: &ModelGraph) -> Vec<NodeId> {
    nodes_of_kind(graph, NodeKind::ModelVariable)
}

/// Every ontology-term node in the graph, sorted by display label.
pub fn find_ontology_terms(graph: &ModelGraph) -> Vec<NodeId> {
    nodes_of_kind(graph, NodeKind::OntologyTerm)
}

fn nodes_of_kind(graph: &ModelGraph, kind: NodeKind) -> Vec<NodeId> {
    let mut nodes: Vec<NodeId> = graph
        .nodes()
        .into_iter()
        .filter(|&n| graph.kind(n) == kind)
        .collect();
    nodes.sort_by_key(|&n| node_label(graph, n));
    nodes
}

/// OPB terms denote physical properties, never entities or locations.
fn is_property_term(graph: &ModelGraph, term: NodeId) -> bool {
    node_label(graph, term).to_lowercase().contains("opb")
}

/// The graph's triples rendered as sentences and embedded once.
struct SentenceIndex(Vec<Embedding>);

impl SentenceIndex {
    fn new(graph: &ModelGraph, oracle: &dyn SimilarityOracle) -> Self {
        SentenceIndex(
            graph
                .all_triples()
                .iter()
                .map(|t| oracle.encode(&triple_sentence(graph, t)))
                .collect(),
        )
    }

    /// Best similarity of any guess phrasing against any graph sentence.
    fn score(&self, oracle: &dyn SimilarityOracle, guesses: &[String]) -> f32 {
        let mut best = 0.0f32;
        for guess in guesses {
            let emb = oracle.encode(guess);
            for sentence in &self.0 {
                best = best.max(oracle.similarity(&emb, sentence));
            }
        }
        best
    }
}

/// Interpret one entity node by similarity guessing over its subgraph.
///
/// `graph` must be the entity's extracted subgraph (see
/// [`crate::graph::traverse::extract_subgraph`]): the scoping is load-bearing,
/// since every model variable found in the subgraph is attributed to this
/// entity.
pub fn interpret_entity_fuzzy(
    graph: &ModelGraph,
    matcher: &RoleMatcher,
    node: NodeId,
) -> EntityRecord {
    let oracle = matcher.oracle();
    let threshold = matcher.threshold();
    let index = SentenceIndex::new(graph, oracle);
    let x = node_label(graph, node);

    let mut opb_terms = Vec::new();
    let mut entity_terms = Vec::new();
    for term in find_ontology_terms(graph) {
        if is_property_term(graph, term) {
            opb_terms.push(term);
        } else {
            entity_terms.push(term);
        }
    }

    // Each non-property term is claimed by whichever role explains it best;
    // below-threshold terms are claimed by nobody.
    let mut identity_candidates: Vec<(NodeId, f32)> = Vec::new();
    let mut anatomical_parts = BTreeMap::new();
    for term in entity_terms {
        let t = node_label(graph, term);
        let identity_score = index.score(
            oracle,
            &[
                format!("{x} is {t}"),
                format!("{x} is version of {t}"),
                format!("{x} has physical definition {t}"),
                format!("{t} has version {x}"),
            ],
        );
        let part_score = index.score(
            oracle,
            &[format!("{x} is part of {t}"), format!("{t} has part {x}")],
        );
        if identity_score < threshold && part_score < threshold {
            debug!(term = %t, entity = %x, "term explained by no role; ignored");
            continue;
        }
        if identity_score >= part_score {
            identity_candidates.push((term, identity_score));
        } else {
            anatomical_parts.insert(t, PartRecord::default());
        }
    }

    // Strict > scan keeps the first-seen candidate on a tie.
    let mut identity: Option<(NodeId, f32)> = None;
    for (term, score) in identity_candidates {
        if identity.is_none_or(|(_, best)| score > best) {
            identity = Some((term, score));
        }
    }
    let term = identity.map(|(t, _)| node_label(graph, t));

    // Properties: every variable in the (scoped) subgraph belongs to this
    // entity; guessing only decides which property term each one carries.
    // Leftover property terms attach directly to the entity.
    let mut properties = BTreeMap::new();
    for variable in find_model_variables(graph) {
        let v = node_label(graph, variable);

        let mut best: Option<(usize, f32)> = None;
        for (i, &prop) in opb_terms.iter().enumerate() {
            let p = node_label(graph, prop);
            let score = index.score(
                oracle,
                &[format!("{v} is version of {p}"), format!("{v} is {p}")],
            );
            if score >= threshold && best.is_none_or(|(_, b)| score > b) {
                best = Some((i, score));
            }
        }

        let fragment = graph
            .iri(variable)
            .map(|iri| fragment_id(&iri))
            .unwrap_or_else(|| v.clone());
        let term = best.map(|(i, _)| node_label(graph, opb_terms.remove(i)));
        properties.insert(
            fragment.clone(),
            PropertyRecord {
                term,
                label: None,
                variable: Some(fragment),
            },
        );
    }
    for prop in opb_terms {
        let p = node_label(graph, prop);
        let direct_score = index.score(
            oracle,
            &[
                format!("{x} has property {p}"),
                format!("{p} is property of {x}"),
            ],
        );
        if direct_score >= threshold {
            properties.insert(
                p.clone(),
                PropertyRecord {
                    term: Some(p),
                    label: None,
                    variable: None,
                },
            );
        }
    }

    EntityRecord {
        term,
        label: None,
        properties,
        anatomical_parts,
        stoichiometry: None,
        aligned_to: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Term;
    use crate::oracle::TokenBundleOracle;
    use crate::roles::RoleMatcher;
    use std::sync::Arc;

    fn matcher() -> RoleMatcher {
        RoleMatcher::new(Arc::new(TokenBundleOracle::default()))
    }

    fn iri(s: &str) -> Term {
        Term::Iri(s.to_string())
    }

    // Predicates a strict vocabulary would never recognize verbatim; the
    // words still resemble the canonical phrases.
    fn graph() -> (ModelGraph, NodeId) {
        let g = ModelGraph::new();
        let (entity, _) = g.add(
            iri("file:///m.ttl#glucose_out"),
            "urn:vocab#isVersionOf",
            iri("http://identifiers.org/CHEBI:4167"),
        );
        g.add(
            iri("file:///m.ttl#glucose_out"),
            "urn:vocab#isPartOf",
            iri("http://identifiers.org/FMA:66836"),
        );
        g.add(
            iri("file:///m/SGLT1.cellml#q_Ao"),
            "urn:vocab#isPropertyOf",
            iri("file:///m.ttl#glucose_out"),
        );
        g.add(
            iri("file:///m/SGLT1.cellml#q_Ao"),
            "urn:vocab#isVersionOf",
            iri("http://identifiers.org/opb/OPB_00425"),
        );
        (g, entity)
    }

    #[test]
    fn candidate_scans_find_terms_and_variables() {
        let (g, _) = graph();
        assert_eq!(find_ontology_terms(&g).len(), 3);
        assert_eq!(find_model_variables(&g).len(), 1);
    }

    #[test]
    fn identity_and_part_are_told_apart() {
        let (g, entity) = graph();
        let record = interpret_entity_fuzzy(&g, &matcher(), entity);
        assert_eq!(record.term.as_deref(), Some("CHEBI:4167"));
        assert!(record.anatomical_parts.contains_key("FMA:66836"));
        assert!(!record.anatomical_parts.contains_key("CHEBI:4167"));
    }

    #[test]
    fn opb_terms_become_properties_not_identities() {
        let (g, entity) = graph();
        let record = interpret_entity_fuzzy(&g, &matcher(), entity);
        let prop = &record.properties["q_Ao"];
        assert_eq!(prop.term.as_deref(), Some("OPB_00425"));
        assert_eq!(prop.variable.as_deref(), Some("q_Ao"));
        // The OPB term never leaks into identity or parts.
        assert_ne!(record.term.as_deref(), Some("OPB_00425"));
        assert!(!record.anatomical_parts.contains_key("OPB_00425"));
    }

    #[test]
    fn unrelated_variables_are_scoped_out_by_extraction() {
        let (g, entity) = graph();
        // A variable connected to a different entity entirely.
        g.add(
            iri("file:///m/SGLT1.cellml#v_stray"),
            "urn:vocab#isPropertyOf",
            iri("file:///m.ttl#elsewhere"),
        );
        let sub = crate::graph::traverse::extract_subgraph(&g, entity, &Default::default());
        let record = interpret_entity_fuzzy(&sub, &matcher(), entity);
        assert!(!record.properties.contains_key("v_stray"));
        assert!(record.properties.contains_key("q_Ao"));
    }

    #[test]
    fn empty_graph_yields_empty_record() {
        let g = ModelGraph::new();
        let node = g.intern(iri("file:///m.ttl#lonely"));
        let record = interpret_entity_fuzzy(&g, &matcher(), node);
        assert!(record.is_empty());
    }
}
