//! Graph traversal: connected-subgraph extraction and textual description.

use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::graph::{ModelGraph, NodeId, Term, Triple};
use crate::node::{NodeKind, last_segment, segment_to_text};

/// Nodes at which traversal never continues: external vocabulary terms and
/// literal values have no annotation structure behind them.
fn is_terminal(graph: &ModelGraph, id: NodeId) -> bool {
    graph.is_literal(id) || graph.kind(id) == NodeKind::OntologyTerm
}

/// Extract the connected subgraph around `seed`, walking edges in both
/// directions. Traversal stops at ontology terms and literals (they are
/// included, but not expanded) and never enters `exclude`; edges touching an
/// excluded node are dropped entirely.
///
/// The returned graph shares `graph`'s term table, so every node keeps its
/// [`NodeId`].
pub fn extract_subgraph(
    graph: &ModelGraph,
    seed: NodeId,
    exclude: &HashSet<NodeId>,
) -> ModelGraph {
    let sub = ModelGraph::with_terms(graph.terms());
    if exclude.contains(&seed) {
        return sub;
    }

    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(seed);
    queue.push_back(seed);
    sub.intern(graph.term(seed));

    while let Some(id) = queue.pop_front() {
        if is_terminal(graph, id) && id != seed {
            continue;
        }
        for triple in graph.triples_from(id) {
            if exclude.contains(&triple.object) {
                continue;
            }
            sub.add_triple(triple.subject, &triple.predicate, triple.object);
            if visited.insert(triple.object) {
                queue.push_back(triple.object);
            }
        }
        for triple in graph.triples_to(id) {
            if exclude.contains(&triple.subject) {
                continue;
            }
            sub.add_triple(triple.subject, &triple.predicate, triple.object);
            if visited.insert(triple.subject) {
                queue.push_back(triple.subject);
            }
        }
    }

    trace!(
        nodes = sub.node_count(),
        triples = sub.triple_count(),
        "extracted subgraph"
    );
    sub
}

/// Default recursion depth for [`describe_subtree`].
pub const DESCRIBE_DEPTH: usize = 3;

fn node_text(graph: &ModelGraph, id: NodeId) -> String {
    match graph.term(id) {
        Term::Iri(iri) => last_segment(&iri),
        Term::Literal(value) => value,
    }
}

/// One triple as a plain-text sentence, e.g.
/// `glucose_out is Version Of CHEBI:4167`.
pub fn triple_sentence(graph: &ModelGraph, triple: &Triple) -> String {
    format!(
        "{} {} {}",
        node_text(graph, triple.subject),
        segment_to_text(&triple.predicate),
        node_text(graph, triple.object)
    )
}

/// Describe the subtree below `node` as one plain-text line per triple, e.g.
/// `glucose_out is version of CHEBI:4167`. Follows outgoing edges only,
/// depth-first up to `max_depth`, and never expands past an ontology term.
pub fn describe_subtree(graph: &ModelGraph, node: NodeId, max_depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut visited = HashSet::new();
    visited.insert(node);
    describe_into(graph, node, max_depth, &mut visited, &mut lines);
    lines
}

fn describe_into(
    graph: &ModelGraph,
    node: NodeId,
    depth: usize,
    visited: &mut HashSet<NodeId>,
    lines: &mut Vec<String>,
) {
    if depth == 0 {
        return;
    }
    for triple in graph.triples_from(node) {
        lines.push(triple_sentence(graph, &triple));
        if !is_terminal(graph, triple.object) && visited.insert(triple.object) {
            describe_into(graph, triple.object, depth - 1, visited, lines);
        }
    }
}
