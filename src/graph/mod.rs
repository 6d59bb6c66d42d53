//! In-memory annotation graph.
//!
//! Triples are stored in a petgraph [`DiGraph`] whose node weights are
//! interned [`NodeId`]s; a side index maps ids back to petgraph indices for
//! O(1) lookup. Terms live in a [`TermTable`] that can be shared between a
//! graph and its extracted subgraphs, so a node keeps the same id in both.

pub mod traverse;
pub mod turtle;

use std::num::NonZeroU32;
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::node::{self, NodeKind};

/// A graph term: either an IRI or a literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Literal(String),
}

impl Term {
    pub fn as_str(&self) -> &str {
        match self {
            Term::Iri(s) | Term::Literal(s) => s,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Iri(s) => write!(f, "<{s}>"),
            Term::Literal(s) => write!(f, "{s:?}"),
        }
    }
}

/// Interned term identifier, stable across a graph and its subgraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    fn from_index(index: usize) -> Self {
        // Index 0 maps to id 1; the table can never hold u32::MAX terms.
        NodeId(NonZeroU32::new(index as u32 + 1).expect("non-zero"))
    }

    fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

/// Shared term interner. Ids are dense and never reused.
#[derive(Debug, Default)]
pub struct TermTable {
    ids: DashMap<Term, NodeId>,
    terms: RwLock<Vec<Term>>,
}

impl TermTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a term, returning its stable id.
    pub fn intern(&self, term: Term) -> NodeId {
        if let Some(id) = self.ids.get(&term) {
            return *id;
        }
        let mut terms = self.terms.write().expect("term table lock");
        // Re-check under the write lock; another thread may have won.
        if let Some(id) = self.ids.get(&term) {
            return *id;
        }
        let id = NodeId::from_index(terms.len());
        terms.push(term.clone());
        self.ids.insert(term, id);
        id
    }

    /// The term behind an id. Ids are only minted by `intern`, so this
    /// cannot miss for ids from the same table.
    pub fn term(&self, id: NodeId) -> Term {
        self.terms.read().expect("term table lock")[id.index()].clone()
    }

    pub fn lookup(&self, term: &Term) -> Option<NodeId> {
        self.ids.get(term).map(|id| *id)
    }
}

/// A single directed edge's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeData {
    pub predicate: String,
}

/// One triple, with interned subject and object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: NodeId,
    pub predicate: String,
    pub object: NodeId,
}

/// A directed multigraph of annotation triples.
pub struct ModelGraph {
    table: Arc<TermTable>,
    graph: RwLock<DiGraph<NodeId, EdgeData>>,
    node_index: DashMap<NodeId, NodeIndex>,
}

impl Default for ModelGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelGraph {
    pub fn new() -> Self {
        Self::with_terms(Arc::new(TermTable::new()))
    }

    /// A graph sharing an existing term table. Subgraph extraction uses this
    /// so node ids carry over from the parent graph.
    pub fn with_terms(table: Arc<TermTable>) -> Self {
        Self {
            table,
            graph: RwLock::new(DiGraph::new()),
            node_index: DashMap::new(),
        }
    }

    pub fn terms(&self) -> Arc<TermTable> {
        Arc::clone(&self.table)
    }

    /// Intern a term and materialize its node in this graph.
    pub fn intern(&self, term: Term) -> NodeId {
        let id = self.table.intern(term);
        self.ensure_node(id);
        id
    }

    fn ensure_node(&self, id: NodeId) -> NodeIndex {
        if let Some(ix) = self.node_index.get(&id) {
            return *ix;
        }
        let mut graph = self.graph.write().expect("graph lock");
        if let Some(ix) = self.node_index.get(&id) {
            return *ix;
        }
        let ix = graph.add_node(id);
        self.node_index.insert(id, ix);
        ix
    }

    /// The term behind a node id.
    pub fn term(&self, id: NodeId) -> Term {
        self.table.term(id)
    }

    /// IRI string for a node, or `None` for literals.
    pub fn iri(&self, id: NodeId) -> Option<String> {
        match self.table.term(id) {
            Term::Iri(s) => Some(s),
            Term::Literal(_) => None,
        }
    }

    pub fn is_literal(&self, id: NodeId) -> bool {
        self.table.term(id).is_literal()
    }

    /// Shape-based kind of a node. Literals are opaque.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        match self.table.term(id) {
            Term::Iri(iri) => node::classify(&iri),
            Term::Literal(_) => NodeKind::Opaque,
        }
    }

    /// Add a triple between already-interned nodes. Duplicate triples are
    /// ignored; the graph behaves as a set.
    pub fn add_triple(&self, subject: NodeId, predicate: &str, object: NodeId) {
        let s = self.ensure_node(subject);
        let o = self.ensure_node(object);
        let mut graph = self.graph.write().expect("graph lock");
        let exists = graph
            .edges_connecting(s, o)
            .any(|e| e.weight().predicate == predicate);
        if !exists {
            graph.add_edge(
                s,
                o,
                EdgeData {
                    predicate: predicate.to_string(),
                },
            );
        }
    }

    /// Intern both terms and add the triple.
    pub fn add(&self, subject: Term, predicate: &str, object: Term) -> (NodeId, NodeId) {
        let s = self.intern(subject);
        let o = self.intern(object);
        self.add_triple(s, predicate, o);
        (s, o)
    }

    fn edges(&self, id: NodeId, direction: Direction) -> Vec<Triple> {
        use petgraph::visit::EdgeRef;

        let Some(ix) = self.node_index.get(&id).map(|ix| *ix) else {
            return Vec::new();
        };
        let graph = self.graph.read().expect("graph lock");
        let mut out: Vec<Triple> = graph
            .edges_directed(ix, direction)
            .map(|e| Triple {
                subject: graph[e.source()],
                predicate: e.weight().predicate.clone(),
                object: graph[e.target()],
            })
            .collect();
        out.sort_by(|a, b| {
            (a.subject, &a.predicate, a.object).cmp(&(b.subject, &b.predicate, b.object))
        });
        out
    }

    /// Triples with this node as subject, in deterministic order.
    pub fn triples_from(&self, id: NodeId) -> Vec<Triple> {
        self.edges(id, Direction::Outgoing)
    }

    /// Triples with this node as object, in deterministic order.
    pub fn triples_to(&self, id: NodeId) -> Vec<Triple> {
        self.edges(id, Direction::Incoming)
    }

    /// Every triple in the graph, in deterministic order.
    pub fn all_triples(&self) -> Vec<Triple> {
        use petgraph::visit::EdgeRef;

        let graph = self.graph.read().expect("graph lock");
        let mut out: Vec<Triple> = graph
            .edge_references()
            .map(|e| Triple {
                subject: graph[e.source()],
                predicate: e.weight().predicate.clone(),
                object: graph[e.target()],
            })
            .collect();
        out.sort_by(|a, b| {
            (a.subject, &a.predicate, a.object).cmp(&(b.subject, &b.predicate, b.object))
        });
        out
    }

    /// Every node in the graph, sorted by id for deterministic iteration.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.node_index.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn triple_count(&self) -> usize {
        self.graph.read().expect("graph lock").edge_count()
    }
}

impl std::fmt::Debug for ModelGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelGraph")
            .field("nodes", &self.node_count())
            .field("triples", &self.triple_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Term {
        Term::Iri(s.to_string())
    }

    #[test]
    fn interning_is_idempotent() {
        let g = ModelGraph::new();
        let a = g.intern(iri("file:///m.ttl#a"));
        let b = g.intern(iri("file:///m.ttl#a"));
        assert_eq!(a, b);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn literal_and_iri_with_same_text_are_distinct() {
        let g = ModelGraph::new();
        let a = g.intern(iri("2"));
        let b = g.intern(Term::Literal("2".into()));
        assert_ne!(a, b);
        assert!(g.is_literal(b));
        assert!(!g.is_literal(a));
        assert_eq!(g.iri(b), None);
    }

    #[test]
    fn duplicate_triples_collapse() {
        let g = ModelGraph::new();
        g.add(iri("urn:s"), "urn:p", iri("urn:o"));
        g.add(iri("urn:s"), "urn:p", iri("urn:o"));
        assert_eq!(g.triple_count(), 1);

        // Same nodes, different predicate: a second edge.
        g.add(iri("urn:s"), "urn:q", iri("urn:o"));
        assert_eq!(g.triple_count(), 2);
    }

    #[test]
    fn triples_from_and_to_agree() {
        let g = ModelGraph::new();
        let (s, o) = g.add(iri("urn:s"), "urn:p", iri("urn:o"));
        let from = g.triples_from(s);
        let to = g.triples_to(o);
        assert_eq!(from, to);
        assert_eq!(from.len(), 1);
        assert_eq!(from[0].subject, s);
        assert_eq!(from[0].object, o);
        assert_eq!(from[0].predicate, "urn:p");
    }

    #[test]
    fn shared_table_preserves_ids_across_graphs() {
        let parent = ModelGraph::new();
        let id = parent.intern(iri("file:///m.ttl#glucose"));

        let child = ModelGraph::with_terms(parent.terms());
        let same = child.intern(iri("file:///m.ttl#glucose"));
        assert_eq!(id, same);
    }

    #[test]
    fn kind_delegates_to_classification() {
        use crate::node::NodeKind;

        let g = ModelGraph::new();
        let term = g.intern(iri("http://identifiers.org/CHEBI:4167"));
        let local = g.intern(iri("file:///m.ttl#glucose"));
        let lit = g.intern(Term::Literal("1".into()));
        assert_eq!(g.kind(term), NodeKind::OntologyTerm);
        assert_eq!(g.kind(local), NodeKind::LocalEntity);
        assert_eq!(g.kind(lit), NodeKind::Opaque);
    }

    #[test]
    fn all_triples_is_deterministic() {
        let build = || {
            let g = ModelGraph::new();
            g.add(iri("urn:b"), "urn:p", iri("urn:c"));
            g.add(iri("urn:a"), "urn:p", iri("urn:b"));
            g.add(iri("urn:a"), "urn:q", iri("urn:c"));
            g.all_triples()
                .into_iter()
                .map(|t| (g.iri(t.subject).unwrap(), t.predicate, g.iri(t.object).unwrap()))
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }
}
