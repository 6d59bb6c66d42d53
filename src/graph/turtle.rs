//! Loading annotation graphs from RDF files.
//!
//! Turtle is the primary interchange format; RDF/XML is accepted for older
//! annotation exports. Parsing streams quads straight into a [`ModelGraph`],
//! with relative IRIs resolved against a base IRI (by default, the file's
//! own `file://` URL, which is what annotation tools emit fragments against).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser};
use tracing::debug;

use crate::error::GraphError;
use crate::graph::{ModelGraph, Term};

/// Base IRI for a model file: its absolute path as a `file://` URL.
pub fn default_base_iri(path: &Path) -> String {
    let absolute = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}

fn subject_term(subject: oxigraph::model::NamedOrBlankNode) -> Term {
    use oxigraph::model::NamedOrBlankNode;
    match subject {
        NamedOrBlankNode::NamedNode(n) => Term::Iri(n.into_string()),
        NamedOrBlankNode::BlankNode(b) => Term::Iri(format!("_:{}", b.as_str())),
    }
}

fn object_term(object: oxigraph::model::Term) -> Term {
    use oxigraph::model::Term as OxTerm;
    match object {
        OxTerm::NamedNode(n) => Term::Iri(n.into_string()),
        OxTerm::BlankNode(b) => Term::Iri(format!("_:{}", b.as_str())),
        OxTerm::Literal(l) => Term::Literal(l.value().to_string()),
    }
}

/// Parse RDF from a reader into `graph`. Returns the number of triples added.
pub fn load_reader<R: Read>(
    graph: &ModelGraph,
    reader: R,
    format: RdfFormat,
    base_iri: &str,
) -> Result<usize, GraphError> {
    let parser = RdfParser::from_format(format)
        .with_base_iri(base_iri)
        .map_err(|_| GraphError::InvalidIri {
            iri: base_iri.to_string(),
        })?;

    let before = graph.triple_count();
    for quad in parser.for_reader(reader) {
        let quad = quad.map_err(|e| GraphError::Parse {
            message: e.to_string(),
        })?;
        graph.add(
            subject_term(quad.subject),
            quad.predicate.as_str(),
            object_term(quad.object),
        );
    }
    let added = graph.triple_count() - before;
    debug!(triples = added, base = base_iri, "loaded RDF");
    Ok(added)
}

/// Parse an RDF string (Turtle unless told otherwise) into `graph`.
pub fn load_str(
    graph: &ModelGraph,
    data: &str,
    format: RdfFormat,
    base_iri: &str,
) -> Result<usize, GraphError> {
    load_reader(graph, data.as_bytes(), format, base_iri)
}

/// Load an RDF file into `graph`, resolving fragments against `base_iri`
/// (or the file's own URL when `None`).
pub fn load_file(
    graph: &ModelGraph,
    path: &Path,
    format: RdfFormat,
    base_iri: Option<&str>,
) -> Result<usize, GraphError> {
    let file = File::open(path).map_err(|source| GraphError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let base = base_iri
        .map(str::to_string)
        .unwrap_or_else(|| default_base_iri(path));
    load_reader(graph, BufReader::new(file), format, &base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ModelGraph;
    use crate::node::NodeKind;

    const TTL: &str = r#"
        @prefix bqbiol: <http://biomodels.net/biology-qualifiers/> .

        <#glucose_out>
            bqbiol:isVersionOf <http://identifiers.org/CHEBI:4167> ;
            bqbiol:isPartOf <http://identifiers.org/FMA:66836> .
    "#;

    #[test]
    fn turtle_fragments_resolve_against_base() {
        let g = ModelGraph::new();
        let added = load_str(&g, TTL, RdfFormat::Turtle, "file:///models/SGLT1.ttl").unwrap();
        assert_eq!(added, 2);

        let local = g
            .terms()
            .lookup(&Term::Iri("file:///models/SGLT1.ttl#glucose_out".into()))
            .expect("fragment resolved against base");
        assert_eq!(g.kind(local), NodeKind::LocalEntity);
        assert_eq!(g.triples_from(local).len(), 2);
    }

    #[test]
    fn literals_come_through_as_literal_terms() {
        let ttl = r#"<#p> <http://biomodels.net/biology-qualifiers/hasMultiplier> "2" ."#;
        let g = ModelGraph::new();
        load_str(&g, ttl, RdfFormat::Turtle, "file:///m.ttl").unwrap();
        let lit = g
            .terms()
            .lookup(&Term::Literal("2".into()))
            .expect("literal interned");
        assert!(g.is_literal(lit));
    }

    #[test]
    fn malformed_turtle_is_a_parse_error() {
        let g = ModelGraph::new();
        let err = load_str(&g, "<#a> <#b ", RdfFormat::Turtle, "file:///m.ttl").unwrap_err();
        assert!(matches!(err, GraphError::Parse { .. }));
    }

    #[test]
    fn relative_base_is_rejected() {
        let g = ModelGraph::new();
        let err = load_str(&g, TTL, RdfFormat::Turtle, "not-absolute").unwrap_err();
        assert!(matches!(err, GraphError::InvalidIri { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let g = ModelGraph::new();
        let err = load_file(
            &g,
            Path::new("/nonexistent/model.ttl"),
            RdfFormat::Turtle,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, GraphError::Io { .. }));
    }

    #[test]
    fn load_file_round_trips_through_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.ttl");
        std::fs::write(&path, TTL).unwrap();

        let g = ModelGraph::new();
        let added = load_file(&g, &path, RdfFormat::Turtle, Some("file:///models/SGLT1.ttl"))
            .unwrap();
        assert_eq!(added, 2);
    }
}
