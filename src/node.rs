//! Node classification by identifier shape.
//!
//! Annotation graphs carry no explicit type triples; what a node *is* must be
//! recovered from the syntax of its identifier. Classification looks only at
//! the last path segment and the fragment, so it is a pure function and cheap
//! enough to call at every traversal step.

use std::sync::LazyLock;

use regex::Regex;

/// Authority substring that marks an external ontology vocabulary.
const ONTOLOGY_AUTHORITY: &str = "identifiers.org";

/// Fragment marker for a source-model (CellML) variable reference.
const SOURCE_MODEL_EXT: &str = ".cellml#";

/// Fragment marker for a composed/integrated bond-graph description.
const COMPOSED_MODEL_EXT: &str = ".json#";

/// What kind of thing a graph node's identifier denotes.
///
/// The four annotation kinds are mutually exclusive; [`NodeKind::Opaque`]
/// covers identifiers with no fragment and no recognized authority (plain
/// IRIs, which the interpreter treats as terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// External vocabulary term (identifiers.org-style). Terminal for traversal.
    OntologyTerm,
    /// Variable inside a specific named source model file.
    ModelVariable,
    /// Reference into a composed/integrated model description.
    ComposedModelRef,
    /// Annotator-introduced intermediate entity, scoped to the annotation document.
    LocalEntity,
    /// Anything else; never expanded specially.
    Opaque,
}

impl NodeKind {
    /// Nodes scoped to the annotation document rather than an external
    /// vocabulary or a concrete model variable. Both local entities and
    /// composed-model references behave this way during interpretation.
    pub fn is_annotation_scoped(self) -> bool {
        matches!(self, NodeKind::LocalEntity | NodeKind::ComposedModelRef)
    }
}

/// Classify an identifier by shape alone. No lookups, no similarity calls.
pub fn classify(iri: &str) -> NodeKind {
    if iri.contains(ONTOLOGY_AUTHORITY) {
        return NodeKind::OntologyTerm;
    }
    let segment = last_segment(iri);
    if segment.contains(SOURCE_MODEL_EXT) || dotted_fragment(&segment) {
        return NodeKind::ModelVariable;
    }
    if segment.contains(COMPOSED_MODEL_EXT) {
        return NodeKind::ComposedModelRef;
    }
    if segment.contains('#') {
        return NodeKind::LocalEntity;
    }
    NodeKind::Opaque
}

/// A fragment like `main.Volume` marks a variable reference even without a
/// recognized model-file extension.
fn dotted_fragment(segment: &str) -> bool {
    match segment.split_once('#') {
        Some((_, fragment)) => fragment.contains('.'),
        None => false,
    }
}

/// Last path segment of an identifier, percent-decoded.
pub fn last_segment(iri: &str) -> String {
    let decoded = urlencoding::decode(iri)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| iri.to_string());
    decoded.rsplit('/').next().unwrap_or(&decoded).to_string()
}

/// Fragment identifier of a node (everything after the last `#`), falling
/// back to the last path segment when there is no fragment.
pub fn fragment_id(iri: &str) -> String {
    let segment = last_segment(iri);
    segment.rsplit('#').next().unwrap_or(&segment).to_string()
}

static CAMEL_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Turn an identifier's final segment into human-readable words.
///
/// Splits camelCase, replaces snake/kebab/colon separators with spaces, and
/// collapses whitespace: `hasSourceParticipant` becomes
/// `has Source Participant`.
pub fn segment_to_text(iri: &str) -> String {
    let fragment = fragment_id(iri);
    let spaced = CAMEL_BOUNDARY.replace_all(&fragment, "$1 $2");
    let separated = spaced.replace(['_', '-', ':'], " ");
    WHITESPACE_RUN.replace_all(&separated, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ontology_terms_by_authority() {
        assert_eq!(
            classify("http://identifiers.org/CHEBI:4167"),
            NodeKind::OntologyTerm
        );
        assert_eq!(
            classify("http://identifiers.org/opb:00425"),
            NodeKind::OntologyTerm
        );
    }

    #[test]
    fn model_variables_by_extension_or_dotted_fragment() {
        assert_eq!(
            classify("file:///models/SGLT1.cellml#b4dab3"),
            NodeKind::ModelVariable
        );
        assert_eq!(
            classify("file:///models/annExamples#main.Volume"),
            NodeKind::ModelVariable
        );
    }

    #[test]
    fn composed_model_references() {
        assert_eq!(
            classify("file:///models/compose_BG_refine.json#Glco"),
            NodeKind::ComposedModelRef
        );
    }

    #[test]
    fn local_entities_have_plain_fragments() {
        assert_eq!(
            classify("file:///models/SGLT1.ttl#glucose_out"),
            NodeKind::LocalEntity
        );
    }

    #[test]
    fn fragmentless_iris_are_opaque() {
        assert_eq!(classify("http://example.org/thing"), NodeKind::Opaque);
    }

    #[test]
    fn last_segment_decodes_percent_escapes() {
        assert_eq!(
            last_segment("http://example.org/a%20b/CHEBI%3A4167"),
            "CHEBI:4167"
        );
    }

    #[test]
    fn fragment_id_strips_prefix() {
        assert_eq!(fragment_id("file:///m/SGLT1.cellml#b4dab3"), "b4dab3");
        assert_eq!(
            fragment_id("http://identifiers.org/CHEBI:4167"),
            "CHEBI:4167"
        );
    }

    #[test]
    fn segment_to_text_splits_camel_and_snake() {
        assert_eq!(
            segment_to_text("http://biomodels.net/biology-qualifiers/hasSourceParticipant"),
            "has Source Participant"
        );
        assert_eq!(segment_to_text("local#is_part_of"), "is part of");
        assert_eq!(
            segment_to_text("x#hasPhysicalEntityReference"),
            "has Physical Entity Reference"
        );
    }
}
