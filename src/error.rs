//! Diagnostic error types for the semlens interpreter.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text. The propagation policy is
//! deliberately narrow: interpretation errors are fatal for one node only,
//! alignment errors for one process subtree only, and "nothing found" is
//! never an error at all (see [`crate::interpret::Resolution`]).

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the semlens crate.
#[derive(Debug, Error, Diagnostic)]
pub enum SemError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Interpret(#[from] InterpretError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Align(#[from] AlignError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lookup(#[from] LookupError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("RDF parse error: {message}")]
    #[diagnostic(
        code(semlens::graph::parse),
        help(
            "The annotation graph could not be parsed. Check that the file is \
             valid Turtle (or RDF/XML with --format xml) and that relative \
             IRIs resolve against the supplied base IRI."
        )
    )]
    Parse { message: String },

    #[error("invalid IRI: {iri}")]
    #[diagnostic(
        code(semlens::graph::invalid_iri),
        help("The base IRI must be absolute, e.g. `file:///models/SGLT1.ttl`.")
    )]
    InvalidIri { iri: String },

    #[error("coefficient literal {literal:?} on {node} is not a number")]
    #[diagnostic(
        code(semlens::graph::bad_coefficient),
        help(
            "Stoichiometry coefficients must be numeric literals. \
             Fix the `hasMultiplier` / `hasCoefficient` triple in the source graph."
        )
    )]
    BadCoefficient { node: String, literal: String },

    #[error("I/O error reading {path}: {source}")]
    #[diagnostic(
        code(semlens::graph::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Interpretation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InterpretError {
    #[error("ambiguous annotation: more than one {what} resolves for {node}")]
    #[diagnostic(
        code(semlens::interpret::ambiguous),
        help(
            "A node may carry at most one ontology term and at most one \
             model-variable reference. The record for this node is dropped; \
             sibling records are unaffected. Fix the duplicate identity \
             triples in the annotation graph."
        )
    )]
    AmbiguousAnnotation { node: String, what: &'static str },
}

// ---------------------------------------------------------------------------
// Alignment errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AlignError {
    #[error("no module process matches composed process {process} above threshold {threshold}")]
    #[diagnostic(
        code(semlens::align::anchor_missing),
        help(
            "Alignment descends from a matched process anchor; without one the \
             process subtree is abandoned rather than guessed. Check that the \
             module records carry labels or terms comparable to the composed \
             record, or lower the alignment threshold."
        )
    )]
    AnchorMissing { process: String, threshold: f32 },
}

// ---------------------------------------------------------------------------
// Ontology lookup errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum LookupError {
    #[error("lookup transport error for {curie}: {message}")]
    #[diagnostic(
        code(semlens::lookup::transport),
        help(
            "The ontology catalog could not be reached. Labels are decoration \
             only; structural output is unaffected."
        )
    )]
    Transport { curie: String, message: String },

    #[error("lookup for {curie} failed with HTTP status {status}")]
    #[diagnostic(
        code(semlens::lookup::status),
        help("Check the API key and that the remote catalog is available.")
    )]
    Status { curie: String, status: u16 },

    #[error("no match in the remote catalog for {curie}")]
    #[diagnostic(
        code(semlens::lookup::no_match),
        help("The term id may be misspelled, or the catalog does not index this ontology.")
    )]
    NoMatch { curie: String },

    #[error("malformed lookup response for {curie}: {message}")]
    #[diagnostic(
        code(semlens::lookup::malformed),
        help("The remote catalog returned a payload this client does not understand.")
    )]
    Malformed { curie: String, message: String },
}

/// Convenience alias for functions returning semlens results.
pub type SemResult<T> = std::result::Result<T, SemError>;
