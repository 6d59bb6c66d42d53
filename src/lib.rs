//! # semlens
//!
//! Semantic-lens interpreter for biosimulation annotation graphs: turns the
//! RDF annotations attached to CellML-derived bond-graph models into
//! structured records of physical entities, processes, participants,
//! properties, and anatomical context, and aligns equivalent structures
//! across independently annotated models.
//!
//! ## Architecture
//!
//! - **Graph index** (`graph`): petgraph + dashmap dual-indexed triple store
//!   with oxigraph RDF ingestion and bounded traversal
//! - **Role matching** (`roles`): open-world predicates mapped onto closed
//!   role vocabularies through an injected similarity oracle
//! - **Interpretation** (`interpret`): strict structural resolution, plus a
//!   fuzzy subgraph-guessing fallback
//! - **Extraction** (`extract`): whole-model records of processes,
//!   participants, and free-standing entities
//! - **Alignment** (`align`): hierarchical composed-model-to-module matching
//! - **Writer / lookup** (`writer`, `lookup`): annotation emission and
//!   ontology label decoration
//!
//! ## Library usage
//!
//! ```
//! use std::sync::Arc;
//! use semlens::extract::extract_model;
//! use semlens::oracle::TokenBundleOracle;
//! use semlens::roles::RoleMatcher;
//! use semlens::writer::{AnnotationWriter, EntityDescription};
//!
//! let writer = AnnotationWriter::new("file:///models/SGLT1");
//! writer.add_entity("glucose_out", &EntityDescription {
//!     term: Some("CHEBI:4167".into()),
//!     ..Default::default()
//! });
//!
//! let matcher = RoleMatcher::new(Arc::new(TokenBundleOracle::default()));
//! let record = extract_model(writer.graph(), &matcher).unwrap();
//! assert!(record.local_entities.contains_key("SGLT1.ttl#glucose_out"));
//! ```

pub mod align;
pub mod error;
pub mod extract;
pub mod graph;
pub mod interpret;
pub mod lookup;
pub mod node;
pub mod oracle;
pub mod record;
pub mod roles;
pub mod writer;
