//! Building annotation graphs from typed descriptions.
//!
//! The writer is the inverse of the interpreter: given declarative
//! descriptions of entities and processes, it emits exactly the triples the
//! strict pipeline recognizes (biomodels.net qualifier predicates,
//! identifiers.org term IRIs, `<base>.ttl#` local names and
//! `<base>.cellml#` variable names). Interpreting a written graph recovers
//! the supplied terms, parts, and properties.

use serde::{Deserialize, Serialize};

use crate::graph::{ModelGraph, Term};

/// The biomodels.net biology-qualifier predicate namespace.
pub const BQBIOL: &str = "http://biomodels.net/biology-qualifiers/";

/// Which namespace a participant identifier lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// A local annotation entity (`<base>.ttl#id`).
    Local,
    /// A composed/source model reference (`<base>.cellml#id`).
    Model,
}

/// An anatomical containment target: a prefixed ontology term
/// (`FMA:66836`) or another local entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartRef {
    Ontology(String),
    Local(String),
}

impl From<&str> for PartRef {
    /// Prefixed ids (`FMA:9670`) are ontology terms; bare ids are local.
    fn from(id: &str) -> Self {
        if id.contains(':') {
            PartRef::Ontology(id.to_string())
        } else {
            PartRef::Local(id.to_string())
        }
    }
}

/// A property attached to an entity or process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum PropertyAssertion {
    /// A model variable carrying an ontology-defined property.
    Paired { variable: String, term: String },
    /// A property term with no variable binding.
    Direct { term: String },
}

fn default_multiplier() -> f64 {
    1.0
}

/// One participant of a process description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParticipantRef {
    pub anchor: Anchor,
    pub id: String,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl ParticipantRef {
    pub fn local(id: &str) -> Self {
        ParticipantRef {
            anchor: Anchor::Local,
            id: id.to_string(),
            multiplier: 1.0,
        }
    }

    pub fn model(id: &str) -> Self {
        ParticipantRef {
            anchor: Anchor::Model,
            id: id.to_string(),
            multiplier: 1.0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }
}

/// Declarative description of a physical entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub part_of: Vec<PartRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub has_part: Vec<PartRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyAssertion>,
}

/// Declarative description of a physical process and its participants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<ParticipantRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sink: Vec<ParticipantRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mediator: Vec<ParticipantRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyAssertion>,
}

/// identifiers.org IRI for a prefixed term like `CHEBI:4167`.
///
/// Ontologies disagree about their identifiers.org shapes: CHEBI, FMA and GO
/// keep the `PREFIX:id` form in the final segment, while OPB and UniProt use
/// a path segment. Unprefixed ids pass through on the root namespace.
pub fn ontology_iri(term: &str) -> String {
    match term.split_once(':') {
        Some((prefix, id)) => match prefix.to_uppercase().as_str() {
            "CHEBI" | "FMA" | "GO" => format!("http://identifiers.org/{}:{id}", prefix.to_uppercase()),
            "OPB" => format!("http://identifiers.org/opb/OPB_{id}"),
            "UNIPROT" => format!("http://identifiers.org/uniprot/{id}"),
            _ => format!("http://identifiers.org/{prefix}:{id}"),
        },
        None => format!("http://identifiers.org/{term}"),
    }
}

/// Emits annotation triples into a [`ModelGraph`].
#[derive(Debug)]
pub struct AnnotationWriter {
    graph: ModelGraph,
    local_ns: String,
    model_ns: String,
}

impl AnnotationWriter {
    /// A writer for the model with the given base stem, e.g.
    /// `file:///models/SGLT1` yields local names under
    /// `file:///models/SGLT1.ttl#` and variables under
    /// `file:///models/SGLT1.cellml#`.
    pub fn new(base: &str) -> Self {
        AnnotationWriter {
            graph: ModelGraph::new(),
            local_ns: format!("{base}.ttl#"),
            model_ns: format!("{base}.cellml#"),
        }
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    pub fn into_graph(self) -> ModelGraph {
        self.graph
    }

    fn local(&self, id: &str) -> Term {
        Term::Iri(format!("{}{id}", self.local_ns))
    }

    fn model(&self, id: &str) -> Term {
        Term::Iri(format!("{}{id}", self.model_ns))
    }

    fn qualifier(name: &str) -> String {
        format!("{BQBIOL}{name}")
    }

    fn part_term(&self, part: &PartRef) -> Term {
        match part {
            PartRef::Ontology(term) => Term::Iri(ontology_iri(term)),
            PartRef::Local(id) => self.local(id),
        }
    }

    fn write_properties(&self, subject: &Term, properties: &[PropertyAssertion]) {
        for property in properties {
            match property {
                PropertyAssertion::Paired { variable, term } => {
                    let variable = self.model(variable);
                    self.graph.add(
                        variable.clone(),
                        &Self::qualifier("isPropertyOf"),
                        subject.clone(),
                    );
                    self.graph.add(
                        variable,
                        &Self::qualifier("isVersionOf"),
                        Term::Iri(ontology_iri(term)),
                    );
                }
                PropertyAssertion::Direct { term } => {
                    self.graph.add(
                        subject.clone(),
                        &Self::qualifier("hasProperty"),
                        Term::Iri(ontology_iri(term)),
                    );
                }
            }
        }
    }

    /// Write one entity's annotation triples.
    pub fn add_entity(&self, id: &str, description: &EntityDescription) {
        let subject = self.local(id);
        if let Some(term) = &description.term {
            self.graph.add(
                subject.clone(),
                &Self::qualifier("isVersionOf"),
                Term::Iri(ontology_iri(term)),
            );
        }
        for part in &description.part_of {
            self.graph.add(
                subject.clone(),
                &Self::qualifier("isPartOf"),
                self.part_term(part),
            );
        }
        for part in &description.has_part {
            self.graph.add(
                subject.clone(),
                &Self::qualifier("hasPart"),
                self.part_term(part),
            );
        }
        self.write_properties(&subject, &description.properties);
    }

    fn write_participants(
        &self,
        process_id: &str,
        subject: &Term,
        role: &str,
        qualifier: &str,
        participants: &[ParticipantRef],
        with_multiplier: bool,
    ) {
        for (i, participant) in participants.iter().enumerate() {
            let wrapper = self.local(&format!("{process_id}_{role}{i}"));
            self.graph.add(
                subject.clone(),
                &Self::qualifier(qualifier),
                wrapper.clone(),
            );
            let entity = match participant.anchor {
                Anchor::Local => self.local(&participant.id),
                Anchor::Model => self.model(&participant.id),
            };
            self.graph.add(
                wrapper.clone(),
                &Self::qualifier("hasPhysicalEntityReference"),
                entity,
            );
            if with_multiplier {
                self.graph.add(
                    wrapper,
                    &Self::qualifier("hasMultiplier"),
                    Term::Literal(format!("{}", participant.multiplier)),
                );
            }
        }
    }

    /// Write one process's annotation triples. Sources and sinks carry their
    /// multiplier; mediators are never stoichiometric.
    pub fn add_process(&self, id: &str, description: &ProcessDescription) {
        let subject = self.local(id);
        if let Some(term) = &description.term {
            self.graph.add(
                subject.clone(),
                &Self::qualifier("isVersionOf"),
                Term::Iri(ontology_iri(term)),
            );
        }
        self.write_participants(
            id,
            &subject,
            "source",
            "hasSourceParticipant",
            &description.source,
            true,
        );
        self.write_participants(
            id,
            &subject,
            "sink",
            "hasSinkParticipant",
            &description.sink,
            true,
        );
        self.write_participants(
            id,
            &subject,
            "mediator",
            "hasMediatorParticipant",
            &description.mediator,
            false,
        );
        self.write_properties(&subject, &description.properties);
    }
}
