//! Structured output records.
//!
//! The interpreter's product is a [`ModelRecord`]: a nested, JSON-friendly
//! description of the physical processes and entities an annotation graph
//! talks about. All maps are `BTreeMap`s so that serializing the same record
//! twice yields byte-identical output, and interpreting the emitted record's
//! source again yields the same record (idempotent pipelines).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A physical property carried by an entity, usually bound to one model
/// variable (e.g. a chemical concentration bound to `q_Ao`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Ontology term id, e.g. `OPB:00425`; absent when only the variable is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    /// Human-readable label, filled in by ontology lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Source-model variable the property is computed by, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

/// An anatomical location an entity sits in, keyed by term id in the parent map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A physical entity: what it is, what properties it carries, and where it sits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Ontology term identifying the entity, e.g. `CHEBI:4167`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Properties keyed by variable fragment (or term id when unbound).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyRecord>,
    /// Anatomical containment, keyed by term id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub anatomical_parts: BTreeMap<String, PartRecord>,
    /// Stoichiometric coefficient; present only on process participants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stoichiometry: Option<f64>,
    /// Module-record key this entity was aligned to, filled in by alignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aligned_to: Option<String>,
}

impl EntityRecord {
    /// True when interpretation recovered nothing beyond the bare node.
    pub fn is_empty(&self) -> bool {
        self.term.is_none()
            && self.properties.is_empty()
            && self.anatomical_parts.is_empty()
    }
}

/// A physical process with its participants by role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    #[serde(flatten)]
    pub entity: EntityRecord,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub source: BTreeMap<String, EntityRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sink: BTreeMap<String, EntityRecord>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mediator: BTreeMap<String, EntityRecord>,
}

impl ProcessRecord {
    /// Participants of every role, in role order (source, sink, mediator).
    pub fn participants(&self) -> impl Iterator<Item = (&str, &EntityRecord)> {
        self.source
            .iter()
            .chain(self.sink.iter())
            .chain(self.mediator.iter())
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// The interpreted content of one annotation graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Common IRI head of the model's variables, trailing `#` included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_base: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub physical_processes: BTreeMap<String, ProcessRecord>,
    /// Annotated entities that take part in no process.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub local_entities: BTreeMap<String, EntityRecord>,
}

impl ModelRecord {
    pub fn is_empty(&self) -> bool {
        self.physical_processes.is_empty() && self.local_entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ModelRecord {
        let glucose = EntityRecord {
            term: Some("CHEBI:4167".into()),
            properties: BTreeMap::from([(
                "q_Ao".into(),
                PropertyRecord {
                    term: Some("OPB:00425".into()),
                    variable: Some("q_Ao".into()),
                    ..Default::default()
                },
            )]),
            anatomical_parts: BTreeMap::from([("FMA:66836".into(), PartRecord::default())]),
            stoichiometry: Some(1.0),
            ..Default::default()
        };
        let process = ProcessRecord {
            source: BTreeMap::from([("SGLT1.ttl#glucose_out".into(), glucose)]),
            ..Default::default()
        };
        ModelRecord {
            model_base: Some("file:///m/SGLT1.cellml#".into()),
            physical_processes: BTreeMap::from([("SGLT1.ttl#transport".into(), process)]),
            ..Default::default()
        }
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let record = sample();
        let json = serde_json::to_string_pretty(&record).unwrap();
        let back: ModelRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }

    #[test]
    fn serialization_is_byte_stable() {
        let a = serde_json::to_string(&sample()).unwrap();
        let b = serde_json::to_string(&sample()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_fields_are_omitted() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("mediator"));
        assert!(!json.contains("aligned_to"));
        assert!(!json.contains("local_entities"));
        assert!(!json.contains("label"));
    }

    #[test]
    fn process_entity_fields_are_flattened() {
        let record = ProcessRecord {
            entity: EntityRecord {
                term: Some("GO:0046323".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["term"], "GO:0046323");
        assert!(json.get("entity").is_none());
    }

    #[test]
    fn participants_iterates_roles_in_order() {
        let mut process = ProcessRecord::default();
        process.sink.insert("b".into(), EntityRecord::default());
        process.source.insert("a".into(), EntityRecord::default());
        process.mediator.insert("c".into(), EntityRecord::default());
        let keys: Vec<&str> = process.participants().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
