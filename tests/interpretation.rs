//! End-to-end pipeline tests: Turtle in, records out, alignment across
//! models, and the writer/interpreter round trip.

use std::sync::Arc;

use oxigraph::io::RdfFormat;

use semlens::align::{DEFAULT_ALIGN_THRESHOLD, align};
use semlens::extract::{extract_model, extract_model_fuzzy};
use semlens::graph::{ModelGraph, turtle};
use semlens::oracle::TokenBundleOracle;
use semlens::record::ModelRecord;
use semlens::roles::RoleMatcher;
use semlens::writer::{
    AnnotationWriter, EntityDescription, ParticipantRef, PartRef, ProcessDescription,
    PropertyAssertion,
};

fn matcher() -> RoleMatcher {
    RoleMatcher::new(Arc::new(TokenBundleOracle::default()))
}

/// A glucose-transport annotation as an annotation tool would emit it.
const SGLT1_TTL: &str = r#"
@prefix bqbiol: <http://biomodels.net/biology-qualifiers/> .

<#transport>
    bqbiol:isVersionOf <http://identifiers.org/GO:0046323> ;
    bqbiol:hasSourceParticipant <#p1> ;
    bqbiol:hasSinkParticipant <#p2> .

<#p1>
    bqbiol:hasPhysicalEntityReference <#glucose_out> ;
    bqbiol:hasMultiplier "2" .

<#p2>
    bqbiol:hasPhysicalEntityReference <#glucose_in> .

<#glucose_out>
    bqbiol:isVersionOf <http://identifiers.org/CHEBI:4167> ;
    bqbiol:isPartOf <http://identifiers.org/FMA:66836> .

<#glucose_in>
    bqbiol:isVersionOf <http://identifiers.org/CHEBI:4167> .

<file:///models/SGLT1.cellml#q_Ao>
    bqbiol:isPropertyOf <#glucose_out> ;
    bqbiol:isVersionOf <http://identifiers.org/opb/OPB_00425> .
"#;

fn sglt1_record() -> ModelRecord {
    let graph = ModelGraph::new();
    turtle::load_str(&graph, SGLT1_TTL, RdfFormat::Turtle, "file:///models/SGLT1.ttl")
        .expect("valid turtle");
    extract_model(&graph, &matcher()).expect("well-formed annotation")
}

#[test]
fn turtle_to_record_end_to_end() {
    let record = sglt1_record();

    assert_eq!(record.model_base.as_deref(), Some("file:///models/SGLT1.cellml#"));
    let process = &record.physical_processes["SGLT1.ttl#transport"];
    assert_eq!(process.entity.term.as_deref(), Some("GO:0046323"));

    let source = &process.source["SGLT1.ttl#glucose_out"];
    assert_eq!(source.term.as_deref(), Some("CHEBI:4167"));
    assert_eq!(source.stoichiometry, Some(2.0));
    assert!(source.anatomical_parts.contains_key("FMA:66836"));
    assert_eq!(source.properties["q_Ao"].term.as_deref(), Some("OPB_00425"));
    assert_eq!(source.properties["q_Ao"].variable.as_deref(), Some("q_Ao"));

    let sink = &process.sink["SGLT1.ttl#glucose_in"];
    assert_eq!(sink.stoichiometry, Some(1.0));
    assert!(record.local_entities.is_empty());
}

#[test]
fn interpretation_is_deterministic_and_serialization_stable() {
    let a = sglt1_record();
    let b = sglt1_record();
    assert_eq!(a, b);

    let json_a = serde_json::to_string_pretty(&a).unwrap();
    let json_b = serde_json::to_string_pretty(&b).unwrap();
    assert_eq!(json_a, json_b);

    // The record survives a JSON round trip unchanged.
    let back: ModelRecord = serde_json::from_str(&json_a).unwrap();
    assert_eq!(a, back);
}

#[test]
fn fuzzy_pipeline_agrees_with_strict_on_clean_input() {
    let graph = ModelGraph::new();
    turtle::load_str(&graph, SGLT1_TTL, RdfFormat::Turtle, "file:///models/SGLT1.ttl").unwrap();
    let m = matcher();

    let strict = extract_model(&graph, &m).unwrap();
    let fuzzy = extract_model_fuzzy(&graph, &m).unwrap();

    let sp = &strict.physical_processes["SGLT1.ttl#transport"];
    let fp = &fuzzy.physical_processes["SGLT1.ttl#transport"];
    assert_eq!(fp.entity.term, sp.entity.term);

    let (ss, fs) = (
        &sp.source["SGLT1.ttl#glucose_out"],
        &fp.source["SGLT1.ttl#glucose_out"],
    );
    assert_eq!(fs.term, ss.term);
    assert_eq!(fs.stoichiometry, ss.stoichiometry);
    assert_eq!(fs.properties["q_Ao"].term, ss.properties["q_Ao"].term);
    assert_eq!(fs.anatomical_parts, ss.anatomical_parts);
}

#[test]
fn written_graph_interprets_back_losslessly() {
    let writer = AnnotationWriter::new("file:///models/NKE");
    writer.add_entity(
        "sodium_in",
        &EntityDescription {
            term: Some("CHEBI:29101".into()),
            part_of: vec![PartRef::from("FMA:66836")],
            properties: vec![PropertyAssertion::Paired {
                variable: "q_Na".into(),
                term: "OPB:00425".into(),
            }],
            ..Default::default()
        },
    );
    writer.add_entity(
        "sodium_out",
        &EntityDescription {
            term: Some("CHEBI:29101".into()),
            ..Default::default()
        },
    );
    writer.add_process(
        "pump",
        &ProcessDescription {
            term: Some("GO:0006814".into()),
            source: vec![ParticipantRef::local("sodium_in").with_multiplier(3.0)],
            sink: vec![ParticipantRef::local("sodium_out").with_multiplier(3.0)],
            mediator: vec![ParticipantRef::local("pump_protein")],
            ..Default::default()
        },
    );

    let record = extract_model(writer.graph(), &matcher()).unwrap();
    let process = &record.physical_processes["NKE.ttl#pump"];
    assert_eq!(process.entity.term.as_deref(), Some("GO:0006814"));

    let source = &process.source["NKE.ttl#sodium_in"];
    assert_eq!(source.term.as_deref(), Some("CHEBI:29101"));
    assert_eq!(source.stoichiometry, Some(3.0));
    assert!(source.anatomical_parts.contains_key("FMA:66836"));
    assert_eq!(source.properties["q_Na"].term.as_deref(), Some("OPB_00425"));

    assert_eq!(process.sink["NKE.ttl#sodium_out"].stoichiometry, Some(3.0));
    assert_eq!(
        process.mediator["NKE.ttl#pump_protein"].stoichiometry,
        Some(1.0)
    );
}

/// A composed model re-describing the SGLT1 transport with its own names.
fn composed_record() -> ModelRecord {
    let writer = AnnotationWriter::new("file:///models/compose_BG");
    writer.add_entity(
        "Glco",
        &EntityDescription {
            term: Some("CHEBI:4167".into()),
            properties: vec![PropertyAssertion::Paired {
                variable: "q_1".into(),
                term: "OPB:00425".into(),
            }],
            ..Default::default()
        },
    );
    writer.add_entity(
        "Glci",
        &EntityDescription {
            term: Some("CHEBI:4167".into()),
            ..Default::default()
        },
    );
    writer.add_entity(
        "carrier",
        &EntityDescription {
            term: Some("uniprot:P11168".into()),
            ..Default::default()
        },
    );
    writer.add_process(
        "transport",
        &ProcessDescription {
            term: Some("GO:0046323".into()),
            source: vec![ParticipantRef::local("Glco")],
            sink: vec![ParticipantRef::local("Glci")],
            mediator: vec![ParticipantRef::local("carrier")],
            ..Default::default()
        },
    );
    extract_model(writer.graph(), &matcher()).unwrap()
}

#[test]
fn composed_model_aligns_back_to_its_module() {
    let module = sglt1_record();
    let mut composed = composed_record();

    let oracle = TokenBundleOracle::default();
    let report = align(&mut composed, &[module], &oracle, DEFAULT_ALIGN_THRESHOLD);
    assert!(report.missing.is_empty(), "missing: {:?}", report.missing);
    assert_eq!(report.anchored.len(), 1);

    let process = &composed.physical_processes["compose_BG.ttl#transport"];
    assert_eq!(
        process.entity.aligned_to.as_deref(),
        Some("file:///models/SGLT1.cellml#SGLT1.ttl#transport")
    );
    assert_eq!(
        process.source["compose_BG.ttl#Glco"].aligned_to.as_deref(),
        Some("SGLT1.ttl#glucose_out")
    );
    assert_eq!(
        process.sink["compose_BG.ttl#Glci"].aligned_to.as_deref(),
        Some("SGLT1.ttl#glucose_in")
    );
    // The module has no mediator; the carrier stays unaligned but present.
    assert_eq!(
        process.mediator["compose_BG.ttl#carrier"].aligned_to,
        None
    );
    // The matched property recovers the module's variable binding.
    assert_eq!(
        process.source["compose_BG.ttl#Glco"].properties["q_1"]
            .variable
            .as_deref(),
        Some("q_Ao")
    );
}

#[test]
fn impossible_threshold_abandons_subtrees_whole() {
    let module = sglt1_record();
    let mut composed = composed_record();

    let oracle = TokenBundleOracle::default();
    let report = align(&mut composed, &[module], &oracle, 1.01);
    assert_eq!(report.anchored.len(), 0);
    assert_eq!(report.missing.len(), 1);

    let process = &composed.physical_processes["compose_BG.ttl#transport"];
    assert_eq!(process.entity.aligned_to, None);
    assert_eq!(process.source["compose_BG.ttl#Glco"].aligned_to, None);
}
