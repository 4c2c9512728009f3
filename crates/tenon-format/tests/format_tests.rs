use tenon_engine::{Chamfer, Cuboid, Feature, Project, Subtract};
use tenon_format::{load_project, save_project, LoadError, ProjectMetadata, FORMAT_VERSION};
use tenon_types::InputTag;
use uuid::Uuid;

// ── Helper Functions ─────────────────────────────────────────────────────

/// Target box minus a corner box, chamfered on one surviving edge.
fn sample_project() -> (Project, Uuid, Uuid, Uuid, Uuid) {
    let mut project = Project::new();
    let target = project.add_feature(Box::new(Cuboid::new(10.0, 10.0, 10.0)));
    let tool = project.add_feature(Box::new(Cuboid::new(4.0, 4.0, 4.0)));
    let subtract = project.add_feature(Box::new(Subtract::new()));
    project.connect(target, subtract, InputTag::target());
    project.connect(tool, subtract, InputTag::tool(0));
    project.update_model();

    let edge = project
        .feature(target)
        .registry()
        .tags()
        .id_for_tag("EdgeXPZP")
        .expect("box edges are tagged");
    let pick = project.create_pick(target, edge);
    let chamfer = project.add_feature(Box::new(Chamfer::new(vec![pick], 1.0)));
    project.connect(target, chamfer, InputTag::target());
    project.update_model();

    (project, target, tool, subtract, chamfer)
}

// ── Round Trip ───────────────────────────────────────────────────────────

#[test]
fn save_load_round_trip_preserves_structure_and_identity() {
    let (project, target, tool, subtract, chamfer) = sample_project();
    let metadata = ProjectMetadata::new("bracket");
    let json = save_project(&project, &metadata);

    let (loaded, loaded_metadata) = load_project(&json).expect("well-formed file");
    assert_eq!(loaded_metadata.name, "bracket");
    assert_eq!(loaded.len(), 4);
    for id in [target, tool, subtract, chamfer] {
        assert!(loaded.has_feature(id), "feature {id} survived the trip");
    }
    assert_eq!(
        loaded.parent_map(subtract).get(&InputTag::tool(0)),
        Some(&vec![tool])
    );

    // Identity tables came back: the tagged face id is byte-identical.
    let face_before = project
        .feature(target)
        .registry()
        .tags()
        .id_for_tag("FaceXP")
        .expect("tagged");
    assert_eq!(
        loaded
            .feature(target)
            .registry()
            .tags()
            .id_for_tag("FaceXP"),
        Some(face_before)
    );
    assert!(loaded.feature(target).registry().has_id(face_before));
    assert!(
        !loaded.feature(chamfer).core().is_failed(),
        "picks resolve during load: {:?}",
        loaded.feature(chamfer).core().last_error()
    );

    // A post-load edit still flows: identity is live, not frozen.
    let mut loaded = loaded;
    loaded
        .feature_as_mut::<Cuboid>(target)
        .expect("cuboid node")
        .set_length(20.0);
    let pass = loaded.update_model();
    assert!(pass.failed.is_empty());
    assert!(loaded.feature(target).registry().has_id(face_before));
}

// ── Validation ───────────────────────────────────────────────────────────

#[test]
fn wrong_format_identifier_is_rejected() {
    let (project, ..) = sample_project();
    let json = save_project(&project, &ProjectMetadata::new("x"));
    let tampered = json.replacen("\"tenon\"", "\"waffle\"", 1);
    assert!(matches!(
        load_project(&tampered),
        Err(LoadError::UnknownFormat(_))
    ));
}

#[test]
fn future_version_is_rejected() {
    let (project, ..) = sample_project();
    let json = save_project(&project, &ProjectMetadata::new("x"));
    let tampered = json.replacen(
        &format!("\"version\": {FORMAT_VERSION}"),
        &format!("\"version\": {}", FORMAT_VERSION + 1),
        1,
    );
    match load_project(&tampered) {
        Err(LoadError::FutureVersion {
            file_version,
            supported_version,
        }) => {
            assert_eq!(file_version, FORMAT_VERSION + 1);
            assert_eq!(supported_version, FORMAT_VERSION);
        }
        other => panic!("expected FutureVersion, got {other:?}"),
    }
}

#[test]
fn garbage_input_is_a_parse_error() {
    assert!(matches!(
        load_project("{ not json"),
        Err(LoadError::ParseError(_))
    ));
}

#[test]
fn connection_to_unknown_feature_is_rejected() {
    let (parent, child) = (Uuid::new_v4(), Uuid::new_v4());
    let json = format!(
        r#"{{"format":"tenon","version":1,
            "metadata":{{"name":"x","created":"2026-01-01T00:00:00Z","modified":"2026-01-01T00:00:00Z"}},
            "features":[],
            "connections":[{{"parent":"{parent}","child":"{child}","tag":"target"}}]}}"#
    );
    assert!(matches!(
        load_project(&json),
        Err(LoadError::UnknownFeature { .. })
    ));
}
