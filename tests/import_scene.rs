// tests/import_scene.rs
use adf_bridge::{
    AdfDocument, AdfJointType, BodyRecord, ColorComponentsRecord, ConstraintKind, ConstraintRep,
    ImportConfig, ImportSession, JointRecord, LimitsRecord, MemoryAssets, MeshAsset,
    NativeConstraintKind, PoseRecord, RepresentationMode, RgbRecord, XyzRecord,
};
use glam::{Quat, Vec3};
use std::path::Path;

fn cube() -> MeshAsset {
    let mut vertices = Vec::new();
    for x in [-0.5, 0.5] {
        for y in [-0.5, 0.5] {
            for z in [-0.5, 0.5] {
                vertices.push(Vec3::new(x, y, z));
            }
        }
    }
    MeshAsset::new(vertices)
}

fn body_record(name: &str, x: f32) -> BodyRecord {
    BodyRecord {
        name: name.to_string(),
        mesh: format!("{name}.STL"),
        mass: 1.0,
        location: PoseRecord {
            position: XyzRecord { x, y: 0.0, z: 0.0 },
            ..PoseRecord::default()
        },
        ..BodyRecord::default()
    }
}

fn revolute_record(pivot_x: f32) -> JointRecord {
    JointRecord {
        name: "parent-child".to_string(),
        parent: "BODY parent".to_string(),
        child: "BODY child".to_string(),
        joint_type: AdfJointType::Revolute,
        joint_limits: Some(LimitsRecord {
            low: -1.0,
            high: 1.0,
        }),
        parent_pivot: XyzRecord {
            x: pivot_x,
            y: 0.0,
            z: 0.0,
        },
        ..JointRecord::default()
    }
}

fn two_body_document(joint: JointRecord) -> AdfDocument {
    let mut doc = AdfDocument::new();
    doc.high_resolution_path = "meshes/high_res/".to_string();
    doc.low_resolution_path = "meshes/low_res/".to_string();
    doc.push_body(body_record("parent", 0.0));
    doc.push_body(body_record("child", 1.0));
    doc.push_joint(joint);
    doc
}

fn assets() -> MemoryAssets {
    let mut assets = MemoryAssets::new();
    assets.insert_mesh("/model/meshes/high_res/parent.STL", cube());
    assets.insert_mesh("/model/meshes/high_res/child.STL", cube());
    assets
}

fn legacy(adjust_joint_pivots: bool) -> ImportSession {
    ImportSession::new(ImportConfig {
        mode: RepresentationMode::Legacy {
            adjust_joint_pivots,
        },
        ignore_joint_offsets: false,
    })
}

fn assert_vec_close(a: Vec3, b: Vec3, context: &str) {
    assert!(
        (a - b).length() < 1e-4,
        "{context}: expected {b:?}, got {a:?}"
    );
}

#[test]
fn legacy_import_places_the_child_at_the_pivot() {
    let doc = two_body_document(revolute_record(1.0));
    let mut session = legacy(false);
    let scene = session
        .import(&doc, &mut assets(), Path::new("/model"))
        .unwrap();

    assert!(session.issues.is_empty());
    assert_eq!(scene.len(), 2);

    let parent = scene.find_by_name("/ambf/env/parent").unwrap();
    let child = scene.find_by_name("/ambf/env/child").unwrap();
    assert_eq!(scene.body(child).parent, Some(parent));
    assert_vec_close(scene.body(child).transform.0, Vec3::X, "child position");

    let constraint = scene.body(child).constraint.as_ref().unwrap();
    assert_eq!(constraint.kind, ConstraintKind::Hinge);
    assert_eq!(constraint.rep, ConstraintRep::Legacy);
    let limits = constraint.angular_limits[2].unwrap();
    assert_eq!((limits.low, limits.high), (-1.0, 1.0));
}

#[test]
fn stored_offset_rotates_the_child_about_the_parent_axis() {
    let mut joint = revolute_record(0.0);
    joint.offset = Some(0.5);
    let doc = two_body_document(joint);

    let mut session = legacy(false);
    let scene = session
        .import(&doc, &mut assets(), Path::new("/model"))
        .unwrap();
    let child = scene.find_by_name("/ambf/env/child").unwrap();
    let angle = scene
        .body(child)
        .transform
        .1
        .angle_between(Quat::from_rotation_z(0.5));
    assert!(angle < 1e-4, "child should be rotated by the offset, off by {angle}");

    // Angular limits absorb the offset under the legacy representation.
    let constraint = scene.body(child).constraint.as_ref().unwrap();
    let limits = constraint.angular_limits[2].unwrap();
    assert!((limits.low - -0.5).abs() < 1e-6);
    assert!((limits.high - 1.5).abs() < 1e-6);
}

#[test]
fn ignoring_offsets_leaves_the_child_unrotated() {
    let mut joint = revolute_record(0.0);
    joint.offset = Some(0.5);
    let doc = two_body_document(joint);

    let mut session = ImportSession::new(ImportConfig {
        mode: RepresentationMode::Legacy {
            adjust_joint_pivots: false,
        },
        ignore_joint_offsets: true,
    });
    let scene = session
        .import(&doc, &mut assets(), Path::new("/model"))
        .unwrap();
    let child = scene.find_by_name("/ambf/env/child").unwrap();
    let angle = scene.body(child).transform.1.angle_between(Quat::IDENTITY);
    assert!(angle < 1e-4);
}

#[test]
fn pivot_adjustment_rotates_mesh_data_onto_the_canonical_axis() {
    let mut joint = revolute_record(0.0);
    joint.parent_axis = XyzRecord { x: 0.0, y: 1.0, z: 0.0 };
    joint.child_axis = XyzRecord { x: 0.0, y: 1.0, z: 0.0 };
    let mut doc = two_body_document(joint);
    doc.body_mut("BODY child").unwrap().mesh = "marker.STL".to_string();

    let mut assets = assets();
    assets.insert_mesh(
        "/model/meshes/high_res/marker.STL",
        MeshAsset::new(vec![Vec3::Y]),
    );

    let mut session = legacy(true);
    let scene = session
        .import(&doc, &mut assets, Path::new("/model"))
        .unwrap();
    let child = scene.find_by_name("/ambf/env/child").unwrap();

    // The stored y joint axis becomes the canonical z axis in mesh space.
    let vertex = scene.body(child).mesh.as_ref().unwrap().vertices[0];
    assert_vec_close(vertex, Vec3::Z, "adjusted marker vertex");

    // In world space the canonical axis points back along the stored axis.
    let world_axis = scene.body(child).transform.1 * Vec3::Z;
    assert_vec_close(world_axis, Vec3::Y, "canonical axis in world");
}

#[test]
fn skewed_alignment_residual_is_still_applied() {
    // With the stored child axis on X and the parent axis on Y, the residual
    // left after the primary correction rotates about X, not about the
    // canonical Z. The pass warns but folds it in regardless, as a rotation
    // about the canonical axis.
    let mut joint = revolute_record(0.0);
    joint.parent_axis = XyzRecord { x: 0.0, y: 1.0, z: 0.0 };
    joint.child_axis = XyzRecord { x: 1.0, y: 0.0, z: 0.0 };
    let mut doc = two_body_document(joint);
    doc.body_mut("BODY child").unwrap().mesh = "marker.STL".to_string();

    let mut assets = assets();
    assets.insert_mesh(
        "/model/meshes/high_res/marker.STL",
        MeshAsset::new(vec![Vec3::Y]),
    );

    let mut session = legacy(true);
    let scene = session
        .import(&doc, &mut assets, Path::new("/model"))
        .unwrap();
    assert!(session.issues.is_empty());
    assert_eq!(scene.len(), 2);
    let child = scene.find_by_name("/ambf/env/child").unwrap();

    // Primary correction leaves the Y marker in place; the quarter-turn
    // residual about Z carries it onto -X.
    let vertex = scene.body(child).mesh.as_ref().unwrap().vertices[0];
    assert_vec_close(vertex, -Vec3::X, "marker vertex after residual");

    // The corrected canonical axis still lands on the stored parent axis.
    let world_axis = scene.body(child).transform.1 * Vec3::Z;
    assert_vec_close(world_axis, Vec3::Y, "canonical axis in world");
}

#[test]
fn collision_groups_outside_range_are_dropped() {
    let mut record = body_record("parent", 0.0);
    record.collision_groups = Some(vec![0, 5, 25]);
    let mut doc = AdfDocument::new();
    doc.high_resolution_path = "meshes/high_res/".to_string();
    doc.push_body(record);

    let mut session = legacy(false);
    let scene = session
        .import(&doc, &mut assets(), Path::new("/model"))
        .unwrap();
    let parent = scene.find_by_name("/ambf/env/parent").unwrap();
    let rigid_body = scene.body(parent).rigid_body.as_ref().unwrap();
    assert_eq!(rigid_body.collision_groups, vec![0, 5]);
}

#[test]
fn world_bodies_are_deduplicated() {
    let mut doc = AdfDocument::new();
    doc.push_body(BodyRecord {
        name: "world".to_string(),
        ..BodyRecord::default()
    });
    doc.push_body(BodyRecord {
        name: "World".to_string(),
        ..BodyRecord::default()
    });

    let mut session = legacy(false);
    let scene = session
        .import(&doc, &mut MemoryAssets::new(), Path::new("/model"))
        .unwrap();
    assert_eq!(scene.len(), 1, "a second world body must map onto the first");
}

#[test]
fn detached_joint_creates_a_named_placeholder() {
    let mut joint = revolute_record(0.5);
    joint.detached = Some(true);
    let doc = two_body_document(joint);

    let mut session = legacy(false);
    let scene = session
        .import(&doc, &mut assets(), Path::new("/model"))
        .unwrap();
    assert_eq!(scene.len(), 3);

    let handle = scene.find_by_name("detached joint parent-child").unwrap();
    assert!(scene.body(handle).detached_placeholder);
    assert!(scene.body(handle).constraint.is_some());

    let child = scene.find_by_name("/ambf/env/child").unwrap();
    assert!(scene.body(child).constraint.is_none());
    // The placeholder, not the child, sits at the joint pose.
    assert_vec_close(
        scene.body(handle).transform.0,
        Vec3::new(0.5, 0.0, 0.0),
        "handle position",
    );
}

#[test]
fn native_mode_inserts_an_explicit_joint_handle() {
    let doc = two_body_document(revolute_record(1.0));
    let mut session = ImportSession::new(ImportConfig {
        mode: RepresentationMode::Native,
        ignore_joint_offsets: false,
    });
    let scene = session
        .import(&doc, &mut assets(), Path::new("/model"))
        .unwrap();
    assert_eq!(scene.len(), 3);

    let parent = scene.find_by_name("/ambf/env/parent").unwrap();
    let child = scene.find_by_name("/ambf/env/child").unwrap();
    let handle = scene.find_by_name("parent-child").unwrap();
    assert_eq!(scene.body(handle).parent, Some(parent));
    assert_eq!(scene.body(child).parent, Some(handle));
    assert_vec_close(scene.body(handle).transform.0, Vec3::X, "handle position");
    assert_vec_close(scene.body(child).transform.0, Vec3::X, "child position");

    let constraint = scene.body(handle).constraint.as_ref().unwrap();
    assert!(matches!(
        constraint.rep,
        ConstraintRep::Native {
            kind: NativeConstraintKind::Revolute,
            axis_index: 2,
            limits: Some(_),
            ..
        }
    ));
}

#[test]
fn component_colors_become_a_material() {
    let mut record = body_record("parent", 0.0);
    record.color = None;
    record.color_components = Some(ColorComponentsRecord {
        diffuse: RgbRecord { r: 0.8, g: 0.2, b: 0.1 },
        specular: RgbRecord { r: 1.0, g: 1.0, b: 1.0 },
        ambient: adf_bridge::AmbientRecord { level: 0.7 },
        transparency: 0.9,
    });
    let mut doc = AdfDocument::new();
    doc.high_resolution_path = "meshes/high_res/".to_string();
    doc.push_body(record);

    let mut session = legacy(false);
    let scene = session
        .import(&doc, &mut assets(), Path::new("/model"))
        .unwrap();
    let parent = scene.find_by_name("/ambf/env/parent").unwrap();
    let material = scene.body(parent).material.unwrap();
    assert_vec_close(material.diffuse, Vec3::new(0.8, 0.2, 0.1), "diffuse");
    assert_eq!(material.ambient_level, 0.7);
    assert_eq!(material.alpha, 0.9);
}

#[test]
fn unresolvable_mesh_is_a_per_body_issue() {
    let mut doc = AdfDocument::new();
    doc.high_resolution_path = "meshes/high_res/".to_string();
    doc.push_body(body_record("ghost", 0.0));

    let mut session = legacy(false);
    let scene = session
        .import(&doc, &mut MemoryAssets::new(), Path::new("/model"))
        .unwrap();
    assert!(scene.is_empty());
    assert_eq!(session.issues.len(), 1);
}
