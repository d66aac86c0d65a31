// tests/roundtrip.rs
use adf_bridge::{
    Body, Constraint, ExportConfig, ExportSession, ImportConfig, ImportSession, LimitRange,
    MemoryAssets, MeshAsset, RepresentationMode, RigidBodyProps, SceneGraph,
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

fn rigid_cube(name: &str) -> Body {
    let mut body = Body::mesh_body(name, cube());
    body.rigid_body = Some(RigidBodyProps::default());
    body
}

// A two-body chain with a translated, rotated child, so that both the pivot
// and the offset angle are exercised.
fn chain() -> SceneGraph {
    let mut scene = SceneGraph::new();
    let parent = scene.add_body(rigid_cube("parent"));
    let mut child = rigid_cube("child");
    child.transform = (Vec3::X, Quat::from_rotation_z(0.5));
    let child = scene.add_body(child);
    scene.body_mut(child).constraint = Some(Constraint::hinge(
        parent,
        child,
        Some(LimitRange::new(-1.0, 1.0)),
    ));
    scene
}

#[test]
fn export_import_export_is_pose_idempotent() {
    let mut first = ExportSession::new(ExportConfig::default());
    let doc1 = first.export(&chain()).unwrap();
    assert!(first.issues.is_empty());

    let mut assets = MemoryAssets::new();
    assets.insert_mesh("/model/meshes/high_res/parent.STL", cube());
    assets.insert_mesh("/model/meshes/high_res/child.STL", cube());

    let mut importer = ImportSession::new(ImportConfig {
        mode: RepresentationMode::Legacy {
            adjust_joint_pivots: false,
        },
        ignore_joint_offsets: false,
    });
    let scene = importer
        .import(&doc1, &mut assets, Path::new("/model"))
        .unwrap();
    assert!(importer.issues.is_empty());

    let mut second = ExportSession::new(ExportConfig::default());
    let doc2 = second.export(&scene).unwrap();
    assert!(second.issues.is_empty());

    assert_eq!(doc1.bodies(), doc2.bodies());
    assert_eq!(doc1.joints(), doc2.joints());

    for key in doc1.bodies() {
        let before = doc1.body(key).unwrap();
        let after = doc2.body(key).unwrap();
        assert_eq!(before.location, after.location, "pose of {key} must survive");
        assert_eq!(before.mass, after.mass, "mass of {key} must survive");
    }
    for key in doc1.joints() {
        let before = doc1.joint(key).unwrap();
        let after = doc2.joint(key).unwrap();
        assert_eq!(before.joint_type, after.joint_type);
        assert_eq!(before.parent_pivot, after.parent_pivot);
        assert_eq!(before.parent_axis, after.parent_axis);
        assert_eq!(before.child_pivot, after.child_pivot);
        assert_eq!(before.child_axis, after.child_axis);
        assert_eq!(before.offset, after.offset, "offset of {key} must survive");
    }
}

#[test]
fn offset_angle_reconstructs_the_relative_rotation() {
    let scene = chain();
    let mut session = ExportSession::new(ExportConfig::default());
    let doc = session.export(&scene).unwrap();
    let joint = doc.joint("JOINT parent-child").unwrap();
    let offset = joint.offset.expect("rotated child must export an offset");

    let mut assets = MemoryAssets::new();
    assets.insert_mesh("/model/meshes/high_res/parent.STL", cube());
    assets.insert_mesh("/model/meshes/high_res/child.STL", cube());
    let mut importer = ImportSession::new(ImportConfig::default());
    let rebuilt = importer
        .import(&doc, &mut assets, Path::new("/model"))
        .unwrap();

    let parent = rebuilt.find_by_name("/ambf/env/parent").unwrap();
    let child = rebuilt.find_by_name("/ambf/env/child").unwrap();
    let relative =
        rebuilt.body(parent).transform.1.inverse() * rebuilt.body(child).transform.1;
    let angle = relative.angle_between(Quat::from_rotation_z(offset));
    assert!(angle < 1e-3, "relative rotation off by {angle}");
}
