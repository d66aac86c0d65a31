// tests/document_io.rs
use adf_bridge::{
    AdfDocument, AdfError, AdfJointType, BodyRecord, JointRecord, LimitsRecord,
};
use std::fs;
use std::path::PathBuf;

fn sample_document() -> AdfDocument {
    let mut doc = AdfDocument::new();
    doc.namespace = Some("/ambf/env/".to_string());
    doc.high_resolution_path = "meshes/high_res/".to_string();
    doc.low_resolution_path = "meshes/low_res/".to_string();
    doc.ignore_inter_collision = true;

    doc.push_body(BodyRecord {
        name: "base".to_string(),
        mesh: "base.STL".to_string(),
        mass: 1.0,
        ..BodyRecord::default()
    });
    doc.push_body(BodyRecord {
        name: "link1".to_string(),
        mesh: "link1.STL".to_string(),
        mass: 0.5,
        ..BodyRecord::default()
    });
    doc.push_joint(JointRecord {
        name: "base-link1".to_string(),
        parent: "BODY base".to_string(),
        child: "BODY link1".to_string(),
        joint_type: AdfJointType::Revolute,
        joint_limits: Some(LimitsRecord {
            low: -1.0,
            high: 1.0,
        }),
        ..JointRecord::default()
    });
    doc
}

#[test]
fn yaml_keeps_the_document_key_order() {
    let yaml = sample_document().to_yaml().unwrap();

    let index = |needle: &str| {
        yaml.find(needle)
            .unwrap_or_else(|| panic!("{needle} missing from output"))
    };
    let bodies = index("bodies:");
    let joints = index("joints:");
    let high = index("high resolution path:");
    let low = index("low resolution path:");
    let inter = index("ignore inter-collision:");
    let base = index("BODY base");
    let link = index("BODY link1");
    let joint = index("JOINT base-link1");

    assert!(bodies < joints);
    assert!(joints < high);
    assert!(high < low);
    assert!(low < inter);
    // The listed names appear before their records, and records keep
    // insertion order.
    assert!(yaml.rfind("BODY base").unwrap() > base);
    assert!(yaml.rfind("BODY link1").unwrap() > link);
    assert!(yaml.rfind("BODY base").unwrap() < yaml.rfind("BODY link1").unwrap());
    assert!(yaml.rfind("JOINT base-link1").unwrap() >= joint);
}

#[test]
fn parse_recovers_the_serialized_document() {
    let doc = sample_document();
    let parsed = AdfDocument::from_yaml(&doc.to_yaml().unwrap()).unwrap();
    assert_eq!(parsed, doc);
}

#[test]
fn joint_type_aliases_parse() {
    let yaml = "\
bodies: [BODY a, BODY b]
joints: [JOINT j]
BODY a: {name: a, mesh: ''}
BODY b: {name: b, mesh: ''}
JOINT j: {name: j, parent: BODY a, child: BODY b, type: hinge}
";
    let doc = AdfDocument::from_yaml(yaml).unwrap();
    assert_eq!(doc.joint("JOINT j").unwrap().joint_type, AdfJointType::Revolute);
}

#[test]
fn missing_joints_list_is_an_error() {
    let result = AdfDocument::from_yaml("bodies: []\n");
    assert!(matches!(
        result,
        Err(AdfError::MissingSection { key: "joints" })
    ));
}

#[test]
fn listed_name_without_record_is_an_error() {
    let result = AdfDocument::from_yaml("bodies: [BODY base]\njoints: []\n");
    assert!(matches!(result, Err(AdfError::MissingRecord { key }) if key == "BODY base"));
}

#[test]
fn save_backs_up_an_existing_file() {
    let dir: PathBuf =
        std::env::temp_dir().join(format!("adf-bridge-save-test-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("robot.yaml");
    fs::write(&path, "previous contents\n").unwrap();

    let doc = sample_document();
    doc.save(&path).unwrap();

    let backup = dir.join("robot.yaml.old");
    assert_eq!(
        fs::read_to_string(&backup).unwrap(),
        "previous contents\n",
        "backup must hold the prior file unchanged"
    );

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("# ADF Version: 1.0\n"));
    assert!(written.contains("# Generated By: "));
    assert!(written.contains("# Generated on: "));

    let reloaded = AdfDocument::load(&path).unwrap();
    assert_eq!(reloaded, doc);

    let _ = fs::remove_dir_all(&dir);
}
