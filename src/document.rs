//! The ADF document: an ordered textual mapping describing a multi-body.
//!
//! Top-level keys are the `bodies`/`joints` name lists (in traversal order),
//! the mesh resource directories, the inter-collision flag and an optional
//! namespace, followed by one sub-mapping per listed body and joint. Record
//! keys carry the `BODY ` / `JOINT ` prefixes. Field names use the ADF
//! spelling verbatim (`parent pivot`, `collision shape`, ...).

use crate::error::AdfError;
use crate::shape::{CollisionGeometry, CollisionShapeKind};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Version of the description format written into the file header.
pub const ADF_VERSION: &str = "1.0";

/// A position or axis as an `x`/`y`/`z` mapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XyzRecord {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl XyzRecord {
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl From<Vec3> for XyzRecord {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// An orientation as roll/pitch/yaw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RpyRecord {
    pub r: f32,
    pub p: f32,
    pub y: f32,
}

/// A position + orientation pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseRecord {
    pub position: XyzRecord,
    pub orientation: RpyRecord,
}

/// Diagonal inertia.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InertiaRecord {
    pub ix: f32,
    pub iy: f32,
    pub iz: f32,
}

/// Static and rolling friction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionRecord {
    pub rolling: f32,
    #[serde(rename = "static")]
    pub static_: f32,
}

/// Linear and angular damping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DampingRecord {
    pub linear: f32,
    pub angular: f32,
}

/// PID gains.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GainsRecord {
    #[serde(rename = "P")]
    pub p: f32,
    #[serde(rename = "I")]
    pub i: f32,
    #[serde(rename = "D")]
    pub d: f32,
}

/// Linear and angular controller gains of a body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyControllerRecord {
    pub linear: GainsRecord,
    pub angular: GainsRecord,
}

/// An RGB triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RgbRecord {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Ambient intensity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AmbientRecord {
    pub level: f32,
}

/// Component-based color specification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorComponentsRecord {
    pub diffuse: RgbRecord,
    pub specular: RgbRecord,
    pub ambient: AmbientRecord,
    pub transparency: f32,
}

/// Explicit RGBA color specification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RgbaRecord {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Joint bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitsRecord {
    pub low: f32,
    pub high: f32,
}

/// Joint types of the description format.
///
/// Aliases cover spellings accepted by older documents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdfJointType {
    #[serde(rename = "revolute", alias = "hinge")]
    Revolute,
    #[serde(rename = "continuous")]
    Continuous,
    #[serde(rename = "prismatic", alias = "slider")]
    Prismatic,
    #[serde(rename = "linear spring", alias = "spring")]
    LinearSpring,
    #[serde(
        rename = "torsion spring",
        alias = "angular spring",
        alias = "torsional spring"
    )]
    TorsionSpring,
    #[serde(rename = "p2p", alias = "point2point")]
    P2P,
    #[default]
    #[serde(rename = "fixed", alias = "FIXED")]
    Fixed,
}

impl AdfJointType {
    /// Index of the canonical constraint axis for this type (2 = Z, 0 = X).
    pub fn canonical_axis_index(self) -> usize {
        match self {
            Self::Prismatic | Self::LinearSpring => 0,
            Self::Revolute
            | Self::Continuous
            | Self::TorsionSpring
            | Self::P2P
            | Self::Fixed => 2,
        }
    }

    /// Canonical constraint axis as a unit vector.
    pub fn canonical_axis(self) -> Vec3 {
        let mut axis = Vec3::ZERO;
        axis[self.canonical_axis_index()] = 1.0;
        axis
    }

    /// Whether this type rotates about its axis (as opposed to sliding).
    pub fn is_angular(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous | Self::TorsionSpring)
    }
}

fn default_scale() -> f32 {
    1.0
}

fn default_color() -> Option<String> {
    Some("random".to_string())
}

fn default_z_axis() -> XyzRecord {
    XyzRecord {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    }
}

/// One body's sub-mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyRecord {
    pub name: String,
    pub mesh: String,
    pub mass: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inertia: Option<InertiaRecord>,
    #[serde(rename = "collision margin", skip_serializing_if = "Option::is_none")]
    pub collision_margin: Option<f32>,
    #[serde(default = "default_scale")]
    pub scale: f32,
    pub location: PoseRecord,
    #[serde(rename = "inertial offset")]
    pub inertial_offset: PoseRecord,
    #[serde(rename = "publish joint names", skip_serializing_if = "Option::is_none")]
    pub publish_joint_names: Option<bool>,
    #[serde(
        rename = "publish joint positions",
        skip_serializing_if = "Option::is_none"
    )]
    pub publish_joint_positions: Option<bool>,
    /// Present when the body's namespace differs from the document namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Per-body override of the document's high resolution mesh directory.
    #[serde(
        rename = "high resolution path",
        skip_serializing_if = "Option::is_none"
    )]
    pub high_resolution_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friction: Option<FrictionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damping: Option<DampingRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restitution: Option<f32>,
    #[serde(rename = "collision groups", skip_serializing_if = "Option::is_none")]
    pub collision_groups: Option<Vec<i32>>,
    #[serde(rename = "collision shape", skip_serializing_if = "Option::is_none")]
    pub collision_shape: Option<CollisionShapeKind>,
    #[serde(rename = "collision geometry", skip_serializing_if = "Option::is_none")]
    pub collision_geometry: Option<CollisionGeometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<BodyControllerRecord>,
    /// Named color token; replaced by `color components` when a material exists.
    #[serde(skip_serializing_if = "Option::is_none", default = "default_color")]
    pub color: Option<String>,
    #[serde(rename = "color rgba", skip_serializing_if = "Option::is_none")]
    pub color_rgba: Option<RgbaRecord>,
    #[serde(rename = "color components", skip_serializing_if = "Option::is_none")]
    pub color_components: Option<ColorComponentsRecord>,
}

impl Default for BodyRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            mesh: String::new(),
            mass: 0.0,
            inertia: None,
            collision_margin: None,
            scale: default_scale(),
            location: PoseRecord::default(),
            inertial_offset: PoseRecord::default(),
            publish_joint_names: None,
            publish_joint_positions: None,
            namespace: None,
            high_resolution_path: None,
            friction: None,
            damping: None,
            restitution: None,
            collision_groups: None,
            collision_shape: None,
            collision_geometry: None,
            controller: None,
            color: default_color(),
            color_rgba: None,
            color_components: None,
        }
    }
}

/// One joint's sub-mapping.
///
/// Missing pivot/axis fields default conservatively: zero pivot, +Z axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointRecord {
    pub name: String,
    /// Record key of the parent body (`BODY <name>`).
    pub parent: String,
    /// Record key of the child body (`BODY <name>`).
    pub child: String,
    #[serde(rename = "parent axis", default = "default_z_axis")]
    pub parent_axis: XyzRecord,
    #[serde(rename = "parent pivot")]
    pub parent_pivot: XyzRecord,
    #[serde(rename = "child axis", default = "default_z_axis")]
    pub child_axis: XyzRecord,
    #[serde(rename = "child pivot")]
    pub child_pivot: XyzRecord,
    #[serde(rename = "type")]
    pub joint_type: AdfJointType,
    #[serde(rename = "joint limits", skip_serializing_if = "Option::is_none")]
    pub joint_limits: Option<LimitsRecord>,
    /// Residual rotation about the joint axis beyond what pivot+axis express.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damping: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<GainsRecord>,
    /// Marks a joint declared via a placeholder, expressing a closed loop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detached: Option<bool>,
    /// Legacy spelling of `detached`, honored on read only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redundant: Option<bool>,
}

impl Default for JointRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: String::new(),
            child: String::new(),
            parent_axis: default_z_axis(),
            parent_pivot: XyzRecord::default(),
            child_axis: default_z_axis(),
            child_pivot: XyzRecord::default(),
            joint_type: AdfJointType::Fixed,
            joint_limits: None,
            offset: None,
            damping: None,
            stiffness: None,
            controller: None,
            detached: None,
            redundant: None,
        }
    }
}

impl JointRecord {
    /// Whether this record declares a detached joint, under either spelling.
    pub fn is_detached(&self) -> bool {
        self.detached.unwrap_or(false) || self.redundant.unwrap_or(false)
    }
}

/// A complete ADF document with record insertion order preserved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdfDocument {
    pub namespace: Option<String>,
    pub high_resolution_path: String,
    pub low_resolution_path: String,
    pub ignore_inter_collision: bool,
    bodies: Vec<String>,
    joints: Vec<String>,
    body_records: Vec<(String, BodyRecord)>,
    joint_records: Vec<(String, JointRecord)>,
}

impl AdfDocument {
    /// Prefix of body record keys.
    pub const BODY_PREFIX: &'static str = "BODY ";
    /// Prefix of joint record keys.
    pub const JOINT_PREFIX: &'static str = "JOINT ";

    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a body record, returning its document key.
    pub fn push_body(&mut self, record: BodyRecord) -> String {
        let key = format!("{}{}", Self::BODY_PREFIX, record.name);
        self.bodies.push(key.clone());
        self.body_records.push((key.clone(), record));
        key
    }

    /// Appends a joint record, returning its document key.
    pub fn push_joint(&mut self, record: JointRecord) -> String {
        let key = format!("{}{}", Self::JOINT_PREFIX, record.name);
        self.joints.push(key.clone());
        self.joint_records.push((key.clone(), record));
        key
    }

    /// Listed body keys in document order.
    pub fn bodies(&self) -> &[String] {
        &self.bodies
    }

    /// Listed joint keys in document order.
    pub fn joints(&self) -> &[String] {
        &self.joints
    }

    pub fn body(&self, key: &str) -> Option<&BodyRecord> {
        self.body_records
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
    }

    pub fn body_mut(&mut self, key: &str) -> Option<&mut BodyRecord> {
        self.body_records
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
    }

    pub fn joint(&self, key: &str) -> Option<&JointRecord> {
        self.joint_records
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
    }

    pub fn joint_mut(&mut self, key: &str) -> Option<&mut JointRecord> {
        self.joint_records
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, r)| r)
    }

    /// Body records with their keys, in document order.
    pub fn body_records(&self) -> impl Iterator<Item = (&str, &BodyRecord)> {
        self.body_records.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Joint records with their keys, in document order.
    pub fn joint_records(&self) -> impl Iterator<Item = (&str, &JointRecord)> {
        self.joint_records.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Serializes to YAML with the document's insertion order.
    pub fn to_yaml(&self) -> Result<String, AdfError> {
        let mut root = Mapping::new();
        root.insert(
            Value::from("bodies"),
            Value::Sequence(self.bodies.iter().map(|b| Value::from(b.as_str())).collect()),
        );
        root.insert(
            Value::from("joints"),
            Value::Sequence(self.joints.iter().map(|j| Value::from(j.as_str())).collect()),
        );
        root.insert(
            Value::from("high resolution path"),
            Value::from(self.high_resolution_path.as_str()),
        );
        root.insert(
            Value::from("low resolution path"),
            Value::from(self.low_resolution_path.as_str()),
        );
        root.insert(
            Value::from("ignore inter-collision"),
            Value::from(self.ignore_inter_collision),
        );
        if let Some(namespace) = &self.namespace {
            root.insert(Value::from("namespace"), Value::from(namespace.as_str()));
        }
        for (key, record) in &self.body_records {
            root.insert(Value::from(key.as_str()), serde_yaml::to_value(record)?);
        }
        for (key, record) in &self.joint_records {
            root.insert(Value::from(key.as_str()), serde_yaml::to_value(record)?);
        }
        Ok(serde_yaml::to_string(&root)?)
    }

    /// Parses a document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, AdfError> {
        let root: Mapping = serde_yaml::from_str(text)?;

        let list = |key: &'static str| -> Result<Vec<String>, AdfError> {
            match root.get(Value::from(key)) {
                Some(value) => Ok(serde_yaml::from_value(value.clone())?),
                None => Err(AdfError::MissingSection { key }),
            }
        };
        let bodies = list("bodies")?;
        let joints = list("joints")?;

        let string_or_default = |key: &str| -> String {
            root.get(Value::from(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let mut document = Self {
            namespace: root
                .get(Value::from("namespace"))
                .and_then(Value::as_str)
                .map(str::to_string),
            high_resolution_path: string_or_default("high resolution path"),
            low_resolution_path: string_or_default("low resolution path"),
            ignore_inter_collision: root
                .get(Value::from("ignore inter-collision"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            ..Self::default()
        };

        for key in bodies {
            let value = root
                .get(Value::from(key.as_str()))
                .ok_or_else(|| AdfError::MissingRecord { key: key.clone() })?;
            let record: BodyRecord = serde_yaml::from_value(value.clone())?;
            document.bodies.push(key.clone());
            document.body_records.push((key, record));
        }
        for key in joints {
            let value = root
                .get(Value::from(key.as_str()))
                .ok_or_else(|| AdfError::MissingRecord { key: key.clone() })?;
            let record: JointRecord = serde_yaml::from_value(value.clone())?;
            document.joints.push(key.clone());
            document.joint_records.push((key, record));
        }

        Ok(document)
    }

    /// Writes the document to `path`, backing up any existing file first.
    ///
    /// A pre-existing file at `path` is renamed with a `.old` suffix, never
    /// merged or appended. The serialized mapping is prefixed with a
    /// four-line comment header identifying the format version, generator,
    /// source link and generation time.
    pub fn save(&self, path: &Path) -> Result<(), AdfError> {
        if path.is_file() {
            let mut backup = path.as_os_str().to_os_string();
            backup.push(".old");
            fs::rename(path, backup)?;
        }

        let header = format!(
            "# ADF Version: {}\n# Generated By: {} {}\n# Link: {}\n# Generated on: {}\n",
            ADF_VERSION,
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            env!("CARGO_PKG_REPOSITORY"),
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        );
        let body = self.to_yaml()?;
        fs::write(path, format!("{header}{body}"))?;
        Ok(())
    }

    /// Reads a document from a file.
    pub fn load(path: &Path) -> Result<Self, AdfError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}
