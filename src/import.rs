//! ADF document → scene graph.
//!
//! Bodies are loaded in document order before any joint is created, so every
//! joint transform can read a fully placed parent. Under the legacy
//! representation the optional alignment-correction pass runs between the two
//! stages; it mutates child meshes and pivot/axis records, and the joint
//! placement math consumes the corrections it leaves behind.

use crate::assets::{AssetPartKind, MeshAsset, MeshAssets, MeshFormat};
use crate::document::{AdfDocument, AdfJointType, BodyRecord, JointRecord, XyzRecord};
use crate::error::AdfError;
use crate::math;
use crate::namespace;
use crate::scene::{
    Body, BodyController, BodyId, BodyKind, Constraint, ConstraintKind, ConstraintRep,
    JointController, LimitRange, Material, NativeConstraintKind, PhysicsRep, RigidBodyProps,
    SceneGraph, SpringParams, is_detached_name, is_world_name,
};
use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How loaded bodies and joints are represented in the scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepresentationMode {
    /// The child body doubles as the joint handle; detached joints get an
    /// explicit placeholder. Constraint state lives in the legacy
    /// degree-of-freedom arrays.
    Legacy {
        /// Rotate child meshes so every stored joint axis becomes the
        /// canonical constraint axis of its type.
        adjust_joint_pivots: bool,
    },
    /// Every joint gets an explicit handle placed at the joint frame, with
    /// the child re-parented under it.
    Native,
}

/// Options of an import session.
#[derive(Clone, Copy, Debug)]
pub struct ImportConfig {
    pub mode: RepresentationMode,
    /// Treat every stored offset angle as zero.
    pub ignore_joint_offsets: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            mode: RepresentationMode::Legacy {
                adjust_joint_pivots: false,
            },
            ignore_joint_offsets: false,
        }
    }
}

/// A per-item failure surfaced without aborting the document.
#[derive(Debug)]
pub struct ImportIssue {
    /// Key or name of the body or joint the issue belongs to.
    pub item: String,
    pub error: AdfError,
}

/// Import session context: namespace, record-to-body mapping, corrections.
#[derive(Debug, Default)]
pub struct ImportSession {
    pub config: ImportConfig,
    namespace: String,
    /// Body record key → scene body id.
    remapped: HashMap<String, BodyId>,
    /// Per-body alignment correction, identity unless the adjustment ran.
    corrections: HashMap<String, Mat4>,
    /// Per-item failures encountered during the last import.
    pub issues: Vec<ImportIssue>,
    /// Loaded body records by scene body id, for re-export reuse.
    pub loaded_bodies: HashMap<BodyId, BodyRecord>,
    /// Loaded joint records by carrier body id, for re-export reuse.
    pub loaded_joints: HashMap<BodyId, JointRecord>,
}

impl ImportSession {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Builds a scene graph from `document`.
    ///
    /// `document_dir` anchors the document's relative mesh directories.
    /// Bodies or joints that fail individually are skipped and reported in
    /// `issues`.
    pub fn import(
        &mut self,
        document: &AdfDocument,
        assets: &mut dyn MeshAssets,
        document_dir: &Path,
    ) -> Result<SceneGraph, AdfError> {
        // The alignment pass rewrites pivot/axis fields, so work on a copy.
        let mut document = document.clone();

        self.namespace = namespace::normalize_namespace(
            document
                .namespace
                .as_deref()
                .unwrap_or(namespace::DEFAULT_NAMESPACE),
        );
        let high_res = qualified_path(document_dir, &document.high_resolution_path);

        let mut scene = SceneGraph::new();

        for key in document.bodies().to_vec() {
            let record = document
                .body(&key)
                .cloned()
                .ok_or_else(|| AdfError::MissingRecord { key: key.clone() })?;
            if let Err(error) =
                self.load_body(&mut scene, assets, document_dir, &high_res, &key, &record)
            {
                log::error!("skipping body {key}: {error}");
                self.issues.push(ImportIssue { item: key, error });
            }
        }

        if self.config.mode
            == (RepresentationMode::Legacy {
                adjust_joint_pivots: true,
            })
        {
            self.adjust_pivots_and_axes(&mut document, &mut scene);
        }

        for key in document.joints().to_vec() {
            let record = document
                .joint(&key)
                .cloned()
                .ok_or_else(|| AdfError::MissingRecord { key: key.clone() })?;
            let result = match self.config.mode {
                RepresentationMode::Legacy { .. } => {
                    self.load_legacy_joint(&mut scene, &record)
                }
                RepresentationMode::Native => self.load_native_joint(&mut scene, &record),
            };
            if let Err(error) = result {
                log::error!("skipping joint {key}: {error}");
                self.issues.push(ImportIssue { item: key, error });
            }
        }

        Ok(scene)
    }

    fn load_body(
        &mut self,
        scene: &mut SceneGraph,
        assets: &mut dyn MeshAssets,
        document_dir: &Path,
        document_high_res: &Path,
        key: &str,
        record: &BodyRecord,
    ) -> Result<(), AdfError> {
        // A world body is de-duplicated against any already-loaded world.
        if is_world_name(&record.name)
            && let Some((existing, _)) = scene
                .bodies()
                .find(|(_, b)| is_world_name(namespace::strip_namespace(&b.name)))
        {
            self.remapped.insert(key.to_string(), existing);
            self.corrections.insert(key.to_string(), Mat4::IDENTITY);
            return Ok(());
        }

        let high_res = match &record.high_resolution_path {
            Some(path) => qualified_path(document_dir, path),
            None => document_high_res.to_path_buf(),
        };

        let full_name = match &record.namespace {
            Some(ns) => namespace::qualify(ns, &record.name),
            None => namespace::qualify(&self.namespace, &record.name),
        };

        let mut body = if record.mesh.is_empty() {
            Body::placeholder(full_name)
        } else {
            let mesh_path = high_res.join(&record.mesh);
            match MeshFormat::from_path(&mesh_path)? {
                None => Body::placeholder(full_name),
                Some(format) => {
                    let mesh = resolve_mesh(assets, &mesh_path, format)?;
                    Body::mesh_body(full_name, mesh)
                }
            }
        };

        if body.kind == BodyKind::Mesh {
            // The stored scale is baked into the vertices up front, so every
            // downstream transform stays rigid.
            if record.scale != 1.0
                && let Some(mesh) = &mut body.mesh
            {
                mesh.transform(&Mat4::from_scale(Vec3::splat(record.scale)));
            }

            body.rigid_body = Some(rigid_body_props(record));
            body.material = material_from(record);
            body.controller = record.controller.map(|c| BodyController {
                enabled: true,
                linear_p: c.linear.p,
                linear_d: c.linear.d,
                angular_p: c.angular.p,
                angular_d: c.angular.d,
            });
            body.physics_rep = Some(match self.config.mode {
                RepresentationMode::Legacy { .. } => PhysicsRep::Legacy,
                RepresentationMode::Native => PhysicsRep::Native {
                    is_static: record.mass == 0.0,
                    inertial_offset_position: record.inertial_offset.position.to_vec3(),
                    inertial_offset_orientation: Vec3::new(
                        record.inertial_offset.orientation.r,
                        record.inertial_offset.orientation.p,
                        record.inertial_offset.orientation.y,
                    ),
                    controllers_enabled: record.controller.is_some(),
                },
            });
        }

        let rpy = record.location.orientation;
        body.transform = (
            record.location.position.to_vec3(),
            Quat::from_euler(EulerRot::XYZ, rpy.r, rpy.p, rpy.y),
        );

        let id = scene.add_body(body);
        self.remapped.insert(key.to_string(), id);
        self.corrections.insert(key.to_string(), Mat4::IDENTITY);
        self.loaded_bodies.insert(id, record.clone());
        Ok(())
    }

    /// Rotates child meshes so that every stored joint axis coincides with
    /// the canonical constraint axis of the joint's type.
    ///
    /// Runs over all joints before any joint object exists. For each
    /// non-detached joint the rotation taking the canonical axis onto the
    /// stored child axis is inverted into the child's mesh data, the record's
    /// child pivot/axis are reset to the canonical frame, and the applied
    /// correction is kept for the joint placement math. A secondary residual
    /// rotation between the corrected child and the parent is then folded in;
    /// its axis must be parallel to the canonical axis, anything else is
    /// surfaced as a warning and applied anyway.
    fn adjust_pivots_and_axes(&mut self, document: &mut AdfDocument, scene: &mut SceneGraph) {
        for key in document.joints().to_vec() {
            let Some(record) = document.joint_mut(&key) else {
                continue;
            };
            if record.is_detached() {
                log::info!("joint {key} is detached, child axis and pivot stay as stored");
                continue;
            }
            let Some(&child_id) = self.remapped.get(&record.child) else {
                continue;
            };

            let canonical_axis = record.joint_type.canonical_axis();
            let child_axis = record.child_axis.to_vec3().normalize_or(Vec3::Z);
            let child_pivot = record.child_pivot.to_vec3();
            let parent_axis = record.parent_axis.to_vec3().normalize_or(Vec3::Z);
            let child_key = record.child.clone();

            record.child_pivot = XyzRecord::default();
            record.child_axis = canonical_axis.into();

            let (r_j_c, _) = math::axis_angle_between(canonical_axis, child_axis);
            let mut t_j_c = Mat4::from_mat3(r_j_c);
            t_j_c.w_axis = child_pivot.extend(1.0);
            let t_c_j = t_j_c.inverse();

            if let Some(mesh) = &mut scene.body_mut(child_id).mesh {
                mesh.transform(&t_c_j);
            }
            let mut correction = t_c_j;

            // Alignment-offset residual: what rotation beyond the primary
            // correction separates the corrected child from the parent.
            let (r_caxis_p, _) = math::axis_angle_between(canonical_axis, parent_axis);
            let r_cnew_p = Mat4::from_mat3(r_caxis_p) * t_c_j;
            let (r_c_p, _) = math::axis_angle_between(child_axis, parent_axis);
            let delta = r_cnew_p.inverse() * Mat4::from_mat3(r_c_p);

            let (axis, mut angle) = math::to_axis_angle(&Mat3::from_mat4(delta));
            let axis = math::round3_vec(axis);
            if axis.cross(canonical_axis).length() > 0.1 && angle.abs() > 0.1 {
                log::warn!("alignment residual of {key} is not about the canonical axis");
            }
            if axis.min_element() < 0.0 {
                angle = -angle;
            }
            if angle.abs() > 0.1 {
                let r_ao = Mat4::from_axis_angle(canonical_axis, angle);
                if let Some(mesh) = &mut scene.body_mut(child_id).mesh {
                    mesh.transform(&r_ao);
                }
                correction = r_ao * t_c_j;
            }

            self.corrections.insert(child_key, correction);
        }
    }

    fn offset_angle(&self, record: &JointRecord) -> f32 {
        if self.config.ignore_joint_offsets {
            0.0
        } else {
            record.offset.unwrap_or(0.0)
        }
    }

    fn parent_correction(&self, record: &JointRecord) -> Mat4 {
        self.corrections
            .get(&record.parent)
            .copied()
            .unwrap_or(Mat4::IDENTITY)
    }

    /// World transform of the joint frame: parent world pose, the parent's
    /// alignment correction, the pivot translation, the offset rotation about
    /// the parent axis and the canonical-to-parent axis rotation.
    fn joint_in_parent(&self, scene: &SceneGraph, parent_id: BodyId, record: &JointRecord) -> Mat4 {
        let t_p_w = scene.body(parent_id).world_matrix();
        let parent_axis = record.parent_axis.to_vec3().normalize_or(Vec3::Z);
        let p_j_p = Mat4::from_translation(record.parent_pivot.to_vec3());
        let canonical_axis = record.joint_type.canonical_axis();
        let (r_j_p, _) = math::axis_angle_between(canonical_axis, parent_axis);
        let offset_rot = Mat4::from_axis_angle(parent_axis, self.offset_angle(record));

        t_p_w * self.parent_correction(record) * p_j_p * offset_rot * Mat4::from_mat3(r_j_p)
    }

    /// World transform of the child body: the same chain as the joint frame
    /// but rotated by child-to-parent axis alignment and pulled back by the
    /// inverse child pivot.
    fn child_in_parent(&self, scene: &SceneGraph, parent_id: BodyId, record: &JointRecord) -> Mat4 {
        let t_p_w = scene.body(parent_id).world_matrix();
        let parent_axis = record.parent_axis.to_vec3().normalize_or(Vec3::Z);
        let child_axis = record.child_axis.to_vec3().normalize_or(Vec3::Z);
        let p_j_p = Mat4::from_translation(record.parent_pivot.to_vec3());
        let (r_c_p, _) = math::axis_angle_between(child_axis, parent_axis);
        let p_c_j = Mat4::from_translation(-record.child_pivot.to_vec3());
        let offset_rot = Mat4::from_axis_angle(parent_axis, self.offset_angle(record));

        t_p_w * self.parent_correction(record) * p_j_p * offset_rot * Mat4::from_mat3(r_c_p) * p_c_j
    }

    fn endpoint(&self, record: &JointRecord, key: &str) -> Result<BodyId, AdfError> {
        self.remapped
            .get(key)
            .copied()
            .ok_or_else(|| AdfError::UndefinedBody {
                body: key.to_string(),
                context: record.name.clone(),
            })
    }

    fn load_legacy_joint(
        &mut self,
        scene: &mut SceneGraph,
        record: &JointRecord,
    ) -> Result<(), AdfError> {
        let parent_id = self.endpoint(record, &record.parent)?;
        let child_id = self.endpoint(record, &record.child)?;

        let handle_id = if record.is_detached() {
            let name = if is_detached_name(&record.name) {
                record.name.clone()
            } else {
                format!("detached joint {}", record.name)
            };
            let mut placeholder = Body::placeholder(name);
            placeholder.detached_placeholder = true;
            scene.add_body(placeholder)
        } else {
            child_id
        };

        let t_c_p = self.child_in_parent(scene, parent_id, record);
        let (_, rotation, translation) = t_c_p.to_scale_rotation_translation();
        scene.body_mut(handle_id).transform = (translation, rotation);
        scene.adopt(parent_id, handle_id);

        let adjusted = self.config.mode
            == (RepresentationMode::Legacy {
                adjust_joint_pivots: true,
            });
        let limit_offset = if adjusted {
            // The adjustment already rotated the child into place.
            0.0
        } else {
            self.offset_angle(record)
        };
        scene.body_mut(handle_id).constraint =
            Some(legacy_constraint(record, parent_id, child_id, limit_offset));

        self.loaded_joints.insert(handle_id, record.clone());
        Ok(())
    }

    fn load_native_joint(
        &mut self,
        scene: &mut SceneGraph,
        record: &JointRecord,
    ) -> Result<(), AdfError> {
        let parent_id = self.endpoint(record, &record.parent)?;
        let child_id = self.endpoint(record, &record.child)?;

        let handle_id = scene.add_body(Body::placeholder(record.name.clone()));

        let t_j_p = self.joint_in_parent(scene, parent_id, record);
        let t_c_p = self.child_in_parent(scene, parent_id, record);

        let (_, rotation, translation) = t_j_p.to_scale_rotation_translation();
        scene.body_mut(handle_id).transform = (translation, rotation);
        let (_, rotation, translation) = t_c_p.to_scale_rotation_translation();
        scene.body_mut(child_id).transform = (translation, rotation);

        scene.adopt(parent_id, handle_id);
        scene.adopt(handle_id, child_id);

        scene.body_mut(handle_id).constraint =
            Some(native_constraint(record, parent_id, child_id));

        self.loaded_joints.insert(handle_id, record.clone());
        Ok(())
    }
}

/// Resolves `path` against the document directory unless already absolute.
fn qualified_path(document_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        document_dir.join(p)
    }
}

/// Loads a mesh, pruning non-mesh parts and merging multi-part assets.
///
/// Collada assets may carry cameras and lights alongside several mesh parts;
/// only meshes survive, and multiple parts are joined by baking each part's
/// placement into its vertices. Joined collada meshes additionally get the
/// importer's X-axis tilt undone.
fn resolve_mesh(
    assets: &mut dyn MeshAssets,
    path: &Path,
    format: MeshFormat,
) -> Result<MeshAsset, AdfError> {
    let asset = assets.load(path)?;
    let mut parts: Vec<_> = asset
        .parts
        .into_iter()
        .filter(|p| p.kind == AssetPartKind::Mesh)
        .collect();
    if parts.is_empty() {
        return Err(AdfError::EmptyAsset {
            path: path.display().to_string(),
        });
    }

    if format == MeshFormat::Dae && parts.len() > 1 {
        let mut merged = MeshAsset::default();
        for part in &mut parts {
            part.mesh.transform(&part.transform);
            merged.vertices.append(&mut part.mesh.vertices);
        }
        merged.transform(&Mat4::from_rotation_x(-1.57));
        Ok(merged)
    } else {
        Ok(parts.swap_remove(0).mesh)
    }
}

fn rigid_body_props(record: &BodyRecord) -> RigidBodyProps {
    let defaults = RigidBodyProps::default();

    let mut collision_groups = Vec::new();
    match &record.collision_groups {
        Some(listed) => {
            for &group in listed {
                if (0..20).contains(&group) {
                    collision_groups.push(group as u8);
                } else {
                    log::warn!("collision group outside [0, 20): {group}");
                }
            }
        }
        None => collision_groups.push(0),
    }

    RigidBodyProps {
        mass: record.mass,
        passive: record.mass == 0.0,
        static_friction: record
            .friction
            .map_or(defaults.static_friction, |f| f.static_),
        rolling_friction: record
            .friction
            .map_or(defaults.rolling_friction, |f| f.rolling),
        linear_damping: record.damping.map_or(defaults.linear_damping, |d| d.linear),
        angular_damping: record
            .damping
            .map_or(defaults.angular_damping, |d| d.angular),
        restitution: record.restitution.unwrap_or(defaults.restitution),
        collision_margin: record.collision_margin,
        collision_shape: record.collision_shape.unwrap_or(defaults.collision_shape),
        collision_groups,
    }
}

fn material_from(record: &BodyRecord) -> Option<Material> {
    if let Some(rgba) = record.color_rgba {
        let mut material = Material::default();
        material.diffuse = Vec3::new(rgba.r, rgba.g, rgba.b);
        material.alpha = rgba.a;
        Some(material)
    } else {
        record.color_components.map(|c| Material {
            diffuse: Vec3::new(c.diffuse.r, c.diffuse.g, c.diffuse.b),
            specular: Vec3::new(c.specular.r, c.specular.g, c.specular.b),
            ambient_level: c.ambient.level,
            alpha: c.transparency,
        })
    }
}

fn joint_controller(record: &JointRecord) -> Option<JointController> {
    record.controller.map(|gains| JointController {
        enabled: true,
        p: gains.p,
        d: gains.d,
        damping: record.damping.unwrap_or(0.0),
    })
}

/// Builds the legacy degree-of-freedom constraint for a joint record.
///
/// Angular limits of revolute and torsion-spring joints are shifted by the
/// stored offset angle (zero when the adjustment pass already rotated the
/// child); continuous joints stay unlimited.
fn legacy_constraint(
    record: &JointRecord,
    parent: BodyId,
    child: BodyId,
    limit_offset: f32,
) -> Constraint {
    let spring = || {
        (record.damping.is_some() || record.stiffness.is_some()).then(|| SpringParams {
            damping: record.damping.unwrap_or(0.0),
            stiffness: record.stiffness.unwrap_or(0.0),
        })
    };

    let mut constraint = match record.joint_type {
        AdfJointType::Revolute | AdfJointType::Continuous => {
            let limits = record
                .joint_limits
                .filter(|_| record.joint_type == AdfJointType::Revolute)
                .map(|l| LimitRange::new(l.low + limit_offset, l.high + limit_offset));
            Constraint::hinge(parent, child, limits)
        }
        AdfJointType::Prismatic => Constraint::slider(
            parent,
            child,
            record
                .joint_limits
                .map_or(LimitRange::default(), |l| LimitRange::new(l.low, l.high)),
        ),
        AdfJointType::LinearSpring => {
            let mut c = Constraint::fixed(parent, child);
            c.kind = ConstraintKind::GenericSpring;
            c.linear_limits[0] = record
                .joint_limits
                .map(|l| LimitRange::new(l.low + limit_offset, l.high + limit_offset));
            c.linear_springs[0] = spring();
            c
        }
        AdfJointType::TorsionSpring => {
            let mut c = Constraint::fixed(parent, child);
            c.kind = ConstraintKind::GenericSpring;
            c.angular_limits[2] = record
                .joint_limits
                .map(|l| LimitRange::new(l.low + limit_offset, l.high + limit_offset));
            c.angular_springs[2] = spring();
            c
        }
        AdfJointType::P2P => Constraint::point(parent, child),
        AdfJointType::Fixed => Constraint::fixed(parent, child),
    };

    if matches!(
        record.joint_type,
        AdfJointType::Revolute | AdfJointType::Continuous | AdfJointType::Prismatic
    ) {
        constraint.controller = joint_controller(record);
    }

    constraint
}

/// Builds the native first-class constraint for a joint record.
fn native_constraint(record: &JointRecord, parent: BodyId, child: BodyId) -> Constraint {
    let (kind, native_kind) = match record.joint_type {
        AdfJointType::Revolute | AdfJointType::Continuous => {
            (ConstraintKind::Hinge, NativeConstraintKind::Revolute)
        }
        AdfJointType::Prismatic => (ConstraintKind::Slider, NativeConstraintKind::Prismatic),
        AdfJointType::LinearSpring => (
            ConstraintKind::GenericSpring,
            NativeConstraintKind::LinearSpring,
        ),
        AdfJointType::TorsionSpring => (
            ConstraintKind::GenericSpring,
            NativeConstraintKind::TorsionSpring,
        ),
        AdfJointType::P2P => (ConstraintKind::Point, NativeConstraintKind::P2P),
        AdfJointType::Fixed => (ConstraintKind::Fixed, NativeConstraintKind::Fixed),
    };

    let stiffness = matches!(
        native_kind,
        NativeConstraintKind::LinearSpring | NativeConstraintKind::TorsionSpring
    )
    .then_some(record.stiffness)
    .flatten();

    let mut constraint = Constraint::fixed(parent, child);
    constraint.kind = kind;
    constraint.rep = ConstraintRep::Native {
        kind: native_kind,
        axis_index: record.joint_type.canonical_axis_index(),
        limits: record
            .joint_limits
            .map(|l| LimitRange::new(l.low, l.high)),
        damping: record.damping.unwrap_or(0.0),
        stiffness,
    };
    if matches!(
        native_kind,
        NativeConstraintKind::Revolute | NativeConstraintKind::Prismatic
    ) {
        constraint.controller = joint_controller(record);
    }

    constraint
}
