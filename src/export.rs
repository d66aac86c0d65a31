//! Scene graph → ADF document.
//!
//! Bodies are emitted in hierarchical traversal order, then joints in the
//! same pass order. Joint extraction builds rotation-only parent/child
//! transforms (scale corrupts a raw rotation submatrix), reads pivot and axis
//! from the child-in-parent transform, classifies the constraint into an ADF
//! joint type, and computes the residual offset angle that pivot+axis alone
//! cannot express.

use crate::assets::{MeshAssets, MeshFormat, MeshResolution};
use crate::document::{
    AdfDocument, AdfJointType, AmbientRecord, BodyControllerRecord, BodyRecord,
    ColorComponentsRecord, DampingRecord, FrictionRecord, GainsRecord, InertiaRecord, JointRecord,
    LimitsRecord, RgbRecord, RpyRecord,
};
use crate::error::AdfError;
use crate::math::{self, round3, round3_vec, round4};
use crate::namespace;
use crate::scene::{
    Body, BodyId, BodyKind, Constraint, ConstraintKind, LimitRange, SceneGraph, SpringParams,
    is_detached_name, is_world_name,
};
use crate::shape;
use crate::tree;
use glam::{EulerRot, Mat3, Mat4, Vec3};
use std::collections::HashMap;
use std::path::Path;

/// Options of an export session.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Session namespace; bodies matching it omit their own namespace field.
    pub namespace: String,
    /// Mesh directory path written into the document, relative to the file.
    pub mesh_path: String,
    /// Format of mesh file names synthesized for mesh-backed bodies.
    pub mesh_format: MeshFormat,
    pub ignore_inter_collision: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            namespace: namespace::DEFAULT_NAMESPACE.to_string(),
            mesh_path: "meshes".to_string(),
            mesh_format: MeshFormat::Stl,
            ignore_inter_collision: false,
        }
    }
}

/// A per-item failure surfaced without aborting the document.
#[derive(Debug)]
pub struct ExportIssue {
    /// Name of the body or joint the issue belongs to.
    pub item: String,
    pub error: AdfError,
}

/// Export session context: namespace, previously-loaded definitions, issues.
///
/// Records loaded by a prior import can be seeded through `loaded_bodies` /
/// `loaded_joints` so that collision geometry hand-tuned in an earlier
/// document survives an export/import/export cycle verbatim.
#[derive(Debug, Default)]
pub struct ExportSession {
    pub config: ExportConfig,
    /// Previously-loaded body records, keyed by scene body id.
    pub loaded_bodies: HashMap<BodyId, BodyRecord>,
    /// Previously-loaded joint records, keyed by the constraint carrier body.
    pub loaded_joints: HashMap<BodyId, JointRecord>,
    /// Per-item failures encountered during the last export.
    pub issues: Vec<ExportIssue>,
}

impl ExportSession {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Produces the ADF document for `scene`.
    ///
    /// Bodies are fully emitted before any joint referencing them. Items
    /// that fail classification are skipped and reported in `issues`.
    pub fn export(&mut self, scene: &SceneGraph) -> Result<AdfDocument, AdfError> {
        let session_namespace = namespace::normalize_namespace(&self.config.namespace);

        let mut document = AdfDocument::new();
        document.high_resolution_path = format!("{}/high_res/", self.config.mesh_path);
        document.low_resolution_path = format!("{}/low_res/", self.config.mesh_path);
        document.ignore_inter_collision = self.config.ignore_inter_collision;
        if !session_namespace.is_empty() {
            document.namespace = Some(session_namespace.clone());
        }

        let order = tree::hierarchical_order(scene);

        for &id in &order {
            if let Some(record) = self.body_record(scene, id, &session_namespace) {
                document.push_body(record);
            }
        }
        for &id in &order {
            match self.joint_record(scene, id) {
                Ok(Some(record)) => {
                    document.push_joint(record);
                }
                Ok(None) => {}
                Err(error) => {
                    let item = scene.body(id).name.clone();
                    log::error!("skipping joint carried by {item}: {error}");
                    self.issues.push(ExportIssue { item, error });
                }
            }
        }

        Ok(document)
    }

    fn body_record(
        &self,
        scene: &SceneGraph,
        id: BodyId,
        session_namespace: &str,
    ) -> Option<BodyRecord> {
        let body = scene.body(id);
        if body.hidden {
            return None;
        }

        let mut record = BodyRecord::default();

        if !namespace::matches_namespace(&body.name, session_namespace) {
            let body_ns = namespace::body_namespace(&body.name);
            if !body_ns.is_empty() {
                record.namespace = Some(body_ns.to_string());
            }
        }
        let bare_name = namespace::strip_namespace(&body.name);
        record.name = bare_name.to_string();

        // Roots of a multi-body publish their joint state.
        if body.parent.is_none() && !scene.children_of(id).is_empty() {
            record.publish_joint_names = Some(true);
            record.publish_joint_positions = Some(true);
        }

        let (position, rotation) = body.transform;
        record.location.position = round3_vec(position).into();
        let (r, p, y) = rotation.to_euler(EulerRot::XYZ);
        record.location.orientation = RpyRecord {
            r: round3(r),
            p: round3(p),
            y: round3(y),
        };

        match body.kind {
            BodyKind::Placeholder => {
                if body.detached_placeholder || is_detached_name(bare_name) {
                    log::info!("placeholder {bare_name} declares a detached joint");
                    return None;
                }
                record.mesh = String::new();
                if is_world_name(bare_name) {
                    record.mass = 0.0;
                    record.inertia = Some(InertiaRecord::default());
                } else {
                    record.mass = 0.1;
                    record.inertia = Some(InertiaRecord {
                        ix: 0.01,
                        iy: 0.01,
                        iz: 0.01,
                    });
                }
            }
            BodyKind::Mesh => {
                if let Some(rb) = &body.rigid_body {
                    record.mass = if rb.passive { 0.0 } else { round3(rb.mass) };
                    record.friction = Some(FrictionRecord {
                        rolling: rb.rolling_friction,
                        static_: round3(rb.static_friction),
                    });
                    record.damping = Some(DampingRecord {
                        linear: round3(rb.linear_damping),
                        angular: round3(rb.angular_damping),
                    });
                    record.restitution = Some(round3(rb.restitution));
                    record.collision_groups =
                        Some(rb.collision_groups.iter().map(|&g| g as i32).collect());
                    record.collision_margin = rb.collision_margin.map(round3);

                    if rb.collision_shape.is_primitive() {
                        // Geometry loaded from a prior document is reused
                        // verbatim when the shape kind still matches, so
                        // hand-tuned parameters survive re-export.
                        let reused = self.loaded_bodies.get(&id).and_then(|loaded| {
                            (loaded.collision_shape == Some(rb.collision_shape))
                                .then_some(loaded.collision_geometry)
                                .flatten()
                        });
                        record.collision_shape = Some(rb.collision_shape);
                        record.collision_geometry = reused
                            .or_else(|| shape::derive_geometry(rb.collision_shape, body.dimensions()));
                    }

                    record.inertia = record.collision_geometry.as_ref().and_then(|geometry| {
                        shape::primitive_inertia(rb.collision_shape, geometry, record.mass).map(
                            |i| InertiaRecord {
                                ix: round4(i.x),
                                iy: round4(i.y),
                                iz: round4(i.z),
                            },
                        )
                    });
                }

                record.mesh = format!("{bare_name}{}", self.config.mesh_format.extension());
                record.inertial_offset.position = round3_vec(body.local_bounds_center()).into();

                if let Some(material) = &body.material {
                    record.color = None;
                    record.color_components = Some(ColorComponentsRecord {
                        diffuse: RgbRecord {
                            r: round4(material.diffuse.x),
                            g: round4(material.diffuse.y),
                            b: round4(material.diffuse.z),
                        },
                        specular: RgbRecord {
                            r: round4(material.specular.x),
                            g: round4(material.specular.y),
                            b: round4(material.specular.z),
                        },
                        ambient: AmbientRecord {
                            level: round4(material.ambient_level),
                        },
                        transparency: round4(material.alpha),
                    });
                }

                if let Some(controller) = &body.controller
                    && controller.enabled
                {
                    record.controller = Some(BodyControllerRecord {
                        linear: GainsRecord {
                            p: round4(controller.linear_p),
                            i: 0.0,
                            d: round4(controller.linear_d),
                        },
                        angular: GainsRecord {
                            p: round4(controller.angular_p),
                            i: 0.0,
                            d: round4(controller.angular_d),
                        },
                    });
                }
            }
        }

        Some(record)
    }

    fn joint_record(
        &mut self,
        scene: &SceneGraph,
        carrier_id: BodyId,
    ) -> Result<Option<JointRecord>, AdfError> {
        let carrier = scene.body(carrier_id);
        if carrier.hidden {
            return Ok(None);
        }
        let Some(constraint) = &carrier.constraint else {
            return Ok(None);
        };
        let parent = scene.body(constraint.parent);
        let child = scene.body(constraint.child);
        if parent.hidden || child.hidden {
            return Ok(None);
        }

        let (joint_type, axis_index, limits, spring) = classify_constraint(constraint)
            .ok_or_else(|| AdfError::UnclassifiableConstraint {
                body: carrier.name.clone(),
            })?;

        let parent_name = namespace::strip_namespace(&parent.name);
        let child_name = namespace::strip_namespace(&child.name);
        let carrier_name = namespace::strip_namespace(&carrier.name);

        let mut record = JointRecord {
            name: format!("{parent_name}-{child_name}"),
            parent: format!("{}{parent_name}", AdfDocument::BODY_PREFIX),
            child: format!("{}{child_name}", AdfDocument::BODY_PREFIX),
            joint_type,
            ..JointRecord::default()
        };

        let detached = carrier.kind == BodyKind::Placeholder
            && (carrier.detached_placeholder || is_detached_name(carrier_name));

        let (parent_pivot, parent_axis, child_pivot, child_axis);
        if detached {
            log::info!("adding detached joint for placeholder {carrier_name}");
            // The placeholder stands in for the joint frame on both sides.
            (parent_pivot, parent_axis) = pivot_and_axis(parent, carrier, axis_index);
            (child_pivot, child_axis) = pivot_and_axis(child, carrier, axis_index);
            record.detached = Some(true);
        } else {
            (parent_pivot, parent_axis) = pivot_and_axis(parent, child, axis_index);
            child_pivot = Vec3::ZERO;
            let mut unit = Vec3::ZERO;
            unit[axis_index] = 1.0;
            child_axis = unit;
        }

        record.parent_pivot = round3_vec(parent_pivot).into();
        record.parent_axis = round3_vec(parent_axis).into();
        record.child_pivot = round3_vec(child_pivot).into();
        record.child_axis = round3_vec(child_axis).into();

        record.joint_limits = match joint_type {
            AdfJointType::Fixed | AdfJointType::P2P | AdfJointType::Continuous => None,
            _ => limits.map(|l| LimitsRecord {
                low: round3(l.low),
                high: round3(l.high),
            }),
        };

        if let Some(SpringParams { damping, stiffness }) = spring {
            record.damping = Some(round4(damping));
            record.stiffness = Some(round4(stiffness));
        }

        // Pivot+axis under-determine the relative pose; the residual rotation
        // about the joint axis becomes the offset angle.
        let r_p_c_adf = math::rotation_between(child_axis, parent_axis).inverse();
        let r_w_p = Mat3::from_quat(parent.transform.1).inverse();
        let r_c_w = Mat3::from_quat(child.transform.1);
        let residual = r_p_c_adf * (r_w_p * r_c_w);
        let (residual_axis, residual_angle) = math::to_axis_angle(&residual);

        if residual_angle.abs() > 0.01 {
            let offset = round3(residual_angle);
            if (1.0 - child_axis.dot(residual_axis)).abs() < 0.1 {
                record.offset = Some(offset);
            } else if (1.0 + child_axis.dot(residual_axis)).abs() < 0.1 {
                record.offset = Some(-offset);
            } else {
                // The sign convention is undefined here; surface it rather
                // than guess.
                let error = AdfError::OffsetAxisInconsistent {
                    joint: record.name.clone(),
                };
                log::warn!("{error}");
                self.issues.push(ExportIssue {
                    item: record.name.clone(),
                    error,
                });
            }
        }

        if matches!(
            constraint.kind,
            ConstraintKind::Hinge | ConstraintKind::Slider | ConstraintKind::Generic
        ) && let Some(jc) = &constraint.controller
            && jc.enabled
        {
            record.controller = Some(GainsRecord {
                p: round4(jc.p),
                i: 0.0,
                d: round4(jc.d),
            });
            record.damping = Some(round4(jc.damping));
        }

        Ok(Some(record))
    }

    /// Saves every visible mesh body at both resolutions under `base`.
    ///
    /// Meshes are written in local space (the body pushed to the origin) with
    /// the median scale preserved, into parallel `high_res/` and `low_res/`
    /// directories. The low resolution pass leaves simplification to the
    /// capability implementation.
    pub fn save_meshes(
        &self,
        scene: &SceneGraph,
        assets: &mut dyn MeshAssets,
        base: &Path,
    ) -> Result<(), AdfError> {
        let high = base.join("high_res");
        let low = base.join("low_res");

        for (_, body) in scene.bodies() {
            if body.hidden || body.kind != BodyKind::Mesh {
                continue;
            }
            let Some(mesh) = &body.mesh else {
                continue;
            };

            let mut scaled = mesh.clone();
            scaled.transform(&Mat4::from_scale(Vec3::splat(median_scale(body.scale))));

            let file = format!(
                "{}{}",
                namespace::strip_namespace(&body.name),
                self.config.mesh_format.extension()
            );
            assets.save(
                &high.join(&file),
                &scaled,
                self.config.mesh_format,
                MeshResolution::High,
            )?;
            assets.save(
                &low.join(&file),
                &scaled,
                self.config.mesh_format,
                MeshResolution::Low,
            )?;
        }

        Ok(())
    }
}

/// Classifies a constraint into (joint type, axis index, limits, spring).
///
/// Generic constraints take the first active limit flag in x,y,z order with
/// linear before angular; spring parameters are copied only when the matching
/// spring flag is also active. Returns `None` when nothing classifies.
fn classify_constraint(
    c: &Constraint,
) -> Option<(AdfJointType, usize, Option<LimitRange>, Option<SpringParams>)> {
    match c.kind {
        ConstraintKind::Hinge => match c.angular_limits[2] {
            Some(l) => Some((AdfJointType::Revolute, 2, Some(l), None)),
            None => Some((AdfJointType::Continuous, 2, None, None)),
        },
        ConstraintKind::Slider => Some((
            AdfJointType::Prismatic,
            0,
            Some(c.linear_limits[0].unwrap_or_default()),
            None,
        )),
        ConstraintKind::Point => Some((AdfJointType::P2P, 2, None, None)),
        ConstraintKind::Fixed => Some((AdfJointType::Fixed, 2, None, None)),
        ConstraintKind::Generic => {
            for i in 0..3 {
                if let Some(l) = c.linear_limits[i] {
                    return Some((AdfJointType::Prismatic, i, Some(l), None));
                }
            }
            for i in 0..3 {
                if let Some(l) = c.angular_limits[i] {
                    return Some((AdfJointType::Revolute, i, Some(l), None));
                }
            }
            None
        }
        ConstraintKind::GenericSpring => {
            for i in 0..3 {
                if let Some(l) = c.linear_limits[i] {
                    return Some((AdfJointType::LinearSpring, i, Some(l), c.linear_springs[i]));
                }
            }
            for i in 0..3 {
                if let Some(l) = c.angular_limits[i] {
                    return Some((
                        AdfJointType::TorsionSpring,
                        i,
                        Some(l),
                        c.angular_springs[i],
                    ));
                }
            }
            None
        }
    }
}

/// Pivot and axis of `child` expressed in `parent`'s frame.
///
/// Both world transforms are rebuilt rotation-only before composing, since a
/// scaled basis would corrupt the extracted axis column.
fn pivot_and_axis(parent: &Body, child: &Body, axis_index: usize) -> (Vec3, Vec3) {
    let t_p_w = math::strip_scale(&parent.world_matrix());
    let t_c_w = math::strip_scale(&child.world_matrix());
    let t_c_p = t_p_w.inverse() * t_c_w;
    let pivot = t_c_p.w_axis.truncate();
    let axis = t_c_p.col(axis_index).truncate();
    (pivot, axis)
}

fn median_scale(s: Vec3) -> f32 {
    let mut v = [s.x, s.y, s.z];
    v.sort_by(f32::total_cmp);
    v[1]
}
