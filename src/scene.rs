//! The in-memory articulated-body scene graph.
//!
//! Bodies form a directed forest of ownership through their `parent` links;
//! joints live in a separate constraint graph carried by the body a
//! constraint is attached to, and may reference non-adjacent tree nodes.
//! Closed kinematic loops are expressed through detached-joint placeholder
//! bodies rather than tree edges.

use crate::assets::MeshAsset;
use crate::shape::CollisionShapeKind;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A unique identifier for a body within a scene graph.
pub type BodyId = u16;

/// Name prefixes that historically marked detached-joint placeholders.
///
/// New scenes set [`Body::detached_placeholder`] explicitly; the prefix list
/// survives only for classifying bodies built by hosts that still follow the
/// convention and legacy documents flagged `redundant`.
const DETACHED_NAME_PREFIXES: [&str; 6] = [
    "redundant",
    "Redundant",
    "REDUNDANT",
    "detached",
    "Detached",
    "DETACHED",
];

/// Whether a name follows the legacy detached-joint prefix convention.
pub fn is_detached_name(name: &str) -> bool {
    DETACHED_NAME_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Whether a bare body name is the reserved world body.
pub fn is_world_name(name: &str) -> bool {
    matches!(name, "world" | "World" | "WORLD")
}

/// What a scene node is backed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// A node with mesh data.
    Mesh,
    /// An empty node: joint handles, detached-joint markers, frames.
    Placeholder,
}

/// Per-body physical attributes exposed by the constraint/physics capability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyProps {
    pub mass: f32,
    /// Passive bodies export zero mass regardless of `mass`.
    pub passive: bool,
    pub static_friction: f32,
    pub rolling_friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    /// `Some` only when the margin is explicitly enabled on the body.
    pub collision_margin: Option<f32>,
    pub collision_shape: CollisionShapeKind,
    /// Collision group indices, each expected in `[0, 20)`.
    pub collision_groups: Vec<u8>,
}

impl Default for RigidBodyProps {
    fn default() -> Self {
        Self {
            mass: 1.0,
            passive: false,
            static_friction: 0.5,
            rolling_friction: 0.01,
            linear_damping: 0.1,
            angular_damping: 0.1,
            restitution: 0.0,
            collision_margin: None,
            collision_shape: CollisionShapeKind::ConvexHull,
            collision_groups: vec![0],
        }
    }
}

/// Surface color of a body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub ambient_level: f32,
    pub alpha: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
            ambient_level: 0.5,
            alpha: 1.0,
        }
    }
}

/// Linear and angular controller gains of a body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyController {
    /// Gains are exported only when explicitly enabled.
    pub enabled: bool,
    pub linear_p: f32,
    pub linear_d: f32,
    pub angular_p: f32,
    pub angular_d: f32,
}

/// Controller gains and damping of a joint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointController {
    pub enabled: bool,
    pub p: f32,
    pub d: f32,
    pub damping: f32,
}

/// A low/high bound pair for a constrained degree of freedom.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitRange {
    pub low: f32,
    pub high: f32,
}

impl LimitRange {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }
}

/// Spring parameters of one degree of freedom.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpringParams {
    pub damping: f32,
    pub stiffness: f32,
}

/// Host-side constraint kinds, the input of joint-type classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintKind {
    Fixed,
    Hinge,
    Slider,
    Point,
    Generic,
    GenericSpring,
}

/// Joint kinds of the native constraint representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeConstraintKind {
    Fixed,
    Revolute,
    Prismatic,
    LinearSpring,
    TorsionSpring,
    P2P,
}

/// Mode-specific constraint payload, selected once per import session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConstraintRep {
    /// The degree-of-freedom arrays on [`Constraint`] carry everything.
    Legacy,
    /// First-class constraint attributes with a fixed canonical axis.
    Native {
        kind: NativeConstraintKind,
        /// Operative axis index forced by the constraint system (2 = Z, 0 = X).
        axis_index: usize,
        limits: Option<LimitRange>,
        damping: f32,
        stiffness: Option<f32>,
    },
}

/// A constraint between two bodies, attached to some carrier body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub parent: BodyId,
    pub child: BodyId,
    /// Per-axis linear limits; `Some` means the limit flag is active.
    pub linear_limits: [Option<LimitRange>; 3],
    /// Per-axis angular limits; `Some` means the limit flag is active.
    pub angular_limits: [Option<LimitRange>; 3],
    /// Per-axis linear spring parameters; `Some` means the spring flag is active.
    pub linear_springs: [Option<SpringParams>; 3],
    /// Per-axis angular spring parameters; `Some` means the spring flag is active.
    pub angular_springs: [Option<SpringParams>; 3],
    pub controller: Option<JointController>,
    pub rep: ConstraintRep,
}

impl Constraint {
    fn bare(kind: ConstraintKind, parent: BodyId, child: BodyId) -> Self {
        Self {
            kind,
            parent,
            child,
            linear_limits: [None; 3],
            angular_limits: [None; 3],
            linear_springs: [None; 3],
            angular_springs: [None; 3],
            controller: None,
            rep: ConstraintRep::Legacy,
        }
    }

    /// A welded connection.
    pub fn fixed(parent: BodyId, child: BodyId) -> Self {
        Self::bare(ConstraintKind::Fixed, parent, child)
    }

    /// A ball joint constrained only at a point.
    pub fn point(parent: BodyId, child: BodyId) -> Self {
        Self::bare(ConstraintKind::Point, parent, child)
    }

    /// A hinge about the carrier's Z axis; `limits` of `None` leaves it unlimited.
    pub fn hinge(parent: BodyId, child: BodyId, limits: Option<LimitRange>) -> Self {
        let mut c = Self::bare(ConstraintKind::Hinge, parent, child);
        c.angular_limits[2] = limits;
        c
    }

    /// A slider along the carrier's X axis.
    pub fn slider(parent: BodyId, child: BodyId, limits: LimitRange) -> Self {
        let mut c = Self::bare(ConstraintKind::Slider, parent, child);
        c.linear_limits[0] = Some(limits);
        c
    }
}

/// Mode-specific physical representation of a body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PhysicsRep {
    /// Attributes live in [`RigidBodyProps`] on the host's simulation objects.
    Legacy,
    /// First-class attribute set of the native representation.
    Native {
        is_static: bool,
        inertial_offset_position: Vec3,
        inertial_offset_orientation: Vec3,
        controllers_enabled: bool,
    },
}

/// A single body of the scene graph.
#[derive(Clone, Debug)]
pub struct Body {
    /// Full name, possibly carrying a namespace prefix.
    pub name: String,
    pub kind: BodyKind,
    /// Tree parent; `None` for roots.
    pub parent: Option<BodyId>,
    /// World pose (position, orientation) for the rest configuration.
    pub transform: (Vec3, Quat),
    /// Per-axis scale baked into the world matrix.
    pub scale: Vec3,
    /// Local-space mesh data, present for [`BodyKind::Mesh`].
    pub mesh: Option<MeshAsset>,
    pub rigid_body: Option<RigidBodyProps>,
    /// Constraint attached to this body (the carrier), if any.
    pub constraint: Option<Constraint>,
    pub material: Option<Material>,
    pub controller: Option<BodyController>,
    pub physics_rep: Option<PhysicsRep>,
    /// Hidden bodies are excluded from export, as are joints touching them.
    pub hidden: bool,
    /// Marks a placeholder that declares a detached joint for a closed loop.
    pub detached_placeholder: bool,
}

impl Body {
    /// A placeholder (empty) node.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BodyKind::Placeholder,
            parent: None,
            transform: (Vec3::ZERO, Quat::IDENTITY),
            scale: Vec3::ONE,
            mesh: None,
            rigid_body: None,
            constraint: None,
            material: None,
            controller: None,
            physics_rep: None,
            hidden: false,
            detached_placeholder: false,
        }
    }

    /// A mesh-backed node.
    pub fn mesh_body(name: impl Into<String>, mesh: MeshAsset) -> Self {
        let mut body = Self::placeholder(name);
        body.kind = BodyKind::Mesh;
        body.mesh = Some(mesh);
        body
    }

    /// World matrix including scale.
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.transform.1, self.transform.0)
    }

    /// Bounding-box dimensions of the scaled mesh, zero without a mesh.
    pub fn dimensions(&self) -> Vec3 {
        self.mesh
            .as_ref()
            .map_or(Vec3::ZERO, |m| m.extent() * self.scale)
    }

    /// Center of the local bounding box, scaled: the inertial offset origin.
    pub fn local_bounds_center(&self) -> Vec3 {
        self.mesh
            .as_ref()
            .map_or(Vec3::ZERO, |m| m.bounds_center() * self.scale)
    }
}

/// An articulated-body scene: a forest of bodies plus a joint graph.
#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    bodies: Vec<Body>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a body and returns its id.
    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = self.bodies.len() as BodyId;
        self.bodies.push(body);
        id
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn body(&self, id: BodyId) -> &Body {
        &self.bodies[id as usize]
    }

    pub fn body_mut(&mut self, id: BodyId) -> &mut Body {
        &mut self.bodies[id as usize]
    }

    /// All body ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        (0..self.bodies.len()).map(|i| i as BodyId)
    }

    /// All bodies with their ids, in insertion order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (i as BodyId, b))
    }

    /// Direct children of `id`, in id order.
    pub fn children_of(&self, id: BodyId) -> Vec<BodyId> {
        self.bodies()
            .filter(|(_, b)| b.parent == Some(id))
            .map(|(child_id, _)| child_id)
            .collect()
    }

    /// Root ancestor of `id`, following parent links.
    pub fn root_of(&self, id: BodyId) -> BodyId {
        let mut current = id;
        while let Some(parent) = self.body(current).parent {
            current = parent;
        }
        current
    }

    /// Finds a body by its full name.
    pub fn find_by_name(&self, name: &str) -> Option<BodyId> {
        self.bodies().find(|(_, b)| b.name == name).map(|(id, _)| id)
    }

    /// Parents `child` under `parent`, keeping the child's world pose.
    ///
    /// No-op when the child already has a tree parent.
    pub fn adopt(&mut self, parent: BodyId, child: BodyId) {
        if self.body(child).parent.is_none() && parent != child {
            self.body_mut(child).parent = Some(parent);
        }
    }
}
