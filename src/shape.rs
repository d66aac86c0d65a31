//! Collision shape inference from bounding-box dimensions.
//!
//! Primitive collision geometry (cylinder, capsule, cone, sphere) is derived
//! by classifying the bounding box's axes into major/median/minor by pairwise
//! dimension differences. Mass properties of the derived primitives come from
//! `bevy_heavy`.

use crate::math::round3;
use bevy_heavy::ComputeMassProperties3d;
use bevy_math::primitives::{Capsule3d, Cone, Cuboid, Cylinder, Sphere};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One of the three box axes, serialized as the lowercase axis letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxAxis {
    X,
    Y,
    Z,
}

impl BoxAxis {
    /// Component index of this axis in a 3-vector.
    pub fn index(self) -> usize {
        self as usize
    }

    fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::X,
            1 => Self::Y,
            _ => Self::Z,
        }
    }
}

/// The major/median/minor classification of a bounding box.
///
/// The three axes are always distinct and cover `{x, y, z}` exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisTriple {
    pub major: BoxAxis,
    pub median: BoxAxis,
    pub minor: BoxAxis,
}

/// Classifies bounding-box axes by pairwise absolute dimension differences.
///
/// Axis `i` scores `Σ_j |d[i] - d[j]|`; the major axis has the largest score,
/// the minor the smallest, the median is the remaining one. When all three
/// scores tie (a cube or a sphere's bounds), the major axis is Z.
pub fn classify_axes(dims: Vec3) -> AxisTriple {
    let d = dims.to_array();
    let score = [
        (d[0] - d[1]).abs() + (d[0] - d[2]).abs(),
        (d[1] - d[0]).abs() + (d[1] - d[2]).abs(),
        (d[2] - d[0]).abs() + (d[2] - d[1]).abs(),
    ];

    if score[0] == score[1] && score[1] == score[2] {
        return AxisTriple {
            major: BoxAxis::Z,
            median: BoxAxis::Y,
            minor: BoxAxis::X,
        };
    }

    let mut major = 0;
    let mut minor = 0;
    for i in 1..3 {
        if score[i] > score[major] {
            major = i;
        }
        if score[i] < score[minor] {
            minor = i;
        }
    }
    let median = 3 - major - minor;
    AxisTriple {
        major: BoxAxis::from_index(major),
        median: BoxAxis::from_index(median),
        minor: BoxAxis::from_index(minor),
    }
}

/// Major axis of a bounding box.
pub fn major_axis(dims: Vec3) -> BoxAxis {
    classify_axes(dims).major
}

/// Median (middle) axis of a bounding box.
pub fn median_axis(dims: Vec3) -> BoxAxis {
    classify_axes(dims).median
}

/// Minor axis of a bounding box.
pub fn minor_axis(dims: Vec3) -> BoxAxis {
    classify_axes(dims).minor
}

/// Collision shape kinds, serialized with the ADF spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionShapeKind {
    #[serde(rename = "CONVEX_HULL")]
    ConvexHull,
    #[serde(rename = "MESH")]
    Mesh,
    #[serde(rename = "BOX")]
    Box,
    #[serde(rename = "SPHERE")]
    Sphere,
    #[serde(rename = "CYLINDER")]
    Cylinder,
    #[serde(rename = "CAPSULE")]
    Capsule,
    #[serde(rename = "CONE")]
    Cone,
}

impl CollisionShapeKind {
    /// Whether this shape has derived primitive geometry parameters.
    pub fn is_primitive(self) -> bool {
        !matches!(self, Self::ConvexHull | Self::Mesh)
    }
}

/// Shape-specific collision geometry parameters.
///
/// Untagged on the wire: a box is `{x, y, z}`, a sphere `{radius}` and the
/// axial primitives `{radius, height, axis}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollisionGeometry {
    Box { x: f32, y: f32, z: f32 },
    Axial { radius: f32, height: f32, axis: BoxAxis },
    Sphere { radius: f32 },
}

/// Derives collision geometry from rounded bounding-box dimensions.
///
/// Returns `None` for convex-hull and mesh shapes, which carry no derived
/// parameters.
pub fn derive_geometry(kind: CollisionShapeKind, dims: Vec3) -> Option<CollisionGeometry> {
    let od = Vec3::new(round3(dims.x), round3(dims.y), round3(dims.z));
    match kind {
        CollisionShapeKind::ConvexHull | CollisionShapeKind::Mesh => None,
        CollisionShapeKind::Box => Some(CollisionGeometry::Box {
            x: od.x,
            y: od.y,
            z: od.z,
        }),
        CollisionShapeKind::Sphere => Some(CollisionGeometry::Sphere {
            radius: od.max_element() / 2.0,
        }),
        CollisionShapeKind::Cylinder | CollisionShapeKind::Capsule | CollisionShapeKind::Cone => {
            let axes = classify_axes(od);
            Some(CollisionGeometry::Axial {
                radius: od[axes.median.index()] / 2.0,
                height: od[axes.major.index()],
                axis: axes.major,
            })
        }
    }
}

/// A type-erased wrapper so we can call [`ComputeMassProperties3d`] on any variant.
#[derive(Clone, Copy, Debug)]
pub enum BevyPrimitive {
    Cuboid(Cuboid),
    Cylinder(Cylinder),
    Sphere(Sphere),
    Capsule(Capsule3d),
    Cone(Cone),
}

impl ComputeMassProperties3d for BevyPrimitive {
    fn mass(&self, density: f32) -> f32 {
        match self {
            Self::Cuboid(s) => s.mass(density),
            Self::Cylinder(s) => s.mass(density),
            Self::Sphere(s) => s.mass(density),
            Self::Capsule(s) => s.mass(density),
            Self::Cone(s) => s.mass(density),
        }
    }

    fn unit_principal_angular_inertia(&self) -> Vec3 {
        match self {
            Self::Cuboid(s) => s.unit_principal_angular_inertia(),
            Self::Cylinder(s) => s.unit_principal_angular_inertia(),
            Self::Sphere(s) => s.unit_principal_angular_inertia(),
            Self::Capsule(s) => s.unit_principal_angular_inertia(),
            Self::Cone(s) => s.unit_principal_angular_inertia(),
        }
    }

    fn center_of_mass(&self) -> Vec3 {
        match self {
            Self::Cuboid(s) => s.center_of_mass(),
            Self::Cylinder(s) => s.center_of_mass(),
            Self::Sphere(s) => s.center_of_mass(),
            Self::Capsule(s) => s.center_of_mass(),
            Self::Cone(s) => s.center_of_mass(),
        }
    }
}

/// Converts derived geometry to a `bevy_math` primitive for mass properties.
///
/// The axial primitives are Y-aligned in `bevy_math`; the caller permutes the
/// resulting inertia back onto the classified axis via [`primitive_inertia`].
pub fn to_bevy_primitive(kind: CollisionShapeKind, geometry: &CollisionGeometry) -> Option<BevyPrimitive> {
    match (kind, *geometry) {
        (CollisionShapeKind::Box, CollisionGeometry::Box { x, y, z }) => {
            Some(BevyPrimitive::Cuboid(Cuboid {
                half_size: Vec3::new(x / 2.0, y / 2.0, z / 2.0),
            }))
        }
        (CollisionShapeKind::Sphere, CollisionGeometry::Sphere { radius }) => {
            Some(BevyPrimitive::Sphere(Sphere::new(radius)))
        }
        (CollisionShapeKind::Cylinder, CollisionGeometry::Axial { radius, height, .. }) => {
            Some(BevyPrimitive::Cylinder(Cylinder::new(radius, height)))
        }
        (CollisionShapeKind::Capsule, CollisionGeometry::Axial { radius, height, .. }) => {
            Some(BevyPrimitive::Capsule(Capsule3d::new(radius, height)))
        }
        (CollisionShapeKind::Cone, CollisionGeometry::Axial { radius, height, .. }) => {
            Some(BevyPrimitive::Cone(Cone { radius, height }))
        }
        _ => None,
    }
}

/// Principal angular inertia of a primitive collision shape with the given mass.
///
/// Components are re-ordered so that the axial inertia lands on the
/// classified major axis rather than `bevy_math`'s canonical Y.
pub fn primitive_inertia(
    kind: CollisionShapeKind,
    geometry: &CollisionGeometry,
    mass: f32,
) -> Option<Vec3> {
    let primitive = to_bevy_primitive(kind, geometry)?;
    let unit = primitive.unit_principal_angular_inertia();
    let inertia = mass * unit;
    if let CollisionGeometry::Axial { axis, .. } = *geometry {
        // bevy's Y component is the axial one; the other two are equal.
        let axial = inertia.y;
        let transverse = inertia.x;
        let mut out = Vec3::splat(transverse);
        out[axis.index()] = axial;
        Some(out)
    } else {
        Some(inertia)
    }
}
