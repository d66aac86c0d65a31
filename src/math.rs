//! Rotation and axis utilities shared by the exporter and importer.
//!
//! Joint extraction and reconstruction both reduce to "find the rotation
//! taking one unit vector to another" with explicit handling of the
//! near-parallel and near-antiparallel cases, so that degenerate joint axes
//! never produce NaN rotations.

use glam::{Mat3, Mat4, Quat, Vec3};

/// Dot-product margin below which two unit vectors count as aligned.
const PARALLEL_DOT_MARGIN: f32 = 0.1;

/// Angle (radians) past which two unit vectors count as antiparallel.
const ANTIPARALLEL_ANGLE: f32 = 3.13;

/// Cross-product matrix of `v`: `skew(v) * u == v × u`.
pub fn skew(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Picks a reference axis not near-parallel to `v` and returns `v × reference`.
///
/// Used to construct a rotation axis when the two input vectors are
/// antiparallel and their cross product vanishes. Tries the canonical X axis
/// first and falls back to Y when `v` itself is near X.
fn antiparallel_rotation_axis(v: Vec3) -> Vec3 {
    let to_x = v.angle_between(Vec3::X);
    if PARALLEL_DOT_MARGIN < to_x.abs() && to_x.abs() < ANTIPARALLEL_ANGLE {
        v.cross(Vec3::X)
    } else {
        v.cross(Vec3::Y)
    }
}

/// Rotation matrix taking unit vector `a` onto unit vector `b`.
///
/// Near-parallel inputs return the identity, near-antiparallel inputs rotate
/// about an axis orthogonal to `a`, and everything else goes through
/// Rodrigues' formula on `skew(a × b)`.
pub fn rotation_between(a: Vec3, b: Vec3) -> Mat3 {
    let vcross = a.cross(b);
    let vdot = a.dot(b);
    if 1.0 - vdot < PARALLEL_DOT_MARGIN {
        Mat3::IDENTITY
    } else if 1.0 + vdot < PARALLEL_DOT_MARGIN {
        let angle = a.angle_between(b);
        let axis = antiparallel_rotation_axis(a);
        Mat3::from_axis_angle(axis.normalize(), angle)
    } else {
        let skew_v = skew(vcross);
        Mat3::IDENTITY + skew_v + (skew_v * skew_v) * ((1.0 - vdot) / vcross.length_squared())
    }
}

/// Rotation taking `a` onto `b` together with the rotation angle.
///
/// Unlike [`rotation_between`] the rotation is always built from an explicit
/// axis-angle pair, so the caller can reason about the scalar angle; the sign
/// is resolved downstream by comparing the rotation axis against a joint
/// axis.
pub fn axis_angle_between(a: Vec3, b: Vec3) -> (Mat3, f32) {
    let angle = a.angle_between(b);
    let axis = if angle.abs() <= PARALLEL_DOT_MARGIN {
        // Rotation is near-identity, any axis serves.
        Vec3::Y
    } else if angle.abs() >= ANTIPARALLEL_ANGLE {
        antiparallel_rotation_axis(a)
    } else {
        a.cross(b)
    };
    (Mat3::from_axis_angle(axis.normalize(), angle), angle)
}

/// Rebuilds a rigid transform from `m` with any scale dropped from the basis.
///
/// A world matrix carrying non-uniform scale corrupts the rotation submatrix,
/// so pivot/axis extraction re-assembles the transform from the decomposed
/// orientation plus translation.
pub fn strip_scale(m: &Mat4) -> Mat4 {
    let (_, rotation, translation) = m.to_scale_rotation_translation();
    Mat4::from_rotation_translation(rotation, translation)
}

/// Rounds to `decimals` decimal places.
pub fn round_to(v: f32, decimals: i32) -> f32 {
    let p = 10f32.powi(decimals);
    (v * p).round() / p
}

/// Rounds to 3 decimal places, the precision of every pose field in ADF.
pub fn round3(v: f32) -> f32 {
    round_to(v, 3)
}

/// Component-wise 3-decimal rounding.
pub fn round3_vec(v: Vec3) -> Vec3 {
    Vec3::new(round3(v.x), round3(v.y), round3(v.z))
}

/// Rounds to 4 decimal places, used for gains and color components.
pub fn round4(v: f32) -> f32 {
    round_to(v, 4)
}

/// Axis-angle decomposition of a rotation matrix.
pub fn to_axis_angle(m: &Mat3) -> (Vec3, f32) {
    Quat::from_mat3(m).to_axis_angle()
}
