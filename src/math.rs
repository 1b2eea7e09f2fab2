/*
 * Math Module
 *
 * Small vector helpers shared by the steering pipeline. All of them avoid
 * producing NaN: degenerate inputs collapse to zero vectors or zero angles.
 */

use glam::{Mat3, Quat, Vec3};

/// Vectors at or below this length normalize to zero.
pub const NORMALIZE_EPSILON: f32 = 1e-5;

/// Lower clamp for the smoothing time constant.
pub const MIN_SMOOTH_TIME: f32 = 1e-4;

#[inline]
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    let length = v.length();
    if length > NORMALIZE_EPSILON && length.is_finite() {
        v / length
    } else {
        Vec3::ZERO
    }
}

/// Unsigned angle in degrees between two vectors. Zero if either is
/// (near) zero length.
pub fn angle_degrees(from: Vec3, to: Vec3) -> f32 {
    let denominator = (from.length_squared() * to.length_squared()).sqrt();
    if denominator < 1e-15 {
        return 0.0;
    }
    let cos = (from.dot(to) / denominator).clamp(-1.0, 1.0);
    cos.acos().to_degrees().min(180.0)
}

/// Rotation whose +Z axis points along `forward` with +Y as the up hint.
pub fn look_rotation(forward: Vec3) -> Option<Quat> {
    let z = normalize_or_zero(forward);
    if z == Vec3::ZERO {
        return None;
    }

    let x = Vec3::Y.cross(z);
    if x.length_squared() < NORMALIZE_EPSILON * NORMALIZE_EPSILON {
        // Looking straight up or down
        return Some(Quat::from_rotation_arc(Vec3::Z, z));
    }
    let x = x.normalize();
    let y = z.cross(x);

    Some(Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize())
}

/// Critically damped spring from `current` toward `target`.
///
/// `velocity` carries the damping state between calls and is updated in
/// place. Output never overshoots the target.
pub fn smooth_damp(
    current: Vec3,
    target: Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    delta_time: f32,
) -> Vec3 {
    let smooth_time = smooth_time.max(MIN_SMOOTH_TIME);
    let omega = 2.0 / smooth_time;

    let x = omega * delta_time;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * delta_time;
    *velocity = (*velocity - omega * temp) * decay;

    let mut output = target + (change + temp) * decay;

    let target_minus_current = target - current;
    let output_minus_target = output - target;
    if target_minus_current.dot(output_minus_target) > 0.0 {
        output = target;
        *velocity = Vec3::ZERO;
    }

    output
}
