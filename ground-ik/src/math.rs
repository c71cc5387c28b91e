//! Small math helpers shared by the solver stages.
//!
//! Everything here is allocation-free and frame-rate independent: rates are
//! expressed per second and converted with the tick's `dt`.

use nalgebra as na;

use crate::settings::DIST_EPS;
use crate::types::{Quat, Vec3};

/// Remove the component of `v` along the unit vector `up`.
#[inline]
pub fn to_planar(v: &Vec3, up: &Vec3) -> Vec3 {
    v - up * v.dot(up)
}

/// Planar (perpendicular to `up`) distance between two world positions (meters).
#[inline]
pub fn planar_distance(a: &Vec3, b: &Vec3, up: &Vec3) -> f32 {
    to_planar(&(b - a), up).norm()
}

/// Planar velocity from the displacement between two ticks.
///
/// Returns zero for a non-positive `dt`.
#[inline]
pub fn planar_velocity(prev: &Vec3, current: &Vec3, up: &Vec3, dt: f32) -> Vec3 {
    if dt <= 0.0 {
        return Vec3::zeros();
    }
    to_planar(&(current - prev), up) / dt
}

/// Exponential approach factor for a per-second `speed` over `dt`.
///
/// `lerp(a, b, blend(speed, dt))` converges at the same rate regardless of frame rate.
#[inline]
pub fn blend(speed: f32, dt: f32) -> f32 {
    if speed <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    1.0 - (-speed * dt).exp()
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Step `current` toward `target` by at most `max_delta`.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

#[inline]
fn damp_coefficients(smooth_time: f32, dt: f32) -> (f32, f32) {
    let omega = 2.0 / smooth_time.max(DIST_EPS);
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    (omega, decay)
}

/// Critically damped spring toward `target` (scalar).
///
/// `velocity` is persistent state owned by the caller.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let (omega, decay) = damp_coefficients(smooth_time, dt);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let out = target + (change + temp) * decay;
    // No overshoot past the target.
    if (target - current > 0.0) == (out > target) {
        *velocity = 0.0;
        return target;
    }
    out
}

/// Critically damped spring toward `target` (vector).
pub fn smooth_damp_vec(
    current: &Vec3,
    target: &Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    dt: f32,
) -> Vec3 {
    if dt <= 0.0 {
        return *current;
    }
    let (omega, decay) = damp_coefficients(smooth_time, dt);
    let change = current - target;
    let temp = (*velocity + change * omega) * dt;
    *velocity = (*velocity - temp * omega) * decay;
    let out = target + (change + temp) * decay;
    if (target - current).dot(&(out - target)) > 0.0 {
        *velocity = Vec3::zeros();
        return *target;
    }
    out
}

/// Clamp the length of `v` to `max_len`.
#[inline]
pub fn clamp_length(v: &Vec3, max_len: f32) -> Vec3 {
    let len_sq = v.norm_squared();
    if len_sq > max_len * max_len && len_sq > DIST_EPS * DIST_EPS {
        v * (max_len / len_sq.sqrt())
    } else {
        *v
    }
}

/// Angle between two vectors in radians, robust to non-unit input.
///
/// Returns `NaN` if either vector is degenerate or non-finite.
#[inline]
pub fn angle_between(a: &Vec3, b: &Vec3) -> f32 {
    let denom = a.norm() * b.norm();
    if !(denom > DIST_EPS) {
        return f32::NAN;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos()
}

/// Rotate `normal` toward `up` so it is at most `max_angle` (radians) away from it.
pub fn limit_tilt(normal: &Vec3, up: &Vec3, max_angle: f32) -> Vec3 {
    let angle = angle_between(normal, up);
    if !angle.is_finite() || angle <= max_angle {
        return *normal;
    }
    match na::Unit::try_new(up.cross(normal), DIST_EPS) {
        Some(axis) => Quat::from_axis_angle(&axis, max_angle) * up,
        None => *up,
    }
}

/// Rotation of at most `max_angle` (radians) that tilts `up` toward `normal`.
pub fn tilt_rotation(up: &Vec3, normal: &Vec3, max_angle: f32) -> Quat {
    let angle = angle_between(up, normal);
    if !angle.is_finite() {
        return Quat::identity();
    }
    match na::Unit::try_new(up.cross(normal), DIST_EPS) {
        Some(axis) => Quat::from_axis_angle(&axis, angle.min(max_angle)),
        None => Quat::identity(),
    }
}

/// Clamp the rotation angle of `q` to `max_angle` (radians), keeping its axis.
pub fn clamp_rotation(q: &Quat, max_angle: f32) -> Quat {
    match q.axis_angle() {
        Some((axis, angle)) if angle > max_angle => Quat::from_axis_angle(&axis, max_angle),
        _ => *q,
    }
}

/// Intersection of the line `origin + t * dir` with the plane through `point` with `normal`.
///
/// Returns `None` when the line is (nearly) parallel to the plane.
pub fn line_plane(origin: &Vec3, dir: &Vec3, point: &Vec3, normal: &Vec3) -> Option<Vec3> {
    let denom = dir.dot(normal);
    if denom.abs() <= 1.0e-4 {
        return None;
    }
    let t = (point - origin).dot(normal) / denom;
    Some(origin + dir * t)
}
