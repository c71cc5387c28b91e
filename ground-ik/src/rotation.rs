//! Ankle rotation adaptation.
//!
//! A glued foot tilts toward the ground normal, limited to `max_angle`. A foot
//! in the air relaxes back to its animated rotation. The accumulated tilt is a
//! delta applied on top of the animated rotation, so animation stays in charge
//! of yaw and toe roll.

use crate::config::AnkleConfig;
use crate::leg::LegContactResult;
use crate::math::{blend, clamp_rotation, tilt_rotation};
use crate::types::{Quat, Vec3};

/// Advance the ankle tilt `delta` toward the ground under `contact`.
///
/// `adapt` is false while the solve is inactive; the tilt then relaxes.
pub fn adapt_rotation(
    delta: &mut Quat,
    contact: &LegContactResult,
    up: &Vec3,
    cfg: &AnkleConfig,
    adapt: bool,
    dt: f32,
) {
    let max = cfg.max_angle.to_radians();
    let follows_ground = adapt && contact.has_ground() && (contact.is_glued || cfg.always_adapt);
    let (goal, speed) = if follows_ground {
        (tilt_rotation(up, &contact.normal, max), cfg.stiffness)
    } else {
        (Quat::identity(), cfg.relax_speed)
    };
    let t = blend(speed, dt);
    let next = delta.try_slerp(&goal, t, 1.0e-6).unwrap_or(goal);
    *delta = clamp_rotation(&next, max);
}

/// Final IK rotation: the tilt applied in world space on top of the animated rotation.
#[inline]
pub fn apply_rotation(delta: &Quat, animated: &Quat) -> Quat {
    delta * animated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leg::ContactKind;
    use crate::math::angle_between;

    fn sloped(deg: f32, glued: bool) -> LegContactResult {
        let a = deg.to_radians();
        let mut c = LegContactResult::no_contact(Vec3::zeros(), Vec3::zeros(), Vec3::y());
        c.kind = ContactKind::Ground;
        c.is_glued = glued;
        c.normal = Vec3::new(0.0, a.cos(), -a.sin());
        c
    }

    fn run(contact: &LegContactResult, cfg: &AnkleConfig, adapt: bool, ticks: usize) -> Quat {
        let mut q = Quat::identity();
        for _ in 0..ticks {
            adapt_rotation(&mut q, contact, &Vec3::y(), cfg, adapt, 1.0 / 60.0);
        }
        q
    }

    #[test]
    fn glued_foot_matches_slope() {
        let cfg = AnkleConfig::default();
        let q = run(&sloped(15.0, true), &cfg, true, 300);
        let foot_up = q * Vec3::y();
        assert!(angle_between(&foot_up, &sloped(15.0, true).normal).to_degrees() < 0.1);
    }

    #[test]
    fn tilt_is_limited() {
        let cfg = AnkleConfig::default();
        let q = run(&sloped(40.0, true), &cfg, true, 300);
        assert!(q.angle().to_degrees() <= cfg.max_angle + 1.0e-3);
        assert!(q.angle().to_degrees() > cfg.max_angle - 0.1);
    }

    #[test]
    fn airborne_foot_keeps_animation_unless_always_adapt() {
        let mut cfg = AnkleConfig::default();
        let contact = sloped(15.0, false);
        assert!(run(&contact, &cfg, true, 60).angle() < 1.0e-6);
        cfg.always_adapt = true;
        assert!(run(&contact, &cfg, true, 60).angle() > 0.1);
    }

    #[test]
    fn inactive_solve_relaxes() {
        let cfg = AnkleConfig::default();
        let contact = sloped(20.0, true);
        let mut q = run(&contact, &cfg, true, 120);
        let start = q.angle();
        let mut prev = start;
        for _ in 0..300 {
            adapt_rotation(&mut q, &contact, &Vec3::y(), &cfg, false, 1.0 / 60.0);
            assert!(q.angle() <= prev + 1.0e-6);
            prev = q.angle();
        }
        assert!(prev < start * 0.01);
    }

    #[test]
    fn tilt_is_applied_in_world_space() {
        let delta = Quat::from_axis_angle(&Vec3::x_axis(), 0.2);
        let yaw = Quat::from_axis_angle(&Vec3::y_axis(), 1.0);
        let r = apply_rotation(&delta, &yaw);
        assert!((r * Vec3::y() - delta * Vec3::y()).norm() < 1.0e-5);
    }
}
