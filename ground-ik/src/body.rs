//! Body blender: moves the whole character along up so both feet can reach ground.
//!
//! The body drops by the deepest foot's drop and may rise by the shallower foot's
//! rise. A small tolerance band keeps it still around zero, so micro-unevenness
//! does not make the hips jitter. Weights ramp in and out through two reset-lerp
//! factors that reach exactly 0 or 1 in bounded time.

use crate::config::{BodyConfig, SmoothingMode};
use crate::leg::{ContactKind, LegContactResult};
use crate::math::{blend, lerp, move_towards, smooth_damp};
use crate::types::Vec3;

/// Deepest drop the body may take this tick (positive meters).
///
/// A long stride (feet far apart along forward) allows extra drop so the rear
/// foot can stay planted on downhill steps.
pub fn body_drop_limit(contacts: &[LegContactResult; 2], forward: &Vec3, cfg: &BodyConfig) -> f32 {
    let stride = (contacts[0].animated_ik - contacts[1].animated_ik).dot(forward).abs();
    cfg.max_correction + cfg.stride_relaxation * stride
}

/// Target body offset along up from both feet's drops.
///
/// - No foot with ground: zero.
/// - Any surface below its foot: drop by the largest drop, limited to `drop_limit`.
/// - Both feet above (with `can_rise`): rise by the smaller rise, up to `max_rise`.
///
/// `current` is the body offset applied last tick; while it sits within the
/// tolerance band the band is subtracted from the target, so tiny drops are ignored.
pub fn body_target(
    contacts: &[LegContactResult; 2],
    up: &Vec3,
    current: f32,
    drop_limit: f32,
    cfg: &BodyConfig,
) -> f32 {
    let mut deepest: Option<f32> = None;
    let mut count = 0;
    for c in contacts.iter().filter(|c| c.kind != ContactKind::None) {
        let d = c.drop(up);
        deepest = Some(deepest.map_or(d, |m| m.min(d)));
        count += 1;
    }
    let Some(deepest) = deepest else {
        return 0.0;
    };

    let band = if current.abs() < cfg.tolerance {
        cfg.tolerance
    } else {
        0.0
    };

    if deepest < 0.0 {
        (deepest + band).min(0.0).max(-drop_limit)
    } else if cfg.can_rise && count == 2 {
        (deepest - band).max(0.0).min(cfg.max_rise)
    } else {
        0.0
    }
}

/// Persistent body placement state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyBlendState {
    /// Smoothed ground following offset along up (meters, before crouch and weight).
    pub offset: f32,
    /// Eased crouch contribution (positive meters, subtracted).
    pub crouch: f32,
    /// Ramps feet weights and offsets in or out.
    pub feet_factor: f32,
    /// Ramps the body offset in or out.
    pub body_factor: f32,
    /// Offset applied to the pose last tick.
    pub applied: f32,
    velocity: f32,
}

impl Default for BodyBlendState {
    fn default() -> Self {
        Self {
            offset: 0.0,
            crouch: 0.0,
            feet_factor: 0.0,
            body_factor: 0.0,
            applied: 0.0,
            velocity: 0.0,
        }
    }
}

impl BodyBlendState {
    /// Move both factors toward 1 while the solve is active, toward 0 otherwise.
    ///
    /// Linear in time, so a full fade takes exactly `1 / speed` seconds.
    pub fn update_factors(&mut self, active: bool, cfg: &BodyConfig, dt: f32) {
        let dt = dt.max(0.0);
        let (goal, speed) = if active {
            (1.0, cfg.blend_in_speed)
        } else {
            (0.0, cfg.reset_speed)
        };
        self.feet_factor = move_towards(self.feet_factor, goal, speed * dt);
        self.body_factor = move_towards(self.body_factor, goal, speed * dt);
    }

    /// Smooth toward `target` and return the offset to apply to the pose.
    ///
    /// The result is `(offset - crouch) * body_factor`, clamped to
    /// `[-drop_limit, max_rise]`.
    pub fn blend(&mut self, target: f32, crouching: bool, drop_limit: f32, cfg: &BodyConfig, dt: f32) -> f32 {
        self.offset = match cfg.smoothing {
            SmoothingMode::Lerp => lerp(self.offset, target, blend(cfg.speed, dt)),
            SmoothingMode::CriticallyDamped => {
                smooth_damp(self.offset, target, &mut self.velocity, cfg.smooth_time, dt)
            }
        };

        let crouch_goal = if crouching { cfg.crouch_offset } else { 0.0 };
        self.crouch = lerp(self.crouch, crouch_goal, blend(cfg.crouch_speed, dt));

        let rise = if cfg.can_rise { cfg.max_rise } else { 0.0 };
        let total = (self.offset - self.crouch).clamp(-drop_limit, rise);
        self.applied = total * self.body_factor;
        self.applied
    }

    /// IK weight for the feet this tick.
    #[inline]
    pub fn feet_weight(&self, cfg: &BodyConfig) -> f32 {
        cfg.max_weight * self.feet_factor
    }

    /// Weight of the body offset this tick.
    #[inline]
    pub fn body_weight(&self, cfg: &BodyConfig) -> f32 {
        cfg.max_weight * self.body_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn up() -> Vec3 {
        Vec3::y()
    }

    fn contact(x: f32, z: f32, ground: f32) -> LegContactResult {
        let ankle = Vec3::new(x, 0.1, z);
        let bottom = Vec3::new(x, 0.0, z);
        let mut c = LegContactResult::no_contact(ankle, bottom, up());
        c.kind = ContactKind::Ground;
        c.surface_point = Vec3::new(x, ground, z);
        c.glued_ik_pos = Vec3::new(x, ground + 0.1, z);
        c
    }

    #[test]
    fn drops_by_deepest_foot() {
        let cfg = BodyConfig::default();
        let legs = [contact(0.1, 0.0, 0.05), contact(-0.1, 0.0, -0.2)];
        let t = body_target(&legs, &up(), 0.5, cfg.max_correction, &cfg);
        assert!((t + 0.2).abs() < 1.0e-6);
    }

    #[test]
    fn tolerance_band_holds_still_around_zero() {
        let cfg = BodyConfig {
            tolerance: 0.02,
            ..BodyConfig::default()
        };
        let legs = [contact(0.1, 0.0, 0.0), contact(-0.1, 0.0, -0.015)];
        assert_eq!(body_target(&legs, &up(), 0.0, 0.5, &cfg), 0.0);
        // Once already moving, the full drop applies.
        let t = body_target(&legs, &up(), -0.05, 0.5, &cfg);
        assert!((t + 0.015).abs() < 1.0e-6);
    }

    #[test]
    fn rise_needs_both_feet_and_can_rise() {
        let mut cfg = BodyConfig {
            tolerance: 0.0,
            ..BodyConfig::default()
        };
        let legs = [contact(0.1, 0.0, 0.1), contact(-0.1, 0.0, 0.04)];
        assert_eq!(body_target(&legs, &up(), 0.0, 0.5, &cfg), 0.0);

        cfg.can_rise = true;
        let t = body_target(&legs, &up(), 0.0, 0.5, &cfg);
        assert!((t - 0.04).abs() < 1.0e-6);

        let mut one = legs;
        one[1].kind = ContactKind::None;
        assert_eq!(body_target(&one, &up(), 0.0, 0.5, &cfg), 0.0);
    }

    #[test]
    fn drop_is_limited_with_stride_relaxation() {
        let cfg = BodyConfig {
            max_correction: 0.3,
            stride_relaxation: 0.5,
            ..BodyConfig::default()
        };
        let legs = [contact(0.1, 0.4, 0.0), contact(-0.1, -0.4, -2.0)];
        let limit = body_drop_limit(&legs, &Vec3::z(), &cfg);
        assert!((limit - 0.7).abs() < 1.0e-6);
        assert!((body_target(&legs, &up(), 0.0, limit, &cfg) + 0.7).abs() < 1.0e-6);
    }

    #[test]
    fn no_ground_means_no_offset() {
        let cfg = BodyConfig::default();
        let legs = [
            LegContactResult::no_contact(Vec3::zeros(), Vec3::zeros(), up()),
            LegContactResult::no_contact(Vec3::zeros(), Vec3::zeros(), up()),
        ];
        assert_eq!(body_target(&legs, &up(), 0.0, 0.5, &cfg), 0.0);
    }

    #[test]
    fn factors_reach_bounds_in_bounded_time() {
        let cfg = BodyConfig::default();
        let mut s = BodyBlendState::default();
        let dt = 1.0 / 60.0;
        let ticks = (60.0 / cfg.blend_in_speed).ceil() as usize + 1;
        for _ in 0..ticks {
            s.update_factors(true, &cfg, dt);
        }
        assert_eq!(s.feet_factor, 1.0);
        assert_eq!(s.body_weight(&cfg), cfg.max_weight);

        let mut prev = s.feet_factor;
        for _ in 0..((60.0 / cfg.reset_speed).ceil() as usize + 1) {
            s.update_factors(false, &cfg, dt);
            assert!(s.feet_factor <= prev);
            prev = s.feet_factor;
        }
        assert_eq!(s.feet_factor, 0.0);
        assert_eq!(s.body_factor, 0.0);
    }

    #[test]
    fn blend_applies_crouch_and_weight() {
        let cfg = BodyConfig::default();
        let mut s = BodyBlendState {
            body_factor: 1.0,
            feet_factor: 1.0,
            ..BodyBlendState::default()
        };
        let mut out = 0.0;
        for _ in 0..600 {
            out = s.blend(-0.1, true, 0.5, &cfg, 1.0 / 60.0);
        }
        assert!((out - (-0.1 - cfg.crouch_offset)).abs() < 1.0e-3);

        s.body_factor = 0.5;
        let half = s.blend(-0.1, true, 0.5, &cfg, 1.0 / 60.0);
        assert!((half - out * 0.5).abs() < 1.0e-3);
    }

    #[test]
    fn damped_blend_converges() {
        let cfg = BodyConfig {
            smoothing: SmoothingMode::CriticallyDamped,
            ..BodyConfig::default()
        };
        let mut s = BodyBlendState {
            body_factor: 1.0,
            ..BodyBlendState::default()
        };
        let mut out = 0.0;
        for _ in 0..600 {
            out = s.blend(-0.25, false, 0.5, &cfg, 1.0 / 60.0);
            assert!(out >= -0.25 - 1.0e-4);
        }
        assert!((out + 0.25).abs() < 1.0e-3);
    }
}
