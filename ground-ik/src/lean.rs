//! Lean subsystems.
//!
//! - Slope lean bends the spine forward going uphill and back going downhill.
//!   Samples are taken at a fixed physics step and averaged over a short rolling
//!   window, so the result does not depend on render frame rate. The shoulders
//!   counter-rotate part of the bend to keep the head steady.
//! - Move lean tips the whole body into the direction of travel around the root,
//!   with a small hip drop ("kneel") proportional to the lean.

use nalgebra as na;

use crate::config::{LeanConfig, MoveLeanConfig};
use crate::grounded::GroundedResult;
use crate::math::{blend, lerp, planar_velocity};
use crate::settings::{MAX_LEAN_STEPS_PER_TICK, MAX_LEAN_WINDOW};
use crate::types::{Quat, RootFrame, Vec3};

/// Fixed-capacity rolling average.
#[derive(Clone, Copy, Debug)]
struct Window {
    samples: [f32; MAX_LEAN_WINDOW],
    len: usize,
    head: usize,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            samples: [0.0; MAX_LEAN_WINDOW],
            len: 0,
            head: 0,
        }
    }
}

impl Window {
    fn push(&mut self, value: f32, capacity: usize) {
        let capacity = capacity.clamp(1, MAX_LEAN_WINDOW);
        if self.len > capacity {
            *self = Self::default();
        }
        self.samples[self.head % capacity] = value;
        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
    }

    fn average(&self) -> f32 {
        if self.len == 0 {
            return 0.0;
        }
        self.samples[..self.len].iter().sum::<f32>() / self.len as f32
    }
}

/// Persistent slope lean state.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlopeLeanState {
    window: Window,
    accumulator: f32,
    prev_position: Option<Vec3>,
    /// Current smoothed lean (degrees, positive is forward).
    pub lean: f32,
}

/// One lean sample (degrees) for the ground under the character.
///
/// Uphill means the normal points against forward.
pub fn slope_sample(normal: &Vec3, forward: &Vec3, speed: f32, cfg: &LeanConfig) -> f32 {
    let slope = -normal.dot(forward);
    let strength = if slope > 0.0 {
        cfg.uphill_strength
    } else {
        cfg.downhill_strength
    };
    (slope * speed * strength).clamp(-cfg.max_bend, cfg.max_bend)
}

impl SlopeLeanState {
    /// Advance by `dt`, taking one sample per elapsed physics step.
    ///
    /// Returns the smoothed lean in degrees, already scaled by `strength`.
    pub fn update(&mut self, grounded: &GroundedResult, root: &RootFrame, cfg: &LeanConfig, strength: f32, dt: f32) -> f32 {
        let dt = dt.max(0.0);
        let up = root.up();
        let speed = self
            .prev_position
            .replace(root.position)
            .map_or(0.0, |prev| planar_velocity(&prev, &root.position, &up, dt).norm());
        let sample = if grounded.is_active() {
            slope_sample(&grounded.normal, &root.forward(), speed, cfg)
        } else {
            0.0
        };

        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= cfg.physics_dt && steps < MAX_LEAN_STEPS_PER_TICK {
            self.accumulator -= cfg.physics_dt;
            steps += 1;
            self.window.push(sample, cfg.window);
        }
        if steps == MAX_LEAN_STEPS_PER_TICK {
            // Drop a backlog left by a stall instead of replaying it.
            self.accumulator = self.accumulator.min(cfg.physics_dt);
        }

        let goal = self.window.average() * strength;
        self.lean = lerp(self.lean, goal, blend(cfg.speed, dt));
        self.lean
    }

    /// Bend `spine` by the current lean and counter-rotate `shoulders`.
    ///
    /// Both rotations are local and post-multiplied.
    pub fn apply(&self, spine: &mut Quat, shoulders: &mut Quat, cfg: &LeanConfig) {
        if self.lean == 0.0 {
            return;
        }
        let [x, y, z] = cfg.spine_axis;
        let Some(axis) = na::Unit::try_new(Vec3::new(x, y, z), 1.0e-6) else {
            return;
        };
        let bend = self.lean.to_radians();
        *spine *= Quat::from_axis_angle(&axis, bend);
        *shoulders *= Quat::from_axis_angle(&axis, -bend * cfg.shoulder_counter);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Persistent move lean state.
#[derive(Clone, Copy, Debug, Default)]
pub struct MoveLeanState {
    velocity: Vec3,
    prev_position: Option<Vec3>,
    /// Forward tilt (degrees).
    pub pitch: f32,
    /// Sideways tilt toward right (degrees).
    pub roll: f32,
}

impl MoveLeanState {
    /// Track the root's planar velocity and ease pitch and roll toward it.
    pub fn update(&mut self, root: &RootFrame, cfg: &MoveLeanConfig, strength: f32, dt: f32) {
        let up = root.up();
        let raw = self
            .prev_position
            .replace(root.position)
            .map_or(Vec3::zeros(), |prev| planar_velocity(&prev, &root.position, &up, dt));
        let t = blend(cfg.speed, dt);
        self.velocity = self.velocity.lerp(&raw, t);

        let (pitch, roll) = if cfg.enabled {
            (
                (self.velocity.dot(&root.forward()) * cfg.forward_strength * strength)
                    .clamp(-cfg.max_angle, cfg.max_angle),
                (self.velocity.dot(&root.right()) * cfg.side_strength * strength)
                    .clamp(-cfg.max_angle, cfg.max_angle),
            )
        } else {
            (0.0, 0.0)
        };
        self.pitch = lerp(self.pitch, pitch, t);
        self.roll = lerp(self.roll, roll, t);
    }

    /// World rotation that tips up toward forward by `pitch` and toward right by `roll`.
    pub fn rotation(&self, root: &RootFrame) -> Quat {
        let up = root.up();
        let pitch_axis = na::Unit::new_normalize(up.cross(&root.forward()));
        let roll_axis = na::Unit::new_normalize(up.cross(&root.right()));
        Quat::from_axis_angle(&pitch_axis, self.pitch.to_radians())
            * Quat::from_axis_angle(&roll_axis, self.roll.to_radians())
    }

    /// Hip drop along up for the current lean (meters).
    pub fn kneel(&self, cfg: &MoveLeanConfig) -> f32 {
        if cfg.max_angle <= 0.0 {
            return 0.0;
        }
        let amount = self.pitch.abs().max(self.roll.abs()) / cfg.max_angle;
        cfg.kneel * amount.min(1.0)
    }

    /// Whether the lean currently changes the pose.
    #[inline]
    pub fn is_leaning(&self) -> bool {
        self.pitch.abs() > 1.0e-4 || self.roll.abs() > 1.0e-4
    }

    /// Move `point` with the leaning body around the root pivot.
    pub fn lean_point(&self, point: &Vec3, root: &RootFrame, cfg: &MoveLeanConfig) -> Vec3 {
        let pivot = root.position;
        let rotated = pivot + self.rotation(root) * (point - pivot);
        rotated - root.up() * self.kneel(cfg)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
