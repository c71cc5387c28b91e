//! Ground validator: decides once per tick whether IK may run and whether the
//! character stands on anything.
//!
//! Policy, in order:
//! 1. `ValidityMode::ForceInvalid` short-circuits to invalid and ungrounded.
//! 2. Under `ValidityMode::Check`, any matching animation-state exclusion revokes validity.
//! 3. A sphere sweep down from above the root decides ground presence.
//! 4. Upward root speed above `unground_velocity` forces "not grounded" even with
//!    ground underneath, so a jump takeoff does not drag the feet.

use crate::config::{GroundCheckConfig, ValidityMode};
use crate::query::GroundQuery;
use crate::types::{GroundRef, RootFrame, Vec3};

/// Result of the per-tick validity and ground presence check.
///
/// Produced fresh each tick and never mutated afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundedResult {
    pub is_valid: bool,
    pub is_grounded: bool,
    /// Collider under the character, if any.
    pub ground: Option<GroundRef>,
    /// Contact point of the sweep.
    pub point: Vec3,
    /// Support position directly under the root (bottom of the swept sphere).
    pub position: Vec3,
    /// Ground normal, zero when not grounded.
    pub normal: Vec3,
}

impl GroundedResult {
    /// Invalid and ungrounded, all vectors zero.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Both valid and grounded: the full solve runs.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_valid && self.is_grounded
    }
}

/// Rule revoking validity while an animation state is active on a layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateExclusion {
    pub layer: usize,
    pub state_hash: i32,
}

/// The host's current and upcoming (transition target) state on one layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerState {
    pub layer: usize,
    pub current_hash: i32,
    pub next_hash: Option<i32>,
}

/// True if any exclusion matches the current or next state on its layer.
pub fn is_excluded(exclusions: &[StateExclusion], states: &[LayerState]) -> bool {
    exclusions.iter().any(|rule| {
        states.iter().any(|s| {
            s.layer == rule.layer
                && (s.current_hash == rule.state_hash || s.next_hash == Some(rule.state_hash))
        })
    })
}

/// Everything the validator reads for one tick.
#[derive(Clone, Copy, Debug)]
pub struct ValidationInput<'a> {
    pub root: &'a RootFrame,
    /// Root position at the previous tick, for upward velocity.
    pub prev_position: Option<Vec3>,
    pub dt: f32,
    pub mode: ValidityMode,
    pub exclusions: &'a [StateExclusion],
    pub states: &'a [LayerState],
}

/// Run the validity policy and the ground presence sweep.
pub fn validate_and_check_grounded(
    query: &impl GroundQuery,
    cfg: &GroundCheckConfig,
    input: &ValidationInput<'_>,
) -> GroundedResult {
    let is_valid = match input.mode {
        ValidityMode::ForceInvalid => return GroundedResult::invalid(),
        ValidityMode::ForceValid => true,
        ValidityMode::Check => !is_excluded(input.exclusions, input.states),
    };

    let mut result = GroundedResult {
        is_valid,
        ..GroundedResult::invalid()
    };

    let up = input.root.up();
    let start = input.root.position + up * (cfg.start_height + cfg.radius);
    let Some(hit) = query.cast_sphere(&start, cfg.radius, &-up, cfg.distance + cfg.start_height)
    else {
        return result;
    };

    if cfg.unground_velocity > 0.0 && input.dt > 0.0 {
        if let Some(prev) = input.prev_position {
            let rising = (input.root.position - prev).dot(&up) / input.dt;
            if rising > cfg.unground_velocity {
                log::trace!("ground check: rising at {rising:.2} m/s, ungrounded");
                return result;
            }
        }
    }

    let normal = if hit.normal.iter().all(|v| v.is_finite()) && hit.normal.norm() > 0.0 {
        hit.normal.normalize()
    } else {
        up
    };

    result.is_grounded = true;
    result.ground = Some(hit.handle);
    result.point = hit.point;
    result.position = start - up * (hit.distance + cfg.radius);
    result.normal = normal;
    result
}
