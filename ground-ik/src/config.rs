//! Solver tunables.
//!
//! `SolverConfig` is owned by the host and treated as read-only by the solver for
//! the duration of a tick. Every group derives `Default` from `crate::settings`
//! and deserializes with `#[serde(default)]`, so partial documents are fine.
//!
//! Notes
//! - Distances are in meters, speeds are "per second" rates, angles are degrees.
//! - Values are continuously tunable at runtime; nonsensical values are clamped
//!   by [`SolverConfig::sanitized`] rather than rejected.

use serde::{Deserialize, Serialize};

use crate::settings::*;

/// How persistent offsets chase their per-tick targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Exponential approach at a configured speed.
    #[default]
    Lerp,
    /// Critically damped spring with a configured smooth time.
    CriticallyDamped,
}

/// Host override for the validity check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidityMode {
    /// Evaluate state exclusions normally.
    #[default]
    Check,
    /// Always valid; ground presence is still probed.
    ForceValid,
    /// Always invalid and ungrounded; the solver reverts to the animated pose.
    ForceInvalid,
}

/// Foot box and per-leg correction limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootConfig {
    /// Heel-to-toe length of the foot box.
    pub length: f32,
    /// Side-to-side width of the foot box.
    pub width: f32,
    /// Height of the ankle (IK target) above the sole.
    pub height: f32,
    /// Shifts the box forward so it covers the toes rather than centering on the ankle.
    pub forward_bias: f32,
    /// Extra cast length above the highest correctable point.
    pub ray_margin: f32,
    /// Maximum upward correction of a foot above its animated position.
    pub max_correction: f32,
    /// Foot movement (meters) below which the previous ground query is reused.
    /// Zero recomputes every tick.
    pub recompute_distance: f32,
    /// Steeper ground is rejected outright.
    pub max_ground_angle: f32,
    /// Steeper ground is still accepted, but feet only follow it up to this slope.
    pub max_adapt_angle: f32,
    pub smoothing: SmoothingMode,
    /// Lerp speed while the offset rises toward its target.
    pub raise_speed: f32,
    /// Lerp speed while the offset falls toward its target.
    pub lower_speed: f32,
    /// Spring smooth time for [`SmoothingMode::CriticallyDamped`].
    pub smooth_time: f32,
    /// Overshoot added while moving to a higher target, as a fraction of the target step.
    pub extrapolation: f32,
    pub extrapolation_decay: f32,
    /// How far a smoothed foot may lag below a rising ground target.
    pub max_penetration: f32,
    /// Collision layer bits considered ground.
    ///
    /// The solver does not filter by it; pass it to the query backend, e.g.
    /// `world.query(solver.config().foot.ground_mask)`, so a `set_config`
    /// change takes effect on the next tick.
    pub ground_mask: u32,
}

impl Default for FootConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_FOOT_LENGTH,
            width: DEFAULT_FOOT_WIDTH,
            height: DEFAULT_FOOT_HEIGHT,
            forward_bias: DEFAULT_FORWARD_BIAS,
            ray_margin: DEFAULT_RAY_MARGIN,
            max_correction: DEFAULT_MAX_FOOT_CORRECTION,
            recompute_distance: DEFAULT_RECOMPUTE_DISTANCE,
            max_ground_angle: DEFAULT_MAX_GROUND_ANGLE,
            max_adapt_angle: DEFAULT_MAX_ADAPT_ANGLE,
            smoothing: SmoothingMode::Lerp,
            raise_speed: DEFAULT_FOOT_RAISE_SPEED,
            lower_speed: DEFAULT_FOOT_LOWER_SPEED,
            smooth_time: DEFAULT_FOOT_SMOOTH_TIME,
            extrapolation: DEFAULT_EXTRAPOLATION,
            extrapolation_decay: DEFAULT_EXTRAPOLATION_DECAY,
            max_penetration: DEFAULT_MAX_PENETRATION,
            ground_mask: u32::MAX,
        }
    }
}

/// Hip (body) vertical placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Maximum drop of the body below its animated height.
    pub max_correction: f32,
    /// Extra drop allowed per meter of forward distance between the feet.
    pub stride_relaxation: f32,
    /// Allow the body to rise when both feet stand above the animated sole level.
    pub can_rise: bool,
    pub max_rise: f32,
    /// Dead band applied while the body offset is settled near zero.
    pub tolerance: f32,
    pub smoothing: SmoothingMode,
    pub speed: f32,
    pub smooth_time: f32,
    /// Additional drop eased in while the host reports crouching.
    pub crouch_offset: f32,
    pub crouch_speed: f32,
    /// Rate at which IK influence fades in once grounded.
    pub blend_in_speed: f32,
    /// Rate at which IK influence fades out once invalid or airborne.
    pub reset_speed: f32,
    /// IK weight written to the feet at full influence.
    pub max_weight: f32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_correction: DEFAULT_MAX_BODY_CORRECTION,
            stride_relaxation: DEFAULT_STRIDE_RELAXATION,
            can_rise: false,
            max_rise: DEFAULT_MAX_BODY_RISE,
            tolerance: DEFAULT_BODY_TOLERANCE,
            smoothing: SmoothingMode::Lerp,
            speed: DEFAULT_BODY_SPEED,
            smooth_time: DEFAULT_BODY_SMOOTH_TIME,
            crouch_offset: DEFAULT_CROUCH_BODY_OFFSET,
            crouch_speed: DEFAULT_CROUCH_SPEED,
            blend_in_speed: DEFAULT_BLEND_IN_SPEED,
            reset_speed: DEFAULT_RESET_SPEED,
            max_weight: 1.0,
        }
    }
}

/// Ankle rotation adaptation to the ground normal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnkleConfig {
    pub max_angle: f32,
    pub stiffness: f32,
    pub relax_speed: f32,
    /// Adapt rotation even when the leg is not glued to the ground.
    pub always_adapt: bool,
}

impl Default for AnkleConfig {
    fn default() -> Self {
        Self {
            max_angle: DEFAULT_MAX_ANKLE_ANGLE,
            stiffness: DEFAULT_ANKLE_STIFFNESS,
            relax_speed: DEFAULT_ANKLE_RELAX_SPEED,
            always_adapt: false,
        }
    }
}

/// Whole-character ground presence probe.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundCheckConfig {
    pub radius: f32,
    /// Sweep starts this far above the root origin.
    pub start_height: f32,
    pub distance: f32,
    /// Upward root speed (m/s) above which the character counts as airborne.
    /// Zero disables the check.
    pub unground_velocity: f32,
}

impl Default for GroundCheckConfig {
    fn default() -> Self {
        Self {
            radius: DEFAULT_CHECK_RADIUS,
            start_height: DEFAULT_CHECK_START_HEIGHT,
            distance: DEFAULT_CHECK_DISTANCE,
            unground_velocity: 0.0,
        }
    }
}

/// Slope-driven spine lean.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeanConfig {
    /// Fixed step at which lean samples are taken.
    pub physics_dt: f32,
    pub window: usize,
    /// Degrees of forward lean per m/s of speed on a fully uphill normal.
    pub uphill_strength: f32,
    /// Degrees of backward lean per m/s of speed on a fully downhill normal.
    pub downhill_strength: f32,
    pub max_bend: f32,
    pub speed: f32,
    /// Fraction of the spine lean undone at the shoulders.
    pub shoulder_counter: f32,
    /// Spine-local axis the lean bends around.
    pub spine_axis: [f32; 3],
}

impl Default for LeanConfig {
    fn default() -> Self {
        Self {
            physics_dt: DEFAULT_PHYSICS_DT,
            window: DEFAULT_LEAN_WINDOW,
            uphill_strength: DEFAULT_UPHILL_LEAN,
            downhill_strength: DEFAULT_DOWNHILL_LEAN,
            max_bend: DEFAULT_MAX_BEND,
            speed: DEFAULT_LEAN_SPEED,
            shoulder_counter: DEFAULT_SHOULDER_COUNTER,
            spine_axis: [1.0, 0.0, 0.0],
        }
    }
}

/// Velocity-driven full-body lean.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveLeanConfig {
    pub enabled: bool,
    /// Degrees of pitch per m/s of forward speed.
    pub forward_strength: f32,
    /// Degrees of roll per m/s of sideways speed.
    pub side_strength: f32,
    pub max_angle: f32,
    /// Hip drop (meters) at full `max_angle` lean.
    pub kneel: f32,
    pub speed: f32,
}

impl Default for MoveLeanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            forward_strength: DEFAULT_MOVE_LEAN_FORWARD,
            side_strength: DEFAULT_MOVE_LEAN_SIDE,
            max_angle: DEFAULT_MAX_MOVE_LEAN,
            kneel: DEFAULT_KNEEL,
            speed: DEFAULT_MOVE_LEAN_SPEED,
        }
    }
}

/// Footstep detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootstepConfig {
    pub enabled: bool,
    pub step_length: f32,
    /// A foot counts as touching when its sole is within this of the surface.
    pub height_threshold: f32,
    /// Seconds between recognizing a step and dispatching its event.
    pub delay: f32,
    /// Planar speed under which the character counts as standing still.
    pub still_speed: f32,
    /// Standing still this long lets either foot fire next.
    pub still_time: f32,
}

impl Default for FootstepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            step_length: DEFAULT_STEP_LENGTH,
            height_threshold: DEFAULT_STEP_HEIGHT_THRESHOLD,
            delay: 0.0,
            still_speed: DEFAULT_STILL_SPEED,
            still_time: DEFAULT_STILL_TIME,
        }
    }
}

/// Complete tunable set for one character.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub foot: FootConfig,
    pub body: BodyConfig,
    pub ankle: AnkleConfig,
    pub ground_check: GroundCheckConfig,
    pub lean: LeanConfig,
    pub move_lean: MoveLeanConfig,
    pub footstep: FootstepConfig,
}

#[inline]
fn angle(deg: f32) -> f32 {
    if deg.is_finite() {
        deg.clamp(0.0, MAX_CONFIG_ANGLE_DEG)
    } else {
        0.0
    }
}

#[inline]
fn non_negative(v: f32) -> f32 {
    if v.is_finite() { v.max(0.0) } else { 0.0 }
}

#[inline]
fn extent(v: f32) -> f32 {
    if v.is_finite() {
        v.max(MIN_FOOT_EXTENT)
    } else {
        MIN_FOOT_EXTENT
    }
}

impl SolverConfig {
    /// Return a copy with every value forced into its usable range.
    ///
    /// Applied by `SolverBuilder::build` and `FootIkSolver::set_config`. Never
    /// fails: zero-sized feet become `MIN_FOOT_EXTENT`, negative rates become
    /// zero, angles are capped below 90°.
    pub fn sanitized(&self) -> Self {
        let mut c = *self;

        let f = &mut c.foot;
        f.length = extent(f.length);
        f.width = extent(f.width);
        f.height = extent(f.height);
        f.forward_bias = if f.forward_bias.is_finite() { f.forward_bias } else { 0.0 };
        f.ray_margin = non_negative(f.ray_margin);
        f.max_correction = non_negative(f.max_correction);
        f.recompute_distance = non_negative(f.recompute_distance);
        f.max_ground_angle = angle(f.max_ground_angle);
        f.max_adapt_angle = angle(f.max_adapt_angle).min(f.max_ground_angle);
        f.raise_speed = non_negative(f.raise_speed);
        f.lower_speed = non_negative(f.lower_speed);
        f.smooth_time = extent(f.smooth_time);
        f.extrapolation = non_negative(f.extrapolation);
        f.extrapolation_decay = non_negative(f.extrapolation_decay);
        f.max_penetration = non_negative(f.max_penetration);

        let b = &mut c.body;
        b.max_correction = non_negative(b.max_correction);
        b.stride_relaxation = non_negative(b.stride_relaxation);
        b.max_rise = non_negative(b.max_rise);
        b.tolerance = non_negative(b.tolerance);
        b.speed = non_negative(b.speed);
        b.smooth_time = extent(b.smooth_time);
        b.crouch_offset = non_negative(b.crouch_offset);
        b.crouch_speed = non_negative(b.crouch_speed);
        b.blend_in_speed = non_negative(b.blend_in_speed);
        b.reset_speed = non_negative(b.reset_speed);
        b.max_weight = if b.max_weight.is_finite() {
            b.max_weight.clamp(0.0, 1.0)
        } else {
            1.0
        };

        let a = &mut c.ankle;
        a.max_angle = angle(a.max_angle);
        a.stiffness = non_negative(a.stiffness);
        a.relax_speed = non_negative(a.relax_speed);

        let g = &mut c.ground_check;
        g.radius = extent(g.radius);
        g.start_height = non_negative(g.start_height);
        g.distance = non_negative(g.distance);
        g.unground_velocity = non_negative(g.unground_velocity);

        let l = &mut c.lean;
        l.physics_dt = extent(l.physics_dt);
        l.window = l.window.clamp(1, MAX_LEAN_WINDOW);
        l.uphill_strength = non_negative(l.uphill_strength);
        l.downhill_strength = non_negative(l.downhill_strength);
        l.max_bend = angle(l.max_bend);
        l.speed = non_negative(l.speed);
        l.shoulder_counter = if l.shoulder_counter.is_finite() {
            l.shoulder_counter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !l.spine_axis.iter().all(|v| v.is_finite())
            || l.spine_axis.iter().map(|v| v * v).sum::<f32>() <= DIST_EPS
        {
            l.spine_axis = [1.0, 0.0, 0.0];
        }

        let m = &mut c.move_lean;
        m.forward_strength = non_negative(m.forward_strength);
        m.side_strength = non_negative(m.side_strength);
        m.max_angle = angle(m.max_angle);
        m.kneel = non_negative(m.kneel);
        m.speed = non_negative(m.speed);

        let s = &mut c.footstep;
        s.step_length = extent(s.step_length);
        s.height_threshold = non_negative(s.height_threshold);
        s.delay = non_negative(s.delay);
        s.still_speed = non_negative(s.still_speed);
        s.still_time = non_negative(s.still_time);

        c
    }
}
