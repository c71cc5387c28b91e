/*!
Solver tolerances and default tunables.

These constants centralize the parameters used by ground detection, leg
correction, body blending and the lean/footstep subsystems. `SolverConfig`
initializes from them, so tuning a default happens in one place.

Notes
- Distances are in meters, time in seconds, angles in degrees unless the name
  ends in `_RAD`.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
*/

/// Smallest foot length/width/height accepted at runtime (meters).
/// Zero or negative extents are clamped up to this instead of rejected.
pub const MIN_FOOT_EXTENT: f32 = 1.0e-3;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

/// Two normal estimates closer than this (degrees) are considered in agreement.
pub const NORMAL_AGREEMENT_DEG: f32 = 1.0;

/// A foot this far below its ground-following position (meters) still counts as glued.
pub const GLUE_TOLERANCE: f32 = 1.0e-3;

/// Hint solver: the longest triangle side is shrunk to this fraction of the
/// sum of the other two so `acos` stays in its domain.
pub const TRIANGLE_SLACK: f32 = 0.995;

/// Largest rolling window for the slope lean average.
pub const MAX_LEAN_WINDOW: usize = 32;

/// Most fixed physics steps consumed by slope lean in one tick.
/// Caps catch-up work after a long stall.
pub const MAX_LEAN_STEPS_PER_TICK: u32 = 8;

/// Upper bound on queued delayed footstep dispatches.
pub const MAX_PENDING_FOOTSTEPS: usize = 8;

/// Pre-reserved event slots per tick.
pub const EVENT_CAPACITY: usize = 16;

/// Highest angle any config may express (degrees). Keeps `1 / cos` finite.
pub const MAX_CONFIG_ANGLE_DEG: f32 = 89.9;

// Foot dimensions.
pub const DEFAULT_FOOT_LENGTH: f32 = 0.22;
pub const DEFAULT_FOOT_WIDTH: f32 = 0.10;
pub const DEFAULT_FOOT_HEIGHT: f32 = 0.10;
pub const DEFAULT_FORWARD_BIAS: f32 = 0.03;
pub const DEFAULT_RAY_MARGIN: f32 = 0.05;

// Leg correction.
pub const DEFAULT_MAX_FOOT_CORRECTION: f32 = 0.5;
pub const DEFAULT_RECOMPUTE_DISTANCE: f32 = 0.002;
pub const DEFAULT_FOOT_RAISE_SPEED: f32 = 20.0;
pub const DEFAULT_FOOT_LOWER_SPEED: f32 = 10.0;
pub const DEFAULT_FOOT_SMOOTH_TIME: f32 = 0.06;
pub const DEFAULT_EXTRAPOLATION: f32 = 0.4;
pub const DEFAULT_EXTRAPOLATION_DECAY: f32 = 12.0;
pub const DEFAULT_MAX_PENETRATION: f32 = 0.02;

/// Ground steeper than this is not ground at all.
pub const DEFAULT_MAX_GROUND_ANGLE: f32 = 81.0;
/// Feet follow ground slope up to this angle, then stop tilting further.
pub const DEFAULT_MAX_ADAPT_ANGLE: f32 = 45.0;

// Body placement.
pub const DEFAULT_MAX_BODY_CORRECTION: f32 = 0.5;
pub const DEFAULT_MAX_BODY_RISE: f32 = 0.25;
pub const DEFAULT_STRIDE_RELAXATION: f32 = 0.25;
pub const DEFAULT_BODY_TOLERANCE: f32 = 0.01;
pub const DEFAULT_BODY_SPEED: f32 = 8.0;
pub const DEFAULT_BODY_SMOOTH_TIME: f32 = 0.12;
pub const DEFAULT_CROUCH_BODY_OFFSET: f32 = 0.1;
pub const DEFAULT_CROUCH_SPEED: f32 = 6.0;

// Reset-lerp factors.
pub const DEFAULT_BLEND_IN_SPEED: f32 = 4.0;
pub const DEFAULT_RESET_SPEED: f32 = 4.0;

// Ankle rotation.
pub const DEFAULT_MAX_ANKLE_ANGLE: f32 = 30.0;
pub const DEFAULT_ANKLE_STIFFNESS: f32 = 12.0;
pub const DEFAULT_ANKLE_RELAX_SPEED: f32 = 8.0;

// Ground validity check.
pub const DEFAULT_CHECK_RADIUS: f32 = 0.2;
pub const DEFAULT_CHECK_START_HEIGHT: f32 = 0.5;
pub const DEFAULT_CHECK_DISTANCE: f32 = 0.8;

// Slope lean.
pub const DEFAULT_PHYSICS_DT: f32 = 1.0 / 50.0;
pub const DEFAULT_LEAN_WINDOW: usize = 10;
pub const DEFAULT_UPHILL_LEAN: f32 = 4.0;
pub const DEFAULT_DOWNHILL_LEAN: f32 = 3.0;
pub const DEFAULT_MAX_BEND: f32 = 20.0;
pub const DEFAULT_LEAN_SPEED: f32 = 4.0;
pub const DEFAULT_SHOULDER_COUNTER: f32 = 0.5;

// Move lean.
pub const DEFAULT_MOVE_LEAN_FORWARD: f32 = 2.5;
pub const DEFAULT_MOVE_LEAN_SIDE: f32 = 2.0;
pub const DEFAULT_MAX_MOVE_LEAN: f32 = 10.0;
pub const DEFAULT_KNEEL: f32 = 0.04;
pub const DEFAULT_MOVE_LEAN_SPEED: f32 = 6.0;

// Footsteps.
pub const DEFAULT_STEP_LENGTH: f32 = 0.7;
pub const DEFAULT_STEP_HEIGHT_THRESHOLD: f32 = 0.03;
pub const DEFAULT_STILL_SPEED: f32 = 0.05;
pub const DEFAULT_STILL_TIME: f32 = 0.25;
