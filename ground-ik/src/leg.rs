//! Leg correction engine: per-foot ground detection, clamping and smoothing.
//!
//! Each tick, for each foot:
//! 1. Sweep an oriented foot box down from above the animated foot, and a
//!    thinner sphere under the ankle for slope refinement.
//! 2. Reconcile the two normal estimates, reject too-steep ground, and place the
//!    ankle above the surface directly under it.
//! 3. Clamp so the foot only ever moves up from its animated position, by at most
//!    `max_correction`; note whether it actually rests on ground (`is_glued`).
//! 4. After the body placement is known, re-base onto the body-shifted pose and
//!    smooth the resulting lift into persistent per-leg state.

use std::collections::HashSet;

use crate::config::{FootConfig, SmoothingMode};
use crate::math::{angle_between, blend, clamp_length, limit_tilt, line_plane, smooth_damp_vec};
use crate::query::{GroundQuery, ShapeHit};
use crate::settings::{DIST_EPS, GLUE_TOLERANCE, NORMAL_AGREEMENT_DEG};
use crate::types::{GroundRef, Iso, Quat, RootFrame, Vec3};

/// Where a leg's ground information came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContactKind {
    /// No usable ground under this foot.
    #[default]
    None,
    /// Found by this foot's own queries.
    Ground,
    /// Copied from the other foot because this one found nothing.
    Synthesized,
}

/// Per-foot outcome of the ground query and clamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegContactResult {
    /// Animated ankle position this result was computed from.
    pub animated_ik: Vec3,
    /// Corrected ankle target after clamping.
    pub ik_pos: Vec3,
    /// Ankle position that exactly follows the ground (unclamped).
    pub glued_ik_pos: Vec3,
    /// The corrected foot currently rests on detected ground.
    pub is_glued: bool,
    /// Animated ankle projected down to the root's ground level.
    pub bottom_point: Vec3,
    /// Ground surface directly under the ankle.
    pub surface_point: Vec3,
    /// Ground normal, limited to `max_adapt_angle` from up.
    pub normal: Vec3,
    pub kind: ContactKind,
    /// Collider hit by the foot box.
    pub primary_hit: Option<GroundRef>,
    /// Collider hit by the refinement sphere.
    pub secondary_hit: Option<GroundRef>,
}

impl LegContactResult {
    /// The "use the original pose" result.
    pub fn no_contact(animated_ik: Vec3, bottom_point: Vec3, up: Vec3) -> Self {
        Self {
            animated_ik,
            ik_pos: animated_ik,
            glued_ik_pos: animated_ik,
            is_glued: false,
            bottom_point,
            surface_point: bottom_point,
            normal: up,
            kind: ContactKind::None,
            primary_hit: None,
            secondary_hit: None,
        }
    }

    #[inline]
    pub fn has_ground(&self) -> bool {
        self.kind != ContactKind::None
    }

    /// Signed distance from the animated ankle up to the ground-following ankle.
    #[inline]
    pub fn lift(&self, up: &Vec3) -> f32 {
        (self.glued_ik_pos - self.animated_ik).dot(up)
    }

    /// Signed height of the surface above the foot's ground-level bottom point.
    #[inline]
    pub fn drop(&self, up: &Vec3) -> f32 {
        (self.surface_point - self.bottom_point).dot(up)
    }

    /// Stand in for a foot that found nothing, moving it with `other`.
    ///
    /// The missing foot copies the other foot's vertical offsets so both legs move
    /// together instead of splitting apart. The result never counts as glued.
    pub fn synthesize_from(other: &LegContactResult, animated_ik: Vec3, bottom_point: Vec3, up: Vec3) -> Self {
        let lift = other.lift(&up);
        let drop = other.drop(&up);
        Self {
            animated_ik,
            ik_pos: animated_ik + up * lift.max(0.0),
            glued_ik_pos: animated_ik + up * lift,
            is_glued: false,
            bottom_point,
            surface_point: bottom_point + up * drop,
            normal: up,
            kind: ContactKind::Synthesized,
            primary_hit: None,
            secondary_hit: None,
        }
    }

    /// Re-evaluate the clamp against the pose shifted by the body offset.
    ///
    /// Once the hip moves by `body_offset` along up, the animated foot moves with
    /// it; the foot is then lifted by `clamp(lift - body_offset, 0, max_correction)`.
    pub fn rebase(&mut self, body_offset: f32, up: &Vec3, max_correction: f32) {
        let base = self.animated_ik + up * body_offset;
        if !self.has_ground() {
            self.ik_pos = base;
            self.is_glued = false;
            return;
        }
        let h = self.lift(up) - body_offset;
        let (lift, glued) = if h < -GLUE_TOLERANCE {
            (0.0, false)
        } else if h > max_correction {
            (max_correction, false)
        } else {
            (h.max(0.0), true)
        };
        self.ik_pos = base + up * lift;
        self.is_glued = glued && self.kind == ContactKind::Ground;
    }
}

/// Remembers which colliders already produced a non-finite normal.
#[derive(Debug, Default)]
pub struct NormalWarnings {
    seen: HashSet<GroundRef>,
}

impl NormalWarnings {
    /// Log once per collider; returns `true` the first time.
    pub fn warn(&mut self, handle: GroundRef) -> bool {
        if self.seen.insert(handle) {
            log::warn!("collider {handle:?} returned a non-finite ground normal; treating it as flat");
            true
        } else {
            false
        }
    }
}

#[inline]
fn finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Unit normal facing `up`, or `None` if degenerate.
fn facing_up(n: &Vec3, up: &Vec3) -> Option<Vec3> {
    if !finite(n) || n.norm_squared() <= DIST_EPS {
        return None;
    }
    let n = n.normalize();
    Some(if n.dot(up) < 0.0 { -n } else { n })
}

/// Normal of the slope through two contact points, facing up.
///
/// The line between the points is assumed to lie in the surface; the normal is
/// the direction perpendicular to it within the vertical plane that contains it.
fn normal_from_points(a: &Vec3, b: &Vec3, up: &Vec3) -> Option<Vec3> {
    let along = b - a;
    if along.norm_squared() <= 1.0e-6 {
        return None;
    }
    let side = along.cross(up);
    if side.norm_squared() <= 1.0e-8 {
        return None;
    }
    facing_up(&side.cross(&along), up)
}

/// Pick one normal from the box and sphere estimates.
///
/// Estimates that agree within `NORMAL_AGREEMENT_DEG` keep the box normal.
/// Otherwise candidates are the sphere normal and a normal rebuilt from the two
/// contact points, and the one closest to up wins; the box normal still wins if
/// it is shallower than both.
fn reconcile(box_hit: &ShapeHit, box_normal: Vec3, sphere: Option<(&ShapeHit, Vec3)>, up: &Vec3) -> Vec3 {
    let Some((sphere_hit, sphere_normal)) = sphere else {
        return box_normal;
    };
    let box_angle = angle_between(&box_normal, up);
    let sphere_angle = angle_between(&sphere_normal, up);
    if (box_angle - sphere_angle).abs() <= NORMAL_AGREEMENT_DEG.to_radians() {
        return box_normal;
    }

    let mut best = sphere_normal;
    let mut best_angle = sphere_angle;
    if let Some(rebuilt) = normal_from_points(&box_hit.point, &sphere_hit.point, up) {
        let a = angle_between(&rebuilt, up);
        if a < best_angle {
            best = rebuilt;
            best_angle = a;
        }
    }
    if box_angle < best_angle {
        best = box_normal;
    }
    best
}

/// Find the corrected ankle target for one foot.
///
/// `animated_ik` is the animated ankle (IK target) in world space. Returns the
/// no-contact result when nothing usable is below the foot.
pub fn find_new_ik_pos(
    query: &impl GroundQuery,
    cfg: &FootConfig,
    root: &RootFrame,
    animated_ik: Vec3,
    warnings: &mut NormalWarnings,
) -> LegContactResult {
    let up = root.up();
    let down = -up;
    let bottom = animated_ik - up * root.height_of(&animated_ik);
    let no_contact = LegContactResult::no_contact(animated_ik, bottom, up);

    // The highest correctable sole height, plus margin, is where sweeps begin.
    let lift = cfg.max_correction + cfg.height + cfg.ray_margin;
    let reach = lift + cfg.max_correction;

    let half = Vec3::new(cfg.width * 0.5, cfg.height * 0.5, cfg.length * 0.5);
    let box_center = bottom + up * (lift + half.y) + root.forward() * cfg.forward_bias;
    let box_pose: Iso = root.iso_at(box_center);
    let Some(box_hit) = query.cast_box(&box_pose, &half, &down, reach) else {
        return no_contact;
    };

    let box_normal = match facing_up(&box_hit.normal, &up) {
        Some(n) => n,
        None => {
            warnings.warn(box_hit.handle);
            up
        }
    };

    let radius = cfg.width * 0.5;
    let sphere_start = bottom + up * (lift + radius);
    let sphere_hit = query.cast_sphere(&sphere_start, radius, &down, reach);
    let sphere = sphere_hit
        .as_ref()
        .and_then(|h| facing_up(&h.normal, &up).map(|n| (h, n)));

    let normal = reconcile(&box_hit, box_normal, sphere, &up);
    let slope = angle_between(&normal, &up);
    if !slope.is_finite() || slope > cfg.max_ground_angle.to_radians() {
        log::trace!("foot ground rejected: slope {:.1} deg", slope.to_degrees());
        return no_contact;
    }
    let adapted = limit_tilt(&normal, &up, cfg.max_adapt_angle.to_radians());
    let adapt_angle = angle_between(&adapted, &up);

    // Surface under the ankle on the plane found by the box.
    let box_height = lift - box_hit.distance;
    let mut surface = line_plane(&bottom, &up, &box_hit.point, &normal)
        .filter(|s| (s - bottom).dot(&up) <= box_height + DIST_EPS)
        .unwrap_or(bottom + up * box_height);

    // The sphere may see a higher point right under the ankle.
    if let Some((hit, n)) = sphere {
        if let Some(s) = line_plane(&bottom, &up, &hit.point, &n) {
            let h = (s - bottom).dot(&up);
            if h > (surface - bottom).dot(&up) && h <= lift && h >= -cfg.max_correction {
                surface = s;
            }
        }
    }

    let glued = surface + up * (cfg.height / adapt_angle.cos());
    let h = (glued - animated_ik).dot(&up);
    let (ik_pos, is_glued) = if h < -GLUE_TOLERANCE {
        (animated_ik, false)
    } else if h > cfg.max_correction {
        (animated_ik + up * cfg.max_correction, false)
    } else {
        (animated_ik + up * h.max(0.0), true)
    };

    LegContactResult {
        animated_ik,
        ik_pos,
        glued_ik_pos: glued,
        is_glued,
        bottom_point: bottom,
        surface_point: surface,
        normal: adapted,
        kind: ContactKind::Ground,
        primary_hit: Some(box_hit.handle),
        secondary_hit: sphere_hit.map(|h| h.handle),
    }
}

/// Caches a leg's last query so it only reruns when something changed.
#[derive(Clone, Copy, Debug, Default)]
pub struct LegCache {
    result: Option<LegContactResult>,
    config: Option<FootConfig>,
    ground_pose: Option<Iso>,
}

impl LegCache {
    /// Whether the foot moved, the config changed, or the ground moved since the last query.
    pub fn needs_recompute(&self, query: &impl GroundQuery, cfg: &FootConfig, animated_ik: &Vec3) -> bool {
        let Some(prev) = self.result.as_ref() else {
            return true;
        };
        if self.config.as_ref() != Some(cfg) {
            return true;
        }
        if (animated_ik - prev.animated_ik).norm() > cfg.recompute_distance {
            return true;
        }
        match prev.primary_hit {
            Some(handle) => query.ground_pose(handle) != self.ground_pose,
            None => false,
        }
    }

    pub fn store(&mut self, query: &impl GroundQuery, cfg: &FootConfig, result: LegContactResult) {
        self.ground_pose = result.primary_hit.and_then(|h| query.ground_pose(h));
        self.config = Some(*cfg);
        self.result = Some(result);
    }

    pub fn result(&self) -> Option<&LegContactResult> {
        self.result.as_ref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Persistent per-leg smoothing state.
#[derive(Clone, Copy, Debug)]
pub struct LegSmoothingState {
    /// Current smoothed lift applied on top of the body-shifted animated foot.
    pub offset: Vec3,
    /// Overshoot while moving to higher ground.
    pub extrapolation: Vec3,
    /// Spring velocity for [`SmoothingMode::CriticallyDamped`].
    pub velocity: Vec3,
    /// Accumulated ankle rotation toward the ground normal.
    pub delta_rotation: Quat,
    last_target: Vec3,
}

impl Default for LegSmoothingState {
    fn default() -> Self {
        Self {
            offset: Vec3::zeros(),
            extrapolation: Vec3::zeros(),
            velocity: Vec3::zeros(),
            delta_rotation: Quat::identity(),
            last_target: Vec3::zeros(),
        }
    }
}

impl LegSmoothingState {
    /// Move the smoothed offset toward `target` (a lift along `up`) and return it.
    ///
    /// Invariants after the call:
    /// - `|offset| <= max_correction + height`
    /// - `offset` is never more than `max_penetration` below `target` along up.
    pub fn update(&mut self, target: Vec3, up: &Vec3, cfg: &FootConfig, dt: f32) -> Vec3 {
        let step = target - self.last_target;
        if step.dot(up) > 0.0 {
            self.extrapolation += step * cfg.extrapolation;
        }
        self.extrapolation *= 1.0 - blend(cfg.extrapolation_decay, dt);
        self.extrapolation = clamp_length(&self.extrapolation, cfg.max_correction * 0.5);

        let goal = target + self.extrapolation;
        self.offset = match cfg.smoothing {
            SmoothingMode::Lerp => {
                let speed = if (goal - self.offset).dot(up) > 0.0 {
                    cfg.raise_speed
                } else {
                    cfg.lower_speed
                };
                self.offset.lerp(&goal, blend(speed, dt))
            }
            SmoothingMode::CriticallyDamped => {
                smooth_damp_vec(&self.offset, &goal, &mut self.velocity, cfg.smooth_time, dt)
            }
        };

        let lag = (target - self.offset).dot(up);
        if lag > cfg.max_penetration {
            self.offset += up * (lag - cfg.max_penetration);
        }
        self.offset = clamp_length(&self.offset, cfg.max_correction + cfg.height);
        self.last_target = target;
        self.offset
    }

    /// Drop the spring state, keeping the current offset and rotation.
    pub fn settle(&mut self) {
        self.velocity = Vec3::zeros();
        self.extrapolation = Vec3::zeros();
    }
}
