//! Per-frame orchestration: one [`FootIkSolver::tick`] turns an animated pose
//! into a ground-adapted one.
//!
//! Order within a tick
//! 0) Validate and probe for ground; emit grounded transitions.
//! 1) Query ground under each foot (cached), synthesize a missing foot.
//! 2) Place the body from both feet's drops.
//! 3) Re-base each leg onto the shifted pose, smooth, adapt rotation.
//! 4) Shift the hips, apply move lean, re-solve the knee hints.
//! 5) Slope lean on the spine, then footstep events.
//!
//! While the solve is inactive (invalid or airborne) the same steps run with
//! zero targets, so weights, offsets and leans fade back to the animated pose.

use crate::body::{BodyBlendState, body_drop_limit, body_target};
use crate::config::{SolverConfig, ValidityMode};
use crate::error::SetupError;
use crate::footstep::{FootstepTracker, SolverEvent, StepInput, grounded_transition};
use crate::grounded::{
    GroundedResult, LayerState, StateExclusion, ValidationInput, validate_and_check_grounded,
};
use crate::hint::{LimbRig, bend_direction, carry_hinge, solve_knee};
use crate::lean::{MoveLeanState, SlopeLeanState};
use crate::leg::{
    ContactKind, LegCache, LegContactResult, LegSmoothingState, NormalWarnings, find_new_ik_pos,
};
use crate::pose::{LegPose, Pose, RestLeg};
use crate::query::GroundQuery;
use crate::rotation::{adapt_rotation, apply_rotation};
use crate::settings::{EVENT_CAPACITY, MIN_FOOT_EXTENT};
use crate::types::{RootFrame, Side, Vec3};

/// Host inputs for one tick.
#[derive(Clone, Copy, Debug)]
pub struct TickInput<'a> {
    /// Seconds since the previous tick. Non-finite or negative values count as zero.
    pub dt: f32,
    pub root: RootFrame,
    pub validity: ValidityMode,
    /// Lowers the body by `BodyConfig::crouch_offset`.
    pub is_crouching: bool,
    /// Scales slope and move lean, normally in `[0, 1]`.
    pub leaning_strength: f32,
    /// Current animation states, matched against the solver's exclusions.
    pub layer_states: &'a [LayerState],
}

impl TickInput<'static> {
    pub fn new(dt: f32, root: RootFrame) -> Self {
        Self {
            dt,
            root,
            validity: ValidityMode::Check,
            is_crouching: false,
            leaning_strength: 1.0,
            layer_states: &[],
        }
    }
}

/// Builds a [`FootIkSolver`] from a config and both legs' rest poses.
#[derive(Clone, Debug)]
pub struct SolverBuilder {
    config: SolverConfig,
    legs: [Option<RestLeg>; 2],
    exclusions: Vec<StateExclusion>,
}

impl SolverBuilder {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            legs: [None; 2],
            exclusions: Vec::new(),
        }
    }

    /// Rest pose of one leg, relative to the root.
    pub fn leg(mut self, side: Side, rest: RestLeg) -> Self {
        self.legs[side.index()] = Some(rest);
        self
    }

    /// Turn the solver off while an animation state is active.
    pub fn exclude(mut self, rule: StateExclusion) -> Self {
        self.exclusions.push(rule);
        self
    }

    pub fn build(self) -> Result<FootIkSolver, SetupError> {
        let mut rigs = [None; 2];
        for side in Side::BOTH {
            let rest = self.legs[side.index()].ok_or(SetupError::MissingLeg(side))?;
            rigs[side.index()] = Some(LimbRig::from_rest(side, &rest.thigh, &rest.knee, &rest.ankle)?);
        }
        let [Some(left), Some(right)] = rigs else {
            return Err(SetupError::MissingLeg(Side::Left));
        };

        let config = self.config.sanitized();
        if config != self.config {
            log::debug!("solver config adjusted to valid ranges");
        }
        log::info!(
            "foot ik solver ready: legs {:.3}/{:.3} m, {} exclusions",
            left.upper + left.lower,
            right.upper + right.lower,
            self.exclusions.len()
        );

        Ok(FootIkSolver {
            config,
            legs: [LegState::new(left), LegState::new(right)],
            body: BodyBlendState::default(),
            grounded: GroundedResult::invalid(),
            body_offset: Vec3::zeros(),
            prev_root: None,
            was_active: false,
            footsteps: FootstepTracker::default(),
            slope_lean: SlopeLeanState::default(),
            move_lean: MoveLeanState::default(),
            warnings: NormalWarnings::default(),
            exclusions: self.exclusions,
            events: Vec::with_capacity(EVENT_CAPACITY),
        })
    }
}

#[derive(Clone, Copy, Debug)]
struct LegState {
    rig: LimbRig,
    cache: LegCache,
    smoothing: LegSmoothingState,
    contact: LegContactResult,
}

impl LegState {
    fn new(rig: LimbRig) -> Self {
        Self {
            rig,
            cache: LegCache::default(),
            smoothing: LegSmoothingState::default(),
            contact: LegContactResult::no_contact(Vec3::zeros(), Vec3::zeros(), Vec3::y()),
        }
    }

    /// Segment lengths of the animated leg, falling back to the rest rig.
    fn lengths(&self, animated: &LegPose) -> (f32, f32) {
        let upper = (animated.hint_position - animated.thigh_position).norm();
        let lower = (animated.ik_position - animated.hint_position).norm();
        if upper.is_finite() && lower.is_finite() && upper > MIN_FOOT_EXTENT && lower > MIN_FOOT_EXTENT {
            (upper, lower)
        } else {
            (self.rig.upper, self.rig.lower)
        }
    }
}

/// Foot and body ground adaptation for one two-legged character.
#[derive(Debug)]
pub struct FootIkSolver {
    config: SolverConfig,
    legs: [LegState; 2],
    body: BodyBlendState,
    grounded: GroundedResult,
    body_offset: Vec3,
    prev_root: Option<Vec3>,
    was_active: bool,
    footsteps: FootstepTracker,
    slope_lean: SlopeLeanState,
    move_lean: MoveLeanState,
    warnings: NormalWarnings,
    exclusions: Vec<StateExclusion>,
    events: Vec<SolverEvent>,
}

impl FootIkSolver {
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Replace the config. Cached foot queries rerun on the next tick.
    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config.sanitized();
    }

    /// Result of this tick's validity and ground check.
    pub fn grounded(&self) -> &GroundedResult {
        &self.grounded
    }

    /// World-space body offset applied this tick.
    pub fn body_offset(&self) -> Vec3 {
        self.body_offset
    }

    /// Ground contact of one foot this tick, after the body re-base.
    pub fn contact(&self, side: Side) -> &LegContactResult {
        &self.legs[side.index()].contact
    }

    /// Smoothed lift of one foot above the body-shifted animated pose.
    pub fn leg_offset(&self, side: Side) -> Vec3 {
        self.legs[side.index()].smoothing.offset
    }

    pub fn feet_weight(&self) -> f32 {
        self.body.feet_weight(&self.config.body)
    }

    pub fn body_weight(&self) -> f32 {
        self.body.body_weight(&self.config.body)
    }

    /// Current spine lean from slope (degrees, positive is forward).
    pub fn slope_lean_degrees(&self) -> f32 {
        self.slope_lean.lean
    }

    /// Current move lean as (pitch, roll) in degrees.
    pub fn move_lean(&self) -> (f32, f32) {
        (self.move_lean.pitch, self.move_lean.roll)
    }

    /// Foot that started the latest footstep.
    pub fn last_footstep(&self) -> Option<Side> {
        self.footsteps.last_step()
    }

    /// Events produced by the latest tick.
    pub fn events(&self) -> &[SolverEvent] {
        &self.events
    }

    /// Forget all smoothing and cached ground, e.g. after a teleport.
    pub fn reset(&mut self) {
        for leg in &mut self.legs {
            *leg = LegState::new(leg.rig);
        }
        self.body = BodyBlendState::default();
        self.grounded = GroundedResult::invalid();
        self.body_offset = Vec3::zeros();
        self.prev_root = None;
        self.was_active = false;
        self.footsteps = FootstepTracker::default();
        self.slope_lean.reset();
        self.move_lean.reset();
        self.events.clear();
    }

    /// Adapt `pose` (animated, world space) to the ground for one tick.
    ///
    /// Returns this tick's events.
    pub fn tick(&mut self, query: &impl GroundQuery, input: &TickInput<'_>, pose: &mut Pose) -> &[SolverEvent] {
        let cfg = self.config;
        let dt = if input.dt.is_finite() { input.dt.max(0.0) } else { 0.0 };
        let root = &input.root;
        let up = root.up();
        self.events.clear();

        // 0) Validity and ground presence.
        let grounded = validate_and_check_grounded(
            query,
            &cfg.ground_check,
            &ValidationInput {
                root,
                prev_position: self.prev_root,
                dt,
                mode: input.validity,
                exclusions: &self.exclusions,
                states: input.layer_states,
            },
        );
        let active = grounded.is_active();
        grounded_transition(self.was_active, &grounded, &mut self.events);
        if active != self.was_active {
            log::debug!(
                "foot ik {} (valid: {}, grounded: {})",
                if active { "engaged" } else { "reverting" },
                grounded.is_valid,
                grounded.is_grounded
            );
            if !active {
                for leg in &mut self.legs {
                    leg.smoothing.settle();
                }
            }
        }
        self.body.update_factors(active, &cfg.body, dt);

        let animated = pose.legs;

        // 1) Ground under each foot.
        let contacts = if active {
            self.find_contacts(query, root, &animated)
        } else {
            Side::BOTH.map(|side| {
                let ik = animated[side.index()].ik_position;
                LegContactResult::no_contact(ik, ik - up * root.height_of(&ik), up)
            })
        };

        // 2) Body placement.
        let limit = body_drop_limit(&contacts, &root.forward(), &cfg.body);
        let target = if active {
            body_target(&contacts, &up, self.body.applied, limit, &cfg.body)
        } else {
            0.0
        };
        let body = self.body.blend(target, input.is_crouching, limit, &cfg.body, dt);
        let body_shift = up * body;

        // 3) Legs.
        let weight = self.body.feet_weight(&cfg.body);
        for side in Side::BOTH {
            let i = side.index();
            let leg = &mut self.legs[i];
            let mut contact = contacts[i];
            contact.rebase(body, &up, cfg.foot.max_correction);

            let lift = contact.ik_pos - (contact.animated_ik + body_shift);
            let offset = leg.smoothing.update(lift, &up, &cfg.foot, dt);
            adapt_rotation(&mut leg.smoothing.delta_rotation, &contact, &up, &cfg.ankle, active, dt);

            let out = &mut pose.legs[i];
            out.ik_position = animated[i].ik_position + body_shift + offset;
            out.ik_rotation = apply_rotation(&leg.smoothing.delta_rotation, &animated[i].ik_rotation);
            out.ik_weight = weight;
            out.thigh_position = animated[i].thigh_position + body_shift;
            leg.contact = contact;
        }
        pose.hip_position += body_shift;
        self.body_offset = body_shift;

        // 4) Move lean around the root, then knee hints for the final hip.
        let lean_strength = input.leaning_strength * self.body.body_factor;
        self.move_lean.update(root, &cfg.move_lean, lean_strength, dt);
        if self.move_lean.is_leaning() {
            let tip = self.move_lean.rotation(root);
            pose.hip_position = self.move_lean.lean_point(&pose.hip_position, root, &cfg.move_lean);
            pose.hip_rotation = tip * pose.hip_rotation;
            for leg in &mut pose.legs {
                leg.thigh_position = self.move_lean.lean_point(&leg.thigh_position, root, &cfg.move_lean);
            }
        }
        for side in Side::BOTH {
            let i = side.index();
            let state = &self.legs[i];
            let from = &animated[i];
            let (upper, lower) = state.lengths(from);
            let hinge = bend_direction(&from.thigh_position, &from.hint_position, &from.ik_position)
                .unwrap_or_else(|| root.rotation * state.rig.rest_hinge);
            let out = &mut pose.legs[i];
            let hinge = carry_hinge(
                &(from.thigh_position - from.ik_position),
                &(out.thigh_position - out.ik_position),
                &hinge,
            );
            out.hint_position = solve_knee(&out.thigh_position, &out.ik_position, upper, lower, &hinge);
        }

        // 5) Slope lean and footsteps.
        self.slope_lean.update(&grounded, root, &cfg.lean, lean_strength, dt);
        self.slope_lean.apply(&mut pose.spine, &mut pose.shoulders, &cfg.lean);

        if active && cfg.footstep.enabled {
            let contacts = [self.legs[0].contact, self.legs[1].contact];
            self.footsteps.update(
                &StepInput {
                    contacts: &contacts,
                    feet: [pose.legs[0].ik_position, pose.legs[1].ik_position],
                    root,
                    dt,
                },
                &cfg.footstep,
                &mut self.events,
            );
        } else {
            self.footsteps.release(&mut self.events);
        }

        self.grounded = grounded;
        self.prev_root = Some(root.position);
        self.was_active = active;
        &self.events
    }

    fn find_contacts(&mut self, query: &impl GroundQuery, root: &RootFrame, animated: &[LegPose; 2]) -> [LegContactResult; 2] {
        let cfg = &self.config.foot;
        let up = root.up();
        let warnings = &mut self.warnings;
        let mut contacts = Side::BOTH.map(|side| {
            let leg = &mut self.legs[side.index()];
            let ik = animated[side.index()].ik_position;
            if leg.cache.needs_recompute(query, cfg, &ik) {
                let result = find_new_ik_pos(query, cfg, root, ik, warnings);
                leg.cache.store(query, cfg, result);
                result
            } else {
                match leg.cache.result() {
                    Some(cached) => *cached,
                    None => LegContactResult::no_contact(ik, ik - up * root.height_of(&ik), up),
                }
            }
        });

        for side in Side::BOTH {
            let (i, o) = (side.index(), side.other().index());
            if contacts[i].kind == ContactKind::None && contacts[o].kind == ContactKind::Ground {
                log::trace!("{side:?} foot found no ground, following the other foot");
                let missing = contacts[i];
                contacts[i] =
                    LegContactResult::synthesize_from(&contacts[o], missing.animated_ik, missing.bottom_point, up);
            }
        }
        contacts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestGround;

    const DT: f32 = 1.0 / 60.0;
    const UPPER_REST: (f32, f32) = (0.95, 0.52);

    fn rest(x: f32) -> RestLeg {
        RestLeg {
            thigh: Vec3::new(x, UPPER_REST.0, 0.0),
            knee: Vec3::new(x, UPPER_REST.1, 0.08),
            ankle: Vec3::new(x, 0.1, 0.0),
        }
    }

    fn solver(config: SolverConfig) -> FootIkSolver {
        SolverBuilder::new(config)
            .leg(Side::Left, rest(0.1))
            .leg(Side::Right, rest(-0.1))
            .build()
            .unwrap()
    }

    /// Animated standing pose at `root` (identity rotation), feet `stride` apart along +Z.
    fn standing(root: &RootFrame, stride: f32) -> Pose {
        let mut pose = Pose {
            hip_position: root.position + Vec3::new(0.0, UPPER_REST.0, 0.0),
            ..Pose::default()
        };
        for (side, x, z) in [(Side::Left, 0.1, stride * 0.5), (Side::Right, -0.1, -stride * 0.5)] {
            let r = rest(x);
            let rig = LimbRig::from_rest(side, &r.thigh, &r.knee, &r.ankle).unwrap();
            let thigh = root.position + r.thigh;
            let ankle = root.position + Vec3::new(x, 0.1, z);
            let leg = pose.leg_mut(side);
            leg.thigh_position = thigh;
            leg.ik_position = ankle;
            leg.hint_position = solve_knee(&thigh, &ankle, rig.upper, rig.lower, &Vec3::z());
        }
        pose
    }

    fn run(solver: &mut FootIkSolver, ground: &TestGround, root: RootFrame, stride: f32, ticks: usize) -> Pose {
        let mut out = standing(&root, stride);
        for _ in 0..ticks {
            out = standing(&root, stride);
            solver.tick(ground, &TickInput::new(DT, root), &mut out);
        }
        out
    }

    fn assert_triangle(pose: &Pose, animated: &Pose) {
        for side in Side::BOTH {
            let (a, b) = (animated.leg(side), pose.leg(side));
            let upper = (a.hint_position - a.thigh_position).norm();
            let lower = (a.ik_position - a.hint_position).norm();
            assert!(((b.hint_position - b.thigh_position).norm() - upper).abs() < 1.0e-3, "{side:?} upper");
            assert!(((b.ik_position - b.hint_position).norm() - lower).abs() < 1.0e-3, "{side:?} lower");
        }
    }

    #[test]
    fn builder_requires_both_legs() {
        let err = SolverBuilder::new(SolverConfig::default())
            .leg(Side::Left, rest(0.1))
            .build()
            .unwrap_err();
        assert_eq!(err, SetupError::MissingLeg(Side::Right));
    }

    #[test]
    fn flat_ground_leaves_pose_untouched() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::flat(0.0);
        let root = RootFrame::default();
        let animated = standing(&root, 0.2);
        let out = run(&mut s, &ground, root, 0.2, 120);

        for side in Side::BOTH {
            let (a, b) = (animated.leg(side), out.leg(side));
            assert!((a.ik_position - b.ik_position).norm() < 1.0e-4);
            assert!((a.hint_position - b.hint_position).norm() < 1.0e-3);
            assert!(s.contact(side).is_glued);
            assert_eq!(b.ik_weight, 1.0);
        }
        assert!((out.hip_position - animated.hip_position).norm() < 1.0e-4);
        assert_eq!(out.spine, animated.spine);
        assert!(s.body_offset().norm() < 1.0e-4);
    }

    #[test]
    fn ramp_30_glues_both_feet_and_drops_body() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::ramp(30.0);
        let root = RootFrame::default();
        let animated = standing(&root, 0.2);
        let out = run(&mut s, &ground, root, 0.2, 300);

        let tan = 30f32.to_radians().tan();
        assert!((s.body_offset().y + 0.1 * tan).abs() < 2.0e-3, "body {}", s.body_offset().y);
        for side in Side::BOTH {
            let c = s.contact(side);
            assert!(c.is_glued, "{side:?} not glued");
            let lift = (out.leg(side).ik_position - animated.leg(side).ik_position - s.body_offset()).y;
            assert!(lift >= -1.0e-4);
            assert!(lift <= s.config().foot.max_correction + 1.0e-4);
        }
        // Uphill (left, +Z) foot ends higher than the downhill one.
        assert!(out.leg(Side::Left).ik_position.y > out.leg(Side::Right).ik_position.y + 0.05);
        assert_triangle(&out, &animated);
    }

    #[test]
    fn steep_ramp_85_is_not_corrected() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::ramp(85.0);
        let root = RootFrame::default();
        let animated = standing(&root, 0.2);
        let out = run(&mut s, &ground, root, 0.2, 120);

        for side in Side::BOTH {
            assert_eq!(s.contact(side).kind, ContactKind::None);
            assert!(!s.contact(side).is_glued);
            assert!((out.leg(side).ik_position - animated.leg(side).ik_position).norm() < 1.0e-5);
        }
        assert_eq!(s.body_offset(), Vec3::zeros());
    }

    #[test]
    fn missing_foot_follows_the_other() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::default().with_plane(
            Vec3::new(0.0, 0.1, 0.0),
            Vec3::y(),
            Some((0.0, 10.0, -10.0, 10.0)),
        );
        let root = RootFrame::default();
        let animated = standing(&root, 0.0);
        let out = run(&mut s, &ground, root, 0.0, 240);

        assert_eq!(s.contact(Side::Left).kind, ContactKind::Ground);
        assert_eq!(s.contact(Side::Right).kind, ContactKind::Synthesized);
        assert!(!s.contact(Side::Right).is_glued);
        let lift = |side| (out.leg(side).ik_position - animated.leg(side).ik_position).y;
        assert!((lift(Side::Left) - 0.1).abs() < 2.0e-3);
        assert!((lift(Side::Right) - lift(Side::Left)).abs() < 1.0e-3);
    }

    #[test]
    fn step_up_respects_clamp_and_glue_every_tick() {
        let mut s = solver(SolverConfig::default());
        let max = s.config().foot.max_correction + s.config().foot.height;
        let ground = TestGround::default()
            .with_plane(Vec3::zeros(), Vec3::y(), Some((-10.0, 10.0, -10.0, 1.0)))
            .with_plane(Vec3::new(0.0, 0.3, 0.0), Vec3::y(), Some((-10.0, 10.0, 1.0, 10.0)));

        for tick in 0..180 {
            let root = RootFrame::at(Vec3::new(0.0, 0.0, tick as f32 * DT));
            let animated = standing(&root, 0.3);
            let mut pose = animated;
            s.tick(&ground, &TickInput::new(DT, root), &mut pose);
            for side in Side::BOTH {
                assert!(s.leg_offset(side).norm() <= max + 1.0e-5);
                let above = (pose.leg(side).ik_position - animated.leg(side).ik_position - s.body_offset()).y;
                assert!(above >= -1.0e-5, "tick {tick} {side:?} pushed down by {above}");
            }
        }
        // Both feet ended up on the step.
        assert!(s.contact(Side::Left).is_glued && s.contact(Side::Right).is_glued);
        assert!(s.leg_offset(Side::Left).y > 0.25);
    }

    #[test]
    fn revert_fades_everything_out() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::flat(-0.2);
        let root = RootFrame::default();
        run(&mut s, &ground, root, 0.0, 180);
        assert!((s.body_offset().y + 0.2).abs() < 2.0e-3);

        let animated = standing(&root, 0.0);
        let mut input = TickInput::new(DT, root);
        input.validity = ValidityMode::ForceInvalid;

        let mut pose = animated;
        let events = s.tick(&ground, &input, &mut pose).to_vec();
        assert!(events.contains(&SolverEvent::GroundedExited));

        let (mut weight, mut body) = (s.feet_weight(), s.body_offset().norm());
        let ticks = (1.0 / (s.config().body.reset_speed * DT)).ceil() as usize + 60;
        for _ in 0..ticks {
            pose = animated;
            s.tick(&ground, &input, &mut pose);
            assert!(s.feet_weight() <= weight);
            assert!(s.body_offset().norm() <= body + 1.0e-6);
            weight = s.feet_weight();
            body = s.body_offset().norm();
        }
        assert_eq!(weight, 0.0);
        assert_eq!(body, 0.0);
        for side in Side::BOTH {
            assert_eq!(pose.leg(side).ik_weight, 0.0);
            assert!((pose.leg(side).ik_position - animated.leg(side).ik_position).norm() < 1.0e-3);
        }
    }

    #[test]
    fn excluded_state_turns_solver_off() {
        let mut s = SolverBuilder::new(SolverConfig::default())
            .leg(Side::Left, rest(0.1))
            .leg(Side::Right, rest(-0.1))
            .exclude(StateExclusion {
                layer: 0,
                state_hash: 42,
            })
            .build()
            .unwrap();
        let ground = TestGround::flat(0.0);
        let root = RootFrame::default();
        let states = [LayerState {
            layer: 0,
            current_hash: 42,
            next_hash: None,
        }];
        let input = TickInput {
            layer_states: &states,
            ..TickInput::new(DT, root)
        };
        let mut pose = standing(&root, 0.0);
        s.tick(&ground, &input, &mut pose);
        assert!(!s.grounded().is_valid);
        assert!(s.grounded().is_grounded);
        assert_eq!(s.feet_weight(), 0.0);
    }

    #[test]
    fn walking_fires_alternating_footsteps() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::flat(0.0);
        let mut starts = Vec::new();
        let mut entered = 0;
        for tick in 0..600 {
            let root = RootFrame::at(Vec3::new(0.0, 0.0, tick as f32 * DT * 1.4));
            let mut pose = standing(&root, 0.0);
            for e in s.tick(&ground, &TickInput::new(DT, root), &mut pose) {
                match e {
                    SolverEvent::FootstepStart { side, contact } => {
                        assert!(contact.is_glued);
                        starts.push(*side);
                    }
                    SolverEvent::GroundedEntered(_) => entered += 1,
                    _ => {}
                }
            }
        }
        assert_eq!(entered, 1);
        assert!((17..=20).contains(&starts.len()), "{} steps", starts.len());
        assert!(starts.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn move_lean_keeps_leg_lengths() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::flat(0.0);
        let root_at = |tick: usize| RootFrame::at(Vec3::new(0.0, 0.0, tick as f32 * DT * 3.0));
        for tick in 0..179 {
            let root = root_at(tick);
            let mut pose = standing(&root, 0.0);
            s.tick(&ground, &TickInput::new(DT, root), &mut pose);
        }
        let root = root_at(179);
        let animated = standing(&root, 0.0);
        let mut pose = animated;
        s.tick(&ground, &TickInput::new(DT, root), &mut pose);
        let (pitch, _) = s.move_lean();
        assert!(pitch > 1.0);
        assert!(pose.hip_position.y < animated.hip_position.y);
        assert!(pose.hip_rotation.angle() > 0.0);
        assert_triangle(&pose, &animated);
    }

    #[test]
    fn set_config_sanitizes() {
        let mut s = solver(SolverConfig::default());
        let mut cfg = *s.config();
        cfg.foot.raise_speed = -3.0;
        cfg.foot.length = 0.0;
        s.set_config(cfg);
        assert_eq!(s.config().foot.raise_speed, 0.0);
        assert_eq!(s.config().foot.length, MIN_FOOT_EXTENT);
    }

    #[test]
    fn config_change_reruns_queries() {
        let mut s = solver(SolverConfig::default());
        let ground = TestGround::flat(0.12);
        let root = RootFrame::default();
        run(&mut s, &ground, root, 0.0, 60);
        assert!(s.contact(Side::Left).is_glued);

        let mut cfg = *s.config();
        cfg.foot.max_correction = 0.01;
        s.set_config(cfg);
        run(&mut s, &ground, root, 0.0, 2);
        // 0.12 m is now out of reach.
        assert!(!s.contact(Side::Left).is_glued);
    }
}
