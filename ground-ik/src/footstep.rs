//! Solver events: footsteps and grounded transitions.
//!
//! Footsteps alternate. A foot may only start a step if it did not start the
//! previous one, unless the character stood still long enough to unlock both.
//! A step fires once the foot rests near the ground and has travelled at least
//! `step_length` since the last step of either foot.

use crate::config::FootstepConfig;
use crate::grounded::GroundedResult;
use crate::leg::{ContactKind, LegContactResult};
use crate::math::planar_distance;
use crate::settings::MAX_PENDING_FOOTSTEPS;
use crate::types::{RootFrame, Side, Vec3};

/// Something the host may want to react to (sounds, particles, gameplay).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SolverEvent {
    /// A foot touched down. Carries the foot's ground contact at that moment.
    FootstepStart { side: Side, contact: LegContactResult },
    /// A planted foot lifted off.
    FootstepStop { side: Side },
    /// The character became valid and grounded.
    GroundedEntered(GroundedResult),
    /// The character stopped being valid or grounded.
    GroundedExited,
}

/// Emit a grounded transition event when `now` differs from `was`.
pub fn grounded_transition(was_active: bool, now: &GroundedResult, events: &mut Vec<SolverEvent>) {
    match (was_active, now.is_active()) {
        (false, true) => events.push(SolverEvent::GroundedEntered(*now)),
        (true, false) => events.push(SolverEvent::GroundedExited),
        _ => {}
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct StepLeg {
    travelled: f32,
    prev_foot: Option<Vec3>,
    planted: bool,
}

#[derive(Clone, Copy, Debug)]
struct PendingStep {
    side: Side,
    contact: LegContactResult,
    remaining: f32,
}

/// Per-tick inputs for footstep detection.
#[derive(Clone, Copy, Debug)]
pub struct StepInput<'a> {
    pub contacts: &'a [LegContactResult; 2],
    /// Final IK ankle positions this tick.
    pub feet: [Vec3; 2],
    pub root: &'a RootFrame,
    pub dt: f32,
}

/// Persistent footstep detection state.
#[derive(Clone, Debug)]
pub struct FootstepTracker {
    legs: [StepLeg; 2],
    last: Option<Side>,
    still_for: f32,
    prev_root: Option<Vec3>,
    pending: Vec<PendingStep>,
}

impl Default for FootstepTracker {
    fn default() -> Self {
        Self {
            legs: [StepLeg::default(); 2],
            last: None,
            still_for: 0.0,
            prev_root: None,
            pending: Vec::with_capacity(MAX_PENDING_FOOTSTEPS),
        }
    }
}

/// Height of the ankle above its ground-following position, if the foot has real ground.
fn height_above_ground(contact: &LegContactResult, foot: &Vec3, up: &Vec3) -> Option<f32> {
    (contact.kind == ContactKind::Ground).then(|| (foot - contact.glued_ik_pos).dot(up))
}

impl FootstepTracker {
    /// Foot that started the most recent step.
    pub fn last_step(&self) -> Option<Side> {
        self.last
    }

    /// Distance a foot has travelled since the last step.
    pub fn travelled(&self, side: Side) -> f32 {
        self.legs[side.index()].travelled
    }

    /// Steps waiting for their dispatch delay.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn update(&mut self, input: &StepInput<'_>, cfg: &FootstepConfig, events: &mut Vec<SolverEvent>) {
        let dt = input.dt.max(0.0);
        let up = input.root.up();
        self.flush_pending(dt, events);

        let root = input.root.position;
        let speed = match self.prev_root.replace(root) {
            Some(prev) if dt > 0.0 => planar_distance(&prev, &root, &up) / dt,
            _ => 0.0,
        };
        if speed < cfg.still_speed {
            self.still_for += dt;
            if self.still_for >= cfg.still_time && self.last.is_some() {
                log::trace!("footsteps unlocked after standing still");
                self.last = None;
            }
        } else {
            self.still_for = 0.0;
        }

        let mut near = [false; 2];
        for side in Side::BOTH {
            let i = side.index();
            let foot = input.feet[i];
            let leg = &mut self.legs[i];
            if let Some(prev) = leg.prev_foot.replace(foot) {
                leg.travelled += planar_distance(&prev, &foot, &up);
            }

            let height = height_above_ground(&input.contacts[i], &foot, &up);
            near[i] = height.is_some_and(|h| h <= cfg.height_threshold);
            let lifted = height.is_none_or(|h| h > cfg.height_threshold * 2.0);
            if leg.planted && lifted {
                leg.planted = false;
                events.push(SolverEvent::FootstepStop { side });
            }
        }

        let candidate = Side::BOTH
            .into_iter()
            .filter(|&s| Some(s) != self.last)
            .filter(|&s| near[s.index()] && self.legs[s.index()].travelled >= cfg.step_length)
            .fold(None::<Side>, |best, s| match best {
                Some(b) if self.legs[b.index()].travelled >= self.legs[s.index()].travelled => Some(b),
                _ => Some(s),
            });

        if let Some(side) = candidate {
            self.last = Some(side);
            for leg in &mut self.legs {
                leg.travelled = 0.0;
            }
            self.legs[side.index()].planted = true;
            self.dispatch(side, input.contacts[side.index()], cfg.delay, events);
        }
    }

    /// The solve went inactive: planted feet lift, travel restarts and steps
    /// still waiting for their delay are dropped.
    pub fn release(&mut self, events: &mut Vec<SolverEvent>) {
        if !self.pending.is_empty() {
            log::trace!("dropping {} delayed footsteps", self.pending.len());
            self.pending.clear();
        }
        for side in Side::BOTH {
            let leg = &mut self.legs[side.index()];
            if leg.planted {
                events.push(SolverEvent::FootstepStop { side });
            }
            *leg = StepLeg::default();
        }
        self.prev_root = None;
        self.still_for = 0.0;
    }

    fn dispatch(&mut self, side: Side, contact: LegContactResult, delay: f32, events: &mut Vec<SolverEvent>) {
        if delay <= 0.0 {
            events.push(SolverEvent::FootstepStart { side, contact });
            return;
        }
        if self.pending.len() >= MAX_PENDING_FOOTSTEPS {
            let oldest = self.pending.remove(0);
            events.push(SolverEvent::FootstepStart {
                side: oldest.side,
                contact: oldest.contact,
            });
        }
        self.pending.push(PendingStep {
            side,
            contact,
            remaining: delay,
        });
    }

    fn flush_pending(&mut self, dt: f32, events: &mut Vec<SolverEvent>) {
        for p in &mut self.pending {
            p.remaining -= dt;
        }
        while let Some(idx) = self.pending.iter().position(|p| p.remaining <= 0.0) {
            let p = self.pending.remove(idx);
            events.push(SolverEvent::FootstepStart {
                side: p.side,
                contact: p.contact,
            });
        }
    }
}
