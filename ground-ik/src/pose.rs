//! The pose the host hands to the solver each tick and gets back corrected.
//!
//! All positions and rotations are world space. The host fills the animated pose,
//! calls `FootIkSolver::tick`, then feeds `legs[..].ik_*` and `hint_position`
//! to its own two-bone IK and applies the hip, spine and shoulder values.

use crate::types::{Quat, Side, Vec3};

/// One leg's joints and IK outputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegPose {
    /// Upper leg joint (hip socket).
    pub thigh_position: Vec3,
    /// In: animated knee. Out: knee hint for the host's IK.
    pub hint_position: Vec3,
    /// In: animated ankle. Out: IK target.
    pub ik_position: Vec3,
    /// In: animated ankle rotation. Out: IK target rotation.
    pub ik_rotation: Quat,
    /// Out: IK blend weight in `[0, 1]`.
    pub ik_weight: f32,
}

impl Default for LegPose {
    fn default() -> Self {
        Self {
            thigh_position: Vec3::zeros(),
            hint_position: Vec3::zeros(),
            ik_position: Vec3::zeros(),
            ik_rotation: Quat::identity(),
            ik_weight: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// Pelvis position. Moved by the body offset and move lean.
    pub hip_position: Vec3,
    pub hip_rotation: Quat,
    /// Spine local rotation. Bent by slope lean.
    pub spine: Quat,
    /// Shoulder (upper chest) local rotation. Counter-rotated by slope lean.
    pub shoulders: Quat,
    pub legs: [LegPose; 2],
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            hip_position: Vec3::zeros(),
            hip_rotation: Quat::identity(),
            spine: Quat::identity(),
            shoulders: Quat::identity(),
            legs: [LegPose::default(); 2],
        }
    }
}

impl Pose {
    #[inline]
    pub fn leg(&self, side: Side) -> &LegPose {
        &self.legs[side.index()]
    }

    #[inline]
    pub fn leg_mut(&mut self, side: Side) -> &mut LegPose {
        &mut self.legs[side.index()]
    }
}

/// A leg's joints in the rest pose, relative to the root.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestLeg {
    pub thigh: Vec3,
    pub knee: Vec3,
    pub ankle: Vec3,
}
