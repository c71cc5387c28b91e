//! Two-bone hint solver: places the knee so both segment lengths survive a moved foot.
//!
//! The knee lies in the plane spanned by the hip-to-foot line and a hinge
//! direction carried over from the animated pose. Its angle at the foot comes
//! from the law of cosines:
//!
//! `cos(theta) = (lower^2 + reach^2 - upper^2) / (2 * lower * reach)`
//!
//! Sides that cannot form a triangle are shrunk until they can, so `acos`
//! never leaves its domain.

use std::f32::consts::FRAC_1_SQRT_2;

use crate::error::{Segment, SetupError};
use crate::settings::{DIST_EPS, TRIANGLE_SLACK};
use crate::types::{Quat, Side, Vec3};

/// Shortest leg segment accepted at setup (meters).
const MIN_SEGMENT: f32 = 1.0e-3;

/// Rest proportions of one two-bone leg.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimbRig {
    /// Thigh to knee.
    pub upper: f32,
    /// Knee to ankle.
    pub lower: f32,
    /// Bend direction in the root's local frame, used when the animated leg is straight.
    pub rest_hinge: Vec3,
}

impl LimbRig {
    /// Measure a leg from its rest joint positions (root-local).
    pub fn from_rest(side: Side, thigh: &Vec3, knee: &Vec3, ankle: &Vec3) -> Result<Self, SetupError> {
        for v in [thigh, knee, ankle] {
            if !v.iter().all(|c| c.is_finite()) {
                return Err(SetupError::NonFinite("leg rest position"));
            }
        }
        let upper = (knee - thigh).norm();
        if upper < MIN_SEGMENT {
            return Err(SetupError::DegenerateLimb {
                side,
                segment: Segment::Upper,
                length: upper,
            });
        }
        let lower = (ankle - knee).norm();
        if lower < MIN_SEGMENT {
            return Err(SetupError::DegenerateLimb {
                side,
                segment: Segment::Lower,
                length: lower,
            });
        }
        // Straight rest legs bend forward.
        let rest_hinge = bend_direction(thigh, knee, ankle).unwrap_or_else(Vec3::z);
        Ok(Self {
            upper,
            lower,
            rest_hinge,
        })
    }
}

/// Unit direction from the hip-to-foot line toward the knee, or `None` if the leg is straight.
pub fn bend_direction(thigh: &Vec3, knee: &Vec3, ankle: &Vec3) -> Option<Vec3> {
    let axis = thigh - ankle;
    let len = axis.norm();
    if len <= DIST_EPS {
        return None;
    }
    let axis = axis / len;
    let rel = knee - ankle;
    let perp = rel - axis * rel.dot(&axis);
    if perp.norm_squared() <= 1.0e-8 {
        return None;
    }
    Some(perp.normalize())
}

/// Rotate `hinge` along with the hip-to-foot direction going from `from` to `to`.
pub fn carry_hinge(from: &Vec3, to: &Vec3, hinge: &Vec3) -> Vec3 {
    match Quat::rotation_between(from, to) {
        Some(q) => q * hinge,
        // Opposite directions: keep the hinge, the solve re-orthogonalizes it.
        None => *hinge,
    }
}

/// Any unit vector perpendicular to unit `v`.
fn any_perpendicular(v: &Vec3) -> Vec3 {
    let pick = if v.x.abs() < 0.9 { Vec3::x() } else { Vec3::y() };
    v.cross(&pick).normalize()
}

/// Knee position for a hip at `thigh`, ankle at `ankle`, bending toward `hinge`.
///
/// Always returns a finite point. When the three lengths form a triangle the
/// result satisfies `|knee - ankle| == lower` and `|knee - thigh| == upper`.
pub fn solve_knee(thigh: &Vec3, ankle: &Vec3, upper: f32, lower: f32, hinge: &Vec3) -> Vec3 {
    let to_hip = thigh - ankle;
    let reach = to_hip.norm();
    let dir = if reach > DIST_EPS {
        to_hip / reach
    } else {
        Vec3::y()
    };

    let mut bend = hinge - dir * hinge.dot(&dir);
    if bend.norm_squared() <= 1.0e-8 || !bend.iter().all(|c| c.is_finite()) {
        bend = any_perpendicular(&dir);
    } else {
        bend.normalize_mut();
    }

    let (mut a, mut b, mut c) = (upper, lower, reach);
    if c >= a + b {
        c = TRIANGLE_SLACK * (a + b);
    } else if a >= b + c {
        a = TRIANGLE_SLACK * (b + c);
    } else if b >= a + c {
        b = TRIANGLE_SLACK * (a + c);
    }

    let cos = (b * b + c * c - a * a) / (2.0 * b * c);
    if !cos.is_finite() {
        // Collapsed triangle: fixed 45 degree bend, knee halfway along the chain.
        let arm = 0.5 * (upper + lower);
        return ankle + (dir * FRAC_1_SQRT_2 + bend * FRAC_1_SQRT_2) * arm;
    }
    let theta = cos.clamp(-1.0, 1.0).acos();
    ankle + (dir * theta.cos() + bend * theta.sin()) * b
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPPER: f32 = 0.45;
    const LOWER: f32 = 0.42;

    #[test]
    fn preserves_segment_lengths() {
        let thigh = Vec3::new(0.1, 0.9, 0.0);
        for ankle in [
            Vec3::new(0.1, 0.1, 0.0),
            Vec3::new(0.1, 0.35, 0.1),
            Vec3::new(0.2, 0.25, -0.2),
        ] {
            let knee = solve_knee(&thigh, &ankle, UPPER, LOWER, &Vec3::z());
            assert!(((knee - thigh).norm() - UPPER).abs() < 1.0e-4);
            assert!(((knee - ankle).norm() - LOWER).abs() < 1.0e-4);
            // Bends toward the hinge.
            assert!(knee.z > ankle.z.min(thigh.z) - 1.0e-4);
        }
    }

    #[test]
    fn overstretched_leg_stays_finite_and_nearly_straight() {
        let thigh = Vec3::new(0.0, 1.0, 0.0);
        let ankle = Vec3::new(0.0, -1.0, 0.0);
        let knee = solve_knee(&thigh, &ankle, UPPER, LOWER, &Vec3::z());
        assert!(knee.iter().all(|c| c.is_finite()));
        assert!(((knee - ankle).norm() - LOWER).abs() < 1.0e-4);
        assert!(knee.z > 0.0);
        assert!(knee.z < 0.1);
    }

    #[test]
    fn coincident_hip_and_foot_are_handled() {
        let p = Vec3::new(0.0, 0.5, 0.0);
        let knee = solve_knee(&p, &p, UPPER, LOWER, &Vec3::z());
        assert!(knee.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn hinge_parallel_to_leg_picks_a_perpendicular() {
        let thigh = Vec3::new(0.0, 0.9, 0.0);
        let ankle = Vec3::new(0.0, 0.2, 0.0);
        let knee = solve_knee(&thigh, &ankle, UPPER, LOWER, &Vec3::y());
        assert!(((knee - ankle).norm() - LOWER).abs() < 1.0e-4);
        assert!(((knee - thigh).norm() - UPPER).abs() < 1.0e-4);
    }

    #[test]
    fn bend_direction_of_bent_leg() {
        let dir = bend_direction(
            &Vec3::new(0.0, 1.0, 0.0),
            &Vec3::new(0.0, 0.5, 0.2),
            &Vec3::zeros(),
        )
        .unwrap();
        assert!((dir - Vec3::z()).norm() < 1.0e-5);
        assert!(bend_direction(&Vec3::y(), &(Vec3::y() * 0.5), &Vec3::zeros()).is_none());
    }

    #[test]
    fn carried_hinge_follows_leg_rotation() {
        let from = Vec3::y();
        let to = Vec3::new(0.0, 1.0, 1.0).normalize();
        let h = carry_hinge(&from, &to, &Vec3::z());
        assert!(h.dot(&to).abs() < 1.0e-5);
    }

    #[test]
    fn rig_rejects_degenerate_segments() {
        let err = LimbRig::from_rest(Side::Left, &Vec3::zeros(), &Vec3::zeros(), &-Vec3::y())
            .unwrap_err();
        assert!(matches!(
            err,
            SetupError::DegenerateLimb {
                side: Side::Left,
                segment: Segment::Upper,
                ..
            }
        ));
        let err = LimbRig::from_rest(
            Side::Right,
            &Vec3::new(0.0, f32::NAN, 0.0),
            &Vec3::zeros(),
            &-Vec3::y(),
        )
        .unwrap_err();
        assert!(matches!(err, SetupError::NonFinite(_)));
    }

    #[test]
    fn rig_measures_segments() {
        let rig = LimbRig::from_rest(
            Side::Left,
            &Vec3::new(0.1, 0.9, 0.0),
            &Vec3::new(0.1, 0.46, 0.05),
            &Vec3::new(0.1, 0.05, 0.0),
        )
        .unwrap();
        assert!((rig.upper - (0.44f32.powi(2) + 0.05f32.powi(2)).sqrt()).abs() < 1.0e-4);
        assert!(rig.rest_hinge.z > 0.9);
    }
}
