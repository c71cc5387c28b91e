/*!
Core math aliases and small value types shared by every solver stage.

This module intentionally contains no algorithms. It defines the data types
exchanged between:
- the ground query layer (shape casts against the physical world)
- the leg correction engine and body blender
- the hint solver and lean subsystems
- the host, which owns the pose and the reference frame
*/

use nalgebra as na;
use rapier3d::prelude::ColliderHandle;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

/// Non-owning reference to a ground collider.
///
/// The solver never manages the lifetime of scene geometry; it only remembers
/// which collider it last stood on so it can notice when that collider moves.
pub type GroundRef = ColliderHandle;

/// Which leg a value belongs to. Indexes the per-leg arrays (`Left = 0`).
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// The character's reference transform for one tick.
///
/// Conventions
/// - `position` is the character origin, normally at ground level between the feet.
/// - Up is `rotation * +Y`, forward is `rotation * +Z`, right is `rotation * -X`
///   (right-handed, Y-up, Z-forward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootFrame {
    pub position: Vec3,
    pub rotation: Quat,
}

impl RootFrame {
    #[inline]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::z()
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * -Vec3::x()
    }

    /// Height of `point` above the root origin, measured along up.
    #[inline]
    pub fn height_of(&self, point: &Vec3) -> f32 {
        (point - self.position).dot(&self.up())
    }

    /// Convert to nalgebra `Isometry3` for oriented shape casts.
    #[inline]
    pub fn iso_at(&self, translation: Vec3) -> Iso {
        Iso::from_parts(
            na::Translation3::new(translation.x, translation.y, translation.z),
            self.rotation,
        )
    }
}

impl Default for RootFrame {
    fn default() -> Self {
        Self::at(Vec3::zeros())
    }
}
