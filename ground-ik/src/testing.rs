//! Analytic ground for unit tests: a handful of bounded half-spaces.
//!
//! Sweeps are solved in closed form so solver tests do not depend on a
//! broad-phase. A plane only answers hits whose contact lands inside its
//! planar `region` (x/z bounds), which is enough to model steps and ramps.

use rapier3d::prelude::ColliderHandle;

use crate::query::{GroundQuery, ShapeHit};
use crate::types::{Iso, Vec3};

#[derive(Clone, Copy, Debug)]
pub struct TestPlane {
    pub point: Vec3,
    pub normal: Vec3,
    pub handle: ColliderHandle,
    /// (min_x, max_x, min_z, max_z)
    pub region: Option<(f32, f32, f32, f32)>,
    pub pose: Iso,
}

#[derive(Clone, Debug, Default)]
pub struct TestGround {
    pub planes: Vec<TestPlane>,
    /// Report a NaN normal for this handle.
    pub broken: Option<ColliderHandle>,
}

pub fn handle(i: u32) -> ColliderHandle {
    ColliderHandle::from_raw_parts(i, 0)
}

impl TestGround {
    pub fn flat(height: f32) -> Self {
        Self::default().with_plane(Vec3::new(0.0, height, 0.0), Vec3::y(), None)
    }

    /// Plane through the origin rising toward +Z at `deg` degrees.
    pub fn ramp(deg: f32) -> Self {
        let a = deg.to_radians();
        let normal = Vec3::new(0.0, a.cos(), -a.sin());
        Self::default().with_plane(Vec3::zeros(), normal, None)
    }

    pub fn with_plane(
        mut self,
        point: Vec3,
        normal: Vec3,
        region: Option<(f32, f32, f32, f32)>,
    ) -> Self {
        let handle = handle(self.planes.len() as u32);
        self.planes.push(TestPlane {
            point,
            normal: normal.normalize(),
            handle,
            region,
            pose: Iso::identity(),
        });
        self
    }

    fn sweep(&self, center: &Vec3, support: impl Fn(&Vec3) -> f32, dir: &Vec3, max: f32) -> Option<ShapeHit> {
        let mut best: Option<ShapeHit> = None;
        for plane in &self.planes {
            let approach = -dir.dot(&plane.normal);
            if approach <= 1.0e-6 {
                continue;
            }
            let r = support(&plane.normal);
            let gap = (center - plane.point).dot(&plane.normal) - r;
            let distance = (gap / approach).max(0.0);
            if distance > max {
                continue;
            }
            let at = center + dir * distance;
            let point = at - plane.normal * ((at - plane.point).dot(&plane.normal));
            if let Some((x0, x1, z0, z1)) = plane.region {
                if point.x < x0 || point.x > x1 || point.z < z0 || point.z > z1 {
                    continue;
                }
            }
            if best.as_ref().map_or(true, |b| distance < b.distance) {
                let normal = if self.broken == Some(plane.handle) {
                    Vec3::new(f32::NAN, f32::NAN, f32::NAN)
                } else {
                    plane.normal
                };
                best = Some(ShapeHit {
                    handle: plane.handle,
                    distance,
                    point,
                    normal,
                });
            }
        }
        best
    }

    pub fn move_plane(&mut self, index: usize, by: Vec3) {
        let p = &mut self.planes[index];
        p.point += by;
        p.pose = Iso::translation(p.point.x, p.point.y, p.point.z);
    }
}

impl GroundQuery for TestGround {
    fn cast_box(&self, pose: &Iso, half_extents: &Vec3, dir: &Vec3, max_distance: f32) -> Option<ShapeHit> {
        let axes = [
            pose.rotation * Vec3::x() * half_extents.x,
            pose.rotation * Vec3::y() * half_extents.y,
            pose.rotation * Vec3::z() * half_extents.z,
        ];
        let center = pose.translation.vector;
        self.sweep(
            &center,
            |n| axes.iter().map(|a| a.dot(n).abs()).sum(),
            dir,
            max_distance,
        )
    }

    fn cast_sphere(&self, center: &Vec3, radius: f32, dir: &Vec3, max_distance: f32) -> Option<ShapeHit> {
        self.sweep(center, |_| radius, dir, max_distance)
    }

    fn cast_ray(&self, origin: &Vec3, dir: &Vec3, max_distance: f32) -> Option<ShapeHit> {
        self.sweep(origin, |_| 0.0, dir, max_distance)
    }

    fn ground_pose(&self, handle: ColliderHandle) -> Option<Iso> {
        self.planes.iter().find(|p| p.handle == handle).map(|p| p.pose)
    }
}
