//! Ground query layer: the seam between the solver and the physical world.
//!
//! The solver issues three kinds of blocking, in-process queries:
//! - an oriented box sweep (foot footprint),
//! - a sphere sweep (slope refinement and whole-character ground presence),
//! - a ray cast.
//!
//! [`GroundQuery`] abstracts them so any geometry backend can drive the solver.
//! [`WorldQuery`] implements it with thin wrappers over Rapier's `QueryPipeline`.

use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::prelude::*;

use crate::types::{GroundRef, Iso, Vec3};
use crate::world::WorldQuery;

/// First surface hit along a sweep or ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeHit {
    /// Collider that was hit.
    pub handle: GroundRef,
    /// Distance travelled along the (unit) cast direction before contact.
    pub distance: f32,
    /// World-space contact point on the ground surface.
    pub point: Vec3,
    /// World-space surface normal. May be non-finite for malformed colliders;
    /// callers must check.
    pub normal: Vec3,
}

/// Blocking ground queries against the physical world's current state.
///
/// `dir` is always a unit vector and `max_distance` a length in meters.
pub trait GroundQuery {
    /// Sweep an oriented box (`pose`, `half_extents`) along `dir`.
    fn cast_box(&self, pose: &Iso, half_extents: &Vec3, dir: &Vec3, max_distance: f32)
    -> Option<ShapeHit>;

    /// Sweep a sphere along `dir`.
    fn cast_sphere(&self, center: &Vec3, radius: f32, dir: &Vec3, max_distance: f32)
    -> Option<ShapeHit>;

    /// Cast a solid ray along `dir`.
    fn cast_ray(&self, origin: &Vec3, dir: &Vec3, max_distance: f32) -> Option<ShapeHit>;

    /// Current world pose of a ground collider, used to notice moving ground.
    fn ground_pose(&self, handle: GroundRef) -> Option<Iso>;
}

fn cast_options(max_distance: f32) -> ShapeCastOptions {
    let mut opts = ShapeCastOptions::with_max_time_of_impact(max_distance.max(0.0));
    opts.stop_at_penetration = true;
    opts.compute_impact_geometry_on_penetration = true;
    opts
}

impl WorldQuery<'_> {
    fn cast_shape(
        &self,
        pose: &Iso,
        shape: &dyn Shape,
        dir: &Vec3,
        max_distance: f32,
    ) -> Option<ShapeHit> {
        let predicate = |_handle: ColliderHandle, collider: &Collider| self.accepts(collider);
        let pipeline = self
            .world
            .query_pipeline(QueryFilter::default().predicate(&predicate));

        // Unit velocity, so time of impact is a distance.
        let (handle, hit) = pipeline.cast_shape(pose, dir, shape, cast_options(max_distance))?;

        Some(ShapeHit {
            handle,
            distance: hit.time_of_impact,
            point: hit.witness1.coords,
            normal: hit.normal1.into_inner(),
        })
    }
}

impl GroundQuery for WorldQuery<'_> {
    fn cast_box(
        &self,
        pose: &Iso,
        half_extents: &Vec3,
        dir: &Vec3,
        max_distance: f32,
    ) -> Option<ShapeHit> {
        let cuboid = Cuboid::new(*half_extents);
        self.cast_shape(pose, &cuboid, dir, max_distance)
    }

    fn cast_sphere(
        &self,
        center: &Vec3,
        radius: f32,
        dir: &Vec3,
        max_distance: f32,
    ) -> Option<ShapeHit> {
        let ball = Ball::new(radius);
        let pose = Iso::translation(center.x, center.y, center.z);
        self.cast_shape(&pose, &ball, dir, max_distance)
    }

    fn cast_ray(&self, origin: &Vec3, dir: &Vec3, max_distance: f32) -> Option<ShapeHit> {
        let predicate = |_handle: ColliderHandle, collider: &Collider| self.accepts(collider);
        let pipeline = self
            .world
            .query_pipeline(QueryFilter::default().predicate(&predicate));

        let ray = Ray::new((*origin).into(), *dir);
        let (handle, hit) = pipeline.cast_ray_and_get_normal(&ray, max_distance.max(0.0), true)?;

        Some(ShapeHit {
            handle,
            distance: hit.time_of_impact,
            point: ray.point_at(hit.time_of_impact).coords,
            normal: hit.normal,
        })
    }

    fn ground_pose(&self, handle: GroundRef) -> Option<Iso> {
        self.world.pose(handle)
    }
}
