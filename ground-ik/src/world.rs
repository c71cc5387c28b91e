//! Rapier-based query world for ground geometry.
//!
//! Hosts that do not already own a Rapier scene can build one here from a set
//! of ground collider definitions. The solver only reads from it.
//!
//! Design goals
//! - Deterministic: given the same inputs (sorted by `id`), build identical in-memory sets.
//! - Query-focused: supports the box/sphere/ray casts the solver issues, nothing else.
//! - Mostly static: ground objects may be re-posed (moving platforms) through
//!   [`GroundWorld::set_pose`], which refits the broad-phase for that collider only.

use std::collections::HashMap;

use rapier3d::prelude::*;

use rapier3d::na::{Translation3, UnitQuaternion};

/// Layer bits used when a definition doesn't specify any.
pub const DEFAULT_LAYER: u32 = 1;

/// Canonical, schema-agnostic definition of a ground collider.
///
/// Conventions
/// - Units are meters.
/// - Rotation is a unit quaternion.
/// - Planes pass through `translation + normal * offset_along_normal` with
///   `normal = rotation * +Y`.
#[derive(Clone, Debug)]
pub struct GroundDef {
    /// Stable unique identifier used to ensure deterministic insertion order.
    pub id: u32,
    /// Collision layer bits; matched against `FootConfig::ground_mask`.
    pub layer: u32,
    /// World-space translation.
    pub translation: Vector<f32>,
    /// World-space rotation (unit quaternion).
    pub rotation: UnitQuaternion<f32>,
    /// Collider shape parameters.
    pub shape: GroundShape,
}

impl GroundDef {
    pub fn new(id: u32, translation: Vector<f32>, shape: GroundShape) -> Self {
        Self {
            id,
            layer: DEFAULT_LAYER,
            translation,
            rotation: UnitQuaternion::identity(),
            shape,
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }
}

/// Supported ground collider shapes.
#[derive(Clone, Debug)]
pub enum GroundShape {
    /// Infinite plane (half-space).
    Plane {
        /// Offset along the plane normal (meters).
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vector<f32> },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },

    /// Y-aligned cone (meters).
    ConeY { radius: f32, half_height: f32 },

    /// Rounded cuboid (meters).
    ///
    /// `border_radius` rounds all edges/corners.
    RoundCuboid {
        half_extents: Vector<f32>,
        border_radius: f32,
    },
}

/// Pack a definition id and its layer bits into a collider's `user_data`.
///
/// # Bit layout
/// - bits 0..=31   : ground id (u32)
/// - bits 64..=95  : layer bits (u32)
/// - other bits    : reserved (zero)
#[inline]
pub fn pack_user_data(id: u32, layer: u32) -> u128 {
    (id as u128) | ((layer as u128) << 64)
}

#[inline]
pub fn unpack_id(user_data: u128) -> u32 {
    user_data as u32
}

#[inline]
pub fn unpack_layer(user_data: u128) -> u32 {
    (user_data >> 64) as u32
}

/// In-memory Rapier structures needed for ground queries.
pub struct GroundWorld {
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    broad_phase: BroadPhaseBvh,
    narrow_phase: NarrowPhase,
    handles: HashMap<u32, ColliderHandle>,
}

impl GroundWorld {
    /// Build a query world from a list of ground definitions.
    ///
    /// Determinism
    /// - The input is sorted by `id` before insertion.
    /// - Any NaN/invalid values should be filtered/validated by the caller.
    pub fn build(mut defs: Vec<GroundDef>) -> Self {
        defs.sort_by_key(|d| d.id);

        let bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();
        let mut handles = HashMap::with_capacity(defs.len());
        let mut modified = Vec::with_capacity(defs.len());

        for def in &defs {
            let mut collider = collider_from_def(def);
            collider.set_position(pose_of(def));
            let handle = colliders.insert(collider);
            handles.insert(def.id, handle);
            modified.push(handle);
        }

        let mut world = Self {
            bodies,
            colliders,
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::default(),
            handles,
        };
        world.refit(&modified);
        log::info!("ground world built with {} colliders", defs.len());
        world
    }

    /// Collider handle of a ground definition, if it exists.
    pub fn handle(&self, id: u32) -> Option<ColliderHandle> {
        self.handles.get(&id).copied()
    }

    /// Ground definition id stored on a collider.
    pub fn id_of(&self, handle: ColliderHandle) -> Option<u32> {
        self.colliders.get(handle).map(|c| unpack_id(c.user_data))
    }

    /// Current world pose of a ground collider.
    pub fn pose(&self, handle: ColliderHandle) -> Option<Isometry<f32>> {
        self.colliders.get(handle).map(|c| *c.position())
    }

    /// Move a ground object (e.g. a platform) and refresh the broad-phase.
    ///
    /// Returns `false` if no collider with `id` exists.
    pub fn set_pose(&mut self, id: u32, pose: Isometry<f32>) -> bool {
        let Some(handle) = self.handle(id) else {
            log::warn!("set_pose: unknown ground id {id}");
            return false;
        };
        if let Some(collider) = self.colliders.get_mut(handle) {
            collider.set_position(pose);
        }
        self.refit(&[handle]);
        true
    }

    /// Create a borrowed `QueryPipeline` view for scene queries.
    ///
    /// The returned pipeline borrows `self` and the filter, so it should be used
    /// within the scope of the borrow.
    pub fn query_pipeline<'a>(&'a self, filter: QueryFilter<'a>) -> QueryPipeline<'a> {
        self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        )
    }

    /// View of this world that only sees colliders whose layer intersects `mask`.
    pub fn query(&self, mask: u32) -> WorldQuery<'_> {
        WorldQuery { world: self, mask }
    }

    fn refit(&mut self, modified: &[ColliderHandle]) {
        let mut events = Vec::new();
        self.broad_phase.update(
            &IntegrationParameters::default(),
            &self.colliders,
            &self.bodies,
            modified,
            &[],
            &mut events,
        );
    }
}

/// Layer-filtered, read-only view of a [`GroundWorld`].
///
/// Implements [`crate::GroundQuery`]; see `query.rs`.
#[derive(Clone, Copy)]
pub struct WorldQuery<'a> {
    pub(crate) world: &'a GroundWorld,
    pub(crate) mask: u32,
}

impl WorldQuery<'_> {
    #[inline]
    pub(crate) fn accepts(&self, collider: &Collider) -> bool {
        unpack_layer(collider.user_data) & self.mask != 0
    }
}

/// World pose of a definition. Planes are shifted along their normal.
fn pose_of(def: &GroundDef) -> Isometry<f32> {
    let translation = match def.shape {
        GroundShape::Plane {
            offset_along_normal,
        } => def.translation + (def.rotation * Vector::y()) * offset_along_normal,
        _ => def.translation,
    };
    Isometry::from_parts(Translation3::from(translation), def.rotation)
}

/// Build a Rapier collider from a `GroundDef`, with identity local pose.
///
/// The caller places it with `set_position`.
fn collider_from_def(def: &GroundDef) -> Collider {
    let builder = match &def.shape {
        GroundShape::Plane { .. } => {
            // Local +Y half-space; the pose rotation orients it.
            ColliderBuilder::new(SharedShape::new(HalfSpace::new(Vector::y_axis())))
        }

        GroundShape::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
        }

        GroundShape::Sphere { radius } => ColliderBuilder::ball(*radius),

        GroundShape::CapsuleY {
            radius,
            half_height,
        } => ColliderBuilder::capsule_y(*half_height, *radius),

        GroundShape::CylinderY {
            radius,
            half_height,
        } => ColliderBuilder::cylinder(*half_height, *radius),

        GroundShape::ConeY {
            radius,
            half_height,
        } => ColliderBuilder::cone(*half_height, *radius),

        GroundShape::RoundCuboid {
            half_extents,
            border_radius,
        } => ColliderBuilder::round_cuboid(
            half_extents.x,
            half_extents.y,
            half_extents.z,
            *border_radius,
        ),
    };

    builder
        .user_data(pack_user_data(def.id, def.layer))
        .build()
}
