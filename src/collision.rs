//! Scene query abstraction and collision results.
//!
//! Ground and obstacle sensing only need two primitives from the physics
//! engine: a sphere sweep and a ray cast. Backends expose them through
//! [`SceneQuery`] so the probing algorithms in [`crate::sensors`] stay
//! engine-agnostic.

use bevy::prelude::*;

/// Information about a raycast/shapecast collision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance travelled along the cast direction before the hit.
    pub distance: f32,
    /// Normal of the surface at hit point.
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

/// Filter applied to every scene query issued by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastFilter {
    /// Body that must never be reported (the character itself).
    pub exclude: Option<Entity>,
    /// Collision layers to ignore, as a bit mask.
    pub excluded_layers: u32,
}

impl CastFilter {
    /// A filter that excludes the given entity and nothing else.
    pub fn excluding(entity: Entity) -> Self {
        Self {
            exclude: Some(entity),
            excluded_layers: 0,
        }
    }

    /// Builder: ignore colliders on any of the given layers.
    pub fn with_excluded_layers(mut self, layers: u32) -> Self {
        self.excluded_layers = layers;
        self
    }

    /// Check whether a collider passes the filter.
    pub fn accepts(&self, entity: Entity, layers: u32) -> bool {
        self.exclude != Some(entity) && layers & self.excluded_layers == 0
    }
}

/// Read-only geometric queries against the environment.
pub trait SceneQuery {
    /// Sweep a sphere of `radius` centered at `origin` along `direction`.
    ///
    /// Returns the first hit within `max_distance`. A sphere that already
    /// touches or penetrates a collider reports a hit at distance zero.
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Dir3,
        max_distance: f32,
        filter: &CastFilter,
    ) -> Option<CollisionData>;

    /// Cast a ray from `origin` along `direction`.
    fn raycast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        filter: &CastFilter,
    ) -> Option<CollisionData>;
}
