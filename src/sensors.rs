//! Environment sensing.
//!
//! Backends run these probes every tick (in [`ControllerSet::Sensors`]) with
//! their own [`SceneQuery`] implementation and store the results in
//! [`ControllerSensors`]. The grounding and movement stages only ever look at
//! the stored results.
//!
//! [`ControllerSet::Sensors`]: crate::ControllerSet::Sensors

use bevy::prelude::*;

use crate::collision::{CastFilter, CollisionData, SceneQuery};
use crate::config::{CharacterCapsule, MovementConfig};
use crate::state::MovementState;

/// Which cast found the ground.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSource {
    /// The downward sphere cast.
    Sphere,
    /// The sink-prevention ray, used when the sphere cast missed.
    SinkCheck,
}

/// Result of a successful ground probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    /// Raw collision data.
    pub data: CollisionData,
    /// Which cast produced the hit.
    pub source: ProbeSource,
}

/// Number of obstacle rays.
pub const OBSTACLE_RAY_COUNT: usize = 5;

/// Directions of the obstacle rays for a facing yaw, in cast order:
/// forward, forward-right, forward-left, right, left.
pub fn obstacle_directions(forward: Vec3, right: Vec3) -> [Vec3; OBSTACLE_RAY_COUNT] {
    [
        forward,
        (forward + right).normalize_or_zero(),
        (forward - right).normalize_or_zero(),
        right,
        -right,
    ]
}

/// Obstacle ray results, indexed like [`obstacle_directions`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObstacleHits {
    /// Ray direction that was cast.
    pub directions: [Vec3; OBSTACLE_RAY_COUNT],
    /// Hit for each ray.
    pub hits: [Option<CollisionData>; OBSTACLE_RAY_COUNT],
}

impl ObstacleHits {
    /// Directions of the rays that hit something, in cast order.
    pub fn blocked_directions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.directions
            .iter()
            .zip(self.hits.iter())
            .filter(|(_, hit)| hit.is_some())
            .map(|(direction, _)| *direction)
    }

    /// Check if any ray hit.
    pub fn any(&self) -> bool {
        self.hits.iter().any(Option::is_some)
    }
}

/// Latest probe results for a character.
#[derive(Component, Debug, Clone, Default)]
pub struct ControllerSensors {
    /// Ground probe result, `None` when nothing is below the feet.
    pub ground: Option<GroundHit>,
    /// Obstacle ray results around the chest.
    pub obstacles: ObstacleHits,
}

impl ControllerSensors {
    /// Re-run every probe for one character.
    pub fn refresh<Q: SceneQuery>(
        &mut self,
        query: &Q,
        entity: Entity,
        state: &MovementState,
        config: &MovementConfig,
        capsule: &CharacterCapsule,
    ) {
        let filter = CastFilter::excluding(entity).with_excluded_layers(config.excluded_layers);
        self.ground = probe_ground(query, capsule, state.position, state.yaw, config, &filter);
        self.obstacles = probe_obstacles(query, capsule, state, config, &filter);
    }
}

/// Look for ground directly beneath the capsule.
///
/// A sphere of the capsule radius, resting on the capsule bottom, is swept
/// down by `foot_snap_distance`. Only if that misses, a short ray starting
/// slightly above the capsule bottom checks whether the feet have sunk into
/// the ground.
pub fn probe_ground<Q: SceneQuery>(
    query: &Q,
    capsule: &CharacterCapsule,
    position: Vec3,
    yaw: f32,
    config: &MovementConfig,
    filter: &CastFilter,
) -> Option<GroundHit> {
    let bottom = capsule.bottom(position, yaw);
    let sphere_center = bottom + Vec3::Y * capsule.radius;

    query
        .sphere_cast(
            sphere_center,
            capsule.radius,
            Dir3::NEG_Y,
            config.foot_snap_distance,
            filter,
        )
        .map(|data| GroundHit {
            data,
            source: ProbeSource::Sphere,
        })
        .or_else(|| {
            query
                .raycast(
                    bottom + Vec3::Y * config.sink_check_lift,
                    Dir3::NEG_Y,
                    config.sink_check_distance(),
                    filter,
                )
                .map(|data| GroundHit {
                    data,
                    source: ProbeSource::SinkCheck,
                })
        })
}

/// Cast the five chest-height obstacle rays along the current facing.
pub fn probe_obstacles<Q: SceneQuery>(
    query: &Q,
    capsule: &CharacterCapsule,
    state: &MovementState,
    config: &MovementConfig,
    filter: &CastFilter,
) -> ObstacleHits {
    let origin = state.position + Vec3::Y * config.obstacle_probe_height;
    let length = config.obstacle_probe_length(capsule.radius);
    let directions = obstacle_directions(state.forward(), state.right());

    let mut hits = [None; OBSTACLE_RAY_COUNT];
    for (hit, direction) in hits.iter_mut().zip(directions.iter()) {
        if let Ok(direction) = Dir3::new(*direction) {
            *hit = query.raycast(origin, direction, length, filter);
        }
    }

    ObstacleHits { directions, hits }
}
