//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::collision::{CastFilter, CollisionData, SceneQuery};
use crate::config::{CharacterCapsule, MovementConfig};
use crate::error::ControllerError;
use crate::sensors::ControllerSensors;
use crate::state::MovementState;

/// Rapier3D physics backend for the movement controller.
///
/// Velocity goes through [`Velocity`], gravity is switched with
/// [`GravityScale`], and mass comes from [`ReadMassProperties`]. Scene
/// queries are answered by a dedicated Rapier system that receives the
/// `RapierContext` as a system parameter.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn check_body(world: &World, entity: Entity) -> Result<(), ControllerError> {
        if world.get::<RigidBody>(entity).is_none() {
            return Err(ControllerError::MissingBody(entity, "RigidBody"));
        }
        if world.get::<Velocity>(entity).is_none() {
            return Err(ControllerError::MissingBody(entity, "Velocity"));
        }
        Ok(())
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool) {
        let scale = if enabled { 1.0 } else { 0.0 };
        if let Some(mut gravity_scale) = world.get_mut::<GravityScale>(entity) {
            if gravity_scale.0 != scale {
                gravity_scale.0 = scale;
            }
        } else if let Ok(mut entity) = world.get_entity_mut(entity) {
            entity.insert(GravityScale(scale));
        }
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        // Rapier fills this in after the first step; until then assume unit mass
        world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.mass)
            .filter(|mass| *mass > 0.0 && mass.is_finite())
            .unwrap_or(1.0)
    }
}

/// Plugin that sets up Rapier3D-specific systems for the movement controller.
///
/// When Rapier runs in `FixedUpdate` (`in_fixed_schedule()`), the whole
/// controller tick is ordered before the physics step, so every step
/// integrates the velocity written by the same tick. With Rapier in its
/// default schedule the ordering has no effect.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::ControllerSet;

        app.configure_sets(
            FixedUpdate,
            ControllerSet::FinalApplication.before(PhysicsSet::SyncBackend),
        );

        app.add_systems(
            FixedUpdate,
            rapier_sensors.in_set(ControllerSet::Sensors),
        );
    }
}

/// [`SceneQuery`] over a Rapier context.
pub struct RapierScene<'a, 'w> {
    context: &'a RapierContext<'w>,
}

impl<'a, 'w> RapierScene<'a, 'w> {
    /// Wrap a Rapier context.
    pub fn new(context: &'a RapierContext<'w>) -> Self {
        Self { context }
    }
}

fn query_filter(filter: &CastFilter) -> QueryFilter<'static> {
    let mut query = QueryFilter::default().exclude_sensors();

    if let Some(entity) = filter.exclude {
        query = query.exclude_rigid_body(entity);
    }

    if filter.excluded_layers != 0 {
        query = query.groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(!filter.excluded_layers),
        ));
    }

    query
}

impl SceneQuery for RapierScene<'_, '_> {
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Dir3,
        max_distance: f32,
        filter: &CastFilter,
    ) -> Option<CollisionData> {
        let shape = Collider::ball(radius);
        let direction = *direction;

        self.context
            .cast_shape(
                origin,
                Quat::IDENTITY,
                direction,
                &shape,
                ShapeCastOptions {
                    max_time_of_impact: max_distance,
                    stop_at_penetration: true,
                    compute_impact_geometry_on_penetration: true,
                    ..default()
                },
                query_filter(filter),
            )
            .map(|(hit_entity, hit)| {
                // Normal of the hit surface, or straight against the cast
                let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
                let center = origin + direction * hit.time_of_impact;
                let point = center - normal * radius;
                CollisionData::new(hit.time_of_impact, normal, point, Some(hit_entity))
            })
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        filter: &CastFilter,
    ) -> Option<CollisionData> {
        self.context
            .cast_ray_and_get_normal(
                origin,
                *direction,
                max_distance,
                true, // solid = true for solid hits
                query_filter(filter),
            )
            .map(|(hit_entity, hit)| {
                CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
            })
    }
}

/// Rapier-specific sensor system: ground probe and obstacle rays.
fn rapier_sensors(
    rapier_context: ReadRapierContext,
    mut q_characters: Query<(
        Entity,
        &MovementState,
        &MovementConfig,
        &CharacterCapsule,
        &mut ControllerSensors,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let scene = RapierScene::new(&context);

    for (entity, state, config, capsule, mut sensors) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }
        sensors.refresh(&scene, entity, state, config, capsule);
    }
}

/// Bundle of Rapier components for a character controller entity.
///
/// # Usage
///
/// Use this bundle when spawning a character so the body, the collider and
/// the capsule the probes use always agree. The collider is a capsule offset
/// by [`CharacterCapsule::center`], so with the default feet pivot the
/// transform translation sits at the character's feet.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use msg_platformer_controller::prelude::*;
/// use msg_platformer_controller::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         MovementState::new(),
///         MovementConfig::player(),
///         Rapier3dCharacterBundle::new(CharacterCapsule::new(0.5, 2.0)),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`], facing is set by the controller
/// - `gravity_scale`: 1, switched to 0 by the controller while grounded or frozen
/// - `friction`: zero with the `Min` combine rule, so walls never grab the character
#[derive(Bundle)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity.
    pub velocity: Velocity,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Gravity multiplier, toggled by the controller.
    pub gravity_scale: GravityScale,
    /// Surface friction of the character collider.
    pub friction: Friction,
    /// Computed mass properties, used to scale the jump force.
    pub mass_properties: ReadMassProperties,
    /// Capsule collider matching `capsule`.
    pub collider: Collider,
    /// Capsule description used by the probes.
    pub capsule: CharacterCapsule,
}

impl Rapier3dCharacterBundle {
    /// Create a character bundle for the given capsule.
    pub fn new(capsule: CharacterCapsule) -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(1.0),
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            mass_properties: ReadMassProperties::default(),
            collider: capsule_collider(&capsule),
            capsule,
        }
    }

    /// Set the rigid body type for the character.
    ///
    /// ```ignore
    /// let bundle = Rapier3dCharacterBundle::new(CharacterCapsule::default())
    ///     .with_body(RigidBody::KinematicVelocityBased);
    /// ```
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the collider friction.
    pub fn with_friction(mut self, friction: Friction) -> Self {
        self.friction = friction;
        self
    }
}

/// Capsule collider offset to the capsule's center.
pub fn capsule_collider(capsule: &CharacterCapsule) -> Collider {
    Collider::compound(vec![(
        capsule.center,
        Quat::IDENTITY,
        Collider::capsule_y(capsule.half_segment(), capsule.radius),
    )])
}
