//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the movement controller. The controller never talks to a
//! physics engine directly: it reads the body state at the start of a tick
//! and writes it back at the end through these hooks, and it senses the
//! environment through a [`SceneQuery`](crate::collision::SceneQuery)
//! implementation the backend runs in [`ControllerSet::Sensors`].
//!
//! [`ControllerSet::Sensors`]: crate::ControllerSet::Sensors

use bevy::prelude::*;

use crate::error::ControllerError;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the movement
/// controller. Position and facing default to plain [`Transform`] access,
/// which is what most engines synchronize from.
///
/// # Example
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`
/// which implements this trait for Bevy Rapier3D.
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_platformer_controller::prelude::*;
///
/// fn speed<B: CharacterPhysicsBackend>(world: &World, entity: Entity) -> f32 {
///     B::get_velocity(world, entity).length()
/// }
/// ```
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend, including its sensor
    /// system.
    fn plugin() -> impl Plugin;

    /// Verify that the entity carries everything the backend needs.
    ///
    /// Called every tick before the body is read. A missing body is a
    /// configuration error and must not be papered over.
    fn check_body(world: &World, entity: Entity) -> Result<(), ControllerError>;

    /// Get the current velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Turn the engine's gravity on or off for an entity.
    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool);

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation())
            })
            .unwrap_or(Vec3::ZERO)
    }

    /// Teleport an entity.
    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    /// Get the facing yaw of an entity, in degrees (0 = +Z, 90 = +X).
    fn get_yaw(world: &World, entity: Entity) -> f32 {
        world
            .get::<Transform>(entity)
            .map(|t| {
                let (yaw, _, _) = t.rotation.to_euler(EulerRot::YXZ);
                yaw.to_degrees()
            })
            .unwrap_or(0.0)
    }

    /// Set the facing yaw of an entity, in degrees.
    fn set_yaw(world: &mut World, entity: Entity, yaw: f32) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = Quat::from_rotation_y(yaw.to_radians());
        }
    }

    /// Get the mass of an entity.
    ///
    /// Used to turn the jump force into a velocity change.
    fn get_mass(_world: &World, _entity: Entity) -> f32 {
        // Default implementation returns 1.0 (no scaling)
        1.0
    }
}
