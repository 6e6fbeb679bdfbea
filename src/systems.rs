//! Pipeline glue systems.
//!
//! These systems bracket the movement stages: they copy the physics body and
//! input into [`MovementState`] at the start of a tick, consume queued
//! commands, and write the results back to the body at the end. The body
//! access is generic over the physics backend.

use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::camera::CameraHeading;
use crate::config::{CharacterCapsule, MovementConfig};
use crate::dashing::trigger_dash;
use crate::error::ControllerError;
use crate::intent::{MovementCommand, MovementCommands, MovementIntent, MovementTrigger};
use crate::jumping::{trigger_jump, JumpOutcome};
use crate::state::MovementState;

/// Length of one controller tick in seconds.
///
/// The configured fixed timestep is used rather than the last delta, so a
/// schedule run by hand advances by the same step as a real one.
#[inline]
pub fn fixed_dt(time: &Time<Fixed>) -> f32 {
    time.timestep().as_secs_f32()
}

/// Move [`MovementTrigger`] events into the target's command queue.
pub fn collect_movement_triggers(
    mut triggers: EventReader<MovementTrigger>,
    mut q_commands: Query<&mut MovementCommands>,
) {
    for trigger in triggers.read() {
        match q_commands.get_mut(trigger.entity) {
            Ok(mut commands) => commands.push(trigger.command),
            Err(_) => warn!(
                "Ignoring {:?} for {}: entity has no movement controller",
                trigger.command, trigger.entity
            ),
        }
    }
}

/// Copy velocity, position, facing and mass from the physics body into each
/// character's state.
///
/// Fails if a character has no usable capsule or no physics body. The first
/// observed position becomes the spawn point unless one was set.
pub fn read_body_state<B: CharacterPhysicsBackend>(world: &mut World) -> Result {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<MovementState>>()
        .iter(world)
        .collect();

    for entity in entities {
        let capsule = world
            .get::<CharacterCapsule>(entity)
            .copied()
            .ok_or(ControllerError::MissingCapsule(entity))?;
        if !capsule.is_valid() {
            return Err(ControllerError::InvalidCapsule {
                entity,
                radius: capsule.radius,
                height: capsule.height,
            }
            .into());
        }
        B::check_body(world, entity)?;

        let velocity = B::get_velocity(world, entity);
        let position = B::get_position(world, entity);
        let yaw = B::get_yaw(world, entity);
        let mass = B::get_mass(world, entity);

        let Some(mut state) = world.get_mut::<MovementState>(entity) else {
            continue;
        };

        state.velocity = if state.is_frozen() {
            Vec3::ZERO
        } else {
            velocity
        };
        state.position = position;
        state.yaw = yaw;
        state.sampled_position = position;
        state.sampled_yaw = yaw;
        state.body_mass = mass;

        if state.spawn_point.is_none() {
            state.spawn_point = Some(position);
            debug!("{entity}: spawn point set to {position}");
        }
    }

    Ok(())
}

/// Sample input and camera heading for this tick.
pub fn sample_input(
    mut q_characters: Query<(&mut MovementState, &MovementIntent, &CameraHeading)>,
) {
    for (mut state, intent, heading) in &mut q_characters {
        state.input = if intent.direction.is_finite() {
            intent.normalized()
        } else {
            Vec2::ZERO
        };
        state.jump_held = intent.jump_held;
        state.camera_yaw = if heading.yaw.is_finite() {
            heading.yaw
        } else {
            0.0
        };
    }
}

/// Respawn characters that fell below the kill plane.
pub fn check_kill_plane(mut q_characters: Query<(Entity, &mut MovementState, &MovementConfig)>) {
    for (entity, mut state, config) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }
        let Some(height) = config.kill_plane_height else {
            continue;
        };

        if state.position.y < height {
            let target = state.respawn_point();
            info!(
                "{entity}: fell below kill plane at {}, respawning at {target}",
                state.position.y
            );
            state.reset(target);
        }
    }
}

/// Apply one queued command.
///
/// While frozen only `Unfreeze` and the ability toggles go through.
pub fn apply_command(
    entity: Entity,
    state: &mut MovementState,
    command: MovementCommand,
    config: &MovementConfig,
    dt: f32,
) {
    match command {
        MovementCommand::Freeze => {
            if !state.is_frozen() {
                state.freeze();
                info!("{entity}: frozen");
            }
        }
        MovementCommand::Unfreeze => {
            if state.is_frozen() {
                state.unfreeze();
                info!("{entity}: unfrozen");
            }
        }
        MovementCommand::EnableDoubleJump => {
            state.double_jump_enabled = true;
            info!("{entity}: double jump unlocked");
        }
        MovementCommand::ToggleUnlimitedJumps => {
            state.unlimited_jumps_enabled = !state.unlimited_jumps_enabled;
            info!(
                "{entity}: unlimited jumps {}",
                if state.unlimited_jumps_enabled { "on" } else { "off" }
            );
        }
        MovementCommand::Jump | MovementCommand::Dash | MovementCommand::Respawn { .. }
            if state.is_frozen() =>
        {
            debug!("{entity}: {command:?} ignored while frozen");
        }
        MovementCommand::Respawn { position } => {
            let target = position.unwrap_or_else(|| state.respawn_point());
            state.reset(target);
            info!("{entity}: respawned at {target}");
        }
        MovementCommand::Jump => match trigger_jump(state, config, dt) {
            JumpOutcome::Ground => debug!("{entity}: jump"),
            JumpOutcome::Air => debug!("{entity}: double jump"),
            JumpOutcome::Refused => debug!("{entity}: no jump available"),
        },
        MovementCommand::Dash => {
            if trigger_dash(state) {
                debug!("{entity}: dash toward {}", state.move_direction);
            }
        }
    }
}

/// Consume every queued command, in submission order.
pub fn apply_movement_commands(
    time: Res<Time<Fixed>>,
    mut q_characters: Query<(
        Entity,
        &mut MovementState,
        &mut MovementCommands,
        &MovementConfig,
    )>,
) {
    let dt = fixed_dt(&time);

    for (entity, mut state, mut commands, config) in &mut q_characters {
        for command in commands.take() {
            apply_command(entity, &mut state, command, config, dt);
        }
    }
}

/// Write velocity, gravity, position and facing back to the physics body.
///
/// Position and facing are only written when a stage changed them, so the
/// solver's own integration is left alone otherwise.
pub fn write_body_state<B: CharacterPhysicsBackend>(world: &mut World) {
    let states: Vec<(Entity, MovementState)> = world
        .query::<(Entity, &MovementState)>()
        .iter(world)
        .map(|(entity, state)| (entity, state.clone()))
        .collect();

    for (entity, state) in states {
        B::set_velocity(world, entity, state.velocity);
        B::set_gravity_enabled(world, entity, state.gravity_enabled);

        if state.position != state.sampled_position {
            B::set_position(world, entity, state.position);
        }
        if state.yaw != state.sampled_yaw {
            B::set_yaw(world, entity, state.yaw);
        }

        if state.reset_scale {
            if let Some(mut transform) = world.get_mut::<Transform>(entity) {
                transform.scale = Vec3::ONE;
            }
            if let Some(mut state) = world.get_mut::<MovementState>(entity) {
                state.reset_scale = false;
            }
        }
    }
}
