//! Ground contact transitions.
//!
//! Turns the ground probe result of [`ControllerSensors`] into the
//! character's [`Support`]: landing snaps the character onto the surface and
//! stops gravity, leaving the ground hands horizontal momentum to the air
//! phase and re-enables gravity.

use bevy::prelude::*;

use crate::config::{CharacterCapsule, MovementConfig};
use crate::platform::MovingPlatform;
use crate::sensors::{ControllerSensors, GroundHit};
use crate::slope::slope_angle;
use crate::state::{AirPhase, GroundContact, MovementState, Support};
use crate::systems::fixed_dt;

/// What a grounding step changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundingTransition {
    /// Support did not change.
    None,
    /// The character touched down this tick.
    Landed,
    /// The character lost the ground this tick.
    LeftGround,
}

/// Apply one ground probe result to the state.
///
/// Characters rising from a jump are not grounded again until they start
/// falling, whatever the probe says.
pub fn resolve_grounding(
    state: &mut MovementState,
    hit: Option<&GroundHit>,
    on_moving_platform: bool,
    config: &MovementConfig,
    capsule: &CharacterCapsule,
    dt: f32,
) -> GroundingTransition {
    if state.is_jumping() {
        return GroundingTransition::None;
    }

    let was_grounded = state.is_grounded();

    match hit {
        Some(hit) => {
            if !was_grounded {
                state.end_dash();
            }
            if !state.is_dashing() {
                state.can_dash = true;
            }
            if state.double_jump_enabled {
                state.can_double_jump = true;
            }

            let normal = hit.data.normal.normalize_or(Vec3::Y);
            state.support = Support::Grounded(GroundContact {
                point: hit.data.point,
                normal,
                slope_angle: slope_angle(normal),
                surface: hit.data.entity,
                on_moving_platform,
                sliding: false,
            });

            state.position.y = hit.data.point.y + capsule.bottom_offset();
            state.velocity.y = 0.0;
            state.velocity_before_jump = Vec3::ZERO;
            state.gravity_enabled = false;

            if was_grounded {
                GroundingTransition::None
            } else {
                GroundingTransition::Landed
            }
        }
        None => {
            if was_grounded {
                state.velocity_before_jump = state.horizontal_velocity() * 0.5;
            }

            state.support = Support::Airborne(AirPhase::Falling);
            state.gravity_enabled = true;

            if state.velocity.y < 0.0 {
                state.velocity.y += config.gravity.y * (config.fall_multiplier - 1.0) * dt;
            }

            state.detach_platform();

            if was_grounded {
                GroundingTransition::LeftGround
            } else {
                GroundingTransition::None
            }
        }
    }
}

/// Update every character's support from its latest ground probe.
pub fn update_grounding(
    time: Res<Time<Fixed>>,
    mut q_characters: Query<(
        Entity,
        &mut MovementState,
        &MovementConfig,
        &CharacterCapsule,
        &ControllerSensors,
    )>,
    q_platforms: Query<(), With<MovingPlatform>>,
) {
    let dt = fixed_dt(&time);

    for (entity, mut state, config, capsule, sensors) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }

        let on_moving_platform = sensors
            .ground
            .and_then(|hit| hit.data.entity)
            .is_some_and(|surface| q_platforms.contains(surface));

        let transition = resolve_grounding(
            &mut state,
            sensors.ground.as_ref(),
            on_moving_platform,
            config,
            capsule,
            dt,
        );

        match transition {
            GroundingTransition::Landed => debug!(
                "{entity}: landed at {} (slope {:.1} deg)",
                state.position,
                state.slope_angle().unwrap_or_default()
            ),
            GroundingTransition::LeftGround => debug!(
                "{entity}: left ground, carrying {}",
                state.velocity_before_jump
            ),
            GroundingTransition::None => {}
        }
    }
}
