//! Jumping, double jumping and air control.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::state::{AirPhase, MovementState, Support};
use crate::systems::fixed_dt;

/// Components of carried momentum below this are dropped.
const CARRIED_VELOCITY_EPSILON: f32 = 0.1;

/// Result of a jump request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOutcome {
    /// Jumped off the ground.
    Ground,
    /// Used the double jump.
    Air,
    /// No jump was available.
    Refused,
}

/// Handle a jump request.
///
/// Any request, even a refused one, releases the character from its
/// platform. The jump force is `velocity + up * jump_height * jump_force_scale`
/// applied over a single step.
pub fn trigger_jump(state: &mut MovementState, config: &MovementConfig, dt: f32) -> JumpOutcome {
    state.detach_platform();

    let outcome = if state.is_grounded() {
        if state.double_jump_enabled {
            state.can_double_jump = true;
        }
        JumpOutcome::Ground
    } else if state.can_double_jump {
        state.velocity.y = 0.0;
        if !state.unlimited_jumps_enabled {
            state.can_double_jump = false;
        }
        state.velocity += state.move_direction * config.jump_boost;
        JumpOutcome::Air
    } else {
        return JumpOutcome::Refused;
    };

    state.support = Support::Airborne(AirPhase::Rising);
    state.velocity_before_jump = state.horizontal_velocity();
    state.gravity_enabled = true;

    let force = state.velocity + Vec3::Y * config.jump_height * config.jump_force_scale;
    state.velocity += force * dt / state.body_mass.max(f32::EPSILON);

    outcome
}

/// Move carried momentum toward zero.
pub fn decay_carried_velocity(carried: &mut Vec3, rate: f32, dt: f32) {
    let t = (rate * dt).clamp(0.0, 1.0);
    for component in [&mut carried.x, &mut carried.z] {
        *component *= 1.0 - t;
        if component.abs() < CARRIED_VELOCITY_EPSILON {
            *component = 0.0;
        }
    }
}

/// Per-tick jump handling: the low-jump cut, the rising-to-falling switch and
/// momentum decay while airborne.
///
/// Returns `true` when the character started falling this tick.
pub fn update_jump(state: &mut MovementState, config: &MovementConfig, dt: f32) -> bool {
    let mut apex = false;

    if state.is_jumping() {
        if state.velocity.y > 0.0 && !state.jump_held {
            state.velocity.y += config.gravity.y * (config.low_jump_multiplier - 1.0) * dt;
        }
        if state.velocity.y < 0.0 {
            state.support = Support::Airborne(AirPhase::Falling);
            apex = true;
        }
    }

    if !state.is_grounded() {
        decay_carried_velocity(&mut state.velocity_before_jump, config.air_momentum_decay, dt);
    }

    apex
}

/// Run the per-tick jump logic for every character.
pub fn apply_jumping(
    time: Res<Time<Fixed>>,
    mut q_characters: Query<(Entity, &mut MovementState, &MovementConfig)>,
) {
    let dt = fixed_dt(&time);

    for (entity, mut state, config) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }
        if update_jump(&mut state, config, dt) {
            debug!("{entity}: jump apex, falling");
        }
    }
}
