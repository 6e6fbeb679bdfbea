//! Dashing.
//!
//! A dash locks the current movement direction and overrides the horizontal
//! velocity until the character has covered `dash_length`, or until the
//! player steers away from the dash direction. Obstacles, steep slopes and
//! landing end a dash from their own stages.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::state::{direction_yaw, DashState, MovementState};

/// Why a dash ended during [`update_dash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashEnd {
    /// The dash covered its full length.
    Completed,
    /// Movement input turned too far away from the dash direction.
    Steered,
}

/// Handle a dash request.
///
/// Does nothing and returns `false` when no dash is available or there is no
/// movement direction to dash along.
pub fn trigger_dash(state: &mut MovementState) -> bool {
    if !state.can_dash {
        return false;
    }
    let direction = state.move_direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return false;
    }

    state.dash = Some(DashState {
        direction,
        origin: state.position,
        velocity_before: state.velocity,
    });
    state.can_dash = false;

    if let Some(yaw) = direction_yaw(direction) {
        state.yaw = yaw;
        state.turn_velocity = 0.0;
    }

    true
}

/// Per-tick dash velocity override and termination.
pub fn update_dash(state: &mut MovementState, config: &MovementConfig) -> Option<DashEnd> {
    let dash = state.dash?;

    state.velocity = Vec3::new(0.0, state.velocity.y, 0.0) + dash.direction * config.dash_speed;

    if dash.origin.distance(state.position) >= config.dash_length {
        state.end_dash();
        if state.is_grounded() {
            state.velocity = Vec3::ZERO;
        } else {
            state.velocity_before_jump = state.horizontal_velocity();
        }
        return Some(DashEnd::Completed);
    }

    if state.move_direction != Vec3::ZERO
        && state.move_direction.angle_between(dash.direction).to_degrees()
            > config.dash_cancel_angle
    {
        state.end_dash();
        return Some(DashEnd::Steered);
    }

    None
}

/// Run the per-tick dash logic for every character.
pub fn apply_dashing(mut q_characters: Query<(Entity, &mut MovementState, &MovementConfig)>) {
    for (entity, mut state, config) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }

        match update_dash(&mut state, config) {
            Some(DashEnd::Completed) => debug!("{entity}: dash completed at {}", state.position),
            Some(DashEnd::Steered) => debug!("{entity}: dash cancelled by steering"),
            None => {}
        }
    }
}
