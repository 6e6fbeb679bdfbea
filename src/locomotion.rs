//! Horizontal movement and facing.
//!
//! Input is rotated into world space by the camera yaw, scaled by the move
//! speed (a quarter of it in the air) and combined with momentum carried over
//! from the ground. Obstacle rays then strip the velocity components pointing
//! into nearby walls, which slides the character along them.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::sensors::ControllerSensors;
use crate::state::{heading_direction, MovementState};
use crate::systems::fixed_dt;

/// World yaw, in degrees, that camera-relative `input` points at.
#[inline]
pub fn target_yaw(input: Vec2, camera_yaw: f32) -> f32 {
    input.x.atan2(input.y).to_degrees() + camera_yaw
}

/// Shortest signed difference from `current` to `target`, in degrees,
/// in `(-180, 180]`.
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let delta = (target - current).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}

/// Critically damped spring toward `target`, taking the short way around.
///
/// `velocity` is the angular velocity carried between calls. The result never
/// overshoots the target.
pub fn smooth_damp_angle(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    let target = current + delta_angle(current, target);
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(1e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }

    output
}

/// Strip the components of `velocity` along each blocked direction, in order.
///
/// Each subtraction works on the already reduced velocity, so two walls at an
/// angle can remove more than either would alone.
pub fn remove_blocked_components(
    mut velocity: Vec3,
    blocked: impl IntoIterator<Item = Vec3>,
) -> Vec3 {
    for direction in blocked {
        let direction = direction.normalize_or_zero();
        velocity -= direction * velocity.dot(direction);
    }
    velocity
}

/// Compute this tick's movement velocity.
pub fn integrate_movement(
    state: &mut MovementState,
    sensors: &ControllerSensors,
    config: &MovementConfig,
    dt: f32,
) {
    let input = state.input;

    if input.length_squared() > 0.0 {
        let direction = heading_direction(target_yaw(input, state.camera_yaw));
        let mut speed = config.ground_speed(dt);
        if !state.is_grounded() {
            speed *= config.air_speed_factor;
        }

        let horizontal = direction * speed + state.velocity_before_jump;
        state.move_direction = direction;
        state.velocity = Vec3::new(horizontal.x, state.velocity.y, horizontal.z);
        state.is_moving = horizontal.length_squared() > 0.0;

        if sensors.obstacles.any() {
            state.velocity =
                remove_blocked_components(state.velocity, sensors.obstacles.blocked_directions());
            state.end_dash();
        }
    } else {
        state.move_direction = Vec3::ZERO;
        state.is_moving = false;

        if state.is_grounded() {
            state.velocity = Vec3::ZERO;
        } else {
            state.velocity.x = state.velocity_before_jump.x;
            state.velocity.z = state.velocity_before_jump.z;
        }
    }
}

/// Turn toward the input heading. No input keeps the current facing.
pub fn turn_toward_input(state: &mut MovementState, config: &MovementConfig, dt: f32) {
    if state.input.length_squared() == 0.0 {
        return;
    }

    let target = target_yaw(state.input, state.camera_yaw);
    state.yaw = smooth_damp_angle(
        state.yaw,
        target,
        &mut state.turn_velocity,
        config.turn_smooth_time,
        dt,
    );
}

/// Movement velocity and obstacle sliding for every character.
pub fn apply_movement(
    time: Res<Time<Fixed>>,
    mut q_characters: Query<(Entity, &mut MovementState, &MovementConfig, &ControllerSensors)>,
) {
    let dt = fixed_dt(&time);

    for (entity, mut state, config, sensors) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }

        let was_dashing = state.is_dashing();
        integrate_movement(&mut state, sensors, config, dt);
        if was_dashing && !state.is_dashing() {
            debug!("{entity}: dash stopped by obstacle");
        }
    }
}

/// Facing update for every character.
pub fn apply_rotation(
    time: Res<Time<Fixed>>,
    mut q_characters: Query<(&mut MovementState, &MovementConfig)>,
) {
    let dt = fixed_dt(&time);

    for (mut state, config) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }
        turn_toward_input(&mut state, config, dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionData;
    use crate::state::{DashState, GroundContact, Support};

    fn grounded_state() -> MovementState {
        let mut state = MovementState::new();
        state.support = Support::Grounded(GroundContact {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            slope_angle: 0.0,
            surface: None,
            on_moving_platform: false,
            sliding: false,
        });
        state
    }

    fn blocked(directions: &[(usize, Vec3)]) -> ControllerSensors {
        let mut sensors = ControllerSensors::default();
        for (index, direction) in directions {
            sensors.obstacles.directions[*index] = *direction;
            sensors.obstacles.hits[*index] =
                Some(CollisionData::new(0.3, -*direction, Vec3::ZERO, None));
        }
        sensors
    }

    #[test]
    fn input_right_with_zero_camera_moves_along_x() {
        let config = MovementConfig::default();
        let mut state = grounded_state();
        state.input = Vec2::new(1.0, 0.0);
        let dt = 0.02;

        integrate_movement(&mut state, &ControllerSensors::default(), &config, dt);

        let horizontal = state.horizontal_velocity();
        assert!((horizontal.normalize() - Vec3::X).length() < 1e-5);
        assert!((horizontal.length() - 3.0 * dt * 100.0).abs() < 1e-4);
        assert!(state.is_moving);
        assert!((state.move_direction - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn camera_yaw_rotates_input() {
        let config = MovementConfig::default();
        let mut state = grounded_state();
        state.input = Vec2::new(0.0, 1.0);
        state.camera_yaw = 90.0;

        integrate_movement(&mut state, &ControllerSensors::default(), &config, 0.02);

        assert!((state.move_direction - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn airborne_input_is_reduced_and_keeps_momentum() {
        let config = MovementConfig::default();
        let mut state = MovementState::new();
        state.input = Vec2::new(0.0, 1.0);
        state.velocity = Vec3::new(0.0, -3.0, 0.0);
        state.velocity_before_jump = Vec3::new(1.0, 0.0, 0.0);
        let dt = 0.02;

        integrate_movement(&mut state, &ControllerSensors::default(), &config, dt);

        let expected_z = 3.0 * dt * 100.0 * 0.25;
        assert!((state.velocity.z - expected_z).abs() < 1e-5);
        assert!((state.velocity.x - 1.0).abs() < 1e-6);
        assert_eq!(state.velocity.y, -3.0);
    }

    #[test]
    fn no_input_on_ground_stops_dead() {
        let config = MovementConfig::default();
        let mut state = grounded_state();
        state.velocity = Vec3::new(5.0, 0.0, 5.0);
        state.move_direction = Vec3::X;
        state.is_moving = true;

        integrate_movement(&mut state, &ControllerSensors::default(), &config, 0.02);

        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.move_direction, Vec3::ZERO);
        assert!(!state.is_moving);
    }

    #[test]
    fn no_input_in_air_keeps_only_carried_velocity() {
        let config = MovementConfig::default();
        let mut state = MovementState::new();
        state.velocity = Vec3::new(7.0, -1.0, 3.0);
        state.velocity_before_jump = Vec3::new(2.0, 0.0, 0.0);

        integrate_movement(&mut state, &ControllerSensors::default(), &config, 0.02);

        assert_eq!(state.horizontal_velocity(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(state.velocity.y, -1.0);
    }

    #[test]
    fn wall_ahead_removes_forward_component() {
        let config = MovementConfig::default();
        let mut state = grounded_state();
        state.input = Vec2::new(1.0, 1.0).normalize();
        let sensors = blocked(&[(0, Vec3::Z)]);

        integrate_movement(&mut state, &sensors, &config, 0.02);

        assert!(state.velocity.z.abs() < 1e-5);
        assert!(state.velocity.x > 0.0);
        // Input was there, the character still counts as moving
        assert!(state.is_moving);
    }

    #[test]
    fn obstacle_cancels_dash() {
        let config = MovementConfig::default();
        let mut state = grounded_state();
        state.input = Vec2::new(0.0, 1.0);
        state.can_dash = false;
        state.dash = Some(DashState {
            direction: Vec3::Z,
            origin: Vec3::ZERO,
            velocity_before: Vec3::ZERO,
        });

        integrate_movement(&mut state, &blocked(&[(3, Vec3::X)]), &config, 0.02);

        assert!(!state.is_dashing());
    }

    #[test]
    fn sequential_removal_is_order_dependent() {
        let velocity = Vec3::new(1.0, 0.0, 1.0);
        let diagonal = Vec3::new(1.0, 0.0, 1.0).normalize();

        let a = remove_blocked_components(velocity, [Vec3::X, diagonal]);
        let b = remove_blocked_components(velocity, [diagonal, Vec3::X]);

        assert!((a - b).length() > 1e-3);
    }

    #[test]
    fn delta_angle_wraps() {
        assert!((delta_angle(350.0, 10.0) - 20.0).abs() < 1e-4);
        assert!((delta_angle(10.0, 350.0) + 20.0).abs() < 1e-4);
        assert!((delta_angle(0.0, 180.0) - 180.0).abs() < 1e-4);
    }

    #[test]
    fn smooth_damp_converges_without_overshoot() {
        let mut yaw = 0.0;
        let mut velocity = 0.0;
        let mut previous = yaw;
        for _ in 0..200 {
            yaw = smooth_damp_angle(yaw, 90.0, &mut velocity, 0.1, 0.02);
            assert!(yaw <= 90.0 + 1e-4);
            assert!(yaw >= previous - 1e-4);
            previous = yaw;
        }
        assert!((yaw - 90.0).abs() < 1e-2);
    }

    #[test]
    fn smooth_damp_takes_short_way_around() {
        let mut velocity = 0.0;
        let yaw = smooth_damp_angle(350.0, 10.0, &mut velocity, 0.1, 0.02);
        assert!(yaw > 350.0, "yaw = {yaw}");
    }

    #[test]
    fn rotation_needs_input() {
        let config = MovementConfig::default();
        let mut state = grounded_state();
        state.yaw = 45.0;

        turn_toward_input(&mut state, &config, 0.02);
        assert_eq!(state.yaw, 45.0);

        state.input = Vec2::new(1.0, 0.0);
        turn_toward_input(&mut state, &config, 0.02);
        assert!(state.yaw > 45.0 && state.yaw < 90.0);
    }
}
