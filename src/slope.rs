//! Steep slope handling.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::state::{MovementState, Support};
use crate::systems::fixed_dt;

/// Angle between world up and `normal`, in degrees.
///
/// Zero-length or non-finite normals count as flat ground.
pub fn slope_angle(normal: Vec3) -> f32 {
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return 0.0;
    }
    normal.dot(Vec3::Y).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Whether a slope is too steep to stand on. The maximum itself is walkable.
#[inline]
pub fn is_too_steep(slope_angle: f32, max_slope_angle: f32) -> bool {
    slope_angle > max_slope_angle
}

/// Direction straight down the slope with the given normal.
///
/// This is world up projected onto the ground plane, pointing downhill. Its
/// length is the sine of the slope angle, so flat ground yields zero.
pub fn downslope_direction(normal: Vec3) -> Vec3 {
    let normal = normal.normalize_or(Vec3::Y);
    let along = Vec3::Y - normal * normal.dot(Vec3::Y);
    if along.y > 0.0 {
        -along
    } else {
        along
    }
}

/// Classify the current ground contact and slide if it is too steep.
///
/// Returns whether the character is sliding. Sliding replaces the velocity
/// with the downslope slide velocity and ends any dash.
pub fn resolve_slope(state: &mut MovementState, config: &MovementConfig, dt: f32) -> bool {
    let Support::Grounded(mut contact) = state.support else {
        return false;
    };

    contact.sliding = is_too_steep(contact.slope_angle, config.max_slope_angle);
    state.support = Support::Grounded(contact);

    if contact.sliding {
        state.end_dash();
        state.velocity =
            downslope_direction(contact.normal) * config.slide_speed * dt * config.speed_scale;
    }

    contact.sliding
}

/// Slide characters standing on slopes steeper than `max_slope_angle`.
pub fn apply_slope_sliding(
    time: Res<Time<Fixed>>,
    mut q_characters: Query<(Entity, &mut MovementState, &MovementConfig)>,
) {
    let dt = fixed_dt(&time);

    for (entity, mut state, config) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }

        let was_sliding = state.is_sliding();
        let sliding = resolve_slope(&mut state, config, dt);
        if sliding != was_sliding {
            debug!("{entity}: sliding = {sliding}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{DashState, GroundContact};

    fn grounded(slope_angle: f32, normal: Vec3) -> MovementState {
        let mut state = MovementState::new();
        state.support = Support::Grounded(GroundContact {
            point: Vec3::ZERO,
            normal,
            slope_angle,
            surface: None,
            on_moving_platform: false,
            sliding: false,
        });
        state
    }

    fn normal_for(degrees: f32) -> Vec3 {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Vec3::new(sin, cos, 0.0)
    }

    #[test]
    fn flat_ground_has_zero_angle() {
        assert_eq!(slope_angle(Vec3::Y), 0.0);
    }

    #[test]
    fn angle_of_tilted_normal() {
        assert!((slope_angle(normal_for(30.0)) - 30.0).abs() < 1e-3);
        // Unnormalized input
        assert!((slope_angle(normal_for(30.0) * 4.0) - 30.0).abs() < 1e-3);
    }

    #[test]
    fn degenerate_normals_are_flat() {
        assert_eq!(slope_angle(Vec3::ZERO), 0.0);
        assert_eq!(slope_angle(Vec3::new(f32::NAN, 1.0, 0.0)), 0.0);
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!is_too_steep(35.0, 35.0));
        assert!(is_too_steep(36.0, 35.0));
        assert!(!is_too_steep(34.0, 35.0));
    }

    #[test]
    fn downslope_points_down_the_hill() {
        // Normal leaning toward +X: the hill descends toward +X
        let down = downslope_direction(normal_for(45.0));
        assert!(down.y < 0.0);
        assert!(down.x > 0.0);
        assert!(down.dot(normal_for(45.0)).abs() < 1e-5);
        assert!((down.length() - 45f32.to_radians().sin()).abs() < 1e-5);
    }

    #[test]
    fn downslope_on_flat_ground_is_zero() {
        assert!(downslope_direction(Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn slope_at_maximum_does_not_slide() {
        let config = MovementConfig::default();
        let mut state = grounded(35.0, normal_for(35.0));
        state.velocity = Vec3::new(1.0, 0.0, 0.0);

        assert!(!resolve_slope(&mut state, &config, 0.02));
        assert!(!state.is_sliding());
        assert_eq!(state.velocity, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn slope_above_maximum_slides_and_cancels_dash() {
        let config = MovementConfig::default();
        let mut state = grounded(36.0, normal_for(36.0));
        state.can_dash = false;
        state.dash = Some(DashState {
            direction: Vec3::Z,
            origin: Vec3::ZERO,
            velocity_before: Vec3::ZERO,
        });

        let dt = 0.02;
        assert!(resolve_slope(&mut state, &config, dt));
        assert!(state.is_sliding());
        assert!(!state.is_dashing());

        let expected = downslope_direction(normal_for(36.0)) * config.slide_speed * dt * 100.0;
        assert!((state.velocity - expected).length() < 1e-5);
        assert!(state.velocity.y < 0.0);
    }

    #[test]
    fn airborne_never_slides() {
        let config = MovementConfig::default();
        let mut state = MovementState::new();
        assert!(!resolve_slope(&mut state, &config, 0.02));
        assert!(!state.is_sliding());
    }
}
