//! Controller configuration components.
//!
//! This module defines the tuning constants for the movement pipeline
//! (speeds, heights, angles, multipliers, probe distances) and the capsule
//! description used by the ground and obstacle probes.

use bevy::prelude::*;

/// Shape of the character's capsule collider, as seen by the probes.
///
/// The transform origin of a character is its pivot. By default the pivot is
/// at the feet: the capsule center sits `height / 2` above the origin, so the
/// capsule bottom coincides with the transform translation.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct CharacterCapsule {
    /// Capsule radius.
    pub radius: f32,
    /// Total capsule height, hemispheres included.
    pub height: f32,
    /// Capsule center relative to the transform origin (unrotated).
    pub center: Vec3,
}

impl CharacterCapsule {
    /// Create a feet-pivot capsule.
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius,
            height,
            center: Vec3::Y * height * 0.5,
        }
    }

    /// Builder: set the capsule center offset.
    pub fn with_center(mut self, center: Vec3) -> Self {
        self.center = center;
        self
    }

    /// Half the length of the capsule's inner segment.
    #[inline]
    pub fn half_segment(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }

    /// World position of the lowest point of the capsule.
    pub fn bottom(&self, position: Vec3, yaw: f32) -> Vec3 {
        position + Quat::from_rotation_y(yaw.to_radians()) * self.center
            - Vec3::Y * self.height * 0.5
    }

    /// Vertical distance from the transform origin down to the capsule bottom.
    #[inline]
    pub fn bottom_offset(&self) -> f32 {
        self.height * 0.5 - self.center.y
    }

    /// Whether the dimensions describe a real capsule.
    pub fn is_valid(&self) -> bool {
        self.radius.is_finite()
            && self.height.is_finite()
            && self.radius > 0.0
            && self.height >= 2.0 * self.radius
    }
}

impl Default for CharacterCapsule {
    fn default() -> Self {
        Self::new(0.5, 2.0)
    }
}

/// Configuration parameters for the movement pipeline.
///
/// Speeds given "per tick" (`move_speed`, `slide_speed`) are multiplied by
/// `dt * speed_scale` before becoming velocities, so a `move_speed` of 3 at a
/// 50 Hz fixed step yields 6 units per second.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct MovementConfig {
    // === Movement Settings ===
    /// Horizontal movement speed.
    pub move_speed: f32,

    /// Multiplier turning `speed * dt` into a velocity.
    pub speed_scale: f32,

    /// Fraction of `move_speed` available while airborne.
    pub air_speed_factor: f32,

    /// Smoothing time for turning toward the movement heading (seconds).
    pub turn_smooth_time: f32,

    // === Obstacle Settings ===
    /// Height above the origin the obstacle rays start from.
    pub obstacle_probe_height: f32,

    /// Obstacle ray length beyond the capsule radius.
    pub obstacle_probe_margin: f32,

    // === Grounding Settings ===
    /// Downward sphere-cast distance for ground detection.
    pub foot_snap_distance: f32,

    /// How far above the capsule bottom the sink-prevention ray starts.
    pub sink_check_lift: f32,

    /// Sink-prevention ray length as a fraction of `foot_snap_distance`.
    pub sink_check_ratio: f32,

    /// Collision layers the probes ignore (the character's own layer).
    pub excluded_layers: u32,

    // === Slope Settings ===
    /// Maximum walkable slope angle (degrees). Steeper ground slides.
    pub max_slope_angle: f32,

    /// Sliding speed down steep slopes.
    pub slide_speed: f32,

    // === Gravity Settings ===
    /// Gravity used for the fall and low-jump multipliers.
    ///
    /// Base gravity is not applied from here: the physics engine applies its
    /// own world gravity while the controller has gravity enabled (Rapier's
    /// `RapierConfiguration::gravity`, scaled by `GravityScale`). Keep the two
    /// equal, or the extra fall and low-jump gravity will be computed
    /// against a different pull than the one the body actually feels.
    pub gravity: Vec3,

    /// Extra gravity multiplier while falling.
    pub fall_multiplier: f32,

    /// Extra gravity multiplier while rising with jump released.
    pub low_jump_multiplier: f32,

    // === Jump Settings ===
    /// Jump height. The jump force is `jump_height * jump_force_scale`.
    pub jump_height: f32,

    /// Multiplier turning `jump_height` into a force.
    pub jump_force_scale: f32,

    /// Horizontal boost along the movement direction on a double jump.
    pub jump_boost: f32,

    /// Rate at which carried horizontal momentum decays in the air.
    pub air_momentum_decay: f32,

    // === Dash Settings ===
    /// Horizontal dash speed (units/second).
    pub dash_speed: f32,

    /// Distance after which a dash ends.
    pub dash_length: f32,

    /// A dash ends when the movement direction turns away from the dash
    /// direction by more than this angle (degrees).
    pub dash_cancel_angle: f32,

    // === Respawn Settings ===
    /// Height below which the character is respawned. `None` disables it.
    pub kill_plane_height: Option<f32>,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            // Movement settings
            move_speed: 3.0,
            speed_scale: 100.0,
            air_speed_factor: 0.25,
            turn_smooth_time: 0.1,

            // Obstacle settings
            obstacle_probe_height: 0.5,
            obstacle_probe_margin: 0.2,

            // Grounding settings
            foot_snap_distance: 0.01,
            sink_check_lift: 0.1,
            sink_check_ratio: 0.9,
            excluded_layers: 0,

            // Slope settings
            max_slope_angle: 35.0,
            slide_speed: 5.0,

            // Gravity settings
            gravity: Vec3::new(0.0, -9.81, 0.0),
            fall_multiplier: 2.5,
            low_jump_multiplier: 2.0,

            // Jump settings
            jump_height: 3.0,
            jump_force_scale: 100.0,
            jump_boost: 5.0,
            air_momentum_decay: 3.0,

            // Dash settings
            dash_speed: 12.0,
            dash_length: 3.0,
            dash_cancel_angle: 100.0,

            // Respawn settings
            kill_plane_height: Some(-20.0),
        }
    }
}

impl MovementConfig {
    /// Create a config optimized for responsive player control.
    pub fn player() -> Self {
        Self::default()
    }

    /// A floatier config: stronger air control, gentler fall.
    pub fn floaty() -> Self {
        Self {
            air_speed_factor: 0.5,
            fall_multiplier: 1.5,
            low_jump_multiplier: 1.5,
            air_momentum_decay: 1.5,
            ..default()
        }
    }

    /// Ground speed for one tick of `dt` seconds.
    #[inline]
    pub fn ground_speed(&self, dt: f32) -> f32 {
        self.move_speed * dt * self.speed_scale
    }

    /// Length of the obstacle rays for a capsule of `radius`.
    #[inline]
    pub fn obstacle_probe_length(&self, radius: f32) -> f32 {
        radius + self.obstacle_probe_margin
    }

    /// Length of the sink-prevention ray.
    #[inline]
    pub fn sink_check_distance(&self) -> f32 {
        self.foot_snap_distance * self.sink_check_ratio
    }

    /// Builder: set movement speed.
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Builder: set maximum walkable slope angle (degrees).
    pub fn with_max_slope_angle(mut self, degrees: f32) -> Self {
        self.max_slope_angle = degrees;
        self
    }

    /// Builder: set slide speed.
    pub fn with_slide_speed(mut self, speed: f32) -> Self {
        self.slide_speed = speed;
        self
    }

    /// Builder: set jump height.
    pub fn with_jump_height(mut self, height: f32) -> Self {
        self.jump_height = height;
        self
    }

    /// Builder: set gravity vector.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: set fall and low-jump multipliers.
    pub fn with_gravity_multipliers(mut self, fall: f32, low_jump: f32) -> Self {
        self.fall_multiplier = fall;
        self.low_jump_multiplier = low_jump;
        self
    }

    /// Builder: set dash parameters.
    pub fn with_dash(mut self, speed: f32, length: f32) -> Self {
        self.dash_speed = speed;
        self.dash_length = length;
        self
    }

    /// Builder: set ground snap distance.
    pub fn with_foot_snap_distance(mut self, distance: f32) -> Self {
        self.foot_snap_distance = distance;
        self
    }

    /// Builder: set excluded collision layers.
    pub fn with_excluded_layers(mut self, layers: u32) -> Self {
        self.excluded_layers = layers;
        self
    }

    /// Builder: set the kill plane height.
    pub fn with_kill_plane(mut self, height: Option<f32>) -> Self {
        self.kill_plane_height = height;
        self
    }
}
