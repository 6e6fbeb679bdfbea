//! Movement state.
//!
//! [`MovementState`] is the single record every stage of the movement
//! pipeline reads and writes. Support (grounded or airborne) is a tagged
//! variant so that "jumping while grounded" or "sliding in the air" cannot be
//! represented; dashing is an independent modifier.

use bevy::prelude::*;

use crate::camera::CameraHeading;
use crate::config::MovementConfig;
use crate::intent::{MovementCommands, MovementIntent};
use crate::platform::PlatformAttachment;
use crate::sensors::ControllerSensors;

/// Phase of an airborne character.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirPhase {
    /// Rising after a jump.
    Rising,
    /// Falling, either after the apex of a jump or after leaving a ledge.
    Falling,
}

/// Contact with a walkable (or slideable) surface.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Contact point reported by the ground probe.
    pub point: Vec3,
    /// Surface normal at the contact (normalized).
    pub normal: Vec3,
    /// Angle between world up and the normal, in degrees.
    pub slope_angle: f32,
    /// Collider that was hit.
    pub surface: Option<Entity>,
    /// Whether the surface is tagged as a moving platform.
    pub on_moving_platform: bool,
    /// Whether the slope is too steep and the character slides down.
    pub sliding: bool,
}

/// How the character is currently supported.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum Support {
    /// Standing on ground.
    Grounded(GroundContact),
    /// In the air.
    Airborne(AirPhase),
}

impl Default for Support {
    fn default() -> Self {
        Support::Airborne(AirPhase::Falling)
    }
}

/// An active dash.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct DashState {
    /// Locked horizontal dash direction (normalized).
    pub direction: Vec3,
    /// Position the dash started from.
    pub origin: Vec3,
    /// Velocity at the moment the dash started.
    pub velocity_before: Vec3,
}

/// Per-character movement state, mutated once per fixed tick.
///
/// External systems (animation, effects, UI) should treat this as read-only
/// and poll the flag accessors between ticks.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(
    Transform,
    MovementConfig,
    MovementIntent,
    MovementCommands,
    ControllerSensors,
    CameraHeading
)]
pub struct MovementState {
    // === Transform & Body ===
    /// World position (working copy, written back at the end of the tick).
    pub position: Vec3,
    /// Facing yaw in degrees (0 = +Z, 90 = +X).
    pub yaw: f32,
    /// Rigid body velocity (working copy, written back at the end of the tick).
    pub velocity: Vec3,

    // === Support & Modifiers ===
    pub(crate) support: Support,
    pub(crate) dash: Option<DashState>,
    /// Whether the last tick produced movement from input.
    pub is_moving: bool,

    // === Jumping ===
    /// Whether an airborne jump is currently available.
    pub can_double_jump: bool,
    /// Whether the double jump ability is unlocked.
    pub double_jump_enabled: bool,
    /// Whether double jumps are never consumed.
    pub unlimited_jumps_enabled: bool,
    /// Horizontal momentum carried into the air.
    pub velocity_before_jump: Vec3,

    // === Dashing ===
    /// Whether a dash may be started.
    pub can_dash: bool,

    // === Movement ===
    /// Camera-relative world movement direction of the last tick.
    pub move_direction: Vec3,
    pub(crate) turn_velocity: f32,

    // === Platforms ===
    pub(crate) attached_platform: Option<PlatformAttachment>,
    pub(crate) reset_scale: bool,

    // === Control ===
    pub(crate) frozen: bool,
    /// Whether the physics body should currently receive gravity.
    pub gravity_enabled: bool,
    /// Where the character respawns after falling off the world.
    pub spawn_point: Option<Vec3>,

    // === Tick Inputs (sampled at the start of each tick) ===
    pub(crate) input: Vec2,
    pub(crate) jump_held: bool,
    pub(crate) camera_yaw: f32,
    pub(crate) body_mass: f32,
    pub(crate) sampled_position: Vec3,
    pub(crate) sampled_yaw: f32,
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            velocity: Vec3::ZERO,
            support: Support::default(),
            dash: None,
            is_moving: false,
            can_double_jump: false,
            double_jump_enabled: false,
            unlimited_jumps_enabled: false,
            velocity_before_jump: Vec3::ZERO,
            can_dash: true,
            move_direction: Vec3::ZERO,
            turn_velocity: 0.0,
            attached_platform: None,
            reset_scale: false,
            frozen: false,
            gravity_enabled: true,
            spawn_point: None,
            input: Vec2::ZERO,
            jump_held: false,
            camera_yaw: 0.0,
            body_mass: 1.0,
            sampled_position: Vec3::ZERO,
            sampled_yaw: 0.0,
        }
    }
}

impl MovementState {
    /// Create a new state. Position and facing are read from the body on the
    /// first tick.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: start with the double jump ability unlocked.
    pub fn with_double_jump(mut self) -> Self {
        self.double_jump_enabled = true;
        self
    }

    /// Builder: set an explicit respawn point.
    pub fn with_spawn_point(mut self, point: Vec3) -> Self {
        self.spawn_point = Some(point);
        self
    }

    /// How the character is supported.
    #[inline]
    pub fn support(&self) -> Support {
        self.support
    }

    /// Ground contact, if grounded.
    pub fn ground(&self) -> Option<&GroundContact> {
        match &self.support {
            Support::Grounded(contact) => Some(contact),
            Support::Airborne(_) => None,
        }
    }

    /// The active dash, if any.
    pub fn dash(&self) -> Option<&DashState> {
        self.dash.as_ref()
    }

    /// Check if grounded.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        matches!(self.support, Support::Grounded(_))
    }

    /// Check if rising from a jump.
    #[inline]
    pub fn is_jumping(&self) -> bool {
        matches!(self.support, Support::Airborne(AirPhase::Rising))
    }

    /// Check if falling.
    #[inline]
    pub fn is_falling(&self) -> bool {
        matches!(self.support, Support::Airborne(AirPhase::Falling))
    }

    /// Check if dashing.
    #[inline]
    pub fn is_dashing(&self) -> bool {
        self.dash.is_some()
    }

    /// Check if sliding down a steep slope.
    pub fn is_sliding(&self) -> bool {
        self.ground().is_some_and(|contact| contact.sliding)
    }

    /// Check if frozen.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Ground normal, valid only while grounded.
    pub fn ground_normal(&self) -> Option<Vec3> {
        self.ground().map(|contact| contact.normal)
    }

    /// Slope angle in degrees, valid only while grounded.
    pub fn slope_angle(&self) -> Option<f32> {
        self.ground().map(|contact| contact.slope_angle)
    }

    /// Platform entity the character is riding, if any.
    pub fn attached_platform(&self) -> Option<Entity> {
        self.attached_platform.map(|attachment| attachment.platform)
    }

    /// Velocity without its vertical component.
    #[inline]
    pub fn horizontal_velocity(&self) -> Vec3 {
        Vec3::new(self.velocity.x, 0.0, self.velocity.z)
    }

    /// Facing direction on the horizontal plane.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        heading_direction(self.yaw)
    }

    /// Right-hand direction on the horizontal plane.
    #[inline]
    pub fn right(&self) -> Vec3 {
        heading_direction(self.yaw + 90.0)
    }

    /// End the current dash, returning it if one was active.
    pub(crate) fn end_dash(&mut self) -> Option<DashState> {
        self.dash.take()
    }

    /// Release any platform and request a scale reset.
    pub(crate) fn detach_platform(&mut self) -> Option<PlatformAttachment> {
        let attachment = self.attached_platform.take();
        if attachment.is_some() {
            self.reset_scale = true;
        }
        attachment
    }

    /// Stop all physics response until [`unfreeze`](Self::unfreeze).
    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
        self.velocity = Vec3::ZERO;
        self.gravity_enabled = false;
    }

    /// Resume after a freeze. Gravity comes back unless grounded.
    pub(crate) fn unfreeze(&mut self) {
        self.frozen = false;
        self.gravity_enabled = !self.is_grounded();
    }

    /// Where a respawn without an explicit position puts the character.
    pub fn respawn_point(&self) -> Vec3 {
        self.spawn_point.unwrap_or(Vec3::ZERO)
    }

    /// Fully reset the movement state, placing the character at `position`.
    ///
    /// Unlocked abilities, the freeze flag and the spawn point survive.
    pub fn reset(&mut self, position: Vec3) {
        self.detach_platform();
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.support = Support::default();
        self.dash = None;
        self.is_moving = false;
        self.can_double_jump = false;
        self.velocity_before_jump = Vec3::ZERO;
        self.can_dash = true;
        self.move_direction = Vec3::ZERO;
        self.turn_velocity = 0.0;
        self.gravity_enabled = !self.frozen;
    }
}

/// Horizontal unit direction for a yaw in degrees (0 = +Z, 90 = +X).
#[inline]
pub fn heading_direction(yaw: f32) -> Vec3 {
    let (sin, cos) = yaw.to_radians().sin_cos();
    Vec3::new(sin, 0.0, cos)
}

/// Yaw in degrees of a horizontal direction. Returns `None` for zero vectors.
pub fn direction_yaw(direction: Vec3) -> Option<f32> {
    let flat = Vec3::new(direction.x, 0.0, direction.z);
    if flat.length_squared() <= f32::EPSILON {
        return None;
    }
    Some(flat.x.atan2(flat.z).to_degrees())
}
