//! # `msg_platformer_controller`
//!
//! A third-person platformer character controller with physics backend
//! abstraction.
//!
//! This crate turns directional, jump and dash input into motion for a
//! dynamic capsule body:
//! - Sphere-cast ground detection with a sink-prevention fallback ray
//! - Camera-relative movement with obstacle sliding and smoothed facing
//! - Sliding down slopes steeper than a configurable angle
//! - Jumps with a low-jump cut, an unlockable double jump and air momentum
//! - Distance-limited dashes that cancel when steering away
//! - Riding moving platforms without touching the transform hierarchy
//! - Abstracts the physics backend (Rapier3D included)
//!
//! ## Architecture
//!
//! Every fixed tick runs the same pipeline, one [`ControllerSet`] after the
//! other:
//! 1. The body's velocity and pose and the input are copied into
//!    [`MovementState`](state::MovementState), and queued commands run
//! 2. The backend probes the ground and nearby obstacles
//! 3. Grounding, movement, slopes, jumps and dashes update the state in order
//! 4. Platform bookkeeping runs and the state is written back to the body
//!
//! The physics engine then integrates the written velocity as usual. For
//! Rapier, run the physics in the fixed schedule as well
//! (`RapierPhysicsPlugin::default().in_fixed_schedule()`); the Rapier backend
//! orders the whole controller tick before the physics step.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_platformer_controller::prelude::*;
//!
//! // Create controller components for a character with the double jump
//! let state = MovementState::new().with_double_jump();
//! let config = MovementConfig::player().with_dash(15.0, 4.0);
//! let capsule = CharacterCapsule::new(0.5, 2.0);
//!
//! // Queue a jump for the next tick
//! let mut commands = MovementCommands::default();
//! commands.jump();
//! assert_eq!(commands.len(), 1);
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod camera;
pub mod collision;
pub mod config;
pub mod dashing;
pub mod error;
pub mod grounding;
pub mod intent;
pub mod jumping;
pub mod locomotion;
pub mod platform;
pub mod sensors;
pub mod slope;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::camera::{CameraHeading, FollowCamera};
    pub use crate::collision::{CastFilter, CollisionData, SceneQuery};
    pub use crate::config::{CharacterCapsule, MovementConfig};
    pub use crate::error::ControllerError;
    pub use crate::intent::{MovementCommand, MovementCommands, MovementIntent, MovementTrigger};
    pub use crate::platform::MovingPlatform;
    pub use crate::sensors::{ControllerSensors, GroundHit, ProbeSource};
    pub use crate::state::{AirPhase, DashState, GroundContact, MovementState, Support};
    pub use crate::{ControllerSet, PlatformerControllerPlugin};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// Phases of the controller tick, chained in declaration order in
/// `FixedUpdate`.
///
/// Backends add their sensor system to [`ControllerSet::Sensors`]; game code
/// can order its own systems relative to any phase.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Read body state and input.
    Preparation,
    /// Platform carry, kill plane and queued commands.
    Commands,
    /// Ground probe and obstacle rays.
    Sensors,
    /// Landing and leaving the ground.
    Grounding,
    /// Movement velocity and facing.
    Movement,
    /// Steep slope sliding.
    Slopes,
    /// Jump and dash overrides.
    Overrides,
    /// Platform attachment bookkeeping.
    Platforms,
    /// Write the state back to the body.
    FinalApplication,
}

/// Main plugin for the movement controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (body access, scene queries).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use msg_platformer_controller::prelude::*;
///
/// App::new()
///     .add_plugins((MinimalPlugins, TransformPlugin))
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(PlatformerControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct PlatformerControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for PlatformerControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for PlatformerControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::CharacterCapsule>();
        app.register_type::<config::MovementConfig>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<intent::MovementCommands>();
        app.register_type::<state::MovementState>();
        app.register_type::<camera::CameraHeading>();
        app.register_type::<camera::FollowCamera>();
        app.register_type::<platform::MovingPlatform>();

        app.add_event::<intent::MovementTrigger>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                ControllerSet::Preparation,
                ControllerSet::Commands,
                ControllerSet::Sensors,
                ControllerSet::Grounding,
                ControllerSet::Movement,
                ControllerSet::Slopes,
                ControllerSet::Overrides,
                ControllerSet::Platforms,
                ControllerSet::FinalApplication,
            )
                .chain(),
        );

        app.add_systems(
            FixedUpdate,
            (
                (
                    systems::collect_movement_triggers,
                    camera::sync_camera_heading,
                    systems::read_body_state::<B>,
                    systems::sample_input,
                )
                    .chain()
                    .in_set(ControllerSet::Preparation),
                (
                    platform::carry_with_platform,
                    systems::check_kill_plane,
                    systems::apply_movement_commands,
                )
                    .chain()
                    .in_set(ControllerSet::Commands),
                grounding::update_grounding.in_set(ControllerSet::Grounding),
                (locomotion::apply_movement, locomotion::apply_rotation)
                    .chain()
                    .in_set(ControllerSet::Movement),
                slope::apply_slope_sliding.in_set(ControllerSet::Slopes),
                (jumping::apply_jumping, dashing::apply_dashing)
                    .chain()
                    .in_set(ControllerSet::Overrides),
                platform::update_platform_attachment.in_set(ControllerSet::Platforms),
                systems::write_body_state::<B>.in_set(ControllerSet::FinalApplication),
            ),
        );
    }
}
