//! Movement intent and command components.
//!
//! Intents are continuous signals (stick direction, jump held) sampled once
//! at the start of every tick. Commands are discrete triggers (jump, dash,
//! freeze, ...) queued per character and consumed at the start of the next
//! tick, so they never interrupt a tick in progress.

use bevy::prelude::*;

/// Continuous movement input for a character.
///
/// Write this from your input handling every frame; the controller reads it
/// once per fixed tick.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_platformer_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_direction(Vec2::new(0.0, 1.0));
/// intent.set_jump_held(true);
/// assert!(intent.is_moving());
///
/// intent.clear();
/// assert!(!intent.is_moving());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Input-space direction: `x` is right, `y` is forward (away from camera).
    pub direction: Vec2,
    /// Whether the jump button is currently held.
    pub jump_held: bool,
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement direction. Non-finite input is treated as no input.
    pub fn set_direction(&mut self, direction: Vec2) {
        self.direction = if direction.is_finite() {
            direction
        } else {
            Vec2::ZERO
        };
    }

    /// Set whether jump is held.
    pub fn set_jump_held(&mut self, held: bool) {
        self.jump_held = held;
    }

    /// Clear all movement input.
    pub fn clear(&mut self) {
        self.direction = Vec2::ZERO;
        self.jump_held = false;
    }

    /// Check if there is any directional input.
    pub fn is_moving(&self) -> bool {
        self.direction.length_squared() > 0.0
    }

    /// Direction normalized to unit length, zero when there is no input.
    pub fn normalized(&self) -> Vec2 {
        self.direction.normalize_or_zero()
    }
}

/// A discrete request for the movement controller.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub enum MovementCommand {
    /// Jump from the ground, or double jump if available.
    Jump,
    /// Dash along the current movement direction.
    Dash,
    /// Suspend all physics response.
    Freeze,
    /// Resume after a freeze.
    Unfreeze,
    /// Unlock the double jump ability.
    EnableDoubleJump,
    /// Toggle unlimited air jumps.
    ToggleUnlimitedJumps,
    /// Reset the character, at `position` or at its spawn point.
    Respawn {
        /// Where to respawn. `None` uses the stored spawn point.
        position: Option<Vec3>,
    },
}

/// Per-character command queue, drained at the start of every tick.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementCommands {
    pending: Vec<MovementCommand>,
}

impl MovementCommands {
    /// Queue a command for the next tick.
    pub fn push(&mut self, command: MovementCommand) {
        self.pending.push(command);
    }

    /// Queue a jump.
    pub fn jump(&mut self) {
        self.push(MovementCommand::Jump);
    }

    /// Queue a dash.
    pub fn dash(&mut self) {
        self.push(MovementCommand::Dash);
    }

    /// Check if any command is waiting.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Take every queued command in submission order.
    pub fn take(&mut self) -> Vec<MovementCommand> {
        std::mem::take(&mut self.pending)
    }
}

/// Event form of [`MovementCommand`], for senders that do not hold the
/// character's components.
///
/// Triggers are moved into the target's [`MovementCommands`] queue at the
/// start of the next tick.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MovementTrigger {
    /// Character the command is for.
    pub entity: Entity,
    /// The command.
    pub command: MovementCommand,
}

impl MovementTrigger {
    /// Create a trigger.
    pub fn new(entity: Entity, command: MovementCommand) -> Self {
        Self { entity, command }
    }
}
