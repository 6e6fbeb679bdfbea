//! Controller errors.
//!
//! The movement pipeline itself never fails: missing ground is just being
//! airborne and zero-length directions are no-ops. The only failures are
//! configuration mistakes that make the controller impossible to run, and
//! those are surfaced the first time a character is ticked.

use bevy::prelude::*;
use thiserror::Error;

/// Fatal configuration error for a character controller entity.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControllerError {
    /// The entity has no physics body the backend can drive.
    #[error("character {0} has no physics body ({1} is missing)")]
    MissingBody(Entity, &'static str),

    /// The entity has no [`CharacterCapsule`](crate::config::CharacterCapsule).
    #[error("character {0} has no CharacterCapsule describing its collider")]
    MissingCapsule(Entity),

    /// The capsule dimensions cannot describe a real capsule.
    #[error("character {entity} has an invalid capsule (radius {radius}, height {height})")]
    InvalidCapsule {
        entity: Entity,
        radius: f32,
        height: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_entity() {
        let entity = Entity::from_raw(7);
        let err = ControllerError::MissingBody(entity, "Velocity");
        let message = err.to_string();
        assert!(message.contains("Velocity"));
        assert!(message.contains(&format!("{entity}")));
    }

    #[test]
    fn invalid_capsule_reports_dimensions() {
        let err = ControllerError::InvalidCapsule {
            entity: Entity::from_raw(1),
            radius: 0.0,
            height: 2.0,
        };
        assert!(err.to_string().contains("radius 0"));
    }
}
