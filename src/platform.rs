//! Moving platform attachment.
//!
//! A character standing on a collider tagged [`MovingPlatform`] rides along
//! with the platform's root entity (the collider's parent, or the collider
//! itself when it has none). The transform hierarchy is left alone: the
//! attachment is a non-owning entity reference plus the anchor pose and the
//! character's offset in anchor space, both recorded at the end of every tick.
//! At the start of the next tick the character is moved by however far that
//! offset point was carried by the anchor in between.

use bevy::prelude::*;

use crate::state::MovementState;

/// Marker for colliders the character should ride along with.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct MovingPlatform;

/// A character's link to the platform it is riding.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct PlatformAttachment {
    /// Root entity of the platform.
    pub platform: Entity,
    /// Global pose of the platform when the offset was recorded.
    pub anchor: Transform,
    /// Character position in the anchor's local space.
    pub offset: Vec3,
}

impl PlatformAttachment {
    /// Attach to `platform`, currently at `anchor`, with the character at
    /// `position`.
    pub fn new(platform: Entity, anchor: Transform, position: Vec3) -> Self {
        Self {
            platform,
            anchor,
            offset: local_offset(&anchor, position),
        }
    }

    /// How far the platform has moved the character since the anchor was
    /// recorded.
    pub fn displacement(&self, current: &Transform) -> Vec3 {
        current.transform_point(self.offset) - self.anchor.transform_point(self.offset)
    }

    /// Record a new anchor pose and character position.
    pub fn rebase(&mut self, anchor: Transform, position: Vec3) {
        self.anchor = anchor;
        self.offset = local_offset(&anchor, position);
    }
}

fn local_offset(anchor: &Transform, position: Vec3) -> Vec3 {
    let local = anchor.compute_affine().inverse().transform_point3(position);
    if local.is_finite() {
        local
    } else {
        // Degenerate (zero) scale: fall back to a plain translation offset
        position - anchor.translation
    }
}

/// Root entity of the platform a surface belongs to.
pub fn platform_root(surface: Entity, parents: &Query<&ChildOf>) -> Entity {
    parents
        .get(surface)
        .map(|child_of| child_of.parent())
        .unwrap_or(surface)
}

/// Move attached characters along with their platform.
///
/// Runs at the start of the tick, before grounding, so the ground probe sees
/// the character where the platform carried it. A platform that no longer
/// exists releases the character.
pub fn carry_with_platform(
    mut q_characters: Query<(Entity, &mut MovementState)>,
    q_anchors: Query<&GlobalTransform>,
) {
    for (entity, mut state) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }
        let Some(attachment) = state.attached_platform else {
            continue;
        };

        match q_anchors.get(attachment.platform) {
            Ok(anchor) => {
                let delta = attachment.displacement(&anchor.compute_transform());
                state.position += delta;
            }
            Err(_) => {
                debug!(
                    "{entity}: platform {} is gone, detaching",
                    attachment.platform
                );
                state.detach_platform();
            }
        }
    }
}

/// Attach, switch or detach platforms based on this tick's support, then
/// rebase the attachment on the platform's current pose.
///
/// Rebasing also happens while frozen, so an unfrozen character does not
/// jump by everything the platform did in the meantime.
pub fn update_platform_attachment(
    mut q_characters: Query<(Entity, &mut MovementState)>,
    q_parents: Query<&ChildOf>,
    q_anchors: Query<&GlobalTransform>,
) {
    for (entity, mut state) in &mut q_characters {
        let state = &mut *state;

        if !state.is_frozen() {
            let riding = state
                .ground()
                .filter(|contact| contact.on_moving_platform)
                .and_then(|contact| contact.surface)
                .map(|surface| platform_root(surface, &q_parents));

            match riding {
                Some(root) if state.attached_platform() != Some(root) => {
                    if let Ok(anchor) = q_anchors.get(root) {
                        if let Some(previous) = state.detach_platform() {
                            debug!("{entity}: leaving platform {}", previous.platform);
                        }
                        state.attached_platform = Some(PlatformAttachment::new(
                            root,
                            anchor.compute_transform(),
                            state.position,
                        ));
                        // Attaching is not leaving: the scale stays as is
                        state.reset_scale = false;
                        debug!("{entity}: attached to platform {root}");
                    }
                }
                Some(_) => {}
                None => {
                    if let Some(previous) = state.detach_platform() {
                        debug!("{entity}: detached from platform {}", previous.platform);
                    }
                }
            }
        }

        let Some(platform) = state.attached_platform() else {
            continue;
        };
        match q_anchors.get(platform) {
            Ok(anchor) => {
                let position = state.position;
                if let Some(attachment) = state.attached_platform.as_mut() {
                    attachment.rebase(anchor.compute_transform(), position);
                }
            }
            Err(_) => {
                state.detach_platform();
            }
        }
    }
}
