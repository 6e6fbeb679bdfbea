//! Camera heading.
//!
//! Movement input is camera-relative: pushing "forward" moves the character
//! away from the camera. The controller only needs the camera's yaw, which it
//! reads from [`CameraHeading`]. Set it yourself, or add [`FollowCamera`] to
//! have it synchronized from a camera entity every tick.

use bevy::prelude::*;

use crate::state::direction_yaw;

/// World yaw of the camera driving a character, in degrees.
///
/// Uses the same convention as the character's facing: 0 looks along +Z,
/// 90 along +X.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct CameraHeading {
    /// Camera yaw in degrees.
    pub yaw: f32,
}

impl CameraHeading {
    /// Create a heading from a yaw in degrees.
    pub fn new(yaw: f32) -> Self {
        Self { yaw }
    }
}

/// Camera entity whose transform drives a character's [`CameraHeading`].
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq)]
#[reflect(Component)]
pub struct FollowCamera(pub Entity);

/// Copy the yaw of each followed camera into the character's heading.
///
/// A camera looking straight down has no meaningful yaw; the previous
/// heading is kept in that case.
pub fn sync_camera_heading(
    mut q_characters: Query<(&FollowCamera, &mut CameraHeading)>,
    q_cameras: Query<&GlobalTransform>,
) {
    for (follow, mut heading) in &mut q_characters {
        let Ok(camera) = q_cameras.get(follow.0) else {
            continue;
        };

        if let Some(yaw) = direction_yaw(*camera.forward()) {
            heading.yaw = yaw;
        }
    }
}
