//! Deterministic test backend.
//!
//! Bodies are plain components integrated with explicit Euler steps, and the
//! scene is a set of axis-aligned boxes. This keeps the controller tests free
//! of solver noise: every position and velocity is exactly predictable.

#![allow(dead_code)]

use bevy::prelude::*;
use msg_platformer_controller::prelude::*;
use msg_platformer_controller::systems::fixed_dt;

/// Fixed step used by every test app: 1/64 s is exact in binary.
pub const TEST_HZ: f64 = 64.0;

/// Seconds per test tick.
pub const DT: f32 = 1.0 / 64.0;

/// Physics body of the test backend.
#[derive(Component, Debug, Clone, Copy)]
pub struct TestBody {
    pub velocity: Vec3,
    pub gravity_enabled: bool,
    pub mass: f32,
}

impl Default for TestBody {
    fn default() -> Self {
        Self {
            velocity: Vec3::ZERO,
            gravity_enabled: true,
            mass: 1.0,
        }
    }
}

/// Axis-aligned box collider centered on the entity's translation.
#[derive(Component, Debug, Clone, Copy)]
pub struct TestCollider {
    pub half_extents: Vec3,
    /// Normal reported for hits on the top face, to fake slopes.
    pub top_normal: Vec3,
    pub layers: u32,
}

impl TestCollider {
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self {
            half_extents,
            top_normal: Vec3::Y,
            layers: 1,
        }
    }

    pub fn with_top_normal(mut self, normal: Vec3) -> Self {
        self.top_normal = normal.normalize();
        self
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }
}

/// Snapshot of the box colliders for one sensor pass.
pub struct TestScene {
    boxes: Vec<(Entity, Vec3, TestCollider)>,
}

impl TestScene {
    fn candidates<'a>(
        &'a self,
        filter: &'a CastFilter,
    ) -> impl Iterator<Item = &'a (Entity, Vec3, TestCollider)> + 'a {
        self.boxes
            .iter()
            .filter(move |(entity, _, collider)| filter.accepts(*entity, collider.layers))
    }
}

impl SceneQuery for TestScene {
    fn sphere_cast(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Dir3,
        max_distance: f32,
        filter: &CastFilter,
    ) -> Option<CollisionData> {
        // Only the downward ground probe is needed
        if direction != Dir3::NEG_Y {
            return None;
        }

        let sphere_bottom = origin.y - radius;
        self.candidates(filter)
            .filter_map(|(entity, center, collider)| {
                let min = *center - collider.half_extents;
                let max = *center + collider.half_extents;
                let inside_footprint = origin.x >= min.x
                    && origin.x <= max.x
                    && origin.z >= min.z
                    && origin.z <= max.z;
                if !inside_footprint || sphere_bottom <= min.y {
                    return None;
                }

                let gap = sphere_bottom - max.y;
                (gap <= max_distance).then(|| {
                    CollisionData::new(
                        gap.max(0.0),
                        collider.top_normal,
                        Vec3::new(origin.x, max.y, origin.z),
                        Some(*entity),
                    )
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        filter: &CastFilter,
    ) -> Option<CollisionData> {
        self.candidates(filter)
            .filter_map(|(entity, center, collider)| {
                let (distance, normal) = ray_box(origin, *direction, *center, collider)?;
                (distance <= max_distance).then(|| {
                    CollisionData::new(distance, normal, origin + *direction * distance, Some(*entity))
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Slab test. Rays starting inside the box miss.
fn ray_box(origin: Vec3, direction: Vec3, center: Vec3, collider: &TestCollider) -> Option<(f32, Vec3)> {
    let min = center - collider.half_extents;
    let max = center + collider.half_extents;

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }

        let (near, far, face) = if d > 0.0 {
            ((min[axis] - o) / d, (max[axis] - o) / d, -1.0)
        } else {
            ((max[axis] - o) / d, (min[axis] - o) / d, 1.0)
        };

        if near > t_enter {
            t_enter = near;
            normal = Vec3::ZERO;
            normal[axis] = face;
        }
        t_exit = t_exit.min(far);
    }

    if t_enter > t_exit || t_enter < 0.0 {
        return None;
    }
    if normal == Vec3::Y {
        normal = collider.top_normal;
    }
    Some((t_enter, normal))
}

/// Physics backend over [`TestBody`] and [`TestCollider`].
pub struct TestBackend;

impl CharacterPhysicsBackend for TestBackend {
    fn plugin() -> impl Plugin {
        TestBackendPlugin
    }

    fn check_body(world: &World, entity: Entity) -> Result<(), ControllerError> {
        world
            .get::<TestBody>(entity)
            .map(|_| ())
            .ok_or(ControllerError::MissingBody(entity, "TestBody"))
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<TestBody>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<TestBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool) {
        if let Some(mut body) = world.get_mut::<TestBody>(entity) {
            body.gravity_enabled = enabled;
        }
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        world.get::<TestBody>(entity).map(|b| b.mass).unwrap_or(1.0)
    }
}

pub struct TestBackendPlugin;

impl Plugin for TestBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                test_sensors.in_set(ControllerSet::Sensors),
                integrate_test_bodies.after(ControllerSet::FinalApplication),
            ),
        );
    }
}

fn test_sensors(
    q_colliders: Query<(Entity, &Transform, &TestCollider)>,
    mut q_characters: Query<(
        Entity,
        &MovementState,
        &MovementConfig,
        &CharacterCapsule,
        &mut ControllerSensors,
    )>,
) {
    let scene = TestScene {
        boxes: q_colliders
            .iter()
            .map(|(entity, transform, collider)| (entity, transform.translation, *collider))
            .collect(),
    };

    for (entity, state, config, capsule, mut sensors) in &mut q_characters {
        if state.is_frozen() {
            continue;
        }
        sensors.refresh(&scene, entity, state, config, capsule);
    }
}

/// Explicit Euler: gravity first, then position.
fn integrate_test_bodies(
    time: Res<Time<Fixed>>,
    mut q_bodies: Query<(&mut Transform, &mut TestBody, Option<&MovementConfig>)>,
) {
    let dt = fixed_dt(&time);

    for (mut transform, mut body, config) in &mut q_bodies {
        if body.gravity_enabled {
            let gravity = config.map(|c| c.gravity).unwrap_or(Vec3::new(0.0, -9.81, 0.0));
            body.velocity += gravity * dt;
        }
        transform.translation += body.velocity * dt;
    }
}

/// Headless app with the controller on the test backend.
pub fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(PlatformerControllerPlugin::<TestBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(TEST_HZ));

    app.finish();
    app.cleanup();
    app
}

/// Run one controller tick.
pub fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

/// Run the app for N ticks.
pub fn run_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        tick(app);
    }
}

/// Spawn a large floor whose top face is at `top_y`.
pub fn spawn_floor(app: &mut App, top_y: f32) -> Entity {
    spawn_box(
        app,
        Vec3::new(0.0, top_y - 0.5, 0.0),
        TestCollider::cuboid(Vec3::new(50.0, 0.5, 50.0)),
    )
}

/// Spawn a box collider.
pub fn spawn_box(app: &mut App, center: Vec3, collider: TestCollider) -> Entity {
    let transform = Transform::from_translation(center);
    app.world_mut()
        .spawn((transform, GlobalTransform::from(transform), collider))
        .id()
}

/// Spawn a character with default config.
pub fn spawn_character(app: &mut App, position: Vec3) -> Entity {
    spawn_character_with(app, position, MovementState::new(), MovementConfig::default())
}

/// Spawn a character with custom state and config.
pub fn spawn_character_with(
    app: &mut App,
    position: Vec3,
    state: MovementState,
    config: MovementConfig,
) -> Entity {
    let transform = Transform::from_translation(position);
    app.world_mut()
        .spawn((
            transform,
            GlobalTransform::from(transform),
            state,
            config,
            CharacterCapsule::new(0.5, 2.0),
            TestBody::default(),
        ))
        .id()
}

pub fn state(app: &App, entity: Entity) -> &MovementState {
    app.world()
        .get::<MovementState>(entity)
        .expect("character should have MovementState")
}

pub fn state_mut(app: &mut App, entity: Entity) -> Mut<'_, MovementState> {
    app.world_mut()
        .get_mut::<MovementState>(entity)
        .expect("character should have MovementState")
}

pub fn body(app: &App, entity: Entity) -> TestBody {
    *app.world()
        .get::<TestBody>(entity)
        .expect("character should have TestBody")
}

pub fn position(app: &App, entity: Entity) -> Vec3 {
    app.world()
        .get::<Transform>(entity)
        .expect("character should have Transform")
        .translation
}

pub fn set_input(app: &mut App, entity: Entity, direction: Vec2) {
    if let Some(mut intent) = app.world_mut().get_mut::<MovementIntent>(entity) {
        intent.set_direction(direction);
    }
}

pub fn push_command(app: &mut App, entity: Entity, command: MovementCommand) {
    if let Some(mut commands) = app.world_mut().get_mut::<MovementCommands>(entity) {
        commands.push(command);
    }
}

/// Move an entity by `delta`, keeping its global transform in sync.
pub fn translate(app: &mut App, entity: Entity, delta: Vec3) {
    let world = app.world_mut();
    let Some(mut transform) = world.get_mut::<Transform>(entity) else {
        return;
    };
    transform.translation += delta;
    let transform = *transform;
    if let Some(mut global) = world.get_mut::<GlobalTransform>(entity) {
        *global = GlobalTransform::from(transform);
    }
}

/// Support invariants that must hold after every tick.
pub fn assert_support_invariants(state: &MovementState) {
    assert!(
        !(state.is_grounded() && state.is_falling()),
        "grounded and falling at once"
    );
    assert!(
        !(state.is_jumping() && state.is_grounded()),
        "jumping while grounded"
    );
    if state.is_sliding() {
        assert!(state.is_grounded(), "sliding in the air");
    }
    if state.is_dashing() {
        assert!(!state.can_dash, "dash available while dashing");
    }
    if state.attached_platform().is_some() {
        assert!(state.is_grounded(), "attached to a platform in the air");
    }
    assert!(state.velocity.is_finite(), "non-finite velocity");
}
