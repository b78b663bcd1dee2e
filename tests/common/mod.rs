//! Shared test harness: a scripted, deterministic physics backend.
//!
//! Bodies are plain components. Forces integrate into velocity immediately
//! and contacts are replayed from a per-entity script, so every fixed step
//! is reproducible without running a physics pipeline.

use bevy::prelude::*;

use kinetic_character_controller::backend::{MovementPhysicsBackend, SensorProbes};
use kinetic_character_controller::integrator::CounterState;
use kinetic_character_controller::prelude::*;

/// Linear velocity of a test body.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct TestVelocity(pub Vec3);

/// Simulation flags of a test body, mirrored from backend calls.
#[derive(Component, Debug, Clone, Copy)]
pub struct TestBody {
    pub gravity_enabled: bool,
    pub kinematic: bool,
    pub collision_enabled: bool,
    pub mass: f32,
}

impl Default for TestBody {
    fn default() -> Self {
        Self {
            gravity_enabled: true,
            kinematic: false,
            collision_enabled: true,
            mass: 1.0,
        }
    }
}

/// Contacts replayed into the surface state every step until rescripted.
#[derive(Component, Debug, Clone, Default)]
pub struct ScriptedContacts(pub Vec<ContactSample>);

/// Backend that reads and writes the test components above.
pub struct TestBackend;

impl MovementPhysicsBackend for TestBackend {
    type VelocityComponent = TestVelocity;

    fn plugin() -> impl Plugin {
        TestBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<TestVelocity>(entity)
            .map(|v| v.0)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut stored) = world.get_mut::<TestVelocity>(entity) {
            stored.0 = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        let mass = Self::get_mass(world, entity);
        if let Some(mut stored) = world.get_mut::<TestVelocity>(entity) {
            stored.0 += impulse / mass;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec3) {
        let dt = Self::get_fixed_timestep(world);
        let mass = Self::get_mass(world, entity);
        if let Some(mut stored) = world.get_mut::<TestVelocity>(entity) {
            stored.0 += force * dt / mass;
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_position(world: &mut World, entity: Entity, position: Vec3) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position;
        }
    }

    fn get_yaw(world: &World, entity: Entity) -> f32 {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation.to_euler(EulerRot::YXZ).0)
            .unwrap_or(0.0)
    }

    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool) {
        if let Some(mut body) = world.get_mut::<TestBody>(entity) {
            body.gravity_enabled = enabled;
        }
    }

    fn set_kinematic(world: &mut World, entity: Entity, kinematic: bool) {
        if let Some(mut body) = world.get_mut::<TestBody>(entity) {
            body.kinematic = kinematic;
        }
    }

    fn set_collision_enabled(world: &mut World, entity: Entity, enabled: bool) {
        if let Some(mut body) = world.get_mut::<TestBody>(entity) {
            body.collision_enabled = enabled;
        }
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        world.get::<TestBody>(entity).map(|b| b.mass).unwrap_or(1.0)
    }
}

/// Sensor setup for the scripted backend.
pub struct TestBackendPlugin;

impl Plugin for TestBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            replay_scripted_contacts.in_set(MovementSet::Sensors),
        );
    }
}

/// Feed each entity's scripted contacts into its surface state, emitting
/// [`Landed`] when a contact freshly grounds the character.
fn replay_scripted_contacts(
    mut q_controllers: Query<(
        Entity,
        &MovementConfig,
        Option<&CharacterOrientation>,
        &TestVelocity,
        &ScriptedContacts,
        &mut SurfaceState,
    )>,
    mut landed: EventWriter<Landed>,
) {
    for (entity, config, orientation, velocity, contacts, mut surface) in &mut q_controllers {
        surface.clear_transients();
        let up = orientation.copied().unwrap_or_default().up();
        for contact in &contacts.0 {
            if let Some(impact_speed) =
                surface.record_contact_enter(*contact, velocity.0, config, up)
            {
                landed.write(Landed {
                    entity,
                    impact_speed,
                });
            }
        }
    }
}

/// App with the controller wired to the scripted backend.
pub fn create_app() -> App {
    let mut app = App::new();
    app.add_plugins(MovementControllerPlugin::<TestBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));
    app
}

/// Run one fixed step of the controller.
pub fn step(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

/// Spawn a fully equipped character at the origin.
pub fn spawn_character(app: &mut App) -> Entity {
    app.world_mut()
        .spawn((
            MovementConfig::player(),
            CharacterOrientation::default(),
            MoveIntent::default(),
            SurfaceState::default(),
            SensorProbes::default(),
            MovementState::default(),
            CounterState::default(),
            VaultResolver::default(),
            WallRunState::default(),
            ScriptedContacts::default(),
            TestVelocity::default(),
            TestBody::default(),
            Transform::default(),
            GlobalTransform::default(),
        ))
        .id()
}

/// A flat walkable floor contact.
pub fn floor_contact() -> ContactSample {
    ContactSample::new(Vec3::Y, u32::MAX, Vec3::ZERO, None)
}

/// A vertical wall contact with the given outward normal.
pub fn wall_contact(normal: Vec3) -> ContactSample {
    ContactSample::new(normal, u32::MAX, Vec3::ZERO, None)
}

/// Replace an entity's contact script.
pub fn script(app: &mut App, entity: Entity, contacts: Vec<ContactSample>) {
    app.world_mut()
        .get_mut::<ScriptedContacts>(entity)
        .unwrap()
        .0 = contacts;
}

pub fn velocity(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<TestVelocity>(entity).unwrap().0
}

pub fn set_velocity(app: &mut App, entity: Entity, velocity: Vec3) {
    app.world_mut().get_mut::<TestVelocity>(entity).unwrap().0 = velocity;
}

pub fn body(app: &App, entity: Entity) -> TestBody {
    *app.world().get::<TestBody>(entity).unwrap()
}

pub fn press_jump(app: &mut App, entity: Entity, pressed: bool) {
    app.world_mut()
        .get_mut::<MoveIntent>(entity)
        .unwrap()
        .set_jump_pressed(pressed);
}

pub fn hold_crouch(app: &mut App, entity: Entity, held: bool) {
    app.world_mut()
        .get_mut::<MoveIntent>(entity)
        .unwrap()
        .set_crouch_pressed(held);
}

pub fn movement_state(app: &App, entity: Entity) -> MovementState {
    *app.world().get::<MovementState>(entity).unwrap()
}

/// Read every event of type `E` written so far.
pub fn collect_events<E: Event + Clone>(app: &App) -> Vec<E> {
    let events = app.world().resource::<Events<E>>();
    let mut cursor = events.get_cursor();
    cursor.read(events).cloned().collect()
}
