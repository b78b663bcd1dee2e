//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::{MovementPhysicsBackend, SensorProbes};
use crate::collision::{CollisionData, ContactSample};
use crate::config::{CharacterOrientation, MovementConfig};
use crate::events::Landed;
use crate::surface::SurfaceState;
use crate::vault::{VaultCandidate, VaultResolver};

/// Rapier3D physics backend for the movement controller.
///
/// This backend uses `bevy_rapier3d` for physics operations including
/// force application and velocity manipulation. Contact ingestion and
/// geometric probes are handled by dedicated Rapier systems that receive
/// `RapierContext` as a system parameter.
pub struct Rapier3dBackend;

impl MovementPhysicsBackend for Rapier3dBackend {
    type VelocityComponent = Velocity;

    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse;
        } else if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            // Fallback: apply as velocity change if no ExternalImpulse component
            vel.linvel += impulse;
        }
    }

    fn apply_force(world: &mut World, entity: Entity, force: Vec3) {
        // Accumulate into AppliedForces instead of directly modifying
        // ExternalForce. Forces land on ExternalForce at the end of the
        // step in apply_accumulated_forces.
        if let Some(mut applied) = world.get_mut::<AppliedForces>(entity) {
            applied.add(force);
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| {
                world
                    .get::<GlobalTransform>(entity)
                    .map(|t| t.translation())
            })
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
        if let Some(mut scale) = world.get_mut::<GravityScale>(entity) {
            scale.0 = if enabled { 1.0 } else { 0.0 };
        }
    }

    fn set_kinematic(world: &mut World, entity: Entity, kinematic: bool) {
        if let Some(mut body) = world.get_mut::<RigidBody>(entity) {
            *body = if kinematic {
                RigidBody::KinematicPositionBased
            } else {
                RigidBody::Dynamic
            };
        }
    }

    fn set_collision_enabled(world: &mut World, entity: Entity, enabled: bool) {
        let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
            return;
        };
        if enabled {
            entity_mut.remove::<ColliderDisabled>();
        } else {
            entity_mut.insert(ColliderDisabled);
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
        world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.get().mass)
            .filter(|mass| mass.is_finite() && *mass > 0.0)
            .unwrap_or(1.0)
    }

    fn get_collision_groups(world: &World, entity: Entity) -> Option<(u32, u32)> {
        world
            .get::<CollisionGroups>(entity)
            .map(|cg| (cg.memberships.bits(), cg.filters.bits()))
    }
}

/// Per-character force accumulator.
///
/// Controller forces are gathered here during the step and written to
/// `ExternalForce` once at the end, with last step's contribution
/// subtracted first so user-applied external forces survive untouched.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct AppliedForces {
    accumulated: Vec3,
    applied_last: Vec3,
}

impl AppliedForces {
    /// Accumulate a force for this step.
    pub fn add(&mut self, force: Vec3) {
        self.accumulated += force;
    }

    /// Take last step's applied force for subtraction and reset the
    /// accumulator for the new step.
    fn prepare_new_step(&mut self) -> Vec3 {
        let last = self.applied_last;
        self.applied_last = Vec3::ZERO;
        self.accumulated = Vec3::ZERO;
        last
    }

    /// Take this step's accumulated force and remember it for next step's
    /// subtraction.
    fn finalize_step(&mut self) -> Vec3 {
        let force = self.accumulated;
        self.applied_last = force;
        self.accumulated = Vec3::ZERO;
        force
    }
}

/// Plugin that sets up Rapier3D-specific systems for the movement
/// controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        use crate::MovementSet;

        app.register_type::<AppliedForces>();

        // Preparation: clear forces from the previous step
        app.add_systems(
            FixedUpdate,
            clear_applied_forces.in_set(MovementSet::Preparation),
        );

        // Sensors: contact ingestion first (it clears the per-step
        // transients), then the geometric probes that depend on it.
        app.add_systems(
            FixedUpdate,
            (
                rapier_contact_ingestion,
                rapier_probe_sensors,
                rapier_vault_sensors,
            )
                .chain()
                .in_set(MovementSet::Sensors),
        );

        // Final application: write accumulated forces to ExternalForce
        app.add_systems(
            FixedUpdate,
            apply_accumulated_forces.in_set(MovementSet::ForceApplication),
        );
    }
}

/// Perform a raycast using RapierContext.
fn rapier_raycast(
    context: &RapierContext,
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    exclude_entity: Entity,
    collision_groups: Option<(Group, Group)>,
) -> Option<CollisionData> {
    // Create filter to exclude the casting entity
    let mut filter = QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_sensors();

    // Apply collision groups if provided
    if let Some((memberships, filters)) = collision_groups {
        filter = filter.groups(CollisionGroups::new(memberships, filters));
    }

    context
        .cast_ray_and_get_normal(
            origin,
            direction,
            max_distance,
            true, // solid = true for solid hits
            filter,
        )
        .map(|(hit_entity, hit)| {
            CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
        })
}

/// Ingest this step's contact manifolds into the surface state.
///
/// Clears the per-step transients, then records every active contact
/// pair. Landing detection falls out of the debounced state: a contact
/// that grounds a previously airborne character yields an impact speed,
/// which becomes a [`Landed`] event.
fn rapier_contact_ingestion(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &MovementConfig,
        Option<&CharacterOrientation>,
        Option<&Velocity>,
        &mut SurfaceState,
    )>,
    q_groups: Query<&CollisionGroups>,
    mut landed: EventWriter<Landed>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, orientation, velocity, mut surface) in &mut q_controllers {
        surface.clear_transients();

        let up = orientation.copied().unwrap_or_default().up();
        let velocity = velocity.map(|v| v.linvel).unwrap_or(Vec3::ZERO);

        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }
            let Some((manifold, contact)) = pair.find_deepest_contact() else {
                continue;
            };

            // Manifold normals point from the first collider toward the
            // second; flip so ours always points at the character.
            let (other, normal) = if pair.collider1() == Some(entity) {
                (pair.collider2(), -manifold.normal())
            } else {
                (pair.collider1(), manifold.normal())
            };
            let Some(other) = other else {
                continue;
            };
            let layer = q_groups
                .get(other)
                .map(|cg| cg.memberships.bits())
                .unwrap_or(u32::MAX);

            // Solver points are collider-local; the classification only
            // needs a rough world point, so offset from the body center.
            let point = transform.translation() - normal * contact.dist().abs();

            let sample = ContactSample::new(normal, layer, point, Some(other));
            if let Some(impact_speed) =
                surface.record_contact_enter(sample, velocity, config, up)
            {
                landed.write(Landed {
                    entity,
                    impact_speed,
                });
            }
        }
    }
}

/// Downward and upward ray probes feeding [`SensorProbes`].
fn rapier_probe_sensors(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &MovementConfig,
        Option<&CharacterOrientation>,
        Option<&CollisionGroups>,
        &mut SensorProbes,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, orientation, collision_groups, mut probes) in
        &mut q_controllers
    {
        let position = transform.translation();
        let orientation = orientation.copied().unwrap_or_default();
        let up = orientation.up();
        let groups = collision_groups.map(|cg| (cg.memberships, cg.filters));

        probes.ground = rapier_raycast(
            &context,
            position,
            -up,
            config.ground_probe_distance,
            entity,
            groups,
        );

        // Small buffer past the clearance so the blocked test has margin.
        probes.ceiling = rapier_raycast(
            &context,
            position,
            up,
            config.uncrouch_clearance + 1.0,
            entity,
            groups,
        );
    }
}

/// Probe vault candidates from this step's vault-classified contact.
///
/// A precise wall point comes from a forward ray toward the contact; from
/// there an upward headroom ray and a downward landing ray (cast from a
/// forward-offset point above the obstacle) fill in the candidate for the
/// resolver to evaluate.
fn rapier_vault_sensors(
    rapier_context: ReadRapierContext,
    mut q_controllers: Query<(
        Entity,
        &GlobalTransform,
        &MovementConfig,
        Option<&CharacterOrientation>,
        Option<&CollisionGroups>,
        &SurfaceState,
        &mut VaultResolver,
    )>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, config, orientation, collision_groups, surface, mut resolver) in
        &mut q_controllers
    {
        resolver.candidate = None;
        if resolver.is_active() {
            continue;
        }
        let Some(contact) = surface.vault_contact else {
            continue;
        };

        let position = transform.translation();
        let orientation = orientation.copied().unwrap_or_default();
        let up = orientation.up();
        let groups = collision_groups.map(|cg| (cg.memberships, cg.filters));

        let outward = (contact.normal - up * contact.normal.dot(up)).normalize_or_zero();
        if outward == Vec3::ZERO {
            continue;
        }
        let into_wall = -outward;

        // A miss here means the contact came from geometry we are not
        // actually facing; abort silently.
        let Some(wall_hit) = rapier_raycast(
            &context,
            position,
            into_wall,
            config.vault_forward_probe + 1.0,
            entity,
            groups,
        ) else {
            continue;
        };

        let headroom_clear = rapier_raycast(
            &context,
            position,
            up,
            config.vault_headroom,
            entity,
            groups,
        )
        .is_none();

        let landing_origin = wall_hit.point
            + into_wall * config.vault_forward_probe
            + up * config.vault_offset_limit;
        let landing = rapier_raycast(
            &context,
            landing_origin,
            -up,
            config.vault_offset_limit + config.ground_probe_distance,
            entity,
            groups,
        );

        resolver.candidate = Some(VaultCandidate {
            wall_normal: contact.normal,
            landing,
            headroom_clear,
        });
    }
}

/// Clear controller forces at the start of each step.
///
/// Subtracts the forces applied last step from `ExternalForce` and
/// resets the accumulators, so user forces written between steps are
/// preserved.
pub fn clear_applied_forces(mut q: Query<(&mut ExternalForce, &mut AppliedForces)>) {
    for (mut ext_force, mut applied) in &mut q {
        let last = applied.prepare_new_step();
        ext_force.force -= last;
    }
}

/// Apply accumulated controller forces at the end of each step.
pub fn apply_accumulated_forces(mut q: Query<(&mut ExternalForce, &mut AppliedForces)>) {
    for (mut ext_force, mut applied) in &mut q {
        let force = applied.finalize_step();
        ext_force.force += force;
    }
}

/// Bundle for creating a character with Rapier3D physics.
///
/// Provides the Rapier components a movement-controlled character needs:
/// a dynamic rigid body with rotation locked, velocity tracking, the
/// external force/impulse sinks the controller writes to, the force
/// accumulator, gravity scale (toggled during wall runs and vaults) and
/// mass properties.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use kinetic_character_controller::prelude::*;
/// use kinetic_character_controller::rapier::Rapier3dCharacterBundle;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         // Movement components
///         MovementConfig::player(),
///         MoveIntent::default(),
///         SurfaceState::default(),
///         MovementState::default(),
///         VaultResolver::default(),
///         WallRunState::default(),
///         SensorProbes::default(),
///         // Physics bundle
///         Rapier3dCharacterBundle::rotation_locked(),
///         Collider::capsule_y(0.9, 0.4),
///     ));
/// }
/// ```
#[derive(Bundle, Default)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. [`RigidBody::Dynamic`] for characters; vault
    /// sessions switch it to kinematic temporarily.
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Updated by Rapier each physics step.
    pub velocity: Velocity,
    /// Accumulated forces applied this step. Controller systems write to this.
    pub external_force: ExternalForce,
    /// Accumulated impulses. Used for jumps, slide boosts and wall kicks.
    pub external_impulse: ExternalImpulse,
    /// Controller force accumulator (subtract-then-apply bookkeeping).
    pub applied_forces: AppliedForces,
    /// Which axes are locked. Characters lock rotation to stay upright.
    pub locked_axes: LockedAxes,
    /// Gravity multiplier. Wall runs and arc vaults set this to zero.
    pub gravity_scale: GravityScale,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
    /// Computed mass properties. Rapier updates this from the collider.
    pub mass_properties: ReadMassProperties,
}

impl Rapier3dCharacterBundle {
    /// Create a new character bundle with rotation enabled.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            applied_forces: AppliedForces::default(),
            locked_axes: LockedAxes::empty(),
            gravity_scale: GravityScale(1.0),
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 1.0,
            },
            // Rapier will update this from the collider after the first step
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Create a character bundle with rotation locked.
    ///
    /// The standard configuration: the capsule never tips over and yaw is
    /// driven by the camera, not by physics.
    pub fn rotation_locked() -> Self {
        Self {
            locked_axes: LockedAxes::ROTATION_LOCKED,
            ..Self::new()
        }
    }

    /// Set the rigid body type for the character.
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients for velocity reduction.
    ///
    /// The movement core supplies its own friction, so linear damping
    /// defaults to zero; raise it for a heavier feel.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, TransformPlugin));
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_get_position() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::from_xyz(1.0, 2.0, 3.0), RigidBody::Dynamic))
            .id();

        app.update();

        let pos = Rapier3dBackend::get_position(app.world(), entity);
        assert!((pos - Vec3::new(1.0, 2.0, 3.0)).length() < 0.01);
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec3::new(5.0, 0.0, 3.0)),
            ))
            .id();

        app.update();

        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert!((vel.x - 5.0).abs() < 0.01);
        assert!((vel.z - 3.0).abs() < 0.01);

        Rapier3dBackend::set_velocity(app.world_mut(), entity, Vec3::new(10.0, 0.0, 0.0));

        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert!((vel.x - 10.0).abs() < 0.01);
    }

    #[test]
    fn rapier_backend_toggles_simulation_flags() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                Rapier3dCharacterBundle::rotation_locked(),
                Collider::capsule_y(0.9, 0.4),
            ))
            .id();

        app.update();

        Rapier3dBackend::set_gravity_enabled(app.world_mut(), entity, false);
        assert_eq!(app.world().get::<GravityScale>(entity).unwrap().0, 0.0);
        Rapier3dBackend::set_gravity_enabled(app.world_mut(), entity, true);
        assert_eq!(app.world().get::<GravityScale>(entity).unwrap().0, 1.0);

        Rapier3dBackend::set_kinematic(app.world_mut(), entity, true);
        assert_eq!(
            *app.world().get::<RigidBody>(entity).unwrap(),
            RigidBody::KinematicPositionBased
        );
        Rapier3dBackend::set_kinematic(app.world_mut(), entity, false);
        assert_eq!(
            *app.world().get::<RigidBody>(entity).unwrap(),
            RigidBody::Dynamic
        );

        Rapier3dBackend::set_collision_enabled(app.world_mut(), entity, false);
        assert!(app.world().get::<ColliderDisabled>(entity).is_some());
        Rapier3dBackend::set_collision_enabled(app.world_mut(), entity, true);
        assert!(app.world().get::<ColliderDisabled>(entity).is_none());
    }

    #[test]
    fn rapier_character_bundle_creates_valid_entity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                Rapier3dCharacterBundle::rotation_locked(),
                Collider::capsule_y(0.9, 0.4),
            ))
            .id();

        app.update();

        assert!(app.world().get::<RigidBody>(entity).is_some());
        assert!(app.world().get::<Velocity>(entity).is_some());
        assert!(app.world().get::<ExternalForce>(entity).is_some());
        assert!(app.world().get::<AppliedForces>(entity).is_some());
        assert!(app.world().get::<LockedAxes>(entity).is_some());
    }

    #[test]
    fn contact_ingestion_grounds_resting_character() {
        use bevy::ecs::system::RunSystemOnce;

        let mut app = create_test_app();
        app.add_event::<Landed>();

        app.world_mut().spawn((
            Transform::default(),
            RigidBody::Fixed,
            Collider::cuboid(10.0, 0.5, 10.0),
        ));
        let character = app
            .world_mut()
            .spawn((
                // Slightly penetrating the floor so a manifold exists on
                // the first physics step.
                Transform::from_xyz(0.0, 1.78, 0.0),
                Rapier3dCharacterBundle::rotation_locked(),
                Collider::capsule_y(0.9, 0.4),
                MovementConfig::default(),
                SurfaceState::default(),
            ))
            .id();

        for _ in 0..5 {
            app.update();
        }

        app.world_mut()
            .run_system_once(rapier_contact_ingestion)
            .unwrap();

        let surface = app.world().get::<SurfaceState>(character).unwrap();
        assert!(surface.grounded);
        assert!(surface.ground_normal.y > 0.9);
    }

    #[test]
    fn applied_forces_subtract_then_apply() {
        let mut applied = AppliedForces::default();
        applied.add(Vec3::X * 10.0);
        applied.add(Vec3::Y * 5.0);

        let force = applied.finalize_step();
        assert_eq!(force, Vec3::new(10.0, 5.0, 0.0));

        // Next step subtracts exactly what was applied.
        let last = applied.prepare_new_step();
        assert_eq!(last, Vec3::new(10.0, 5.0, 0.0));
        assert_eq!(applied.prepare_new_step(), Vec3::ZERO);
    }
}
