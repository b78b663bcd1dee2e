//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the movement core. The core never owns the rigid body:
//! it reads and mutates body state through this trait every fixed step,
//! while the host simulation performs the actual integration.
//!
//! Geometric sensing (contact reports, slope and clearance probes, vault
//! probes) is backend-specific and runs as systems registered by the
//! backend's plugin in [`crate::MovementSet::Sensors`]; those systems
//! populate [`crate::surface::SurfaceState`], [`SensorProbes`] and
//! [`crate::vault::VaultCandidate`] for the generic systems to consume.

use bevy::prelude::*;

use crate::collision::CollisionData;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the movement
/// core. The backend handles body-state operations (velocity, forces,
/// gravity/kinematic/collision toggles) and exposes the fixed timestep.
///
/// For an example implementation, see the `rapier` module's
/// `Rapier3dBackend` which implements this trait for Bevy Rapier3D.
pub trait MovementPhysicsBackend: 'static + Send + Sync {
    /// The velocity component type used by this backend.
    type VelocityComponent: Component;

    /// Returns the plugin that sets up this backend, including its sensor
    /// systems.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply an impulse (instantaneous momentum change) to an entity.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3);

    /// Apply a force to an entity, integrated over the physics timestep.
    fn apply_force(world: &mut World, entity: Entity, force: Vec3);

    /// Get the current world position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Teleport an entity to a position.
    ///
    /// Used by vault sessions while they own the body; the backend should
    /// route this through its kinematic interpolation when available.
    fn set_position(world: &mut World, entity: Entity, position: Vec3);

    /// Get the yaw angle (radians about the up axis) of an entity.
    fn get_yaw(world: &World, entity: Entity) -> f32;

    /// Enable or disable gravity for an entity.
    fn set_gravity_enabled(world: &mut World, entity: Entity, enabled: bool);

    /// Switch an entity between dynamic and kinematic simulation.
    fn set_kinematic(world: &mut World, entity: Entity, kinematic: bool);

    /// Enable or disable collision detection for an entity.
    fn set_collision_enabled(world: &mut World, entity: Entity, enabled: bool);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;

    /// Get the mass of an entity.
    ///
    /// Used to scale forces so that config parameters produce consistent
    /// acceleration regardless of actual body mass.
    fn get_mass(_world: &World, _entity: Entity) -> f32 {
        // Default implementation returns 1.0 (no scaling)
        1.0
    }

    /// Get the collision groups for an entity (memberships, filters).
    /// Returns None if the entity doesn't have collision groups.
    fn get_collision_groups(_world: &World, _entity: Entity) -> Option<(u32, u32)> {
        // Default implementation returns None
        None
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}

/// Per-tick probe results written by the backend's sensor systems.
///
/// The generic systems read these instead of issuing physics queries
/// themselves, keeping the core backend-agnostic.
#[derive(Component, Debug, Clone, Default)]
pub struct SensorProbes {
    /// Downward probe from the body center. Feeds the fresh per-tick slope
    /// check and the wall-run height requirement.
    pub ground: Option<CollisionData>,
    /// Upward probe from the body center. Feeds the uncrouch clearance check.
    pub ceiling: Option<CollisionData>,
}

impl SensorProbes {
    /// Clearance above the ground, if the downward probe hit anything.
    pub fn height_above_ground(&self) -> Option<f32> {
        self.ground.as_ref().map(|hit| hit.distance)
    }

    /// Whether standing up would collide with a ceiling within `clearance`.
    pub fn ceiling_blocked(&self, clearance: f32) -> bool {
        self.ceiling
            .as_ref()
            .is_some_and(|hit| hit.distance < clearance)
    }
}
