//! # `kinetic_character_controller`
//!
//! A physics-driven first-person movement controller with physics backend
//! abstraction.
//!
//! This crate provides the movement core of a momentum-based shooter
//! character:
//! - Debounced ground/wall contact state that survives contact flicker
//! - Momentum-preserving ground and air movement with per-axis friction
//! - Crouch-sliding with a slide boost and state-dependent speed caps
//! - Wall running with climb kick, wall gravity and cooldown-gated wall jumps
//! - Vaulting over obstacles, as an instant step-up or an eased arc
//! - Abstracts the physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! The controller never owns the rigid body:
//! 1. Backend sensor systems report contacts and probe results each step
//! 2. [`surface::SurfaceState`] debounces them into stable flags
//! 3. The [`machine::MovementState`] machine picks the active state
//! 4. Force computation ([`integrator`], [`wallrun`]) hands forces to the
//!    backend; [`vault::VaultResolver`] may take exclusive control of the
//!    body for a bounded session
//!
//! All movement logic runs in `FixedUpdate` so behavior is independent of
//! render frame rate.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use kinetic_character_controller::prelude::*;
//!
//! // Create the movement components for a player character
//! let config = MovementConfig::player();
//! let intent = MoveIntent::default();
//! let surface = SurfaceState::default();
//!
//! // These can be spawned as a bundle with physics components
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod collision;
pub mod config;
pub mod events;
pub mod integrator;
pub mod intent;
pub mod machine;
pub mod state;
pub mod surface;
pub mod systems;
pub mod vault;
pub mod wallrun;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use bevy::math::{Vec2, Vec3};

    pub use crate::backend::{MovementPhysicsBackend, SensorProbes};
    pub use crate::collision::{CollisionData, ContactSample};
    pub use crate::config::{CharacterOrientation, MovementConfig};
    pub use crate::events::{Landed, MovementStateChanged, VaultEnded, VaultStarted};
    pub use crate::intent::{JumpRequest, MoveIntent};
    pub use crate::machine::MovementState;
    pub use crate::state::{Airborne, Grounded, TouchingWall, Vaulting};
    pub use crate::surface::{SurfaceState, WallSide};
    pub use crate::vault::{VaultKind, VaultResolver};
    pub use crate::wallrun::WallRunState;
    pub use crate::{MovementControllerPlugin, MovementSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for one fixed step of the movement controller.
///
/// Backends hook their own systems into [`MovementSet::Preparation`],
/// [`MovementSet::Sensors`] and [`MovementSet::ForceApplication`]; the
/// generic systems fill the sets in between. The sets are chained in
/// declaration order.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementSet {
    /// Backend bookkeeping before anything reads body state.
    Preparation,
    /// Backend contact ingestion and geometric probes.
    Sensors,
    /// Surface debounce tick.
    Surface,
    /// State machine transitions and jumps.
    States,
    /// Vault session start/advance/finish.
    Sessions,
    /// Movement and wall-run force computation.
    Movement,
    /// Marker component sync.
    Sync,
    /// Backend force application.
    ForceApplication,
}

/// Main plugin for the movement controller.
///
/// Generic over a physics backend `B` which provides the actual physics
/// operations (body state access, force application, probes).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With the Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use kinetic_character_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(MovementControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct MovementControllerPlugin<B: backend::MovementPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::MovementPhysicsBackend> Default for MovementControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::MovementPhysicsBackend> Plugin for MovementControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::CharacterOrientation>();
        app.register_type::<config::MovementConfig>();
        app.register_type::<intent::MoveIntent>();
        app.register_type::<intent::JumpRequest>();
        app.register_type::<integrator::CounterState>();
        app.register_type::<machine::MovementState>();
        app.register_type::<surface::SurfaceState>();
        app.register_type::<vault::VaultResolver>();
        app.register_type::<wallrun::WallRunState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::TouchingWall>();
        app.register_type::<state::Vaulting>();

        // Lifecycle events
        app.add_event::<events::Landed>();
        app.add_event::<events::VaultStarted>();
        app.add_event::<events::VaultEnded>();
        app.add_event::<events::MovementStateChanged>();

        app.configure_sets(
            FixedUpdate,
            (
                MovementSet::Preparation,
                MovementSet::Sensors,
                MovementSet::Surface,
                MovementSet::States,
                MovementSet::Sessions,
                MovementSet::Movement,
                MovementSet::Sync,
                MovementSet::ForceApplication,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        // Core systems, one chained pass per fixed step
        app.add_systems(
            FixedUpdate,
            systems::update_intent_edges.in_set(MovementSet::Sensors),
        );
        app.add_systems(
            FixedUpdate,
            systems::tick_surface_state::<B>.in_set(MovementSet::Surface),
        );
        app.add_systems(
            FixedUpdate,
            (systems::update_movement_state::<B>, systems::apply_jump::<B>)
                .chain()
                .in_set(MovementSet::States),
        );
        app.add_systems(
            FixedUpdate,
            systems::drive_vault::<B>.in_set(MovementSet::Sessions),
        );
        app.add_systems(
            FixedUpdate,
            (systems::apply_movement::<B>, systems::apply_wall_run::<B>)
                .chain()
                .in_set(MovementSet::Movement),
        );
        app.add_systems(
            FixedUpdate,
            systems::sync_state_markers.in_set(MovementSet::Sync),
        );
    }
}
