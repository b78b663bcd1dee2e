//! Movement lifecycle events.
//!
//! Events emitted by the controller systems so game code can react to
//! landings, vaults and state changes (camera kicks, audio, animation)
//! without poking at controller internals.

use bevy::prelude::*;

use crate::machine::MovementState;
use crate::vault::VaultKind;

/// Emitted on the step the character regains confirmed ground contact.
#[derive(Event, Debug, Clone, Copy)]
pub struct Landed {
    /// The character that landed.
    pub entity: Entity,
    /// Downward speed at the moment of impact, as a positive number.
    pub impact_speed: f32,
}

/// Emitted when a vault or step-up session starts.
#[derive(Event, Debug, Clone, Copy)]
pub struct VaultStarted {
    /// The character that started vaulting.
    pub entity: Entity,
    /// Which kind of session started.
    pub kind: VaultKind,
}

/// Emitted when a vault or step-up session ends.
#[derive(Event, Debug, Clone, Copy)]
pub struct VaultEnded {
    /// The character whose session ended.
    pub entity: Entity,
    /// True when the session was cancelled rather than completed.
    pub cancelled: bool,
}

/// Emitted whenever the movement state machine transitions.
#[derive(Event, Debug, Clone, Copy)]
pub struct MovementStateChanged {
    /// The character that changed state.
    pub entity: Entity,
    /// State before the transition.
    pub from: MovementState,
    /// State after the transition.
    pub to: MovementState,
}
