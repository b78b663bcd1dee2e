//! Wall running.
//!
//! While wall running the controller overrides gravity: the body is held
//! against the wall, pulled down by a reduced "wall gravity" along its
//! local up axis, and propelled along the wall tangent by forward input.
//! Entry applies a one-time kick (damped vertical velocity plus climb and
//! tangent impulses); exit is either a wall jump or a plain drop back to
//! normal simulation.
//!
//! The functions here are pure; [`WallRunState`] carries the per-character
//! state between steps and the controller systems wire both to the
//! backend.

use bevy::prelude::*;

use crate::config::MovementConfig;
use crate::surface::WallSide;

/// Per-character wall-run state.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct WallRunState {
    /// Whether a wall run is in progress.
    pub active: bool,
    /// Side of the wall being run, captured at entry.
    pub side: WallSide,
    /// Wall normal captured at entry, refreshed while contact persists.
    pub wall_normal: Vec3,
    /// Travel direction along the wall, captured at entry.
    pub tangent: Vec3,
}

impl Default for WallRunState {
    fn default() -> Self {
        Self {
            active: false,
            side: WallSide::None,
            wall_normal: Vec3::X,
            tangent: Vec3::NEG_Z,
        }
    }
}

impl WallRunState {
    /// Begin a wall run against the given wall.
    pub fn begin(&mut self, side: WallSide, wall_normal: Vec3, tangent: Vec3) {
        self.active = true;
        self.side = side;
        self.wall_normal = wall_normal;
        self.tangent = tangent;
    }

    /// End the wall run.
    pub fn end(&mut self) {
        self.active = false;
        self.side = WallSide::None;
    }
}

/// Travel direction along a wall, oriented toward `forward`.
///
/// The raw tangent is `up x wall_normal`; it gets flipped so the run
/// continues in the direction the character is facing. Returns zero for
/// degenerate input.
pub fn wall_tangent(wall_normal: Vec3, up: Vec3, forward: Vec3) -> Vec3 {
    let tangent = up.cross(wall_normal).normalize_or_zero();
    if tangent == Vec3::ZERO {
        return Vec3::ZERO;
    }
    if tangent.dot(forward) < 0.0 {
        -tangent
    } else {
        tangent
    }
}

/// Velocity after the entry damping.
///
/// The vertical component is scaled down (not zeroed) so an upward jump
/// into the wall still carries some rise into the run.
pub fn entry_velocity(velocity: Vec3, up: Vec3, config: &MovementConfig) -> Vec3 {
    let vertical = velocity.dot(up);
    velocity - up * vertical + up * vertical * config.wall_entry_vertical_damping
}

/// One-time impulse applied at wall-run entry.
///
/// A vertical climb kick, clamped so a body already rising fast gets less
/// (never negative), plus a lateral kick along the wall tangent.
pub fn entry_impulse(velocity: Vec3, up: Vec3, tangent: Vec3, config: &MovementConfig) -> Vec3 {
    let rising = velocity.dot(up).max(0.0);
    let climb = (config.wall_climb_impulse - rising).clamp(0.0, config.wall_climb_impulse);
    up * climb + tangent * config.wall_tangent_impulse
}

/// Per-step force holding the character against the wall.
pub fn hold_force(wall_normal: Vec3, config: &MovementConfig) -> Vec3 {
    -wall_normal.normalize_or_zero() * config.wall_hold_force
}

/// Reduced gravity along the character's local up while on the wall.
///
/// Uses local up rather than world up so a re-oriented character still
/// slides down its own wall.
pub fn wall_gravity(up: Vec3, config: &MovementConfig) -> Vec3 {
    -up * config.gravity * config.wall_gravity_scale
}

/// Propulsion along the wall tangent.
///
/// Scaled by forward input only; there is no backward wall run, so
/// negative input contributes nothing.
pub fn propulsion(tangent: Vec3, forward_input: f32, config: &MovementConfig) -> Vec3 {
    tangent * config.wall_run_propulsion * forward_input.max(0.0)
}

/// Wall-jump impulse: vertical kick plus a push away from the wall.
pub fn wall_jump_impulse(wall_normal: Vec3, up: Vec3, config: &MovementConfig) -> Vec3 {
    up * config.wall_jump_vertical + wall_normal.normalize_or_zero() * config.wall_jump_lateral
}
