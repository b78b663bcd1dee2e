//! Movement state machine.
//!
//! Three persistent states (Standing, Sliding, WallRunning) with explicit
//! transitions. Jumping is a transient impulse, not a state: it fires on
//! an input edge and leaves the current state in place (or delegates to a
//! wall jump while wall running).
//!
//! Transitions are computed purely from a [`TransitionContext`] snapshot;
//! the controller systems build the snapshot from the debounced surface
//! state, the probes and the current intent, then act on entry/exit
//! effects (slide boost, wall-run kick) when the returned state differs.

use bevy::prelude::*;

use crate::backend::SensorProbes;
use crate::config::MovementConfig;
use crate::intent::MoveIntent;
use crate::surface::{SurfaceState, WallSide};

/// Persistent movement state of a character.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[reflect(Component)]
pub enum MovementState {
    /// Upright, regular ground/air movement.
    #[default]
    Standing,
    /// Crouched: crouch-walking at low speed, sliding above it.
    Sliding,
    /// Running along a wall; the wall-run controller owns the forces.
    WallRunning,
}

/// Per-step snapshot of everything the transition function looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionContext {
    /// Crouch input is held this step.
    pub crouch_held: bool,
    /// Standing up would hit a ceiling.
    pub ceiling_blocked: bool,
    /// All wall-run entry conditions hold (see [`wall_run_eligible`]).
    pub wall_run_eligible: bool,
    /// The debounced wall contact has been lost.
    pub wall_lost: bool,
    /// A too-steep surface was contacted this step.
    pub over_max_slope: bool,
}

/// The single transition function.
///
/// Every state maps every trigger to exactly one successor; unmatched
/// triggers keep the current state. Crouch cannot end a slide while a
/// ceiling blocks standing up.
pub fn next_state(current: MovementState, ctx: &TransitionContext) -> MovementState {
    match current {
        MovementState::Standing => {
            if ctx.wall_run_eligible {
                MovementState::WallRunning
            } else if ctx.crouch_held {
                MovementState::Sliding
            } else {
                MovementState::Standing
            }
        }
        MovementState::Sliding => {
            if ctx.wall_run_eligible {
                MovementState::WallRunning
            } else if !ctx.crouch_held && !ctx.ceiling_blocked {
                MovementState::Standing
            } else {
                MovementState::Sliding
            }
        }
        MovementState::WallRunning => {
            if ctx.wall_lost || ctx.over_max_slope {
                MovementState::Standing
            } else {
                MovementState::WallRunning
            }
        }
    }
}

/// Whether the wall-run entry conditions hold this step.
///
/// Requires a debounced wall on a definite side, strafe input pushing
/// toward that side, enough clearance below the character, and no
/// crouch, steep slope or active vault.
pub fn wall_run_eligible(
    surface: &SurfaceState,
    probes: &SensorProbes,
    intent: &MoveIntent,
    vaulting: bool,
    config: &MovementConfig,
) -> bool {
    if !surface.near_wall || surface.reached_max_slope || vaulting || intent.crouch_pressed {
        return false;
    }
    let toward_wall = match surface.wall_side {
        WallSide::Left => intent.move_input.x <= -config.dead_zone,
        WallSide::Right => intent.move_input.x >= config.dead_zone,
        WallSide::None => false,
    };
    if !toward_wall {
        return false;
    }
    // A missed downward probe means there is nothing below within probe
    // range, which is clearance enough.
    probes
        .height_above_ground()
        .is_none_or(|height| height > config.wall_run_min_height)
}

/// Movement-force multiplier for the current state.
///
/// Wall running contributes no standard movement force (the wall-run
/// controller supplies its own); sliding reduces the force while moving
/// faster than a crouch-walk, and crouch-walking below that speed keeps
/// full force.
pub fn movement_force_multiplier(
    state: MovementState,
    horizontal_speed: f32,
    config: &MovementConfig,
) -> f32 {
    match state {
        MovementState::Standing => 1.0,
        MovementState::Sliding => {
            if horizontal_speed > config.max_speed_crouch_walk {
                config.slide_force_multiplier
            } else {
                1.0
            }
        }
        MovementState::WallRunning => 0.0,
    }
}

/// Slide-boost impulse at the moment a grounded, moving character enters
/// the slide. Returns zero when stationary or airborne.
pub fn slide_boost(
    grounded: bool,
    horizontal_velocity: Vec3,
    config: &MovementConfig,
) -> Vec3 {
    if !grounded {
        return Vec3::ZERO;
    }
    let dir = horizontal_velocity.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Vec3::ZERO;
    }
    dir * config.slide_boost_impulse
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::CollisionData;
    use crate::collision::ContactSample;

    fn config() -> MovementConfig {
        MovementConfig::default()
    }

    #[test]
    fn standing_crouch_enters_slide() {
        let ctx = TransitionContext {
            crouch_held: true,
            ..default()
        };
        assert_eq!(next_state(MovementState::Standing, &ctx), MovementState::Sliding);
    }

    #[test]
    fn slide_ends_only_with_headroom() {
        // Crouch released under a ceiling: stay crouched.
        let ctx = TransitionContext {
            crouch_held: false,
            ceiling_blocked: true,
            ..default()
        };
        assert_eq!(next_state(MovementState::Sliding, &ctx), MovementState::Sliding);

        // Ceiling clear: stand up.
        let ctx = TransitionContext::default();
        assert_eq!(next_state(MovementState::Sliding, &ctx), MovementState::Standing);
    }

    #[test]
    fn crouch_held_keeps_sliding() {
        let ctx = TransitionContext {
            crouch_held: true,
            ..default()
        };
        assert_eq!(next_state(MovementState::Sliding, &ctx), MovementState::Sliding);
    }

    #[test]
    fn eligible_wall_enters_wall_run_from_ground_states() {
        let ctx = TransitionContext {
            wall_run_eligible: true,
            ..default()
        };
        assert_eq!(
            next_state(MovementState::Standing, &ctx),
            MovementState::WallRunning
        );
        assert_eq!(
            next_state(MovementState::Sliding, &ctx),
            MovementState::WallRunning
        );
    }

    #[test]
    fn wall_run_exits_on_wall_loss_or_slope() {
        let ctx = TransitionContext {
            wall_lost: true,
            ..default()
        };
        assert_eq!(
            next_state(MovementState::WallRunning, &ctx),
            MovementState::Standing
        );

        let ctx = TransitionContext {
            over_max_slope: true,
            ..default()
        };
        assert_eq!(
            next_state(MovementState::WallRunning, &ctx),
            MovementState::Standing
        );

        let ctx = TransitionContext::default();
        assert_eq!(
            next_state(MovementState::WallRunning, &ctx),
            MovementState::WallRunning
        );
    }

    fn wall_surface(side_normal: Vec3) -> SurfaceState {
        let config = config();
        let mut surface = SurfaceState::new();
        surface.record_contact_stay(
            ContactSample::new(side_normal, u32::MAX, Vec3::ZERO, None),
            &config,
            Vec3::Y,
        );
        surface.tick(&config, Vec3::X);
        surface
    }

    fn high_probes() -> SensorProbes {
        SensorProbes::default()
    }

    #[test]
    fn wall_run_needs_input_toward_wall() {
        let config = config();
        // Wall on the right (normal points left toward the character).
        let surface = wall_surface(Vec3::NEG_X);
        let probes = high_probes();

        let mut intent = MoveIntent::new();
        intent.set_move(Vec2::new(1.0, 0.0)); // strafe right, into the wall
        assert!(wall_run_eligible(&surface, &probes, &intent, false, &config));

        intent.set_move(Vec2::new(-1.0, 0.0)); // strafe away
        assert!(!wall_run_eligible(&surface, &probes, &intent, false, &config));

        intent.set_move(Vec2::new(0.0, 1.0)); // forward only
        assert!(!wall_run_eligible(&surface, &probes, &intent, false, &config));
    }

    #[test]
    fn wall_run_needs_height() {
        let config = config();
        let surface = wall_surface(Vec3::NEG_X);
        let mut intent = MoveIntent::new();
        intent.set_move(Vec2::new(1.0, 0.0));

        // Ground right below: too low to wall run.
        let probes = SensorProbes {
            ground: Some(CollisionData::new(0.5, Vec3::Y, Vec3::ZERO, None)),
            ..default()
        };
        assert!(!wall_run_eligible(&surface, &probes, &intent, false, &config));

        // High enough.
        let probes = SensorProbes {
            ground: Some(CollisionData::new(2.5, Vec3::Y, Vec3::ZERO, None)),
            ..default()
        };
        assert!(wall_run_eligible(&surface, &probes, &intent, false, &config));
    }

    #[test]
    fn crouch_and_vault_block_wall_run() {
        let config = config();
        let surface = wall_surface(Vec3::NEG_X);
        let probes = high_probes();
        let mut intent = MoveIntent::new();
        intent.set_move(Vec2::new(1.0, 0.0));

        intent.set_crouch_pressed(true);
        assert!(!wall_run_eligible(&surface, &probes, &intent, false, &config));

        intent.set_crouch_pressed(false);
        assert!(!wall_run_eligible(&surface, &probes, &intent, true, &config));
    }

    #[test]
    fn ambiguous_wall_side_blocks_wall_run() {
        let config = config();
        // Wall dead ahead: inside the side deadband, side is None.
        let surface = wall_surface(Vec3::NEG_Z);
        let probes = high_probes();
        let mut intent = MoveIntent::new();
        intent.set_move(Vec2::new(1.0, 1.0));
        assert!(!wall_run_eligible(&surface, &probes, &intent, false, &config));
    }

    #[test]
    fn force_multiplier_per_state() {
        let config = config();
        assert_eq!(
            movement_force_multiplier(MovementState::Standing, 10.0, &config),
            1.0
        );
        assert_eq!(
            movement_force_multiplier(MovementState::WallRunning, 10.0, &config),
            0.0
        );

        // Sliding fast reduces force; crouch-walking keeps it.
        assert_eq!(
            movement_force_multiplier(MovementState::Sliding, 15.0, &config),
            config.slide_force_multiplier
        );
        assert_eq!(
            movement_force_multiplier(
                MovementState::Sliding,
                config.max_speed_crouch_walk - 1.0,
                &config
            ),
            1.0
        );
    }

    #[test]
    fn slide_boost_requires_grounded_motion() {
        let config = config();
        let velocity = Vec3::new(10.0, 0.0, 0.0);

        let boost = slide_boost(true, velocity, &config);
        assert_eq!(boost, Vec3::X * config.slide_boost_impulse);

        assert_eq!(slide_boost(false, velocity, &config), Vec3::ZERO);
        assert_eq!(slide_boost(true, Vec3::ZERO, &config), Vec3::ZERO);
    }
}
