//! Core controller systems.
//!
//! These systems implement the movement-controller behavior. They are
//! generic over the physics backend to allow different physics engines
//! to be used.
//!
//! Most systems are exclusive (`&mut World`): they collect a snapshot of
//! the relevant components first, then apply body operations through the
//! backend trait. The set ordering in [`crate::MovementControllerPlugin`]
//! guarantees sensors run before the surface tick, states before
//! sessions, and sessions before force application.

use bevy::prelude::*;
use log::debug;

use crate::backend::{MovementPhysicsBackend, SensorProbes};
use crate::config::{CharacterOrientation, MovementConfig};
use crate::events::{MovementStateChanged, VaultEnded, VaultStarted};
use crate::integrator::{self, CounterState};
use crate::intent::MoveIntent;
use crate::machine::{
    self, movement_force_multiplier, next_state, wall_run_eligible, MovementState,
    TransitionContext,
};
use crate::state::{Airborne, Grounded, TouchingWall, Vaulting};
use crate::surface::{SurfaceState, WallSide};
use crate::vault::{self, VaultKind, VaultResolver};
use crate::wallrun::{self, WallRunState};

/// Detect input edges and maintain jump buffering.
///
/// A rising jump edge creates a buffered [`crate::intent::JumpRequest`];
/// an existing request is ticked by the fixed timestep and dropped once
/// its buffer expires. Runs first in the step so everything downstream
/// sees this step's edges.
pub fn update_intent_edges(
    time: Option<Res<Time<Fixed>>>,
    mut query: Query<(&mut MoveIntent, &MovementConfig)>,
) {
    // Fall back to a nominal step when driven outside a running app.
    let dt = time
        .map(|t| t.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0);
    let delta = std::time::Duration::from_secs_f32(dt);

    for (mut intent, config) in &mut query {
        if intent.jump_pressed && !intent.jump_pressed_prev {
            intent.request_jump(config.jump_buffer_time);
        } else if let Some(request) = intent.jump_request.as_mut() {
            request.tick(delta);
            if !request.is_valid() {
                intent.jump_request = None;
            }
        }

        intent.jump_pressed_prev = intent.jump_pressed;
        intent.crouch_pressed_prev = intent.crouch_pressed;
    }
}

/// Run the per-step surface debounce for every character.
///
/// Backend sensor systems have already recorded this step's contacts;
/// this advances the decay counters and refreshes the wall side from the
/// character's current right axis.
pub fn tick_surface_state<B: MovementPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, MovementConfig, CharacterOrientation)> = world
        .query::<(Entity, &MovementConfig, Option<&CharacterOrientation>, &SurfaceState)>()
        .iter(world)
        .map(|(e, config, orientation, _)| {
            (e, *config, orientation.copied().unwrap_or_default())
        })
        .collect();

    for (entity, config, orientation) in entities {
        let yaw = B::get_yaw(world, entity);
        let (_, right) = orientation.basis(yaw);
        if let Some(mut surface) = world.get_mut::<SurfaceState>(entity) {
            surface.tick(&config, right);
        }
    }
}

/// Advance the movement state machine and apply entry/exit effects.
///
/// Slide entry applies the slide boost, wall-run entry damps vertical
/// velocity, kicks off the climb impulse and disables gravity; wall-run
/// exit restores gravity. Every transition emits
/// [`MovementStateChanged`].
pub fn update_movement_state<B: MovementPhysicsBackend>(world: &mut World) {
    type Snapshot = (
        Entity,
        MovementConfig,
        CharacterOrientation,
        MoveIntent,
        SurfaceState,
        SensorProbes,
        MovementState,
        bool,
    );
    let entities: Vec<Snapshot> = world
        .query::<(
            Entity,
            &MovementConfig,
            Option<&CharacterOrientation>,
            &MoveIntent,
            &SurfaceState,
            Option<&SensorProbes>,
            &MovementState,
            &VaultResolver,
        )>()
        .iter(world)
        .map(|(e, config, orientation, intent, surface, probes, state, resolver)| {
            (
                e,
                *config,
                orientation.copied().unwrap_or_default(),
                intent.clone(),
                surface.clone(),
                probes.cloned().unwrap_or_default(),
                *state,
                resolver.is_active(),
            )
        })
        .collect();

    for (entity, config, orientation, intent, surface, probes, state, vaulting) in entities {
        let ctx = TransitionContext {
            crouch_held: intent.crouch_pressed,
            ceiling_blocked: probes.ceiling_blocked(config.uncrouch_clearance),
            wall_run_eligible: wall_run_eligible(&surface, &probes, &intent, vaulting, &config),
            wall_lost: !surface.near_wall,
            over_max_slope: surface.reached_max_slope,
        };
        let next = next_state(state, &ctx);

        if next == state {
            // Track the wall while a run persists so exit impulses use the
            // freshest normal.
            if state == MovementState::WallRunning && surface.near_wall {
                if let Some(mut run) = world.get_mut::<WallRunState>(entity) {
                    run.wall_normal = surface.wall_normal;
                }
            }
            continue;
        }

        let mass = B::get_mass(world, entity);
        let velocity = B::get_velocity(world, entity);
        let up = orientation.up();

        // Exit effects.
        if state == MovementState::WallRunning {
            if let Some(mut run) = world.get_mut::<WallRunState>(entity) {
                run.end();
            }
            B::set_gravity_enabled(world, entity, true);
        }

        // Entry effects.
        match next {
            MovementState::Sliding => {
                let horizontal = velocity - up * velocity.dot(up);
                let boost = machine::slide_boost(surface.grounded, horizontal, &config);
                if boost != Vec3::ZERO {
                    B::apply_impulse(world, entity, boost * mass);
                }
            }
            MovementState::WallRunning => {
                let yaw = B::get_yaw(world, entity);
                let (forward, _) = orientation.basis(yaw);
                let tangent = wallrun::wall_tangent(surface.wall_normal, up, forward);

                let damped = wallrun::entry_velocity(velocity, up, &config);
                B::set_velocity(world, entity, damped);
                B::apply_impulse(
                    world,
                    entity,
                    wallrun::entry_impulse(damped, up, tangent, &config) * mass,
                );
                B::set_gravity_enabled(world, entity, false);

                if let Some(mut run) = world.get_mut::<WallRunState>(entity) {
                    run.begin(surface.wall_side, surface.wall_normal, tangent);
                }
            }
            MovementState::Standing => {}
        }

        if let Some(mut current) = world.get_mut::<MovementState>(entity) {
            *current = next;
        }
        debug!("movement state {state:?} -> {next:?}");
        world.send_event(MovementStateChanged {
            entity,
            from: state,
            to: next,
        });
    }
}

/// Consume buffered jump requests.
///
/// Grounded (or coyote) characters get a vertical jump biased by the
/// ground normal; a wall-running character gets a wall jump away from the
/// wall instead, gated by the wall-jump cooldown. Vault sessions swallow
/// no requests; they simply block jumping while active.
pub fn apply_jump<B: MovementPhysicsBackend>(world: &mut World) {
    type Snapshot = (
        Entity,
        MovementConfig,
        CharacterOrientation,
        SurfaceState,
        MovementState,
        Vec3,
        bool,
    );
    let entities: Vec<Snapshot> = world
        .query::<(
            Entity,
            &MovementConfig,
            Option<&CharacterOrientation>,
            &MoveIntent,
            &SurfaceState,
            &MovementState,
            Option<&WallRunState>,
            &VaultResolver,
        )>()
        .iter(world)
        .filter(|(_, _, _, intent, _, _, _, resolver)| {
            intent.has_jump_request() && !resolver.is_active()
        })
        .map(|(e, config, orientation, _, surface, state, run, _)| {
            (
                e,
                *config,
                orientation.copied().unwrap_or_default(),
                surface.clone(),
                *state,
                run.map(|r| r.wall_normal).unwrap_or(Vec3::X),
                run.is_some_and(|r| r.active),
            )
        })
        .collect();

    for (entity, config, orientation, surface, state, wall_normal, running) in entities {
        let up = orientation.up();
        let mass = B::get_mass(world, entity);

        if state == MovementState::WallRunning && running {
            if !surface.wall_jump_ready(&config) {
                continue;
            }
            if let Some(mut intent) = world.get_mut::<MoveIntent>(entity) {
                intent.take_jump_request();
            }

            B::apply_impulse(
                world,
                entity,
                wallrun::wall_jump_impulse(wall_normal, up, &config) * mass,
            );
            if let Some(mut surface) = world.get_mut::<SurfaceState>(entity) {
                surface.note_wall_jumped(&config);
            }

            // The jump ends the wall run.
            if let Some(mut run) = world.get_mut::<WallRunState>(entity) {
                run.end();
            }
            B::set_gravity_enabled(world, entity, true);
            if let Some(mut current) = world.get_mut::<MovementState>(entity) {
                *current = MovementState::Standing;
            }
            world.send_event(MovementStateChanged {
                entity,
                from: MovementState::WallRunning,
                to: MovementState::Standing,
            });
        } else {
            if !(surface.coyote_grounded(&config) && surface.jump_ready(&config)) {
                continue;
            }
            if let Some(mut intent) = world.get_mut::<MoveIntent>(entity) {
                intent.take_jump_request();
            }

            // Cancel any downward velocity so the impulse is consistent.
            let velocity = B::get_velocity(world, entity);
            let vertical = velocity.dot(up);
            if vertical < 0.0 {
                B::set_velocity(world, entity, velocity - up * vertical);
            }

            // Jump off the slope when grounded, straight up otherwise.
            let dir = if surface.grounded {
                (up + surface.ground_normal).normalize_or_zero()
            } else {
                up
            };
            B::apply_impulse(world, entity, dir * config.jump_impulse * mass);
            if let Some(mut surface) = world.get_mut::<SurfaceState>(entity) {
                surface.note_jumped(&config);
            }
        }
    }
}

/// Drive vault sessions: start, advance, finish.
///
/// With no session active, this step's candidate (if the backend probes
/// produced one) is evaluated under the entry gates. An active session
/// moves the body directly each step; on completion the physics flags it
/// held are restored and an arc imparts its exit velocity.
pub fn drive_vault<B: MovementPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    type Snapshot = (
        Entity,
        MovementConfig,
        CharacterOrientation,
        MoveIntent,
        SurfaceState,
        MovementState,
        VaultResolver,
    );
    let entities: Vec<Snapshot> = world
        .query::<(
            Entity,
            &MovementConfig,
            Option<&CharacterOrientation>,
            &MoveIntent,
            &SurfaceState,
            &MovementState,
            &VaultResolver,
        )>()
        .iter(world)
        .map(|(e, config, orientation, intent, surface, state, resolver)| {
            (
                e,
                *config,
                orientation.copied().unwrap_or_default(),
                intent.clone(),
                surface.clone(),
                *state,
                resolver.clone(),
            )
        })
        .collect();

    for (entity, config, orientation, intent, surface, state, mut resolver) in entities {
        if let Some(session) = resolver.session.as_mut() {
            resolver.candidate = None;
            session.advance(dt);
            B::set_position(world, entity, session.sample());

            if session.finished() {
                match session.kind {
                    VaultKind::StepUp => {
                        B::set_collision_enabled(world, entity, true);
                    }
                    VaultKind::Arc => {
                        B::set_kinematic(world, entity, false);
                        B::set_gravity_enabled(world, entity, true);
                        B::set_velocity(
                            world,
                            entity,
                            session.exit_velocity(config.vault_exit_speed),
                        );
                    }
                }
                debug!("vault finished ({:?})", session.kind);
                resolver.session = None;
                world.send_event(VaultEnded {
                    entity,
                    cancelled: false,
                });
            }
        } else if let Some(candidate) = resolver.candidate.take() {
            // Entry gates: never from a wall run, a crouch, or a too-steep
            // contact.
            if state == MovementState::WallRunning
                || intent.crouch_pressed
                || surface.reached_max_slope
            {
                if let Some(mut stored) = world.get_mut::<VaultResolver>(entity) {
                    stored.candidate = None;
                }
                continue;
            }

            let position = B::get_position(world, entity);
            let velocity = B::get_velocity(world, entity);
            let yaw = B::get_yaw(world, entity);
            let up = orientation.up();
            let input_dir = orientation.to_world_planar(yaw, intent.deadzoned(config.dead_zone));

            if let Some(session) =
                vault::evaluate(&candidate, position, velocity, input_dir, up, &config)
            {
                let kind = session.kind;
                if resolver.try_begin(session) {
                    match kind {
                        VaultKind::StepUp => {
                            B::set_collision_enabled(world, entity, false);
                        }
                        VaultKind::Arc => {
                            B::set_kinematic(world, entity, true);
                            B::set_gravity_enabled(world, entity, false);
                        }
                    }
                    debug!("vault started ({kind:?})");
                    world.send_event(VaultStarted { entity, kind });
                }
            }
        } else {
            continue;
        }

        if let Some(mut stored) = world.get_mut::<VaultResolver>(entity) {
            *stored = resolver;
        }
    }
}

/// Force-cancel an in-flight vault session and restore the physics flags
/// it held.
///
/// Call before despawning or disabling a vaulting character. Restores all
/// flags a session of either kind could hold, so it is safe to call
/// regardless of the session kind (or when no session is active, in which
/// case it does nothing).
pub fn cancel_vault<B: MovementPhysicsBackend>(world: &mut World, entity: Entity) {
    let Some(mut resolver) = world.get_mut::<VaultResolver>(entity) else {
        return;
    };
    let Some(session) = resolver.force_cancel() else {
        return;
    };

    B::set_kinematic(world, entity, false);
    B::set_collision_enabled(world, entity, true);
    B::set_gravity_enabled(world, entity, true);

    debug!("vault cancelled ({:?})", session.kind);
    world.send_event(VaultEnded {
        entity,
        cancelled: true,
    });
}

/// Apply the per-step movement forces.
///
/// Grounded characters get slope-projected drive, friction, slope assist
/// and the state-dependent speed clamp; airborne characters get
/// momentum-capped air control and the extra fall gravity. Suppressed
/// entirely while a vault session owns the body; wall running zeroes the
/// drive multiplier and skips fall gravity (the wall-run system supplies
/// its own forces).
pub fn apply_movement<B: MovementPhysicsBackend>(world: &mut World) {
    type Snapshot = (
        Entity,
        MovementConfig,
        CharacterOrientation,
        MoveIntent,
        SurfaceState,
        MovementState,
    );
    let entities: Vec<Snapshot> = world
        .query::<(
            Entity,
            &MovementConfig,
            Option<&CharacterOrientation>,
            &MoveIntent,
            &SurfaceState,
            &MovementState,
            &VaultResolver,
        )>()
        .iter(world)
        .filter(|(_, _, _, _, _, _, resolver)| !resolver.is_active())
        .map(|(e, config, orientation, intent, surface, state, _)| {
            (
                e,
                *config,
                orientation.copied().unwrap_or_default(),
                intent.clone(),
                surface.clone(),
                *state,
            )
        })
        .collect();

    for (entity, config, orientation, intent, surface, state) in entities {
        let velocity = B::get_velocity(world, entity);
        let mass = B::get_mass(world, entity);
        let yaw = B::get_yaw(world, entity);
        let up = orientation.up();

        let input = intent.deadzoned(config.dead_zone);
        let rel_velocity = orientation.to_local_planar(yaw, velocity);
        let horizontal = velocity - up * velocity.dot(up);
        let crouched = state == MovementState::Sliding;
        let multiplier = movement_force_multiplier(state, horizontal.length(), &config);

        let mut force = Vec3::ZERO;

        if surface.grounded {
            let input_world = orientation.to_world_planar(yaw, input);
            if input_world != Vec3::ZERO {
                let dir = integrator::ground_force(input_world, surface.ground_normal, up);
                force += dir * config.move_force * multiplier;
            }

            let mut counters = world
                .get::<CounterState>(entity)
                .copied()
                .unwrap_or_default();
            let friction = integrator::friction_force(rel_velocity, input, &mut counters, &config);
            if let Some(mut stored) = world.get_mut::<CounterState>(entity) {
                *stored = counters;
            }
            force += orientation.to_world_planar(yaw, friction) * config.move_force;

            force += integrator::slope_assist(surface.ground_normal, up, velocity, &config);
        } else {
            let capped = integrator::air_force(input, rel_velocity, config.air_speed_cap);
            force += orientation.to_world_planar(yaw, capped)
                * config.move_force
                * config.air_control
                * multiplier;

            if state != MovementState::WallRunning {
                force += integrator::fall_gravity(velocity, up, &config);
            }
        }

        let cap = config.speed_cap(surface.grounded, crouched, horizontal.length());
        force += integrator::clamp_speed(horizontal, cap, config.counter_movement)
            * config.move_force;

        if force != Vec3::ZERO {
            B::apply_force(world, entity, force * mass);
        }
    }
}

/// Apply the wall-run holding, gravity and propulsion forces.
pub fn apply_wall_run<B: MovementPhysicsBackend>(world: &mut World) {
    type Snapshot = (
        Entity,
        MovementConfig,
        CharacterOrientation,
        f32,
        WallRunState,
    );
    let entities: Vec<Snapshot> = world
        .query::<(
            Entity,
            &MovementConfig,
            Option<&CharacterOrientation>,
            &MoveIntent,
            &WallRunState,
        )>()
        .iter(world)
        .filter(|(_, _, _, _, run)| run.active)
        .map(|(e, config, orientation, intent, run)| {
            (
                e,
                *config,
                orientation.copied().unwrap_or_default(),
                intent.deadzoned(config.dead_zone).y,
                run.clone(),
            )
        })
        .collect();

    for (entity, config, orientation, forward_input, run) in entities {
        let up = orientation.up();
        let mass = B::get_mass(world, entity);

        let force = wallrun::hold_force(run.wall_normal, &config)
            + wallrun::wall_gravity(up, &config)
            + wallrun::propulsion(run.tangent, forward_input, &config);
        B::apply_force(world, entity, force * mass);
    }
}

/// Sync state marker components from the surface state and vault resolver.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &SurfaceState,
        &VaultResolver,
        Has<Grounded>,
        Has<Airborne>,
        Has<TouchingWall>,
        Has<Vaulting>,
    )>,
) {
    for (entity, surface, resolver, has_grounded, has_airborne, has_wall, has_vaulting) in
        &q_controllers
    {
        // Sync Grounded/Airborne
        if surface.grounded && !has_grounded {
            commands.entity(entity).insert(Grounded);
            commands.entity(entity).remove::<Airborne>();
        } else if !surface.grounded && has_grounded {
            commands.entity(entity).remove::<Grounded>();
            commands.entity(entity).insert(Airborne);
        } else if !surface.grounded && !has_airborne && !has_grounded {
            commands.entity(entity).insert(Airborne);
        }

        // Sync TouchingWall; refresh the stored normal while contact lasts
        let touching_wall = surface.near_wall && surface.wall_side != WallSide::None;
        if touching_wall {
            commands
                .entity(entity)
                .insert(TouchingWall::new(surface.wall_side, surface.wall_normal));
        } else if has_wall {
            commands.entity(entity).remove::<TouchingWall>();
        }

        // Sync Vaulting
        if resolver.is_active() && !has_vaulting {
            commands.entity(entity).insert(Vaulting);
        } else if !resolver.is_active() && has_vaulting {
            commands.entity(entity).remove::<Vaulting>();
        }
    }
}
