//! Per-step force computation.
//!
//! Pure functions that turn input, velocity and surface state into forces.
//! Nothing here touches the rigid body; the controller systems scale the
//! returned vectors by the configured force magnitudes and hand them to
//! the physics backend.
//!
//! Planar quantities (`Vec2`) live in the character's local frame: `x` is
//! strafe along the local right axis, `y` is forward. World-space
//! quantities (`Vec3`) are full 3D vectors.

use bevy::prelude::*;

use crate::config::MovementConfig;

/// Per-axis no-input hysteresis counters for friction.
///
/// Friction on an axis only engages after the axis has seen no input for
/// more than `counter_threshold` consecutive steps, so releasing the stick
/// briefly preserves drift (slide feel). Opposing input always counters
/// immediately and bypasses these counters.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct CounterState {
    /// Consecutive steps without strafe input.
    pub x: u32,
    /// Consecutive steps without forward input.
    pub y: u32,
}

impl CounterState {
    /// Reset both counters, e.g. when leaving the ground.
    pub fn reset(&mut self) {
        self.x = 0;
        self.y = 0;
    }
}

/// Desired ground movement direction for the given input.
///
/// Projects the input direction onto the ground plane. The projection is
/// only used when it dips below the horizon (moving down-slope); otherwise
/// the raw input passes through, so shallow climbs keep full input
/// magnitude. On flat ground the projection is horizontal and raw input is
/// returned unmodified.
pub fn ground_force(input_dir: Vec3, ground_normal: Vec3, up: Vec3) -> Vec3 {
    let normal = ground_normal.normalize_or_zero();
    if normal == Vec3::ZERO || input_dir == Vec3::ZERO {
        return input_dir;
    }
    let projected = input_dir - normal * input_dir.dot(normal);
    if projected.dot(up) < -1e-6 {
        projected.normalize_or_zero() * input_dir.length()
    } else {
        input_dir
    }
}

/// Air control input, soft-capped against existing momentum.
///
/// Zeroes any input axis that would push the relative velocity further
/// beyond `speed_cap` on that axis. This caps what input can add without
/// clamping velocity itself, so momentum from jumps and launches survives.
pub fn air_force(input: Vec2, relative_velocity: Vec2, speed_cap: f32) -> Vec2 {
    let mut out = input;
    if (relative_velocity.x > speed_cap && input.x > 0.0)
        || (relative_velocity.x < -speed_cap && input.x < 0.0)
    {
        out.x = 0.0;
    }
    if (relative_velocity.y > speed_cap && input.y > 0.0)
        || (relative_velocity.y < -speed_cap && input.y < 0.0)
    {
        out.y = 0.0;
    }
    out
}

/// Ground friction in the local planar frame.
///
/// Per axis: input opposing the current velocity counters it immediately;
/// zero input only counters after the axis counter passes
/// `counter_threshold` consecutive silent steps. Velocity below the dead
/// zone is left alone entirely, which makes rest a fixed point.
///
/// Advances the hysteresis counters as a side effect; call exactly once
/// per fixed step.
pub fn friction_force(
    relative_velocity: Vec2,
    input: Vec2,
    counters: &mut CounterState,
    config: &MovementConfig,
) -> Vec2 {
    counters.x = if input.x.abs() < config.dead_zone {
        counters.x.saturating_add(1)
    } else {
        0
    };
    counters.y = if input.y.abs() < config.dead_zone {
        counters.y.saturating_add(1)
    } else {
        0
    };

    let axis = |velocity: f32, input: f32, ready: u32| -> f32 {
        if velocity.abs() < config.dead_zone {
            return 0.0;
        }
        let opposing = input.abs() >= config.dead_zone && input * velocity < 0.0;
        if opposing || ready > config.counter_threshold {
            -velocity * config.counter_movement
        } else {
            0.0
        }
    };

    Vec2::new(
        axis(relative_velocity.x, input.x, counters.x),
        axis(relative_velocity.y, input.y, counters.y),
    )
}

/// Corrective force when horizontal speed exceeds `cap`.
///
/// Proportional to the excess speed and always directed against the
/// current horizontal velocity. Returns zero at or below the cap.
pub fn clamp_speed(horizontal_velocity: Vec3, cap: f32, counter_movement: f32) -> Vec3 {
    let speed = horizontal_velocity.length();
    if speed <= cap || speed <= f32::EPSILON {
        return Vec3::ZERO;
    }
    -horizontal_velocity / speed * (speed - cap) * counter_movement
}

/// Counter-gravity along the slope tangent.
///
/// Computes the tangential component of gravity on the current ground
/// plane and opposes it, scaled asymmetrically: `slope_ascend_assist`
/// while moving uphill, `slope_descend_assist` while moving downhill (the
/// larger descent coefficient brakes against runaway downhill slides).
/// Returns zero on flat ground.
pub fn slope_assist(
    ground_normal: Vec3,
    up: Vec3,
    velocity: Vec3,
    config: &MovementConfig,
) -> Vec3 {
    let normal = ground_normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return Vec3::ZERO;
    }
    let gravity_dir = -up;
    // Component of gravity lying in the ground plane, pointing downhill.
    let tangent = gravity_dir - normal * gravity_dir.dot(normal);
    if tangent.length_squared() < 1e-8 {
        return Vec3::ZERO;
    }
    let downhill = tangent.normalize();
    let coeff = if velocity.dot(downhill) > 0.0 {
        config.slope_descend_assist
    } else {
        config.slope_ascend_assist
    };
    -tangent * config.gravity * coeff
}

/// Extra downward acceleration while falling.
///
/// Active only when the vertical velocity points down; wall-run and vault
/// sessions manage vertical velocity themselves, so callers skip this
/// while either is active.
pub fn fall_gravity(velocity: Vec3, up: Vec3, config: &MovementConfig) -> Vec3 {
    if velocity.dot(up) < 0.0 {
        -up * config.gravity * config.fall_gravity_multiplier
    } else {
        Vec3::ZERO
    }
}
