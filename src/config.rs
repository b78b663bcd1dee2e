//! Controller configuration components.
//!
//! This module defines the character's local coordinate frame and the flat
//! set of named tunables that drive the movement core: slope limits, speed
//! caps, debounce delays, wall-run and vault parameters.
//!
//! All thresholds are configuration, not contracts. The defaults are the
//! hand-tuned values the controller shipped with; games are expected to
//! retune them per character.

use bevy::prelude::*;

/// Defines the local coordinate system for a character controller.
///
/// The orientation is defined by a single `up` vector; the planar basis
/// (forward/right) is derived from `up` and the body's current yaw. This
/// allows characters to be re-oriented (rotating platforms, tilted gravity)
/// while keeping movement math in the character's own frame — wall-run
/// gravity in particular pulls along this local up, not world up.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct CharacterOrientation {
    /// The "up" direction for this character.
    up: Vec3,
}

impl Default for CharacterOrientation {
    fn default() -> Self {
        Self { up: Vec3::Y }
    }
}

impl CharacterOrientation {
    /// Create a new orientation with the given up direction.
    ///
    /// The vector will be normalized. If zero-length, defaults to `Vec3::Y`.
    pub fn new(up: Vec3) -> Self {
        let normalized = up.normalize_or_zero();
        Self {
            up: if normalized == Vec3::ZERO {
                Vec3::Y
            } else {
                normalized
            },
        }
    }

    /// Get the "up" direction.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Get the "down" direction (opposite of up).
    #[inline]
    pub fn down(&self) -> Vec3 {
        -self.up
    }

    /// Set the "up" direction. Zero-length input is ignored.
    pub fn set_up(&mut self, up: Vec3) {
        let normalized = up.normalize_or_zero();
        if normalized != Vec3::ZERO {
            self.up = normalized;
        }
    }

    /// Planar basis `(forward, right)` for a body at the given yaw (radians
    /// about this orientation's up axis).
    ///
    /// With the default up and zero yaw, forward is `-Z` and right is `+X`,
    /// matching the engine's camera convention.
    pub fn basis(&self, yaw: f32) -> (Vec3, Vec3) {
        // Pick a reference axis that is not parallel to up, then flatten it.
        let reference = if self.up.dot(Vec3::NEG_Z).abs() > 0.9 {
            Vec3::X
        } else {
            Vec3::NEG_Z
        };
        let flattened = reference - self.up * reference.dot(self.up);
        let rot = Quat::from_axis_angle(self.up, yaw);
        let forward = (rot * flattened).normalize_or_zero();
        let right = forward.cross(self.up).normalize_or_zero();
        (forward, right)
    }

    /// Express a world-space vector in the planar local frame `(right, forward)`.
    pub fn to_local_planar(&self, yaw: f32, world: Vec3) -> Vec2 {
        let (forward, right) = self.basis(yaw);
        Vec2::new(world.dot(right), world.dot(forward))
    }

    /// Convert a planar local vector `(right, forward)` to world space.
    pub fn to_world_planar(&self, yaw: f32, local: Vec2) -> Vec3 {
        let (forward, right) = self.basis(yaw);
        right * local.x + forward * local.y
    }
}

/// Configuration parameters for the movement core.
///
/// Every numeric threshold the controller uses is a named field here with a
/// documented default; nothing is hard-coded in the systems.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct MovementConfig {
    // === Forces & speed caps ===
    /// Movement force per unit mass (acceleration, units/second^2).
    pub move_force: f32,
    /// Horizontal speed cap while grounded and standing.
    pub max_speed_grounded: f32,
    /// Horizontal speed cap while airborne.
    pub max_speed_air: f32,
    /// Horizontal speed cap while crouched and moving slowly (crouch-walk).
    pub max_speed_crouch_walk: f32,
    /// Horizontal speed cap while crouch-sliding.
    pub max_speed_slide: f32,
    /// Per-axis cap on airborne input in the local frame; input that would
    /// push relative velocity beyond this on an axis is zeroed on that axis.
    pub air_speed_cap: f32,
    /// Multiplier on `move_force` while airborne.
    pub air_control: f32,
    /// Counter-movement (friction) coefficient applied against relative
    /// velocity when grounded.
    pub counter_movement: f32,
    /// Ticks of sustained no-input before the friction branch starts
    /// countering residual drift on an axis. Opposing input counters
    /// immediately regardless of this.
    pub counter_threshold: u32,
    /// Input/velocity magnitudes below this are treated as zero.
    pub dead_zone: f32,
    /// Movement-force multiplier while crouch-sliding above the crouch-walk
    /// speed.
    pub slide_force_multiplier: f32,
    /// Forward impulse granted when entering a slide while grounded and
    /// moving (momentum transfer).
    pub slide_boost_impulse: f32,

    // === Gravity & slopes ===
    /// Gravity magnitude used for slope assistance and the extra-fall term.
    pub gravity: f32,
    /// Extra downward acceleration while falling, as a fraction of gravity.
    /// Suppressed entirely during wall-run and vault sessions.
    pub fall_gravity_multiplier: f32,
    /// Maximum walkable slope angle (radians).
    pub max_slope_angle: f32,
    /// Slope counter-gravity coefficient while ascending.
    pub slope_ascend_assist: f32,
    /// Slope counter-gravity coefficient while descending.
    pub slope_descend_assist: f32,

    // === Surface classification ===
    /// Strict wall tolerance: `|dot(normal, up)|` below this is a wall for
    /// surface-state updates.
    pub wall_dot_threshold: f32,
    /// Loose wall tolerance used only for vault classification. Deliberately
    /// distinct from `wall_dot_threshold`.
    pub vault_dot_threshold: f32,
    /// Deadband on `dot(right, wall_normal)` below which a wall contact is
    /// neither left nor right.
    pub wall_side_deadband: f32,
    /// Consecutive ticks without a reaffirming floor contact before grounded
    /// is cleared.
    pub ground_cancel_delay: u32,
    /// Consecutive ticks without a reaffirming wall contact before near-wall
    /// is cleared.
    pub wall_cancel_delay: u32,
    /// Saturation cap for the step counters.
    pub step_counter_cap: u32,
    /// Downward probe length used for the fresh per-tick slope check and the
    /// wall-run height requirement.
    pub ground_probe_distance: f32,
    /// Upward clearance required to stand up from a crouch.
    pub uncrouch_clearance: f32,
    /// Layer mask for floor contacts.
    pub ground_layers: u32,
    /// Layer mask for wall/environment contacts.
    pub environment_layers: u32,

    // === Jumping ===
    /// Jump impulse per unit mass.
    pub jump_impulse: f32,
    /// Steps after leaving the ground during which a jump is still honored
    /// (coyote window).
    pub jump_coyote_steps: u32,
    /// Minimum steps between jumps.
    pub jump_cooldown_steps: u32,
    /// Seconds a buffered jump press stays valid.
    pub jump_buffer_time: f32,

    // === Wall running ===
    /// Minimum clearance above the ground required to enter a wall run.
    pub wall_run_min_height: f32,
    /// Vertical velocity scale applied once on wall-run entry (damped, not
    /// zeroed).
    pub wall_entry_vertical_damping: f32,
    /// One-time upward kick on wall-run entry, clamped to this magnitude.
    pub wall_climb_impulse: f32,
    /// One-time kick along the wall tangent on wall-run entry.
    pub wall_tangent_impulse: f32,
    /// Per-tick force holding the character against the wall.
    pub wall_hold_force: f32,
    /// Fraction of gravity pulled along the character's local up while
    /// wall-running.
    pub wall_gravity_scale: f32,
    /// Per-tick propulsion along the wall tangent, scaled by forward input.
    pub wall_run_propulsion: f32,
    /// Wall-jump impulse along the character's up.
    pub wall_jump_vertical: f32,
    /// Wall-jump impulse away from the wall.
    pub wall_jump_lateral: f32,
    /// Minimum steps between wall jumps.
    pub wall_jump_cooldown_steps: u32,

    // === Vaulting ===
    /// Minimum `dot(velocity_dir, -wall_dir)` for a vault to qualify.
    pub vault_velocity_dot: f32,
    /// Minimum `dot(input_dir, -wall_dir)` for a vault to qualify. Either
    /// this or the velocity condition passing is enough.
    pub vault_input_dot: f32,
    /// Height gaps below this resolve as an instant step-up instead of an arc.
    pub step_up_height: f32,
    /// Maximum landing height above the character for any vault.
    pub vault_offset_limit: f32,
    /// Forward offset from the wall face for the landing probe.
    pub vault_forward_probe: f32,
    /// Upward headroom required above the character to begin a vault.
    pub vault_headroom: f32,
    /// Duration of the instant step-up interpolation.
    pub step_up_duration: f32,
    /// Base duration of an arc vault.
    pub vault_duration_base: f32,
    /// Arc duration growth per squared unit of gap distance.
    pub vault_duration_per_sq_unit: f32,
    /// Upward bias applied to the arc landing point.
    pub vault_up_bias: f32,
    /// Forward bias applied to the arc landing point.
    pub vault_forward_bias: f32,
    /// Exit speed imparted along the horizontal travel direction when an
    /// arc vault completes.
    pub vault_exit_speed: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            // Forces & speed caps
            move_force: 60.0,
            max_speed_grounded: 20.0,
            max_speed_air: 24.0,
            max_speed_crouch_walk: 8.0,
            max_speed_slide: 30.0,
            air_speed_cap: 23.0,
            air_control: 0.5,
            counter_movement: 0.175,
            counter_threshold: 3,
            dead_zone: 0.05,
            slide_force_multiplier: 0.3,
            slide_boost_impulse: 5.0,

            // Gravity & slopes
            gravity: 30.0,
            fall_gravity_multiplier: 0.68,
            max_slope_angle: std::f32::consts::FRAC_PI_4, // 45 degrees
            slope_ascend_assist: 0.9,
            slope_descend_assist: 1.4,

            // Surface classification
            wall_dot_threshold: 0.1,
            vault_dot_threshold: 0.3,
            wall_side_deadband: 0.8,
            ground_cancel_delay: 3,
            wall_cancel_delay: 3,
            step_counter_cap: 100,
            ground_probe_distance: 3.0,
            uncrouch_clearance: 1.6,
            ground_layers: u32::MAX,
            environment_layers: u32::MAX,

            // Jumping
            jump_impulse: 16.0,
            jump_coyote_steps: 6,
            jump_cooldown_steps: 10,
            jump_buffer_time: 0.1,

            // Wall running
            wall_run_min_height: 1.5,
            wall_entry_vertical_damping: 0.65,
            wall_climb_impulse: 6.0,
            wall_tangent_impulse: 3.0,
            wall_hold_force: 12.0,
            wall_gravity_scale: 0.8,
            wall_run_propulsion: 24.0,
            wall_jump_vertical: 12.0,
            wall_jump_lateral: 14.0,
            wall_jump_cooldown_steps: 30,

            // Vaulting
            vault_velocity_dot: 0.4,
            vault_input_dot: 0.6,
            step_up_height: 3.6,
            vault_offset_limit: 6.0,
            vault_forward_probe: 1.2,
            vault_headroom: 2.0,
            step_up_duration: 0.08,
            vault_duration_base: 0.25,
            vault_duration_per_sq_unit: 0.01,
            vault_up_bias: 0.5,
            vault_forward_bias: 0.6,
            vault_exit_speed: 6.0,
        }
    }
}

impl MovementConfig {
    /// Create a config tuned for a responsive first-person player.
    pub fn player() -> Self {
        Self {
            move_force: 75.0,
            jump_impulse: 18.0,
            counter_movement: 0.2,
            ..default()
        }
    }

    /// The state-dependent horizontal speed cap.
    ///
    /// Four distinct caps: grounded, airborne, crouched-and-slow, and
    /// crouch-sliding.
    pub fn speed_cap(&self, grounded: bool, crouched: bool, horizontal_speed: f32) -> f32 {
        if crouched {
            if horizontal_speed > self.max_speed_crouch_walk {
                self.max_speed_slide
            } else {
                self.max_speed_crouch_walk
            }
        } else if grounded {
            self.max_speed_grounded
        } else {
            self.max_speed_air
        }
    }

    /// Builder: set the movement force.
    pub fn with_move_force(mut self, force: f32) -> Self {
        self.move_force = force;
        self
    }

    /// Builder: set the grounded and airborne speed caps.
    pub fn with_speed_caps(mut self, grounded: f32, air: f32) -> Self {
        self.max_speed_grounded = grounded;
        self.max_speed_air = air;
        self
    }

    /// Builder: set the maximum walkable slope angle in radians.
    pub fn with_max_slope_angle(mut self, radians: f32) -> Self {
        self.max_slope_angle = radians;
        self
    }

    /// Builder: set the ground and wall debounce delays in steps.
    pub fn with_cancel_delays(mut self, ground: u32, wall: u32) -> Self {
        self.ground_cancel_delay = ground;
        self.wall_cancel_delay = wall;
        self
    }

    /// Builder: set the jump impulse.
    pub fn with_jump_impulse(mut self, impulse: f32) -> Self {
        self.jump_impulse = impulse;
        self
    }

    /// Builder: set the collision layer masks for floor and wall contacts.
    pub fn with_layers(mut self, ground: u32, environment: u32) -> Self {
        self.ground_layers = ground;
        self.environment_layers = environment;
        self
    }

    /// Builder: set the wall-jump cooldown in steps.
    pub fn with_wall_jump_cooldown(mut self, steps: u32) -> Self {
        self.wall_jump_cooldown_steps = steps;
        self
    }
}
