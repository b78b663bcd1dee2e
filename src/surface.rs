//! Debounced surface contact state.
//!
//! Raw contact reports flicker: a body sliding along the ground loses and
//! regains its manifold every few steps. This module owns the per-character
//! [`SurfaceState`] component that turns those raw reports into stable
//! grounded/wall flags. Contacts confirm a flag immediately; the flag only
//! drops after a configured number of consecutive steps without
//! confirmation.
//!
//! The update order within a fixed step matters: backend sensor systems
//! record contacts first ([`SurfaceState::record_contact_stay`]), then the
//! per-step [`SurfaceState::tick`] runs the decay. A contact recorded in
//! the same step as its tick therefore always keeps the flag alive.

use bevy::prelude::*;

use crate::collision::{is_floor, is_wall, ContactSample};
use crate::config::MovementConfig;

/// Which side of the character a confirmed wall is on.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallSide {
    /// Wall on the character's left.
    Left,
    /// Wall on the character's right.
    Right,
    /// No wall, or the wall is ahead/behind within the side deadband.
    #[default]
    None,
}

impl WallSide {
    /// The opposite side. `None` stays `None`.
    pub fn opposite(self) -> Self {
        match self {
            WallSide::Left => WallSide::Right,
            WallSide::Right => WallSide::Left,
            WallSide::None => WallSide::None,
        }
    }
}

/// Debounced surface state for one character.
///
/// Backend sensor systems feed contacts in during
/// [`crate::MovementSet::Sensors`]; the controller ticks the decay in
/// [`crate::MovementSet::Surface`]. Everything downstream (state machine,
/// integrator, wall run, vault) reads this component instead of raw
/// physics reports.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct SurfaceState {
    /// Debounced ground contact.
    pub grounded: bool,
    /// Normal of the most recent walkable contact. Stays at its last value
    /// (or up) while airborne so slope math never sees a zero vector.
    pub ground_normal: Vec3,
    /// Debounced wall contact.
    pub near_wall: bool,
    /// Normal of the most recent near-vertical contact.
    pub wall_normal: Vec3,
    /// Side classification of the current wall, refreshed every tick.
    pub wall_side: WallSide,
    /// A contact this step was too steep to walk on but not vertical enough
    /// to count as a wall. Fresh every step, never debounced.
    pub reached_max_slope: bool,
    /// Most recent contact that passed the loose vault classification this
    /// step. Fresh every step; the vault resolver consumes it.
    #[reflect(ignore)]
    pub vault_contact: Option<ContactSample>,
    /// Fixed steps since the character was last grounded. Held at zero
    /// while grounded, saturates at `step_counter_cap`.
    pub steps_since_grounded: u32,
    /// Fixed steps since the last jump impulse. Saturates at the cap.
    pub steps_since_jumped: u32,
    /// Fixed steps since the last wall jump. Saturates at the cap.
    pub steps_since_wall_jumped: u32,
    /// Ground contact was confirmed since the last tick.
    ground_confirmed: bool,
    /// Wall contact was confirmed since the last tick.
    wall_confirmed: bool,
    /// Consecutive ticks without a ground confirmation.
    ground_cancel_steps: u32,
    /// Consecutive ticks without a wall confirmation.
    wall_cancel_steps: u32,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            grounded: false,
            ground_normal: Vec3::Y,
            near_wall: false,
            wall_normal: Vec3::X,
            wall_side: WallSide::None,
            reached_max_slope: false,
            vault_contact: None,
            // Spawn with expired counters so cooldowns don't block the
            // first jump and coyote time doesn't trigger mid-air.
            steps_since_grounded: u32::MAX,
            steps_since_jumped: u32::MAX,
            steps_since_wall_jumped: u32::MAX,
            ground_confirmed: false,
            wall_confirmed: false,
            ground_cancel_steps: 0,
            wall_cancel_steps: 0,
        }
    }
}

impl SurfaceState {
    /// Create a fresh (airborne) surface state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the per-step transient fields.
    ///
    /// Backend sensor systems call this once at the start of each fixed
    /// step, before recording any contacts.
    pub fn clear_transients(&mut self) {
        self.reached_max_slope = false;
        self.vault_contact = None;
    }

    /// Record a contact that began this step.
    ///
    /// Classifies like [`Self::record_contact_stay`], and additionally
    /// returns the landing impact speed when this contact freshly grounds
    /// an airborne character. `velocity` is the character's velocity at the
    /// moment of contact.
    pub fn record_contact_enter(
        &mut self,
        contact: ContactSample,
        velocity: Vec3,
        config: &MovementConfig,
        up: Vec3,
    ) -> Option<f32> {
        let was_grounded = self.grounded;
        self.record_contact_stay(contact, config, up);
        if self.grounded && !was_grounded {
            Some(velocity.dot(up).min(0.0).abs())
        } else {
            None
        }
    }

    /// Record a persisting contact for this step.
    ///
    /// Floor contacts confirm `grounded` immediately; near-vertical
    /// contacts under the strict wall threshold confirm `near_wall`;
    /// anything steeper than walkable and outside the loose vault band
    /// marks `reached_max_slope`. When several contacts of the same class
    /// arrive in one step, the last one wins.
    ///
    /// A single contact may confirm at most one of ground/wall/slope, but
    /// any contact passing the loose vault threshold also becomes this
    /// step's `vault_contact`, so ground and wall may both be confirmed in
    /// the same step by different contacts.
    pub fn record_contact_stay(&mut self, contact: ContactSample, config: &MovementConfig, up: Vec3) {
        let normal = contact.normal.normalize_or_zero();
        if normal == Vec3::ZERO {
            return;
        }

        if contact.on_layer(config.environment_layers)
            && is_wall(normal, up, config.vault_dot_threshold)
        {
            self.vault_contact = Some(ContactSample { normal, ..contact });
        }

        if contact.on_layer(config.ground_layers) && is_floor(normal, up, config.max_slope_angle) {
            self.grounded = true;
            self.ground_normal = normal;
            self.ground_confirmed = true;
            self.ground_cancel_steps = 0;
        } else if contact.on_layer(config.environment_layers)
            && is_wall(normal, up, config.wall_dot_threshold)
        {
            self.near_wall = true;
            self.wall_normal = normal;
            self.wall_confirmed = true;
            self.wall_cancel_steps = 0;
        } else if contact.on_layer(config.environment_layers)
            && normal.dot(up) > 0.0
            && !is_wall(normal, up, config.vault_dot_threshold)
        {
            // Upward-facing but too steep to walk on. Faces inside the
            // loose vault band are left to the vault path instead of
            // being marked as a blocking slope.
            self.reached_max_slope = true;
        }
    }

    /// Run the per-step debounce decay and refresh derived fields.
    ///
    /// `right` is the character's local right axis, used to classify which
    /// side the wall is on. Call after all contacts for the step have been
    /// recorded.
    pub fn tick(&mut self, config: &MovementConfig, right: Vec3) {
        if self.ground_confirmed {
            self.ground_cancel_steps = 0;
        } else if self.grounded {
            self.ground_cancel_steps += 1;
            if self.ground_cancel_steps >= config.ground_cancel_delay {
                self.grounded = false;
                self.ground_cancel_steps = 0;
            }
        }

        if self.wall_confirmed {
            self.wall_cancel_steps = 0;
        } else if self.near_wall {
            self.wall_cancel_steps += 1;
            if self.wall_cancel_steps >= config.wall_cancel_delay {
                self.near_wall = false;
                self.wall_cancel_steps = 0;
            }
        }

        self.wall_side = if self.near_wall {
            // Normals point away from the wall toward the character, so a
            // wall on the left has a normal along +right.
            let side = right.dot(self.wall_normal);
            if side > config.wall_side_deadband {
                WallSide::Left
            } else if side < -config.wall_side_deadband {
                WallSide::Right
            } else {
                WallSide::None
            }
        } else {
            WallSide::None
        };

        if self.grounded {
            self.steps_since_grounded = 0;
        } else {
            self.steps_since_grounded = self
                .steps_since_grounded
                .saturating_add(1)
                .min(config.step_counter_cap);
        }
        self.steps_since_jumped = self
            .steps_since_jumped
            .saturating_add(1)
            .min(config.step_counter_cap);
        self.steps_since_wall_jumped = self
            .steps_since_wall_jumped
            .saturating_add(1)
            .min(config.step_counter_cap);

        self.ground_confirmed = false;
        self.wall_confirmed = false;
    }

    /// Mark that a jump impulse fired this step.
    ///
    /// Drops ground state immediately so the same contact cannot grant a
    /// second jump while the body is still inside the manifold.
    pub fn note_jumped(&mut self, config: &MovementConfig) {
        self.steps_since_jumped = 0;
        self.grounded = false;
        self.ground_confirmed = false;
        self.ground_cancel_steps = 0;
        self.steps_since_grounded = self.steps_since_grounded.max(config.jump_coyote_steps + 1);
    }

    /// Mark that a wall jump fired this step.
    pub fn note_wall_jumped(&mut self, config: &MovementConfig) {
        self.steps_since_wall_jumped = 0;
        self.note_jumped(config);
    }

    /// Whether the character is grounded or recently enough airborne for a
    /// coyote jump.
    pub fn coyote_grounded(&self, config: &MovementConfig) -> bool {
        self.grounded || self.steps_since_grounded <= config.jump_coyote_steps
    }

    /// Whether the jump cooldown has elapsed.
    pub fn jump_ready(&self, config: &MovementConfig) -> bool {
        self.steps_since_jumped > config.jump_cooldown_steps
    }

    /// Whether the wall-jump cooldown has elapsed.
    pub fn wall_jump_ready(&self, config: &MovementConfig) -> bool {
        self.steps_since_wall_jumped > config.wall_jump_cooldown_steps
    }
}
