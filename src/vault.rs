//! Vault and step-up sessions.
//!
//! A vault is a scripted traversal over an obstacle. Evaluation is pure:
//! given the candidate wall contact, the probe results and the character's
//! motion, it either rejects or produces a [`VaultSession`] describing the
//! whole traversal. The session then owns the body until it completes or
//! is cancelled; the controller systems drive it one step per fixed tick
//! and restore the physics flags on every exit path.

use bevy::prelude::*;

use crate::collision::{is_floor, CollisionData};
use crate::config::MovementConfig;

/// Which traversal a session performs.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultKind {
    /// Short hop onto a low ledge. Collision detection is suspended but the
    /// body stays dynamic, so existing velocity carries through.
    StepUp,
    /// Eased arc over a taller obstacle. The body turns kinematic for the
    /// duration and receives an exit velocity on completion.
    Arc,
}

/// An in-flight vault traversal.
///
/// Created by [`evaluate`], advanced once per fixed step, destroyed when
/// `elapsed` reaches `duration`.
#[derive(Reflect, Debug, Clone)]
pub struct VaultSession {
    /// Which traversal this is.
    pub kind: VaultKind,
    /// Body position when the session started.
    pub start: Vec3,
    /// Position the session moves the body to.
    pub target: Vec3,
    /// Seconds since the session started.
    pub elapsed: f32,
    /// Total session length in seconds.
    pub duration: f32,
    /// Horizontal travel direction over the obstacle. Exit velocity for
    /// arc vaults is imparted along this direction.
    pub exit_dir: Vec3,
}

impl VaultSession {
    /// Advance the session clock by `dt` seconds.
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    /// Whether the session has run its full duration.
    pub fn finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Body position for the current clock.
    ///
    /// Step-ups interpolate linearly; arcs follow a quintic ease so the
    /// body accelerates out of the start and settles into the landing.
    pub fn sample(&self) -> Vec3 {
        let t = if self.duration > f32::EPSILON {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match self.kind {
            VaultKind::StepUp => self.start.lerp(self.target, t),
            VaultKind::Arc => self.start.lerp(self.target, smoothstep5(t)),
        }
    }

    /// Exit velocity imparted when an arc session completes.
    pub fn exit_velocity(&self, speed: f32) -> Vec3 {
        self.exit_dir * speed
    }
}

/// Quintic smoothstep: `t^3 (t (6t - 15) + 10)`.
///
/// Zero first and second derivatives at both endpoints.
#[inline]
pub fn smoothstep5(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * t * (t * (6.0 * t - 15.0) + 10.0)
}

/// Probe results for one vault attempt, gathered by the backend's sensor
/// systems from this step's vault-classified contact.
#[derive(Debug, Clone, Copy)]
pub struct VaultCandidate {
    /// Normal of the obstacle face, pointing toward the character.
    pub wall_normal: Vec3,
    /// Downward probe from the forward-offset point above the obstacle.
    /// `None` when the probe missed: nothing to land on.
    pub landing: Option<CollisionData>,
    /// Whether the upward headroom probe came back clear.
    pub headroom_clear: bool,
}

/// Evaluate a vault candidate.
///
/// Returns a ready-to-run session, or `None` when any gate fails:
/// - neither velocity nor input pushes into the obstacle hard enough
///   (velocity dot or input dot passing is sufficient on its own),
/// - no headroom above the character,
/// - no landing surface, or one steeper than the walkable limit,
/// - landing higher than the configured vault offset limit.
///
/// A failed probe is a silent rejection, never an error.
pub fn evaluate(
    candidate: &VaultCandidate,
    position: Vec3,
    velocity: Vec3,
    input_dir: Vec3,
    up: Vec3,
    config: &MovementConfig,
) -> Option<VaultSession> {
    let outward = (candidate.wall_normal - up * candidate.wall_normal.dot(up)).normalize_or_zero();
    if outward == Vec3::ZERO {
        return None;
    }
    let into_wall = -outward;

    let horizontal_velocity = velocity - up * velocity.dot(up);
    let velocity_aligned =
        horizontal_velocity.normalize_or_zero().dot(into_wall) >= config.vault_velocity_dot;
    let input_aligned = input_dir.normalize_or_zero().dot(into_wall) >= config.vault_input_dot;
    if !velocity_aligned && !input_aligned {
        return None;
    }

    if !candidate.headroom_clear {
        return None;
    }

    let landing = candidate.landing?;
    if !is_floor(landing.normal, up, config.max_slope_angle) {
        return None;
    }

    let height = (landing.point - position).dot(up);
    if height > config.vault_offset_limit {
        return None;
    }

    if height < config.step_up_height {
        Some(VaultSession {
            kind: VaultKind::StepUp,
            start: position,
            target: landing.point,
            elapsed: 0.0,
            duration: config.step_up_duration,
            exit_dir: into_wall,
        })
    } else {
        let gap = (landing.point - position).length();
        Some(VaultSession {
            kind: VaultKind::Arc,
            start: position,
            target: landing.point + up * config.vault_up_bias + into_wall * config.vault_forward_bias,
            elapsed: 0.0,
            duration: config.vault_duration_base + config.vault_duration_per_sq_unit * gap * gap,
            exit_dir: into_wall,
        })
    }
}

/// Per-character vault state.
///
/// Holds at most one active session: the single owner of the body while
/// it runs. Starting a second session while one is active is rejected.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct VaultResolver {
    /// The active session, if any.
    pub session: Option<VaultSession>,
    /// This step's candidate from the backend sensors, if any. Consumed
    /// during evaluation and cleared every step.
    #[reflect(ignore)]
    pub candidate: Option<VaultCandidate>,
}

impl VaultResolver {
    /// Whether a session currently owns the body.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Try to start a session. Rejected while another session is active.
    pub fn try_begin(&mut self, session: VaultSession) -> bool {
        if self.session.is_some() {
            return false;
        }
        self.session = Some(session);
        true
    }

    /// Cancel the active session, returning it so the caller can restore
    /// the physics flags it held.
    pub fn force_cancel(&mut self) -> Option<VaultSession> {
        self.session.take()
    }
}
