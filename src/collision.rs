//! Contact data and surface classification.
//!
//! This module holds the data produced by physics queries and contact
//! reports, plus the pure predicates that classify a contact normal as
//! floor, wall or vault candidate. The predicates have no state and no
//! side effects; all debouncing lives in [`crate::surface`].

use bevy::prelude::*;

/// Information about a raycast/shapecast hit.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionData {
    /// Distance to the hit point along the cast direction.
    pub distance: f32,
    /// Normal of the surface at the hit point (points away from the surface).
    pub normal: Vec3,
    /// World position of the hit point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a cast result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }
}

/// A single contact reported by the physics host for one physics step.
///
/// Contacts are ephemeral: they are produced per collision event and
/// consumed immediately by classification; nothing retains them past
/// the step they were reported in.
#[derive(Debug, Clone, Copy)]
pub struct ContactSample {
    /// Unit surface normal, pointing away from the surface toward the character.
    pub normal: Vec3,
    /// Collision-layer membership bitmask of the other collider.
    pub layer: u32,
    /// World position of the contact point.
    pub point: Vec3,
    /// The other entity involved in the contact, if known.
    pub entity: Option<Entity>,
}

impl ContactSample {
    /// Create a contact sample.
    pub fn new(normal: Vec3, layer: u32, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            normal,
            layer,
            point,
            entity,
        }
    }

    /// Whether the other collider is a member of any layer in `mask`.
    #[inline]
    pub fn on_layer(&self, mask: u32) -> bool {
        self.layer & mask != 0
    }
}

/// Is this contact normal a walkable floor?
///
/// True when the angle between `up` and the normal is below `max_slope_angle`
/// (radians). A degenerate (zero-length) normal never classifies.
#[inline]
pub fn is_floor(normal: Vec3, up: Vec3, max_slope_angle: f32) -> bool {
    let n = normal.normalize_or_zero();
    if n == Vec3::ZERO {
        return false;
    }
    n.dot(up).clamp(-1.0, 1.0).acos() < max_slope_angle
}

/// Is this contact normal a wall?
///
/// True when the normal is close to perpendicular to `up`:
/// `|dot(normal, up)| < threshold`.
///
/// Call sites use two deliberately different tolerances: the strict
/// [`crate::config::MovementConfig::wall_dot_threshold`] (0.1) when
/// updating wall state, and the loose
/// [`crate::config::MovementConfig::vault_dot_threshold`] (0.3) when
/// classifying a surface as vaultable. They must not be unified.
#[inline]
pub fn is_wall(normal: Vec3, up: Vec3, threshold: f32) -> bool {
    let n = normal.normalize_or_zero();
    if n == Vec3::ZERO {
        return false;
    }
    n.dot(up).abs() < threshold
}

/// Is this contact a vault candidate?
///
/// The obstacle face must be wall-ish under the loose threshold, and the
/// landing surface (probed by the caller from the candidate landing point)
/// must be within the walkable slope limit. A missing landing probe means
/// there is nothing to land on and never classifies.
#[inline]
pub fn is_vaultable(
    normal: Vec3,
    up: Vec3,
    loose_threshold: f32,
    landing_normal: Option<Vec3>,
    max_slope_angle: f32,
) -> bool {
    if !is_wall(normal, up, loose_threshold) {
        return false;
    }
    match landing_normal {
        Some(landing) => is_floor(landing, up, max_slope_angle),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    #[test]
    fn collision_data_new() {
        let data = CollisionData::new(5.0, Vec3::Y, Vec3::new(1.0, 0.0, 2.0), None);
        assert_eq!(data.distance, 5.0);
        assert_eq!(data.normal, Vec3::Y);
        assert_eq!(data.point, Vec3::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn contact_layer_membership() {
        let contact = ContactSample::new(Vec3::Y, 0b0100, Vec3::ZERO, None);
        assert!(contact.on_layer(0b0100));
        assert!(contact.on_layer(0b1100));
        assert!(!contact.on_layer(0b0011));
    }

    #[test]
    fn flat_ground_is_floor() {
        assert!(is_floor(Vec3::Y, Vec3::Y, FRAC_PI_4));
    }

    #[test]
    fn shallow_slope_is_floor_steep_slope_is_not() {
        // 30 degree slope normal
        let shallow = Vec3::new(30f32.to_radians().sin(), 30f32.to_radians().cos(), 0.0);
        assert!(is_floor(shallow, Vec3::Y, FRAC_PI_4));

        // 50 degree slope normal, above the 45 degree limit
        let steep = Vec3::new(50f32.to_radians().sin(), 50f32.to_radians().cos(), 0.0);
        assert!(!is_floor(steep, Vec3::Y, FRAC_PI_4));
    }

    #[test]
    fn degenerate_normal_never_classifies() {
        assert!(!is_floor(Vec3::ZERO, Vec3::Y, FRAC_PI_4));
        assert!(!is_wall(Vec3::ZERO, Vec3::Y, 0.3));
    }

    #[test]
    fn vertical_face_is_wall_under_both_thresholds() {
        assert!(is_wall(Vec3::X, Vec3::Y, 0.1));
        assert!(is_wall(Vec3::X, Vec3::Y, 0.3));
    }

    #[test]
    fn tilted_face_only_matches_loose_threshold() {
        // Normal tilted ~11.5 degrees off horizontal: dot with up ~= 0.2.
        let tilted = Vec3::new(0.98, 0.2, 0.0).normalize();
        assert!(!is_wall(tilted, Vec3::Y, 0.1));
        assert!(is_wall(tilted, Vec3::Y, 0.3));
    }

    #[test]
    fn vaultable_requires_walkable_landing() {
        // Steep landing (50 degrees) rejects the vault regardless of the face.
        let steep_landing = Vec3::new(50f32.to_radians().sin(), 50f32.to_radians().cos(), 0.0);
        assert!(!is_vaultable(
            Vec3::X,
            Vec3::Y,
            0.3,
            Some(steep_landing),
            FRAC_PI_4
        ));

        // Flat landing accepts.
        assert!(is_vaultable(Vec3::X, Vec3::Y, 0.3, Some(Vec3::Y), FRAC_PI_4));

        // No landing probe at all rejects.
        assert!(!is_vaultable(Vec3::X, Vec3::Y, 0.3, None, FRAC_PI_4));
    }
}
