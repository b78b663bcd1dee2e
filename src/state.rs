//! State marker components.
//!
//! These components mirror the current physical state of a character
//! controller. They are automatically added/removed by the controller
//! systems based on the debounced surface state and active sessions.

use bevy::prelude::*;

use crate::surface::WallSide;

/// Marker component indicating the character is grounded.
///
/// Added automatically when the debounced surface state confirms ground
/// contact. Removed when the character becomes airborne.
///
/// This is a marker component - it has no data, just indicates state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use kinetic_character_controller::prelude::*;
///
/// // Grounded is a marker component - just use it in queries
/// fn check_grounded(grounded: Option<&Grounded>) -> bool {
///     grounded.is_some()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Added automatically when the character leaves ground contact.
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is touching a wall.
///
/// Added when the debounced surface state confirms a near-vertical
/// contact. Carries the wall normal and which side of the character the
/// wall is on.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct TouchingWall {
    /// Which side of the character the wall is on.
    pub side: WallSide,
    /// Normal of the wall surface, pointing away from the wall.
    pub normal: Vec3,
}

impl Default for TouchingWall {
    fn default() -> Self {
        Self {
            side: WallSide::None,
            normal: Vec3::NEG_X,
        }
    }
}

impl TouchingWall {
    /// Create a new wall touch state.
    pub fn new(side: WallSide, normal: Vec3) -> Self {
        Self { side, normal }
    }

    /// Check if the wall is on the left side.
    pub fn is_left(&self) -> bool {
        self.side == WallSide::Left
    }

    /// Check if the wall is on the right side.
    pub fn is_right(&self) -> bool {
        self.side == WallSide::Right
    }
}

/// Marker component indicating a vault session owns the body.
///
/// Present only while a vault or step-up session is running. While this
/// marker exists, regular movement forces are suppressed.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Vaulting;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_is_default() {
        let grounded = Grounded::default();
        // Marker component, just verify it can be created
        let _ = grounded;
    }

    #[test]
    fn airborne_is_default() {
        let airborne = Airborne::default();
        let _ = airborne;
    }

    #[test]
    fn touching_wall_new() {
        let wall = TouchingWall::new(WallSide::Left, Vec3::X);
        assert_eq!(wall.side, WallSide::Left);
        assert_eq!(wall.normal, Vec3::X);
    }

    #[test]
    fn touching_wall_is_left() {
        let wall = TouchingWall::new(WallSide::Left, Vec3::X);
        assert!(wall.is_left());
        assert!(!wall.is_right());
    }

    #[test]
    fn touching_wall_is_right() {
        let wall = TouchingWall::new(WallSide::Right, Vec3::NEG_X);
        assert!(wall.is_right());
        assert!(!wall.is_left());
    }

    #[test]
    fn touching_wall_dead_ahead_is_neither_side() {
        let wall = TouchingWall::new(WallSide::None, Vec3::NEG_Z);
        assert!(!wall.is_left());
        assert!(!wall.is_right());
    }
}
