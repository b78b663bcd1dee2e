//! Movement intent components.
//!
//! Intents represent the desired movement from player input or AI.
//! The controller systems read these intents and apply appropriate physics.

use bevy::prelude::*;

/// Unified movement intent for a first-person character.
///
/// This component carries the planar movement stick plus the jump and
/// crouch buttons. The controller systems use this to apply appropriate
/// movement physics based on character state.
///
/// # Example
///
/// ```rust
/// use kinetic_character_controller::prelude::*;
///
/// // Create intent moving forward-right
/// let mut intent = MoveIntent::new();
/// intent.set_move(Vec2::new(1.0, 1.0));
/// assert!(intent.is_moving());
///
/// // Hold crouch
/// intent.set_crouch_pressed(true);
/// assert!(intent.is_crouch_pressed());
///
/// // Clear everything
/// intent.clear();
/// assert!(!intent.is_moving());
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct MoveIntent {
    /// Planar movement input in the character's local frame.
    ///
    /// `x` is strafe (-1.0 = left, 1.0 = right), `y` is forward
    /// (-1.0 = backward, 1.0 = forward). Each axis is clamped to [-1, 1];
    /// the vector is not normalized so analog sticks pass through as-is.
    pub move_input: Vec2,
    /// Pending jump request, if any.
    ///
    /// Created automatically when `jump_pressed` transitions from false to true.
    /// The controller consumes this by calling `take_jump_request()`.
    pub jump_request: Option<JumpRequest>,
    /// Whether the jump action is currently active (true = wanting to jump).
    ///
    /// Set this to `true` when you want the character to jump, `false`
    /// otherwise. This is just a boolean state - you handle input detection
    /// in your code, and the controller handles the jump logic.
    ///
    /// The controller detects when this changes from `false` to `true` and
    /// creates a buffered jump request.
    ///
    /// # Example
    /// ```rust,ignore
    /// // Your code handles input, we just receive a bool:
    /// intent.set_jump_pressed(keyboard.pressed(KeyCode::Space));
    /// // Or from gamepad, touch, AI, etc. - any source of a boolean
    /// intent.set_jump_pressed(gamepad.pressed(GamepadButton::South));
    /// ```
    pub jump_pressed: bool,
    /// Previous step's jump_pressed state (for edge detection).
    /// This is managed internally by the controller.
    pub(crate) jump_pressed_prev: bool,
    /// Whether the crouch action is currently held.
    ///
    /// While held on the ground this drives crouch-walking or sliding;
    /// releasing it requests a return to standing, subject to headroom.
    pub crouch_pressed: bool,
    /// Previous step's crouch_pressed state (for edge detection).
    /// This is managed internally by the controller.
    pub(crate) crouch_pressed_prev: bool,
}

impl Default for MoveIntent {
    fn default() -> Self {
        Self {
            move_input: Vec2::ZERO,
            jump_request: None,
            jump_pressed: false,
            jump_pressed_prev: false,
            crouch_pressed: false,
            crouch_pressed_prev: false,
        }
    }
}

impl MoveIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the planar movement input, clamping each axis to [-1, 1].
    pub fn set_move(&mut self, input: Vec2) {
        self.move_input = input.clamp(Vec2::splat(-1.0), Vec2::splat(1.0));
    }

    /// Clear all movement intents.
    pub fn clear(&mut self) {
        self.move_input = Vec2::ZERO;
    }

    /// Check if there is active movement input.
    pub fn is_moving(&self) -> bool {
        self.move_input.length_squared() > 0.001 * 0.001
    }

    /// Movement input with magnitudes below `dead_zone` per axis zeroed.
    pub fn deadzoned(&self, dead_zone: f32) -> Vec2 {
        let mut input = self.move_input;
        if input.x.abs() < dead_zone {
            input.x = 0.0;
        }
        if input.y.abs() < dead_zone {
            input.y = 0.0;
        }
        input
    }

    /// Request a jump with the given buffer duration.
    ///
    /// **Note**: Prefer using `set_jump_pressed()` instead, which handles
    /// edge detection and timer creation automatically.
    pub(crate) fn request_jump(&mut self, buffer_time: f32) {
        self.jump_request = Some(JumpRequest::new(buffer_time));
    }

    /// Take and consume the pending jump request, if any.
    ///
    /// Returns the jump request if one was pending, removing it from this intent.
    pub fn take_jump_request(&mut self) -> Option<JumpRequest> {
        self.jump_request.take()
    }

    /// Check if there's a pending jump request.
    pub fn has_jump_request(&self) -> bool {
        self.jump_request.is_some()
    }

    /// Clear the pending jump request without consuming it.
    pub fn clear_jump_request(&mut self) {
        self.jump_request = None;
    }

    /// Set the jump state.
    ///
    /// Pass `true` when the player/AI wants to jump, `false` otherwise.
    /// Call this every frame with the current state. The controller detects
    /// the rising edge and creates a buffered jump request using
    /// `config.jump_buffer_time`.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    /// Check if jump is currently active.
    pub fn is_jump_pressed(&self) -> bool {
        self.jump_pressed
    }

    /// Set the crouch state.
    ///
    /// Pass `true` while the player/AI holds crouch, `false` otherwise.
    /// Call this every frame with the current state.
    pub fn set_crouch_pressed(&mut self, pressed: bool) {
        self.crouch_pressed = pressed;
    }

    /// Check if crouch is currently held.
    pub fn is_crouch_pressed(&self) -> bool {
        self.crouch_pressed
    }

    /// Whether crouch was pressed this step (rising edge).
    pub fn crouch_just_pressed(&self) -> bool {
        self.crouch_pressed && !self.crouch_pressed_prev
    }

    /// Whether crouch was released this step (falling edge).
    pub fn crouch_just_released(&self) -> bool {
        !self.crouch_pressed && self.crouch_pressed_prev
    }
}

/// Jump request stored in MoveIntent.
///
/// This represents a pending jump request with a timer for buffering.
/// The timer counts down from the buffer duration, and the request
/// expires when the timer finishes. The controller consumes the request
/// by taking the Option from MoveIntent.
#[derive(Reflect, Debug, Clone, Default)]
pub struct JumpRequest {
    /// Timer for jump buffering. When finished, the request expires.
    #[reflect(ignore)]
    pub buffer_timer: Timer,
}

impl JumpRequest {
    /// Create a new jump request with the given buffer duration.
    pub fn new(buffer_time: f32) -> Self {
        Self {
            buffer_timer: Timer::from_seconds(buffer_time, TimerMode::Once),
        }
    }

    /// Tick the buffer timer. Call this once per fixed step.
    pub fn tick(&mut self, delta: std::time::Duration) {
        self.buffer_timer.tick(delta);
    }

    /// Check if the request is still valid (timer hasn't finished).
    pub fn is_valid(&self) -> bool {
        !self.buffer_timer.finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== MoveIntent Tests ====================

    #[test]
    fn move_intent_new() {
        let intent = MoveIntent::new();
        assert_eq!(intent.move_input, Vec2::ZERO);
        assert!(intent.jump_request.is_none());
        assert!(!intent.jump_pressed);
        assert!(!intent.crouch_pressed);
    }

    #[test]
    fn move_intent_set_move() {
        let mut intent = MoveIntent::new();
        intent.set_move(Vec2::new(0.5, -0.25));
        assert_eq!(intent.move_input, Vec2::new(0.5, -0.25));

        // Clamps each axis to valid range
        intent.set_move(Vec2::new(5.0, -5.0));
        assert_eq!(intent.move_input, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn move_intent_is_moving() {
        let mut intent = MoveIntent::new();
        assert!(!intent.is_moving());

        intent.set_move(Vec2::new(0.5, 0.0));
        assert!(intent.is_moving());

        intent.set_move(Vec2::splat(0.0001)); // Below threshold
        assert!(!intent.is_moving());
    }

    #[test]
    fn move_intent_clear() {
        let mut intent = MoveIntent::new();
        intent.set_move(Vec2::ONE);

        intent.clear();
        assert!(!intent.is_moving());
        assert_eq!(intent.move_input, Vec2::ZERO);
    }

    #[test]
    fn move_intent_deadzone_per_axis() {
        let mut intent = MoveIntent::new();
        intent.set_move(Vec2::new(0.03, 0.8));

        // Only the axis below the dead zone is zeroed
        let input = intent.deadzoned(0.05);
        assert_eq!(input, Vec2::new(0.0, 0.8));

        // Fully below the dead zone zeroes both axes
        intent.set_move(Vec2::splat(0.04));
        assert_eq!(intent.deadzoned(0.05), Vec2::ZERO);
    }

    // ==================== JumpRequest Tests ====================

    #[test]
    fn jump_request_new() {
        let request = JumpRequest::new(0.1);
        // New request should be valid (timer not finished)
        assert!(request.is_valid());
    }

    #[test]
    fn jump_request_expires_at_buffer_time() {
        use std::time::Duration;

        let mut request = JumpRequest::new(0.1); // 100ms buffer

        // Tick just before buffer time - should still be valid
        request.tick(Duration::from_millis(99));
        assert!(request.is_valid());

        // Tick past buffer time - should be expired
        request.tick(Duration::from_millis(2));
        assert!(!request.is_valid());
    }

    // ==================== MoveIntent Jump Tests ====================

    #[test]
    fn move_intent_request_jump() {
        let mut intent = MoveIntent::new();
        assert!(!intent.has_jump_request());

        intent.request_jump(0.1);
        assert!(intent.has_jump_request());
        assert!(intent.jump_request.as_ref().unwrap().is_valid());
    }

    #[test]
    fn move_intent_take_jump_request() {
        let mut intent = MoveIntent::new();
        intent.request_jump(0.1);

        let request = intent.take_jump_request();
        assert!(request.is_some());
        assert!(request.unwrap().is_valid());

        // Should be consumed now
        assert!(!intent.has_jump_request());
        assert!(intent.take_jump_request().is_none());
    }

    #[test]
    fn move_intent_set_jump_pressed() {
        let mut intent = MoveIntent::new();
        assert!(!intent.is_jump_pressed());

        intent.set_jump_pressed(true);
        assert!(intent.is_jump_pressed());

        intent.set_jump_pressed(false);
        assert!(!intent.is_jump_pressed());
    }

    // ==================== MoveIntent Crouch Tests ====================

    #[test]
    fn move_intent_crouch_edges() {
        let mut intent = MoveIntent::new();
        assert!(!intent.crouch_just_pressed());
        assert!(!intent.crouch_just_released());

        intent.set_crouch_pressed(true);
        assert!(intent.crouch_just_pressed());
        assert!(!intent.crouch_just_released());

        // Controller advances prev at end of step
        intent.crouch_pressed_prev = true;
        assert!(!intent.crouch_just_pressed());

        intent.set_crouch_pressed(false);
        assert!(intent.crouch_just_released());
    }
}
