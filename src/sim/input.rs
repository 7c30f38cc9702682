//! Keyboard state consumed by the simulation
//!
//! The platform layer only reports which keys are held. Edge detection
//! (jump on press, pause toggle) happens inside the simulation.

use std::collections::HashSet;

/// Keys the game reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Space,
    ShiftLeft,
    ShiftRight,
    Escape,
    Enter,
}

impl KeyCode {
    /// Map a DOM `KeyboardEvent.code` string
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ArrowLeft" => Some(KeyCode::ArrowLeft),
            "ArrowRight" => Some(KeyCode::ArrowRight),
            "ArrowUp" => Some(KeyCode::ArrowUp),
            "ArrowDown" => Some(KeyCode::ArrowDown),
            "Space" => Some(KeyCode::Space),
            "ShiftLeft" => Some(KeyCode::ShiftLeft),
            "ShiftRight" => Some(KeyCode::ShiftRight),
            "Escape" => Some(KeyCode::Escape),
            "Enter" => Some(KeyCode::Enter),
            _ => None,
        }
    }
}

/// Live set of currently held keys
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of held keys (tests, scripted runs)
    pub fn holding(keys: &[KeyCode]) -> Self {
        Self {
            held: keys.iter().copied().collect(),
        }
    }

    pub fn press(&mut self, key: KeyCode) {
        self.held.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.held.remove(&key);
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn left(&self) -> bool {
        self.is_held(KeyCode::ArrowLeft)
    }

    pub fn right(&self) -> bool {
        self.is_held(KeyCode::ArrowRight)
    }

    pub fn jump(&self) -> bool {
        self.is_held(KeyCode::Space) || self.is_held(KeyCode::ArrowUp)
    }

    pub fn slow_motion(&self) -> bool {
        self.is_held(KeyCode::ShiftLeft) || self.is_held(KeyCode::ShiftRight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(KeyCode::from_code("Space"), Some(KeyCode::Space));
        assert_eq!(KeyCode::from_code("KeyQ"), None);
    }

    #[test]
    fn test_jump_aliases() {
        assert!(InputState::holding(&[KeyCode::ArrowUp]).jump());
        assert!(InputState::holding(&[KeyCode::Space]).jump());
        assert!(!InputState::holding(&[KeyCode::ArrowLeft]).jump());
    }

    #[test]
    fn test_press_release() {
        let mut input = InputState::new();
        input.press(KeyCode::ShiftLeft);
        assert!(input.slow_motion());
        input.release(KeyCode::ShiftLeft);
        assert!(!input.slow_motion());
    }
}
