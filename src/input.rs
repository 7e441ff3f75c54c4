//! Keyboard bindings for renderer commands

use winit::keyboard::KeyCode;

use crate::controller::{Algorithm, Command};

/// Command bound to `key`, if any
pub fn command_for_key(key: KeyCode) -> Option<Command> {
    let command = match key {
        KeyCode::Digit1 => Command::SelectAlgorithm(Algorithm::ZFail),
        KeyCode::Digit2 => Command::SelectAlgorithm(Algorithm::ZPass),
        KeyCode::KeyR => Command::ToggleRobust,
        KeyCode::KeyL => Command::ToggleLight,
        KeyCode::Space => Command::TogglePause,
        KeyCode::KeyC => Command::Capture,
        KeyCode::F1 => Command::SetActiveLight(0),
        KeyCode::F2 => Command::SetActiveLight(1),
        KeyCode::F3 => Command::SetActiveLight(2),
        KeyCode::F4 => Command::SetActiveLight(3),
        _ => return None,
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_select_algorithms() {
        assert_eq!(
            command_for_key(KeyCode::Digit1),
            Some(Command::SelectAlgorithm(Algorithm::ZFail))
        );
        assert_eq!(
            command_for_key(KeyCode::Digit2),
            Some(Command::SelectAlgorithm(Algorithm::ZPass))
        );
    }

    #[test]
    fn function_keys_pick_lights() {
        assert_eq!(command_for_key(KeyCode::F3), Some(Command::SetActiveLight(2)));
    }

    #[test]
    fn unbound_keys() {
        assert_eq!(command_for_key(KeyCode::KeyQ), None);
        assert_eq!(command_for_key(KeyCode::Escape), None);
    }
}
