//! Interaction mode.

use crate::config::ButtonAction;
use std::fmt;

/// Interaction mode held by the state machine.
///
/// Exactly one mode is active at a time; the process starts in `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Hand movements do nothing except button selection
    #[default]
    Idle,
    /// The index finger traces strokes
    Drawing,
    /// Any recognised gesture erases around the fingertip
    Erasing,
    /// A fist is held on a button and the dwell timer is running
    Selecting,
}

impl Mode {
    /// Button whose highlight shows this mode, if any.
    pub fn button_action(self) -> Option<ButtonAction> {
        match self {
            Mode::Drawing => Some(ButtonAction::Draw),
            Mode::Erasing => Some(ButtonAction::Erase),
            Mode::Idle | Mode::Selecting => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "Idle",
            Mode::Drawing => "Drawing",
            Mode::Erasing => "Erasing",
            Mode::Selecting => "Selecting",
        };
        f.write_str(name)
    }
}
