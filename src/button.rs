// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use midly::{num::u7, MidiMessage};

/// Highest controller value still treated as "off" by toggle buttons.
const TOGGLE_MIDPOINT: u8 = 63;

/// What a button press means. FLIP inverts the target state, ON and OFF ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonAction {
    Flip,
    On,
    Off,
}

/// A button triggered by a MIDI note or a control change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiButton {
    /// Any note on (velocity > 0) for this key flips.
    Note(u7),
    /// A control change. Toggle controllers send a high value for on and a low
    /// value for off, which lets pads stay lit while engaged.
    ControlChange { cc: u7, toggle: bool },
}

impl MidiButton {
    /// Maps the message to a button action, if this button handles it.
    pub fn handle(&self, message: &MidiMessage) -> Option<ButtonAction> {
        match (self, message) {
            (MidiButton::Note(note), MidiMessage::NoteOn { key, vel })
                if key == note && vel.as_int() > 0 =>
            {
                Some(ButtonAction::Flip)
            }
            (MidiButton::ControlChange { cc, toggle }, MidiMessage::Controller { controller, value })
                if controller == cc =>
            {
                if !toggle {
                    Some(ButtonAction::Flip)
                } else if value.as_int() > TOGGLE_MIDPOINT {
                    Some(ButtonAction::On)
                } else {
                    Some(ButtonAction::Off)
                }
            }
            _ => None,
        }
    }
}
