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
use std::collections::HashMap;

use midly::{num::u7, MidiMessage};

use crate::chord::ChordQuality;

/// Controller values above this select a quality in the per-button style.
const CC_PRESSED_THRESHOLD: u8 = 63;

/// How incoming MIDI selects the quality of the next chord.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChordQualitySelectionStyle {
    /// Individual notes or controllers each select one quality.
    ButtonPerQuality {
        notes: HashMap<u7, ChordQuality>,
        ccs: HashMap<u7, ChordQuality>,
    },
    /// One controller's range is split into equal bands, one per quality.
    CcRange { cc: u7 },
}

impl Default for ChordQualitySelectionStyle {
    fn default() -> Self {
        ChordQualitySelectionStyle::ButtonPerQuality {
            notes: HashMap::from([
                (u7::from(0), ChordQuality::Major),
                (u7::from(1), ChordQuality::Minor),
                (u7::from(2), ChordQuality::Dom7),
            ]),
            ccs: HashMap::new(),
        }
    }
}

impl ChordQualitySelectionStyle {
    /// Returns the quality selected by the message, if any.
    pub fn select(&self, message: &MidiMessage) -> Option<ChordQuality> {
        match self {
            ChordQualitySelectionStyle::ButtonPerQuality { notes, ccs } => match message {
                MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => notes.get(key).copied(),
                MidiMessage::Controller { controller, value }
                    if value.as_int() > CC_PRESSED_THRESHOLD =>
                {
                    ccs.get(controller).copied()
                }
                _ => None,
            },
            ChordQualitySelectionStyle::CcRange { cc } => match message {
                MidiMessage::Controller { controller, value } if controller == cc => {
                    Some(quality_for_range_value(value.as_int()))
                }
                _ => None,
            },
        }
    }
}

/// Maps a 7 bit controller value onto one of the equal quality bands.
fn quality_for_range_value(value: u8) -> ChordQuality {
    let bands = ChordQuality::ALL.len();
    ChordQuality::ALL[usize::from(value) * bands / 128]
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use midly::{num::u7, MidiMessage};

    use super::ChordQualitySelectionStyle;
    use crate::chord::ChordQuality;

    fn note_on(key: u8, vel: u8) -> MidiMessage {
        MidiMessage::NoteOn {
            key: u7::from_int_lossy(key),
            vel: u7::from_int_lossy(vel),
        }
    }

    fn control_change(controller: u8, value: u8) -> MidiMessage {
        MidiMessage::Controller {
            controller: u7::from_int_lossy(controller),
            value: u7::from_int_lossy(value),
        }
    }

    #[test]
    fn button_per_quality() {
        let style = ChordQualitySelectionStyle::ButtonPerQuality {
            notes: HashMap::from([(u7::from(0), ChordQuality::Minor)]),
            ccs: HashMap::from([(u7::from(20), ChordQuality::Sus4)]),
        };

        assert_eq!(Some(ChordQuality::Minor), style.select(&note_on(0, 100)));
        assert_eq!(None, style.select(&note_on(0, 0)));
        assert_eq!(None, style.select(&note_on(60, 100)));
        assert_eq!(Some(ChordQuality::Sus4), style.select(&control_change(20, 64)));
        assert_eq!(None, style.select(&control_change(20, 63)));
        assert_eq!(None, style.select(&control_change(21, 127)));
    }

    #[test]
    fn cc_range_bands() {
        let style = ChordQualitySelectionStyle::CcRange { cc: u7::from(16) };

        assert_eq!(Some(ChordQuality::Major), style.select(&control_change(16, 0)));
        assert_eq!(Some(ChordQuality::Major), style.select(&control_change(16, 14)));
        assert_eq!(Some(ChordQuality::Minor), style.select(&control_change(16, 15)));
        assert_eq!(Some(ChordQuality::Add9), style.select(&control_change(16, 127)));
        assert_eq!(None, style.select(&control_change(17, 64)));
        assert_eq!(None, style.select(&note_on(16, 100)));
    }
}
