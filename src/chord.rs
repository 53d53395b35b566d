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
use std::fmt;

use serde::{Deserialize, Serialize};

/// Pitch class names, indexed by pitch class.
const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The harmonic category of a chord.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    #[default]
    Major,
    Minor,
    #[serde(rename = "dom_7")]
    Dom7,
    #[serde(rename = "major_7")]
    Major7,
    #[serde(rename = "minor_7")]
    Minor7,
    #[serde(rename = "dim_7")]
    Dim7,
    Augmented,
    #[serde(rename = "sus_4")]
    Sus4,
    #[serde(rename = "add_9")]
    Add9,
}

/// Static data describing a chord quality.
pub struct ChordQualityData {
    /// The upper case name used by voicing data files.
    pub file_key: &'static str,
    /// A human readable name.
    pub display_name: &'static str,
    /// The suffix used in chord symbols, e.g. "m7".
    pub suffix: &'static str,
    /// Semitone offsets of the full chord.
    pub offsets: &'static [i32],
    /// The three most important offsets, for voices capped at three notes.
    pub triad_offsets: [i32; 3],
}

const QUALITY_TABLE: [ChordQualityData; 9] = [
    ChordQualityData {
        file_key: "MAJOR",
        display_name: "Major",
        suffix: "maj",
        offsets: &[0, 4, 7],
        triad_offsets: [0, 4, 7],
    },
    ChordQualityData {
        file_key: "MINOR",
        display_name: "Minor",
        suffix: "m",
        offsets: &[0, 3, 7],
        triad_offsets: [0, 3, 7],
    },
    ChordQualityData {
        file_key: "DOM_7",
        display_name: "Dominant 7th",
        suffix: "7",
        offsets: &[0, 4, 7, 10],
        triad_offsets: [0, 4, 10],
    },
    ChordQualityData {
        file_key: "MAJOR_7",
        display_name: "Major 7th",
        suffix: "maj7",
        offsets: &[0, 4, 7, 11],
        triad_offsets: [0, 4, 11],
    },
    ChordQualityData {
        file_key: "MINOR_7",
        display_name: "Minor 7th",
        suffix: "m7",
        offsets: &[0, 3, 7, 10],
        triad_offsets: [0, 3, 10],
    },
    ChordQualityData {
        file_key: "DIM_7",
        display_name: "Diminished 7th",
        suffix: "dim7",
        offsets: &[0, 3, 6, 9],
        triad_offsets: [0, 3, 9],
    },
    ChordQualityData {
        file_key: "AUGMENTED",
        display_name: "Augmented",
        suffix: "aug",
        offsets: &[0, 4, 8],
        triad_offsets: [0, 4, 8],
    },
    ChordQualityData {
        file_key: "SUS_4",
        display_name: "Suspended 4th",
        suffix: "sus4",
        offsets: &[0, 5, 7],
        triad_offsets: [0, 5, 7],
    },
    ChordQualityData {
        file_key: "ADD_9",
        display_name: "Add 9",
        suffix: "add9",
        offsets: &[0, 4, 7, 14],
        triad_offsets: [0, 7, 14],
    },
];

impl ChordQuality {
    /// Every quality, in the order used by range based selection.
    pub const ALL: [ChordQuality; 9] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dom7,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Dim7,
        ChordQuality::Augmented,
        ChordQuality::Sus4,
        ChordQuality::Add9,
    ];

    /// Returns the static data for this quality.
    pub fn data(self) -> &'static ChordQualityData {
        &QUALITY_TABLE[self as usize]
    }

    pub fn offsets(self) -> &'static [i32] {
        self.data().offsets
    }

    pub fn triad_offsets(self) -> [i32; 3] {
        self.data().triad_offsets
    }

    /// Looks up a quality by its voicing data file key.
    pub fn from_file_key(key: &str) -> Option<ChordQuality> {
        ChordQuality::ALL
            .into_iter()
            .find(|quality| quality.data().file_key == key)
    }
}

impl fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data().display_name)
    }
}

/// A chord: a quality anchored on an absolute root note.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chord {
    pub quality: ChordQuality,
    pub root: u8,
}

impl Chord {
    pub fn new(quality: ChordQuality, root: u8) -> Chord {
        Chord { quality, root }
    }

    /// The root reduced to its pitch class.
    pub fn pitch_class(&self) -> u8 {
        self.root % 12
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            NOTE_NAMES[usize::from(self.pitch_class())],
            self.quality.data().suffix
        )
    }
}

/// Clamps a note into the valid MIDI range.
pub fn clamp_note(note: i32) -> u8 {
    note.clamp(0, 127) as u8
}

#[cfg(test)]
mod test {
    use super::{clamp_note, Chord, ChordQuality};

    #[test]
    fn quality_table_shapes() {
        for quality in ChordQuality::ALL {
            let offsets = quality.offsets();
            assert!(
                offsets.len() == 3 || offsets.len() == 4,
                "{} has {} offsets",
                quality,
                offsets.len()
            );
            assert_eq!(0, offsets[0]);
            assert_eq!(0, quality.triad_offsets()[0]);
        }
        assert_eq!([0, 7, 14], ChordQuality::Add9.triad_offsets());
        assert_eq!(&[0, 3, 6, 9], ChordQuality::Dim7.offsets());
    }

    #[test]
    fn file_keys() {
        assert_eq!(Some(ChordQuality::Dom7), ChordQuality::from_file_key("DOM_7"));
        assert_eq!(Some(ChordQuality::Add9), ChordQuality::from_file_key("ADD_9"));
        assert_eq!(None, ChordQuality::from_file_key("dom_7"));
    }

    #[test]
    fn chord_names() {
        assert_eq!("Cmaj", Chord::new(ChordQuality::Major, 60).to_string());
        assert_eq!("F#m7", Chord::new(ChordQuality::Minor7, 66).to_string());
        assert_eq!("Bdim7", Chord::new(ChordQuality::Dim7, 11).to_string());
    }

    #[test]
    fn clamping() {
        assert_eq!(0, clamp_note(-5));
        assert_eq!(127, clamp_note(140));
        assert_eq!(64, clamp_note(64));
    }
}
