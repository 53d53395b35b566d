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
use std::{path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::chord::{Chord, ChordQuality};

pub mod file;
pub mod leading;

pub use file::{ChordFile, ChordFileCache, ChordFileError};

/// The note every fixed anchor is built from.
pub const ANCHOR_BASE: i32 = 60;

/// Returns the anchor for a root: its pitch class in the octave starting at middle C.
pub fn anchor(root: i32) -> i32 {
    ANCHOR_BASE + root.rem_euclid(12)
}

/// How the chord voice spells a chord.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChordVoicingStyle {
    /// The root followed by the full chord offsets.
    RootPosition,
    /// The full chord, folded into the root's octave.
    SmoothedFull,
    /// The three most important notes, folded into the F# to F band below the root's octave.
    Omnichord,
    /// A single note whose octave encodes the quality.
    Omni84,
    /// Voicings read from a data file.
    FromFile { path: PathBuf, file: Arc<ChordFile> },
}

impl ChordVoicingStyle {
    /// The identifier used in configuration documents.
    pub fn name(&self) -> &'static str {
        match self {
            ChordVoicingStyle::RootPosition => "root_position",
            ChordVoicingStyle::SmoothedFull => "smoothed_full",
            ChordVoicingStyle::Omnichord => "omnichord",
            ChordVoicingStyle::Omni84 => "omni_84",
            ChordVoicingStyle::FromFile { .. } => "from_file",
        }
    }

    /// The data file backing the style, if it reads one.
    pub fn file(&self) -> Option<&ChordFile> {
        match self {
            ChordVoicingStyle::FromFile { file, .. } => Some(file.as_ref()),
            _ => None,
        }
    }

    /// Builds the unclamped notes for the quality at the given root.
    pub fn construct(&self, quality: ChordQuality, root: i32) -> Vec<i32> {
        match self {
            ChordVoicingStyle::RootPosition => {
                quality.offsets().iter().map(|offset| root + offset).collect()
            }
            ChordVoicingStyle::SmoothedFull => {
                let octave_start = 12 * root.div_euclid(12);
                quality
                    .offsets()
                    .iter()
                    .map(|offset| octave_start + (root + offset).rem_euclid(12))
                    .collect()
            }
            ChordVoicingStyle::Omnichord => {
                // C4 through B4 all share F#3 as the bottom of their band.
                let band_start = 12 * root.div_euclid(12) - 6;
                quality
                    .triad_offsets()
                    .iter()
                    .map(|offset| band_start + (root + offset + 6).rem_euclid(12))
                    .collect()
            }
            ChordVoicingStyle::Omni84 => vec![omni_84_octave(quality) + root.rem_euclid(12)],
            ChordVoicingStyle::FromFile { file, .. } => file.construct(quality, root),
        }
    }
}

/// The octave an Omni84 chord is played in, by quality.
fn omni_84_octave(quality: ChordQuality) -> i32 {
    match quality {
        ChordQuality::Major => 36,
        ChordQuality::Minor => 48,
        ChordQuality::Dom7 => 60,
        ChordQuality::Minor7 => 72,
        ChordQuality::Major7 => 84,
        ChordQuality::Dim7 => 96,
        ChordQuality::Augmented => 108,
        ChordQuality::Sus4 | ChordQuality::Add9 => 36,
    }
}

/// How the strum voice lays a chord out across the strum plate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StrumVoicingStyle {
    /// The triad stacked in ascending octaves.
    PlainAscending,
    /// The triad folded into F# based bands, repeated across octaves.
    Omnichord,
    /// Voicings read from a data file.
    FromFile { path: PathBuf, file: Arc<ChordFile> },
}

/// Number of notes produced by the built in strum styles.
pub const STRUM_LENGTH: usize = 13;

impl StrumVoicingStyle {
    /// The identifier used in configuration documents.
    pub fn name(&self) -> &'static str {
        match self {
            StrumVoicingStyle::PlainAscending => "plain_ascending",
            StrumVoicingStyle::Omnichord => "omnichord",
            StrumVoicingStyle::FromFile { .. } => "from_file",
        }
    }

    pub fn file(&self) -> Option<&ChordFile> {
        match self {
            StrumVoicingStyle::FromFile { file, .. } => Some(file.as_ref()),
            _ => None,
        }
    }

    /// Builds the unclamped strum sequence for the quality at the given root.
    pub fn construct(&self, quality: ChordQuality, root: i32) -> Vec<i32> {
        match self {
            StrumVoicingStyle::PlainAscending => {
                let triad = quality.triad_offsets();
                let mut notes: Vec<i32> = [-12, 0, 12, 24]
                    .iter()
                    .flat_map(|shift| triad.iter().map(move |offset| root + shift + offset))
                    .collect();
                notes.push(root + 36);
                notes
            }
            StrumVoicingStyle::Omnichord => {
                let lowest_f_sharp = 12 * (root - 6).max(0).div_euclid(12) + 6;
                let triad = quality.triad_offsets();
                let mut notes: Vec<i32> = [-12, 0, 12, 24, 36]
                    .iter()
                    .flat_map(|band| {
                        triad.iter().map(move |offset| {
                            lowest_f_sharp + band + (root + offset - 6).rem_euclid(12)
                        })
                    })
                    .collect();
                notes.truncate(STRUM_LENGTH);
                notes
            }
            StrumVoicingStyle::FromFile { file, .. } => file.construct(quality, root),
        }
    }
}

/// Post-processing applied to chord voicings.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoicingModifier {
    /// Voicings are used as constructed at the pressed root.
    #[default]
    None,
    /// Voicings are constructed at the anchor, ignoring the pressed octave.
    Fixed,
    /// Voicings are constructed at the anchor and inverted by the pressed octave.
    Smooth,
    /// Voicings are led from the previously sounding chord.
    Dynamic,
}

impl VoicingModifier {
    /// Voices the chord with the style, applying this modifier. `previous` holds the
    /// notes of the last voiced chord and is only consulted by [`VoicingModifier::Dynamic`].
    pub fn voice(self, style: &ChordVoicingStyle, chord: Chord, previous: &[i32]) -> Vec<i32> {
        let root = i32::from(chord.root);
        match self {
            VoicingModifier::None => style.construct(chord.quality, root),
            VoicingModifier::Fixed => style.construct(chord.quality, anchor(root)),
            VoicingModifier::Smooth => {
                let anchor = anchor(root);
                let mut offsets: Vec<i32> = style
                    .construct(chord.quality, anchor)
                    .into_iter()
                    .map(|note| note - anchor)
                    .collect();
                offsets.sort_unstable();
                let shifts = inversion_shifts(root.div_euclid(12), offsets.len());
                offsets
                    .into_iter()
                    .zip(shifts)
                    .map(|(offset, shift)| anchor + offset + shift)
                    .collect()
            }
            VoicingModifier::Dynamic => {
                let pitch_classes: Vec<i32> = style
                    .construct(chord.quality, anchor(root))
                    .into_iter()
                    .map(|note| note.rem_euclid(12))
                    .collect();
                leading::lead(&pitch_classes, previous)
                    .unwrap_or_else(|| style.construct(chord.quality, root))
            }
        }
    }
}

/// Per-voice octave shifts for smooth voicing. Low octaves drop the top voices,
/// high octaves raise the bottom voices, octave 5 and anything outside 2 to 8 is left alone.
fn inversion_shifts(octave: i32, voices: usize) -> Vec<i32> {
    let (top_down, bottom_up) = match octave {
        2 => (3, 0),
        3 => (2, 0),
        4 => (1, 0),
        6 => (0, 1),
        7 => (0, 2),
        8 => (0, 3),
        _ => (0, 0),
    };
    let top_down = top_down.min(voices);
    let bottom_up = bottom_up.min(voices);

    (0..voices)
        .map(|i| {
            if i < bottom_up {
                12
            } else if i >= voices - top_down {
                -12
            } else {
                0
            }
        })
        .collect()
}
