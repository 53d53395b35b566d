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
use std::{collections::HashMap, time::Duration};

use duration_string::DurationString;
use midly::num::{u4, u7};
use serde::{Deserialize, Serialize};

use crate::{
    button::MidiButton,
    chord::ChordQuality,
    selection::ChordQualitySelectionStyle,
    settings::Settings,
    voicing::{ChordVoicingStyle, StrumVoicingStyle, VoicingModifier},
};

use super::{error::ConfigError, registry::StyleRegistry};

/// A YAML representation of the settings. Every field is optional; missing
/// fields take their defaults.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct Document {
    /// The chord voice output channel, 1 to 16.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chord_channel: Option<u8>,

    /// The strum voice output channel, 1 to 16.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strum_channel: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    chord_voicing: Option<Style>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    strum_voicing: Option<Style>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    voicing_modifier: Option<VoicingModifier>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    chord_quality_selection: Option<QualitySelection>,

    /// The controller that drives the strum plate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strum_cc: Option<u8>,

    /// How long strummed notes sound, e.g. `500ms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strum_gate_time: Option<String>,

    /// Minimum time before a strum zone triggers again, e.g. `300ms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    strum_cooldown: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    strum_after_release: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    latch_button: Option<Button>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop_button: Option<Button>,

    /// The MIDI device to read performance input from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_device: Option<String>,

    /// The MIDI device to send transformed output to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_device: Option<String>,

    /// How often the runner polls for input, e.g. `1ms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poll_interval: Option<String>,
}

/// A voicing style selection.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Style {
    /// The style identifier.
    #[serde(rename = "type")]
    name: String,

    /// The data file for file based styles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QualitySelection {
    ButtonPerQuality {
        #[serde(default)]
        notes: Vec<NoteQuality>,
        #[serde(default)]
        ccs: Vec<CcQuality>,
    },
    CcRange {
        cc: u8,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct NoteQuality {
    note: u8,
    quality: ChordQuality,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct CcQuality {
    cc: u8,
    quality: ChordQuality,
}

/// A YAML representation of a button. `none` disables the button.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    Note {
        note: u8,
    },
    ControlChange {
        cc: u8,
        #[serde(default)]
        toggle: bool,
    },
    #[serde(rename = "none")]
    Disabled,
}

fn channel(field: &'static str, value: Option<u8>, default: u4) -> Result<u4, ConfigError> {
    match value {
        None => Ok(default),
        Some(value @ 1..=16) => Ok(u4::from(value - 1)),
        Some(value) => Err(ConfigError::InvalidValue {
            field,
            value: value.to_string(),
        }),
    }
}

fn seven_bit(field: &'static str, value: u8) -> Result<u7, ConfigError> {
    u7::try_from(value).ok_or_else(|| ConfigError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

fn duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => DurationString::from_string(value.clone())
            .map(Duration::from)
            .map_err(|_| ConfigError::InvalidValue {
                field,
                value: value.clone(),
            }),
    }
}

fn duration_string(duration: Duration) -> String {
    DurationString::from(duration).into()
}

impl Button {
    fn to_button(&self, field: &'static str) -> Result<Option<MidiButton>, ConfigError> {
        Ok(match self {
            Button::Note { note } => Some(MidiButton::Note(seven_bit(field, *note)?)),
            Button::ControlChange { cc, toggle } => Some(MidiButton::ControlChange {
                cc: seven_bit(field, *cc)?,
                toggle: *toggle,
            }),
            Button::Disabled => None,
        })
    }

    fn from_button(button: Option<MidiButton>) -> Button {
        match button {
            Some(MidiButton::Note(note)) => Button::Note {
                note: note.as_int(),
            },
            Some(MidiButton::ControlChange { cc, toggle }) => Button::ControlChange {
                cc: cc.as_int(),
                toggle,
            },
            None => Button::Disabled,
        }
    }
}

impl QualitySelection {
    fn to_style(&self) -> Result<ChordQualitySelectionStyle, ConfigError> {
        Ok(match self {
            QualitySelection::ButtonPerQuality { notes, ccs } => {
                ChordQualitySelectionStyle::ButtonPerQuality {
                    notes: notes
                        .iter()
                        .map(|entry| {
                            Ok((
                                seven_bit("chord_quality_selection.notes", entry.note)?,
                                entry.quality,
                            ))
                        })
                        .collect::<Result<HashMap<u7, ChordQuality>, ConfigError>>()?,
                    ccs: ccs
                        .iter()
                        .map(|entry| {
                            Ok((
                                seven_bit("chord_quality_selection.ccs", entry.cc)?,
                                entry.quality,
                            ))
                        })
                        .collect::<Result<HashMap<u7, ChordQuality>, ConfigError>>()?,
                }
            }
            QualitySelection::CcRange { cc } => ChordQualitySelectionStyle::CcRange {
                cc: seven_bit("chord_quality_selection.cc", *cc)?,
            },
        })
    }

    fn from_style(style: &ChordQualitySelectionStyle) -> QualitySelection {
        match style {
            ChordQualitySelectionStyle::ButtonPerQuality { notes, ccs } => {
                let mut notes: Vec<NoteQuality> = notes
                    .iter()
                    .map(|(note, quality)| NoteQuality {
                        note: note.as_int(),
                        quality: *quality,
                    })
                    .collect();
                notes.sort_by_key(|entry| entry.note);
                let mut ccs: Vec<CcQuality> = ccs
                    .iter()
                    .map(|(cc, quality)| CcQuality {
                        cc: cc.as_int(),
                        quality: *quality,
                    })
                    .collect();
                ccs.sort_by_key(|entry| entry.cc);
                QualitySelection::ButtonPerQuality { notes, ccs }
            }
            ChordQualitySelectionStyle::CcRange { cc } => {
                QualitySelection::CcRange { cc: cc.as_int() }
            }
        }
    }
}

impl Style {
    fn new(name: &str, path: Option<String>) -> Style {
        Style {
            name: name.to_string(),
            path,
        }
    }
}

impl Document {
    /// Builds a settings snapshot from the document. Nothing is published; a
    /// failure leaves the caller's live snapshot as it was.
    pub fn to_settings(&self, registry: &mut StyleRegistry) -> Result<Settings, ConfigError> {
        let defaults = Settings::default();

        let chord_voicing = match &self.chord_voicing {
            Some(style) => registry.chord_style(&style.name, style.path.as_deref())?,
            None => defaults.chord_voicing,
        };
        let strum_voicing = match &self.strum_voicing {
            Some(style) => registry.strum_style(&style.name, style.path.as_deref())?,
            None => defaults.strum_voicing,
        };
        let chord_quality_selection = match &self.chord_quality_selection {
            Some(selection) => selection.to_style()?,
            None => defaults.chord_quality_selection,
        };
        let latch_button = match &self.latch_button {
            Some(button) => button.to_button("latch_button")?,
            None => defaults.latch_button,
        };
        let stop_button = match &self.stop_button {
            Some(button) => button.to_button("stop_button")?,
            None => defaults.stop_button,
        };

        Ok(Settings {
            chord_channel: channel("chord_channel", self.chord_channel, defaults.chord_channel)?,
            strum_channel: channel("strum_channel", self.strum_channel, defaults.strum_channel)?,
            chord_voicing,
            strum_voicing,
            voicing_modifier: self.voicing_modifier.unwrap_or(defaults.voicing_modifier),
            chord_quality_selection,
            strum_cc: match self.strum_cc {
                Some(cc) => seven_bit("strum_cc", cc)?,
                None => defaults.strum_cc,
            },
            strum_gate_time: duration(
                "strum_gate_time",
                &self.strum_gate_time,
                defaults.strum_gate_time,
            )?,
            strum_cooldown: duration(
                "strum_cooldown",
                &self.strum_cooldown,
                defaults.strum_cooldown,
            )?,
            strum_after_release: self
                .strum_after_release
                .unwrap_or(defaults.strum_after_release),
            latch_button,
            stop_button,
            input_device: self.input_device.clone(),
            output_device: self.output_device.clone(),
            poll_interval: duration(
                "poll_interval",
                &self.poll_interval,
                defaults.poll_interval,
            )?,
        })
    }

    /// Creates a complete document describing the settings.
    pub fn from_settings(settings: &Settings) -> Document {
        let chord_path = match &settings.chord_voicing {
            ChordVoicingStyle::FromFile { path, .. } => Some(path.display().to_string()),
            _ => None,
        };
        let strum_path = match &settings.strum_voicing {
            StrumVoicingStyle::FromFile { path, .. } => Some(path.display().to_string()),
            _ => None,
        };

        Document {
            chord_channel: Some(settings.chord_channel.as_int() + 1),
            strum_channel: Some(settings.strum_channel.as_int() + 1),
            chord_voicing: Some(Style::new(settings.chord_voicing.name(), chord_path)),
            strum_voicing: Some(Style::new(settings.strum_voicing.name(), strum_path)),
            voicing_modifier: Some(settings.voicing_modifier),
            chord_quality_selection: Some(QualitySelection::from_style(
                &settings.chord_quality_selection,
            )),
            strum_cc: Some(settings.strum_cc.as_int()),
            strum_gate_time: Some(duration_string(settings.strum_gate_time)),
            strum_cooldown: Some(duration_string(settings.strum_cooldown)),
            strum_after_release: Some(settings.strum_after_release),
            latch_button: Some(Button::from_button(settings.latch_button)),
            stop_button: Some(Button::from_button(settings.stop_button)),
            input_device: settings.input_device.clone(),
            output_device: settings.output_device.clone(),
            poll_interval: Some(duration_string(settings.poll_interval)),
        }
    }
}
