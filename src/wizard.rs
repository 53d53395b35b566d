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

//! Interactive config creation. Controls are learned by pressing them on the
//! input device.

use std::{
    collections::HashMap,
    io::{self, BufRead, Write},
    ops::RangeInclusive,
    thread,
    time::Duration,
};

use crossbeam_channel::Receiver;
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use tracing::debug;

use crate::{
    button::MidiButton,
    chord::ChordQuality,
    selection::ChordQualitySelectionStyle,
    settings::Settings,
};

/// How long to let a wiggled controller settle before its remaining events are
/// discarded.
const DEFAULT_SETTLE_TIME: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Console I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cancelled.")]
    Cancelled,

    #[error("MIDI input closed.")]
    Disconnected,

    #[error("No MIDI devices found, plug in a controller and try again.")]
    NoDevices,
}

/// Walks the user through creating settings on a console.
pub struct Wizard<R, W> {
    input: R,
    output: W,
    events: Receiver<Vec<u8>>,
    settle_time: Duration,
}

impl<R: BufRead, W: Write> Wizard<R, W> {
    /// Creates a wizard reading answers from `input` and raw MIDI input from
    /// `events`.
    pub fn new(input: R, output: W, events: Receiver<Vec<u8>>) -> Wizard<R, W> {
        Wizard {
            input,
            output,
            events,
            settle_time: DEFAULT_SETTLE_TIME,
        }
    }

    pub fn with_settle_time(mut self, settle_time: Duration) -> Wizard<R, W> {
        self.settle_time = settle_time;
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Asks the user to pick one of the device names.
    pub fn select_device(&mut self, role: &str, names: &[String]) -> Result<String, WizardError> {
        if names.is_empty() {
            return Err(WizardError::NoDevices);
        }

        writeln!(self.output, "Available MIDI devices for {}:", role)?;
        for (idx, name) in names.iter().enumerate() {
            writeln!(self.output, "  {}. {}", idx + 1, name)?;
        }
        let count = u16::try_from(names.len()).unwrap_or(u16::MAX);
        let choice = self.select_number(1..=count, None)?;
        Ok(names[usize::from(choice - 1)].clone())
    }

    /// Asks for every setting, learning buttons from the MIDI input.
    pub fn configure(
        &mut self,
        input_device: &str,
        output_device: &str,
    ) -> Result<Settings, WizardError> {
        let defaults = Settings::default();

        writeln!(
            self.output,
            "Chords and strums are sent on two separate MIDI channels."
        )?;
        writeln!(self.output, "Which channel should chords be sent on?")?;
        let chord_channel = self.select_number(1..=16, Some(channel(defaults.chord_channel)))?;
        writeln!(self.output, "Which channel should strums be sent on?")?;
        let strum_channel = self.select_number(1..=16, Some(channel(defaults.strum_channel)))?;
        writeln!(
            self.output,
            "Which controller is the strum plate? 1 is usually the mod wheel."
        )?;
        let strum_cc = self.select_number(0..=127, Some(u16::from(defaults.strum_cc.as_int())))?;

        writeln!(
            self.output,
            "How long before the same strum zone may repeat its note? (ms)"
        )?;
        let cooldown = self.select_number(0..=1000, Some(millis(defaults.strum_cooldown)))?;
        writeln!(self.output, "How long should each strummed note sound? (ms)")?;
        let gate_time = self.select_number(0..=1000, Some(millis(defaults.strum_gate_time)))?;

        let chord_quality_selection = self.select_quality_selection()?;

        writeln!(self.output, "Which control switches latch mode?")?;
        let latch_button = self.select_button()?;
        writeln!(self.output, "Which control silences the current chord?")?;
        let stop_button = self.select_button()?;

        Ok(Settings {
            chord_channel: u4::from_int_lossy(chord_channel.saturating_sub(1) as u8),
            strum_channel: u4::from_int_lossy(strum_channel.saturating_sub(1) as u8),
            strum_cc: u7::from_int_lossy(strum_cc as u8),
            strum_cooldown: Duration::from_millis(u64::from(cooldown)),
            strum_gate_time: Duration::from_millis(u64::from(gate_time)),
            chord_quality_selection,
            latch_button: Some(latch_button),
            stop_button: Some(stop_button),
            input_device: Some(input_device.to_string()),
            output_device: Some(output_device.to_string()),
            ..defaults
        })
    }

    fn select_quality_selection(&mut self) -> Result<ChordQualitySelectionStyle, WizardError> {
        writeln!(self.output, "How do you want to choose the chord quality?")?;
        writeln!(self.output, "  1. One note per quality, e.g. low drum pads.")?;
        writeln!(self.output, "  2. One controller per quality.")?;
        writeln!(
            self.output,
            "  3. One controller for every quality, split evenly over its range."
        )?;

        Ok(match self.select_number(1..=3, None)? {
            1 => {
                let mut notes: HashMap<u7, ChordQuality> = HashMap::new();
                for quality in ChordQuality::ALL {
                    loop {
                        let note = self.next_note_on(&format!("Press the note for {}.", quality))?;
                        if notes.contains_key(&note) {
                            writeln!(self.output, "That note is already used.")?;
                            continue;
                        }
                        notes.insert(note, quality);
                        break;
                    }
                }
                ChordQualitySelectionStyle::ButtonPerQuality {
                    notes,
                    ccs: HashMap::new(),
                }
            }
            2 => {
                let mut ccs: HashMap<u7, ChordQuality> = HashMap::new();
                for quality in ChordQuality::ALL {
                    loop {
                        let cc = self.next_cc(&format!("Press the controller for {}.", quality))?;
                        if ccs.contains_key(&cc) {
                            writeln!(self.output, "That controller is already used.")?;
                            continue;
                        }
                        ccs.insert(cc, quality);
                        break;
                    }
                }
                ChordQualitySelectionStyle::ButtonPerQuality {
                    notes: HashMap::new(),
                    ccs,
                }
            }
            _ => ChordQualitySelectionStyle::CcRange {
                cc: self.next_cc("Press or wiggle the controller for every quality.")?,
            },
        })
    }

    fn select_button(&mut self) -> Result<MidiButton, WizardError> {
        writeln!(self.output, "  1. A note, e.g. a drum pad in a low octave.")?;
        writeln!(
            self.output,
            "  2. A controller. Values above 63 count as on, the rest as off."
        )?;

        match self.select_number(1..=2, None)? {
            1 => Ok(MidiButton::Note(self.next_note_on("Press the note.")?)),
            _ => {
                writeln!(
                    self.output,
                    "Is the controller 1. momentary (every press flips) or 2. a toggle (sends on and off)?"
                )?;
                let toggle = self.select_number(1..=2, None)? == 2;
                let cc = self.next_cc("Press the controller.")?;
                Ok(MidiButton::ControlChange { cc, toggle })
            }
        }
    }

    /// Reads a number in the range, re-asking until one is given. An empty
    /// answer takes the default.
    fn select_number(
        &mut self,
        range: RangeInclusive<u16>,
        default: Option<u16>,
    ) -> Result<u16, WizardError> {
        loop {
            match default {
                Some(default) => write!(
                    self.output,
                    "Enter a number [{} - {}] (default {}): ",
                    range.start(),
                    range.end(),
                    default
                )?,
                None => write!(
                    self.output,
                    "Enter a number [{} - {}]: ",
                    range.start(),
                    range.end()
                )?,
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Err(WizardError::Cancelled);
            }
            let line = line.trim();
            if line.is_empty() {
                if let Some(default) = default {
                    return Ok(default);
                }
            }
            match line.parse::<u16>() {
                Ok(number) if range.contains(&number) => return Ok(number),
                _ => writeln!(self.output, "Please enter a valid number.")?,
            }
        }
    }

    /// Discards stale input, prompts, then waits for the first event the filter
    /// accepts.
    fn capture<F>(&mut self, prompt: &str, filter: F) -> Result<u7, WizardError>
    where
        F: Fn(&MidiMessage) -> Option<u7>,
    {
        self.events.try_iter().for_each(drop);
        writeln!(self.output, "{}", prompt)?;
        self.output.flush()?;

        loop {
            let raw = self
                .events
                .recv()
                .map_err(|_| WizardError::Disconnected)?;
            match LiveEvent::parse(&raw) {
                Ok(LiveEvent::Midi { message, .. }) => {
                    if let Some(value) = filter(&message) {
                        return Ok(value);
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(err = ?e, "Ignoring unparseable MIDI input."),
            }
        }
    }

    fn next_note_on(&mut self, prompt: &str) -> Result<u7, WizardError> {
        self.capture(prompt, |message| match *message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Some(key),
            _ => None,
        })
    }

    fn next_cc(&mut self, prompt: &str) -> Result<u7, WizardError> {
        let cc = self.capture(prompt, |message| match *message {
            MidiMessage::Controller { controller, .. } => Some(controller),
            _ => None,
        })?;
        // A wiggled controller keeps sending for a moment.
        thread::sleep(self.settle_time);
        self.events.try_iter().for_each(drop);
        Ok(cc)
    }
}

fn channel(channel: u4) -> u16 {
    u16::from(channel.as_int()) + 1
}

fn millis(duration: Duration) -> u16 {
    u16::try_from(duration.as_millis()).unwrap_or(u16::MAX)
}
