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

//! The transformation engine.
//!
//! Each incoming event is offered to a fixed chain of handlers. The first handler
//! that claims the event produces the output, which may be empty. Events nobody
//! claims are passed through unchanged.

use std::sync::Arc;

use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};
use tracing::debug;

use crate::{
    button::ButtonAction,
    chord::{clamp_note, Chord, ChordQuality},
    scheduler::{Scheduler, TimeBase},
    settings::{Settings, SettingsHandle},
    voicing,
};

pub mod strum;

#[cfg(test)]
mod tests;

/// Velocity used by the strum voice before any chord has been played.
pub const DEFAULT_VELOCITY: u8 = 100;

/// The output of a handler that claimed the event.
type Claimed = Option<Vec<LiveEvent<'static>>>;

/// A handler in the chain.
type Handler = fn(&mut Engine, &Settings, &MidiMessage, u64) -> Claimed;

/// The handler chain, in priority order.
const HANDLERS: [Handler; 6] = [
    Engine::change_quality,
    Engine::stop_button,
    Engine::latch_button,
    Engine::chord_on,
    Engine::chord_off,
    Engine::strum,
];

/// A note sounding from the chord voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeldNote {
    channel: u4,
    key: u7,
}

#[derive(Debug)]
struct EngineState {
    current_chord: Option<Chord>,
    last_played_chord: Option<Chord>,
    enqueued_quality: ChordQuality,
    latch: bool,
    held_notes: Vec<HeldNote>,
    previous_voicing: Vec<i32>,
    last_velocity: u7,
    debounce: strum::Debounce,
}

impl Default for EngineState {
    fn default() -> Self {
        EngineState {
            current_chord: None,
            last_played_chord: None,
            enqueued_quality: ChordQuality::default(),
            latch: false,
            held_notes: Vec::new(),
            previous_voicing: Vec::new(),
            last_velocity: u7::from(DEFAULT_VELOCITY),
            debounce: strum::Debounce::default(),
        }
    }
}

/// Turns performance input into chord and strum output.
pub struct Engine {
    settings: Arc<SettingsHandle>,
    scheduler: Scheduler,
    state: EngineState,
}

impl Engine {
    /// Creates an engine reading its configuration from the handle. `time_base`
    /// describes the unit of the `now` values passed to [`Engine::handle`].
    pub fn new(settings: Arc<SettingsHandle>, time_base: TimeBase) -> Engine {
        Engine {
            settings,
            scheduler: Scheduler::new(time_base),
            state: EngineState::default(),
        }
    }

    /// Handles one incoming event at time `now`, returning the events to send
    /// immediately. Delayed events are returned by [`Engine::collect_due`].
    pub fn handle<'a>(&mut self, event: LiveEvent<'a>, now: u64) -> Vec<LiveEvent<'a>> {
        let LiveEvent::Midi { message, .. } = event else {
            return vec![event];
        };

        let settings = self.settings.load();
        for handler in HANDLERS {
            if let Some(output) = handler(self, &settings, &message, now) {
                return output;
            }
        }

        vec![event]
    }

    /// Returns scheduled events due at or before `now`.
    pub fn collect_due(&mut self, now: u64) -> Vec<LiveEvent<'static>> {
        self.scheduler.collect_due(now)
    }

    /// Clears all state, returning note offs for everything still sounding,
    /// including strummed notes that were waiting on their gate.
    pub fn reset(&mut self) -> Vec<LiveEvent<'static>> {
        let mut output = self.stop_all();
        output.extend(self.scheduler.collect_due(u64::MAX));
        self.scheduler.clear();
        self.state = EngineState::default();
        debug!("Engine reset.");
        output
    }

    pub fn enqueued_quality(&self) -> ChordQuality {
        self.state.enqueued_quality
    }

    /// The keys currently sounding from the chord voice.
    pub fn sounding_notes(&self) -> Vec<u8> {
        self.state
            .held_notes
            .iter()
            .map(|note| note.key.as_int())
            .collect()
    }

    pub fn current_root(&self) -> Option<u8> {
        self.state.current_chord.map(|chord| chord.root)
    }

    pub fn current_chord(&self) -> Option<Chord> {
        self.state.current_chord
    }

    pub fn last_played_chord(&self) -> Option<Chord> {
        self.state.last_played_chord
    }

    pub fn latch(&self) -> bool {
        self.state.latch
    }

    pub fn pending_events(&self) -> usize {
        self.scheduler.len()
    }

    /// Releases every held chord note and forgets the current chord.
    fn stop_all(&mut self) -> Vec<LiveEvent<'static>> {
        self.state.current_chord = None;
        self.state
            .held_notes
            .drain(..)
            .map(|note| LiveEvent::Midi {
                channel: note.channel,
                message: MidiMessage::NoteOff {
                    key: note.key,
                    vel: u7::from(0),
                },
            })
            .collect()
    }

    fn change_quality(&mut self, settings: &Settings, message: &MidiMessage, _: u64) -> Claimed {
        let quality = settings.chord_quality_selection.select(message)?;
        debug!(quality = %quality, "Enqueued chord quality.");
        self.state.enqueued_quality = quality;
        Some(Vec::new())
    }

    fn stop_button(&mut self, settings: &Settings, message: &MidiMessage, _: u64) -> Claimed {
        settings.stop_button?.handle(message)?;
        debug!("Stop button pressed.");
        Some(self.stop_all())
    }

    fn latch_button(&mut self, settings: &Settings, message: &MidiMessage, _: u64) -> Claimed {
        let latch = match settings.latch_button?.handle(message)? {
            ButtonAction::Flip => !self.state.latch,
            ButtonAction::On => true,
            ButtonAction::Off => false,
        };
        debug!(latch, "Latch changed.");
        self.state.latch = latch;
        if !latch {
            Some(self.stop_all())
        } else {
            Some(Vec::new())
        }
    }

    fn chord_on(&mut self, settings: &Settings, message: &MidiMessage, _: u64) -> Claimed {
        let MidiMessage::NoteOn { key, vel } = *message else {
            return None;
        };
        if vel.as_int() == 0 {
            return None;
        }

        let mut output = self.stop_all();

        let chord = Chord::new(self.state.enqueued_quality, key.as_int());
        self.state.current_chord = Some(chord);
        self.state.last_played_chord = Some(chord);

        let voicing = settings.voicing_modifier.voice(
            &settings.chord_voicing,
            chord,
            &self.state.previous_voicing,
        );

        for note in &voicing {
            let key = u7::from(clamp_note(*note));
            if self.state.held_notes.iter().any(|held| held.key == key) {
                continue;
            }
            self.state.held_notes.push(HeldNote {
                channel: settings.chord_channel,
                key,
            });
            output.push(LiveEvent::Midi {
                channel: settings.chord_channel,
                message: MidiMessage::NoteOn { key, vel },
            });
        }

        debug!(chord = %chord, notes = ?voicing, "Playing chord.");
        self.state.previous_voicing = voicing;
        self.state.last_velocity = vel;
        Some(output)
    }

    fn chord_off(&mut self, _: &Settings, message: &MidiMessage, _: u64) -> Claimed {
        let key = match *message {
            MidiMessage::NoteOff { key, .. } => key,
            MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => key,
            _ => return None,
        };

        let releases_current = self
            .state
            .current_chord
            .is_some_and(|chord| chord.root == key.as_int());
        if !self.state.latch && releases_current {
            Some(self.stop_all())
        } else {
            Some(Vec::new())
        }
    }

    fn strum(&mut self, settings: &Settings, message: &MidiMessage, now: u64) -> Claimed {
        let MidiMessage::Controller { controller, value } = *message else {
            return None;
        };
        if controller != settings.strum_cc {
            return None;
        }

        let chord = match self.state.current_chord {
            Some(chord) => chord,
            None if settings.strum_after_release => match self.state.last_played_chord {
                Some(chord) => chord,
                None => return Some(Vec::new()),
            },
            None => return Some(Vec::new()),
        };
        let Some(zone) = strum::zone(value.as_int()) else {
            return Some(Vec::new());
        };

        let realtime = self.settings.realtime();
        let cooldown = self.scheduler.time_base().ticks(realtime.cooldown());
        let gate_time = realtime.gate_time();
        if !self.state.debounce.should_trigger(zone, now, cooldown) {
            return Some(Vec::new());
        }

        let notes = settings.strum_voicing.construct(
            chord.quality,
            voicing::anchor(i32::from(chord.root)),
        );
        let Some(note) = notes.get(zone) else {
            debug!(zone, len = notes.len(), "Strum voicing too short for zone.");
            return Some(Vec::new());
        };

        let key = u7::from(clamp_note(*note));
        let channel = settings.strum_channel;
        self.scheduler.schedule(
            LiveEvent::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::from(0),
                },
            },
            now,
            gate_time,
        );
        self.state.debounce.record(zone, now);

        debug!(chord = %chord, zone, note = key.as_int(), "Strum.");
        Some(vec![LiveEvent::Midi {
            channel,
            message: MidiMessage::NoteOn {
                key,
                vel: self.state.last_velocity,
            },
        }])
    }
}
