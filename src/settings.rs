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
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::{ArcSwap, Guard};
use midly::num::{u4, u7};
use tracing::info;

use crate::{
    button::MidiButton,
    selection::ChordQualitySelectionStyle,
    voicing::{ChordVoicingStyle, StrumVoicingStyle, VoicingModifier},
};

pub const DEFAULT_GATE_TIME: Duration = Duration::from_millis(500);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// An immutable configuration snapshot. Published snapshots are never mutated;
/// changes are made by building a new one and storing it in a [`SettingsHandle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Output channel of the chord voice.
    pub chord_channel: u4,
    /// Output channel of the strum voice.
    pub strum_channel: u4,
    pub chord_voicing: ChordVoicingStyle,
    pub strum_voicing: StrumVoicingStyle,
    pub voicing_modifier: VoicingModifier,
    pub chord_quality_selection: ChordQualitySelectionStyle,
    /// The controller that drives the strum plate.
    pub strum_cc: u7,
    /// How long strummed notes sound before their note off.
    pub strum_gate_time: Duration,
    /// Minimum time before the same strum zone triggers again.
    pub strum_cooldown: Duration,
    /// Whether strumming plays the last chord after its keys are released.
    pub strum_after_release: bool,
    pub latch_button: Option<MidiButton>,
    pub stop_button: Option<MidiButton>,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    /// How often the runner polls for input and due events.
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            chord_channel: u4::from(0),
            strum_channel: u4::from(1),
            chord_voicing: ChordVoicingStyle::Omnichord,
            strum_voicing: StrumVoicingStyle::Omnichord,
            voicing_modifier: VoicingModifier::None,
            chord_quality_selection: ChordQualitySelectionStyle::default(),
            strum_cc: u7::from(1),
            strum_gate_time: DEFAULT_GATE_TIME,
            strum_cooldown: DEFAULT_COOLDOWN,
            strum_after_release: true,
            latch_button: Some(MidiButton::ControlChange {
                cc: u7::from(102),
                toggle: true,
            }),
            stop_button: Some(MidiButton::ControlChange {
                cc: u7::from(103),
                toggle: false,
            }),
            input_device: None,
            output_device: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Parameters that can change continuously without republishing the snapshot.
#[derive(Debug)]
pub struct RealtimeParams {
    gate_time_ms: AtomicU64,
    cooldown_ms: AtomicU64,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl RealtimeParams {
    fn new(gate_time: Duration, cooldown: Duration) -> RealtimeParams {
        RealtimeParams {
            gate_time_ms: AtomicU64::new(millis(gate_time)),
            cooldown_ms: AtomicU64::new(millis(cooldown)),
        }
    }

    pub fn gate_time(&self) -> Duration {
        Duration::from_millis(self.gate_time_ms.load(Ordering::Relaxed))
    }

    pub fn set_gate_time(&self, gate_time: Duration) {
        self.gate_time_ms.store(millis(gate_time), Ordering::Relaxed);
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms.load(Ordering::Relaxed))
    }

    pub fn set_cooldown(&self, cooldown: Duration) {
        self.cooldown_ms.store(millis(cooldown), Ordering::Relaxed);
    }
}

/// Shared access to the live snapshot and the realtime parameters.
#[derive(Debug)]
pub struct SettingsHandle {
    current: ArcSwap<Settings>,
    realtime: RealtimeParams,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> SettingsHandle {
        let realtime = RealtimeParams::new(settings.strum_gate_time, settings.strum_cooldown);
        SettingsHandle {
            current: ArcSwap::from_pointee(settings),
            realtime,
        }
    }

    /// Returns the live snapshot. Cheap enough to call once per event.
    pub fn load(&self) -> Guard<Arc<Settings>> {
        self.current.load()
    }

    /// Returns an owned reference to the live snapshot.
    pub fn load_full(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    /// Publishes a complete replacement snapshot. The realtime parameters are
    /// reset to the snapshot's values.
    pub fn store(&self, settings: Settings) {
        self.realtime.set_gate_time(settings.strum_gate_time);
        self.realtime.set_cooldown(settings.strum_cooldown);
        self.current.store(Arc::new(settings));
        info!("Published new settings.");
    }

    pub fn realtime(&self) -> &RealtimeParams {
        &self.realtime
    }

    /// Copies the realtime parameters into a fresh snapshot, publishes it and
    /// returns it, so the current values can be persisted.
    pub fn fold_realtime(&self) -> Arc<Settings> {
        let mut settings = Settings::clone(&self.current.load());
        settings.strum_gate_time = self.realtime.gate_time();
        settings.strum_cooldown = self.realtime.cooldown();
        let settings = Arc::new(settings);
        self.current.store(settings.clone());
        settings
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        SettingsHandle::new(Settings::default())
    }
}
