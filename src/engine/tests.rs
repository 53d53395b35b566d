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
use std::{collections::HashSet, error::Error, sync::Arc, time::Duration};

use midly::{
    live::{LiveEvent, SystemCommon, SystemRealtime},
    num::{u4, u7},
    MidiMessage,
};

use super::Engine;
use crate::{
    chord::{Chord, ChordQuality},
    scheduler::TimeBase,
    selection::ChordQualitySelectionStyle,
    settings::{Settings, SettingsHandle},
    voicing::{ChordFile, ChordVoicingStyle, StrumVoicingStyle, VoicingModifier},
};

const CHORD: u8 = 0;
const STRUM: u8 = 1;

fn settings() -> Settings {
    Settings {
        chord_voicing: ChordVoicingStyle::RootPosition,
        strum_voicing: StrumVoicingStyle::PlainAscending,
        voicing_modifier: VoicingModifier::None,
        ..Settings::default()
    }
}

fn engine_with(settings: Settings) -> (Engine, Arc<SettingsHandle>) {
    let handle = Arc::new(SettingsHandle::new(settings));
    (Engine::new(handle.clone(), TimeBase::MILLISECONDS), handle)
}

fn midi(channel: u8, message: MidiMessage) -> LiveEvent<'static> {
    LiveEvent::Midi {
        channel: u4::from(channel),
        message,
    }
}

fn on(channel: u8, key: u8, vel: u8) -> LiveEvent<'static> {
    midi(
        channel,
        MidiMessage::NoteOn {
            key: u7::from(key),
            vel: u7::from(vel),
        },
    )
}

fn off(channel: u8, key: u8) -> LiveEvent<'static> {
    midi(
        channel,
        MidiMessage::NoteOff {
            key: u7::from(key),
            vel: u7::from(0),
        },
    )
}

fn cc(controller: u8, value: u8) -> LiveEvent<'static> {
    midi(
        0,
        MidiMessage::Controller {
            controller: u7::from(controller),
            value: u7::from(value),
        },
    )
}

fn note_on_keys(events: &[LiveEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            LiveEvent::Midi {
                message: MidiMessage::NoteOn { key, .. },
                ..
            } => Some(key.as_int()),
            _ => None,
        })
        .collect()
}

#[test]
fn c_major_root_position() {
    let (mut engine, _) = engine_with(settings());

    let output = engine.handle(on(0, 60, 100), 0);
    assert_eq!(
        vec![on(CHORD, 60, 100), on(CHORD, 64, 100), on(CHORD, 67, 100)],
        output
    );
    assert_eq!(Some(Chord::new(ChordQuality::Major, 60)), engine.current_chord());
    assert_eq!(Some(60), engine.current_root());
    assert_eq!(vec![60, 64, 67], engine.sounding_notes());
}

#[test]
fn chord_output_is_clamped_and_unique() {
    let styles = [
        ChordVoicingStyle::RootPosition,
        ChordVoicingStyle::SmoothedFull,
        ChordVoicingStyle::Omnichord,
        ChordVoicingStyle::Omni84,
    ];
    let modifiers = [
        VoicingModifier::None,
        VoicingModifier::Fixed,
        VoicingModifier::Smooth,
        VoicingModifier::Dynamic,
    ];

    for style in &styles {
        for modifier in modifiers {
            let (mut engine, _) = engine_with(Settings {
                chord_voicing: style.clone(),
                voicing_modifier: modifier,
                chord_quality_selection: ChordQualitySelectionStyle::CcRange { cc: u7::from(20) },
                ..settings()
            });
            for quality in 0..9u8 {
                engine.handle(cc(20, quality * 15), 0);
                for root in 1..128u8 {
                    let output = engine.handle(on(0, root, 90), 0);
                    let keys = note_on_keys(&output);
                    let unique: HashSet<u8> = keys.iter().copied().collect();
                    assert!(!keys.is_empty(), "{:?} {:?} root {}", style, modifier, root);
                    assert_eq!(
                        unique.len(),
                        keys.len(),
                        "duplicate notes {:?} for {:?} {:?} root {}",
                        keys,
                        style,
                        modifier,
                        root
                    );
                    assert!(keys.iter().all(|key| *key <= 127));
                }
            }
        }
    }
}

#[test]
fn high_root_collapses_to_one_note() {
    let (mut engine, _) = engine_with(settings());
    assert_eq!(vec![on(CHORD, 127, 80)], engine.handle(on(0, 127, 80), 0));
    assert_eq!(vec![127], engine.sounding_notes());
}

#[test]
fn new_chord_replaces_old() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);

    let output = engine.handle(on(0, 62, 100), 10);
    assert_eq!(
        vec![
            off(CHORD, 60),
            off(CHORD, 64),
            off(CHORD, 67),
            on(CHORD, 62, 100),
            on(CHORD, 66, 100),
            on(CHORD, 69, 100),
        ],
        output
    );
}

#[test]
fn release_stops_only_the_current_root() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);

    // Releasing another key is absorbed.
    assert!(engine.handle(off(0, 61), 1).is_empty());
    assert_eq!(Some(60), engine.current_root());

    // Note on with velocity zero is a release.
    assert_eq!(
        vec![off(CHORD, 60), off(CHORD, 64), off(CHORD, 67)],
        engine.handle(on(0, 60, 0), 2)
    );
    assert_eq!(None, engine.current_chord());
    assert_eq!(
        Some(Chord::new(ChordQuality::Major, 60)),
        engine.last_played_chord()
    );
}

#[test]
fn stop_is_idempotent() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);

    assert_eq!(
        vec![off(CHORD, 60), off(CHORD, 64), off(CHORD, 67)],
        engine.handle(cc(103, 127), 1)
    );
    assert!(engine.handle(cc(103, 127), 2).is_empty());
    assert!(engine.handle(cc(103, 0), 3).is_empty());
    assert!(engine.sounding_notes().is_empty());
}

#[test]
fn latch_holds_chord_until_stop() {
    let (mut engine, _) = engine_with(settings());

    assert!(engine.handle(cc(102, 127), 0).is_empty());
    assert!(engine.latch());

    assert_eq!(3, engine.handle(on(0, 60, 100), 1).len());
    assert!(engine.handle(off(0, 60), 2).is_empty());
    assert_eq!(vec![60, 64, 67], engine.sounding_notes());

    assert_eq!(
        vec![off(CHORD, 60), off(CHORD, 64), off(CHORD, 67)],
        engine.handle(cc(103, 127), 3)
    );
    // The latch survives a stop.
    assert!(engine.latch());
}

#[test]
fn unlatching_releases_chord() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(cc(102, 127), 0);
    engine.handle(on(0, 60, 100), 1);
    engine.handle(off(0, 60), 2);

    assert_eq!(
        vec![off(CHORD, 60), off(CHORD, 64), off(CHORD, 67)],
        engine.handle(cc(102, 0), 3)
    );
    assert!(!engine.latch());

    // Turning an already disengaged latch off still releases a held chord.
    engine.handle(on(0, 60, 100), 4);
    assert_eq!(
        vec![off(CHORD, 60), off(CHORD, 64), off(CHORD, 67)],
        engine.handle(cc(102, 0), 5)
    );
    assert!(engine.sounding_notes().is_empty());
    assert_eq!(None, engine.current_chord());
}

#[test]
fn latch_off_without_prior_latch_releases_chord() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);
    assert!(!engine.latch());

    assert_eq!(
        vec![off(CHORD, 60), off(CHORD, 64), off(CHORD, 67)],
        engine.handle(cc(102, 0), 1)
    );
    // Nothing left to release.
    assert!(engine.handle(cc(102, 0), 2).is_empty());
}

#[test]
fn note_latch_button_flips() {
    let (mut engine, _) = engine_with(Settings {
        latch_button: Some(crate::button::MidiButton::Note(u7::from(108))),
        ..settings()
    });
    engine.handle(on(0, 108, 100), 0);
    assert!(engine.latch());
    engine.handle(on(0, 108, 100), 1);
    assert!(!engine.latch());
}

#[test]
fn quality_change_applies_to_next_chord() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);

    // Note 1 selects minor by default, without touching the sounding chord.
    assert!(engine.handle(on(0, 1, 100), 1).is_empty());
    assert_eq!(ChordQuality::Minor, engine.enqueued_quality());
    assert_eq!(vec![60, 64, 67], engine.sounding_notes());

    let output = engine.handle(on(0, 62, 100), 2);
    assert_eq!(vec![62, 65, 69], note_on_keys(&output));
}

#[test]
fn cc_range_selects_quality() {
    let (mut engine, _) = engine_with(Settings {
        chord_quality_selection: ChordQualitySelectionStyle::CcRange { cc: u7::from(21) },
        ..settings()
    });
    assert!(engine.handle(cc(21, 30), 0).is_empty());
    assert_eq!(ChordQuality::Dom7, engine.enqueued_quality());

    // Without note selection, note 1 is an ordinary chord key.
    assert_eq!(vec![1, 5, 8, 11], note_on_keys(&engine.handle(on(0, 1, 100), 1)));
}

#[test]
fn strum_zone_and_cooldown() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 60, 90), 0);

    // Zone 0 then zone 12 inside the cooldown: the zone changed, so both trigger.
    assert_eq!(vec![on(STRUM, 48, 90)], engine.handle(cc(1, 0), 100));
    assert_eq!(vec![on(STRUM, 96, 90)], engine.handle(cc(1, 127), 110));
    // Same zone, cooldown not elapsed.
    assert!(engine.handle(cc(1, 127), 120).is_empty());
    // Same zone once the cooldown has elapsed.
    assert_eq!(vec![on(STRUM, 96, 90)], engine.handle(cc(1, 125), 410));
}

#[test]
fn strum_note_off_after_gate() {
    let (mut engine, handle) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);
    engine.handle(cc(1, 35), 1000);
    assert_eq!(1, engine.pending_events());

    assert!(engine.collect_due(1499).is_empty());
    assert_eq!(vec![off(STRUM, 60)], engine.collect_due(1500));

    handle.realtime().set_gate_time(Duration::from_millis(100));
    engine.handle(cc(1, 45), 2000);
    assert_eq!(vec![off(STRUM, 64)], engine.collect_due(2100));
}

#[test]
fn strum_ignores_dead_bands() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);
    assert!(engine.handle(cc(1, 8), 0).is_empty());
    assert!(engine.handle(cc(1, 119), 0).is_empty());
    assert_eq!(0, engine.pending_events());
}

#[test]
fn strum_uses_anchored_root() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(on(0, 38, 100), 0);
    // D in any octave strums from D4.
    assert_eq!(vec![on(STRUM, 62, 100)], engine.handle(cc(1, 30), 0));
}

#[test]
fn strum_after_release() {
    let (mut engine, handle) = engine_with(settings());

    // Nothing has been played yet.
    assert!(engine.handle(cc(1, 0), 0).is_empty());

    engine.handle(on(0, 60, 100), 0);
    engine.handle(off(0, 60), 1);
    assert_eq!(vec![on(STRUM, 48, 100)], engine.handle(cc(1, 0), 2));

    handle.store(Settings {
        strum_after_release: false,
        ..settings()
    });
    assert!(engine.handle(cc(1, 127), 3).is_empty());
}

#[test]
fn short_strum_voicing_claims_without_output() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("short.json");
    std::fs::write(
        &path,
        r#"{"name": "Short", "isOffsetFile": true, "chords": {"MAJOR": {"0": [0, 4, 7]}}}"#,
    )?;
    let file = Arc::new(ChordFile::load(&path)?);
    let (mut engine, _) = engine_with(Settings {
        strum_voicing: StrumVoicingStyle::FromFile { path, file },
        ..settings()
    });
    engine.handle(on(0, 60, 100), 0);

    assert_eq!(vec![on(STRUM, 67, 100)], engine.handle(cc(1, 20), 0));
    assert!(engine.handle(cc(1, 50), 1).is_empty());
    Ok(())
}

#[test]
fn unclaimed_events_pass_through() {
    let (mut engine, _) = engine_with(settings());

    let volume = cc(7, 100);
    assert_eq!(vec![volume], engine.handle(volume, 0));

    let program = midi(
        3,
        MidiMessage::ProgramChange {
            program: u7::from(5),
        },
    );
    assert_eq!(vec![program], engine.handle(program, 0));

    let clock = LiveEvent::Realtime(SystemRealtime::TimingClock);
    assert_eq!(vec![clock], engine.handle(clock, 0));

    let data = [u7::from(0x7e), u7::from(0x01)];
    let sysex = LiveEvent::Common(SystemCommon::SysEx(&data));
    assert_eq!(vec![sysex], engine.handle(sysex, 0));
}

#[test]
fn dynamic_voice_leading() {
    let (mut engine, _) = engine_with(Settings {
        voicing_modifier: VoicingModifier::Dynamic,
        ..settings()
    });

    assert_eq!(vec![60, 64, 67], note_on_keys(&engine.handle(on(0, 60, 100), 0)));
    engine.handle(on(0, 1, 100), 1);
    // D minor led from C major.
    assert_eq!(vec![62, 65, 57], note_on_keys(&engine.handle(on(0, 38, 100), 2)));
}

#[test]
fn reset_releases_everything() {
    let (mut engine, _) = engine_with(settings());
    engine.handle(cc(102, 127), 0);
    engine.handle(on(0, 1, 100), 0);
    engine.handle(on(0, 60, 100), 0);
    engine.handle(cc(1, 0), 0);

    assert_eq!(
        vec![off(CHORD, 60), off(CHORD, 63), off(CHORD, 67), off(STRUM, 48)],
        engine.reset()
    );
    assert_eq!(0, engine.pending_events());
    assert!(!engine.latch());
    assert_eq!(ChordQuality::Major, engine.enqueued_quality());
    assert_eq!(None, engine.last_played_chord());
}

#[test]
fn settings_replacement_applies_to_next_event() {
    let (mut engine, handle) = engine_with(settings());
    engine.handle(on(0, 60, 100), 0);

    handle.store(Settings {
        chord_channel: u4::from(5),
        ..settings()
    });

    // Held notes are released on the channel they were played on.
    assert_eq!(
        vec![
            off(CHORD, 60),
            off(CHORD, 64),
            off(CHORD, 67),
            on(5, 62, 100),
            on(5, 66, 100),
            on(5, 69, 100),
        ],
        engine.handle(on(0, 62, 100), 1)
    );
}
