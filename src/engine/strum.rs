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

//! Quantization of the strum controller into zones.
//!
//! The controller range is split into [`ZONES`] zones separated by dead bands of
//! [`DEAD_BAND`] values, so a finger resting on a boundary does not flicker
//! between two notes. The last zone has no trailing dead band and absorbs the
//! remainder of the range.

/// Number of strum zones.
pub const ZONES: usize = 13;

/// Width of the dead band between adjacent zones.
pub const DEAD_BAND: u8 = 2;

/// Width of each live zone.
pub const ZONE_SIZE: u8 = (128 - (ZONES as u8 - 1) * DEAD_BAND) / ZONES as u8;

/// Distance from the start of one zone to the start of the next.
const UNIT: u8 = ZONE_SIZE + DEAD_BAND;

/// Returns the zone for a controller value, or `None` inside a dead band.
pub fn zone(value: u8) -> Option<usize> {
    let last = ZONES as u8 - 1;
    if value >= last * UNIT {
        return Some(ZONES - 1);
    }
    if value % UNIT < ZONE_SIZE {
        Some(usize::from(value / UNIT))
    } else {
        None
    }
}

/// Debounce state of the strum voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct Debounce {
    last_zone: Option<usize>,
    last_trigger: Option<u64>,
}

impl Debounce {
    /// A zone triggers if it differs from the last one, or if the cooldown has
    /// elapsed since the last trigger.
    pub(super) fn should_trigger(&self, zone: usize, now: u64, cooldown_ticks: u64) -> bool {
        self.last_zone != Some(zone)
            || self
                .last_trigger
                .map_or(true, |last| now.saturating_sub(last) >= cooldown_ticks)
    }

    pub(super) fn record(&mut self, zone: usize, now: u64) {
        self.last_zone = Some(zone);
        self.last_trigger = Some(now);
    }
}
