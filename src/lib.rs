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

//! chordstrum turns a single-note performance controller into an Omnichord style
//! instrument: notes select chords on one voice while a controller strums the
//! current chord across a plate of zones on a second voice.

pub mod button;
pub mod chord;
pub mod config;
pub mod engine;
pub mod midi;
pub mod runner;
pub mod scheduler;
pub mod selection;
pub mod settings;
pub mod voicing;
pub mod watcher;
pub mod wizard;

#[cfg(test)]
mod testutil;
