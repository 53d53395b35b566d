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
use std::path::{Path, PathBuf};

use crate::voicing::{ChordFileCache, ChordVoicingStyle, StrumVoicingStyle};

use super::error::ConfigError;

pub const CHORD_STYLES: [&str; 5] = [
    "root_position",
    "smoothed_full",
    "omnichord",
    "omni_84",
    "from_file",
];

pub const STRUM_STYLES: [&str; 3] = ["plain_ascending", "omnichord", "from_file"];

/// Resolves style identifiers from configuration documents into voicing styles.
///
/// Relative data file paths resolve against the directory of the document being
/// loaded. Parsed data files are kept until a style names a different path.
#[derive(Default)]
pub struct StyleRegistry {
    base_dir: PathBuf,
    chord_files: ChordFileCache,
    strum_files: ChordFileCache,
}

impl StyleRegistry {
    pub fn new(base_dir: &Path) -> StyleRegistry {
        StyleRegistry {
            base_dir: base_dir.to_path_buf(),
            ..Default::default()
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Sets the directory relative data file paths resolve against.
    pub fn set_base_dir(&mut self, base_dir: &Path) {
        self.base_dir = base_dir.to_path_buf();
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Resolves a chord voicing style.
    pub fn chord_style(
        &mut self,
        name: &str,
        path: Option<&str>,
    ) -> Result<ChordVoicingStyle, ConfigError> {
        Ok(match name {
            "root_position" => ChordVoicingStyle::RootPosition,
            "smoothed_full" => ChordVoicingStyle::SmoothedFull,
            "omnichord" => ChordVoicingStyle::Omnichord,
            "omni_84" => ChordVoicingStyle::Omni84,
            "from_file" => {
                let path = self.resolve(path.ok_or_else(|| ConfigError::MissingField {
                    field: "path",
                    context: String::from("chord_voicing"),
                })?);
                let file = self.chord_files.get(&path)?;
                ChordVoicingStyle::FromFile { path, file }
            }
            _ => {
                return Err(ConfigError::UnknownStyle {
                    role: "chord",
                    name: name.to_string(),
                })
            }
        })
    }

    /// Resolves a strum voicing style.
    pub fn strum_style(
        &mut self,
        name: &str,
        path: Option<&str>,
    ) -> Result<StrumVoicingStyle, ConfigError> {
        Ok(match name {
            "plain_ascending" => StrumVoicingStyle::PlainAscending,
            "omnichord" => StrumVoicingStyle::Omnichord,
            "from_file" => {
                let path = self.resolve(path.ok_or_else(|| ConfigError::MissingField {
                    field: "path",
                    context: String::from("strum_voicing"),
                })?);
                let file = self.strum_files.get(&path)?;
                StrumVoicingStyle::FromFile { path, file }
            }
            _ => {
                return Err(ConfigError::UnknownStyle {
                    role: "strum",
                    name: name.to_string(),
                })
            }
        })
    }
}
