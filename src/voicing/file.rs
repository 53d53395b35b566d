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

//! Precomputed voicings loaded from JSON data files.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Deserialize;
use tracing::{info, warn};

use crate::chord::ChordQuality;

/// Errors produced while reading a voicing data file.
#[derive(Debug, thiserror::Error)]
pub enum ChordFileError {
    #[error("unable to read chord file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("unable to parse chord file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("chord file {path} has unknown chord quality {name}")]
    UnknownQuality { path: PathBuf, name: String },
    #[error("chord file {path} has invalid pitch class {key} for {quality}")]
    InvalidPitchClass {
        path: PathBuf,
        quality: String,
        key: String,
    },
}

/// The on-disk layout of a voicing data file.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawChordFile {
    name: String,
    #[serde(default)]
    description: String,
    is_offset_file: bool,
    chords: HashMap<String, HashMap<String, Vec<i32>>>,
}

/// A parsed voicing data file. Entries are keyed by quality and root pitch class.
#[derive(Debug, PartialEq, Eq)]
pub struct ChordFile {
    name: String,
    description: String,
    is_offset_file: bool,
    chords: HashMap<(ChordQuality, u8), Vec<i32>>,
}

impl ChordFile {
    /// Reads and validates a voicing data file.
    pub fn load(path: &Path) -> Result<ChordFile, ChordFileError> {
        let contents = fs::read_to_string(path).map_err(|source| ChordFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        ChordFile::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<ChordFile, ChordFileError> {
        let raw: RawChordFile =
            serde_json::from_str(contents).map_err(|source| ChordFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let mut chords = HashMap::new();
        for (name, by_root) in raw.chords {
            let quality = ChordQuality::from_file_key(&name).ok_or_else(|| {
                ChordFileError::UnknownQuality {
                    path: path.to_path_buf(),
                    name: name.clone(),
                }
            })?;
            for (key, notes) in by_root {
                let pitch_class = key
                    .parse::<u8>()
                    .ok()
                    .filter(|pc| *pc < 12)
                    .ok_or_else(|| ChordFileError::InvalidPitchClass {
                        path: path.to_path_buf(),
                        quality: name.clone(),
                        key: key.clone(),
                    })?;
                chords.insert((quality, pitch_class), notes);
            }
        }

        Ok(ChordFile {
            name: raw.name,
            description: raw.description,
            is_offset_file: raw.is_offset_file,
            chords,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the voicing for the chord, or an empty voicing if the file has no entry.
    pub fn construct(&self, quality: ChordQuality, root: i32) -> Vec<i32> {
        let pitch_class = root.rem_euclid(12) as u8;
        match self.chords.get(&(quality, pitch_class)) {
            Some(notes) if self.is_offset_file => {
                notes.iter().map(|offset| root + offset).collect()
            }
            Some(notes) => notes.clone(),
            None => {
                warn!(
                    file = self.name,
                    quality = %quality,
                    pitch_class,
                    "Chord file has no voicing for chord."
                );
                Vec::new()
            }
        }
    }
}

/// Caches the most recently parsed file so republishing settings with an
/// unchanged path does not reread it.
#[derive(Default)]
pub struct ChordFileCache {
    cached: Option<(PathBuf, Arc<ChordFile>)>,
}

impl ChordFileCache {
    /// Returns the parsed file at the path, reading it only if the path changed.
    pub fn get(&mut self, path: &Path) -> Result<Arc<ChordFile>, ChordFileError> {
        if let Some((cached_path, file)) = &self.cached {
            if cached_path == path {
                return Ok(file.clone());
            }
        }

        let file = Arc::new(ChordFile::load(path)?);
        info!(path = %path.display(), name = file.name(), "Loaded chord file.");
        self.cached = Some((path.to_path_buf(), file.clone()));
        Ok(file)
    }
}
