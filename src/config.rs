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
use std::{fs, path::Path, sync::Arc};

use config::{Config, File};
use tracing::{info, span, Level};

use crate::settings::{Settings, SettingsHandle};

mod document;
mod error;
mod registry;

pub use document::Document;
pub use error::ConfigError;
pub use registry::{StyleRegistry, CHORD_STYLES, STRUM_STYLES};

impl Document {
    /// Deserializes a file from the path into a document.
    pub fn deserialize(path: &Path) -> Result<Document, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Document>()?)
    }

    /// Serializes the document and saves it to the path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let serialized = serde_yml::to_string(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }
}

/// Loads settings from the file. Relative data file paths in the document resolve
/// against the file's directory.
pub fn load(path: &Path, registry: &mut StyleRegistry) -> Result<Settings, ConfigError> {
    let span = span!(Level::INFO, "load config");
    let _enter = span.enter();

    let document = Document::deserialize(path)?;
    let previous = registry.base_dir().to_path_buf();
    if let Some(dir) = path.parent() {
        registry.set_base_dir(dir);
    }
    let settings = match document.to_settings(registry) {
        Ok(settings) => settings,
        Err(e) => {
            registry.set_base_dir(&previous);
            return Err(e);
        }
    };
    info!(
        path = %path.display(),
        chord_voicing = settings.chord_voicing.name(),
        strum_voicing = settings.strum_voicing.name(),
        "Loaded config."
    );
    Ok(settings)
}

/// Loads settings from the file and publishes them. On failure the live
/// snapshot is left untouched.
pub fn load_into(
    path: &Path,
    registry: &mut StyleRegistry,
    handle: &SettingsHandle,
) -> Result<(), ConfigError> {
    let settings = load(path, registry)?;
    handle.store(settings);
    Ok(())
}

/// Saves the settings to the file, including realtime parameter changes that
/// have not been published yet.
pub fn save(handle: &SettingsHandle, path: &Path) -> Result<Arc<Settings>, ConfigError> {
    let settings = handle.fold_realtime();
    Document::from_settings(&settings).save(path)?;
    info!(path = %path.display(), "Saved config.");
    Ok(settings)
}
