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

//! Hot reload of the configuration file.

use std::{error::Error, path::Path, sync::Arc, time::Duration};

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, error, info, warn};

use crate::{
    config::{self, StyleRegistry},
    settings::SettingsHandle,
};

/// How long the file must be quiet before it is reloaded.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches a configuration file and republishes the settings whenever it changes.
/// A file that fails to load is reported and the previous settings stay live.
pub struct ConfigWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl ConfigWatcher {
    /// Starts watching. The watch ends when the returned value is dropped.
    pub fn new(
        path: &Path,
        mut registry: StyleRegistry,
        handle: Arc<SettingsHandle>,
    ) -> Result<ConfigWatcher, Box<dyn Error>> {
        let path = path.canonicalize()?;
        let dir = path
            .parent()
            .ok_or_else(|| format!("config file {} has no parent directory", path.display()))?
            .to_path_buf();

        let watched = path.clone();
        let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
            let events = match result {
                Ok(events) => events,
                Err(e) => {
                    error!(err = %e, "Error watching config file.");
                    return;
                }
            };
            // Editors often replace the file, so the directory is watched and
            // events for other files are ignored.
            if !events.iter().any(|event| event.path == watched) {
                return;
            }

            debug!(path = %watched.display(), "Config file changed.");
            match config::load_into(&watched, &mut registry, &handle) {
                Ok(()) => info!(path = %watched.display(), "Reloaded config."),
                Err(e) => warn!(
                    path = %watched.display(),
                    err = %e,
                    "Unable to reload config, keeping previous settings."
                ),
            }
        })?;
        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)?;

        info!(path = %path.display(), "Watching config file.");
        Ok(ConfigWatcher {
            _debouncer: debouncer,
        })
    }
}
