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
use std::{fmt, sync::Arc};

use crossbeam_channel::Sender;
use midly::live::LiveEvent;

mod midir;
mod mock;

/// Errors raised by MIDI devices. Device failures are recoverable; callers are
/// expected to retry.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No device found with name {0}")]
    NotFound(String),

    #[error("Found too many devices that match {name} ({matches}), use a less ambiguous device name")]
    Ambiguous { name: String, matches: String },

    #[error("Already watching events on {0}")]
    AlreadyWatching(String),

    #[error("Device {0} has no output port")]
    NoOutput(String),

    #[error("MIDI initialization error: {0}")]
    Init(#[from] ::midir::InitError),

    #[error("MIDI port info error: {0}")]
    PortInfo(#[from] ::midir::PortInfoError),

    #[error("Unable to connect to {name}: {reason}")]
    Connect { name: String, reason: String },

    #[error("MIDI send error: {0}")]
    Send(#[from] ::midir::SendError),

    #[error("Unable to encode MIDI event: {0}")]
    Encode(#[from] std::io::Error),

    #[cfg(test)]
    #[error("Device {0} is not a mock device")]
    NotMock(String),
}

/// A MIDI device that can listen for inputs and emit events.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Watches MIDI input for events and sends the raw bytes to the given sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), DeviceError>;

    /// Stops watching events.
    fn stop_watch_events(&self);

    /// Emits an event.
    fn emit(&self, event: &LiveEvent<'_>) -> Result<(), DeviceError>;

    /// Returns true if the device is still attached to the system.
    fn is_present(&self) -> bool;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, DeviceError>;
}

/// Encodes an event into its wire bytes.
fn encode(event: &LiveEvent<'_>) -> Result<Vec<u8>, DeviceError> {
    let mut buf: Vec<u8> = Vec::with_capacity(8);
    event.write_std(&mut buf)?;
    Ok(buf)
}

/// Lists devices known to midir.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, DeviceError> {
    midir::list()
}

/// Gets a device with the given name. Names starting with `mock` produce a mock
/// device.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, DeviceError> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

#[cfg(test)]
pub mod test {
    pub use super::mock::Device;
}
