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
use std::{collections::HashMap, fmt, mem};

#[cfg(test)]
use std::sync::Arc;

use crossbeam_channel::Sender;
use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tracing::{debug, error, info, span, warn, Level};

use super::DeviceError;

pub struct Device {
    name: String,
    input_port: Option<MidiInputPort>,
    output_port: Option<MidiOutputPort>,
    event_connection: Mutex<Option<MidiInputConnection<()>>>,
    output_connection: Mutex<Option<MidiOutputConnection>>,
}

impl Device {
    fn new(name: String) -> Device {
        Device {
            name,
            input_port: None,
            output_port: None,
            event_connection: Mutex::new(None),
            output_connection: Mutex::new(None),
        }
    }

    /// Opens the output connection.
    fn connect_output(&self) -> Result<MidiOutputConnection, DeviceError> {
        let output_port = self
            .output_port
            .as_ref()
            .ok_or_else(|| DeviceError::NoOutput(self.name.clone()))?;
        let output = MidiOutput::new("chordstrum output")?;
        info!(device = self.name, "Connecting MIDI output.");
        output
            .connect(output_port, "chordstrum output")
            .map_err(|e| DeviceError::Connect {
                name: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), DeviceError> {
        let span = span!(Level::INFO, "watch events (midir)");
        let _enter = span.enter();

        let mut event_connection = self.event_connection.lock();
        if event_connection.is_some() {
            return Err(DeviceError::AlreadyWatching(self.name.clone()));
        }

        let input_port = match self.input_port.as_ref() {
            Some(input_port) => input_port,
            None => {
                warn!(
                    device = self.name,
                    "No MIDI input port on device, cannot listen for events."
                );
                return Ok(());
            }
        };

        info!(device = self.name, "Watching MIDI events.");
        let input = MidiInput::new("chordstrum input")?;
        *event_connection = Some(
            input
                .connect(
                    input_port,
                    "chordstrum input watcher",
                    move |_, raw_event, _| {
                        if let Err(e) = sender.send(Vec::from(raw_event)) {
                            error!(err = %e, "Error sending MIDI event to receiver.");
                        }
                    },
                    (),
                )
                .map_err(|e| DeviceError::Connect {
                    name: self.name.clone(),
                    reason: e.to_string(),
                })?,
        );

        Ok(())
    }

    fn stop_watch_events(&self) {
        // Explicitly drop the connection.
        let event_connection = self.event_connection.lock().take();
        mem::drop(event_connection);
    }

    fn emit(&self, event: &LiveEvent<'_>) -> Result<(), DeviceError> {
        let buf = super::encode(event)?;
        debug!(device = self.name, event = ?event, "Emitting event.");

        let mut output_connection = self.output_connection.lock();
        if output_connection.is_none() {
            *output_connection = Some(self.connect_output()?);
        }
        let Some(connection) = output_connection.as_mut() else {
            return Err(DeviceError::NoOutput(self.name.clone()));
        };
        if let Err(e) = connection.send(&buf) {
            // Reconnect on the next emit.
            *output_connection = None;
            return Err(e.into());
        }
        Ok(())
    }

    fn is_present(&self) -> bool {
        match list_midir_devices() {
            Ok(devices) => devices.iter().any(|device| device.name == self.name),
            Err(e) => {
                warn!(err = %e, "Unable to list MIDI devices.");
                false
            }
        }
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<super::mock::Device>, DeviceError> {
        Err(DeviceError::NotMock(self.name.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut capabilities: Vec<String> = Vec::new();
        if self.input_port.is_some() {
            capabilities.push(String::from("Input"));
        }
        if self.output_port.is_some() {
            capabilities.push(String::from("Output"));
        }

        write!(f, "{} ({})", self.name, capabilities.join("/"))
    }
}

/// Lists midir devices and produces the Device trait.
pub fn list() -> Result<Vec<Box<dyn super::Device>>, DeviceError> {
    Ok(list_midir_devices()?
        .into_iter()
        .map(|device| {
            let device: Box<dyn super::Device> = Box::new(device);
            device
        })
        .collect())
}

/// Lists midir devices, merging input and output ports that share a name.
fn list_midir_devices() -> Result<Vec<Device>, DeviceError> {
    let input = MidiInput::new("chordstrum input listing")?;
    let output = MidiOutput::new("chordstrum output listing")?;

    let mut devices: HashMap<String, Device> = HashMap::new();

    for port in input.ports() {
        let name = input.port_name(&port)?;
        devices
            .entry(name.clone())
            .or_insert_with(|| Device::new(name))
            .input_port
            .get_or_insert(port);
    }

    for port in output.ports() {
        let name = output.port_name(&port)?;
        devices
            .entry(name.clone())
            .or_insert_with(|| Device::new(name))
            .output_port
            .get_or_insert(port);
    }

    let mut sorted_devices = devices.into_values().collect::<Vec<Device>>();
    sorted_devices.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sorted_devices)
}

/// Gets the midir device whose name contains the given name.
pub fn get(name: &str) -> Result<Device, DeviceError> {
    let mut matches = list_midir_devices()?
        .into_iter()
        .filter(|device| device.name.contains(name))
        .collect::<Vec<Device>>();

    if matches.len() > 1 {
        return Err(DeviceError::Ambiguous {
            name: name.to_string(),
            matches: matches
                .iter()
                .map(|device| device.name.clone())
                .collect::<Vec<String>>()
                .join(", "),
        });
    }

    matches
        .pop()
        .ok_or_else(|| DeviceError::NotFound(name.to_string()))
}
