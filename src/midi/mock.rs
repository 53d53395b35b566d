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
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crossbeam_channel::Sender;
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tracing::debug;

use super::DeviceError;

/// A mock device. Input is injected by tests and output is recorded.
#[derive(Clone)]
pub struct Device {
    name: String,
    present: Arc<AtomicBool>,
    sender: Arc<Mutex<Option<Sender<Vec<u8>>>>>,
    emitted: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            present: Arc::new(AtomicBool::new(true)),
            sender: Arc::new(Mutex::new(None)),
            emitted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[cfg(test)]
    /// Sends the mock event through to the watcher, if any.
    pub fn mock_event(&self, event: &[u8]) {
        if let Some(sender) = self.sender.lock().as_ref() {
            sender.send(event.to_vec()).expect("error sending event");
        }
    }

    #[cfg(test)]
    /// Gets every event emitted so far.
    pub fn emitted(&self) -> Vec<Vec<u8>> {
        self.emitted.lock().clone()
    }

    #[cfg(test)]
    /// Forgets the emitted events.
    pub fn reset_emitted(&self) {
        self.emitted.lock().clear();
    }

    #[cfg(test)]
    /// Simulates the device being unplugged.
    pub fn unplug(&self) {
        self.present.store(false, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub fn is_watching(&self) -> bool {
        self.sender.lock().is_some()
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), DeviceError> {
        let mut current = self.sender.lock();
        if current.is_some() {
            return Err(DeviceError::AlreadyWatching(self.name.clone()));
        }
        *current = Some(sender);
        Ok(())
    }

    fn stop_watch_events(&self) {
        self.sender.lock().take();
    }

    fn emit(&self, event: &LiveEvent<'_>) -> Result<(), DeviceError> {
        if !self.present.load(Ordering::Relaxed) {
            return Err(DeviceError::NotFound(self.name.clone()));
        }
        debug!(device = self.name, event = ?event, "Emitting event (mock).");
        self.emitted.lock().push(super::encode(event)?);
        Ok(())
    }

    fn is_present(&self) -> bool {
        self.present.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, DeviceError> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod test {
    use std::error::Error;

    use midly::{
        live::LiveEvent,
        num::{u4, u7},
        MidiMessage,
    };

    use super::Device;
    use crate::midi::Device as _;

    #[test]
    fn records_emitted_events() -> Result<(), Box<dyn Error>> {
        let device = Device::get("mock-out");
        device.emit(&LiveEvent::Midi {
            channel: u4::from(1),
            message: MidiMessage::NoteOn {
                key: u7::from(60),
                vel: u7::from(100),
            },
        })?;
        assert_eq!(vec![vec![0x91, 60, 100]], device.emitted());

        device.reset_emitted();
        assert!(device.emitted().is_empty());

        device.unplug();
        assert!(!device.is_present());
        assert!(device
            .emit(&LiveEvent::Midi {
                channel: u4::from(1),
                message: MidiMessage::NoteOff {
                    key: u7::from(60),
                    vel: u7::from(0),
                },
            })
            .is_err());
        Ok(())
    }

    #[test]
    fn injects_events_while_watching() -> Result<(), Box<dyn Error>> {
        let device = Device::get("mock-in");
        let (sender, receiver) = crossbeam_channel::unbounded();

        // Nothing is delivered before watching.
        device.mock_event(&[0x90, 60, 100]);
        device.watch_events(sender.clone())?;
        assert!(device.watch_events(sender).is_err());
        device.mock_event(&[0x90, 62, 100]);
        assert_eq!(vec![vec![0x90, 62, 100]], receiver.try_iter().collect::<Vec<_>>());

        device.stop_watch_events();
        assert!(!device.is_watching());
        Ok(())
    }
}
