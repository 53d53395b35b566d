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

//! The standalone polling loop.
//!
//! Raw input from the input device is queued on a channel by the device's own
//! callback thread. A single polling thread drains the queue, runs the engine on
//! a millisecond clock, emits due scheduled events and sleeps for the configured
//! poll interval.

use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};
use midly::live::LiveEvent;
use parking_lot::Mutex;
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{debug, info, span, warn, Level};

use crate::{
    engine::Engine,
    midi::{self, Device},
    scheduler::TimeBase,
    settings::{Settings, SettingsHandle},
};

/// How often the polling thread checks that its devices are still attached.
const DEVICE_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait before trying to connect a missing device again.
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// How long `stop` waits for the polling thread.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default priority for the polling thread when CHORDSTRUM_THREAD_PRIORITY is unset.
const DEFAULT_THREAD_PRIORITY: u8 = 60;

/// Reads CHORDSTRUM_THREAD_PRIORITY (0-99).
fn polling_thread_priority() -> ThreadPriority {
    std::env::var("CHORDSTRUM_THREAD_PRIORITY")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .filter(|n| *n < 100)
        .or(Some(DEFAULT_THREAD_PRIORITY))
        .and_then(|n| ThreadPriorityValue::try_from(n).ok())
        .map(ThreadPriority::Crossplatform)
        .unwrap_or(ThreadPriority::Max)
}

/// A configured device and its connection, if any.
#[derive(Default)]
struct Slot {
    configured: Option<String>,
    device: Option<Arc<dyn Device>>,
    retry_at: Option<Instant>,
}

impl Slot {
    fn detach(&mut self) {
        if let Some(device) = self.device.take() {
            device.stop_watch_events();
        }
    }

    /// Brings the connection in line with the configured name. `attach` runs on
    /// every newly connected device.
    fn sync<F>(&mut self, role: &'static str, wanted: &Option<String>, now: Instant, attach: F)
    where
        F: FnOnce(&dyn Device) -> Result<(), midi::DeviceError>,
    {
        if self.configured != *wanted {
            self.detach();
            self.configured = wanted.clone();
            self.retry_at = None;
        }

        if let Some(device) = &self.device {
            if device.is_present() {
                return;
            }
            warn!(role, device = device.name(), "MIDI device disappeared.");
            self.detach();
        }

        let Some(name) = &self.configured else {
            return;
        };
        if self.retry_at.is_some_and(|retry_at| now < retry_at) {
            return;
        }

        let connected = midi::get_device(name).and_then(|device| {
            attach(device.as_ref())?;
            Ok(device)
        });
        match connected {
            Ok(device) => {
                info!(role, device = %device, "Connected MIDI device.");
                self.device = Some(device);
                self.retry_at = None;
            }
            Err(e) => {
                warn!(
                    role,
                    name,
                    err = %e,
                    retry_in = ?RETRY_BACKOFF,
                    "Unable to connect MIDI device."
                );
                self.retry_at = Some(now + RETRY_BACKOFF);
            }
        }
    }
}

/// The device handles shared between the polling thread and its owner.
struct Devices {
    sender: Sender<Vec<u8>>,
    input: Mutex<Slot>,
    output: Mutex<Slot>,
}

impl Devices {
    fn check(&self, settings: &Settings) {
        let now = Instant::now();
        self.input
            .lock()
            .sync("input", &settings.input_device, now, |device| {
                device.watch_events(self.sender.clone())
            });
        self.output
            .lock()
            .sync("output", &settings.output_device, now, |_| Ok(()));
    }

    /// Emits the events. Without an output device the events are dropped.
    fn emit(&self, events: &[LiveEvent<'_>]) {
        if events.is_empty() {
            return;
        }

        let mut output = self.output.lock();
        let Some(device) = output.device.clone() else {
            debug!(count = events.len(), "No output device, dropping events.");
            return;
        };
        for event in events {
            if let Err(e) = device.emit(event) {
                warn!(device = device.name(), err = %e, "Unable to emit event, disconnecting.");
                output.detach();
                return;
            }
        }
    }

    fn disconnect(&self) {
        self.input.lock().detach();
        self.output.lock().detach();
    }
}

/// Runs the engine against the configured devices on a dedicated thread.
pub struct Runner {
    settings: Arc<SettingsHandle>,
    devices: Arc<Devices>,
    running: Arc<AtomicBool>,
    done: Receiver<()>,
    join_handle: Option<JoinHandle<()>>,
}

impl Runner {
    /// Connects the configured devices and starts the polling thread. Devices
    /// that can't be connected yet are retried in the background.
    pub fn start(settings: Arc<SettingsHandle>) -> Result<Runner, io::Error> {
        let span = span!(Level::INFO, "start runner");
        let _enter = span.enter();

        let (sender, receiver) = crossbeam_channel::unbounded();
        let devices = Arc::new(Devices {
            sender,
            input: Mutex::new(Slot::default()),
            output: Mutex::new(Slot::default()),
        });
        devices.check(&settings.load());

        let running = Arc::new(AtomicBool::new(true));
        let (done_sender, done) = crossbeam_channel::bounded(1);
        let join_handle = {
            let settings = settings.clone();
            let devices = devices.clone();
            let running = running.clone();
            thread::Builder::new()
                .name(String::from("chordstrum-poll"))
                .spawn(move || {
                    Runner::poll(settings, devices, running, receiver);
                    let _ = done_sender.send(());
                })?
        };

        info!("Runner started.");
        Ok(Runner {
            settings,
            devices,
            running,
            done,
            join_handle: Some(join_handle),
        })
    }

    fn poll(
        settings: Arc<SettingsHandle>,
        devices: Arc<Devices>,
        running: Arc<AtomicBool>,
        receiver: Receiver<Vec<u8>>,
    ) {
        if let Err(e) = set_current_thread_priority(polling_thread_priority()) {
            debug!(err = ?e, "Unable to raise polling thread priority.");
        }

        let mut engine = Engine::new(settings.clone(), TimeBase::MILLISECONDS);
        let start = Instant::now();
        let mut next_check = start + DEVICE_CHECK_INTERVAL;

        while running.load(Ordering::Relaxed) {
            let now = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            for raw in receiver.try_iter() {
                match LiveEvent::parse(&raw) {
                    Ok(event) => {
                        debug!(event = ?event, "Received MIDI event.");
                        devices.emit(&engine.handle(event, now));
                    }
                    Err(e) => debug!(err = ?e, bytes = ?raw, "Dropping unparseable MIDI input."),
                }
            }
            devices.emit(&engine.collect_due(now));

            if Instant::now() >= next_check {
                devices.check(&settings.load());
                next_check = Instant::now() + DEVICE_CHECK_INTERVAL;
            }

            spin_sleep::sleep(settings.load().poll_interval);
        }

        devices.emit(&engine.reset());
    }

    /// Checks device presence immediately, reconnecting anything missing.
    pub fn check_devices(&self) {
        self.devices.check(&self.settings.load());
    }

    /// The connected input device.
    pub fn input_device(&self) -> Option<Arc<dyn Device>> {
        self.devices.input.lock().device.clone()
    }

    /// The connected output device.
    pub fn output_device(&self) -> Option<Arc<dyn Device>> {
        self.devices.output.lock().device.clone()
    }

    /// Stops the polling thread, releasing any sounding notes, and disconnects the
    /// devices. Safe to call more than once.
    pub fn stop(&mut self) {
        let Some(join_handle) = self.join_handle.take() else {
            return;
        };

        self.running.store(false, Ordering::Relaxed);
        match self.done.recv_timeout(STOP_TIMEOUT) {
            Ok(()) => {
                if join_handle.join().is_err() {
                    warn!("Polling thread panicked.");
                }
            }
            Err(_) => warn!(timeout = ?STOP_TIMEOUT, "Polling thread did not stop in time."),
        }
        self.devices.disconnect();
        info!("Runner stopped.");
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.stop();
    }
}
