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
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chordstrum::chord::{clamp_note, Chord, ChordQuality};
use chordstrum::config::{self, Document, StyleRegistry};
use chordstrum::midi;
use chordstrum::runner::Runner;
use chordstrum::settings::{Settings, SettingsHandle};
use chordstrum::voicing::{self, ChordFile};
use chordstrum::watcher::ConfigWatcher;
use chordstrum::wizard::Wizard;
use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A MIDI chord and strum transformer."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start will run the transformer against the configured MIDI devices.
    Start {
        /// The path to the config file. Changes to the file are applied live.
        config_path: String,
    },
    /// Verifies a config file.
    Verify {
        /// The path to the config file.
        config_path: String,
    },
    /// Prints the chord and strum voicings the config produces for a chord.
    Voicings {
        /// The path to the config file.
        config_path: String,
        /// The chord quality, e.g. major, minor_7, add_9.
        quality: String,
        /// The root note, 0 to 127.
        root: u8,
    },
    /// Lists the available MIDI input/output devices.
    MidiDevices {},
    /// Prints a config file containing every default setting to stdout.
    DefaultConfig {},
    /// Creates a config file interactively, learning buttons from the controller.
    Wizard {
        /// The path to write the config file to.
        config_path: String,
    },
}

fn load(config_path: &str) -> Result<(Settings, StyleRegistry), Box<dyn Error>> {
    let mut registry = StyleRegistry::default();
    let settings = config::load(&PathBuf::from(config_path), &mut registry)?;
    Ok((settings, registry))
}

fn describe(notes: &[i32]) -> String {
    notes
        .iter()
        .map(|note| clamp_note(*note).to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

fn describe_file(file: &ChordFile) -> String {
    if file.description().is_empty() {
        file.name().to_string()
    } else {
        format!("{} ({})", file.name(), file.description())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config_path } => {
            let (settings, registry) = load(&config_path)?;
            let handle = Arc::new(SettingsHandle::new(settings));

            let mut runner = Runner::start(handle.clone())?;
            let _watcher = ConfigWatcher::new(&PathBuf::from(&config_path), registry, handle)?;

            tokio::signal::ctrl_c().await?;
            info!("Shutting down.");
            runner.stop();
        }
        Commands::Verify { config_path } => {
            let (settings, _) = load(&config_path)?;

            println!("Config {} is valid.", config_path);
            println!("- Chord voicing: {}", settings.chord_voicing.name());
            println!("- Strum voicing: {}", settings.strum_voicing.name());
            println!("- Chord channel: {}", settings.chord_channel.as_int() + 1);
            println!("- Strum channel: {}", settings.strum_channel.as_int() + 1);
        }
        Commands::Voicings {
            config_path,
            quality,
            root,
        } => {
            let (settings, _) = load(&config_path)?;
            let quality = ChordQuality::from_file_key(&quality.to_uppercase())
                .ok_or_else(|| format!("unknown chord quality {}", quality))?;
            if root > 127 {
                return Err(format!("root {} is out of range", root).into());
            }

            let chord = Chord::new(quality, root);
            let chord_notes = settings
                .voicing_modifier
                .voice(&settings.chord_voicing, chord, &[]);
            let strum_notes = settings
                .strum_voicing
                .construct(quality, voicing::anchor(i32::from(root)));

            println!("{} ({})", chord, quality);
            println!("- Chord: {}", describe(&chord_notes));
            println!("- Strum: {}", describe(&strum_notes));
            for (role, file) in [
                ("Chord", settings.chord_voicing.file()),
                ("Strum", settings.strum_voicing.file()),
            ] {
                if let Some(file) = file {
                    println!("- {} file: {}", role, describe_file(file));
                }
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Wizard { config_path } => {
            let names = midi::list_devices()?
                .iter()
                .map(|device| device.name())
                .collect::<Vec<String>>();
            let (sender, receiver) = crossbeam_channel::unbounded();
            let stdin = io::stdin();
            let mut wizard = Wizard::new(stdin.lock(), io::stdout(), receiver);

            let input_name = wizard.select_device("input", &names)?;
            let output_name = wizard.select_device("output", &names)?;
            let device = midi::get_device(&input_name)?;
            device.watch_events(sender)?;
            let settings = wizard.configure(&input_name, &output_name);
            device.stop_watch_events();

            Document::from_settings(&settings?).save(&PathBuf::from(&config_path))?;
            println!("Wrote {}. Start it with: chordstrum start {}", config_path, config_path);
        }
        Commands::DefaultConfig {} => {
            print!(
                "{}",
                serde_yml::to_string(&Document::from_settings(&Settings::default()))?
            );
        }
    }

    Ok(())
}
