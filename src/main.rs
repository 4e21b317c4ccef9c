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
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tracing::info;

use tanpura::audio;
use tanpura::config::InstrumentConfig;
use tanpura::controller::{keyboard, Controller};
use tanpura::instrument::Instrument;
use tanpura::pitch::Pitch;
use tanpura::samples::InitOutcome;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A polyphonic keyboard and tanpura."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Loads every pitch sample without touching audio hardware and reports the result.
    Verify {
        /// The path to the instrument config.
        config_path: String,
    },
    /// Plays notes through the configured device.
    Play {
        /// The path to the instrument config.
        config_path: String,
        /// The pitches to play, e.g. C E G.
        #[arg(required = true)]
        pitches: Vec<Pitch>,
        /// The gain to play the notes at. Defaults to the configured default gain.
        #[arg[short, long]]
        gain: Option<f32>,
        /// How long to hold the notes, e.g. 5s or 1500ms.
        #[arg[long, default_value = "5s"]]
        hold: String,
    },
    /// Start will start the instrument, reading commands from the keyboard.
    Start {
        /// The path to the instrument config.
        config_path: String,
    },
}

/// Builds and initializes an instrument from a config file. With `mock` set, the
/// configured device is swapped for an in-memory one.
fn load_instrument(
    config_path: &str,
    mock: bool,
) -> Result<(Instrument, InitOutcome), Box<dyn Error>> {
    let mut config = InstrumentConfig::deserialize(&PathBuf::from(config_path))?;
    if mock {
        let audio = config.audio().with_device("mock-verify");
        config = config.with_audio(audio);
    }
    let playback = audio::get_device(config.audio(), config.max_voices())?;
    let instrument = Instrument::new(&config, Arc::new(config.asset_source()), playback);
    let outcome = instrument.initialize();
    Ok((instrument, outcome))
}

fn print_outcome(outcome: &InitOutcome) {
    if let InitOutcome::Initialized { loaded, failed } = outcome {
        println!("Loaded (count: {}):", loaded.len());
        for pitch in loaded {
            println!("- {}", pitch);
        }
        if !failed.is_empty() {
            println!("\nFailed (count: {}):", failed.len());
            for (pitch, err) in failed {
                println!("- {}: {}", pitch, err);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { config_path } => {
            let (instrument, outcome) =
                load_instrument(&config_path, true)?;
            print_outcome(&outcome);
            instrument.dispose();
        }
        Commands::Play {
            config_path,
            pitches,
            gain,
            hold,
        } => {
            let hold: Duration = DurationString::from_string(hold)?.into();
            let (instrument, outcome) = load_instrument(&config_path, false)?;
            print_outcome(&outcome);

            let gain = gain.unwrap_or_else(|| instrument.default_gain());
            for pitch in pitches {
                let outcome = instrument.play_note(pitch, gain);
                println!("{}: {:?}", pitch, outcome);
            }

            info!(hold = ?hold, "Holding notes");
            tokio::time::sleep(hold).await;
            instrument.stop_all_notes();
            instrument.dispose();
        }
        Commands::Start { config_path } => {
            let (instrument, outcome) = load_instrument(&config_path, false)?;
            print_outcome(&outcome);

            let instrument = Arc::new(instrument);
            let mut controller =
                Controller::new(instrument.clone(), Arc::new(keyboard::Driver::new()))?;
            controller.join().await?;
            instrument.dispose();
        }
    }

    Ok(())
}
