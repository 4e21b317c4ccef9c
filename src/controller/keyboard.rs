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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::pitch::Pitch;
use crate::samples::EffectParams;

const PLAY: &str = "play";
const STOP: &str = "stop";
const VOLUME: &str = "volume";
const STOP_ALL: &str = "stopall";
const EFFECTS: &str = "effects";
const MASTER: &str = "master";
const STATUS: &str = "status";
const QUIT: &str = "quit";

/// A controller that drives the instrument from typed commands.
pub struct Driver {}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a single command line into an event.
pub fn parse_command(input: &str) -> Result<Event, String> {
    let mut words = input.split_whitespace();
    let command = words.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = words.collect();

    let event = match (command.as_str(), args.as_slice()) {
        (PLAY, [pitch]) => Event::Play {
            pitch: parse_pitch(pitch)?,
            gain: None,
        },
        (PLAY, [pitch, gain]) => Event::Play {
            pitch: parse_pitch(pitch)?,
            gain: Some(parse_number(gain)?),
        },
        (STOP, [pitch]) => Event::Stop(parse_pitch(pitch)?),
        (VOLUME, [pitch, gain]) => Event::Volume {
            pitch: parse_pitch(pitch)?,
            gain: parse_number(gain)?,
        },
        (STOP_ALL, []) => Event::StopAll,
        (EFFECTS, [bass, treble, reverb, echo]) => Event::Effects(EffectParams::new(
            parse_number(bass)?,
            parse_number(treble)?,
            parse_number(reverb)?,
            parse_number(echo)?,
        )),
        (MASTER, [gain]) => Event::Master(parse_number(gain)?),
        (STATUS, []) => Event::Status,
        (QUIT, []) => Event::Quit,
        _ => return Err(format!("unrecognized command '{}'", input.trim())),
    };
    Ok(event)
}

fn parse_pitch(value: &str) -> Result<Pitch, String> {
    value.parse::<Pitch>().map_err(|e| e.to_string())
}

fn parse_number(value: &str) -> Result<f32, String> {
    value
        .parse::<f32>()
        .map_err(|e| format!("invalid number '{}': {}", value, e))
}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Reads one command. Returns false once input is exhausted or the user quit.
    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <pitch> [gain], {} <pitch>, {} <pitch> <gain>, {}, {} <bass> <treble> <reverb> <echo>, {} <gain>, {}, {}): ",
            PLAY, STOP, VOLUME, STOP_ALL, EFFECTS, MASTER, STATUS, QUIT,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            events_tx
                .blocking_send(Event::Quit)
                .map_err(io::Error::other)?;
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match parse_command(&input) {
            Ok(event) => {
                let keep_going = event != Event::Quit;
                events_tx.blocking_send(event).map_err(io::Error::other)?;
                Ok(keep_going)
            }
            Err(e) => {
                warn!(input = input.trim(), err = e, "Unrecognized input");
                Ok(true)
            }
        }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}
