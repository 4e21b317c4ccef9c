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
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, error, info, span, Level};

use crate::instrument::Instrument;
use crate::pitch::Pitch;
use crate::samples::EffectParams;

pub mod keyboard;

/// Controller events that will trigger behavior in the instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Starts sounding a pitch. Without a gain, the configured default gain is used.
    Play { pitch: Pitch, gain: Option<f32> },

    /// Stops a sounding pitch. If the pitch is silent, does nothing.
    Stop(Pitch),

    /// Changes the gain of a sounding pitch. If the pitch is silent, does nothing.
    Volume { pitch: Pitch, gain: f32 },

    /// Stops every sounding pitch.
    StopAll,

    /// Replaces the tone/effect settings.
    Effects(EffectParams),

    /// Sets the output level.
    Master(f32),

    /// Prints the instrument's current state.
    Status,

    /// Stops all notes and ends the controller.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls an instrument.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(
        instrument: Arc<Instrument>,
        driver: Arc<dyn Driver>,
    ) -> Result<Controller, Box<dyn Error>> {
        Ok(Controller {
            handle: tokio::spawn(
                async move { Controller::trigger_events(instrument, driver).await },
            ),
        })
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers instrument events by watching the driver and getting events from it.
    async fn trigger_events(instrument: Arc<Instrument>, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(instrument = %instrument, "Controller started.");

        while let Some(event) = events_rx.recv().await {
            debug!(event = ?event, "Received event.");
            if !Controller::apply(&instrument, event) {
                break;
            }
        }

        info!("Controller closing.");
        instrument.stop_all_notes();
        drop(events_rx);
        match join_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(err = %e, "Event monitor failed"),
            Err(e) => error!("Error waiting for event monitor to stop: {}", e),
        }
    }

    /// Applies one event. Returns false when the controller should stop.
    fn apply(instrument: &Instrument, event: Event) -> bool {
        match event {
            Event::Play { pitch, gain } => {
                let gain = gain.unwrap_or_else(|| instrument.default_gain());
                let outcome = instrument.play_note(pitch, gain);
                info!(%pitch, gain, ?outcome, "Play");
            }
            Event::Stop(pitch) => {
                let outcome = instrument.stop_note(pitch);
                info!(%pitch, ?outcome, "Stop");
            }
            Event::Volume { pitch, gain } => {
                let outcome = instrument.update_volume(pitch, gain);
                info!(%pitch, gain, ?outcome, "Volume");
            }
            Event::StopAll => {
                let stopped = instrument.stop_all_notes();
                info!(stopped, "Stop all");
            }
            Event::Effects(params) => {
                instrument.update_effects(params);
                info!(?params, "Effects");
            }
            Event::Master(gain) => {
                instrument.set_master_gain(gain);
                info!(gain, "Master gain");
            }
            Event::Status => println!("{}", instrument.snapshot()),
            Event::Quit => return false,
        }
        true
    }
}
