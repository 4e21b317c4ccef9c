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

//! The instrument: a sample bank and voice mixer bound to an asset source and a playback
//! backend, behind a single lock.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, span, Level};

use crate::assets::AssetSource;
use crate::audio::Playback;
use crate::config::InstrumentConfig;
use crate::pitch::Pitch;
use crate::samples::{EffectParams, InitOutcome, Outcome, PlayOutcome, SampleBank, VoiceMixer};

/// A sounding note as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceState {
    pub pitch: Pitch,
    pub gain: f32,
}

/// A snapshot of the instrument's observable state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InstrumentState {
    /// Sounding notes in chromatic order.
    pub voices: Vec<VoiceState>,
    pub effects: EffectParams,
    pub master_gain: f32,
    /// Pitches with a playable sample.
    pub loaded: Vec<Pitch>,
}

impl fmt::Display for InstrumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let voices = self
            .voices
            .iter()
            .map(|voice| format!("{}@{:.2}", voice.pitch, voice.gain))
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            f,
            "voices=[{}] bass={} treble={} reverb={} echo={} master={:.2} loaded={}",
            voices,
            self.effects.bass(),
            self.effects.treble(),
            self.effects.reverb_mix(),
            self.effects.echo_mix(),
            self.master_gain,
            self.loaded.len()
        )
    }
}

struct State {
    bank: SampleBank,
    mixer: VoiceMixer,
    subscribers: Vec<Sender<InstrumentState>>,
}

impl State {
    fn snapshot(&self) -> InstrumentState {
        InstrumentState {
            voices: self
                .mixer
                .voices()
                .map(|voice| VoiceState {
                    pitch: voice.pitch(),
                    gain: voice.gain(),
                })
                .collect(),
            effects: self.mixer.effects(),
            master_gain: self.mixer.master_gain(),
            loaded: self.bank.loaded_pitches(),
        }
    }

    /// Sends the current snapshot to every subscriber, dropping the ones that went away.
    fn notify(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }
}

/// The note playback engine. All operations are serialized through one lock, so concurrent
/// callers sharing an `Arc<Instrument>` can't exceed the voice limit.
pub struct Instrument {
    assets: Arc<dyn AssetSource>,
    playback: Arc<dyn Playback>,
    default_gain: f32,
    state: Mutex<State>,
}

impl Instrument {
    /// Creates an uninitialized instrument. No samples are loaded until `initialize`.
    pub fn new(
        config: &InstrumentConfig,
        assets: Arc<dyn AssetSource>,
        playback: Arc<dyn Playback>,
    ) -> Instrument {
        Instrument {
            assets,
            playback,
            default_gain: config.default_gain(),
            state: Mutex::new(State {
                bank: SampleBank::new(),
                mixer: VoiceMixer::new(config.max_voices(), config.retrigger(), config.looping()),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Loads the sample bank. Calling again after a successful load does nothing.
    pub fn initialize(&self) -> InitOutcome {
        let span = span!(Level::INFO, "initialize", device = %self.playback);
        let _enter = span.enter();

        let mut state = self.state.lock();
        let outcome = state
            .bank
            .initialize(self.assets.as_ref(), self.playback.as_ref());
        if matches!(outcome, InitOutcome::Initialized { .. }) {
            let gain = state.mixer.master_gain();
            self.playback.set_master_gain(gain);
            state.notify();
        }
        outcome
    }

    /// Starts sounding a pitch.
    pub fn play_note(&self, pitch: Pitch, gain: f32) -> PlayOutcome {
        let mut state = self.state.lock();
        let state = &mut *state;
        let was_sounding = state.mixer.is_sounding(pitch);
        let outcome = state
            .mixer
            .play_note(&state.bank, self.playback.as_ref(), pitch, gain);
        // A failed restart leaves the pitch silent.
        if outcome.is_sounding() || was_sounding != state.mixer.is_sounding(pitch) {
            state.notify();
        }
        outcome
    }

    /// Changes a sounding pitch's gain.
    pub fn update_volume(&self, pitch: Pitch, gain: f32) -> Outcome {
        let mut state = self.state.lock();
        let outcome = state
            .mixer
            .update_volume(self.playback.as_ref(), pitch, gain);
        if outcome == Outcome::Applied {
            state.notify();
        }
        outcome
    }

    /// Stops a sounding pitch.
    pub fn stop_note(&self, pitch: Pitch) -> Outcome {
        let mut state = self.state.lock();
        let outcome = state.mixer.stop_note(self.playback.as_ref(), pitch);
        if outcome == Outcome::Applied {
            state.notify();
        }
        outcome
    }

    /// Stops every sounding pitch. Returns how many were stopped.
    pub fn stop_all_notes(&self) -> usize {
        let mut state = self.state.lock();
        let stopped = state.mixer.stop_all_notes(self.playback.as_ref());
        if stopped > 0 {
            state.notify();
        }
        stopped
    }

    /// Replaces the tone/effect snapshot.
    pub fn update_effects(&self, params: EffectParams) {
        let mut state = self.state.lock();
        state.mixer.update_effects(params);
        state.notify();
    }

    /// Sets the output level.
    pub fn set_master_gain(&self, gain: f32) {
        let mut state = self.state.lock();
        state.mixer.set_master_gain(self.playback.as_ref(), gain);
        state.notify();
    }

    /// Returns the current state.
    pub fn snapshot(&self) -> InstrumentState {
        self.state.lock().snapshot()
    }

    /// Returns a channel receiving a snapshot after every state change.
    pub fn subscribe(&self) -> Receiver<InstrumentState> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.state.lock().subscribers.push(tx);
        debug!("Added state subscriber");
        rx
    }

    /// Stops all notes and unloads the bank. The instrument can be initialized again.
    pub fn dispose(&self) {
        let mut state = self.state.lock();
        let stopped = state.mixer.stop_all_notes(self.playback.as_ref());
        state.bank.clear(self.playback.as_ref());
        info!(stopped, "Instrument disposed");
        state.notify();
    }

    /// Gain used when a caller doesn't give one.
    pub fn default_gain(&self) -> f32 {
        self.default_gain
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().bank.is_initialized()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instrument ({})", self.playback)
    }
}
