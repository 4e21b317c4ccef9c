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

//! Polyphonic note control on top of the sample bank and the playback backend.

use tracing::{debug, info, warn};

use super::bank::SampleBank;
use super::effects::{clamp_gain, EffectParams};
use super::voice::{Voice, VoiceManager};
use crate::audio::{PlayParams, Playback};
use crate::config::RetriggerBehavior;
use crate::pitch::Pitch;

/// The result of a play request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A new voice started.
    Started,
    /// The sounding voice was stopped and started again.
    Restarted,
    /// The pitch was already sounding and the request was ignored.
    AlreadySounding,
    /// Every voice slot is in use.
    DroppedCapacity,
    /// The bank has no sample for the pitch.
    DroppedNoSample,
    /// The backend refused to start the stream.
    DroppedPlayback,
}

impl PlayOutcome {
    /// Returns true if a voice is sounding the requested pitch at the requested gain.
    pub fn is_sounding(self) -> bool {
        matches!(self, PlayOutcome::Started | PlayOutcome::Restarted)
    }
}

/// The result of an operation on a single sounding pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The pitch wasn't sounding.
    NoOp,
}

/// Maps pitches to voices, enforces the polyphony limit and stores the global tone and
/// master settings.
#[derive(Debug)]
pub struct VoiceMixer {
    voices: VoiceManager,
    effects: EffectParams,
    master_gain: f32,
    retrigger: RetriggerBehavior,
    looping: bool,
}

impl VoiceMixer {
    pub fn new(max_voices: usize, retrigger: RetriggerBehavior, looping: bool) -> Self {
        Self {
            voices: VoiceManager::new(max_voices),
            effects: EffectParams::default(),
            master_gain: 1.0,
            retrigger,
            looping,
        }
    }

    /// Starts sounding a pitch at the given gain.
    pub fn play_note(
        &mut self,
        bank: &SampleBank,
        playback: &dyn Playback,
        pitch: Pitch,
        gain: f32,
    ) -> PlayOutcome {
        let gain = clamp_gain(gain);

        let restarting = match (self.voices.get(pitch), self.retrigger) {
            (Some(_), RetriggerBehavior::Ignore) => {
                debug!(%pitch, "Note already sounding, ignoring");
                return PlayOutcome::AlreadySounding;
            }
            (Some(_), RetriggerBehavior::Restart) => true,
            (None, _) => false,
        };

        if !restarting && self.voices.is_full() {
            debug!(
                %pitch,
                max_voices = self.voices.max_voices(),
                "Voice limit reached, dropping note"
            );
            return PlayOutcome::DroppedCapacity;
        }

        let Some(sample) = bank.sample(pitch) else {
            debug!(%pitch, "No sample loaded, dropping note");
            return PlayOutcome::DroppedNoSample;
        };

        if restarting {
            if let Some(old) = self.voices.remove(pitch) {
                playback.stop(old.stream());
            }
        }

        let params = PlayParams {
            looping: self.looping,
            ..PlayParams::with_gain(gain)
        };
        let stream = match playback.play(sample.sound(), params) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(%pitch, err = %e, "Playback refused note");
                return PlayOutcome::DroppedPlayback;
            }
        };

        self.voices.insert(Voice::new(pitch, stream, gain));
        debug!(%pitch, gain, %stream, restarting, "Note started");
        if restarting {
            PlayOutcome::Restarted
        } else {
            PlayOutcome::Started
        }
    }

    /// Changes the gain of a sounding pitch in place.
    pub fn update_volume(&mut self, playback: &dyn Playback, pitch: Pitch, gain: f32) -> Outcome {
        let gain = clamp_gain(gain);
        match self.voices.set_gain(pitch, gain) {
            Some(stream) => {
                playback.set_volume(stream, gain, gain);
                debug!(%pitch, gain, "Note volume updated");
                Outcome::Applied
            }
            None => Outcome::NoOp,
        }
    }

    /// Stops a sounding pitch and frees its slot.
    pub fn stop_note(&mut self, playback: &dyn Playback, pitch: Pitch) -> Outcome {
        match self.voices.remove(pitch) {
            Some(voice) => {
                playback.stop(voice.stream());
                debug!(%pitch, "Note stopped");
                Outcome::Applied
            }
            None => Outcome::NoOp,
        }
    }

    /// Stops every sounding pitch. Returns how many were stopped.
    pub fn stop_all_notes(&mut self, playback: &dyn Playback) -> usize {
        let stopped = self.voices.clear();
        for voice in stopped.iter() {
            playback.stop(voice.stream());
        }
        if !stopped.is_empty() {
            info!(stopped = stopped.len(), "Stopped all notes");
        }
        stopped.len()
    }

    /// Replaces the stored effect snapshot. Voice gains are untouched.
    pub fn update_effects(&mut self, params: EffectParams) {
        debug!(?params, "Effects updated");
        self.effects = params;
    }

    /// Sets the gain applied to the summed output.
    pub fn set_master_gain(&mut self, playback: &dyn Playback, gain: f32) {
        self.master_gain = clamp_gain(gain);
        playback.set_master_gain(self.master_gain);
        debug!(gain = self.master_gain, "Master gain updated");
    }

    pub fn active_count(&self) -> usize {
        self.voices.active_count()
    }

    pub fn is_sounding(&self, pitch: Pitch) -> bool {
        self.voices.get(pitch).is_some()
    }

    /// Returns the gain of a sounding pitch.
    pub fn voice_gain(&self, pitch: Pitch) -> Option<f32> {
        self.voices.get(pitch).map(Voice::gain)
    }

    pub fn effects(&self) -> EffectParams {
        self.effects
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    /// Returns the sounding voices in chromatic order.
    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.voices()
    }
}
