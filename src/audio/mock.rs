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
use std::fmt;

use tracing::debug;

use super::mixer::AudioMixer;
use super::{AudioError, PlayParams, Playback, SoundId, StreamId};
use crate::config;
use crate::samples::LoadedSample;

/// A mock device. Mixes in memory but never touches audio hardware; the mixer can be
/// pulled manually to inspect what would have been heard.
#[derive(Clone)]
pub struct Device {
    name: String,
    mixer: AudioMixer,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, config: &config::Audio, max_streams: usize) -> Device {
        Device::new(name, config.channels(), config.sample_rate(), max_streams)
    }

    pub fn new(name: &str, channels: u16, sample_rate: u32, max_streams: usize) -> Device {
        Device {
            name: name.to_string(),
            mixer: AudioMixer::new(channels, sample_rate, max_streams),
        }
    }

    /// Returns the mixer backing this device.
    pub fn mixer(&self) -> &AudioMixer {
        &self.mixer
    }
}

impl Playback for Device {
    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn load(&self, sample: &LoadedSample) -> Result<SoundId, AudioError> {
        let sound = self.mixer.load(sample);
        debug!(device = self.name, %sound, "Loaded sound (mock)");
        Ok(sound)
    }

    fn unload(&self, sound: SoundId) {
        self.mixer.unload(sound);
    }

    fn play(&self, sound: SoundId, params: PlayParams) -> Result<StreamId, AudioError> {
        self.mixer.play(sound, params)
    }

    fn set_volume(&self, stream: StreamId, left: f32, right: f32) {
        self.mixer.set_volume(stream, left, right);
    }

    fn stop(&self, stream: StreamId) {
        self.mixer.stop(stream);
    }

    fn set_master_gain(&self, gain: f32) {
        self.mixer.set_master_gain(gain);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
