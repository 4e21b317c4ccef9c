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
use std::{error::Error, fmt, sync::Arc};

use crate::config;
use crate::samples::LoadedSample;

pub mod cpal;
pub mod mixer;
pub mod mock;
pub mod sample_source;

/// Identifies a sample registered with a playback backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundId(pub u64);

/// Identifies one playing stream of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound-{}", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// Parameters for starting a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayParams {
    /// Left channel gain, 0.0 to 1.0.
    pub left: f32,
    /// Right channel gain, 0.0 to 1.0.
    pub right: f32,
    /// Streams with a higher priority may evict lower ones when the backend is full.
    pub priority: i32,
    /// Whether the sound repeats until stopped.
    pub looping: bool,
    /// Playback rate, 1.0 is normal speed.
    pub rate: f32,
}

impl PlayParams {
    /// Symmetric gain, normal rate, no looping.
    pub fn with_gain(gain: f32) -> Self {
        Self {
            left: gain,
            right: gain,
            priority: 1,
            looping: false,
            rate: 1.0,
        }
    }
}

/// Error types for playback backends.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Unknown sound {0}")]
    UnknownSound(SoundId),

    #[error("Stream limit of {0} reached")]
    StreamLimit(usize),

    #[error("Audio device error: {0}")]
    Device(String),
}

/// The playback subsystem: registers decoded samples and plays them as independent streams.
/// All calls are non-blocking; the backend renders asynchronously.
pub trait Playback: fmt::Display + Send + Sync {
    /// The rate samples must be loaded at.
    fn sample_rate(&self) -> u32;

    /// Registers a decoded sample for playback.
    fn load(&self, sample: &LoadedSample) -> Result<SoundId, AudioError>;

    /// Releases a registered sample, stopping any of its streams.
    fn unload(&self, sound: SoundId);

    /// Starts a new stream of the given sound.
    fn play(&self, sound: SoundId, params: PlayParams) -> Result<StreamId, AudioError>;

    /// Changes a stream's gain in place. Unknown or finished streams are ignored.
    fn set_volume(&self, stream: StreamId, left: f32, right: f32);

    /// Stops a stream. Unknown or finished streams are ignored.
    fn stop(&self, stream: StreamId);

    /// Sets the gain applied to the summed output.
    fn set_master_gain(&self, gain: f32);
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the playback backend for the given configuration. Device names starting with
/// "mock" get a mock device that renders to memory only.
pub fn get_device(
    config: &config::Audio,
    max_streams: usize,
) -> Result<Arc<dyn Playback>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device, config, max_streams)));
    };

    Ok(Arc::new(cpal::Device::get(config, max_streams)?))
}
