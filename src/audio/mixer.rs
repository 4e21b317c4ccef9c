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
// Software mixing shared by the cpal and mock devices.
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{AudioError, PlayParams, SoundId, StreamId};
use crate::samples::LoadedSample;

/// Core audio mixing logic that's independent of any audio backend
#[derive(Clone)]
pub struct AudioMixer {
    state: Arc<RwLock<MixerState>>,
    /// Number of output channels
    num_channels: u16,
    /// Sample rate
    sample_rate: u32,
    /// Maximum number of concurrent streams
    max_streams: usize,
}

#[derive(Default)]
struct MixerState {
    sounds: HashMap<SoundId, LoadedSample>,
    streams: Vec<ActiveStream>,
    master_gain: f32,
    next_sound_id: u64,
    next_stream_id: u64,
}

/// A stream currently rendering in the mixer.
struct ActiveStream {
    id: StreamId,
    sound: SoundId,
    data: Arc<Vec<f32>>,
    channels: usize,
    frames: usize,
    /// Fractional read position in frames.
    position: f64,
    left: f32,
    right: f32,
    priority: i32,
    looping: bool,
    rate: f64,
}

impl ActiveStream {
    /// Reads the interpolated value of a source channel at the current position.
    fn sample_at(&self, channel: usize) -> f32 {
        let frame = self.position.floor() as usize;
        let frac = (self.position - frame as f64) as f32;
        let next = if frame + 1 < self.frames {
            frame + 1
        } else if self.looping {
            0
        } else {
            frame
        };

        let s0 = self.data[frame * self.channels + channel];
        let s1 = self.data[next * self.channels + channel];
        s0 + (s1 - s0) * frac
    }

    /// Renders the current frame as a (left, right) pair and advances.
    /// Returns None once a non-looping stream has run out.
    fn next_stereo(&mut self) -> Option<(f32, f32)> {
        if self.position >= self.frames as f64 {
            if !self.looping || self.frames == 0 {
                return None;
            }
            self.position %= self.frames as f64;
        }

        let left = self.sample_at(0);
        let right = if self.channels > 1 {
            self.sample_at(1)
        } else {
            left
        };
        self.position += self.rate;

        Some((left * self.left, right * self.right))
    }
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(num_channels: u16, sample_rate: u32, max_streams: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(MixerState {
                master_gain: 1.0,
                ..Default::default()
            })),
            num_channels: num_channels.max(1),
            sample_rate,
            max_streams,
        }
    }

    /// Registers a sample and returns its sound ID.
    pub fn load(&self, sample: &LoadedSample) -> SoundId {
        let mut state = self.state.write();
        state.next_sound_id += 1;
        let id = SoundId(state.next_sound_id);
        state.sounds.insert(id, sample.clone());
        id
    }

    /// Removes a sample and any streams still playing it.
    pub fn unload(&self, sound: SoundId) -> bool {
        let mut state = self.state.write();
        state.streams.retain(|stream| stream.sound != sound);
        state.sounds.remove(&sound).is_some()
    }

    /// Starts a stream. When the mixer is full, the lowest-priority stream is evicted if the
    /// new stream has a strictly higher priority; otherwise the request fails.
    pub fn play(&self, sound: SoundId, params: PlayParams) -> Result<StreamId, AudioError> {
        let mut state = self.state.write();
        let sample = state
            .sounds
            .get(&sound)
            .ok_or(AudioError::UnknownSound(sound))?;
        let data = sample.data();
        let channels = sample.channel_count() as usize;
        let frames = sample.frames();

        if state.streams.len() >= self.max_streams {
            let lowest = state
                .streams
                .iter()
                .enumerate()
                .min_by_key(|(_, stream)| stream.priority)
                .map(|(idx, stream)| (idx, stream.priority));
            match lowest {
                Some((idx, priority)) if priority < params.priority => {
                    let evicted = state.streams.remove(idx);
                    debug!(stream = %evicted.id, "Evicted lower priority stream");
                }
                _ => return Err(AudioError::StreamLimit(self.max_streams)),
            }
        }

        state.next_stream_id += 1;
        let id = StreamId(state.next_stream_id);
        state.streams.push(ActiveStream {
            id,
            sound,
            data,
            channels,
            frames,
            position: 0.0,
            left: params.left.clamp(0.0, 1.0),
            right: params.right.clamp(0.0, 1.0),
            priority: params.priority,
            looping: params.looping,
            rate: params.rate.max(0.0) as f64,
        });
        Ok(id)
    }

    /// Sets a stream's gain. Returns false if the stream is not playing.
    pub fn set_volume(&self, stream: StreamId, left: f32, right: f32) -> bool {
        let mut state = self.state.write();
        match state.streams.iter_mut().find(|s| s.id == stream) {
            Some(active) => {
                active.left = left.clamp(0.0, 1.0);
                active.right = right.clamp(0.0, 1.0);
                true
            }
            None => false,
        }
    }

    /// Stops a stream. Returns false if the stream is not playing.
    pub fn stop(&self, stream: StreamId) -> bool {
        let mut state = self.state.write();
        let before = state.streams.len();
        state.streams.retain(|s| s.id != stream);
        state.streams.len() != before
    }

    pub fn set_master_gain(&self, gain: f32) {
        self.state.write().master_gain = gain.clamp(0.0, 1.0);
    }

    pub fn master_gain(&self) -> f32 {
        self.state.read().master_gain
    }

    /// Returns the (left, right) gain of a playing stream.
    pub fn stream_volume(&self, stream: StreamId) -> Option<(f32, f32)> {
        self.state
            .read()
            .streams
            .iter()
            .find(|s| s.id == stream)
            .map(|s| (s.left, s.right))
    }

    pub fn is_playing(&self, stream: StreamId) -> bool {
        self.state.read().streams.iter().any(|s| s.id == stream)
    }

    pub fn active_streams(&self) -> usize {
        self.state.read().streams.len()
    }

    pub fn loaded_sounds(&self) -> usize {
        self.state.read().sounds.len()
    }

    /// Mixes into an interleaved output buffer, overwriting it. Finished streams are dropped.
    pub fn process_into(&self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = self.num_channels as usize;
        let mut state = self.state.write();
        let master_gain = state.master_gain;

        state.streams.retain_mut(|stream| {
            for frame in output.chunks_exact_mut(channels) {
                let Some((left, right)) = stream.next_stereo() else {
                    return false;
                };
                if channels == 1 {
                    frame[0] += (left + right) * 0.5;
                } else {
                    frame[0] += left;
                    frame[1] += right;
                }
            }
            true
        });

        if master_gain != 1.0 {
            output.iter_mut().for_each(|sample| *sample *= master_gain);
        }
    }

    /// Processes multiple frames of audio mixing
    pub fn process_frames(&self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0; num_frames * self.num_channels as usize];
        self.process_into(&mut frames);
        frames
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(data: Vec<f32>, channels: u16) -> LoadedSample {
        LoadedSample::new(data, channels, 44100)
    }

    #[test]
    fn test_basic_mixing() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(2, 44100, 3);
        let sound = mixer.load(&sample(vec![0.5, 0.8], 1));

        mixer.play(sound, PlayParams::with_gain(1.0))?;
        let frames = mixer.process_frames(3);

        assert_eq!(frames, vec![0.5, 0.5, 0.8, 0.8, 0.0, 0.0]);
        assert_eq!(0, mixer.active_streams());
        Ok(())
    }

    #[test]
    fn test_multiple_stream_mixing() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(2, 44100, 3);
        let first = mixer.load(&sample(vec![0.5, 0.3], 2));
        let second = mixer.load(&sample(vec![0.2, 0.1], 2));

        mixer.play(first, PlayParams::with_gain(1.0))?;
        mixer.play(second, PlayParams::with_gain(1.0))?;
        let frame = mixer.process_frames(1);

        assert!((frame[0] - 0.7).abs() < 1e-6);
        assert!((frame[1] - 0.4).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_stream_gain_and_master() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(2, 44100, 3);
        let sound = mixer.load(&sample(vec![1.0; 8], 1));

        let stream = mixer.play(
            sound,
            PlayParams {
                left: 0.5,
                right: 0.25,
                ..PlayParams::with_gain(1.0)
            },
        )?;
        assert_eq!(vec![0.5, 0.25], mixer.process_frames(1));

        assert!(mixer.set_volume(stream, 1.0, 1.0));
        assert_eq!(Some((1.0, 1.0)), mixer.stream_volume(stream));
        mixer.set_master_gain(0.5);
        assert_eq!(vec![0.5, 0.5], mixer.process_frames(1));
        assert!(mixer.is_playing(stream));
        Ok(())
    }

    #[test]
    fn test_mono_output() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(1, 44100, 3);
        let sound = mixer.load(&sample(vec![1.0, 0.0], 2));

        mixer.play(sound, PlayParams::with_gain(1.0))?;
        assert_eq!(vec![0.5], mixer.process_frames(1));
        Ok(())
    }

    #[test]
    fn test_looping() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(1, 44100, 3);
        let sound = mixer.load(&sample(vec![0.1, 0.2], 1));

        let stream = mixer.play(
            sound,
            PlayParams {
                looping: true,
                ..PlayParams::with_gain(1.0)
            },
        )?;
        let frames = mixer.process_frames(5);
        let expected = [0.1, 0.2, 0.1, 0.2, 0.1];
        for (actual, expected) in frames.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-6);
        }
        assert!(mixer.is_playing(stream));
        Ok(())
    }

    #[test]
    fn test_rate() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(1, 44100, 3);
        let sound = mixer.load(&sample(vec![0.0, 1.0, 0.0, 1.0], 1));

        mixer.play(
            sound,
            PlayParams {
                rate: 0.5,
                ..PlayParams::with_gain(1.0)
            },
        )?;
        let frames = mixer.process_frames(3);
        assert_eq!(vec![0.0, 0.5, 1.0], frames);
        Ok(())
    }

    #[test]
    fn test_stop_and_unknown_streams() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(2, 44100, 3);
        let sound = mixer.load(&sample(vec![1.0; 16], 1));
        let stream = mixer.play(sound, PlayParams::with_gain(1.0))?;

        assert!(mixer.stop(stream));
        assert!(!mixer.stop(stream));
        assert!(!mixer.set_volume(stream, 0.1, 0.1));
        assert_eq!(vec![0.0, 0.0], mixer.process_frames(1));

        assert!(matches!(
            mixer.play(SoundId(999), PlayParams::with_gain(1.0)),
            Err(AudioError::UnknownSound(SoundId(999)))
        ));
        Ok(())
    }

    #[test]
    fn test_stream_limit_and_priority() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(2, 44100, 2);
        let sound = mixer.load(&sample(vec![1.0; 16], 1));

        let first = mixer.play(sound, PlayParams::with_gain(1.0))?;
        mixer.play(sound, PlayParams::with_gain(1.0))?;
        assert!(matches!(
            mixer.play(sound, PlayParams::with_gain(1.0)),
            Err(AudioError::StreamLimit(2))
        ));

        let urgent = mixer.play(
            sound,
            PlayParams {
                priority: 5,
                ..PlayParams::with_gain(1.0)
            },
        )?;
        assert_eq!(2, mixer.active_streams());
        assert!(!mixer.is_playing(first));
        assert!(mixer.is_playing(urgent));
        Ok(())
    }

    #[test]
    fn test_unload_stops_streams() -> Result<(), AudioError> {
        let mixer = AudioMixer::new(2, 44100, 3);
        let sound = mixer.load(&sample(vec![1.0; 16], 1));
        let stream = mixer.play(sound, PlayParams::with_gain(1.0))?;

        assert!(mixer.unload(sound));
        assert!(!mixer.is_playing(stream));
        assert_eq!(0, mixer.loaded_sounds());
        Ok(())
    }
}
