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

//! Sample decoding for pitched notes.
//!
//! Samples are decoded entirely into memory at startup for zero-latency playback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::assets::Asset;
use crate::audio::sample_source::{AudioSampleSource, SampleSourceError};

/// A decoded sample that can be played back.
/// The sample data is stored in an Arc for efficient sharing between streams.
#[derive(Clone, Debug)]
pub struct LoadedSample {
    /// The sample data as f32 samples (interleaved if multi-channel).
    data: Arc<Vec<f32>>,
    /// Number of channels in the sample.
    channel_count: u16,
    /// Sample rate of the audio data.
    sample_rate: u32,
}

impl LoadedSample {
    /// Creates a loaded sample from interleaved data.
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        Self {
            data: Arc::new(data),
            channel_count: channel_count.max(1),
            sample_rate,
        }
    }

    /// Returns a shared handle to the interleaved sample data.
    pub fn data(&self) -> Arc<Vec<f32>> {
        self.data.clone()
    }

    /// Returns the number of channels.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate.max(1) as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Decodes assets into memory at the playback sample rate.
#[derive(Debug)]
pub struct SampleLoader {
    /// Target sample rate for transcoding (matches audio output).
    target_sample_rate: u32,
}

impl SampleLoader {
    pub fn new(target_sample_rate: u32) -> Self {
        Self { target_sample_rate }
    }

    /// Decodes the whole asset, transcoding if its rate differs from the target rate.
    pub fn load(&self, asset: Asset) -> Result<LoadedSample, SampleSourceError> {
        let key = asset.key.clone();
        debug!(key, "Decoding sample");

        let mut source = AudioSampleSource::from_asset(asset)?;
        let source_sample_rate = source.sample_rate();
        let channel_count = source.channel_count();
        let samples = source.read_to_end()?;

        let (final_samples, final_sample_rate) = if source_sample_rate != self.target_sample_rate {
            info!(
                key,
                source_rate = source_sample_rate,
                target_rate = self.target_sample_rate,
                "Transcoding sample"
            );
            let transcoded = Self::transcode_samples(
                &samples,
                channel_count,
                source_sample_rate,
                self.target_sample_rate,
            );
            (transcoded, self.target_sample_rate)
        } else {
            (samples, source_sample_rate)
        };

        let loaded = LoadedSample::new(final_samples, channel_count, final_sample_rate);
        info!(
            key,
            channels = channel_count,
            sample_rate = final_sample_rate,
            duration_ms = loaded.duration().as_millis(),
            memory_kb = loaded.memory_size() / 1024,
            "Sample loaded"
        );
        Ok(loaded)
    }

    /// Transcodes samples from one sample rate to another using linear interpolation,
    /// which is plenty for sustained single-note samples.
    fn transcode_samples(
        samples: &[f32],
        channel_count: u16,
        source_rate: u32,
        target_rate: u32,
    ) -> Vec<f32> {
        let ratio = target_rate as f64 / source_rate as f64;
        let channels = channel_count.max(1) as usize;
        let source_frames = samples.len() / channels;
        let target_frames = (source_frames as f64 * ratio).ceil() as usize;

        let mut output = Vec::with_capacity(target_frames * channels);

        for target_frame in 0..target_frames {
            let source_pos = target_frame as f64 / ratio;
            let source_frame = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            for channel in 0..channels {
                let idx0 = source_frame * channels + channel;
                let idx1 = (source_frame + 1) * channels + channel;

                let s0 = samples.get(idx0).copied().unwrap_or(0.0);
                let s1 = samples.get(idx1).copied().unwrap_or(s0);

                output.push(s0 + (s1 - s0) * frac);
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetSource, MemoryAssets};
    use crate::testutil;

    #[test]
    fn test_transcode_samples() {
        let source_rate = 44100;
        let target_rate = 48000;
        let source_samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / source_rate as f32).sin())
            .collect();

        let result =
            SampleLoader::transcode_samples(&source_samples, 1, source_rate, target_rate);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
    }

    #[test]
    fn test_transcode_stereo() {
        // Stereo: L=1.0, R=-1.0 alternating
        let source_samples = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];

        let result = SampleLoader::transcode_samples(&source_samples, 2, 44100, 48000);

        assert!(result.len() >= 8);
        assert!((result[0] - 1.0).abs() < 0.1);
        assert!((result[1] - (-1.0)).abs() < 0.1);
    }

    #[test]
    fn test_load_at_target_rate() -> Result<(), Box<dyn std::error::Error>> {
        let mut assets = MemoryAssets::new();
        assets.insert("c", testutil::tone_wav(261.63, 44100, 0.1), Some("wav"));

        let loaded = SampleLoader::new(44100).load(assets.open("c")?)?;
        assert_eq!(1, loaded.channel_count());
        assert_eq!(44100, loaded.sample_rate());
        assert_eq!(4410, loaded.frames());
        assert_eq!(4410 * 4, loaded.memory_size());
        Ok(())
    }

    #[test]
    fn test_load_resamples() -> Result<(), Box<dyn std::error::Error>> {
        let mut assets = MemoryAssets::new();
        assets.insert("a", testutil::tone_wav(440.0, 22050, 0.1), Some("wav"));

        let loaded = SampleLoader::new(44100).load(assets.open("a")?)?;
        assert_eq!(44100, loaded.sample_rate());
        assert_eq!(4410, loaded.frames());
        assert!((loaded.duration().as_secs_f64() - 0.1).abs() < 0.001);
        Ok(())
    }
}
