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

//! Shared test fixtures.

use std::f32::consts::PI;
use std::io::Cursor;
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::assets::MemoryAssets;
use crate::audio::mock;
use crate::pitch::Pitch;

/// Sample rate used by the fixtures and the mock device.
pub const TEST_SAMPLE_RATE: u32 = 44100;

/// Encodes interleaved 16-bit samples as an in-memory WAV file.
pub fn wav_bytes_i16(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for sample in samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Encodes interleaved 32-bit float samples as an in-memory WAV file.
pub fn wav_bytes_f32(samples: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for sample in samples {
            writer.write_sample(*sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// A mono 16-bit sine tone at half scale.
pub fn tone_wav(frequency: f32, sample_rate: u32, seconds: f32) -> Vec<u8> {
    let frames = (sample_rate as f32 * seconds).round() as usize;
    let samples: Vec<i16> = (0..frames)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            ((2.0 * PI * frequency * t).sin() * 0.5 * i16::MAX as f32) as i16
        })
        .collect();
    wav_bytes_i16(&samples, 1, sample_rate)
}

/// Frequency of the given pitch in the fourth octave.
fn frequency(pitch: Pitch) -> f32 {
    let semitones_from_a = Pitch::ALL
        .iter()
        .position(|p| *p == pitch)
        .unwrap_or_default() as f32
        - 9.0;
    440.0 * 2f32.powf(semitones_from_a / 12.0)
}

/// A tone for every pitch except the given ones, keyed by asset key.
pub fn pitch_assets(missing: &[Pitch]) -> MemoryAssets {
    let mut assets = MemoryAssets::new();
    for pitch in Pitch::ALL {
        if missing.contains(&pitch) {
            continue;
        }
        assets.insert(
            &pitch.asset_key(),
            tone_wav(frequency(pitch), TEST_SAMPLE_RATE, 0.1),
            Some("wav"),
        );
    }
    assets
}

/// A stereo mock device at the fixture sample rate.
pub fn mock_device(max_streams: usize) -> Arc<mock::Device> {
    Arc::new(mock::Device::new(
        "mock-device",
        2,
        TEST_SAMPLE_RATE,
        max_streams,
    ))
}
