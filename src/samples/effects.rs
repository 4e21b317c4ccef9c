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

//! Global tone and effect parameters. These values are stored and reported only; no
//! processing is applied to the audio.

use std::ops::RangeInclusive;

use tracing::warn;

/// Valid range for the bass and treble controls, in dB.
pub const TONE_RANGE: RangeInclusive<f32> = -20.0..=20.0;

/// Valid range for the reverb and echo mix controls, in percent.
pub const MIX_RANGE: RangeInclusive<f32> = 0.0..=100.0;

/// The current tone/effect snapshot. Replaced wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EffectParams {
    bass: f32,
    treble: f32,
    reverb_mix: f32,
    echo_mix: f32,
}

impl EffectParams {
    /// Creates a snapshot, clamping every value into its range. Non-finite values become 0.
    pub fn new(bass: f32, treble: f32, reverb_mix: f32, echo_mix: f32) -> Self {
        Self {
            bass: clamp_param("bass", bass, TONE_RANGE),
            treble: clamp_param("treble", treble, TONE_RANGE),
            reverb_mix: clamp_param("reverb_mix", reverb_mix, MIX_RANGE),
            echo_mix: clamp_param("echo_mix", echo_mix, MIX_RANGE),
        }
    }

    pub fn bass(&self) -> f32 {
        self.bass
    }

    pub fn treble(&self) -> f32 {
        self.treble
    }

    pub fn reverb_mix(&self) -> f32 {
        self.reverb_mix
    }

    pub fn echo_mix(&self) -> f32 {
        self.echo_mix
    }
}

fn clamp_param(name: &str, value: f32, range: RangeInclusive<f32>) -> f32 {
    if !value.is_finite() {
        warn!(param = name, value, "Non-finite effect value, using 0");
        return 0.0;
    }
    let clamped = value.clamp(*range.start(), *range.end());
    if clamped != value {
        warn!(param = name, value, clamped, "Effect value out of range, clamping");
    }
    clamped
}

/// Clamps a gain into [0, 1]. NaN becomes 0.
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        return 0.0;
    }
    gain.clamp(0.0, 1.0)
}
