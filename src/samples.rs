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

//! Pitched sample playback.
//!
//! This module provides:
//! - Sample decoding (in-memory for zero-latency playback)
//! - The sample bank, one sample per pitch
//! - Voice management with a polyphony limit
//! - Stored tone/effect parameters and master gain

mod bank;
mod effects;
mod loader;
mod mixer;
mod voice;

pub use bank::{InitOutcome, LoadError, SampleBank, SampleHandle};
pub use effects::{clamp_gain, EffectParams, MIX_RANGE, TONE_RANGE};
pub use loader::{LoadedSample, SampleLoader};
pub use mixer::{Outcome, PlayOutcome, VoiceMixer};
pub use voice::{Voice, VoiceManager};
