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

//! The sample bank: one decoded, backend-registered sample per pitch.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{info, warn};

use super::loader::SampleLoader;
use crate::assets::{AssetError, AssetSource};
use crate::audio::sample_source::SampleSourceError;
use crate::audio::{AudioError, Playback, SoundId};
use crate::pitch::Pitch;

/// Errors loading a single pitch.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Decode error: {0}")]
    Decode(#[from] SampleSourceError),

    #[error("Playback error: {0}")]
    Playback(#[from] AudioError),
}

/// The result of initializing the bank.
#[derive(Debug, Clone, PartialEq)]
pub enum InitOutcome {
    /// The bank was loaded. Failed pitches are unplayable until re-initialized.
    Initialized {
        loaded: Vec<Pitch>,
        failed: Vec<(Pitch, String)>,
    },
    /// The bank had already been loaded; nothing was touched.
    AlreadyInitialized,
}

/// A sample registered with the playback backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleHandle {
    sound: SoundId,
    channel_count: u16,
    sample_rate: u32,
    duration: Duration,
}

impl SampleHandle {
    /// The backend's id for this sample.
    pub fn sound(&self) -> SoundId {
        self.sound
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Pitch to sample mapping. Populated once by `initialize`, read-only afterwards.
#[derive(Debug, Default)]
pub struct SampleBank {
    samples: BTreeMap<Pitch, SampleHandle>,
    initialized: bool,
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every pitch from the asset source and registers it with the backend. A pitch
    /// that fails is logged and left out of the bank.
    pub fn initialize(&mut self, assets: &dyn AssetSource, playback: &dyn Playback) -> InitOutcome {
        if self.initialized {
            return InitOutcome::AlreadyInitialized;
        }

        let loader = SampleLoader::new(playback.sample_rate());
        let mut loaded = Vec::new();
        let mut failed = Vec::new();
        for pitch in Pitch::ALL {
            match Self::load_pitch(&loader, assets, playback, pitch) {
                Ok(handle) => {
                    self.samples.insert(pitch, handle);
                    loaded.push(pitch);
                }
                Err(e) => {
                    warn!(%pitch, err = %e, "Unable to load sample, pitch will be silent");
                    failed.push((pitch, e.to_string()));
                }
            }
        }

        self.initialized = true;
        info!(
            loaded = loaded.len(),
            failed = failed.len(),
            "Sample bank initialized"
        );
        InitOutcome::Initialized { loaded, failed }
    }

    fn load_pitch(
        loader: &SampleLoader,
        assets: &dyn AssetSource,
        playback: &dyn Playback,
        pitch: Pitch,
    ) -> Result<SampleHandle, LoadError> {
        let asset = assets.open(&pitch.asset_key())?;
        let sample = loader.load(asset)?;
        let sound = playback.load(&sample)?;
        Ok(SampleHandle {
            sound,
            channel_count: sample.channel_count(),
            sample_rate: sample.sample_rate(),
            duration: sample.duration(),
        })
    }

    /// Returns the sample for the pitch, or none if it failed or the bank isn't loaded.
    pub fn sample(&self, pitch: Pitch) -> Option<&SampleHandle> {
        self.samples.get(&pitch)
    }

    /// Unloads every sample from the backend and returns the bank to its initial state.
    pub fn clear(&mut self, playback: &dyn Playback) {
        for handle in self.samples.values() {
            playback.unload(handle.sound);
        }
        self.samples.clear();
        self.initialized = false;
    }

    /// Returns the loaded pitches in chromatic order.
    pub fn loaded_pitches(&self) -> Vec<Pitch> {
        self.samples.keys().copied().collect()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
