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

//! Voice bookkeeping for pitched playback.
//!
//! At most one voice exists per pitch, and the total is bounded by the polyphony limit.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::audio::StreamId;
use crate::config::DEFAULT_MAX_VOICES;
use crate::pitch::Pitch;

/// Global voice ID counter.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// An active sounding note.
#[derive(Debug, Clone)]
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The pitch being played.
    pitch: Pitch,
    /// The playback stream rendering this voice.
    stream: StreamId,
    /// Current gain, 0.0 to 1.0.
    gain: f32,
    /// When this voice started playing.
    started: Instant,
}

impl Voice {
    /// Creates a new voice.
    pub fn new(pitch: Pitch, stream: StreamId, gain: f32) -> Self {
        Self {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::SeqCst),
            pitch,
            stream,
            gain,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pitch(&self) -> Pitch {
        self.pitch
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn started(&self) -> Instant {
        self.started
    }
}

/// Tracks the active voices, keyed by pitch.
pub struct VoiceManager {
    /// Active voices in chromatic order.
    voices: BTreeMap<Pitch, Voice>,
    /// Maximum number of simultaneous voices.
    max_voices: usize,
}

impl VoiceManager {
    /// Creates a new voice manager. The limit is between one and three voices.
    pub fn new(max_voices: usize) -> Self {
        Self {
            voices: BTreeMap::new(),
            max_voices: max_voices.clamp(1, DEFAULT_MAX_VOICES),
        }
    }

    /// Returns the voice for the given pitch, if it's sounding.
    pub fn get(&self, pitch: Pitch) -> Option<&Voice> {
        self.voices.get(&pitch)
    }

    /// Returns true if no further voice can be added.
    pub fn is_full(&self) -> bool {
        self.voices.len() >= self.max_voices
    }

    /// Registers a voice. Returns the voice previously registered for the same pitch.
    pub fn insert(&mut self, voice: Voice) -> Option<Voice> {
        self.voices.insert(voice.pitch, voice)
    }

    /// Records a new gain for a sounding pitch. Returns the voice's stream.
    pub fn set_gain(&mut self, pitch: Pitch, gain: f32) -> Option<StreamId> {
        self.voices.get_mut(&pitch).map(|voice| {
            voice.gain = gain;
            voice.stream
        })
    }

    /// Removes the voice for the given pitch.
    pub fn remove(&mut self, pitch: Pitch) -> Option<Voice> {
        self.voices.remove(&pitch)
    }

    /// Removes and returns every voice.
    pub fn clear(&mut self) -> Vec<Voice> {
        std::mem::take(&mut self.voices).into_values().collect()
    }

    /// Returns the active voices in chromatic order.
    pub fn voices(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values()
    }

    /// Returns the current number of active voices.
    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("active_voices", &self.voices.len())
            .field("max_voices", &self.max_voices)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_ids_increase() {
        let first = Voice::new(Pitch::C, StreamId(1), 1.0);
        let second = Voice::new(Pitch::C, StreamId(2), 1.0);
        assert!(second.id() > first.id());
        assert!(second.started() >= first.started());
    }

    #[test]
    fn test_voice_manager_limit() {
        let mut manager = VoiceManager::new(3);
        assert!(!manager.is_full());

        manager.insert(Voice::new(Pitch::C, StreamId(1), 1.0));
        manager.insert(Voice::new(Pitch::E, StreamId(2), 1.0));
        assert!(!manager.is_full());
        manager.insert(Voice::new(Pitch::G, StreamId(3), 1.0));
        assert!(manager.is_full());
        assert_eq!(3, manager.active_count());

        manager.remove(Pitch::E);
        assert!(!manager.is_full());
    }

    #[test]
    fn test_voice_manager_limit_never_above_three() {
        let mut manager = VoiceManager::new(5);
        assert_eq!(3, manager.max_voices());

        for (stream, pitch) in [Pitch::C, Pitch::E, Pitch::G].into_iter().enumerate() {
            manager.insert(Voice::new(pitch, StreamId(stream as u64), 1.0));
        }
        assert!(manager.is_full());
    }

    #[test]
    fn test_voice_manager_one_voice_per_pitch() {
        let mut manager = VoiceManager::new(3);
        assert!(manager
            .insert(Voice::new(Pitch::A, StreamId(1), 0.5))
            .is_none());

        let replaced = manager.insert(Voice::new(Pitch::A, StreamId(2), 0.7));
        assert_eq!(Some(StreamId(1)), replaced.map(|v| v.stream()));
        assert_eq!(1, manager.active_count());
        assert_eq!(Some(StreamId(2)), manager.get(Pitch::A).map(Voice::stream));
    }

    #[test]
    fn test_voice_manager_set_gain() {
        let mut manager = VoiceManager::new(3);
        manager.insert(Voice::new(Pitch::D, StreamId(7), 1.0));

        assert_eq!(Some(StreamId(7)), manager.set_gain(Pitch::D, 0.3));
        assert_eq!(Some(0.3), manager.get(Pitch::D).map(Voice::gain));
        assert_eq!(None, manager.set_gain(Pitch::B, 0.3));
    }

    #[test]
    fn test_voice_manager_clear_in_order() {
        let manager = VoiceManager::new(0);
        assert_eq!(1, manager.max_voices());

        let mut manager = VoiceManager::new(3);
        manager.insert(Voice::new(Pitch::G, StreamId(1), 1.0));
        manager.insert(Voice::new(Pitch::C, StreamId(2), 1.0));

        let pitches: Vec<Pitch> = manager.voices().map(Voice::pitch).collect();
        assert_eq!(vec![Pitch::C, Pitch::G], pitches);

        assert_eq!(2, manager.clear().len());
        assert_eq!(0, manager.active_count());
        assert!(manager.clear().is_empty());
    }
}
