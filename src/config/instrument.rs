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
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::audio::Audio;
use super::error::ConfigError;
use crate::assets::DirectoryAssets;
use crate::pitch::Pitch;

/// Maximum number of simultaneously sounding notes. Configurations may lower it, never raise it.
pub const DEFAULT_MAX_VOICES: usize = 3;

/// Default directory holding the pitch samples, relative to the config file.
const DEFAULT_ASSETS_DIR: &str = "samples";

/// Default file extension for pitch samples.
const DEFAULT_EXTENSION: &str = "wav";

/// Behavior when a note is played while it's already sounding.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerBehavior {
    /// Keep the sounding voice untouched and ignore the request.
    #[default]
    Ignore,
    /// Stop the sounding voice and start the note again at the requested gain.
    Restart,
}

/// A YAML representation of the instrument configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct InstrumentConfig {
    /// Directory containing one sample per pitch.
    assets: Option<PathBuf>,

    /// File extension of the pitch samples.
    #[serde(default = "default_extension")]
    extension: String,

    /// Per-pitch file overrides, relative to the assets directory.
    #[serde(default)]
    samples: HashMap<Pitch, String>,

    /// The audio output configuration.
    #[serde(default)]
    audio: Audio,

    /// Maximum number of simultaneously sounding notes.
    #[serde(default = "default_max_voices")]
    max_voices: usize,

    /// Behavior when a sounding note is played again.
    #[serde(default)]
    retrigger: RetriggerBehavior,

    /// Whether notes loop until stopped.
    #[serde(default)]
    looping: bool,

    /// Gain used when a note is played without an explicit gain.
    #[serde(default = "default_gain")]
    default_gain: f32,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    base_path: PathBuf,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

fn default_max_voices() -> usize {
    DEFAULT_MAX_VOICES
}

fn default_gain() -> f32 {
    1.0
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            assets: None,
            extension: default_extension(),
            samples: HashMap::new(),
            audio: Audio::default(),
            max_voices: DEFAULT_MAX_VOICES,
            retrigger: RetriggerBehavior::default(),
            looping: false,
            default_gain: default_gain(),
            base_path: PathBuf::new(),
        }
    }
}

impl InstrumentConfig {
    /// Parse an instrument configuration from a YAML file. Relative paths in the file are
    /// resolved against the file's directory.
    pub fn deserialize(path: &Path) -> Result<InstrumentConfig, ConfigError> {
        let mut config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<InstrumentConfig>()?;
        config.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()
    }

    /// Parse an instrument configuration from a YAML string.
    pub fn from_yaml(yaml: &str, base_path: &Path) -> Result<InstrumentConfig, ConfigError> {
        let mut config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<InstrumentConfig>()?;
        config.base_path = base_path.to_path_buf();
        config.validate()
    }

    fn validate(self) -> Result<InstrumentConfig, ConfigError> {
        if !(1..=DEFAULT_MAX_VOICES).contains(&self.max_voices) {
            return Err(ConfigError::Invalid(format!(
                "max_voices must be between 1 and {}, got {}",
                DEFAULT_MAX_VOICES, self.max_voices
            )));
        }
        if !(0.0..=1.0).contains(&self.default_gain) {
            return Err(ConfigError::Invalid(format!(
                "default_gain must be between 0.0 and 1.0, got {}",
                self.default_gain
            )));
        }
        Ok(self)
    }

    /// Sets the audio configuration.
    pub fn with_audio(mut self, audio: Audio) -> Self {
        self.audio = audio;
        self
    }

    /// Sets the maximum number of simultaneously sounding notes, at most three.
    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices.clamp(1, DEFAULT_MAX_VOICES);
        self
    }

    /// Sets the retrigger behavior.
    pub fn with_retrigger(mut self, retrigger: RetriggerBehavior) -> Self {
        self.retrigger = retrigger;
        self
    }

    /// Sets whether notes loop.
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Returns the resolved assets directory.
    pub fn assets_dir(&self) -> PathBuf {
        let assets = self
            .assets
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR));
        if assets.is_absolute() {
            assets
        } else {
            self.base_path.join(assets)
        }
    }

    /// Builds the directory asset source described by this configuration.
    pub fn asset_source(&self) -> DirectoryAssets {
        self.samples.iter().fold(
            DirectoryAssets::new(self.assets_dir(), &self.extension),
            |assets, (pitch, file)| assets.with_override(&pitch.asset_key(), file),
        )
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    pub fn retrigger(&self) -> RetriggerBehavior {
        self.retrigger
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn default_gain(&self) -> f32 {
        self.default_gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> Result<(), ConfigError> {
        let config = InstrumentConfig::from_yaml("{}", Path::new("/etc/tanpura"))?;

        assert_eq!(PathBuf::from("/etc/tanpura/samples"), config.assets_dir());
        assert_eq!(3, config.max_voices());
        assert_eq!(RetriggerBehavior::Ignore, config.retrigger());
        assert!(!config.looping());
        assert_eq!(1.0, config.default_gain());
        assert_eq!("default", config.audio().device());
        assert_eq!(44100, config.audio().sample_rate());
        assert_eq!(2, config.audio().channels());
        assert_eq!(
            PathBuf::from("/etc/tanpura/samples/csharp.wav"),
            config.asset_source().path_for("csharp")
        );
        Ok(())
    }

    #[test]
    fn test_full_config() -> Result<(), ConfigError> {
        let yaml = r#"
            assets: notes
            extension: flac
            samples:
              "F#": fsharp_alt.flac
            audio:
              device: mock-device
              sample_rate: 48000
              channels: 1
            max_voices: 2
            retrigger: restart
            looping: true
            default_gain: 0.5
        "#;
        let config = InstrumentConfig::from_yaml(yaml, Path::new("/opt"))?;

        assert_eq!(PathBuf::from("/opt/notes"), config.assets_dir());
        assert_eq!(2, config.max_voices());
        assert_eq!(RetriggerBehavior::Restart, config.retrigger());
        assert!(config.looping());
        assert_eq!(0.5, config.default_gain());
        assert_eq!("mock-device", config.audio().device());
        assert_eq!(48000, config.audio().sample_rate());
        assert_eq!(1, config.audio().channels());

        let assets = config.asset_source();
        assert_eq!(PathBuf::from("/opt/notes/c.flac"), assets.path_for("c"));
        assert_eq!(
            PathBuf::from("/opt/notes/fsharp_alt.flac"),
            assets.path_for("fsharp")
        );
        Ok(())
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            InstrumentConfig::from_yaml("max_voices: 0", Path::new("/")),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            InstrumentConfig::from_yaml("max_voices: 4", Path::new("/")),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            InstrumentConfig::from_yaml("default_gain: 1.5", Path::new("/")),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            InstrumentConfig::from_yaml("retrigger: sometimes", Path::new("/")),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_voice_limit_clamped() -> Result<(), ConfigError> {
        assert_eq!(3, InstrumentConfig::default().with_max_voices(5).max_voices());
        assert_eq!(1, InstrumentConfig::default().with_max_voices(0).max_voices());
        assert_eq!(
            3,
            InstrumentConfig::from_yaml("max_voices: 3", Path::new("/"))?.max_voices()
        );
        Ok(())
    }

    #[test]
    fn test_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("tanpura.yaml");
        std::fs::write(&path, "assets: tones\nmax_voices: 2\n")?;

        let config = InstrumentConfig::deserialize(&path)?;
        assert_eq!(dir.path().join("tones"), config.assets_dir());
        assert_eq!(2, config.max_voices());
        Ok(())
    }
}
