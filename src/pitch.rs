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

//! The twelve chromatic pitch classes the instrument can sound.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// A chromatic pitch class. Ordering is chromatic, starting at C.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pitch {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl Pitch {
    /// All pitches in chromatic order.
    pub const ALL: [Pitch; 12] = [
        Pitch::C,
        Pitch::CSharp,
        Pitch::D,
        Pitch::DSharp,
        Pitch::E,
        Pitch::F,
        Pitch::FSharp,
        Pitch::G,
        Pitch::GSharp,
        Pitch::A,
        Pitch::ASharp,
        Pitch::B,
    ];

    /// The conventional note name, e.g. "C#".
    pub fn name(self) -> &'static str {
        match self {
            Pitch::C => "C",
            Pitch::CSharp => "C#",
            Pitch::D => "D",
            Pitch::DSharp => "D#",
            Pitch::E => "E",
            Pitch::F => "F",
            Pitch::FSharp => "F#",
            Pitch::G => "G",
            Pitch::GSharp => "G#",
            Pitch::A => "A",
            Pitch::ASharp => "A#",
            Pitch::B => "B",
        }
    }

    /// The key used to look up this pitch's sample in an asset source: the name
    /// lowercased with "#" spelled out as "sharp".
    pub fn asset_key(self) -> String {
        self.name().to_lowercase().replace('#', "sharp")
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returned when a string does not name a pitch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pitch '{0}'")]
pub struct ParsePitchError(String);

impl FromStr for Pitch {
    type Err = ParsePitchError;

    /// Accepts "C#", "c#" and "csharp" spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace("sharp", "#");
        Pitch::ALL
            .into_iter()
            .find(|pitch| pitch.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ParsePitchError(s.to_string()))
    }
}

impl TryFrom<String> for Pitch {
    type Error = ParsePitchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(pitch: Pitch) -> Self {
        pitch.name().to_string()
    }
}
