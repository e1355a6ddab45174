// Notes placed on the exercise grid.
//
// A note is a spelled pitch plus its position: the measure (one cantus
// firmus whole note per measure) and the beat slot inside that measure, on
// the grid defined by the species (see species.rs). Within one voice the
// (measure, beat) pair is unique; voice.rs enforces that on insertion.
//
// Notes are immutable. Editing a voice is remove-then-insert.

use crate::error::ParseSpeciesError;
use crate::key::Key;
use crate::pitch::{Accidental, Pitch};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ticks per quarter note, shared with playback and MIDI export.
pub const TICKS_PER_QUARTER: u32 = 480;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duration {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

impl Duration {
    pub fn ticks(self) -> u32 {
        match self {
            Duration::Whole => TICKS_PER_QUARTER * 4,
            Duration::Half => TICKS_PER_QUARTER * 2,
            Duration::Quarter => TICKS_PER_QUARTER,
            Duration::Eighth => TICKS_PER_QUARTER / 2,
            Duration::Sixteenth => TICKS_PER_QUARTER / 4,
        }
    }
}

impl FromStr for Duration {
    type Err = ParseSpeciesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "whole" => Ok(Duration::Whole),
            "h" | "half" => Ok(Duration::Half),
            "q" | "quarter" => Ok(Duration::Quarter),
            "8" | "eighth" => Ok(Duration::Eighth),
            "16" | "sixteenth" => Ok(Duration::Sixteenth),
            _ => Err(ParseSpeciesError::InvalidDuration(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub pitch: Pitch,
    pub midi: i32,
    pub duration: Duration,
    pub measure: usize,
    /// Slot within the measure; 0 is the downbeat.
    pub beat: u8,
    /// Letter-based degree 1-7 in the exercise key.
    pub scale_degree: u8,
    /// Accidental that must be written against the key signature, if any.
    pub accidental: Option<Accidental>,
}

impl Note {
    pub fn new(pitch: Pitch, duration: Duration, measure: usize, beat: u8, key: &Key) -> Self {
        let scale_degree = key.scale_degree(&pitch);
        let (_, diatonic) = key.scale()[(scale_degree - 1) as usize];
        let accidental = (pitch.accidental != diatonic).then_some(pitch.accidental);
        Note {
            pitch,
            midi: pitch.midi(),
            duration,
            measure,
            beat,
            scale_degree,
            accidental,
        }
    }

    /// A whole note on the downbeat of `measure`.
    pub fn whole(pitch: Pitch, measure: usize, key: &Key) -> Self {
        Self::new(pitch, Duration::Whole, measure, 0, key)
    }

    pub fn is_downbeat(&self) -> bool {
        self.beat == 0
    }

    /// Sort key for grid traversal.
    pub fn slot(&self) -> (usize, u8) {
        (self.measure, self.beat)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (m{}:{})", self.pitch, self.measure + 1, self.beat)
    }
}
