// The five species and their fixed rhythmic policy.
//
// Each species maps to a `SpeciesConfig` through a pure lookup: how many
// notes the counterpoint places against each cantus firmus whole note, which
// durations are legal, and which dissonance policies apply. Beat positions
// inside a measure are slots on the species grid: I has one slot, II and IV
// two (half notes), III four (quarters), V eight (eighth notes). Slot 0 is
// always the downbeat.

use crate::error::ParseSpeciesError;
use crate::note::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    First,
    Second,
    Third,
    Fourth,
    Fifth,
}

/// Counterpoint notes per cantus firmus measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesPerMeasure {
    Fixed(u8),
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeciesConfig {
    pub notes_per_measure: NotesPerMeasure,
    pub allowed_durations: &'static [Duration],
    pub requires_downbeat_consonance: bool,
    pub allows_passing_tones: bool,
    pub allows_syncopation: bool,
    /// Width of the beat-position grid inside one measure.
    pub slots_per_measure: u8,
}

impl Species {
    pub const ALL: [Species; 5] = [
        Species::First,
        Species::Second,
        Species::Third,
        Species::Fourth,
        Species::Fifth,
    ];

    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn config(self) -> SpeciesConfig {
        match self {
            Species::First => SpeciesConfig {
                notes_per_measure: NotesPerMeasure::Fixed(1),
                allowed_durations: &[Duration::Whole],
                requires_downbeat_consonance: true,
                allows_passing_tones: false,
                allows_syncopation: false,
                slots_per_measure: 1,
            },
            Species::Second => SpeciesConfig {
                notes_per_measure: NotesPerMeasure::Fixed(2),
                allowed_durations: &[Duration::Half, Duration::Whole],
                requires_downbeat_consonance: true,
                allows_passing_tones: true,
                allows_syncopation: false,
                slots_per_measure: 2,
            },
            Species::Third => SpeciesConfig {
                notes_per_measure: NotesPerMeasure::Fixed(4),
                allowed_durations: &[Duration::Quarter, Duration::Whole],
                requires_downbeat_consonance: true,
                allows_passing_tones: true,
                allows_syncopation: false,
                slots_per_measure: 4,
            },
            Species::Fourth => SpeciesConfig {
                notes_per_measure: NotesPerMeasure::Fixed(2),
                allowed_durations: &[Duration::Half, Duration::Whole],
                requires_downbeat_consonance: false,
                allows_passing_tones: false,
                allows_syncopation: true,
                slots_per_measure: 2,
            },
            Species::Fifth => SpeciesConfig {
                notes_per_measure: NotesPerMeasure::Variable,
                allowed_durations: &[
                    Duration::Whole,
                    Duration::Half,
                    Duration::Quarter,
                    Duration::Eighth,
                ],
                requires_downbeat_consonance: false,
                allows_passing_tones: true,
                allows_syncopation: true,
                slots_per_measure: 8,
            },
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let roman = ["I", "II", "III", "IV", "V"];
        write!(f, "species {}", roman[*self as usize])
    }
}

impl FromStr for Species {
    type Err = ParseSpeciesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "i" | "first" => Ok(Species::First),
            "2" | "ii" | "second" => Ok(Species::Second),
            "3" | "iii" | "third" => Ok(Species::Third),
            "4" | "iv" | "fourth" => Ok(Species::Fourth),
            "5" | "v" | "fifth" => Ok(Species::Fifth),
            _ => Err(ParseSpeciesError::InvalidSpecies(s.to_string())),
        }
    }
}
