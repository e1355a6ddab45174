// Cantus firmus generation.
//
// The generator builds a melody note by note and throws the whole attempt
// away at the first dead end; there is no backtracking inside an attempt.
// One attempt:
//
//   1. Place the tonic in the clef's octave as note 0.
//   2. For each interior position, take the filtered candidates from
//      constraints.rs and make a weighted random pick (steps favored).
//      No candidates means the attempt fails.
//   3. Close on the opening tonic, but only if the penultimate note is a
//      step away.
//   4. Require a single highest note at an interior position.
//   5. Run the independent validator (validator.rs).
//
// Failed attempts are retried up to `MAX_ATTEMPTS` times, after which
// generation fails with `GenerationError::GenerationFailed`. Randomness
// comes only from the injected `RandomSource`, so a seeded source gives a
// reproducible melody.

pub mod constraints;
pub mod validator;

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, ParseSpeciesError};
use crate::note::Note;
use crate::pitch::Pitch;
use constraints::MelodyState;
use serde::{Deserialize, Serialize};
use species_prng::RandomSource;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use validator::ValidationIssue;

pub const MAX_ATTEMPTS: usize = 1000;
pub const MIN_LENGTH: usize = 4;
pub const MAX_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    Treble,
    Alto,
    Tenor,
    #[default]
    Bass,
}

impl Clef {
    /// Octave of the opening tonic.
    pub fn tonic_octave(self) -> i8 {
        match self {
            Clef::Treble | Clef::Alto => 4,
            Clef::Tenor | Clef::Bass => 3,
        }
    }
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Clef::Treble => "treble",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
            Clef::Bass => "bass",
        };
        f.write_str(name)
    }
}

impl FromStr for Clef {
    type Err = ParseSpeciesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "treble" | "g" => Ok(Clef::Treble),
            "alto" => Ok(Clef::Alto),
            "tenor" => Ok(Clef::Tenor),
            "bass" | "f" => Ok(Clef::Bass),
            _ => Err(ParseSpeciesError::InvalidClef(s.to_string())),
        }
    }
}

/// Why an attempt was thrown away.
#[derive(Debug, Clone, PartialEq)]
enum Rejection {
    NoCandidates { position: usize },
    NoCadence { penultimate: Pitch },
    Climax,
    Validator(Vec<ValidationIssue>),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoCandidates { position } => write!(f, "no candidate at position {position}"),
            Rejection::NoCadence { penultimate } => write!(f, "{penultimate} cannot step to the final"),
            Rejection::Climax => write!(f, "highest note is repeated or at an edge"),
            Rejection::Validator(issues) => {
                write!(f, "validator: ")?;
                for (i, issue) in issues.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{issue}")?;
                }
                Ok(())
            }
        }
    }
}

pub struct CantusGenerator {
    config: GeneratorConfig,
}

impl CantusGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationError> {
        config.validate()?;
        Ok(CantusGenerator { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run attempts until one passes or the cap is reached.
    pub fn generate(&self, rng: &mut dyn RandomSource) -> Result<Vec<Note>, GenerationError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(rng) {
                Ok(melody) => {
                    info!(
                        attempts = attempt,
                        key = %self.config.key,
                        length = self.config.length,
                        "generated cantus firmus"
                    );
                    return Ok(melody);
                }
                Err(reason) => debug!(attempt, %reason, "cantus firmus attempt rejected"),
            }
        }
        warn!(
            attempts = MAX_ATTEMPTS,
            key = %self.config.key,
            length = self.config.length,
            "cantus firmus generation exhausted"
        );
        Err(GenerationError::GenerationFailed { attempts: MAX_ATTEMPTS })
    }

    fn attempt(&self, rng: &mut dyn RandomSource) -> Result<Vec<Note>, Rejection> {
        let GeneratorConfig { key, length, clef } = self.config;
        let tonic_octave = clef.tonic_octave();
        let tonic = key.tonic_pitch(tonic_octave);

        let mut pitches = vec![tonic];
        for position in 1..length - 1 {
            let state = MelodyState {
                key: &key,
                tonic_octave,
                length,
                pitches: &pitches,
            };
            let candidates = constraints::candidates(&state, position);
            let previous = pitches[position - 1];
            let pick = constraints::weighted_pick(&candidates, &previous, rng)
                .ok_or(Rejection::NoCandidates { position })?;
            pitches.push(pick);
        }

        let penultimate = pitches[pitches.len() - 1];
        let state = MelodyState {
            key: &key,
            tonic_octave,
            length,
            pitches: &pitches,
        };
        if !matches!((penultimate.midi() - tonic.midi()).abs(), 1 | 2) || !constraints::admits(&state, &tonic) {
            return Err(Rejection::NoCadence { penultimate });
        }
        pitches.push(tonic);

        if !has_interior_climax(&pitches) {
            return Err(Rejection::Climax);
        }

        let notes: Vec<Note> = pitches
            .iter()
            .enumerate()
            .map(|(measure, p)| Note::whole(*p, measure, &key))
            .collect();
        let issues = validator::validate(&notes, &key);
        if !issues.is_empty() {
            return Err(Rejection::Validator(issues));
        }
        Ok(notes)
    }
}

/// The highest pitch occurs once and is neither the first nor last note.
pub(crate) fn has_interior_climax(pitches: &[Pitch]) -> bool {
    let Some(high) = pitches.iter().map(Pitch::midi).max() else {
        return false;
    };
    let peaks: Vec<usize> = pitches
        .iter()
        .enumerate()
        .filter(|(_, p)| p.midi() == high)
        .map(|(i, _)| i)
        .collect();
    matches!(peaks.as_slice(), [i] if *i > 0 && *i + 1 < pitches.len())
}

/// Generate a cantus firmus for the given settings.
pub fn generate_cantus_firmus(
    config: &GeneratorConfig,
    rng: &mut dyn RandomSource,
) -> Result<Vec<Note>, GenerationError> {
    CantusGenerator::new(*config)?.generate(rng)
}
