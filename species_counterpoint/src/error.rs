// Error types for the counterpoint crate.
//
// Parsing and configuration failures propagate to the immediate caller.
// `RuleError` never escapes the orchestrator (analysis.rs contains it per
// rule). `GenerationError` is terminal: the generator either returns a whole
// melody or one of these, never a partial result.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    /// The text could not be decoded into letter, accidental and octave.
    #[error("invalid pitch format: {0:?}")]
    InvalidPitchFormat(String),
    #[error("MIDI number {0} is outside 0..=127")]
    MidiOutOfRange(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSpeciesError {
    #[error("invalid species: {0:?} (expected 1-5 or I-V)")]
    InvalidSpecies(String),
    #[error("invalid duration: {0:?}")]
    InvalidDuration(String),
    #[error("invalid clef: {0:?}")]
    InvalidClef(String),
}

/// A rule could not evaluate the context it was given.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{voice} has two notes at measure {measure}, beat {beat}")]
    DuplicateSlot {
        voice: &'static str,
        measure: usize,
        beat: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("beat {beat} is outside the {slots}-slot grid of this species")]
    SlotOutOfGrid { beat: u8, slots: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("cantus firmus length {0} is outside 4..=16")]
    InvalidLength(usize),
    #[error("no valid cantus firmus found after {attempts} attempts")]
    GenerationFailed { attempts: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Pitch(#[from] PitchError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Voice(#[from] VoiceError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}
