// Species Counterpoint
//
// Checks two-voice exercises in strict species counterpoint (first through
// fifth species) against a catalog of rules, and generates cantus firmus
// melodies for a second voice to be written against. Rule checks are pure
// functions over an immutable snapshot of both voices; the generator draws
// all of its randomness from an injected source, so a seed reproduces a
// melody exactly.
//
// Architecture:
// - pitch.rs: Spelled pitches, MIDI conversion and pitch text parsing
// - key.rs: Keys and scales, scale degrees, step/leap/dissonance predicates
// - note.rs: Durations and placed notes (pitch + measure/beat slot)
// - species.rs: The five species and their rhythmic configuration
// - interval.rs: Interval classification and two-voice motion types
// - sequence.rs: Ordering, slot lookup and alignment helpers over note lists
// - voice.rs: An editable voice that keeps its notes on the species grid
// - rules/: The rule catalog, grouped by category, plus `RuleContext`
// - analysis.rs: The orchestrator that runs the catalog with per-rule
//   failure isolation
// - cantus/: The cantus firmus generator, its candidate filter and its
//   acceptance gate
// - config.rs: JSON generator settings and exercise files
// - playback.rs: Tick-based trigger events for audio playback
// - midi.rs: MIDI file output for exercises
// - error.rs: Error types

pub mod analysis;
pub mod cantus;
pub mod config;
pub mod error;
pub mod interval;
pub mod key;
pub mod midi;
pub mod note;
pub mod pitch;
pub mod playback;
pub mod rules;
pub mod sequence;
pub mod species;
pub mod voice;

pub use analysis::{AnalysisResult, Analyzer};
pub use cantus::{CantusGenerator, Clef, generate_cantus_firmus};
pub use config::{ExerciseFile, GeneratorConfig};
pub use key::Key;
pub use note::{Duration, Note};
pub use pitch::Pitch;
pub use rules::{RuleCatalog, RuleContext, Violation};
pub use species::Species;
