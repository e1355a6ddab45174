// JSON configuration: generator settings and exercise files.
//
// Both load JSON into typed structs. Keys and pitches are written as
// text ("F#m", "Bb3"); omitted generator fields fall back to
// `GeneratorConfig::default()` (C major, eight notes, bass clef).
//
// An exercise file looks like:
//
//   {
//     "species": "second",
//     "key": "D minor",
//     "cantus_firmus": [{ "pitch": "D3" }, { "pitch": "F3" }, ...],
//     "counterpoint": [{ "pitch": "A3", "duration": "half", "measure": 0, "beat": 0 }, ...]
//   }
//
// A cantus firmus note without a measure is placed by its position in the
// list; its duration defaults to whole and its beat to the downbeat.

use crate::cantus::Clef;
use crate::error::{ConfigError, GenerationError};
use crate::key::Key;
use crate::note::{Duration, Note};
use crate::pitch::Pitch;
use crate::rules::RuleContext;
use crate::species::Species;
use crate::voice::VoiceLine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for `generate_cantus_firmus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub key: Key,
    /// Number of notes, 4-16.
    pub length: usize,
    pub clef: Clef,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            key: Key::c_major(),
            length: 8,
            clef: Clef::Bass,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(crate::cantus::MIN_LENGTH..=crate::cantus::MAX_LENGTH).contains(&self.length) {
            return Err(GenerationError::InvalidLength(self.length));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEntry {
    pub pitch: Pitch,
    #[serde(default = "whole")]
    pub duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure: Option<usize>,
    #[serde(default)]
    pub beat: u8,
}

fn whole() -> Duration {
    Duration::Whole
}

impl NoteEntry {
    pub fn from_note(note: &Note) -> Self {
        NoteEntry {
            pitch: note.pitch,
            duration: note.duration,
            measure: Some(note.measure),
            beat: note.beat,
        }
    }

    /// The note this entry describes; `index` stands in for a missing measure.
    pub fn to_note(&self, index: usize, key: &Key) -> Note {
        Note::new(self.pitch, self.duration, self.measure.unwrap_or(index), self.beat, key)
    }
}

/// A two-voice exercise on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseFile {
    pub species: Species,
    pub key: Key,
    pub cantus_firmus: Vec<NoteEntry>,
    #[serde(default)]
    pub counterpoint: Vec<NoteEntry>,
}

impl ExerciseFile {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_notes(species: Species, key: Key, cantus_firmus: &[Note], counterpoint: &[Note]) -> Self {
        ExerciseFile {
            species,
            key,
            cantus_firmus: cantus_firmus.iter().map(NoteEntry::from_note).collect(),
            counterpoint: counterpoint.iter().map(NoteEntry::from_note).collect(),
        }
    }

    /// Place both voices on their grids and build the analysis context.
    /// The cantus firmus always sits on the first-species grid.
    pub fn to_context(&self) -> Result<RuleContext, ConfigError> {
        let place = |entries: &[NoteEntry]| -> Vec<Note> {
            entries.iter().enumerate().map(|(i, s)| s.to_note(i, &self.key)).collect()
        };
        let cantus = VoiceLine::from_notes(Species::First, place(&self.cantus_firmus))?;
        let counterpoint = VoiceLine::from_notes(self.species, place(&self.counterpoint))?;
        Ok(RuleContext::from_voices(self.species, self.key, &cantus, &counterpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Mode;

    #[test]
    fn test_generator_config_defaults_and_overrides() {
        let config = GeneratorConfig::from_json("{}").unwrap();
        assert_eq!(config, GeneratorConfig::default());

        let config = GeneratorConfig::from_json(r#"{"key": "F#m", "length": 12, "clef": "treble"}"#).unwrap();
        assert_eq!(config.key.mode, Mode::Minor);
        assert_eq!(config.length, 12);
        assert_eq!(config.clef, Clef::Treble);
    }

    #[test]
    fn test_generator_config_rejects_bad_input() {
        assert!(matches!(
            GeneratorConfig::from_json(r#"{"length": 20}"#),
            Err(ConfigError::Generation(GenerationError::InvalidLength(20)))
        ));
        assert!(matches!(GeneratorConfig::from_json(r#"{"key": "H"}"#), Err(ConfigError::Json(_))));
        assert!(matches!(GeneratorConfig::from_json("not json"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_exercise_to_context() {
        let json = r#"{
            "species": "second",
            "key": "C",
            "cantus_firmus": [{"pitch": "C3"}, {"pitch": "D3"}, {"pitch": "C3"}],
            "counterpoint": [
                {"pitch": "G3", "duration": "half", "measure": 0, "beat": 1},
                {"pitch": "F3", "duration": "half", "measure": 1, "beat": 0},
                {"pitch": "B3", "duration": "half", "measure": 1, "beat": 1},
                {"pitch": "C4", "measure": 2}
            ]
        }"#;
        let exercise = ExerciseFile::from_json(json).unwrap();
        let ctx = exercise.to_context().unwrap();
        assert_eq!(ctx.species, Species::Second);
        assert_eq!(ctx.cantus_firmus.len(), 3);
        assert_eq!(ctx.cantus_firmus[1].measure, 1);
        assert_eq!(ctx.counterpoint.len(), 4);
        assert_eq!(ctx.counterpoint[3].duration, Duration::Whole);
    }

    #[test]
    fn test_exercise_errors() {
        let bad_pitch = r#"{"species": "first", "key": "C", "cantus_firmus": [{"pitch": "Q9"}]}"#;
        assert!(matches!(ExerciseFile::from_json(bad_pitch), Err(ConfigError::Json(_))));

        let off_grid = r#"{"species": "first", "key": "C", "cantus_firmus": [{"pitch": "C3"}],
            "counterpoint": [{"pitch": "C4", "measure": 0, "beat": 1}]}"#;
        let exercise = ExerciseFile::from_json(off_grid).unwrap();
        assert!(matches!(exercise.to_context(), Err(ConfigError::Voice(_))));
    }

    #[test]
    fn test_exercise_json_survives_a_save() {
        let key: Key = "Bbm".parse().unwrap();
        let cf: Vec<Note> = ["Bb2", "C3", "Bb2"]
            .iter()
            .enumerate()
            .map(|(i, p)| Note::whole(p.parse().unwrap(), i, &key))
            .collect();
        let exercise = ExerciseFile::from_notes(Species::First, key, &cf, &[]);
        let reloaded = ExerciseFile::from_json(&exercise.to_json().unwrap()).unwrap();
        assert_eq!(reloaded, exercise);
    }
}
