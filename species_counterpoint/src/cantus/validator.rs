// Acceptance gate for finished cantus firmus melodies.
//
// Checks the whole melody independently of how it was built, so a bug in
// the candidate filter cannot leak an invalid melody out of the generator.

use crate::cantus::{MAX_LENGTH, MIN_LENGTH, has_interior_climax};
use crate::key::Key;
use crate::note::Note;
use crate::pitch::Pitch;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("length {0} is outside 4..=16")]
    Length(usize),
    #[error("does not start on the tonic")]
    StartNotTonic,
    #[error("does not end on the tonic")]
    EndNotTonic,
    #[error("no single interior climax")]
    Climax,
    #[error("repeated note at position {0}")]
    Repeat(usize),
    #[error("melodic tritone into position {0}")]
    Tritone(usize),
    #[error("leap of {semitones} semitones into position {position}")]
    LeapTooLarge { position: usize, semitones: i32 },
}

/// Every issue found; empty means the melody is acceptable.
pub fn validate(melody: &[Note], key: &Key) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&melody.len()) {
        issues.push(ValidationIssue::Length(melody.len()));
    }
    let is_tonic = |n: &Note| (n.midi - key.tonic_pitch_class()).rem_euclid(12) == 0;
    if !melody.first().is_some_and(is_tonic) {
        issues.push(ValidationIssue::StartNotTonic);
    }
    if !melody.last().is_some_and(is_tonic) {
        issues.push(ValidationIssue::EndNotTonic);
    }
    let pitches: Vec<Pitch> = melody.iter().map(|n| n.pitch).collect();
    if !has_interior_climax(&pitches) {
        issues.push(ValidationIssue::Climax);
    }
    for (i, pair) in melody.windows(2).enumerate() {
        let position = i + 1;
        let semitones = (pair[1].midi - pair[0].midi).abs();
        match semitones {
            0 => issues.push(ValidationIssue::Repeat(position)),
            6 => issues.push(ValidationIssue::Tritone(position)),
            s if s > 7 => issues.push(ValidationIssue::LeapTooLarge { position, semitones }),
            _ => {}
        }
    }
    issues
}

pub fn is_valid(melody: &[Note], key: &Key) -> bool {
    validate(melody, key).is_empty()
}
