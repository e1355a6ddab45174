// Iteration primitives over one voice's notes.
//
// Every rule walks the voices with these helpers rather than indexing by
// hand. All of them assume the slice is sorted by (measure, beat), which
// `RuleContext::new` guarantees.

use crate::error::RuleError;
use crate::interval::VoiceMotion;
use crate::note::Note;
use crate::species::Species;

/// Consecutive pairs: (n0, n1), (n1, n2), ...
pub fn pairs(notes: &[Note]) -> impl Iterator<Item = (&Note, &Note)> {
    notes.windows(2).map(|w| (&w[0], &w[1]))
}

/// Consecutive triples.
pub fn triples(notes: &[Note]) -> impl Iterator<Item = (&Note, &Note, &Note)> {
    notes.windows(3).map(|w| (&w[0], &w[1], &w[2]))
}

/// A copy of the notes in grid order.
pub fn sorted(notes: &[Note]) -> Vec<Note> {
    let mut out = notes.to_vec();
    out.sort_by_key(Note::slot);
    out
}

pub fn notes_in_measure(notes: &[Note], measure: usize) -> impl Iterator<Item = &Note> {
    notes.iter().filter(move |n| n.measure == measure)
}

pub fn note_at(notes: &[Note], measure: usize, beat: u8) -> Option<&Note> {
    notes.iter().find(|n| n.measure == measure && n.beat == beat)
}

pub fn downbeats(notes: &[Note]) -> impl Iterator<Item = &Note> {
    notes.iter().filter(|n| n.is_downbeat())
}

/// The note sounding at (measure, beat): the latest attack in that measure
/// at or before the beat. Notes never sustain across a barline here; ties
/// are written as a repeated pitch on the next downbeat.
pub fn sounding_at(notes: &[Note], measure: usize, beat: u8) -> Option<&Note> {
    notes
        .iter()
        .filter(|n| n.measure == measure && n.beat <= beat)
        .max_by_key(|n| n.beat)
}

/// The cantus firmus note sounding against `note`.
pub fn cantus_under<'a>(cantus: &'a [Note], note: &Note) -> Option<&'a Note> {
    sounding_at(cantus, note.measure, note.beat)
}

/// Signed melodic distance in semitones from `a` to `b`.
pub fn motion(a: &Note, b: &Note) -> i32 {
    b.midi - a.midi
}

/// Direction of the melodic motion: -1, 0 or 1.
pub fn direction(a: &Note, b: &Note) -> i32 {
    motion(a, b).signum()
}

/// Is `next` a tie continuation of `prev`? Only in species that allow
/// syncopation: a weak-slot note repeated on the following downbeat.
pub fn is_tie(prev: &Note, next: &Note, species: Species) -> bool {
    species.config().allows_syncopation
        && prev.midi == next.midi
        && prev.beat != 0
        && next.beat == 0
        && next.measure == prev.measure + 1
}

/// The melodic line as heard: a tie continuation is dropped, so a held
/// note counts once.
pub fn collapse_ties(notes: &[Note], species: Species) -> Vec<Note> {
    let mut out: Vec<Note> = Vec::with_capacity(notes.len());
    for n in notes {
        match out.last() {
            Some(prev) if is_tie(prev, n, species) => {}
            _ => out.push(*n),
        }
    }
    out
}

pub fn last_measure(notes: &[Note]) -> Option<usize> {
    notes.iter().map(|n| n.measure).max()
}

/// Reject voices that place two notes in the same slot.
pub fn check_unique_slots(notes: &[Note], voice: &'static str) -> Result<(), RuleError> {
    for (a, b) in pairs(notes) {
        if a.slot() == b.slot() {
            return Err(RuleError::DuplicateSlot {
                voice,
                measure: a.measure,
                beat: a.beat,
            });
        }
    }
    Ok(())
}

/// Motion between the downbeats of adjacent measures where both voices
/// have a downbeat note.
pub fn downbeat_motions(cantus: &[Note], counterpoint: &[Note]) -> Vec<VoiceMotion> {
    let aligned: Vec<(&Note, &Note)> = downbeats(counterpoint)
        .filter_map(|cp| note_at(cantus, cp.measure, 0).map(|cf| (cf, cp)))
        .collect();
    aligned
        .windows(2)
        .filter(|w| w[1].1.measure == w[0].1.measure + 1)
        .map(|w| VoiceMotion::new(w[0].0, w[1].0, w[0].1, w[1].1))
        .collect()
}

/// Motion between every pair of consecutive counterpoint notes, each
/// measured against the cantus firmus note sounding under it.
pub fn note_motions(cantus: &[Note], counterpoint: &[Note]) -> Vec<VoiceMotion> {
    pairs(counterpoint)
        .filter_map(|(a, b)| {
            let cf_a = cantus_under(cantus, a)?;
            let cf_b = cantus_under(cantus, b)?;
            Some(VoiceMotion::new(cf_a, cf_b, a, b))
        })
        .collect()
}
