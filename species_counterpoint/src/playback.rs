// Playback scheduling.
//
// Turns note sequences into timed trigger events for an audio backend or the
// MIDI writer. Time is in ticks (480 per quarter, 1920 per measure); a
// note's onset is its measure plus its beat slot's share of the measure, so
// a second-species beat 1 starts half a measure in. A note tied over the
// bar extends the event that started it instead of sounding again.

use crate::note::{Note, TICKS_PER_QUARTER};
use crate::sequence::{is_tie, sorted};
use crate::species::Species;
use serde::Serialize;

pub const TICKS_PER_MEASURE: u32 = TICKS_PER_QUARTER * 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    CantusFirmus,
    Counterpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriggerEvent {
    pub part: Part,
    pub onset_ticks: u32,
    pub length_ticks: u32,
    pub midi: u8,
    pub onset_seconds: f64,
    pub length_seconds: f64,
}

/// Tick at which a note in `species` starts.
pub fn onset_ticks(note: &Note, species: Species) -> u32 {
    let slots = u32::from(species.config().slots_per_measure.max(1));
    note.measure as u32 * TICKS_PER_MEASURE + u32::from(note.beat) * (TICKS_PER_MEASURE / slots)
}

pub fn ticks_to_seconds(ticks: u32, tempo_bpm: u16) -> f64 {
    let quarters = f64::from(ticks) / f64::from(TICKS_PER_QUARTER);
    quarters * 60.0 / f64::from(tempo_bpm.max(1))
}

fn schedule_part(notes: &[Note], species: Species, part: Part, tempo_bpm: u16) -> Vec<TriggerEvent> {
    let notes = sorted(notes);
    let mut events: Vec<TriggerEvent> = Vec::with_capacity(notes.len());
    for (i, note) in notes.iter().enumerate() {
        let tied = i > 0 && is_tie(&notes[i - 1], note, species);
        match events.last_mut() {
            Some(held) if tied => held.length_ticks += note.duration.ticks(),
            _ => events.push(TriggerEvent {
                part,
                onset_ticks: onset_ticks(note, species),
                length_ticks: note.duration.ticks(),
                midi: note.midi.clamp(0, 127) as u8,
                onset_seconds: 0.0,
                length_seconds: 0.0,
            }),
        }
    }
    for event in &mut events {
        event.onset_seconds = ticks_to_seconds(event.onset_ticks, tempo_bpm);
        event.length_seconds = ticks_to_seconds(event.length_ticks, tempo_bpm);
    }
    events
}

/// Events for one voice, sorted by onset.
pub fn schedule(notes: &[Note], species: Species, tempo_bpm: u16) -> Vec<TriggerEvent> {
    schedule_part(notes, species, Part::Counterpoint, tempo_bpm)
}

/// Events for both voices of an exercise, merged and sorted by onset. The
/// cantus firmus sits on the whole-note grid whatever the species.
pub fn schedule_exercise(
    cantus_firmus: &[Note],
    counterpoint: &[Note],
    species: Species,
    tempo_bpm: u16,
) -> Vec<TriggerEvent> {
    let mut events = schedule_part(cantus_firmus, Species::First, Part::CantusFirmus, tempo_bpm);
    events.extend(schedule_part(counterpoint, species, Part::Counterpoint, tempo_bpm));
    events.sort_by_key(|e| e.onset_ticks);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::note::Duration;

    fn note(p: &str, duration: Duration, measure: usize, beat: u8) -> Note {
        Note::new(p.parse().unwrap(), duration, measure, beat, &Key::c_major())
    }

    #[test]
    fn test_second_species_onsets() {
        let notes = [
            note("C4", Duration::Half, 1, 0),
            note("D4", Duration::Half, 0, 1),
            note("E4", Duration::Half, 0, 0),
        ];
        let events = schedule(&notes, Species::Second, 60);
        let onsets: Vec<u32> = events.iter().map(|e| e.onset_ticks).collect();
        assert_eq!(onsets, vec![0, 960, 1920]);
        assert_eq!(events[0].midi, 64);
        assert_eq!(events[1].length_ticks, 960);
        assert_eq!(events[2].onset_seconds, 4.0);
        assert_eq!(events[2].length_seconds, 2.0);
    }

    #[test]
    fn test_fifth_species_slots_are_eighths_of_a_measure() {
        let events = schedule(&[note("G4", Duration::Eighth, 2, 5)], Species::Fifth, 120);
        assert_eq!(events[0].onset_ticks, 2 * 1920 + 5 * 240);
    }

    #[test]
    fn test_tie_extends_held_note() {
        let notes = [
            note("C4", Duration::Half, 0, 1),
            note("C4", Duration::Half, 1, 0),
            note("B3", Duration::Half, 1, 1),
        ];
        let events = schedule(&notes, Species::Fourth, 60);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].onset_ticks, 960);
        assert_eq!(events[0].length_ticks, 1920);
        assert_eq!(events[1].midi, 59);
    }

    #[test]
    fn test_exercise_merges_parts() {
        let cf = [note("C3", Duration::Whole, 0, 0), note("D3", Duration::Whole, 1, 0)];
        let cp = [note("G3", Duration::Half, 0, 1), note("F3", Duration::Half, 1, 0)];
        let events = schedule_exercise(&cf, &cp, Species::Second, 90);
        let parts: Vec<(u32, Part)> = events.iter().map(|e| (e.onset_ticks, e.part)).collect();
        assert_eq!(
            parts,
            vec![
                (0, Part::CantusFirmus),
                (960, Part::Counterpoint),
                (1920, Part::CantusFirmus),
                (1920, Part::Counterpoint),
            ]
        );
    }
}
