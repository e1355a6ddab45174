// MIDI output for two-voice exercises.
//
// Writes the playback schedule as a Standard MIDI File (SMF Format 1): a
// tempo track, then one track for the cantus firmus and one for the
// counterpoint. Event timing comes straight from playback.rs, so ties are
// held notes here too.
//
// Uses the `midly` crate for MIDI writing.

use crate::note::{Note, TICKS_PER_QUARTER};
use crate::playback::{Part, TriggerEvent, schedule_exercise};
use crate::species::Species;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Church organ, for both parts.
const PROGRAM: u8 = 19;
const VELOCITY: u8 = 80;

/// Write an exercise to a MIDI file.
pub fn write_exercise(
    cantus_firmus: &[Note],
    counterpoint: &[Note],
    species: Species,
    tempo_bpm: u16,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let smf = exercise_to_smf(cantus_firmus, counterpoint, species, tempo_bpm);
    let mut buf = Vec::new();
    smf.write(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}

fn exercise_to_smf(cantus_firmus: &[Note], counterpoint: &[Note], species: Species, tempo_bpm: u16) -> Smf<'static> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER as u16)),
    ));

    let tempo_microseconds = 60_000_000 / u32::from(tempo_bpm.max(1));
    smf.tracks.push(vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_microseconds))),
        },
        end_of_track(),
    ]);

    let events = schedule_exercise(cantus_firmus, counterpoint, species, tempo_bpm);
    let parts = [
        (Part::CantusFirmus, "Cantus firmus", u4::new(0)),
        (Part::Counterpoint, "Counterpoint", u4::new(1)),
    ];
    for (part, name, channel) in parts {
        let part_events: Vec<&TriggerEvent> = events.iter().filter(|e| e.part == part).collect();
        smf.tracks.push(part_track(name, channel, &part_events));
    }
    smf
}

fn part_track(name: &'static str, channel: u4, events: &[&TriggerEvent]) -> Track<'static> {
    let mut track: Track<'static> = vec![
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
        },
        TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::ProgramChange { program: u7::new(PROGRAM) },
            },
        },
    ];

    // (tick, is_on, key); offs sort before ons at the same tick.
    let mut timeline: Vec<(u32, bool, u8)> = Vec::with_capacity(events.len() * 2);
    for e in events {
        timeline.push((e.onset_ticks, true, e.midi));
        timeline.push((e.onset_ticks + e.length_ticks, false, e.midi));
    }
    timeline.sort();

    let mut last_tick = 0;
    for (tick, is_on, key) in timeline {
        let key = u7::new(key.min(127));
        let message = if is_on {
            MidiMessage::NoteOn { key, vel: u7::new(VELOCITY) }
        } else {
            MidiMessage::NoteOff { key, vel: u7::new(0) }
        };
        track.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    track.push(end_of_track());
    track
}

fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::note::Duration;

    fn whole(p: &str, measure: usize) -> Note {
        Note::whole(p.parse().unwrap(), measure, &Key::c_major())
    }

    #[test]
    fn test_exercise_to_smf_tracks() {
        let cf = [whole("C3", 0), whole("D3", 1), whole("C3", 2)];
        let cp = [whole("C4", 0), whole("B3", 1), whole("C4", 2)];
        let smf = exercise_to_smf(&cf, &cp, Species::First, 72);
        // Tempo track + two parts.
        assert_eq!(smf.tracks.len(), 3);
        // Name, program, three on/off pairs, end of track.
        assert_eq!(smf.tracks[1].len(), 2 + 6 + 1);
        assert_eq!(smf.tracks[2].len(), 2 + 6 + 1);
    }

    #[test]
    fn test_note_off_precedes_next_note_on() {
        let key = Key::c_major();
        let cp = [
            Note::new("E4".parse().unwrap(), Duration::Half, 0, 0, &key),
            Note::new("E4".parse().unwrap(), Duration::Half, 0, 1, &key),
        ];
        let smf = exercise_to_smf(&[], &cp, Species::Second, 60);
        let kinds: Vec<(u32, bool)> = smf.tracks[2][2..6]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi { message: MidiMessage::NoteOn { .. }, .. } => Some((e.delta.as_int(), true)),
                TrackEventKind::Midi { message: MidiMessage::NoteOff { .. }, .. } => Some((e.delta.as_int(), false)),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![(0, true), (960, false), (0, true), (960, false)]);
    }

    #[test]
    fn test_write_exercise_round_trips_through_midly() {
        let cf = [whole("D3", 0), whole("E3", 1), whole("D3", 2)];
        let cp = [whole("A3", 0), whole("G3", 1), whole("F#3", 2)];
        let path = std::env::temp_dir().join(format!("counterpoint_midi_test_{}.mid", std::process::id()));
        write_exercise(&cf, &cp, Species::First, 80, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 3);
        std::fs::remove_file(&path).ok();
    }
}
