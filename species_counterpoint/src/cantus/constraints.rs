// Candidate filtering and weighted selection for the cantus firmus
// generator.
//
// The pool is every scale degree in the three octaves around the tonic
// (tonic octave -1 ..= +1). Minor keys add the raised leading tone at the
// second-to-last position. A candidate survives only if, measured against
// the melody so far:
//
//   - it does not repeat the previous pitch
//   - it stays within an octave of the opening note
//   - the move into it is at most a perfect fifth and never a tritone
//   - after a leap of a fourth or more it steps back the other way
//   - it does not make two leaps in a row in one direction
//   - it does not make a third leap in a row
//
// `weighted_pick` favors steps: 0.6 for up to a whole tone, 0.3 for a
// third, 0.1 for anything larger.

use crate::key::{Key, Mode};
use crate::pitch::Pitch;
use species_prng::RandomSource;

const MAX_SPAN: i32 = 12;
const MAX_LEAP: i32 = 7;
const TRITONE: i32 = 6;
const RECOVERY_THRESHOLD: i32 = 5;

/// The melody under construction.
#[derive(Debug, Clone, Copy)]
pub struct MelodyState<'a> {
    pub key: &'a Key,
    pub tonic_octave: i8,
    /// Final length of the melody, cadence included.
    pub length: usize,
    /// Pitches placed so far, starting with the opening tonic.
    pub pitches: &'a [Pitch],
}

impl MelodyState<'_> {
    /// Signed semitone moves between the placed pitches.
    fn moves(&self) -> Vec<i32> {
        self.pitches.windows(2).map(|w| w[1].midi() - w[0].midi()).collect()
    }
}

fn is_leap(semitones: i32) -> bool {
    semitones.abs() > 2
}

/// Whether `cand` may follow the pitches placed so far. The closing tonic
/// goes through the same test as every other note.
pub fn admits(state: &MelodyState, cand: &Pitch) -> bool {
    let (Some(first), Some(last)) = (state.pitches.first(), state.pitches.last()) else {
        return false;
    };
    let step = cand.midi() - last.midi();
    if step == 0 || step.abs() > MAX_LEAP || step.abs() == TRITONE {
        return false;
    }
    if (cand.midi() - first.midi()).abs() > MAX_SPAN {
        return false;
    }
    match state.moves().as_slice() {
        [.., prev] if prev.abs() >= RECOVERY_THRESHOLD => step.abs() <= 2 && step.signum() != prev.signum(),
        [.., before, prev] if is_leap(step) && is_leap(*prev) && is_leap(*before) => false,
        [.., prev] if is_leap(step) && is_leap(*prev) && step.signum() == prev.signum() => false,
        _ => true,
    }
}

/// Every pitch the melody may take at `position`. Candidates come back in
/// ascending pitch order.
pub fn candidates(state: &MelodyState, position: usize) -> Vec<Pitch> {
    if state.pitches.is_empty() {
        return Vec::new();
    }
    let mut pool: Vec<Pitch> = (state.tonic_octave - 1..=state.tonic_octave + 1)
        .flat_map(|octave| (1..=7).map(move |degree| (degree, octave)))
        .map(|(degree, octave)| state.key.pitch_for_degree(degree, octave))
        .collect();
    if state.key.mode == Mode::Minor && position + 2 == state.length {
        pool.push(state.key.raised_leading_tone(state.tonic_octave));
    }
    pool.sort_by_key(Pitch::midi);
    pool.dedup_by_key(|p| p.midi());

    pool.into_iter().filter(|cand| admits(state, cand)).collect()
}

/// Selection weight of a move of `semitones`.
pub fn weight(semitones: i32) -> f64 {
    match semitones.abs() {
        0..=2 => 0.6,
        3..=4 => 0.3,
        _ => 0.1,
    }
}

/// Choose one candidate, favoring small moves from `previous`. Draws
/// exactly one value from `rng` unless `candidates` is empty.
pub fn weighted_pick(candidates: &[Pitch], previous: &Pitch, rng: &mut dyn RandomSource) -> Option<Pitch> {
    if candidates.is_empty() {
        return None;
    }
    let weights: Vec<f64> = candidates
        .iter()
        .map(|c| weight(c.midi() - previous.midi()))
        .collect();
    let total: f64 = weights.iter().sum();
    let target = rng.next_f64() * total;
    let mut cumulative = 0.0;
    for (cand, w) in candidates.iter().zip(&weights) {
        cumulative += w;
        if target < cumulative {
            return Some(*cand);
        }
    }
    candidates.last().copied()
}
