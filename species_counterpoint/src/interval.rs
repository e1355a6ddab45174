// Harmonic intervals and relative motion between the two voices.
//
// `interval` classifies the vertical distance between two notes. The degree
// is diatonic (letter distance + 1, growing by 7 per octave) and the quality
// comes from comparing the octave-reduced semitone count against the
// reference size of that degree:
//
//   degree:      1  2  3  4  5  6  7
//   reference:   0  2  4  5  7  9  11   (perfect or major)
//
// Perfect-type degrees (1, 4, 5) are perfect at the reference, augmented
// above it and diminished below. The others are major at the reference,
// minor one semitone below, diminished further below, augmented above.
//
// Consonant: perfect unison/fifth/octave (and their compounds), major or
// minor thirds and sixths. Everything else, including every fourth and any
// interval of exactly six semitones, is dissonant.
//
// `classify_motion` follows the usual four-way split. Parallel motion means
// the same octave-reduced interval before and after; so a fifth moving to a
// twelfth by same-direction motion counts as parallel fifths.

use crate::note::Note;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Perfect,
    Major,
    Minor,
    Augmented,
    Diminished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// 1 = unison, 2 = second, ..., 8 = octave, 12 = twelfth.
    pub degree: u8,
    pub quality: Quality,
    /// Absolute distance in semitones.
    pub semitones: u8,
    pub is_consonant: bool,
}

const REFERENCE_SEMITONES: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

impl Interval {
    /// Degree reduced into 1-7 (octave -> 1, tenth -> 3).
    pub fn simple_degree(&self) -> u8 {
        (self.degree - 1) % 7 + 1
    }

    pub fn is_perfect_fifth(&self) -> bool {
        self.simple_degree() == 5 && self.quality == Quality::Perfect
    }

    /// Perfect unison, octave, or any compound octave.
    pub fn is_perfect_octave(&self) -> bool {
        self.simple_degree() == 1 && self.quality == Quality::Perfect
    }

    pub fn is_perfect_consonance(&self) -> bool {
        self.is_perfect_fifth() || self.is_perfect_octave()
    }

    pub fn is_unison(&self) -> bool {
        self.degree == 1 && self.quality == Quality::Perfect
    }

    pub fn is_tritone(&self) -> bool {
        self.semitones % 12 == 6
    }

    pub fn is_third_or_sixth(&self) -> bool {
        matches!(self.simple_degree(), 3 | 6) && matches!(self.quality, Quality::Major | Quality::Minor)
    }

    /// Same octave-reduced size and quality.
    pub fn same_class(&self, other: &Interval) -> bool {
        self.simple_degree() == other.simple_degree() && self.quality == other.quality
    }

    pub fn name(&self) -> String {
        let quality = match self.quality {
            Quality::Perfect => "perfect",
            Quality::Major => "major",
            Quality::Minor => "minor",
            Quality::Augmented => "augmented",
            Quality::Diminished => "diminished",
        };
        let size = match self.degree {
            1 => "unison".to_string(),
            2 => "second".to_string(),
            3 => "third".to_string(),
            4 => "fourth".to_string(),
            5 => "fifth".to_string(),
            6 => "sixth".to_string(),
            7 => "seventh".to_string(),
            8 => "octave".to_string(),
            n => format!("{n}th"),
        };
        format!("{quality} {size}")
    }
}

/// Classify the vertical interval between two notes. Order does not matter.
pub fn interval(a: &Note, b: &Note) -> Interval {
    let (low, high) = if (b.midi, b.pitch.diatonic_index()) >= (a.midi, a.pitch.diatonic_index()) {
        (a, b)
    } else {
        (b, a)
    };
    let semitones = (high.midi - low.midi).unsigned_abs();
    let steps = (high.pitch.diatonic_index() - low.pitch.diatonic_index()).unsigned_abs();
    let degree = (steps + 1) as u8;

    let simple = (steps % 7) as usize;
    let octaves = (steps / 7) as i32;
    let reduced = semitones as i32 - 12 * octaves;
    let diff = reduced - REFERENCE_SEMITONES[simple];

    let perfect_type = matches!(simple, 0 | 3 | 4);
    let quality = if perfect_type {
        match diff {
            0 => Quality::Perfect,
            d if d > 0 => Quality::Augmented,
            _ => Quality::Diminished,
        }
    } else {
        match diff {
            0 => Quality::Major,
            -1 => Quality::Minor,
            d if d > 0 => Quality::Augmented,
            _ => Quality::Diminished,
        }
    };

    let is_consonant = semitones % 12 != 6
        && match simple {
            0 | 4 => quality == Quality::Perfect,
            2 | 5 => matches!(quality, Quality::Major | Quality::Minor),
            _ => false,
        };

    Interval {
        degree,
        quality,
        semitones: semitones.min(u8::MAX as u32) as u8,
        is_consonant,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionType {
    Parallel,
    Similar,
    Contrary,
    Oblique,
}

/// Relative motion of the two voices across one time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoiceMotion {
    pub motion: MotionType,
    pub cf_from: Note,
    pub cf_to: Note,
    pub cp_from: Note,
    pub cp_to: Note,
    pub before: Interval,
    pub after: Interval,
}

impl VoiceMotion {
    pub fn new(cf_from: &Note, cf_to: &Note, cp_from: &Note, cp_to: &Note) -> Self {
        VoiceMotion {
            motion: classify_motion(cf_from, cf_to, cp_from, cp_to),
            cf_from: *cf_from,
            cf_to: *cf_to,
            cp_from: *cp_from,
            cp_to: *cp_to,
            before: interval(cf_from, cp_from),
            after: interval(cf_to, cp_to),
        }
    }

    /// The four notes in time order, cantus firmus first.
    pub fn notes(&self) -> Vec<Note> {
        vec![self.cf_from, self.cf_to, self.cp_from, self.cp_to]
    }
}

pub fn classify_motion(cf1: &Note, cf2: &Note, cp1: &Note, cp2: &Note) -> MotionType {
    let cf_dir = (cf2.midi - cf1.midi).signum();
    let cp_dir = (cp2.midi - cp1.midi).signum();
    if cf_dir == 0 || cp_dir == 0 {
        return MotionType::Oblique;
    }
    if cf_dir != cp_dir {
        return MotionType::Contrary;
    }
    if interval(cf1, cp1).same_class(&interval(cf2, cp2)) {
        MotionType::Parallel
    } else {
        MotionType::Similar
    }
}
