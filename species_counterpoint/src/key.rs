// Keys, diatonic scales and the small predicates every rule leans on.
//
// A key is a spelled tonic plus a mode. The seven scale pitches are spelled
// one letter apart starting from the tonic letter, so F major yields Bb (not
// A#) and the signature falls out of the spelling: the count of sharps is
// positive, flats negative.
//
// Scale degrees are letter-based. C# in C major is still degree 1; whether
// a chromatic note is acceptable is a separate question (`contains`).
//
// Minor keys use the natural minor for spelling and the signature. The
// raised sixth and seventh are also accepted as in-key so that melodic minor
// lines and cadential leading tones are not reported as foreign notes.

use crate::error::KeyError;
use crate::interval::interval;
use crate::note::Note;
use crate::pitch::{Accidental, Letter, Pitch};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Semitones above the tonic for degrees 1-7.
    pub fn intervals(self) -> [i32; 7] {
        match self {
            Mode::Major => [0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub tonic: Letter,
    pub tonic_accidental: Accidental,
    pub mode: Mode,
    /// Sharps positive, flats negative.
    pub signature: i8,
}

impl Key {
    pub fn new(tonic: Letter, tonic_accidental: Accidental, mode: Mode) -> Result<Key, KeyError> {
        let mut key = Key {
            tonic,
            tonic_accidental,
            mode,
            signature: 0,
        };
        let mut signature = 0i32;
        for degree in 1..=7 {
            let acc = key.spell_degree(degree).ok_or_else(|| KeyError::InvalidKey(key.to_string()))?;
            signature += acc.offset();
        }
        key.signature = signature as i8;
        Ok(key)
    }

    pub fn c_major() -> Key {
        Key {
            tonic: Letter::C,
            tonic_accidental: Accidental::Natural,
            mode: Mode::Major,
            signature: 0,
        }
    }

    pub fn a_minor() -> Key {
        Key {
            tonic: Letter::A,
            tonic_accidental: Accidental::Natural,
            mode: Mode::Minor,
            signature: 0,
        }
    }

    pub fn tonic_pitch_class(&self) -> i32 {
        (self.tonic.natural_semitone() + self.tonic_accidental.offset()).rem_euclid(12)
    }

    /// Accidental carried by the given degree (1-7) in this key's scale.
    fn spell_degree(&self, degree: u8) -> Option<Accidental> {
        let d = (degree as i32 - 1).rem_euclid(7);
        let letter = Letter::from_index(self.tonic.index() + d);
        let target = self.tonic_pitch_class() + self.mode.intervals()[d as usize];
        let mut offset = (target - letter.natural_semitone()).rem_euclid(12);
        if offset > 6 {
            offset -= 12;
        }
        Accidental::from_offset(offset)
    }

    /// The seven scale letters starting from the tonic.
    pub fn scale_letters(&self) -> [Letter; 7] {
        std::array::from_fn(|d| Letter::from_index(self.tonic.index() + d as i32))
    }

    /// The scale spelled as (letter, accidental) pairs, tonic first.
    pub fn scale(&self) -> [(Letter, Accidental); 7] {
        std::array::from_fn(|d| {
            let degree = d as u8 + 1;
            let acc = self.spell_degree(degree).unwrap_or_default();
            (Letter::from_index(self.tonic.index() + d as i32), acc)
        })
    }

    pub fn leading_tone_degree(&self) -> u8 {
        7
    }

    /// Letter-based scale degree (1-7) of a pitch.
    pub fn scale_degree(&self, pitch: &Pitch) -> u8 {
        ((pitch.letter.index() - self.tonic.index()).rem_euclid(7) + 1) as u8
    }

    /// The spelled pitch of a degree, with the tonic placed in `tonic_octave`.
    /// Degrees above 7 continue into the next octave.
    pub fn pitch_for_degree(&self, degree: u8, tonic_octave: i8) -> Pitch {
        let d = degree.max(1) as i32 - 1;
        let steps = self.tonic.index() + d;
        let octave = tonic_octave as i32 + steps.div_euclid(7);
        let acc = self.spell_degree(degree).unwrap_or_default();
        Pitch::new(Letter::from_index(steps), acc, octave as i8)
    }

    pub fn tonic_pitch(&self, octave: i8) -> Pitch {
        Pitch::new(self.tonic, self.tonic_accidental, octave)
    }

    /// The note a semitone below the tonic, spelled on the seventh degree's
    /// letter. In major keys this is the diatonic seventh; in minor keys it
    /// is the raised seventh.
    pub fn raised_leading_tone(&self, tonic_octave: i8) -> Pitch {
        let tonic = self.tonic_pitch(tonic_octave);
        let letter = Letter::from_index(self.tonic.index() - 1);
        let below = Pitch::from_midi(tonic.midi() - 1).unwrap_or(tonic);
        below.respell(letter).unwrap_or(below)
    }

    /// Is the pitch's class in the scale? Minor keys also accept the raised
    /// sixth and seventh.
    pub fn contains(&self, pitch: &Pitch) -> bool {
        let rel = (pitch.midi() - self.tonic_pitch_class()).rem_euclid(12);
        if self.mode.intervals().contains(&rel) {
            return true;
        }
        self.mode == Mode::Minor && (rel == 9 || rel == 11)
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::c_major()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tonic, self.tonic_accidental.symbol())?;
        if self.mode == Mode::Minor {
            write!(f, "m")?;
        }
        Ok(())
    }
}

impl FromStr for Key {
    type Err = KeyError;

    /// Accepts "C", "F#", "Bbm", "F#m", "D minor", "Eb major".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidKey(s.to_string());
        let mut words = s.split_whitespace();
        let first = words.next().ok_or_else(invalid)?;
        let mode_word = words.next();
        if words.next().is_some() {
            return Err(invalid());
        }

        let mut chars = first.chars();
        let letter = match chars.next().map(|c| c.to_ascii_uppercase()) {
            Some('C') => Letter::C,
            Some('D') => Letter::D,
            Some('E') => Letter::E,
            Some('F') => Letter::F,
            Some('G') => Letter::G,
            Some('A') => Letter::A,
            Some('B') => Letter::B,
            _ => return Err(invalid()),
        };
        let mut rest = chars.as_str();
        let accidental = if let Some(r) = rest.strip_prefix('#') {
            rest = r;
            Accidental::Sharp
        } else if let Some(r) = rest.strip_prefix('b') {
            rest = r;
            Accidental::Flat
        } else {
            Accidental::Natural
        };

        let mode = match (rest, mode_word.map(|w| w.to_ascii_lowercase())) {
            ("", None) => Mode::Major,
            ("m", None) => Mode::Minor,
            ("", Some(w)) if w == "major" || w == "maj" => Mode::Major,
            ("", Some(w)) if w == "minor" || w == "min" => Mode::Minor,
            _ => return Err(invalid()),
        };
        Key::new(letter, accidental, mode)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Melodic step: one or two semitones.
pub fn is_step(a: &Note, b: &Note) -> bool {
    matches!((b.midi - a.midi).abs(), 1 | 2)
}

/// Melodic leap: more than two semitones.
pub fn is_leap(a: &Note, b: &Note) -> bool {
    (b.midi - a.midi).abs() > 2
}

/// Harmonic dissonance between two simultaneous notes.
pub fn is_dissonant(a: &Note, b: &Note) -> bool {
    !interval(a, b).is_consonant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Key {
        s.parse().unwrap()
    }

    #[test]
    fn test_signatures() {
        assert_eq!(key("C").signature, 0);
        assert_eq!(key("G").signature, 1);
        assert_eq!(key("D").signature, 2);
        assert_eq!(key("F").signature, -1);
        assert_eq!(key("Bb").signature, -2);
        assert_eq!(key("Am").signature, 0);
        assert_eq!(key("Dm").signature, -1);
        assert_eq!(key("F#m").signature, 3);
        assert_eq!(key("Eb major").signature, -3);
        assert_eq!(key("c minor").signature, -3);
    }

    #[test]
    fn test_scale_spelling() {
        let f = key("F");
        let spelled: Vec<String> = f
            .scale()
            .iter()
            .map(|(l, a)| format!("{l}{}", a.symbol()))
            .collect();
        assert_eq!(spelled, vec!["F", "G", "A", "Bb", "C", "D", "E"]);
        assert_eq!(
            key("Dm").scale_letters(),
            [Letter::D, Letter::E, Letter::F, Letter::G, Letter::A, Letter::B, Letter::C]
        );
    }

    #[test]
    fn test_scale_degree_is_letter_based() {
        let c = Key::c_major();
        assert_eq!(c.scale_degree(&"C4".parse().unwrap()), 1);
        assert_eq!(c.scale_degree(&"C#4".parse().unwrap()), 1);
        assert_eq!(c.scale_degree(&"B3".parse().unwrap()), 7);
        assert_eq!(key("Am").scale_degree(&"G#3".parse().unwrap()), 7);
    }

    #[test]
    fn test_pitch_for_degree_crosses_octave() {
        let a = Key::a_minor();
        assert_eq!(a.pitch_for_degree(1, 3).to_string(), "A3");
        assert_eq!(a.pitch_for_degree(3, 3).to_string(), "C4");
        assert_eq!(a.pitch_for_degree(8, 3).to_string(), "A4");
        assert_eq!(key("Eb").pitch_for_degree(4, 4).to_string(), "Ab4");
    }

    #[test]
    fn test_raised_leading_tone() {
        assert_eq!(Key::a_minor().raised_leading_tone(3).to_string(), "G#3");
        assert_eq!(key("Cm").raised_leading_tone(3).to_string(), "B2");
        assert_eq!(key("Dm").raised_leading_tone(4).to_string(), "C#4");
        assert_eq!(Key::c_major().raised_leading_tone(4).to_string(), "B3");
    }

    #[test]
    fn test_contains() {
        let a = Key::a_minor();
        assert!(a.contains(&"G3".parse().unwrap()));
        assert!(a.contains(&"G#3".parse().unwrap()));
        assert!(a.contains(&"F#3".parse().unwrap()));
        assert!(!a.contains(&"C#4".parse().unwrap()));
        assert!(!Key::c_major().contains(&"F#4".parse().unwrap()));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(key("F#m").to_string(), "F#m");
        assert_eq!(key("bb").to_string(), "Bb");
        assert_eq!(key("D minor").to_string(), "Dm");
        for bad in ["", "H", "Cx", "C dorian", "C major extra", "Cmm"] {
            assert!(bad.parse::<Key>().is_err(), "{bad:?} should not parse");
        }
    }
}
