// Spelled pitches and their MIDI numbers.
//
// A pitch keeps its spelling (letter + accidental + octave) because interval
// classification is diatonic: C#4-Eb4 and C#4-D#4 share a MIDI distance but
// are a diminished third and a major second respectively. The MIDI number is
// derived with `midi = (octave + 1) * 12 + semitone(letter, accidental)`,
// so B#3 and C4 are both 60.
//
// Text form: letter, optional accidental (`#`, `##`/`x`, `b`, `bb`), octave
// (may be negative). "C4", "F#3", "Bb2", "Fx5", "Ebb4", "C-1".

use crate::error::PitchError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub const ALL: [Letter; 7] = [
        Letter::C,
        Letter::D,
        Letter::E,
        Letter::F,
        Letter::G,
        Letter::A,
        Letter::B,
    ];

    /// Position within the octave starting from C (C = 0 ... B = 6).
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(index: i32) -> Letter {
        Letter::ALL[index.rem_euclid(7) as usize]
    }

    /// Semitones above C of the natural letter.
    pub fn natural_semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    fn from_char(c: char) -> Option<Letter> {
        match c.to_ascii_uppercase() {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Accidental {
    DoubleFlat,
    Flat,
    #[default]
    Natural,
    Sharp,
    DoubleSharp,
}

impl Accidental {
    pub fn offset(self) -> i32 {
        match self {
            Accidental::DoubleFlat => -2,
            Accidental::Flat => -1,
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
        }
    }

    pub fn from_offset(offset: i32) -> Option<Accidental> {
        match offset {
            -2 => Some(Accidental::DoubleFlat),
            -1 => Some(Accidental::Flat),
            0 => Some(Accidental::Natural),
            1 => Some(Accidental::Sharp),
            2 => Some(Accidental::DoubleSharp),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Accidental::DoubleFlat => "bb",
            Accidental::Flat => "b",
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
        }
    }
}

/// A spelled pitch. Immutable value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub letter: Letter,
    pub accidental: Accidental,
    pub octave: i8,
}

impl Pitch {
    pub fn new(letter: Letter, accidental: Accidental, octave: i8) -> Self {
        Pitch {
            letter,
            accidental,
            octave,
        }
    }

    pub fn natural(letter: Letter, octave: i8) -> Self {
        Self::new(letter, Accidental::Natural, octave)
    }

    pub fn midi(&self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.letter.natural_semitone() + self.accidental.offset()
    }

    /// Pitch class 0-11 (C = 0).
    pub fn pitch_class(&self) -> u8 {
        self.midi().rem_euclid(12) as u8
    }

    /// Number of diatonic steps above C-1 (octave * 7 + letter index).
    pub fn diatonic_index(&self) -> i32 {
        (self.octave as i32 + 1) * 7 + self.letter.index()
    }

    /// Spell a MIDI number using sharps.
    pub fn from_midi(midi: i32) -> Result<Pitch, PitchError> {
        if !(0..=127).contains(&midi) {
            return Err(PitchError::MidiOutOfRange(midi));
        }
        const SPELLING: [(Letter, Accidental); 12] = [
            (Letter::C, Accidental::Natural),
            (Letter::C, Accidental::Sharp),
            (Letter::D, Accidental::Natural),
            (Letter::D, Accidental::Sharp),
            (Letter::E, Accidental::Natural),
            (Letter::F, Accidental::Natural),
            (Letter::F, Accidental::Sharp),
            (Letter::G, Accidental::Natural),
            (Letter::G, Accidental::Sharp),
            (Letter::A, Accidental::Natural),
            (Letter::A, Accidental::Sharp),
            (Letter::B, Accidental::Natural),
        ];
        let (letter, accidental) = SPELLING[(midi % 12) as usize];
        Ok(Pitch::new(letter, accidental, (midi / 12 - 1) as i8))
    }

    /// Respell at the given letter, keeping the MIDI number. Returns None if
    /// that would need more than a double accidental.
    pub fn respell(&self, letter: Letter) -> Option<Pitch> {
        let midi = self.midi();
        // Try the octave whose natural letter sits nearest the target.
        for octave in [self.octave - 1, self.octave, self.octave + 1] {
            let natural = Pitch::natural(letter, octave).midi();
            if let Some(acc) = Accidental::from_offset(midi - natural) {
                return Some(Pitch::new(letter, acc, octave));
            }
        }
        None
    }
}

impl FromStr for Pitch {
    type Err = PitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PitchError::InvalidPitchFormat(s.to_string());
        let text = s.trim();
        let mut chars = text.chars();
        let letter = chars.next().and_then(Letter::from_char).ok_or_else(invalid)?;
        let rest = chars.as_str();

        let (accidental, octave_text) = if let Some(r) = rest.strip_prefix("##") {
            (Accidental::DoubleSharp, r)
        } else if let Some(r) = rest.strip_prefix('x') {
            (Accidental::DoubleSharp, r)
        } else if let Some(r) = rest.strip_prefix('#') {
            (Accidental::Sharp, r)
        } else if let Some(r) = rest.strip_prefix("bb") {
            (Accidental::DoubleFlat, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (Accidental::Flat, r)
        } else {
            (Accidental::Natural, rest)
        };

        let digits = octave_text.strip_prefix('-').unwrap_or(octave_text);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let octave: i8 = octave_text.parse().map_err(|_| invalid())?;
        if !(-1..=9).contains(&octave) {
            return Err(invalid());
        }
        let pitch = Pitch::new(letter, accidental, octave);
        // Spellings at the octave extremes can still leave MIDI range.
        if !(0..=127).contains(&pitch.midi()) {
            return Err(invalid());
        }
        Ok(pitch)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.letter, self.accidental.symbol(), self.octave)
    }
}

impl Serialize for Pitch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pitch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Decode a pitch string straight to its MIDI number.
pub fn pitch_to_midi(text: &str) -> Result<i32, PitchError> {
    Ok(text.parse::<Pitch>()?.midi())
}

/// Spell a MIDI number as text (sharps).
pub fn midi_to_pitch(midi: i32) -> Result<String, PitchError> {
    Ok(Pitch::from_midi(midi)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_midi() {
        assert_eq!(pitch_to_midi("C4"), Ok(60));
        assert_eq!(pitch_to_midi("A4"), Ok(69));
        assert_eq!(pitch_to_midi("C-1"), Ok(0));
        assert_eq!(pitch_to_midi("F#3"), Ok(54));
        assert_eq!(pitch_to_midi("Bb2"), Ok(46));
        assert_eq!(pitch_to_midi("Fx5"), Ok(79));
        assert_eq!(pitch_to_midi("F##5"), Ok(79));
        assert_eq!(pitch_to_midi("Ebb4"), Ok(62));
        // Enharmonic spellings across the octave boundary.
        assert_eq!(pitch_to_midi("B#3"), Ok(60));
        assert_eq!(pitch_to_midi("Cb4"), Ok(59));
    }

    #[test]
    fn test_invalid_formats() {
        for bad in ["", "H4", "C", "C#", "4C", "Cq4", "C4.5", "C--1", "C12"] {
            assert_eq!(
                bad.parse::<Pitch>(),
                Err(PitchError::InvalidPitchFormat(bad.to_string())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_midi_round_trip() {
        // Every spelling maps back to the same MIDI number, even when the
        // respelled text differs (Db4 -> C#4).
        for letter in Letter::ALL {
            for acc in [
                Accidental::DoubleFlat,
                Accidental::Flat,
                Accidental::Natural,
                Accidental::Sharp,
                Accidental::DoubleSharp,
            ] {
                for octave in 0..=8 {
                    let p = Pitch::new(letter, acc, octave);
                    let text = midi_to_pitch(p.midi()).unwrap();
                    assert_eq!(pitch_to_midi(&text), Ok(p.midi()), "{p} -> {text}");
                }
            }
        }
    }

    #[test]
    fn test_parse_rejects_spellings_beyond_midi_range() {
        for bad in ["G#9", "B#9", "A9", "Cb-1", "Cbb-1"] {
            assert_eq!(
                bad.parse::<Pitch>(),
                Err(PitchError::InvalidPitchFormat(bad.to_string())),
                "{bad:?} should not parse"
            );
        }
        for (text, midi) in [("G9", 127), ("Abb9", 127), ("C-1", 0), ("B#-1", 12)] {
            assert_eq!(pitch_to_midi(text), Ok(midi), "{text}");
            let back = midi_to_pitch(midi).unwrap();
            assert_eq!(pitch_to_midi(&back), Ok(midi), "{text} -> {back}");
        }
    }

    #[test]
    fn test_from_midi_out_of_range() {
        assert_eq!(Pitch::from_midi(128), Err(PitchError::MidiOutOfRange(128)));
        assert_eq!(Pitch::from_midi(-1), Err(PitchError::MidiOutOfRange(-1)));
    }

    #[test]
    fn test_display() {
        let p: Pitch = "Fx5".parse().unwrap();
        assert_eq!(p.to_string(), "F##5");
        assert_eq!("eb3".parse::<Pitch>().unwrap().to_string(), "Eb3");
    }

    #[test]
    fn test_respell() {
        let cs: Pitch = "C#4".parse().unwrap();
        let db = cs.respell(Letter::D).unwrap();
        assert_eq!(db.to_string(), "Db4");
        let c: Pitch = "C4".parse().unwrap();
        assert_eq!(c.respell(Letter::B).unwrap().to_string(), "B#3");
        assert_eq!(c.respell(Letter::F), None);
    }
}
