// One editable voice of an exercise.
//
// `VoiceLine` is the surface an input layer drives: it keeps the notes in
// grid order, refuses beat slots the species grid does not have, and models
// every edit as remove-then-insert. Inserting onto an occupied slot
// replaces the occupant and hands it back. The rules never see a
// `VoiceLine`; they get a snapshot through `RuleContext::from_voices`.

use crate::error::VoiceError;
use crate::note::Note;
use crate::species::Species;

#[derive(Debug, Clone, PartialEq)]
pub struct VoiceLine {
    species: Species,
    notes: Vec<Note>,
}

impl VoiceLine {
    pub fn new(species: Species) -> Self {
        VoiceLine {
            species,
            notes: Vec::new(),
        }
    }

    /// Build a voice from notes in any order. Later notes replace earlier
    /// ones on the same slot.
    pub fn from_notes(species: Species, notes: impl IntoIterator<Item = Note>) -> Result<Self, VoiceError> {
        let mut line = Self::new(species);
        for note in notes {
            line.insert_note(note)?;
        }
        Ok(line)
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn into_notes(self) -> Vec<Note> {
        self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, measure: usize, beat: u8) -> Option<&Note> {
        self.position(measure, beat).ok().map(|i| &self.notes[i])
    }

    /// Insert a note, returning whatever previously occupied its slot.
    pub fn insert_note(&mut self, note: Note) -> Result<Option<Note>, VoiceError> {
        let slots = self.species.config().slots_per_measure;
        if note.beat >= slots {
            return Err(VoiceError::SlotOutOfGrid { beat: note.beat, slots });
        }
        let replaced = self.remove_note(note.measure, note.beat);
        let at = self.position(note.measure, note.beat).unwrap_or_else(|i| i);
        self.notes.insert(at, note);
        Ok(replaced)
    }

    pub fn remove_note(&mut self, measure: usize, beat: u8) -> Option<Note> {
        self.position(measure, beat).ok().map(|i| self.notes.remove(i))
    }

    pub fn clear(&mut self) {
        self.notes.clear();
    }

    fn position(&self, measure: usize, beat: u8) -> Result<usize, usize> {
        self.notes.binary_search_by_key(&(measure, beat), Note::slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::note::Duration;

    fn half(p: &str, measure: usize, beat: u8) -> Note {
        Note::new(p.parse().unwrap(), Duration::Half, measure, beat, &Key::c_major())
    }

    #[test]
    fn test_insert_keeps_grid_order() {
        let mut line = VoiceLine::new(Species::Second);
        line.insert_note(half("E4", 1, 0)).unwrap();
        line.insert_note(half("C4", 0, 0)).unwrap();
        line.insert_note(half("D4", 0, 1)).unwrap();
        let midis: Vec<i32> = line.notes().iter().map(|n| n.midi).collect();
        assert_eq!(midis, vec![60, 62, 64]);
    }

    #[test]
    fn test_insert_replaces_occupant() {
        let mut line = VoiceLine::new(Species::Second);
        line.insert_note(half("C4", 0, 0)).unwrap();
        let old = line.insert_note(half("G4", 0, 0)).unwrap();
        assert_eq!(old.map(|n| n.midi), Some(60));
        assert_eq!(line.len(), 1);
        assert_eq!(line.get(0, 0).map(|n| n.midi), Some(67));
    }

    #[test]
    fn test_slot_outside_grid_rejected() {
        let mut line = VoiceLine::new(Species::Second);
        assert_eq!(
            line.insert_note(half("C4", 0, 2)),
            Err(VoiceError::SlotOutOfGrid { beat: 2, slots: 2 })
        );
        assert!(line.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut line = VoiceLine::from_notes(Species::Second, [half("C4", 0, 0), half("D4", 0, 1)]).unwrap();
        assert_eq!(line.remove_note(0, 1).map(|n| n.midi), Some(62));
        assert_eq!(line.remove_note(0, 1), None);
        assert_eq!(line.len(), 1);
    }
}
