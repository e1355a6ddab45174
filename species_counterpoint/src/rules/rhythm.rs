// Rhythm rules: durations and placement on the species grid.
//
// The grid is `SpeciesConfig::slots_per_measure` slots wide. In fifth
// species the grid is eighth notes, so a half note may only start on slot 0
// or 4 and a quarter on an even slot.

use super::{
    ALL_SPECIES, Category, FIFTH_ONLY, FOURTH_ONLY, Rule, RuleContext, RuleDef, RuleKind, RuleOutcome,
    Severity,
};
use crate::note::{Duration, Note};
use crate::sequence;
use crate::species::{NotesPerMeasure, Species};
use std::collections::BTreeSet;

pub fn rules() -> Vec<Rule> {
    let defs = [
        RuleDef {
            kind: RuleKind::SpeciesDuration,
            id: "species-duration",
            name: "Duration not allowed",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "Every counterpoint note must use a duration the species allows.",
            explanation: "Each species is defined by its rhythm: whole notes, halves, quarters, syncopated halves, or a mix.",
        },
        RuleDef {
            kind: RuleKind::SpeciesGrid,
            id: "species-grid",
            name: "Off the beat grid",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "Notes must start on a slot of the species grid that fits their duration.",
            explanation: "Notes that start between the beats of the species do not belong to its rhythm.",
        },
        RuleDef {
            kind: RuleKind::MeasureCoverage,
            id: "measure-coverage",
            name: "Measure not filled",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "Each measure should hold the number of notes the species calls for.",
            explanation: "Missing or extra notes break the steady ratio of counterpoint notes to cantus firmus notes.",
        },
        RuleDef {
            kind: RuleKind::CounterpointOverrun,
            id: "counterpoint-overrun",
            name: "Counterpoint outlasts the cantus firmus",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The counterpoint must not continue past the last cantus firmus measure.",
            explanation: "Both voices begin and end together; there is nothing to set the extra notes against.",
        },
        RuleDef {
            kind: RuleKind::S4SyncopationContinuity,
            id: "s4-syncopation-continuity",
            name: "Broken syncopation",
            severity: Severity::Warning,
            species: FOURTH_ONLY,
            description: "Each weak-beat note should be tied over the barline until the cadence.",
            explanation: "Fourth species is a chain of syncopations; breaking the tie should be the exception.",
        },
        RuleDef {
            kind: RuleKind::S5RhythmicVariety,
            id: "s5-rhythmic-variety",
            name: "Rhythmic variety",
            severity: Severity::Warning,
            species: FIFTH_ONLY,
            description: "Florid counterpoint should mix note values.",
            explanation: "Fifth species combines the rhythms of the other species; a single note value makes it one of them.",
        },
        RuleDef {
            kind: RuleKind::S5EighthPairs,
            id: "s5-eighth-pairs",
            name: "Eighth notes in pairs",
            severity: Severity::Warning,
            species: FIFTH_ONLY,
            description: "Eighth notes come in pairs on the second or fourth quarter of the measure.",
            explanation: "In the strict style eighths appear only as a pair of quick notes on a weak quarter.",
        },
        RuleDef {
            kind: RuleKind::UniqueSlots,
            id: "unique-slots",
            name: "Two notes in one slot",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "A voice may sound only one note at each position.",
            explanation: "Each voice is a single melodic line; two notes at once make it a chord.",
        },
    ];
    defs.into_iter().map(|d| d.into_rule(Category::Rhythm)).collect()
}

pub fn species_duration(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let allowed = ctx.config().allowed_durations;
    Ok(ctx
        .counterpoint
        .iter()
        .filter(|n| !allowed.contains(&n.duration))
        .map(|n| rule.violation(n, format!("{:?} notes are not used in {}", n.duration, ctx.species), &[*n]))
        .collect())
}

/// Grid slots covered by a duration in fifth species (eighth-note grid).
fn fifth_species_span(duration: Duration) -> u8 {
    match duration {
        Duration::Whole => 8,
        Duration::Half => 4,
        Duration::Quarter => 2,
        Duration::Eighth | Duration::Sixteenth => 1,
    }
}

pub fn species_grid(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let slots = ctx.config().slots_per_measure;
    Ok(ctx
        .counterpoint
        .iter()
        .filter_map(|n| {
            if n.beat >= slots {
                return Some(rule.violation(n, format!("beat {} is outside the {slots}-slot grid", n.beat), &[*n]));
            }
            let aligned = ctx.species != Species::Fifth || n.beat % fifth_species_span(n.duration) == 0;
            (!aligned).then(|| rule.violation(n, format!("{:?} note cannot start on slot {}", n.duration, n.beat), &[*n]))
        })
        .collect())
}

/// Allowed note count (min, max) for measure `m` of `last`.
fn expected_count(species: Species, m: usize, last: usize) -> (usize, usize) {
    match species.config().notes_per_measure {
        NotesPerMeasure::Fixed(1) => (1, 1),
        // The final measure is a whole note; the first may open with a rest.
        NotesPerMeasure::Fixed(n) if m == last => (1, n as usize),
        NotesPerMeasure::Fixed(n) if m == 0 => (n as usize - 1, n as usize),
        NotesPerMeasure::Fixed(n) => (n as usize, n as usize),
        NotesPerMeasure::Variable => (1, species.config().slots_per_measure as usize),
    }
}

pub fn measure_coverage(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(last) = sequence::last_measure(&ctx.cantus_firmus) else {
        return Ok(vec![]);
    };
    let mut out = Vec::new();
    for m in 0..=last {
        let notes: Vec<Note> = sequence::notes_in_measure(&ctx.counterpoint, m).copied().collect();
        let (min, max) = expected_count(ctx.species, m, last);
        if notes.len() < min || notes.len() > max {
            let wanted = if min == max { min.to_string() } else { format!("{min}-{max}") };
            out.push(rule.measure_violation(
                m,
                format!("{} notes in measure {}, expected {wanted}", notes.len(), m + 1),
                &notes,
            ));
        }
    }
    Ok(out)
}

pub fn counterpoint_overrun(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(last) = sequence::last_measure(&ctx.cantus_firmus) else {
        return Ok(vec![]);
    };
    Ok(ctx
        .counterpoint
        .iter()
        .filter(|n| n.measure > last)
        .map(|n| rule.violation(n, format!("{} is past the end of the cantus firmus", n), &[*n]))
        .collect())
}

pub fn s4_syncopation_continuity(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(last) = sequence::last_measure(&ctx.cantus_firmus) else {
        return Ok(vec![]);
    };
    let notes = &ctx.counterpoint;
    Ok(notes
        .iter()
        .enumerate()
        // The penultimate measure resolves into the final; no tie expected there.
        .filter(|(_, n)| !n.is_downbeat() && n.measure + 1 < last)
        .filter(|(i, n)| notes.get(i + 1).is_none_or(|next| !sequence::is_tie(n, next, ctx.species)))
        .map(|(_, n)| rule.violation(n, format!("{} is not tied into measure {}", n.pitch, n.measure + 2), &[*n]))
        .collect())
}

pub fn s5_rhythmic_variety(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    if notes.len() < 4 {
        return Ok(vec![]);
    }
    // The closing whole note does not count toward variety.
    let body = &notes[..notes.len() - 1];
    let values: BTreeSet<u32> = body.iter().map(|n| n.duration.ticks()).collect();
    if values.len() >= 2 {
        return Ok(vec![]);
    }
    Ok(vec![rule.measure_violation(
        notes[0].measure,
        format!("every note is a {:?} note", body[0].duration),
        &[],
    )])
}

pub fn s5_eighth_pairs(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    let is_eighth_at = |measure: usize, beat: u8| {
        sequence::note_at(notes, measure, beat).is_some_and(|n| n.duration == Duration::Eighth)
    };
    Ok(notes
        .iter()
        .filter(|n| n.duration == Duration::Eighth)
        .filter(|n| {
            let paired = match n.beat {
                2 | 6 => is_eighth_at(n.measure, n.beat + 1),
                3 | 7 => is_eighth_at(n.measure, n.beat - 1),
                _ => false,
            };
            !paired
        })
        .map(|n| rule.violation(n, format!("eighth note {} is not part of a weak-quarter pair", n.pitch), &[*n]))
        .collect())
}

pub fn unique_slots(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let mut out = Vec::new();
    for (voice, notes) in [("cantus firmus", &ctx.cantus_firmus), ("counterpoint", &ctx.counterpoint)] {
        for (a, b) in sequence::pairs(notes).filter(|(a, b)| a.slot() == b.slot()) {
            out.push(rule.violation(b, format!("{voice} has both {} and {} here", a.pitch, b.pitch), &[*a, *b]));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::rules::test_support::{placed, run, whole_line};

    fn fifth(cp: Vec<Note>) -> RuleContext {
        let key = Key::c_major();
        RuleContext::new(Species::Fifth, key, whole_line(&["C3", "D3", "C3"], &key), cp)
    }

    fn n(p: &str, d: Duration, m: usize, b: u8) -> Note {
        Note::new(p.parse().unwrap(), d, m, b, &Key::c_major())
    }

    #[test]
    fn test_duration_and_grid() {
        let key = Key::c_major();
        let cp = placed(&[("C4", 0, 0), ("D4", 0, 1), ("E4", 1, 0), ("F4", 1, 2)], Duration::Quarter, &key);
        let ctx = RuleContext::new(Species::Second, key, whole_line(&["C3", "D3"], &key), cp);
        assert_eq!(run(RuleKind::SpeciesDuration, &ctx).len(), 4);
        let v = run(RuleKind::SpeciesGrid, &ctx);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.beat, Some(2));

        let misaligned = fifth(vec![n("C4", Duration::Half, 0, 2), n("D4", Duration::Quarter, 0, 6)]);
        assert_eq!(run(RuleKind::SpeciesGrid, &misaligned).len(), 1);
    }

    #[test]
    fn test_measure_coverage() {
        let key = Key::c_major();
        let cf = whole_line(&["C3", "D3", "E3", "C3"], &key);
        let mut cp = placed(&[("G3", 0, 1), ("F3", 1, 0), ("A3", 1, 1), ("G3", 2, 0)], Duration::Half, &key);
        cp.push(Note::whole("C4".parse().unwrap(), 3, &key));
        let ctx = RuleContext::new(Species::Second, key, cf, cp);
        let v = run(RuleKind::MeasureCoverage, &ctx);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 2);
        assert_eq!(v[0].location.beat, None);
    }

    #[test]
    fn test_overrun() {
        let key = Key::c_major();
        let ctx = RuleContext::new(
            Species::First,
            key,
            whole_line(&["C3", "D3"], &key),
            whole_line(&["C4", "B3", "C4"], &key),
        );
        let v = run(RuleKind::CounterpointOverrun, &ctx);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 2);
    }

    #[test]
    fn test_syncopation_chain() {
        let key = Key::c_major();
        let cf = whole_line(&["C3", "D3", "E3", "D3", "C3"], &key);
        let cp = placed(
            &[
                ("G3", 0, 1),
                ("G3", 1, 0),
                ("F3", 1, 1),
                ("A3", 2, 0),
                ("A3", 2, 1),
                ("B3", 3, 1),
                ("C4", 4, 0),
            ],
            Duration::Half,
            &key,
        );
        let ctx = RuleContext::new(Species::Fourth, key, cf, cp);
        let v = run(RuleKind::S4SyncopationContinuity, &ctx);
        // F3 and A3 break the chain; B3 leads into the final.
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].location.measure, 1);
        assert_eq!(v[1].location.measure, 2);
    }

    #[test]
    fn test_fifth_species_rhythm() {
        let plain = fifth(vec![
            n("C4", Duration::Half, 0, 0),
            n("D4", Duration::Half, 0, 4),
            n("E4", Duration::Half, 1, 0),
            n("F4", Duration::Half, 1, 4),
            n("C4", Duration::Whole, 2, 0),
        ]);
        assert_eq!(run(RuleKind::S5RhythmicVariety, &plain).len(), 1);

        let florid = fifth(vec![
            n("C4", Duration::Half, 0, 0),
            n("D4", Duration::Quarter, 0, 4),
            n("E4", Duration::Eighth, 0, 6),
            n("F4", Duration::Eighth, 0, 7),
            n("G4", Duration::Eighth, 1, 2),
            n("C4", Duration::Whole, 2, 0),
        ]);
        assert!(run(RuleKind::S5RhythmicVariety, &florid).is_empty());
        let v = run(RuleKind::S5EighthPairs, &florid);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 1);
    }

    #[test]
    fn test_unique_slots() {
        let key = Key::c_major();
        let mut cp = whole_line(&["E4", "F4", "E4"], &key);
        cp.push(Note::whole("A4".parse().unwrap(), 1, &key));
        let mut cf = whole_line(&["C3", "D3", "C3"], &key);
        cf.push(Note::whole("G3".parse().unwrap(), 2, &key));
        let ctx = RuleContext::new(Species::First, key, cf, cp);
        let v = run(RuleKind::UniqueSlots, &ctx);
        let places: Vec<(usize, Option<u8>)> = v.iter().map(|v| (v.location.measure, v.location.beat)).collect();
        assert_eq!(places, vec![(2, Some(0)), (1, Some(0))]);
        assert!(v[0].message.starts_with("cantus firmus"));
        assert_eq!(v[1].affected_notes.len(), 2);

        let ctx = RuleContext::new(Species::First, key, whole_line(&["C3", "D3"], &key), whole_line(&["E4", "F4"], &key));
        assert!(run(RuleKind::UniqueSlots, &ctx).is_empty());
    }
}
