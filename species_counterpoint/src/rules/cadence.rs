// Cadence rules. The close is read from the counterpoint line with ties
// collapsed, so in fourth species the penultimate note is the resolution of
// the last suspension rather than its tied half.

use super::{ALL_SPECIES, Category, Rule, RuleContext, RuleDef, RuleKind, RuleOutcome, Severity};
use crate::key::{Mode, is_leap};
use crate::note::Note;
use crate::sequence;

pub fn rules() -> Vec<Rule> {
    let defs = [
        RuleDef {
            kind: RuleKind::CadenceFinalTonic,
            id: "cadence-final-tonic",
            name: "End on the tonic",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The last counterpoint note must be the tonic.",
            explanation: "The cadence brings both voices home to the final of the mode.",
        },
        RuleDef {
            kind: RuleKind::CadenceLeadingTone,
            id: "cadence-leading-tone",
            name: "Leading tone before the final",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The penultimate note must be the leading tone, raised in minor keys.",
            explanation: "The half step from the leading tone into the tonic is what makes the cadence sound conclusive. In minor the seventh degree is raised to create it.",
        },
        RuleDef {
            kind: RuleKind::CadenceLeadingToneApproach,
            id: "cadence-leading-tone-approach",
            name: "Approach the leading tone by step",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "The leading tone should be approached by step.",
            explanation: "Leaping into the leading tone weakens its pull toward the tonic.",
        },
        RuleDef {
            kind: RuleKind::CantusTonicFrame,
            id: "cantus-tonic-frame",
            name: "Cantus firmus begins and ends on the tonic",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The cantus firmus must start and end on the tonic.",
            explanation: "The cantus firmus defines the mode; its first and last notes are the final.",
        },
    ];
    defs.into_iter().map(|d| d.into_rule(Category::Cadence)).collect()
}

fn is_tonic(ctx: &RuleContext, note: &Note) -> bool {
    note.midi.rem_euclid(12) == ctx.key.tonic_pitch_class()
}

fn is_leading_tone(ctx: &RuleContext, note: &Note) -> bool {
    note.scale_degree == ctx.key.leading_tone_degree() && note.midi.rem_euclid(12) == (ctx.key.tonic_pitch_class() + 11) % 12
}

pub fn final_tonic(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(last) = ctx.counterpoint.last() else {
        return Ok(vec![]);
    };
    if is_tonic(ctx, last) {
        return Ok(vec![]);
    }
    Ok(vec![rule.violation(
        last,
        format!("final note {} is not the tonic of {}", last.pitch, ctx.key),
        &[*last],
    )])
}

pub fn leading_tone(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let line = sequence::collapse_ties(&ctx.counterpoint, ctx.species);
    let n = line.len();
    if n < 2 {
        return Ok(vec![]);
    }
    let pen = &line[n - 2];
    if is_leading_tone(ctx, pen) {
        return Ok(vec![]);
    }
    let message = if pen.scale_degree == 7 && ctx.key.mode == Mode::Minor {
        format!("{} must be raised to {} in {}", pen.pitch, ctx.key.raised_leading_tone(pen.pitch.octave), ctx.key)
    } else {
        format!("penultimate note {} is not the leading tone", pen.pitch)
    };
    Ok(vec![rule.violation(pen, message, &line[n - 2..])])
}

pub fn leading_tone_approach(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let line = sequence::collapse_ties(&ctx.counterpoint, ctx.species);
    let n = line.len();
    if n < 3 {
        return Ok(vec![]);
    }
    let (before, pen) = (&line[n - 3], &line[n - 2]);
    if pen.scale_degree != ctx.key.leading_tone_degree() || !is_leap(before, pen) {
        return Ok(vec![]);
    }
    Ok(vec![rule.violation(
        pen,
        format!("leading tone {} is approached by a leap from {}", pen.pitch, before.pitch),
        &[*before, *pen],
    )])
}

pub fn cantus_tonic_frame(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let cf = &ctx.cantus_firmus;
    let mut out = Vec::new();
    if let Some(first) = cf.first().filter(|n| !is_tonic(ctx, n)) {
        out.push(rule.violation(first, format!("cantus firmus starts on {}", first.pitch), &[*first]));
    }
    if cf.len() > 1 {
        if let Some(last) = cf.last().filter(|n| !is_tonic(ctx, n)) {
            out.push(rule.violation(last, format!("cantus firmus ends on {}", last.pitch), &[*last]));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::note::Duration;
    use crate::rules::test_support::{first_species, placed, run, whole_line};
    use crate::species::Species;

    #[test]
    fn test_final_and_leading_tone_major() {
        let good = first_species(&["C3", "E3", "D3", "C3"], &["C4", "G3", "B3", "C4"]);
        assert!(run(RuleKind::CadenceFinalTonic, &good).is_empty());
        assert!(run(RuleKind::CadenceLeadingTone, &good).is_empty());

        let bad = first_species(&["C3", "E3", "D3", "C3"], &["C4", "G3", "A3", "G3"]);
        assert_eq!(run(RuleKind::CadenceFinalTonic, &bad).len(), 1);
        let v = run(RuleKind::CadenceLeadingTone, &bad);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 2);
    }

    #[test]
    fn test_minor_leading_tone_must_be_raised() {
        let key = Key::a_minor();
        let cf = whole_line(&["A2", "C3", "B2", "A2"], &key);
        let natural = RuleContext::new(Species::First, key, cf.clone(), whole_line(&["A3", "E3", "G3", "A3"], &key));
        let v = run(RuleKind::CadenceLeadingTone, &natural);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("G#3"), "{}", v[0].message);

        let raised = RuleContext::new(Species::First, key, cf, whole_line(&["A3", "E3", "G#3", "A3"], &key));
        assert!(run(RuleKind::CadenceLeadingTone, &raised).is_empty());
    }

    #[test]
    fn test_cantus_leading_tone_does_not_excuse_counterpoint() {
        let ctx = first_species(&["C4", "D4", "B3", "C4"], &["C5", "F4", "D4", "C4"]);
        let v = run(RuleKind::CadenceLeadingTone, &ctx);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 2);
        assert!(v[0].message.contains("D4"), "{}", v[0].message);
    }

    #[test]
    fn test_leading_tone_approach() {
        let leapt = first_species(&["C3", "E3", "D3", "C3"], &["C4", "E4", "B3", "C4"]);
        assert_eq!(run(RuleKind::CadenceLeadingToneApproach, &leapt).len(), 1);
        let stepped = first_species(&["C3", "E3", "D3", "C3"], &["C4", "C4", "B3", "C4"]);
        assert!(run(RuleKind::CadenceLeadingToneApproach, &stepped).is_empty());
    }

    #[test]
    fn test_fourth_species_cadence_reads_through_ties() {
        let key = Key::c_major();
        let cf = whole_line(&["E3", "D3", "C3"], &key);
        let cp = placed(&[("G3", 0, 1), ("C4", 1, 0), ("B3", 1, 1), ("C4", 2, 0)], Duration::Half, &key);
        let ctx = RuleContext::new(Species::Fourth, key, cf, cp);
        assert!(run(RuleKind::CadenceLeadingTone, &ctx).is_empty());
        assert!(run(RuleKind::CadenceFinalTonic, &ctx).is_empty());
    }

    #[test]
    fn test_cantus_tonic_frame() {
        let ctx = first_species(&["D3", "E3", "C3"], &["D4", "G4", "C4"]);
        let v = run(RuleKind::CantusTonicFrame, &ctx);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 0);
    }
}
