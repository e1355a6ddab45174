// Dissonance treatment: where a dissonant counterpoint note is allowed and
// how it must be approached and left.
//
// The shape predicates below classify the note at index `i` of the
// counterpoint line by its neighbors:
//
//   passing    step in, step out, same direction, both neighbors consonant
//   neighbor   step away and straight back to the same pitch, departure consonant
//   cambiata   step down in, leap down a third, step up, landing consonant
//   suspension same pitch held from a consonant preparation, resolving down
//              by step to a consonant note
//
// Second species allows only passing tones on the weak beat, third species
// allows passing, neighbor and cambiata figures, fourth species is all about
// the suspension, and fifth species accepts any of the four shapes.

use super::{
    Category, FIFTH_ONLY, FOURTH_ONLY, Rule, RuleContext, RuleDef, RuleKind, RuleOutcome, Severity,
    SECOND_ONLY, THIRD_ONLY,
};
use crate::interval::interval;
use crate::key::is_step;
use crate::note::Note;
use crate::sequence;

pub fn rules() -> Vec<Rule> {
    let defs = [
        RuleDef {
            kind: RuleKind::S2WeakBeatPassing,
            id: "s2-weak-beat-passing",
            name: "Weak-beat dissonance must pass",
            severity: Severity::Error,
            species: SECOND_ONLY,
            description: "A dissonant half note on the weak beat must be a passing tone.",
            explanation: "In second species the only dissonance is the passing tone: approached and left by step in one direction between two consonances.",
        },
        RuleDef {
            kind: RuleKind::S3DissonanceFigures,
            id: "s3-dissonance-figures",
            name: "Weak-beat dissonance figures",
            severity: Severity::Error,
            species: THIRD_ONLY,
            description: "A dissonant quarter note must be a passing tone, a neighbor tone or part of a cambiata.",
            explanation: "Third species adds the neighbor tone and the cambiata (nota cambiata) to the passing tone; any other dissonance is unprepared.",
        },
        RuleDef {
            kind: RuleKind::S4SuspensionPreparation,
            id: "s4-suspension-preparation",
            name: "Suspension preparation",
            severity: Severity::Error,
            species: FOURTH_ONLY,
            description: "A dissonant downbeat must be tied over from a consonant weak-beat note.",
            explanation: "A suspension is only heard as such when the dissonant note was sounded as a consonance first and held across the barline.",
        },
        RuleDef {
            kind: RuleKind::S4SuspensionResolutionDirection,
            id: "s4-suspension-resolution-direction",
            name: "Suspensions resolve downward",
            severity: Severity::Error,
            species: FOURTH_ONLY,
            description: "A suspended dissonance must resolve downward.",
            explanation: "The suspended voice falls into its resolution; an upward resolution (retardation) is outside the strict style.",
        },
        RuleDef {
            kind: RuleKind::S4SuspensionResolutionStep,
            id: "s4-suspension-resolution-step",
            name: "Suspensions resolve by step",
            severity: Severity::Error,
            species: FOURTH_ONLY,
            description: "A suspended dissonance must resolve by step, not by leap.",
            explanation: "The resolution is heard as the dissonance sliding into its consonance; a leap abandons it instead.",
        },
        RuleDef {
            kind: RuleKind::S4ResolutionConsonance,
            id: "s4-resolution-consonance",
            name: "Consonant resolution",
            severity: Severity::Error,
            species: FOURTH_ONLY,
            description: "The note a suspension resolves to must be consonant.",
            explanation: "Resolving one dissonance into another leaves the tension unresolved.",
        },
        RuleDef {
            kind: RuleKind::S4WeakBeatConsonance,
            id: "s4-weak-beat-consonance",
            name: "Consonant preparations",
            severity: Severity::Error,
            species: FOURTH_ONLY,
            description: "Weak-beat notes in fourth species must be consonant.",
            explanation: "In fourth species the weak beat carries the preparation of the next tie, which must be a consonance.",
        },
        RuleDef {
            kind: RuleKind::S4ResolutionToUnison,
            id: "s4-resolution-to-unison",
            name: "Avoid resolving to a unison",
            severity: Severity::Warning,
            species: FOURTH_ONLY,
            description: "A suspension should not resolve to a unison with the cantus firmus.",
            explanation: "The 2-1 suspension collapses the voices into one at the moment of resolution.",
        },
        RuleDef {
            kind: RuleKind::DissonanceLegality,
            id: "dissonance-legality",
            name: "Dissonance treatment",
            severity: Severity::Error,
            species: FIFTH_ONLY,
            description: "Every dissonance must be a passing tone, neighbor tone, cambiata or suspension.",
            explanation: "Florid counterpoint combines the earlier species, so every dissonance must still take one of their sanctioned shapes.",
        },
    ];
    defs.into_iter().map(|d| d.into_rule(Category::Dissonance)).collect()
}

/// Consonant against the cantus firmus note under it. A note with nothing
/// under it cannot clash.
pub fn is_consonant_at(ctx: &RuleContext, note: &Note) -> bool {
    ctx.cantus_under(note).is_none_or(|cf| interval(cf, note).is_consonant)
}

/// The note at `i` with its neighbors on both sides.
fn around(notes: &[Note], i: usize) -> Option<(&Note, &Note, &Note)> {
    Some((notes.get(i.checked_sub(1)?)?, notes.get(i)?, notes.get(i + 1)?))
}

pub fn is_passing_tone(ctx: &RuleContext, notes: &[Note], i: usize) -> bool {
    let Some((prev, cur, next)) = around(notes, i) else {
        return false;
    };
    is_step(prev, cur)
        && is_step(cur, next)
        && sequence::direction(prev, cur) == sequence::direction(cur, next)
        && is_consonant_at(ctx, prev)
        && is_consonant_at(ctx, next)
}

pub fn is_neighbor_tone(ctx: &RuleContext, notes: &[Note], i: usize) -> bool {
    let Some((prev, cur, next)) = around(notes, i) else {
        return false;
    };
    is_step(prev, cur) && prev.midi == next.midi && is_consonant_at(ctx, prev)
}

pub fn is_cambiata(ctx: &RuleContext, notes: &[Note], i: usize) -> bool {
    let (Some((prev, cur, landing)), Some(after)) = (around(notes, i), notes.get(i + 2)) else {
        return false;
    };
    is_step(prev, cur)
        && sequence::direction(prev, cur) < 0
        && matches!(sequence::motion(cur, landing), -4 | -3)
        && is_step(landing, after)
        && sequence::direction(landing, after) > 0
        && is_consonant_at(ctx, landing)
}

pub fn is_suspension(ctx: &RuleContext, notes: &[Note], i: usize) -> bool {
    let Some((prep, cur, next)) = around(notes, i) else {
        return false;
    };
    prep.midi == cur.midi
        && is_consonant_at(ctx, prep)
        && matches!(sequence::motion(cur, next), -2 | -1)
        && is_consonant_at(ctx, next)
}

/// Indices of dissonant counterpoint notes, optionally restricted to weak
/// or strong beats.
fn dissonant(ctx: &RuleContext, downbeat: Option<bool>) -> Vec<usize> {
    ctx.counterpoint
        .iter()
        .enumerate()
        .filter(|(_, n)| downbeat.is_none_or(|d| n.is_downbeat() == d))
        .filter(|(_, n)| !is_consonant_at(ctx, n))
        .map(|(i, _)| i)
        .collect()
}

fn affected(ctx: &RuleContext, i: usize) -> Vec<Note> {
    let notes = &ctx.counterpoint;
    let lo = i.saturating_sub(1);
    let hi = (i + 2).min(notes.len());
    let mut out: Vec<Note> = notes[lo..hi].to_vec();
    if let Some(cf) = ctx.cantus_under(&notes[i]) {
        out.insert(0, *cf);
    }
    out
}

fn dissonance_message(ctx: &RuleContext, note: &Note, what: &str) -> String {
    match ctx.cantus_under(note) {
        Some(cf) => format!("{} against {} ({}) {what}", note.pitch, cf.pitch, interval(cf, note).name()),
        None => format!("{} {what}", note.pitch),
    }
}

pub fn s2_weak_beat_passing(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(dissonant(ctx, Some(false))
        .into_iter()
        .filter(|&i| !is_passing_tone(ctx, notes, i))
        .map(|i| rule.violation(&notes[i], dissonance_message(ctx, &notes[i], "is not a passing tone"), &affected(ctx, i)))
        .collect())
}

pub fn s3_dissonance_figures(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(dissonant(ctx, Some(false))
        .into_iter()
        .filter(|&i| {
            !(is_passing_tone(ctx, notes, i) || is_neighbor_tone(ctx, notes, i) || is_cambiata(ctx, notes, i))
        })
        .map(|i| {
            rule.violation(
                &notes[i],
                dissonance_message(ctx, &notes[i], "is not a passing, neighbor or cambiata figure"),
                &affected(ctx, i),
            )
        })
        .collect())
}

/// Dissonant downbeats in fourth species: the suspensions.
fn suspensions(ctx: &RuleContext) -> Vec<usize> {
    dissonant(ctx, Some(true))
}

pub fn s4_suspension_preparation(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(suspensions(ctx)
        .into_iter()
        .filter(|&i| {
            let prepared = i
                .checked_sub(1)
                .map(|p| &notes[p])
                .is_some_and(|prep| sequence::is_tie(prep, &notes[i], ctx.species) && is_consonant_at(ctx, prep));
            !prepared
        })
        .map(|i| rule.violation(&notes[i], dissonance_message(ctx, &notes[i], "is not prepared by a tie"), &affected(ctx, i)))
        .collect())
}

pub fn s4_suspension_resolution_direction(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(suspensions(ctx)
        .into_iter()
        .filter(|&i| notes.get(i + 1).is_none_or(|next| next.midi >= notes[i].midi))
        .map(|i| {
            let what = match notes.get(i + 1) {
                Some(next) if next.midi > notes[i].midi => "resolves upward",
                Some(_) => "does not resolve",
                None => "is never resolved",
            };
            rule.violation(&notes[i], dissonance_message(ctx, &notes[i], what), &affected(ctx, i))
        })
        .collect())
}

pub fn s4_suspension_resolution_step(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(suspensions(ctx)
        .into_iter()
        .filter_map(|i| {
            let next = notes.get(i + 1)?;
            let drop = notes[i].midi - next.midi;
            (drop > 2).then(|| {
                rule.violation(
                    next,
                    format!("suspension on {} resolves by a leap of {drop} semitones", notes[i].pitch),
                    &affected(ctx, i),
                )
            })
        })
        .collect())
}

pub fn s4_resolution_consonance(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(suspensions(ctx)
        .into_iter()
        .filter_map(|i| {
            let next = notes.get(i + 1)?;
            (next.midi < notes[i].midi && !is_consonant_at(ctx, next)).then(|| {
                rule.violation(next, dissonance_message(ctx, next, "is a dissonant resolution"), &affected(ctx, i))
            })
        })
        .collect())
}

pub fn s4_weak_beat_consonance(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    let resolutions: Vec<usize> = suspensions(ctx).into_iter().map(|i| i + 1).collect();
    Ok(dissonant(ctx, Some(false))
        .into_iter()
        .filter(|i| !resolutions.contains(i))
        .map(|i| rule.violation(&notes[i], dissonance_message(ctx, &notes[i], "on the weak beat"), &affected(ctx, i)))
        .collect())
}

pub fn s4_resolution_to_unison(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(suspensions(ctx)
        .into_iter()
        .filter_map(|i| {
            let next = notes.get(i + 1)?;
            let cf = ctx.cantus_under(next)?;
            interval(cf, next)
                .is_unison()
                .then(|| rule.violation(next, "suspension resolves to a unison", &affected(ctx, i)))
        })
        .collect())
}

pub fn dissonance_legality(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = &ctx.counterpoint;
    Ok(dissonant(ctx, None)
        .into_iter()
        .filter(|&i| {
            !(is_passing_tone(ctx, notes, i)
                || is_neighbor_tone(ctx, notes, i)
                || is_cambiata(ctx, notes, i)
                || is_suspension(ctx, notes, i))
        })
        .map(|i| {
            rule.violation(
                &notes[i],
                dissonance_message(ctx, &notes[i], "is not a passing tone, neighbor, cambiata or suspension"),
                &affected(ctx, i),
            )
        })
        .collect())
}
