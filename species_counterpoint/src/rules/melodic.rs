// Melodic rules: the shape of the counterpoint line on its own.
//
// Most checks run on the line as heard, with tie continuations collapsed
// (see `sequence::collapse_ties`), so a fourth-species held note is one
// event and not a repeated pitch.

use super::{ALL_SPECIES, Category, Rule, RuleContext, RuleDef, RuleKind, RuleOutcome, Severity};
use crate::interval::{Quality, interval};
use crate::key::{is_leap, is_step};
use crate::note::Note;
use crate::sequence;

/// A major tenth.
const MAX_RANGE: i32 = 16;
const LARGE_LEAP: i32 = 5;
const MAX_DIRECTION_RUN: usize = 5;

pub fn rules() -> Vec<Rule> {
    let defs = [
        RuleDef {
            kind: RuleKind::RepeatedNotes,
            id: "repeated-notes",
            name: "Repeated notes",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The counterpoint must not repeat a pitch except as a tie.",
            explanation: "A repeated note stalls the line; in strict style only the fourth-species tie holds a pitch.",
        },
        RuleDef {
            kind: RuleKind::LeapRecovery,
            id: "leap-recovery",
            name: "Recover large leaps",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "A leap of a fourth or more should be followed by a step in the opposite direction.",
            explanation: "A large leap leaves a gap the ear wants filled; stepping back fills it and keeps the line balanced.",
        },
        RuleDef {
            kind: RuleKind::ConsecutiveLeapsSameDirection,
            id: "consecutive-leaps-same-direction",
            name: "Consecutive leaps in one direction",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "Two leaps in a row must not go the same way.",
            explanation: "Two leaps in one direction outline a chord and overshoot the singable range of a line.",
        },
        RuleDef {
            kind: RuleKind::ThreeConsecutiveLeaps,
            id: "three-consecutive-leaps",
            name: "Three leaps in a row",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "No three consecutive leaps, whatever their direction.",
            explanation: "A strict line is mostly stepwise; a chain of leaps breaks it into disconnected points.",
        },
        RuleDef {
            kind: RuleKind::SingleClimax,
            id: "single-climax",
            name: "Single climax",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "The highest note should be reached only once.",
            explanation: "A line with one high point has a clear arch; repeating the peak flattens it.",
        },
        RuleDef {
            kind: RuleKind::SingleNadir,
            id: "single-nadir",
            name: "Single low point",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "The lowest note should be reached only once.",
            explanation: "A single low point keeps the contour purposeful at both extremes.",
        },
        RuleDef {
            kind: RuleKind::LeapLargerThanOctave,
            id: "leap-larger-than-octave",
            name: "Leap larger than an octave",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "No melodic leap may exceed an octave.",
            explanation: "Leaps beyond the octave are unsingable in the vocal style species counterpoint models.",
        },
        RuleDef {
            kind: RuleKind::MelodicTritone,
            id: "melodic-tritone",
            name: "Melodic tritone",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The line must not move by augmented fourth or diminished fifth.",
            explanation: "The tritone is hard to sing in tune and was forbidden as a melodic interval.",
        },
        RuleDef {
            kind: RuleKind::MelodicSeventh,
            id: "melodic-seventh",
            name: "Melodic seventh",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The line must not leap a seventh.",
            explanation: "Sevenths are dissonant leaps; the line should not outline them directly.",
        },
        RuleDef {
            kind: RuleKind::AugmentedDiminishedMelodic,
            id: "augmented-diminished-melodic",
            name: "Augmented or diminished leap",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "Melodic intervals must not be augmented or diminished.",
            explanation: "Augmented and diminished intervals are awkward to sing and sound chromatic in a diatonic style.",
        },
        RuleDef {
            kind: RuleKind::SixthLeap,
            id: "sixth-leap",
            name: "Leap of a sixth",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "Only the ascending minor sixth is a comfortable sixth leap.",
            explanation: "Major sixths and descending sixths were avoided as too wide for a smooth line.",
        },
        RuleDef {
            kind: RuleKind::MelodicRange,
            id: "melodic-range",
            name: "Range too wide",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "The counterpoint should stay within a tenth.",
            explanation: "A narrow range keeps the line within one comfortable vocal register.",
        },
        RuleDef {
            kind: RuleKind::StepwisePredominance,
            id: "stepwise-predominance",
            name: "Mostly stepwise",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "At least half the melodic moves should be steps.",
            explanation: "Conjunct motion is the norm of the style; leaps are the exception that gives it shape.",
        },
        RuleDef {
            kind: RuleKind::DirectionRun,
            id: "direction-run",
            name: "Too long in one direction",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "No more than five moves in a row in the same direction.",
            explanation: "A long run up or down reads as a scale exercise rather than a melody with a contour.",
        },
        RuleDef {
            kind: RuleKind::ChromaticStep,
            id: "chromatic-step",
            name: "Chromatic step",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The line must not move between two spellings of one letter, as in F to F#.",
            explanation: "A chromatic semitone is foreign to the diatonic style of strict counterpoint.",
        },
        RuleDef {
            kind: RuleKind::OutOfKey,
            id: "out-of-key",
            name: "Note outside the key",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "Counterpoint notes should belong to the key (raised sixth and seventh allowed in minor).",
            explanation: "Strict counterpoint stays in its mode; chromatic notes are limited to the cadence.",
        },
    ];
    defs.into_iter().map(|d| d.into_rule(Category::Melodic)).collect()
}

fn line(ctx: &RuleContext) -> Vec<Note> {
    sequence::collapse_ties(&ctx.counterpoint, ctx.species)
}

pub fn repeated_notes(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(sequence::pairs(&ctx.counterpoint)
        .filter(|(a, b)| a.midi == b.midi && !sequence::is_tie(a, b, ctx.species))
        .map(|(a, b)| rule.violation(b, format!("{} is repeated", b.pitch), &[*a, *b]))
        .collect())
}

pub fn leap_recovery(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = line(ctx);
    Ok(sequence::triples(&notes)
        .filter_map(|(a, b, c)| {
            let leap = sequence::motion(a, b);
            if leap.abs() < LARGE_LEAP {
                return None;
            }
            let recovered = is_step(b, c) && sequence::direction(b, c) == -leap.signum();
            (!recovered).then(|| {
                rule.violation(c, format!("leap of {} semitones is not recovered by step", leap.abs()), &[*a, *b, *c])
            })
        })
        .collect())
}

pub fn consecutive_leaps_same_direction(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = line(ctx);
    Ok(sequence::triples(&notes)
        .filter(|(a, b, c)| is_leap(a, b) && is_leap(b, c) && sequence::direction(a, b) == sequence::direction(b, c))
        .map(|(a, b, c)| rule.violation(c, "two leaps in the same direction", &[*a, *b, *c]))
        .collect())
}

pub fn three_consecutive_leaps(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = line(ctx);
    Ok(notes
        .windows(4)
        .filter(|w| w.windows(2).all(|p| is_leap(&p[0], &p[1])))
        .map(|w| rule.violation(&w[3], "three leaps in a row", w))
        .collect())
}

fn repeated_extreme(rule: &Rule, notes: &[Note], extreme: Option<i32>, what: &str) -> RuleOutcome {
    let Some(target) = extreme else {
        return Ok(vec![]);
    };
    let hits: Vec<Note> = notes.iter().filter(|n| n.midi == target).copied().collect();
    if hits.len() < 2 {
        return Ok(vec![]);
    }
    Ok(vec![rule.violation(
        &hits[1],
        format!("the {what} {} is reached {} times", hits[0].pitch, hits.len()),
        &hits,
    )])
}

pub fn single_climax(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = line(ctx);
    let high = notes.iter().map(|n| n.midi).max();
    repeated_extreme(rule, &notes, high, "high point")
}

pub fn single_nadir(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = line(ctx);
    let low = notes.iter().map(|n| n.midi).min();
    repeated_extreme(rule, &notes, low, "low point")
}

pub fn leap_larger_than_octave(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(sequence::pairs(&ctx.counterpoint)
        .filter(|(a, b)| sequence::motion(a, b).abs() > 12)
        .map(|(a, b)| rule.violation(b, format!("leap of {} semitones", sequence::motion(a, b).abs()), &[*a, *b]))
        .collect())
}

pub fn melodic_tritone(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(sequence::pairs(&ctx.counterpoint)
        .filter(|(a, b)| interval(a, b).is_tritone())
        .map(|(a, b)| rule.violation(b, format!("tritone from {} to {}", a.pitch, b.pitch), &[*a, *b]))
        .collect())
}

pub fn melodic_seventh(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(sequence::pairs(&ctx.counterpoint)
        .filter(|(a, b)| matches!(sequence::motion(a, b).abs(), 10 | 11))
        .map(|(a, b)| rule.violation(b, format!("seventh from {} to {}", a.pitch, b.pitch), &[*a, *b]))
        .collect())
}

pub fn augmented_diminished_melodic(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(sequence::pairs(&ctx.counterpoint)
        .filter_map(|(a, b)| {
            let iv = interval(a, b);
            // Tritones and chromatic unisons have rules of their own.
            let flagged = matches!(iv.quality, Quality::Augmented | Quality::Diminished)
                && !iv.is_tritone()
                && iv.degree != 1;
            flagged.then(|| rule.violation(b, format!("melodic {}", iv.name()), &[*a, *b]))
        })
        .collect())
}

pub fn sixth_leap(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(sequence::pairs(&ctx.counterpoint)
        .filter_map(|(a, b)| {
            let iv = interval(a, b);
            if iv.degree != 6 {
                return None;
            }
            let descending = sequence::motion(a, b) < 0;
            let flagged = iv.quality == Quality::Major || (iv.quality == Quality::Minor && descending);
            flagged.then(|| {
                let dir = if descending { "descending" } else { "ascending" };
                rule.violation(b, format!("{dir} {}", iv.name()), &[*a, *b])
            })
        })
        .collect())
}

pub fn melodic_range(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let (Some(high), Some(low)) = (
        ctx.counterpoint.iter().max_by_key(|n| n.midi),
        ctx.counterpoint.iter().min_by_key(|n| n.midi),
    ) else {
        return Ok(vec![]);
    };
    let span = high.midi - low.midi;
    if span <= MAX_RANGE {
        return Ok(vec![]);
    }
    Ok(vec![rule.violation(
        high,
        format!("range of {span} semitones from {} to {}", low.pitch, high.pitch),
        &[*low, *high],
    )])
}

pub fn stepwise_predominance(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = line(ctx);
    let moves: Vec<(&Note, &Note)> = sequence::pairs(&notes).filter(|(a, b)| a.midi != b.midi).collect();
    if moves.len() < 4 {
        return Ok(vec![]);
    }
    let steps = moves.iter().filter(|(a, b)| is_step(a, b)).count();
    if steps * 2 >= moves.len() {
        return Ok(vec![]);
    }
    Ok(vec![rule.measure_violation(
        notes[0].measure,
        format!("only {steps} of {} moves are steps", moves.len()),
        &[],
    )])
}

pub fn direction_run(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let notes = line(ctx);
    let mut out = Vec::new();
    let mut run = 0usize;
    let mut dir = 0;
    for (i, (a, b)) in sequence::pairs(&notes).enumerate() {
        let d = sequence::direction(a, b);
        run = if d != 0 && d == dir { run + 1 } else if d != 0 { 1 } else { 0 };
        dir = d;
        if run == MAX_DIRECTION_RUN + 1 {
            let start = i + 1 - MAX_DIRECTION_RUN;
            out.push(rule.violation(
                b,
                format!("{run} moves in a row {}", if d > 0 { "upward" } else { "downward" }),
                &notes[start - 1..=i + 1],
            ));
        }
    }
    Ok(out)
}

pub fn chromatic_step(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(sequence::pairs(&ctx.counterpoint)
        .filter(|(a, b)| a.pitch.letter == b.pitch.letter && a.pitch.octave == b.pitch.octave && a.midi != b.midi)
        .map(|(a, b)| rule.violation(b, format!("chromatic step {} to {}", a.pitch, b.pitch), &[*a, *b]))
        .collect())
}

pub fn out_of_key(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(ctx
        .counterpoint
        .iter()
        .filter(|n| !ctx.key.contains(&n.pitch))
        .map(|n| rule.violation(n, format!("{} is not in {}", n.pitch, ctx.key), &[*n]))
        .collect())
}
