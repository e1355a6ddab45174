// Motion rules: how the two voices move relative to each other.
//
// Downbeat rules compare the first notes of adjacent measures (see
// `sequence::downbeat_motions`). The off-beat rule instead walks every pair
// of consecutive counterpoint notes, each measured against the cantus
// firmus note sounding under it, which catches parallels hidden behind a
// weak-beat note or a leap across the barline.
//
// Motion is undefined when a voice has two notes in one slot, so every rule
// here fails on such a context and leaves it to `unique-slots`.

use super::{
    ALL_SPECIES, Category, FIRST_ONLY, Rule, RuleContext, RuleDef, RuleKind, RuleOutcome, Severity,
};
use crate::error::RuleError;
use crate::interval::{Interval, MotionType, VoiceMotion};
use crate::sequence;
use crate::species::Species;

pub fn rules() -> Vec<Rule> {
    let defs = [
        RuleDef {
            kind: RuleKind::ParallelFifths,
            id: "parallel-fifths",
            name: "Parallel fifths",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "Two perfect fifths in a row between adjacent downbeats by parallel motion.",
            explanation: "Parallel fifths fuse the two voices into one reinforced line and destroy their independence.",
        },
        RuleDef {
            kind: RuleKind::ParallelOctaves,
            id: "parallel-octaves",
            name: "Parallel octaves",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "Two octaves (or unisons) in a row between adjacent downbeats by parallel motion.",
            explanation: "Parallel octaves make the counterpoint a doubling of the cantus firmus instead of a second voice.",
        },
        RuleDef {
            kind: RuleKind::DirectFifths,
            id: "direct-fifths",
            name: "Direct fifths",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "A perfect fifth approached by similar motion.",
            explanation: "Entering a fifth with both voices moving the same way implies the parallel fifth (hidden fifths).",
        },
        RuleDef {
            kind: RuleKind::DirectOctaves,
            id: "direct-octaves",
            name: "Direct octaves",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "An octave approached by similar motion.",
            explanation: "Entering an octave with both voices moving the same way implies the parallel octave (hidden octaves).",
        },
        RuleDef {
            kind: RuleKind::OffbeatParallels,
            id: "offbeat-parallels",
            name: "Off-beat parallels",
            severity: Severity::Error,
            species: &[Species::Second, Species::Third, Species::Fifth],
            description: "Consecutive counterpoint notes forming the same perfect interval against the cantus firmus.",
            explanation: "A weak-beat note or a leap does not hide consecutive fifths or octaves; the ear still connects them.",
        },
        RuleDef {
            kind: RuleKind::SimilarMotionRun,
            id: "similar-motion-run",
            name: "Too much similar motion",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "More than three consecutive moves with both voices going the same way.",
            explanation: "Independent voices should balance similar motion with contrary and oblique motion.",
        },
        RuleDef {
            kind: RuleKind::ContraryMotionBalance,
            id: "contrary-motion-balance",
            name: "Prefer contrary motion",
            severity: Severity::Warning,
            species: FIRST_ONLY,
            description: "At least a third of the moves between downbeats should be contrary.",
            explanation: "Contrary motion is the strongest guarantee of independence and should predominate in first species.",
        },
    ];
    defs.into_iter().map(|d| d.into_rule(Category::Motion)).collect()
}

fn downbeat_motions(ctx: &RuleContext) -> Result<Vec<VoiceMotion>, RuleError> {
    ctx.check_voices()?;
    Ok(sequence::downbeat_motions(&ctx.cantus_firmus, &ctx.counterpoint))
}

fn parallel_perfects(rule: &Rule, ctx: &RuleContext, is_class: fn(&Interval) -> bool, label: &str) -> RuleOutcome {
    Ok(downbeat_motions(ctx)?
        .iter()
        .filter(|m| m.motion == MotionType::Parallel && is_class(&m.before) && is_class(&m.after))
        .map(|m| {
            rule.violation(
                &m.cp_to,
                format!("parallel {label} from measure {} to {}", m.cp_from.measure + 1, m.cp_to.measure + 1),
                &m.notes(),
            )
        })
        .collect())
}

fn direct_perfects(rule: &Rule, ctx: &RuleContext, is_class: fn(&Interval) -> bool, label: &str) -> RuleOutcome {
    Ok(downbeat_motions(ctx)?
        .iter()
        .filter(|m| m.motion == MotionType::Similar && is_class(&m.after) && !is_class(&m.before))
        .map(|m| rule.violation(&m.cp_to, format!("{label} approached by similar motion"), &m.notes()))
        .collect())
}

pub fn parallel_fifths(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    parallel_perfects(rule, ctx, Interval::is_perfect_fifth, "fifths")
}

pub fn parallel_octaves(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    parallel_perfects(rule, ctx, Interval::is_perfect_octave, "octaves")
}

pub fn direct_fifths(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    direct_perfects(rule, ctx, Interval::is_perfect_fifth, "fifth")
}

pub fn direct_octaves(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    direct_perfects(rule, ctx, Interval::is_perfect_octave, "octave")
}

fn is_hidden_parallel(m: &VoiceMotion) -> bool {
    m.before.is_perfect_consonance()
        && m.before.same_class(&m.after)
        && m.cp_from.midi != m.cp_to.midi
}

pub fn offbeat_parallels(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    ctx.check_voices()?;
    Ok(sequence::note_motions(&ctx.cantus_firmus, &ctx.counterpoint)
        .iter()
        .filter(|m| is_hidden_parallel(m))
        .map(|m| {
            let what = if m.after.is_perfect_fifth() { "fifths" } else { "octaves" };
            rule.violation(
                &m.cp_to,
                format!("consecutive {what} between {} and {}", m.cp_from, m.cp_to),
                &m.notes(),
            )
        })
        .collect())
}

pub fn similar_motion_run(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let motions = downbeat_motions(ctx)?;
    let mut out = Vec::new();
    let mut run = 0;
    let mut last_measure = None;
    for m in &motions {
        let same_way = matches!(m.motion, MotionType::Similar | MotionType::Parallel);
        let contiguous = last_measure == Some(m.cp_from.measure);
        run = match (same_way, contiguous) {
            (false, _) => 0,
            (true, true) => run + 1,
            (true, false) => 1,
        };
        last_measure = Some(m.cp_to.measure);
        if run == 4 {
            out.push(rule.violation(&m.cp_to, "four moves in a row in the same direction", &m.notes()));
        }
    }
    Ok(out)
}

pub fn contrary_motion_balance(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let motions = downbeat_motions(ctx)?;
    if motions.len() < 4 {
        return Ok(vec![]);
    }
    let contrary = motions.iter().filter(|m| m.motion == MotionType::Contrary).count();
    if contrary * 3 >= motions.len() {
        return Ok(vec![]);
    }
    let first = motions[0].cp_from;
    Ok(vec![rule.measure_violation(
        first.measure,
        format!("only {contrary} of {} moves are contrary", motions.len()),
        &[],
    )])
}
