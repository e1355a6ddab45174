// Voice independence: which side of the cantus firmus the counterpoint
// lives on, and how far apart the voices may drift.

use super::{ALL_SPECIES, Category, Rule, RuleContext, RuleDef, RuleKind, RuleOutcome, Severity};
use crate::sequence;

/// Two octaves.
const MAX_SPACING: i32 = 24;

pub fn rules() -> Vec<Rule> {
    let defs = [
        RuleDef {
            kind: RuleKind::VoiceCrossing,
            id: "voice-crossing",
            name: "Voice crossing",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The counterpoint must stay on one side of the cantus firmus.",
            explanation: "When the voices cross, the listener loses track of which line is which.",
        },
        RuleDef {
            kind: RuleKind::VoiceOverlap,
            id: "voice-overlap",
            name: "Voice overlap",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "A voice should not move past the pitch the other voice has just left.",
            explanation: "Overlapping blurs the voices almost as badly as crossing them.",
        },
        RuleDef {
            kind: RuleKind::ExcessiveSpacing,
            id: "excessive-spacing",
            name: "Voices too far apart",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "The voices should not be more than two octaves apart.",
            explanation: "Beyond two octaves the two lines stop sounding like a single texture.",
        },
    ];
    defs.into_iter().map(|d| d.into_rule(Category::Voice)).collect()
}

/// +1 if the counterpoint starts above the cantus firmus, -1 if below.
/// Unisons do not decide; `None` if the voices never separate.
fn side(ctx: &RuleContext) -> Option<i32> {
    ctx.aligned()
        .map(|(cf, cp)| (cp.midi - cf.midi).signum())
        .find(|s| *s != 0)
}

pub fn voice_crossing(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(side) = side(ctx) else {
        return Ok(vec![]);
    };
    let place = if side > 0 { "above" } else { "below" };
    Ok(ctx
        .aligned()
        .filter(|(cf, cp)| (cp.midi - cf.midi).signum() == -side)
        .map(|(cf, cp)| {
            rule.violation(
                cp,
                format!("{} crosses the cantus firmus {} (counterpoint started {place})", cp.pitch, cf.pitch),
                &[*cf, *cp],
            )
        })
        .collect())
}

pub fn voice_overlap(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(side) = side(ctx) else {
        return Ok(vec![]);
    };
    Ok(sequence::downbeat_motions(&ctx.cantus_firmus, &ctx.counterpoint)
        .iter()
        .filter(|m| {
            (m.cp_to.midi - m.cf_from.midi).signum() == -side || (m.cp_from.midi - m.cf_to.midi).signum() == -side
        })
        .map(|m| rule.violation(&m.cp_to, "voices overlap between measures", &m.notes()))
        .collect())
}

pub fn excessive_spacing(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(ctx
        .aligned()
        .filter(|(cf, cp)| (cp.midi - cf.midi).abs() > MAX_SPACING)
        .map(|(cf, cp)| {
            rule.violation(
                cp,
                format!("{} semitones between the voices", (cp.midi - cf.midi).abs()),
                &[*cf, *cp],
            )
        })
        .collect())
}
