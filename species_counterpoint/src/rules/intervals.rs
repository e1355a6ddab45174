// Vertical interval rules: how the two voices sound together at each point.

use super::{
    ALL_SPECIES, Category, FIRST_ONLY, MULTI_NOTE, Rule, RuleContext, RuleDef, RuleKind, RuleOutcome,
    Severity,
};
use crate::interval::{Interval, MotionType, interval};
use crate::note::Note;
use crate::sequence;
use crate::species::Species;

pub fn rules() -> Vec<Rule> {
    let defs = [
        RuleDef {
            kind: RuleKind::FirstIntervalPerfect,
            id: "first-interval-perfect",
            name: "Opening on a perfect consonance",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The first counterpoint note must form a unison, fifth or octave with the cantus firmus.",
            explanation: "An exercise opens on a perfect consonance so the mode is established without ambiguity.",
        },
        RuleDef {
            kind: RuleKind::LastIntervalPerfect,
            id: "last-interval-perfect",
            name: "Closing on a unison or octave",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The final interval must be a unison or an octave.",
            explanation: "Only the unison or octave gives complete rest at the close; a final fifth or third sounds unfinished.",
        },
        RuleDef {
            kind: RuleKind::DownbeatConsonance,
            id: "downbeat-consonance",
            name: "Consonant downbeats",
            severity: Severity::Error,
            species: &[Species::First, Species::Second, Species::Third],
            description: "Every downbeat must be consonant with the cantus firmus.",
            explanation: "The strong beat carries the harmony. In these species dissonance is only allowed on weak beats, and only as a passing figure.",
        },
        RuleDef {
            kind: RuleKind::VerticalTritone,
            id: "vertical-tritone",
            name: "No vertical tritone",
            severity: Severity::Error,
            species: ALL_SPECIES,
            description: "The voices must never sound an augmented fourth or diminished fifth together.",
            explanation: "The tritone divides the octave in half and was avoided as the most unstable of intervals (diabolus in musica).",
        },
        RuleDef {
            kind: RuleKind::InteriorUnison,
            id: "s1-interior-unison",
            name: "No interior unison",
            severity: Severity::Error,
            species: FIRST_ONLY,
            description: "In first species the unison is allowed only at the beginning and the end.",
            explanation: "A unison merges the two voices into one and destroys their independence for the whole measure.",
        },
        RuleDef {
            kind: RuleKind::DownbeatUnison,
            id: "downbeat-unison",
            name: "Avoid downbeat unisons",
            severity: Severity::Warning,
            species: MULTI_NOTE,
            description: "A unison on an interior downbeat should be avoided.",
            explanation: "On the strong beat a unison makes the two voices momentarily indistinguishable.",
        },
        RuleDef {
            kind: RuleKind::ConsecutivePerfectIntervals,
            id: "consecutive-perfect-intervals",
            name: "Too many perfect consonances",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "Three downbeats in a row should not all be perfect consonances.",
            explanation: "Strings of fifths and octaves sound hollow; imperfect consonances give the texture warmth.",
        },
        RuleDef {
            kind: RuleKind::ParallelImperfectRun,
            id: "parallel-imperfect-run",
            name: "Too many parallel thirds or sixths",
            severity: Severity::Warning,
            species: ALL_SPECIES,
            description: "No more than three thirds or sixths in a row by parallel motion.",
            explanation: "Long chains of parallel thirds or sixths make the counterpoint a mere doubling of the cantus firmus.",
        },
        RuleDef {
            kind: RuleKind::PenultimateInterval,
            id: "penultimate-interval",
            name: "Penultimate imperfect consonance",
            severity: Severity::Warning,
            species: FIRST_ONLY,
            description: "The penultimate interval should be a third or sixth moving to the final unison or octave.",
            explanation: "The cadence works by a sixth expanding to an octave (or a third contracting to a unison) as both voices step.",
        },
    ];
    defs.into_iter().map(|d| d.into_rule(Category::Intervals)).collect()
}

pub fn first_interval_perfect(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(first) = ctx.counterpoint.first() else {
        return Ok(vec![]);
    };
    let Some(cf) = ctx.cantus_under(first) else {
        return Ok(vec![]);
    };
    let iv = interval(cf, first);
    if iv.is_perfect_consonance() {
        return Ok(vec![]);
    }
    Ok(vec![rule.violation(
        first,
        format!("the exercise opens on a {}", iv.name()),
        &[*cf, *first],
    )])
}

pub fn last_interval_perfect(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let Some(last) = ctx.counterpoint.last() else {
        return Ok(vec![]);
    };
    let Some(cf) = ctx.cantus_under(last) else {
        return Ok(vec![]);
    };
    let iv = interval(cf, last);
    if iv.is_perfect_octave() {
        return Ok(vec![]);
    }
    Ok(vec![rule.violation(
        last,
        format!("the exercise ends on a {}", iv.name()),
        &[*cf, *last],
    )])
}

pub fn downbeat_consonance(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(ctx
        .aligned()
        .filter(|(_, cp)| cp.is_downbeat())
        .filter_map(|(cf, cp)| {
            let iv = interval(cf, cp);
            (!iv.is_consonant).then(|| {
                rule.violation(cp, format!("dissonant {} on the downbeat", iv.name()), &[*cf, *cp])
            })
        })
        .collect())
}

pub fn vertical_tritone(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    Ok(ctx
        .aligned()
        .filter_map(|(cf, cp)| {
            let iv = interval(cf, cp);
            iv.is_tritone().then(|| {
                rule.violation(
                    cp,
                    format!("{} against {} is a tritone ({})", cp.pitch, cf.pitch, iv.name()),
                    &[*cf, *cp],
                )
            })
        })
        .collect())
}

pub fn interior_unison(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let n = ctx.counterpoint.len();
    if n < 3 {
        return Ok(vec![]);
    }
    Ok(ctx.counterpoint[1..n - 1]
        .iter()
        .filter_map(|cp| {
            let cf = ctx.cantus_under(cp)?;
            interval(cf, cp)
                .is_unison()
                .then(|| rule.violation(cp, "unison inside the exercise", &[*cf, *cp]))
        })
        .collect())
}

pub fn downbeat_unison(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let (Some(first), Some(last)) = (ctx.counterpoint.first(), ctx.counterpoint.last()) else {
        return Ok(vec![]);
    };
    let (first_measure, last_measure) = (first.measure, last.measure);
    Ok(ctx
        .aligned()
        .filter(|(_, cp)| cp.is_downbeat() && cp.measure != first_measure && cp.measure != last_measure)
        .filter(|(cf, cp)| interval(cf, cp).is_unison())
        .map(|(cf, cp)| rule.violation(cp, "unison on an interior downbeat", &[*cf, *cp]))
        .collect())
}

pub fn consecutive_perfect_intervals(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let downbeats: Vec<(&Note, &Note)> = ctx.aligned().filter(|(_, cp)| cp.is_downbeat()).collect();
    let mut out = Vec::new();
    for w in downbeats.windows(3) {
        let adjacent = w[1].1.measure == w[0].1.measure + 1 && w[2].1.measure == w[1].1.measure + 1;
        if adjacent && w.iter().all(|(cf, cp)| interval(cf, cp).is_perfect_consonance()) {
            let notes: Vec<Note> = w.iter().map(|(_, cp)| **cp).collect();
            out.push(rule.violation(w[2].1, "third perfect consonance in a row", &notes));
        }
    }
    Ok(out)
}

pub fn parallel_imperfect_run(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let motions = sequence::downbeat_motions(&ctx.cantus_firmus, &ctx.counterpoint);
    let mut out = Vec::new();
    let mut run: Vec<Note> = Vec::new();
    for m in &motions {
        // Thirds and sixths alternate between major and minor as the voices
        // move, so compare the interval size only.
        let continues = matches!(m.motion, MotionType::Parallel | MotionType::Similar)
            && m.before.is_third_or_sixth()
            && m.after.is_third_or_sixth()
            && m.before.simple_degree() == m.after.simple_degree();
        if !continues {
            run.clear();
            continue;
        }
        if run.last() != Some(&m.cp_from) {
            run.clear();
            run.push(m.cp_from);
        }
        run.push(m.cp_to);
        if run.len() == 4 {
            out.push(rule.violation(
                &m.cp_to,
                format!("{} {}s in a row by parallel motion", run.len(), interval_word(&m.after)),
                &run,
            ));
        }
    }
    Ok(out)
}

fn interval_word(iv: &Interval) -> &'static str {
    if iv.simple_degree() == 3 { "third" } else { "sixth" }
}

pub fn penultimate_interval(rule: &Rule, ctx: &RuleContext) -> RuleOutcome {
    let n = ctx.counterpoint.len();
    if n < 2 {
        return Ok(vec![]);
    }
    let pen = &ctx.counterpoint[n - 2];
    let Some(cf) = ctx.cantus_under(pen) else {
        return Ok(vec![]);
    };
    let iv = interval(cf, pen);
    if iv.is_third_or_sixth() {
        return Ok(vec![]);
    }
    Ok(vec![rule.violation(
        pen,
        format!("penultimate interval is a {}, expected a third or sixth", iv.name()),
        &[*cf, *pen],
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::note::Duration;
    use crate::rules::test_support::{first_species, placed, run, whole_line};

    #[test]
    fn test_opening_and_closing() {
        let good = first_species(&["C3", "D3", "C3"], &["G3", "B3", "C4"]);
        assert!(run(RuleKind::FirstIntervalPerfect, &good).is_empty());
        assert!(run(RuleKind::LastIntervalPerfect, &good).is_empty());

        let bad = first_species(&["C3", "D3", "C3"], &["E3", "B3", "G3"]);
        assert_eq!(run(RuleKind::FirstIntervalPerfect, &bad).len(), 1);
        assert_eq!(run(RuleKind::LastIntervalPerfect, &bad).len(), 1);
    }

    #[test]
    fn test_downbeat_consonance() {
        let ctx = first_species(&["C3", "D3", "E3"], &["C4", "E4", "F4"]);
        // D3-E4 is a ninth, E3-F4 a minor ninth.
        let v = run(RuleKind::DownbeatConsonance, &ctx);
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].location.measure, 1);
    }

    #[test]
    fn test_vertical_tritone_any_species() {
        // D3 against G#3: augmented fourth.
        let key = Key::c_major();
        for species in Species::ALL {
            let ctx = RuleContext::new(
                species,
                key,
                whole_line(&["C3", "D3"], &key),
                whole_line(&["E4", "G#3"], &key),
            );
            let v = run(RuleKind::VerticalTritone, &ctx);
            assert_eq!(v.len(), 1, "{species}");
            assert_eq!(v[0].location.measure, 1);
        }
    }

    #[test]
    fn test_interior_unison() {
        let ctx = first_species(&["C3", "D3", "E3", "D3", "C3"], &["C3", "D3", "C4", "B3", "C4"]);
        let v = run(RuleKind::InteriorUnison, &ctx);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 1);
    }

    #[test]
    fn test_downbeat_unison_skips_first_and_last_measure() {
        let key = Key::c_major();
        let cf = whole_line(&["C4", "D4", "C4"], &key);
        let cp = placed(
            &[("C4", 0, 0), ("E4", 0, 1), ("D4", 1, 0), ("B3", 1, 1), ("C4", 2, 0)],
            Duration::Half,
            &key,
        );
        let ctx = RuleContext::new(Species::Second, key, cf, cp);
        let v = run(RuleKind::DownbeatUnison, &ctx);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 1);
    }

    #[test]
    fn test_consecutive_perfect_intervals() {
        let ctx = first_species(&["C3", "D3", "E3", "F3"], &["C4", "F4", "G4", "A4"]);
        assert!(run(RuleKind::ConsecutivePerfectIntervals, &ctx).is_empty());
        let ctx = first_species(&["C3", "D3", "C3", "D3"], &["G3", "D4", "C4", "F4"]);
        assert_eq!(run(RuleKind::ConsecutivePerfectIntervals, &ctx).len(), 1);
    }

    #[test]
    fn test_parallel_imperfect_run() {
        // Three thirds in a row are fine (major and minor mixed); four are not.
        let ok = first_species(&["C3", "D3", "E3"], &["E3", "F3", "G3"]);
        assert!(run(RuleKind::ParallelImperfectRun, &ok).is_empty());
        let bad = first_species(&["C3", "D3", "E3", "F3", "G3"], &["E3", "F3", "G3", "A3", "B3"]);
        let v = run(RuleKind::ParallelImperfectRun, &bad);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].location.measure, 3);
        assert_eq!(v[0].affected_notes.len(), 4);
    }

    #[test]
    fn test_penultimate_interval() {
        let good = first_species(&["E3", "D3", "C3"], &["C4", "B3", "C4"]);
        assert!(run(RuleKind::PenultimateInterval, &good).is_empty());
        let bad = first_species(&["E3", "D3", "C3"], &["C4", "A3", "C4"]);
        assert_eq!(run(RuleKind::PenultimateInterval, &bad).len(), 1);
    }
}
