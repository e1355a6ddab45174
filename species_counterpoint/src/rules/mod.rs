// The rule catalog: every check the analyzer can run.
//
// A rule is data (id, name, severity, category, applicable species, prose)
// plus a pure check from `RuleContext` to a list of violations. Each rule is
// identified by a `RuleKind` variant and `Rule::check` dispatches with one
// exhaustive `match`, so adding a variant without wiring its check is a
// compile error.
//
// Checks live in one module per category:
// - intervals.rs: vertical intervals (openings, endings, consonance, unisons)
// - motion.rs: parallel/direct perfects and motion balance
// - spacing.rs: crossing, overlap, distance between the voices
// - melodic.rs: contour discipline of the counterpoint line
// - dissonance.rs: passing/neighbor/cambiata/suspension treatment
// - cadence.rs: tonic and leading-tone requirements at the close
// - rhythm.rs: the species grid, durations, syncopation
//
// The catalog is built once (`RuleCatalog::standard()`), rejected if two
// rules share an id, and handed by reference to the analyzer. Nothing in
// here is global.

pub mod cadence;
pub mod dissonance;
pub mod intervals;
pub mod melodic;
pub mod motion;
pub mod rhythm;
pub mod spacing;

use crate::error::RuleError;
use crate::key::Key;
use crate::note::Note;
use crate::sequence;
use crate::species::{Species, SpeciesConfig};
use crate::voice::VoiceLine;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Everything a rule may look at. Assembled fresh per analysis and never
/// mutated by rules.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleContext {
    pub species: Species,
    pub key: Key,
    pub cantus_firmus: Vec<Note>,
    pub counterpoint: Vec<Note>,
}

impl RuleContext {
    /// Build a context; both voices are put into grid order.
    pub fn new(species: Species, key: Key, cantus_firmus: Vec<Note>, counterpoint: Vec<Note>) -> Self {
        RuleContext {
            species,
            key,
            cantus_firmus: sequence::sorted(&cantus_firmus),
            counterpoint: sequence::sorted(&counterpoint),
        }
    }

    /// Snapshot two edited voices.
    pub fn from_voices(species: Species, key: Key, cantus_firmus: &VoiceLine, counterpoint: &VoiceLine) -> Self {
        Self::new(species, key, cantus_firmus.notes().to_vec(), counterpoint.notes().to_vec())
    }

    pub fn config(&self) -> SpeciesConfig {
        self.species.config()
    }

    /// The cantus firmus note sounding under a counterpoint note.
    pub fn cantus_under(&self, note: &Note) -> Option<&Note> {
        sequence::cantus_under(&self.cantus_firmus, note)
    }

    /// Counterpoint notes paired with the cantus firmus note under each.
    pub fn aligned(&self) -> impl Iterator<Item = (&Note, &Note)> {
        self.counterpoint
            .iter()
            .filter_map(|cp| self.cantus_under(cp).map(|cf| (cf, cp)))
    }

    /// Fails if either voice puts two notes in one slot.
    pub fn check_voices(&self) -> Result<(), RuleError> {
        sequence::check_unique_slots(&self.cantus_firmus, "cantus firmus")?;
        sequence::check_unique_slots(&self.counterpoint, "counterpoint")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Intervals,
    Motion,
    Melodic,
    Dissonance,
    Cadence,
    Voice,
    Rhythm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub measure: usize,
    pub beat: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule_id: &'static str,
    pub rule_name: &'static str,
    pub severity: Severity,
    pub message: String,
    pub explanation: &'static str,
    pub location: Location,
    pub affected_notes: Vec<Note>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{severity} [{}] m{}", self.rule_id, self.location.measure + 1)?;
        if let Some(beat) = self.location.beat {
            write!(f, ":{beat}")?;
        }
        write!(f, ": {}", self.message)
    }
}

pub type RuleOutcome = Result<Vec<Violation>, RuleError>;

pub const ALL_SPECIES: &[Species] = &Species::ALL;
pub const FIRST_ONLY: &[Species] = &[Species::First];
pub const SECOND_ONLY: &[Species] = &[Species::Second];
pub const THIRD_ONLY: &[Species] = &[Species::Third];
pub const FOURTH_ONLY: &[Species] = &[Species::Fourth];
pub const FIFTH_ONLY: &[Species] = &[Species::Fifth];
pub const MULTI_NOTE: &[Species] = &[Species::Second, Species::Third, Species::Fourth, Species::Fifth];

/// Every rule the crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    // intervals
    FirstIntervalPerfect,
    LastIntervalPerfect,
    DownbeatConsonance,
    VerticalTritone,
    InteriorUnison,
    DownbeatUnison,
    ConsecutivePerfectIntervals,
    ParallelImperfectRun,
    PenultimateInterval,
    // motion
    ParallelFifths,
    ParallelOctaves,
    DirectFifths,
    DirectOctaves,
    OffbeatParallels,
    SimilarMotionRun,
    ContraryMotionBalance,
    // voice
    VoiceCrossing,
    VoiceOverlap,
    ExcessiveSpacing,
    // melodic
    RepeatedNotes,
    LeapRecovery,
    ConsecutiveLeapsSameDirection,
    ThreeConsecutiveLeaps,
    SingleClimax,
    SingleNadir,
    LeapLargerThanOctave,
    MelodicTritone,
    MelodicSeventh,
    AugmentedDiminishedMelodic,
    SixthLeap,
    MelodicRange,
    StepwisePredominance,
    DirectionRun,
    ChromaticStep,
    OutOfKey,
    // dissonance
    S2WeakBeatPassing,
    S3DissonanceFigures,
    S4SuspensionPreparation,
    S4SuspensionResolutionDirection,
    S4SuspensionResolutionStep,
    S4ResolutionConsonance,
    S4WeakBeatConsonance,
    S4ResolutionToUnison,
    DissonanceLegality,
    // cadence
    CadenceFinalTonic,
    CadenceLeadingTone,
    CadenceLeadingToneApproach,
    CantusTonicFrame,
    // rhythm
    SpeciesDuration,
    SpeciesGrid,
    MeasureCoverage,
    CounterpointOverrun,
    S4SyncopationContinuity,
    S5RhythmicVariety,
    S5EighthPairs,
    UniqueSlots,
}

/// One registered rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub kind: RuleKind,
    pub id: &'static str,
    pub name: &'static str,
    pub severity: Severity,
    pub category: Category,
    pub species: &'static [Species],
    pub description: &'static str,
    /// Teaching text attached to every violation of this rule.
    pub explanation: &'static str,
}

/// Shorthand used by the category modules to declare their rules.
pub(crate) struct RuleDef {
    pub kind: RuleKind,
    pub id: &'static str,
    pub name: &'static str,
    pub severity: Severity,
    pub species: &'static [Species],
    pub description: &'static str,
    pub explanation: &'static str,
}

impl RuleDef {
    pub(crate) fn into_rule(self, category: Category) -> Rule {
        Rule {
            kind: self.kind,
            id: self.id,
            name: self.name,
            severity: self.severity,
            category,
            species: self.species,
            description: self.description,
            explanation: self.explanation,
        }
    }
}

impl Rule {
    pub fn applies_to(&self, species: Species) -> bool {
        self.species.contains(&species)
    }

    /// Run the check. Rules that pair notes by position fail on voices
    /// with two notes in one slot; the rest still run.
    pub fn check(&self, ctx: &RuleContext) -> RuleOutcome {
        use RuleKind::*;
        match self.kind {
            FirstIntervalPerfect => intervals::first_interval_perfect(self, ctx),
            LastIntervalPerfect => intervals::last_interval_perfect(self, ctx),
            DownbeatConsonance => intervals::downbeat_consonance(self, ctx),
            VerticalTritone => intervals::vertical_tritone(self, ctx),
            InteriorUnison => intervals::interior_unison(self, ctx),
            DownbeatUnison => intervals::downbeat_unison(self, ctx),
            ConsecutivePerfectIntervals => intervals::consecutive_perfect_intervals(self, ctx),
            ParallelImperfectRun => intervals::parallel_imperfect_run(self, ctx),
            PenultimateInterval => intervals::penultimate_interval(self, ctx),
            ParallelFifths => motion::parallel_fifths(self, ctx),
            ParallelOctaves => motion::parallel_octaves(self, ctx),
            DirectFifths => motion::direct_fifths(self, ctx),
            DirectOctaves => motion::direct_octaves(self, ctx),
            OffbeatParallels => motion::offbeat_parallels(self, ctx),
            SimilarMotionRun => motion::similar_motion_run(self, ctx),
            ContraryMotionBalance => motion::contrary_motion_balance(self, ctx),
            VoiceCrossing => spacing::voice_crossing(self, ctx),
            VoiceOverlap => spacing::voice_overlap(self, ctx),
            ExcessiveSpacing => spacing::excessive_spacing(self, ctx),
            RepeatedNotes => melodic::repeated_notes(self, ctx),
            LeapRecovery => melodic::leap_recovery(self, ctx),
            ConsecutiveLeapsSameDirection => melodic::consecutive_leaps_same_direction(self, ctx),
            ThreeConsecutiveLeaps => melodic::three_consecutive_leaps(self, ctx),
            SingleClimax => melodic::single_climax(self, ctx),
            SingleNadir => melodic::single_nadir(self, ctx),
            LeapLargerThanOctave => melodic::leap_larger_than_octave(self, ctx),
            MelodicTritone => melodic::melodic_tritone(self, ctx),
            MelodicSeventh => melodic::melodic_seventh(self, ctx),
            AugmentedDiminishedMelodic => melodic::augmented_diminished_melodic(self, ctx),
            SixthLeap => melodic::sixth_leap(self, ctx),
            MelodicRange => melodic::melodic_range(self, ctx),
            StepwisePredominance => melodic::stepwise_predominance(self, ctx),
            DirectionRun => melodic::direction_run(self, ctx),
            ChromaticStep => melodic::chromatic_step(self, ctx),
            OutOfKey => melodic::out_of_key(self, ctx),
            S2WeakBeatPassing => dissonance::s2_weak_beat_passing(self, ctx),
            S3DissonanceFigures => dissonance::s3_dissonance_figures(self, ctx),
            S4SuspensionPreparation => dissonance::s4_suspension_preparation(self, ctx),
            S4SuspensionResolutionDirection => dissonance::s4_suspension_resolution_direction(self, ctx),
            S4SuspensionResolutionStep => dissonance::s4_suspension_resolution_step(self, ctx),
            S4ResolutionConsonance => dissonance::s4_resolution_consonance(self, ctx),
            S4WeakBeatConsonance => dissonance::s4_weak_beat_consonance(self, ctx),
            S4ResolutionToUnison => dissonance::s4_resolution_to_unison(self, ctx),
            DissonanceLegality => dissonance::dissonance_legality(self, ctx),
            CadenceFinalTonic => cadence::final_tonic(self, ctx),
            CadenceLeadingTone => cadence::leading_tone(self, ctx),
            CadenceLeadingToneApproach => cadence::leading_tone_approach(self, ctx),
            CantusTonicFrame => cadence::cantus_tonic_frame(self, ctx),
            SpeciesDuration => rhythm::species_duration(self, ctx),
            SpeciesGrid => rhythm::species_grid(self, ctx),
            MeasureCoverage => rhythm::measure_coverage(self, ctx),
            CounterpointOverrun => rhythm::counterpoint_overrun(self, ctx),
            S4SyncopationContinuity => rhythm::s4_syncopation_continuity(self, ctx),
            S5RhythmicVariety => rhythm::s5_rhythmic_variety(self, ctx),
            S5EighthPairs => rhythm::s5_eighth_pairs(self, ctx),
            UniqueSlots => rhythm::unique_slots(self, ctx),
        }
    }

    /// A violation located at `at`.
    pub fn violation(&self, at: &Note, message: impl Into<String>, affected: &[Note]) -> Violation {
        Violation {
            rule_id: self.id,
            rule_name: self.name,
            severity: self.severity,
            message: message.into(),
            explanation: self.explanation,
            location: Location {
                measure: at.measure,
                beat: Some(at.beat),
            },
            affected_notes: affected.to_vec(),
        }
    }

    /// A violation about a whole measure (or the line as a whole).
    pub fn measure_violation(&self, measure: usize, message: impl Into<String>, affected: &[Note]) -> Violation {
        Violation {
            rule_id: self.id,
            rule_name: self.name,
            severity: self.severity,
            message: message.into(),
            explanation: self.explanation,
            location: Location { measure, beat: None },
            affected_notes: affected.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate rule id {0:?}")]
    DuplicateId(&'static str),
}

/// The registry of rules, in registration order.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    pub fn new(rules: Vec<Rule>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id) {
                return Err(CatalogError::DuplicateId(rule.id));
            }
        }
        Ok(RuleCatalog { rules })
    }

    /// The full standard rule set.
    pub fn standard() -> Self {
        let mut rules = Vec::new();
        rules.extend(intervals::rules());
        rules.extend(motion::rules());
        rules.extend(spacing::rules());
        rules.extend(melodic::rules());
        rules.extend(dissonance::rules());
        rules.extend(cadence::rules());
        rules.extend(rhythm::rules());
        // Ids are string literals in this crate; a clash is a programming
        // error caught by the catalog tests.
        RuleCatalog { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn by_kind(&self, kind: RuleKind) -> Option<&Rule> {
        self.rules.iter().find(|r| r.kind == kind)
    }

    /// Rules that run for the given species, in registration order.
    pub fn applicable(&self, species: Species) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(move |r| r.applies_to(species))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::note::Duration;

    pub fn whole_line(pitches: &[&str], key: &Key) -> Vec<Note> {
        pitches
            .iter()
            .enumerate()
            .map(|(m, p)| Note::whole(p.parse().unwrap(), m, key))
            .collect()
    }

    /// (pitch, measure, beat) triples with the given duration.
    pub fn placed(notes: &[(&str, usize, u8)], duration: Duration, key: &Key) -> Vec<Note> {
        notes
            .iter()
            .map(|&(p, m, b)| Note::new(p.parse().unwrap(), duration, m, b, key))
            .collect()
    }

    pub fn first_species(cf: &[&str], cp: &[&str]) -> RuleContext {
        let key = Key::c_major();
        RuleContext::new(Species::First, key, whole_line(cf, &key), whole_line(cp, &key))
    }

    pub fn run(kind: RuleKind, ctx: &RuleContext) -> Vec<Violation> {
        let catalog = RuleCatalog::standard();
        let rule = catalog.by_kind(kind).unwrap();
        rule.check(ctx).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_catalog_has_unique_ids() {
        let catalog = RuleCatalog::standard();
        let rebuilt = RuleCatalog::new(catalog.rules().to_vec());
        assert!(rebuilt.is_ok(), "{rebuilt:?}");
        assert!(catalog.len() >= 50);
    }

    #[test]
    fn test_every_kind_registered_once() {
        let catalog = RuleCatalog::standard();
        let kinds: HashSet<RuleKind> = catalog.rules().iter().map(|r| r.kind).collect();
        assert_eq!(kinds.len(), catalog.len());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let catalog = RuleCatalog::standard();
        let mut rules = catalog.rules().to_vec();
        rules.push(rules[0].clone());
        assert_eq!(
            RuleCatalog::new(rules).unwrap_err(),
            CatalogError::DuplicateId(catalog.rules()[0].id)
        );
    }

    #[test]
    fn test_every_species_has_rules_and_ids_are_kebab_case() {
        let catalog = RuleCatalog::standard();
        for species in Species::ALL {
            assert!(catalog.applicable(species).count() > 20, "{species}");
        }
        for rule in catalog.rules() {
            assert!(
                rule.id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "{}",
                rule.id
            );
            assert!(!rule.species.is_empty());
            assert!(!rule.description.is_empty());
        }
    }

    #[test]
    fn test_suspension_rule_lookup_by_id() {
        let catalog = RuleCatalog::standard();
        let rule = catalog.get("s4-suspension-resolution-direction").unwrap();
        assert_eq!(rule.kind, RuleKind::S4SuspensionResolutionDirection);
        assert!(rule.applies_to(Species::Fourth));
        assert!(!rule.applies_to(Species::First));
    }

    #[test]
    fn test_duplicate_slot_fails_only_positional_rules() {
        let key = Key::c_major();
        let mut cp = test_support::whole_line(&["C4", "D4"], &key);
        cp.push(Note::whole("F4".parse().unwrap(), 1, &key));
        let ctx = RuleContext::new(Species::First, key, test_support::whole_line(&["C3", "D3"], &key), cp);
        let catalog = RuleCatalog::standard();
        let check = |kind| catalog.by_kind(kind).unwrap().check(&ctx);
        assert_eq!(
            check(RuleKind::ParallelOctaves),
            Err(RuleError::DuplicateSlot {
                voice: "counterpoint",
                measure: 1,
                beat: 0
            })
        );
        assert_eq!(check(RuleKind::UniqueSlots).unwrap().len(), 1);
        assert!(check(RuleKind::CadenceFinalTonic).is_ok());
    }

    #[test]
    fn test_context_sorts_voices() {
        let key = Key::c_major();
        let cf = test_support::whole_line(&["D3", "C3"], &key);
        let reversed: Vec<Note> = cf.iter().rev().copied().collect();
        let ctx = RuleContext::new(Species::First, key, reversed, vec![]);
        assert_eq!(ctx.cantus_firmus, cf);
    }
}
