// The analysis orchestrator.
//
// `Analyzer` holds a reference to a rule catalog and runs every rule that
// applies to the context's species. Each check is isolated: a rule that
// returns an error or panics is logged and its contribution dropped, and
// the rest of the analysis carries on. Violations come back in rule
// registration order, so two runs over the same context produce identical
// results.
//
// `analyze_parallel` fans the same checks out over the rayon pool. The
// collect is order-preserving, so its result equals `analyze`'s.

use crate::rules::{Rule, RuleCatalog, RuleContext, Severity, Violation};
use crate::species::Species;
use rayon::prelude::*;
use serde::Serialize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub violations: Vec<Violation>,
    /// True iff there are no error-severity violations.
    pub is_valid: bool,
    pub error_count: usize,
    pub warning_count: usize,
}

impl AnalysisResult {
    pub fn empty() -> Self {
        Self::from_violations(Vec::new())
    }

    pub fn from_violations(violations: Vec<Violation>) -> Self {
        let error_count = violations.iter().filter(|v| v.severity == Severity::Error).count();
        let warning_count = violations.len() - error_count;
        AnalysisResult {
            violations,
            is_valid: error_count == 0,
            error_count,
            warning_count,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.severity == Severity::Warning)
    }

    /// Violations of one rule, by id.
    pub fn by_rule<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.rule_id == id)
    }
}

pub struct Analyzer<'c> {
    catalog: &'c RuleCatalog,
}

impl<'c> Analyzer<'c> {
    pub fn new(catalog: &'c RuleCatalog) -> Self {
        Analyzer { catalog }
    }

    pub fn applicable_rules(&self, species: Species) -> Vec<&'c Rule> {
        self.catalog.applicable(species).collect()
    }

    pub fn analyze(&self, ctx: &RuleContext) -> AnalysisResult {
        if ctx.counterpoint.is_empty() || ctx.cantus_firmus.is_empty() {
            return AnalysisResult::empty();
        }
        let violations: Vec<Violation> = self
            .applicable_rules(ctx.species)
            .into_iter()
            .filter_map(|rule| run_isolated(rule, ctx))
            .flatten()
            .collect();
        summarize(ctx, violations)
    }

    pub fn analyze_parallel(&self, ctx: &RuleContext) -> AnalysisResult {
        if ctx.counterpoint.is_empty() || ctx.cantus_firmus.is_empty() {
            return AnalysisResult::empty();
        }
        let per_rule: Vec<Option<Vec<Violation>>> = self
            .applicable_rules(ctx.species)
            .par_iter()
            .map(|rule| run_isolated(rule, ctx))
            .collect();
        summarize(ctx, per_rule.into_iter().flatten().flatten().collect())
    }
}

/// Run one rule, containing failures. `None` means the rule was excluded.
fn run_isolated(rule: &Rule, ctx: &RuleContext) -> Option<Vec<Violation>> {
    match catch_unwind(AssertUnwindSafe(|| rule.check(ctx))) {
        Ok(Ok(violations)) => Some(violations),
        Ok(Err(e)) => {
            error!(rule = rule.id, error = %e, "rule check failed, excluding its result");
            None
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(rule = rule.id, panic = %msg, "rule check panicked, excluding its result");
            None
        }
    }
}

fn summarize(ctx: &RuleContext, violations: Vec<Violation>) -> AnalysisResult {
    let result = AnalysisResult::from_violations(violations);
    debug!(
        species = %ctx.species,
        errors = result.error_count,
        warnings = result.warning_count,
        "analysis complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::note::Note;
    use crate::rules::test_support::{first_species, whole_line};

    #[test]
    fn test_empty_counterpoint_is_valid() {
        let catalog = RuleCatalog::standard();
        let ctx = first_species(&["C3", "D3", "C3"], &[]);
        let result = Analyzer::new(&catalog).analyze(&ctx);
        assert_eq!(result, AnalysisResult::empty());
        assert!(result.is_valid);
        assert_eq!(result.error_count + result.warning_count, 0);
    }

    #[test]
    fn test_counts_and_validity() {
        let catalog = RuleCatalog::standard();
        let cf = ["C3", "D3", "E3", "F3", "G3", "F3", "E3", "D3", "C3"];
        let cp = ["C4", "D4", "E4", "F4", "G4", "F4", "E4", "D4", "C4"];
        let result = Analyzer::new(&catalog).analyze(&first_species(&cf, &cp));
        assert!(!result.is_valid);
        assert_eq!(result.errors().count(), result.error_count);
        assert_eq!(result.warnings().count(), result.warning_count);
        assert_eq!(result.by_rule("parallel-octaves").count(), 8);
    }

    #[test]
    fn test_violations_follow_registration_order() {
        let catalog = RuleCatalog::standard();
        let ctx = first_species(&["C3", "D3", "E3", "C3"], &["E3", "F3", "D4", "G3"]);
        let result = Analyzer::new(&catalog).analyze(&ctx);
        let position = |id: &str| catalog.rules().iter().position(|r| r.id == id).unwrap();
        let order: Vec<usize> = result.violations.iter().map(|v| position(v.rule_id)).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let catalog = RuleCatalog::standard();
        let analyzer = Analyzer::new(&catalog);
        let ctx = first_species(
            &["D3", "F3", "E3", "D3", "G3", "F3", "A3", "G3", "F3", "E3", "D3"],
            &["A3", "A3", "G3", "A3", "B3", "C4", "C4", "B3", "D4", "C#4", "D4"],
        );
        assert_eq!(analyzer.analyze(&ctx), analyzer.analyze_parallel(&ctx));
    }

    #[test]
    fn test_failing_rules_are_excluded() {
        let catalog = RuleCatalog::standard();
        let key = Key::c_major();
        let mut cp = whole_line(&["C4", "D4", "E4"], &key);
        // A second note on the measure 1 downbeat: the motion rules refuse
        // the context while everything else still reports.
        cp.push(Note::whole("G4".parse().unwrap(), 1, &key));
        let ctx = RuleContext::new(Species::First, key, whole_line(&["C3", "D3", "E3"], &key), cp);
        let result = Analyzer::new(&catalog).analyze(&ctx);

        assert_eq!(result.by_rule("unique-slots").count(), 1);
        assert_eq!(result.by_rule("measure-coverage").count(), 1);
        for id in ["parallel-octaves", "direct-fifths", "offbeat-parallels", "contrary-motion-balance"] {
            assert_eq!(result.by_rule(id).count(), 0, "{id}");
        }
        assert!(!result.is_valid);
        assert_eq!(result, Analyzer::new(&catalog).analyze_parallel(&ctx));
    }

    #[test]
    fn test_applicable_rules_filter_by_species() {
        let catalog = RuleCatalog::standard();
        let analyzer = Analyzer::new(&catalog);
        let first = analyzer.applicable_rules(Species::First);
        assert!(first.iter().any(|r| r.id == "s1-interior-unison"));
        assert!(first.iter().all(|r| r.applies_to(Species::First)));
        assert!(!first.iter().any(|r| r.id == "dissonance-legality"));
    }
}
