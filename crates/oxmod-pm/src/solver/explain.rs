//! Conflict attribution for unsatisfiable outcomes
//!
//! The compiler never fails on an unsatisfiable universe; the solver does.
//! When it does, these helpers reconstruct which clause pairs exclude each
//! other under a candidate model, using the provenance every clause
//! carries. This is an analysis utility: nothing in the compilation path
//! depends on it.

use std::collections::HashSet;

use super::clause::{Clause, ClauseKind};
use super::formula::Formula;
use super::variables::Token;

/// A pair of mutually exclusive clauses under some model.
#[derive(Debug, Clone)]
pub struct Conflict<'f> {
    pub first: &'f Clause,
    pub second: &'f Clause,
}

impl Conflict<'_> {
    /// One line per side, naming origin and constraint.
    pub fn describe(&self) -> String {
        format!(
            "  - {}\n  - {}",
            describe_clause(self.first),
            describe_clause(self.second)
        )
    }
}

/// All clause pairs that exclude each other under `model`.
///
/// `blocks` is not symmetric, so both directions are checked for every
/// pair; a pair is reported once.
pub fn find_conflicts<'f>(formula: &'f Formula, model: &HashSet<Token>) -> Vec<Conflict<'f>> {
    let clauses = formula.clauses();
    let mut conflicts = Vec::new();
    for (i, first) in clauses.iter().enumerate() {
        for second in &clauses[i + 1..] {
            if first.blocks(model, second) || second.blocks(model, first) {
                conflicts.push(Conflict { first, second });
            }
        }
    }
    conflicts
}

/// A multi-line report over every conflict found, or a fixed line when
/// there is nothing to attribute.
pub fn describe_conflicts(formula: &Formula, model: &HashSet<Token>) -> String {
    let conflicts = find_conflicts(formula, model);
    if conflicts.is_empty() {
        return "No attributable conflicts found".to_string();
    }
    conflicts
        .iter()
        .enumerate()
        .map(|(i, c)| format!("Conflict {}:\n{}", i + 1, c.describe()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_clause(clause: &Clause) -> String {
    if let Some(ref description) = clause.description {
        return format!("{} ({})", description, clause.origin);
    }
    match clause.kind() {
        ClauseKind::Dependency { atom } => format!("{} requires {atom}", clause.origin),
        ClauseKind::Blocker { atom } => format!("{} blocks {atom}", clause.origin),
        ClauseKind::UseDependency {
            candidate,
            flag,
            enabled,
            ..
        } => {
            let state = if *enabled { "enabled" } else { "disabled" };
            format!("{} needs {flag} {state} on {candidate}", clause.origin)
        }
        ClauseKind::RequiredUse { atom } => format!("{atom} restricts its own flags"),
        ClauseKind::Meta { .. } => format!("constraint from {}", clause.origin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxmod_atom::Atom;

    fn atom(s: &str) -> Atom {
        Atom::parse(s).unwrap()
    }

    fn lits(tokens: &[&str]) -> Vec<Token> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_find_conflicts_reports_blocker_pair() {
        let mut formula = Formula::new();
        formula.push(Clause::dependency(
            lits(&["-base/a-1.0", "base/x-1.0"]),
            "base/a-1.0",
            atom("base/x"),
        ));
        formula.push(Clause::blocker(
            lits(&["-base/b-1.0", "-base/x-1.0"]),
            "base/b-1.0",
            atom("base/x"),
        ));

        let model = HashSet::new();
        let conflicts = find_conflicts(&formula, &model);
        assert_eq!(conflicts.len(), 1);

        let report = describe_conflicts(&formula, &model);
        assert!(report.contains("base/a-1.0 requires base/x"));
        assert!(report.contains("base/b-1.0 blocks base/x"));
    }

    #[test]
    fn test_no_conflicts() {
        let mut formula = Formula::new();
        formula.push(Clause::meta(lits(&["base/a-1.0"]), "request"));
        let model = HashSet::new();
        assert!(find_conflicts(&formula, &model).is_empty());
        assert_eq!(describe_conflicts(&formula, &model), "No attributable conflicts found");
    }

    #[test]
    fn test_requirements_gate_reporting() {
        let mut formula = Formula::new();
        formula.push(Clause::dependency(
            lits(&["-base/a-1.0", "base/x-1.0"]),
            "base/a-1.0",
            atom("base/x"),
        ));
        formula.push(
            Clause::blocker(
                lits(&["-base/b-1.0", "-base/x-1.0"]),
                "base/b-1.0",
                atom("base/x"),
            )
            .with_requirement("base/b-1.0".to_string()),
        );

        let empty = HashSet::new();
        assert!(find_conflicts(&formula, &empty).is_empty());

        let mut model = HashSet::new();
        model.insert("base/b-1.0".to_string());
        assert_eq!(find_conflicts(&formula, &model).len(), 1);
    }
}
