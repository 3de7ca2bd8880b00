//! CNF clause model with provenance and conflict attribution

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexSet;

use oxmod_atom::{atom_sat, Atom};

use super::variables::{is_negated, is_synthetic, unsigned, Token};

/// What a clause encodes, beyond its raw disjunction.
///
/// The specialized variants carry the atoms and flags they reference so
/// that conflicts between clauses can be attributed after solving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClauseKind {
    /// Structural clause. `weight` marks a soft clause, `atmost` a
    /// cardinality bound; the two are mutually exclusive.
    Meta {
        weight: Option<u64>,
        atmost: Option<usize>,
    },
    /// "owner needs one of these candidates" for the given constraint atom
    Dependency { atom: Atom },
    /// "owner excludes this candidate" for the given blocked atom
    Blocker { atom: Atom },
    /// Flag state required on a candidate when it is selected
    UseDependency {
        atom: Atom,
        candidate: Token,
        flag: String,
        enabled: bool,
    },
    /// A clause compiled from the owner's REQUIRED_USE expression
    RequiredUse { atom: Atom },
}

/// A disjunction of token literals with provenance.
///
/// `origin` names the atom (or pseudo-source such as the user request)
/// the clause was compiled from. `requirements` accumulates the negations
/// of the guards wrapped around the clause: the extra literals that must
/// hold in a candidate model before this clause can be blamed for a
/// conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub literals: Vec<Token>,
    pub origin: String,
    pub description: Option<String>,
    pub requirements: IndexSet<Token>,
    kind: ClauseKind,
}

impl Clause {
    fn new(literals: Vec<Token>, origin: impl Into<String>, kind: ClauseKind) -> Self {
        Self {
            literals,
            origin: origin.into(),
            description: None,
            requirements: IndexSet::new(),
            kind,
        }
    }

    /// Plain hard disjunction
    pub fn meta(literals: Vec<Token>, origin: impl Into<String>) -> Self {
        Self::new(
            literals,
            origin,
            ClauseKind::Meta {
                weight: None,
                atmost: None,
            },
        )
    }

    /// Soft clause with the given weight
    pub fn soft(literals: Vec<Token>, origin: impl Into<String>, weight: u64) -> Self {
        Self::new(
            literals,
            origin,
            ClauseKind::Meta {
                weight: Some(weight),
                atmost: None,
            },
        )
    }

    /// At-most-`bound` cardinality constraint over the literals
    pub fn atmost(literals: Vec<Token>, origin: impl Into<String>, bound: usize) -> Self {
        Self::new(
            literals,
            origin,
            ClauseKind::Meta {
                weight: None,
                atmost: Some(bound),
            },
        )
    }

    pub fn dependency(literals: Vec<Token>, origin: impl Into<String>, atom: Atom) -> Self {
        Self::new(literals, origin, ClauseKind::Dependency { atom })
    }

    pub fn blocker(literals: Vec<Token>, origin: impl Into<String>, atom: Atom) -> Self {
        Self::new(literals, origin, ClauseKind::Blocker { atom })
    }

    pub fn use_dependency(
        literals: Vec<Token>,
        origin: impl Into<String>,
        atom: Atom,
        candidate: Token,
        flag: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self::new(
            literals,
            origin,
            ClauseKind::UseDependency {
                atom,
                candidate,
                flag: flag.into(),
                enabled,
            },
        )
    }

    pub fn required_use(literals: Vec<Token>, origin: impl Into<String>, atom: Atom) -> Self {
        Self::new(literals, origin, ClauseKind::RequiredUse { atom })
    }

    /// Attach a human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Record a guard literal's negation as a requirement
    pub fn with_requirement(mut self, requirement: Token) -> Self {
        self.requirements.insert(requirement);
        self
    }

    pub fn kind(&self) -> &ClauseKind {
        &self.kind
    }

    pub fn weight(&self) -> Option<u64> {
        match self.kind {
            ClauseKind::Meta { weight, .. } => weight,
            _ => None,
        }
    }

    pub fn atmost_bound(&self) -> Option<usize> {
        match self.kind {
            ClauseKind::Meta { atmost, .. } => atmost,
            _ => None,
        }
    }

    /// Cardinality clauses are immune to guarding.
    pub fn is_cardinality(&self) -> bool {
        self.atmost_bound().is_some()
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Whether every accumulated requirement holds in the model.
    pub fn requirements_met(&self, model: &HashSet<Token>) -> bool {
        self.requirements.iter().all(|r| model.contains(r))
    }

    /// Positive, non-synthetic selection literals: the concrete candidates
    /// this clause can select.
    fn positive_candidates(&self) -> impl Iterator<Item = &str> {
        self.literals
            .iter()
            .map(String::as_str)
            .filter(|l| !is_negated(l) && !is_synthetic(l) && !l.ends_with(']'))
    }

    /// Whether this clause and `other` are mutually exclusive under the
    /// candidate model.
    ///
    /// This is a post-hoc explanation predicate: it is never consulted
    /// during solving, only when attributing an unsatisfiable outcome to
    /// clause pairs. It is not symmetric; callers interested in either
    /// direction check both.
    pub fn blocks(&self, model: &HashSet<Token>, other: &Clause) -> bool {
        match (&self.kind, &other.kind) {
            // A dependency on X blocks a blocker of X: the dependency can
            // only pick candidates the blocker excludes.
            (ClauseKind::Dependency { .. }, ClauseKind::Blocker { atom: blocked }) => {
                other.requirements_met(model)
                    && self.positive_candidates().any(|token| candidate_matches(blocked, token))
            }
            // And a blocker of X blocks a dependency on X.
            (ClauseKind::Blocker { atom: blocked }, ClauseKind::Dependency { .. }) => {
                self.requirements_met(model)
                    && other.positive_candidates().any(|token| candidate_matches(blocked, token))
            }
            // Opposite flag requirements on the same candidate.
            (
                ClauseKind::UseDependency {
                    candidate: c1,
                    flag: f1,
                    enabled: e1,
                    ..
                },
                ClauseKind::UseDependency {
                    candidate: c2,
                    flag: f2,
                    enabled: e2,
                    ..
                },
            ) => {
                c1 == c2
                    && f1 == f2
                    && e1 != e2
                    && self.requirements_met(model)
                    && other.requirements_met(model)
            }
            _ => false,
        }
    }

    fn kind_str(&self) -> &'static str {
        match self.kind {
            ClauseKind::Meta {
                atmost: Some(_), ..
            } => "atmost",
            ClauseKind::Meta {
                weight: Some(_), ..
            } => "soft",
            ClauseKind::Meta { .. } => "meta",
            ClauseKind::Dependency { .. } => "dependency",
            ClauseKind::Blocker { .. } => "blocker",
            ClauseKind::UseDependency { .. } => "use-dependency",
            ClauseKind::RequiredUse { .. } => "required-use",
        }
    }
}

/// Whether a selection token names a package matched by the constraint.
fn candidate_matches(constraint: &Atom, token: &str) -> bool {
    Atom::parse(unsigned(token))
        .map(|candidate| atom_sat(constraint, &candidate))
        .unwrap_or(false)
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) [{}]", self.kind_str(), self.literals.join(" | "))
    }
}
