//! Clause accumulation, guarding and WCNFPlus conversion

use indexmap::{IndexMap, IndexSet};

use oxmod_atom::Atom;

use super::clause::Clause;
use super::variables::{is_synthetic, negate, unsigned, Token, VariableIndex};

/// An ordered collection of clauses plus derived indexes over the atoms
/// and flags they reference.
///
/// Formulas are built per compilation unit (per package, per nested
/// conditional group) and merged upward; the root formula is converted
/// once into a [`WcnfPlus`] at the end of a resolution attempt. The
/// indexes are rebuilt incrementally as clauses are appended, never set
/// directly.
#[derive(Debug, Clone, Default)]
pub struct Formula {
    clauses: Vec<Clause>,
    /// Atoms referenced per `category/name`
    atoms: IndexMap<String, IndexSet<Atom>>,
    /// Flags referenced per selection token
    flags: IndexMap<String, IndexSet<String>>,
}

impl Formula {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clause, updating the derived indexes.
    pub fn push(&mut self, clause: Clause) {
        self.index_clause(&clause);
        self.clauses.push(clause);
    }

    /// Append every clause of `other`. Clauses become independent value
    /// objects of this formula; `other` is consumed.
    pub fn merge(&mut self, other: Formula) {
        for clause in other.clauses {
            self.push(clause);
        }
    }

    /// Merge a formula that has been closed off by [`Formula::guard`].
    pub fn merge_guarded(&mut self, other: GuardedFormula) {
        self.merge(other.inner);
    }

    /// Guard every non-cardinality clause with the given literals: each
    /// guard joins the clause body (any guard already present is not
    /// duplicated) and its negation joins the clause's requirements.
    ///
    /// Consuming `self` and returning a [`GuardedFormula`] makes the
    /// guard-then-merge ordering a compile-time contract: no further
    /// clauses can be merged into a formula once it has been guarded.
    pub fn guard(mut self, guards: &[Token]) -> GuardedFormula {
        for clause in &mut self.clauses {
            if clause.is_cardinality() {
                continue;
            }
            for guard in guards {
                if !clause.literals.contains(guard) {
                    clause.literals.push(guard.clone());
                }
                clause.requirements.insert(negate(guard));
            }
        }
        GuardedFormula { inner: self }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Atoms referenced by appended clauses, keyed by `category/name`.
    pub fn atoms(&self) -> &IndexMap<String, IndexSet<Atom>> {
        &self.atoms
    }

    /// Flags referenced by appended clauses, keyed by selection token.
    pub fn flags(&self) -> &IndexMap<String, IndexSet<String>> {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Convert to the solver-ready form, interning every literal through
    /// `vars`. Entries appear in clause-append order, which affects solver
    /// tie-breaking but not correctness.
    pub fn get_wcnfplus(&self, vars: &mut VariableIndex) -> WcnfPlus {
        let mut wcnf = WcnfPlus::default();
        for clause in &self.clauses {
            let literals: Vec<i32> = clause.literals.iter().map(|l| vars.getnum(l)).collect();
            if let Some(bound) = clause.atmost_bound() {
                wcnf.atmost.push((literals, bound));
            } else if let Some(weight) = clause.weight() {
                wcnf.soft.push((literals, weight));
            } else {
                wcnf.hard.push(literals);
            }
        }
        wcnf
    }

    fn index_clause(&mut self, clause: &Clause) {
        for literal in &clause.literals {
            let base = unsigned(literal);
            if is_synthetic(base) {
                continue;
            }
            let Ok(atom) = Atom::parse(base) else {
                continue;
            };
            if atom.use_deps().is_empty() {
                self.atoms.entry(atom.cpn()).or_default().insert(atom);
            } else {
                let selection = atom.strip_use().to_string();
                let flags = self.flags.entry(selection).or_default();
                for use_dep in atom.use_deps() {
                    flags.insert(use_dep.flag.clone());
                }
            }
        }
    }
}

/// A formula whose clauses have been guarded; it can only be merged into
/// a parent formula.
#[derive(Debug, Clone)]
pub struct GuardedFormula {
    inner: Formula,
}

impl GuardedFormula {
    pub fn clauses(&self) -> &[Clause] {
        self.inner.clauses()
    }
}

/// The solver-ready formula: hard clauses, weighted soft clauses and
/// at-most-k cardinality constraints, in append order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WcnfPlus {
    pub hard: Vec<Vec<i32>>,
    pub soft: Vec<(Vec<i32>, u64)>,
    pub atmost: Vec<(Vec<i32>, usize)>,
}

impl WcnfPlus {
    pub fn is_empty(&self) -> bool {
        self.hard.is_empty() && self.soft.is_empty() && self.atmost.is_empty()
    }
}
