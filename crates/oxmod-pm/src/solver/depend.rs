//! DEPEND/RDEPEND compilation to CNF
//!
//! Translates dependency expressions into clauses over selection and flag
//! tokens, resolving each atom against the repository and reporting every
//! candidate it touches so the driver can extend its fixed-point fringe.
//! This compiler never decides satisfiability; an unsatisfiable group
//! still compiles successfully.

use std::sync::Arc;

use oxmod_atom::{Atom, Blocker};

use crate::error::{OxmodError, Result};
use crate::package::Package;
use crate::repository::Repository;
use crate::usestr::{human_readable_required_use, Expr, Group, GroupKind};

use super::clause::Clause;
use super::formula::Formula;
use super::variables::{flag_token, negate, Token, VariableIndex};

/// Weight of the soft clauses a weak blocker compiles to.
const WEAK_BLOCKER_WEIGHT: u64 = 1;

pub struct DependencyCompiler<'a> {
    owner: &'a Atom,
    owner_token: Token,
    repo: &'a dyn Repository,
    vars: &'a mut VariableIndex,
    discovered: Vec<Atom>,
}

impl<'a> DependencyCompiler<'a> {
    pub fn new(owner: &'a Atom, repo: &'a dyn Repository, vars: &'a mut VariableIndex) -> Self {
        Self {
            owner,
            owner_token: owner.to_string(),
            repo,
            vars,
            discovered: Vec::new(),
        }
    }

    /// Compile a parsed dependency sequence.
    pub fn compile(&mut self, exprs: &[Expr]) -> Result<Formula> {
        let mut formula = Formula::new();
        for expr in exprs {
            self.compile_node(expr, &mut formula)?;
        }
        Ok(formula)
    }

    /// Fully-qualified atoms of every candidate resolved while compiling,
    /// for the driver's next fixed-point round.
    pub fn into_discovered(self) -> Vec<Atom> {
        self.discovered
    }

    fn compile_node(&mut self, expr: &Expr, parent: &mut Formula) -> Result<()> {
        match expr {
            Expr::Token(atom_str) => self.compile_atom(atom_str, parent),
            Expr::Group(group) => match &group.kind {
                GroupKind::All => {
                    for child in &group.children {
                        self.compile_node(child, parent)?;
                    }
                    Ok(())
                }
                GroupKind::Conditional { flag, enabled } => {
                    self.compile_conditional(group, flag, *enabled, parent)
                }
                GroupKind::AnyOf => self.compile_any_of(group, parent),
                // REQUIRED_USE-only operators have no dependency meaning.
                GroupKind::ExactlyOne | GroupKind::AtMostOne => Err(OxmodError::InvalidExpression {
                    message: format!("operator not allowed in dependency context: {group}"),
                    position: 0,
                }),
            },
        }
    }

    /// `flag? ( body )` compiles to material implication at the guard
    /// level: every body clause gets the owner's negated condition flag.
    fn compile_conditional(
        &mut self,
        group: &Group,
        flag: &str,
        enabled: bool,
        parent: &mut Formula,
    ) -> Result<()> {
        let condition = if enabled {
            flag_token(&self.owner_token, flag)
        } else {
            negate(&flag_token(&self.owner_token, flag))
        };

        let mut inner = Formula::new();
        for child in &group.children {
            self.compile_node(child, &mut inner)?;
        }
        parent.merge_guarded(inner.guard(&[negate(&condition)]));
        Ok(())
    }

    /// `|| ( a b ... )`: one fresh variable per branch, each branch formula
    /// vacuous unless its variable holds, plus "at least one branch
    /// variable true". Branches may coexist.
    fn compile_any_of(&mut self, group: &Group, parent: &mut Formula) -> Result<()> {
        let mut branch_variables = Vec::with_capacity(group.children.len());
        for child in &group.children {
            let variable = self.vars.genvariable(format!(
                "dependency alternative '{child}' of {}",
                self.owner
            ));
            let mut branch = Formula::new();
            self.compile_node(child, &mut branch)?;
            parent.merge_guarded(branch.guard(&[negate(&variable)]));
            branch_variables.push(variable);
        }

        parent.push(
            Clause::meta(branch_variables, self.owner_token.clone()).with_description(format!(
                "{} of {}",
                human_readable_required_use(std::slice::from_ref(&Expr::Group(group.clone()))),
                self.owner
            )),
        );
        Ok(())
    }

    fn compile_atom(&mut self, atom_str: &str, parent: &mut Formula) -> Result<()> {
        let atom = Atom::parse(atom_str)?;
        let lookup = atom.strip_use().strip_blocker();
        let candidates = self.repo.load_pkg(&lookup);

        if atom.use_deps().is_empty() {
            match atom.blocker() {
                None => self.compile_plain(&atom, &lookup, &candidates, parent),
                Some(Blocker::Strong) => {
                    self.compile_hard_blocker(&lookup, &candidates, parent);
                    Ok(())
                }
                Some(Blocker::Weak) => {
                    self.compile_weak_blocker(&atom, &lookup, &candidates, parent);
                    Ok(())
                }
            }
        } else {
            // Use-qualified atoms still need their plain dependency clause
            // unless they are blockers.
            if atom.blocker().is_none() {
                self.compile_plain(&atom, &lookup, &candidates, parent)?;
            }
            self.compile_use_deps(&atom, &candidates, parent);
            Ok(())
        }
    }

    /// `X`: one clause selecting some candidate whenever the owner is
    /// selected. Zero candidates is the one fatal lookup condition,
    /// propagated to the caller.
    fn compile_plain(
        &mut self,
        atom: &Atom,
        lookup: &Atom,
        candidates: &[Arc<Package>],
        parent: &mut Formula,
    ) -> Result<()> {
        if candidates.is_empty() {
            return Err(OxmodError::PackageNotFound {
                atom: atom.to_string(),
            });
        }

        let mut literals = vec![negate(&self.owner_token)];
        literals.extend(candidates.iter().map(|c| c.selection_token()));
        parent.push(Clause::dependency(
            literals,
            self.owner_token.clone(),
            lookup.clone(),
        ));

        self.discovered.extend(candidates.iter().map(|c| c.atom.clone()));
        Ok(())
    }

    /// `!!X`: hard mutual exclusion with every candidate. Blocking an atom
    /// nothing provides is vacuously fine.
    fn compile_hard_blocker(
        &mut self,
        lookup: &Atom,
        candidates: &[Arc<Package>],
        parent: &mut Formula,
    ) {
        for candidate in candidates {
            parent.push(Clause::blocker(
                vec![negate(&self.owner_token), negate(&candidate.selection_token())],
                self.owner_token.clone(),
                lookup.clone(),
            ));
        }
    }

    /// `!X`: a preference against co-installation, compiled as soft
    /// clauses rather than hard exclusions.
    fn compile_weak_blocker(
        &mut self,
        atom: &Atom,
        lookup: &Atom,
        candidates: &[Arc<Package>],
        parent: &mut Formula,
    ) {
        for candidate in candidates {
            parent.push(
                Clause::soft(
                    vec![negate(&self.owner_token), negate(&candidate.selection_token())],
                    self.owner_token.clone(),
                    WEAK_BLOCKER_WEIGHT,
                )
                .with_description(format!("{} soft-blocks {lookup}", self.owner)),
            );
        }
        log::debug!("weak blocker {atom} of {} compiled as soft clauses", self.owner);
    }

    /// `X[flag]` / `X[-flag]` and blocker forms: per-candidate flag-state
    /// clauses, vacuous for candidates that are not selected. Candidates
    /// lacking the flag are skipped; sibling versions may expose different
    /// flag sets.
    fn compile_use_deps(&mut self, atom: &Atom, candidates: &[Arc<Package>], parent: &mut Formula) {
        let invert = atom.blocker().is_some();
        for use_dep in atom.use_deps() {
            for candidate in candidates {
                if !candidate.declares_flag(&use_dep.flag) {
                    continue;
                }
                let token = candidate.selection_token();
                let wanted = use_dep.enabled != invert;
                let flag_literal = if wanted {
                    flag_token(&token, &use_dep.flag)
                } else {
                    negate(&flag_token(&token, &use_dep.flag))
                };
                parent.push(
                    Clause::use_dependency(
                        vec![negate(&self.owner_token), negate(&token), flag_literal],
                        self.owner_token.clone(),
                        atom.clone(),
                        token.clone(),
                        use_dep.flag.clone(),
                        wanted,
                    )
                    .with_requirement(token),
                );
            }
        }
    }
}

/// Use-dependency clauses for an explicitly requested atom: same shape as
/// the in-tree form, but with no owning package to guard on.
pub fn compile_request_use_deps(atom: &Atom, candidates: &[Arc<Package>]) -> Vec<Clause> {
    let origin = atom.to_string();
    let mut clauses = Vec::new();
    for use_dep in atom.use_deps() {
        for candidate in candidates {
            if !candidate.declares_flag(&use_dep.flag) {
                continue;
            }
            let token = candidate.selection_token();
            let flag_literal = if use_dep.enabled {
                flag_token(&token, &use_dep.flag)
            } else {
                negate(&flag_token(&token, &use_dep.flag))
            };
            clauses.push(
                Clause::use_dependency(
                    vec![negate(&token), flag_literal],
                    origin.clone(),
                    atom.clone(),
                    token.clone(),
                    use_dep.flag.clone(),
                    use_dep.enabled,
                )
                .with_requirement(token),
            );
        }
    }
    clauses
}
