//! Fixed-point compilation of the dependency closure
//!
//! Seeds a fringe from the requested targets, compiles every reachable
//! package exactly once, and accumulates the per-package formulas into one
//! global formula ready for [`Formula::get_wcnfplus`]. Cycles terminate
//! through the compiled set; nothing is ever recompiled.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexSet;

use oxmod_atom::Atom;

use crate::error::{OxmodError, Result};
use crate::package::{texture_size_flag, Package};
use crate::profile::Profile;
use crate::repository::Repository;
use crate::usestr::{parse_usestr, Expr, Group, GroupKind};

use super::clause::Clause;
use super::depend::{compile_request_use_deps, DependencyCompiler};
use super::formula::Formula;
use super::request::Request;
use super::required_use::RequiredUseCompiler;
use super::variables::{flag_token, negate, Token, VariableIndex};

/// Origin recorded on clauses that come from the user request rather than
/// any package.
const REQUEST_ORIGIN: &str = "request";

/// Origin recorded on profile-forced unit clauses.
const PROFILE_ORIGIN: &str = "profile";

/// Compiles a request and its transitive dependency closure into a global
/// formula.
///
/// Owns the [`VariableIndex`] for exactly one resolution attempt; create a
/// fresh compiler per attempt rather than sharing one across attempts.
pub struct FormulaCompiler<'a> {
    repo: &'a dyn Repository,
    profile: &'a Profile,
    vars: VariableIndex,
}

impl<'a> FormulaCompiler<'a> {
    pub fn new(repo: &'a dyn Repository, profile: &'a Profile) -> Self {
        Self {
            repo,
            profile,
            vars: VariableIndex::new(),
        }
    }

    /// The variable index accumulated so far; exposed for converting the
    /// result with [`Formula::get_wcnfplus`] and for decoding models.
    pub fn variables(&self) -> &VariableIndex {
        &self.vars
    }

    pub fn variables_mut(&mut self) -> &mut VariableIndex {
        &mut self.vars
    }

    /// Compile the request into the global formula.
    ///
    /// The only failure is an atom no candidate satisfies; an
    /// unsatisfiable formula is a solver-time outcome, not a compile
    /// error.
    pub fn compile(&mut self, request: &Request) -> Result<Formula> {
        let start = Instant::now();
        let mut formula = Formula::new();
        let mut fringe: VecDeque<Arc<Package>> = VecDeque::new();
        let mut queued: IndexSet<Token> = IndexSet::new();
        let mut compiled: IndexSet<Token> = IndexSet::new();

        for target in request.targets() {
            let lookup = target.strip_use();
            let candidates = self.repo.load_pkg(&lookup);
            if candidates.is_empty() {
                return Err(OxmodError::PackageNotFound {
                    atom: target.to_string(),
                });
            }

            // Explicit targets are hard requirements: some candidate must
            // be selected, unconditionally.
            let literals: Vec<Token> = candidates.iter().map(|c| c.selection_token()).collect();
            formula.push(
                Clause::dependency(literals, REQUEST_ORIGIN, lookup)
                    .with_description(format!("requested target {target}")),
            );
            for clause in compile_request_use_deps(target, &candidates) {
                formula.push(clause);
            }

            for candidate in candidates {
                if queued.insert(candidate.selection_token()) {
                    fringe.push_back(candidate);
                }
            }
        }

        while let Some(package) = fringe.pop_front() {
            let token = package.selection_token();
            if !compiled.insert(token.clone()) {
                continue;
            }

            let discovered = self.compile_package(&package, &token, &mut formula)?;

            for atom in discovered {
                let discovered_token = atom.to_string();
                if compiled.contains(&discovered_token) || !queued.insert(discovered_token) {
                    continue;
                }
                if let Some(candidate) = self.repo.load_pkg_fq(&atom) {
                    fringe.push_back(candidate);
                }
            }
        }

        log::info!(
            "compiled {} clauses over {} variables from {} packages in {:?}",
            formula.len(),
            self.vars.len(),
            compiled.len(),
            start.elapsed()
        );
        Ok(formula)
    }

    /// Compile one package's constraints, merge them guarded by its
    /// selection literal, and return the candidates it discovered.
    fn compile_package(
        &mut self,
        package: &Package,
        token: &Token,
        formula: &mut Formula,
    ) -> Result<Vec<Atom>> {
        log::debug!("compiling {token}");
        let mut package_formula = Formula::new();

        let mut dep_tree = parse_usestr(&package.depend)?;
        dep_tree.extend(parse_usestr(&package.rdepend)?);
        let mut dep_compiler = DependencyCompiler::new(&package.atom, self.repo, &mut self.vars);
        package_formula.merge(dep_compiler.compile(&dep_tree)?);
        let discovered = dep_compiler.into_discovered();

        if !package.required_use.trim().is_empty() {
            let tree = parse_usestr(&package.required_use)?;
            package_formula
                .merge(RequiredUseCompiler::new(&package.atom, &mut self.vars).compile(&tree));
        }

        if !package.texture_sizes.is_empty() {
            let variants = Expr::Group(Group {
                kind: GroupKind::ExactlyOne,
                children: package
                    .texture_sizes
                    .iter()
                    .map(|size| Expr::Token(texture_size_flag(size)))
                    .collect(),
            });
            package_formula.merge(
                RequiredUseCompiler::new(&package.atom, &mut self.vars)
                    .compile(std::slice::from_ref(&variants)),
            );
        }

        formula.merge_guarded(package_formula.guard(&[negate(token)]));

        // Profile-forced flags are unconditional: they hold whether or not
        // the package ends up selected.
        for flag in self.profile.get_forced_use(&package.atom) {
            formula.push(
                Clause::meta(vec![flag_token(token, &flag)], PROFILE_ORIGIN)
                    .with_description(format!("profile forces {flag} on {token}")),
            );
        }

        Ok(discovered)
    }
}
